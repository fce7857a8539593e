// pipewright/src/settings.rs

//! Environment toggles consumed by the engine. They are read once, when a
//! pipeline is constructed, never per request.

use std::env;
use tracing::{event, Level};

pub const DEBUG_VAR: &str = "PIPEWRIGHT_DEBUG";
pub const DISABLE_LOGS_VAR: &str = "PIPEWRIGHT_DISABLE_LOGS";
pub const ENV_VAR: &str = "PIPEWRIGHT_ENV";
pub const TRACE_LIMIT_VAR: &str = "PIPEWRIGHT_TRACE_LIMIT";

pub const DEFAULT_TRACE_VALUE_LIMIT: usize = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
  /// Enables the debug tracer (context diffs and timings per step).
  pub debug: bool,
  /// When false the engine emits no request-level log events of its own.
  pub logs_enabled: bool,
  /// Production hides cause chains from fallback error responses.
  pub production: bool,
  /// Maximum characters of a value shown in a tracer diff.
  pub trace_value_limit: usize,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      debug: false,
      logs_enabled: true,
      production: false,
      trace_value_limit: DEFAULT_TRACE_VALUE_LIMIT,
    }
  }
}

impl Settings {
  pub fn from_env() -> Self {
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds settings from an arbitrary variable source.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
    let defaults = Self::default();
    let trace_value_limit = match lookup(TRACE_LIMIT_VAR) {
      Some(raw) => raw.trim().parse::<usize>().unwrap_or_else(|e| {
        event!(Level::WARN, var = TRACE_LIMIT_VAR, value = %raw, error = %e, "Invalid trace limit, using default.");
        defaults.trace_value_limit
      }),
      None => defaults.trace_value_limit,
    };

    Self {
      debug: lookup(DEBUG_VAR).map_or(defaults.debug, |v| is_truthy(&v)),
      logs_enabled: !lookup(DISABLE_LOGS_VAR).is_some_and(|v| is_truthy(&v)),
      production: lookup(ENV_VAR).is_some_and(|v| v.trim().eq_ignore_ascii_case("production")),
      trace_value_limit,
    }
  }

  pub fn with_debug(mut self, debug: bool) -> Self {
    self.debug = debug;
    self
  }

  pub fn with_logs(mut self, enabled: bool) -> Self {
    self.logs_enabled = enabled;
    self
  }

  pub fn with_production(mut self, production: bool) -> Self {
    self.production = production;
    self
  }

  pub fn with_trace_value_limit(mut self, limit: usize) -> Self {
    self.trace_value_limit = limit;
    self
  }
}

fn is_truthy(raw: &str) -> bool {
  matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
