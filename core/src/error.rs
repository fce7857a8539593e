// pipewright/src/error.rs

//! Error types: configuration-time failures (`WrightError`), request-time
//! pipeline failures (`PipelineError`) and a status-carrying domain error for
//! step handlers (`HttpError`).

use crate::core::step::StepDef;
use anyhow::Error as AnyhowError;
use http::StatusCode;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Fixed message of the protocol failure raised when every step ran and none
/// of them finalized the response.
pub const NO_RESPONSE_MESSAGE: &str = "pipeline finished without producing a response";

#[derive(Debug, Error)]
pub enum WrightError {
  #[error("Duplicate step order {order}: '{first}' and '{second}'")]
  DuplicateOrder { order: u64, first: String, second: String },

  #[error("Malformed step name '{name}', expected '<order>-<label>[.<ext>]'")]
  MalformedName { name: String },

  #[error("No handler registered for discovered file '{name}' ({path})")]
  UnresolvedModule { name: String, path: String },

  #[error("Failed to scan directory '{dir}'. Source: {source}")]
  Discovery {
    dir: String,
    #[source]
    source: std::io::Error,
  },

  #[error("Response already finalized")]
  ResponseFinalized,

  #[error("Invalid header '{name}': {message}")]
  InvalidHeader { name: String, message: String },

  #[error("Route already registered: {route}")]
  DuplicateRoute { route: String },

  #[error("No pipeline registered for route: {route}")]
  RouteNotFound { route: String },

  #[error("Background task batch did not finish: {0}")]
  BackgroundJoin(String),

  #[error("Internal pipewright error: {0}")]
  Internal(String),
}

pub type WrightResult<T, E = WrightError> = std::result::Result<T, E>;

/// Where in the request lifecycle a `PipelineError` originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
  /// A step handler returned an error.
  Step,
  /// All steps ran without finalizing the response.
  NoResponse,
  /// The context initializer failed before any step ran.
  ContextInit,
  /// The pipeline's custom error handler itself failed.
  ErrorHandler,
}

impl FailureKind {
  /// Only step failures may be replayed through a `RetrySignal`.
  pub fn is_retryable(self) -> bool {
    matches!(self, FailureKind::Step)
  }
}

impl fmt::Display for FailureKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FailureKind::Step => write!(f, "step"),
      FailureKind::NoResponse => write!(f, "no_response"),
      FailureKind::ContextInit => write!(f, "context_init"),
      FailureKind::ErrorHandler => write!(f, "error_handler"),
    }
  }
}

/// A request-time failure together with its pipeline position.
///
/// The original error stays reachable through [`PipelineError::downcast_ref`],
/// so handlers further down the chain can still branch on domain-specific
/// fields. `Display` forwards the original error's message. Cloning is cheap:
/// the source is shared.
#[derive(Debug, Clone)]
pub struct PipelineError {
  kind: FailureKind,
  step: Option<StepDef>,
  status: StatusCode,
  attempt: u32,
  source: Option<Arc<AnyhowError>>,
}

impl PipelineError {
  pub fn step_failure(source: AnyhowError, step: &StepDef) -> Self {
    Self::with_source(FailureKind::Step, source, Some(step.clone()))
  }

  pub fn no_response(last_step: Option<&StepDef>) -> Self {
    Self {
      kind: FailureKind::NoResponse,
      step: last_step.cloned(),
      status: StatusCode::INTERNAL_SERVER_ERROR,
      attempt: 0,
      source: None,
    }
  }

  pub fn context_init(source: AnyhowError) -> Self {
    Self::with_source(FailureKind::ContextInit, source, None)
  }

  /// A handler that re-raises the error it was given escalates that error
  /// unchanged: same kind, status and source. Anything else is a new
  /// `ErrorHandler` failure.
  pub fn handler_failure(source: AnyhowError, step: Option<&StepDef>) -> Self {
    if let Some(rethrown) = source.downcast_ref::<PipelineError>() {
      let mut original = rethrown.clone();
      if original.step.is_none() {
        original.step = step.cloned();
      }
      return original;
    }
    Self::with_source(FailureKind::ErrorHandler, source, step.cloned())
  }

  fn with_source(kind: FailureKind, source: AnyhowError, step: Option<StepDef>) -> Self {
    let status = status_of(&source);
    Self {
      kind,
      step,
      status,
      attempt: 0,
      source: Some(Arc::new(source)),
    }
  }

  pub(crate) fn at_attempt(mut self, attempt: u32) -> Self {
    self.attempt = attempt;
    self
  }

  pub fn with_status(mut self, status: StatusCode) -> Self {
    self.status = status;
    self
  }

  pub fn kind(&self) -> FailureKind {
    self.kind
  }

  /// The step during which the failure occurred, if it happened inside one.
  pub fn step(&self) -> Option<&StepDef> {
    self.step.as_ref()
  }

  pub fn status(&self) -> StatusCode {
    self.status
  }

  /// Zero-based run number (0 for the first run, 1 after the first restart, ...).
  pub fn attempt(&self) -> u32 {
    self.attempt
  }

  pub fn original(&self) -> Option<&AnyhowError> {
    self.source.as_deref()
  }

  /// Reaches the original error value, looking through any `anyhow` context layers.
  pub fn downcast_ref<E>(&self) -> Option<&E>
  where
    E: fmt::Display + fmt::Debug + Send + Sync + 'static,
  {
    self.source.as_deref().and_then(|err| err.downcast_ref::<E>())
  }

  /// The original message, or the fixed protocol message for `NoResponse`.
  pub fn message(&self) -> String {
    match &self.source {
      Some(err) => err.to_string(),
      None => NO_RESPONSE_MESSAGE.to_string(),
    }
  }

  /// The cause chain of the original error, outermost first.
  pub fn chain(&self) -> Vec<String> {
    match &self.source {
      Some(err) => err.chain().map(|cause| cause.to_string()).collect(),
      None => Vec::new(),
    }
  }
}

impl fmt::Display for PipelineError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.message())
  }
}

impl std::error::Error for PipelineError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    self.source.as_deref().map(|err| {
      let inner: &(dyn std::error::Error + 'static) = err.as_ref();
      inner
    })
  }
}

fn status_of(err: &AnyhowError) -> StatusCode {
  err
    .chain()
    .find_map(|cause| cause.downcast_ref::<HttpError>())
    .map_or(StatusCode::INTERNAL_SERVER_ERROR, |http_err| http_err.status)
}

/// Domain error a step can return to choose the status of the failure
/// response and attach a machine-readable code or structured details.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct HttpError {
  pub status: StatusCode,
  pub message: String,
  pub code: Option<String>,
  pub details: Option<Value>,
}

impl HttpError {
  pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
    Self {
      status,
      message: message.into(),
      code: None,
      details: None,
    }
  }

  pub fn bad_request(message: impl Into<String>) -> Self {
    Self::new(StatusCode::BAD_REQUEST, message)
  }

  pub fn not_found(message: impl Into<String>) -> Self {
    Self::new(StatusCode::NOT_FOUND, message)
  }

  pub fn unavailable(message: impl Into<String>) -> Self {
    Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
  }

  pub fn with_code(mut self, code: impl Into<String>) -> Self {
    self.code = Some(code.into());
    self
  }

  pub fn with_details(mut self, details: Value) -> Self {
    self.details = Some(details);
    self
  }
}
