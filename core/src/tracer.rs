// pipewright/src/tracer.rs

//! Debug tracer: per-step context diffs and timings.
//!
//! Enabled by `Settings::debug`. The tracer only reads the context, so a run
//! with the tracer on behaves exactly like one with it off.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineOutcome;
use crate::core::step::StepDef;
use http::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::{Duration, Instant};
use tracing::{event, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
  Added,
  Changed,
}

/// One top-level context key a step added or changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChange {
  pub key: String,
  pub kind: ChangeKind,
  /// Compact JSON of the new value, truncated to the configured limit.
  pub value: String,
}

#[derive(Debug, Clone)]
pub struct StepTrace {
  pub step: StepDef,
  pub attempt: u32,
  pub duration: Duration,
  pub passed: bool,
  pub changes: Vec<KeyChange>,
}

/// Aggregate emitted when a traced run ends.
#[derive(Debug, Clone)]
pub struct TraceSummary {
  pub steps: Vec<StepTrace>,
  pub total: Duration,
  pub passed: usize,
  pub failed: usize,
  pub status: StatusCode,
  pub outcome: &'static str,
}

/// Keys present in `after` that are new or hold a different value than in
/// `before`. Removed keys are not reported.
pub fn diff_snapshots(before: &Map<String, Value>, after: &Map<String, Value>, limit: usize) -> Vec<KeyChange> {
  after
    .iter()
    .filter_map(|(key, value)| {
      let kind = match before.get(key) {
        None => ChangeKind::Added,
        Some(previous) if previous != value => ChangeKind::Changed,
        Some(_) => return None,
      };
      Some(KeyChange {
        key: key.clone(),
        kind,
        value: truncate_value(value, limit),
      })
    })
    .collect()
}

pub fn truncate_value(value: &Value, limit: usize) -> String {
  let rendered = value.to_string();
  if rendered.chars().count() <= limit {
    return rendered;
  }
  let mut cut: String = rendered.chars().take(limit).collect();
  cut.push_str("...");
  cut
}

pub(crate) struct DebugTracer {
  limit: usize,
  started: Instant,
  steps: Vec<StepTrace>,
  pending: Option<(Map<String, Value>, Instant)>,
}

impl DebugTracer {
  pub(crate) fn new(limit: usize) -> Self {
    Self {
      limit,
      started: Instant::now(),
      steps: Vec::new(),
      pending: None,
    }
  }

  pub(crate) fn before_step<TData>(&mut self, ctx: &ContextData<TData>)
  where
    TData: Serialize + Send + Sync + 'static,
  {
    self.pending = Some((ctx.snapshot(), Instant::now()));
  }

  pub(crate) fn after_step<TData>(&mut self, step: &StepDef, attempt: u32, ctx: &ContextData<TData>, passed: bool)
  where
    TData: Serialize + Send + Sync + 'static,
  {
    let Some((before, started)) = self.pending.take() else {
      return;
    };
    let duration = started.elapsed();
    let after = ctx.snapshot();
    let changes = diff_snapshots(&before, &after, self.limit);

    let rendered: Vec<String> = changes
      .iter()
      .map(|c| match c.kind {
        ChangeKind::Added => format!("+{}={}", c.key, c.value),
        ChangeKind::Changed => format!("~{}={}", c.key, c.value),
      })
      .collect();
    event!(
      target: "pipewright::trace",
      Level::INFO,
      step = %step.name,
      attempt,
      passed,
      duration_us = duration.as_micros() as u64,
      changes = %rendered.join(" "),
      "Step traced."
    );

    self.steps.push(StepTrace {
      step: step.clone(),
      attempt,
      duration,
      passed,
      changes,
    });
  }

  pub(crate) fn finish(self, status: StatusCode, outcome: &PipelineOutcome) -> TraceSummary {
    let passed = self.steps.iter().filter(|s| s.passed).count();
    let failed = self.steps.len() - passed;
    let total = self.started.elapsed();
    event!(
      target: "pipewright::trace",
      Level::INFO,
      total_us = total.as_micros() as u64,
      passed,
      failed,
      status = status.as_u16(),
      outcome = outcome.label(),
      "Pipeline traced."
    );
    TraceSummary {
      steps: self.steps,
      total,
      passed,
      failed,
      status,
      outcome: outcome.label(),
    }
  }
}
