// pipewright/src/core/control.rs

//! Control values exchanged between the executor and the error handler, and
//! the outcome of a full pipeline run.

use crate::core::step::StepDef;
use crate::error::{FailureKind, PipelineError};
use http::StatusCode;
use std::time::Duration;

/// Request to replay the whole step list from the first step.
///
/// Only meaningful as the payload of [`ErrorOutcome::Retry`]; it never reaches
/// the response or the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySignal {
  /// Wait before the restart.
  pub delay: Duration,
  /// Maximum number of restarts for this request.
  pub max_attempts: u32,
}

impl RetrySignal {
  pub fn new(max_attempts: u32) -> Self {
    Self {
      delay: Duration::ZERO,
      max_attempts,
    }
  }

  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = delay;
    self
  }
}

impl Default for RetrySignal {
  fn default() -> Self {
    Self::new(1)
  }
}

/// What a custom error handler decided to do with a failure.
#[derive(Debug, Clone)]
pub enum ErrorOutcome {
  /// The handler wrote and finalized the response; the request is done.
  Responded,
  /// Replay the pipeline (subject to the signal's attempt budget).
  Retry(RetrySignal),
  /// Hand the error to the process-wide fallback handler.
  Escalate(PipelineError),
}

/// Outcome of one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
  /// Every step ran and the last one finalized the response.
  Completed,
  /// A step finalized the response before the last step; the rest were skipped.
  EarlyResponse { step: StepDef },
  /// A step failed and the custom error handler produced the response.
  Recovered,
  /// The failure reached the fallback handler.
  Failed {
    kind: FailureKind,
    step: Option<StepDef>,
    status: StatusCode,
  },
}

impl PipelineOutcome {
  /// Success in the sense that background tasks get scheduled.
  ///
  /// Any finalized response counts, whatever its status code.
  pub fn is_success(&self) -> bool {
    matches!(self, PipelineOutcome::Completed | PipelineOutcome::EarlyResponse { .. })
  }

  pub fn label(&self) -> &'static str {
    match self {
      PipelineOutcome::Completed => "completed",
      PipelineOutcome::EarlyResponse { .. } => "early_response",
      PipelineOutcome::Recovered => "recovered",
      PipelineOutcome::Failed { .. } => "failed",
    }
  }
}
