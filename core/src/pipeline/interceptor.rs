// pipewright/src/pipeline/interceptor.rs

//! Routes a failed run to the custom error handler or the fallback handler.
//!
//! The interceptor never writes to the response itself. It decides, from the
//! custom handler's `ErrorOutcome` and the response state, whether the
//! request is done, must be replayed, or goes to the fallback.

use crate::core::context_data::ContextData;
use crate::core::control::{ErrorOutcome, PipelineOutcome, RetrySignal};
use crate::core::http::{Request, Response};
use crate::error::PipelineError;
use crate::pipeline::definition::Pipeline;
use std::sync::Arc;
use tracing::{event, Level};

pub(crate) enum Interception {
  Retry(RetrySignal),
  Done(PipelineOutcome),
}

impl<TData> Pipeline<TData>
where
  TData: 'static + Send + Sync,
{
  /// `restarts` is the number of restarts already performed for this request.
  pub(crate) async fn intercept(
    &self,
    error: PipelineError,
    ctx: &ContextData<TData>,
    request: &Arc<Request>,
    response: &Response,
    restarts: u32,
  ) -> Interception {
    let Some(handler) = &self.error_handler else {
      return Interception::Done(self.escalate(error, request, response));
    };

    event!(Level::DEBUG, kind = %error.kind(), step = ?error.step().map(|s| &s.name), "Invoking custom error handler.");
    let handled = handler(error.clone(), ctx.clone(), Arc::clone(request), response.clone()).await;

    match handled {
      Ok(ErrorOutcome::Retry(signal)) => {
        if response.is_finalized() {
          self.warn("Retry requested after the response was finalized; treating as handled.");
          Interception::Done(PipelineOutcome::Recovered)
        } else if !error.kind().is_retryable() {
          self.warn("Retry requested for a non-retryable failure; escalating.");
          Interception::Done(self.escalate(error, request, response))
        } else if restarts >= signal.max_attempts {
          if self.settings.logs_enabled {
            event!(Level::WARN, restarts, max_attempts = signal.max_attempts, "Retry budget exhausted; escalating.");
          }
          Interception::Done(self.escalate(error, request, response))
        } else {
          Interception::Retry(signal)
        }
      }
      Ok(ErrorOutcome::Responded) => {
        if response.is_finalized() {
          Interception::Done(PipelineOutcome::Recovered)
        } else {
          self.warn("Error handler reported a response but none was finalized; escalating.");
          Interception::Done(self.escalate(error, request, response))
        }
      }
      Ok(ErrorOutcome::Escalate(escalated)) => {
        if response.is_finalized() {
          Interception::Done(PipelineOutcome::Recovered)
        } else {
          Interception::Done(self.escalate(escalated, request, response))
        }
      }
      Err(handler_err) => {
        let failure = PipelineError::handler_failure(handler_err, error.step()).at_attempt(error.attempt());
        if response.is_finalized() {
          if self.settings.logs_enabled {
            event!(Level::ERROR, error = %failure, "Error handler failed after finalizing the response.");
          }
          Interception::Done(PipelineOutcome::Recovered)
        } else {
          Interception::Done(self.escalate(failure, request, response))
        }
      }
    }
  }

  /// Hands `error` to the fallback handler.
  pub(crate) fn escalate(&self, error: PipelineError, request: &Request, response: &Response) -> PipelineOutcome {
    if self.settings.logs_enabled {
      event!(
        Level::ERROR,
        kind = %error.kind(),
        status = error.status().as_u16(),
        step = ?error.step().map(|s| &s.name),
        error = %error,
        "Pipeline failure escalated to the fallback handler."
      );
    }
    self.fallback.handle(&error, request, response);
    PipelineOutcome::Failed {
      kind: error.kind(),
      step: error.step().cloned(),
      status: error.status(),
    }
  }

  fn warn(&self, message: &'static str) {
    if self.settings.logs_enabled {
      event!(Level::WARN, "{}", message);
    }
  }
}
