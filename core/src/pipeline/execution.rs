// pipewright/src/pipeline/execution.rs

//! Contains `Pipeline::handle()` and `Pipeline::run()`: the step executor, the
//! retry loop around it and the hand-off to the background scheduler.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineOutcome;
use crate::core::http::{Request, Response};
use crate::error::PipelineError;
use crate::pipeline::definition::Pipeline;
use crate::pipeline::interceptor::Interception;
use crate::scheduler::{self, BackgroundHandle};
use crate::tracer::{DebugTracer, TraceSummary};
use serde::Serialize;
use std::sync::Arc;
use tracing::{event, instrument, span, Instrument, Level};

/// What one invocation of a pipeline produced.
#[derive(Debug)]
pub struct RunReport {
  pub outcome: PipelineOutcome,
  /// How many times the step list was restarted by a retry.
  pub restarts: u32,
  /// Present when the run succeeded and background tasks were scheduled.
  pub background: Option<BackgroundHandle>,
  /// Present when the debug tracer was enabled.
  pub trace: Option<TraceSummary>,
}

impl RunReport {
  pub fn is_success(&self) -> bool {
    self.outcome.is_success()
  }
}

impl<TData> Pipeline<TData>
where
  TData: Serialize + 'static + Send + Sync,
{
  /// Entry point a router calls for a matched route.
  ///
  /// Builds a fresh context with the pipeline's initializer and runs the
  /// pipeline. The response handle holds whatever the steps or the error
  /// handlers wrote. An initializer failure goes straight to the fallback
  /// handler: there is no context to give the custom error handler.
  #[instrument(
    name = "Pipeline::handle",
    skip_all,
    fields(pipeline = %self.name, method = %request.method, path = %request.path)
  )]
  pub async fn handle(&self, request: Request, response: Response) -> RunReport {
    let request = Arc::new(request);
    let data = match (self.init)(Arc::clone(&request)).await {
      Ok(data) => data,
      Err(e) => {
        let error = PipelineError::context_init(e);
        if self.settings.logs_enabled {
          event!(Level::ERROR, error = %error, "Context initializer failed.");
        }
        return RunReport {
          outcome: self.escalate(error, &request, &response),
          restarts: 0,
          background: None,
          trace: None,
        };
      }
    };
    self.run(ContextData::new(data), request, response).await
  }

  /// Runs the pipeline against an existing context.
  ///
  /// The same `ctx` is used for every restart and handed to the background
  /// tasks, so everything written to it before a retry stays visible.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(pipeline = %self.name, num_steps = self.steps.len(), num_tasks = self.tasks.len())
  )]
  pub async fn run(&self, ctx: ContextData<TData>, request: Arc<Request>, response: Response) -> RunReport {
    event!(Level::DEBUG, "Pipeline execution starting.");
    let mut tracer = self
      .settings
      .debug
      .then(|| DebugTracer::new(self.settings.trace_value_limit));
    let mut restarts: u32 = 0;

    let outcome = loop {
      let error = match self.execute(&ctx, &request, &response, restarts, &mut tracer).await {
        Ok(outcome) => break outcome,
        Err(error) => error,
      };
      match self.intercept(error, &ctx, &request, &response, restarts).await {
        Interception::Retry(signal) => {
          restarts += 1;
          if self.settings.logs_enabled {
            event!(
              Level::INFO,
              restart = restarts,
              max_attempts = signal.max_attempts,
              delay_ms = signal.delay.as_millis() as u64,
              "Restarting pipeline from the first step."
            );
          }
          if !signal.delay.is_zero() {
            tokio::time::sleep(signal.delay).await;
          }
        }
        Interception::Done(outcome) => break outcome,
      }
    };

    let trace = tracer.map(|t| t.finish(response.status(), &outcome));
    let background = if outcome.is_success() {
      event!(Level::DEBUG, num_tasks = self.tasks.len(), "Scheduling background tasks.");
      Some(scheduler::schedule(self.tasks.clone(), ctx.clone(), self.settings.logs_enabled))
    } else {
      None
    };

    event!(Level::DEBUG, outcome = outcome.label(), restarts, "Pipeline execution finished.");
    RunReport {
      outcome,
      restarts,
      background,
      trace,
    }
  }

  /// One pass over the step list.
  ///
  /// `Ok` means the response was finalized: by the last step (`Completed`) or
  /// by an earlier one (`EarlyResponse`, remaining steps skipped).
  async fn execute(
    &self,
    ctx: &ContextData<TData>,
    request: &Arc<Request>,
    response: &Response,
    attempt: u32,
    tracer: &mut Option<DebugTracer>,
  ) -> Result<PipelineOutcome, PipelineError> {
    let last_idx = self.steps.len().checked_sub(1);

    for (step_idx, step) in self.steps.iter().enumerate() {
      let step_span = span!(
        Level::INFO,
        "pipeline_step",
        step_name = %step.def.name,
        order = step.def.order,
        attempt
      );

      if let Some(t) = tracer.as_mut() {
        t.before_step(ctx);
      }
      let result = step
        .invoke(ctx.clone(), Arc::clone(request), response.clone())
        .instrument(step_span)
        .await;
      if let Some(t) = tracer.as_mut() {
        t.after_step(&step.def, attempt, ctx, result.is_ok());
      }

      match result {
        Err(e) => {
          if self.settings.logs_enabled {
            event!(Level::ERROR, step = %step.def.name, error = %e, "Step failed.");
          }
          return Err(PipelineError::step_failure(e, &step.def).at_attempt(attempt));
        }
        Ok(()) if response.is_finalized() => {
          return Ok(if Some(step_idx) == last_idx {
            PipelineOutcome::Completed
          } else {
            event!(Level::DEBUG, step = %step.def.name, "Response finalized early, skipping remaining steps.");
            PipelineOutcome::EarlyResponse { step: step.def.clone() }
          });
        }
        Ok(()) => {}
      }
    }

    if self.settings.logs_enabled {
      event!(Level::ERROR, "All steps ran without finalizing the response.");
    }
    Err(PipelineError::no_response(self.steps.last().map(|s| &s.def)).at_attempt(attempt))
  }
}
