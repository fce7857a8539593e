// pipewright/src/pipeline/hooks.rs

//! Methods for registering steps, background tasks and the error handler.
//! Every declared name is parsed and placed by order as it is registered, so
//! a duplicate ordering key fails on the call that introduces it.

use crate::core::context_data::ContextData;
use crate::core::control::ErrorOutcome;
use crate::core::http::{Request, Response};
use crate::core::step::{step_handler, task_handler, AsyncTask, Step};
use crate::discovery::{declared_def, insert_ordered};
use crate::error::{PipelineError, WrightResult};
use crate::pipeline::definition::{ErrorHandler, ErrorHandlerFuture, Pipeline};
use std::future::Future;
use std::sync::Arc;
use tracing::{event, Level};

impl<TData> Pipeline<TData>
where
  TData: 'static + Send + Sync,
{
  /// Registers a step under its declared name (`<order>-<label>[.<ext>]`).
  ///
  /// The handler gets the context, the request and the response; returning
  /// `Err` stops the pipeline and hands the error to the error handler.
  pub fn step<F, Fut, E>(&mut self, declared_name: &str, handler_fn: F) -> WrightResult<&mut Self>
  where
    F: Fn(ContextData<TData>, Arc<Request>, Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<anyhow::Error> + Send + 'static,
  {
    let def = declared_def(declared_name)?;
    self.add_step(Step::new(def, step_handler(handler_fn)))
  }

  /// Registers a background task, run after a successful pipeline.
  pub fn task<F, Fut, E>(&mut self, declared_name: &str, handler_fn: F) -> WrightResult<&mut Self>
  where
    F: Fn(ContextData<TData>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<anyhow::Error> + Send + 'static,
  {
    let def = declared_def(declared_name)?;
    self.add_task(AsyncTask::new(def, task_handler(handler_fn)))
  }

  pub fn add_step(&mut self, step: Step<TData>) -> WrightResult<&mut Self> {
    event!(Level::TRACE, pipeline = %self.name, step = %step.def.name, order = step.def.order, "Registering step.");
    insert_ordered(&mut self.steps, step)?;
    Ok(self)
  }

  pub fn add_task(&mut self, task: AsyncTask<TData>) -> WrightResult<&mut Self> {
    event!(Level::TRACE, pipeline = %self.name, task = %task.def.name, order = task.def.order, "Registering async task.");
    insert_ordered(&mut self.tasks, task)?;
    Ok(self)
  }

  /// Sets the pipeline's custom error handler, replacing any previous one.
  ///
  /// The handler decides through its [`ErrorOutcome`]: `Responded` after
  /// writing the response itself, `Retry` to replay the steps, `Escalate` to
  /// pass an error on to the fallback handler. Returning `Err` also reaches
  /// the fallback, with the new error; re-raising the `PipelineError` it was
  /// given escalates that error unchanged.
  pub fn on_error<F, Fut>(&mut self, handler_fn: F) -> &mut Self
  where
    F: Fn(PipelineError, ContextData<TData>, Arc<Request>, Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<ErrorOutcome>> + Send + 'static,
  {
    let handler: ErrorHandler<TData> = Arc::new(
      move |err: PipelineError, ctx: ContextData<TData>, req: Arc<Request>, res: Response| -> ErrorHandlerFuture {
        Box::pin(handler_fn(err, ctx, req, res))
      },
    );
    self.error_handler = Some(handler);
    self
  }
}
