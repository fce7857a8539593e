// pipewright/src/core/step.rs

//! Defines the ordered units a pipeline is made of: `Step` (runs against the
//! request and response) and `AsyncTask` (runs after success, context only).

use crate::core::context_data::ContextData;
use crate::core::http::{Request, Response};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by every step and task handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// Type alias for a step handler.
///
/// A step receives a clone of the request's `ContextData<TData>` handle, the
/// read-only request and the shared response handle. Lock guards on the
/// context or response MUST be dropped before any `.await`.
pub type StepHandler<TData> =
  Arc<dyn Fn(ContextData<TData>, Arc<Request>, Response) -> HandlerFuture + Send + Sync>;

/// Type alias for a background task handler. Tasks never see the request or
/// response: by the time they run the response may already be on the wire.
pub type TaskHandler<TData> = Arc<dyn Fn(ContextData<TData>) -> HandlerFuture + Send + Sync>;

/// Position metadata of a step or task, derived from its declared name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StepDef {
  /// Numeric ordering key, unique within one list.
  pub order: u64,
  /// Declared name without extension, e.g. `100-load-user`.
  pub name: String,
  /// The part after the ordering key, e.g. `load-user`.
  pub label: String,
  /// The declared name exactly as given (file name for scanned steps).
  pub source: String,
}

impl fmt::Display for StepDef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.name)
  }
}

/// Anything placed in an ordered list by the discovery engine.
pub trait Ordered {
  fn def(&self) -> &StepDef;
}

pub struct Step<TData: 'static + Send + Sync> {
  pub def: StepDef,
  pub(crate) handler: StepHandler<TData>,
}

impl<TData: 'static + Send + Sync> Step<TData> {
  pub fn new(def: StepDef, handler: StepHandler<TData>) -> Self {
    Self { def, handler }
  }

  pub(crate) fn invoke(&self, ctx: ContextData<TData>, req: Arc<Request>, res: Response) -> HandlerFuture {
    (self.handler)(ctx, req, res)
  }
}

impl<TData: 'static + Send + Sync> Clone for Step<TData> {
  fn clone(&self) -> Self {
    Self {
      def: self.def.clone(),
      handler: Arc::clone(&self.handler),
    }
  }
}

impl<TData: 'static + Send + Sync> Ordered for Step<TData> {
  fn def(&self) -> &StepDef {
    &self.def
  }
}

// Handlers are closures, so Debug shows only the definition.
impl<TData: 'static + Send + Sync> fmt::Debug for Step<TData> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Step").field("def", &self.def).finish()
  }
}

pub struct AsyncTask<TData: 'static + Send + Sync> {
  pub def: StepDef,
  pub(crate) handler: TaskHandler<TData>,
}

impl<TData: 'static + Send + Sync> AsyncTask<TData> {
  pub fn new(def: StepDef, handler: TaskHandler<TData>) -> Self {
    Self { def, handler }
  }

  pub(crate) fn invoke(&self, ctx: ContextData<TData>) -> HandlerFuture {
    (self.handler)(ctx)
  }
}

impl<TData: 'static + Send + Sync> Clone for AsyncTask<TData> {
  fn clone(&self) -> Self {
    Self {
      def: self.def.clone(),
      handler: Arc::clone(&self.handler),
    }
  }
}

impl<TData: 'static + Send + Sync> Ordered for AsyncTask<TData> {
  fn def(&self) -> &StepDef {
    &self.def
  }
}

impl<TData: 'static + Send + Sync> fmt::Debug for AsyncTask<TData> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AsyncTask").field("def", &self.def).finish()
  }
}

/// Boxes a user closure into a `StepHandler`, converting its error into `anyhow::Error`.
pub fn step_handler<TData, F, Fut, E>(handler_fn: F) -> StepHandler<TData>
where
  TData: 'static + Send + Sync,
  F: Fn(ContextData<TData>, Arc<Request>, Response) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<(), E>> + Send + 'static,
  E: Into<anyhow::Error> + Send + 'static,
{
  Arc::new(move |ctx: ContextData<TData>, req: Arc<Request>, res: Response| -> HandlerFuture {
    let user_fut = handler_fn(ctx, req, res);
    Box::pin(async move { user_fut.await.map_err(Into::into) })
  })
}

/// Boxes a user closure into a `TaskHandler`.
pub fn task_handler<TData, F, Fut, E>(handler_fn: F) -> TaskHandler<TData>
where
  TData: 'static + Send + Sync,
  F: Fn(ContextData<TData>) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<(), E>> + Send + 'static,
  E: Into<anyhow::Error> + Send + 'static,
{
  Arc::new(move |ctx: ContextData<TData>| -> HandlerFuture {
    let user_fut = handler_fn(ctx);
    Box::pin(async move { user_fut.await.map_err(Into::into) })
  })
}
