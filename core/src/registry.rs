// pipewright/src/registry.rs

//! Defines `Registry`, the process-wide table from route key to pipeline.
//!
//! A host router matches a request to one of its routes and calls
//! [`Registry::dispatch`] with that route's key (for example
//! `"GET /products/{id}"`). Pipelines with different context types live side
//! by side behind a type-erased runner.

use crate::core::http::{Request, Response};
use crate::error::{WrightError, WrightResult};
use crate::pipeline::definition::Pipeline;
use crate::pipeline::execution::RunReport;
use crate::pipeline::fallback::{DefaultFallback, FallbackHandler};
use crate::settings::Settings;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, instrument, Level};

/// Type-erased trait for pipeline execution by the registry.
#[async_trait]
trait AnyPipelineRunner: Send + Sync {
  async fn handle_erased(&self, request: Request, response: Response) -> RunReport;

  fn summary(&self) -> PipelineSummary;
}

/// Wrapper for `Pipeline<TData>` to make it runnable without knowing `TData`.
struct PipelineWrapper<TData>
where
  TData: Serialize + 'static + Send + Sync,
{
  pipeline: Arc<Pipeline<TData>>,
  _phantom_tdata: PhantomData<fn() -> TData>,
}

#[async_trait]
impl<TData> AnyPipelineRunner for PipelineWrapper<TData>
where
  TData: Serialize + 'static + Send + Sync,
{
  async fn handle_erased(&self, request: Request, response: Response) -> RunReport {
    self.pipeline.handle(request, response).await
  }

  fn summary(&self) -> PipelineSummary {
    PipelineSummary {
      name: self.pipeline.name().to_string(),
      context_type: std::any::type_name::<TData>(),
      steps: self.pipeline.step_defs().iter().map(|d| d.name.clone()).collect(),
      tasks: self.pipeline.task_defs().iter().map(|d| d.name.clone()).collect(),
      has_error_handler: self.pipeline.has_error_handler(),
    }
  }
}

/// Registration-time description of a pipeline, for diagnostics and startup logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSummary {
  pub name: String,
  pub context_type: &'static str,
  pub steps: Vec<String>,
  pub tasks: Vec<String>,
  pub has_error_handler: bool,
}

pub struct Registry {
  routes: RwLock<BTreeMap<String, Arc<dyn AnyPipelineRunner>>>,
  fallback: Arc<dyn FallbackHandler>,
}

impl Default for Registry {
  fn default() -> Self {
    Self::new()
  }
}

impl Registry {
  /// Creates an empty registry with the default JSON fallback handler,
  /// configured from the environment.
  pub fn new() -> Self {
    let settings = Settings::from_env();
    Self::with_fallback(DefaultFallback::new(settings.production))
  }

  /// Creates an empty registry whose fallback handler is `fallback`.
  pub fn with_fallback(fallback: impl FallbackHandler + 'static) -> Self {
    Self {
      routes: RwLock::new(BTreeMap::new()),
      fallback: Arc::new(fallback),
    }
  }

  /// Registers `pipeline` for `route`. The registry's fallback is installed
  /// on the pipeline unless it was given its own.
  pub fn register<TData>(&self, route: impl Into<String>, mut pipeline: Pipeline<TData>) -> WrightResult<()>
  where
    TData: Serialize + 'static + Send + Sync,
  {
    let route = route.into();
    pipeline.install_fallback(Arc::clone(&self.fallback));
    let wrapper = PipelineWrapper::<TData> {
      pipeline: Arc::new(pipeline),
      _phantom_tdata: PhantomData,
    };

    let mut routes = self.routes.write();
    if routes.contains_key(&route) {
      return Err(WrightError::DuplicateRoute { route });
    }
    let summary = wrapper.summary();
    event!(
      Level::INFO,
      %route,
      pipeline = %summary.name,
      context_type = summary.context_type,
      steps = ?summary.steps,
      tasks = ?summary.tasks,
      "Pipeline registered."
    );
    routes.insert(route, Arc::new(wrapper));
    Ok(())
  }

  /// Runs the pipeline registered for `route`.
  #[instrument(name = "Registry::dispatch", skip(self, request, response), fields(method = %request.method, path = %request.path))]
  pub async fn dispatch(&self, route: &str, request: Request, response: Response) -> WrightResult<RunReport> {
    let runner = {
      let routes = self.routes.read();
      routes.get(route).cloned().ok_or_else(|| {
        event!(Level::WARN, "No pipeline registered for route.");
        WrightError::RouteNotFound {
          route: route.to_string(),
        }
      })?
    };
    Ok(runner.handle_erased(request, response).await)
  }

  pub fn contains(&self, route: &str) -> bool {
    self.routes.read().contains_key(route)
  }

  /// Registered routes in key order, with a summary of each pipeline.
  pub fn routes(&self) -> Vec<(String, PipelineSummary)> {
    self
      .routes
      .read()
      .iter()
      .map(|(route, runner)| (route.clone(), runner.summary()))
      .collect()
  }
}
