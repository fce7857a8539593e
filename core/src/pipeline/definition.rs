// pipewright/src/pipeline/definition.rs

//! Contains the `Pipeline<TData>` struct and its construction.

use crate::core::context_data::ContextData;
use crate::core::control::ErrorOutcome;
use crate::core::http::{Request, Response};
use crate::core::step::{AsyncTask, Step, StepDef};
use crate::discovery::{self, Catalog};
use crate::error::{PipelineError, WrightResult};
use crate::pipeline::fallback::{DefaultFallback, FallbackHandler};
use crate::settings::Settings;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{event, Level};

pub type ErrorHandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<ErrorOutcome>> + Send>>;

/// Per-pipeline error handler. Receives the wrapped failure together with the
/// same context, request and response the failing step saw.
pub type ErrorHandler<TData> =
  Arc<dyn Fn(PipelineError, ContextData<TData>, Arc<Request>, Response) -> ErrorHandlerFuture + Send + Sync>;

pub type ContextInitFuture<TData> = Pin<Box<dyn Future<Output = anyhow::Result<TData>> + Send>>;

/// Builds the fresh context data of each request.
pub type ContextInit<TData> = Arc<dyn Fn(Arc<Request>) -> ContextInitFuture<TData> + Send + Sync>;

/// An ordered list of steps for one route, its background tasks and its
/// failure routing.
///
/// `TData` is the per-request context data: a user struct, or
/// [`Context`](crate::Context) for an open-ended map. The step and task lists
/// are built once, at registration, and never change while requests run.
pub struct Pipeline<TData>
where
  TData: 'static + Send + Sync,
{
  pub(crate) name: String,
  /// Ascending by order, orders unique.
  pub(crate) steps: Vec<Step<TData>>,
  /// Ascending by order, orders unique, independent of `steps`.
  pub(crate) tasks: Vec<AsyncTask<TData>>,
  pub(crate) error_handler: Option<ErrorHandler<TData>>,
  pub(crate) fallback: Arc<dyn FallbackHandler>,
  pub(crate) custom_fallback: bool,
  pub(crate) init: ContextInit<TData>,
  pub(crate) settings: Settings,
}

impl<TData> Pipeline<TData>
where
  TData: Default + 'static + Send + Sync,
{
  /// Creates an empty pipeline whose requests start from `TData::default()`.
  ///
  /// Settings are read from the environment here, once.
  pub fn new(name: impl Into<String>) -> Self {
    Self::with_initializer(name, |_req: Arc<Request>| async { anyhow::Ok(TData::default()) })
  }

  /// Registers a pipeline from two directories: steps and background tasks.
  ///
  /// Both are scanned once, now; each matching file is resolved through
  /// `catalog`. Missing directories are empty lists.
  pub fn from_dirs(
    name: impl Into<String>,
    steps_dir: impl AsRef<Path>,
    tasks_dir: impl AsRef<Path>,
    catalog: &Catalog<TData>,
  ) -> WrightResult<Self> {
    let mut pipeline = Self::new(name);
    pipeline.load_steps_dir(steps_dir.as_ref(), catalog)?;
    pipeline.load_tasks_dir(tasks_dir.as_ref(), catalog)?;
    Ok(pipeline)
  }
}

impl<TData> Pipeline<TData>
where
  TData: 'static + Send + Sync,
{
  /// Creates an empty pipeline whose requests start from the data `init` builds.
  pub fn with_initializer<F, Fut>(name: impl Into<String>, init: F) -> Self
  where
    F: Fn(Arc<Request>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<TData>> + Send + 'static,
  {
    let settings = Settings::from_env();
    let init: ContextInit<TData> = Arc::new(move |req: Arc<Request>| -> ContextInitFuture<TData> { Box::pin(init(req)) });
    Self {
      name: name.into(),
      steps: Vec::new(),
      tasks: Vec::new(),
      error_handler: None,
      fallback: Arc::new(DefaultFallback::new(settings.production)),
      custom_fallback: false,
      init,
      settings,
    }
  }

  /// Replaces the environment-derived settings.
  pub fn with_settings(mut self, settings: Settings) -> Self {
    if !self.custom_fallback {
      self.fallback = Arc::new(DefaultFallback::new(settings.production));
    }
    self.settings = settings;
    self
  }

  /// Uses `fallback` instead of the registry-wide one.
  pub fn with_fallback(mut self, fallback: impl FallbackHandler + 'static) -> Self {
    self.fallback = Arc::new(fallback);
    self.custom_fallback = true;
    self
  }

  /// Installs the process-wide fallback unless this pipeline set its own.
  pub(crate) fn install_fallback(&mut self, fallback: Arc<dyn FallbackHandler>) {
    if !self.custom_fallback {
      self.fallback = fallback;
    }
  }

  pub fn load_steps_dir(&mut self, dir: &Path, catalog: &Catalog<TData>) -> WrightResult<&mut Self> {
    let files = discovery::scan_dir(dir)?;
    for step in catalog.resolve_steps(&files)? {
      self.add_step(step)?;
    }
    event!(Level::DEBUG, pipeline = %self.name, dir = %dir.display(), num_steps = self.steps.len(), "Steps discovered.");
    Ok(self)
  }

  pub fn load_tasks_dir(&mut self, dir: &Path, catalog: &Catalog<TData>) -> WrightResult<&mut Self> {
    let files = discovery::scan_dir(dir)?;
    for task in catalog.resolve_tasks(&files)? {
      self.add_task(task)?;
    }
    event!(Level::DEBUG, pipeline = %self.name, dir = %dir.display(), num_tasks = self.tasks.len(), "Async tasks discovered.");
    Ok(self)
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn settings(&self) -> &Settings {
    &self.settings
  }

  pub fn steps(&self) -> &[Step<TData>] {
    &self.steps
  }

  pub fn tasks(&self) -> &[AsyncTask<TData>] {
    &self.tasks
  }

  pub fn step_defs(&self) -> Vec<&StepDef> {
    self.steps.iter().map(|s| &s.def).collect()
  }

  pub fn task_defs(&self) -> Vec<&StepDef> {
    self.tasks.iter().map(|t| &t.def).collect()
  }

  pub fn has_error_handler(&self) -> bool {
    self.error_handler.is_some()
  }
}
