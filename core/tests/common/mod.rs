// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use pipewright::{
  ContextData, FallbackHandler, Method, Pipeline, PipelineError, Request, Response, Settings, StatusCode,
};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use tracing::Level;

// --- Common Context Struct ---
#[derive(Clone, Debug, Default, Serialize)]
pub struct TestContext {
  pub counter: i32,
  pub x: Option<i32>,
  pub steps_executed: Vec<String>,
  pub tasks_executed: Vec<String>,
  /// Runs of the "flaky" step seen so far.
  pub flaky_runs: u32,
}

// --- Common Error Type for Tests ---
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("Test handler failed: {0}")]
  Handler(String),

  #[error("Validation failed on field '{field}'")]
  Validation { field: String, code: u32 },
}

pub type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

// --- Common Handler Creators ---
pub fn record_step(
  label: &'static str,
) -> impl Fn(ContextData<TestContext>, Arc<Request>, Response) -> HandlerFuture + Send + Sync + 'static {
  move |ctx, _req, _res| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter += 1;
      guard.steps_executed.push(label.to_string());
      tracing::debug!(target: "test_handlers", step = label, "executed, counter: {}", guard.counter);
      Ok(())
    })
  }
}

pub fn respond_step(
  label: &'static str,
  status: StatusCode,
) -> impl Fn(ContextData<TestContext>, Arc<Request>, Response) -> HandlerFuture + Send + Sync + 'static {
  move |ctx, _req, res| {
    Box::pin(async move {
      ctx.write().steps_executed.push(label.to_string());
      res.json(status, &serde_json::json!({ "step": label }))?;
      Ok(())
    })
  }
}

pub fn failing_step(
  label: &'static str,
  message: &'static str,
) -> impl Fn(ContextData<TestContext>, Arc<Request>, Response) -> HandlerFuture + Send + Sync + 'static {
  move |ctx, _req, _res| {
    Box::pin(async move {
      ctx.write().steps_executed.push(label.to_string());
      tracing::warn!(target: "test_handlers", step = label, "failing with: '{}'", message);
      Err(TestError::Handler(message.to_string()).into())
    })
  }
}

/// Fails on its first `failures` runs, responds 200 afterwards.
pub fn flaky_step(
  label: &'static str,
  failures: u32,
) -> impl Fn(ContextData<TestContext>, Arc<Request>, Response) -> HandlerFuture + Send + Sync + 'static {
  move |ctx, _req, res| {
    Box::pin(async move {
      let run = {
        let mut guard = ctx.write();
        guard.steps_executed.push(label.to_string());
        guard.flaky_runs += 1;
        guard.flaky_runs
      };
      if run <= failures {
        return Err(TestError::Handler(format!("{} failed on run {}", label, run)).into());
      }
      res.json(StatusCode::OK, &serde_json::json!({ "run": run }))?;
      Ok(())
    })
  }
}

pub fn record_task(label: &'static str) -> impl Fn(ContextData<TestContext>) -> HandlerFuture + Send + Sync + 'static {
  move |ctx| {
    Box::pin(async move {
      ctx.write().tasks_executed.push(label.to_string());
      Ok(())
    })
  }
}

pub fn failing_task(label: &'static str) -> impl Fn(ContextData<TestContext>) -> HandlerFuture + Send + Sync + 'static {
  move |ctx| {
    Box::pin(async move {
      ctx.write().tasks_executed.push(label.to_string());
      Err(TestError::Handler(format!("{} failed", label)).into())
    })
  }
}

// --- Pipelines and requests ---
pub fn test_settings() -> Settings {
  Settings::default()
}

pub fn new_pipeline(name: &str) -> Pipeline<TestContext> {
  Pipeline::new(name).with_settings(test_settings())
}

pub fn test_request() -> Arc<Request> {
  Arc::new(Request::new(Method::GET, "/test"))
}

pub async fn run_pipeline(pipeline: &Pipeline<TestContext>) -> (pipewright::RunReport, ContextData<TestContext>, Response) {
  let ctx = ContextData::new(TestContext::default());
  let res = Response::new();
  let report = pipeline.run(ctx.clone(), test_request(), res.clone()).await;
  (report, ctx, res)
}

/// Fallback handler that counts invocations and remembers the last error.
#[derive(Clone, Default)]
pub struct RecordingFallback {
  pub calls: Arc<AtomicUsize>,
  pub last_error: Arc<parking_lot::Mutex<Option<PipelineError>>>,
}

impl RecordingFallback {
  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  pub fn last_error(&self) -> Option<PipelineError> {
    self.last_error.lock().clone()
  }
}

impl FallbackHandler for RecordingFallback {
  fn handle(&self, error: &PipelineError, _request: &Request, response: &Response) {
    self.calls.fetch_add(1, Ordering::SeqCst);
    *self.last_error.lock() = Some(error.clone());
    let _ = response.json(error.status(), &serde_json::json!({ "fallback": error.message() }));
  }
}

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
