// pipewright/src/scheduler.rs

//! Background task scheduling after a successful pipeline run.
//!
//! The batch runs on one spawned tokio task so the request path never waits
//! for it. Inside the batch tasks run strictly one after another in ascending
//! order; a failing or panicking task is recorded and the next one still runs.

use crate::core::context_data::ContextData;
use crate::core::step::{AsyncTask, StepDef};
use crate::error::{WrightError, WrightResult};
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{event, span, Instrument, Level};

#[derive(Debug, Clone)]
pub struct TaskReport {
  pub task: StepDef,
  pub duration: Duration,
  /// `None` when the task succeeded.
  pub error: Option<String>,
}

impl TaskReport {
  pub fn succeeded(&self) -> bool {
    self.error.is_none()
  }
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
  pub reports: Vec<TaskReport>,
}

impl BatchReport {
  pub fn succeeded(&self) -> usize {
    self.reports.iter().filter(|r| r.succeeded()).count()
  }

  pub fn failed(&self) -> usize {
    self.reports.len() - self.succeeded()
  }

  /// Task names in the order they ran.
  pub fn executed(&self) -> Vec<&str> {
    self.reports.iter().map(|r| r.task.name.as_str()).collect()
  }
}

/// Handle to a scheduled background batch.
///
/// Dropping the handle detaches the batch; it keeps running.
#[derive(Debug)]
pub struct BackgroundHandle {
  join: JoinHandle<BatchReport>,
}

impl BackgroundHandle {
  /// Waits for every task of the batch to finish.
  pub async fn wait(self) -> WrightResult<BatchReport> {
    self
      .join
      .await
      .map_err(|e| WrightError::BackgroundJoin(e.to_string()))
  }

  /// Cancels the batch at its next suspension point.
  pub fn abort(&self) {
    self.join.abort();
  }

  pub fn is_finished(&self) -> bool {
    self.join.is_finished()
  }
}

/// Spawns the batch. Must be called from within a tokio runtime.
pub(crate) fn schedule<TData>(tasks: Vec<AsyncTask<TData>>, ctx: ContextData<TData>, logs_enabled: bool) -> BackgroundHandle
where
  TData: 'static + Send + Sync,
{
  let batch_span = span!(Level::DEBUG, "background_tasks", num_tasks = tasks.len());
  let join = tokio::spawn(run_tasks(tasks, ctx, logs_enabled).instrument(batch_span));
  BackgroundHandle { join }
}

/// Runs `tasks` in order against `ctx`, isolating failures from each other.
pub async fn run_tasks<TData>(tasks: Vec<AsyncTask<TData>>, ctx: ContextData<TData>, logs_enabled: bool) -> BatchReport
where
  TData: 'static + Send + Sync,
{
  let mut reports = Vec::with_capacity(tasks.len());

  for task in &tasks {
    let started = Instant::now();
    let outcome = AssertUnwindSafe(async { task.invoke(ctx.clone()).await })
      .catch_unwind()
      .await;

    let error = match outcome {
      Ok(Ok(())) => {
        if logs_enabled {
          event!(Level::DEBUG, task = %task.def.name, "Background task finished.");
        }
        None
      }
      Ok(Err(e)) => {
        if logs_enabled {
          event!(Level::ERROR, task = %task.def.name, error = %e, "Background task failed, continuing with the next one.");
        }
        Some(e.to_string())
      }
      Err(panic) => {
        let message = panic_message(panic.as_ref());
        if logs_enabled {
          event!(Level::ERROR, task = %task.def.name, panic = %message, "Background task panicked, continuing with the next one.");
        }
        Some(format!("panicked: {}", message))
      }
    };

    reports.push(TaskReport {
      task: task.def.clone(),
      duration: started.elapsed(),
      error,
    });
  }

  BatchReport { reports }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
  if let Some(s) = payload.downcast_ref::<&str>() {
    (*s).to_string()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "unknown panic payload".to_string()
  }
}
