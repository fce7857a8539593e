// tests/tracer_tests.rs
mod common;

use common::*;
use pipewright::tracer::{diff_snapshots, truncate_value};
use pipewright::{ChangeKind, ContextData, Request, Response, StatusCode};
use serde_json::{json, Map, Value};
use serial_test::serial;
use std::sync::Arc;

fn object(value: Value) -> Map<String, Value> {
  match value {
    Value::Object(map) => map,
    other => panic!("expected an object, got {}", other),
  }
}

#[test]
fn test_diff_reports_added_and_changed_keys_only() {
  let before = object(json!({ "user": "ann", "count": 1, "gone": true }));
  let after = object(json!({ "user": "ann", "count": 2, "cart": [1, 2] }));

  let changes = diff_snapshots(&before, &after, 60);

  assert_eq!(changes.len(), 2);
  assert_eq!(changes[0].key, "count");
  assert_eq!(changes[0].kind, ChangeKind::Changed);
  assert_eq!(changes[0].value, "2");
  assert_eq!(changes[1].key, "cart");
  assert_eq!(changes[1].kind, ChangeKind::Added);
  assert_eq!(changes[1].value, "[1,2]");
}

#[test]
fn test_truncate_value_cuts_long_values() {
  let long = json!("abcdefghijklmnopqrstuvwxyz");
  assert_eq!(truncate_value(&long, 10), "\"abcdefghi...");
  assert_eq!(truncate_value(&json!(42), 10), "42");
}

#[tokio::test]
#[serial]
async fn test_traced_run_records_each_step() {
  setup_tracing();
  let mut pipeline = new_pipeline("traced").with_settings(test_settings().with_debug(true).with_trace_value_limit(20));
  pipeline.step("100-count", record_step("100-count")).unwrap();
  pipeline
    .step("200-set-x", |ctx: ContextData<TestContext>, _req: Arc<Request>, res: Response| async move {
      ctx.write().x = Some(7);
      res.send(StatusCode::OK, "ok")?;
      anyhow::Ok(())
    })
    .unwrap();

  let (report, _ctx, _res) = run_pipeline(&pipeline).await;

  let trace = report.trace.expect("tracer enabled");
  assert_eq!(trace.steps.len(), 2);
  assert_eq!(trace.passed, 2);
  assert_eq!(trace.failed, 0);
  assert_eq!(trace.status, StatusCode::OK);
  assert_eq!(trace.outcome, "completed");

  let first = &trace.steps[0];
  assert_eq!(first.step.name, "100-count");
  let keys: Vec<&str> = first.changes.iter().map(|c| c.key.as_str()).collect();
  assert_eq!(keys, vec!["counter", "steps_executed"]);
  assert!(first.changes.iter().all(|c| c.kind == ChangeKind::Changed));

  let second = &trace.steps[1];
  assert_eq!(second.changes.len(), 1);
  assert_eq!(second.changes[0].key, "x");
  assert_eq!(second.changes[0].value, "7");
}

#[tokio::test]
#[serial]
async fn test_traced_retry_marks_failed_attempts() {
  setup_tracing();
  let mut pipeline = new_pipeline("traced-retry").with_settings(test_settings().with_debug(true));
  pipeline.step("100-flaky", flaky_step("100-flaky", 1)).unwrap();
  pipeline.on_error(
    |_err: pipewright::PipelineError, _ctx: ContextData<TestContext>, _req: Arc<Request>, _res: Response| async move {
      Ok(pipewright::ErrorOutcome::Retry(pipewright::RetrySignal::new(1)))
    },
  );

  let (report, _ctx, _res) = run_pipeline(&pipeline).await;

  let trace = report.trace.unwrap();
  assert_eq!(trace.passed, 1);
  assert_eq!(trace.failed, 1);
  assert_eq!(
    trace.steps.iter().map(|s| (s.attempt, s.passed)).collect::<Vec<_>>(),
    vec![(0, false), (1, true)]
  );
}

#[tokio::test]
#[serial]
async fn test_tracer_does_not_change_behavior() {
  setup_tracing();
  let build = |debug: bool| {
    let mut pipeline = new_pipeline("traced-or-not").with_settings(test_settings().with_debug(debug));
    pipeline.step("100-a", record_step("100-a")).unwrap();
    pipeline.step("200-b", respond_step("200-b", StatusCode::ACCEPTED)).unwrap();
    pipeline
  };

  let (plain_report, plain_ctx, plain_res) = run_pipeline(&build(false)).await;
  let (traced_report, traced_ctx, traced_res) = run_pipeline(&build(true)).await;

  assert!(plain_report.trace.is_none());
  assert!(traced_report.trace.is_some());
  assert_eq!(plain_report.outcome, traced_report.outcome);
  assert_eq!(plain_ctx.read().steps_executed, traced_ctx.read().steps_executed);
  assert_eq!(plain_res.snapshot(), traced_res.snapshot());
}
