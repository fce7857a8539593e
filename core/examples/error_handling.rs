// pipewright/examples/error_handling.rs

use pipewright::{
  ContextData, ErrorOutcome, HttpError, Method, Pipeline, PipelineError, Request, Response, RetrySignal, Settings,
  StatusCode,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

// 1. Define a custom application error type
#[derive(Debug, thiserror::Error)]
enum ExampleAppError {
  #[error("Upstream inventory service timed out")]
  UpstreamTimeout,

  #[error("Quantity {0} is not allowed")]
  BadQuantity(i64),
}

// 2. Define Context Data
#[derive(Clone, Debug, Default, Serialize)]
struct ErrorContext {
  processed_steps: Vec<String>,
  upstream_calls: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();
  info!("--- Error Handling Example ---");

  // Scenario 1: a transient failure is retried and the second run succeeds
  info!("\nScenario 1: transient failure, retried once");
  run_pipeline_with_retry().await?;

  // Scenario 2: a domain error escalates to the default JSON fallback
  info!("\nScenario 2: domain error escalated to the fallback handler");
  run_pipeline_with_escalation().await?;

  Ok(())
}

fn build_pipeline() -> anyhow::Result<Pipeline<ErrorContext>> {
  let mut pipeline = Pipeline::<ErrorContext>::new("reserve-stock").with_settings(Settings::default());

  pipeline.step("100-validate", |ctx: ContextData<ErrorContext>, req: Arc<Request>, _res: Response| async move {
    ctx.write().processed_steps.push("100-validate".to_string());
    let quantity = req.body["quantity"].as_i64().unwrap_or(0);
    if quantity <= 0 {
      return Err(anyhow::Error::new(HttpError::bad_request("quantity must be positive").with_code("BAD_QUANTITY"))
        .context(ExampleAppError::BadQuantity(quantity)));
    }
    anyhow::Ok(())
  })?;

  pipeline.step("200-reserve", |ctx: ContextData<ErrorContext>, _req: Arc<Request>, res: Response| async move {
    let calls = {
      let mut data = ctx.write();
      data.processed_steps.push("200-reserve".to_string());
      data.upstream_calls += 1;
      data.upstream_calls
    };
    if calls == 1 {
      warn!("Simulating an upstream timeout on the first call");
      return Err(ExampleAppError::UpstreamTimeout.into());
    }
    res.json(StatusCode::CREATED, &serde_json::json!({ "reserved": true, "calls": calls }))?;
    anyhow::Ok(())
  })?;

  pipeline.on_error(
    |err: PipelineError, _ctx: ContextData<ErrorContext>, _req: Arc<Request>, _res: Response| async move {
      match err.downcast_ref::<ExampleAppError>() {
        Some(ExampleAppError::UpstreamTimeout) => {
          info!(attempt = err.attempt(), "Upstream timed out, retrying the pipeline");
          Ok(ErrorOutcome::Retry(RetrySignal::new(2).with_delay(Duration::from_millis(50))))
        }
        _ => Ok(ErrorOutcome::Escalate(err.clone())),
      }
    },
  );

  Ok(pipeline)
}

async fn run_pipeline_with_retry() -> anyhow::Result<()> {
  let pipeline = build_pipeline()?;
  let ctx = ContextData::new(ErrorContext::default());
  let response = Response::new();
  let request = Request::new(Method::POST, "/reservations").with_body(serde_json::json!({ "quantity": 3 }));

  let report = pipeline.run(ctx.clone(), Arc::new(request), response.clone()).await;

  info!(outcome = ?report.outcome, restarts = report.restarts, "Pipeline finished");
  info!("Steps run: {:?}", ctx.read().processed_steps);
  info!("Response: {}", String::from_utf8_lossy(&response.snapshot().body));
  assert_eq!(report.restarts, 1);
  Ok(())
}

async fn run_pipeline_with_escalation() -> anyhow::Result<()> {
  let pipeline = build_pipeline()?;
  let response = Response::new();
  let request = Request::new(Method::POST, "/reservations").with_body(serde_json::json!({ "quantity": -1 }));

  let report = pipeline.handle(request, response.clone()).await;

  let snapshot = response.snapshot();
  info!(outcome = ?report.outcome, status = snapshot.status.as_u16(), "Pipeline finished");
  info!("Fallback body: {}", String::from_utf8_lossy(&snapshot.body));
  assert_eq!(snapshot.status, StatusCode::BAD_REQUEST);
  Ok(())
}
