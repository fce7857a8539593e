// pipewright/examples/basic_pipeline.rs

use pipewright::{ContextData, Method, Pipeline, PipelineOutcome, Request, Response, Settings, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

// 1. Define the Context Data for the pipeline
#[derive(Clone, Debug, Default, Serialize)]
struct BasicContext {
  message_log: Vec<String>,
  counter: i32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialize tracing (optional, for demonstration)
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

  info!("--- Basic Pipeline Example ---");

  // 2. Create a pipeline; the debug tracer prints a context diff per step.
  let mut pipeline = Pipeline::<BasicContext>::new("basic").with_settings(Settings::default().with_debug(true));

  // 3. Register steps. Declared names carry the ordering key; registration
  //    order does not matter.
  pipeline.step("300-gamma", |ctx: ContextData<BasicContext>, _req: Arc<Request>, res: Response| async move {
    let counter = {
      let mut data = ctx.write();
      data.counter -= 1;
      let msg = format!("Gamma executed: counter = {}", data.counter);
      info!("{}", msg);
      data.message_log.push(msg);
      data.counter
    };
    res.json(StatusCode::OK, &serde_json::json!({ "counter": counter }))?;
    anyhow::Ok(())
  })?;

  pipeline.step("100-alpha", |ctx: ContextData<BasicContext>, _req: Arc<Request>, _res: Response| async move {
    let mut data = ctx.write();
    data.counter += 1;
    let msg = format!("Alpha executed: counter = {}", data.counter);
    info!("{}", msg);
    data.message_log.push(msg);
    anyhow::Ok(())
  })?;

  pipeline.step("200-beta", |ctx: ContextData<BasicContext>, _req: Arc<Request>, _res: Response| async move {
    let mut data = ctx.write();
    data.counter *= 2;
    let msg = format!("Beta executed: counter = {}", data.counter);
    info!("{}", msg);
    data.message_log.push(msg);
    anyhow::Ok(())
  })?;

  // 4. A background task, run after the response is produced.
  pipeline.task("100-report", |ctx: ContextData<BasicContext>| async move {
    info!("Background task saw {} log entries", ctx.read().message_log.len());
    anyhow::Ok(())
  })?;

  // 5. Create an initial context and run the pipeline
  let pipeline_context = ContextData::new(BasicContext {
    message_log: Vec::new(),
    counter: 5, // Start counter at 5
  });
  let response = Response::new();
  info!("Starting pipeline execution...");
  let report = pipeline
    .run(
      pipeline_context.clone(),
      Arc::new(Request::new(Method::GET, "/basic")),
      response.clone(),
    )
    .await;

  // 6. Inspect the results
  match &report.outcome {
    PipelineOutcome::Completed => info!("Pipeline completed successfully!"),
    other => info!("Pipeline finished with {:?}", other),
  }
  if let Some(background) = report.background {
    let batch = background.wait().await?;
    info!("Background tasks executed: {:?}", batch.executed());
  }

  let final_context_state = pipeline_context.read();
  info!("Final counter value: {}", final_context_state.counter);
  info!("Response body: {}", String::from_utf8_lossy(&response.snapshot().body));

  // Expected: (5+1)*2 - 1 = 11
  assert_eq!(final_context_state.counter, 11);
  assert_eq!(final_context_state.message_log.len(), 3);

  Ok(())
}
