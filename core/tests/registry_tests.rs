// tests/registry_tests.rs
mod common;

use common::*;
use pipewright::{
  Context, ContextData, Method, Pipeline, PipelineError, Registry, Request, Response, StatusCode, WrightError,
};
use serial_test::serial;
use std::sync::Arc;

fn products_pipeline() -> Pipeline<Context> {
  let mut pipeline = Pipeline::<Context>::new("products").with_settings(test_settings());
  pipeline
    .step("100-load", |ctx: ContextData<Context>, req: Arc<Request>, _res: Response| async move {
      let id = req.param("id").unwrap_or("unknown").to_string();
      ctx.write().insert("product_id", id)?;
      anyhow::Ok(())
    })
    .unwrap();
  pipeline
    .step("200-render", |ctx: ContextData<Context>, _req: Arc<Request>, res: Response| async move {
      let id: String = ctx.read().get("product_id")?;
      res.json(StatusCode::OK, &serde_json::json!({ "id": id }))?;
      anyhow::Ok(())
    })
    .unwrap();
  pipeline
}

#[tokio::test]
#[serial]
async fn test_dispatch_runs_pipelines_of_different_context_types() {
  setup_tracing();
  let registry = Registry::with_fallback(RecordingFallback::default());
  registry.register("GET /products/{id}", products_pipeline()).unwrap();

  let mut typed = new_pipeline("typed");
  typed.step("100-respond", respond_step("100-respond", StatusCode::OK)).unwrap();
  registry.register("GET /health", typed).unwrap();

  let res = Response::new();
  let report = registry
    .dispatch(
      "GET /products/{id}",
      Request::new(Method::GET, "/products/9").with_param("id", "9"),
      res.clone(),
    )
    .await
    .unwrap();
  assert!(report.is_success());
  assert_eq!(res.snapshot().json_body().unwrap(), serde_json::json!({ "id": "9" }));

  let res = Response::new();
  let report = registry
    .dispatch("GET /health", Request::new(Method::GET, "/health"), res.clone())
    .await
    .unwrap();
  assert!(report.is_success());

  let routes: Vec<String> = registry.routes().into_iter().map(|(route, _)| route).collect();
  assert_eq!(routes, vec!["GET /health", "GET /products/{id}"]);
}

#[tokio::test]
#[serial]
async fn test_duplicate_route_is_rejected() {
  setup_tracing();
  let registry = Registry::with_fallback(RecordingFallback::default());
  registry.register("GET /products/{id}", products_pipeline()).unwrap();

  let result = registry.register("GET /products/{id}", products_pipeline());
  match result {
    Err(WrightError::DuplicateRoute { route }) => assert_eq!(route, "GET /products/{id}"),
    other => panic!("expected DuplicateRoute, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn test_unknown_route_is_an_error() {
  setup_tracing();
  let registry = Registry::with_fallback(RecordingFallback::default());
  let result = registry
    .dispatch("DELETE /nothing", Request::new(Method::DELETE, "/nothing"), Response::new())
    .await;
  assert!(matches!(result, Err(WrightError::RouteNotFound { .. })));
  assert!(!registry.contains("DELETE /nothing"));
}

#[tokio::test]
#[serial]
async fn test_registry_fallback_is_installed_unless_pipeline_has_its_own() {
  setup_tracing();
  let registry_fallback = RecordingFallback::default();
  let own_fallback = RecordingFallback::default();
  let registry = Registry::with_fallback(registry_fallback.clone());

  let mut shared = new_pipeline("shared");
  shared.step("100-bad", failing_step("100-bad", "shared")).unwrap();
  registry.register("GET /shared", shared).unwrap();

  let mut own = new_pipeline("own").with_fallback(own_fallback.clone());
  own.step("100-bad", failing_step("100-bad", "own")).unwrap();
  registry.register("GET /own", own).unwrap();

  registry
    .dispatch("GET /shared", Request::new(Method::GET, "/shared"), Response::new())
    .await
    .unwrap();
  registry
    .dispatch("GET /own", Request::new(Method::GET, "/own"), Response::new())
    .await
    .unwrap();

  assert_eq!(registry_fallback.calls(), 1);
  assert_eq!(registry_fallback.last_error().unwrap().message(), "Test handler failed: shared");
  assert_eq!(own_fallback.calls(), 1);
  assert_eq!(own_fallback.last_error().unwrap().message(), "Test handler failed: own");
}

#[tokio::test]
#[serial]
async fn test_summary_describes_registered_pipeline() {
  setup_tracing();
  let registry = Registry::with_fallback(RecordingFallback::default());
  let mut pipeline = new_pipeline("checkout");
  pipeline.step("200-charge", respond_step("200-charge", StatusCode::OK)).unwrap();
  pipeline.step("100-validate", record_step("100-validate")).unwrap();
  pipeline.task("100-email", record_task("100-email")).unwrap();
  pipeline.on_error(
    |err: PipelineError, _ctx: ContextData<TestContext>, _req: Arc<Request>, _res: Response| async move {
      Ok(pipewright::ErrorOutcome::Escalate(err))
    },
  );
  registry.register("POST /checkout", pipeline).unwrap();

  let (route, summary) = registry.routes().remove(0);
  assert_eq!(route, "POST /checkout");
  assert_eq!(summary.name, "checkout");
  assert!(summary.context_type.ends_with("TestContext"));
  assert_eq!(summary.steps, vec!["100-validate", "200-charge"]);
  assert_eq!(summary.tasks, vec!["100-email"]);
  assert!(summary.has_error_handler);
}
