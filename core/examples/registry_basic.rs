// pipewright/examples/registry_basic.rs

use pipewright::{Context, ContextData, HttpError, Method, Pipeline, Registry, Request, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

// --- Contexts for different pipelines ---
#[derive(Clone, Debug, Default, Serialize)]
struct UserWorkflowContext {
  user_id: String,
  action_log: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  // Use Box<dyn Error> for main
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();
  info!("--- Pipewright Registry Basic Example ---");

  // 1. Create a registry instance; failures nobody handles get the default JSON body.
  let registry = Arc::new(Registry::new());

  // 2. Define and register Pipeline A (typed context)
  let mut user_pipeline = Pipeline::<UserWorkflowContext>::with_initializer("users", |req: Arc<Request>| async move {
    anyhow::Ok(UserWorkflowContext {
      user_id: req.param("id").unwrap_or_default().to_string(),
      action_log: Vec::new(),
    })
  });
  user_pipeline.step("100-validate-user", |ctx: ContextData<UserWorkflowContext>, _req: Arc<Request>, _res: Response| async move {
    let mut data = ctx.write();
    if data.user_id.is_empty() {
      return Err(HttpError::bad_request("User ID cannot be empty"));
    }
    let msg = format!("User Validated: {}", data.user_id);
    info!("{}", msg);
    data.action_log.push(msg);
    Ok(())
  })?;
  user_pipeline.step("200-render-user", |ctx: ContextData<UserWorkflowContext>, _req: Arc<Request>, res: Response| async move {
    let data = ctx.read().clone();
    res.json(StatusCode::OK, &serde_json::json!({ "user": data.user_id, "log": data.action_log }))?;
    anyhow::Ok(())
  })?;
  registry.register("GET /users/{id}", user_pipeline)?;

  // 3. Define and register Pipeline B (open-ended map context)
  let mut product_pipeline = Pipeline::<Context>::new("products");
  product_pipeline.step("100-load-product", |ctx: ContextData<Context>, req: Arc<Request>, _res: Response| async move {
    let sku = req.query_param("sku").unwrap_or("unknown").to_string();
    ctx.write().insert("sku", sku)?;
    anyhow::Ok(())
  })?;
  product_pipeline.step("200-render-product", |ctx: ContextData<Context>, _req: Arc<Request>, res: Response| async move {
    let sku: String = ctx.read().get("sku")?;
    res.json(StatusCode::OK, &serde_json::json!({ "sku": sku }))?;
    anyhow::Ok(())
  })?;
  registry.register("GET /products", product_pipeline)?;

  for (route, summary) in registry.routes() {
    info!(route = %route, steps = ?summary.steps, context = summary.context_type, "Registered");
  }

  // 4. Dispatch a few requests
  let requests = vec![
    ("GET /users/{id}", Request::new(Method::GET, "/users/u1").with_param("id", "u1")),
    ("GET /users/{id}", Request::new(Method::GET, "/users/")),
    ("GET /products", Request::new(Method::GET, "/products").with_query("sku", "P-42")),
    ("GET /missing", Request::new(Method::GET, "/missing")),
  ];
  for (route, request) in requests {
    let response = Response::new();
    match registry.dispatch(route, request, response.clone()).await {
      Ok(report) => {
        let snapshot = response.snapshot();
        info!(
          route,
          outcome = report.outcome.label(),
          status = snapshot.status.as_u16(),
          body = %String::from_utf8_lossy(&snapshot.body),
          "Dispatched"
        );
      }
      Err(e) => error!(route, "Dispatch failed: {}", e),
    }
  }

  Ok(())
}
