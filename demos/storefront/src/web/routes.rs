// demos/storefront/src/web/routes.rs

use crate::errors::AppError;
use crate::pipelines::{CREATE_ORDER, GET_PRODUCT, LIST_PRODUCTS};
use crate::state::AppState;
use crate::web::bridge;
use actix_web::{web, HttpRequest, HttpResponse};

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Lists the registered pipelines and their step order.
async fn routes_handler(app_state: web::Data<AppState>) -> HttpResponse {
  let routes: Vec<serde_json::Value> = app_state
    .registry
    .routes()
    .into_iter()
    .map(|(route, summary)| {
      serde_json::json!({
        "route": route,
        "pipeline": summary.name,
        "steps": summary.steps,
        "tasks": summary.tasks,
        "error_handler": summary.has_error_handler,
      })
    })
    .collect();
  HttpResponse::Ok().json(routes)
}

async fn list_products_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  body: web::Bytes,
) -> Result<HttpResponse, AppError> {
  bridge::dispatch(&app_state, LIST_PRODUCTS, req, body).await
}

async fn get_product_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  body: web::Bytes,
) -> Result<HttpResponse, AppError> {
  bridge::dispatch(&app_state, GET_PRODUCT, req, body).await
}

async fn create_order_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  body: web::Bytes,
) -> Result<HttpResponse, AppError> {
  bridge::dispatch(&app_state, CREATE_ORDER, req, body).await
}

// This function will be called in `main.rs` to configure services for the Actix App.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1") // Base path for API version 1
      .route("/health", web::get().to(health_check_handler))
      .route("/routes", web::get().to(routes_handler))
      .service(
        web::scope("/products")
          .route("", web::get().to(list_products_handler))
          .route("/{sku}", web::get().to(get_product_handler)),
      )
      .service(web::scope("/orders").route("", web::post().to(create_order_handler))),
  );
}
