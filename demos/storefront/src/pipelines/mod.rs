// demos/storefront/src/pipelines/mod.rs

//! Defines and registers all pipelines served by the storefront.

use crate::errors::AppError;
use crate::state::AppState;

pub mod fallback;
pub mod orders;
pub mod products;

// Route keys shared by the registry and the actix routes.
pub const LIST_PRODUCTS: &str = "GET /products";
pub const GET_PRODUCT: &str = "GET /products/{sku}";
pub const CREATE_ORDER: &str = "POST /orders";

/// Registers every pipeline with the registry in `app_state`.
///
/// Called once at startup; a duplicate order or route fails the boot.
pub fn register_all_pipelines(app_state: &AppState) -> Result<(), AppError> {
  tracing::info!("Registering pipelines...");

  products::register_product_pipelines(app_state)?;
  orders::register_order_pipeline(app_state)?;

  for (route, summary) in app_state.registry.routes() {
    tracing::info!(
      %route,
      pipeline = %summary.name,
      steps = ?summary.steps,
      tasks = ?summary.tasks,
      error_handler = summary.has_error_handler,
      "Route ready."
    );
  }
  Ok(())
}
