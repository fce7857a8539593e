// demos/storefront/src/pipelines/products.rs

//! Catalog pipelines. Both use the open-ended `Context` map: the list
//! pipeline's steps are discovered from `<routes_dir>/products/steps`.

use crate::errors::AppError;
use crate::models::Product;
use crate::pipelines::{GET_PRODUCT, LIST_PRODUCTS};
use crate::state::AppState;
use pipewright::{Catalog, Context, ContextData, Pipeline, Request, Response, StatusCode};
use std::sync::Arc;
use tracing::{info, instrument};

pub fn register_product_pipelines(app_state: &AppState) -> Result<(), AppError> {
  app_state.registry.register(LIST_PRODUCTS, build_list_pipeline(app_state)?)?;
  app_state.registry.register(GET_PRODUCT, build_get_pipeline(app_state)?)?;
  Ok(())
}

#[instrument(name = "pipelines::products_list", skip_all)]
fn build_list_pipeline(app_state: &AppState) -> Result<Pipeline<Context>, AppError> {
  let mut catalog = Catalog::<Context>::new();

  let inventory = app_state.inventory.clone();
  catalog.step("100-load-catalog", move |ctx: ContextData<Context>, _req: Arc<Request>, _res: Response| {
    let inventory = inventory.clone();
    async move {
      let products = inventory.list();
      info!(count = products.len(), "Catalog loaded.");
      ctx.write().insert("products", products)?;
      anyhow::Ok(())
    }
  });

  catalog.step("200-filter", |ctx: ContextData<Context>, req: Arc<Request>, _res: Response| async move {
    let Some(raw) = req.query_param("max_price") else {
      return anyhow::Ok(());
    };
    let max_price: u64 = raw
      .parse()
      .map_err(|_| AppError::Validation(format!("max_price must be a whole number of cents, got '{}'", raw)))?;
    let mut guard = ctx.write();
    let products: Vec<Product> = guard.get("products")?;
    let filtered: Vec<Product> = products.into_iter().filter(|p| p.price_cents <= max_price).collect();
    guard.insert("products", filtered)?;
    guard.insert("max_price", max_price)?;
    anyhow::Ok(())
  });

  catalog.step("300-render", |ctx: ContextData<Context>, _req: Arc<Request>, res: Response| async move {
    let products: Vec<Product> = ctx.read().get("products")?;
    res.json(StatusCode::OK, &serde_json::json!({ "count": products.len(), "products": products }))?;
    anyhow::Ok(())
  });

  let inventory = app_state.inventory.clone();
  catalog.task("100-record-view", move |_ctx: ContextData<Context>| {
    let inventory = inventory.clone();
    async move {
      let views = inventory.record_catalog_view();
      info!(views, "Catalog view recorded.");
      anyhow::Ok(())
    }
  });

  let products_dir = app_state.config.routes_dir.join("products");
  let pipeline = Pipeline::from_dirs("products.list", products_dir.join("steps"), products_dir.join("tasks"), &catalog)?;
  Ok(pipeline)
}

fn build_get_pipeline(app_state: &AppState) -> Result<Pipeline<Context>, AppError> {
  let mut pipeline = Pipeline::<Context>::new("products.get");

  let inventory = app_state.inventory.clone();
  pipeline.step("100-lookup", move |ctx: ContextData<Context>, req: Arc<Request>, _res: Response| {
    let inventory = inventory.clone();
    async move {
      let sku = req
        .param("sku")
        .ok_or_else(|| AppError::Validation("missing sku".to_string()))?;
      let product = inventory.get(sku)?;
      ctx.write().insert("product", product)?;
      anyhow::Ok(())
    }
  })?;

  pipeline.step("200-render", |ctx: ContextData<Context>, _req: Arc<Request>, res: Response| async move {
    let product: Product = ctx.read().get("product")?;
    let status = if product.stock == 0 { "sold_out" } else { "available" };
    res.json(StatusCode::OK, &serde_json::json!({ "product": product, "availability": status }))?;
    anyhow::Ok(())
  })?;

  Ok(pipeline)
}
