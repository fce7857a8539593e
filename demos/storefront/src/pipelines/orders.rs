// demos/storefront/src/pipelines/orders.rs
use crate::errors::AppError;
use crate::models::{Order, OrderLine};
use crate::pipelines::CREATE_ORDER;
use crate::state::AppState;
use pipewright::{ContextData, ErrorOutcome, Pipeline, PipelineError, Request, Response, RetrySignal, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
  pub customer_email: String,
  pub lines: Vec<OrderLine>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OrderCtxData {
  pub customer_email: String,
  pub requested: Vec<OrderLine>,
  pub reserved: Vec<OrderLine>,
  pub reservation_attempts: u32,
  pub order: Option<Order>,
  pub confirmation_id: Option<String>,
}

#[instrument(name = "pipelines::orders", skip_all)]
pub fn register_order_pipeline(app_state: &AppState) -> Result<(), AppError> {
  // The request body becomes the context; a malformed body never reaches a step.
  let mut p = Pipeline::<OrderCtxData>::with_initializer("orders.create", |req: Arc<Request>| async move {
    let body: CreateOrderRequest = serde_json::from_value(req.body.clone())
      .map_err(|e| AppError::Validation(format!("invalid order body: {}", e)))?;
    anyhow::Ok(OrderCtxData {
      customer_email: body.customer_email,
      requested: body.lines,
      ..OrderCtxData::default()
    })
  });

  // Step 100: Validate
  p.step("100-validate", |ctx: ContextData<OrderCtxData>, _req: Arc<Request>, _res: Response| async move {
    let guard = ctx.read();
    if !guard.customer_email.contains('@') {
      return Err(AppError::Validation(format!("invalid email '{}'", guard.customer_email)));
    }
    if guard.requested.is_empty() {
      return Err(AppError::Validation("an order needs at least one line".to_string()));
    }
    if let Some(line) = guard.requested.iter().find(|l| l.quantity == 0) {
      return Err(AppError::Validation(format!("quantity for '{}' must be positive", line.sku)));
    }
    Ok(())
  })?;

  // Step 200: Reserve stock. Transient failures are retried by the error handler below.
  let inventory = app_state.inventory.clone();
  p.step("200-reserve-stock", move |ctx: ContextData<OrderCtxData>, _req: Arc<Request>, _res: Response| {
    let inventory = inventory.clone();
    async move {
      let requested = {
        let mut guard = ctx.write();
        guard.reservation_attempts += 1;
        guard.requested.clone()
      };
      let reserved = inventory.reserve(&requested).await?;
      ctx.write().reserved = reserved;
      Ok::<_, AppError>(())
    }
  })?;

  // Step 300: Create the order and respond
  p.step("300-create-order", |ctx: ContextData<OrderCtxData>, _req: Arc<Request>, res: Response| async move {
    let order = {
      let mut guard = ctx.write();
      let total_cents = guard
        .reserved
        .iter()
        .map(|l| l.unit_price_cents * u64::from(l.quantity))
        .sum();
      let order = Order {
        id: Uuid::new_v4(),
        customer_email: guard.customer_email.clone(),
        lines: guard.reserved.clone(),
        total_cents,
        created_at: chrono::Utc::now(),
      };
      guard.order = Some(order.clone());
      order
    };
    info!(order_id = %order.id, total_cents = order.total_cents, "Order created.");
    res.insert_header("location", &format!("/api/v1/orders/{}", order.id))?;
    res.json(StatusCode::CREATED, &order)?;
    anyhow::Ok(())
  })?;

  // Error handler: retry transient inventory failures, answer stock conflicts
  // directly, leave everything else to the registry fallback.
  let attempts = app_state.config.order_retry_attempts;
  let delay = app_state.config.order_retry_delay;
  p.on_error(
    move |err: PipelineError, ctx: ContextData<OrderCtxData>, _req: Arc<Request>, res: Response| async move {
      match err.downcast_ref::<AppError>() {
        Some(AppError::Unavailable(reason)) => {
          warn!(attempt = err.attempt(), %reason, "Inventory unavailable, retrying order pipeline.");
          Ok(ErrorOutcome::Retry(RetrySignal::new(attempts).with_delay(delay)))
        }
        Some(AppError::OutOfStock {
          sku,
          requested,
          available,
        }) => {
          let attempts_made = ctx.read().reservation_attempts;
          res.json(
            StatusCode::CONFLICT,
            &serde_json::json!({
              "error": {
                "code": "OUT_OF_STOCK",
                "sku": sku,
                "requested": requested,
                "available": available,
                "reservation_attempts": attempts_made,
              }
            }),
          )?;
          Ok(ErrorOutcome::Responded)
        }
        _ => Ok(ErrorOutcome::Escalate(err.clone())),
      }
    },
  );

  // Background tasks, run after the 201 went out
  let notifier = app_state.notifier.clone();
  p.task("100-send-confirmation", move |ctx: ContextData<OrderCtxData>| {
    let notifier = notifier.clone();
    async move {
      let (email, order_id) = {
        let guard = ctx.read();
        let order_id = guard
          .order
          .as_ref()
          .map(|o| o.id)
          .ok_or_else(|| AppError::Internal("order missing after a successful run".to_string()))?;
        (guard.customer_email.clone(), order_id)
      };
      let notice = notifier.send(&email, &format!("Your order {}", order_id)).await?;
      ctx.write().confirmation_id = Some(notice.message_id);
      Ok::<_, AppError>(())
    }
  })?;

  p.task("200-record-analytics", |ctx: ContextData<OrderCtxData>| async move {
    let guard = ctx.read();
    info!(
      lines = guard.reserved.len(),
      total_cents = guard.order.as_ref().map_or(0, |o| o.total_cents),
      reservation_attempts = guard.reservation_attempts,
      confirmation_sent = guard.confirmation_id.is_some(),
      "Order analytics recorded."
    );
    anyhow::Ok(())
  })?;

  app_state.registry.register(CREATE_ORDER, p)?;
  Ok(())
}
