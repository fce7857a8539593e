// demos/storefront/src/models/mod.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
  pub sku: String,
  pub name: String,
  pub price_cents: u64,
  pub stock: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
  pub sku: String,
  pub quantity: u32,
  #[serde(default)]
  pub unit_price_cents: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Order {
  pub id: Uuid,
  pub customer_email: String,
  pub lines: Vec<OrderLine>,
  pub total_cents: u64,
  pub created_at: DateTime<Utc>,
}
