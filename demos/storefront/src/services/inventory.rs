// demos/storefront/src/services/inventory.rs

//! In-memory product inventory. Stands in for a database so the demo runs
//! without external services.

use crate::errors::{AppError, Result as AppResult};
use crate::models::{OrderLine, Product};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{info, warn};

pub struct InventoryService {
  products: RwLock<BTreeMap<String, Product>>,
  /// Every Nth reservation fails with `AppError::Unavailable`; 0 disables it.
  flaky_every: u32,
  reservations: AtomicU32,
  catalog_views: AtomicU32,
}

impl InventoryService {
  pub fn new(flaky_every: u32) -> Self {
    Self {
      products: RwLock::new(BTreeMap::new()),
      flaky_every,
      reservations: AtomicU32::new(0),
      catalog_views: AtomicU32::new(0),
    }
  }

  pub fn seed(&self) {
    let seed = [
      ("SKU-MUG", "Enamel mug", 1200, 25),
      ("SKU-TEE", "Logo t-shirt", 2500, 10),
      ("SKU-CAP", "Field cap", 1800, 0),
      ("SKU-BAG", "Canvas tote", 1500, 40),
    ];
    let mut products = self.products.write();
    for (sku, name, price_cents, stock) in seed {
      products.insert(
        sku.to_string(),
        Product {
          sku: sku.to_string(),
          name: name.to_string(),
          price_cents,
          stock,
        },
      );
    }
    info!(count = products.len(), "Inventory seeded.");
  }

  pub fn list(&self) -> Vec<Product> {
    self.products.read().values().cloned().collect()
  }

  pub fn get(&self, sku: &str) -> AppResult<Product> {
    self
      .products
      .read()
      .get(sku)
      .cloned()
      .ok_or_else(|| AppError::NotFound(format!("product '{}'", sku)))
  }

  /// Reserves every line or none. Fills in unit prices.
  pub async fn reserve(&self, lines: &[OrderLine]) -> AppResult<Vec<OrderLine>> {
    tokio::time::sleep(std::time::Duration::from_millis(5)).await; // Simulate network latency

    let call = self.reservations.fetch_add(1, Ordering::SeqCst) + 1;
    if self.flaky_every > 0 && call % self.flaky_every == 0 {
      warn!(call, "Simulated transient inventory failure.");
      return Err(AppError::Unavailable("inventory service timed out".to_string()));
    }

    let mut products = self.products.write();
    let mut priced = Vec::with_capacity(lines.len());
    for line in lines {
      let product = products
        .get(&line.sku)
        .ok_or_else(|| AppError::NotFound(format!("product '{}'", line.sku)))?;
      if product.stock < line.quantity {
        return Err(AppError::OutOfStock {
          sku: line.sku.clone(),
          requested: line.quantity,
          available: product.stock,
        });
      }
      priced.push(OrderLine {
        sku: line.sku.clone(),
        quantity: line.quantity,
        unit_price_cents: product.price_cents,
      });
    }
    for line in &priced {
      if let Some(product) = products.get_mut(&line.sku) {
        product.stock -= line.quantity;
      }
    }
    info!(lines = priced.len(), "Stock reserved.");
    Ok(priced)
  }

  pub fn record_catalog_view(&self) -> u32 {
    self.catalog_views.fetch_add(1, Ordering::SeqCst) + 1
  }
}
