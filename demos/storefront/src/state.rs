// demos/storefront/src/state.rs
use crate::config::AppConfig;
use crate::services::inventory::InventoryService;
use crate::services::notifier::Notifier;
use pipewright::Registry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub registry: Arc<Registry>,
  pub inventory: Arc<InventoryService>,
  pub notifier: Arc<Notifier>,
  pub config: Arc<AppConfig>, // Share loaded config
}
