// demos/storefront/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,

  /// Root of the discovered route directories (`<routes_dir>/products/steps`, ...).
  pub routes_dir: PathBuf,
  pub seed_products: bool,

  // Mock inventory behavior
  pub inventory_flaky_every: u32,

  // Order pipeline retry policy
  pub order_retry_attempts: u32,
  pub order_retry_delay: Duration,

  // Mock notifier config
  pub notify_sender: String,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };
    let parse_u32 = |var_name: &str, default: u32| -> Result<u32> {
      match get_env(var_name) {
        Ok(raw) => raw
          .parse::<u32>()
          .map_err(|e| AppError::Config(format!("Invalid {}: {}", var_name, e))),
        Err(_) => Ok(default),
      }
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;

    let routes_dir = get_env("ROUTES_DIR")
      .map(PathBuf::from)
      .unwrap_or_else(|_| PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/routes")));

    let seed_products = get_env("SEED_PRODUCTS")
      .unwrap_or_else(|_| "true".to_string())
      .parse::<bool>()
      .map_err(|e| AppError::Config(format!("Invalid SEED_PRODUCTS value: {}", e)))?;

    let inventory_flaky_every = parse_u32("INVENTORY_FLAKY_EVERY", 0)?;
    let order_retry_attempts = parse_u32("ORDER_RETRY_ATTEMPTS", 2)?;
    let order_retry_delay = Duration::from_millis(u64::from(parse_u32("ORDER_RETRY_DELAY_MS", 100)?));
    let notify_sender = get_env("NOTIFY_SENDER").unwrap_or_else(|_| "orders@example.com".to_string());

    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      routes_dir,
      seed_products,
      inventory_flaky_every,
      order_retry_attempts,
      order_retry_delay,
      notify_sender,
    })
  }
}
