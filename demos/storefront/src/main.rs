// demos/storefront/src/main.rs

// Declare modules for the application
mod config;
mod errors;
mod models;
mod pipelines;
mod services;
mod state;
mod web;

use crate::config::AppConfig;
use crate::pipelines::fallback::StorefrontFallback;
use crate::services::inventory::InventoryService;
use crate::services::notifier::Notifier;
use crate::state::AppState;

use actix_web::{web as actix_data, App, HttpServer};
use pipewright::{Registry, Settings};
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan; // For span events in tracing

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  // JSON logs when LOG_FORMAT=json, human-readable otherwise; RUST_LOG overrides the level.
  let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
  let builder = tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE);
  if json_logs {
    builder.json().init();
  } else {
    builder.init();
  }

  tracing::info!("Starting storefront server...");

  // Load application configuration
  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
    }
  };

  let inventory = Arc::new(InventoryService::new(app_config.inventory_flaky_every));
  if app_config.seed_products {
    inventory.seed();
  }

  // Failures no pipeline handles get the storefront's error body.
  let engine_settings = Settings::from_env();
  let registry = Arc::new(Registry::with_fallback(StorefrontFallback::new(engine_settings.production)));

  let app_state = AppState {
    registry: registry.clone(),
    inventory,
    notifier: Arc::new(Notifier::new(app_config.notify_sender.clone())),
    config: app_config.clone(),
  };

  if let Err(e) = pipelines::register_all_pipelines(&app_state) {
    tracing::error!(error = %e, "Failed to register pipelines.");
    return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()));
  }

  // Configure and Start Actix Web Server
  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone())) // Share AppState with handlers
      .wrap(tracing_actix_web::TracingLogger::default()) // Actix middleware for tracing requests
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
