// demos/storefront/src/errors.rs

use actix_web::{HttpResponse, ResponseError};
use pipewright::{StatusCode, WrightError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Insufficient stock for '{sku}': requested {requested}, available {available}")]
  OutOfStock { sku: String, requested: u32, available: u32 },

  /// Transient upstream failure; safe to retry.
  #[error("Service Unavailable: {0}")]
  Unavailable(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Pipeline Error: {source}")]
  Pipeline {
    #[from] // Allows conversion from pipewright::WrightError
    source: WrightError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl AppError {
  pub fn status(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::OutOfStock { .. } => StatusCode::CONFLICT,
      AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
      AppError::Pipeline {
        source: WrightError::RouteNotFound { .. },
      } => StatusCode::NOT_FOUND,
      AppError::Config(_) | AppError::Pipeline { .. } | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  pub fn code(&self) -> &'static str {
    match self {
      AppError::Validation(_) => "VALIDATION",
      AppError::NotFound(_) => "NOT_FOUND",
      AppError::OutOfStock { .. } => "OUT_OF_STOCK",
      AppError::Unavailable(_) => "UNAVAILABLE",
      AppError::Config(_) => "CONFIG",
      AppError::Pipeline { .. } => "PIPELINE",
      AppError::Internal(_) => "INTERNAL",
    }
  }
}

// Errors raised outside a pipeline run (request conversion, unknown routes).
impl ResponseError for AppError {
  fn error_response(&self) -> HttpResponse {
    tracing::error!(application_error = %self, "Responding with error");
    let status = actix_web::http::StatusCode::from_u16(self.status().as_u16())
      .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::build(status).json(json!({
      "error": { "message": self.to_string(), "code": self.code(), "status": status.as_u16() }
    }))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
