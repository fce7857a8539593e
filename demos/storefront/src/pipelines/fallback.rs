// demos/storefront/src/pipelines/fallback.rs

use crate::errors::AppError;
use pipewright::{DefaultFallback, FallbackHandler, PipelineError, Request, Response};
use serde_json::json;
use tracing::error;

/// Maps `AppError` failures to their own status and code; everything else
/// gets the engine's default JSON body.
pub struct StorefrontFallback {
  default: DefaultFallback,
}

impl StorefrontFallback {
  pub fn new(production: bool) -> Self {
    Self {
      default: DefaultFallback::new(production),
    }
  }
}

impl FallbackHandler for StorefrontFallback {
  fn handle(&self, err: &PipelineError, request: &Request, response: &Response) {
    let Some(app_err) = err.downcast_ref::<AppError>() else {
      return self.default.handle(err, request, response);
    };
    if response.is_finalized() {
      error!(path = %request.path, error = %app_err, "Failure after the response was sent.");
      return;
    }

    let status = app_err.status();
    let body = json!({
      "error": {
        "message": app_err.to_string(),
        "code": app_err.code(),
        "status": status.as_u16(),
        "step": err.step().map(|s| s.name.clone()),
      }
    });
    if let Err(e) = response.json(status, &body) {
      error!(error = %e, "Could not write the error response.");
    }
  }
}
