// pipewright/src/pipeline/fallback.rs

//! The process-wide fallback handler: last stop for failures no pipeline
//! handler resolved.

use crate::core::http::{Request, Response};
use crate::error::{HttpError, PipelineError};
use serde_json::{json, Map, Value};
use tracing::{event, Level};

pub trait FallbackHandler: Send + Sync {
  /// Produces the failure response for `error`.
  fn handle(&self, error: &PipelineError, request: &Request, response: &Response);
}

impl<F> FallbackHandler for F
where
  F: Fn(&PipelineError, &Request, &Response) + Send + Sync,
{
  fn handle(&self, error: &PipelineError, request: &Request, response: &Response) {
    self(error, request, response)
  }
}

/// Writes a structured JSON error body:
///
/// ```json
/// {"error": {"message": "...", "status": 500, "code": "...", "details": {},
///            "step": {"order": 200, "name": "200-charge"}, "stack": ["..."]}}
/// ```
///
/// `code` and `details` come from an [`HttpError`] source; `stack` (the cause
/// chain) is omitted in production.
#[derive(Debug, Clone, Default)]
pub struct DefaultFallback {
  pub production: bool,
}

impl DefaultFallback {
  pub fn new(production: bool) -> Self {
    Self { production }
  }

  pub fn body(&self, error: &PipelineError) -> Value {
    let mut obj = Map::new();
    obj.insert("message".to_string(), Value::String(error.message()));
    obj.insert("status".to_string(), json!(error.status().as_u16()));

    if let Some(http_err) = error.downcast_ref::<HttpError>() {
      if let Some(code) = &http_err.code {
        obj.insert("code".to_string(), Value::String(code.clone()));
      }
      if let Some(details) = &http_err.details {
        obj.insert("details".to_string(), details.clone());
      }
    }
    if let Some(step) = error.step() {
      obj.insert("step".to_string(), json!({ "order": step.order, "name": step.name }));
    }
    if !self.production {
      obj.insert("stack".to_string(), json!(error.chain()));
    }

    json!({ "error": Value::Object(obj) })
  }
}

impl FallbackHandler for DefaultFallback {
  fn handle(&self, error: &PipelineError, request: &Request, response: &Response) {
    if response.is_finalized() {
      event!(
        Level::ERROR,
        method = %request.method,
        path = %request.path,
        error = %error,
        "Failure after the response was finalized; nothing written."
      );
      return;
    }
    if let Err(e) = response.json(error.status(), &self.body(error)) {
      event!(Level::ERROR, error = %e, "Fallback handler could not write the error response.");
    }
  }
}
