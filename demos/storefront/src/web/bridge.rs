// demos/storefront/src/web/bridge.rs

//! Converts between actix-web's request/response types and pipewright's.
//! actix-web carries its own `http` types, so methods, statuses and headers
//! cross over as strings and numbers.

use crate::errors::{AppError, Result as AppResult};
use crate::state::AppState;
use actix_web::{web, HttpRequest, HttpResponse};
use pipewright::{HeaderName, HeaderValue, Method, Request, Response, ResponseSnapshot};
use std::collections::HashMap;
use tracing::{error, info, instrument, warn};

pub fn to_pipeline_request(req: &HttpRequest, body: &web::Bytes) -> AppResult<Request> {
  let method = Method::from_bytes(req.method().as_str().as_bytes())
    .map_err(|e| AppError::Validation(format!("unsupported method: {}", e)))?;
  let mut request = Request::new(method, req.path());

  for (name, value) in req.match_info().iter() {
    request.params.insert(name.to_string(), value.to_string());
  }

  let query = web::Query::<HashMap<String, String>>::from_query(req.query_string())
    .map_err(|e| AppError::Validation(format!("invalid query string: {}", e)))?;
  request.query = query.into_inner();

  for (name, value) in req.headers().iter() {
    match (
      HeaderName::from_bytes(name.as_str().as_bytes()),
      HeaderValue::from_bytes(value.as_bytes()),
    ) {
      (Ok(name), Ok(value)) => {
        request.headers.append(name, value);
      }
      _ => warn!(header = %name, "Dropping header that could not be converted."),
    }
  }

  if !body.is_empty() {
    request.body =
      serde_json::from_slice(body).map_err(|e| AppError::Validation(format!("request body is not JSON: {}", e)))?;
  }
  Ok(request)
}

pub fn to_http_response(snapshot: ResponseSnapshot) -> HttpResponse {
  if !snapshot.finalized {
    error!("Pipeline returned without a finalized response.");
    return HttpResponse::InternalServerError().finish();
  }
  let status = actix_web::http::StatusCode::from_u16(snapshot.status.as_u16())
    .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);
  let mut builder = HttpResponse::build(status);
  for (name, value) in snapshot.headers.iter() {
    if let Ok(value) = value.to_str() {
      builder.insert_header((name.as_str(), value));
    }
  }
  builder.body(snapshot.body)
}

/// Runs the pipeline registered under `route` for this actix request.
#[instrument(name = "bridge::dispatch", skip(app_state, req, body), fields(path = %req.path()))]
pub async fn dispatch(app_state: &AppState, route: &str, req: HttpRequest, body: web::Bytes) -> AppResult<HttpResponse> {
  let request = to_pipeline_request(&req, &body)?;
  let response = Response::new();
  let report = app_state.registry.dispatch(route, request, response.clone()).await?;

  info!(
    outcome = report.outcome.label(),
    restarts = report.restarts,
    status = response.status().as_u16(),
    "Pipeline finished."
  );

  if let Some(background) = report.background {
    let route = route.to_string();
    tokio::spawn(async move {
      match background.wait().await {
        Ok(batch) => info!(%route, succeeded = batch.succeeded(), failed = batch.failed(), "Background tasks done."),
        Err(e) => error!(%route, error = %e, "Background tasks did not finish."),
      }
    });
  }

  Ok(to_http_response(response.snapshot()))
}
