// pipewright/src/core/http.rs

//! The request/response interface the engine consumes from the host server.
//!
//! A host (actix-web, hyper, a test) converts its own request into a
//! [`Request`], hands the pipeline a fresh [`Response`] handle, and after the
//! run serializes [`Response::snapshot`] back onto the wire.

use crate::error::{WrightError, WrightResult};
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method, StatusCode};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Read-only view of an incoming request.
#[derive(Debug, Clone)]
pub struct Request {
  pub method: Method,
  pub path: String,
  pub params: HashMap<String, String>,
  pub query: HashMap<String, String>,
  pub headers: HeaderMap,
  /// Parsed body; `Value::Null` when the request carried none.
  pub body: Value,
}

impl Request {
  pub fn new(method: Method, path: impl Into<String>) -> Self {
    Self {
      method,
      path: path.into(),
      params: HashMap::new(),
      query: HashMap::new(),
      headers: HeaderMap::new(),
      body: Value::Null,
    }
  }

  pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.params.insert(name.into(), value.into());
    self
  }

  pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.query.insert(name.into(), value.into());
    self
  }

  pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
    self.headers.insert(name, value);
    self
  }

  pub fn with_body(mut self, body: Value) -> Self {
    self.body = body;
    self
  }

  pub fn param(&self, name: &str) -> Option<&str> {
    self.params.get(name).map(String::as_str)
  }

  pub fn query_param(&self, name: &str) -> Option<&str> {
    self.query.get(name).map(String::as_str)
  }

  /// Header value as text; `None` when absent or not visible ASCII.
  pub fn header(&self, name: &str) -> Option<&str> {
    self.headers.get(name).and_then(|value| value.to_str().ok())
  }
}

#[derive(Debug)]
struct ResponseState {
  status: StatusCode,
  headers: HeaderMap,
  body: Vec<u8>,
  finalized: bool,
}

impl Default for ResponseState {
  fn default() -> Self {
    Self {
      status: StatusCode::OK,
      headers: HeaderMap::new(),
      body: Vec::new(),
      finalized: false,
    }
  }
}

/// Shared handle to the response being built for one request.
///
/// Every step, the error handler and the fallback handler receive clones of the
/// same handle. Once finalized (by [`send`](Response::send),
/// [`json`](Response::json) or [`end`](Response::end)) further writes fail with
/// [`WrightError::ResponseFinalized`]; the executor polls
/// [`is_finalized`](Response::is_finalized) after every step.
#[derive(Debug, Clone, Default)]
pub struct Response(Arc<Mutex<ResponseState>>);

/// Owned copy of a response, for the host to put on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSnapshot {
  pub status: StatusCode,
  pub headers: HeaderMap,
  pub body: Vec<u8>,
  pub finalized: bool,
}

impl ResponseSnapshot {
  /// Body parsed as JSON, `None` if it is not valid JSON.
  pub fn json_body(&self) -> Option<Value> {
    serde_json::from_slice(&self.body).ok()
  }
}

impl Response {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_finalized(&self) -> bool {
    self.0.lock().finalized
  }

  pub fn status(&self) -> StatusCode {
    self.0.lock().status
  }

  pub fn set_status(&self, status: StatusCode) -> WrightResult<()> {
    let mut state = self.0.lock();
    if state.finalized {
      return Err(WrightError::ResponseFinalized);
    }
    state.status = status;
    Ok(())
  }

  pub fn insert_header(&self, name: &str, value: &str) -> WrightResult<()> {
    let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| WrightError::InvalidHeader {
      name: name.to_string(),
      message: e.to_string(),
    })?;
    let header_value = HeaderValue::from_str(value).map_err(|e| WrightError::InvalidHeader {
      name: name.to_string(),
      message: e.to_string(),
    })?;
    let mut state = self.0.lock();
    if state.finalized {
      return Err(WrightError::ResponseFinalized);
    }
    state.headers.insert(header_name, header_value);
    Ok(())
  }

  /// Writes status and body and finalizes the response.
  pub fn send(&self, status: StatusCode, body: impl Into<Vec<u8>>) -> WrightResult<()> {
    let mut state = self.0.lock();
    if state.finalized {
      return Err(WrightError::ResponseFinalized);
    }
    state.status = status;
    state.body = body.into();
    state.finalized = true;
    Ok(())
  }

  /// Serializes `value` as the JSON body and finalizes the response.
  pub fn json<T: Serialize + ?Sized>(&self, status: StatusCode, value: &T) -> WrightResult<()> {
    let body = serde_json::to_vec(value).map_err(|e| WrightError::Internal(format!("JSON body: {}", e)))?;
    let mut state = self.0.lock();
    if state.finalized {
      return Err(WrightError::ResponseFinalized);
    }
    state
      .headers
      .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    state.status = status;
    state.body = body;
    state.finalized = true;
    Ok(())
  }

  /// Finalizes the response with whatever status, headers and body it has.
  pub fn end(&self) -> WrightResult<()> {
    let mut state = self.0.lock();
    if state.finalized {
      return Err(WrightError::ResponseFinalized);
    }
    state.finalized = true;
    Ok(())
  }

  pub fn snapshot(&self) -> ResponseSnapshot {
    let state = self.0.lock();
    ResponseSnapshot {
      status: state.status,
      headers: state.headers.clone(),
      body: state.body.clone(),
      finalized: state.finalized,
    }
  }
}
