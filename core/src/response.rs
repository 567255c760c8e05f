//! Response interpretation: status classification and JSON body decoding.
//!
//! # Design
//! Every function here takes the `HttpResponse` by value, so the body stream
//! is dropped before returning on every path, including the early
//! status-based errors that never read it.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{ApiError, Result};
use crate::http::HttpResponse;

/// A decoded response body.
pub type JsonObject = Map<String, Value>;

/// Classify the status of `response` and decode its body.
///
/// Returns `Ok(None)` for a successful response with an empty body.
pub fn interpret(response: HttpResponse) -> Result<Option<JsonObject>> {
    let status = response.status;
    debug!(status, "interpreting response");

    match status {
        404 => return Err(ApiError::NotFound),
        204 => return Err(ApiError::AlreadyExists { status }),
        s if s >= 400 => {
            let body = read_body_string(response).unwrap_or_else(|e| {
                warn!(status, error = %e, "failed to read error response body");
                String::new()
            });
            return Err(ApiError::Http { status, body });
        }
        _ => {}
    }

    let body = response.into_bytes().map_err(ApiError::transport)?;
    if body.is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_slice(&body).map_err(|e| {
        warn!(status, error = %e, "response body is not valid JSON");
        ApiError::Decode(e.to_string())
    })?;
    expect_object(value).map(Some)
}

/// Unwrap a top-level JSON object, rejecting every other shape.
pub fn expect_object(value: Value) -> Result<JsonObject> {
    match value {
        Value::Object(map) => Ok(map),
        other => {
            let found = kind(&other);
            warn!(found, "response body is not a JSON object");
            Err(ApiError::UnexpectedShape { found })
        }
    }
}

/// Read the whole body as UTF-8 text, replacing invalid sequences.
pub fn read_body_string(response: HttpResponse) -> Result<String> {
    let bytes = response.into_bytes().map_err(ApiError::transport)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// True for 2xx statuses.
pub fn is_ok(status: u16) -> bool {
    status / 100 == 2
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
