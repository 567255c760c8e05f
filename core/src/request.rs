//! Outbound request construction.

use serde::Serialize;
use tracing::debug;

use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest};

/// Build the request for `method` on `uri`, encoding `data` as the JSON body.
///
/// `uri` must already carry any query string. Serialization failures are
/// returned before anything reaches a transport.
pub fn build<T>(method: HttpMethod, uri: &str, data: Option<&T>, user_agent: &str) -> Result<HttpRequest>
where
    T: Serialize + ?Sized,
{
    let body = data
        .map(|data| serde_json::to_vec(data).map_err(ApiError::Serialization))
        .transpose()?;
    let content_length = body.as_ref().map_or(0, Vec::len);

    let mut headers = Vec::with_capacity(3);
    if carries_json(method, content_length) {
        headers.push(("Content-Type".to_string(), "application/json".to_string()));
        headers.push(("Content-Length".to_string(), content_length.to_string()));
    }
    headers.push(("User-Agent".to_string(), user_agent.to_string()));

    debug!(%method, uri, content_length, "built request");
    Ok(HttpRequest {
        method,
        uri: uri.to_string(),
        headers,
        body,
    })
}

/// Writes always declare a JSON body; DELETE only when it has one.
fn carries_json(method: HttpMethod, content_length: usize) -> bool {
    match method {
        HttpMethod::Post | HttpMethod::Put => true,
        HttpMethod::Delete => content_length > 0,
        HttpMethod::Get => false,
    }
}
