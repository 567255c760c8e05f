//! Pluggable HTTP transports.
//!
//! # Design
//! The request builder never decides how bytes reach the network. A
//! `Transport` is picked once from [`TransportKind`] when the client is
//! configured and injected as a trait object; there is no runtime probing of
//! the environment. Both built-in transports use a blocking `ureq` agent with
//! status-as-error disabled, so every status code comes back as data and the
//! interpreter alone decides what is an error.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Header carrying the execution-context identifier on hosted requests.
pub const FETCH_CONTEXT_HEADER: &str = "X-Fetch-Context";

/// Header carrying the real target URI on hosted requests.
pub const FETCH_URL_HEADER: &str = "X-Fetch-Url";

/// Sends an `HttpRequest` and returns the unread `HttpResponse`.
///
/// Implementations must be safe to share between threads; each call builds
/// its own request and response.
pub trait Transport: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Which transport a client uses, fixed at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportKind {
    /// Connect straight to the API host.
    #[default]
    Direct,
    /// Route through the hosting environment's outbound fetch proxy.
    Hosted {
        proxy: String,
        #[serde(default)]
        context: Option<String>,
    },
}

impl TransportKind {
    pub fn into_transport(self) -> Result<Box<dyn Transport>> {
        match self {
            TransportKind::Direct => Ok(Box::new(DirectTransport::new())),
            TransportKind::Hosted { proxy, context } => {
                Ok(Box::new(FetchProxyTransport::new(&proxy, context)?))
            }
        }
    }
}

/// Plain `ureq` client connecting directly to the target host.
#[derive(Clone)]
pub struct DirectTransport {
    agent: ureq::Agent,
}

impl DirectTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for DirectTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for DirectTransport {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        run(&self.agent, request)
    }
}

/// Transport for hosted deployments.
///
/// Requests are sent to the fetch-proxy endpoint itself rather than tunnelled
/// through it, so the proxy sees the whole outer request: method, headers,
/// body, the target in `X-Fetch-Url` and the execution context in
/// `X-Fetch-Context`.
#[derive(Clone)]
pub struct FetchProxyTransport {
    agent: ureq::Agent,
    endpoint: String,
    context: Option<String>,
}

impl FetchProxyTransport {
    pub fn new(endpoint: &str, context: Option<String>) -> Result<Self> {
        let uri: ureq::http::Uri = endpoint
            .parse()
            .map_err(|e| ApiError::Config(format!("fetch proxy {endpoint}: {e}")))?;
        if !matches!(uri.scheme_str(), Some("http" | "https")) || uri.host().is_none() {
            return Err(ApiError::Config(format!(
                "fetch proxy {endpoint}: expected an absolute http(s) URL"
            )));
        }
        Ok(Self {
            agent: DirectTransport::new().agent,
            endpoint: endpoint.to_string(),
            context,
        })
    }

    /// Rewrite `request` into the outer request sent to the proxy endpoint.
    pub fn wrap(&self, request: HttpRequest) -> HttpRequest {
        let HttpRequest {
            method,
            uri,
            mut headers,
            body,
        } = request;
        headers.push((FETCH_URL_HEADER.to_string(), uri));
        if let Some(context) = &self.context {
            headers.push((FETCH_CONTEXT_HEADER.to_string(), context.clone()));
        }
        HttpRequest {
            method,
            uri: self.endpoint.clone(),
            headers,
            body,
        }
    }
}

impl Transport for FetchProxyTransport {
    fn name(&self) -> &'static str {
        "fetch-proxy"
    }

    fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!(target_uri = %request.uri, endpoint = %self.endpoint, "routing through fetch proxy");
        run(&self.agent, self.wrap(request))
    }
}

fn run(agent: &ureq::Agent, request: HttpRequest) -> Result<HttpResponse> {
    debug!(method = %request.method, uri = %request.uri, "dispatching request");

    let HttpRequest {
        method,
        uri,
        headers,
        body,
    } = request;

    // ureq derives Content-Length from the body it is given, which is the
    // same serialized buffer the header was computed from.
    let headers = headers
        .into_iter()
        .filter(|(k, _)| !k.eq_ignore_ascii_case("content-length"));

    let result = match method {
        HttpMethod::Get => {
            let mut builder = agent.get(uri.as_str());
            for (k, v) in headers {
                builder = builder.header(k, v);
            }
            builder.call()
        }
        HttpMethod::Delete => {
            let mut builder = agent.delete(uri.as_str());
            for (k, v) in headers {
                builder = builder.header(k, v);
            }
            match body {
                Some(body) if !body.is_empty() => builder.force_send_body().send(&body[..]),
                _ => builder.call(),
            }
        }
        HttpMethod::Post | HttpMethod::Put => {
            let mut builder = if method == HttpMethod::Post {
                agent.post(uri.as_str())
            } else {
                agent.put(uri.as_str())
            };
            for (k, v) in headers {
                builder = builder.header(k, v);
            }
            match body {
                Some(body) => builder.send(&body[..]),
                None => builder.send_empty(),
            }
        }
    };

    let response = result.map_err(ApiError::transport)?;
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
        .collect();
    let body = response.into_body().into_reader();

    debug!(status, "received response");
    Ok(HttpResponse::from_reader(status, headers, Box::new(body)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_is_the_default_kind() {
        assert_eq!(TransportKind::default(), TransportKind::Direct);
        let transport = TransportKind::default().into_transport().unwrap();
        assert_eq!(transport.name(), "direct");
    }

    #[test]
    fn hosted_kind_builds_fetch_proxy_transport() {
        let kind = TransportKind::Hosted {
            proxy: "http://127.0.0.1:3128".to_string(),
            context: Some("ctx-1".to_string()),
        };
        let transport = kind.into_transport().unwrap();
        assert_eq!(transport.name(), "fetch-proxy");
    }

    #[test]
    fn hosted_request_targets_the_proxy_endpoint() {
        let transport =
            FetchProxyTransport::new("http://fetch.internal:8080/fetch", Some("ctx-42".to_string()))
                .unwrap();
        let request = HttpRequest {
            method: HttpMethod::Put,
            uri: "http://api.example.test/v1/indexes/x?q=a%20b".to_string(),
            headers: vec![("User-Agent".to_string(), "tank-core/0".to_string())],
            body: Some(b"{}".to_vec()),
        };

        let outer = transport.wrap(request);
        assert_eq!(outer.method, HttpMethod::Put);
        assert_eq!(outer.uri, "http://fetch.internal:8080/fetch");
        assert_eq!(outer.header("x-fetch-url"), Some("http://api.example.test/v1/indexes/x?q=a%20b"));
        assert_eq!(outer.header("x-fetch-context"), Some("ctx-42"));
        assert_eq!(outer.header("user-agent"), Some("tank-core/0"));
        assert_eq!(outer.body.as_deref(), Some(b"{}".as_slice()));
    }

    #[test]
    fn hosted_request_without_context_omits_header() {
        let transport = FetchProxyTransport::new("http://fetch.internal/fetch", None).unwrap();
        let request = HttpRequest {
            method: HttpMethod::Get,
            uri: "http://api.example.test/v1/indexes".to_string(),
            headers: Vec::new(),
            body: None,
        };
        let outer = transport.wrap(request);
        assert_eq!(outer.header("x-fetch-context"), None);
        assert_eq!(outer.header("x-fetch-url"), Some("http://api.example.test/v1/indexes"));
    }

    #[test]
    fn relative_proxy_endpoint_is_rejected() {
        let err = FetchProxyTransport::new("/fetch", None).err().unwrap();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[test]
    fn kind_deserializes_from_tagged_json() {
        let kind: TransportKind =
            serde_json::from_str(r#"{"kind":"hosted","proxy":"http://fetch:80"}"#).unwrap();
        assert_eq!(
            kind,
            TransportKind::Hosted {
                proxy: "http://fetch:80".to_string(),
                context: None,
            }
        );
    }

    #[test]
    fn unreachable_host_is_a_transport_error() {
        let transport = DirectTransport::new();
        let request = HttpRequest {
            method: HttpMethod::Get,
            uri: "http://127.0.0.1:1/v1/indexes".to_string(),
            headers: Vec::new(),
            body: None,
        };
        let err = transport.execute(request).unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }
}
