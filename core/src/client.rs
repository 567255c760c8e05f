//! Index API client over a pluggable transport.
//!
//! # Design
//! `TankClient` holds its configuration and a shared `Transport` and nothing
//! else; every call builds its own request and consumes its own response, so
//! one client can be used from many threads at once. Higher-level index and
//! document helpers are expected to sit on top of [`TankClient::execute`].

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::config::{self, ClientConfig, API_VERSION};
use crate::error::Result;
use crate::http::{HttpMethod, HttpResponse};
use crate::query;
use crate::request;
use crate::response::{self, JsonObject};
use crate::transport::Transport;

/// Pass as `params` when a call has no query parameters.
pub const NO_PARAMS: [(&str, &str); 0] = [];

#[derive(Clone)]
pub struct TankClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

impl TankClient {
    /// Build a client using the transport selected by `config`.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = config.transport.clone().into_transport()?;
        Ok(Self::with_transport(config, Arc::from(transport)))
    }

    /// Build a client from the process-wide configuration.
    pub fn from_global() -> Result<Self> {
        Self::new(config::global().clone())
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    /// `<api_url>/v1/indexes/<name>`
    pub fn index_url(&self, name: &str) -> String {
        format!("{}/{API_VERSION}/indexes/{name}", self.config.api_url)
    }

    /// Build the request and hand it to the transport. The response is
    /// returned unread; status codes are not inspected.
    pub fn send<T>(&self, method: HttpMethod, uri: &str, data: Option<&T>) -> Result<HttpResponse>
    where
        T: Serialize + ?Sized,
    {
        let request = request::build(method, uri, data, &self.config.user_agent)?;
        debug!(transport = self.transport.name(), %method, uri, "sending request");
        self.transport.execute(request)
    }

    /// Append `params` to `url`, send, and interpret the response.
    pub fn execute<I, K, V, T>(
        &self,
        method: HttpMethod,
        url: &str,
        params: I,
        data: Option<&T>,
    ) -> Result<Option<JsonObject>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
        T: Serialize + ?Sized,
    {
        let uri = query::append(url, &query::encode(params));
        let response = self.send(method, &uri, data)?;
        response::interpret(response)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::error::ApiError;
    use crate::http::HttpRequest;

    /// Records every request and answers with a canned response.
    struct Recording {
        status: u16,
        body: &'static str,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl Recording {
        fn new(status: u16, body: &'static str) -> Arc<Self> {
            Arc::new(Self {
                status,
                body,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn last(&self) -> HttpRequest {
            self.seen.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl Transport for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
            self.seen.lock().unwrap().push(request);
            Ok(HttpResponse::from_bytes(self.status, self.body))
        }
    }

    fn client(transport: Arc<Recording>) -> TankClient {
        TankClient::with_transport(ClientConfig::new("http://api.test"), transport)
    }

    #[test]
    fn index_url_uses_api_version() {
        let c = client(Recording::new(200, ""));
        assert_eq!(c.index_url("myindex"), "http://api.test/v1/indexes/myindex");
    }

    #[test]
    fn get_with_params_appends_query_and_sends_no_body() {
        let transport = Recording::new(200, r#"{"matches":0}"#);
        let c = client(Arc::clone(&transport));
        let url = c.index_url("myindex");

        let decoded = c
            .execute::<_, _, _, ()>(HttpMethod::Get, &url, [("q", "hello world")], None)
            .unwrap()
            .unwrap();
        assert_eq!(decoded["matches"], 0);

        let sent = transport.last();
        assert_eq!(sent.method, HttpMethod::Get);
        assert_eq!(sent.uri, "http://api.test/v1/indexes/myindex?q=hello%20world");
        assert!(sent.body.is_none());
        assert_eq!(sent.header("content-type"), None);
    }

    #[test]
    fn put_sends_canonical_json_body() {
        let transport = Recording::new(201, r#"{"code":"ok"}"#);
        let c = client(Arc::clone(&transport));
        let url = c.index_url("myindex");

        let decoded = c
            .execute(HttpMethod::Put, &url, NO_PARAMS, Some(&json!({"size": "small"})))
            .unwrap();
        assert_eq!(decoded, json!({"code": "ok"}).as_object().cloned());

        let sent = transport.last();
        assert_eq!(sent.uri, url);
        assert_eq!(sent.header("content-type"), Some("application/json"));
        assert_eq!(sent.header("content-length"), Some("16"));
        assert_eq!(sent.body.as_deref(), Some(br#"{"size":"small"}"#.as_slice()));
    }

    #[test]
    fn method_name_is_parsed_case_insensitively() {
        let transport = Recording::new(200, "");
        let c = client(Arc::clone(&transport));
        let method: HttpMethod = "delete".parse().unwrap();
        let url = c.index_url("old");
        assert!(c.execute::<_, _, _, ()>(method, &url, NO_PARAMS, None).unwrap().is_none());
        assert_eq!(transport.last().method, HttpMethod::Delete);
    }

    #[test]
    fn status_errors_reach_the_caller() {
        let c = client(Recording::new(404, ""));
        let url = c.index_url("missing");
        let err = c.execute::<_, _, _, ()>(HttpMethod::Get, &url, NO_PARAMS, None).unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[test]
    fn serialization_failure_sends_nothing() {
        let transport = Recording::new(200, "");
        let c = client(Arc::clone(&transport));
        let mut bad = HashMap::new();
        bad.insert(vec![1u8], "non-string keys cannot become JSON object keys");

        let err = c.send(HttpMethod::Post, "http://api.test/v1/indexes/i", Some(&bad)).unwrap_err();
        assert!(matches!(err, ApiError::Serialization(_)));
        assert!(transport.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn configured_user_agent_is_sent() {
        let transport = Recording::new(200, "");
        let config = ClientConfig {
            user_agent: "indexer/2.0".to_string(),
            ..ClientConfig::new("http://api.test")
        };
        let c = TankClient::with_transport(config, Arc::clone(&transport) as Arc<dyn Transport>);
        c.send::<()>(HttpMethod::Get, "http://api.test/", None).unwrap();
        assert_eq!(transport.last().header("user-agent"), Some("indexer/2.0"));
    }

    #[test]
    fn client_is_shareable_across_threads() {
        let transport = Recording::new(200, r#"{"ok":true}"#);
        let c = client(Arc::clone(&transport));
        std::thread::scope(|s| {
            for i in 0..4 {
                let c = c.clone();
                s.spawn(move || {
                    let url = c.index_url(&format!("idx{i}"));
                    c.execute::<_, _, _, ()>(HttpMethod::Get, &url, NO_PARAMS, None).unwrap();
                });
            }
        });
        assert_eq!(transport.seen.lock().unwrap().len(), 4);
    }

    #[test]
    fn new_selects_transport_from_config() {
        let c = TankClient::new(ClientConfig::default()).unwrap();
        assert_eq!(c.transport_name(), "direct");
    }
}
