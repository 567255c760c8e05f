//! Blocking client core for a remote search-index management API.
//!
//! # Overview
//! Builds JSON-typed HTTP requests, sends them through
//! a pluggable [`Transport`], and interprets the responses into either a
//! decoded JSON object or a classified [`ApiError`].
//!
//! # Design
//! - `request::build` is pure: method, URI and body in, `HttpRequest` out.
//! - The transport is chosen once from configuration (direct client or the
//!   hosted fetch proxy) and injected into `TankClient`.
//! - `response::interpret` owns the response, so its body is always released.
//! - Index and document helpers live outside this crate and call
//!   [`TankClient::execute`].

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod query;
pub mod request;
pub mod response;
pub mod transport;

pub use client::{TankClient, NO_PARAMS};
pub use config::{ClientConfig, API_VERSION, USER_AGENT};
pub use error::{ApiError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use response::{expect_object, interpret, is_ok, read_body_string, JsonObject};
pub use transport::{DirectTransport, FetchProxyTransport, Transport, TransportKind};
