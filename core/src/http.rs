//! HTTP request and response types shared by the builder, the transports and
//! the interpreter.
//!
//! # Design
//! `HttpRequest` is plain data so it can be built and inspected without any
//! I/O. `HttpResponse` owns its body as a reader: whoever consumes the
//! response by value also owns the underlying stream, and dropping the
//! response releases it.

use std::fmt;
use std::io::{Cursor, Read};
use std::str::FromStr;

use crate::error::ApiError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    /// Upper-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            _ => Err(ApiError::InvalidMethod(s.to_string())),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outbound HTTP request described as plain data.
///
/// Built by [`crate::request::build`] and handed to a [`crate::Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An inbound HTTP response whose body has not been read yet.
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    body: Box<dyn Read + Send>,
}

impl HttpResponse {
    pub fn from_reader(
        status: u16,
        headers: Vec<(String, String)>,
        body: Box<dyn Read + Send>,
    ) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Response with an in-memory body and no headers.
    pub fn from_bytes(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self::from_reader(status, Vec::new(), Box::new(Cursor::new(body.into())))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Read the whole body. The stream is released when `self` drops at the
    /// end of this call, whether or not the read succeeded.
    pub fn into_bytes(mut self) -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.body.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
