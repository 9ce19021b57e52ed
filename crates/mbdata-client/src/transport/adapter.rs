//! Transport trait and request/response types

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::TransportError;

/// HTTP methods used by the provider API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// A fully prepared outbound request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    /// Header name/value pairs, sent in order
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    /// Applies to both connecting and waiting for the response
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn get(url: Url, timeout: Duration) -> Self {
        Self {
            method: Method::Get,
            url,
            headers: Vec::new(),
            body: None,
            timeout,
        }
    }

    pub fn post(url: Url, body: impl Into<String>, timeout: Duration) -> Self {
        Self {
            method: Method::Post,
            url,
            headers: Vec::new(),
            body: Some(body.into()),
            timeout,
        }
    }

    /// Look up a header value (case-insensitive name match)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status code and raw body of a completed exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Transport-agnostic interface for provider HTTP traffic
///
/// A transport only moves bytes. Any status code is a successful
/// exchange at this level; status policy belongs to the dispatcher.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform the request and wait for the complete response
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}
