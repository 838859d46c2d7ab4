//! Request description handed to the transport.

use crate::error::{ClientError, ClientResult};
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use tracing::warn;

/// How a transport-level "not found" is reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NotFoundPolicy {
    /// Treat it as a successful call with nothing to return
    #[default]
    Absent,
    /// Report it as `NOTFOUND`
    Report,
}

/// Per-call options carried with the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Handling of a transport "not found"
    pub not_found: NotFoundPolicy,
    /// Overrides the runtime's choice of whether `NOTFOUND` slows the rate
    pub count_not_found_as_failure: Option<bool>,
}

/// A remote call, ready to be executed (and re-executed on retry).
#[derive(Debug, Clone)]
pub struct RequestSpec {
    method: Method,
    url: String,
    headers: HeaderMap,
    body: Option<Bytes>,
    description: Option<String>,
    options: CallOptions,
}

impl RequestSpec {
    /// Create a request.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
            description: None,
            options: CallOptions::default(),
        }
    }

    /// Create a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Create a POST request.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Create a PUT request.
    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    /// Create a PATCH request.
    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::PATCH, url)
    }

    /// Create a DELETE request.
    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Add a header. Names or values that are not valid HTTP are skipped.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        match (
            HeaderName::try_from(name.as_ref()),
            HeaderValue::try_from(value.as_ref()),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => warn!(header = name.as_ref(), "Skipping invalid header"),
        }
        self
    }

    /// Add multiple headers.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Set the raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set a JSON body.
    pub fn json<T: Serialize>(mut self, json: &T) -> ClientResult<Self> {
        let bytes = serde_json::to_vec(json)
            .map_err(|e| ClientError::InvalidRequest(format!("JSON body: {e}")))?;
        self.headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self.body = Some(Bytes::from(bytes));
        Ok(self)
    }

    /// Name the target for logs and error messages.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Choose how a transport "not found" is reported.
    pub fn not_found(mut self, policy: NotFoundPolicy) -> Self {
        self.options.not_found = policy;
        self
    }

    /// Override whether `NOTFOUND` counts against the rate for this call.
    pub fn count_not_found_as_failure(mut self, count: bool) -> Self {
        self.options.count_not_found_as_failure = Some(count);
        self
    }

    /// Replace all call options.
    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Absolute URL or a path relative to the transport's base URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Request headers.
    pub fn header_map(&self) -> &HeaderMap {
        &self.headers
    }

    /// Request body.
    pub fn body_bytes(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Call options.
    pub fn options(&self) -> CallOptions {
        self.options
    }

    /// Human-readable target; `"METHOD url"` unless set.
    pub fn description(&self) -> String {
        match &self.description {
            Some(description) => description.clone(),
            None => format!("{} {}", self.method, self.url),
        }
    }
}
