//! Raw response returned by a transport.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};

/// Status, headers and fully read body of an HTTP exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl RawResponse {
    /// Create a response.
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Response with a status and body, no headers.
    ///
    /// # Panics
    ///
    /// Panics if `status` is outside 100..=999
    pub fn with_status(status: u16, body: impl Into<Bytes>) -> Self {
        let Ok(code) = StatusCode::from_u16(status) else {
            panic!("Invalid HTTP status code {status}");
        };
        Self::new(code, HeaderMap::new(), body)
    }

    /// Add a header. Invalid names or values are ignored.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            http::HeaderName::try_from(name),
            http::HeaderValue::try_from(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Get the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get the body.
    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Body as text, lossily decoded.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
