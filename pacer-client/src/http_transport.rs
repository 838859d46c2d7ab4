//! reqwest-backed transport.

use crate::config::HttpTransportConfig;
use crate::error::{ClientError, ClientResult};
use crate::request::RequestSpec;
use crate::response::RawResponse;
use crate::transport::{Transport, TransportError};
use async_trait::async_trait;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use std::error::Error as StdError;
use std::io;
use std::sync::Arc;
use tracing::trace;
use url::Url;

/// [`Transport`] over a pooled `reqwest` client.
#[derive(Clone)]
pub struct HttpTransport {
    inner: reqwest::Client,
    base_url: Option<Url>,
    config: Arc<HttpTransportConfig>,
}

impl HttpTransport {
    /// Create a transport with the given configuration.
    pub fn new(config: HttpTransportConfig) -> ClientResult<Self> {
        let base_url = config
            .base_url
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(|e| ClientError::Config(format!("invalid base URL: {e}")))?;

        let mut default_headers = HeaderMap::new();
        for (name, value) in &config.default_headers {
            let name = HeaderName::try_from(name.as_str())
                .map_err(|e| ClientError::Config(format!("invalid header name {name:?}: {e}")))?;
            let value = HeaderValue::try_from(value.as_str())
                .map_err(|e| ClientError::Config(format!("invalid value for {name}: {e}")))?;
            default_headers.insert(name, value);
        }

        let redirect = match config.max_redirects {
            0 => reqwest::redirect::Policy::none(),
            max => reqwest::redirect::Policy::limited(max),
        };

        let inner = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .default_headers(default_headers)
            .redirect(redirect)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner,
            base_url,
            config: Arc::new(config),
        })
    }

    /// Get the underlying reqwest client.
    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }

    /// Get the transport configuration.
    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }

    /// Resolve a request URL against the base URL.
    fn build_url(&self, url: &str) -> Result<Url, url::ParseError> {
        match &self.base_url {
            Some(base) => base.join(url),
            None => Url::parse(url),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &RequestSpec) -> Result<RawResponse, TransportError> {
        let url = self.build_url(request.url()).map_err(TransportError::request)?;
        trace!(method = %request.method(), url = %url, "Sending request");

        let mut builder = self
            .inner
            .request(request.method().clone(), url)
            .headers(request.header_map().clone());
        if let Some(body) = request.body_bytes() {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(send_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(body_error)?;

        if self.config.raise.raises(status) {
            let report = format!("{} {}", status, String::from_utf8_lossy(&body))
                .trim_end()
                .to_string();
            trace!(%status, "Raising status as transport failure");
            return Err(match status {
                StatusCode::NOT_FOUND => TransportError::NotFound(report),
                StatusCode::INTERNAL_SERVER_ERROR => TransportError::InternalServerError(report),
                _ => TransportError::ServiceUnavailable(report),
            });
        }

        Ok(RawResponse::new(status, headers, body))
    }
}

/// Innermost I/O error kind behind a reqwest error.
fn io_kind(error: &reqwest::Error) -> Option<io::ErrorKind> {
    let mut source = error.source();
    while let Some(err) = source {
        if let Some(io_error) = err.downcast_ref::<io::Error>() {
            return Some(io_error.kind());
        }
        source = err.source();
    }
    None
}

fn send_error(error: reqwest::Error) -> TransportError {
    if error.is_builder() {
        return TransportError::request(error);
    }
    if error.is_timeout() {
        return TransportError::io(error);
    }
    if error.is_connect() {
        return TransportError::ConnectionReset(error.to_string());
    }
    match io_kind(&error) {
        Some(io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionRefused) => {
            TransportError::ConnectionReset(error.to_string())
        }
        Some(io::ErrorKind::ConnectionAborted | io::ErrorKind::UnexpectedEof | io::ErrorKind::BrokenPipe) => {
            TransportError::Aborted(error.to_string())
        }
        _ => TransportError::io(error),
    }
}

fn body_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        return TransportError::io(error);
    }
    match io_kind(&error) {
        Some(io::ErrorKind::ConnectionReset) => TransportError::ConnectionReset(error.to_string()),
        _ if error.is_body() || error.is_decode() => TransportError::Aborted(error.to_string()),
        _ => TransportError::io(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_creation() {
        let transport = HttpTransport::new(HttpTransportConfig::default()).unwrap();
        assert!(!transport.config().raise.not_found);
        assert_eq!(transport.config().max_redirects, 10);

        let config = HttpTransportConfig::builder().max_redirects(0).build();
        assert!(HttpTransport::new(config).is_ok());
    }

    #[test]
    fn test_invalid_base_url() {
        let config = HttpTransportConfig::builder().base_url("not a url").build();
        assert!(matches!(HttpTransport::new(config), Err(ClientError::Config(_))));
    }

    #[test]
    fn test_invalid_default_header() {
        let config = HttpTransportConfig::builder()
            .default_header("bad header", "x")
            .build();
        assert!(matches!(HttpTransport::new(config), Err(ClientError::Config(_))));
    }

    #[test]
    fn test_build_url() {
        let config = HttpTransportConfig::builder()
            .base_url("https://api.example.com/v1/")
            .build();
        let transport = HttpTransport::new(config).unwrap();

        assert_eq!(
            transport.build_url("users/1").unwrap().as_str(),
            "https://api.example.com/v1/users/1"
        );
        assert_eq!(
            transport.build_url("https://other.example.com/x").unwrap().as_str(),
            "https://other.example.com/x"
        );

        let bare = HttpTransport::new(HttpTransportConfig::default()).unwrap();
        assert!(bare.build_url("/relative").is_err());
    }

    #[tokio::test]
    async fn test_unparseable_url_is_request_error() {
        let transport = HttpTransport::new(HttpTransportConfig::default()).unwrap();
        let err = transport
            .execute(&RequestSpec::get("no-scheme"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Request { .. }));
    }
}
