//! Settings for [`HttpTransport`](crate::HttpTransport).

use http::StatusCode;
use std::time::Duration;

/// Statuses the transport raises as transport failures instead of handing
/// the response to the classifier.
///
/// Services behind a proxy report "try again" and "no such thing" as
/// failures of the exchange itself. Raising them here gives those responses
/// the same treatment: 500/503 are retried and never reach the rate
/// controller, and 404 follows the per-call [`NotFoundPolicy`].
///
/// [`NotFoundPolicy`]: crate::NotFoundPolicy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RaisedStatuses {
    /// 500 and 503 become `InternalServerError` and `ServiceUnavailable`
    pub transient: bool,
    /// 404 becomes `NotFound`
    pub not_found: bool,
}

impl RaisedStatuses {
    /// Every response is classified.
    pub const NONE: Self = Self {
        transient: false,
        not_found: false,
    };

    /// Proxy-style: transient and not-found statuses are raised.
    pub const PROXY: Self = Self {
        transient: true,
        not_found: true,
    };

    /// Whether a response with `status` is raised.
    pub fn raises(&self, status: StatusCode) -> bool {
        match status {
            StatusCode::INTERNAL_SERVER_ERROR | StatusCode::SERVICE_UNAVAILABLE => self.transient,
            StatusCode::NOT_FOUND => self.not_found,
            _ => false,
        }
    }
}

/// HTTP transport settings.
///
/// Request URLs are joined onto `base_url` when one is set, so `"users/1"`
/// under `https://api.example.com/v2/` targets `/v2/users/1` and an absolute
/// URL replaces the base entirely. Without a base every request URL must be
/// absolute.
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Base URL relative request URLs are resolved against
    pub base_url: Option<String>,
    /// Bound on one exchange, body included; an overrun is an I/O failure
    pub timeout: Duration,
    /// Bound on establishing a connection; an overrun is a connection reset
    pub connect_timeout: Duration,
    /// Headers sent with every request; request headers win on conflict
    pub default_headers: Vec<(String, String)>,
    /// `User-Agent` header value
    pub user_agent: String,
    /// Redirects followed before the response is returned as is; 0 disables
    pub max_redirects: usize,
    /// Statuses raised as transport failures
    pub raise: RaisedStatuses,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            default_headers: Vec::new(),
            user_agent: concat!("pacer-client/", env!("CARGO_PKG_VERSION")).to_string(),
            max_redirects: 10,
            raise: RaisedStatuses::NONE,
        }
    }
}

impl HttpTransportConfig {
    /// Start from the defaults.
    pub fn builder() -> HttpTransportConfigBuilder {
        HttpTransportConfigBuilder::default()
    }
}

/// Builder for [`HttpTransportConfig`].
#[derive(Debug, Default)]
pub struct HttpTransportConfigBuilder {
    config: HttpTransportConfig,
}

impl HttpTransportConfigBuilder {
    /// Resolve relative request URLs against `url`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Bound each exchange.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Bound connection setup.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Send `name: value` with every request.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.push((name.into(), value.into()));
        self
    }

    /// Override the `User-Agent`.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Follow at most `max` redirects.
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.config.max_redirects = max;
        self
    }

    /// Raise 500 and 503 responses as transient failures.
    pub fn raise_transient_status(mut self, raise: bool) -> Self {
        self.config.raise.transient = raise;
        self
    }

    /// Raise 404 responses as transport not-found failures.
    pub fn raise_not_found(mut self, raise: bool) -> Self {
        self.config.raise.not_found = raise;
        self
    }

    /// Replace the raised statuses wholesale.
    pub fn raise(mut self, raise: RaisedStatuses) -> Self {
        self.config.raise = raise;
        self
    }

    /// Finish.
    pub fn build(self) -> HttpTransportConfig {
        self.config
    }
}
