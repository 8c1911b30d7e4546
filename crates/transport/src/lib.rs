//! Respite HTTPS transport adapter.
//!
//! Implements [`respite::Transport`] over `reqwest`'s blocking client with
//! rustls. Every invocation is a single POST; there is no retry here or in
//! the domain crate. Redirects are not followed; a 3xx status is returned to
//! the caller as-is.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Connection handling, TLS, and timeouts live here. The
//! [`respite`] crate sees only [`respite::Transport`].

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use respite::{HttpRequest, HttpResponse, Transport, TransportError};
use thiserror::Error;
use tracing::debug;

/// Default end-to-end request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for [`HttpsTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
    /// Skip certificate verification. Only for development endpoints.
    pub accept_invalid_certs: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: format!("respite-client/{}", env!("CARGO_PKG_VERSION")),
            accept_invalid_certs: false,
        }
    }
}

/// The HTTP client could not be constructed.
#[derive(Debug, Error)]
#[error("Failed to build HTTP client: {0}")]
pub struct TransportSetupError(#[from] reqwest::Error);

/// Blocking HTTPS transport.
#[derive(Debug, Clone)]
pub struct HttpsTransport {
    client: Client,
}

impl HttpsTransport {
    /// Builds a transport with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, TransportSetupError> {
        Self::with_config(&TransportConfig::default())
    }

    /// Builds a transport with explicit settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn with_config(config: &TransportConfig) -> Result<Self, TransportSetupError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .redirect(Policy::none())
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpsTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let headers = header_map(&request.headers)?;
        let response = self
            .client
            .post(&request.url)
            .headers(headers)
            .body(request.body.clone())
            .send()
            .map_err(|err| map_error(&request.url, &err))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|err| map_error(&request.url, &err))?
            .to_vec();
        debug!(url = %request.url, status, bytes = body.len(), "Received response");

        Ok(HttpResponse { status, body })
    }
}

/// Converts ordered header pairs into a `reqwest` header map.
pub fn header_map(headers: &[(String, String)]) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| TransportError::Other {
            message: format!("invalid header name '{name}': {err}"),
        })?;
        let value = HeaderValue::from_str(value).map_err(|err| TransportError::Other {
            message: format!("invalid value for header '{name}': {err}"),
        })?;
        map.append(name, value);
    }
    Ok(map)
}

fn map_error(url: &str, err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
        }
    } else if err.is_connect() {
        TransportError::Connect {
            url: url.to_string(),
            message: err.to_string(),
        }
    } else {
        TransportError::Other {
            message: err.to_string(),
        }
    }
}
