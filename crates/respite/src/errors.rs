//! Error types for the Respite client domain.
//!
//! [`RespiteError`] covers every condition that makes a single invocation
//! fail on the client side. Remote-side failures (HTTP error statuses and
//! application-level `error` fields) are deliberately absent: they are folded
//! into a normal [`crate::Response`] by the response normaliser.
//!
//! None of these errors is retried by the client. Configuration and signing
//! errors are raised before any I/O; a [`TransportError`] terminates the one
//! in-flight call.

use thiserror::Error;

use crate::ServiceName;

// ---------------------------------------------------------------------------
// Transport failures
// ---------------------------------------------------------------------------

/// Failure reported by a [`crate::Transport`] implementation.
///
/// Only network-level problems belong here. A response with an HTTP error
/// status is a successful transport round trip and must be returned as
/// [`crate::HttpResponse`] instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The connection to the remote could not be established.
    #[error("Failed to connect to {url}: {message}")]
    Connect {
        /// URL the request was addressed to.
        url: String,
        /// Description from the underlying HTTP stack.
        message: String,
    },

    /// The request did not complete within the transport's timeout.
    #[error("Request to {url} timed out")]
    Timeout {
        /// URL the request was addressed to.
        url: String,
    },

    /// Any other transport-level failure (TLS, malformed URL, body read).
    #[error("Transport failure: {message}")]
    Other {
        /// Description from the underlying HTTP stack.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Signing failures
// ---------------------------------------------------------------------------

/// Errors produced while preparing request authentication.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SigningError {
    /// Signing is enabled but no shared secret is configured.
    #[error("Signing is enabled for service '{service}' but no pass is configured")]
    MissingPass {
        /// Service whose configuration lacks a pass.
        service: ServiceName,
    },
}

// ---------------------------------------------------------------------------
// Client-level errors
// ---------------------------------------------------------------------------

/// Errors that prevent an invocation from producing a [`crate::Response`].
#[derive(Debug, Error)]
pub enum RespiteError {
    /// Neither `{service}_service` nor `{service}` exists in the configuration
    /// store (or the entry has no host) and no explicit host was supplied.
    #[error("No host configured for service '{service}' (tried '{service}_service' and '{service}')")]
    ConfigNotFound {
        /// Requested service name.
        service: ServiceName,
    },

    /// A brand is required for this service but none could be resolved.
    #[error("No brand configured for service '{service}'")]
    MissingBrand {
        /// Requested service name.
        service: ServiceName,
    },

    /// Request authentication could not be prepared.
    #[error(transparent)]
    Signing(#[from] SigningError),

    /// The transport failed before a response was received.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The caller supplied arguments that cannot form a request body.
    #[error("Invalid arguments: {message}")]
    InvalidArguments {
        /// Description of the problem.
        message: String,
    },

    /// The request body could not be serialised.
    #[error("Request body could not be serialised: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A non-error HTTP status carried a body that is not a JSON object.
    #[error("Malformed response (HTTP {status}): {message}")]
    MalformedResponse {
        /// HTTP status of the response.
        status: u16,
        /// Description of the decode failure.
        message: String,
    },
}

impl RespiteError {
    /// Returns `true` if the error arose from configuration resolution.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound { .. } | Self::MissingBrand { .. } | Self::Signing(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_not_found_names_both_keys() {
        let err = RespiteError::ConfigNotFound {
            service: ServiceName::new("billing").unwrap(),
        };
        let text = err.to_string();
        assert!(text.contains("billing_service"));
        assert!(text.contains("'billing'"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_transport_error_converts_transparently() {
        let err: RespiteError = TransportError::Timeout {
            url: "https://example.test/x".into(),
        }
        .into();
        assert_eq!(err.to_string(), "Request to https://example.test/x timed out");
        assert!(!err.is_configuration());
    }
}
