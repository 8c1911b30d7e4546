//! Response normalisation.
//!
//! HTTP-level failures and application-level `error` fields end up in the same
//! shape: a decoded JSON object carrying an `error` key. Callers check one
//! indicator regardless of where a failure originated.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::RespiteError;

/// Key the remote uses to signal an application-level failure.
pub const ERROR_KEY: &str = "error";

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// A decoded response object with explicit accessors.
///
/// Wraps the decoded map without copying or mutating it.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    data: Map<String, Value>,
}

impl Reply {
    pub fn new(data: Map<String, Value>) -> Self {
        Self { data }
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// The `error` value, if the response signals failure.
    pub fn error(&self) -> Option<&Value> {
        self.data.get(ERROR_KEY)
    }

    pub fn is_error(&self) -> bool {
        self.data.contains_key(ERROR_KEY)
    }

    /// Human-readable form of the `error` value.
    pub fn error_message(&self) -> Option<String> {
        self.error().map(|value| match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.data
    }
}

/// Outcome of a successful invocation.
///
/// `Flat` hands back the decoded map as-is; `Wrapped` exposes it through
/// [`Reply`]. Both forms answer [`Response::is_error`] the same way.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Flat(Map<String, Value>),
    Wrapped(Reply),
}

impl Response {
    pub fn as_map(&self) -> &Map<String, Value> {
        match self {
            Self::Flat(map) => map,
            Self::Wrapped(reply) => reply.as_map(),
        }
    }

    pub fn into_map(self) -> Map<String, Value> {
        match self {
            Self::Flat(map) => map,
            Self::Wrapped(reply) => reply.into_map(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().get(key)
    }

    pub fn is_error(&self) -> bool {
        self.as_map().contains_key(ERROR_KEY)
    }

    /// Returns the wrapped form, if this response was not flat.
    pub fn as_reply(&self) -> Option<&Reply> {
        match self {
            Self::Wrapped(reply) => Some(reply),
            Self::Flat(_) => None,
        }
    }

    /// Decodes the response object into a caller-defined type.
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.into_map()))
    }
}

// ---------------------------------------------------------------------------
// Normaliser
// ---------------------------------------------------------------------------

/// Turns a transport status and body into a [`Response`].
pub struct ResponseNormalizer;

impl ResponseNormalizer {
    /// Normalises one response.
    ///
    /// - Status `>= 400` always yields an object with an `error` key; the
    ///   decoded body is kept when it is a JSON object, otherwise the raw text
    ///   is carried under `body`.
    /// - Any other status must carry a JSON object; the `error` key is present
    ///   only if the remote put it there.
    ///
    /// # Errors
    ///
    /// [`RespiteError::MalformedResponse`] when a non-error status carries a
    /// body that is not a JSON object.
    pub fn normalize(status: u16, body: &[u8], flat: bool) -> Result<Response, RespiteError> {
        let decoded = serde_json::from_slice::<Value>(body);
        let data = if status >= 400 {
            let mut data = match decoded {
                Ok(Value::Object(map)) => map,
                _ => {
                    let mut map = Map::new();
                    map.insert(
                        "body".to_string(),
                        Value::String(String::from_utf8_lossy(body).into_owned()),
                    );
                    map
                }
            };
            data.entry(ERROR_KEY)
                .or_insert_with(|| Value::String(format!("HTTP {status}")));
            data.entry("status").or_insert_with(|| Value::from(status));
            debug!(status, "Remote returned HTTP error");
            data
        } else {
            match decoded {
                Ok(Value::Object(map)) => map,
                Ok(other) => {
                    return Err(RespiteError::MalformedResponse {
                        status,
                        message: format!("expected a JSON object, got {other}"),
                    })
                }
                Err(err) => {
                    return Err(RespiteError::MalformedResponse {
                        status,
                        message: err.to_string(),
                    })
                }
            }
        };

        if data.contains_key(ERROR_KEY) {
            debug!(status, "Remote signalled an error");
        }

        Ok(if flat {
            Response::Flat(data)
        } else {
            Response::Wrapped(Reply::new(data))
        })
    }
}
