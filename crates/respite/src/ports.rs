//! Port traits the client depends on, plus in-memory implementations.
//!
//! Infrastructure crates implement [`Transport`] and [`ConfigStore`]; the
//! domain never reaches for the network, the filesystem, or process-wide
//! configuration on its own.
//!
//! | Port | Production implementation | In-memory implementation |
//! |------|---------------------------|--------------------------|
//! | [`Transport`] | `transport::HttpsTransport` | test doubles |
//! | [`ConfigStore`] | `settings::SharedSettings` | [`StaticConfigStore`] |
//! | [`Clock`] | [`SystemClock`] | [`FixedClock`] |

use std::collections::BTreeMap;

use chrono::Utc;

use crate::{Brand, ServiceEntry, TransportError};

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// A fully assembled HTTP POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Absolute URL, e.g. `https://host:443/path/method/brand`.
    pub url: String,
    /// Outgoing headers in the order they were added.
    pub headers: Vec<(String, String)>,
    /// The exact bytes that were signed.
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Returns the first header value with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Status and raw body returned by the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Performs one blocking HTTP POST.
///
/// Implementations own connection handling, TLS, and timeouts. An HTTP error
/// status is a successful round trip and must be returned as an
/// [`HttpResponse`]; only network-level failures map to [`TransportError`].
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

// ---------------------------------------------------------------------------
// Shared configuration store
// ---------------------------------------------------------------------------

/// Read-only view of the shared configuration store.
pub trait ConfigStore: Send + Sync {
    /// Returns the entry stored under exactly `key`, if any.
    fn service(&self, key: &str) -> Option<ServiceEntry>;

    /// Global brand used when neither the client nor the service entry
    /// names one.
    fn brand(&self) -> Option<Brand> {
        None
    }
}

/// A [`ConfigStore`] held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigStore {
    services: BTreeMap<String, ServiceEntry>,
    brand: Option<Brand>,
}

impl StaticConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the entry stored under `key`.
    pub fn with_service(mut self, key: impl Into<String>, entry: ServiceEntry) -> Self {
        self.services.insert(key.into(), entry);
        self
    }

    pub fn with_brand(mut self, brand: Brand) -> Self {
        self.brand = Some(brand);
        self
    }
}

impl ConfigStore for StaticConfigStore {
    fn service(&self, key: &str) -> Option<ServiceEntry> {
        self.services.get(key).cloned()
    }

    fn brand(&self) -> Option<Brand> {
        self.brand.clone()
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of the whole-second unix timestamp embedded in auth tokens.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Always returns the same timestamp.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.0
    }
}
