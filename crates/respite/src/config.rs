//! Client configuration: explicit overrides and shared-store entries.
//!
//! [`ClientConfig`] holds what the caller states explicitly when building a
//! client. [`ServiceEntry`] is what the shared configuration store knows about
//! one service. Both carry optional fields only; the merge into a
//! [`crate::ResolvedConnection`] happens in [`crate::resolver`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{Brand, Namespace, ServiceName};

// ---------------------------------------------------------------------------
// Secrets
// ---------------------------------------------------------------------------

/// Shared secret used to authenticate requests.
///
/// `Debug` output is redacted so the pass never reaches logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pass(String);

impl Pass {
    /// Wraps a shared secret.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the secret. Callers must not log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Pass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Pass(***)")
    }
}

// ---------------------------------------------------------------------------
// Option types
// ---------------------------------------------------------------------------

/// Where the md5-pass digest travels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Md5Placement {
    /// In the `X-Respite-Auth` header.
    #[default]
    Header,
    /// In the request body under `x_api_auth`; no auth header is sent.
    Body,
}

/// Resolved signing behaviour for a client.
///
/// Standard and md5-pass signing are mutually exclusive; resolution collapses
/// the two configuration flags into exactly one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningMode {
    /// No auth token is produced.
    Disabled,
    /// Per-request signature over the exact body bytes.
    Standard,
    /// Bare digest of the pass, placed as configured.
    Md5Pass(Md5Placement),
}

/// Which methods take byte-encoded string arguments that must be decoded to
/// text before serialisation.
///
/// Deserialises from either a boolean (`utf8_encoded = true`) or a list of
/// method names (`utf8_encoded = ["search", "rename"]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Utf8Encoding {
    /// Applies to every method when `true`, to none when `false`.
    Global(bool),
    /// Applies only to the listed methods.
    Methods(BTreeSet<String>),
}

impl Default for Utf8Encoding {
    fn default() -> Self {
        Self::Global(false)
    }
}

impl Utf8Encoding {
    /// Returns `true` if arguments for `method` must be decoded.
    pub fn applies_to(&self, method: &str) -> bool {
        match self {
            Self::Global(enabled) => *enabled,
            Self::Methods(methods) => methods.contains(method),
        }
    }
}

/// Source of a reserved meta value (`_i`, `_w`, `_t`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MetaSource {
    /// Taken from the ambient context (environment or service entry).
    #[default]
    Ambient,
    /// Always this value.
    Fixed(String),
    /// Never sent.
    Suppressed,
}

impl MetaSource {
    /// Applies this source to an ambient value.
    pub fn select(&self, ambient: Option<&str>) -> Option<String> {
        match self {
            Self::Ambient => ambient.map(str::to_string),
            Self::Fixed(value) => Some(value.clone()),
            Self::Suppressed => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared-store entry
// ---------------------------------------------------------------------------

/// Connection parameters for one service as held by the shared configuration
/// store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceEntry {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub path: Option<String>,
    pub namespace: Option<Namespace>,
    pub brand: Option<Brand>,
    pub use_ssl: Option<bool>,
    pub sign: Option<bool>,
    pub pass: Option<Pass>,
    pub md5_pass: Option<bool>,
    pub md5_placement: Option<Md5Placement>,
    pub flat: Option<bool>,
    pub trace: Option<bool>,
    pub brand_required: Option<bool>,
    pub utf8_encoded: Option<Utf8Encoding>,
    pub admin_token: Option<String>,
}

// ---------------------------------------------------------------------------
// Explicit client configuration
// ---------------------------------------------------------------------------

/// Explicit per-client settings.
///
/// Every `Some` field overrides the shared-store entry and the built-in
/// default. Built once per client and never changed afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub service: ServiceName,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub path: Option<String>,
    pub namespace: Option<Namespace>,
    pub brand: Option<Brand>,
    pub use_ssl: Option<bool>,
    pub sign: Option<bool>,
    pub pass: Option<Pass>,
    pub md5_pass: Option<bool>,
    pub md5_placement: Option<Md5Placement>,
    pub flat: Option<bool>,
    pub trace: Option<bool>,
    pub brand_required: Option<bool>,
    pub utf8_encoded: Option<Utf8Encoding>,
    pub remote_ip: MetaSource,
    pub remote_user: MetaSource,
    pub admin_token: MetaSource,
    /// Emit URL and headers to the `respite::wire` target before each send.
    /// Falls back to the `RESPITE_DEBUG_HTTP` environment variable.
    pub diagnostics: Option<bool>,
}

impl ClientConfig {
    /// Creates a configuration with no explicit overrides.
    pub fn new(service: ServiceName) -> Self {
        Self {
            service,
            host: None,
            port: None,
            path: None,
            namespace: None,
            brand: None,
            use_ssl: None,
            sign: None,
            pass: None,
            md5_pass: None,
            md5_placement: None,
            flat: None,
            trace: None,
            brand_required: None,
            utf8_encoded: None,
            remote_ip: MetaSource::Ambient,
            remote_user: MetaSource::Ambient,
            admin_token: MetaSource::Ambient,
            diagnostics: None,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_namespace(mut self, namespace: Namespace) -> Self {
        self.namespace = Some(namespace);
        self
    }

    pub fn with_brand(mut self, brand: Brand) -> Self {
        self.brand = Some(brand);
        self
    }

    pub fn with_ssl(mut self, use_ssl: bool) -> Self {
        self.use_ssl = Some(use_ssl);
        self
    }

    pub fn with_signing(mut self, sign: bool) -> Self {
        self.sign = Some(sign);
        self
    }

    pub fn with_pass(mut self, pass: Pass) -> Self {
        self.pass = Some(pass);
        self
    }

    /// Switches to md5-pass mode with the given digest placement.
    pub fn with_md5_pass(mut self, placement: Md5Placement) -> Self {
        self.md5_pass = Some(true);
        self.md5_placement = Some(placement);
        self
    }

    pub fn with_flat(mut self, flat: bool) -> Self {
        self.flat = Some(flat);
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = Some(trace);
        self
    }

    pub fn with_brand_required(mut self, required: bool) -> Self {
        self.brand_required = Some(required);
        self
    }

    pub fn with_utf8_encoded(mut self, encoding: Utf8Encoding) -> Self {
        self.utf8_encoded = Some(encoding);
        self
    }

    pub fn with_remote_ip(mut self, source: MetaSource) -> Self {
        self.remote_ip = source;
        self
    }

    pub fn with_remote_user(mut self, source: MetaSource) -> Self {
        self.remote_user = source;
        self
    }

    pub fn with_admin_token(mut self, source: MetaSource) -> Self {
        self.admin_token = source;
        self
    }

    pub fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = Some(enabled);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_debug_is_redacted() {
        let pass = Pass::new("jdDU&9dk1S");
        assert_eq!(format!("{pass:?}"), "Pass(***)");
        assert_eq!(pass.expose(), "jdDU&9dk1S");
    }

    #[test]
    fn test_utf8_encoding_global_and_per_method() {
        assert!(!Utf8Encoding::default().applies_to("anything"));
        assert!(Utf8Encoding::Global(true).applies_to("anything"));

        let per_method = Utf8Encoding::Methods(["search".to_string()].into_iter().collect());
        assert!(per_method.applies_to("search"));
        assert!(!per_method.applies_to("rename"));
    }

    #[test]
    fn test_utf8_encoding_deserialises_from_bool_or_list() {
        let global: Utf8Encoding = serde_json::from_str("true").unwrap();
        assert_eq!(global, Utf8Encoding::Global(true));

        let list: Utf8Encoding = serde_json::from_str(r#"["a","b"]"#).unwrap();
        assert!(list.applies_to("a"));
        assert!(list.applies_to("b"));
    }

    #[test]
    fn test_meta_source_select() {
        assert_eq!(MetaSource::Ambient.select(Some("10.0.0.1")), Some("10.0.0.1".into()));
        assert_eq!(MetaSource::Ambient.select(None), None);
        assert_eq!(MetaSource::Fixed("x".into()).select(Some("y")), Some("x".into()));
        assert_eq!(MetaSource::Suppressed.select(Some("y")), None);
    }

    #[test]
    fn test_service_entry_deserialises_partial_tables() {
        let entry: ServiceEntry =
            serde_json::from_str(r#"{"host":"svc.example.test","md5_placement":"body"}"#).unwrap();
        assert_eq!(entry.host.as_deref(), Some("svc.example.test"));
        assert_eq!(entry.md5_placement, Some(Md5Placement::Body));
        assert_eq!(entry.port, None);
    }
}
