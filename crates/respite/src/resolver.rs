//! Resolution of per-service connection parameters.
//!
//! The store is consulted with `"{name}_service"` first and `"{name}"`
//! second; the first hit wins. Each field is then merged with the
//! precedence explicit override > service entry > built-in default.

use tracing::debug;

use crate::{
    Brand, ClientConfig, ConfigStore, MetaSource, MethodName, Namespace, Pass, RespiteError,
    ServiceEntry, SigningError, SigningMode, Utf8Encoding, SERVICE_SUFFIX,
};

/// Port used when neither the client nor the store specifies one.
pub const DEFAULT_PORT: u16 = 443;

/// Environment variable that enables wire diagnostics when the client does
/// not decide explicitly.
///
/// Diagnostics are `info` events on the `respite::wire` target. The installed
/// subscriber must admit that target for them to appear; a filter such as
/// `RUST_LOG=warn` hides them even when this variable is set.
pub const DIAGNOSTICS_ENV: &str = "RESPITE_DEBUG_HTTP";

/// Tracing target of the outgoing-request diagnostic event.
pub const DIAGNOSTICS_TARGET: &str = "respite::wire";

// ---------------------------------------------------------------------------
// Request path
// ---------------------------------------------------------------------------

/// The `/{path}/{method}/{brand}` component of a request URL. Without a
/// brand it is `/{path}/{method}`, with no trailing slash.
///
/// Its `Display` form is both the URL path and the path that is signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPath {
    pub path: String,
    pub method: MethodName,
    pub brand: Option<Brand>,
}

impl std::fmt::Display for RequestPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}/{}", self.path, self.method)?;
        if let Some(brand) = &self.brand {
            write!(f, "/{brand}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Resolved connection
// ---------------------------------------------------------------------------

/// Connection parameters derived once per client and cached.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConnection {
    /// Store key that matched, or the requested name when the host was explicit.
    pub service_key: String,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub brand: Option<Brand>,
    pub use_ssl: bool,
    pub namespace: Option<Namespace>,
    pub signing: SigningMode,
    pub pass: Option<Pass>,
    pub flat: bool,
    pub trace: bool,
    pub utf8_encoded: Utf8Encoding,
    pub remote_ip: MetaSource,
    pub remote_user: MetaSource,
    pub admin_token: Option<String>,
    pub diagnostics: bool,
}

impl ResolvedConnection {
    /// Builds the request path for a wire method name.
    pub fn request_path(&self, method: MethodName) -> RequestPath {
        RequestPath {
            path: self.path.clone(),
            method,
            brand: self.brand.clone(),
        }
    }

    /// Absolute URL for a request path.
    pub fn url(&self, path: &RequestPath) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        format!("{scheme}://{}:{}{path}", self.host, self.port)
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Merges explicit settings with the shared configuration store.
pub struct ConfigResolver<'a> {
    store: &'a dyn ConfigStore,
}

impl<'a> ConfigResolver<'a> {
    pub fn new(store: &'a dyn ConfigStore) -> Self {
        Self { store }
    }

    /// Finds the service entry, trying `"{name}_service"` before `"{name}"`.
    pub fn lookup(&self, config: &ClientConfig) -> Option<(String, ServiceEntry)> {
        config
            .service
            .lookup_keys()
            .into_iter()
            .find_map(|key| self.store.service(&key).map(|entry| (key, entry)))
    }

    /// Produces the [`ResolvedConnection`] for `config`.
    ///
    /// # Errors
    ///
    /// - [`RespiteError::ConfigNotFound`] when no host can be derived.
    /// - [`RespiteError::MissingBrand`] when a brand is required but absent.
    /// - [`SigningError::MissingPass`] when signing is on without a pass.
    pub fn resolve(&self, config: &ClientConfig) -> Result<ResolvedConnection, RespiteError> {
        let found = self.lookup(config);
        let (service_key, entry) = match found {
            Some((key, entry)) => {
                debug!(service = %config.service, key = %key, "Resolved service entry");
                (key, entry)
            }
            None => (config.service.as_str().to_string(), ServiceEntry::default()),
        };

        let host = config
            .host
            .clone()
            .or(entry.host)
            .ok_or_else(|| RespiteError::ConfigNotFound {
                service: config.service.clone(),
            })?;

        let port = config.port.or(entry.port).unwrap_or(DEFAULT_PORT);

        let path = config.path.clone().or(entry.path).unwrap_or_else(|| {
            service_key
                .strip_suffix(SERVICE_SUFFIX)
                .unwrap_or(&service_key)
                .to_string()
        });

        let brand_required = config.brand_required.or(entry.brand_required).unwrap_or(true);
        let brand = config.brand.clone().or(entry.brand).or_else(|| self.store.brand());
        if brand_required && brand.is_none() {
            return Err(RespiteError::MissingBrand {
                service: config.service.clone(),
            });
        }

        let pass = config.pass.clone().or(entry.pass);
        let sign = config.sign.or(entry.sign).unwrap_or(pass.is_some());
        let md5_pass = config.md5_pass.or(entry.md5_pass).unwrap_or(false);
        let signing = match (sign, md5_pass) {
            (false, _) => SigningMode::Disabled,
            (true, true) => SigningMode::Md5Pass(
                config
                    .md5_placement
                    .or(entry.md5_placement)
                    .unwrap_or_default(),
            ),
            (true, false) => SigningMode::Standard,
        };
        if signing != SigningMode::Disabled && pass.is_none() {
            return Err(SigningError::MissingPass {
                service: config.service.clone(),
            }
            .into());
        }

        let admin_token = config.admin_token.select(entry.admin_token.as_deref());

        Ok(ResolvedConnection {
            service_key,
            host,
            port,
            path,
            brand,
            use_ssl: config.use_ssl.or(entry.use_ssl).unwrap_or(true),
            namespace: config.namespace.clone().or(entry.namespace),
            signing,
            pass,
            flat: config.flat.or(entry.flat).unwrap_or(false),
            trace: config.trace.or(entry.trace).unwrap_or(true),
            utf8_encoded: config
                .utf8_encoded
                .clone()
                .or(entry.utf8_encoded)
                .unwrap_or_default(),
            remote_ip: config.remote_ip.clone(),
            remote_user: config.remote_user.clone(),
            admin_token,
            diagnostics: config.diagnostics.unwrap_or_else(diagnostics_from_env),
        })
    }
}

/// Reads [`DIAGNOSTICS_ENV`]; unset, empty, `0` and `false` mean off.
pub fn diagnostics_from_env() -> bool {
    diagnostics_from(std::env::var(DIAGNOSTICS_ENV).ok().as_deref())
}

/// Interprets a raw toggle value as read from [`DIAGNOSTICS_ENV`].
pub fn diagnostics_from(value: Option<&str>) -> bool {
    value.is_some_and(flag_enabled)
}

fn flag_enabled(value: &str) -> bool {
    let value = value.trim();
    !(value.is_empty() || value == "0" || value.eq_ignore_ascii_case("false"))
}
