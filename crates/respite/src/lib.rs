//! Client for invoking named methods on JSON-over-HTTPS Respite services.
//!
//! This crate owns the request-invocation pipeline: configuration resolution,
//! request assembly, request signing, and response normalisation. The HTTP
//! transport and the shared configuration store are ports; infrastructure
//! crates implement them.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate performs no network or
//! filesystem I/O. It defines *what* is needed; `transport` and `settings`
//! define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype names (`ServiceName`, `Brand`, `Namespace`, `MethodName`) |
//! | [`config`] | Explicit client settings and shared-store entries |
//! | [`ports`] | `Transport`, `ConfigStore`, `Clock` and in-memory implementations |
//! | [`resolver`] | Lookup fallback and field precedence → `ResolvedConnection` |
//! | [`request`] | Meta keys, utf8 decoding, one-shot body serialisation |
//! | [`signer`] | Standard and md5-pass auth tokens |
//! | [`response`] | Error folding and the `Response`/`Reply` result types |
//! | [`client`] | `RespiteClient::invoke`, the single entry point |
//! | [`errors`] | `RespiteError` and its component errors |
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use respite::{
//!     Brand, ClientConfig, HttpRequest, HttpResponse, RespiteClient, ServiceEntry,
//!     ServiceName, StaticConfigStore, Transport, TransportError,
//! };
//!
//! struct Echo;
//!
//! impl Transport for Echo {
//!     fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
//!         Ok(HttpResponse { status: 200, body: request.body.clone() })
//!     }
//! }
//!
//! # fn main() -> Result<(), respite::RespiteError> {
//! let store = StaticConfigStore::new().with_service(
//!     "billing_service",
//!     ServiceEntry { host: Some("billing.example.test".into()), ..Default::default() },
//! );
//! let config = ClientConfig::new(ServiceName::new("billing").unwrap())
//!     .with_brand(Brand::new("acme").unwrap());
//!
//! let client = RespiteClient::new(config, Arc::new(store), Arc::new(Echo));
//! let response = client.invoke_json("hello", serde_json::json!({ "name": "world" }))?;
//! assert!(!response.is_error());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod errors;
pub mod identifiers;
pub mod ports;
pub mod request;
pub mod resolver;
pub mod response;
pub mod signer;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use client::{RespiteClient, CONTENT_TYPE};
pub use config::{
    ClientConfig, Md5Placement, MetaSource, Pass, ServiceEntry, SigningMode, Utf8Encoding,
};
pub use errors::{RespiteError, SigningError, TransportError};
pub use identifiers::{Brand, MethodName, Namespace, ServiceName, SERVICE_SUFFIX};
pub use ports::{
    Clock, ConfigStore, FixedClock, HttpRequest, HttpResponse, StaticConfigStore, SystemClock,
    Transport,
};
pub use request::{
    args_from_value, caller_trace, decode_utf8_value, Args, Meta, MetaContext, Request,
    RequestBuilder, CMDLINE_REMOTE_IP, META_ADMIN_TOKEN, META_CALLER, META_REMOTE_IP,
    META_REMOTE_USER,
};
pub use resolver::{
    diagnostics_from, diagnostics_from_env, ConfigResolver, RequestPath, ResolvedConnection,
    DEFAULT_PORT, DIAGNOSTICS_ENV, DIAGNOSTICS_TARGET,
};
pub use response::{Reply, Response, ResponseNormalizer, ERROR_KEY};
pub use signer::{md5_hex, AuthToken, Signer, TokenKind, AUTH_HEADER, BODY_AUTH_KEY};
