//! The client-facing entry point.
//!
//! [`RespiteClient::invoke`] accepts any method name and an untyped argument
//! map, and runs the full pipeline:
//!
//! ```text
//! resolve (cached) → qualify method → build request → sign → send → normalise
//! ```
//!
//! Calls are blocking. A client has no internal locking beyond the one-time
//! connection cache; use one client per logical call path.

use std::panic::Location;
use std::sync::{Arc, OnceLock};

use serde_json::Value;
use tracing::{info, info_span, warn};

use crate::{
    args_from_value, caller_trace, Args, ClientConfig, Clock, ConfigResolver, ConfigStore,
    HttpRequest, Md5Placement, Meta, MetaContext, MethodName, RequestBuilder, ResolvedConnection,
    RespiteError, Response, ResponseNormalizer, Signer, SigningError, SigningMode, SystemClock,
    Transport, AUTH_HEADER, DIAGNOSTICS_TARGET,
};

/// Content type sent with every request.
pub const CONTENT_TYPE: &str = "x-application/json";

/// Invokes named methods on one remote service.
pub struct RespiteClient {
    config: ClientConfig,
    store: Arc<dyn ConfigStore>,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    ambient: Option<MetaContext>,
    connection: OnceLock<ResolvedConnection>,
}

impl RespiteClient {
    /// Creates a client. Nothing is resolved until the first call.
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn ConfigStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            config,
            store,
            transport,
            clock: Arc::new(SystemClock),
            ambient: None,
            connection: OnceLock::new(),
        }
    }

    /// Replaces the wall clock used for token timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Pins the ambient actor context instead of reading the environment on
    /// every call.
    pub fn with_meta_context(mut self, ambient: MetaContext) -> Self {
        self.ambient = Some(ambient);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Resolves the connection on first use and returns the cached value
    /// afterwards.
    pub fn connection(&self) -> Result<&ResolvedConnection, RespiteError> {
        if let Some(connection) = self.connection.get() {
            return Ok(connection);
        }
        let resolved = ConfigResolver::new(self.store.as_ref()).resolve(&self.config)?;
        Ok(self.connection.get_or_init(|| resolved))
    }

    /// Invokes `method` with a JSON value that must be an object (or null).
    #[track_caller]
    pub fn invoke_json(&self, method: &str, args: Value) -> Result<Response, RespiteError> {
        let caller = Location::caller();
        let args = args_from_value(args)?;
        self.invoke_at(method, args, caller)
    }

    /// Invokes `method` on the remote service.
    ///
    /// Remote failures, whether HTTP statuses or `error` fields, come back as
    /// an `Ok` [`Response`] whose [`Response::is_error`] is `true`.
    ///
    /// # Errors
    ///
    /// Configuration, signing, serialisation and transport failures.
    #[track_caller]
    pub fn invoke(&self, method: &str, args: Args) -> Result<Response, RespiteError> {
        self.invoke_at(method, args, Location::caller())
    }

    fn invoke_at(
        &self,
        requested: &str,
        args: Args,
        caller: &Location<'_>,
    ) -> Result<Response, RespiteError> {
        let span = info_span!("respite.invoke", service = %self.config.service, method = requested);
        let _guard = span.enter();

        let connection = self.connection()?;
        let method = MethodName::qualify(connection.namespace.as_ref(), requested);
        let path = connection.request_path(method.clone());
        let timestamp = self.clock.now();

        let ambient = match &self.ambient {
            Some(ambient) => ambient.clone(),
            None => MetaContext::from_env(),
        };
        let trace = connection.trace.then(|| caller_trace(caller, &method));
        let mut meta = Meta::assemble(connection, &ambient, trace);

        let pass = match connection.signing {
            SigningMode::Disabled => None,
            _ => Some(connection.pass.as_ref().ok_or_else(|| SigningError::MissingPass {
                service: self.config.service.clone(),
            })?),
        };

        if let (SigningMode::Md5Pass(Md5Placement::Body), Some(pass)) = (connection.signing, pass) {
            meta.body_auth = Some(Signer::md5_pass(pass, timestamp).value);
        }

        let request = RequestBuilder::new(connection).build(requested, method, args, &meta)?;

        let mut headers = vec![("Content-Type".to_string(), CONTENT_TYPE.to_string())];
        let token = match (connection.signing, pass) {
            (SigningMode::Standard, Some(pass)) => {
                Some(Signer::sign(&request.body, &path, pass, timestamp))
            }
            (SigningMode::Md5Pass(Md5Placement::Header), Some(pass)) => {
                Some(Signer::md5_pass(pass, timestamp))
            }
            _ => None,
        };
        if let Some(token) = token {
            headers.push((AUTH_HEADER.to_string(), token.header_value()));
        }

        let http_request = HttpRequest {
            url: connection.url(&path),
            headers,
            body: request.body,
        };

        if connection.diagnostics {
            info!(
                target: DIAGNOSTICS_TARGET,
                url = %http_request.url,
                headers = ?http_request.headers,
                "Sending request"
            );
        }

        let http_response = self.transport.send(&http_request).map_err(|err| {
            warn!(url = %http_request.url, error = %err, "Transport failed");
            RespiteError::Transport(err)
        })?;

        ResponseNormalizer::normalize(http_response.status, &http_response.body, connection.flat)
    }
}

impl std::fmt::Debug for RespiteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RespiteClient")
            .field("config", &self.config)
            .field("connection", &self.connection.get())
            .finish_non_exhaustive()
    }
}
