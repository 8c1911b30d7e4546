//! Request assembly: caller arguments merged with reserved meta keys and
//! serialised exactly once.
//!
//! The serialised body produced here is the byte sequence that is both signed
//! and transmitted. Nothing downstream re-encodes the argument map.

use std::panic::Location;

use serde_json::{Map, Value};

use crate::{MethodName, ResolvedConnection, RespiteError, BODY_AUTH_KEY};

/// Argument map of a remote call. Keys are unique and ordered.
pub type Args = Map<String, Value>;

/// Remote IP of the end user.
pub const META_REMOTE_IP: &str = "_i";
/// Remote user or actor.
pub const META_REMOTE_USER: &str = "_w";
/// Auth token for admin-level operations.
pub const META_ADMIN_TOKEN: &str = "_t";
/// Caller trace string.
pub const META_CALLER: &str = "_c";

/// Remote IP reported when no request context is available.
pub const CMDLINE_REMOTE_IP: &str = "cmdline";

// ---------------------------------------------------------------------------
// Ambient context
// ---------------------------------------------------------------------------

/// Actor information available from the surrounding process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaContext {
    pub remote_ip: Option<String>,
    pub remote_user: Option<String>,
}

impl MetaContext {
    /// Reads `REMOTE_ADDR` (default `cmdline`) and `REMOTE_USER`, falling back
    /// to the login name in `USER` or `USERNAME`.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|value| !value.is_empty());
        Self {
            remote_ip: Some(var("REMOTE_ADDR").unwrap_or_else(|| CMDLINE_REMOTE_IP.to_string())),
            remote_user: var("REMOTE_USER")
                .or_else(|| var("USER"))
                .or_else(|| var("USERNAME")),
        }
    }
}

/// Values for the reserved keys of one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Meta {
    pub remote_ip: Option<String>,
    pub remote_user: Option<String>,
    pub admin_token: Option<String>,
    pub caller: Option<String>,
    /// md5-pass digest carried in the body instead of a header.
    pub body_auth: Option<String>,
}

impl Meta {
    /// Assembles meta values from the connection settings and the ambient
    /// context. `caller` is dropped when trace is disabled.
    pub fn assemble(
        connection: &ResolvedConnection,
        ambient: &MetaContext,
        caller: Option<String>,
    ) -> Self {
        Self {
            remote_ip: connection.remote_ip.select(ambient.remote_ip.as_deref()),
            remote_user: connection.remote_user.select(ambient.remote_user.as_deref()),
            admin_token: connection.admin_token.clone(),
            caller: caller.filter(|_| connection.trace),
            body_auth: None,
        }
    }
}

/// Describes a call site for the `_c` meta key.
pub fn caller_trace(location: &Location<'_>, method: &MethodName) -> String {
    format!(
        "{}; {}; {}; {}",
        location.file(),
        location.line(),
        location.column(),
        method
    )
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// A request ready for signing and transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: MethodName,
    /// Arguments including the reserved meta keys.
    pub args: Args,
    /// Serialised `args`; the bytes that are signed and sent.
    pub body: Vec<u8>,
}

/// Merges arguments with meta values and serialises the result.
pub struct RequestBuilder<'a> {
    connection: &'a ResolvedConnection,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(connection: &'a ResolvedConnection) -> Self {
        Self { connection }
    }

    /// Builds the request for `method`.
    ///
    /// `requested` is the method name before namespace prefixing; per-method
    /// utf8 settings match either form. Meta keys already present in `args`
    /// are kept as supplied.
    pub fn build(
        &self,
        requested: &str,
        method: MethodName,
        args: Args,
        meta: &Meta,
    ) -> Result<Request, RespiteError> {
        let encoding = &self.connection.utf8_encoded;
        let mut args = if encoding.applies_to(requested) || encoding.applies_to(method.as_str()) {
            args.into_iter()
                .map(|(key, value)| (key, decode_utf8_value(value)))
                .collect()
        } else {
            args
        };

        let reserved = [
            (META_REMOTE_IP, &meta.remote_ip),
            (META_REMOTE_USER, &meta.remote_user),
            (META_ADMIN_TOKEN, &meta.admin_token),
            (META_CALLER, &meta.caller),
            (BODY_AUTH_KEY, &meta.body_auth),
        ];
        for (key, value) in reserved {
            if let Some(value) = value {
                args.entry(key)
                    .or_insert_with(|| Value::String(value.clone()));
            }
        }
        if !self.connection.trace {
            args.remove(META_CALLER);
        }

        let body = serde_json::to_vec(&args)?;
        Ok(Request { method, args, body })
    }
}

/// Converts a JSON value into an argument map.
pub fn args_from_value(value: Value) -> Result<Args, RespiteError> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Args::new()),
        other => Err(RespiteError::InvalidArguments {
            message: format!("expected a JSON object, got {other}"),
        }),
    }
}

// ---------------------------------------------------------------------------
// utf8 decoding
// ---------------------------------------------------------------------------

/// Decodes byte-encoded strings inside `value` into text.
///
/// A string whose characters all fit in one byte is read as a UTF-8 byte
/// sequence (`"Ã©"` becomes `"é"`). Strings holding wider characters are
/// already text and are left alone. Invalid sequences decode lossily.
pub fn decode_utf8_value(value: Value) -> Value {
    match value {
        Value::String(text) => Value::String(decode_byte_string(text)),
        Value::Array(items) => Value::Array(items.into_iter().map(decode_utf8_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, decode_utf8_value(value)))
                .collect(),
        ),
        other => other,
    }
}

fn decode_byte_string(text: String) -> String {
    if text.is_ascii() {
        return text;
    }
    let bytes: Option<Vec<u8>> = text.chars().map(|c| u8::try_from(c).ok()).collect();
    match bytes {
        Some(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        None => text,
    }
}
