//! Request authentication tokens.
//!
//! ## Standard mode
//!
//! ```text
//! digest1 = md5_hex(body)
//! digest2 = md5_hex("{pass}:{timestamp}:{/path/method/brand}:{digest1}")
//! header  = "{digest2}:{timestamp}"
//! ```
//!
//! `body` is the exact byte sequence handed to the transport. The signer never
//! re-serialises arguments.
//!
//! ## md5-pass mode
//!
//! The token is `md5_hex(pass)` with no timestamp. The body is not covered.

use md5::{Digest, Md5};

use crate::{Pass, RequestPath};

/// Header carrying the auth token.
pub const AUTH_HEADER: &str = "X-Respite-Auth";

/// Body key carrying the md5-pass digest when no auth header is sent.
pub const BODY_AUTH_KEY: &str = "x_api_auth";

/// Lowercase hex MD5 of `data`.
pub fn md5_hex(data: impl AsRef<[u8]>) -> String {
    hex::encode(Md5::digest(data.as_ref()))
}

/// Which signing scheme produced a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Standard,
    Md5Pass,
}

/// A computed auth token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    /// Hex digest.
    pub value: String,
    /// Unix seconds used in the signature.
    pub timestamp: i64,
    pub kind: TokenKind,
}

impl AuthToken {
    /// Value of the [`AUTH_HEADER`] header.
    pub fn header_value(&self) -> String {
        match self.kind {
            TokenKind::Standard => format!("{}:{}", self.value, self.timestamp),
            TokenKind::Md5Pass => self.value.clone(),
        }
    }
}

impl std::fmt::Display for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.header_value())
    }
}

/// Computes auth tokens.
pub struct Signer;

impl Signer {
    /// Standard-mode signature over `body` for the given request path.
    pub fn sign(body: &[u8], path: &RequestPath, pass: &Pass, timestamp: i64) -> AuthToken {
        let body_digest = md5_hex(body);
        let secret = format!("{}:{timestamp}:{path}:{body_digest}", pass.expose());
        AuthToken {
            value: md5_hex(secret),
            timestamp,
            kind: TokenKind::Standard,
        }
    }

    /// md5-pass token: the digest of the pass alone.
    pub fn md5_pass(pass: &Pass, timestamp: i64) -> AuthToken {
        AuthToken {
            value: md5_hex(pass.expose()),
            timestamp,
            kind: TokenKind::Md5Pass,
        }
    }
}
