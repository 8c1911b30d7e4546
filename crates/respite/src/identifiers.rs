//! Newtype domain identifiers.
//!
//! Every name that participates in configuration lookup or in the request URL
//! is a distinct newtype. This prevents accidentally interchanging, for
//! example, a [`Brand`] with a [`Namespace`] even though both are strings on
//! the wire.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id! {
    /// The logical name of a remote service (e.g. `"billing"`).
    ///
    /// Looked up in the shared configuration store as `"{name}_service"` first
    /// and then as `"{name}"`.
    ServiceName
}

string_id! {
    /// Tenant identifier scoping both configuration lookup and the URL path.
    Brand
}

string_id! {
    /// Optional prefix applied to every requested method name.
    Namespace
}

/// Suffix stripped from a service key when deriving the default URL path.
pub const SERVICE_SUFFIX: &str = "_service";

impl ServiceName {
    /// Config-store keys to try, in priority order.
    pub fn lookup_keys(&self) -> [String; 2] {
        [format!("{}{}", self.0, SERVICE_SUFFIX), self.0.clone()]
    }
}

// ---------------------------------------------------------------------------
// Wire method name
// ---------------------------------------------------------------------------

/// A method name exactly as it is sent on the wire.
///
/// Unlike the identifiers above this is never validated: the remote service
/// owns method existence semantics, so any requested string is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodName(String);

impl MethodName {
    /// Applies the namespace prefix, if any, to a requested method name.
    ///
    /// `test` + `something` becomes `test_something`; without a namespace
    /// the requested name is returned unchanged.
    pub fn qualify(namespace: Option<&Namespace>, requested: &str) -> Self {
        match namespace {
            Some(ns) => Self(format!("{}_{}", ns.as_str(), requested)),
            None => Self(requested.to_string()),
        }
    }

    /// Returns the wire name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MethodName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
