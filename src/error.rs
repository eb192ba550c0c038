//! Error types for expression resolution

use thiserror::Error;

/// Errors raised while resolving template expressions
///
/// Every variant aborts the current resolution; there is no partial result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    /// An expected expression wrapper is not a one-key mapping
    #[error("malformed expression: {reason}")]
    MalformedExpression { reason: String },

    /// The wrapper or a lookup table lacks the key being validated
    #[error("missing expression key '{key}'")]
    MissingExpressionKey { key: String },

    /// Correct function, wrong arity or out-of-range operand
    #[error("{function}: {reason}")]
    WrongShape {
        function: &'static str,
        reason: String,
    },

    /// A resolved operand has the wrong runtime type
    #[error("{function}: expected {expected}, found {found}")]
    UnexpectedType {
        function: &'static str,
        expected: &'static str,
        found: String,
    },

    /// A name is absent from both the cache and the resource table
    #[error("unresolved reference '{name}'")]
    UnresolvedReference { name: String },

    /// A map or attribute lookup failed at some level
    #[error("{function}: {reason}")]
    LookupFailure {
        function: &'static str,
        reason: String,
    },

    /// The memoization cache was used against its contract
    #[error("cache misuse for key '{key}': {reason}")]
    CacheMisuse { key: String, reason: String },

    /// A reference chain returned to a key that is still being resolved
    #[error("circular reference detected: {}", chain.join(" -> "))]
    CircularReference { chain: Vec<String> },
}

impl ResolveError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedExpression {
            reason: reason.into(),
        }
    }

    pub fn missing_key(key: impl Into<String>) -> Self {
        Self::MissingExpressionKey { key: key.into() }
    }

    pub fn wrong_shape(function: &'static str, reason: impl Into<String>) -> Self {
        Self::WrongShape {
            function,
            reason: reason.into(),
        }
    }

    /// Create an unexpected type error, describing the offending value by its JSON type
    pub fn unexpected_type(
        function: &'static str,
        expected: &'static str,
        found: &serde_json::Value,
    ) -> Self {
        Self::UnexpectedType {
            function,
            expected,
            found: type_name(found).to_string(),
        }
    }

    pub fn unresolved(name: impl Into<String>) -> Self {
        Self::UnresolvedReference { name: name.into() }
    }

    pub fn lookup(function: &'static str, reason: impl Into<String>) -> Self {
        Self::LookupFailure {
            function,
            reason: reason.into(),
        }
    }

    pub fn cache_misuse(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CacheMisuse {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn circular(chain: Vec<String>) -> Self {
        Self::CircularReference { chain }
    }
}

/// A resolution error together with the template path where it happened
#[derive(Debug, Clone, PartialEq, Error)]
#[error("at {}: {source}", format_path(.path))]
pub struct ResolutionFailure {
    /// Path segments from the document root to the failing node
    pub path: Vec<String>,
    #[source]
    pub source: ResolveError,
}

impl ResolutionFailure {
    pub fn new(path: Vec<String>, source: ResolveError) -> Self {
        Self { path, source }
    }

    /// The error kind, without location
    pub fn kind(&self) -> &ResolveError {
        &self.source
    }
}

fn format_path(path: &[String]) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.join("/")
    }
}

/// Human-readable JSON type name used in error messages
pub(crate) fn type_name(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}
