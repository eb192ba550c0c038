//! Resource-type strategy registry
//!
//! `Ref` and `Fn::GetAtt` mean different things for different resource kinds.
//! The registry maps a resource type name to a [`ResourceStrategy`], a pair of
//! plain functions. Unknown types fall back to the default strategy: `Ref`
//! yields the logical id and no attributes are supported.
//!
//! New kinds are added by registering a strategy:
//!
//! ```rust
//! use cfn_resolve::registry::{ResourceCall, ResourceRegistry, ResourceStrategy};
//! use cfn_resolve::{ResolveError, ResolvingContext};
//! use serde_json::{json, Value};
//!
//! fn widget_ref(call: &ResourceCall<'_>, _ctx: &mut ResolvingContext<'_>) -> Result<Value, ResolveError> {
//!     Ok(json!(format!("widget/{}", call.logical_id)))
//! }
//!
//! let mut registry = ResourceRegistry::with_builtin_strategies();
//! registry.register("Custom::Widget", ResourceStrategy {
//!     reference: widget_ref,
//!     ..ResourceStrategy::default()
//! });
//! assert!(registry.contains("Custom::Widget"));
//! ```

mod naming;
mod strategies;

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use serde_json::Value;

use crate::context::ResolvingContext;
use crate::error::ResolveError;
use crate::template::Resource;

/// The resource a strategy is asked about
#[derive(Debug, Clone, Copy)]
pub struct ResourceCall<'a> {
    pub resource_type: &'a str,
    pub logical_id: &'a str,
    pub resource: &'a Resource,
}

/// Computes what a bare `Ref` to a resource yields
pub type ReferenceFn =
    fn(&ResourceCall<'_>, &mut ResolvingContext<'_>) -> Result<Value, ResolveError>;

/// Computes a named attribute of a resource
pub type AttributeFn =
    fn(&ResourceCall<'_>, &str, &mut ResolvingContext<'_>) -> Result<Value, ResolveError>;

/// Resolution semantics for one resource kind
#[derive(Clone, Copy)]
pub struct ResourceStrategy {
    pub reference: ReferenceFn,
    pub attribute: AttributeFn,
}

impl fmt::Debug for ResourceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceStrategy").finish_non_exhaustive()
    }
}

impl Default for ResourceStrategy {
    fn default() -> Self {
        Self {
            reference: logical_id_reference,
            attribute: unsupported_attribute,
        }
    }
}

/// `Ref` yields the logical id
pub fn logical_id_reference(
    call: &ResourceCall<'_>,
    _ctx: &mut ResolvingContext<'_>,
) -> Result<Value, ResolveError> {
    Ok(Value::String(call.logical_id.to_string()))
}

/// Every attribute lookup fails
pub fn unsupported_attribute(
    call: &ResourceCall<'_>,
    attribute: &str,
    _ctx: &mut ResolvingContext<'_>,
) -> Result<Value, ResolveError> {
    Err(ResolveError::lookup(
        "Fn::GetAtt",
        format!(
            "attribute '{}' is not supported for resource '{}' of type {}",
            attribute, call.logical_id, call.resource_type
        ),
    ))
}

/// Registry of strategies keyed by resource type
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    strategies: HashMap<String, ResourceStrategy>,
    default: ResourceStrategy,
}

impl ResourceRegistry {
    /// Create a registry with only the default strategy
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every builtin resource strategy
    pub fn with_builtin_strategies() -> Self {
        let mut registry = Self::new();
        strategies::register_builtin(&mut registry);
        registry
    }

    /// The shared builtin registry, constructed once
    pub fn builtin() -> &'static ResourceRegistry {
        static BUILTIN: OnceLock<ResourceRegistry> = OnceLock::new();
        BUILTIN.get_or_init(Self::with_builtin_strategies)
    }

    /// Register a strategy for a resource type, replacing any previous one
    pub fn register(&mut self, resource_type: impl Into<String>, strategy: ResourceStrategy) {
        self.strategies.insert(resource_type.into(), strategy);
    }

    /// Replace the fallback strategy for unregistered types
    pub fn set_default(&mut self, strategy: ResourceStrategy) {
        self.default = strategy;
    }

    /// Strategy for a resource type, or the default strategy
    pub fn lookup(&self, resource_type: &str) -> &ResourceStrategy {
        self.strategies.get(resource_type).unwrap_or(&self.default)
    }

    pub fn contains(&self, resource_type: &str) -> bool {
        self.strategies.contains_key(resource_type)
    }

    /// Registered resource type names
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.strategies.keys().map(|s| s.as_str())
    }
}
