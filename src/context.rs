//! Resolving context: per-pass evaluation state
//!
//! A [`ResolvingContext`] is created once per top-level resolution request and
//! passed by `&mut` down the call tree. It owns the memoization cache, the
//! diagnostic path stack, the set of generated identifiers and the set of
//! references currently being resolved.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::ResolveError;
use crate::registry::ResourceRegistry;
use crate::template::Template;

/// Cache keys under which pseudo-parameters are seeded
pub mod pseudo {
    pub const REGION: &str = "AWS::Region";
    pub const PARTITION: &str = "AWS::Partition";
    pub const ACCOUNT_ID: &str = "AWS::AccountId";
    pub const STACK_NAME: &str = "AWS::StackName";
    pub const STACK_ID: &str = "AWS::StackId";
    pub const URL_SUFFIX: &str = "AWS::URLSuffix";
}

/// Deterministic availability-zone table, keyed by region
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AvailabilityZones {
    default: Vec<String>,
    by_region: HashMap<String, Vec<String>>,
}

impl AvailabilityZones {
    /// Create a table with the given default list and no regions
    pub fn new(default: Vec<String>) -> Self {
        Self {
            default,
            by_region: HashMap::new(),
        }
    }

    /// Register the zones for a region
    pub fn insert(&mut self, region: impl Into<String>, zones: Vec<String>) {
        self.by_region.insert(region.into(), zones);
    }

    pub fn set_default(&mut self, zones: Vec<String>) {
        self.default = zones;
    }

    /// Zones for a region
    ///
    /// A blank region yields the default list. A region with no registered
    /// zones gets `<region>a`, `<region>b`, `<region>c`.
    pub fn for_region(&self, region: &str) -> Vec<String> {
        let region = region.trim();
        if region.is_empty() {
            return self.default.clone();
        }
        match self.by_region.get(region) {
            Some(zones) => zones.clone(),
            None => ["a", "b", "c"]
                .iter()
                .map(|suffix| format!("{}{}", region, suffix))
                .collect(),
        }
    }
}

/// Fixed inputs for a resolving context
#[derive(Debug, Clone)]
pub struct ContextSettings {
    pub region: String,
    pub partition: String,
    pub account_id: String,
    pub stack_name: String,
    /// Parameter overrides, taking precedence over template defaults
    pub parameters: BTreeMap<String, Value>,
    pub availability_zones: AvailabilityZones,
}

impl Default for ContextSettings {
    fn default() -> Self {
        crate::config::ResolverConfig::default().settings()
    }
}

/// Mutable state for one resolution pass
#[derive(Debug)]
pub struct ResolvingContext<'t> {
    template: &'t Template,
    registry: &'t ResourceRegistry,
    settings: ContextSettings,
    cache: HashMap<String, Value>,
    path: Vec<String>,
    failure_path: Option<Vec<String>>,
    generated_ids: HashSet<String>,
    in_flight: Vec<String>,
}

impl<'t> ResolvingContext<'t> {
    /// Create a context over a template using the builtin resource registry
    ///
    /// Pseudo-parameters and template parameters are seeded into the cache so
    /// that `Ref` and `Fn::Sub` can see them.
    pub fn new(template: &'t Template, settings: ContextSettings) -> Self {
        let mut ctx = Self {
            template,
            registry: ResourceRegistry::builtin(),
            settings,
            cache: HashMap::new(),
            path: Vec::new(),
            failure_path: None,
            generated_ids: HashSet::new(),
            in_flight: Vec::new(),
        };
        ctx.seed_cache();
        ctx
    }

    /// Use a custom resource registry instead of the builtin one
    pub fn with_registry(mut self, registry: &'t ResourceRegistry) -> Self {
        self.registry = registry;
        self
    }

    fn seed_cache(&mut self) {
        let stack_id = format!(
            "arn:{}:cloudformation:{}:{}:stack/{}/{}",
            self.settings.partition,
            self.settings.region,
            self.settings.account_id,
            self.settings.stack_name,
            stable_hex(&self.settings.stack_name, 32),
        );
        let url_suffix = self.url_suffix().to_string();
        let seeds = [
            (pseudo::REGION, self.settings.region.clone()),
            (pseudo::PARTITION, self.settings.partition.clone()),
            (pseudo::ACCOUNT_ID, self.settings.account_id.clone()),
            (pseudo::STACK_NAME, self.settings.stack_name.clone()),
            (pseudo::STACK_ID, stack_id),
            (pseudo::URL_SUFFIX, url_suffix),
        ];
        for (key, value) in seeds {
            self.cache.insert(key.to_string(), Value::String(value));
        }

        for (name, parameter) in &self.template.parameters {
            let value = self
                .settings
                .parameters
                .get(name)
                .or(parameter.default.as_ref());
            if let Some(value) = value {
                self.cache.insert(name.clone(), value.clone());
            }
        }
    }

    /// The template being resolved
    pub fn template(&self) -> &'t Template {
        self.template
    }

    /// The resource strategy registry
    pub fn registry(&self) -> &'t ResourceRegistry {
        self.registry
    }

    // Memoization cache

    pub fn has_key(&self, key: &str) -> bool {
        self.cache.contains_key(key)
    }

    /// Get a cached value
    ///
    /// Callers must check [`has_key`](Self::has_key) first; an absent key is
    /// reported as cache misuse.
    pub fn get(&self, key: &str) -> Result<&Value, ResolveError> {
        self.cache
            .get(key)
            .ok_or_else(|| ResolveError::cache_misuse(key, "lookup of absent key"))
    }

    /// Insert or overwrite a cached value
    pub fn put(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if let Some(previous) = self.cache.get(&key) {
            if previous != &value {
                tracing::warn!(key = %key, "overwriting cached value with a different value");
            }
        }
        self.cache.insert(key, value);
    }

    /// Insert a value that must not already be cached with a different value
    pub fn add(&mut self, key: impl Into<String>, value: Value) -> Result<(), ResolveError> {
        let key = key.into();
        match self.cache.get(&key) {
            Some(previous) if previous != &value => Err(ResolveError::cache_misuse(
                key,
                "duplicate insertion with a different value",
            )),
            Some(_) => Ok(()),
            None => {
                self.cache.insert(key, value);
                Ok(())
            }
        }
    }

    // Path tracking

    pub fn push_path(&mut self, segment: impl Into<String>) {
        self.path.push(segment.into());
    }

    pub fn pop_path(&mut self) {
        self.path.pop();
    }

    /// Run `f` with `segment` pushed onto the path stack
    ///
    /// The segment is popped on every exit. On the first error the full path
    /// is recorded for diagnostics. Entering at the root discards a path left
    /// over from an earlier failed call.
    pub fn with_path<T>(
        &mut self,
        segment: impl Into<String>,
        f: impl FnOnce(&mut Self) -> Result<T, ResolveError>,
    ) -> Result<T, ResolveError> {
        if self.path.is_empty() {
            self.failure_path = None;
        }
        self.push_path(segment);
        let result = f(self);
        if result.is_err() && self.failure_path.is_none() {
            self.failure_path = Some(self.path.clone());
        }
        self.pop_path();
        result
    }

    /// Current path from the root
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Path recorded at the innermost failure, if any failure occurred
    pub fn failure_path(&self) -> Option<&[String]> {
        self.failure_path.as_deref()
    }

    /// Forget any recorded failure path
    pub fn clear_failure_path(&mut self) {
        self.failure_path = None;
    }

    /// Take the recorded failure path, falling back to the current path
    pub fn take_failure_path(&mut self) -> Vec<String> {
        self.failure_path
            .take()
            .unwrap_or_else(|| self.path.clone())
    }

    // Pseudo-parameters

    pub fn region(&self) -> &str {
        &self.settings.region
    }

    pub fn partition(&self) -> &str {
        &self.settings.partition
    }

    pub fn account_id(&self) -> &str {
        &self.settings.account_id
    }

    pub fn stack_name(&self) -> &str {
        &self.settings.stack_name
    }

    /// Domain suffix for the partition
    pub fn url_suffix(&self) -> &str {
        match self.settings.partition.as_str() {
            "aws-cn" => "amazonaws.com.cn",
            _ => "amazonaws.com",
        }
    }

    /// Availability zones for a region, or the default list when absent or blank
    pub fn availability_zones(&self, region: Option<&str>) -> Vec<String> {
        self.settings
            .availability_zones
            .for_region(region.unwrap_or(""))
    }

    // Generated identifiers

    pub fn has_generated_id(&self, id: &str) -> bool {
        self.generated_ids.contains(id)
    }

    pub fn register_generated_id(&mut self, id: impl Into<String>) {
        self.generated_ids.insert(id.into());
    }

    /// Produce and register a deterministic id that has not been generated yet
    ///
    /// `make` receives a 17-character hex digest of `seed` (plus a retry counter on
    /// collision) and formats the final id.
    pub fn generate_id(&mut self, seed: &str, make: impl Fn(&str) -> String) -> String {
        let mut attempt = 0u32;
        loop {
            let salted = if attempt == 0 {
                seed.to_string()
            } else {
                format!("{}#{}", seed, attempt)
            };
            let id = make(&stable_hex(&salted, 17));
            if !self.has_generated_id(&id) {
                tracing::debug!(seed, id = %id, "generated physical id");
                self.register_generated_id(id.clone());
                return id;
            }
            attempt += 1;
        }
    }

    // Cycle detection

    /// Mark a reference key as being resolved
    ///
    /// Fails if the key is already in flight.
    pub(crate) fn enter_reference(&mut self, key: &str) -> Result<(), ResolveError> {
        if let Some(start) = self.in_flight.iter().position(|k| k == key) {
            let mut chain = self.in_flight[start..].to_vec();
            chain.push(key.to_string());
            return Err(ResolveError::circular(chain));
        }
        self.in_flight.push(key.to_string());
        Ok(())
    }

    pub(crate) fn leave_reference(&mut self, key: &str) {
        if let Some(pos) = self.in_flight.iter().rposition(|k| k == key) {
            self.in_flight.remove(pos);
        }
    }
}

/// Lowercase SHA-256 hex digest of `input`, `len` characters long
///
/// Digests longer than 64 characters continue with `input#1`, `input#2`, ...
pub(crate) fn stable_hex(input: &str, len: usize) -> String {
    let mut out = hex::encode(Sha256::digest(input.as_bytes()));
    let mut round = 1u64;
    while out.len() < len {
        let mut hasher = Sha256::new();
        hasher.update(input.as_bytes());
        hasher.update(format!("#{}", round).as_bytes());
        out.push_str(&hex::encode(hasher.finalize()));
        round += 1;
    }
    out.truncate(len);
    out
}
