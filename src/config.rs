//! Resolver configuration
//!
//! Pseudo-parameter values, parameter overrides and the availability-zone
//! fixture table are loaded from TOML. Nothing here is fetched from a live
//! provider; the zone table is local fixture data.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::context::{AvailabilityZones, ContextSettings};

/// Errors that can occur when loading or parsing a resolver config
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Configuration for a resolution request
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub region: String,
    pub partition: String,
    pub account_id: String,
    pub stack_name: String,
    /// Overrides for template parameters, taking precedence over their defaults
    pub parameters: BTreeMap<String, Value>,
    /// Availability zones per region
    pub availability_zones: BTreeMap<String, Vec<String>>,
}

/// TOML structure for deserializing configs
#[derive(Deserialize)]
struct TomlConfig {
    pseudo: Option<TomlPseudo>,
    #[serde(default)]
    parameters: BTreeMap<String, toml::Value>,
    #[serde(default)]
    availability_zones: BTreeMap<String, Vec<String>>,
}

#[derive(Deserialize)]
struct TomlPseudo {
    region: Option<String>,
    partition: Option<String>,
    account_id: Option<String>,
    stack_name: Option<String>,
}

/// Built-in configuration
const DEFAULT_CONFIG: &str = r##"
[pseudo]
region = "us-east-1"
partition = "aws"
account_id = "123456789012"
stack_name = "stack"

[availability_zones]
us-east-1 = ["us-east-1a", "us-east-1b", "us-east-1c", "us-east-1d", "us-east-1e", "us-east-1f"]
us-east-2 = ["us-east-2a", "us-east-2b", "us-east-2c"]
us-west-1 = ["us-west-1a", "us-west-1c"]
us-west-2 = ["us-west-2a", "us-west-2b", "us-west-2c", "us-west-2d"]
eu-west-1 = ["eu-west-1a", "eu-west-1b", "eu-west-1c"]
eu-central-1 = ["eu-central-1a", "eu-central-1b", "eu-central-1c"]
ap-southeast-2 = ["ap-southeast-2a", "ap-southeast-2b", "ap-southeast-2c"]
cn-north-1 = ["cn-north-1a", "cn-north-1b"]
"##;

impl ResolverConfig {
    /// Create a config with the built-in defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load config from a TOML string
    ///
    /// Missing pseudo-parameters fall back to the built-in values. Zone
    /// tables are merged over the built-in table.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let base: TomlConfig = toml::from_str(DEFAULT_CONFIG)?;
        let parsed: TomlConfig = toml::from_str(content)?;

        let mut config = Self::from_toml(base);
        if let Some(pseudo) = parsed.pseudo {
            if let Some(region) = pseudo.region {
                config.region = region;
            }
            if let Some(partition) = pseudo.partition {
                config.partition = partition;
            }
            if let Some(account_id) = pseudo.account_id {
                config.account_id = account_id;
            }
            if let Some(stack_name) = pseudo.stack_name {
                config.stack_name = stack_name;
            }
        }
        config
            .parameters
            .extend(parsed.parameters.into_iter().map(|(k, v)| (k, toml_to_json(v))));
        config.availability_zones.extend(parsed.availability_zones);
        Ok(config)
    }

    fn from_toml(parsed: TomlConfig) -> Self {
        let pseudo = parsed.pseudo.unwrap_or(TomlPseudo {
            region: None,
            partition: None,
            account_id: None,
            stack_name: None,
        });
        Self {
            region: pseudo.region.unwrap_or_else(|| "us-east-1".to_string()),
            partition: pseudo.partition.unwrap_or_else(|| "aws".to_string()),
            account_id: pseudo.account_id.unwrap_or_else(|| "123456789012".to_string()),
            stack_name: pseudo.stack_name.unwrap_or_else(|| "stack".to_string()),
            parameters: parsed
                .parameters
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
            availability_zones: parsed.availability_zones,
        }
    }

    /// Set the region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Set the partition
    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = partition.into();
        self
    }

    /// Set the account id
    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = account_id.into();
        self
    }

    /// Set the stack name used for generated physical names
    pub fn with_stack_name(mut self, stack_name: impl Into<String>) -> Self {
        self.stack_name = stack_name.into();
        self
    }

    /// Override a template parameter
    pub fn with_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    /// Register availability zones for a region
    pub fn with_zones(mut self, region: impl Into<String>, zones: Vec<String>) -> Self {
        self.availability_zones.insert(region.into(), zones);
        self
    }

    /// Build the settings for a resolving context
    ///
    /// The default zone list is the configured region's list.
    pub fn settings(&self) -> ContextSettings {
        let mut zones = AvailabilityZones::new(Vec::new());
        for (region, list) in &self.availability_zones {
            zones.insert(region.clone(), list.clone());
        }
        let default = zones.for_region(&self.region);
        zones.set_default(default);

        ContextSettings {
            region: self.region.clone(),
            partition: self.partition.clone(),
            account_id: self.account_id.clone(),
            stack_name: self.stack_name.clone(),
            parameters: self.parameters.clone(),
            availability_zones: zones,
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        let parsed: TomlConfig =
            toml::from_str(DEFAULT_CONFIG).expect("Default config should be valid TOML");
        Self::from_toml(parsed)
    }
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Value::from(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(d) => Value::String(d.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}
