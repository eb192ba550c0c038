//! Template document model
//!
//! A [`Template`] is the validated input to the resolution engine. It is
//! deserialized from JSON with `serde`; loading distinguishes blank input,
//! malformed JSON, and JSON that does not match the template shape.
//!
//! # Example
//!
//! ```rust
//! use cfn_resolve::Template;
//!
//! let template = Template::from_json(r#"{
//!     "Resources": {
//!         "Bucket": { "Type": "AWS::S3::Bucket" }
//!     }
//! }"#).unwrap();
//!
//! assert_eq!(template.resource("Bucket").unwrap().resource_type, "AWS::S3::Bucket");
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors that can occur when loading a template
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Input was empty or whitespace only
    #[error("invalid input: template text is blank")]
    InvalidInput,

    /// Input is not well-formed JSON
    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    /// Input parsed but does not conform to the template schema
    #[error("schema validation failed: {message}")]
    Schema { message: String },

    #[error("failed to read template file: {0}")]
    Io(#[from] std::io::Error),
}

/// A declared resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    #[serde(rename = "Properties", default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
    /// Name of a condition that gates creation of this resource
    #[serde(rename = "Condition", default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(rename = "DependsOn", default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<Value>,
}

impl Resource {
    /// Create a resource with no properties
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties: Map::new(),
            condition: None,
            depends_on: None,
        }
    }

    /// Add a property, builder style
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Get a raw (unresolved) property
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

/// A declared input parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(rename = "Type", default = "default_parameter_type")]
    pub parameter_type: String,
    #[serde(rename = "Default", default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_parameter_type() -> String {
    "String".to_string()
}

/// A declared stack output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    #[serde(rename = "Value")]
    pub value: Value,
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Condition", default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(rename = "Export", default, skip_serializing_if = "Option::is_none")]
    pub export: Option<OutputExport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputExport {
    #[serde(rename = "Name")]
    pub name: Value,
}

/// Three-level lookup table: map name -> top-level key -> second-level key -> value
pub type Mappings = BTreeMap<String, BTreeMap<String, Map<String, Value>>>;

/// A validated template document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Parameters", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, Parameter>,
    /// `None` when the template has no `Mappings` section at all
    #[serde(rename = "Mappings", default, skip_serializing_if = "Option::is_none")]
    pub mappings: Option<Mappings>,
    #[serde(rename = "Conditions", default, skip_serializing_if = "Map::is_empty")]
    pub conditions: Map<String, Value>,
    #[serde(rename = "Resources", default)]
    pub resources: BTreeMap<String, Resource>,
    #[serde(rename = "Outputs", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, Output>,
}

impl Template {
    /// Create an empty template
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a template from JSON text
    pub fn from_json(text: &str) -> Result<Self, TemplateError> {
        if text.trim().is_empty() {
            return Err(TemplateError::InvalidInput);
        }

        serde_json::from_str(text).map_err(|e| {
            use serde_json::error::Category;
            match e.classify() {
                Category::Data => TemplateError::Schema {
                    message: e.to_string(),
                },
                Category::Syntax | Category::Eof | Category::Io => TemplateError::Syntax {
                    line: e.line(),
                    column: e.column(),
                    message: e.to_string(),
                },
            }
        })
    }

    /// Load a template from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, TemplateError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Add a resource, builder style
    pub fn with_resource(mut self, logical_id: impl Into<String>, resource: Resource) -> Self {
        self.resources.insert(logical_id.into(), resource);
        self
    }

    /// Add a condition, builder style
    pub fn with_condition(mut self, name: impl Into<String>, expr: Value) -> Self {
        self.conditions.insert(name.into(), expr);
        self
    }

    /// Add a parameter with a default value, builder style
    pub fn with_parameter(mut self, name: impl Into<String>, default: Value) -> Self {
        self.parameters.insert(
            name.into(),
            Parameter {
                parameter_type: default_parameter_type(),
                default: Some(default),
                description: None,
            },
        );
        self
    }

    /// Replace the Mappings section, builder style
    pub fn with_mappings(mut self, mappings: Mappings) -> Self {
        self.mappings = Some(mappings);
        self
    }

    /// Look up a resource by logical id
    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources.get(logical_id)
    }

    /// Look up a condition expression by name
    pub fn condition(&self, name: &str) -> Option<&Value> {
        self.conditions.get(name)
    }
}
