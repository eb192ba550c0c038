//! cfn-resolve - Static evaluator for CloudFormation intrinsic functions
//!
//! This library resolves template expressions such as `Ref`, `Fn::GetAtt`,
//! `Fn::Sub` and the condition functions to concrete values without talking to
//! a live provider. Resource-specific `Ref` and attribute semantics come from
//! a pluggable [`ResourceRegistry`].
//!
//! # Example
//!
//! ```rust
//! use cfn_resolve::{resolve_fully, ContextSettings, ResolvingContext, Template};
//! use serde_json::json;
//!
//! let template = Template::new().with_parameter("Env", json!("dev"));
//! let mut ctx = ResolvingContext::new(&template, ContextSettings::default());
//!
//! let value = resolve_fully(&json!({ "Fn::Sub": "app-${Env}-${AWS::Region}" }), &mut ctx).unwrap();
//! assert_eq!(value, json!("app-dev-us-east-1"));
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod intrinsics;
pub mod placeholder;
pub mod registry;
pub mod resolver;
pub mod template;

pub use config::{ConfigError, ResolverConfig};
pub use context::{AvailabilityZones, ContextSettings, ResolvingContext};
pub use error::{ResolutionFailure, ResolveError};
pub use registry::{ResourceRegistry, ResourceStrategy};
pub use resolver::{
    resolve, resolve_fully, resolve_template, resolve_template_with, Intrinsic, ResolvedTemplate,
};
pub use template::{Template, TemplateError};

use std::path::Path;

use thiserror::Error;

/// Errors that can occur while loading and resolving a template
#[derive(Debug, Error)]
pub enum Error {
    /// The template could not be read or parsed
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// Resolution failed at some path in the template
    #[error("resolution error {0}")]
    Resolution(#[from] ResolutionFailure),
}

/// Parse JSON template text and resolve it with the given config
///
/// # Example
///
/// ```rust
/// use cfn_resolve::{resolve_str, ResolverConfig};
///
/// let config = ResolverConfig::default().with_stack_name("web");
/// let resolved = resolve_str(r#"{
///     "Resources": {
///         "Topic": { "Type": "AWS::SNS::Topic", "Properties": { "TopicName": { "Ref": "AWS::StackName" } } }
///     }
/// }"#, &config).unwrap();
///
/// assert_eq!(resolved.resources["Topic"].properties["TopicName"], "web");
/// ```
pub fn resolve_str(source: &str, config: &ResolverConfig) -> Result<ResolvedTemplate, Error> {
    let template = Template::from_json(source)?;
    Ok(resolve_template(&template, config)?)
}

/// Read a JSON template from disk and resolve it
pub fn resolve_file(path: &Path, config: &ResolverConfig) -> Result<ResolvedTemplate, Error> {
    let template = Template::from_file(path)?;
    Ok(resolve_template(&template, config)?)
}
