//! Value resolution - replaces every expression node with a concrete value
//!
//! [`resolve`] walks a value tree depth first. Containers are rebuilt with
//! their order preserved; one-key mappings naming an intrinsic function are
//! dispatched to the matching evaluator.

mod intrinsic;

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::ResolverConfig;
use crate::context::ResolvingContext;
use crate::error::{ResolutionFailure, ResolveError};
use crate::intrinsics;
use crate::template::Template;

pub use intrinsic::Intrinsic;

/// Resolve one pass over `node`
///
/// `Fn::If` returns its chosen branch unresolved, so the result may still
/// contain expressions; use [`resolve_fully`] to reach a concrete value.
pub fn resolve(node: &Value, ctx: &mut ResolvingContext<'_>) -> Result<Value, ResolveError> {
    match node {
        Value::Array(items) => {
            let mut resolved = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                resolved.push(ctx.with_path(index.to_string(), |ctx| resolve(item, ctx))?);
            }
            Ok(Value::Array(resolved))
        }
        Value::Object(map) => {
            if let Some((intrinsic, operand)) = Intrinsic::classify_map(map) {
                return ctx.with_path(intrinsic.key(), |ctx| {
                    intrinsics::evaluate(intrinsic, operand, ctx)
                });
            }
            let mut resolved = Map::with_capacity(map.len());
            for (key, value) in map {
                let value = ctx.with_path(key.as_str(), |ctx| resolve(value, ctx))?;
                resolved.insert(key.clone(), value);
            }
            Ok(Value::Object(resolved))
        }
        primitive => Ok(primitive.clone()),
    }
}

/// Resolve repeatedly until no expression node remains
///
/// A pass that reproduces an earlier intermediate value (for example two
/// parameters whose defaults reference each other) fails with
/// [`ResolveError::CircularReference`] listing the repeating values.
pub fn resolve_fully(node: &Value, ctx: &mut ResolvingContext<'_>) -> Result<Value, ResolveError> {
    let mut value = resolve(node, ctx)?;
    let mut seen: Vec<Value> = Vec::new();
    while Intrinsic::contains_expression(&value) {
        let next = resolve(&value, ctx)?;
        if next == value {
            return Err(ResolveError::malformed(
                "expression does not reduce to a concrete value",
            ));
        }
        seen.push(value);
        if let Some(start) = seen.iter().position(|earlier| earlier == &next) {
            let mut chain: Vec<String> = seen[start..].iter().map(Value::to_string).collect();
            chain.push(next.to_string());
            return Err(ResolveError::circular(chain));
        }
        value = next;
    }
    Ok(value)
}

/// A resource after resolution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedResource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    #[serde(rename = "Properties")]
    pub properties: Value,
}

/// A stack output after resolution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedOutput {
    #[serde(rename = "Value")]
    pub value: Value,
    #[serde(rename = "ExportName", skip_serializing_if = "Option::is_none")]
    pub export_name: Option<Value>,
}

/// A template with every expression replaced by a concrete value
///
/// Resources and outputs whose condition evaluated to false are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedTemplate {
    #[serde(rename = "Resources")]
    pub resources: BTreeMap<String, ResolvedResource>,
    #[serde(rename = "Outputs", skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, ResolvedOutput>,
}

impl ResolvedTemplate {
    /// Convert to a JSON value
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Resolve the resources and outputs of a template with a fresh context
///
/// # Example
///
/// ```rust
/// use cfn_resolve::{resolve_template, ResolverConfig, Template};
///
/// let template = Template::from_json(r#"{
///     "Resources": {
///         "Queue": { "Type": "AWS::SQS::Queue", "Properties": { "QueueName": "jobs" } }
///     },
///     "Outputs": {
///         "QueueArn": { "Value": { "Fn::GetAtt": ["Queue", "Arn"] } }
///     }
/// }"#).unwrap();
///
/// let resolved = resolve_template(&template, &ResolverConfig::default()).unwrap();
/// assert_eq!(
///     resolved.outputs["QueueArn"].value,
///     "arn:aws:sqs:us-east-1:123456789012:jobs"
/// );
/// ```
pub fn resolve_template(
    template: &Template,
    config: &ResolverConfig,
) -> Result<ResolvedTemplate, ResolutionFailure> {
    let mut ctx = ResolvingContext::new(template, config.settings());
    resolve_template_with(&mut ctx)
}

/// Resolve the resources and outputs of the context's template
///
/// On failure the error carries the path of the innermost failing node.
pub fn resolve_template_with(
    ctx: &mut ResolvingContext<'_>,
) -> Result<ResolvedTemplate, ResolutionFailure> {
    ctx.clear_failure_path();
    resolve_sections(ctx).map_err(|e| ResolutionFailure::new(ctx.take_failure_path(), e))
}

fn resolve_sections(ctx: &mut ResolvingContext<'_>) -> Result<ResolvedTemplate, ResolveError> {
    let template = ctx.template();
    let mut resolved = ResolvedTemplate::default();

    for (logical_id, resource) in &template.resources {
        let entry = ctx.with_path("Resources", |ctx| {
            ctx.with_path(logical_id.as_str(), |ctx| {
                if !condition_holds(resource.condition.as_deref(), ctx)? {
                    tracing::debug!(logical_id = %logical_id, "resource skipped by condition");
                    return Ok(None);
                }
                let properties = ctx.with_path("Properties", |ctx| {
                    resolve_fully(&Value::Object(resource.properties.clone()), ctx)
                })?;
                Ok(Some(ResolvedResource {
                    resource_type: resource.resource_type.clone(),
                    properties,
                }))
            })
        })?;
        if let Some(entry) = entry {
            resolved.resources.insert(logical_id.clone(), entry);
        }
    }

    for (name, output) in &template.outputs {
        let entry = ctx.with_path("Outputs", |ctx| {
            ctx.with_path(name.as_str(), |ctx| {
                if !condition_holds(output.condition.as_deref(), ctx)? {
                    return Ok(None);
                }
                let value = ctx.with_path("Value", |ctx| resolve_fully(&output.value, ctx))?;
                let export_name = match &output.export {
                    Some(export) => Some(ctx.with_path("Export", |ctx| {
                        ctx.with_path("Name", |ctx| resolve_fully(&export.name, ctx))
                    })?),
                    None => None,
                };
                Ok(Some(ResolvedOutput { value, export_name }))
            })
        })?;
        if let Some(entry) = entry {
            resolved.outputs.insert(name.clone(), entry);
        }
    }

    Ok(resolved)
}

fn condition_holds(
    condition: Option<&str>,
    ctx: &mut ResolvingContext<'_>,
) -> Result<bool, ResolveError> {
    match condition {
        Some(name) => ctx.with_path("Condition", |ctx| intrinsics::named_condition(name, ctx)),
        None => Ok(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextSettings;
    use crate::template::Resource;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn with_ctx<T>(template: &Template, f: impl FnOnce(&mut ResolvingContext<'_>) -> T) -> T {
        let mut ctx = ResolvingContext::new(template, ContextSettings::default());
        f(&mut ctx)
    }

    #[test]
    fn test_primitives_unchanged() {
        let template = Template::new();
        with_ctx(&template, |ctx| {
            for value in [json!(null), json!(true), json!(3.5), json!("text"), json!(-7)] {
                assert_eq!(resolve(&value, ctx).unwrap(), value);
            }
        });
    }

    #[test]
    fn test_plain_containers_unchanged() {
        let template = Template::new();
        let node = json!({
            "z": [1, { "b": "x", "a": [true, null] }],
            "a": { "Ref2": "not an intrinsic" },
            "m": { "Ref": "AWS::Region", "Extra": 1 }
        });
        with_ctx(&template, |ctx| {
            let resolved = resolve(&node, ctx).unwrap();
            assert_eq!(resolved, node);
            let keys: Vec<_> = resolved.as_object().unwrap().keys().cloned().collect();
            assert_eq!(keys, vec!["z", "a", "m"]);
        });
    }

    #[test]
    fn test_nested_expressions_resolved() {
        let template = Template::new();
        let node = json!({
            "Name": { "Fn::Join": ["-", [{ "Ref": "AWS::Region" }, "x"]] },
            "List": [{ "Ref": "AWS::AccountId" }]
        });
        with_ctx(&template, |ctx| {
            assert_eq!(
                resolve(&node, ctx).unwrap(),
                json!({ "Name": "us-east-1-x", "List": ["123456789012"] })
            );
            assert!(ctx.path().is_empty());
        });
    }

    #[test]
    fn test_if_branch_needs_next_pass() {
        let template = Template::new();
        let node = json!({ "Fn::If": [true, { "Ref": "AWS::Region" }, "no"] });
        with_ctx(&template, |ctx| {
            assert_eq!(resolve(&node, ctx).unwrap(), json!({ "Ref": "AWS::Region" }));
            assert_eq!(resolve_fully(&node, ctx).unwrap(), json!("us-east-1"));
        });
    }

    #[test]
    fn test_failure_records_path() {
        let template = Template::new();
        let node = json!({ "Outer": [{ "Inner": { "Ref": "Nope" } }] });
        with_ctx(&template, |ctx| {
            let err = resolve(&node, ctx).unwrap_err();
            assert_eq!(err, ResolveError::unresolved("Nope"));
            assert_eq!(
                ctx.failure_path().unwrap(),
                &["Outer", "0", "Inner", "Ref"].map(String::from)[..]
            );
            assert!(ctx.path().is_empty());
        });
    }

    #[test]
    fn test_resolve_template_skips_false_conditions() {
        let template = Template::new()
            .with_parameter("Env", json!("dev"))
            .with_condition("IsProd", json!({ "Fn::Equals": [{ "Ref": "Env" }, "prod"] }))
            .with_resource(
                "Queue",
                Resource::new("AWS::SQS::Queue").with_property("QueueName", json!("jobs")),
            )
            .with_resource("ProdOnly", {
                let mut r = Resource::new("AWS::SNS::Topic");
                r.condition = Some("IsProd".into());
                r
            });

        let resolved = resolve_template(&template, &ResolverConfig::default()).unwrap();
        assert!(resolved.resources.contains_key("Queue"));
        assert!(!resolved.resources.contains_key("ProdOnly"));
        assert_eq!(
            resolved.resources["Queue"].properties,
            json!({ "QueueName": "jobs" })
        );
    }

    #[test]
    fn test_resolve_template_failure_path() {
        let template = Template::new().with_resource(
            "Bucket",
            Resource::new("AWS::S3::Bucket")
                .with_property("Tags", json!([{ "Value": { "Ref": "Missing" } }])),
        );
        let failure = resolve_template(&template, &ResolverConfig::default()).unwrap_err();
        assert_eq!(failure.kind(), &ResolveError::unresolved("Missing"));
        assert_eq!(
            failure.to_string(),
            "at Resources/Bucket/Properties/Tags/0/Value/Ref: unresolved reference 'Missing'"
        );
    }

    #[test]
    fn test_parameters_referencing_each_other_are_circular() {
        let template = Template::new()
            .with_parameter("A", json!({ "Ref": "B" }))
            .with_parameter("B", json!({ "Ref": "A" }));
        with_ctx(&template, |ctx| {
            let err = resolve_fully(&json!({ "Ref": "A" }), ctx).unwrap_err();
            assert_eq!(
                err,
                ResolveError::circular(vec![
                    r#"{"Ref":"B"}"#.to_string(),
                    r#"{"Ref":"A"}"#.to_string(),
                    r#"{"Ref":"B"}"#.to_string(),
                ])
            );
        });
    }

    #[test]
    fn test_self_referencing_parameter_does_not_reduce() {
        let template = Template::new().with_parameter("A", json!({ "Ref": "A" }));
        with_ctx(&template, |ctx| {
            assert!(matches!(
                resolve_fully(&json!({ "Ref": "A" }), ctx),
                Err(ResolveError::MalformedExpression { .. })
            ));
        });
    }

    #[test]
    fn test_earlier_failure_does_not_leak_into_template_path() {
        let template = Template::new().with_resource(
            "Bucket",
            Resource::new("AWS::S3::Bucket").with_property("Name", json!({ "Ref": "Missing" })),
        );
        let mut ctx = ResolvingContext::new(&template, ContextSettings::default());
        assert!(resolve(&json!({ "Earlier": { "Ref": "Nope" } }), &mut ctx).is_err());

        let failure = resolve_template_with(&mut ctx).unwrap_err();
        assert_eq!(
            failure.path,
            ["Resources", "Bucket", "Properties", "Name", "Ref"].map(String::from)
        );
    }
}
