//! Physical names, ids and ARNs for builtin strategies

use serde_json::Value;

use super::ResourceCall;
use crate::context::ResolvingContext;
use crate::error::ResolveError;
use crate::intrinsics::reference_value;
use crate::resolver::resolve_fully;

/// Resolve a property of the resource
///
/// Runs nested under the caller's path as `<logicalId>/<key>`, so a failure
/// reads e.g. `Outputs/Url/Value/Fn::GetAtt/Site/BucketName/Ref`.
pub(super) fn property(
    call: &ResourceCall<'_>,
    key: &str,
    ctx: &mut ResolvingContext<'_>,
) -> Result<Option<Value>, ResolveError> {
    let Some(raw) = call.resource.property(key) else {
        return Ok(None);
    };
    ctx.with_path(call.logical_id, |ctx| {
        ctx.with_path(key, |ctx| resolve_fully(raw, ctx))
    })
    .map(Some)
}

/// Resolve a string property, if present
pub(super) fn string_property(
    call: &ResourceCall<'_>,
    key: &str,
    ctx: &mut ResolvingContext<'_>,
) -> Result<Option<String>, ResolveError> {
    match property(call, key, ctx)? {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(ResolveError::unexpected_type("Ref", "string property", &other)),
    }
}

/// Resolve a string property that an attribute depends on
pub(super) fn required_string_property(
    call: &ResourceCall<'_>,
    key: &str,
    attribute: &str,
    ctx: &mut ResolvingContext<'_>,
) -> Result<String, ResolveError> {
    string_property(call, key, ctx)?.ok_or_else(|| {
        ResolveError::lookup(
            "Fn::GetAtt",
            format!(
                "attribute '{}' of '{}' requires property '{}'",
                attribute, call.logical_id, key
            ),
        )
    })
}

/// The explicit name property, or a generated `<stack>-<logicalId>-<SUFFIX>` name
pub(super) fn physical_name(
    call: &ResourceCall<'_>,
    name_property: &str,
    lowercase: bool,
    ctx: &mut ResolvingContext<'_>,
) -> Result<String, ResolveError> {
    if let Some(name) = string_property(call, name_property, ctx)? {
        return Ok(name);
    }
    let prefix = format!("{}-{}", ctx.stack_name(), call.logical_id);
    let name = ctx.generate_id(&prefix, |hex| {
        let name = format!("{}-{}", prefix, hex[..12].to_uppercase());
        if lowercase {
            name.to_lowercase()
        } else {
            name
        }
    });
    Ok(name)
}

/// A generated EC2-style id such as `vpc-0a1b2c...`
pub(super) fn resource_id(call: &ResourceCall<'_>, prefix: &str, ctx: &mut ResolvingContext<'_>) -> String {
    let seed = format!("{}/{}/{}", ctx.stack_name(), call.logical_id, prefix);
    ctx.generate_id(&seed, |hex| format!("{}-{}", prefix, hex))
}

/// The resource's `Ref` value as a string, through the shared reference cache
pub(super) fn ref_string(
    call: &ResourceCall<'_>,
    ctx: &mut ResolvingContext<'_>,
) -> Result<String, ResolveError> {
    match reference_value(call.logical_id, ctx)? {
        Value::String(s) => Ok(s),
        other => Err(ResolveError::unexpected_type("Ref", "string", &other)),
    }
}

/// `arn:<partition>:<service>:<region>:<account>:<resource>`
pub(super) fn arn(ctx: &ResolvingContext<'_>, service: &str, resource: &str) -> String {
    format!(
        "arn:{}:{}:{}:{}:{}",
        ctx.partition(),
        service,
        ctx.region(),
        ctx.account_id(),
        resource
    )
}

/// ARN for global services that omit region and account (S3)
pub(super) fn global_arn(ctx: &ResolvingContext<'_>, service: &str, resource: &str) -> String {
    format!("arn:{}:{}:::{}", ctx.partition(), service, resource)
}

/// ARN for services that omit the region (IAM)
pub(super) fn account_arn(ctx: &ResolvingContext<'_>, service: &str, resource: &str) -> String {
    format!("arn:{}:{}::{}:{}", ctx.partition(), service, ctx.account_id(), resource)
}
