//! `Ref` and `Fn::GetAtt`

use serde_json::Value;

use super::{expect_arity, resolve_string};
use crate::context::ResolvingContext;
use crate::error::ResolveError;
use crate::registry::ResourceCall;

const REF: &str = "Ref";
const GET_ATT: &str = "Fn::GetAtt";

pub(super) fn evaluate_ref(
    operand: &Value,
    ctx: &mut ResolvingContext<'_>,
) -> Result<Value, ResolveError> {
    let name = resolve_string(REF, operand, ctx)?;
    reference_value(&name, ctx)
}

/// Resolve a reference by name
///
/// The cache (pseudo-parameters, parameters, earlier references) is consulted
/// first, then the template's resources. The resource strategy result is
/// cached under `name`.
pub fn reference_value(name: &str, ctx: &mut ResolvingContext<'_>) -> Result<Value, ResolveError> {
    if ctx.has_key(name) {
        tracing::debug!(name, "reference cache hit");
        return ctx.get(name).cloned();
    }

    let template = ctx.template();
    let resource = template
        .resource(name)
        .ok_or_else(|| ResolveError::unresolved(name))?;
    let strategy = ctx.registry().lookup(&resource.resource_type);
    let call = ResourceCall {
        resource_type: &resource.resource_type,
        logical_id: name,
        resource,
    };

    tracing::debug!(name, resource_type = %resource.resource_type, "invoking reference strategy");
    ctx.enter_reference(name)?;
    let result = (strategy.reference)(&call, ctx);
    ctx.leave_reference(name);

    let value = result?;
    ctx.put(name, value.clone());
    Ok(value)
}

pub(super) fn evaluate_get_att(
    operand: &Value,
    ctx: &mut ResolvingContext<'_>,
) -> Result<Value, ResolveError> {
    let items = expect_arity(GET_ATT, operand, 2)?;
    let logical_id = resolve_string(GET_ATT, &items[0], ctx)?;
    let attribute = resolve_string(GET_ATT, &items[1], ctx)?;
    attribute_value(&logical_id, &attribute, ctx)
}

/// Resolve a resource attribute, cached under `logicalId:attribute`
pub fn attribute_value(
    logical_id: &str,
    attribute: &str,
    ctx: &mut ResolvingContext<'_>,
) -> Result<Value, ResolveError> {
    let key = format!("{}:{}", logical_id, attribute);
    if ctx.has_key(&key) {
        tracing::debug!(key = %key, "attribute cache hit");
        return ctx.get(&key).cloned();
    }

    let template = ctx.template();
    let resource = template.resource(logical_id).ok_or_else(|| {
        ResolveError::lookup(GET_ATT, format!("resource '{}' not found", logical_id))
    })?;
    let strategy = ctx.registry().lookup(&resource.resource_type);
    let call = ResourceCall {
        resource_type: &resource.resource_type,
        logical_id,
        resource,
    };

    tracing::debug!(key = %key, resource_type = %resource.resource_type, "invoking attribute strategy");
    ctx.enter_reference(&key)?;
    let result = (strategy.attribute)(&call, attribute, ctx);
    ctx.leave_reference(&key);

    let value = result?;
    ctx.put(key, value.clone());
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextSettings;
    use crate::intrinsics::evaluate;
    use crate::registry::{ResourceRegistry, ResourceStrategy};
    use crate::resolver::Intrinsic;
    use crate::template::{Resource, Template};
    use serde_json::json;
    use std::cell::Cell;

    thread_local! {
        static REF_CALLS: Cell<usize> = const { Cell::new(0) };
    }

    fn counting_ref(
        call: &ResourceCall<'_>,
        _ctx: &mut ResolvingContext<'_>,
    ) -> Result<Value, ResolveError> {
        REF_CALLS.with(|c| c.set(c.get() + 1));
        Ok(json!(format!("physical-{}", call.logical_id)))
    }

    fn echo_attribute(
        call: &ResourceCall<'_>,
        attribute: &str,
        _ctx: &mut ResolvingContext<'_>,
    ) -> Result<Value, ResolveError> {
        Ok(json!(format!("{}.{}", call.logical_id, attribute)))
    }

    fn counting_registry() -> ResourceRegistry {
        let mut registry = ResourceRegistry::new();
        registry.register(
            "X::Bucket",
            ResourceStrategy {
                reference: counting_ref,
                attribute: echo_attribute,
            },
        );
        registry
    }

    #[test]
    fn test_ref_uses_strategy_and_caches() {
        let template = Template::new().with_resource("Bucket", Resource::new("X::Bucket"));
        let registry = counting_registry();
        let mut ctx =
            ResolvingContext::new(&template, ContextSettings::default()).with_registry(&registry);
        REF_CALLS.with(|c| c.set(0));

        let first = evaluate(Intrinsic::Ref, &json!("Bucket"), &mut ctx).unwrap();
        let second = evaluate(Intrinsic::Ref, &json!("Bucket"), &mut ctx).unwrap();

        assert_eq!(first, json!("physical-Bucket"));
        assert_eq!(first, second);
        assert_eq!(REF_CALLS.with(|c| c.get()), 1);
        assert_eq!(ctx.get("Bucket").unwrap(), &json!("physical-Bucket"));
    }

    #[test]
    fn test_ref_name_from_expression() {
        let template = Template::new()
            .with_parameter("Target", json!("Bucket"))
            .with_resource("Bucket", Resource::new("X::Bucket"));
        let registry = counting_registry();
        let mut ctx =
            ResolvingContext::new(&template, ContextSettings::default()).with_registry(&registry);
        let value = evaluate(Intrinsic::Ref, &json!({ "Ref": "Target" }), &mut ctx).unwrap();
        assert_eq!(value, json!("physical-Bucket"));
    }

    #[test]
    fn test_ref_name_wrong_type() {
        let template = Template::new();
        let mut ctx = ResolvingContext::new(&template, ContextSettings::default());
        assert!(matches!(
            evaluate(Intrinsic::Ref, &json!(42), &mut ctx),
            Err(ResolveError::UnexpectedType { .. })
        ));
    }

    #[test]
    fn test_ref_unknown_name() {
        let template = Template::new();
        let mut ctx = ResolvingContext::new(&template, ContextSettings::default());
        assert_eq!(
            evaluate(Intrinsic::Ref, &json!("Ghost"), &mut ctx),
            Err(ResolveError::unresolved("Ghost"))
        );
    }

    #[test]
    fn test_ref_default_strategy_returns_logical_id() {
        let template = Template::new().with_resource("Thing", Resource::new("Custom::Thing"));
        let mut ctx = ResolvingContext::new(&template, ContextSettings::default());
        assert_eq!(
            evaluate(Intrinsic::Ref, &json!("Thing"), &mut ctx),
            Ok(json!("Thing"))
        );
    }

    #[test]
    fn test_get_att_caches_under_composite_key() {
        let template = Template::new().with_resource("Bucket", Resource::new("X::Bucket"));
        let registry = counting_registry();
        let mut ctx =
            ResolvingContext::new(&template, ContextSettings::default()).with_registry(&registry);
        let value = evaluate(Intrinsic::GetAtt, &json!(["Bucket", "Arn"]), &mut ctx).unwrap();
        assert_eq!(value, json!("Bucket.Arn"));
        assert_eq!(ctx.get("Bucket:Arn").unwrap(), &json!("Bucket.Arn"));
    }

    #[test]
    fn test_get_att_shape_and_lookup_errors() {
        let template = Template::new().with_resource("Thing", Resource::new("Custom::Thing"));
        let mut ctx = ResolvingContext::new(&template, ContextSettings::default());
        assert!(matches!(
            evaluate(Intrinsic::GetAtt, &json!(["Thing"]), &mut ctx),
            Err(ResolveError::WrongShape { .. })
        ));
        assert!(matches!(
            evaluate(Intrinsic::GetAtt, &json!(["Thing", 7]), &mut ctx),
            Err(ResolveError::UnexpectedType { .. })
        ));
        assert!(matches!(
            evaluate(Intrinsic::GetAtt, &json!(["Ghost", "Arn"]), &mut ctx),
            Err(ResolveError::LookupFailure { .. })
        ));
        // the default strategy supports no attributes
        assert!(matches!(
            evaluate(Intrinsic::GetAtt, &json!(["Thing", "Arn"]), &mut ctx),
            Err(ResolveError::LookupFailure { .. })
        ));
    }

    #[test]
    fn test_circular_reference_detected() {
        let template = Template::new().with_resource(
            "Bucket",
            Resource::new("AWS::S3::Bucket").with_property(
                "BucketName",
                json!({ "Fn::GetAtt": ["Bucket", "Arn"] }),
            ),
        );
        let mut ctx = ResolvingContext::new(&template, ContextSettings::default());
        let err = evaluate(Intrinsic::Ref, &json!("Bucket"), &mut ctx).unwrap_err();
        assert_eq!(
            err,
            ResolveError::circular(vec![
                "Bucket".into(),
                "Bucket:Arn".into(),
                "Bucket".into()
            ])
        );
    }
}
