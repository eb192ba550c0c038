//! String functions: `Fn::Join`, `Fn::Split`, `Fn::Sub`, `Fn::Base64`, `Fn::ToJsonString`

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{Map, Value};

use super::{expect_arity, resolve_string};
use crate::context::ResolvingContext;
use crate::error::{type_name, ResolveError};
use crate::placeholder::{extract_placeholders, substitute_placeholders};
use crate::resolver::resolve_fully;

const JOIN: &str = "Fn::Join";
const SPLIT: &str = "Fn::Split";
const SUB: &str = "Fn::Sub";
const BASE64: &str = "Fn::Base64";
const TO_JSON_STRING: &str = "Fn::ToJsonString";

pub(super) fn evaluate_join(
    operand: &Value,
    ctx: &mut ResolvingContext<'_>,
) -> Result<Value, ResolveError> {
    let items = expect_arity(JOIN, operand, 2)?;
    let delimiter = match &items[0] {
        Value::String(d) => d.as_str(),
        other => return Err(ResolveError::unexpected_type(JOIN, "string delimiter", other)),
    };

    let values = match &items[1] {
        Value::Array(values) => values,
        other => return Err(ResolveError::unexpected_type(JOIN, "list of values", other)),
    };

    let mut parts = Vec::with_capacity(values.len());
    for (index, value) in values.iter().enumerate() {
        let part = ctx.with_path(index.to_string(), |ctx| resolve_string(JOIN, value, ctx))?;
        parts.push(part);
    }
    Ok(Value::String(parts.join(delimiter)))
}

pub(super) fn evaluate_split(
    operand: &Value,
    ctx: &mut ResolvingContext<'_>,
) -> Result<Value, ResolveError> {
    let items = expect_arity(SPLIT, operand, 2)?;
    let delimiter = match &items[0] {
        Value::String(d) if d.is_empty() => {
            return Err(ResolveError::wrong_shape(SPLIT, "delimiter must not be empty"))
        }
        Value::String(d) => d.clone(),
        other => return Err(ResolveError::unexpected_type(SPLIT, "string delimiter", other)),
    };
    let source = resolve_string(SPLIT, &items[1], ctx)?;
    Ok(Value::Array(
        source
            .split(delimiter.as_str())
            .map(|part| Value::String(part.to_string()))
            .collect(),
    ))
}

pub(super) fn evaluate_sub(
    operand: &Value,
    ctx: &mut ResolvingContext<'_>,
) -> Result<Value, ResolveError> {
    match operand {
        Value::String(template) => substitute_from_cache(template, ctx),
        Value::Array(_) => {
            let items = expect_arity(SUB, operand, 2)?;
            let template = match &items[0] {
                Value::String(t) => t,
                other => return Err(ResolveError::unexpected_type(SUB, "template string", other)),
            };
            let variables = match &items[1] {
                Value::Object(vars) => vars,
                other => {
                    return Err(ResolveError::unexpected_type(SUB, "mapping of variables", other))
                }
            };
            substitute_from_variables(template, variables, ctx)
        }
        other => Err(ResolveError::unexpected_type(
            SUB,
            "template string or [template, variables]",
            other,
        )),
    }
}

/// String form: every placeholder must already be cached
fn substitute_from_cache(
    template: &str,
    ctx: &mut ResolvingContext<'_>,
) -> Result<Value, ResolveError> {
    let mut values = Map::new();
    for name in extract_placeholders(template) {
        if !ctx.has_key(&name) {
            return Err(ResolveError::missing_key(name));
        }
        let value = ctx.get(&name)?.clone();
        values.insert(name, value);
    }
    Ok(Value::String(substitute_placeholders(template, &values)))
}

/// Array form: substitution is keyed only on the supplied variables
fn substitute_from_variables(
    template: &str,
    variables: &Map<String, Value>,
    ctx: &mut ResolvingContext<'_>,
) -> Result<Value, ResolveError> {
    let mut values = Map::new();
    for (name, expr) in variables {
        let value = ctx.with_path(name.as_str(), |ctx| resolve_fully(expr, ctx))?;
        if value.is_null() {
            return Err(ResolveError::UnexpectedType {
                function: SUB,
                expected: "non-null variable value",
                found: format!("null for '{}'", name),
            });
        }
        values.insert(name.clone(), value);
    }
    Ok(Value::String(substitute_placeholders(template, &values)))
}

pub(super) fn evaluate_base64(
    operand: &Value,
    ctx: &mut ResolvingContext<'_>,
) -> Result<Value, ResolveError> {
    let text = resolve_string(BASE64, operand, ctx)?;
    Ok(Value::String(STANDARD.encode(text.as_bytes())))
}

pub(super) fn evaluate_to_json_string(
    operand: &Value,
    ctx: &mut ResolvingContext<'_>,
) -> Result<Value, ResolveError> {
    if operand.is_string() {
        return Ok(operand.clone());
    }
    match resolve_fully(operand, ctx)? {
        Value::String(s) => Ok(Value::String(s)),
        value @ (Value::Object(_) | Value::Array(_)) => serde_json::to_string(&value)
            .map(Value::String)
            .map_err(|e| ResolveError::UnexpectedType {
                function: TO_JSON_STRING,
                expected: "serializable value",
                found: e.to_string(),
            }),
        other => Err(ResolveError::UnexpectedType {
            function: TO_JSON_STRING,
            expected: "string, mapping or list",
            found: type_name(&other).to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextSettings;
    use crate::intrinsics::evaluate;
    use crate::resolver::Intrinsic;
    use crate::template::Template;
    use serde_json::json;

    fn run(intrinsic: Intrinsic, operand: Value) -> Result<Value, ResolveError> {
        let template = Template::new().with_parameter("Env", json!("dev"));
        let mut ctx = ResolvingContext::new(&template, ContextSettings::default());
        evaluate(intrinsic, &operand, &mut ctx)
    }

    #[test]
    fn test_join() {
        assert_eq!(run(Intrinsic::Join, json!([",", ["a", "b", "c"]])), Ok(json!("a,b,c")));
        assert_eq!(run(Intrinsic::Join, json!(["-", []])), Ok(json!("")));
        assert_eq!(
            run(Intrinsic::Join, json!([":", ["x", { "Ref": "Env" }]])),
            Ok(json!("x:dev"))
        );
    }

    #[test]
    fn test_join_values_must_be_literal_list() {
        assert!(matches!(
            run(Intrinsic::Join, json!([",", { "Fn::GetAZs": "us-west-1" }])),
            Err(ResolveError::UnexpectedType { .. })
        ));
        assert!(matches!(
            run(Intrinsic::Join, json!([",", { "Fn::Split": [",", "a,b"] }])),
            Err(ResolveError::UnexpectedType { .. })
        ));
    }

    #[test]
    fn test_join_errors() {
        assert!(matches!(
            run(Intrinsic::Join, json!([","])),
            Err(ResolveError::WrongShape { .. })
        ));
        assert!(matches!(
            run(Intrinsic::Join, json!([1, ["a"]])),
            Err(ResolveError::UnexpectedType { .. })
        ));
        assert!(matches!(
            run(Intrinsic::Join, json!([",", "a,b"])),
            Err(ResolveError::UnexpectedType { .. })
        ));
        assert!(matches!(
            run(Intrinsic::Join, json!([",", ["a", 2]])),
            Err(ResolveError::UnexpectedType { .. })
        ));
    }

    #[test]
    fn test_split() {
        assert_eq!(run(Intrinsic::Split, json!([",", "a,b,,c"])), Ok(json!(["a", "b", "", "c"])));
        assert_eq!(run(Intrinsic::Split, json!(["|", "abc"])), Ok(json!(["abc"])));
        assert_eq!(
            run(Intrinsic::Split, json!(["-", { "Ref": "AWS::Region" }])),
            Ok(json!(["us", "east", "1"]))
        );
    }

    #[test]
    fn test_split_errors() {
        assert!(matches!(
            run(Intrinsic::Split, json!(["", "abc"])),
            Err(ResolveError::WrongShape { .. })
        ));
        assert!(matches!(
            run(Intrinsic::Split, json!([null, "abc"])),
            Err(ResolveError::UnexpectedType { .. })
        ));
        assert!(matches!(
            run(Intrinsic::Split, json!([",", ["a"]])),
            Err(ResolveError::UnexpectedType { .. })
        ));
    }

    #[test]
    fn test_split_inverts_join() {
        let parts = json!(["alpha", "beta", "", "gamma delta"]);
        for delimiter in [",", "::", " | "] {
            let joined = run(Intrinsic::Join, json!([delimiter, parts.clone()])).unwrap();
            assert_eq!(run(Intrinsic::Split, json!([delimiter, joined])).unwrap(), parts);
        }
    }

    #[test]
    fn test_sub_string_form_uses_cache() {
        assert_eq!(
            run(Intrinsic::Sub, json!("${Env}-${AWS::Region}")),
            Ok(json!("dev-us-east-1"))
        );
        assert_eq!(
            run(Intrinsic::Sub, json!("${Missing} here")),
            Err(ResolveError::missing_key("Missing"))
        );
    }

    #[test]
    fn test_sub_array_form() {
        assert_eq!(
            run(
                Intrinsic::Sub,
                json!(["${Greeting}, ${Who}! ${Other}", {
                    "Greeting": "Hello",
                    "Who": { "Fn::Join": [" ", ["big", "world"]] }
                }])
            ),
            Ok(json!("Hello, big world! ${Other}"))
        );
    }

    #[test]
    fn test_sub_array_form_ignores_cache() {
        // Env is cached but not supplied, so its placeholder stays
        assert_eq!(
            run(Intrinsic::Sub, json!(["${Env}", {}])),
            Ok(json!("${Env}"))
        );
    }

    #[test]
    fn test_sub_array_form_errors() {
        assert!(matches!(
            run(Intrinsic::Sub, json!(["${A}", { "A": null }])),
            Err(ResolveError::UnexpectedType { .. })
        ));
        assert!(matches!(
            run(Intrinsic::Sub, json!(["${A}"])),
            Err(ResolveError::WrongShape { .. })
        ));
        assert!(matches!(
            run(Intrinsic::Sub, json!([1, {}])),
            Err(ResolveError::UnexpectedType { .. })
        ));
        assert!(matches!(
            run(Intrinsic::Sub, json!(["${A}", ["A"]])),
            Err(ResolveError::UnexpectedType { .. })
        ));
        assert!(matches!(
            run(Intrinsic::Sub, json!(["${A}", { "A": { "Ref": "Ghost" } }])),
            Err(ResolveError::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn test_base64() {
        assert_eq!(run(Intrinsic::Base64, json!("hello")), Ok(json!("aGVsbG8=")));
        assert_eq!(
            run(Intrinsic::Base64, json!({ "Fn::Sub": "#!/bin/sh\necho ${Env}" })),
            Ok(json!("IyEvYmluL3NoCmVjaG8gZGV2"))
        );
        assert!(matches!(
            run(Intrinsic::Base64, json!(5)),
            Err(ResolveError::UnexpectedType { .. })
        ));
    }

    #[test]
    fn test_to_json_string() {
        assert_eq!(run(Intrinsic::ToJsonString, json!("raw")), Ok(json!("raw")));
        assert_eq!(
            run(Intrinsic::ToJsonString, json!({ "b": { "Ref": "Env" }, "a": [1, true] })),
            Ok(json!(r#"{"b":"dev","a":[1,true]}"#))
        );
        assert_eq!(run(Intrinsic::ToJsonString, json!(["x"])), Ok(json!(r#"["x"]"#)));
        assert_eq!(
            run(Intrinsic::ToJsonString, json!({ "Ref": "Env" })),
            Ok(json!("dev"))
        );
        assert!(matches!(
            run(Intrinsic::ToJsonString, json!(42)),
            Err(ResolveError::UnexpectedType { .. })
        ));
    }
}
