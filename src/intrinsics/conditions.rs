//! Condition functions: `Fn::Not`, `Fn::And`, `Fn::Or`, `Fn::Equals`, `Fn::If`, `Fn::Contains`
//!
//! Condition operands accept a boolean, the strings `"true"` / `"false"`, the
//! name of an entry in the template's `Conditions` section, or a nested
//! intrinsic expression that evaluates to a boolean.

use serde_json::Value;

use super::expect_arity;
use crate::context::ResolvingContext;
use crate::error::{type_name, ResolveError};
use crate::resolver::{resolve_fully, Intrinsic};

const NOT: &str = "Fn::Not";
const AND: &str = "Fn::And";
const OR: &str = "Fn::Or";
const EQUALS: &str = "Fn::Equals";
const IF: &str = "Fn::If";
const CONTAINS: &str = "Fn::Contains";

/// Evaluate a named entry of the `Conditions` section
pub fn named_condition(name: &str, ctx: &mut ResolvingContext<'_>) -> Result<bool, ResolveError> {
    let expr = ctx
        .template()
        .condition(name)
        .ok_or_else(|| ResolveError::unresolved(name))?;

    let key = format!("Conditions/{}", name);
    ctx.enter_reference(&key)?;
    let result = ctx.with_path("Conditions", |ctx| {
        ctx.with_path(name, |ctx| match resolve_fully(expr, ctx)? {
            Value::Bool(b) => Ok(b),
            other => Err(ResolveError::UnexpectedType {
                function: "Conditions",
                expected: "boolean",
                found: format!("{} for condition '{}'", type_name(&other), name),
            }),
        })
    });
    ctx.leave_reference(&key);
    result
}

/// Coerce one condition operand to a boolean
fn condition_operand(
    function: &'static str,
    operand: &Value,
    ctx: &mut ResolvingContext<'_>,
) -> Result<bool, ResolveError> {
    match operand {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s == "true" => Ok(true),
        Value::String(s) if s == "false" => Ok(false),
        Value::String(name) => named_condition(name, ctx),
        expr if Intrinsic::is_expression(expr) => match resolve_fully(expr, ctx)? {
            Value::Bool(b) => Ok(b),
            other => Err(ResolveError::unexpected_type(function, "boolean", &other)),
        },
        other => Err(ResolveError::unexpected_type(
            function,
            "boolean, condition name or condition expression",
            other,
        )),
    }
}

fn condition_list<'v>(
    function: &'static str,
    operand: &'v Value,
) -> Result<&'v [Value], ResolveError> {
    match operand {
        Value::Array(items) if items.is_empty() => Err(ResolveError::wrong_shape(
            function,
            "expected at least one condition",
        )),
        Value::Array(items) => Ok(items),
        other => Err(ResolveError::wrong_shape(
            function,
            format!("expected a list of conditions, found {}", type_name(other)),
        )),
    }
}

pub(super) fn evaluate_not(
    operand: &Value,
    ctx: &mut ResolvingContext<'_>,
) -> Result<Value, ResolveError> {
    let items = expect_arity(NOT, operand, 1)?;
    let value = condition_operand(NOT, &items[0], ctx)?;
    Ok(Value::Bool(!value))
}

pub(super) fn evaluate_and(
    operand: &Value,
    ctx: &mut ResolvingContext<'_>,
) -> Result<Value, ResolveError> {
    for (index, item) in condition_list(AND, operand)?.iter().enumerate() {
        if !ctx.with_path(index.to_string(), |ctx| condition_operand(AND, item, ctx))? {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

pub(super) fn evaluate_or(
    operand: &Value,
    ctx: &mut ResolvingContext<'_>,
) -> Result<Value, ResolveError> {
    for (index, item) in condition_list(OR, operand)?.iter().enumerate() {
        if ctx.with_path(index.to_string(), |ctx| condition_operand(OR, item, ctx))? {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

pub(super) fn evaluate_equals(
    operand: &Value,
    ctx: &mut ResolvingContext<'_>,
) -> Result<Value, ResolveError> {
    let items = expect_arity(EQUALS, operand, 2)?;
    let left = ctx.with_path("0", |ctx| resolve_fully(&items[0], ctx))?;
    let right = ctx.with_path("1", |ctx| resolve_fully(&items[1], ctx))?;
    Ok(Value::Bool(values_equal(&left, &right)))
}

/// Structural equality where numbers compare by numeric value (`1 == 1.0`)
pub(crate) fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
                a == b
            } else if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64()) {
                a == b
            } else {
                a.as_f64() == b.as_f64()
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(a, b)| values_equal(a, b))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, a)| b.get(key).is_some_and(|b| values_equal(a, b)))
        }
        (a, b) => a == b,
    }
}

/// Returns the chosen branch unresolved
pub(super) fn evaluate_if(
    operand: &Value,
    ctx: &mut ResolvingContext<'_>,
) -> Result<Value, ResolveError> {
    let items = expect_arity(IF, operand, 3)?;
    let branch = if ctx.with_path("0", |ctx| condition_operand(IF, &items[0], ctx))? {
        &items[1]
    } else {
        &items[2]
    };
    Ok(branch.clone())
}

pub(super) fn evaluate_contains(
    operand: &Value,
    ctx: &mut ResolvingContext<'_>,
) -> Result<Value, ResolveError> {
    let items = expect_arity(CONTAINS, operand, 2)?;
    let list = match ctx.with_path("0", |ctx| resolve_fully(&items[0], ctx))? {
        Value::Array(list) => list,
        other => return Err(ResolveError::unexpected_type(CONTAINS, "list", &other)),
    };
    let needle = ctx.with_path("1", |ctx| resolve_fully(&items[1], ctx))?;
    Ok(Value::Bool(list.iter().any(|item| values_equal(item, &needle))))
}
