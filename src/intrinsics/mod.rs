//! Intrinsic function library
//!
//! One evaluator per supported expression form. Every evaluator validates the
//! shape of its operand before resolving anything, and may recurse back into
//! the value resolver for its operands.

mod conditions;
mod lookup;
mod reference;
mod strings;

use serde_json::Value;

use crate::context::ResolvingContext;
use crate::error::{type_name, ResolveError};
use crate::resolver::{resolve_fully, Intrinsic};

pub use conditions::named_condition;
pub use reference::{attribute_value, reference_value};

/// Evaluate a classified expression given its operand
pub fn evaluate(
    intrinsic: Intrinsic,
    operand: &Value,
    ctx: &mut ResolvingContext<'_>,
) -> Result<Value, ResolveError> {
    tracing::trace!(function = %intrinsic, "evaluating intrinsic");
    match intrinsic {
        Intrinsic::Ref => reference::evaluate_ref(operand, ctx),
        Intrinsic::GetAtt => reference::evaluate_get_att(operand, ctx),
        Intrinsic::FindInMap => lookup::evaluate_find_in_map(operand, ctx),
        Intrinsic::Join => strings::evaluate_join(operand, ctx),
        Intrinsic::Split => strings::evaluate_split(operand, ctx),
        Intrinsic::Select => lookup::evaluate_select(operand, ctx),
        Intrinsic::Sub => strings::evaluate_sub(operand, ctx),
        Intrinsic::Base64 => strings::evaluate_base64(operand, ctx),
        Intrinsic::ImportValue => lookup::evaluate_import_value(operand, ctx),
        Intrinsic::GetAZs => lookup::evaluate_get_azs(operand, ctx),
        Intrinsic::ToJsonString => strings::evaluate_to_json_string(operand, ctx),
        Intrinsic::Not => conditions::evaluate_not(operand, ctx),
        Intrinsic::And => conditions::evaluate_and(operand, ctx),
        Intrinsic::Or => conditions::evaluate_or(operand, ctx),
        Intrinsic::Equals => conditions::evaluate_equals(operand, ctx),
        Intrinsic::If => conditions::evaluate_if(operand, ctx),
        Intrinsic::Contains => conditions::evaluate_contains(operand, ctx),
    }
}

/// Evaluate a raw node as a specific intrinsic
///
/// The node must be a one-key mapping carrying exactly `intrinsic`'s key.
pub fn evaluate_as(
    intrinsic: Intrinsic,
    node: &Value,
    ctx: &mut ResolvingContext<'_>,
) -> Result<Value, ResolveError> {
    let operand = expression_operand(intrinsic, node)?;
    evaluate(intrinsic, operand, ctx)
}

/// Evaluate a raw node that must be an intrinsic expression
pub fn evaluate_expression(
    node: &Value,
    ctx: &mut ResolvingContext<'_>,
) -> Result<Value, ResolveError> {
    let map = node.as_object().ok_or_else(|| {
        ResolveError::malformed(format!("expected a one-key mapping, found {}", type_name(node)))
    })?;
    if map.len() != 1 {
        return Err(ResolveError::malformed(format!(
            "expected a one-key mapping, found {} keys",
            map.len()
        )));
    }
    match Intrinsic::classify_map(map) {
        Some((intrinsic, operand)) => evaluate(intrinsic, operand, ctx),
        None => {
            let key = map.keys().next().cloned().unwrap_or_default();
            Err(ResolveError::malformed(format!(
                "'{}' is not a supported intrinsic function",
                key
            )))
        }
    }
}

/// Validate the expression wrapper and return its operand
fn expression_operand(intrinsic: Intrinsic, node: &Value) -> Result<&Value, ResolveError> {
    let map = node.as_object().ok_or_else(|| {
        ResolveError::malformed(format!(
            "{} expects a one-key mapping, found {}",
            intrinsic,
            type_name(node)
        ))
    })?;
    if map.len() != 1 {
        return Err(ResolveError::malformed(format!(
            "{} expects a one-key mapping, found {} keys",
            intrinsic,
            map.len()
        )));
    }
    map.get(intrinsic.key())
        .ok_or_else(|| ResolveError::missing_key(intrinsic.key()))
}

/// Require a literal list operand of exactly `arity` elements
fn expect_arity<'v>(
    function: &'static str,
    operand: &'v Value,
    arity: usize,
) -> Result<&'v [Value], ResolveError> {
    match operand {
        Value::Array(items) if items.len() == arity => Ok(items),
        Value::Array(items) => Err(ResolveError::wrong_shape(
            function,
            format!("expected {} elements, found {}", arity, items.len()),
        )),
        other => Err(ResolveError::wrong_shape(
            function,
            format!("expected a list of {} elements, found {}", arity, type_name(other)),
        )),
    }
}

/// Use a string literal directly, otherwise resolve and require a string
fn resolve_string(
    function: &'static str,
    node: &Value,
    ctx: &mut ResolvingContext<'_>,
) -> Result<String, ResolveError> {
    if let Value::String(s) = node {
        return Ok(s.clone());
    }
    match resolve_fully(node, ctx)? {
        Value::String(s) => Ok(s),
        other => Err(ResolveError::unexpected_type(function, "string", &other)),
    }
}
