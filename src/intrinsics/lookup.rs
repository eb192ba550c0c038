//! Table and list lookups: `Fn::FindInMap`, `Fn::Select`, `Fn::GetAZs`, `Fn::ImportValue`

use serde_json::Value;

use super::{expect_arity, resolve_string};
use crate::context::ResolvingContext;
use crate::error::{type_name, ResolveError};
use crate::resolver::resolve_fully;

const FIND_IN_MAP: &str = "Fn::FindInMap";
const SELECT: &str = "Fn::Select";
const GET_AZS: &str = "Fn::GetAZs";
const IMPORT_VALUE: &str = "Fn::ImportValue";

pub(super) fn evaluate_find_in_map(
    operand: &Value,
    ctx: &mut ResolvingContext<'_>,
) -> Result<Value, ResolveError> {
    let items = expect_arity(FIND_IN_MAP, operand, 3)?;
    let map_name = resolve_string(FIND_IN_MAP, &items[0], ctx)?;
    let top_key = resolve_string(FIND_IN_MAP, &items[1], ctx)?;
    let second_key = resolve_string(FIND_IN_MAP, &items[2], ctx)?;

    let mappings = ctx
        .template()
        .mappings
        .as_ref()
        .ok_or_else(|| ResolveError::lookup(FIND_IN_MAP, "template has no Mappings section"))?;
    let map = mappings.get(&map_name).ok_or_else(|| {
        ResolveError::lookup(FIND_IN_MAP, format!("mapping '{}' not found", map_name))
    })?;
    let entry = map.get(&top_key).ok_or_else(|| {
        ResolveError::lookup(
            FIND_IN_MAP,
            format!("key '{}' not found in mapping '{}'", top_key, map_name),
        )
    })?;
    match entry.get(&second_key) {
        Some(Value::Null) | None => Err(ResolveError::lookup(
            FIND_IN_MAP,
            format!(
                "no value for '{}' under '{}' in mapping '{}'",
                second_key, top_key, map_name
            ),
        )),
        Some(value) => Ok(value.clone()),
    }
}

pub(super) fn evaluate_select(
    operand: &Value,
    ctx: &mut ResolvingContext<'_>,
) -> Result<Value, ResolveError> {
    let items = expect_arity(SELECT, operand, 2)?;

    let (index, shown) = match resolve_fully(&items[0], ctx)? {
        Value::Number(n) if n.is_u64() => {
            let index = n.as_u64().and_then(|i| usize::try_from(i).ok());
            (index, n.to_string())
        }
        Value::Number(n) if n.is_i64() => (None, n.to_string()),
        Value::String(s) => (parse_index(&s)?, s),
        other => return Err(ResolveError::unexpected_type(SELECT, "integer index", &other)),
    };

    let list = match resolve_fully(&items[1], ctx)? {
        Value::Array(list) => list,
        other => return Err(ResolveError::unexpected_type(SELECT, "list", &other)),
    };

    index.and_then(|i| list.get(i).cloned()).ok_or_else(|| {
        ResolveError::wrong_shape(
            SELECT,
            format!("index {} out of bounds for list of length {}", shown, list.len()),
        )
    })
}

/// Parse a base-10 index: an optional `-` followed by ASCII digits only
///
/// Negative and oversized indexes parse to `None`, which is out of bounds.
fn parse_index(text: &str) -> Result<Option<usize>, ResolveError> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ResolveError::UnexpectedType {
            function: SELECT,
            expected: "integer index",
            found: format!("'{}'", text),
        });
    }
    if negative {
        return Ok(None);
    }
    Ok(digits.parse::<usize>().ok())
}

pub(super) fn evaluate_get_azs(
    operand: &Value,
    ctx: &mut ResolvingContext<'_>,
) -> Result<Value, ResolveError> {
    let region = match operand {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => match resolve_fully(other, ctx)? {
            Value::String(s) => Some(s),
            resolved => {
                tracing::debug!(found = type_name(&resolved), "non-string region, using default zones");
                None
            }
        },
    };
    let zones = ctx.availability_zones(region.as_deref());
    Ok(Value::Array(zones.into_iter().map(Value::String).collect()))
}

/// Exports are not looked up; the export name itself is the value
pub(super) fn evaluate_import_value(
    operand: &Value,
    ctx: &mut ResolvingContext<'_>,
) -> Result<Value, ResolveError> {
    resolve_string(IMPORT_VALUE, operand, ctx).map(Value::String)
}
