//! The `string` namespace.
//!
//! Positions and lengths count bytes, matching the lexicographic ordering
//! the comparison operators use.

use crate::error::RuntimeError;
use crate::value::Value;

use super::{expect_int, expect_string, NativeType, StdlibRegistry};

pub(super) fn register(registry: &mut StdlibRegistry) {
    registry.add("string.length", &[NativeType::Str], NativeType::Int, length);
    registry.add("string.toUpper", &[NativeType::Str], NativeType::Str, to_upper);
    registry.add("string.toLower", &[NativeType::Str], NativeType::Str, to_lower);
    registry.add("string.trim", &[NativeType::Str], NativeType::Str, trim);
    registry.add(
        "string.contains",
        &[NativeType::Str, NativeType::Str],
        NativeType::Bool,
        contains,
    );
    registry.add(
        "string.substring",
        &[NativeType::Str, NativeType::Int, NativeType::Int],
        NativeType::Str,
        substring,
    );
    registry.add(
        "string.indexOf",
        &[NativeType::Str, NativeType::Str],
        NativeType::Int,
        index_of,
    );
}

fn length(args: &[Value]) -> Result<Value, RuntimeError> {
    let value = expect_string("string.length", args, 0)?;
    Ok(Value::Int(value.len() as i64))
}

fn to_upper(args: &[Value]) -> Result<Value, RuntimeError> {
    let value = expect_string("string.toUpper", args, 0)?;
    Ok(Value::String(value.to_uppercase()))
}

fn to_lower(args: &[Value]) -> Result<Value, RuntimeError> {
    let value = expect_string("string.toLower", args, 0)?;
    Ok(Value::String(value.to_lowercase()))
}

fn trim(args: &[Value]) -> Result<Value, RuntimeError> {
    let value = expect_string("string.trim", args, 0)?;
    Ok(Value::String(value.trim().to_string()))
}

fn contains(args: &[Value]) -> Result<Value, RuntimeError> {
    let haystack = expect_string("string.contains", args, 0)?;
    let needle = expect_string("string.contains", args, 1)?;
    Ok(Value::Bool(haystack.contains(needle)))
}

/// `substring(s, start, end)` with `0 <= start <= end <= len`. The byte
/// offsets must fall on character boundaries.
fn substring(args: &[Value]) -> Result<Value, RuntimeError> {
    let value = expect_string("string.substring", args, 0)?;
    let start = expect_int("string.substring", args, 1)?;
    let end = expect_int("string.substring", args, 2)?;
    if start < 0 || end < start || end as usize > value.len() {
        return Err(RuntimeError::InvalidArgument {
            function: "string.substring".to_string(),
            message: format!("range {start}..{end} out of bounds for length {}", value.len()),
        });
    }
    match value.get(start as usize..end as usize) {
        Some(slice) => Ok(Value::String(slice.to_string())),
        None => Err(RuntimeError::InvalidArgument {
            function: "string.substring".to_string(),
            message: format!("range {start}..{end} does not fall on character boundaries"),
        }),
    }
}

/// Byte offset of the first occurrence, or `-1` when absent.
fn index_of(args: &[Value]) -> Result<Value, RuntimeError> {
    let haystack = expect_string("string.indexOf", args, 0)?;
    let needle = expect_string("string.indexOf", args, 1)?;
    Ok(Value::Int(
        haystack.find(needle).map_or(-1, |position| position as i64),
    ))
}
