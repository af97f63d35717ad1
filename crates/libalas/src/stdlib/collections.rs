//! The `collections` namespace: length, membership and mutation of the
//! shared container values.
//!
//! Mutating functions (`append`, `remove`) operate on the container in
//! place, so every variable aliasing it observes the change. `append`
//! returns the container itself for chaining; `remove` returns the value
//! that was removed.

use crate::error::RuntimeError;
use crate::value::Value;

use super::{expect_int, expect_map, expect_string, NativeType, StdlibRegistry};

pub(super) fn register(registry: &mut StdlibRegistry) {
    registry.add("collections.length", &[NativeType::Any], NativeType::Int, length);
    registry.add(
        "collections.contains",
        &[NativeType::Any, NativeType::Any],
        NativeType::Bool,
        contains,
    );
    registry.add(
        "collections.append",
        &[NativeType::Any, NativeType::Any],
        NativeType::Any,
        append,
    );
    registry.add(
        "collections.remove",
        &[NativeType::Any, NativeType::Any],
        NativeType::Any,
        remove,
    );
    registry.add("collections.keys", &[NativeType::Any], NativeType::Any, keys);
    registry.add("collections.values", &[NativeType::Any], NativeType::Any, values);
}

/// Element count of an array or map; byte length of a string.
fn length(args: &[Value]) -> Result<Value, RuntimeError> {
    let length = match &args[0] {
        Value::Array(array) => array.borrow().len(),
        Value::Map(map) => map.borrow().len(),
        Value::String(value) => value.len(),
        other => {
            return Err(RuntimeError::InvalidArgument {
                function: "collections.length".to_string(),
                message: format!("argument 0 must be a container, got {}", other.type_name()),
            })
        }
    };
    Ok(Value::Int(length as i64))
}

/// Membership: array element equality, or map key presence.
fn contains(args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Array(array) => Ok(Value::Bool(array.borrow().iter().any(|element| element == &args[1]))),
        Value::Map(map) => {
            let key = expect_string("collections.contains", args, 1)?;
            Ok(Value::Bool(map.borrow().contains_key(key)))
        }
        other => Err(RuntimeError::InvalidArgument {
            function: "collections.contains".to_string(),
            message: format!("argument 0 must be a container, got {}", other.type_name()),
        }),
    }
}

fn append(args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Array(array) => {
            array.borrow_mut().push(args[1].clone());
            Ok(args[0].clone())
        }
        other => Err(RuntimeError::InvalidArgument {
            function: "collections.append".to_string(),
            message: format!("argument 0 must be an array, got {}", other.type_name()),
        }),
    }
}

fn remove(args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Array(array) => {
            let index = expect_int("collections.remove", args, 1)?;
            let mut array = array.borrow_mut();
            if index < 0 || index as usize >= array.len() {
                return Err(RuntimeError::IndexOutOfBounds {
                    index,
                    len: array.len(),
                });
            }
            Ok(array.remove(index as usize))
        }
        Value::Map(map) => {
            let key = expect_string("collections.remove", args, 1)?;
            map.borrow_mut()
                .shift_remove(key)
                .ok_or_else(|| RuntimeError::MissingKey { key: key.to_string() })
        }
        other => Err(RuntimeError::InvalidArgument {
            function: "collections.remove".to_string(),
            message: format!("argument 0 must be a container, got {}", other.type_name()),
        }),
    }
}

/// Map keys as a fresh array, in insertion order.
fn keys(args: &[Value]) -> Result<Value, RuntimeError> {
    let map = expect_map("collections.keys", args, 0)?;
    let keys = map.borrow().keys().map(|key| Value::String(key.clone())).collect();
    Ok(Value::array(keys))
}

/// Map values as a fresh array, in insertion order.
fn values(args: &[Value]) -> Result<Value, RuntimeError> {
    let map = expect_map("collections.values", args, 0)?;
    let values = map.borrow().values().cloned().collect();
    Ok(Value::array(values))
}
