//! The `async` namespace: the task interface surface.
//!
//! These functions exist so programs using the task vocabulary load and
//! validate, but the implementations are immediately-completing stubs:
//! `spawn` wraps its argument in an already-completed task-status map, the
//! combinators operate on plain values, and `sleep` does not block. No
//! threads are created anywhere. Execution remains single-threaded and
//! synchronous, so program behavior is exactly as if every "task" ran
//! inline at its spawn point.

use indexmap::IndexMap;

use crate::error::RuntimeError;
use crate::value::Value;

use super::{expect_array, NativeType, StdlibRegistry};

pub(super) fn register(registry: &mut StdlibRegistry) {
    registry.add("async.spawn", &[NativeType::Any], NativeType::Any, spawn);
    registry.add("async.await", &[NativeType::Any], NativeType::Any, await_task);
    registry.add("async.parallel", &[NativeType::Any], NativeType::Any, parallel);
    registry.add("async.race", &[NativeType::Any], NativeType::Any, race);
    registry.add("async.sleep", &[NativeType::Int], NativeType::Void, sleep);
    registry.add(
        "async.timeout",
        &[NativeType::Any, NativeType::Int],
        NativeType::Any,
        timeout,
    );
    registry.add("async.cancel", &[NativeType::Any], NativeType::Bool, cancel);
}

/// Builds the task-status map every "task" is represented by.
fn completed_task(value: Value) -> Value {
    let mut task = IndexMap::new();
    task.insert("id".to_string(), Value::Int(0));
    task.insert("status".to_string(), Value::String("completed".to_string()));
    task.insert("value".to_string(), value);
    Value::map(task)
}

fn spawn(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(completed_task(args[0].clone()))
}

/// Unwraps a task-status map to its `value`; a non-task argument is
/// already a settled value and passes through.
fn await_task(args: &[Value]) -> Result<Value, RuntimeError> {
    if let Value::Map(map) = &args[0] {
        if let Some(value) = map.borrow().get("value") {
            return Ok(value.clone());
        }
    }
    Ok(args[0].clone())
}

fn parallel(args: &[Value]) -> Result<Value, RuntimeError> {
    let tasks = expect_array("async.parallel", args, 0)?;
    let settled = tasks
        .borrow()
        .iter()
        .map(|task| await_task(std::slice::from_ref(task)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::array(settled))
}

/// Every stub task completes instantly, so the first entry wins.
fn race(args: &[Value]) -> Result<Value, RuntimeError> {
    let tasks = expect_array("async.race", args, 0)?;
    let first = tasks.borrow().first().cloned();
    match first {
        Some(task) => await_task(&[task]),
        None => Err(RuntimeError::InvalidArgument {
            function: "async.race".to_string(),
            message: "argument 0 must not be empty".to_string(),
        }),
    }
}

fn sleep(_args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Void)
}

/// A completed value can no longer time out.
fn timeout(args: &[Value]) -> Result<Value, RuntimeError> {
    await_task(&args[..1])
}

/// A completed task can no longer be cancelled.
fn cancel(_args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Bool(false))
}
