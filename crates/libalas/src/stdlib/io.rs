//! The `io` namespace: console and file access.
//!
//! Every function blocks synchronously; there is no asynchronous I/O at
//! the language level. Filesystem and stream failures surface as
//! `RuntimeError::Io` values, never panics.

use std::io::{BufRead, Write};

use crate::error::RuntimeError;
use crate::value::Value;

use super::{expect_string, NativeType, StdlibRegistry};

pub(super) fn register(registry: &mut StdlibRegistry) {
    registry.add("io.print", &[NativeType::Any], NativeType::Void, print);
    registry.add("io.println", &[NativeType::Any], NativeType::Void, println);
    registry.add("io.readLine", &[], NativeType::Str, read_line);
    registry.add("io.readFile", &[NativeType::Str], NativeType::Str, read_file);
    registry.add(
        "io.writeFile",
        &[NativeType::Str, NativeType::Str],
        NativeType::Void,
        write_file,
    );
}

fn io_error(error: std::io::Error) -> RuntimeError {
    RuntimeError::Io {
        message: error.to_string(),
    }
}

fn print(args: &[Value]) -> Result<Value, RuntimeError> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    write!(handle, "{}", args[0]).map_err(io_error)?;
    handle.flush().map_err(io_error)?;
    Ok(Value::Void)
}

fn println(args: &[Value]) -> Result<Value, RuntimeError> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", args[0]).map_err(io_error)?;
    Ok(Value::Void)
}

/// Reads one line from stdin, without the trailing newline.
fn read_line(_args: &[Value]) -> Result<Value, RuntimeError> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line).map_err(io_error)?;
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    Ok(Value::String(line))
}

fn read_file(args: &[Value]) -> Result<Value, RuntimeError> {
    let path = expect_string("io.readFile", args, 0)?;
    std::fs::read_to_string(path).map(Value::String).map_err(io_error)
}

fn write_file(args: &[Value]) -> Result<Value, RuntimeError> {
    let path = expect_string("io.writeFile", args, 0)?;
    let content = expect_string("io.writeFile", args, 1)?;
    std::fs::write(path, content).map_err(io_error)?;
    Ok(Value::Void)
}
