//! Host primitives exposed to scripts. The table below is the only coupling
//! between the shell and script code: each entry is a name plus a function
//! taking a slice of argument values and returning a result value.

use crate::engine::{
    value::{ErrorValue, HostFn, Value},
    Engine,
};

pub fn install(engine: &mut Engine) {
    const TABLE: [(&str, HostFn); 3] = [("print", print), ("assert", assert), ("gc", gc)];
    for (name, callback) in TABLE {
        engine.register_global(name, callback);
    }
}

/// Write the values to stdout, space-separated, with a trailing newline.
/// NUL characters are printed as a six-character escape so they survive terminal output.
pub fn print_values(args: &[Value]) {
    let mut out = String::new();
    for (idx, arg) in args.iter().enumerate() {
        if idx > 0 {
            out.push(' ');
        }
        for ch in arg.to_string().chars() {
            if ch == '\0' {
                out.push_str("\\u0000");
            } else {
                out.push(ch);
            }
        }
    }
    println!("{out}");
}

fn print(args: &[Value]) -> Result<Value, ErrorValue> {
    print_values(args);
    Ok(Value::undefined())
}

/// True only for a single boolean `true` argument; anything else is a fatal
/// assertion failure that terminates the run.
fn assert(args: &[Value]) -> Result<Value, ErrorValue> {
    if args.len() == 1 && args[0].as_bool() == Some(true) {
        Ok(Value::bool(true))
    } else {
        Err(ErrorValue::assertion())
    }
}

/// Collection hint. The engine's reference-counted heap reclaims eagerly, so
/// there is nothing to prod; the call still succeeds.
fn gc(_args: &[Value]) -> Result<Value, ErrorValue> {
    Ok(Value::undefined())
}
