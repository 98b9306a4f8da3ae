//! Host functions every script run from the command line can call.

use ember_lang::{Interpreter, RuntimeError, Value};

pub const NAMES: [&str; 2] = ["print", "typeof"];

pub fn install(interp: &mut Interpreter) {
    interp.register_fn("print", None, |args| {
        println!("{}", render(args));
        Ok(Value::Null)
    });
    interp.register_fn("typeof", Some(1), |args| match args {
        [v] => Ok(Value::from(v.type_name())),
        _ => Err(RuntimeError::host("typeof expects one argument")),
    });
}

/// Space-separated, with strings printed bare.
fn render(args: &[Value]) -> String {
    args.iter()
        .map(|v| match v {
            Value::Str(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
