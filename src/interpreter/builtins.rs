/// Built-in functions.
///
/// Callable both as ordinary `Call` statements and in expression position.
/// Argument-type mismatches raise type errors; wrong counts raise arity
/// errors.
use crate::value::{vyra_repr, Value};

use super::RuntimeError;

const NAMES: &[&str] = &[
    "length",
    "len",
    "abs",
    "round",
    "uppercase",
    "lowercase",
    "split",
    "join",
    "type_of",
    "int",
    "float",
    "text",
];

pub(super) fn is_builtin(name: &str) -> bool {
    NAMES.contains(&name)
}

pub(super) fn call(name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match name {
        "length" | "len" => {
            let arg = one(name, args)?;
            match arg {
                Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                Value::List(items) => Ok(Value::Int(items.borrow().len() as i64)),
                other => Err(type_err(name, &other)),
            }
        }
        "abs" => {
            let arg = one(name, args)?;
            match arg {
                Value::Int(i) => Ok(Value::Int(i.abs())),
                Value::Float(f) => Ok(Value::Float(f.abs())),
                other => Err(type_err(name, &other)),
            }
        }
        "round" => {
            let arg = one(name, args)?;
            match arg {
                Value::Int(i) => Ok(Value::Int(i)),
                Value::Float(f) => Ok(Value::Int(f.round() as i64)),
                other => Err(type_err(name, &other)),
            }
        }
        "uppercase" => {
            let arg = one(name, args)?;
            match arg {
                Value::Str(s) => Ok(Value::Str(s.to_uppercase())),
                other => Err(type_err(name, &other)),
            }
        }
        "lowercase" => {
            let arg = one(name, args)?;
            match arg {
                Value::Str(s) => Ok(Value::Str(s.to_lowercase())),
                other => Err(type_err(name, &other)),
            }
        }
        "split" => {
            let (a, b) = two(name, args)?;
            match (a, b) {
                (Value::Str(s), Value::Str(sep)) => {
                    let parts: Vec<Value> = if sep.is_empty() {
                        s.chars().map(|c| Value::Str(c.to_string())).collect()
                    } else {
                        s.split(&sep).map(|p| Value::Str(p.to_string())).collect()
                    };
                    Ok(Value::list(parts))
                }
                (a, _) => Err(type_err(name, &a)),
            }
        }
        "join" => {
            let (a, b) = two(name, args)?;
            match (a, b) {
                (Value::List(items), Value::Str(sep)) => {
                    let parts: Vec<String> = items.borrow().iter().map(vyra_repr).collect();
                    Ok(Value::Str(parts.join(&sep)))
                }
                (a, _) => Err(type_err(name, &a)),
            }
        }
        "type_of" => {
            let arg = one(name, args)?;
            Ok(Value::Str(arg.type_name().to_string()))
        }
        "int" => {
            let arg = one(name, args)?;
            match arg {
                Value::Int(i) => Ok(Value::Int(i)),
                Value::Float(f) => Ok(Value::Int(f as i64)),
                Value::Bool(b) => Ok(Value::Int(b as i64)),
                Value::Str(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
                    RuntimeError::Type(format!("cannot convert '{}' to an integer", s))
                }),
                other => Err(type_err(name, &other)),
            }
        }
        "float" => {
            let arg = one(name, args)?;
            match arg {
                Value::Int(i) => Ok(Value::Float(i as f64)),
                Value::Float(f) => Ok(Value::Float(f)),
                Value::Str(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
                    RuntimeError::Type(format!("cannot convert '{}' to a float", s))
                }),
                other => Err(type_err(name, &other)),
            }
        }
        "text" => {
            let arg = one(name, args)?;
            Ok(Value::Str(vyra_repr(&arg)))
        }
        _ => Err(RuntimeError::Name(format!("builtin '{}'", name))),
    }
}

fn one(name: &str, mut args: Vec<Value>) -> Result<Value, RuntimeError> {
    if args.len() != 1 {
        return Err(RuntimeError::Arity {
            name: name.to_string(),
            expected: 1,
            got: args.len(),
        });
    }
    Ok(args.remove(0))
}

fn two(name: &str, mut args: Vec<Value>) -> Result<(Value, Value), RuntimeError> {
    if args.len() != 2 {
        return Err(RuntimeError::Arity {
            name: name.to_string(),
            expected: 2,
            got: args.len(),
        });
    }
    let b = args.remove(1);
    let a = args.remove(0);
    Ok((a, b))
}

fn type_err(name: &str, arg: &Value) -> RuntimeError {
    RuntimeError::Type(format!("{}() does not support {}", name, arg.type_name()))
}
