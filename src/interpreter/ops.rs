/// Binary operators over runtime values.
///
/// Every operator fans out on the operand tags, promotes integer/float
/// conventionally, and raises a type error on anything else. Division and
/// modulo by zero raise their own kind, for integers and floats alike.
use crate::ast::BinOp;
use crate::value::Value;

use super::RuntimeError;

pub(super) fn eval_binop(op: &BinOp, left: Value, right: Value) -> Result<Value, RuntimeError> {
    match op {
        BinOp::Add => op_add(left, right),
        BinOp::Sub => op_sub(left, right),
        BinOp::Mul => op_mul(left, right),
        BinOp::Div => op_div(left, right),
        BinOp::Mod => op_mod(left, right),
        BinOp::Pow => op_pow(left, right),
        BinOp::Eq => Ok(Value::Bool(left == right)),
        BinOp::Neq => Ok(Value::Bool(left != right)),
        BinOp::Lt => op_compare(&left, &right, "<"),
        BinOp::Gt => op_compare(&left, &right, ">"),
        BinOp::Lte => op_compare(&left, &right, "<="),
        BinOp::Gte => op_compare(&left, &right, ">="),
        BinOp::And | BinOp::Or | BinOp::FollowedBy => {
            unreachable!("handled before operand evaluation")
        }
    }
}

fn type_error(op: &str, a: &Value, b: &Value) -> RuntimeError {
    RuntimeError::Type(format!(
        "operator '{}' does not support {} and {}",
        op,
        a.type_name(),
        b.type_name()
    ))
}

fn op_add(a: Value, b: Value) -> Result<Value, RuntimeError> {
    match (&a, &b) {
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(x.wrapping_add(*y))),
        (Value::Float(x), Value::Float(y)) => Ok(Value::Float(x + y)),
        (Value::Int(x), Value::Float(y)) => Ok(Value::Float(*x as f64 + y)),
        (Value::Float(x), Value::Int(y)) => Ok(Value::Float(x + *y as f64)),
        (Value::Str(x), Value::Str(y)) => Ok(Value::Str(format!("{}{}", x, y))),
        (Value::List(xs), Value::List(ys)) => {
            let mut items = xs.borrow().clone();
            items.extend(ys.borrow().iter().cloned());
            Ok(Value::list(items))
        }
        _ => Err(type_error("+", &a, &b)),
    }
}

fn op_sub(a: Value, b: Value) -> Result<Value, RuntimeError> {
    match (&a, &b) {
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(x.wrapping_sub(*y))),
        (Value::Float(x), Value::Float(y)) => Ok(Value::Float(x - y)),
        (Value::Int(x), Value::Float(y)) => Ok(Value::Float(*x as f64 - y)),
        (Value::Float(x), Value::Int(y)) => Ok(Value::Float(x - *y as f64)),
        _ => Err(type_error("-", &a, &b)),
    }
}

fn op_mul(a: Value, b: Value) -> Result<Value, RuntimeError> {
    match (&a, &b) {
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(x.wrapping_mul(*y))),
        (Value::Float(x), Value::Float(y)) => Ok(Value::Float(x * y)),
        (Value::Int(x), Value::Float(y)) => Ok(Value::Float(*x as f64 * y)),
        (Value::Float(x), Value::Int(y)) => Ok(Value::Float(x * *y as f64)),
        _ => Err(type_error("*", &a, &b)),
    }
}

fn op_div(a: Value, b: Value) -> Result<Value, RuntimeError> {
    match (&a, &b) {
        (Value::Int(x), Value::Int(y)) => {
            if *y == 0 {
                Err(RuntimeError::DivisionByZero)
            } else {
                Ok(Value::Int(x / y))
            }
        }
        (Value::Float(x), Value::Float(y)) => {
            if *y == 0.0 {
                Err(RuntimeError::DivisionByZero)
            } else {
                Ok(Value::Float(x / y))
            }
        }
        (Value::Int(x), Value::Float(y)) => {
            if *y == 0.0 {
                Err(RuntimeError::DivisionByZero)
            } else {
                Ok(Value::Float(*x as f64 / y))
            }
        }
        (Value::Float(x), Value::Int(y)) => {
            if *y == 0 {
                Err(RuntimeError::DivisionByZero)
            } else {
                Ok(Value::Float(x / *y as f64))
            }
        }
        _ => Err(type_error("/", &a, &b)),
    }
}

/// Truncated-toward-zero, matching the sign convention of `/`.
fn op_mod(a: Value, b: Value) -> Result<Value, RuntimeError> {
    match (&a, &b) {
        (Value::Int(x), Value::Int(y)) => {
            if *y == 0 {
                Err(RuntimeError::DivisionByZero)
            } else {
                Ok(Value::Int(x % y))
            }
        }
        (Value::Float(x), Value::Float(y)) => {
            if *y == 0.0 {
                Err(RuntimeError::DivisionByZero)
            } else {
                Ok(Value::Float(x % y))
            }
        }
        (Value::Int(x), Value::Float(y)) => {
            if *y == 0.0 {
                Err(RuntimeError::DivisionByZero)
            } else {
                Ok(Value::Float(*x as f64 % y))
            }
        }
        (Value::Float(x), Value::Int(y)) => {
            if *y == 0 {
                Err(RuntimeError::DivisionByZero)
            } else {
                Ok(Value::Float(x % *y as f64))
            }
        }
        _ => Err(type_error("%", &a, &b)),
    }
}

/// Integer base with a non-negative integer exponent stays an integer;
/// a negative exponent promotes to float.
fn op_pow(a: Value, b: Value) -> Result<Value, RuntimeError> {
    match (&a, &b) {
        (Value::Int(x), Value::Int(y)) => {
            if *y >= 0 {
                let exp = u32::try_from(*y).map_err(|_| {
                    RuntimeError::Type(format!("exponent {} is too large", y))
                })?;
                match x.checked_pow(exp) {
                    Some(v) => Ok(Value::Int(v)),
                    None => Err(RuntimeError::Type(format!(
                        "{} ** {} overflows an integer",
                        x, y
                    ))),
                }
            } else {
                Ok(Value::Float((*x as f64).powi(*y as i32)))
            }
        }
        (Value::Float(x), Value::Float(y)) => Ok(Value::Float(x.powf(*y))),
        (Value::Int(x), Value::Float(y)) => Ok(Value::Float((*x as f64).powf(*y))),
        (Value::Float(x), Value::Int(y)) => Ok(Value::Float(x.powf(*y as f64))),
        _ => Err(type_error("**", &a, &b)),
    }
}

fn op_compare(a: &Value, b: &Value, op: &str) -> Result<Value, RuntimeError> {
    let result = match (a, b) {
        (Value::Int(x), Value::Int(y)) => compare_ord(x, y, op),
        (Value::Float(x), Value::Float(y)) => compare_f64(*x, *y, op),
        (Value::Int(x), Value::Float(y)) => compare_f64(*x as f64, *y, op),
        (Value::Float(x), Value::Int(y)) => compare_f64(*x, *y as f64, op),
        (Value::Str(x), Value::Str(y)) => compare_ord(x, y, op),
        _ => return Err(type_error(op, a, b)),
    };
    Ok(Value::Bool(result))
}

fn compare_ord<T: PartialOrd>(x: &T, y: &T, op: &str) -> bool {
    match op {
        "<" => x < y,
        ">" => x > y,
        "<=" => x <= y,
        ">=" => x >= y,
        _ => unreachable!(),
    }
}

fn compare_f64(x: f64, y: f64, op: &str) -> bool {
    match op {
        "<" => x < y,
        ">" => x > y,
        "<=" => x <= y,
        ">=" => x >= y,
        _ => unreachable!(),
    }
}
