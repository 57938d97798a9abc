/// Expression evaluation, shared by every opcode that carries an
/// expression payload. Operand order is strictly left-to-right.
use crate::ast::{BinOp, Expr, UnaryOp};
use crate::graph::Graph;
use crate::value::{vyra_repr, Value};

use super::{ops, Interpreter, RuntimeError};

impl Interpreter {
    pub(crate) fn eval(&mut self, graph: &Graph, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(val) => Ok(val.clone()),
            Expr::Ident(name) => self.lookup(name),
            Expr::List(elements) => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(self.eval(graph, element)?);
                }
                Ok(Value::list(items))
            }
            Expr::Unary(UnaryOp::Not, operand) => {
                let val = self.eval(graph, operand)?;
                Ok(Value::Bool(!val.is_truthy()))
            }
            Expr::Unary(UnaryOp::Neg, operand) => match self.eval(graph, operand)? {
                Value::Int(i) => Ok(Value::Int(-i)),
                Value::Float(f) => Ok(Value::Float(-f)),
                other => Err(RuntimeError::Type(format!(
                    "cannot negate {}",
                    other.type_name()
                ))),
            },
            Expr::Binary(BinOp::And, lhs, rhs) => {
                if !self.eval(graph, lhs)?.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.eval(graph, rhs)?.is_truthy()))
            }
            Expr::Binary(BinOp::Or, lhs, rhs) => {
                if self.eval(graph, lhs)?.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.eval(graph, rhs)?.is_truthy()))
            }
            Expr::Binary(BinOp::FollowedBy, lhs, rhs) => {
                // Lenient by design: both sides are stringified, never a
                // type error.
                let left = self.eval(graph, lhs)?;
                let right = self.eval(graph, rhs)?;
                Ok(Value::Str(format!(
                    "{}{}",
                    vyra_repr(&left),
                    vyra_repr(&right)
                )))
            }
            Expr::Binary(op, lhs, rhs) => {
                let left = self.eval(graph, lhs)?;
                let right = self.eval(graph, rhs)?;
                ops::eval_binop(op, left, right)
            }
            Expr::Call(name, args) => {
                let mut argv = Vec::with_capacity(args.len());
                for arg in args {
                    argv.push(self.eval(graph, arg)?);
                }
                self.call_function(graph, name, argv)
            }
            Expr::Index(seq, index) => {
                let seq = self.eval(graph, seq)?;
                let index = match self.eval(graph, index)? {
                    Value::Int(i) => i,
                    other => {
                        return Err(RuntimeError::Type(format!(
                            "index must be an integer, got {}",
                            other.type_name()
                        )))
                    }
                };
                match seq {
                    Value::List(items) => {
                        let items = items.borrow();
                        element_at(&items, index).map(|v| v.clone())
                    }
                    Value::Str(s) => {
                        let chars: Vec<char> = s.chars().collect();
                        if index < 0 || index as usize >= chars.len() {
                            return Err(RuntimeError::Index {
                                index,
                                len: chars.len(),
                            });
                        }
                        Ok(Value::Str(chars[index as usize].to_string()))
                    }
                    other => Err(RuntimeError::Type(format!(
                        "cannot index into {}",
                        other.type_name()
                    ))),
                }
            }
        }
    }
}

fn element_at(items: &[Value], index: i64) -> Result<&Value, RuntimeError> {
    if index < 0 || index as usize >= items.len() {
        return Err(RuntimeError::Index {
            index,
            len: items.len(),
        });
    }
    Ok(&items[index as usize])
}
