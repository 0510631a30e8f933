// ABOUTME: Capability-limited walker that evaluates guard expressions against variable bindings
// ABOUTME: Reads bindings through VariableLookup only; failures degrade to false with a warning

use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::warn;

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::error::{ConditionError, Result};
use super::parser;

/// Read-only view over the variables an expression may see.
pub trait VariableLookup {
    fn lookup(&self, name: &str) -> Option<&Value>;
}

impl VariableLookup for HashMap<String, Value> {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

impl VariableLookup for indexmap::IndexMap<String, Value> {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

impl VariableLookup for Map<String, Value> {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

/// A guard expression parsed once and evaluated any number of times.
#[derive(Debug, Clone)]
pub struct Condition {
    source: String,
    expr: Expr,
}

impl Condition {
    pub fn parse(source: &str) -> Result<Self> {
        Ok(Self {
            source: source.to_string(),
            expr: parser::parse(source)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn try_evaluate(&self, scope: &dyn VariableLookup) -> Result<bool> {
        eval_expr(&self.expr, scope).map(|value| is_truthy(&value))
    }

    /// Evaluate to a boolean, treating any failure as `false`.
    pub fn evaluate(&self, scope: &dyn VariableLookup) -> bool {
        match self.try_evaluate(scope) {
            Ok(result) => result,
            Err(e) => {
                warn!("Condition evaluation failed: {} ({})", self.source, e);
                false
            }
        }
    }
}

/// Parse and evaluate `expression`, surfacing any error
pub fn try_evaluate(expression: &str, scope: &dyn VariableLookup) -> Result<bool> {
    Condition::parse(expression)?.try_evaluate(scope)
}

/// Parse and evaluate `expression`. Never fails: syntax errors, unknown
/// identifiers and type mismatches all yield `false` plus a warning.
pub fn evaluate(expression: &str, scope: &dyn VariableLookup) -> bool {
    match try_evaluate(expression, scope) {
        Ok(result) => result,
        Err(e) => {
            warn!("Condition evaluation failed: {} ({})", expression, e);
            false
        }
    }
}

/// JavaScript-style truthiness.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

pub fn eval_expr(expr: &Expr, scope: &dyn VariableLookup) -> Result<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),

        Expr::Ident(name) => scope
            .lookup(name)
            .cloned()
            .ok_or_else(|| ConditionError::UnknownIdentifier(name.clone())),

        Expr::Member { object, property } => {
            let target = eval_expr(object, scope)?;
            read_property(&target, property)
        }

        Expr::Index { object, index } => {
            let target = eval_expr(object, scope)?;
            let key = eval_expr(index, scope)?;
            read_index(&target, &key)
        }

        Expr::Unary { op, operand } => {
            let value = eval_expr(operand, scope)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!is_truthy(&value))),
                UnaryOp::Neg => match value.as_f64() {
                    Some(n) => Ok(number(-n)),
                    None => Err(ConditionError::TypeMismatch {
                        op: "-".to_string(),
                        left: type_name(&value),
                        right: "nothing",
                    }),
                },
            }
        }

        Expr::Binary { op, left, right } => match op {
            BinaryOp::And => {
                let left = eval_expr(left, scope)?;
                if !is_truthy(&left) {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(is_truthy(&eval_expr(right, scope)?)))
            }
            BinaryOp::Or => {
                let left = eval_expr(left, scope)?;
                if is_truthy(&left) {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(is_truthy(&eval_expr(right, scope)?)))
            }
            _ => {
                let left = eval_expr(left, scope)?;
                let right = eval_expr(right, scope)?;
                apply_binary(*op, &left, &right)
            }
        },
    }
}

fn apply_binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    let mismatch = || ConditionError::TypeMismatch {
        op: op.symbol().to_string(),
        left: type_name(left),
        right: type_name(right),
    };

    match op {
        BinaryOp::Eq => Ok(Value::Bool(values_equal(left, right))),
        BinaryOp::Ne => Ok(Value::Bool(!values_equal(left, right))),

        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (left, right) {
                (Value::Number(_), Value::Number(_)) => left.as_f64().partial_cmp(&right.as_f64()),
                (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
                // Scraped text like "10" still orders against numbers.
                (Value::Number(_), Value::String(text)) => {
                    let r = numeric_text(text).ok_or_else(mismatch)?;
                    left.as_f64().and_then(|l| l.partial_cmp(&r))
                }
                (Value::String(text), Value::Number(_)) => {
                    let l = numeric_text(text).ok_or_else(mismatch)?;
                    right.as_f64().and_then(|r| l.partial_cmp(&r))
                }
                _ => return Err(mismatch()),
            };
            let result = match ordering {
                Some(ordering) => match op {
                    BinaryOp::Lt => ordering.is_lt(),
                    BinaryOp::Le => ordering.is_le(),
                    BinaryOp::Gt => ordering.is_gt(),
                    _ => ordering.is_ge(),
                },
                None => false,
            };
            Ok(Value::Bool(result))
        }

        BinaryOp::Add => match (left, right) {
            (Value::Number(_), Value::Number(_)) => {
                Ok(number(as_number(left)? + as_number(right)?))
            }
            (Value::String(_), _) | (_, Value::String(_)) => Ok(Value::String(format!(
                "{}{}",
                display(left),
                display(right)
            ))),
            _ => Err(mismatch()),
        },

        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            let (l, r) = match (left.as_f64(), right.as_f64()) {
                (Some(l), Some(r)) => (l, r),
                _ => return Err(mismatch()),
            };
            let result = match op {
                BinaryOp::Sub => l - r,
                BinaryOp::Mul => l * r,
                BinaryOp::Div if r == 0.0 => return Err(ConditionError::DivisionByZero),
                BinaryOp::Div => l / r,
                BinaryOp::Rem if r == 0.0 => return Err(ConditionError::DivisionByZero),
                _ => l % r,
            };
            Ok(number(result))
        }

        BinaryOp::And => Ok(Value::Bool(is_truthy(left) && is_truthy(right))),
        BinaryOp::Or => Ok(Value::Bool(is_truthy(left) || is_truthy(right))),
    }
}

fn read_property(target: &Value, property: &str) -> Result<Value> {
    match (target, property) {
        (Value::Object(map), _) => Ok(map.get(property).cloned().unwrap_or(Value::Null)),
        (Value::Array(items), "length") => Ok(Value::from(items.len())),
        (Value::String(s), "length") => Ok(Value::from(s.chars().count())),
        (Value::Null, _) => Err(ConditionError::InvalidAccess {
            property: property.to_string(),
            target: "null",
        }),
        _ => Ok(Value::Null),
    }
}

fn read_index(target: &Value, key: &Value) -> Result<Value> {
    match (target, key) {
        (Value::Array(items), Value::Number(_)) => {
            let position = key.as_f64().unwrap_or(-1.0);
            if position < 0.0 || position.fract() != 0.0 {
                return Ok(Value::Null);
            }
            Ok(items.get(position as usize).cloned().unwrap_or(Value::Null))
        }
        (Value::Object(_), Value::String(property)) => read_property(target, property),
        (Value::Null, _) => Err(ConditionError::InvalidAccess {
            property: display(key),
            target: "null",
        }),
        _ => Ok(Value::Null),
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(_), Value::Number(_)) => left.as_f64() == right.as_f64(),
        _ => left == right,
    }
}

fn as_number(value: &Value) -> Result<f64> {
    value.as_f64().ok_or_else(|| ConditionError::TypeMismatch {
        op: "number".to_string(),
        left: type_name(value),
        right: "nothing",
    })
}

fn numeric_text(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Non-finite results have no JSON representation and collapse to null.
fn number(n: f64) -> Value {
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
