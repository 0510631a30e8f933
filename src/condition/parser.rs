// ABOUTME: PEST-based parser turning guard expression text into an AST
// ABOUTME: Folds left-associative binary chains and unescapes string literals

use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;
use serde_json::Value;

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::error::{ConditionError, Result};

#[derive(Parser)]
#[grammar = "condition/condition.pest"]
pub(crate) struct ConditionParser;

/// Deepest expression tree a guard may produce.
pub const MAX_NESTING: usize = 64;

/// Parse a guard expression into its AST
pub fn parse(source: &str) -> Result<Expr> {
    check_nesting(source)?;
    let mut pairs = ConditionParser::parse(Rule::condition, source)?;
    let condition = next_pair(&mut pairs, "condition")?;
    let expression = next_pair(&mut condition.into_inner(), "expression")?;
    build_expression(expression, 0)
}

fn next_pair<'i>(
    pairs: &mut impl Iterator<Item = Pair<'i, Rule>>,
    what: &str,
) -> Result<Pair<'i, Rule>> {
    pairs
        .next()
        .ok_or_else(|| ConditionError::Syntax(format!("expected {}", what)))
}

fn too_deep() -> ConditionError {
    ConditionError::Syntax(format!(
        "expression nested deeper than {} levels",
        MAX_NESTING
    ))
}

/// Reject bracket nesting the grammar would otherwise recurse through.
fn check_nesting(source: &str) -> Result<()> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut chars = source.chars();

    while let Some(ch) = chars.next() {
        match quote {
            Some(q) => {
                if ch == '\\' {
                    chars.next();
                } else if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '"' | '\'' => quote = Some(ch),
                '(' | '[' => {
                    depth += 1;
                    if depth > MAX_NESTING {
                        return Err(too_deep());
                    }
                }
                ')' | ']' => depth = depth.saturating_sub(1),
                _ => {}
            },
        }
    }

    Ok(())
}

// `depth` is the level the built node will sit at in the final tree.
fn build_expression(pair: Pair<Rule>, depth: usize) -> Result<Expr> {
    if depth > MAX_NESTING {
        return Err(too_deep());
    }

    match pair.as_rule() {
        Rule::expression => {
            build_expression(next_pair(&mut pair.into_inner(), "expression")?, depth)
        }
        Rule::or_expr
        | Rule::and_expr
        | Rule::equality_expr
        | Rule::comparison_expr
        | Rule::additive_expr
        | Rule::multiplicative_expr => build_binary_expr(pair, depth),
        Rule::unary_expr => build_unary_expr(pair, depth),
        Rule::postfix_expr => build_postfix_expr(pair, depth),
        Rule::number => {
            let text = pair.as_str();
            text.parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(|n| Expr::Literal(Value::Number(n)))
                .ok_or_else(|| ConditionError::Syntax(format!("invalid number '{}'", text)))
        }
        Rule::string => {
            let inner = next_pair(&mut pair.into_inner(), "string body")?;
            Ok(Expr::Literal(Value::String(unescape(inner.as_str()))))
        }
        Rule::boolean => Ok(Expr::Literal(Value::Bool(pair.as_str() == "true"))),
        Rule::null => Ok(Expr::Literal(Value::Null)),
        Rule::identifier => Ok(Expr::Ident(pair.as_str().to_string())),
        rule => Err(ConditionError::Syntax(format!(
            "unexpected expression rule {:?}",
            rule
        ))),
    }
}

fn build_binary_expr(pair: Pair<Rule>, depth: usize) -> Result<Expr> {
    let mut inner = pair.into_inner();
    let first = next_pair(&mut inner, "left operand")?;
    let rest: Vec<Pair<Rule>> = inner.collect();

    // A chain of n operators folds into n left-nested nodes.
    let mut level = depth + rest.len() / 2;
    let mut left = build_expression(first, level)?;
    let mut rest = rest.into_iter();

    while let Some(op_pair) = rest.next() {
        let op = binary_op(op_pair.as_rule())?;
        let right = build_expression(next_pair(&mut rest, "right operand")?, level)?;
        left = Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
        level = level.saturating_sub(1);
    }

    Ok(left)
}

fn binary_op(rule: Rule) -> Result<BinaryOp> {
    let op = match rule {
        Rule::op_or => BinaryOp::Or,
        Rule::op_and => BinaryOp::And,
        Rule::op_eq | Rule::op_strict_eq => BinaryOp::Eq,
        Rule::op_ne | Rule::op_strict_ne => BinaryOp::Ne,
        Rule::op_lt => BinaryOp::Lt,
        Rule::op_le => BinaryOp::Le,
        Rule::op_gt => BinaryOp::Gt,
        Rule::op_ge => BinaryOp::Ge,
        Rule::op_add => BinaryOp::Add,
        Rule::op_sub => BinaryOp::Sub,
        Rule::op_mul => BinaryOp::Mul,
        Rule::op_div => BinaryOp::Div,
        Rule::op_rem => BinaryOp::Rem,
        other => {
            return Err(ConditionError::Syntax(format!(
                "unexpected operator {:?}",
                other
            )))
        }
    };
    Ok(op)
}

fn build_unary_expr(pair: Pair<Rule>, depth: usize) -> Result<Expr> {
    let mut ops = Vec::new();
    let mut operand = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::op_not => ops.push(UnaryOp::Not),
            Rule::op_neg => ops.push(UnaryOp::Neg),
            _ => operand = Some(build_expression(inner, depth + ops.len())?),
        }
    }

    let mut expr =
        operand.ok_or_else(|| ConditionError::Syntax("missing unary operand".to_string()))?;

    // Innermost operator binds first: `!-x` is `!(-x)`.
    for op in ops.into_iter().rev() {
        expr = Expr::Unary {
            op,
            operand: Box::new(expr),
        };
    }

    Ok(expr)
}

fn build_postfix_expr(pair: Pair<Rule>, depth: usize) -> Result<Expr> {
    let mut inner = pair.into_inner();
    let primary = next_pair(&mut inner, "primary")?;
    let suffixes: Vec<Pair<Rule>> = inner.collect();

    let mut level = depth + suffixes.len();
    let mut expr = build_expression(primary, level)?;

    for suffix in suffixes {
        expr = match suffix.as_rule() {
            Rule::member => {
                let property = next_pair(&mut suffix.into_inner(), "property name")?;
                Expr::Member {
                    object: Box::new(expr),
                    property: property.as_str().to_string(),
                }
            }
            Rule::index => {
                let index =
                    build_expression(next_pair(&mut suffix.into_inner(), "index")?, level)?;
                Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                }
            }
            other => {
                return Err(ConditionError::Syntax(format!(
                    "unexpected postfix {:?}",
                    other
                )))
            }
        };
        level = level.saturating_sub(1);
    }

    Ok(expr)
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}
