use shardline_common::ShardingValue;

use crate::parser::{BinaryOp, Expr};
use crate::Bindings;

/// Upper bound on the values one range segment may produce.
const MAX_RANGE_LEN: i64 = 100_000;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum EvalFailure {
    Unresolved(String),
    Message(String),
}

/// Evaluate a segment that must produce exactly one value.
pub(crate) fn eval_scalar(expr: &Expr, bindings: &Bindings) -> Result<ShardingValue, EvalFailure> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Var(name) => bindings
            .get(name)
            .cloned()
            .ok_or_else(|| EvalFailure::Unresolved(name.clone())),
        Expr::Neg(inner) => match eval_scalar(inner, bindings)? {
            ShardingValue::Int(v) => v
                .checked_neg()
                .map(ShardingValue::Int)
                .ok_or_else(|| EvalFailure::Message("integer overflow".into())),
            ShardingValue::Float(v) => Ok(ShardingValue::Float(-v)),
            other => Err(EvalFailure::Message(format!(
                "cannot negate {} value",
                other.type_name()
            ))),
        },
        Expr::Binary { op, left, right } => {
            let l = eval_scalar(left, bindings)?;
            let r = eval_scalar(right, bindings)?;
            eval_binary_op(&l, *op, &r)
        }
        Expr::List(_) | Expr::Range(_, _) => Err(EvalFailure::Message(
            "list or range produces more than one value".into(),
        )),
    }
}

/// Evaluate a segment into every value it denotes. Lists flatten, ranges are
/// inclusive on both ends, anything else yields a single value.
pub(crate) fn eval_values(
    expr: &Expr,
    bindings: &Bindings,
) -> Result<Vec<ShardingValue>, EvalFailure> {
    match expr {
        Expr::List(items) => {
            let mut out = Vec::new();
            for item in items {
                out.extend(eval_values(item, bindings)?);
            }
            Ok(out)
        }
        Expr::Range(lo, hi) => {
            let lo = expect_int(eval_scalar(lo, bindings)?)?;
            let hi = expect_int(eval_scalar(hi, bindings)?)?;
            let (start, end) = if lo <= hi { (lo, hi) } else { (hi, lo) };
            if end.saturating_sub(start) >= MAX_RANGE_LEN {
                return Err(EvalFailure::Message(format!(
                    "range {lo}..{hi} is too large"
                )));
            }
            let values: Vec<ShardingValue> = (start..=end).map(ShardingValue::Int).collect();
            // A descending range enumerates downwards.
            if lo > hi {
                Ok(values.into_iter().rev().collect())
            } else {
                Ok(values)
            }
        }
        _ => Ok(vec![eval_scalar(expr, bindings)?]),
    }
}

fn expect_int(v: ShardingValue) -> Result<i64, EvalFailure> {
    v.as_i64().ok_or_else(|| {
        EvalFailure::Message(format!("range bound must be an integer, got {}", v.type_name()))
    })
}

fn eval_binary_op(
    left: &ShardingValue,
    op: BinaryOp,
    right: &ShardingValue,
) -> Result<ShardingValue, EvalFailure> {
    if op == BinaryOp::Add {
        if let (ShardingValue::Text(_), _) | (_, ShardingValue::Text(_)) = (left, right) {
            return Ok(ShardingValue::Text(format!("{}{}", left, right)));
        }
    }

    match (left, right) {
        (ShardingValue::Int(a), ShardingValue::Int(b)) => eval_int(*a, op, *b),
        (l, r) => match (l.as_f64(), r.as_f64()) {
            (Some(a), Some(b)) => eval_float(a, op, b),
            _ => Err(EvalFailure::Message(format!(
                "unsupported operands {} and {}",
                l.type_name(),
                r.type_name()
            ))),
        },
    }
}

fn eval_int(a: i64, op: BinaryOp, b: i64) -> Result<ShardingValue, EvalFailure> {
    let overflow = || EvalFailure::Message("integer overflow".into());
    match op {
        BinaryOp::Add => a.checked_add(b).map(ShardingValue::Int).ok_or_else(overflow),
        BinaryOp::Sub => a.checked_sub(b).map(ShardingValue::Int).ok_or_else(overflow),
        BinaryOp::Mul => a.checked_mul(b).map(ShardingValue::Int).ok_or_else(overflow),
        BinaryOp::Div => {
            if b == 0 {
                return Err(EvalFailure::Message("division by zero".into()));
            }
            // Exact quotients stay integral; anything else is a decimal.
            if a.checked_rem(b).ok_or_else(overflow)? == 0 {
                a.checked_div(b).map(ShardingValue::Int).ok_or_else(overflow)
            } else {
                Ok(ShardingValue::Float(a as f64 / b as f64))
            }
        }
        BinaryOp::Mod => {
            if b == 0 {
                return Err(EvalFailure::Message("division by zero".into()));
            }
            a.checked_rem(b).map(ShardingValue::Int).ok_or_else(overflow)
        }
    }
}

fn eval_float(a: f64, op: BinaryOp, b: f64) -> Result<ShardingValue, EvalFailure> {
    if matches!(op, BinaryOp::Div | BinaryOp::Mod) && b == 0.0 {
        return Err(EvalFailure::Message("division by zero".into()));
    }
    let v = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Mod => a % b,
    };
    Ok(ShardingValue::Float(v))
}
