//! Operator dispatch over [`Value`]s.
//!
//! Comparison, membership, arithmetic, sign, attribute access, subscripts
//! and slices. Failures are returned as plain messages; the evaluator
//! attaches the source position.

use std::cmp::Ordering;

use jinx_parser::ast::Attr;
use jinx_parser::{BinaryOp, UnaryOp};

use crate::value::Value;

type OpResult = Result<Value, String>;

fn unsupported(op: &str, left: &Value, right: &Value) -> String {
    format!(
        "unsupported operand types for {op}: '{}' and '{}'",
        left.type_name(),
        right.type_name()
    )
}

fn overflow(op: &str) -> String {
    format!("integer overflow in '{op}'")
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(n) => Some(*n as f64),
        Value::Float(n) => Some(*n),
        _ => None,
    }
}

fn compare(left: &Value, right: &Value, op: BinaryOp) -> Result<bool, String> {
    let ordering = match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        (a, b) => match (a.as_str(), b.as_str()) {
            (Some(a), Some(b)) => Some(a.cmp(b)),
            _ => match (as_float(a), as_float(b)) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => return Err(unsupported(op.as_str(), left, right)),
            },
        },
    };

    // NaN compares false both ways.
    let Some(ordering) = ordering else {
        return Ok(false);
    };

    Ok(match op {
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::Gteq => ordering != Ordering::Less,
        BinaryOp::Lt => ordering == Ordering::Less,
        _ => ordering != Ordering::Greater,
    })
}

/// `item in container`
fn contains(item: &Value, container: &Value) -> Result<bool, String> {
    match container {
        Value::List(items) => Ok(items.contains(item)),
        Value::Map(map) => Ok(map.contains_key(&item.to_key())),
        Value::String(s) | Value::SafeString(s) => match item.as_str() {
            Some(needle) => Ok(s.contains(needle)),
            None => Err(format!(
                "'in <string>' requires string as left operand, not '{}'",
                item.type_name()
            )),
        },
        other => Err(format!("argument of type '{}' is not iterable", other.type_name())),
    }
}

/// Integer floor division, rounding towards negative infinity.
fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a % b != 0 && (a < 0) != (b < 0) {
        q.checked_sub(1)
    } else {
        Some(q)
    }
}

/// Integer modulo whose sign follows the divisor.
fn floor_mod(a: i64, b: i64) -> Option<i64> {
    let r = a.checked_rem(b)?;
    if r != 0 && (r < 0) != (b < 0) {
        Some(r + b)
    } else {
        Some(r)
    }
}

/// Longest list or string, in elements, that `*` may produce.
pub const MAX_REPEAT_LEN: usize = 10_000_000;

fn repeat<T: Clone>(items: &[T], times: i64) -> Result<Vec<T>, String> {
    let times = usize::try_from(times).unwrap_or(0);
    if items.is_empty() || times == 0 {
        return Ok(Vec::new());
    }
    match items.len().checked_mul(times) {
        Some(len) if len <= MAX_REPEAT_LEN => {
            let mut out = Vec::with_capacity(len);
            for _ in 0..times {
                out.extend_from_slice(items);
            }
            Ok(out)
        }
        _ => Err(format!(
            "repeated sequence is too long: {} * {times} exceeds {MAX_REPEAT_LEN} elements",
            items.len()
        )),
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> OpResult {
    let sym = op.as_str();

    if let (Value::Integer(a), Value::Integer(b)) = (left, right) {
        let (a, b) = (*a, *b);
        if b == 0 && matches!(op, BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod) {
            return Err("division by zero".to_string());
        }
        let result = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Sub => a.checked_sub(b),
            BinaryOp::Mul => a.checked_mul(b),
            BinaryOp::Div => return Ok(Value::Float(a as f64 / b as f64)),
            BinaryOp::FloorDiv => floor_div(a, b),
            BinaryOp::Mod => floor_mod(a, b),
            _ => match u32::try_from(b) {
                Ok(exp) => a.checked_pow(exp),
                Err(_) => return Ok(Value::Float((a as f64).powf(b as f64))),
            },
        };
        return result.map(Value::Integer).ok_or_else(|| overflow(sym));
    }

    if let (Some(a), Some(b)) = (as_float(left), as_float(right)) {
        if b == 0.0 && matches!(op, BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod) {
            return Err("division by zero".to_string());
        }
        let n = match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::FloorDiv => (a / b).floor(),
            BinaryOp::Mod => a - b * (a / b).floor(),
            _ => a.powf(b),
        };
        return Ok(Value::Float(n));
    }

    match (op, left, right) {
        (BinaryOp::Add, Value::List(a), Value::List(b)) => {
            Ok(Value::List(a.iter().chain(b).cloned().collect()))
        }
        (BinaryOp::Add, a, b) => match (a.as_str(), b.as_str()) {
            (Some(a), Some(b)) => Ok(Value::String(format!("{a}{b}"))),
            _ => Err(unsupported(sym, left, right)),
        },
        (BinaryOp::Mul, Value::List(items), Value::Integer(n))
        | (BinaryOp::Mul, Value::Integer(n), Value::List(items)) => repeat(items, *n).map(Value::List),
        (BinaryOp::Mul, s, Value::Integer(n)) | (BinaryOp::Mul, Value::Integer(n), s)
            if s.as_str().is_some() =>
        {
            let chars: Vec<char> = s.to_key().chars().collect();
            Ok(Value::String(repeat(&chars, *n)?.into_iter().collect()))
        }
        _ => Err(unsupported(sym, left, right)),
    }
}

/// Apply a non-logical binary operator. `and` / `or` short-circuit and are
/// handled by the evaluator.
pub fn binary(op: BinaryOp, left: &Value, right: &Value) -> OpResult {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(left == right)),
        BinaryOp::Ne => Ok(Value::Bool(left != right)),
        BinaryOp::Gt | BinaryOp::Gteq | BinaryOp::Lt | BinaryOp::Lteq => {
            compare(left, right, op).map(Value::Bool)
        }
        BinaryOp::In => contains(left, right).map(Value::Bool),
        BinaryOp::Concat => Ok(Value::String(format!("{left}{right}"))),
        BinaryOp::Or | BinaryOp::And => Err(format!("'{}' cannot be applied eagerly", op.as_str())),
        _ => arithmetic(op, left, right),
    }
}

pub fn unary(op: UnaryOp, value: &Value) -> OpResult {
    match (op, value) {
        (UnaryOp::Neg, Value::Integer(n)) => n
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| overflow("-")),
        (UnaryOp::Neg, Value::Float(n)) => Ok(Value::Float(-n)),
        (UnaryOp::Pos, Value::Integer(_) | Value::Float(_)) => Ok(value.clone()),
        (op, other) => Err(format!(
            "bad operand type for unary {}: '{}'",
            if op == UnaryOp::Neg { "-" } else { "+" },
            other.type_name()
        )),
    }
}

/// Resolve a possibly negative index against a sequence of length `len`.
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let index = if index < 0 { index + len } else { index };
    if (0..len).contains(&index) {
        usize::try_from(index).ok()
    } else {
        None
    }
}

/// `value.name` / `value.0`. Missing attributes are `Null`.
pub fn getattr(value: &Value, attr: &Attr) -> OpResult {
    match attr {
        Attr::Name(name) => Ok(match value {
            Value::Map(map) => map.get(name).cloned().unwrap_or(Value::Null),
            _ => Value::Null,
        }),
        Attr::Index(i) => match i64::try_from(*i) {
            Ok(i) => getitem(value, &Value::Integer(i)),
            Err(_) => Ok(Value::Null),
        },
    }
}

/// `value[key]`. Out-of-range indices and missing keys are `Null`.
pub fn getitem(value: &Value, key: &Value) -> OpResult {
    match (value, key) {
        (Value::Null, _) => Ok(Value::Null),
        (Value::List(items), Value::Integer(i)) => Ok(resolve_index(*i, items.len())
            .map(|i| items[i].clone())
            .unwrap_or(Value::Null)),
        (Value::String(s) | Value::SafeString(s), Value::Integer(i)) => {
            let chars: Vec<char> = s.chars().collect();
            Ok(resolve_index(*i, chars.len())
                .map(|i| Value::String(chars[i].to_string()))
                .unwrap_or(Value::Null))
        }
        (Value::Map(map), key) => Ok(map.get(&key.to_key()).cloned().unwrap_or(Value::Null)),
        (Value::List(_) | Value::String(_) | Value::SafeString(_), key) => Err(format!(
            "indices must be integers, not '{}'",
            key.type_name()
        )),
        (other, _) => Err(format!("'{}' object is not subscriptable", other.type_name())),
    }
}

fn slice_bound(bound: Option<&Value>) -> Result<Option<i64>, String> {
    match bound {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Integer(n)) => Ok(Some(*n)),
        Some(other) => Err(format!(
            "slice indices must be integers or None, not '{}'",
            other.type_name()
        )),
    }
}

/// Clamp a slice bound into `0..=len`, counting negatives from the end.
fn clamp(bound: i64, len: usize) -> usize {
    let len_i = i64::try_from(len).unwrap_or(i64::MAX);
    let bound = if bound < 0 { bound.saturating_add(len_i) } else { bound };
    usize::try_from(bound.clamp(0, len_i)).unwrap_or(len)
}

/// `value[start:stop]` with Python semantics.
pub fn slice(value: &Value, start: Option<&Value>, stop: Option<&Value>) -> OpResult {
    let start = slice_bound(start)?;
    let stop = slice_bound(stop)?;

    let range = |len: usize| {
        let from = start.map_or(0, |s| clamp(s, len));
        let to = stop.map_or(len, |s| clamp(s, len));
        from..to.max(from)
    };

    match value {
        Value::List(items) => Ok(Value::List(items[range(items.len())].to_vec())),
        Value::String(s) | Value::SafeString(s) => {
            let chars: Vec<char> = s.chars().collect();
            Ok(Value::String(chars[range(chars.len())].iter().collect()))
        }
        Value::Null => Ok(Value::Null),
        other => Err(format!("'{}' object is not sliceable", other.type_name())),
    }
}
