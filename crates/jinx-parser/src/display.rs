//! Canonical source form of expressions.
//!
//! Every operation is printed inside parentheses, so the output re-parses to
//! the same tree regardless of precedence: printing a parsed expression,
//! parsing it again and printing once more yields identical text.

use std::fmt;

use crate::ast::{Attr, ExprKind, Expression, UnaryOp};

/// Whether every `quote` in `s` is already escaped by an odd run of
/// backslashes, so `s` can be printed between two of them.
fn fits_quotes(s: &str, quote: char) -> bool {
    let mut backslashes = 0;
    for c in s.chars() {
        if c == quote && backslashes % 2 == 0 {
            return false;
        }
        backslashes = if c == '\\' { backslashes + 1 } else { 0 };
    }
    true
}

/// String values keep their lexeme text apart from `\n` and `\t`, so only
/// those two are escaped again.
fn write_string(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    let quote = if fits_quotes(s, '\'') { '\'' } else { '"' };
    write!(f, "{quote}")?;
    for c in s.chars() {
        match c {
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            c => write!(f, "{c}")?,
        }
    }
    write!(f, "{quote}")
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expression]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_arguments(
    f: &mut fmt::Formatter<'_>,
    args: &[Expression],
    kwargs: &[(String, Expression)],
) -> fmt::Result {
    f.write_str("(")?;
    write_list(f, args)?;
    for (i, (name, value)) in kwargs.iter().enumerate() {
        if i > 0 || !args.is_empty() {
            f.write_str(", ")?;
        }
        write!(f, "{name}={value}")?;
    }
    f.write_str(")")
}

/// Print the subject of a postfix operator. Integer literals are wrapped so
/// `(1).0` does not read back as the float `1.0`.
fn write_subject(f: &mut fmt::Formatter<'_>, node: &Expression) -> fmt::Result {
    match node.kind {
        ExprKind::Integer(_) => write!(f, "({node})"),
        _ => write!(f, "{node}"),
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Integer(n) => write!(f, "{n}"),
            ExprKind::Float(n) => write!(f, "{n:?}"),
            ExprKind::String(s) => write_string(f, s),
            ExprKind::Bool(b) => write!(f, "{b}"),
            ExprKind::Name(name) => f.write_str(name),
            ExprKind::List(items) => {
                f.write_str("[")?;
                write_list(f, items)?;
                f.write_str("]")
            }
            ExprKind::Tuple(items) => {
                f.write_str("(")?;
                write_list(f, items)?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            ExprKind::Dict(pairs) => {
                f.write_str("{")?;
                for (i, pair) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", pair.key, pair.value)?;
                }
                f.write_str("}")
            }
            ExprKind::GetAttr { node, attr } => {
                write_subject(f, node)?;
                match attr {
                    Attr::Name(name) => write!(f, ".{name}"),
                    Attr::Index(i) => write!(f, ".{i}"),
                }
            }
            ExprKind::GetItem { node, arg } => {
                write_subject(f, node)?;
                write!(f, "[{arg}]")
            }
            ExprKind::GetItemRange { node, start, stop } => {
                write_subject(f, node)?;
                f.write_str("[")?;
                if let Some(start) = start {
                    write!(f, "{start}")?;
                }
                f.write_str(":")?;
                if let Some(stop) = stop {
                    write!(f, "{stop}")?;
                }
                f.write_str("]")
            }
            ExprKind::Call { func, args, kwargs } => {
                write_subject(f, func)?;
                write_arguments(f, args, kwargs)
            }
            ExprKind::Binary { left, op, right } => {
                write!(f, "({left} {} {right})", op.as_str())
            }
            ExprKind::Negation(term) => write!(f, "(not {term})"),
            ExprKind::Unary { op, term } => {
                let sign = match op {
                    UnaryOp::Neg => "-",
                    UnaryOp::Pos => "+",
                };
                write!(f, "({sign}{term})")
            }
            ExprKind::Test { expr, test } => {
                write!(f, "({expr} is {}", test.name)?;
                if let Some(arg) = &test.arg {
                    write!(f, " {arg}")?;
                }
                f.write_str(")")
            }
            ExprKind::Filtered { expr, filter } => {
                write!(f, "({expr}|{}", filter.name)?;
                if !filter.args.is_empty() || !filter.kwargs.is_empty() {
                    write_arguments(f, &filter.args, &filter.kwargs)?;
                }
                f.write_str(")")
            }
            ExprKind::InlineIf {
                condition,
                true_expr,
                false_expr,
            } => {
                write!(f, "({true_expr} if {condition}")?;
                if let Some(false_expr) = false_expr {
                    write!(f, " else {false_expr}")?;
                }
                f.write_str(")")
            }
            ExprKind::VarArgs(term) => write!(f, "*{term}"),
            ExprKind::KwArgs(term) => write!(f, "**{term}"),
        }
    }
}
