//! Logical layer of the grammar.
//!
//! Lowest to highest binding: inline-if, `or`, `and`, prefix `not`,
//! comparison (including `in` / `not in`). Comparison operands are math
//! expressions; the comparison result goes through the test suffix.

use crate::ast::{BinaryOp, ExprKind, Expression};
use crate::parser::Parser;
use crate::ParseError;
use jinx_lexer::{Token, TokenKind};
use tracing::trace;

const COMPARE_OPS: &[TokenKind] = &[
    TokenKind::Eq,
    TokenKind::Ne,
    TokenKind::Gt,
    TokenKind::Gteq,
    TokenKind::Lt,
    TokenKind::Lteq,
];

pub(crate) fn binary(left: Expression, op: BinaryOp, token: Token, right: Expression) -> Expression {
    Expression::new(
        ExprKind::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        token,
    )
}

pub(crate) fn negation(term: Expression, token: Token) -> Expression {
    Expression::new(ExprKind::Negation(Box::new(term)), token)
}

fn compare_op(token: &Token) -> BinaryOp {
    match token.kind {
        TokenKind::Eq => BinaryOp::Eq,
        TokenKind::Ne => BinaryOp::Ne,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::Gteq => BinaryOp::Gteq,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::Lteq => BinaryOp::Lteq,
        _ => BinaryOp::In,
    }
}

impl Parser {
    /// `expr [if cond [else expr]]`
    pub fn parse_expression_with_inline_ifs(&mut self) -> Result<Expression, ParseError> {
        trace!(current = %self.current(), "parse_expression_with_inline_ifs");

        let expr = self.parse_logical_expression()?;

        let Some(if_tok) = self.stream.match_name(&["if"]) else {
            return Ok(expr);
        };

        let condition = self.parse_logical_expression()?;
        let false_expr = match self.stream.match_name(&["else"]) {
            Some(_) => Some(Box::new(self.parse_expression_with_inline_ifs()?)),
            None => None,
        };

        Ok(Expression::new(
            ExprKind::InlineIf {
                condition: Box::new(condition),
                true_expr: Box::new(expr),
                false_expr,
            },
            if_tok,
        ))
    }

    /// Entry point of the logical grammar: `or` is the loosest operator.
    pub fn parse_logical_expression(&mut self) -> Result<Expression, ParseError> {
        trace!(current = %self.current(), "parse_logical_expression");
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expression, ParseError> {
        trace!(current = %self.current(), "parse_or");

        let mut expr = self.parse_and()?;

        while let Some(op) = self.stream.match_name(&["or"]) {
            let right = self.parse_and()?;
            expr = binary(expr, BinaryOp::Or, op, right);
        }

        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Expression, ParseError> {
        trace!(current = %self.current(), "parse_and");

        let mut expr = self.parse_not()?;

        while let Some(op) = self.stream.match_name(&["and"]) {
            let right = self.parse_not()?;
            expr = binary(expr, BinaryOp::And, op, right);
        }

        Ok(expr)
    }

    /// `not` wraps a whole comparison: `not a in b` is `not (a in b)`.
    fn parse_not(&mut self) -> Result<Expression, ParseError> {
        trace!(current = %self.current(), "parse_not");

        match self.stream.match_name(&["not"]) {
            Some(op) => {
                let term = self.parse_not()?;
                Ok(negation(term, op))
            }
            None => self.parse_compare(),
        }
    }

    /// Comparisons fold left: `a < b < c` is `(a < b) < c`.
    fn parse_compare(&mut self) -> Result<Expression, ParseError> {
        trace!(current = %self.current(), "parse_compare");

        let mut expr = self.parse_math()?;

        while self.stream.peek(COMPARE_OPS).is_some() || self.stream.peek_name(&["in", "not"]).is_some() {
            let mut op = self.stream.pop();
            let mut not = None;

            if op.is_name(&["not"]) {
                match self.stream.match_name(&["in"]) {
                    Some(in_tok) => {
                        not = Some(op);
                        op = in_tok;
                    }
                    None => return Err(self.error("Expected an `in` after `not`", Some(&op))),
                }
            }

            if self.at_expression_end() {
                return Err(self.error("Unable to parse right-hand side of comparison", Some(&op)));
            }
            let right = self.parse_math()?;

            let kind = compare_op(&op);
            expr = binary(expr, kind, op, right);
            if let Some(not) = not {
                expr = negation(expr, not);
            }
        }

        self.parse_test(expr)
    }
}
