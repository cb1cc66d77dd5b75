//! `is [not] <test> [arg]` suffix.

use crate::ast::{ExprKind, Expression, TestCall};
use crate::expression::negation;
use crate::parser::Parser;
use crate::ParseError;
use tracing::trace;

impl Parser {
    /// Apply trailing filters, then an optional test suffix, to `expr`.
    ///
    /// A test's argument is a single variable or literal, not a full
    /// expression: `x is divisibleby 3 + 1` tests against `3`.
    pub fn parse_test(&mut self, expr: Expression) -> Result<Expression, ParseError> {
        trace!(current = %self.current(), "parse_test");

        let mut expr = self.parse_filter_expression(expr)?;

        let Some(is_tok) = self.stream.match_name(&["is"]) else {
            return Ok(expr);
        };

        let not = self.stream.match_name(&["not"]);
        if self.at_expression_end() {
            return Err(self.error("is statement is incomplete", Some(&is_tok)));
        }
        let ident = self.stream.pop();

        let arg = if self.config.needs_right_side(&ident.val) {
            Some(Box::new(self.parse_variable_or_literal()?))
        } else {
            None
        };

        let test = TestCall {
            name: ident.val.clone(),
            arg,
        };
        expr = Expression::new(
            ExprKind::Test {
                expr: Box::new(expr),
                test,
            },
            ident,
        );

        if let Some(not) = not {
            expr = negation(expr, not);
        }

        Ok(expr)
    }
}
