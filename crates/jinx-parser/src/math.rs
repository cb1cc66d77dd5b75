//! Math layer of the grammar, between comparison and primary expressions.
//!
//! Lowest to highest binding: `+ -`, `~`, `* / // %`, `**`, prefix `- +`.
//! A filter suffix applies to the unary operand, so `-x | abs` is `-(x | abs)`.

use crate::ast::{BinaryOp, ExprKind, Expression, FilterCall, UnaryOp};
use crate::expression::binary;
use crate::parser::Parser;
use crate::ParseError;
use jinx_lexer::{Token, TokenKind};
use tracing::trace;

fn math_op(token: &Token) -> BinaryOp {
    match token.kind {
        TokenKind::Add => BinaryOp::Add,
        TokenKind::Sub => BinaryOp::Sub,
        TokenKind::Tilde => BinaryOp::Concat,
        TokenKind::Mul => BinaryOp::Mul,
        TokenKind::Div => BinaryOp::Div,
        TokenKind::FloorDiv => BinaryOp::FloorDiv,
        TokenKind::Mod => BinaryOp::Mod,
        _ => BinaryOp::Pow,
    }
}

impl Parser {
    /// Entry point of the math grammar.
    pub fn parse_math(&mut self) -> Result<Expression, ParseError> {
        trace!(current = %self.current(), "parse_math");
        self.parse_sum()
    }

    fn parse_sum(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_concat()?;

        while let Some(op) = self.stream.match_kind(&[TokenKind::Add, TokenKind::Sub]) {
            let right = self.parse_concat()?;
            expr = binary(expr, math_op(&op), op, right);
        }

        Ok(expr)
    }

    fn parse_concat(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_product()?;

        while let Some(op) = self.stream.match_kind(&[TokenKind::Tilde]) {
            let right = self.parse_product()?;
            expr = binary(expr, BinaryOp::Concat, op, right);
        }

        Ok(expr)
    }

    fn parse_product(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_power()?;

        while let Some(op) = self.stream.match_kind(&[
            TokenKind::Mul,
            TokenKind::Div,
            TokenKind::FloorDiv,
            TokenKind::Mod,
        ]) {
            let right = self.parse_power()?;
            expr = binary(expr, math_op(&op), op, right);
        }

        Ok(expr)
    }

    fn parse_power(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_unary()?;

        while let Some(op) = self.stream.match_kind(&[TokenKind::Pow]) {
            let right = self.parse_unary()?;
            expr = binary(expr, BinaryOp::Pow, op, right);
        }

        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        trace!(current = %self.current(), "parse_unary");

        if let Some(sign) = self.stream.match_kind(&[TokenKind::Sub, TokenKind::Add]) {
            let op = if sign.kind == TokenKind::Sub {
                UnaryOp::Neg
            } else {
                UnaryOp::Pos
            };
            let term = self.parse_unary()?;
            return Ok(Expression::new(
                ExprKind::Unary {
                    op,
                    term: Box::new(term),
                },
                sign,
            ));
        }

        let expr = self.parse_variable_or_literal()?;
        self.parse_filter_expression(expr)
    }

    /// Fold any number of `| name` / `| name(args)` suffixes onto `expr`.
    pub fn parse_filter_expression(&mut self, mut expr: Expression) -> Result<Expression, ParseError> {
        while let Some(pipe) = self.stream.match_kind(&[TokenKind::Pipe]) {
            trace!(current = %self.current(), "parse_filter");

            let Some(name) = self.stream.match_kind(&[TokenKind::Name]) else {
                return Err(self.error("Expected a filter name after '|'", Some(&pipe)));
            };

            let (args, kwargs) = match self.stream.match_kind(&[TokenKind::LParen]) {
                Some(lparen) => self.parse_call_arguments(&lparen)?,
                None => (Vec::new(), Vec::new()),
            };

            let filter = FilterCall {
                name: name.val.clone(),
                args,
                kwargs,
            };
            expr = Expression::new(
                ExprKind::Filtered {
                    expr: Box::new(expr),
                    filter,
                },
                name,
            );
        }

        Ok(expr)
    }
}
