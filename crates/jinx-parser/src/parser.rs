//! Parser entry points and shared helpers.
//!
//! The grammar itself is split by precedence level across sibling modules:
//! `expression` (inline-if, or, and, not, comparison), `math`, `test_suffix`
//! and `variable` (literals, collections and the postfix chain). Each level
//! is an `impl Parser` block over the same token stream.

use crate::ast::{Expression, Node};
use crate::config::ParserConfig;
use crate::ParseError;
use jinx_lexer::{Scanner, Token, TokenKind, TokenStream};
use tracing::trace;

/// Recursive-descent parser for template expressions.
///
/// Holds a single token stream; a parser is not shared between threads or
/// reused for more than one input.
pub struct Parser {
    pub(crate) stream: TokenStream,
    pub(crate) config: ParserConfig,
}

impl Parser {
    /// Create a parser over the given tokens with the default configuration.
    pub fn new(tokens: Vec<Token>) -> Self {
        Self::with_config(tokens, ParserConfig::default())
    }

    /// Create a parser over the given tokens.
    pub fn with_config(tokens: Vec<Token>, config: ParserConfig) -> Self {
        Self {
            stream: TokenStream::new(tokens),
            config,
        }
    }

    /// Parse a bare expression such as `user.name | upper`.
    pub fn parse_expression(source: &str) -> Result<Expression, ParseError> {
        let tokens = Scanner::tokenize_expression(source)?;
        Parser::new(tokens).expression()
    }

    /// Parse template source made of text and `{{ expr }}` blocks.
    pub fn parse_template(source: &str) -> Result<Vec<Node>, ParseError> {
        let tokens = Scanner::tokenize(source)?;
        Parser::new(tokens).template()
    }

    /// Parse the whole stream as one expression.
    pub fn expression(&mut self) -> Result<Expression, ParseError> {
        let expr = self.parse_expression_with_inline_ifs()?;
        if !self.stream.eof() {
            let tok = self.current().clone();
            return Err(self.error(format!("Unexpected token '{}'", tok.val), Some(&tok)));
        }
        Ok(expr)
    }

    /// Parse the whole stream as a template body.
    pub fn template(&mut self) -> Result<Vec<Node>, ParseError> {
        let mut nodes = Vec::new();

        while !self.stream.eof() {
            if let Some(data) = self.stream.match_kind(&[TokenKind::Data]) {
                nodes.push(Node::Data(data.val));
                continue;
            }

            let Some(begin) = self.stream.match_kind(&[TokenKind::VariableBegin]) else {
                let tok = self.current().clone();
                return Err(self.error(format!("Unexpected token '{}'", tok.val), Some(&tok)));
            };

            trace!(current = %self.current(), "parse_output");
            let expr = self.parse_expression_with_inline_ifs()?;
            if self.stream.match_kind(&[TokenKind::VariableEnd]).is_none() {
                let tok = self.current().clone();
                return Err(self.error(
                    format!("Expected '}}}}' to close '{{{{', got '{}'", tok.val),
                    Some(&begin),
                ));
            }
            nodes.push(Node::Output(expr));
        }

        Ok(nodes)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    pub(crate) fn current(&self) -> &Token {
        self.stream.current()
    }

    /// True when nothing but the end of the expression is left.
    pub(crate) fn at_expression_end(&self) -> bool {
        self.stream
            .peek(&[TokenKind::Eof, TokenKind::VariableEnd])
            .is_some()
    }

    /// Build an error located at `token`, or at the current token.
    pub(crate) fn error(&self, message: impl Into<String>, token: Option<&Token>) -> ParseError {
        let span = token.unwrap_or_else(|| self.current()).span;
        ParseError {
            message: message.into(),
            line: span.line,
            column: span.column,
        }
    }
}
