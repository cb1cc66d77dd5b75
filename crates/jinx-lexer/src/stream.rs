//! Token stream with lookahead and conditional consumption.

use crate::token::{Span, Token, TokenKind};

/// Cursor over a token vector.
///
/// The stream always ends with an `Eof` token; `pop` never moves past it, so
/// `current` is always valid.
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenStream {
    /// Wrap scanner output. An `Eof` token is appended if missing.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let span = tokens
                .last()
                .map(|t| Span::new(t.span.end, t.span.end, t.span.line, t.span.column))
                .unwrap_or_else(|| Span::new(0, 0, 1, 1));
            tokens.push(Token::new(TokenKind::Eof, "", span));
        }
        Self { tokens, pos: 0 }
    }

    /// The token under the cursor.
    pub fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    /// The current token if its kind is one of `kinds`.
    pub fn peek(&self, kinds: &[TokenKind]) -> Option<&Token> {
        let tok = self.current();
        kinds.contains(&tok.kind).then_some(tok)
    }

    /// The current token if it is a name with one of the given texts.
    pub fn peek_name(&self, names: &[&str]) -> Option<&Token> {
        let tok = self.current();
        tok.is_name(names).then_some(tok)
    }

    /// Consume and return the current token if its kind is one of `kinds`.
    pub fn match_kind(&mut self, kinds: &[TokenKind]) -> Option<Token> {
        self.peek(kinds)?;
        Some(self.pop())
    }

    /// Consume and return the current token if it is one of the given names.
    pub fn match_name(&mut self, names: &[&str]) -> Option<Token> {
        self.peek_name(names)?;
        Some(self.pop())
    }

    /// Consume and return the current token unconditionally.
    pub fn pop(&mut self) -> Token {
        let tok = self.current().clone();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    /// True once only the `Eof` token is left.
    pub fn eof(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }
}
