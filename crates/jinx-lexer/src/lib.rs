//! Jinx Lexer
//!
//! Tokenizes Jinja-style template source into a stream of tokens.
//! Handles template text, `{{ ... }}` variable blocks, `{# ... #}` comments,
//! and the full expression token set (names, numbers, strings, operators).
//!
//! # Example
//!
//! ```
//! use jinx_lexer::{Scanner, TokenKind};
//!
//! let tokens = Scanner::tokenize_expression("a + 1").unwrap();
//! assert_eq!(tokens[1].kind, TokenKind::Add);
//! assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
//! ```

pub mod scanner;
pub mod stream;
pub mod token;

pub use scanner::{Scanner, ScannerMode};
pub use stream::TokenStream;
pub use token::{Span, Token, TokenKind};

/// Lexer error with position information.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Lexer error at line {line}, column {column}: {message}")]
pub struct LexerError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}
