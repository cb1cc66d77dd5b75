//! Jinx Parser
//!
//! Parses a token stream into an Abstract Syntax Tree for template
//! expressions: boolean logic, comparisons, math, literals, collections,
//! attribute/index/slice access, calls, filters and `is` tests.
//!
//! Template bodies are limited to raw data and `{{ expr }}` output blocks,
//! which is what macro bodies need to be executed.
//!
//! ```
//! use jinx_parser::{ExprKind, Parser};
//!
//! let expr = Parser::parse_expression("a and b or c").unwrap();
//! assert!(matches!(expr.kind, ExprKind::Binary { .. }));
//! assert_eq!(expr.to_string(), "((a and b) or c)");
//! ```

pub mod ast;
pub mod config;
mod display;
mod expression;
mod math;
pub mod parser;
mod test_suffix;
mod variable;

pub use ast::{Attr, BinaryOp, ExprKind, Expression, Macro, Node, UnaryOp};
pub use config::ParserConfig;
pub use parser::Parser;

/// Parser error with position information.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Parse error at line {line}, column {column}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl From<jinx_lexer::LexerError> for ParseError {
    fn from(e: jinx_lexer::LexerError) -> Self {
        ParseError {
            message: e.message,
            line: e.line,
            column: e.column,
        }
    }
}
