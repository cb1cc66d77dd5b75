use std::fmt;

/// A position in source text, tracking line and column for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }
}

/// Token classification for template source.
///
/// Keywords (`and`, `or`, `not`, `in`, `is`, `if`, `else`) are plain `Name`
/// tokens; the parser decides what they mean from the token text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Template structure
    Data,
    VariableBegin,
    VariableEnd,

    // Literals
    Name,
    Integer,
    Float,
    String,

    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    Tilde,

    // Comparison
    Eq,
    Ne,
    Gt,
    Gteq,
    Lt,
    Lteq,

    // Punctuation
    Assign,
    Dot,
    Comma,
    Colon,
    Pipe,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,

    // End of input
    Eof,
}

impl TokenKind {
    /// Fixed source text of punctuation and operator kinds.
    pub fn symbol(self) -> Option<&'static str> {
        let text = match self {
            Self::VariableBegin => "{{",
            Self::VariableEnd => "}}",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::FloorDiv => "//",
            Self::Mod => "%",
            Self::Pow => "**",
            Self::Tilde => "~",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Gteq => ">=",
            Self::Lt => "<",
            Self::Lteq => "<=",
            Self::Assign => "=",
            Self::Dot => ".",
            Self::Comma => ",",
            Self::Colon => ":",
            Self::Pipe => "|",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::Data
            | Self::Name
            | Self::Integer
            | Self::Float
            | Self::String
            | Self::Eof => return None,
        };
        Some(text)
    }
}

/// A token produced by the scanner.
///
/// `val` is the token's source text. String tokens keep the raw lexeme
/// between the quotes; escape sequences are resolved by the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub val: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, val: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            val: val.into(),
            span,
        }
    }

    /// True for a `Name` token whose text is one of `names`.
    pub fn is_name(&self, names: &[&str]) -> bool {
        self.kind == TokenKind::Name && names.contains(&self.val.as_str())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "<EOF>"),
            kind => write!(
                f,
                "{kind:?}({:?}) at {}:{}",
                self.val, self.span.line, self.span.column
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_text() {
        assert_eq!(TokenKind::FloorDiv.symbol(), Some("//"));
        assert_eq!(TokenKind::VariableEnd.symbol(), Some("}}"));
        assert_eq!(TokenKind::Name.symbol(), None);
    }

    #[test]
    fn test_is_name() {
        let tok = Token::new(TokenKind::Name, "not", Span::new(0, 3, 1, 1));
        assert!(tok.is_name(&["in", "not"]));
        assert!(!tok.is_name(&["and"]));

        let string = Token::new(TokenKind::String, "not", Span::default());
        assert!(!string.is_name(&["not"]));
    }

    #[test]
    fn test_display() {
        let tok = Token::new(TokenKind::Name, "user", Span::new(3, 7, 2, 4));
        assert_eq!(tok.to_string(), "Name(\"user\") at 2:4");
        let eof = Token::new(TokenKind::Eof, "", Span::default());
        assert_eq!(eof.to_string(), "<EOF>");
    }
}
