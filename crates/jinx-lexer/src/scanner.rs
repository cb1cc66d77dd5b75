use crate::token::{Span, Token, TokenKind};
use crate::LexerError;

/// Scanner mode determines how the source is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerMode {
    /// Default mode: text is template data, `{{ expr }}` opens a variable block.
    Template,
    /// The whole source is a single expression. `{` and `}` are regular braces.
    Expression,
}

/// Template source scanner.
///
/// Tokenizes template text and the expressions embedded in it.
/// - `Vec<char>` source for index-based navigation
/// - Mode-aware handling of `{{`, `}}` and braces
/// - Position tracking on every token
pub struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
    mode: ScannerMode,
    /// Inside a `{{ ... }}` block (template mode only).
    in_variable: bool,
    /// Braces opened inside the current variable block and not yet closed.
    brace_depth: usize,
}

impl Scanner {
    /// Create a new template-mode scanner for the given source.
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
            mode: ScannerMode::Template,
            in_variable: false,
            brace_depth: 0,
        }
    }

    /// Create a scanner with a specific mode.
    pub fn with_mode(source: &str, mode: ScannerMode) -> Self {
        let mut scanner = Self::new(source);
        scanner.mode = mode;
        scanner
    }

    /// Tokenize template source (text with `{{ }}` blocks).
    pub fn tokenize(source: &str) -> Result<Vec<Token>, LexerError> {
        let mut scanner = Scanner::new(source);
        scanner.scan_tokens()?;
        Ok(scanner.tokens)
    }

    /// Tokenize a bare expression such as `user.name | upper`.
    pub fn tokenize_expression(source: &str) -> Result<Vec<Token>, LexerError> {
        let mut scanner = Scanner::with_mode(source, ScannerMode::Expression);
        scanner.scan_tokens()?;
        Ok(scanner.tokens)
    }

    /// Scan all tokens from the source.
    fn scan_tokens(&mut self) -> Result<(), LexerError> {
        while !self.is_at_end() {
            match self.mode {
                ScannerMode::Expression => self.scan_expression_token()?,
                ScannerMode::Template if self.in_variable => self.scan_expression_token()?,
                ScannerMode::Template => self.scan_data()?,
            }
        }

        if self.in_variable {
            return Err(self.error("Unterminated variable block, expected '}}'".into()));
        }

        self.emit(TokenKind::Eof, "");
        Ok(())
    }

    // --- Template data ---

    /// Scan template text up to the next block opener.
    fn scan_data(&mut self) -> Result<(), LexerError> {
        let start_line = self.line;
        let start_col = self.column;
        let start_pos = self.pos;

        let mut text = String::new();
        while !self.is_at_end() && !(self.peek() == '{' && matches!(self.peek_next(), '{' | '#' | '%'))
        {
            text.push(self.peek());
            self.advance();
        }

        if !text.is_empty() {
            let span = Span::new(start_pos, self.pos, start_line, start_col);
            self.tokens.push(Token::new(TokenKind::Data, text, span));
        }

        if self.is_at_end() {
            return Ok(());
        }

        match self.peek_next() {
            '{' => {
                self.emit(TokenKind::VariableBegin, "{{");
                self.advance_n(2);
                self.in_variable = true;
                self.brace_depth = 0;
                Ok(())
            }
            '#' => self.skip_comment(),
            _ => Err(self.error("Statement blocks '{% ... %}' are not supported".into())),
        }
    }

    /// Skip a `{# ... #}` comment.
    fn skip_comment(&mut self) -> Result<(), LexerError> {
        let start_line = self.line;
        let start_col = self.column;
        self.advance_n(2);

        while !self.is_at_end() {
            if self.peek() == '#' && self.peek_next() == '}' {
                self.advance_n(2);
                return Ok(());
            }
            self.advance();
        }

        Err(LexerError {
            message: "Unterminated comment".into(),
            line: start_line,
            column: start_col,
        })
    }

    // --- Expressions ---

    /// Scan the next expression token.
    fn scan_expression_token(&mut self) -> Result<(), LexerError> {
        let ch = self.peek();

        match ch {
            c if c.is_whitespace() => {
                self.advance();
                Ok(())
            }

            // End of a variable block
            '}' if self.in_variable && self.brace_depth == 0 && self.peek_next() == '}' => {
                self.emit(TokenKind::VariableEnd, "}}");
                self.advance_n(2);
                self.in_variable = false;
                Ok(())
            }

            '0'..='9' => self.scan_number(),
            '"' | '\'' => self.scan_string(),
            c if c.is_alphabetic() || c == '_' => self.scan_name(),

            // Two-character operators (check first)
            '/' if self.peek_next() == '/' => self.symbol(TokenKind::FloorDiv),
            '*' if self.peek_next() == '*' => self.symbol(TokenKind::Pow),
            '=' if self.peek_next() == '=' => self.symbol(TokenKind::Eq),
            '!' if self.peek_next() == '=' => self.symbol(TokenKind::Ne),
            '>' if self.peek_next() == '=' => self.symbol(TokenKind::Gteq),
            '<' if self.peek_next() == '=' => self.symbol(TokenKind::Lteq),

            // Single-character tokens
            '+' => self.symbol(TokenKind::Add),
            '-' => self.symbol(TokenKind::Sub),
            '*' => self.symbol(TokenKind::Mul),
            '/' => self.symbol(TokenKind::Div),
            '%' => self.symbol(TokenKind::Mod),
            '~' => self.symbol(TokenKind::Tilde),
            '>' => self.symbol(TokenKind::Gt),
            '<' => self.symbol(TokenKind::Lt),
            '=' => self.symbol(TokenKind::Assign),
            '.' => self.symbol(TokenKind::Dot),
            ',' => self.symbol(TokenKind::Comma),
            ':' => self.symbol(TokenKind::Colon),
            '|' => self.symbol(TokenKind::Pipe),
            '(' => self.symbol(TokenKind::LParen),
            ')' => self.symbol(TokenKind::RParen),
            '[' => self.symbol(TokenKind::LBracket),
            ']' => self.symbol(TokenKind::RBracket),
            '{' => {
                self.brace_depth += 1;
                self.symbol(TokenKind::LBrace)
            }
            '}' => {
                self.brace_depth = self.brace_depth.saturating_sub(1);
                self.symbol(TokenKind::RBrace)
            }

            _ => Err(self.error(format!("Unexpected character: '{ch}'"))),
        }
    }

    /// Emit an operator or punctuation token and consume its text.
    fn symbol(&mut self, kind: TokenKind) -> Result<(), LexerError> {
        let text = kind.symbol().unwrap_or_default();
        self.emit(kind, text);
        self.advance_n(text.chars().count());
        Ok(())
    }

    /// Scan a string literal. The token keeps the raw text between the quotes;
    /// a backslash only protects the following character from closing the string.
    fn scan_string(&mut self) -> Result<(), LexerError> {
        let quote = self.peek();
        let start_line = self.line;
        let start_col = self.column;
        let start_pos = self.pos;
        self.advance(); // consume opening quote

        let mut raw = String::new();

        while !self.is_at_end() && self.peek() != quote {
            if self.peek() == '\\' {
                raw.push('\\');
                self.advance();
                if self.is_at_end() {
                    break;
                }
            }
            raw.push(self.peek());
            self.advance();
        }

        if self.is_at_end() {
            return Err(LexerError {
                message: "Unterminated string".into(),
                line: start_line,
                column: start_col,
            });
        }

        self.advance(); // consume closing quote

        let span = Span::new(start_pos, self.pos, start_line, start_col);
        self.tokens.push(Token::new(TokenKind::String, raw, span));
        Ok(())
    }

    /// Scan a name. Keywords and boolean literals are names too.
    fn scan_name(&mut self) -> Result<(), LexerError> {
        let start_line = self.line;
        let start_col = self.column;
        let start_pos = self.pos;

        while !self.is_at_end() && (self.peek().is_alphanumeric() || self.peek() == '_') {
            self.advance();
        }

        let text = self.text(start_pos);
        let span = Span::new(start_pos, self.pos, start_line, start_col);
        self.tokens.push(Token::new(TokenKind::Name, text, span));
        Ok(())
    }

    /// Scan a number literal (integer or float).
    ///
    /// Right after a `.` only digits are read, so `pair.0.1` stays two
    /// positional lookups instead of `pair` `.` `0.1`.
    fn scan_number(&mut self) -> Result<(), LexerError> {
        let start_line = self.line;
        let start_col = self.column;
        let start_pos = self.pos;

        let after_dot = self
            .tokens
            .last()
            .is_some_and(|t| t.kind == TokenKind::Dot);

        self.skip_digits();
        let mut kind = TokenKind::Integer;

        if !after_dot {
            if self.peek() == '.' && self.peek_next().is_ascii_digit() {
                self.advance(); // consume `.`
                self.skip_digits();
                kind = TokenKind::Float;
            }

            if matches!(self.peek(), 'e' | 'E') {
                let exponent_digit = match self.peek_next() {
                    '+' | '-' => self.peek_at(2).is_ascii_digit(),
                    c => c.is_ascii_digit(),
                };
                if exponent_digit {
                    self.advance(); // consume `e`
                    if matches!(self.peek(), '+' | '-') {
                        self.advance();
                    }
                    self.skip_digits();
                    kind = TokenKind::Float;
                }
            }
        }

        let text = self.text(start_pos);
        let span = Span::new(start_pos, self.pos, start_line, start_col);
        self.tokens.push(Token::new(kind, text, span));
        Ok(())
    }

    // --- Helpers ---

    fn emit(&mut self, kind: TokenKind, val: &str) {
        let end = self.pos + val.chars().count();
        let span = Span::new(self.pos, end, self.line, self.column);
        self.tokens.push(Token::new(kind, val, span));
    }

    fn text(&self, start: usize) -> String {
        self.chars[start..self.pos].iter().collect()
    }

    fn skip_digits(&mut self) {
        while !self.is_at_end() && self.peek().is_ascii_digit() {
            self.advance();
        }
    }

    fn peek(&self) -> char {
        self.peek_at(0)
    }

    fn peek_next(&self) -> char {
        self.peek_at(1)
    }

    fn peek_at(&self, offset: usize) -> char {
        self.chars.get(self.pos + offset).copied().unwrap_or('\0')
    }

    fn advance(&mut self) {
        if self.is_at_end() {
            return;
        }
        if self.chars[self.pos] == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.pos += 1;
    }

    fn advance_n(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn error(&self, message: String) -> LexerError {
        LexerError {
            message,
            line: self.line,
            column: self.column,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Helper: tokenize an expression and return token kinds (ignoring spans).
    fn kinds(source: &str) -> Vec<TokenKind> {
        Scanner::tokenize_expression(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    /// Helper: tokenize an expression and return token texts.
    fn vals(source: &str) -> Vec<String> {
        Scanner::tokenize_expression(source)
            .unwrap()
            .into_iter()
            .map(|t| t.val)
            .collect()
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    #[test]
    fn test_empty_source() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_names_and_keywords() {
        assert_eq!(
            kinds("not user and is_admin"),
            vec![
                TokenKind::Name,
                TokenKind::Name,
                TokenKind::Name,
                TokenKind::Name,
                TokenKind::Eof,
            ]
        );
        assert_eq!(vals("not user"), vec!["not", "user", ""]);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("42 2.5 1e3 7E-2"),
            vec![
                TokenKind::Integer,
                TokenKind::Float,
                TokenKind::Float,
                TokenKind::Float,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_number_followed_by_dot_name() {
        assert_eq!(
            kinds("1.real"),
            vec![TokenKind::Integer, TokenKind::Dot, TokenKind::Name, TokenKind::Eof]
        );
    }

    #[test]
    fn test_positional_attribute_chain() {
        assert_eq!(
            kinds("pair.0.1"),
            vec![
                TokenKind::Name,
                TokenKind::Dot,
                TokenKind::Integer,
                TokenKind::Dot,
                TokenKind::Integer,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("a // b ** c == d != e >= f <= g"),
            vec![
                TokenKind::Name,
                TokenKind::FloorDiv,
                TokenKind::Name,
                TokenKind::Pow,
                TokenKind::Name,
                TokenKind::Eq,
                TokenKind::Name,
                TokenKind::Ne,
                TokenKind::Name,
                TokenKind::Gteq,
                TokenKind::Name,
                TokenKind::Lteq,
                TokenKind::Name,
                TokenKind::Eof,
            ]
        );
        assert_eq!(
            kinds("+ - * / % ~ > < = . , : |"),
            vec![
                TokenKind::Add,
                TokenKind::Sub,
                TokenKind::Mul,
                TokenKind::Div,
                TokenKind::Mod,
                TokenKind::Tilde,
                TokenKind::Gt,
                TokenKind::Lt,
                TokenKind::Assign,
                TokenKind::Dot,
                TokenKind::Comma,
                TokenKind::Colon,
                TokenKind::Pipe,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_keeps_raw_escapes() {
        let tokens = Scanner::tokenize_expression(r#"'it\'s\n' "x""#).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].val, r"it\'s\n");
        assert_eq!(tokens[1].val, "x");
    }

    #[test]
    fn test_braces_in_expression_mode() {
        assert_eq!(
            kinds("{}}"),
            vec![
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let err = Scanner::tokenize_expression("'hello").unwrap_err();
        assert!(err.message.contains("Unterminated string"));
        assert_eq!((err.line, err.column), (1, 1));
    }

    #[test]
    fn test_unexpected_character() {
        let err = Scanner::tokenize_expression("a ! b").unwrap_err();
        assert!(err.message.contains("Unexpected character"));
        assert_eq!(err.column, 3);
    }

    // =========================================================================
    // Templates
    // =========================================================================

    #[test]
    fn test_template_data_and_variable() {
        let tokens = Scanner::tokenize("Hello {{ name }}!").unwrap();
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Data,
                TokenKind::VariableBegin,
                TokenKind::Name,
                TokenKind::VariableEnd,
                TokenKind::Data,
                TokenKind::Eof,
            ]
        );
        assert_eq!(tokens[0].val, "Hello ");
        assert_eq!(tokens[4].val, "!");
    }

    #[test]
    fn test_template_dict_inside_variable() {
        let tokens = Scanner::tokenize("{{ {'a': {'b': 1}} }}").unwrap();
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds.iter().filter(|k| **k == TokenKind::RBrace).count(), 2);
        assert_eq!(kinds[kinds.len() - 2], TokenKind::VariableEnd);
    }

    #[test]
    fn test_template_comment_skipped() {
        let tokens = Scanner::tokenize("a{# note #}b").unwrap();
        let vals: Vec<&str> = tokens.iter().map(|t| t.val.as_str()).collect();
        assert_eq!(vals, vec!["a", "b", ""]);
    }

    #[test]
    fn test_template_line_tracking() {
        let tokens = Scanner::tokenize("line one\n{{ x }}").unwrap();
        let name = tokens.iter().find(|t| t.kind == TokenKind::Name).unwrap();
        assert_eq!((name.span.line, name.span.column), (2, 4));
    }

    #[test]
    fn test_unterminated_variable() {
        let err = Scanner::tokenize("{{ name").unwrap_err();
        assert!(err.message.contains("Unterminated variable block"));
    }

    #[test]
    fn test_unterminated_comment() {
        let err = Scanner::tokenize("{# oops").unwrap_err();
        assert!(err.message.contains("Unterminated comment"));
    }

    #[test]
    fn test_statement_block_rejected() {
        let err = Scanner::tokenize("{% if x %}").unwrap_err();
        assert!(err.message.contains("not supported"));
    }
}
