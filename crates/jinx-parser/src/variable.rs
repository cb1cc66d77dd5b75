//! Primary expressions and the postfix chain.
//!
//! Primaries are number and string literals, `[...]` lists, `(...)` tuples or
//! groups, `{...}` dicts, names, and the `*expr` / `**expr` spread markers.
//! Every primary is followed by any number of `.attr`, `.0`, `[index]`,
//! `[start:stop]` and `(args)` operators.

use crate::ast::{Attr, ExprKind, Expression, Pair};
use crate::parser::Parser;
use crate::ParseError;
use jinx_lexer::{Token, TokenKind};
use tracing::trace;

const RESERVED_NAMES: &[&str] = &["and", "or", "in", "not", "is"];

/// Resolve the escape sequences of a raw string lexeme.
///
/// Only `\n` and `\t` are turned into control characters; every other
/// backslash sequence, `\\` and escaped quotes included, is kept verbatim.
fn unescape(raw: &str) -> String {
    raw.replace("\\n", "\n").replace("\\t", "\t")
}

impl Parser {
    /// `NUMBER | STRING | COLLECTION | NAME | *expr | **expr`, plus postfix operators.
    pub fn parse_variable_or_literal(&mut self) -> Result<Expression, ParseError> {
        trace!(current = %self.current(), "parse_variable_or_literal");

        match self.current().kind {
            TokenKind::Integer | TokenKind::Float => self.parse_number(),
            TokenKind::String => self.parse_string(),
            TokenKind::LParen | TokenKind::LBrace | TokenKind::LBracket => self.parse_collection(),
            TokenKind::Name => self.parse_variable(),
            TokenKind::Mul => self.parse_spread(TokenKind::Mul),
            TokenKind::Pow => self.parse_spread(TokenKind::Pow),
            TokenKind::Eof | TokenKind::VariableEnd => Err(self.error(
                "Unexpected end of expression, expected a number, string, keyword or identifier",
                None,
            )),
            _ => Err(self.error(
                format!(
                    "Expected either a number, string, keyword or identifier, got '{}'",
                    self.current().val
                ),
                None,
            )),
        }
    }

    fn parse_number(&mut self) -> Result<Expression, ParseError> {
        trace!(current = %self.current(), "parse_number");

        let tok = self.stream.pop();
        let kind = if tok.kind == TokenKind::Integer {
            let value = tok
                .val
                .parse::<i64>()
                .map_err(|e| self.error(format!("Invalid integer '{}': {e}", tok.val), Some(&tok)))?;
            ExprKind::Integer(value)
        } else {
            let value = tok
                .val
                .parse::<f64>()
                .map_err(|e| self.error(format!("Invalid float '{}': {e}", tok.val), Some(&tok)))?;
            if !value.is_finite() {
                return Err(self.error(
                    format!("Invalid float '{}': value out of range", tok.val),
                    Some(&tok),
                ));
            }
            ExprKind::Float(value)
        };

        self.parse_ops_on(Expression::new(kind, tok))
    }

    fn parse_string(&mut self) -> Result<Expression, ParseError> {
        trace!(current = %self.current(), "parse_string");

        let tok = self.stream.pop();
        let value = unescape(&tok.val);

        self.parse_ops_on(Expression::new(ExprKind::String(value), tok))
    }

    fn parse_collection(&mut self) -> Result<Expression, ParseError> {
        let expr = match self.current().kind {
            TokenKind::LBracket => self.parse_list()?,
            TokenKind::LParen => self.parse_tuple()?,
            _ => self.parse_dict()?,
        };
        self.parse_ops_on(expr)
    }

    fn parse_list(&mut self) -> Result<Expression, ParseError> {
        trace!(current = %self.current(), "parse_list");

        let open = self.stream.pop();

        let mut items = Vec::new();
        if self.stream.match_kind(&[TokenKind::RBracket]).is_some() {
            return Ok(Expression::new(ExprKind::List(items), open));
        }

        items.push(self.parse_expression_with_inline_ifs()?);
        while self.stream.match_kind(&[TokenKind::Comma]).is_some() {
            if self.stream.peek(&[TokenKind::RBracket]).is_some() {
                break; // trailing comma
            }
            items.push(self.parse_expression_with_inline_ifs()?);
        }

        if self.stream.match_kind(&[TokenKind::RBracket]).is_none() {
            return Err(self.error("Expected ']'", None));
        }

        Ok(Expression::new(ExprKind::List(items), open))
    }

    /// `(a)` is grouping; `(a,)`, `(a, b)` and `()` are tuples.
    fn parse_tuple(&mut self) -> Result<Expression, ParseError> {
        trace!(current = %self.current(), "parse_tuple");

        let open = self.stream.pop();

        if self.stream.match_kind(&[TokenKind::RParen]).is_some() {
            return Ok(Expression::new(ExprKind::Tuple(Vec::new()), open));
        }

        let mut items = vec![self.parse_expression_with_inline_ifs()?];
        let mut trailing_comma = false;

        while self.stream.match_kind(&[TokenKind::Comma]).is_some() {
            if self.stream.peek(&[TokenKind::RParen]).is_some() {
                trailing_comma = true;
                break;
            }
            items.push(self.parse_expression_with_inline_ifs()?);
        }

        if self.stream.match_kind(&[TokenKind::RParen]).is_none() {
            return Err(self.error("Unbalanced parenthesis", Some(&open)));
        }

        if items.len() > 1 || trailing_comma {
            Ok(Expression::new(ExprKind::Tuple(items), open))
        } else {
            Ok(items.remove(0))
        }
    }

    fn parse_pair(&mut self) -> Result<Pair, ParseError> {
        trace!(current = %self.current(), "parse_pair");

        let key = self.parse_expression_with_inline_ifs()?;
        if self.stream.match_kind(&[TokenKind::Colon]).is_none() {
            return Err(self.error("Expected ':'", None));
        }
        let value = self.parse_expression_with_inline_ifs()?;

        Ok(Pair { key, value })
    }

    fn parse_dict(&mut self) -> Result<Expression, ParseError> {
        trace!(current = %self.current(), "parse_dict");

        let open = self.stream.pop();
        let mut pairs = Vec::new();

        if self.stream.peek(&[TokenKind::RBrace]).is_none() {
            pairs.push(self.parse_pair()?);
        }

        while self.stream.match_kind(&[TokenKind::Comma]).is_some() {
            if self.stream.peek(&[TokenKind::RBrace]).is_none() {
                pairs.push(self.parse_pair()?);
            }
        }

        if self.stream.match_kind(&[TokenKind::RBrace]).is_none() {
            return Err(self.error("Expected '}'", None));
        }

        Ok(Expression::new(ExprKind::Dict(pairs), open))
    }

    /// A name, or one of the boolean literals `true`/`True`/`false`/`False`.
    fn parse_variable(&mut self) -> Result<Expression, ParseError> {
        trace!(current = %self.current(), "parse_variable");

        let tok = self.stream.pop();

        let kind = match tok.val.as_str() {
            "true" | "True" => return Ok(Expression::new(ExprKind::Bool(true), tok)),
            "false" | "False" => return Ok(Expression::new(ExprKind::Bool(false), tok)),
            name if RESERVED_NAMES.contains(&name) => {
                return Err(self.error(
                    format!("Cannot use reserved name '{name}' as variable name"),
                    Some(&tok),
                ));
            }
            name => ExprKind::Name(name.to_string()),
        };

        self.parse_ops_on(Expression::new(kind, tok))
    }

    /// `*expr` or `**expr`.
    fn parse_spread(&mut self, kind: TokenKind) -> Result<Expression, ParseError> {
        trace!(current = %self.current(), "parse_spread");

        let star = self.stream.pop();
        let term = Box::new(self.parse_variable_or_literal()?);
        let kind = if kind == TokenKind::Mul {
            ExprKind::VarArgs(term)
        } else {
            ExprKind::KwArgs(term)
        };
        Ok(Expression::new(kind, star))
    }

    /// Apply `.attr`, `.0`, `[...]` and `(...)` operators until none match.
    pub(crate) fn parse_ops_on(&mut self, mut expr: Expression) -> Result<Expression, ParseError> {
        trace!(current = %self.current(), "parse_ops_on");

        while !self.stream.eof() {
            if let Some(dot) = self.stream.match_kind(&[TokenKind::Dot]) {
                expr = self.parse_getattr(expr, dot)?;
            } else if let Some(bracket) = self.stream.match_kind(&[TokenKind::LBracket]) {
                expr = self.parse_subscript(expr, bracket)?;
            } else if let Some(lparen) = self.stream.match_kind(&[TokenKind::LParen]) {
                let (args, kwargs) = self.parse_call_arguments(&lparen)?;
                expr = Expression::new(
                    ExprKind::Call {
                        func: Box::new(expr),
                        args,
                        kwargs,
                    },
                    lparen,
                );
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn parse_getattr(&mut self, node: Expression, dot: Token) -> Result<Expression, ParseError> {
        let attr = match self.stream.match_kind(&[TokenKind::Name, TokenKind::Integer]) {
            Some(tok) if tok.kind == TokenKind::Name => Attr::Name(tok.val),
            Some(tok) => {
                let index = tok
                    .val
                    .parse::<usize>()
                    .map_err(|e| self.error(format!("Invalid index '{}': {e}", tok.val), Some(&tok)))?;
                Attr::Index(index)
            }
            None => {
                return Err(self.error(
                    format!(
                        "Token '{}' is not allowed after '.' in a variable name",
                        self.current().val
                    ),
                    None,
                ))
            }
        };

        Ok(Expression::new(
            ExprKind::GetAttr {
                node: Box::new(node),
                attr,
            },
            dot,
        ))
    }

    /// `[index]` or `[start:stop]` with either bound optional.
    fn parse_subscript(&mut self, node: Expression, bracket: Token) -> Result<Expression, ParseError> {
        if self.stream.peek(&[TokenKind::RBracket]).is_some() {
            return Err(self.error("Expected an index expression", Some(&bracket)));
        }

        let start = if self.stream.peek(&[TokenKind::Colon]).is_none() {
            Some(Box::new(self.parse_expression_with_inline_ifs()?))
        } else {
            None
        };

        let kind = if self.stream.match_kind(&[TokenKind::Colon]).is_some() {
            let stop = if self.stream.peek(&[TokenKind::RBracket]).is_none() {
                Some(Box::new(self.parse_expression_with_inline_ifs()?))
            } else {
                None
            };
            ExprKind::GetItemRange {
                node: Box::new(node),
                start,
                stop,
            }
        } else {
            match start {
                Some(arg) => ExprKind::GetItem {
                    node: Box::new(node),
                    arg,
                },
                None => return Err(self.error("Unbalanced bracket", Some(&bracket))),
            }
        };

        if self.stream.match_kind(&[TokenKind::RBracket]).is_none() {
            return Err(self.error("Unbalanced bracket", Some(&bracket)));
        }

        Ok(Expression::new(kind, bracket))
    }

    /// Arguments after an already consumed `(`: positional expressions and
    /// `name=expr` keywords, with an optional trailing comma. Separating
    /// commas may be left out: `f(a b)` is `f(a, b)`.
    pub(crate) fn parse_call_arguments(
        &mut self,
        lparen: &Token,
    ) -> Result<(Vec<Expression>, Vec<(String, Expression)>), ParseError> {
        trace!(current = %self.current(), "parse_call_arguments");

        let mut args = Vec::new();
        let mut kwargs: Vec<(String, Expression)> = Vec::new();

        if self.stream.match_kind(&[TokenKind::RParen]).is_some() {
            return Ok((args, kwargs));
        }

        loop {
            if self.at_expression_end() {
                return Err(self.error("Unbalanced parenthesis", Some(lparen)));
            }

            let value = self.parse_expression_with_inline_ifs()?;

            if let Some(assign) = self.stream.match_kind(&[TokenKind::Assign]) {
                let ExprKind::Name(key) = &value.kind else {
                    return Err(self.error(
                        format!("Keyword argument name must be an identifier, got '{}'", value.token.val),
                        Some(&assign),
                    ));
                };
                if kwargs.iter().any(|(k, _)| k == key) {
                    return Err(self.error(
                        format!("Duplicate keyword argument '{key}'"),
                        Some(&value.token),
                    ));
                }
                let key = key.clone();
                kwargs.push((key, self.parse_expression_with_inline_ifs()?));
            } else {
                args.push(value);
            }

            if self.stream.match_kind(&[TokenKind::Comma]).is_some() {
                if self.stream.match_kind(&[TokenKind::RParen]).is_some() {
                    break; // trailing comma
                }
                continue;
            }
            if self.stream.match_kind(&[TokenKind::RParen]).is_some() {
                break;
            }
        }

        Ok((args, kwargs))
    }
}

#[cfg(test)]
mod tests {
    use super::unescape;
    use crate::ast::{Attr, ExprKind, Expression};
    use crate::parser::Parser;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Expression {
        Parser::parse_expression(source).unwrap()
    }

    fn parse_err(source: &str) -> String {
        Parser::parse_expression(source).unwrap_err().message
    }

    // =========================================================================
    // Literals
    // =========================================================================

    #[test]
    fn test_numbers() {
        assert_eq!(parse("42").kind, ExprKind::Integer(42));
        assert_eq!(parse("2.5").kind, ExprKind::Float(2.5));
        assert_eq!(parse("1e3").kind, ExprKind::Float(1000.0));
    }

    #[test]
    fn test_integer_overflow_is_error() {
        let err = Parser::parse_expression("99999999999999999999").unwrap_err();
        assert!(err.message.contains("Invalid integer"));
        assert_eq!((err.line, err.column), (1, 1));
    }

    #[test]
    fn test_float_out_of_range_is_error() {
        let err = Parser::parse_expression("1e400").unwrap_err();
        assert!(err.message.contains("Invalid float '1e400': value out of range"));
        assert_eq!((err.line, err.column), (1, 1));
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(parse(r"'a\nb\tc'").kind, ExprKind::String("a\nb\tc".into()));
    }

    #[test]
    fn test_other_escapes_are_kept_verbatim() {
        assert_eq!(parse(r"'a\\b'").kind, ExprKind::String(r"a\\b".into()));
        assert_eq!(parse(r"'it\'s'").kind, ExprKind::String(r"it\'s".into()));
        assert_eq!(parse(r#""say \"hi\"""#).kind, ExprKind::String(r#"say \"hi\""#.into()));
        assert_eq!(parse(r"'\d+'").kind, ExprKind::String(r"\d+".into()));
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"a\nb"), "a\nb");
        assert_eq!(unescape(r"\q\t"), "\\q\t");
        assert_eq!(unescape(r"\\n"), "\\\n");
    }

    #[test]
    fn test_booleans() {
        for (source, value) in [("true", true), ("True", true), ("false", false), ("False", false)] {
            assert_eq!(parse(source).kind, ExprKind::Bool(value));
        }
        assert_eq!(parse("TRUE").kind, ExprKind::Name("TRUE".into()));
    }

    #[test]
    fn test_reserved_names() {
        for name in ["and", "or", "in", "not", "is"] {
            let err = Parser::parse_expression(&format!("x + {name}")).unwrap_err();
            assert!(
                err.message.contains("reserved name") || err.message.contains("right-hand side"),
                "{name}: {}",
                err.message
            );
        }
        assert!(parse_err("or").contains("Cannot use reserved name 'or'"));
        assert!(parse_err("is").contains("Cannot use reserved name 'is'"));
    }

    // =========================================================================
    // Collections
    // =========================================================================

    #[test]
    fn test_empty_list() {
        assert_eq!(parse("[]").kind, ExprKind::List(Vec::new()));
    }

    #[test]
    fn test_list_trailing_comma() {
        match parse("[1,]").kind {
            ExprKind::List(items) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].kind, ExprKind::Integer(1));
            }
            other => panic!("Expected list, got {other:?}"),
        }
    }

    #[test]
    fn test_unclosed_list() {
        assert!(parse_err("[1, 2").contains("Expected ']'"));
    }

    #[test]
    fn test_tuple_vs_grouping() {
        assert_eq!(parse("(1)").kind, ExprKind::Integer(1));
        match parse("(1,)").kind {
            ExprKind::Tuple(items) => assert_eq!(items.len(), 1),
            other => panic!("Expected tuple, got {other:?}"),
        }
        match parse("(1, 2)").kind {
            ExprKind::Tuple(items) => assert_eq!(items.len(), 2),
            other => panic!("Expected tuple, got {other:?}"),
        }
        assert_eq!(parse("()").kind, ExprKind::Tuple(Vec::new()));
    }

    #[test]
    fn test_unbalanced_parenthesis() {
        let err = Parser::parse_expression("(1, 2").unwrap_err();
        assert!(err.message.contains("Unbalanced parenthesis"));
        assert_eq!(err.column, 1);
    }

    #[test]
    fn test_dict_keeps_duplicate_keys_in_order() {
        match parse("{'a': 1, 'b': 2, 'a': 3,}").kind {
            ExprKind::Dict(pairs) => {
                let keys: Vec<_> = pairs.iter().map(|p| p.key.kind.clone()).collect();
                assert_eq!(
                    keys,
                    vec![
                        ExprKind::String("a".into()),
                        ExprKind::String("b".into()),
                        ExprKind::String("a".into()),
                    ]
                );
                assert_eq!(pairs[2].value.kind, ExprKind::Integer(3));
            }
            other => panic!("Expected dict, got {other:?}"),
        }
        assert_eq!(parse("{}").kind, ExprKind::Dict(Vec::new()));
    }

    #[test]
    fn test_dict_missing_colon() {
        assert!(parse_err("{'a' 1}").contains("Expected ':'"));
    }

    // =========================================================================
    // Postfix chain
    // =========================================================================

    #[test]
    fn test_getattr_name_and_index() {
        match parse("user.name").kind {
            ExprKind::GetAttr { attr, .. } => assert_eq!(attr, Attr::Name("name".into())),
            other => panic!("Expected getattr, got {other:?}"),
        }
        match parse("pair.1").kind {
            ExprKind::GetAttr { attr, .. } => assert_eq!(attr, Attr::Index(1)),
            other => panic!("Expected getattr, got {other:?}"),
        }
        assert_eq!(parse("pair.0.1").to_string(), "pair.0.1");
    }

    #[test]
    fn test_getattr_invalid_token() {
        assert!(parse_err("user.'x'").contains("not allowed after '.'"));
    }

    #[test]
    fn test_getitem() {
        match parse("a[1]").kind {
            ExprKind::GetItem { arg, .. } => assert_eq!(arg.kind, ExprKind::Integer(1)),
            other => panic!("Expected getitem, got {other:?}"),
        }
    }

    #[test]
    fn test_slices() {
        for (source, has_start, has_stop) in [
            ("a[1:3]", true, true),
            ("a[:3]", false, true),
            ("a[1:]", true, false),
            ("a[:]", false, false),
        ] {
            match parse(source).kind {
                ExprKind::GetItemRange { start, stop, .. } => {
                    assert_eq!(start.is_some(), has_start, "{source}");
                    assert_eq!(stop.is_some(), has_stop, "{source}");
                }
                other => panic!("Expected slice for {source}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_unbalanced_bracket() {
        assert!(parse_err("a[1").contains("Unbalanced bracket"));
        assert!(parse_err("a[1:2").contains("Unbalanced bracket"));
        assert!(parse_err("a[]").contains("Expected an index expression"));
    }

    #[test]
    fn test_call_positional_and_keyword() {
        match parse("f(x, y=2)").kind {
            ExprKind::Call { func, args, kwargs } => {
                assert_eq!(func.kind, ExprKind::Name("f".into()));
                assert_eq!(args.len(), 1);
                assert_eq!(args[0].kind, ExprKind::Name("x".into()));
                assert_eq!(kwargs.len(), 1);
                assert_eq!(kwargs[0].0, "y");
                assert_eq!(kwargs[0].1.kind, ExprKind::Integer(2));
            }
            other => panic!("Expected call, got {other:?}"),
        }
    }

    #[test]
    fn test_call_forms() {
        assert_eq!(parse("f()").to_string(), "f()");
        assert_eq!(parse("f(a,)").to_string(), "f(a)");
        assert_eq!(parse("f(k=1,)").to_string(), "f(k=1)");
        assert_eq!(parse("f(*args, **kwargs)").to_string(), "f(*args, **kwargs)");
        assert_eq!(parse("obj.method(1)[0].x").to_string(), "obj.method(1)[0].x");
    }

    #[test]
    fn test_call_errors() {
        assert!(parse_err("f(a,").contains("Unbalanced parenthesis"));
        assert!(parse_err("f(1=2)").contains("must be an identifier"));
        assert!(parse_err("f(a=1, a=2)").contains("Duplicate keyword argument 'a'"));
    }

    #[test]
    fn test_call_arguments_without_commas() {
        match parse("f(a b)").kind {
            ExprKind::Call { args, .. } => {
                assert_eq!(args.len(), 2);
                assert_eq!(args[1].kind, ExprKind::Name("b".into()));
            }
            other => panic!("Expected call, got {other:?}"),
        }
        assert_eq!(parse("f(a b, k=1 c)").to_string(), "f(a, b, c, k=1)");
    }

    #[test]
    fn test_postfix_on_literals() {
        assert_eq!(parse("'a,b'.split(',')").to_string(), "'a,b'.split(',')");
        assert_eq!(parse("[1, 2][0]").to_string(), "[1, 2][0]");
    }

    #[test]
    fn test_unexpected_primary() {
        assert!(parse_err(")").contains("Expected either a number"));
        assert!(parse_err("").contains("Unexpected end of expression"));
    }
}
