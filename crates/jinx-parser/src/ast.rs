//! Abstract Syntax Tree for template expressions.
//!
//! Expression nodes are produced by the parser and consumed by an evaluator.
//! Every node keeps the token it was created from so evaluation errors can
//! point back at the source. Template-level nodes are limited to what a
//! macro body needs: raw data and `{{ expr }}` output.

use jinx_lexer::Token;

// ---------------------------------------------------------------------------
// Template-level AST
// ---------------------------------------------------------------------------

/// A node of a template body.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Raw template text, emitted as-is.
    Data(String),

    /// A `{{ expr }}` output block.
    Output(Expression),
}

/// A macro declaration: `name(args..., kw=default...)` plus its body.
#[derive(Debug, Clone, PartialEq)]
pub struct Macro {
    pub name: String,
    /// Required parameters, in declaration order.
    pub args: Vec<String>,
    /// Keyword parameters with their default expressions, in declaration order.
    pub kwargs: Vec<(String, Expression)>,
    pub body: Vec<Node>,
}

impl Macro {
    /// True if any expression in the body references `name`.
    pub fn references(&self, name: &str) -> bool {
        self.body.iter().any(|node| match node {
            Node::Data(_) => false,
            Node::Output(expr) => expr.references(name),
        })
    }
}

// ---------------------------------------------------------------------------
// Expression-level AST
// ---------------------------------------------------------------------------

/// A complete expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExprKind,
    /// Token the node originates from (operator token for operations).
    pub token: Token,
}

impl Expression {
    pub fn new(kind: ExprKind, token: Token) -> Self {
        Self { kind, token }
    }

    /// Direct child expressions, in source order.
    pub fn children(&self) -> Vec<&Expression> {
        match &self.kind {
            ExprKind::Integer(_)
            | ExprKind::Float(_)
            | ExprKind::String(_)
            | ExprKind::Bool(_)
            | ExprKind::Name(_) => Vec::new(),
            ExprKind::List(items) | ExprKind::Tuple(items) => items.iter().collect(),
            ExprKind::Dict(pairs) => pairs.iter().flat_map(|p| [&p.key, &p.value]).collect(),
            ExprKind::GetAttr { node, .. } => vec![&**node],
            ExprKind::GetItem { node, arg } => vec![&**node, &**arg],
            ExprKind::GetItemRange { node, start, stop } => std::iter::once(&**node)
                .chain(start.as_deref())
                .chain(stop.as_deref())
                .collect(),
            ExprKind::Call { func, args, kwargs } => std::iter::once(&**func)
                .chain(args.iter())
                .chain(kwargs.iter().map(|(_, v)| v))
                .collect(),
            ExprKind::Binary { left, right, .. } => vec![&**left, &**right],
            ExprKind::Negation(term) | ExprKind::VarArgs(term) | ExprKind::KwArgs(term) => {
                vec![&**term]
            }
            ExprKind::Unary { term, .. } => vec![&**term],
            ExprKind::Test { expr, test } => std::iter::once(&**expr)
                .chain(test.arg.as_deref())
                .collect(),
            ExprKind::Filtered { expr, filter } => std::iter::once(&**expr)
                .chain(filter.args.iter())
                .chain(filter.kwargs.iter().map(|(_, v)| v))
                .collect(),
            ExprKind::InlineIf {
                condition,
                true_expr,
                false_expr,
            } => vec![&**true_expr, &**condition]
                .into_iter()
                .chain(false_expr.as_deref())
                .collect(),
        }
    }

    /// True if a `Name` node with the given identifier occurs anywhere in the tree.
    pub fn references(&self, name: &str) -> bool {
        match &self.kind {
            ExprKind::Name(n) => n == name,
            _ => self.children().into_iter().any(|c| c.references(name)),
        }
    }
}

/// Expression variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Integer literal: `42`
    Integer(i64),

    /// Float literal: `2.5`, `1e3`
    Float(f64),

    /// String literal with escapes resolved: `'hello'`
    String(String),

    /// Boolean literal: `true`, `False`
    Bool(bool),

    /// Variable reference: `user`
    Name(String),

    /// List literal: `[1, 2, 3]`
    List(Vec<Expression>),

    /// Tuple literal: `(1, 2)`, `(1,)`, `()`
    Tuple(Vec<Expression>),

    /// Dict literal: `{'a': 1}`. Pairs keep source order, duplicates included.
    Dict(Vec<Pair>),

    /// Attribute or positional access: `user.name`, `pair.0`
    GetAttr { node: Box<Expression>, attr: Attr },

    /// Subscript: `items[0]`
    GetItem {
        node: Box<Expression>,
        arg: Box<Expression>,
    },

    /// Half-open slice: `items[1:3]`, `items[:3]`, `items[1:]`, `items[:]`
    GetItemRange {
        node: Box<Expression>,
        start: Option<Box<Expression>>,
        stop: Option<Box<Expression>>,
    },

    /// Call: `f(x, y=2)`. Keyword names are unique.
    Call {
        func: Box<Expression>,
        args: Vec<Expression>,
        kwargs: Vec<(String, Expression)>,
    },

    /// Logical, comparison, membership and math operations.
    Binary {
        left: Box<Expression>,
        op: BinaryOp,
        right: Box<Expression>,
    },

    /// Logical negation: `not x`, also `a not in b` and `x is not test`.
    Negation(Box<Expression>),

    /// Sign prefix: `-x`, `+x`
    Unary { op: UnaryOp, term: Box<Expression> },

    /// Test suffix: `x is divisibleby 3`
    Test {
        expr: Box<Expression>,
        test: TestCall,
    },

    /// Filter suffix: `name | upper`, `items | join(', ')`
    Filtered {
        expr: Box<Expression>,
        filter: FilterCall,
    },

    /// Inline conditional: `a if cond else b`
    InlineIf {
        condition: Box<Expression>,
        true_expr: Box<Expression>,
        false_expr: Option<Box<Expression>>,
    },

    /// Positional spread marker: `*args`
    VarArgs(Box<Expression>),

    /// Keyword spread marker: `**options`
    KwArgs(Box<Expression>),
}

/// Attribute selector of a `GetAttr` node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attr {
    Name(String),
    Index(usize),
}

/// One `key: value` entry of a dict literal.
#[derive(Debug, Clone, PartialEq)]
pub struct Pair {
    pub key: Expression,
    pub value: Expression,
}

/// The test part of `expr is [not] name [arg]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCall {
    pub name: String,
    pub arg: Option<Box<Expression>>,
}

/// The filter part of `expr | name(args...)`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCall {
    pub name: String,
    pub args: Vec<Expression>,
    pub kwargs: Vec<(String, Expression)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Gt,
    Gteq,
    Lt,
    Lteq,
    In,
    Add,
    Sub,
    Concat,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl BinaryOp {
    /// Source spelling of the operator.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Or => "or",
            Self::And => "and",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Gteq => ">=",
            Self::Lt => "<",
            Self::Lteq => "<=",
            Self::In => "in",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Concat => "~",
            Self::Mul => "*",
            Self::Div => "/",
            Self::FloorDiv => "//",
            Self::Mod => "%",
            Self::Pow => "**",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
}
