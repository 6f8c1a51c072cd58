use crate::ast::{BinaryOperator, Token, UnaryOperator};

/// Byte range of a node in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn of_tokens(first: &Token, last: &Token) -> Self {
        Span {
            start: first.offset,
            end: last.end().max(first.end()),
        }
    }

    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Expression node.
///
/// Every node exclusively owns its children; the tree never shares nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // Leaves
    /// Variable or function name, or one of `true`, `false`, `null`
    ///
    /// # Example
    /// ```text
    /// foo
    /// ```
    Name(Token),

    /// Literal text: an API path, a shell command, or the member name on the
    /// right of a dot (`b` in `a.b`), which is never looked up as a variable.
    Text(Token),

    /// Symbol
    ///
    /// # Example
    /// ```text
    /// @pretty
    /// ```
    Symbol(Token),

    /// String literal or object key, in any of the four quote flavors
    String(Token),

    /// Numeric literal: decimal, float, hex, octal or binary
    Number(Token),

    // Composites
    /// Dict literal
    ///
    /// # Example
    /// ```text
    /// {"size": 10, 3 + 5: "eight"}
    /// ```
    Dict(Dict),

    /// Array literal
    ///
    /// # Example
    /// ```text
    /// [1, "two", @three]
    /// ```
    Array(Array),

    /// Binary operation, including dot access
    BinOp(BinOp),

    /// Prefix `+`/`-`
    UnaryOp(UnaryOp),

    /// Parenthesized expression
    Group(Group),

    /// Call expression
    ///
    /// # Example
    /// ```text
    /// range(0, 10, step=2)
    /// ```
    FuncCall(FuncCall),
}

/// `key: value` inside a dict, or `name=value` for options, keyword
/// arguments and `let` assignments.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValue {
    pub key: Expr,
    /// The `:` or `=` separating key and value
    pub separator: Token,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dict {
    pub open: Token,
    pub entries: Vec<KeyValue>,
    pub close: Token,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    pub open: Token,
    pub elements: Vec<Expr>,
    pub close: Token,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinOp {
    pub op: BinaryOperator,
    pub token: Token,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryOp {
    pub op: UnaryOperator,
    pub token: Token,
    pub operand: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub open: Token,
    pub inner: Box<Expr>,
    pub close: Token,
}

/// Whether a call was written as a statement (`f 1 2`) or an expression
/// (`f(1, 2)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallForm {
    Statement,
    Expression,
}

/// Function call in either form.
///
/// Arguments are kept by category: bare symbols, positional expressions and
/// keyword pairs, each in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncCall {
    pub callee: Box<Expr>,
    pub symbols: Vec<Token>,
    pub args: Vec<Expr>,
    pub kwargs: Vec<KeyValue>,
    pub form: CallForm,
    /// Closing parenthesis of the expression form
    pub close: Option<Token>,
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Name(token)
            | Expr::Text(token)
            | Expr::Symbol(token)
            | Expr::String(token)
            | Expr::Number(token) => Span::of_tokens(token, token),
            Expr::Dict(dict) => Span::of_tokens(&dict.open, &dict.close),
            Expr::Array(array) => Span::of_tokens(&array.open, &array.close),
            Expr::BinOp(binop) => binop.left.span().to(binop.right.span()),
            Expr::UnaryOp(unary) => {
                Span::of_tokens(&unary.token, &unary.token).to(unary.operand.span())
            }
            Expr::Group(group) => Span::of_tokens(&group.open, &group.close),
            Expr::FuncCall(call) => call.span(),
        }
    }
}

impl KeyValue {
    pub fn span(&self) -> Span {
        self.key.span().to(self.value.span())
    }
}

impl FuncCall {
    pub fn span(&self) -> Span {
        let mut span = self.callee.span();
        for symbol in &self.symbols {
            span = span.to(Span::of_tokens(symbol, symbol));
        }
        for arg in &self.args {
            span = span.to(arg.span());
        }
        for kwarg in &self.kwargs {
            span = span.to(kwarg.span());
        }
        if let Some(close) = &self.close {
            span = span.to(Span::of_tokens(close, close));
        }
        span
    }
}
