use crate::ast::{Dict, Expr, FuncCall, KeyValue, Span, Token};

/// Top-level or loop-body statement.
///
/// Statements are line oriented: argument lists, option lists and payloads
/// end at a blank line or at the brace closing an enclosing `for` body.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Function call statement
    ///
    /// # Example
    /// ```text
    /// echo @pretty 1 + 2 name="x"
    /// ```
    FuncCall(FuncCall),

    /// API call
    ///
    /// # Example
    /// ```text
    /// GET /my-index/_search size=10
    /// {"query": {"match_all": {}}}
    /// ```
    EsApiCall(EsApiCall),

    /// Variable binding, possibly into a nested structure
    ///
    /// # Example
    /// ```text
    /// let foo.@a.1 = 42
    /// ```
    Let(Let),

    /// Loop over a list, a dict's keys or a string's characters
    ///
    /// # Example
    /// ```text
    /// for i in range(3) {
    ///   GET ("/index-" + i)
    /// }
    /// ```
    ForIn(ForIn),

    /// Shell-out
    ///
    /// # Example
    /// ```text
    /// !ls -l
    /// ```
    ShellOut(ShellOut),
}

/// Payload of an API call.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Zero or more dict literals; each one is an NDJSON line.
    Inline(Vec<Dict>),
    /// `@path/to/file`, sent verbatim
    File { marker: Token, path: Token },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EsApiCall {
    pub method: Token,
    /// `Expr::Text` for a literal path, or the parenthesized path expression
    pub path: Box<Expr>,
    pub options: Vec<KeyValue>,
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Let {
    pub keyword: Token,
    /// `target = value` pairs; keys are assignment targets
    pub assignments: Vec<KeyValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForIn {
    pub keyword: Token,
    pub variable: Token,
    pub iterable: Box<Expr>,
    pub body: Vec<Stmt>,
    pub close: Token,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShellOut {
    pub marker: Token,
    pub command: Option<Token>,
}

impl ShellOut {
    pub fn command_text(&self) -> &str {
        self.command.as_ref().map_or("", |token| token.text.as_str())
    }
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::FuncCall(call) => call.span(),
            Stmt::EsApiCall(call) => {
                let mut span = Span::of_tokens(&call.method, &call.method).to(call.path.span());
                for option in &call.options {
                    span = span.to(option.span());
                }
                match &call.payload {
                    Payload::Inline(dicts) => {
                        if let Some(last) = dicts.last() {
                            span = span.to(Span::of_tokens(&last.open, &last.close));
                        }
                    }
                    Payload::File { path, .. } => {
                        span = span.to(Span::of_tokens(path, path));
                    }
                }
                span
            }
            Stmt::Let(stmt) => stmt
                .assignments
                .iter()
                .fold(Span::of_tokens(&stmt.keyword, &stmt.keyword), |span, pair| {
                    span.to(pair.span())
                }),
            Stmt::ForIn(stmt) => Span::of_tokens(&stmt.keyword, &stmt.close),
            Stmt::ShellOut(stmt) => match &stmt.command {
                Some(command) => Span::of_tokens(&stmt.marker, command),
                None => Span::of_tokens(&stmt.marker, &stmt.marker),
            },
        }
    }
}
