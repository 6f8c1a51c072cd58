use thiserror::Error;
use tracing::debug;

use crate::{
    ast::{
        operators::{LOWEST_PRECEDENCE, UNARY_OPERAND_PRECEDENCE},
        Array, BinOp, BinaryOperator, CallForm, Dict, EsApiCall, Expr, ForIn, FuncCall, Group,
        KeyValue, Let, Payload, ShellOut, Stmt, Token, TokenKind, UnaryOp, UnaryOperator,
    },
    lexer::{self, states::State, Tokenizer},
    normalizer::normalize,
};

/// Parses a whole program. All or nothing: the first malformed token aborts.
pub fn parse(source: &str) -> Result<Vec<Stmt>, SyntaxError> {
    Parser::new(source).parse_program()
}

/// Parses a bare sequence of dict literals, such as a bulk payload file.
pub fn parse_payload(source: &str) -> Result<Vec<Dict>, SyntaxError> {
    Parser::with_options(
        source,
        ParseOptions {
            payload_only: true,
            ..ParseOptions::default()
        },
    )
    .parse_payload()
}

/// Malformed input, located by line and column.
///
/// Rendered as:
///
/// ```text
/// Syntax error at Line 1, Column 4:
/// get
///    ^
/// Expected HTTP path, found end of input
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{title} at Line {line}, Column {column}:\n{context}\n{marker}\n{message}")]
pub struct SyntaxError {
    pub title: String,
    pub token: Token,
    pub message: String,
    /// 1-based
    pub line: usize,
    /// 1-based, in characters
    pub column: usize,
    /// The source line containing the token
    pub context: String,
    /// Spaces followed by one caret per character of the token
    pub marker: String,
}

impl SyntaxError {
    pub fn new(source: &str, token: &Token, message: impl Into<String>) -> Self {
        let mut offset = token.offset.min(source.len());
        while !source.is_char_boundary(offset) {
            offset -= 1;
        }

        let before = &source[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |index| index + 1);
        let line_end = source[offset..]
            .find('\n')
            .map_or(source.len(), |index| offset + index);
        let column = source[line_start..offset].chars().count() + 1;
        let context = source[line_start..line_end].trim_end_matches('\r').to_string();

        let width = token
            .text
            .lines()
            .next()
            .map_or(0, |first| first.chars().count())
            .max(1);
        let marker = format!("{}{}", " ".repeat(column - 1), "^".repeat(width));

        SyntaxError {
            title: "Syntax error".to_string(),
            token: token.clone(),
            message: message.into(),
            line,
            column,
            context,
            marker,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Parse a bare sequence of dict literals instead of statements
    pub payload_only: bool,
    /// Abort on error tokens; when off they are skipped and reported as
    /// [`ParseEvent::SkippedError`]
    pub fail_fast: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            payload_only: false,
            fail_fast: true,
        }
    }
}

/// Grammar positions reported through [`ParseEvent::Enter`] and
/// [`ParseEvent::Leave`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Production {
    Statement,
    Method,
    Url,
    OptionName,
    OptionValue,
    Payload,
    DictKey,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseEvent<'t> {
    Consumed(&'t Token),
    Enter(Production),
    Leave(Production),
    SkippedError(&'t Token),
}

/// Receives structural events while parsing, e.g. to find the grammar
/// position under a cursor.
pub trait ParseListener {
    fn on_event(&mut self, event: &ParseEvent<'_>);
}

impl<F> ParseListener for F
where
    F: FnMut(&ParseEvent<'_>),
{
    fn on_event(&mut self, event: &ParseEvent<'_>) {
        self(event)
    }
}

pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    position: usize,
    previous: Option<usize>,
    options: ParseOptions,
    listeners: Vec<Box<dyn ParseListener + 'a>>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Parser::with_options(source, ParseOptions::default())
    }

    pub fn with_options(source: &'a str, options: ParseOptions) -> Self {
        let tokenizer = if options.payload_only {
            Tokenizer::with_state(source, State::PayloadOnly)
        } else {
            lexer::tokenize(source)
        };
        let mut tokens = normalize(tokenizer);
        if tokens.last().is_none_or(|token| token.kind != TokenKind::Eoi) {
            tokens.push(Token::new(source.trim_end().len(), TokenKind::Eoi, ""));
        }

        Parser {
            source,
            tokens,
            position: 0,
            previous: None,
            options,
            listeners: Vec::new(),
        }
    }

    pub fn add_listener(&mut self, listener: impl ParseListener + 'a) {
        self.listeners.push(Box::new(listener));
    }

    pub fn parse_program(&mut self) -> Result<Vec<Stmt>, SyntaxError> {
        self.skip_errors();
        let statements = self.parse_statements(false)?;
        debug!(statements = statements.len(), "parsed program");
        Ok(statements)
    }

    pub fn parse_payload(&mut self) -> Result<Vec<Dict>, SyntaxError> {
        self.skip_errors();
        let mut dicts = vec![];
        loop {
            self.skip_blank_lines();
            match self.current().kind {
                TokenKind::Eoi => return Ok(dicts),
                TokenKind::DictOpen => dicts.push(self.parse_dict()?),
                _ => return Err(self.expected("'{'")),
            }
        }
    }

    // ------------------------------------------------------------------
    // Cursor

    fn current(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn peek_kind(&self, distance: usize) -> TokenKind {
        let index = (self.position + distance).min(self.tokens.len() - 1);
        self.tokens[index].kind
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.position].clone();
        let event = ParseEvent::Consumed(&self.tokens[self.position]);
        for listener in &mut self.listeners {
            listener.on_event(&event);
        }
        self.previous = Some(self.position);
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
        self.skip_errors();
        token
    }

    fn expect(&mut self, kind: TokenKind, description: &str) -> Result<Token, SyntaxError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.expected(description))
        }
    }

    /// Whether the current token starts right where the previous one ended.
    fn touches_previous(&self) -> bool {
        self.previous
            .is_some_and(|index| self.tokens[index].touches(self.current()))
    }

    fn skip_errors(&mut self) {
        if self.options.fail_fast {
            return;
        }
        while self.check(TokenKind::Error) {
            let event = ParseEvent::SkippedError(&self.tokens[self.position]);
            for listener in &mut self.listeners {
                listener.on_event(&event);
            }
            self.position += 1;
        }
    }

    fn skip_blank_lines(&mut self) {
        while self.check(TokenKind::BlankLine) {
            self.advance();
        }
    }

    fn notify(&mut self, event: ParseEvent<'_>) {
        for listener in &mut self.listeners {
            listener.on_event(&event);
        }
    }

    fn enter(&mut self, production: Production) {
        self.notify(ParseEvent::Enter(production));
    }

    fn leave(&mut self, production: Production) {
        self.notify(ParseEvent::Leave(production));
    }

    fn error_at(&self, token: &Token, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(self.source, token, message)
    }

    fn expected(&self, description: &str) -> SyntaxError {
        let token = self.current();
        if token.kind == TokenKind::Error {
            return self.error_at(token, invalid_token_message(token));
        }
        self.error_at(token, format!("Expected {description}, found {token}"))
    }

    // ------------------------------------------------------------------
    // Statements

    fn parse_statements(&mut self, in_body: bool) -> Result<Vec<Stmt>, SyntaxError> {
        let mut statements = vec![];
        loop {
            self.skip_blank_lines();
            match self.current().kind {
                TokenKind::Eoi if in_body => return Err(self.expected("'}' closing the loop body")),
                TokenKind::Eoi => return Ok(statements),
                TokenKind::DictClose if in_body => return Ok(statements),
                _ => statements.push(self.parse_statement()?),
            }
        }
    }

    fn parse_statement(&mut self) -> Result<Stmt, SyntaxError> {
        self.enter(Production::Statement);
        let statement = match self.current().kind {
            TokenKind::HttpMethod => self.parse_es_api_call()?,
            TokenKind::FuncName => self.parse_func_call_statement()?,
            TokenKind::Let => self.parse_let()?,
            TokenKind::For => self.parse_for_in()?,
            TokenKind::ShellOut => self.parse_shell_out(),
            _ => return Err(self.expected("statement")),
        };
        self.leave(Production::Statement);
        Ok(statement)
    }

    fn at_statement_boundary(&self) -> bool {
        matches!(
            self.current().kind,
            TokenKind::BlankLine
                | TokenKind::Eoi
                | TokenKind::DictClose
                | TokenKind::Let
                | TokenKind::For
                | TokenKind::HttpMethod
                | TokenKind::ShellOut
                | TokenKind::FuncName
        )
    }

    fn parse_es_api_call(&mut self) -> Result<Stmt, SyntaxError> {
        self.enter(Production::Method);
        let method = self.advance();
        self.leave(Production::Method);

        self.enter(Production::Url);
        let path = match self.current().kind {
            TokenKind::Literal => Expr::Text(self.advance()),
            TokenKind::ParenOpen => self.parse_group()?,
            _ => return Err(self.expected("HTTP path")),
        };
        self.leave(Production::Url);

        let mut options = vec![];
        while self.check(TokenKind::OptionName) {
            self.enter(Production::OptionName);
            let name = self.advance();
            self.leave(Production::OptionName);
            let separator = self.expect(TokenKind::Assign, "'='")?;
            self.enter(Production::OptionValue);
            let value = self.parse_expression()?;
            self.leave(Production::OptionValue);
            options.push(KeyValue {
                key: Expr::Text(name),
                separator,
                value,
            });
        }

        self.enter(Production::Payload);
        let payload = if self.check(TokenKind::At) {
            let marker = self.advance();
            let path = self.expect(TokenKind::Literal, "payload file path")?;
            Payload::File { marker, path }
        } else {
            let mut dicts = vec![];
            while self.check(TokenKind::DictOpen) {
                dicts.push(self.parse_dict()?);
            }
            Payload::Inline(dicts)
        };
        self.leave(Production::Payload);

        Ok(Stmt::EsApiCall(EsApiCall {
            method,
            path: Box::new(path),
            options,
            payload,
        }))
    }

    fn parse_func_call_statement(&mut self) -> Result<Stmt, SyntaxError> {
        let name = self.advance();
        let mut call = FuncCall {
            callee: Box::new(Expr::Name(name)),
            symbols: vec![],
            args: vec![],
            kwargs: vec![],
            form: CallForm::Statement,
            close: None,
        };
        while !self.at_statement_boundary() {
            self.parse_argument(&mut call)?;
        }
        Ok(Stmt::FuncCall(call))
    }

    fn parse_let(&mut self) -> Result<Stmt, SyntaxError> {
        let keyword = self.advance();
        let mut assignments = vec![];
        while !self.at_statement_boundary() {
            let target = self.parse_expression()?;
            let separator = self.expect(TokenKind::Assign, "'='")?;
            let value = self.parse_expression()?;
            assignments.push(KeyValue {
                key: target,
                separator,
                value,
            });
        }
        if assignments.is_empty() {
            return Err(self.expected("assignment"));
        }
        Ok(Stmt::Let(Let {
            keyword,
            assignments,
        }))
    }

    fn parse_for_in(&mut self) -> Result<Stmt, SyntaxError> {
        let keyword = self.advance();
        let variable = self.expect(TokenKind::Name, "loop variable")?;
        self.expect(TokenKind::In, "'in'")?;
        let iterable = self.parse_expression()?;
        self.expect(TokenKind::DictOpen, "'{'")?;
        let body = self.parse_statements(true)?;
        let close = self.expect(TokenKind::DictClose, "'}'")?;
        Ok(Stmt::ForIn(ForIn {
            keyword,
            variable,
            iterable: Box::new(iterable),
            body,
            close,
        }))
    }

    fn parse_shell_out(&mut self) -> Stmt {
        let marker = self.advance();
        let command = self
            .check(TokenKind::Literal)
            .then(|| self.advance());
        Stmt::ShellOut(ShellOut { marker, command })
    }

    // ------------------------------------------------------------------
    // Expressions

    fn parse_expression(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_binop(LOWEST_PRECEDENCE)
    }

    /// Precedence climbing: only operators binding tighter than `floor` are
    /// consumed at this level.
    fn parse_binop(&mut self, floor: i32) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_unary()?;
        while self.check(TokenKind::BinOp) {
            let Some(op) = BinaryOperator::from_symbol(&self.current().text) else {
                break;
            };
            if op.precedence() <= floor {
                break;
            }
            let token = self.advance();
            let right = self.parse_binop(op.precedence())?;
            left = binop(op, token, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        if self.check(TokenKind::UnaryOp) {
            let token = self.advance();
            let Some(op) = UnaryOperator::from_symbol(&token.text) else {
                return Err(self.error_at(&token, "Expected '+' or '-'"));
            };
            let operand = self.parse_binop(UNARY_OPERAND_PRECEDENCE)?;
            return Ok(Expr::UnaryOp(UnaryOp {
                op,
                token,
                operand: Box::new(operand),
            }));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_primary()?;
        while self.check(TokenKind::ParenOpen) && self.touches_previous() {
            expr = self.parse_call_expression(expr)?;
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        let kind = self.current().kind;
        let expr = match kind {
            TokenKind::Name | TokenKind::Bool | TokenKind::Null => Expr::Name(self.advance()),
            TokenKind::Symbol => Expr::Symbol(self.advance()),
            TokenKind::Str(_) | TokenKind::Key(_) => Expr::String(self.advance()),
            kind if kind.is_number() => Expr::Number(self.advance()),
            TokenKind::DictOpen => Expr::Dict(self.parse_dict()?),
            TokenKind::ArrayOpen => self.parse_array()?,
            TokenKind::ParenOpen => self.parse_group()?,
            _ => return Err(self.expected("expression")),
        };
        Ok(expr)
    }

    fn parse_call_expression(&mut self, callee: Expr) -> Result<Expr, SyntaxError> {
        self.advance();
        let mut call = FuncCall {
            callee: Box::new(callee),
            symbols: vec![],
            args: vec![],
            kwargs: vec![],
            form: CallForm::Expression,
            close: None,
        };
        loop {
            match self.current().kind {
                TokenKind::ParenClose => {
                    call.close = Some(self.advance());
                    return Ok(Expr::FuncCall(call));
                }
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::Eoi => return Err(self.expected("')'")),
                _ => self.parse_argument(&mut call)?,
            }
        }
    }

    /// One argument of either call form: a bare symbol, a `name=value`
    /// keyword pair or a positional expression.
    fn parse_argument(&mut self, call: &mut FuncCall) -> Result<(), SyntaxError> {
        if self.check(TokenKind::Name) && self.peek_kind(1) == TokenKind::Assign {
            let name = self.advance();
            let separator = self.advance();
            let value = self.parse_expression()?;
            call.kwargs.push(KeyValue {
                key: Expr::Text(name),
                separator,
                value,
            });
            return Ok(());
        }

        match self.parse_expression()? {
            Expr::Symbol(token) => call.symbols.push(token),
            expr => call.args.push(expr),
        }
        Ok(())
    }

    fn parse_dict(&mut self) -> Result<Dict, SyntaxError> {
        let open = self.expect(TokenKind::DictOpen, "'{'")?;
        let mut entries = vec![];
        loop {
            match self.current().kind {
                TokenKind::DictClose => break,
                TokenKind::Eoi => return Err(self.expected("'}'")),
                _ => {
                    self.enter(Production::DictKey);
                    let key = self.parse_expression()?;
                    self.leave(Production::DictKey);
                    let separator = self.expect(TokenKind::Colon, "':'")?;
                    let value = self.parse_expression()?;
                    entries.push(KeyValue {
                        key,
                        separator,
                        value,
                    });
                    self.expect_separator(TokenKind::DictClose, "'}'")?;
                }
            }
        }
        let close = self.advance();
        Ok(Dict {
            open,
            entries,
            close,
        })
    }

    fn parse_array(&mut self) -> Result<Expr, SyntaxError> {
        let open = self.advance();
        let mut elements = vec![];
        loop {
            match self.current().kind {
                TokenKind::ArrayClose => break,
                TokenKind::Eoi => return Err(self.expected("']'")),
                _ => {
                    elements.push(self.parse_expression()?);
                    self.expect_separator(TokenKind::ArrayClose, "']'")?;
                }
            }
        }
        let close = self.advance();
        Ok(Expr::Array(Array {
            open,
            elements,
            close,
        }))
    }

    /// After a container entry: one comma, which may trail, or the closer.
    fn expect_separator(&mut self, close: TokenKind, closer: &str) -> Result<(), SyntaxError> {
        match self.current().kind {
            TokenKind::Comma => {
                self.advance();
                Ok(())
            }
            kind if kind == close || kind == TokenKind::Eoi => Ok(()),
            _ => Err(self.expected(&format!("',' or {closer}"))),
        }
    }

    fn parse_group(&mut self) -> Result<Expr, SyntaxError> {
        let open = self.advance();
        let inner = self.parse_expression()?;
        let close = self.expect(TokenKind::ParenClose, "')'")?;
        Ok(Expr::Group(Group {
            open,
            inner: Box::new(inner),
            close,
        }))
    }
}

/// Builds a binary node. The right side of a dot is a literal member name
/// unless it is a call.
fn binop(op: BinaryOperator, token: Token, left: Expr, right: Expr) -> Expr {
    let right = match (op, right) {
        (BinaryOperator::Dot, Expr::Name(name)) => Expr::Text(name),
        (_, right) => right,
    };
    Expr::BinOp(BinOp {
        op,
        token,
        left: Box::new(left),
        right: Box::new(right),
    })
}

fn invalid_token_message(token: &Token) -> String {
    if token.text.is_empty() {
        "Unterminated string literal".to_string()
    } else if token.text.starts_with(['"', '\'']) {
        "Object key must be followed by ':'".to_string()
    } else {
        format!("Unexpected character {:?}", token.text)
    }
}
