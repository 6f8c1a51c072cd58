use indexmap::IndexMap;
use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    assign::{assign_at_path, resolve_index, resolve_target},
    ast::{
        Array, BinOp, BinaryOperator, Dict, EsApiCall, Expr, ForIn, FuncCall, Group, KeyValue,
        Let, Payload, ShellOut, Span, Stmt, Token, TokenKind, UnaryOp, UnaryOperator, Visitor,
    },
    env::Env,
    formatter::format_expr,
    functions::{Arguments, Callable, FunctionRegistry},
    output::to_json,
    parser::{SyntaxError, parse},
    request::{ApiRequest, Method, RequestExecutor, check_balanced, normalize_path},
    value::Value,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("Name error: '{0}' is not defined")]
    NameError(String),
    #[error("Not callable: '{name}' is {type_name}, not a function")]
    NotCallable { name: String, type_name: &'static str },
    #[error("Invalid assignment target: {0}")]
    InvalidAssignmentTarget(String),
    #[error("Payload error: {0}")]
    PayloadStructure(String),
    #[error("Type error: {0}")]
    TypeError(String),
    #[error("Access error: {0}")]
    AccessError(String),
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Cannot read payload file '{path}': {reason}")]
    PayloadFile { path: String, reason: String },
}

/// Executes one statement.
///
/// Returns the statement's value, or `None` for `let` and `for`.
pub fn execute(
    stmt: &Stmt,
    env: &mut Env,
    functions: &dyn FunctionRegistry,
    executor: &mut dyn RequestExecutor,
) -> Result<Option<Value>, EvalError> {
    Evaluator::new(env, functions, executor).execute(stmt)
}

pub const DEFAULT_RESPONSE_VARIABLE: &str = "_";

/// Tree-walking evaluator over one environment.
pub struct Evaluator<'e> {
    env: &'e mut Env,
    functions: &'e dyn FunctionRegistry,
    executor: &'e mut dyn RequestExecutor,
    response_variable: &'e str,
}

impl<'e> Evaluator<'e> {
    pub fn new(
        env: &'e mut Env,
        functions: &'e dyn FunctionRegistry,
        executor: &'e mut dyn RequestExecutor,
    ) -> Self {
        Evaluator {
            env,
            functions,
            executor,
            response_variable: DEFAULT_RESPONSE_VARIABLE,
        }
    }

    /// Name the last response body is bound to.
    pub fn with_response_variable(mut self, name: &'e str) -> Self {
        self.response_variable = name;
        self
    }

    /// Runs one statement.
    ///
    /// `let` yields nothing. A `for` yields the results of its body
    /// statements, in execution order, as one array, or nothing when the
    /// body produced none.
    pub fn execute(&mut self, stmt: &Stmt) -> Result<Option<Value>, EvalError> {
        let value = stmt.accept(self)?;
        Ok(match (stmt, value) {
            (Stmt::Let(_), _) => None,
            (Stmt::ForIn(_), Value::Array(results)) if results.is_empty() => None,
            (_, value) => Some(value),
        })
    }

    pub fn eval_expression(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        expr.accept(self)
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        self.env
            .get(name)
            .cloned()
            .or_else(|| self.functions.resolve(name).map(Value::Function))
    }

    fn invoke(&mut self, callable: &Callable, call: &FuncCall) -> Result<Value, EvalError> {
        let mut args = Arguments::default();
        for symbol in &call.symbols {
            args.symbols.push(symbol.symbol_name().to_string());
        }
        for arg in &call.args {
            args.positional.push(arg.accept(self)?);
        }
        for kwarg in &call.kwargs {
            let value = kwarg.value.accept(self)?;
            args.keywords.insert(key_text(&kwarg.key), value);
        }

        match callable.call(args) {
            Ok(value) => Ok(value),
            Err(err) => {
                warn!(function = callable.name(), error = %err, "function call failed");
                Ok(Value::String(err.to_string()))
            }
        }
    }

    /// `receiver.name(...)`: calls a function stored in an object member.
    fn call_method(&mut self, receiver: &Value, call: &FuncCall) -> Result<Value, EvalError> {
        let name = match call.callee.as_ref() {
            Expr::Name(token) | Expr::Text(token) => token.text.clone(),
            Expr::Symbol(token) => token.symbol_name().to_string(),
            other => return Err(EvalError::TypeError(format!(
                "Cannot call {} on {}",
                format_expr(other, false),
                receiver.type_name()
            ))),
        };
        let member = match receiver {
            Value::Object(map) => map
                .get(&name)
                .cloned()
                .ok_or_else(|| EvalError::NameError(name.clone()))?,
            other => {
                return Err(EvalError::TypeError(format!(
                    "Cannot call method '{name}' on {}",
                    other.type_name()
                )));
            }
        };
        match member {
            Value::Function(callable) => self.invoke(&callable, call),
            other => Err(EvalError::NotCallable {
                name,
                type_name: other.type_name(),
            }),
        }
    }

    fn read_payload_file(&self, path: &str) -> Result<String, EvalError> {
        let content = std::fs::read_to_string(path).map_err(|err| EvalError::PayloadFile {
            path: path.to_string(),
            reason: err.to_string(),
        })?;
        check_balanced(&content).map_err(|offset| {
            EvalError::PayloadStructure(format!(
                "unbalanced brackets in '{path}' at byte {offset}"
            ))
        })?;
        Ok(content)
    }
}

impl Visitor for Evaluator<'_> {
    type Output = Result<Value, EvalError>;

    fn visit_name(&mut self, token: &Token) -> Self::Output {
        match token.kind {
            TokenKind::Bool => Ok(Value::Boolean(token.text == "true")),
            TokenKind::Null => Ok(Value::Null),
            _ => self
                .lookup(&token.text)
                .ok_or_else(|| EvalError::NameError(token.text.clone())),
        }
    }

    fn visit_text(&mut self, token: &Token) -> Self::Output {
        Ok(Value::String(token.text.clone()))
    }

    fn visit_symbol(&mut self, token: &Token) -> Self::Output {
        Ok(Value::String(token.symbol_name().to_string()))
    }

    fn visit_string(&mut self, token: &Token) -> Self::Output {
        Ok(Value::String(token.string_value().unwrap_or_default()))
    }

    fn visit_number(&mut self, token: &Token) -> Self::Output {
        parse_number(token)
    }

    fn visit_key_value(&mut self, node: &KeyValue) -> Self::Output {
        node.value.accept(self)
    }

    fn visit_dict(&mut self, node: &Dict) -> Self::Output {
        let mut map = IndexMap::new();
        for entry in &node.entries {
            let key = match &entry.key {
                Expr::String(token) => token.string_value().unwrap_or_default(),
                other => other.accept(self)?.to_canonical_string(),
            };
            let value = entry.accept(self)?;
            map.insert(key, value);
        }
        Ok(Value::Object(map))
    }

    fn visit_array(&mut self, node: &Array) -> Self::Output {
        let items = node
            .elements
            .iter()
            .map(|element| element.accept(self))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::Array(items))
    }

    fn visit_bin_op(&mut self, node: &BinOp) -> Self::Output {
        if node.op == BinaryOperator::Dot {
            let receiver = node.left.accept(self)?;
            return match node.right.as_ref() {
                Expr::FuncCall(call) => self.call_method(&receiver, call),
                Expr::Text(token) | Expr::Name(token) => {
                    apply_access(&receiver, &Value::String(token.text.clone()))
                }
                Expr::Symbol(token) => {
                    apply_access(&receiver, &Value::String(token.symbol_name().to_string()))
                }
                other => {
                    let key = other.accept(self)?;
                    apply_access(&receiver, &key)
                }
            };
        }

        let left = node.left.accept(self)?;
        let right = node.right.accept(self)?;
        apply_binop(node.op, &left, &right)
    }

    fn visit_unary_op(&mut self, node: &UnaryOp) -> Self::Output {
        let operand = node.operand.accept(self)?;
        match (node.op, operand) {
            (UnaryOperator::Plus, value @ (Value::Integer(_) | Value::Float(_))) => Ok(value),
            (UnaryOperator::Minus, Value::Integer(n)) => n
                .checked_neg()
                .map(Value::Integer)
                .ok_or_else(|| EvalError::TypeError("Integer overflow".to_string())),
            (UnaryOperator::Minus, Value::Float(n)) => Ok(Value::Float(-n)),
            (op, other) => Err(EvalError::TypeError(format!(
                "Cannot apply unary '{}' to {}",
                op.symbol(),
                other.type_name()
            ))),
        }
    }

    fn visit_group(&mut self, node: &Group) -> Self::Output {
        node.inner.accept(self)
    }

    fn visit_func_call(&mut self, node: &FuncCall) -> Self::Output {
        let (name, callee) = match node.callee.as_ref() {
            Expr::Name(token) => (
                token.text.clone(),
                self.lookup(&token.text)
                    .ok_or_else(|| EvalError::NameError(token.text.clone()))?,
            ),
            other => (format_expr(other, false), other.accept(self)?),
        };
        match callee {
            Value::Function(callable) => self.invoke(&callable, node),
            other => Err(EvalError::NotCallable {
                name,
                type_name: other.type_name(),
            }),
        }
    }

    fn visit_es_api_call(&mut self, node: &EsApiCall) -> Self::Output {
        let method: Method = node
            .method
            .text
            .parse()
            .map_err(EvalError::UnsupportedMethod)?;

        let raw_path = match node.path.as_ref() {
            Expr::Text(token) => token.text.clone(),
            other => other.accept(self)?.to_canonical_string(),
        };

        let mut options = IndexMap::new();
        for option in &node.options {
            let value = option.value.accept(self)?;
            options.insert(key_text(&option.key), value);
        }

        let payload = match &node.payload {
            Payload::Inline(dicts) if dicts.is_empty() => None,
            Payload::Inline(dicts) => {
                let lines = dicts
                    .iter()
                    .map(|dict| dict.accept(self).map(|value| to_json(&value)))
                    .collect::<Result<Vec<_>, _>>()?;
                Some(lines.join("\n"))
            }
            Payload::File { path, .. } => Some(self.read_payload_file(&path.text)?),
        };

        let request = ApiRequest {
            method,
            path: normalize_path(&raw_path),
            payload,
            options,
        };
        info!(method = %request.method, path = %request.path, "executing request");

        let body = self
            .executor
            .execute(&request)
            .map_err(|err| EvalError::Request(err.to_string()))?;
        let response = serde_json::from_str::<serde_json::Value>(&body)
            .map_or_else(|_| Value::String(body.clone()), Value::from);
        self.env.set(self.response_variable, response);
        Ok(Value::String(body))
    }

    fn visit_let(&mut self, node: &Let) -> Self::Output {
        for assignment in &node.assignments {
            let value = assignment.value.accept(self)?;
            let target = resolve_target(&assignment.key, self)?;
            if target.path.is_empty() {
                self.env.set(target.root, value);
                continue;
            }
            let root = self
                .env
                .get_mut(&target.root)
                .ok_or_else(|| EvalError::NameError(target.root.clone()))?;
            assign_at_path(root, &target.path, value, &target.text)?;
        }
        Ok(Value::Null)
    }

    fn visit_for_in(&mut self, node: &ForIn) -> Self::Output {
        let items = match node.iterable.accept(self)? {
            Value::Array(items) => items,
            Value::Object(map) => map.into_keys().map(Value::String).collect(),
            Value::String(s) => s.chars().map(|c| Value::String(c.to_string())).collect(),
            other => {
                return Err(EvalError::TypeError(format!(
                    "Cannot iterate over {}",
                    other.type_name()
                )));
            }
        };

        // The loop variable stays bound after the loop.
        let mut results = Vec::new();
        for item in items {
            self.env.set(node.variable.text.clone(), item);
            for stmt in &node.body {
                match (stmt, self.execute(stmt)?) {
                    // Nested loops contribute their results in place
                    (Stmt::ForIn(_), Some(Value::Array(inner))) => results.extend(inner),
                    (_, Some(value)) => {
                        debug!(result = %value, "loop statement result");
                        results.push(value);
                    }
                    (_, None) => {}
                }
            }
        }
        Ok(Value::Array(results))
    }

    fn visit_shell_out(&mut self, node: &ShellOut) -> Self::Output {
        Ok(Value::String(node.command_text().to_string()))
    }
}

/// Name of an option or keyword argument.
fn key_text(key: &Expr) -> String {
    match key {
        Expr::Text(token) | Expr::Name(token) => token.text.clone(),
        other => format_expr(other, false),
    }
}

fn parse_number(token: &Token) -> Result<Value, EvalError> {
    let text = token.text.as_str();
    let invalid = || EvalError::TypeError(format!("Invalid number literal '{text}'"));
    let radix = |digits: &str, radix: u32| {
        i64::from_str_radix(digits, radix)
            .map(Value::Integer)
            .map_err(|_| invalid())
    };

    match token.kind {
        TokenKind::Integer => match text.parse::<i64>() {
            Ok(n) => Ok(Value::Integer(n)),
            Err(_) => text.parse::<f64>().map(Value::Float).map_err(|_| invalid()),
        },
        TokenKind::Float => text.parse::<f64>().map(Value::Float).map_err(|_| invalid()),
        TokenKind::Hex => radix(&text[2..], 16),
        TokenKind::Binary => radix(&text[2..], 2),
        TokenKind::Octal => {
            let digits = text
                .strip_prefix("0o")
                .or_else(|| text.strip_prefix("0O"))
                .or_else(|| text.strip_prefix('0'))
                .unwrap_or(text);
            radix(digits, 8)
        }
        _ => Err(invalid()),
    }
}

fn apply_access(object: &Value, key: &Value) -> Result<Value, EvalError> {
    match (object, key) {
        (Value::Object(map), Value::String(k)) => map
            .get(k)
            .cloned()
            .ok_or_else(|| EvalError::AccessError(format!("Key '{k}' not found"))),
        (Value::Object(map), Value::Integer(n)) => map
            .get(&n.to_string())
            .cloned()
            .ok_or_else(|| EvalError::AccessError(format!("Key '{n}' not found"))),
        (Value::Array(items), Value::Integer(n)) => resolve_index(*n, items.len())
            .map(|index| items[index].clone())
            .ok_or_else(|| {
                EvalError::AccessError(format!(
                    "Array index {n} out of bounds (length: {})",
                    items.len()
                ))
            }),
        (Value::String(s), Value::Integer(n)) => {
            let chars: Vec<char> = s.chars().collect();
            resolve_index(*n, chars.len())
                .map(|index| Value::String(chars[index].to_string()))
                .ok_or_else(|| {
                    EvalError::AccessError(format!(
                        "String index {n} out of bounds (length: {})",
                        chars.len()
                    ))
                })
        }
        (Value::Array(_), Value::String(k)) => Err(EvalError::TypeError(format!(
            "Cannot use key '{k}' on array; use an integer index instead"
        ))),
        _ => Err(EvalError::TypeError(format!(
            "Cannot access {} with {} key",
            object.type_name(),
            key.type_name()
        ))),
    }
}

fn apply_binop(op: BinaryOperator, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (op, left, right) {
        (BinaryOperator::Add, Value::String(_), _) | (BinaryOperator::Add, _, Value::String(_)) => {
            Ok(Value::String(format!(
                "{}{}",
                left.to_canonical_string(),
                right.to_canonical_string()
            )))
        }
        (_, Value::Integer(a), Value::Integer(b)) => integer_op(op, *a, *b),
        (_, Value::Float(a), Value::Float(b)) => float_op(op, *a, *b),
        (_, Value::Integer(a), Value::Float(b)) => match Decimal::from_i64(*a) {
            Some(ad) => mixed_op(op, ad, *b, false),
            None => float_op(op, *a as f64, *b),
        },
        (_, Value::Float(a), Value::Integer(b)) => match Decimal::from_i64(*b) {
            Some(bd) => mixed_op(op, bd, *a, true),
            None => float_op(op, *a, *b as f64),
        },
        (_, a, b) => Err(EvalError::TypeError(format!(
            "Cannot apply '{}' to {} and {}",
            op.symbol(),
            a.type_name(),
            b.type_name()
        ))),
    }
}

fn integer_op(op: BinaryOperator, a: i64, b: i64) -> Result<Value, EvalError> {
    let overflow = || EvalError::TypeError(format!("Integer overflow in {a} {} {b}", op.symbol()));
    match op {
        BinaryOperator::Add => a.checked_add(b).map(Value::Integer).ok_or_else(overflow),
        BinaryOperator::Subtract => a.checked_sub(b).map(Value::Integer).ok_or_else(overflow),
        BinaryOperator::Multiply => a.checked_mul(b).map(Value::Integer).ok_or_else(overflow),
        BinaryOperator::Divide => {
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            // Exact quotients stay integers
            match a.checked_rem(b) {
                Some(0) => a.checked_div(b).map(Value::Integer).ok_or_else(overflow),
                _ => Ok(Value::Float(a as f64 / b as f64)),
            }
        }
        BinaryOperator::Modulo => {
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            a.checked_rem(b).map(Value::Integer).ok_or_else(overflow)
        }
        BinaryOperator::Dot => Err(EvalError::TypeError("Cannot index an integer".to_string())),
    }
}

fn float_op(op: BinaryOperator, a: f64, b: f64) -> Result<Value, EvalError> {
    match op {
        BinaryOperator::Add => Ok(Value::Float(a + b)),
        BinaryOperator::Subtract => Ok(Value::Float(a - b)),
        BinaryOperator::Multiply => Ok(Value::Float(a * b)),
        BinaryOperator::Divide | BinaryOperator::Modulo if b == 0.0 => {
            Err(EvalError::DivisionByZero)
        }
        BinaryOperator::Divide => Ok(Value::Float(a / b)),
        BinaryOperator::Modulo => Ok(Value::Float(a % b)),
        BinaryOperator::Dot => Err(EvalError::TypeError("Cannot index a float".to_string())),
    }
}

/// Integer/float arithmetic in decimal, so `0.1 + 2` is `2.1` rather than
/// `2.1000000000000001`. `swapped` means the integer was the right operand.
fn mixed_op(op: BinaryOperator, int: Decimal, float: f64, swapped: bool) -> Result<Value, EvalError> {
    let Some(fd) = Decimal::from_f64(float) else {
        let int = int.to_f64().unwrap_or(f64::NAN);
        return if swapped {
            float_op(op, float, int)
        } else {
            float_op(op, int, float)
        };
    };
    let (a, b) = if swapped { (fd, int) } else { (int, fd) };

    let result = match op {
        BinaryOperator::Add => a.checked_add(b),
        BinaryOperator::Subtract => a.checked_sub(b),
        BinaryOperator::Multiply => a.checked_mul(b),
        BinaryOperator::Divide | BinaryOperator::Modulo if b.is_zero() => {
            return Err(EvalError::DivisionByZero);
        }
        BinaryOperator::Divide => a.checked_div(b),
        BinaryOperator::Modulo => a.checked_rem(b),
        BinaryOperator::Dot => {
            return Err(EvalError::TypeError("Cannot index a number".to_string()));
        }
    };

    match result.and_then(|r| r.to_f64()) {
        Some(r) => Ok(Value::Float(r)),
        None => {
            let (a, b) = (a.to_f64().unwrap_or(f64::NAN), b.to_f64().unwrap_or(f64::NAN));
            float_op(op, a, b)
        }
    }
}

/// Settings of a [`Vm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmConfig {
    /// Variable bound to the parsed body of the last API response
    pub response_variable: String,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            response_variable: DEFAULT_RESPONSE_VARIABLE.to_string(),
        }
    }
}

/// Result of one top-level statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub span: Span,
    pub result: Result<Option<Value>, EvalError>,
}

/// A session: an environment plus the collaborators statements run against.
///
/// # Examples
///
/// ```
/// use esq_lang::{Functions, Value, Vm};
/// use esq_lang::request::{ApiRequest, ExecutorError};
///
/// let executor = |_: &ApiRequest| -> Result<String, ExecutorError> { Ok("{}".to_string()) };
/// let mut vm = Vm::new(Functions::with_builtins(), executor);
///
/// vm.run("let a = 1 + 2").unwrap();
/// assert_eq!(vm.env().get("a"), Some(&Value::Integer(3)));
/// ```
pub struct Vm {
    env: Env,
    functions: Box<dyn FunctionRegistry>,
    executor: Box<dyn RequestExecutor>,
    config: VmConfig,
}

impl Vm {
    pub fn new(
        functions: impl FunctionRegistry + 'static,
        executor: impl RequestExecutor + 'static,
    ) -> Self {
        Vm {
            env: Env::new(),
            functions: Box::new(functions),
            executor: Box::new(executor),
            config: VmConfig::default(),
        }
    }

    pub fn with_config(mut self, config: VmConfig) -> Self {
        self.config = config;
        self
    }

    /// Parses all of `source`, then executes the statements in order.
    ///
    /// A syntax error aborts before anything runs. A failing statement
    /// does not stop the ones after it; its error is its outcome.
    pub fn run(&mut self, source: &str) -> Result<Vec<Outcome>, SyntaxError> {
        let statements = parse(source)?;
        Ok(statements.iter().map(|stmt| self.execute(stmt)).collect())
    }

    pub fn execute(&mut self, stmt: &Stmt) -> Outcome {
        debug!(span = ?stmt.span(), "executing statement");
        let result = Evaluator::new(&mut self.env, self.functions.as_ref(), self.executor.as_mut())
            .with_response_variable(&self.config.response_variable)
            .execute(stmt);
        if let Err(err) = &result {
            warn!(error = %err, "statement failed");
        }
        Outcome {
            span: stmt.span(),
            result,
        }
    }

    /// Drops every binding.
    pub fn reset(&mut self) {
        self.env.clear();
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Env {
        &mut self.env
    }
}
