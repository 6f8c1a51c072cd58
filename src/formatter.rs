//! Source reconstruction from the tree.
//!
//! Two layouts:
//! - **compact**: no optional whitespace, dicts on one line
//! - **pretty**: spaces around operators, dicts one member per line with
//!   indentation (2 spaces unless [`FormatOptions`] says otherwise)
//!
//! Statements are separated by a blank line, which is what ends argument
//! lists and payloads, so formatted output always parses back to the same
//! tree and formatting it again is a no-op.
//!
//! # Examples
//!
//! ```
//! use esq_lang::formatter::format_source;
//!
//! let formatted = format_source("get my-index/_search size=1+2\n{'query':{}}", true).unwrap();
//! assert_eq!(
//!     formatted,
//!     "GET my-index/_search size=1 + 2\n{\n  'query': {}\n}"
//! );
//! ```

use crate::{
    ast::{
        Array, BinOp, BinaryOperator, CallForm, Dict, EsApiCall, Expr, ForIn, FuncCall, Group,
        KeyValue, Let, Payload, ShellOut, Stmt, Token, UnaryOp, Visitor,
    },
    parser::{SyntaxError, parse},
};

/// Layout settings of a [`Formatter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    pub pretty: bool,
    /// Spaces per nesting level in pretty layout
    pub indent: usize,
}

impl Default for FormatOptions {
    fn default() -> Self {
        FormatOptions {
            pretty: false,
            indent: 2,
        }
    }
}

impl FormatOptions {
    pub fn pretty() -> Self {
        FormatOptions {
            pretty: true,
            ..FormatOptions::default()
        }
    }
}

/// Parses and reformats a whole program.
pub fn format_source(source: &str, pretty: bool) -> Result<String, SyntaxError> {
    Ok(format_program(&parse(source)?, pretty))
}

pub fn format_program(statements: &[Stmt], pretty: bool) -> String {
    format_program_with(
        statements,
        FormatOptions {
            pretty,
            ..FormatOptions::default()
        },
    )
}

pub fn format_program_with(statements: &[Stmt], options: FormatOptions) -> String {
    let mut formatter = Formatter::with_options(options);
    statements
        .iter()
        .map(|stmt| stmt.accept(&mut formatter))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn format_expr(expr: &Expr, pretty: bool) -> String {
    expr.accept(&mut Formatter::new(pretty))
}

pub struct Formatter {
    pretty: bool,
    indent: usize,
    level: usize,
}

impl Formatter {
    pub fn new(pretty: bool) -> Self {
        Formatter::with_options(FormatOptions {
            pretty,
            ..FormatOptions::default()
        })
    }

    pub fn with_options(options: FormatOptions) -> Self {
        Formatter {
            pretty: options.pretty,
            indent: options.indent,
            level: 0,
        }
    }

    fn indent(&self, level: usize) -> String {
        " ".repeat(self.indent * level)
    }

    fn space(&self) -> &'static str {
        if self.pretty { " " } else { "" }
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.level += 1;
        let result = f(self);
        self.level -= 1;
        result
    }

    /// `name=value` pairs of options and keyword arguments.
    fn assignment(&mut self, pair: &KeyValue) -> String {
        format!("{}={}", pair.key.accept(self), pair.value.accept(self))
    }

    fn call_statement(&mut self, node: &FuncCall) -> String {
        let mut parts = vec![node.callee.accept(self)];
        parts.extend(node.symbols.iter().map(|symbol| symbol.text.clone()));
        for arg in &node.args {
            let text = arg.accept(self);
            // A leading sign after another argument would lex as a binary operator
            if parts.len() > 1 && text.starts_with(['-', '+']) {
                parts.push(format!("({text})"));
            } else {
                parts.push(text);
            }
        }
        for kwarg in &node.kwargs {
            parts.push(self.assignment(kwarg));
        }
        parts.join(" ")
    }

    fn call_expression(&mut self, node: &FuncCall) -> String {
        let callee = node.callee.accept(self);
        let mut parts: Vec<String> = node.symbols.iter().map(|symbol| symbol.text.clone()).collect();
        for arg in &node.args {
            parts.push(arg.accept(self));
        }
        for kwarg in &node.kwargs {
            parts.push(self.assignment(kwarg));
        }
        let separator = if self.pretty { ", " } else { "," };
        format!("{callee}({})", parts.join(separator))
    }
}

impl Visitor for Formatter {
    type Output = String;

    fn visit_name(&mut self, token: &Token) -> String {
        token.text.clone()
    }

    fn visit_text(&mut self, token: &Token) -> String {
        token.text.clone()
    }

    fn visit_symbol(&mut self, token: &Token) -> String {
        token.text.clone()
    }

    fn visit_string(&mut self, token: &Token) -> String {
        token.text.clone()
    }

    fn visit_number(&mut self, token: &Token) -> String {
        token.text.clone()
    }

    fn visit_key_value(&mut self, node: &KeyValue) -> String {
        let key = node.key.accept(self);
        let value = node.value.accept(self);
        format!("{key}:{}{value}", self.space())
    }

    fn visit_dict(&mut self, node: &Dict) -> String {
        if node.entries.is_empty() {
            return "{}".to_string();
        }

        if self.pretty {
            let entries: Vec<String> = self.nested(|f| {
                node.entries
                    .iter()
                    .map(|entry| format!("{}{}", f.indent(f.level), entry.accept(f)))
                    .collect()
            });
            format!("{{\n{}\n{}}}", entries.join(",\n"), self.indent(self.level))
        } else {
            let entries: Vec<String> = node.entries.iter().map(|entry| entry.accept(self)).collect();
            format!("{{{}}}", entries.join(","))
        }
    }

    fn visit_array(&mut self, node: &Array) -> String {
        let elements: Vec<String> = node
            .elements
            .iter()
            .map(|element| element.accept(self))
            .collect();
        let separator = if self.pretty { ", " } else { "," };
        format!("[{}]", elements.join(separator))
    }

    fn visit_bin_op(&mut self, node: &BinOp) -> String {
        let left = node.left.accept(self);
        let right = node.right.accept(self);
        if node.op == BinaryOperator::Dot {
            format!("{left}.{right}")
        } else {
            let space = self.space();
            format!("{left}{space}{}{space}{right}", node.op.symbol())
        }
    }

    fn visit_unary_op(&mut self, node: &UnaryOp) -> String {
        format!("{}{}", node.op.symbol(), node.operand.accept(self))
    }

    fn visit_group(&mut self, node: &Group) -> String {
        format!("({})", node.inner.accept(self))
    }

    fn visit_func_call(&mut self, node: &FuncCall) -> String {
        match node.form {
            CallForm::Statement => self.call_statement(node),
            CallForm::Expression => self.call_expression(node),
        }
    }

    fn visit_es_api_call(&mut self, node: &EsApiCall) -> String {
        let mut head = vec![node.method.text.to_uppercase(), node.path.accept(self)];
        for option in &node.options {
            head.push(self.assignment(option));
        }

        let mut lines = vec![head.join(" ")];
        match &node.payload {
            Payload::Inline(dicts) => {
                for dict in dicts {
                    lines.push(format!("{}{}", self.indent(self.level), dict.accept(self)));
                }
            }
            Payload::File { marker, path } => {
                lines.push(format!("{}{}{}", self.indent(self.level), marker.text, path.text));
            }
        }
        lines.join("\n")
    }

    fn visit_let(&mut self, node: &Let) -> String {
        let space = self.space();
        let assignments: Vec<String> = node
            .assignments
            .iter()
            .map(|pair| {
                let target = pair.key.accept(self);
                let value = pair.value.accept(self);
                format!("{target}{space}={space}{value}")
            })
            .collect();
        format!("let {}", assignments.join(" "))
    }

    fn visit_for_in(&mut self, node: &ForIn) -> String {
        let iterable = node.iterable.accept(self);
        let head = format!("for {} in {iterable} {{", node.variable.text);
        if node.body.is_empty() {
            return format!("{head}}}");
        }

        let body: Vec<String> = self.nested(|f| {
            node.body
                .iter()
                .map(|stmt| format!("{}{}", f.indent(f.level), stmt.accept(f)))
                .collect()
        });
        format!("{head}\n{}\n{}}}", body.join("\n\n"), self.indent(self.level))
    }

    fn visit_shell_out(&mut self, node: &ShellOut) -> String {
        format!("!{}", node.command_text())
    }
}
