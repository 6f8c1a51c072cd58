//! Indented structural dump of the tree, one node per line.
//!
//! ```text
//! FuncCall statement
//!   Name f
//!   BinOp +
//!     BinOp *
//!       Number 1
//!       Number 2
//!     Group
//!       BinOp -
//!         Number 3
//!         Number 2
//!   FuncCall expression
//!     Name g
//!     Number 3
//! ```

use crate::ast::{
    Array, BinOp, CallForm, Dict, EsApiCall, Expr, ForIn, FuncCall, Group, KeyValue, Let, Payload,
    ShellOut, Stmt, Token, UnaryOp, Visitor,
};

pub fn dump_program(statements: &[Stmt]) -> String {
    let mut dumper = TreeDumper::new();
    statements
        .iter()
        .map(|stmt| stmt.accept(&mut dumper))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn dump_expr(expr: &Expr) -> String {
    expr.accept(&mut TreeDumper::new())
}

#[derive(Default)]
pub struct TreeDumper {
    level: usize,
}

impl TreeDumper {
    pub fn new() -> Self {
        TreeDumper::default()
    }

    fn line(&self, text: &str) -> String {
        format!("{}{}", "  ".repeat(self.level), text)
    }

    /// A header line followed by the children one level deeper.
    fn node<'n, I>(&mut self, header: &str, children: I) -> String
    where
        I: IntoIterator<Item = Child<'n>>,
    {
        let mut lines = vec![self.line(header)];
        self.level += 1;
        for child in children {
            lines.push(match child {
                Child::Expr(expr) => expr.accept(self),
                Child::Stmt(stmt) => stmt.accept(self),
                Child::Pair(pair) => pair.accept(self),
                Child::Dict(dict) => dict.accept(self),
                Child::Leaf(text) => self.line(&text),
            });
        }
        self.level -= 1;
        lines.join("\n")
    }
}

enum Child<'n> {
    Expr(&'n Expr),
    Stmt(&'n Stmt),
    Pair(&'n KeyValue),
    Dict(&'n Dict),
    Leaf(String),
}

impl Visitor for TreeDumper {
    type Output = String;

    fn visit_name(&mut self, token: &Token) -> String {
        self.line(&format!("Name {}", token.text))
    }

    fn visit_text(&mut self, token: &Token) -> String {
        self.line(&format!("Text {}", token.text))
    }

    fn visit_symbol(&mut self, token: &Token) -> String {
        self.line(&format!("Symbol {}", token.text))
    }

    fn visit_string(&mut self, token: &Token) -> String {
        self.line(&format!("String {}", token.text))
    }

    fn visit_number(&mut self, token: &Token) -> String {
        self.line(&format!("Number {}", token.text))
    }

    fn visit_key_value(&mut self, node: &KeyValue) -> String {
        let header = format!("KeyValue {}", node.separator.text);
        self.node(&header, [Child::Expr(&node.key), Child::Expr(&node.value)])
    }

    fn visit_dict(&mut self, node: &Dict) -> String {
        self.node("Dict", node.entries.iter().map(Child::Pair))
    }

    fn visit_array(&mut self, node: &Array) -> String {
        self.node("Array", node.elements.iter().map(Child::Expr))
    }

    fn visit_bin_op(&mut self, node: &BinOp) -> String {
        let header = format!("BinOp {}", node.op.symbol());
        self.node(&header, [Child::Expr(&node.left), Child::Expr(&node.right)])
    }

    fn visit_unary_op(&mut self, node: &UnaryOp) -> String {
        let header = format!("UnaryOp {}", node.op.symbol());
        self.node(&header, [Child::Expr(&node.operand)])
    }

    fn visit_group(&mut self, node: &Group) -> String {
        self.node("Group", [Child::Expr(&node.inner)])
    }

    fn visit_func_call(&mut self, node: &FuncCall) -> String {
        let header = match node.form {
            CallForm::Statement => "FuncCall statement",
            CallForm::Expression => "FuncCall expression",
        };
        let children = std::iter::once(Child::Expr(&node.callee))
            .chain(
                node.symbols
                    .iter()
                    .map(|symbol| Child::Leaf(format!("Symbol {}", symbol.text))),
            )
            .chain(node.args.iter().map(Child::Expr))
            .chain(node.kwargs.iter().map(Child::Pair));
        self.node(header, children)
    }

    fn visit_es_api_call(&mut self, node: &EsApiCall) -> String {
        let header = format!("EsApiCall {}", node.method.text.to_uppercase());
        let payload = match &node.payload {
            Payload::Inline(dicts) => {
                let mut dumper = TreeDumper {
                    level: self.level + 1,
                };
                dumper.node("Payload inline", dicts.iter().map(Child::Dict))
            }
            Payload::File { path, .. } => {
                self.level += 1;
                let line = self.line(&format!("Payload file {}", path.text));
                self.level -= 1;
                line
            }
        };
        let mut dump = self.node(
            &header,
            std::iter::once(Child::Expr(&node.path)).chain(node.options.iter().map(Child::Pair)),
        );
        dump.push('\n');
        dump.push_str(&payload);
        dump
    }

    fn visit_let(&mut self, node: &Let) -> String {
        self.node("Let", node.assignments.iter().map(Child::Pair))
    }

    fn visit_for_in(&mut self, node: &ForIn) -> String {
        let header = format!("ForIn {}", node.variable.text);
        self.node(
            &header,
            std::iter::once(Child::Expr(&node.iterable)).chain(node.body.iter().map(Child::Stmt)),
        )
    }

    fn visit_shell_out(&mut self, node: &ShellOut) -> String {
        self.line(&format!("ShellOut {}", node.command_text()))
    }
}
