//! Double dispatch over the closed node set.
//!
//! Every algorithm over the tree (formatting, dumping, evaluation) implements
//! [`Visitor`]. The trait has no default methods, so adding a node variant is a
//! compile error in every visitor until it is handled.

use crate::ast::{
    Array, BinOp, Dict, EsApiCall, Expr, ForIn, FuncCall, Group, KeyValue, Let, ShellOut, Stmt,
    Token, UnaryOp,
};

pub trait Visitor {
    type Output;

    fn visit_name(&mut self, token: &Token) -> Self::Output;
    fn visit_text(&mut self, token: &Token) -> Self::Output;
    fn visit_symbol(&mut self, token: &Token) -> Self::Output;
    fn visit_string(&mut self, token: &Token) -> Self::Output;
    fn visit_number(&mut self, token: &Token) -> Self::Output;
    fn visit_key_value(&mut self, node: &KeyValue) -> Self::Output;
    fn visit_dict(&mut self, node: &Dict) -> Self::Output;
    fn visit_array(&mut self, node: &Array) -> Self::Output;
    fn visit_bin_op(&mut self, node: &BinOp) -> Self::Output;
    fn visit_unary_op(&mut self, node: &UnaryOp) -> Self::Output;
    fn visit_group(&mut self, node: &Group) -> Self::Output;
    fn visit_func_call(&mut self, node: &FuncCall) -> Self::Output;
    fn visit_es_api_call(&mut self, node: &EsApiCall) -> Self::Output;
    fn visit_let(&mut self, node: &Let) -> Self::Output;
    fn visit_for_in(&mut self, node: &ForIn) -> Self::Output;
    fn visit_shell_out(&mut self, node: &ShellOut) -> Self::Output;
}

impl Expr {
    pub fn accept<V: Visitor>(&self, visitor: &mut V) -> V::Output {
        match self {
            Expr::Name(token) => visitor.visit_name(token),
            Expr::Text(token) => visitor.visit_text(token),
            Expr::Symbol(token) => visitor.visit_symbol(token),
            Expr::String(token) => visitor.visit_string(token),
            Expr::Number(token) => visitor.visit_number(token),
            Expr::Dict(node) => visitor.visit_dict(node),
            Expr::Array(node) => visitor.visit_array(node),
            Expr::BinOp(node) => visitor.visit_bin_op(node),
            Expr::UnaryOp(node) => visitor.visit_unary_op(node),
            Expr::Group(node) => visitor.visit_group(node),
            Expr::FuncCall(node) => visitor.visit_func_call(node),
        }
    }
}

impl Stmt {
    pub fn accept<V: Visitor>(&self, visitor: &mut V) -> V::Output {
        match self {
            Stmt::FuncCall(node) => visitor.visit_func_call(node),
            Stmt::EsApiCall(node) => visitor.visit_es_api_call(node),
            Stmt::Let(node) => visitor.visit_let(node),
            Stmt::ForIn(node) => visitor.visit_for_in(node),
            Stmt::ShellOut(node) => visitor.visit_shell_out(node),
        }
    }
}

impl KeyValue {
    pub fn accept<V: Visitor>(&self, visitor: &mut V) -> V::Output {
        visitor.visit_key_value(self)
    }
}

impl Dict {
    pub fn accept<V: Visitor>(&self, visitor: &mut V) -> V::Output {
        visitor.visit_dict(self)
    }
}
