//! # Console Query Language - Abstract Syntax Tree
//!
//! This module defines the tokens and the tree produced by the parser for the
//! console language: a line-oriented notation for HTTP-style requests against
//! a document database, mixed with variables, loops and function calls.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the tokenizer
//! - **[expressions]** - Expression nodes (names, literals, dicts, operations, calls)
//! - **[statements]** - Statement nodes (API calls, `let`, `for`, calls, shell-outs)
//! - **[operators]** - Operator symbols and the precedence table
//! - **[visitor]** - The [`Visitor`] trait every tree algorithm implements
//!
//! ## Quick Start
//!
//! ```text
//! let index = "logs"
//!
//! GET ("/" + index + "/_search") size=5
//! {"query": {"match_all": {}}}
//! ```
//!
//! ## Core Concepts
//!
//! ### Statements are line oriented
//!
//! Function-call arguments, `let` assignments, API options and API payloads
//! end at a blank line (or at the `}` closing a `for` body). Binary operators
//! never continue across a line break.
//!
//! ### Precedence
//!
//! | Operator | Precedence |
//! |----------|-----------|
//! | `.`      | 300 |
//! | `* / %`  | 200 |
//! | `+ -`    | 100 |
//!
//! Equal-precedence chains group left to right: `a - b - c` is `(a - b) - c`.
//!
//! ### Dot access
//!
//! The right side of `.` is a literal member name, a symbol, an index or a
//! call: `foo.bar`, `foo.@bar`, `foo.1`, `foo.bar(1)`.
//!
//! ## Examples
//!
//! ### Bulk payload (one NDJSON line per dict)
//!
//! ```text
//! PUT _bulk
//! {"index": {"_index": "test", "_id": "1"}}
//! {"field1": "value1"}
//! ```
//!
//! ### Assignment into nested structures
//!
//! ```text
//! let foo = {"a": [3, 4, 5]}
//!
//! let foo.@a.1 = 42
//! ```
pub mod tokens;
pub mod expressions;
pub mod operators;
pub mod statements;
pub mod visitor;

pub use tokens::{Quote, Token, TokenKind};
pub use expressions::{Array, BinOp, CallForm, Dict, Expr, FuncCall, Group, KeyValue, Span, UnaryOp};
pub use operators::{BinaryOperator, UnaryOperator};
pub use statements::{EsApiCall, ForIn, Let, Payload, ShellOut, Stmt};
pub use visitor::Visitor;
