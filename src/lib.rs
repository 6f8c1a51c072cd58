pub mod assign;
pub mod ast;
pub mod cli;
pub mod dump;
pub mod env;
pub mod evaluator;
pub mod formatter;
pub mod functions;
pub mod lexer;
#[cfg(feature = "cli")]
pub mod logging;
pub mod normalizer;
pub mod output;
pub mod parser;
pub mod request;
pub mod value;

pub use ast::{Expr, Stmt, Token, TokenKind, Visitor};
pub use dump::TreeDumper;
pub use env::Env;
pub use evaluator::{EvalError, Evaluator, Outcome, Vm, VmConfig, execute};
pub use formatter::{FormatOptions, Formatter, format_program, format_source};
pub use functions::{Arguments, Callable, Function, FunctionError, FunctionRegistry, Functions};
pub use lexer::{Tokenizer, tokenize};
pub use normalizer::normalize;
pub use output::{to_json, to_json_pretty};
pub use parser::{
    ParseEvent, ParseListener, ParseOptions, Parser, Production, SyntaxError, parse,
    parse_payload,
};
pub use request::{ApiRequest, ExecutorError, Method, RequestExecutor};
pub use value::Value;
