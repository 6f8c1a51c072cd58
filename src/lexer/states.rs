//! Rule tables of the tokenizer's state machine.
//!
//! Each state is an ordered list of anchored regex rules; the first rule that
//! matches at the cursor wins, emits its token(s) and applies its transition.
//! When no rule matches, the state's fallback transition is applied without
//! consuming input. A state without a fallback emits an error token instead.
//!
//! Whitespace is consumed by the parent wherever an optional child state may
//! be entered, so children can fall back to popping without lookahead.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{Quote, TokenKind};

/// Named lexical context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Statement heads
    Root,
    /// Statements inside a `for` body; `}` closes the body
    ForBody,
    /// Path after an HTTP method
    Path,
    /// `name=value` options on the API line
    Options,
    /// Dict payload units below an API line
    Payload,
    /// Bare sequence of dicts (payload-only parsing)
    PayloadOnly,
    Dict,
    Array,
    /// Parenthesized expression
    Group,
    /// Arguments between the parentheses of a call expression
    CallArgs,
    /// Arguments of a function-call statement
    FuncArgs,
    /// Assignments of a `let` statement
    LetArgs,
    ForName,
    ForIn,
    ForIter,
    /// Right side of a dot: a bare integer is an index step, never a float
    Member,
    /// Exactly one primary value
    Value,
    /// Operator continuation after a primary value
    Operators,
    /// Inside a string literal
    Str(Quote),
    /// Inside a quoted dict key
    Key(Quote),
}

impl State {
    pub fn is_string(self) -> bool {
        matches!(self, State::Str(_) | State::Key(_))
    }
}

pub(crate) enum Emit {
    Token(TokenKind),
    /// One token per capture group; empty groups emit nothing
    Groups(Vec<TokenKind>),
}

pub(crate) enum Next {
    Stay,
    Push(Vec<State>),
    /// Pops this many states, never the bottom one
    Pop(usize),
    /// Pops the current state, then pushes
    Replace(Vec<State>),
}

pub(crate) struct Rule {
    pub pattern: Regex,
    pub emit: Emit,
    pub next: Next,
}

pub(crate) struct StateTable {
    pub rules: Vec<Rule>,
    pub fallback: Option<Next>,
}

const IDENT: &str = r"[A-Za-z_][A-Za-z0-9_]*";
const METHODS: &str = r"(?i:get|post|put|delete|head)\b";

static TABLES: LazyLock<HashMap<State, StateTable>> = LazyLock::new(build_tables);

pub(crate) fn table(state: State) -> Option<&'static StateTable> {
    TABLES.get(&state)
}

/// Every state the tokenizer can enter.
pub fn all_states() -> Vec<State> {
    let mut states = vec![
        State::Root,
        State::ForBody,
        State::Path,
        State::Options,
        State::Payload,
        State::PayloadOnly,
        State::Dict,
        State::Array,
        State::Group,
        State::CallArgs,
        State::FuncArgs,
        State::LetArgs,
        State::ForName,
        State::ForIn,
        State::ForIter,
        State::Member,
        State::Value,
        State::Operators,
    ];
    for quote in Quote::ALL {
        states.push(State::Str(quote));
        states.push(State::Key(quote));
    }
    states
}

fn rule(pattern: &str, emit: Emit, next: Next) -> Rule {
    let anchored = format!(r"\A(?:{pattern})");
    let pattern = Regex::new(&anchored)
        .unwrap_or_else(|err| panic!("invalid lexer rule {pattern:?}: {err}"));
    Rule {
        pattern,
        emit,
        next,
    }
}

fn token(kind: TokenKind) -> Emit {
    Emit::Token(kind)
}

fn groups(kinds: &[TokenKind]) -> Emit {
    Emit::Groups(kinds.to_vec())
}

fn build_tables() -> HashMap<State, StateTable> {
    use TokenKind::*;

    let mut tables = HashMap::new();

    tables.insert(
        State::Root,
        StateTable {
            rules: root_rules(),
            fallback: None,
        },
    );

    let mut for_body = vec![rule(r"\}", token(DictClose), Next::Pop(1))];
    for_body.extend(root_rules());
    tables.insert(
        State::ForBody,
        StateTable {
            rules: for_body,
            fallback: None,
        },
    );

    tables.insert(
        State::Path,
        StateTable {
            rules: vec![
                rule(r"[ \t]+", token(Whitespace), Next::Stay),
                rule(
                    r"\(",
                    token(ParenOpen),
                    Next::Replace(vec![State::Options, State::Group]),
                ),
                rule(r"[^\s(]\S*", token(Literal), Next::Replace(vec![State::Options])),
            ],
            fallback: Some(Next::Pop(1)),
        },
    );

    tables.insert(
        State::Options,
        StateTable {
            rules: vec![
                rule(r"[ \t\r]+", token(Whitespace), Next::Stay),
                rule(r"//[^\n]*", token(Comment), Next::Stay),
                rule(r"\n[ \t\r]*\n\s*", token(BlankLine), Next::Pop(1)),
                rule(r"\n", token(Whitespace), Next::Replace(vec![State::Payload])),
                rule(
                    &format!(r"({IDENT})([ \t]*)(=)"),
                    groups(&[OptionName, Whitespace, Assign]),
                    Next::Push(vec![State::Value]),
                ),
                rule(
                    r"\{",
                    token(DictOpen),
                    Next::Replace(vec![State::Payload, State::Dict]),
                ),
                rule(r"(@)(\S+)", groups(&[At, Literal]), Next::Pop(1)),
                rule(r"\}", token(DictClose), Next::Pop(2)),
            ],
            fallback: None,
        },
    );

    tables.insert(
        State::Payload,
        StateTable {
            rules: vec![
                rule(r"[ \t\r]+", token(Whitespace), Next::Stay),
                rule(r"//[^\n]*", token(Comment), Next::Stay),
                rule(r"\n[ \t\r]*\n\s*", token(BlankLine), Next::Pop(1)),
                rule(r"\n", token(Whitespace), Next::Stay),
                rule(r"\{", token(DictOpen), Next::Push(vec![State::Dict])),
                rule(r"(@)(\S+)", groups(&[At, Literal]), Next::Pop(1)),
                rule(r"\}", token(DictClose), Next::Pop(2)),
            ],
            fallback: Some(Next::Pop(1)),
        },
    );

    tables.insert(
        State::PayloadOnly,
        StateTable {
            rules: vec![
                rule(r"\s+", token(Whitespace), Next::Stay),
                rule(r"//[^\n]*", token(Comment), Next::Stay),
                rule(r"\{", token(DictOpen), Next::Push(vec![State::Dict])),
            ],
            fallback: None,
        },
    );

    let mut dict = vec![
        rule(r"\s+", token(Whitespace), Next::Stay),
        rule(r"//[^\n]*", token(Comment), Next::Stay),
        rule(r"\}", token(DictClose), Next::Pop(1)),
        rule(r",", token(Comma), Next::Stay),
        rule(
            r"(:)(\s*)",
            groups(&[Colon, Whitespace]),
            Next::Push(vec![State::Value]),
        ),
    ];
    for quote in Quote::ALL {
        dict.push(rule(
            &regex::escape(quote.delimiter()),
            token(Key(quote)),
            Next::Push(vec![State::Operators, State::Key(quote)]),
        ));
    }
    tables.insert(
        State::Dict,
        StateTable {
            rules: dict,
            fallback: Some(Next::Push(vec![State::Value])),
        },
    );

    tables.insert(
        State::Array,
        StateTable {
            rules: vec![
                rule(r"\s+", token(Whitespace), Next::Stay),
                rule(r"//[^\n]*", token(Comment), Next::Stay),
                rule(r"\]", token(ArrayClose), Next::Pop(1)),
                rule(r",", token(Comma), Next::Stay),
            ],
            fallback: Some(Next::Push(vec![State::Value])),
        },
    );

    tables.insert(
        State::Group,
        StateTable {
            rules: vec![
                rule(r"\s+", token(Whitespace), Next::Stay),
                rule(r"//[^\n]*", token(Comment), Next::Stay),
                rule(r"\)", token(ParenClose), Next::Pop(1)),
            ],
            fallback: Some(Next::Push(vec![State::Value])),
        },
    );

    tables.insert(
        State::CallArgs,
        StateTable {
            rules: vec![
                rule(r"\s+", token(Whitespace), Next::Stay),
                rule(r"//[^\n]*", token(Comment), Next::Stay),
                rule(r"\)", token(ParenClose), Next::Pop(1)),
                rule(r",", token(Comma), Next::Stay),
                rule(
                    &format!(r"({IDENT})([ \t]*)(=)"),
                    groups(&[Name, Whitespace, Assign]),
                    Next::Push(vec![State::Value]),
                ),
            ],
            fallback: Some(Next::Push(vec![State::Value])),
        },
    );

    let mut func_args = vec![
        rule(r"[ \t\r]+", token(Whitespace), Next::Stay),
        rule(r"//[^\n]*", token(Comment), Next::Stay),
    ];
    func_args.extend(statement_boundary_rules());
    func_args.push(rule(
        &format!(r"({IDENT})([ \t]*)(=)"),
        groups(&[Name, Whitespace, Assign]),
        Next::Push(vec![State::Value]),
    ));
    tables.insert(
        State::FuncArgs,
        StateTable {
            rules: func_args,
            fallback: Some(Next::Push(vec![State::Value])),
        },
    );

    let mut let_args = vec![
        rule(r"[ \t\r]+", token(Whitespace), Next::Stay),
        rule(r"//[^\n]*", token(Comment), Next::Stay),
    ];
    let_args.extend(statement_boundary_rules());
    let_args.push(rule(r"=", token(Assign), Next::Stay));
    tables.insert(
        State::LetArgs,
        StateTable {
            rules: let_args,
            fallback: Some(Next::Push(vec![State::Value])),
        },
    );

    tables.insert(
        State::ForName,
        StateTable {
            rules: vec![
                rule(r"[ \t]+", token(Whitespace), Next::Stay),
                rule(IDENT, token(Name), Next::Replace(vec![State::ForIn])),
            ],
            fallback: Some(Next::Pop(1)),
        },
    );

    tables.insert(
        State::ForIn,
        StateTable {
            rules: vec![
                rule(r"[ \t]+", token(Whitespace), Next::Stay),
                rule(
                    r"in\b",
                    token(In),
                    Next::Replace(vec![State::ForIter, State::Value]),
                ),
            ],
            fallback: Some(Next::Pop(1)),
        },
    );

    tables.insert(
        State::ForIter,
        StateTable {
            rules: vec![
                rule(r"\s+", token(Whitespace), Next::Stay),
                rule(r"\{", token(DictOpen), Next::Replace(vec![State::ForBody])),
            ],
            fallback: Some(Next::Pop(1)),
        },
    );

    tables.insert(
        State::Member,
        StateTable {
            rules: vec![
                rule(r"[ \t]+", token(Whitespace), Next::Stay),
                rule(r"[0-9]+\b", token(Integer), Next::Replace(vec![State::Operators])),
            ],
            fallback: Some(Next::Replace(vec![State::Value])),
        },
    );

    tables.insert(
        State::Value,
        StateTable {
            rules: value_rules(),
            fallback: None,
        },
    );

    tables.insert(
        State::Operators,
        StateTable {
            rules: vec![
                rule(r"\.", token(BinOp), Next::Replace(vec![State::Member])),
                rule(r"\(", token(ParenOpen), Next::Push(vec![State::CallArgs])),
                rule(
                    r"([ \t]*)(//[^\n]*)",
                    groups(&[Whitespace, Comment]),
                    Next::Pop(1),
                ),
                rule(
                    r"([ \t]*)([-+*/%])",
                    groups(&[Whitespace, BinOp]),
                    Next::Replace(vec![State::Value]),
                ),
            ],
            fallback: Some(Next::Pop(1)),
        },
    );

    for quote in Quote::ALL {
        tables.insert(
            State::Str(quote),
            StateTable {
                rules: string_rules(quote, Str(quote)),
                fallback: None,
            },
        );
        tables.insert(
            State::Key(quote),
            StateTable {
                rules: string_rules(quote, Key(quote)),
                fallback: None,
            },
        );
    }

    tables
}

fn root_rules() -> Vec<Rule> {
    use TokenKind::*;

    vec![
        rule(r"\s+", token(Whitespace), Next::Stay),
        rule(r"//[^\n]*", token(Comment), Next::Stay),
        rule(r"(!)([^\n]*)", groups(&[ShellOut, Literal]), Next::Stay),
        rule(METHODS, token(HttpMethod), Next::Push(vec![State::Path])),
        rule(r"let\b", token(Let), Next::Push(vec![State::LetArgs])),
        rule(r"for\b", token(For), Next::Push(vec![State::ForName])),
        rule(IDENT, token(FuncName), Next::Push(vec![State::FuncArgs])),
    ]
}

/// Rules that end a `let` or function-call statement: a blank line, a
/// statement keyword at the start of a line, or the brace of a `for` body.
fn statement_boundary_rules() -> Vec<Rule> {
    use TokenKind::*;

    vec![
        rule(r"\n[ \t\r]*\n\s*", token(BlankLine), Next::Pop(1)),
        rule(
            &format!(r"(\n[ \t\r]*)({METHODS})"),
            groups(&[Whitespace, HttpMethod]),
            Next::Replace(vec![State::Path]),
        ),
        rule(
            r"(\n[ \t\r]*)(let)\b",
            groups(&[Whitespace, Let]),
            Next::Replace(vec![State::LetArgs]),
        ),
        rule(
            r"(\n[ \t\r]*)(for)\b",
            groups(&[Whitespace, For]),
            Next::Replace(vec![State::ForName]),
        ),
        rule(
            r"(\n[ \t\r]*)(!)([^\n]*)",
            groups(&[Whitespace, ShellOut, Literal]),
            Next::Pop(1),
        ),
        rule(r"\n", token(Whitespace), Next::Stay),
        rule(r"\}", token(DictClose), Next::Pop(2)),
    ]
}

fn value_rules() -> Vec<Rule> {
    use TokenKind::*;

    let after_value = || Next::Replace(vec![State::Operators]);

    let mut rules = vec![
        rule(r"[ \t]+", token(Whitespace), Next::Stay),
        rule(r"[-+]", token(UnaryOp), Next::Stay),
        rule(
            r"\{",
            token(DictOpen),
            Next::Replace(vec![State::Operators, State::Dict]),
        ),
        rule(
            r"\[",
            token(ArrayOpen),
            Next::Replace(vec![State::Operators, State::Array]),
        ),
        rule(
            r"\(",
            token(ParenOpen),
            Next::Replace(vec![State::Operators, State::Group]),
        ),
    ];
    for quote in Quote::ALL {
        rules.push(rule(
            &regex::escape(quote.delimiter()),
            token(Str(quote)),
            Next::Replace(vec![State::Operators, State::Str(quote)]),
        ));
    }
    rules.extend([
        rule(r"(?:true|false)\b", token(Bool), after_value()),
        rule(r"null\b", token(Null), after_value()),
        rule(r"0[xX][0-9a-fA-F]+", token(Hex), after_value()),
        rule(r"0[bB][01]+", token(Binary), after_value()),
        rule(
            r"[0-9]+\.[0-9]+(?:[eE][-+]?[0-9]+)?|\.[0-9]+(?:[eE][-+]?[0-9]+)?|[0-9]+[eE][-+]?[0-9]+",
            token(Float),
            after_value(),
        ),
        rule(r"0[oO]?[0-7]+", token(Octal), after_value()),
        rule(r"[0-9]+", token(Integer), after_value()),
        rule(&format!("@{IDENT}"), token(Symbol), after_value()),
        rule(IDENT, token(Name), after_value()),
    ]);
    rules
}

fn string_rules(quote: Quote, kind: TokenKind) -> Vec<Rule> {
    let close = || Next::Pop(1);
    match quote {
        Quote::Double => vec![
            rule(r#"[^"\\\n]+"#, token(kind), Next::Stay),
            rule(r"\\[^\n]", token(kind), Next::Stay),
            rule(r#"""#, token(kind), close()),
        ],
        Quote::Single => vec![
            rule(r"[^'\\\n]+", token(kind), Next::Stay),
            rule(r"\\[^\n]", token(kind), Next::Stay),
            rule(r"'", token(kind), close()),
        ],
        Quote::TripleDouble => vec![
            rule(r#"[^"\\]+"#, token(kind), Next::Stay),
            rule(r"\\(?s:.)", token(kind), Next::Stay),
            rule(r#"""""#, token(kind), close()),
            rule(r#"""#, token(kind), Next::Stay),
        ],
        Quote::TripleSingle => vec![
            rule(r"[^'\\]+", token(kind), Next::Stay),
            rule(r"\\(?s:.)", token(kind), Next::Stay),
            rule(r"'''", token(kind), close()),
            rule(r"'", token(kind), Next::Stay),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_state_has_a_table() {
        for state in all_states() {
            assert!(table(state).is_some(), "missing table for {state:?}");
        }
    }
}
