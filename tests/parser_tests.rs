// tests/parser_tests.rs

use esq_lang::ast::{BinaryOperator, CallForm, Expr, Payload, Stmt};
use esq_lang::dump::{dump_expr, dump_program};
use esq_lang::parser::{ParseEvent, ParseOptions, Parser, parse, parse_payload};
use pretty_assertions::assert_eq;

fn single(source: &str) -> Stmt {
    let mut statements = parse(source).expect("program parses");
    assert_eq!(statements.len(), 1, "expected one statement in {:?}", source);
    statements.remove(0)
}

fn call_args(source: &str) -> Vec<Expr> {
    match single(source) {
        Stmt::FuncCall(call) => call.args,
        other => panic!("expected a function call, got {:?}", other),
    }
}

// ============================================================================
// Precedence
// ============================================================================

#[test]
fn test_precedence_and_call_arguments() {
    let args = call_args("f 1 * 2 + (3 - 2) g(3)");
    assert_eq!(args.len(), 2);
    assert_eq!(
        dump_expr(&args[0]),
        "BinOp +\n  BinOp *\n    Number 1\n    Number 2\n  Group\n    BinOp -\n      Number 3\n      Number 2"
    );
    assert_eq!(dump_expr(&args[1]), "FuncCall expression\n  Name g\n  Number 3");
}

#[test]
fn test_left_associative_chains() {
    let test_cases = vec![
        ("f a - b - c", "BinOp -\n  BinOp -\n    Name a\n    Name b\n  Name c"),
        ("f a / b * c", "BinOp *\n  BinOp /\n    Name a\n    Name b\n  Name c"),
        ("f a.b.c", "BinOp .\n  BinOp .\n    Name a\n    Text b\n  Text c"),
    ];

    for (input, expected) in test_cases {
        let args = call_args(input);
        assert_eq!(dump_expr(&args[0]), expected, "Failed for input: {}", input);
    }
}

#[test]
fn test_unary_binds_tighter_than_multiplication() {
    let args = call_args("f -a.b * 2");
    assert_eq!(
        dump_expr(&args[0]),
        "BinOp *\n  UnaryOp -\n    BinOp .\n      Name a\n      Text b\n  Number 2"
    );
}

#[test]
fn test_dot_right_side_forms() {
    let args = call_args("f a.b a.@b a.1 a.b(1)");
    let rights: Vec<&Expr> = args
        .iter()
        .map(|arg| match arg {
            Expr::BinOp(node) => {
                assert_eq!(node.op, BinaryOperator::Dot);
                node.right.as_ref()
            }
            other => panic!("expected dot access, got {:?}", other),
        })
        .collect();
    assert!(matches!(rights[0], Expr::Text(token) if token.text == "b"));
    assert!(matches!(rights[1], Expr::Symbol(token) if token.text == "@b"));
    assert!(matches!(rights[2], Expr::Number(token) if token.text == "1"));
    assert!(matches!(rights[3], Expr::FuncCall(call) if call.form == CallForm::Expression));
}

#[test]
fn test_call_requires_touching_paren() {
    let touching = call_args("f g(1)");
    assert_eq!(touching.len(), 1);
    assert!(matches!(touching[0], Expr::FuncCall(_)));

    let spaced = call_args("f g (1)");
    assert_eq!(spaced.len(), 2);
    assert!(matches!(spaced[0], Expr::Name(_)));
    assert!(matches!(spaced[1], Expr::Group(_)));
}

// ============================================================================
// Dicts
// ============================================================================

#[test]
fn test_dict_keys_may_be_expressions() {
    let args = call_args(r#"f {4: 2} {3 + 5: 2} {"a" + "b": c}"#);
    assert_eq!(args.len(), 3);

    let keys: Vec<&Expr> = args
        .iter()
        .map(|arg| match arg {
            Expr::Dict(dict) => &dict.entries[0].key,
            other => panic!("expected a dict, got {:?}", other),
        })
        .collect();
    assert!(matches!(keys[0], Expr::Number(_)));
    assert_eq!(dump_expr(keys[1]), "BinOp +\n  Number 3\n  Number 5");
    assert_eq!(dump_expr(keys[2]), "BinOp +\n  String \"a\"\n  String \"b\"");
}

#[test]
fn test_trailing_comma_is_allowed() {
    let args = call_args("f {\"a\": 1, \"b\": 2,} [1, 2,]");
    match &args[0] {
        Expr::Dict(dict) => assert_eq!(dict.entries.len(), 2),
        other => panic!("expected a dict, got {:?}", other),
    }
    match &args[1] {
        Expr::Array(array) => assert_eq!(array.elements.len(), 2),
        other => panic!("expected an array, got {:?}", other),
    }
}

#[test]
fn test_entries_need_a_comma_between_them() {
    let test_cases = vec![
        (r#"f {"a": 1 "b": 2}"#, "Expected ',' or '}', found "),
        ("f [1 2]", "Expected ',' or ']', found "),
    ];

    for (input, prefix) in test_cases {
        let err = parse(input).unwrap_err();
        assert!(
            err.message.starts_with(prefix),
            "Failed for input: {} ({})",
            input,
            err.message
        );
    }

    for input in [r#"f {, "a": 1}"#, "f [1,, 2]", "f [,]"] {
        assert!(parse(input).is_err(), "Failed for input: {}", input);
    }
}

#[test]
fn test_nested_containers() {
    let args = call_args(r#"f {"a": [1, {"b": []}]}"#);
    assert_eq!(
        dump_expr(&args[0]),
        "Dict\n  KeyValue :\n    String \"a\"\n    Array\n      Number 1\n      Dict\n        KeyValue :\n          String \"b\"\n          Array"
    );
}

// ============================================================================
// Statements
// ============================================================================

#[test]
fn test_call_statement_argument_categories() {
    match single(r#"f @pretty 1 name="x""#) {
        Stmt::FuncCall(call) => {
            assert_eq!(call.form, CallForm::Statement);
            assert_eq!(call.symbols.len(), 1);
            assert_eq!(call.symbols[0].text, "@pretty");
            assert_eq!(call.args.len(), 1);
            assert_eq!(call.kwargs.len(), 1);
            assert!(matches!(&call.kwargs[0].key, Expr::Text(token) if token.text == "name"));
        }
        other => panic!("expected a function call, got {:?}", other),
    }
}

#[test]
fn test_call_expression_arguments() {
    let args = call_args("f g(1, k=2, @s)");
    match &args[0] {
        Expr::FuncCall(call) => {
            assert_eq!(call.args.len(), 1);
            assert_eq!(call.kwargs.len(), 1);
            assert_eq!(call.symbols.len(), 1);
            assert!(call.close.is_some());
        }
        other => panic!("expected a call, got {:?}", other),
    }
}

#[test]
fn test_api_call() {
    match single("GET /idx/_search size=10 from=5\n{\"query\": {}}") {
        Stmt::EsApiCall(call) => {
            assert_eq!(call.method.text, "GET");
            assert!(matches!(call.path.as_ref(), Expr::Text(token) if token.text == "/idx/_search"));
            assert_eq!(call.options.len(), 2);
            match call.payload {
                Payload::Inline(dicts) => assert_eq!(dicts.len(), 1),
                other => panic!("expected inline payload, got {:?}", other),
            }
        }
        other => panic!("expected an API call, got {:?}", other),
    }
}

#[test]
fn test_bulk_payload() {
    let source = "PUT _bulk\n{\"index\": {\"_index\": \"test\", \"_id\": \"1\"}}\n{\"field1\": \"value1\"}";
    match single(source) {
        Stmt::EsApiCall(call) => match call.payload {
            Payload::Inline(dicts) => assert_eq!(dicts.len(), 2),
            other => panic!("expected inline payload, got {:?}", other),
        },
        other => panic!("expected an API call, got {:?}", other),
    }
}

#[test]
fn test_file_payload() {
    match single("POST /x\n@body.json") {
        Stmt::EsApiCall(call) => match call.payload {
            Payload::File { path, .. } => assert_eq!(path.text, "body.json"),
            other => panic!("expected file payload, got {:?}", other),
        },
        other => panic!("expected an API call, got {:?}", other),
    }
}

#[test]
fn test_path_expression() {
    match single(r#"GET ("/" + i)"#) {
        Stmt::EsApiCall(call) => assert!(matches!(call.path.as_ref(), Expr::Group(_))),
        other => panic!("expected an API call, got {:?}", other),
    }
}

#[test]
fn test_let_with_several_assignments() {
    match single("let a = 1 b = 2\nc = a") {
        Stmt::Let(node) => {
            assert_eq!(node.assignments.len(), 3);
            assert!(matches!(&node.assignments[2].key, Expr::Name(token) if token.text == "c"));
        }
        other => panic!("expected let, got {:?}", other),
    }
}

#[test]
fn test_let_nested_target() {
    match single("let foo.@a.1 = 42") {
        Stmt::Let(node) => assert_eq!(
            dump_expr(&node.assignments[0].key),
            "BinOp .\n  BinOp .\n    Name foo\n    Symbol @a\n  Number 1"
        ),
        other => panic!("expected let, got {:?}", other),
    }
}

#[test]
fn test_for_loop() {
    match single("for i in range(3) {\n  GET /x\n\n  echo i\n}") {
        Stmt::ForIn(node) => {
            assert_eq!(node.variable.text, "i");
            assert!(matches!(node.iterable.as_ref(), Expr::FuncCall(_)));
            assert_eq!(node.body.len(), 2);
            assert!(matches!(node.body[0], Stmt::EsApiCall(_)));
            assert!(matches!(node.body[1], Stmt::FuncCall(_)));
        }
        other => panic!("expected for, got {:?}", other),
    }
}

#[test]
fn test_empty_for_body() {
    match single("for i in [] {}") {
        Stmt::ForIn(node) => assert!(node.body.is_empty()),
        other => panic!("expected for, got {:?}", other),
    }
}

#[test]
fn test_shell_out() {
    match single("!ls -l") {
        Stmt::ShellOut(node) => assert_eq!(node.command_text(), "ls -l"),
        other => panic!("expected shell-out, got {:?}", other),
    }
}

#[test]
fn test_statement_separation() {
    let test_cases = vec![
        ("f 1\n\ng 2", 2),
        ("f 1\ng 2", 1),
        ("let a = 1\nGET /x", 2),
        ("GET /x\n\nGET /y", 2),
        ("// only a comment\n", 0),
        ("", 0),
    ];

    for (input, count) in test_cases {
        let statements = parse(input).expect("program parses");
        assert_eq!(statements.len(), count, "Failed for input: {:?}", input);
    }
}

#[test]
fn test_dump_program() {
    let statements = parse("let a = 1\n\n!ls").expect("program parses");
    assert_eq!(
        dump_program(&statements),
        "Let\n  KeyValue =\n    Name a\n    Number 1\nShellOut ls"
    );
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_error_location_at_end_of_input() {
    let err = parse("get\n").unwrap_err();
    assert_eq!(err.line, 1);
    assert_eq!(err.column, 4);
    assert_eq!(
        err.to_string(),
        "Syntax error at Line 1, Column 4:\nget\n   ^\nExpected HTTP path, found end of input"
    );
}

#[test]
fn test_error_location_on_later_line() {
    let err = parse("let a = 1\n\nlet b = )").unwrap_err();
    assert_eq!(err.line, 3);
    assert_eq!(err.column, 9);
    assert_eq!(err.context, "let b = )");
    assert_eq!(err.marker, "        ^");
    assert_eq!(err.message, "Unexpected character \")\"");
}

#[test]
fn test_error_messages() {
    let test_cases = vec![
        (r#"f {"a": 1"#, "Expected '}', found end of input"),
        (r#"f {"a""#, "Object key must be followed by ':'"),
        (r#"f "abc"#, "Unterminated string literal"),
        ("f #", "Unexpected character \"#\""),
        ("for i in [1] {\n  echo i", "Expected '}' closing the loop body, found end of input"),
        ("let", "Expected assignment, found end of input"),
        ("f g(1", "Expected ')', found end of input"),
    ];

    for (input, message) in test_cases {
        let err = parse(input).unwrap_err();
        assert_eq!(err.message, message, "Failed for input: {:?}", input);
    }
}

#[test]
fn test_marker_spans_token() {
    let err = parse("f {\"a\": 1} }").unwrap_err();
    assert_eq!(err.column, 12);
    assert_eq!(err.marker, format!("{}^", " ".repeat(11)));
}

// ============================================================================
// Options and events
// ============================================================================

#[test]
fn test_payload_only() {
    let dicts = parse_payload("{\"a\": 1}\n{\"b\": 2}\n").expect("payload parses");
    assert_eq!(dicts.len(), 2);

    assert!(parse_payload("GET /x").is_err());
}

#[test]
fn test_skipping_errors() {
    let mut skipped = vec![];
    let statements = {
        let mut parser = Parser::with_options(
            "f 1 # 2",
            ParseOptions {
                fail_fast: false,
                ..ParseOptions::default()
            },
        );
        parser.add_listener(|event: &ParseEvent<'_>| {
            if let ParseEvent::SkippedError(token) = event {
                skipped.push(token.text.clone());
            }
        });
        parser.parse_program().expect("errors are skipped")
    };
    assert_eq!(skipped, vec!["#".to_string()]);
    match &statements[0] {
        Stmt::FuncCall(call) => assert_eq!(call.args.len(), 2),
        other => panic!("expected a function call, got {:?}", other),
    }

    assert!(parse("f 1 # 2").is_err());
}

#[test]
fn test_production_events() {
    let mut productions = vec![];
    {
        let mut parser = Parser::new("GET /x size=1\n{\"a\": 1}");
        parser.add_listener(|event: &ParseEvent<'_>| match event {
            ParseEvent::Enter(production) => productions.push(format!("+{:?}", production)),
            ParseEvent::Leave(production) => productions.push(format!("-{:?}", production)),
            _ => {}
        });
        parser.parse_program().expect("program parses");
    }
    assert_eq!(
        productions,
        vec![
            "+Statement",
            "+Method",
            "-Method",
            "+Url",
            "-Url",
            "+OptionName",
            "-OptionName",
            "+OptionValue",
            "-OptionValue",
            "+Payload",
            "+DictKey",
            "-DictKey",
            "-Payload",
            "-Statement",
        ]
    );
}

#[test]
fn test_consumed_events_cover_every_token() {
    let mut consumed = vec![];
    {
        let mut parser = Parser::new("f a.b(1)");
        parser.add_listener(|event: &ParseEvent<'_>| {
            if let ParseEvent::Consumed(token) = event {
                consumed.push(token.text.clone());
            }
        });
        parser.parse_program().expect("program parses");
    }
    assert_eq!(consumed, vec!["f", "a", ".", "b", "(", "1", ")"]);
}
