// tests/formatter_tests.rs

use esq_lang::dump::dump_program;
use esq_lang::{format_source, parse};
use pretty_assertions::assert_eq;

const PROGRAMS: &[&str] = &[
    "GET /my-index/_search size=10\n{\"query\": {\"match_all\": {}}}",
    "PUT _bulk\n{ \"index\" : { \"_index\" : \"test\", \"_id\" : \"1\" } }\n{ \"field1\" : \"value1\" }",
    "let foo = {\"a\": [3, 4, 5]}\n\nlet foo.@a.1 = 42",
    "for i in range(3) {\n  GET (\"/index-\" + i)\n\n  echo i\n}",
    "f 1 * 2 + (3 - 2) g(3)",
    "f {4: 2} {3 + 5: 2} {\"a\" + \"b\": c}",
    "!ls -l",
    "POST /x @body.json",
    "let a = '''raw\ntext''' b = 0x1F",
    "GET /<my-index-{now/d}>",
    "for a in [1, 2] {\n  for b in \"xy\" {\n    echo a b\n  }\n}",
    "echo @pretty g(1, k=2, @s) name='x'",
];

// ============================================================================
// Layouts
// ============================================================================

#[test]
fn test_pretty_layout() {
    let test_cases = vec![
        ("get /x", "GET /x"),
        ("f 1+2", "f 1 + 2"),
        ("let a=1 b=2", "let a = 1 b = 2"),
        ("f [1,2]", "f [1, 2]"),
        ("f g(1,k=2)", "f g(1, k=2)"),
        ("f {}", "f {}"),
        ("f {'a':1,'b':2}", "f {\n  'a': 1,\n  'b': 2\n}"),
        ("f -x", "f -x"),
        ("f a\n-1", "f a (-1)"),
        ("for i in [] {}", "for i in [] {}"),
    ];

    for (input, expected) in test_cases {
        assert_eq!(
            format_source(input, true).unwrap(),
            expected,
            "Failed for input: {}",
            input
        );
    }
}

#[test]
fn test_compact_layout() {
    let test_cases = vec![
        ("f 1 + 2", "f 1+2"),
        ("let a = 1", "let a=1"),
        ("f [1, 2]", "f [1,2]"),
        ("f {'a': 1, 'b': [1, 2]}", "f {'a':1,'b':[1,2]}"),
        ("f g(1, k=2)", "f g(1,k=2)"),
    ];

    for (input, expected) in test_cases {
        assert_eq!(
            format_source(input, false).unwrap(),
            expected,
            "Failed for input: {}",
            input
        );
    }
}

#[test]
fn test_api_call_with_payload() {
    let formatted = format_source(
        "put _bulk\n{\"index\": {\"_id\": \"1\"}}\n{\"a\": 1}",
        true,
    )
    .unwrap();
    assert_eq!(
        formatted,
        "PUT _bulk\n{\n  \"index\": {\n    \"_id\": \"1\"\n  }\n}\n{\n  \"a\": 1\n}"
    );
}

#[test]
fn test_file_payload_moves_to_next_line() {
    assert_eq!(
        format_source("POST /x @body.json", true).unwrap(),
        "POST /x\n@body.json"
    );
}

#[test]
fn test_statements_separated_by_blank_line() {
    assert_eq!(
        format_source("let a = 1\nGET /x\n\n\n\n!ls", true).unwrap(),
        "let a = 1\n\nGET /x\n\n!ls"
    );
}

#[test]
fn test_for_body_is_indented() {
    assert_eq!(
        format_source("for i in [1,2] {\nGET /x\n{\"a\":i}\n}", true).unwrap(),
        "for i in [1, 2] {\n  GET /x\n  {\n    \"a\": i\n  }\n}"
    );
}

#[test]
fn test_strings_keep_their_source_text() {
    assert_eq!(
        format_source(r#"f "a\"b" '''c'd'''"#, true).unwrap(),
        r#"f "a\"b" '''c'd'''"#
    );
}

// ============================================================================
// Stability
// ============================================================================

#[test]
fn test_formatting_is_idempotent() {
    for pretty in [true, false] {
        for source in PROGRAMS {
            let once = format_source(source, pretty).unwrap();
            let twice = format_source(&once, pretty).unwrap();
            assert_eq!(once, twice, "Failed for input: {} (pretty: {})", source, pretty);
        }
    }
}

#[test]
fn test_formatting_preserves_the_tree() {
    for pretty in [true, false] {
        for source in PROGRAMS {
            let original = dump_program(&parse(source).unwrap());
            let formatted = format_source(source, pretty).unwrap();
            let reparsed = dump_program(&parse(&formatted).unwrap());
            assert_eq!(original, reparsed, "Failed for input: {} (pretty: {})", source, pretty);
        }
    }
}
