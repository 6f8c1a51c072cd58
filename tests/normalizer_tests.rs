// tests/normalizer_tests.rs

use esq_lang::ast::{Quote, Token, TokenKind};
use esq_lang::lexer::tokenize;
use esq_lang::normalize;
use pretty_assertions::assert_eq;

fn normalized(source: &str) -> Vec<(TokenKind, String)> {
    normalize(tokenize(source))
        .into_iter()
        .map(|token| (token.kind, token.text))
        .collect()
}

fn tok(kind: TokenKind, text: &str) -> (TokenKind, String) {
    (kind, text.to_string())
}

// ============================================================================
// Trivia
// ============================================================================

#[test]
fn test_trivia_is_dropped() {
    assert_eq!(
        normalized("f  1   // trailing\n"),
        vec![
            tok(TokenKind::FuncName, "f"),
            tok(TokenKind::Integer, "1"),
            tok(TokenKind::Eoi, ""),
        ]
    );
}

#[test]
fn test_blank_lines_are_kept() {
    let kinds: Vec<_> = normalized("f 1\n\ng 2")
        .into_iter()
        .map(|(kind, _)| kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::FuncName,
            TokenKind::Integer,
            TokenKind::BlankLine,
            TokenKind::FuncName,
            TokenKind::Integer,
            TokenKind::Eoi,
        ]
    );
}

// ============================================================================
// String coalescing
// ============================================================================

#[test]
fn test_fragments_merge_into_one_literal() {
    let tokens = normalize(tokenize(r#"f "a\"b""#));
    assert_eq!(
        tokens[1],
        Token::new(2, TokenKind::Str(Quote::Double), r#""a\"b""#)
    );
    assert_eq!(tokens.len(), 3);
}

#[test]
fn test_each_quote_flavor_merges() {
    let test_cases = vec![
        (r#"f """x"y""""#, Quote::TripleDouble, r#""""x"y""""#),
        ("f '''a'b'''", Quote::TripleSingle, "'''a'b'''"),
        ("f 'it\\'s'", Quote::Single, "'it\\'s'"),
        (r#"f """#, Quote::Double, r#""""#),
    ];

    for (input, quote, text) in test_cases {
        assert_eq!(
            normalized(input)[1],
            tok(TokenKind::Str(quote), text),
            "Failed for input: {}",
            input
        );
    }
}

#[test]
fn test_adjacent_literals_stay_separate() {
    assert_eq!(
        normalized(r#"f "a""b""#),
        vec![
            tok(TokenKind::FuncName, "f"),
            tok(TokenKind::Str(Quote::Double), r#""a""#),
            tok(TokenKind::Str(Quote::Double), r#""b""#),
            tok(TokenKind::Eoi, ""),
        ]
    );
}

// ============================================================================
// Key resolution
// ============================================================================

#[test]
fn test_key_followed_by_colon_stays_key() {
    assert_eq!(
        normalized(r#"f {"a": 1}"#),
        vec![
            tok(TokenKind::FuncName, "f"),
            tok(TokenKind::DictOpen, "{"),
            tok(TokenKind::Key(Quote::Double), r#""a""#),
            tok(TokenKind::Colon, ":"),
            tok(TokenKind::Integer, "1"),
            tok(TokenKind::DictClose, "}"),
            tok(TokenKind::Eoi, ""),
        ]
    );
}

#[test]
fn test_key_in_expression_becomes_string() {
    assert_eq!(
        normalized(r#"f {"a" + "b": c}"#),
        vec![
            tok(TokenKind::FuncName, "f"),
            tok(TokenKind::DictOpen, "{"),
            tok(TokenKind::Str(Quote::Double), r#""a""#),
            tok(TokenKind::BinOp, "+"),
            tok(TokenKind::Str(Quote::Double), r#""b""#),
            tok(TokenKind::Colon, ":"),
            tok(TokenKind::Name, "c"),
            tok(TokenKind::DictClose, "}"),
            tok(TokenKind::Eoi, ""),
        ]
    );
}

#[test]
fn test_triple_quoted_key() {
    assert_eq!(
        normalized("f {'''k''': 1}")[2],
        tok(TokenKind::Key(Quote::TripleSingle), "'''k'''")
    );
}

#[test]
fn test_unresolved_key_at_end_is_error() {
    assert_eq!(
        normalized(r#"f {"a""#),
        vec![
            tok(TokenKind::FuncName, "f"),
            tok(TokenKind::DictOpen, "{"),
            tok(TokenKind::Error, r#""a""#),
            tok(TokenKind::Eoi, ""),
        ]
    );
}

#[test]
fn test_hand_built_stream() {
    let tokens = vec![
        Token::new(0, TokenKind::DictOpen, "{"),
        Token::new(1, TokenKind::Key(Quote::Single), "'"),
        Token::new(2, TokenKind::Key(Quote::Single), "k"),
        Token::new(3, TokenKind::Key(Quote::Single), "'"),
        Token::new(4, TokenKind::Whitespace, " "),
        Token::new(5, TokenKind::DictClose, "}"),
        Token::new(6, TokenKind::Eoi, ""),
    ];
    assert_eq!(
        normalize(tokens),
        vec![
            Token::new(0, TokenKind::DictOpen, "{"),
            Token::new(1, TokenKind::Str(Quote::Single), "'k'"),
            Token::new(5, TokenKind::DictClose, "}"),
            Token::new(6, TokenKind::Eoi, ""),
        ]
    );
}
