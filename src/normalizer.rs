//! Token normalization between the tokenizer and the parser.
//!
//! - whitespace and comment tokens are dropped
//! - string fragments are merged into one token per literal
//! - quoted tokens lexed as object keys stay keys only when a `:` follows;
//!   otherwise they become plain strings of the same quote flavor
//!
//! A key still unresolved when the input ends is retagged as an error token,
//! so the parser reports it instead of guessing.

use tracing::trace;

use crate::ast::{Token, TokenKind};

pub fn normalize<I>(tokens: I) -> Vec<Token>
where
    I: IntoIterator<Item = Token>,
{
    let mut normalizer = Normalizer::default();
    for token in tokens {
        normalizer.push(token);
    }
    normalizer.finish()
}

#[derive(Default)]
struct Normalizer {
    output: Vec<Token>,
    run: Option<StringRun>,
    pending_key: Option<Token>,
}

struct StringRun {
    token: Token,
    fragments: usize,
    closed: bool,
}

impl StringRun {
    fn accepts(&self, fragment: &Token) -> bool {
        !self.closed && self.token.kind == fragment.kind && self.token.touches(fragment)
    }

    fn append(&mut self, fragment: Token) {
        self.fragments += 1;
        self.closed = self.fragments >= 2
            && fragment
                .kind
                .quote()
                .is_some_and(|quote| fragment.text == quote.delimiter());
        self.token.text.push_str(&fragment.text);
    }
}

impl Normalizer {
    fn push(&mut self, token: Token) {
        if token.kind.is_trivia() {
            return;
        }

        if token.kind.is_string() {
            if let Some(run) = self.run.as_mut() {
                if run.accepts(&token) {
                    run.append(token);
                    return;
                }
            }
            self.flush_run();
            self.run = Some(StringRun {
                token,
                fragments: 1,
                closed: false,
            });
            return;
        }

        self.flush_run();
        self.emit(token);
    }

    fn flush_run(&mut self) {
        if let Some(run) = self.run.take() {
            self.emit(run.token);
        }
    }

    fn emit(&mut self, token: Token) {
        if let Some(key) = self.pending_key.take() {
            let resolved = match (token.kind, key.kind.quote()) {
                (TokenKind::Colon, _) => key,
                (TokenKind::Eoi, _) | (_, None) => key.retagged(TokenKind::Error),
                (_, Some(quote)) => {
                    trace!(offset = key.offset, "object key without ':' is a string");
                    key.retagged(TokenKind::Str(quote))
                }
            };
            self.output.push(resolved);
        }

        if matches!(token.kind, TokenKind::Key(_)) {
            self.pending_key = Some(token);
        } else {
            self.output.push(token);
        }
    }

    fn finish(mut self) -> Vec<Token> {
        self.flush_run();
        if let Some(key) = self.pending_key.take() {
            self.output.push(key.retagged(TokenKind::Error));
        }
        self.output
    }
}
