//! Tokenizer: a stack of lexical states over regex rule tables.
//!
//! The tokenizer never fails. Input that no rule recognizes becomes an
//! [`TokenKind::Error`] token one character wide, and every stream ends with
//! exactly one [`TokenKind::Eoi`] token. Tokens are produced lazily.

pub mod states;

use std::collections::VecDeque;

use tracing::trace;

use crate::ast::{Token, TokenKind};
use states::{Emit, Next, Rule, State};

/// Tokenizes a program.
pub fn tokenize(source: &str) -> Tokenizer<'_> {
    Tokenizer::new(source)
}

/// Tokenizes a bare sequence of dict literals (a payload without a request
/// line).
pub fn tokenize_payload(source: &str) -> Tokenizer<'_> {
    Tokenizer::with_state(source, State::PayloadOnly)
}

pub struct Tokenizer<'a> {
    source: &'a str,
    position: usize,
    stack: Vec<State>,
    pending: VecDeque<Token>,
    finished: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Tokenizer::with_state(source, State::Root)
    }

    /// Starts in `state`, which also becomes the bottom of the state stack.
    pub fn with_state(source: &'a str, state: State) -> Self {
        Tokenizer {
            source,
            position: 0,
            stack: vec![state],
            pending: VecDeque::new(),
            finished: false,
        }
    }

    fn state(&self) -> State {
        // The bottom state is never popped.
        self.stack[self.stack.len() - 1]
    }

    fn step(&mut self) {
        if self.position >= self.source.len() {
            self.finish();
            return;
        }

        let rest = &self.source[self.position..];
        let Some(table) = states::table(self.state()) else {
            self.error_char(rest);
            return;
        };

        for rule in &table.rules {
            if self.apply(rule, rest) {
                return;
            }
        }

        match &table.fallback {
            Some(next) => {
                let before = self.stack.clone();
                self.transition(next);
                if self.stack == before {
                    self.error_char(rest);
                }
            }
            None => self.error_char(rest),
        }
    }

    /// Tries `rule` at the cursor; on a match, queues its tokens, advances
    /// and transitions.
    fn apply(&mut self, rule: &Rule, rest: &str) -> bool {
        let consumed = match &rule.emit {
            Emit::Token(kind) => {
                let Some(found) = rule.pattern.find(rest) else {
                    return false;
                };
                if found.is_empty() {
                    return false;
                }
                self.pending
                    .push_back(Token::new(self.position, *kind, found.as_str()));
                found.end()
            }
            Emit::Groups(kinds) => {
                let Some(captures) = rule.pattern.captures(rest) else {
                    return false;
                };
                let whole = captures.get(0).map_or(0, |found| found.end());
                if whole == 0 {
                    return false;
                }
                for (index, kind) in kinds.iter().enumerate() {
                    if let Some(group) = captures.get(index + 1) {
                        if !group.is_empty() {
                            self.pending.push_back(Token::new(
                                self.position + group.start(),
                                *kind,
                                group.as_str(),
                            ));
                        }
                    }
                }
                whole
            }
        };

        self.position += consumed;
        self.transition(&rule.next);
        true
    }

    fn transition(&mut self, next: &Next) {
        match next {
            Next::Stay => {}
            Next::Push(states) => self.stack.extend(states),
            Next::Pop(count) => {
                let keep = self.stack.len().saturating_sub(*count).max(1);
                self.stack.truncate(keep);
            }
            Next::Replace(states) => {
                if self.stack.len() > 1 {
                    self.stack.pop();
                }
                self.stack.extend(states);
            }
        }
    }

    fn error_char(&mut self, rest: &str) {
        let Some(ch) = rest.chars().next() else {
            return;
        };
        trace!(offset = self.position, state = ?self.state(), "unrecognized character {ch:?}");
        self.pending
            .push_back(Token::new(self.position, TokenKind::Error, ch.to_string()));
        self.position += ch.len_utf8();
        if ch == '\n' {
            self.stack.truncate(1);
        }
    }

    fn finish(&mut self) {
        if self.state().is_string() {
            self.pending
                .push_back(Token::new(self.source.len(), TokenKind::Error, ""));
        }
        self.pending.push_back(Token::new(
            self.source.trim_end().len(),
            TokenKind::Eoi,
            "",
        ));
        self.finished = true;
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Some(token);
            }
            if self.finished {
                return None;
            }
            self.step();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .map(|token| token.kind)
            .filter(|kind| !kind.is_trivia())
            .collect()
    }

    #[test]
    fn test_empty_input_is_only_eoi() {
        let tokens: Vec<Token> = tokenize("").collect();
        assert_eq!(tokens, vec![Token::new(0, TokenKind::Eoi, "")]);
    }

    #[test]
    fn test_error_token_per_unknown_char() {
        assert_eq!(
            kinds("#"),
            vec![TokenKind::Error, TokenKind::Eoi]
        );
    }

    #[test]
    fn test_payload_mode() {
        assert_eq!(
            kinds("{}\n{}"),
            vec![
                TokenKind::Error,
                TokenKind::Error,
                TokenKind::Error,
                TokenKind::Error,
                TokenKind::Eoi
            ]
        );
        let payload: Vec<TokenKind> = tokenize_payload("{}\n{}")
            .map(|token| token.kind)
            .filter(|kind| !kind.is_trivia())
            .collect();
        assert_eq!(
            payload,
            vec![
                TokenKind::DictOpen,
                TokenKind::DictClose,
                TokenKind::DictOpen,
                TokenKind::DictClose,
                TokenKind::Eoi
            ]
        );
    }
}
