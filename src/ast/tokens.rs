use std::fmt;

/// Quoting flavor of a string literal or object key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quote {
    /// `'text'`
    Single,
    /// `"text"`
    Double,
    /// `'''text'''`
    TripleSingle,
    /// `"""text"""`
    TripleDouble,
}

impl Quote {
    pub const ALL: [Quote; 4] = [
        Quote::TripleSingle,
        Quote::TripleDouble,
        Quote::Double,
        Quote::Single,
    ];

    /// Opening and closing delimiter.
    pub fn delimiter(self) -> &'static str {
        match self {
            Quote::Single => "'",
            Quote::Double => "\"",
            Quote::TripleSingle => "'''",
            Quote::TripleDouble => "\"\"\"",
        }
    }

    pub fn is_triple(self) -> bool {
        matches!(self, Quote::TripleSingle | Quote::TripleDouble)
    }

    /// Detects the flavor from the leading characters of a token's text.
    pub fn of(text: &str) -> Option<Quote> {
        Quote::ALL
            .into_iter()
            .find(|quote| text.starts_with(quote.delimiter()))
    }
}

/// Lexical category of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Trivia
    /// Spaces, tabs and newlines that carry no meaning
    Whitespace,

    /// Line comment
    ///
    /// # Examples
    /// ```text
    /// // fetch the mapping first
    /// ```
    Comment,

    /// A line break followed by an empty line; terminates argument lists,
    /// option lists and payloads.
    BlankLine,

    /// End-of-input sentinel. Every token stream ends with exactly one.
    Eoi,

    /// Input no lexer rule recognized. Always promoted to a syntax error.
    Error,

    // Statement heads
    /// HTTP verb at the start of an API call (case-insensitive)
    ///
    /// # Examples
    /// ```text
    /// GET
    /// put
    /// ```
    HttpMethod,

    /// Raw text: an API path or the command of a shell-out
    ///
    /// # Examples
    /// ```text
    /// /my-index/_search
    /// _bulk
    /// ```
    Literal,

    /// `!` that starts a shell-out statement
    ShellOut,

    /// `@` that introduces a file payload
    At,

    /// `let` keyword
    Let,

    /// `for` keyword
    For,

    /// `in` keyword of a `for` statement
    In,

    // Names
    /// Identifier used as a value, loop variable or keyword argument
    Name,

    /// Identifier that starts a function-call statement
    FuncName,

    /// Option name of an API call (`size` in `size=10`)
    OptionName,

    /// Symbol marker
    ///
    /// # Examples
    /// ```text
    /// @pretty
    /// @a
    /// ```
    Symbol,

    // Punctuation
    DictOpen,
    DictClose,
    ArrayOpen,
    ArrayClose,
    ParenOpen,
    ParenClose,
    Comma,
    Colon,

    /// `=` in `let`, options and keyword arguments
    Assign,

    // Operators
    /// One of `. + - * / %`
    BinOp,

    /// Prefix `+` or `-`
    UnaryOp,

    // Literals
    /// `true` or `false` (lowercase only)
    Bool,

    /// `null` (lowercase only)
    Null,

    Integer,
    Float,
    /// `0x1F`
    Hex,
    /// `017` or `0o17`
    Octal,
    /// `0b101`
    Binary,

    /// String literal (or one fragment of it, before normalization)
    Str(Quote),

    /// Quoted object key (or one fragment of it, before normalization)
    Key(Quote),
}

impl TokenKind {
    /// Tokens dropped by the normalizer.
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Whitespace | TokenKind::Comment)
    }

    pub fn is_number(self) -> bool {
        matches!(
            self,
            TokenKind::Integer
                | TokenKind::Float
                | TokenKind::Hex
                | TokenKind::Octal
                | TokenKind::Binary
        )
    }

    pub fn is_string(self) -> bool {
        matches!(self, TokenKind::Str(_) | TokenKind::Key(_))
    }

    pub fn quote(self) -> Option<Quote> {
        match self {
            TokenKind::Str(quote) | TokenKind::Key(quote) => Some(quote),
            _ => None,
        }
    }

    /// Human-readable description used in syntax errors.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Whitespace => "whitespace",
            TokenKind::Comment => "comment",
            TokenKind::BlankLine => "blank line",
            TokenKind::Eoi => "end of input",
            TokenKind::Error => "invalid input",
            TokenKind::HttpMethod => "HTTP method",
            TokenKind::Literal => "HTTP path",
            TokenKind::ShellOut => "'!'",
            TokenKind::At => "'@'",
            TokenKind::Let => "'let'",
            TokenKind::For => "'for'",
            TokenKind::In => "'in'",
            TokenKind::Name => "name",
            TokenKind::FuncName => "function name",
            TokenKind::OptionName => "option name",
            TokenKind::Symbol => "symbol",
            TokenKind::DictOpen => "'{'",
            TokenKind::DictClose => "'}'",
            TokenKind::ArrayOpen => "'['",
            TokenKind::ArrayClose => "']'",
            TokenKind::ParenOpen => "'('",
            TokenKind::ParenClose => "')'",
            TokenKind::Comma => "','",
            TokenKind::Colon => "':'",
            TokenKind::Assign => "'='",
            TokenKind::BinOp => "binary operator",
            TokenKind::UnaryOp => "unary operator",
            TokenKind::Bool => "boolean",
            TokenKind::Null => "null",
            TokenKind::Integer
            | TokenKind::Float
            | TokenKind::Hex
            | TokenKind::Octal
            | TokenKind::Binary => "number",
            TokenKind::Str(_) => "string",
            TokenKind::Key(_) => "object key",
        }
    }
}

/// Smallest lexical unit: a kind, the byte offset into the source and the
/// literal text. Produced once by the tokenizer and never mutated afterwards
/// (the normalizer builds new tokens when it merges or retags).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub offset: usize,
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn new(offset: usize, kind: TokenKind, text: impl Into<String>) -> Self {
        Token {
            offset,
            kind,
            text: text.into(),
        }
    }

    /// Byte offset one past the last character of the token.
    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }

    /// Whether `next` starts exactly where this token ends.
    pub fn touches(&self, next: &Token) -> bool {
        self.end() == next.offset
    }

    /// Same text and offset under a different kind.
    pub fn retagged(&self, kind: TokenKind) -> Token {
        Token::new(self.offset, kind, self.text.clone())
    }

    /// Decoded content of a string or object-key token.
    ///
    /// Triple-quoted strings are raw. Single and double quoted strings decode
    /// JSON-style escapes; unknown escapes are kept verbatim.
    pub fn string_value(&self) -> Option<String> {
        let quote = self.kind.quote()?;
        let delimiter = quote.delimiter();
        let inner = self
            .text
            .strip_prefix(delimiter)?
            .strip_suffix(delimiter)?;
        if quote.is_triple() {
            Some(inner.to_string())
        } else {
            Some(decode_escapes(inner))
        }
    }

    /// Name carried by a symbol token, without the leading `@`.
    pub fn symbol_name(&self) -> &str {
        self.text.strip_prefix('@').unwrap_or(&self.text)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == TokenKind::Eoi {
            write!(f, "end of input")
        } else if self.kind == TokenKind::Error && self.text.is_empty() {
            write!(f, "unterminated string")
        } else {
            write!(f, "{} `{}`", self.kind.describe(), self.text)
        }
    }
}

fn decode_escapes(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('b') => result.push('\u{8}'),
            Some('f') => result.push('\u{c}'),
            Some('0') => result.push('\0'),
            Some(c @ ('"' | '\'' | '\\' | '/')) => result.push(c),
            Some('u') => {
                let digits: String = chars.clone().take(4).collect();
                match decode_unicode(&digits, &mut chars) {
                    Some(c) => result.push(c),
                    None => {
                        result.push_str("\\u");
                    }
                }
            }
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }
    result
}

/// Decodes `XXXX` (and a following `\uXXXX` low surrogate when needed),
/// advancing `chars` only on success.
fn decode_unicode(
    digits: &str,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
) -> Option<char> {
    if digits.len() != 4 {
        return None;
    }
    let high = u32::from_str_radix(digits, 16).ok()?;
    if !(0xD800..0xDC00).contains(&high) {
        let decoded = char::from_u32(high)?;
        chars.nth(3);
        return Some(decoded);
    }

    let mut lookahead = chars.clone();
    lookahead.nth(3);
    if lookahead.next() != Some('\\') || lookahead.next() != Some('u') {
        return None;
    }
    let low_digits: String = lookahead.clone().take(4).collect();
    let low = u32::from_str_radix(&low_digits, 16).ok()?;
    if !(0xDC00..0xE000).contains(&low) {
        return None;
    }
    let decoded = char::from_u32(0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00))?;
    lookahead.nth(3);
    *chars = lookahead;
    Some(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_value_decodes_escapes() {
        let token = Token::new(0, TokenKind::Str(Quote::Double), r#""a\n\"b\"é\q""#);
        assert_eq!(token.string_value().unwrap(), "a\n\"b\"é\\q");
    }

    #[test]
    fn test_triple_quoted_is_raw() {
        let token = Token::new(0, TokenKind::Str(Quote::TripleDouble), "\"\"\"a\\nb\n\"\"\"");
        assert_eq!(token.string_value().unwrap(), "a\\nb\n");
    }

    #[test]
    fn test_surrogate_pair() {
        let token = Token::new(0, TokenKind::Key(Quote::Single), r"'\ud83d\ude00'");
        assert_eq!(token.string_value().unwrap(), "😀");
    }
}
