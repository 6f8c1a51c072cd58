//! Requests handed to the connection layer.
//!
//! The evaluator turns an API-call statement into an [`ApiRequest`] and
//! passes it to a [`RequestExecutor`]. Sending it over the network is the
//! executor's business.

use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use thiserror::Error;

use crate::value::Value;

/// Verbs accepted in API-call statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Head,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
        }
    }
}

impl FromStr for Method {
    type Err = String;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "HEAD" => Ok(Method::Head),
            _ => Err(s.to_string()),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Starts with `/`; date-math segments are already percent-encoded
    pub path: String,
    /// NDJSON body, one line per payload dict, or a file's content verbatim
    pub payload: Option<String>,
    pub options: IndexMap<String, Value>,
}

impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        if !self.options.is_empty() {
            let query: Vec<String> = self
                .options
                .iter()
                .map(|(name, value)| format!("{name}={}", value.to_canonical_string()))
                .collect();
            write!(f, "?{}", query.join("&"))?;
        }
        if let Some(payload) = &self.payload {
            write!(f, "\n{payload}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Performs API requests. Returns the response body.
pub trait RequestExecutor {
    fn execute(&mut self, request: &ApiRequest) -> Result<String, ExecutorError>;
}

impl<F> RequestExecutor for F
where
    F: FnMut(&ApiRequest) -> Result<String, ExecutorError>,
{
    fn execute(&mut self, request: &ApiRequest) -> Result<String, ExecutorError> {
        self(request)
    }
}

/// Prefixes `/` when missing and percent-encodes every `<...>` date-math
/// segment.
///
/// ```
/// use esq_lang::request::normalize_path;
///
/// assert_eq!(normalize_path("_cat/indices"), "/_cat/indices");
/// assert_eq!(
///     normalize_path("/<my-index-{now/d}>"),
///     "/%3Cmy-index-%7Bnow%2Fd%7D%3E"
/// );
/// ```
pub fn normalize_path(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len() + 1);
    if !path.starts_with('/') {
        normalized.push('/');
    }

    let mut rest = path;
    while let Some(open) = rest.find('<') {
        let Some(close) = rest[open..].find('>') else {
            break;
        };
        normalized.push_str(&rest[..open]);
        normalized.push_str(&percent_encode(&rest[open..=open + close]));
        rest = &rest[open + close + 1..];
    }
    normalized.push_str(rest);
    normalized
}

/// Keeps `A-Z a-z 0-9 - _ . ~`, encodes every other byte.
fn percent_encode(text: &str) -> String {
    let mut encoded = String::with_capacity(text.len() * 3);
    for byte in text.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

/// Checks that braces and brackets outside of JSON strings balance. On
/// failure returns the byte offset of the first unmatched closer, or the
/// length of the text when an opener is never closed.
pub fn check_balanced(text: &str) -> Result<(), usize> {
    let mut open = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => open.push('}'),
            '[' => open.push(']'),
            '}' | ']' => {
                if open.pop() != Some(ch) {
                    return Err(offset);
                }
            }
            _ => {}
        }
    }

    if open.is_empty() { Ok(()) } else { Err(text.len()) }
}
