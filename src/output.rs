//! JSON serialization of runtime values.
//!
//! The compact form is what goes on the wire: payload lines, string
//! concatenation of non-strings and computed dict keys all use it, so a
//! value prints the same way everywhere. The pretty form (2-space
//! indentation) is for humans.
//!
//! Object keys keep insertion order. Non-finite floats print as `null`.
//! Functions print as a string naming them.
//!
//! # Examples
//!
//! ```
//! use esq_lang::Value;
//! use esq_lang::output::{to_json, to_json_pretty};
//!
//! let value = Value::Array(vec![Value::Integer(1), Value::Float(2.0)]);
//!
//! assert_eq!(to_json(&value), "[1,2.0]");
//! assert_eq!(to_json_pretty(&value), "[\n  1,\n  2.0\n]");
//! ```

use indexmap::IndexMap;

use crate::value::Value;

pub struct JsonPrinter {
    pretty: bool,
}

impl JsonPrinter {
    pub fn new(pretty: bool) -> Self {
        JsonPrinter { pretty }
    }

    pub fn print(&self, value: &Value) -> String {
        self.print_value(value, 0)
    }

    fn print_value(&self, value: &Value, indent: usize) -> String {
        match value {
            Value::Null => "null".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Integer(n) => n.to_string(),
            Value::Float(n) => {
                serde_json::Number::from_f64(*n).map_or_else(|| "null".to_string(), |n| n.to_string())
            }
            Value::String(s) => format!("\"{}\"", escape_string(s)),
            Value::Array(items) => self.print_array(items, indent),
            Value::Object(map) => self.print_object(map, indent),
            Value::Function(callable) => format!("\"{}\"", escape_string(&callable.to_string())),
        }
    }

    fn print_array(&self, items: &[Value], indent: usize) -> String {
        if items.is_empty() {
            return "[]".to_string();
        }

        if self.pretty {
            let items: Vec<String> = items
                .iter()
                .map(|v| format!("{}{}", self.indent(indent + 1), self.print_value(v, indent + 1)))
                .collect();
            format!("[\n{}\n{}]", items.join(",\n"), self.indent(indent))
        } else {
            let items: Vec<String> = items.iter().map(|v| self.print_value(v, indent)).collect();
            format!("[{}]", items.join(","))
        }
    }

    fn print_object(&self, map: &IndexMap<String, Value>, indent: usize) -> String {
        if map.is_empty() {
            return "{}".to_string();
        }

        if self.pretty {
            let items: Vec<String> = map
                .iter()
                .map(|(k, v)| {
                    format!(
                        "{}\"{}\": {}",
                        self.indent(indent + 1),
                        escape_string(k),
                        self.print_value(v, indent + 1)
                    )
                })
                .collect();
            format!("{{\n{}\n{}}}", items.join(",\n"), self.indent(indent))
        } else {
            let items: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("\"{}\":{}", escape_string(k), self.print_value(v, indent)))
                .collect();
            format!("{{{}}}", items.join(","))
        }
    }

    fn indent(&self, level: usize) -> String {
        "  ".repeat(level)
    }
}

pub(crate) fn escape_string(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c if c.is_control() => escaped.push_str(&format!("\\u{:04x}", c as u32)),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Compact JSON, as sent in payloads.
pub fn to_json(value: &Value) -> String {
    JsonPrinter::new(false).print(value)
}

/// JSON with 2-space indentation, one element or member per line.
pub fn to_json_pretty(value: &Value) -> String {
    JsonPrinter::new(true).print(value)
}
