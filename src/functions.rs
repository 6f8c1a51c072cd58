//! Host functions callable from the language.
//!
//! The evaluator never looks functions up globally: it receives a
//! [`FunctionRegistry`] and asks it to resolve names. [`Functions`] is the
//! default registry, optionally preloaded with the built-ins below.
//!
//! | Function | Result |
//! |----------|--------|
//! | `echo a b ...` | positional arguments joined by a space |
//! | `range([start,] stop [, step])` | array of integers |
//! | `len(x)` | characters of a string, elements of an array, members of an object |
//! | `keys(obj)` | member names of an object |
//! | `type(x)` | type name of a value |

use std::{collections::HashMap, fmt, rc::Rc};

use indexmap::IndexMap;
use thiserror::Error;

use crate::value::Value;

/// Arguments of a call, by category, each in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    pub positional: Vec<Value>,
    pub keywords: IndexMap<String, Value>,
    /// Bare `@symbol` arguments, without the `@`
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FunctionError {
    #[error("{function}() takes {expected}, got {given} argument(s)")]
    Arity {
        function: String,
        expected: String,
        given: usize,
    },
    #[error("{function}(): expected {expected}, got {found}")]
    ArgumentType {
        function: String,
        expected: String,
        found: String,
    },
    #[error("{0}")]
    Failed(String),
}

pub trait Function {
    fn call(&self, args: Arguments) -> Result<Value, FunctionError>;
}

impl<F> Function for F
where
    F: Fn(Arguments) -> Result<Value, FunctionError>,
{
    fn call(&self, args: Arguments) -> Result<Value, FunctionError> {
        self(args)
    }
}

/// A named, shareable function value. Two callables are equal when they
/// share the same function object.
#[derive(Clone)]
pub struct Callable {
    name: String,
    func: Rc<dyn Function>,
}

impl Callable {
    pub fn new(name: impl Into<String>, func: impl Function + 'static) -> Self {
        Callable {
            name: name.into(),
            func: Rc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: Arguments) -> Result<Value, FunctionError> {
        self.func.call(args)
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable({})", self.name)
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function {}>", self.name)
    }
}

/// Resolves function names for the evaluator.
pub trait FunctionRegistry {
    fn resolve(&self, name: &str) -> Option<Callable>;
}

#[derive(Debug, Clone, Default)]
pub struct Functions {
    entries: HashMap<String, Callable>,
}

impl Functions {
    pub fn new() -> Self {
        Functions::default()
    }

    pub fn with_builtins() -> Self {
        let mut functions = Functions::new();
        functions.register("echo", echo);
        functions.register("range", range);
        functions.register("len", len);
        functions.register("keys", keys);
        functions.register("type", type_of);
        functions
    }

    /// Registers `func` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: &str, func: impl Function + 'static) {
        self.entries
            .insert(name.to_string(), Callable::new(name, func));
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl FunctionRegistry for Functions {
    fn resolve(&self, name: &str) -> Option<Callable> {
        self.entries.get(name).cloned()
    }
}

fn echo(args: Arguments) -> Result<Value, FunctionError> {
    let words: Vec<String> = args
        .positional
        .iter()
        .map(Value::to_canonical_string)
        .collect();
    Ok(Value::String(words.join(" ")))
}

fn range(args: Arguments) -> Result<Value, FunctionError> {
    let bounds = args
        .positional
        .iter()
        .map(|value| {
            value.as_int().ok_or_else(|| FunctionError::ArgumentType {
                function: "range".to_string(),
                expected: "integer".to_string(),
                found: value.type_name().to_string(),
            })
        })
        .collect::<Result<Vec<i64>, _>>()?;

    let (start, stop, step) = match bounds.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => {
            return Err(FunctionError::Arity {
                function: "range".to_string(),
                expected: "1 to 3 arguments".to_string(),
                given: bounds.len(),
            });
        }
    };
    if step == 0 {
        return Err(FunctionError::Failed("range() step must not be zero".to_string()));
    }

    let mut items = Vec::new();
    let mut current = start;
    while (step > 0 && current < stop) || (step < 0 && current > stop) {
        items.push(Value::Integer(current));
        match current.checked_add(step) {
            Some(next) => current = next,
            None => break,
        }
    }
    Ok(Value::Array(items))
}

fn single_argument(function: &str, args: Arguments) -> Result<Value, FunctionError> {
    let given = args.positional.len();
    let mut positional = args.positional.into_iter();
    match (positional.next(), positional.next()) {
        (Some(value), None) => Ok(value),
        _ => Err(FunctionError::Arity {
            function: function.to_string(),
            expected: "1 argument".to_string(),
            given,
        }),
    }
}

fn len(args: Arguments) -> Result<Value, FunctionError> {
    let count = match single_argument("len", args)? {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        other => {
            return Err(FunctionError::ArgumentType {
                function: "len".to_string(),
                expected: "string, array or object".to_string(),
                found: other.type_name().to_string(),
            });
        }
    };
    Ok(Value::Integer(count as i64))
}

fn keys(args: Arguments) -> Result<Value, FunctionError> {
    match single_argument("keys", args)? {
        Value::Object(map) => Ok(Value::Array(
            map.into_keys().map(Value::String).collect(),
        )),
        other => Err(FunctionError::ArgumentType {
            function: "keys".to_string(),
            expected: "object".to_string(),
            found: other.type_name().to_string(),
        }),
    }
}

fn type_of(args: Arguments) -> Result<Value, FunctionError> {
    let value = single_argument("type", args)?;
    Ok(Value::String(value.type_name().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positional(values: Vec<Value>) -> Arguments {
        Arguments {
            positional: values,
            ..Arguments::default()
        }
    }

    #[test]
    fn test_range_forms() {
        assert_eq!(
            range(positional(vec![Value::Integer(3)])).unwrap(),
            Value::Array(vec![Value::Integer(0), Value::Integer(1), Value::Integer(2)])
        );
        assert_eq!(
            range(positional(vec![
                Value::Integer(5),
                Value::Integer(0),
                Value::Integer(-2)
            ]))
            .unwrap(),
            Value::Array(vec![Value::Integer(5), Value::Integer(3), Value::Integer(1)])
        );
        assert!(range(positional(vec![Value::Integer(1), Value::Integer(2), Value::Integer(0)])).is_err());
    }

    #[test]
    fn test_callable_equality_is_identity() {
        let a = Callable::new("f", echo);
        let b = a.clone();
        let c = Callable::new("f", echo);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
