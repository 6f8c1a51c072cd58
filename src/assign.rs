use crate::{
    ast::{BinaryOperator, Expr, Visitor},
    evaluator::EvalError,
    formatter::format_expr,
    value::Value,
};

/// A step from a value to one of its children.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    /// Object member
    ///
    /// # Examples
    /// - `foo.bar` → `Field("bar")`
    /// - `foo.@bar` → `Field("bar")`
    /// - `foo."a b"` → `Field("a b")`
    Field(String),

    /// Array element, or an object member named by the number
    ///
    /// # Examples
    /// - `foo.1` → `Index(1)`
    /// - `foo.(-1)` → `Index(-1)` (negative indices count from the end)
    Index(i64),
}

/// Where a `let` writes: a variable, optionally followed by a path into
/// its value.
///
/// For `let foo.@a.1 = 42` the target is `foo` with path
/// `[Field("a"), Index(1)]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub root: String,
    pub path: Vec<PathSegment>,
    /// Compact source of the whole target, for error messages
    pub text: String,
}

/// Extracts the assignment target from the left side of a `let` pair.
///
/// Literal members (`.name`, `.@name`, `."name"`, `.1`) are taken as
/// written; any other right-hand side of a dot is evaluated and must yield
/// a string or an integer.
pub fn resolve_target<V>(expr: &Expr, evaluator: &mut V) -> Result<Target, EvalError>
where
    V: Visitor<Output = Result<Value, EvalError>>,
{
    let text = format_expr(expr, false);
    let mut path = Vec::new();
    let root = resolve_recursive(expr, evaluator, &mut path, &text)?;
    Ok(Target { root, path, text })
}

fn resolve_recursive<V>(
    expr: &Expr,
    evaluator: &mut V,
    path: &mut Vec<PathSegment>,
    text: &str,
) -> Result<String, EvalError>
where
    V: Visitor<Output = Result<Value, EvalError>>,
{
    match expr {
        Expr::Name(token) => Ok(token.text.clone()),

        Expr::Group(group) => resolve_recursive(&group.inner, evaluator, path, text),

        Expr::BinOp(node) if node.op == BinaryOperator::Dot => {
            // Left to right: the receiver's segments come first
            let root = resolve_recursive(&node.left, evaluator, path, text)?;
            let segment = match node.right.as_ref() {
                Expr::Text(token) | Expr::Name(token) => PathSegment::Field(token.text.clone()),
                Expr::Symbol(token) => PathSegment::Field(token.symbol_name().to_string()),
                Expr::FuncCall(_) => {
                    return Err(EvalError::InvalidAssignmentTarget(text.to_string()));
                }
                other => match other.accept(evaluator)? {
                    Value::Integer(n) => PathSegment::Index(n),
                    Value::String(s) => PathSegment::Field(s),
                    _ => return Err(EvalError::InvalidAssignmentTarget(text.to_string())),
                },
            };
            path.push(segment);
            Ok(root)
        }

        _ => Err(EvalError::InvalidAssignmentTarget(text.to_string())),
    }
}

/// Writes `value` at `path` inside `current`.
///
/// Every intermediate segment must lead to an existing object member or
/// array element. The last segment inserts into an object or replaces an
/// existing array element.
pub fn assign_at_path(
    current: &mut Value,
    path: &[PathSegment],
    value: Value,
    target: &str,
) -> Result<(), EvalError> {
    let Some((last, intermediate)) = path.split_last() else {
        *current = value;
        return Ok(());
    };

    let mut current = current;
    for segment in intermediate {
        current = child_mut(current, segment)
            .ok_or_else(|| EvalError::InvalidAssignmentTarget(target.to_string()))?;
    }

    match (current, last) {
        (Value::Object(map), PathSegment::Field(key)) => {
            map.insert(key.clone(), value);
            Ok(())
        }
        (Value::Object(map), PathSegment::Index(n)) => {
            map.insert(n.to_string(), value);
            Ok(())
        }
        (Value::Array(items), PathSegment::Index(n)) => {
            let len = items.len();
            let index = resolve_index(*n, len).ok_or_else(|| {
                EvalError::AccessError(format!(
                    "Array index {n} out of bounds (length: {len}) in {target}"
                ))
            })?;
            items[index] = value;
            Ok(())
        }
        _ => Err(EvalError::InvalidAssignmentTarget(target.to_string())),
    }
}

fn child_mut<'v>(current: &'v mut Value, segment: &PathSegment) -> Option<&'v mut Value> {
    match (current, segment) {
        (Value::Object(map), PathSegment::Field(key)) => map.get_mut(key),
        (Value::Object(map), PathSegment::Index(n)) => map.get_mut(&n.to_string()),
        (Value::Array(items), PathSegment::Index(n)) => {
            let index = resolve_index(*n, items.len())?;
            items.get_mut(index)
        }
        _ => None,
    }
}

/// Maps a possibly negative index onto `0..len`.
pub(crate) fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let resolved = if index < 0 {
        len.checked_sub(usize::try_from(index.unsigned_abs()).ok()?)?
    } else {
        usize::try_from(index).ok()?
    };
    (resolved < len).then_some(resolved)
}
