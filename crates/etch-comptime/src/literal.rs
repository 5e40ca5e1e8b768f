//! Conversions between a folded runtime [`Value`] and the literal
//! [`Expr`]/[`Type`] nodes it gets re-embedded as (spec.md §4.3 operations
//! 2-3).

use etch_ast::{Expr, ExprKind, Pos, Type};
use etch_vm::{Heap, HeapObject, Value};

use crate::error::ComptimeError;

/// Turn a fully-evaluated [`Value`] back into a literal [`Expr`]. Arrays
/// are reconstructed recursively by reading their elements out of `heap`;
/// a live `Ref` has no literal form (embedding its heap index into the AST
/// would outlive the ephemeral VM it came from) and is rejected.
pub fn value_to_literal(value: &Value, heap: &Heap, pos: &Pos) -> Result<Expr, ComptimeError> {
    let kind = match value {
        Value::Int(i) => ExprKind::Int(*i),
        Value::Float(f) => ExprKind::Float(*f),
        Value::Bool(b) => ExprKind::Bool(*b),
        Value::Char(c) => ExprKind::Char(*c),
        Value::Str(s) => ExprKind::Str(s.to_string()),
        Value::Nil => ExprKind::Nil,
        Value::Array(idx) => {
            let elems = match heap.get(*idx).map_err(|_| ComptimeError::UnrepresentableValue(pos.clone(), "array"))? {
                HeapObject::Array(elems) => elems.clone(),
                HeapObject::Cell(_) => return Err(ComptimeError::UnrepresentableValue(pos.clone(), "array")),
            };
            let mut literals = Vec::with_capacity(elems.len());
            for elem in &elems {
                literals.push(value_to_literal(elem, heap, pos)?);
            }
            ExprKind::Array(literals)
        }
        Value::Ref(_) => return Err(ComptimeError::UnrepresentableValue(pos.clone(), "reference")),
        Value::Void => return Err(ComptimeError::UnrepresentableValue(pos.clone(), "void")),
    };
    Ok(Expr::new(pos.clone(), kind))
}

/// Parse the `typeName` string argument of an `inject` call into a [`Type`].
/// Supports the primitive names plus `array[...]` and `ref[...]` wrapping,
/// which is all `inject`'s documented signature (spec.md §6) needs.
pub fn parse_type_name(name: &str) -> Option<Type> {
    match name {
        "void" => return Some(Type::Void),
        "bool" => return Some(Type::Bool),
        "int" => return Some(Type::Int),
        "float" => return Some(Type::Float),
        "string" => return Some(Type::String),
        "char" => return Some(Type::Char),
        _ => {}
    }
    if let Some(inner) = strip_wrapper(name, "array[", "]") {
        return parse_type_name(inner).map(|t| Type::Array(Box::new(t)));
    }
    if let Some(inner) = strip_wrapper(name, "ref[", "]") {
        return parse_type_name(inner).map(|t| Type::Ref(Box::new(t)));
    }
    None
}

fn strip_wrapper<'a>(name: &'a str, prefix: &str, suffix: &str) -> Option<&'a str> {
    name.strip_prefix(prefix)?.strip_suffix(suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_primitive_type_names() {
        assert_eq!(parse_type_name("int"), Some(Type::Int));
        assert_eq!(parse_type_name("string"), Some(Type::String));
    }

    #[test]
    fn parses_one_level_of_array_wrapping() {
        assert_eq!(parse_type_name("array[int]"), Some(Type::Array(Box::new(Type::Int))));
    }

    #[test]
    fn unknown_type_name_is_none() {
        assert_eq!(parse_type_name("frobnicate"), None);
    }

    #[test]
    fn int_value_round_trips_to_a_literal() {
        let heap = Heap::new();
        let lit = value_to_literal(&Value::Int(7), &heap, &Pos::synthetic()).unwrap();
        assert_eq!(lit.kind, ExprKind::Int(7));
    }

    #[test]
    fn array_value_round_trips_recursively() {
        let mut heap = Heap::new();
        let idx = heap.alloc(HeapObject::Array(vec![Value::Int(1), Value::Int(2)]));
        let lit = value_to_literal(&Value::Array(idx), &heap, &Pos::synthetic()).unwrap();
        assert_eq!(
            lit.kind,
            ExprKind::Array(vec![
                Expr::new(Pos::synthetic(), ExprKind::Int(1)),
                Expr::new(Pos::synthetic(), ExprKind::Int(2)),
            ])
        );
    }

    #[test]
    fn a_reference_value_cannot_be_re_embedded() {
        let mut heap = Heap::new();
        let idx = heap.alloc(HeapObject::Cell(Value::Int(1)));
        assert!(value_to_literal(&Value::Ref(idx), &heap, &Pos::synthetic()).is_err());
    }
}
