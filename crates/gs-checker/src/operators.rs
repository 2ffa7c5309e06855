//! Operator typing (§4.6 "Operators"): numeric promotion, string/array
//! concatenation, comparisons and identity all collapsing to `bool`.
//!
//! Deliberately a small self-contained duplicate of `HostTypeDbProvider`'s
//! private numeric ranking rather than reaching into it — see DESIGN.md.

use gs_ast::{BinaryOp, UnaryOp};
use gs_types::TypeValue;

fn numeric_rank(name: &str) -> Option<u8> {
    match name {
        "int" => Some(0),
        "float" => Some(1),
        _ => None,
    }
}

/// `int + int -> int`, any float involved -> `float`, identical non-numeric
/// names pass through unchanged, otherwise `Variant`. Also used by the
/// engine's `CommonArg`/`CommonTwo` return-type-role handling (e.g. `min`,
/// `max`), where the promotion rule is the same one arithmetic uses.
pub fn promote_numeric(left: &str, right: &str) -> TypeValue {
    match (numeric_rank(left), numeric_rank(right)) {
        (Some(l), Some(r)) => TypeValue::concrete(if l.max(r) == 0 { "int" } else { "float" }),
        _ if left == right => TypeValue::concrete(left),
        _ => TypeValue::Variant,
    }
}

/// Parses an `"Array[T]"` display name into its element name.
fn array_element_name(name: &str) -> Option<&str> {
    name.strip_prefix("Array[").and_then(|rest| rest.strip_suffix(']'))
}

fn merge_array_concat(left: &str, right: &str) -> TypeValue {
    match (array_element_name(left), array_element_name(right)) {
        (Some(l), Some(r)) if l == r => TypeValue::concrete(format!("Array[{l}]")),
        (Some(l), Some(r)) => {
            let union = TypeValue::union_of([TypeValue::concrete(l), TypeValue::concrete(r)]);
            TypeValue::concrete(format!("Array[{}]", union.display_name()))
        }
        _ => TypeValue::concrete("Array"),
    }
}

pub fn resolve_binary(op: BinaryOp, left: &TypeValue, right: &TypeValue) -> TypeValue {
    use BinaryOp::*;
    match op {
        Eq | NotEq | Lt | LtEq | Gt | GtEq | And | Or => TypeValue::concrete("bool"),
        BitAnd | BitOr | BitXor | ShiftLeft | ShiftRight => TypeValue::concrete("int"),
        Add => {
            let l = left.display_name();
            let r = right.display_name();
            if l == "String" && r == "String" {
                TypeValue::concrete("String")
            } else if l.starts_with("Array") && r.starts_with("Array") {
                merge_array_concat(&l, &r)
            } else {
                promote_numeric(&l, &r)
            }
        }
        Sub | Mul | Div | Mod => promote_numeric(&left.display_name(), &right.display_name()),
    }
}

pub fn resolve_unary(op: UnaryOp, operand: &TypeValue) -> TypeValue {
    match op {
        UnaryOp::Neg => operand.clone(),
        UnaryOp::Not => TypeValue::concrete("bool"),
        UnaryOp::BitNot => TypeValue::concrete("int"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_plus_float_promotes_to_float() {
        let result = resolve_binary(BinaryOp::Add, &TypeValue::concrete("int"), &TypeValue::concrete("float"));
        assert_eq!(result.display_name(), "float");
    }

    #[test]
    fn string_concat_stays_string() {
        let result = resolve_binary(BinaryOp::Add, &TypeValue::concrete("String"), &TypeValue::concrete("String"));
        assert_eq!(result.display_name(), "String");
    }

    #[test]
    fn array_concat_merges_matching_elements() {
        let result = resolve_binary(
            BinaryOp::Add,
            &TypeValue::concrete("Array[int]"),
            &TypeValue::concrete("Array[int]"),
        );
        assert_eq!(result.display_name(), "Array[int]");
    }

    #[test]
    fn array_concat_unions_mismatched_elements() {
        let result = resolve_binary(
            BinaryOp::Add,
            &TypeValue::concrete("Array[int]"),
            &TypeValue::concrete("Array[String]"),
        );
        assert_eq!(result.display_name(), "Array[int | String]");
    }

    #[test]
    fn comparisons_are_always_bool() {
        let result = resolve_binary(BinaryOp::Lt, &TypeValue::concrete("int"), &TypeValue::concrete("float"));
        assert_eq!(result.display_name(), "bool");
    }

    #[test]
    fn unary_not_is_bool() {
        let result = resolve_unary(UnaryOp::Not, &TypeValue::concrete("int"));
        assert_eq!(result.display_name(), "bool");
    }
}
