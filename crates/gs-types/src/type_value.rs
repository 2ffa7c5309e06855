//! `TypeValue` — the sum type the engine reasons over internally.
//!
//! Display names (`"int | String"`) are a report-layer concern; internally
//! we hold the union as a set of branches so callers can inspect it instead
//! of re-parsing a pipe-joined string.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeValue {
    Concrete(String),
    /// The universal top/bottom type: assignable in both directions.
    Variant,
    Null,
    /// Flattened, deduplicated union of two or more branches.
    Union(Vec<TypeValue>),
}

impl TypeValue {
    pub fn concrete(name: impl Into<String>) -> Self {
        TypeValue::Concrete(name.into())
    }

    /// Builds a union from the given branches, flattening nested unions and
    /// deduplicating while preserving first-seen order.
    pub fn union_of(branches: impl IntoIterator<Item = TypeValue>) -> TypeValue {
        let mut flat: Vec<TypeValue> = Vec::new();
        fn push_flat(flat: &mut Vec<TypeValue>, v: TypeValue) {
            match v {
                TypeValue::Union(inner) => {
                    for b in inner {
                        push_flat(flat, b);
                    }
                }
                other => {
                    if !flat.contains(&other) {
                        flat.push(other);
                    }
                }
            }
        }
        for b in branches {
            push_flat(&mut flat, b);
        }
        match flat.len() {
            0 => TypeValue::Variant,
            1 => flat.into_iter().next().unwrap(),
            _ => TypeValue::Union(flat),
        }
    }

    /// Unifies a set of return-expression types per §4.6.2: a single type
    /// wins outright; one concrete type plus `null` widens to the concrete
    /// type (nullable-by-convention, not surfaced as a union); anything
    /// else becomes a display union.
    pub fn unify_return_types(types: impl IntoIterator<Item = TypeValue>) -> TypeValue {
        let mut seen: Vec<TypeValue> = Vec::new();
        for t in types {
            if !seen.contains(&t) {
                seen.push(t);
            }
        }
        match seen.len() {
            0 => TypeValue::Concrete("void".to_string()),
            1 => seen.into_iter().next().unwrap(),
            2 if seen.contains(&TypeValue::Null) => seen
                .into_iter()
                .find(|t| *t != TypeValue::Null)
                .unwrap_or(TypeValue::Null),
            _ => TypeValue::union_of(seen),
        }
    }

    pub fn is_variant(&self) -> bool {
        matches!(self, TypeValue::Variant)
    }

    /// The name string the name-level engine (`infer_type`) returns. Unions
    /// render as `A | B`; the node-level engine refuses to synthesize a
    /// `TypeNode` for these (§4.6.2) because the type grammar can't express
    /// them.
    pub fn display_name(&self) -> String {
        match self {
            TypeValue::Concrete(n) => n.clone(),
            TypeValue::Variant => "Variant".to_string(),
            TypeValue::Null => "null".to_string(),
            TypeValue::Union(branches) => branches
                .iter()
                .map(|b| b.display_name())
                .collect::<Vec<_>>()
                .join(" | "),
        }
    }

    pub fn is_union(&self) -> bool {
        matches!(self, TypeValue::Union(_))
    }
}

impl fmt::Display for TypeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_type_wins() {
        let t = TypeValue::unify_return_types([TypeValue::concrete("int")]);
        assert_eq!(t.display_name(), "int");
    }

    #[test]
    fn concrete_plus_null_widens_to_concrete() {
        let t = TypeValue::unify_return_types([TypeValue::concrete("String"), TypeValue::Null]);
        assert_eq!(t.display_name(), "String");
    }

    #[test]
    fn disagreeing_types_become_display_union() {
        let t =
            TypeValue::unify_return_types([TypeValue::concrete("int"), TypeValue::concrete("String")]);
        assert!(t.is_union());
        assert_eq!(t.display_name(), "int | String");
    }

    #[test]
    fn union_of_flattens_and_dedupes() {
        let t = TypeValue::union_of([
            TypeValue::union_of([TypeValue::concrete("int"), TypeValue::concrete("String")]),
            TypeValue::concrete("int"),
        ]);
        assert_eq!(t.display_name(), "int | String");
    }
}
