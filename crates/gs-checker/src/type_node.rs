//! AST-shaped type values for `infer_type_node` (§4.6, public surface).
//!
//! Unlike the name-level engine, this grammar cannot express a union — the
//! rule from §4.6.2 is enforced by `parse` simply refusing to build a node
//! for any name containing `|`, and callers are expected to fall back to
//! `None` for those positions rather than trying to invent a shape.

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeNode {
    Simple(String),
    Array(Box<TypeNode>),
    Dictionary(Box<TypeNode>, Box<TypeNode>),
    Callable {
        params: Vec<TypeNode>,
        returns: Box<TypeNode>,
    },
}

impl TypeNode {
    pub fn simple(name: impl Into<String>) -> Self {
        TypeNode::Simple(name.into())
    }

    /// Parses a display-name string (e.g. `"Array[int]"`,
    /// `"Dictionary[String,int]"`, `"Callable[[int,String], bool]"`) into a
    /// `TypeNode`. Returns `None` for union names (`"int | String"`), per
    /// the type-node grammar's explicit inability to represent them.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() || name.contains('|') {
            return None;
        }
        if let Some(rest) = name.strip_prefix("Array[").and_then(|r| r.strip_suffix(']')) {
            return Some(TypeNode::Array(Box::new(TypeNode::parse(rest)?)));
        }
        if let Some(rest) = name.strip_prefix("Dictionary[").and_then(|r| r.strip_suffix(']')) {
            let parts = split_top_level_comma(rest);
            if parts.len() != 2 {
                return None;
            }
            let key = TypeNode::parse(parts[0].trim())?;
            let value = TypeNode::parse(parts[1].trim())?;
            return Some(TypeNode::Dictionary(Box::new(key), Box::new(value)));
        }
        if let Some(rest) = name.strip_prefix("Callable[[") {
            let close_params = rest.find("],")?;
            let params_text = &rest[..close_params];
            let remainder = rest[close_params + 2..].trim();
            let returns_text = remainder.strip_suffix(']')?;
            let params = if params_text.trim().is_empty() {
                Vec::new()
            } else {
                split_top_level_comma(params_text)
                    .into_iter()
                    .map(|p| TypeNode::parse(p.trim()))
                    .collect::<Option<Vec<_>>>()?
            };
            let returns = TypeNode::parse(returns_text.trim())?;
            return Some(TypeNode::Callable {
                params,
                returns: Box::new(returns),
            });
        }
        Some(TypeNode::Simple(name.to_string()))
    }

    pub fn display_name(&self) -> String {
        match self {
            TypeNode::Simple(name) => name.clone(),
            TypeNode::Array(element) => format!("Array[{}]", element.display_name()),
            TypeNode::Dictionary(key, value) => {
                format!("Dictionary[{},{}]", key.display_name(), value.display_name())
            }
            TypeNode::Callable { params, returns } => {
                let params_str: Vec<String> = params.iter().map(TypeNode::display_name).collect();
                format!("Callable[[{}], {}]", params_str.join(","), returns.display_name())
            }
        }
    }
}

/// Splits on commas that are not nested inside `[...]`, so
/// `Dictionary[String,Array[int]]`'s inner list splits into
/// `["String", "Array[int]"]` rather than three pieces.
fn split_top_level_comma(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (idx, ch) in text.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&text[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_name_round_trips() {
        let node = TypeNode::parse("int").unwrap();
        assert_eq!(node, TypeNode::Simple("int".to_string()));
        assert_eq!(node.display_name(), "int");
    }

    #[test]
    fn array_of_array_parses() {
        let node = TypeNode::parse("Array[Array[int]]").unwrap();
        assert_eq!(node.display_name(), "Array[Array[int]]");
    }

    #[test]
    fn dictionary_with_nested_array_value() {
        let node = TypeNode::parse("Dictionary[String,Array[int]]").unwrap();
        match &node {
            TypeNode::Dictionary(k, v) => {
                assert_eq!(k.display_name(), "String");
                assert_eq!(v.display_name(), "Array[int]");
            }
            _ => panic!("expected Dictionary"),
        }
    }

    #[test]
    fn callable_shape_parses() {
        let node = TypeNode::parse("Callable[[int,String], bool]").unwrap();
        assert_eq!(node.display_name(), "Callable[[int,String], bool]");
    }

    #[test]
    fn union_name_refuses_to_parse() {
        assert_eq!(TypeNode::parse("int | String"), None);
    }
}
