//! Cross-provider member lookup through inheritance (§4.1 "Member lookup").
//!
//! `Composite::get_member` only returns the first child's direct answer;
//! walking the base chain is deliberately left to the engine so each
//! provider stays simple while still composing into full inheritance.

use gs_types::{MemberInfo, Provider};
use rustc_hash::FxHashSet;

/// Walks `type_name`'s base chain via `provider.get_base_type`, returning
/// the first `(declaring_type, member)` hit. Guarded against cycles with a
/// visited set (§8 property 4 and 5: self-links and bounded chains).
pub fn find_member_with_inheritance(
    provider: &dyn Provider,
    type_name: &str,
    member: &str,
) -> Option<(String, MemberInfo)> {
    let mut current = type_name.to_string();
    let mut visited: FxHashSet<String> = FxHashSet::default();
    loop {
        if !visited.insert(current.clone()) {
            return None;
        }
        if let Some(m) = provider.get_member(&current, member) {
            return Some((current, m));
        }
        current = provider.get_base_type(&current)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gs_providers::{CompositeProvider, DefaultFallbackProvider, HostTypeDbProvider, HostTypeDescriptor, HostTypeEntry};
    use std::sync::Arc;

    fn composite_with_chain() -> CompositeProvider {
        let host = HostTypeDbProvider::from_descriptor(HostTypeDescriptor {
            types: vec![
                HostTypeEntry {
                    name: "Node".to_string(),
                    base_type: Some("Object".to_string()),
                    is_builtin_value: false,
                    is_singleton: false,
                    is_abstract: false,
                    methods: vec![],
                    properties: vec![gs_providers::host_db::HostPropertyEntry {
                        name: "position".to_string(),
                        type_name: "Vector2".to_string(),
                        is_static: false,
                    }],
                    constants: vec![],
                    signals: vec![],
                },
                HostTypeEntry {
                    name: "Object".to_string(),
                    base_type: None,
                    is_builtin_value: false,
                    is_singleton: false,
                    is_abstract: false,
                    methods: vec![],
                    properties: vec![],
                    constants: vec![],
                    signals: vec![],
                },
            ],
        });
        CompositeProvider::new(vec![Arc::new(host), Arc::new(DefaultFallbackProvider::new())])
    }

    #[test]
    fn finds_member_one_level_up() {
        let composite = composite_with_chain();
        let (declaring, member) = find_member_with_inheritance(&composite, "Node", "position").unwrap();
        assert_eq!(declaring, "Node");
        assert_eq!(member.name(), "position");
    }

    #[test]
    fn missing_member_returns_none() {
        let composite = composite_with_chain();
        assert!(find_member_with_inheritance(&composite, "Object", "position").is_none());
    }
}
