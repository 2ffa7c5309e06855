//! Composite Provider (§4.1): ordered federation of type-information
//! sources behind one `Provider` interface.

use gs_types::{MemberInfo, Provider, TypeInfo};
use indexmap::IndexSet;
use rustc_hash::FxHashSet;
use std::sync::Arc;

pub struct CompositeProvider {
    children: Vec<Arc<dyn Provider>>,
}

impl CompositeProvider {
    pub fn new(children: Vec<Arc<dyn Provider>>) -> Self {
        Self { children }
    }

    /// Assembles the canonical `[Host, Project, Autoloads, Scene,
    /// DefaultFallback]` ordering (§4.1).
    pub fn standard(
        host: Arc<dyn Provider>,
        project: Arc<dyn Provider>,
        autoloads: Arc<dyn Provider>,
        scene: Arc<dyn Provider>,
        fallback: Arc<dyn Provider>,
    ) -> Self {
        Self::new(vec![host, project, autoloads, scene, fallback])
    }

    /// Walks `source`'s base chain across *every* child provider, not only
    /// the one that owns `source`, accumulating a visited set so a cycle
    /// aborts rather than loops (§4.1 step 4).
    fn cross_provider_base_walk(&self, source: &str, target: &str) -> bool {
        let mut visited: FxHashSet<String> = FxHashSet::default();
        let mut current = source.to_string();
        loop {
            if !visited.insert(current.clone()) {
                return false;
            }
            let Some(base) = self.get_base_type(&current) else {
                return false;
            };
            if base == target {
                return true;
            }
            current = base;
        }
    }
}

impl Provider for CompositeProvider {
    fn is_known_type(&self, name: &str) -> bool {
        self.children.iter().any(|c| c.is_known_type(name))
    }

    fn get_type_info(&self, name: &str) -> Option<TypeInfo> {
        self.children.iter().find_map(|c| c.get_type_info(name))
    }

    fn get_member(&self, type_name: &str, member: &str) -> Option<MemberInfo> {
        self.children.iter().find_map(|c| c.get_member(type_name, member))
    }

    fn get_base_type(&self, type_name: &str) -> Option<String> {
        self.children.iter().find_map(|c| c.get_base_type(type_name))
    }

    fn is_assignable_to(&self, source: &str, target: &str) -> bool {
        if source.is_empty() || target.is_empty() {
            return false;
        }
        if source == target {
            return true;
        }
        if self.children.iter().any(|c| c.is_assignable_to(source, target)) {
            return true;
        }
        self.cross_provider_base_walk(source, target)
    }

    fn get_global_function(&self, name: &str) -> Option<MemberInfo> {
        self.children.iter().find_map(|c| c.get_global_function(name))
    }

    fn get_global_class(&self, name: &str) -> Option<TypeInfo> {
        self.children.iter().find_map(|c| c.get_global_class(name))
    }

    fn is_builtin(&self, name: &str) -> bool {
        self.children.iter().any(|c| c.is_builtin(name))
    }

    fn is_builtin_value_type(&self, name: &str) -> bool {
        self.children.iter().any(|c| c.is_builtin_value_type(name))
    }

    fn get_all_types(&self) -> Vec<String> {
        let mut set: IndexSet<String> = IndexSet::new();
        for child in &self.children {
            set.extend(child.get_all_types());
        }
        set.into_iter().collect()
    }

    fn find_types_with_method(&self, method: &str) -> Vec<String> {
        let mut set: IndexSet<String> = IndexSet::new();
        for child in &self.children {
            set.extend(child.find_types_with_method(method));
        }
        set.into_iter().collect()
    }

    fn find_types_with_property(&self, property: &str) -> Vec<String> {
        let mut set: IndexSet<String> = IndexSet::new();
        for child in &self.children {
            set.extend(child.find_types_with_property(property));
        }
        set.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::default_fallback::DefaultFallbackProvider;
    use crate::host_db::{HostTypeDbProvider, HostTypeDescriptor, HostTypeEntry};

    fn host_with_chain() -> HostTypeDbProvider {
        HostTypeDbProvider::from_descriptor(HostTypeDescriptor {
            types: vec![
                HostTypeEntry {
                    name: "Node".to_string(),
                    base_type: Some("Object".to_string()),
                    is_builtin_value: false,
                    is_singleton: false,
                    is_abstract: false,
                    methods: vec![],
                    properties: vec![],
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
        })
    }

    #[test]
    fn assignable_via_cross_provider_base_walk() {
        let composite = CompositeProvider::new(vec![
            Arc::new(host_with_chain()),
            Arc::new(DefaultFallbackProvider::new()),
        ]);
        assert!(composite.is_assignable_to("Node", "Object"));
        assert!(!composite.is_assignable_to("Object", "Node"));
    }

    #[test]
    fn empty_name_never_assignable() {
        let composite = CompositeProvider::new(vec![Arc::new(host_with_chain())]);
        assert!(!composite.is_assignable_to("", "Object"));
    }

    #[test]
    fn get_all_types_is_deduplicated_union() {
        let composite = CompositeProvider::new(vec![
            Arc::new(host_with_chain()),
            Arc::new(DefaultFallbackProvider::new()),
        ]);
        let all = composite.get_all_types();
        let unique: FxHashSet<&String> = all.iter().collect();
        assert_eq!(all.len(), unique.len());
    }
}
