//! `Provider` — the capability set every type-information source
//! implements (§3). Default methods return `None`/empty so a provider only
//! needs to override the capabilities it actually owns.

use crate::member::MemberInfo;
use crate::type_info::TypeInfo;

pub trait Provider: Send + Sync {
    fn is_known_type(&self, name: &str) -> bool {
        self.get_type_info(name).is_some()
    }

    fn get_type_info(&self, _name: &str) -> Option<TypeInfo> {
        None
    }

    fn get_member(&self, _type_name: &str, _member: &str) -> Option<MemberInfo> {
        None
    }

    fn get_base_type(&self, type_name: &str) -> Option<String> {
        let base = self.get_type_info(type_name)?.base_type?;
        // Guards the root class against self-linkage (§4.2).
        if base == type_name {
            None
        } else {
            Some(base)
        }
    }

    /// Provider-specific conversion rule (e.g. `int -> float`, `null ->
    /// any`, `String <-> StringName`, generic-of-T -> raw generic). Does
    /// NOT need to walk base chains; the Composite does that separately.
    fn is_assignable_to(&self, source: &str, target: &str) -> bool {
        source == target
    }

    fn get_global_function(&self, _name: &str) -> Option<MemberInfo> {
        None
    }

    fn get_global_class(&self, name: &str) -> Option<TypeInfo> {
        self.get_type_info(name)
    }

    fn is_builtin(&self, _name: &str) -> bool {
        false
    }

    fn is_builtin_value_type(&self, name: &str) -> bool {
        self.get_type_info(name)
            .map(|t| t.is_builtin_value)
            .unwrap_or(false)
    }

    fn get_all_types(&self) -> Vec<String> {
        Vec::new()
    }

    fn find_types_with_method(&self, _method: &str) -> Vec<String> {
        Vec::new()
    }

    fn find_types_with_property(&self, _property: &str) -> Vec<String> {
        Vec::new()
    }
}
