//! Host-Type DB Provider (§4.2). Loaded once from an embedded descriptor;
//! answers type/member queries for the host engine's own classes.

use gs_types::{
    MemberInfo, MergeTypeStrategy, MethodMember, ParameterInfo, Provider, PropertyMember,
    ReturnTypeRole, TypeInfo,
};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A versioned, serialised dump of the host engine's types (§6, "Consumed
/// interfaces"). The on-disk/wire format is an implementation detail; this
/// struct is only the in-memory shape the provider is built from.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HostTypeDescriptor {
    pub types: Vec<HostTypeEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HostTypeEntry {
    pub name: String,
    pub base_type: Option<String>,
    #[serde(default)]
    pub is_builtin_value: bool,
    #[serde(default)]
    pub is_singleton: bool,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub methods: Vec<HostMethodEntry>,
    #[serde(default)]
    pub properties: Vec<HostPropertyEntry>,
    #[serde(default)]
    pub constants: Vec<(String, String)>,
    #[serde(default)]
    pub signals: Vec<(String, Vec<String>)>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HostMethodEntry {
    pub name: String,
    /// Raw descriptor return-type notation, possibly generic
    /// (`"Array`1"` + `"Generic<[[Foo,...]]>"`-style); normalized via
    /// [`normalize_generic_return`] before it reaches `MethodMember`.
    pub return_type_raw: String,
    #[serde(default)]
    pub params: Vec<HostParamEntry>,
    #[serde(default)]
    pub is_static: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HostParamEntry {
    pub name: String,
    pub type_name: String,
    #[serde(default)]
    pub has_default: bool,
    #[serde(default)]
    pub is_params: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HostPropertyEntry {
    pub name: String,
    pub type_name: String,
    #[serde(default)]
    pub is_static: bool,
}

/// Rewrites raw descriptor generic notation into the `Array[Foo]` /
/// `Dictionary[K,V]` display form the engine uses everywhere else.
///
/// Handles the two shapes named in §4.2: a bare `Array\`1` arity suffix, and
/// a `Generic<[[Foo,...]]>` element-list form, the latter contributing the
/// bracketed element name(s).
pub fn normalize_generic_return(raw: &str) -> String {
    if let Some(open) = raw.find("Generic<[[") {
        let base = raw[..open].trim_end_matches(|c: char| c == '`' || c.is_ascii_digit());
        let base = base.trim_end_matches('`');
        let rest = &raw[open + "Generic<[[".len()..];
        let end = rest.find("]]").unwrap_or(rest.len());
        let elements_raw = &rest[..end];
        let elements: Vec<&str> = elements_raw
            .split(',')
            .map(|s| s.split("[[").next().unwrap_or(s).trim())
            .filter(|s| !s.is_empty())
            .collect();
        let base_name = if base.is_empty() { "Array" } else { base };
        return format!("{base_name}[{}]", elements.join(","));
    }
    if let Some(idx) = raw.find('`') {
        return raw[..idx].to_string();
    }
    raw.to_string()
}

fn merge_overloads(name: &str, overloads: &[HostMethodEntry]) -> MethodMember {
    let min_args = overloads
        .iter()
        .map(|o| o.params.iter().filter(|p| !p.has_default).count())
        .min()
        .unwrap_or(0);
    let max_args = overloads
        .iter()
        .map(|o| o.params.len())
        .max()
        .unwrap_or(0);
    let is_varargs = overloads
        .iter()
        .any(|o| o.params.last().map(|p| p.is_params).unwrap_or(false));
    let params = overloads
        .first()
        .map(|o| {
            o.params
                .iter()
                .map(|p| {
                    let mut pi = ParameterInfo::simple(p.name.clone(), p.type_name.clone());
                    pi.has_default = p.has_default;
                    pi.is_params = p.is_params;
                    pi
                })
                .collect()
        })
        .unwrap_or_default();
    let return_type_name = if overloads.len() <= 1 {
        overloads
            .first()
            .map(|o| normalize_generic_return(&o.return_type_raw))
            .unwrap_or_else(|| "Variant".to_string())
    } else {
        let distinct: Vec<String> = {
            let mut v: Vec<String> = overloads
                .iter()
                .map(|o| normalize_generic_return(&o.return_type_raw))
                .collect();
            v.dedup();
            v
        };
        distinct.join(" | ")
    };
    MethodMember {
        name: name.to_string(),
        return_type_name,
        min_args,
        max_args,
        is_varargs,
        is_static: overloads.first().map(|o| o.is_static).unwrap_or(false),
        is_abstract: false,
        parameters: params,
        return_type_role: None,
        merge_type_strategy: if overloads.len() > 1 {
            Some(MergeTypeStrategy::Union)
        } else {
            None
        },
    }
}

struct HostTypeData {
    info: TypeInfo,
}

pub struct HostTypeDbProvider {
    types: FxHashMap<String, HostTypeData>,
    global_functions: FxHashMap<String, MethodMember>,
}

/// Global functions whose signature the descriptor can't express cleanly:
/// variadic numeric functions and the return-type-role tags that redirect
/// their result to a function of the call's own arguments.
fn special_global_functions() -> Vec<(&'static str, MethodMember)> {
    let variadic_numeric = |name: &'static str, role: ReturnTypeRole| {
        (
            name,
            MethodMember {
                name: name.to_string(),
                return_type_name: "float".to_string(),
                min_args: 1,
                max_args: usize::MAX,
                is_varargs: true,
                is_static: true,
                is_abstract: false,
                parameters: vec![ParameterInfo {
                    name: "values".to_string(),
                    type_name: "Variant".to_string(),
                    has_default: false,
                    is_params: true,
                    callable_receives: None,
                    callable_returns: None,
                    callable_param_count: None,
                }],
                return_type_role: Some(role),
                merge_type_strategy: None,
            },
        )
    };
    vec![
        variadic_numeric("min", ReturnTypeRole::CommonArg),
        variadic_numeric("max", ReturnTypeRole::CommonArg),
        (
            "str",
            MethodMember {
                name: "str".to_string(),
                return_type_name: "String".to_string(),
                min_args: 0,
                max_args: usize::MAX,
                is_varargs: true,
                is_static: true,
                is_abstract: false,
                parameters: vec![],
                return_type_role: None,
                merge_type_strategy: None,
            },
        ),
        (
            "assert",
            MethodMember {
                name: "assert".to_string(),
                return_type_name: "void".to_string(),
                min_args: 1,
                max_args: 2,
                is_varargs: false,
                is_static: true,
                is_abstract: false,
                parameters: vec![ParameterInfo::simple("condition", "bool")],
                return_type_role: None,
                merge_type_strategy: None,
            },
        ),
    ]
}

impl HostTypeDbProvider {
    pub fn from_descriptor(descriptor: HostTypeDescriptor) -> Self {
        let mut types = FxHashMap::default();
        for entry in descriptor.types {
            let mut info = TypeInfo::new(entry.name.clone());
            info.base_type = entry.base_type;
            info.is_builtin_value = entry.is_builtin_value;
            info.is_singleton = entry.is_singleton;
            info.is_abstract = entry.is_abstract;

            let mut grouped: FxHashMap<&str, Vec<&HostMethodEntry>> = FxHashMap::default();
            for m in &entry.methods {
                grouped.entry(m.name.as_str()).or_default().push(m);
            }
            let mut method_names: Vec<&str> = grouped.keys().copied().collect();
            method_names.sort();
            for name in method_names {
                let owned: Vec<HostMethodEntry> =
                    grouped[name].iter().map(|m| (*m).clone()).collect();
                info.members
                    .push(MemberInfo::Method(merge_overloads(name, &owned)));
            }
            for p in &entry.properties {
                info.members.push(MemberInfo::Property(PropertyMember {
                    name: p.name.clone(),
                    type_name: p.type_name.clone(),
                    is_static: p.is_static,
                }));
            }
            for (name, type_name) in &entry.constants {
                info.members.push(MemberInfo::Constant(gs_types::ConstantMember {
                    name: name.clone(),
                    type_name: type_name.clone(),
                    initializer_ast: None,
                }));
            }
            for (name, params) in &entry.signals {
                info.members.push(MemberInfo::Signal(gs_types::SignalMember {
                    name: name.clone(),
                    parameter_type_names: params.clone(),
                }));
            }

            types.insert(entry.name.clone(), HostTypeData { info });
        }

        let global_functions = special_global_functions()
            .into_iter()
            .map(|(name, member)| (name.to_string(), member))
            .collect();

        Self {
            types,
            global_functions,
        }
    }

    fn numeric_rank(name: &str) -> Option<u8> {
        match name {
            "int" => Some(0),
            "float" => Some(1),
            _ => None,
        }
    }
}

impl Provider for HostTypeDbProvider {
    fn get_type_info(&self, name: &str) -> Option<TypeInfo> {
        self.types.get(name).map(|d| d.info.clone())
    }

    fn get_member(&self, type_name: &str, member: &str) -> Option<MemberInfo> {
        self.types.get(type_name)?.info.member(member).cloned()
    }

    fn is_assignable_to(&self, source: &str, target: &str) -> bool {
        if source == target {
            return true;
        }
        match (source, target) {
            ("null", _) => true,
            (_, "Variant") => true,
            ("Variant", _) => true,
            ("int", "float") => true,
            ("String", "StringName") | ("StringName", "String") => true,
            _ => {
                if let (Some(s), Some(t)) = (Self::numeric_rank(source), Self::numeric_rank(target))
                {
                    return s <= t;
                }
                // Generic-of-T is assignable to its raw generic container.
                if let Some(bracket) = source.find('[') {
                    if source[..bracket] == *target {
                        return true;
                    }
                }
                false
            }
        }
    }

    fn get_global_function(&self, name: &str) -> Option<MemberInfo> {
        self.global_functions
            .get(name)
            .cloned()
            .map(MemberInfo::Method)
    }

    fn is_builtin(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    fn get_all_types(&self) -> Vec<String> {
        self.types.keys().cloned().collect()
    }

    fn find_types_with_method(&self, method: &str) -> Vec<String> {
        self.types
            .iter()
            .filter(|(_, d)| d.info.member(method).map(|m| m.as_method().is_some()).unwrap_or(false))
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn find_types_with_property(&self, property: &str) -> Vec<String> {
        self.types
            .iter()
            .filter(|(_, d)| {
                matches!(d.info.member(property), Some(MemberInfo::Property(_)))
            })
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_generic_backtick_arity() {
        assert_eq!(normalize_generic_return("Array`1"), "Array");
    }

    #[test]
    fn normalizes_generic_element_list() {
        let raw = "Array`1Generic<[[Foo, System.Object]]>";
        assert_eq!(normalize_generic_return(raw), "Array[Foo]");
    }

    #[test]
    fn self_link_guarded_base_returns_none() {
        let descriptor = HostTypeDescriptor {
            types: vec![HostTypeEntry {
                name: "Object".to_string(),
                base_type: Some("Object".to_string()),
                is_builtin_value: false,
                is_singleton: false,
                is_abstract: false,
                methods: vec![],
                properties: vec![],
                constants: vec![],
                signals: vec![],
            }],
        };
        let db = HostTypeDbProvider::from_descriptor(descriptor);
        assert_eq!(db.get_base_type("Object"), None);
    }

    #[test]
    fn numeric_promotion_is_one_directional() {
        let db = HostTypeDbProvider::from_descriptor(HostTypeDescriptor::default());
        assert!(db.is_assignable_to("int", "float"));
        assert!(!db.is_assignable_to("float", "int"));
    }
}
