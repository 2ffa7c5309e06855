//! DefaultFallbackProvider: the last child in the canonical Composite
//! ordering (§4.1). Owns the primitive and built-in container methods the
//! host descriptor doesn't carry — `Array`/`Dictionary`/packed-array/string
//! method shapes the engine's return-type-role machinery (§3, §4.6) needs
//! to resolve element/key/value types without a descriptor round-trip.

use gs_types::{MemberInfo, MethodMember, ParameterInfo, Provider, ReturnTypeRole, TypeInfo};
use rustc_hash::FxHashMap;

pub struct DefaultFallbackProvider {
    types: FxHashMap<&'static str, TypeInfo>,
}

impl Default for DefaultFallbackProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultFallbackProvider {
    pub fn new() -> Self {
        let mut types = FxHashMap::default();
        types.insert("bool", builtin_value("bool"));
        types.insert("int", builtin_value("int"));
        types.insert("float", builtin_value("float"));
        types.insert("String", string_type());
        types.insert("StringName", builtin_value("StringName"));
        types.insert("Array", array_type("Array", None));
        types.insert("Dictionary", dictionary_type());
        types.insert("Callable", callable_type());
        types.insert("Signal", builtin_value("Signal"));
        types.insert("NodePath", builtin_value("NodePath"));
        for (name, element) in PACKED_ARRAYS {
            types.insert(name, array_type(name, Some(element)));
        }
        Self { types }
    }
}

const PACKED_ARRAYS: &[(&str, &str)] = &[
    ("PackedByteArray", "int"),
    ("PackedInt32Array", "int"),
    ("PackedInt64Array", "int"),
    ("PackedFloat32Array", "float"),
    ("PackedFloat64Array", "float"),
    ("PackedStringArray", "String"),
    ("PackedVector2Array", "Vector2"),
    ("PackedVector3Array", "Vector3"),
    ("PackedColorArray", "Color"),
];

fn builtin_value(name: &str) -> TypeInfo {
    let mut info = TypeInfo::new(name);
    info.is_builtin_value = true;
    info
}

fn string_type() -> TypeInfo {
    let mut info = builtin_value("String");
    info.members.push(MemberInfo::Method(
        MethodMember::from_parameters("length", "int", vec![]).with_static(false),
    ));
    info
}

/// `element = None` models the untyped `Array`; packed/typed arrays pass
/// their fixed element type so `front`/`back`/`[]` resolve without the
/// caller's own `Array[T]` annotation.
fn array_type(name: &'static str, element: Option<&'static str>) -> TypeInfo {
    let elem_name = element.unwrap_or("Variant");
    let mut info = builtin_value(name);
    for method in ["front", "back", "pop_back", "pop_front"] {
        info.members.push(MemberInfo::Method(
            MethodMember::from_parameters(method, elem_name, vec![]).with_role(ReturnTypeRole::Element),
        ));
    }
    info.members.push(MemberInfo::Method(MethodMember::from_parameters(
        "size",
        "int",
        vec![],
    )));
    info.members.push(MemberInfo::Method(
        MethodMember::from_parameters("append", "void", vec![ParameterInfo::simple("value", elem_name)]),
    ));
    info.members.push(MemberInfo::Method(
        MethodMember::from_parameters("has", "bool", vec![ParameterInfo::simple("value", elem_name)]),
    ));
    info.members.push(MemberInfo::Method(
        MethodMember::from_parameters("duplicate", name, vec![]).with_role(ReturnTypeRole::SelfType),
    ));
    info
}

fn dictionary_type() -> TypeInfo {
    let mut info = builtin_value("Dictionary");
    info.members.push(MemberInfo::Method(
        MethodMember::from_parameters("get", "Variant", vec![ParameterInfo::simple("key", "Variant")])
            .with_role(ReturnTypeRole::Value),
    ));
    info.members.push(MemberInfo::Method(
        MethodMember::from_parameters("keys", "Array", vec![]).with_role(ReturnTypeRole::KeysArray),
    ));
    info.members.push(MemberInfo::Method(
        MethodMember::from_parameters("values", "Array", vec![]).with_role(ReturnTypeRole::ValuesArray),
    ));
    info.members.push(MemberInfo::Method(MethodMember::from_parameters(
        "size",
        "int",
        vec![],
    )));
    info.members.push(MemberInfo::Method(
        MethodMember::from_parameters("has", "bool", vec![ParameterInfo::simple("key", "Variant")]),
    ));
    info
}

fn callable_type() -> TypeInfo {
    let mut info = builtin_value("Callable");
    info.members.push(MemberInfo::Method(
        MethodMember::from_parameters("call", "Variant", vec![])
            .with_role(ReturnTypeRole::CallableReturnArray),
    ));
    info.members.push(MemberInfo::Method(
        MethodMember::from_parameters("callv", "Variant", vec![ParameterInfo::simple("args", "Array")])
            .with_role(ReturnTypeRole::CallableReturnArray),
    ));
    info
}

impl Provider for DefaultFallbackProvider {
    fn get_type_info(&self, name: &str) -> Option<TypeInfo> {
        self.types.get(name).cloned()
    }

    fn get_member(&self, type_name: &str, member: &str) -> Option<MemberInfo> {
        self.types.get(type_name)?.member(member).cloned()
    }

    fn is_assignable_to(&self, source: &str, target: &str) -> bool {
        source == target
    }

    fn is_builtin(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    fn is_builtin_value_type(&self, name: &str) -> bool {
        self.types.get(name).map(|t| t.is_builtin_value).unwrap_or(false)
    }

    fn get_all_types(&self) -> Vec<String> {
        self.types.keys().map(|s| s.to_string()).collect()
    }

    fn find_types_with_method(&self, method: &str) -> Vec<String> {
        self.types
            .iter()
            .filter(|(_, info)| info.member(method).is_some())
            .map(|(name, _)| name.to_string())
            .collect()
    }

    fn find_types_with_property(&self, _property: &str) -> Vec<String> {
        Vec::new()
    }
}
