//! `MemberInfo` and friends — the tagged-variant member model shared by
//! every provider (§3 Data model).

use gs_ast::NodeId;
use serde::{Deserialize, Serialize};

/// Redirects return-type computation away from a method's declared return,
/// toward something derivable from the caller or its arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnTypeRole {
    /// `Array[T].front()` -> `T`
    Element,
    /// `Dictionary[K,V]` key type
    Key,
    /// `Dictionary[K,V].get(k)` -> `V`
    Value,
    /// Builder-style methods that return the receiver's own type.
    SelfType,
    /// `Dictionary[K,V].keys()` -> `Array[K]`
    KeysArray,
    /// `Dictionary[K,V].values()` -> `Array[V]`
    ValuesArray,
    /// `Callable[[...], R].call()` -> `R`
    CallableReturnArray,
    /// Return type equals the type of argument 0.
    FirstArg,
    /// Return type is the numeric/common-base promotion of all arguments.
    CommonArg,
    /// Return type is the common-base promotion of exactly two arguments
    /// (e.g. `min(a, b)`).
    CommonTwo,
}

/// How to combine return types across overloads of the same global
/// function/method name when more than one overload could apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeTypeStrategy {
    /// Build a display union of every overload's return type.
    Union,
    /// Promote to the common numeric/base type shared by every overload.
    CommonBase,
    /// Keep the first overload's return type.
    First,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterInfo {
    pub name: String,
    pub type_name: String,
    pub has_default: bool,
    /// Rest/variadic parameter (`...args`).
    pub is_params: bool,
    /// For a higher-order parameter like `filter(pred: (T) -> bool)`: the
    /// types the callable receives.
    pub callable_receives: Option<Vec<String>>,
    /// ...and the type it returns.
    pub callable_returns: Option<String>,
    pub callable_param_count: Option<usize>,
}

impl ParameterInfo {
    pub fn simple(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            has_default: false,
            is_params: false,
            callable_receives: None,
            callable_returns: None,
            callable_param_count: None,
        }
    }

    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodMember {
    pub name: String,
    pub return_type_name: String,
    pub min_args: usize,
    pub max_args: usize,
    pub is_varargs: bool,
    pub is_static: bool,
    pub is_abstract: bool,
    pub parameters: Vec<ParameterInfo>,
    pub return_type_role: Option<ReturnTypeRole>,
    pub merge_type_strategy: Option<MergeTypeStrategy>,
}

impl MethodMember {
    /// `min_args`/`max_args` computed by counting parameters without a
    /// default (discipline (b) of Open Question 2 — see DESIGN.md).
    pub fn from_parameters(
        name: impl Into<String>,
        return_type_name: impl Into<String>,
        parameters: Vec<ParameterInfo>,
    ) -> Self {
        let min_args = parameters.iter().filter(|p| !p.has_default).count();
        let max_args = parameters.len();
        let is_varargs = parameters.last().map(|p| p.is_params).unwrap_or(false);
        Self {
            name: name.into(),
            return_type_name: return_type_name.into(),
            min_args,
            max_args,
            is_varargs,
            is_static: false,
            is_abstract: false,
            parameters,
            return_type_role: None,
            merge_type_strategy: None,
        }
    }

    pub fn with_role(mut self, role: ReturnTypeRole) -> Self {
        self.return_type_role = Some(role);
        self
    }

    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyMember {
    pub name: String,
    pub type_name: String,
    pub is_static: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantMember {
    pub name: String,
    pub type_name: String,
    /// Back-reference to the initializer expression, kept so a constant's
    /// literal value can be read during lazy inference (e.g. a dictionary
    /// key lookup) without re-parsing.
    #[serde(skip)]
    pub initializer_ast: Option<NodeId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalMember {
    pub name: String,
    pub parameter_type_names: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberInfo {
    Method(MethodMember),
    Property(PropertyMember),
    Constant(ConstantMember),
    Signal(SignalMember),
}

impl MemberInfo {
    pub fn name(&self) -> &str {
        match self {
            MemberInfo::Method(m) => &m.name,
            MemberInfo::Property(p) => &p.name,
            MemberInfo::Constant(c) => &c.name,
            MemberInfo::Signal(s) => &s.name,
        }
    }

    /// The type a bare reference to this member (no call) evaluates to.
    /// Matches §4.6 "Method identifiers used without a call evaluate to
    /// `Callable`".
    pub fn value_type_name(&self) -> String {
        match self {
            MemberInfo::Method(_) => "Callable".to_string(),
            MemberInfo::Property(p) => p.type_name.clone(),
            MemberInfo::Constant(c) => c.type_name.clone(),
            MemberInfo::Signal(_) => "Signal".to_string(),
        }
    }

    pub fn as_method(&self) -> Option<&MethodMember> {
        match self {
            MemberInfo::Method(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_signal(&self) -> Option<&SignalMember> {
        match self {
            MemberInfo::Signal(s) => Some(s),
            _ => None,
        }
    }
}
