//! Type-system data model shared by every provider and by the inference
//! engine: `TypeInfo`, `MemberInfo`, `ParameterInfo`, the `Provider`
//! capability trait, and the internal `TypeValue` sum type.

pub mod member;
pub mod provider;
pub mod type_info;
pub mod type_value;

pub use member::{
    ConstantMember, MemberInfo, MergeTypeStrategy, MethodMember, ParameterInfo, PropertyMember,
    ReturnTypeRole, SignalMember,
};
pub use provider::Provider;
pub use type_info::{Confidence, InferredType, TypeInfo};
pub use type_value::TypeValue;
