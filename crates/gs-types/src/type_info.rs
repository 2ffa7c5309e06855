use crate::member::MemberInfo;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub name: String,
    pub base_type: Option<String>,
    pub is_builtin_value: bool,
    pub is_singleton: bool,
    pub is_abstract: bool,
    /// Ordered so consumers that display members (IDE completion) get a
    /// stable, source-faithful order; lookups still go through `member()`.
    pub members: Vec<MemberInfo>,
}

impl TypeInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_type: None,
            is_builtin_value: false,
            is_singleton: false,
            is_abstract: false,
            members: Vec::new(),
        }
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base_type = Some(base.into());
        self
    }

    pub fn with_member(mut self, member: MemberInfo) -> Self {
        self.members.push(member);
        self
    }

    pub fn member(&self, name: &str) -> Option<&MemberInfo> {
        self.members.iter().find(|m| m.name() == name)
    }
}

/// Consumer-facing confidence qualifier (§3, "InferredType"). The engine's
/// own cache stores only the type name; confidence is computed when a
/// result crosses into a report or tooltip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    Certain,
    High,
    Medium,
    Low,
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferredType {
    pub type_name: String,
    pub confidence: Confidence,
    pub reason: String,
}
