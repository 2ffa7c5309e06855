//! JSON-facing report structures (§6 "Produced"). Layout is normative:
//! camelCase field names, null fields omitted.

use gs_types::Confidence;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InferredUnionType {
    pub types: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub common_base_type: Option<String>,
    pub effective_type: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterInferenceReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explicit_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inferred_union_type: Option<InferredUnionType>,
    pub call_sites: Vec<String>,
    pub confidence: Confidence,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnInferenceReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explicit_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inferred_union_type: Option<InferredUnionType>,
    pub confidence: Confidence,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodInferenceReport {
    pub class_name: String,
    pub method_name: String,
    pub file_path: String,
    pub line: u32,
    pub parameters: BTreeMap<String, ParameterInferenceReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<ReturnInferenceReport>,
    pub dependencies: Vec<String>,
    pub has_cyclic_dependency: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DependencyEdgeKind {
    Call,
    Override,
    Signal,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyNode {
    pub method_key: String,
    pub class_name: String,
    pub method_name: String,
    pub in_degree: u32,
    pub out_degree: u32,
    pub has_cyclic_dependency: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyEdge {
    pub from_method: String,
    pub to_method: String,
    pub kind: DependencyEdgeKind,
    pub is_part_of_cycle: bool,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceDependencyGraph {
    pub nodes: Vec<DependencyNode>,
    pub edges: Vec<DependencyEdge>,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInferenceReport {
    pub methods: Vec<MethodInferenceReport>,
    pub dependency_graph: InferenceDependencyGraph,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_null_optional_fields() {
        let report = ParameterInferenceReport {
            explicit_type: None,
            inferred_union_type: None,
            call_sites: vec![],
            confidence: Confidence::Unknown,
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(!json.contains("explicitType"));
        assert!(!json.contains("inferredUnionType"));
    }

    #[test]
    fn camel_case_field_names() {
        let report = MethodInferenceReport {
            class_name: "Player".to_string(),
            method_name: "take_damage".to_string(),
            file_path: "res://player.gs".to_string(),
            line: 10,
            parameters: BTreeMap::new(),
            return_type: None,
            dependencies: vec![],
            has_cyclic_dependency: false,
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"className\""));
        assert!(json.contains("\"hasCyclicDependency\""));
    }
}
