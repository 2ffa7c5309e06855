//! Autoloads Provider (§4.5): reflects a named set of singleton bindings —
//! either a project-defined script class or a scene's root node — as
//! synthesized `TypeInfo`s.

use crate::project_types::ProjectTypesProvider;
use crate::scene_types::SceneTypesProvider;
use dashmap::DashMap;
use gs_types::{MemberInfo, Provider, TypeInfo};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AutoloadKind {
    Script,
    Scene,
}

#[derive(Clone, Debug)]
pub struct AutoloadEntry {
    pub name: String,
    pub path: String,
    pub enabled: bool,
    pub kind: AutoloadKind,
}

pub struct AutoloadsProvider {
    entries: Vec<AutoloadEntry>,
    project: Arc<ProjectTypesProvider>,
    scene: Arc<SceneTypesProvider>,
    cache: DashMap<String, Arc<TypeInfo>>,
}

impl AutoloadsProvider {
    pub fn new(
        entries: Vec<AutoloadEntry>,
        project: Arc<ProjectTypesProvider>,
        scene: Arc<SceneTypesProvider>,
    ) -> Self {
        Self {
            entries: entries.into_iter().filter(|e| e.enabled).collect(),
            project,
            scene,
            cache: DashMap::new(),
        }
    }

    fn entry(&self, name: &str) -> Option<&AutoloadEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    fn synthesize(&self, entry: &AutoloadEntry) -> TypeInfo {
        match entry.kind {
            AutoloadKind::Script => self
                .project
                .resolve_class_by_path(&entry.path)
                .and_then(|class_name| self.project.get_type_info(&class_name))
                .unwrap_or_else(|| TypeInfo::new(entry.name.clone()).with_base("Node")),
            AutoloadKind::Scene => {
                // (b): root node's script class when resolvable, else the
                // root node's raw type, else `Node` (§4.5).
                self.scene
                    .get_root_script_path(&entry.path)
                    .and_then(|script_path| self.project.resolve_class_by_path(&script_path))
                    .and_then(|class_name| self.project.get_type_info(&class_name))
                    .unwrap_or_else(|| {
                        let root_type = self
                            .scene
                            .get_root_node_type(&entry.path)
                            .unwrap_or_else(|| "Node".to_string());
                        TypeInfo::new(entry.name.clone()).with_base(root_type)
                    })
            }
        }
    }

    fn type_info_for(&self, name: &str) -> Option<Arc<TypeInfo>> {
        if let Some(cached) = self.cache.get(name) {
            return Some(cached.clone());
        }
        let entry = self.entry(name)?;
        let info = Arc::new(self.synthesize(entry));
        self.cache.insert(name.to_string(), info.clone());
        Some(info)
    }
}

impl Provider for AutoloadsProvider {
    fn is_known_type(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    fn get_type_info(&self, name: &str) -> Option<TypeInfo> {
        self.type_info_for(name).map(|arc| (*arc).clone())
    }

    fn get_member(&self, type_name: &str, member: &str) -> Option<MemberInfo> {
        self.type_info_for(type_name)?.member(member).cloned()
    }

    fn get_base_type(&self, type_name: &str) -> Option<String> {
        self.type_info_for(type_name)?.base_type.clone()
    }

    fn get_global_class(&self, name: &str) -> Option<TypeInfo> {
        self.get_type_info(name)
    }

    // Autoloads are instances, not types, so they are deliberately absent
    // from `get_all_types`/`find_types_with_*` (§4.5).
}
