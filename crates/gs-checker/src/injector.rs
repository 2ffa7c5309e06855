//! Runtime Type Injector (§4.8): contributes types the static provider graph
//! cannot know on its own — node-path expressions, resource-loader calls,
//! scene instantiation, and signal parameter types.

use crate::inheritance::find_member_with_inheritance;
use gs_providers::{NodeInfo, ProjectTypesProvider, SceneTypesProvider};
use gs_types::Provider;
use std::sync::Arc;
use tracing::debug;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "webp", "svg", "tga"];
const AUDIO_EXTENSIONS: &[&str] = &["wav", "ogg", "mp3"];
const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "woff", "woff2"];
const MODEL_3D_EXTENSIONS: &[&str] = &["gltf", "glb", "obj", "fbx", "dae"];

pub struct RuntimeTypeInjector {
    project: Arc<ProjectTypesProvider>,
    scene: Arc<SceneTypesProvider>,
    composite: Arc<dyn Provider>,
}

impl RuntimeTypeInjector {
    pub fn new(
        project: Arc<ProjectTypesProvider>,
        scene: Arc<SceneTypesProvider>,
        composite: Arc<dyn Provider>,
    ) -> Self {
        Self { project, scene, composite }
    }

    /// A node's type, preferring the project class its attached script
    /// resolves to over the scene's raw node type. `SceneTypesProvider`
    /// never populates `script_type_name` itself (that resolution needs
    /// `ProjectTypesProvider`, which sits above it in the dependency
    /// graph), so the injector does the join here instead.
    fn resolve_node_type(&self, scene_path: &str, node_path: &str) -> Option<String> {
        if let Some(script_path) = self.scene.get_node_script_path(scene_path, node_path) {
            if let Some(class_name) = self.project.resolve_class_by_path(&script_path) {
                return Some(class_name);
            }
        }
        self.scene.get_node_type(scene_path, node_path)
    }

    fn resolve_unique_node_type(&self, scene_path: &str, name: &str) -> Option<String> {
        if let Some(script_path) = self.scene.get_unique_node_script_path(scene_path, name) {
            if let Some(class_name) = self.project.resolve_class_by_path(&script_path) {
                return Some(class_name);
            }
        }
        self.scene.get_unique_node_type(scene_path, name)
    }

    fn resolve_node_info_type(&self, node: &NodeInfo) -> String {
        if let Some(script_path) = &node.script_path {
            if let Some(class_name) = self.project.resolve_class_by_path(script_path) {
                return class_name;
            }
        }
        node.node_type.clone()
    }

    /// `$Foo/Bar` (unique = false) / `%Unique` (unique = true), resolved
    /// against every scene the current script is attached to. Agreement
    /// across all contributing scenes is required; disagreement yields
    /// `None` with a debug log (§4.8, §8 scenario S5).
    pub fn inject_node_path(&self, current_script_path: &str, path: &str, unique: bool) -> Option<String> {
        let scenes = self.scene.get_scenes_for_script(current_script_path);
        if scenes.is_empty() {
            return None;
        }
        let mut agreed: Option<String> = None;
        for (scene_path, attach_node_path) in &scenes {
            let answer = if unique {
                self.resolve_unique_node_type(scene_path, path)
            } else {
                let full_path = if attach_node_path == "." {
                    path.to_string()
                } else {
                    format!("{attach_node_path}/{path}")
                };
                self.resolve_node_type(scene_path, &full_path)
            };
            let Some(answer) = answer else { continue };
            match &agreed {
                None => agreed = Some(answer),
                Some(existing) if *existing == answer => {}
                Some(_) => {
                    debug!(script = %current_script_path, %path, "ambiguous node-path type across scenes");
                    return None;
                }
            }
        }
        agreed
    }

    /// `get_node(s)` / `get_node_or_null(s)` / `find_node(s)`: same
    /// resolution path as `$NodePath`, taking an already-extracted literal
    /// path string (the caller accepts a variable whose initializer is a
    /// string literal too, per §4.8 — extracting that literal is the
    /// engine's job, not the injector's).
    pub fn inject_get_node(&self, current_script_path: &str, path: &str) -> Option<String> {
        self.inject_node_path(current_script_path, path, false)
    }

    /// `preload("path")` / `load("path")`: category by file-extension
    /// suffix (§4.8).
    pub fn inject_resource_load(&self, path: &str) -> String {
        let trimmed = path.trim().trim_matches('"');
        let extension = trimmed.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
        match extension.as_str() {
            "gs" => self
                .project
                .resolve_class_by_path(trimmed)
                .unwrap_or_else(|| "Script".to_string()),
            "tscn" | "scn" => "PackedScene".to_string(),
            "tres" | "res" => "Resource".to_string(),
            "json" => "JSON".to_string(),
            ext if IMAGE_EXTENSIONS.contains(&ext) => "Texture2D".to_string(),
            ext if AUDIO_EXTENSIONS.contains(&ext) => "AudioStream".to_string(),
            ext if FONT_EXTENSIONS.contains(&ext) => "Font".to_string(),
            ext if MODEL_3D_EXTENSIONS.contains(&ext) => "PackedScene".to_string(),
            _ => "Resource".to_string(),
        }
    }

    /// `preload("scene.tscn").instantiate()` / `alias.instantiate()`: the
    /// root node's type (§4.8).
    pub fn inject_instantiate(&self, scene_path: &str) -> Option<String> {
        self.resolve_node_type(scene_path, ".")
    }

    /// `scene_instance.get_child(i)` with a literal integer `i`: the `i`-th
    /// direct child of the scene root, in declaration order (§4.8).
    pub fn inject_get_child(&self, scene_path: &str, index: usize) -> Option<String> {
        let node = self.scene.get_nth_child_of_root(scene_path, index)?;
        Some(self.resolve_node_info_type(&node))
    }

    /// Consults the host DB then the script AST for a matching signal
    /// declaration (§4.8) — the Composite's `[Host, Project, ...]`
    /// ordering already gives that precedence for free.
    pub fn get_signal_parameter_types(&self, signal: &str, emitter_type: &str) -> Option<Vec<String>> {
        let (_, member) = find_member_with_inheritance(self.composite.as_ref(), emitter_type, signal)?;
        member.as_signal().map(|s| s.parameter_type_names.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gs_providers::host_db::{HostTypeDbProvider, HostTypeDescriptor};
    use gs_providers::CompositeProvider;

    fn empty_providers() -> (Arc<ProjectTypesProvider>, Arc<SceneTypesProvider>, Arc<dyn Provider>) {
        let host: Arc<dyn Provider> =
            Arc::new(HostTypeDbProvider::from_descriptor(HostTypeDescriptor::default()));
        let project = Arc::new(ProjectTypesProvider::new(host.clone()));
        let scene = Arc::new(SceneTypesProvider::new());
        let composite: Arc<dyn Provider> = Arc::new(CompositeProvider::new(vec![host, project.clone()]));
        (project, scene, composite)
    }

    const SAMPLE: &str = r#"
[gd_scene load_steps=2 format=3]

[node name="Root" type="Node2D"]

[node name="Enemy" type="CharacterBody2D" parent="."]
"#;

    #[test]
    fn preload_category_by_extension() {
        let (project, scene, composite) = empty_providers();
        let injector = RuntimeTypeInjector::new(project, scene, composite);
        assert_eq!(injector.inject_resource_load("res://art/hero.png"), "Texture2D");
        assert_eq!(injector.inject_resource_load("res://levels/one.tscn"), "PackedScene");
        assert_eq!(injector.inject_resource_load("res://data/save.json"), "JSON");
    }

    #[test]
    fn node_path_resolves_relative_to_attachment() {
        let (project, scene, composite) = empty_providers();
        scene.load_scene("res://level.tscn", SAMPLE);
        let injector = RuntimeTypeInjector::new(project, scene, composite);
        assert_eq!(
            injector.resolve_node_type("res://level.tscn", "Enemy"),
            Some("CharacterBody2D".to_string())
        );
    }

    #[test]
    fn instantiate_returns_root_type() {
        let (project, scene, composite) = empty_providers();
        scene.load_scene("res://level.tscn", SAMPLE);
        let injector = RuntimeTypeInjector::new(project, scene, composite);
        assert_eq!(injector.inject_instantiate("res://level.tscn"), Some("Node2D".to_string()));
    }

    #[test]
    fn get_child_by_index() {
        let (project, scene, composite) = empty_providers();
        scene.load_scene("res://level.tscn", SAMPLE);
        let injector = RuntimeTypeInjector::new(project, scene, composite);
        assert_eq!(
            injector.inject_get_child("res://level.tscn", 0),
            Some("CharacterBody2D".to_string())
        );
    }

    #[test]
    fn unattached_script_yields_no_node_path_injection() {
        let (project, scene, composite) = empty_providers();
        let injector = RuntimeTypeInjector::new(project, scene, composite);
        assert_eq!(injector.inject_node_path("res://nowhere.gs", "Enemy", false), None);
    }
}
