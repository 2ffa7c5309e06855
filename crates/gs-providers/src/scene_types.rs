//! Scene Types Provider (§4.4): parses declarative scene files into
//! `SceneInfo` and answers `(scene, node-path) -> type` queries. Also the
//! source of debounced file-change events consumed by external caches.

use dashmap::DashMap;
use gs_common::limits::{SCENE_CHANGE_DEBOUNCE_MS, SCENE_OWN_WRITE_WINDOW_MS};
use gs_types::Provider;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeInfo {
    pub name: String,
    /// `.` for the root, otherwise `/`-joined from the root.
    pub path: String,
    pub node_type: String,
    pub script_path: Option<String>,
    pub script_type_name: Option<String>,
    pub parent_path: Option<String>,
    pub line_number: u32,
    pub is_unique: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub signal: String,
    pub from: String,
    pub to: String,
    pub method: String,
    pub line_number: u32,
}

#[derive(Clone, Debug, Default)]
pub struct SceneInfo {
    pub scene_path: String,
    pub nodes: Vec<NodeInfo>,
    /// Indices into `nodes` that carry `unique_name_in_owner = true`.
    pub unique_nodes: Vec<usize>,
    /// script resource path -> node path of the node it's attached to.
    pub script_to_node_path: rustc_hash::FxHashMap<String, String>,
    pub signal_connections: Vec<ConnectionInfo>,
}

impl SceneInfo {
    fn node_at(&self, path: &str) -> Option<&NodeInfo> {
        self.nodes.iter().find(|n| n.path == path)
    }

    fn node_by_name(&self, name: &str) -> Option<&NodeInfo> {
        self.unique_nodes
            .iter()
            .map(|&i| &self.nodes[i])
            .find(|n| n.name == name)
    }

    fn root(&self) -> Option<&NodeInfo> {
        self.node_at(".")
    }
}

/// Events surfaced to external caches when a scene file changes on disk.
/// Ordering between concurrently-delivered events is not guaranteed;
/// consumers must be idempotent (§5).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChangeEvent {
    Changed(String),
    Created(String),
    Deleted(String),
    Renamed { from: String, to: String },
}

/// One entry in the rename delta `handle_change` computes for a content
/// change (§4.4): a node whose `[node]` block sits at the same source line
/// in the pre- and post-change snapshot, but whose path changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeRename {
    pub old_path: String,
    pub new_path: String,
    pub line_number: u32,
}

/// Line-keyed diff between a scene's prior and current snapshot: matches
/// nodes by the source line their `[node]` block starts on and reports
/// the ones whose path changed (§4.4 "a delta of node renames computed by
/// comparing line-keyed pre/post snapshots").
fn diff_node_renames(old: &SceneInfo, new: &SceneInfo) -> Vec<NodeRename> {
    let old_by_line: rustc_hash::FxHashMap<u32, &str> =
        old.nodes.iter().map(|n| (n.line_number, n.path.as_str())).collect();
    new.nodes
        .iter()
        .filter_map(|n| {
            let old_path = old_by_line.get(&n.line_number)?;
            if *old_path != n.path {
                Some(NodeRename {
                    old_path: old_path.to_string(),
                    new_path: n.path.clone(),
                    line_number: n.line_number,
                })
            } else {
                None
            }
        })
        .collect()
}

#[derive(Default)]
pub struct SceneTypesProvider {
    scenes: DashMap<String, Arc<SceneInfo>>,
    own_writes: DashMap<String, Instant>,
    last_change: DashMap<String, Instant>,
}

impl SceneTypesProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and (re)registers a scene from its raw text, as would be
    /// driven by an explicit `LoadScene` call (§4.3 lifecycle).
    pub fn load_scene(&self, scene_path: &str, content: &str) {
        let info = parse_scene(scene_path, content);
        self.scenes.insert(scene_path.to_string(), Arc::new(info));
    }

    /// Marks that this process itself just wrote `scene_path`, so a
    /// filesystem notification echoing that write within the own-write
    /// window is ignored (§4.4, §5).
    pub fn record_own_write(&self, scene_path: &str) {
        self.own_writes.insert(scene_path.to_string(), Instant::now());
    }

    fn is_own_write(&self, scene_path: &str) -> bool {
        match self.own_writes.get(scene_path) {
            Some(at) => at.elapsed() < Duration::from_millis(SCENE_OWN_WRITE_WINDOW_MS),
            None => false,
        }
    }

    fn is_debounced(&self, scene_path: &str) -> bool {
        match self.last_change.get(scene_path) {
            Some(at) => at.elapsed() < Duration::from_millis(SCENE_CHANGE_DEBOUNCE_MS),
            None => false,
        }
    }

    /// Applies an external change notification, parsing the new content
    /// (when present) unless the event is a self-write echo or arrives
    /// within the debounce window of a prior change to the same path.
    ///
    /// Returns the node-rename delta for a content change (§4.4): empty for
    /// `Created`/`Deleted`, or when no prior snapshot exists to diff against.
    pub fn handle_change(&self, event: ChangeEvent, new_content: Option<&str>) -> Vec<NodeRename> {
        let path = match &event {
            ChangeEvent::Changed(p) | ChangeEvent::Created(p) | ChangeEvent::Deleted(p) => p.clone(),
            ChangeEvent::Renamed { to, .. } => to.clone(),
        };

        if self.is_own_write(&path) {
            debug!(scene = %path, "ignoring self-write echo");
            return Vec::new();
        }
        if self.is_debounced(&path) {
            debug!(scene = %path, "ignoring change within debounce window");
            return Vec::new();
        }
        self.last_change.insert(path.clone(), Instant::now());

        match event {
            ChangeEvent::Deleted(p) => {
                self.scenes.remove(&p);
                Vec::new()
            }
            ChangeEvent::Renamed { from, to } => {
                let prior = self.get_scene(&from);
                self.scenes.remove(&from);
                let Some(content) = new_content else {
                    return Vec::new();
                };
                self.load_scene(&to, content);
                match (prior, self.get_scene(&to)) {
                    (Some(old), Some(new)) => diff_node_renames(&old, &new),
                    _ => Vec::new(),
                }
            }
            ChangeEvent::Changed(p) | ChangeEvent::Created(p) => {
                let Some(content) = new_content else {
                    warn!(scene = %p, "change event without content, scene left stale");
                    return Vec::new();
                };
                let prior = self.get_scene(&p);
                self.load_scene(&p, content);
                match (prior, self.get_scene(&p)) {
                    (Some(old), Some(new)) => {
                        let renames = diff_node_renames(&old, &new);
                        if !renames.is_empty() {
                            debug!(scene = %p, count = renames.len(), "scene change renamed nodes");
                        }
                        renames
                    }
                    _ => Vec::new(),
                }
            }
        }
    }

    pub fn get_scene(&self, scene_path: &str) -> Option<Arc<SceneInfo>> {
        self.scenes.get(scene_path).map(|r| r.clone())
    }

    pub fn get_node_type(&self, scene_path: &str, node_path: &str) -> Option<String> {
        let scene = self.scenes.get(scene_path)?;
        let node = scene.node_at(node_path)?;
        Some(
            node.script_type_name
                .clone()
                .unwrap_or_else(|| node.node_type.clone()),
        )
    }

    pub fn get_unique_node_type(&self, scene_path: &str, name: &str) -> Option<String> {
        let scene = self.scenes.get(scene_path)?;
        let node = scene.node_by_name(name)?;
        Some(
            node.script_type_name
                .clone()
                .unwrap_or_else(|| node.node_type.clone()),
        )
    }

    /// The raw script resource path attached to a node, independent of
    /// whether that path has been resolved to a project class name yet.
    /// Consulted by the runtime type injector (§4.8), which does its own
    /// script-to-class resolution through the Project Types Provider.
    pub fn get_node_script_path(&self, scene_path: &str, node_path: &str) -> Option<String> {
        let scene = self.scenes.get(scene_path)?;
        let node = scene.node_at(node_path)?;
        node.script_path.clone()
    }

    pub fn get_unique_node_script_path(&self, scene_path: &str, name: &str) -> Option<String> {
        let scene = self.scenes.get(scene_path)?;
        let node = scene.node_by_name(name)?;
        node.script_path.clone()
    }

    pub fn get_scenes_for_script(&self, script_path: &str) -> Vec<(String, String)> {
        self.scenes
            .iter()
            .filter_map(|e| {
                e.value()
                    .script_to_node_path
                    .get(script_path)
                    .map(|node_path| (e.key().clone(), node_path.clone()))
            })
            .collect()
    }

    /// The script resource path attached to the scene's root node, if any.
    pub fn get_root_script_path(&self, scene_path: &str) -> Option<String> {
        let scene = self.scenes.get(scene_path)?;
        scene.root()?.script_path.clone()
    }

    pub fn get_root_node_type(&self, scene_path: &str) -> Option<String> {
        let scene = self.scenes.get(scene_path)?;
        let root = scene.root()?;
        Some(
            root.script_type_name
                .clone()
                .unwrap_or_else(|| root.node_type.clone()),
        )
    }

    pub fn get_direct_children(&self, scene_path: &str, parent_path: &str) -> Vec<NodeInfo> {
        let Some(scene) = self.scenes.get(scene_path) else {
            return Vec::new();
        };
        scene
            .nodes
            .iter()
            .filter(|n| n.parent_path.as_deref() == Some(parent_path))
            .cloned()
            .collect()
    }

    /// `scene_instance.get_child(i)` support (§4.8): the `i`-th direct child
    /// of the scene's root, in declaration order.
    pub fn get_nth_child_of_root(&self, scene_path: &str, index: usize) -> Option<NodeInfo> {
        self.get_direct_children(scene_path, ".").into_iter().nth(index)
    }
}

impl Provider for SceneTypesProvider {}

/// Parses a Godot-style `.tscn`/`.scn` text body into a `SceneInfo`.
///
/// Line-oriented per §4.4: `[ext_resource]` lines build an `id -> path`
/// map; `[node]` lines start a new node whose path is derived from its
/// `parent` attribute; trailing `script = ExtResource(id)` and
/// `unique_name_in_owner = true` lines attach to the most recently opened
/// node block.
fn parse_scene(scene_path: &str, content: &str) -> SceneInfo {
    let mut ext_resources: rustc_hash::FxHashMap<String, String> = rustc_hash::FxHashMap::default();
    let mut nodes: Vec<NodeInfo> = Vec::new();
    let mut connections = Vec::new();
    let mut current_node: Option<usize> = None;

    for (line_idx, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();
        let line_number = (line_idx + 1) as u32;

        if line.starts_with("[ext_resource") {
            let attrs = parse_attrs(line);
            if let (Some(path), Some(id)) = (attrs.get("path"), attrs.get("id")) {
                ext_resources.insert(id.clone(), path.clone());
            }
        } else if line.starts_with("[sub_resource") {
            // Embedded scripts: a sub_resource of type Script with no path
            // reference is not externally loadable, so there's nothing
            // further to index beyond recognizing the block boundary.
            current_node = None;
        } else if line.starts_with("[node") {
            let attrs = parse_attrs(line);
            let name = attrs.get("name").cloned().unwrap_or_default();
            let node_type = attrs.get("type").cloned().unwrap_or_else(|| "Node".to_string());
            let parent = attrs.get("parent").cloned();

            let path = match &parent {
                None => ".".to_string(),
                Some(p) if p == "." => name.clone(),
                Some(p) => format!("{p}/{name}"),
            };
            let parent_path = parent;

            nodes.push(NodeInfo {
                name,
                path,
                node_type,
                script_path: None,
                script_type_name: None,
                parent_path,
                line_number,
                is_unique: false,
            });
            current_node = Some(nodes.len() - 1);
        } else if line.starts_with("[connection") {
            let attrs = parse_attrs(line);
            connections.push(ConnectionInfo {
                signal: attrs.get("signal").cloned().unwrap_or_default(),
                from: attrs.get("from").cloned().unwrap_or_default(),
                to: attrs.get("to").cloned().unwrap_or_default(),
                method: attrs.get("method").cloned().unwrap_or_default(),
                line_number,
            });
        } else if line.starts_with("script") && line.contains("ExtResource") {
            if let (Some(node_idx), Some(id)) = (current_node, extract_ext_resource_id(line)) {
                if let Some(path) = ext_resources.get(&id) {
                    nodes[node_idx].script_path = Some(path.clone());
                }
            }
        } else if line.starts_with("unique_name_in_owner") && line.contains("true") {
            if let Some(node_idx) = current_node {
                nodes[node_idx].is_unique = true;
            }
        }
    }

    let unique_nodes = nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| n.is_unique)
        .map(|(i, _)| i)
        .collect();

    let script_to_node_path = nodes
        .iter()
        .filter_map(|n| n.script_path.as_ref().map(|sp| (sp.clone(), n.path.clone())))
        .collect();

    SceneInfo {
        scene_path: scene_path.to_string(),
        nodes,
        unique_nodes,
        script_to_node_path,
        signal_connections: connections,
    }
}

/// Extracts `key="value"` or `key=value` pairs from a `[tag key=… key=…]`
/// block header, skipping the leading tag token (`node`, `ext_resource`, …).
fn parse_attrs(line: &str) -> rustc_hash::FxHashMap<String, String> {
    let inner = line.trim_start_matches('[').trim_end_matches(']');
    let remainder = match inner.find(char::is_whitespace) {
        Some(idx) => &inner[idx + 1..],
        None => "",
    };

    let mut attrs = rustc_hash::FxHashMap::default();
    let mut rest = remainder;
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }
        let Some(eq_idx) = rest.find('=') else { break };
        let key = rest[..eq_idx].trim().to_string();
        if key.is_empty() {
            break;
        }
        let after_eq = &rest[eq_idx + 1..];
        let (value, consumed) = read_attr_value(after_eq);
        attrs.insert(key, value);
        rest = &after_eq[consumed..];
    }
    attrs
}

/// Reads one attribute value starting at `rest`: a quoted string (stops at
/// the matching `"`) or a bare token (stops at whitespace).
fn read_attr_value(rest: &str) -> (String, usize) {
    let trimmed = rest.trim_start();
    let leading_ws = rest.len() - trimmed.len();
    if let Some(body) = trimmed.strip_prefix('"') {
        if let Some(end) = body.find('"') {
            return (body[..end].to_string(), leading_ws + 1 + end + 1);
        }
        return (body.to_string(), rest.len());
    }
    let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
    (trimmed[..end].to_string(), leading_ws + end)
}

/// Pulls the resource id out of `script = ExtResource("1")` / `ExtResource(1)`.
fn extract_ext_resource_id(line: &str) -> Option<String> {
    let start = line.find("ExtResource(")? + "ExtResource(".len();
    let rest = &line[start..];
    let end = rest.find(')')?;
    Some(rest[..end].trim().trim_matches('"').to_string())
}

#[cfg(feature = "watch")]
pub mod watch {
    use super::{ChangeEvent, SceneTypesProvider};
    use notify::{RecommendedWatcher, RecursiveMode, Watcher};
    use std::path::Path;
    use std::sync::Arc;
    use tracing::{debug, warn};

    /// Spawns a filesystem watcher over `root` that forwards debounced
    /// change events into the provider. The watcher must be kept alive by
    /// the caller for as long as watching should continue.
    pub fn watch_scenes(
        provider: Arc<SceneTypesProvider>,
        root: &Path,
    ) -> notify::Result<RecommendedWatcher> {
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let event = match res {
                Ok(e) => e,
                Err(err) => {
                    warn!(%err, "scene watcher error");
                    return;
                }
            };
            for path in event.paths {
                let Some(path_str) = path.to_str() else { continue };
                if !path_str.ends_with(".tscn") && !path_str.ends_with(".scn") {
                    continue;
                }
                let change = match event.kind {
                    notify::EventKind::Create(_) => ChangeEvent::Created(path_str.to_string()),
                    notify::EventKind::Remove(_) => ChangeEvent::Deleted(path_str.to_string()),
                    _ => ChangeEvent::Changed(path_str.to_string()),
                };
                let content = std::fs::read_to_string(&path).ok();
                let renames = provider.handle_change(change, content.as_deref());
                if !renames.is_empty() {
                    debug!(?renames, "scene watcher observed node renames");
                }
            }
        })?;
        watcher.watch(root, RecursiveMode::Recursive)?;
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[gd_scene load_steps=3 format=3]

[ext_resource type="Script" path="res://player.gs" id="1"]

[node name="Player" type="CharacterBody2D"]
script = ExtResource("1")

[node name="Sprite" type="Sprite2D" parent="."]

[node name="Hud" type="CanvasLayer" parent="."]
unique_name_in_owner = true

[connection signal="body_entered" from="Player" to="Player" method="_on_body_entered"]
"#;

    #[test]
    fn parses_nodes_scripts_and_unique_markers() {
        let scene = parse_scene("res://player.tscn", SAMPLE);
        assert_eq!(scene.nodes.len(), 3);
        assert_eq!(scene.root().unwrap().name, "Player");
        assert_eq!(
            scene.script_to_node_path.get("res://player.gs").map(String::as_str),
            Some(".")
        );
        assert_eq!(scene.unique_nodes.len(), 1);
        assert_eq!(scene.nodes[scene.unique_nodes[0]].name, "Hud");
    }

    #[test]
    fn child_paths_are_slash_joined_from_root() {
        let scene = parse_scene("res://player.tscn", SAMPLE);
        let sprite = scene.node_at("Sprite").expect("sprite node");
        assert_eq!(sprite.node_type, "Sprite2D");
    }

    #[test]
    fn connection_blocks_are_captured() {
        let scene = parse_scene("res://player.tscn", SAMPLE);
        assert_eq!(scene.signal_connections.len(), 1);
        assert_eq!(scene.signal_connections[0].signal, "body_entered");
    }

    #[test]
    fn provider_get_node_type_prefers_script_over_node_type() {
        let provider = SceneTypesProvider::new();
        provider.load_scene("res://player.tscn", SAMPLE);
        // No project-class resolution wired in this unit test, so the
        // script path itself isn't resolved to a class name; the node
        // type is the fallback when script_type_name is unset.
        assert_eq!(
            provider.get_node_type("res://player.tscn", "."),
            Some("CharacterBody2D".to_string())
        );
    }

    #[test]
    fn own_write_is_ignored_within_window() {
        let provider = SceneTypesProvider::new();
        provider.load_scene("res://player.tscn", SAMPLE);
        provider.record_own_write("res://player.tscn");
        provider.handle_change(
            ChangeEvent::Changed("res://player.tscn".to_string()),
            Some("[gd_scene load_steps=1 format=3]\n[node name=\"Other\" type=\"Node\"]\n"),
        );
        // Scene content should be unchanged because the write was ours.
        assert_eq!(
            provider.get_root_node_type("res://player.tscn"),
            Some("CharacterBody2D".to_string())
        );
    }

    #[test]
    fn content_change_reports_node_rename_delta() {
        // Identical layout to SAMPLE except the "Sprite" node (same source
        // line) is renamed to "SpriteNode" — a line-keyed diff must treat
        // this as a rename of that one node, not an add/remove pair.
        const RENAMED: &str = r#"
[gd_scene load_steps=3 format=3]

[ext_resource type="Script" path="res://player.gs" id="1"]

[node name="Player" type="CharacterBody2D"]
script = ExtResource("1")

[node name="SpriteNode" type="Sprite2D" parent="."]

[node name="Hud" type="CanvasLayer" parent="."]
unique_name_in_owner = true

[connection signal="body_entered" from="Player" to="Player" method="_on_body_entered"]
"#;
        let provider = SceneTypesProvider::new();
        provider.load_scene("res://player.tscn", SAMPLE);
        let renames = provider.handle_change(
            ChangeEvent::Changed("res://player.tscn".to_string()),
            Some(RENAMED),
        );
        assert_eq!(renames.len(), 1);
        assert_eq!(renames[0].old_path, "Sprite");
        assert_eq!(renames[0].new_path, "SpriteNode");
    }
}
