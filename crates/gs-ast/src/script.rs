use crate::arena::Arena;
use crate::node::NodeId;

/// One parsed GS source file: a script-global arena plus the root class
/// declaration (every GS file implicitly declares exactly one top-level
/// class, the way a GDScript file does).
#[derive(Clone, Debug)]
pub struct ScriptFile {
    /// Absolute filesystem path.
    pub full_path: String,
    /// `res://`-scheme project-relative path.
    pub resource_path: String,
    pub arena: Arena,
    pub root_class: NodeId,
}

impl ScriptFile {
    pub fn new(full_path: String, resource_path: String, arena: Arena, root_class: NodeId) -> Self {
        Self {
            full_path,
            resource_path,
            arena,
            root_class,
        }
    }
}
