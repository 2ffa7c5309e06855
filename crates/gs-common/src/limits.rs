//! Centralized limits for the inference engine.
//!
//! Kept in one place so the recursion-guard sets, the cache layers, and the
//! depth checks all agree on the same numbers instead of drifting apart.

/// Hard ceiling on expression-inference recursion depth (§4.6.3 of the design).
///
/// Past this depth `infer_type_node` returns `None` rather than overflowing
/// the stack on pathological or cyclic ASTs.
pub const MAX_INFERENCE_DEPTH: u32 = 50;

/// Debounce window for scene-file change events before a cache refresh fires.
pub const SCENE_CHANGE_DEBOUNCE_MS: u64 = 300;

/// Window during which a provider's own writes to a scene file are ignored
/// by the watcher, to avoid feedback loops with external tooling.
pub const SCENE_OWN_WRITE_WINDOW_MS: u64 = 2_000;

/// Initial capacity hint for per-class member maps; most GS classes declare
/// well under this many members.
pub const TYPICAL_CLASS_MEMBER_COUNT: usize = 16;
