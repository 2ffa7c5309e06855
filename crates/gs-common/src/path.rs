//! Path normalization for the Project Types Provider's `by_path` index.

/// Normalizes a script path to a canonical, case-insensitive lookup key.
///
/// Strips a `res://` scheme prefix and surrounding double quotes (as they
/// appear in a `preload("res://foo.gs")` argument), then lowercases the
/// result so that Windows-style path differences don't split the index.
pub fn normalize_script_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('"');
    let without_scheme = trimmed.strip_prefix("res://").unwrap_or(trimmed);
    without_scheme.replace('\\', "/").to_lowercase()
}

/// All the index keys a single script path contributes to `by_path`:
/// the bare normalized path, and the quoted-resource-scheme form, so a
/// lookup from either a raw path or a `preload("...")` argument hits.
pub fn index_keys_for_path(full_path: &str, resource_path: &str) -> Vec<String> {
    let mut keys = vec![normalize_script_path(full_path)];
    let normalized_resource = normalize_script_path(resource_path);
    if !keys.contains(&normalized_resource) {
        keys.push(normalized_resource);
    }
    keys
}
