//! Module ids derived from relative source paths.

/// Derive a module id from a relative path: separators become dots and the
/// extension is dropped (`pkg/sub/mod.py` → `pkg.sub.mod`).
pub fn module_id_for_path(rel_path: &str) -> String {
    let normalized = rel_path.replace('\\', "/");
    let trimmed = normalized.trim_start_matches("./");
    let stem = match trimmed.rfind('.') {
        Some(dot) if dot > trimmed.rfind('/').map_or(0, |slash| slash + 1) => &trimmed[..dot],
        _ => trimmed,
    };
    stem.replace('/', ".")
}
