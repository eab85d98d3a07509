//! Helpers for `/`-separated store paths.
//!
//! Store paths are the identifiers clients see. They always begin with `/`
//! and never carry a trailing slash except for the root itself.

/// The store root.
pub const ROOT: &str = "/";

/// Join a child name onto a store path.
pub fn join(parent: &str, name: &str) -> String {
    let parent = parent.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    format!("{parent}/{name}")
}

/// Parent of a store path, computed by truncating at the last `/`.
///
/// The root has no parent.
pub fn parent(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.rfind('/') {
        Some(0) => Some(ROOT),
        Some(idx) => Some(&trimmed[..idx]),
        None => Some(ROOT),
    }
}

/// Final component of a store path (empty for the root).
pub fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or("")
}

/// Whether `path` lies strictly beneath `ancestor`.
pub fn is_descendant(path: &str, ancestor: &str) -> bool {
    let ancestor = ancestor.trim_end_matches('/');
    path.len() > ancestor.len() + 1
        && path.starts_with(ancestor)
        && path.as_bytes()[ancestor.len()] == b'/'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join() {
        assert_eq!(join("/", "docs"), "/docs");
        assert_eq!(join("/docs", "a.txt"), "/docs/a.txt");
        assert_eq!(join("/docs/", "/a.txt"), "/docs/a.txt");
    }

    #[test]
    fn test_parent() {
        assert_eq!(parent("/"), None);
        assert_eq!(parent("/docs"), Some("/"));
        assert_eq!(parent("/docs/a.txt"), Some("/docs"));
        assert_eq!(parent("/docs/sub/"), Some("/docs"));
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("/docs/a.txt"), "a.txt");
        assert_eq!(file_name("/"), "");
    }

    #[test]
    fn test_is_descendant() {
        assert!(is_descendant("/docs/a.txt", "/docs"));
        assert!(is_descendant("/docs/a.txt", "/"));
        assert!(!is_descendant("/docs2/a.txt", "/docs"));
        assert!(!is_descendant("/docs", "/docs"));
    }
}
