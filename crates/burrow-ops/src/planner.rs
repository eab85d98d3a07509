//! Batch selection planning.

use std::collections::HashSet;

use burrow_core::store_path;

/// Drop every path that lies beneath another selected path.
///
/// Recursive operations on an ancestor already cover its descendants, so
/// running them on both would process entries twice or fail on paths that
/// are already gone. Duplicates collapse to their first occurrence and the
/// input order of the survivors is kept.
pub fn reduce_to_top_level<S: AsRef<str>>(paths: &[S]) -> Vec<String> {
    let normalized: Vec<&str> = paths.iter().map(|p| normalize(p.as_ref())).collect();

    let mut seen = HashSet::new();
    normalized
        .iter()
        .filter(|path| {
            !normalized
                .iter()
                .any(|other| store_path::is_descendant(path, other))
        })
        .filter(|path| seen.insert(**path))
        .map(|path| path.to_string())
        .collect()
}

fn normalize(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" => store_path::ROOT,
        trimmed => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_paths_are_dropped() {
        let reduced = reduce_to_top_level(&["/docs", "/docs/a.txt", "/docs/sub/b.txt"]);
        assert_eq!(reduced, ["/docs"]);
    }

    #[test]
    fn test_sibling_prefixes_are_kept() {
        let reduced = reduce_to_top_level(&["/docs", "/docs2/a.txt", "/doc"]);
        assert_eq!(reduced, ["/docs", "/docs2/a.txt", "/doc"]);
    }

    #[test]
    fn test_order_is_preserved_and_duplicates_collapse() {
        let reduced = reduce_to_top_level(&["/b/x", "/a", "/b", "/a/", "/c"]);
        assert_eq!(reduced, ["/a", "/b", "/c"]);
    }

    #[test]
    fn test_root_subsumes_everything() {
        let reduced = reduce_to_top_level(&["/x", "/", "/y/z"]);
        assert_eq!(reduced, ["/"]);
    }

    #[test]
    fn test_empty_selection() {
        let reduced = reduce_to_top_level::<&str>(&[]);
        assert!(reduced.is_empty());
    }
}
