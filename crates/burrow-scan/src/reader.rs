//! Folder listing and recursive name search.

use std::fs;
use std::path::Path;

use jwalk::WalkDir;
use tracing::{debug, warn};

use burrow_core::{Entry, PathResolver, StoreError};

/// Produces [`Entry`] records for folders in the store.
#[derive(Debug, Clone)]
pub struct EntryReader {
    resolver: PathResolver,
}

impl EntryReader {
    /// Create a reader over the store behind `resolver`.
    pub fn new(resolver: PathResolver) -> Self {
        Self { resolver }
    }

    /// List the immediate children of a folder.
    ///
    /// Folders come before files; within each group names are ordered by
    /// [`burrow_core::compare_names`].
    pub fn list(&self, path: &str) -> Result<Vec<Entry>, StoreError> {
        let dir = self.resolver.resolve(path)?;
        let metadata = fs::metadata(&dir).map_err(|e| StoreError::io(&dir, e))?;
        if !metadata.is_dir() {
            return Err(StoreError::invalid(format!("Not a folder: {path}")));
        }

        let mut entries = Vec::new();
        for item in fs::read_dir(&dir).map_err(|e| StoreError::io(&dir, e))? {
            let item = item.map_err(|e| StoreError::io(&dir, e))?;
            let child = item.path();
            // Symlinks describe themselves, never their targets.
            match fs::symlink_metadata(&child) {
                Ok(meta) => entries.push(self.entry_for(&child, &meta)?),
                Err(e) => warn!(path = %child.display(), error = %e, "Skipping unreadable entry"),
            }
        }

        entries.sort_by(Entry::listing_order);
        debug!(path, count = entries.len(), "Listed folder");
        Ok(entries)
    }

    /// Recursively find every entry below `root` whose name contains
    /// `query`, compared case-insensitively.
    pub fn search(&self, root: &str, query: &str) -> Result<Vec<Entry>, StoreError> {
        if query.is_empty() {
            return Err(StoreError::invalid("Search query cannot be empty"));
        }
        let dir = self.resolver.resolve(root)?;
        if !dir.is_dir() {
            return Err(StoreError::not_found(root));
        }

        let needle = query.to_lowercase();
        let walker = WalkDir::new(&dir)
            .skip_hidden(false)
            .follow_links(false)
            .sort(true)
            .min_depth(1);

        let mut matches = Vec::new();
        for item in walker {
            let item = match item {
                Ok(item) => item,
                Err(err) => {
                    warn!(error = %err, "Search skipped an unreadable path");
                    continue;
                }
            };

            let name = item.file_name().to_string_lossy();
            if !name.to_lowercase().contains(&needle) {
                continue;
            }

            let path = item.path();
            match item.metadata() {
                Ok(meta) => matches.push(self.entry_for(&path, &meta)?),
                Err(err) => warn!(path = %path.display(), error = %err, "Skipping unreadable match"),
            }
        }

        debug!(root, query, count = matches.len(), "Search complete");
        Ok(matches)
    }

    fn entry_for(&self, absolute: &Path, meta: &fs::Metadata) -> Result<Entry, StoreError> {
        let store_path = self.resolver.relative(absolute)?;
        let name = absolute
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Entry::from_metadata(name, store_path, meta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, EntryReader) {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("docs/reports")).unwrap();
        fs::create_dir_all(root.join("Music")).unwrap();
        fs::write(root.join("zebra.txt"), b"z").unwrap();
        fs::write(root.join("Apple.txt"), b"apple").unwrap();
        fs::write(root.join("docs/Report-2024.pdf"), b"pdf").unwrap();
        fs::write(root.join("docs/reports/q1-report.txt"), b"q1").unwrap();

        let resolver = PathResolver::new(root).unwrap();
        (dir, EntryReader::new(resolver))
    }

    #[test]
    fn test_list_orders_folders_first() {
        let (_dir, reader) = fixture();
        let names: Vec<_> = reader
            .list("/")
            .unwrap()
            .into_iter()
            .map(|e| e.name.to_string())
            .collect();
        assert_eq!(names, ["docs", "Music", "Apple.txt", "zebra.txt"]);
    }

    #[test]
    fn test_list_paths_are_store_relative() {
        let (_dir, reader) = fixture();
        let entries = reader.list("/docs").unwrap();
        assert_eq!(entries[0].path, "/docs/reports");
        assert_eq!(entries[1].path, "/docs/Report-2024.pdf");
        assert_eq!(entries[1].size, 3);
    }

    #[test]
    fn test_list_missing_and_file() {
        let (_dir, reader) = fixture();
        assert!(matches!(reader.list("/nope"), Err(StoreError::NotFound { .. })));
        assert!(matches!(reader.list("/zebra.txt"), Err(StoreError::InvalidInput { .. })));
    }

    #[test]
    fn test_search_is_case_insensitive_and_recursive() {
        let (_dir, reader) = fixture();
        let mut paths: Vec<_> = reader
            .search("/", "REPORT")
            .unwrap()
            .into_iter()
            .map(|e| e.path)
            .collect();
        paths.sort();
        assert_eq!(
            paths,
            [
                "/docs/Report-2024.pdf",
                "/docs/reports",
                "/docs/reports/q1-report.txt"
            ]
        );
    }

    #[test]
    fn test_search_rejects_empty_query() {
        let (_dir, reader) = fixture();
        assert!(matches!(reader.search("/", ""), Err(StoreError::InvalidInput { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_list_does_not_follow_symlinks_out() {
        let outside = TempDir::new().unwrap();
        let secret = outside.path().join("secret.bin");
        fs::write(&secret, vec![0u8; 100_000]).unwrap();

        let (dir, reader) = fixture();
        std::os::unix::fs::symlink(&secret, dir.path().join("link.bin")).unwrap();

        let entries = reader.list("/").unwrap();
        let link = entries.iter().find(|e| e.name == "link.bin").unwrap();
        assert_ne!(link.size, 100_000);
        assert_eq!(link.path, "/link.bin");
    }
}
