use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::compiler::{GEN_SUFFIX, GOX_SUFFIX};

/// Finds gox source files under a project's source paths.
pub struct SourceDiscovery {
    project_root: PathBuf,
    source_paths: Vec<String>,
}

impl SourceDiscovery {
    pub fn new(project_root: PathBuf, source_paths: Vec<String>) -> Self {
        Self {
            project_root,
            source_paths,
        }
    }

    /// Recursively collect all `*.gox.rs` files, sorted for stable output.
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        let mut sources = Vec::new();

        for source_path in &self.source_paths {
            let search_path = self.project_root.join(source_path);

            if !search_path.exists() {
                continue;
            }

            for entry in WalkDir::new(&search_path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();

                if path.is_file() && has_suffix(path, GOX_SUFFIX) {
                    sources.push(path.to_path_buf());
                }
            }
        }

        sources.sort();
        Ok(sources)
    }
}

/// Delete every generated file under `root`. Returns the removed paths.
pub fn clean_generated(root: &Path) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();

    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();

        if path.is_file() && has_suffix(path, GEN_SUFFIX) {
            std::fs::remove_file(path)
                .with_context(|| format!("Failed to remove generated file: {:?}", path))?;
            removed.push(path.to_path_buf());
        }
    }

    Ok(removed)
}

fn has_suffix(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(suffix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_discover_finds_gox_files_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("a.gox.rs"), "").unwrap();
        fs::write(src.join("nested/b.gox.rs"), "").unwrap();
        fs::write(src.join("plain.rs"), "").unwrap();
        fs::write(src.join("a_gen.rs"), "").unwrap();

        let discovery =
            SourceDiscovery::new(dir.path().to_path_buf(), vec!["src".to_string()]);
        let sources = discovery.discover().unwrap();

        assert_eq!(sources.len(), 2);
        assert!(sources[0].ends_with("src/a.gox.rs"));
        assert!(sources[1].ends_with("src/nested/b.gox.rs"));
    }

    #[test]
    fn test_discover_skips_missing_source_paths() {
        let dir = tempfile::tempdir().unwrap();
        let discovery =
            SourceDiscovery::new(dir.path().to_path_buf(), vec!["nope".to_string()]);
        assert!(discovery.discover().unwrap().is_empty());
    }

    #[test]
    fn test_clean_removes_only_generated_files() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.gox.rs"), "").unwrap();
        fs::write(src.join("a_gen.rs"), "").unwrap();
        fs::write(src.join("b_gen.rs"), "").unwrap();

        let removed = clean_generated(dir.path()).unwrap();

        assert_eq!(removed.len(), 2);
        assert!(src.join("a.gox.rs").exists());
        assert!(!src.join("a_gen.rs").exists());
        assert!(!src.join("b_gen.rs").exists());
    }
}
