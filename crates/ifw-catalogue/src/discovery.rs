//! Integration discovery: one immediate sub-directory per integration.

use std::path::{Path, PathBuf};

use crate::error::CatalogueError;

/// Every immediate sub-directory of `root`, sorted.
///
/// Nested directories are not searched. A directory without `manifest.json`
/// is still an integration; validating it reports the missing manifest.
pub fn discover(root: &Path) -> Result<Vec<PathBuf>, CatalogueError> {
    if !root.is_dir() {
        return Err(CatalogueError::IntegrationsDirNotFound(root.to_path_buf()));
    }

    let entries = std::fs::read_dir(root).map_err(|source| CatalogueError::Discovery {
        path: root.to_path_buf(),
        source,
    })?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| CatalogueError::Discovery {
            path: root.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_every_directory_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        for key in ["zeta", "alpha", "empty"] {
            std::fs::create_dir(tmp.path().join(key)).unwrap();
        }
        std::fs::write(tmp.path().join("zeta/manifest.json"), "{}").unwrap();
        std::fs::write(tmp.path().join("alpha/manifest.json"), "{}").unwrap();
        std::fs::write(tmp.path().join("manifest.json"), "{}").unwrap();
        std::fs::create_dir_all(tmp.path().join("empty/nested")).unwrap();
        std::fs::write(tmp.path().join("empty/nested/manifest.json"), "{}").unwrap();

        let found = discover(tmp.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["alpha", "empty", "zeta"]);
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = discover(&tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, CatalogueError::IntegrationsDirNotFound(_)));
    }
}
