//! Filesystem utilities for pipeline artifacts.
//!
//! [`ArtifactSet`] hands out intermediate file paths and unlinks whatever was
//! written to them when it goes out of scope, on success and failure alike.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use crate::error::MediaResult;

/// Scoped collection of intermediate files.
///
/// Paths are only allocated, never created; a step that fails before writing
/// leaves nothing behind and the drop is a no-op for that path.
#[derive(Debug)]
pub struct ArtifactSet {
    dir: PathBuf,
    prefix: String,
    run_id: String,
    paths: Vec<PathBuf>,
}

impl ArtifactSet {
    /// Create an empty set allocating `_pipeline_*` names into `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_prefix(dir, "_pipeline")
    }

    /// Create an empty set allocating `<prefix>_*` names into `dir`.
    pub fn with_prefix(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            run_id: Uuid::new_v4().simple().to_string(),
            paths: Vec::new(),
        }
    }

    /// Identifier shared by every path this set allocates.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Allocate `<prefix>_<index>_<run-id>.<extension>` in the set's directory.
    pub fn allocate(&mut self, index: usize, extension: &str) -> PathBuf {
        let name = if extension.is_empty() {
            format!("{}_{}_{}", self.prefix, index, self.run_id)
        } else {
            format!("{}_{}_{}.{}", self.prefix, index, self.run_id, extension)
        };
        let path = self.dir.join(name);
        self.paths.push(path.clone());
        path
    }

    /// Paths allocated so far.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl Drop for ArtifactSet {
    fn drop(&mut self) {
        for path in &self.paths {
            match std::fs::remove_file(path) {
                Ok(()) => tracing::debug!("Removed intermediate {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(
                    "Failed to remove intermediate {}: {}",
                    path.display(),
                    e
                ),
            }
        }
    }
}

/// Extension of `path` without the dot, or an empty string.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Copy `src` to `dst` byte for byte, creating the destination directory.
pub async fn copy_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<u64> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if let Some(parent) = dst.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    let bytes = fs::copy(src, dst).await?;
    tracing::debug!("Copied {} -> {} ({} bytes)", src.display(), dst.display(), bytes);
    Ok(bytes)
}

/// Remove a file, treating an already-missing file as success.
pub async fn remove_if_exists(path: impl AsRef<Path>) -> MediaResult<()> {
    match fs::remove_file(path.as_ref()).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_allocated_names_are_unique_per_run() {
        let dir = TempDir::new().unwrap();
        let mut first = ArtifactSet::new(dir.path());
        let mut second = ArtifactSet::new(dir.path());

        let a = first.allocate(0, "mp4");
        let b = second.allocate(0, "mp4");
        assert_ne!(a, b);

        let name = a.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("_pipeline_0_"));
        assert!(name.ends_with(".mp4"));
        assert!(name.contains(first.run_id()));
    }

    #[test]
    fn test_custom_prefix() {
        let dir = TempDir::new().unwrap();
        let mut set = ArtifactSet::with_prefix(dir.path(), "_edit");
        let path = set.allocate(2, "");
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert_eq!(name, format!("_edit_2_{}", set.run_id()));
    }

    #[test]
    fn test_allocation_does_not_create_files() {
        let dir = TempDir::new().unwrap();
        let mut set = ArtifactSet::new(dir.path());
        let path = set.allocate(1, "mov");
        assert!(!path.exists());
        drop(set);
    }

    #[tokio::test]
    async fn test_drop_removes_written_artifacts() {
        let dir = TempDir::new().unwrap();
        let (written, untouched) = {
            let mut set = ArtifactSet::new(dir.path());
            let written = set.allocate(0, "mp4");
            let untouched = set.allocate(1, "mp4");
            fs::write(&written, b"frames").await.unwrap();
            assert!(written.exists());
            assert_eq!(set.paths(), &[written.clone(), untouched.clone()]);
            (written, untouched)
        };

        assert!(!written.exists());
        assert!(!untouched.exists());
    }

    #[tokio::test]
    async fn test_copy_file_creates_parent() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("source.mp4");
        let dst = dir.path().join("processed").join("copy.mp4");
        fs::write(&src, b"video bytes").await.unwrap();

        let bytes = copy_file(&src, &dst).await.unwrap();

        assert_eq!(bytes, 11);
        assert_eq!(fs::read(&dst).await.unwrap(), b"video bytes");
        assert!(src.exists());
    }

    #[tokio::test]
    async fn test_remove_if_exists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.mp4");
        remove_if_exists(&path).await.unwrap();

        fs::write(&path, b"x").await.unwrap();
        remove_if_exists(&path).await.unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of(Path::new("a/b.mp4")), "mp4");
        assert_eq!(extension_of(Path::new("noext")), "");
    }
}
