//! Scratch directory for ephemeral build inputs.
//!
//! Some build inputs (the embedded server wheel, the rendered requirements
//! file) exist only so a `COPY` instruction can pull them into the image.
//! They are written under `<dir>/.cog/tmp/build<id>` so they live inside the
//! build context without polluting the project tree, and are removed by an
//! explicit [`TempStaging::cleanup`] call at the end of the session.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::error::{GenerateError, Result};

/// Well-known scratch root, relative to the working directory.
const STAGING_ROOT: &str = ".cog/tmp";

/// A private, uniquely named staging directory for one generator session.
#[derive(Debug)]
pub struct TempStaging {
    /// Absolute path to the staging directory
    dir: PathBuf,
    /// The same directory relative to the working dir, as written into COPY
    /// instructions
    relative_dir: PathBuf,
}

impl TempStaging {
    /// Allocates a fresh staging directory under `<base_dir>/.cog/tmp`.
    pub fn create(base_dir: &Path) -> Result<Self> {
        let root = base_dir.join(STAGING_ROOT);
        fs::create_dir_all(&root).map_err(|e| {
            GenerateError::io(
                format!("failed to create staging root {}", root.display()),
                e,
            )
        })?;

        let name = format!("build{}", Uuid::new_v4().simple());
        let dir = root.join(&name);
        fs::create_dir(&dir).map_err(|e| {
            GenerateError::io(
                format!("failed to create staging directory {}", dir.display()),
                e,
            )
        })?;

        debug!(dir = %dir.display(), "created staging directory");
        Ok(Self {
            dir,
            relative_dir: Path::new(STAGING_ROOT).join(&name),
        })
    }

    /// Writes a file into the staging directory so the build can copy it in.
    ///
    /// Returns the `COPY` instruction referencing the staged file and the
    /// in-container path the file ends up at.
    pub fn write(&self, name: &str, contents: &[u8]) -> Result<(String, String)> {
        let path = self.dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| GenerateError::io(format!("failed to stage {name}"), e))?;
        }
        fs::write(&path, contents)
            .map_err(|e| GenerateError::io(format!("failed to stage {name}"), e))?;

        debug!(name, bytes = contents.len(), "staged build input");
        let copy_line = format!(
            "COPY {} /tmp/{name}",
            self.relative_dir.join(name).display()
        );
        Ok((copy_line, format!("/tmp/{name}")))
    }

    /// Removes the staging directory and everything in it.
    ///
    /// Callers invoke this exactly once at the end of a session, on success
    /// and failure paths alike.
    pub fn cleanup(&self) -> Result<()> {
        fs::remove_dir_all(&self.dir).map_err(|e| {
            GenerateError::io(format!("failed to clean up {}", self.dir.display()), e)
        })
    }

    /// Absolute path of the staging directory.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Staging directory relative to the working dir.
    pub(crate) fn relative_path(&self) -> &Path {
        &self.relative_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_allocates_unique_directories() {
        let base = tempfile::tempdir().unwrap();

        let first = TempStaging::create(base.path()).unwrap();
        let second = TempStaging::create(base.path()).unwrap();

        assert!(first.path().is_dir());
        assert!(second.path().is_dir());
        assert_ne!(first.path(), second.path());
        assert!(first.path().starts_with(base.path().join(".cog/tmp")));
    }

    #[test]
    fn test_write_returns_copy_line_and_container_path() {
        let base = tempfile::tempdir().unwrap();
        let staging = TempStaging::create(base.path()).unwrap();

        let (copy_line, container_path) =
            staging.write("requirements.txt", b"torch==2.0.1\n").unwrap();

        assert_eq!(container_path, "/tmp/requirements.txt");
        let staged = staging.relative_path().join("requirements.txt");
        assert_eq!(
            copy_line,
            format!("COPY {} /tmp/requirements.txt", staged.display())
        );
        assert_eq!(
            fs::read(staging.path().join("requirements.txt")).unwrap(),
            b"torch==2.0.1\n"
        );
    }

    #[test]
    fn test_write_creates_parent_directories() {
        let base = tempfile::tempdir().unwrap();
        let staging = TempStaging::create(base.path()).unwrap();

        staging.write("nested/inner.txt", b"data").unwrap();
        assert!(staging.path().join("nested/inner.txt").is_file());
    }

    #[test]
    fn test_cleanup_removes_directory_tree() {
        let base = tempfile::tempdir().unwrap();
        let staging = TempStaging::create(base.path()).unwrap();
        staging.write("artifact.whl", b"bytes").unwrap();

        staging.cleanup().unwrap();
        assert!(!staging.path().exists());
    }
}
