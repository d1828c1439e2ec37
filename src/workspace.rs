//! Transient workspace the harness runs in
//!
//! One directory per run. It holds the regenerated source and verbatim test
//! copies for a single trial at a time and is emptied between trials.

use std::path::Path;

use tempfile::TempDir;
use tracing::debug;

use crate::codegen::{SourceUnit, TestFile};
use crate::error::{MutationError, Result};

#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh, empty directory under the system temp dir
    pub fn create() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("mutest-")
            .tempdir()
            .map_err(|e| MutationError::WorkspaceError {
                error: format!("failed to create workspace: {}", e),
            })?;
        debug!(path = %dir.path().display(), "created workspace");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write the unit's current rendering and copies of the test files
    pub fn materialize(&self, unit: &SourceUnit, tests: &[TestFile]) -> Result<()> {
        let source_path = self.path().join(unit.file_name());
        std::fs::write(&source_path, unit.render()).map_err(|e| MutationError::WriteError {
            file: source_path.clone(),
            error: e.to_string(),
        })?;

        for test in tests {
            let test_path = self.path().join(test.file_name());
            std::fs::write(&test_path, test.contents()).map_err(|e| {
                MutationError::WriteError {
                    file: test_path.clone(),
                    error: e.to_string(),
                }
            })?;
        }
        Ok(())
    }

    /// Remove everything a trial left behind
    pub fn clear(&self) -> Result<()> {
        let entries = std::fs::read_dir(self.path()).map_err(|e| self.error("read", e))?;

        for entry in entries {
            let entry = entry.map_err(|e| self.error("read", e))?;
            let path = entry.path();
            let removed = if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            removed.map_err(|e| MutationError::WorkspaceError {
                error: format!("failed to remove '{}': {}", path.display(), e),
            })?;
        }
        Ok(())
    }

    /// Delete the directory itself
    pub fn close(self) -> Result<()> {
        let path = self.path().to_path_buf();
        self.dir.close().map_err(|e| MutationError::WorkspaceError {
            error: format!("failed to remove '{}': {}", path.display(), e),
        })?;
        debug!(path = %path.display(), "removed workspace");
        Ok(())
    }

    fn error(&self, action: &str, e: std::io::Error) -> MutationError {
        MutationError::WorkspaceError {
            error: format!("failed to {} '{}': {}", action, self.path().display(), e),
        }
    }
}
