//! Parsing source files into ASTs and rendering them back to code.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use crate::error::{MutationError, Result};

/// Generate source code from AST
pub fn generate_source(ast: &syn::File) -> String {
    prettyplease::unparse(ast)
}

/// One parsed Rust source file, owned by the orchestrator for a whole run
#[derive(Debug)]
pub struct SourceUnit {
    path: PathBuf,
    file_name: OsString,
    tree: syn::File,
}

impl SourceUnit {
    /// Read and parse a source file
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| MutationError::FileReadError {
            file: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::parse(path, &source)
    }

    /// Parse source text that claims to live at `path`
    pub fn parse(path: impl Into<PathBuf>, source: &str) -> Result<Self> {
        let path = path.into();
        let file_name = file_name_of(&path)?;
        let tree = syn::parse_file(source).map_err(|e| MutationError::ParseError {
            file: path.clone(),
            error: e.to_string(),
        })?;

        Ok(Self {
            path,
            file_name,
            tree,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name the regenerated source is written under
    pub fn file_name(&self) -> &OsStr {
        &self.file_name
    }

    pub fn tree(&self) -> &syn::File {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut syn::File {
        &mut self.tree
    }

    /// Render the current state of the tree
    pub fn render(&self) -> String {
        generate_source(&self.tree)
    }
}

/// A test file copied verbatim next to the regenerated source
#[derive(Debug, Clone)]
pub struct TestFile {
    file_name: OsString,
    contents: Vec<u8>,
}

impl TestFile {
    pub fn new(file_name: impl Into<OsString>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            contents: contents.into(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file_name = file_name_of(path)?;
        let contents = std::fs::read(path).map_err(|e| MutationError::FileReadError {
            file: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Ok(Self {
            file_name,
            contents,
        })
    }

    pub fn file_name(&self) -> &OsStr {
        &self.file_name
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }
}

fn file_name_of(path: &Path) -> Result<OsString> {
    path.file_name()
        .map(OsStr::to_os_string)
        .ok_or_else(|| MutationError::NotAFile {
            file: path.to_path_buf(),
        })
}
