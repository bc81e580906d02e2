//! Secondary copies of stored files.
//!
//! A mirror is best-effort. The local file store is authoritative and a mirror failure never
//! undoes a stored upload; the repository logs it and reports no remote id.

use crate::error::ErrorClass;
use std::path::{Path, PathBuf};
use studyshare_types::CategoryName;

#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("mirror I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("mirror rejected upload: {0}")]
    Rejected(String),
}

impl MirrorError {
    pub fn class(&self) -> ErrorClass {
        ErrorClass::Collaborator
    }
}

pub type MirrorResult<T> = std::result::Result<T, MirrorError>;

/// An external store that receives a copy of each stored upload.
pub trait CloudMirror: Send + Sync {
    /// Copies the file at `local_path` and returns its id in the remote store.
    fn upload(&self, local_path: &Path, category: &CategoryName) -> MirrorResult<String>;
}

/// Mirrors into `<root>/<category>/<filename>` and uses `category/filename` as the remote id.
#[derive(Debug, Clone)]
pub struct DirectoryMirror {
    root: PathBuf,
}

impl DirectoryMirror {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl CloudMirror for DirectoryMirror {
    fn upload(&self, local_path: &Path, category: &CategoryName) -> MirrorResult<String> {
        let filename = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                MirrorError::Rejected(format!("no usable filename in {}", local_path.display()))
            })?;

        let dir = self.root.join(category);
        std::fs::create_dir_all(&dir)?;
        std::fs::copy(local_path, dir.join(filename))?;

        Ok(format!("{}/{}", category, filename))
    }
}
