//! StudyShare File Storage
//!
//! This crate places uploaded files on disk beneath per-category directories and answers
//! directory-level questions about them (listing, resolution, deletion).
//!
//! ## Design Principles
//!
//! - One directory per category, directly beneath a single files root
//! - A stored file is identified by `(category, filename)`; filenames are unique per directory
//! - Stored files are never overwritten: name collisions resolve to `stem_N.ext`
//! - Partially written uploads are never visible under their final name
//! - Every name reaching the filesystem is a single, visible path segment
//!
//! ## Storage Layout
//!
//! ```text
//! <files_root>/
//! ├── Math/
//! │   ├── notes.pdf
//! │   ├── notes_1.pdf
//! │   └── .upload-XXXXXX     # in-flight, invisible to listings
//! └── Physics/
//!     └── lab-2.docx
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use studyshare_files::{ExtensionPolicy, FileStore, UploadLimits};
//! use studyshare_types::CategoryName;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = FileStore::open(Path::new("files"))?;
//! let math = CategoryName::new("Math")?;
//! store.create_category(&math)?;
//!
//! let limits = UploadLimits::new(1_000, ExtensionPolicy::parse(".pdf"));
//! let body: &[u8] = b"%PDF-1.7";
//! let stored = store.submit(&math, "notes.pdf", body.len() as u64, body, &limits)?;
//! assert_eq!(stored.name, "notes.pdf");
//! # Ok(())
//! # }
//! ```

mod constants;
mod files;
mod names;

pub use constants::{EXTENSION_WILDCARD, TEMP_FILE_PREFIX};
pub use files::{FileStore, StoredFile};
pub use names::{
    collision_name, sanitize_filename, split_extension, validate_stored_name, ExtensionPolicy,
    UploadLimits,
};
pub use studyshare_types::CategoryName;

/// Errors that can occur during file operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Root directory is unusable
    #[error("Invalid root directory: {0}")]
    InvalidRootDirectory(String),

    /// Category directory has never been created
    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    /// Filename is not a plain, visible path segment
    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    /// Upload exceeds the configured size limit
    #[error("File is too large: {size} bytes (maximum {max})")]
    FileTooLarge { size: u64, max: u64 },

    /// Upload extension is not in the allow-list
    #[error("File type {extension:?} is not allowed")]
    DisallowedExtension { extension: String },

    /// No regular file exists at `(category, filename)`
    #[error("File not found: {category}/{filename}")]
    FileNotFound { category: String, filename: String },

    /// Writing or publishing an upload failed; nothing was left behind
    #[error("Failed to write file: {0}")]
    WriteFailed(#[source] std::io::Error),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type FilesResult<T> = Result<T, FilesError>;
