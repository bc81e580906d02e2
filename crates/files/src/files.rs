//! Category-scoped file placement
//!
//! [`FileStore`] owns everything beneath the files root: one directory per category and the
//! uploaded files inside them.
//!
//! # Publishing an upload
//!
//! 1. The proposed name is sanitised and checked against the [`UploadLimits`].
//! 2. The body is streamed into a hidden temp file inside the category directory, capped at
//!    the size limit. Nothing is locked while bytes are arriving.
//! 3. Under the category lock, the first free name out of `name`, `name_1`, `name_2`, ... is
//!    chosen and the temp file is renamed onto it without clobbering.
//!
//! The no-clobber rename means a writer in another process that wins the race for a name
//! pushes this upload on to the next suffix instead of overwriting it. If any step fails the
//! temp file is dropped, which removes it.
//!
//! # Locking
//!
//! Locks are per category and created lazily, so uploads and deletes in unrelated categories
//! never wait on each other.

use crate::constants::TEMP_FILE_PREFIX;
use crate::names::{collision_name, sanitize_filename, validate_stored_name, UploadLimits};
use crate::{FilesError, FilesResult};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::io::{self, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use studyshare_types::CategoryName;
use tempfile::NamedTempFile;

/// A file stored under a category.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct StoredFile {
    /// Final on-disk filename, including any collision suffix
    pub name: String,

    /// Size of the file in bytes
    pub size_bytes: u64,

    /// Creation time reported by the filesystem, falling back to modification time
    pub created_at: Option<DateTime<Utc>>,
}

impl StoredFile {
    fn from_metadata(name: String, metadata: &fs::Metadata) -> Self {
        let created_at = metadata
            .created()
            .or_else(|_| metadata.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        Self {
            name,
            size_bytes: metadata.len(),
            created_at,
        }
    }
}

/// Filesystem-backed store of categorised files.
///
/// The store is shared (typically behind an `Arc`) by the registry, the catalog and the
/// repository facade; all methods take `&self`.
#[derive(Debug)]
pub struct FileStore {
    /// Canonicalised root containing one directory per category
    root_directory: PathBuf,

    /// Per-category mutual exclusion for name selection and deletion
    locks: Mutex<HashMap<CategoryName, Arc<Mutex<()>>>>,
}

impl FileStore {
    /// Opens a store rooted at `root_directory`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `FilesError::InvalidRootDirectory` if the path exists but is not a directory,
    /// or cannot be created or canonicalised.
    pub fn open(root_directory: &Path) -> FilesResult<Self> {
        if root_directory.exists() && !root_directory.is_dir() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Path is not a directory: {}",
                root_directory.display()
            )));
        }

        fs::create_dir_all(root_directory).map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot create directory {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        let root_directory = root_directory.canonicalize().map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot canonicalize path {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        Ok(Self {
            root_directory,
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the canonicalised files root.
    #[must_use]
    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    /// Returns the directory backing `category`. It may not exist yet.
    #[must_use]
    pub fn category_dir(&self, category: &CategoryName) -> PathBuf {
        self.root_directory.join(category.as_str())
    }

    /// Whether the directory for `category` exists.
    #[must_use]
    pub fn has_category(&self, category: &CategoryName) -> bool {
        self.category_dir(category).is_dir()
    }

    /// Ensures the directory for `category` exists. Idempotent.
    pub fn create_category(&self, category: &CategoryName) -> FilesResult<()> {
        fs::create_dir_all(self.category_dir(category))?;
        Ok(())
    }

    fn category_lock(&self, category: &CategoryName) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(locks.entry(category.clone()).or_default())
    }

    fn existing_category_dir(&self, category: &CategoryName) -> FilesResult<PathBuf> {
        let dir = self.category_dir(category);
        if !dir.is_dir() {
            return Err(FilesError::CategoryNotFound(category.to_string()));
        }
        Ok(dir)
    }

    /// Stores an uploaded file under `category`.
    ///
    /// # Arguments
    ///
    /// * `category` - Target category; its directory must already exist
    /// * `proposed_name` - Filename as supplied by the uploader, sanitised before use
    /// * `declared_size` - Size announced by the transport, checked before any bytes are read
    /// * `content` - The file body
    /// * `limits` - Size limit and extension allow-list
    ///
    /// # Returns
    ///
    /// The [`StoredFile`] under its *final* name, which carries a `_N` suffix when the
    /// sanitised name was already taken. Callers must use this name, not the proposed one.
    ///
    /// # Errors
    ///
    /// - `CategoryNotFound` if the category directory does not exist
    /// - `FileTooLarge` if `declared_size` or the actual body exceeds the limit
    /// - `DisallowedExtension` if the extension is not admitted
    /// - `WriteFailed` on any I/O failure while writing or publishing
    pub fn submit(
        &self,
        category: &CategoryName,
        proposed_name: &str,
        declared_size: u64,
        content: impl Read,
        limits: &UploadLimits,
    ) -> FilesResult<StoredFile> {
        let dir = self.existing_category_dir(category)?;
        let sanitized = sanitize_filename(proposed_name);
        limits.check(&sanitized, declared_size)?;

        let staged = self.stage(&dir, content, limits.max_file_size)?;

        let lock = self.category_lock(category);
        let _guard = lock.lock();
        let (name, path) = publish(staged, &dir, &sanitized)?;

        let metadata = fs::metadata(&path).map_err(FilesError::WriteFailed)?;
        tracing::info!(
            category = %category,
            file = %name,
            bytes = metadata.len(),
            "stored upload"
        );
        Ok(StoredFile::from_metadata(name, &metadata))
    }

    /// Streams `content` into a hidden temp file in `dir`, enforcing `max_size`.
    fn stage(&self, dir: &Path, content: impl Read, max_size: u64) -> FilesResult<NamedTempFile> {
        let mut staged = tempfile::Builder::new()
            .prefix(TEMP_FILE_PREFIX)
            .tempfile_in(dir)
            .map_err(FilesError::WriteFailed)?;

        // One byte past the limit is enough to know the body is too large.
        let mut limited = content.take(max_size.saturating_add(1));
        let written = io::copy(&mut limited, &mut staged).map_err(FilesError::WriteFailed)?;
        if written > max_size {
            return Err(FilesError::FileTooLarge {
                size: written,
                max: max_size,
            });
        }

        staged.flush().map_err(FilesError::WriteFailed)?;
        staged.as_file().sync_all().map_err(FilesError::WriteFailed)?;
        Ok(staged)
    }

    /// Lists the files of `category`, sorted by filename ascending.
    ///
    /// Hidden entries (including in-flight uploads), directories and symlinks are skipped.
    ///
    /// # Errors
    ///
    /// Returns `CategoryNotFound` if the category directory has never been created.
    pub fn list(&self, category: &CategoryName) -> FilesResult<Vec<StoredFile>> {
        let dir = self.existing_category_dir(category)?;
        let mut files = Vec::new();

        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                tracing::warn!(
                    "skipping non UTF-8 filename in {}: {:?}",
                    dir.display(),
                    entry.file_name()
                );
                continue;
            };

            if name.starts_with('.') || !entry.file_type()?.is_file() {
                continue;
            }

            // The entry may vanish between read_dir and metadata under a concurrent delete.
            match entry.metadata() {
                Ok(metadata) => files.push(StoredFile::from_metadata(name, &metadata)),
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Resolves `(category, filename)` to the path of an existing regular file.
    ///
    /// # Errors
    ///
    /// - `InvalidFileName` if `filename` is not a plain visible segment
    /// - `CategoryNotFound` if the category directory does not exist
    /// - `FileNotFound` if no regular file exists under that name
    pub fn resolve(&self, category: &CategoryName, filename: &str) -> FilesResult<PathBuf> {
        validate_stored_name(filename)?;
        let path = self.existing_category_dir(category)?.join(filename);

        match fs::symlink_metadata(&path) {
            Ok(metadata) if metadata.is_file() => Ok(path),
            Ok(_) => Err(not_found(category, filename)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(not_found(category, filename)),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns the metadata of a single stored file.
    pub fn stat(&self, category: &CategoryName, filename: &str) -> FilesResult<StoredFile> {
        let path = self.resolve(category, filename)?;
        let metadata = fs::metadata(&path)?;
        Ok(StoredFile::from_metadata(filename.to_owned(), &metadata))
    }

    /// Removes exactly the file at `(category, filename)`.
    ///
    /// Never recurses and never removes the category directory.
    ///
    /// # Errors
    ///
    /// As for [`FileStore::resolve`], plus `Io` if the unlink fails.
    pub fn delete(&self, category: &CategoryName, filename: &str) -> FilesResult<()> {
        // Lock entries are only created for categories that have a directory.
        self.existing_category_dir(category)?;
        let lock = self.category_lock(category);
        let _guard = lock.lock();

        let path = self.resolve(category, filename)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(category = %category, file = %filename, "deleted file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(not_found(category, filename)),
            Err(e) => Err(e.into()),
        }
    }
}

fn not_found(category: &CategoryName, filename: &str) -> FilesError {
    FilesError::FileNotFound {
        category: category.to_string(),
        filename: filename.to_owned(),
    }
}

/// Renames `staged` onto the first free collision name of `sanitized` in `dir`.
///
/// Must be called with the category lock held.
fn publish(
    mut staged: NamedTempFile,
    dir: &Path,
    sanitized: &str,
) -> FilesResult<(String, PathBuf)> {
    let mut attempt: u64 = 0;

    loop {
        let name = collision_name(sanitized, attempt);
        let target = dir.join(&name);
        attempt += 1;

        if fs::symlink_metadata(&target).is_ok() {
            tracing::debug!("name {} taken, trying next suffix", name);
            continue;
        }

        match staged.persist_noclobber(&target) {
            Ok(_) => return Ok((name, target)),
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                tracing::debug!("lost publish race for {}, trying next suffix", name);
                staged = e.file;
            }
            Err(e) => return Err(FilesError::WriteFailed(e.error)),
        }
    }
}
