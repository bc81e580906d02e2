//! The repository facade.
//!
//! [`Repository`] is what a transport (chat bot, CLI) talks to. It owns the category registry,
//! the file store, the catalog, the stats ledger and an optional mirror, and sequences them for
//! each user-facing operation.

use crate::catalog::{Catalog, Page, SearchHit};
use crate::config::RepositoryConfig;
use crate::mirror::{CloudMirror, DirectoryMirror};
use crate::registry::{CategoryRegistry, CategoryStore};
use crate::stats::{LedgerSummary, StatsLedger, UserStatsRecord};
use crate::RepositoryResult;
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use studyshare_files::{FileStore, StoredFile, UploadLimits};
use studyshare_types::{CategoryName, UserId};

/// Who is uploading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uploader {
    pub id: UserId,
    pub display_name: Option<String>,
}

impl Uploader {
    pub fn new(id: UserId, display_name: Option<String>) -> Self {
        Self { id, display_name }
    }
}

/// Result of a stored upload.
///
/// `remote_id` is `None` when there is no mirror or the mirror failed. `stats` is `None` when
/// the ledger could not be updated; the file is stored either way.
#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub category: CategoryName,
    pub file: StoredFile,
    pub remote_id: Option<String>,
    pub stats: Option<UserStatsRecord>,
}

pub struct Repository {
    registry: CategoryRegistry,
    files: Arc<FileStore>,
    catalog: Catalog,
    stats: StatsLedger,
    mirror: Option<Box<dyn CloudMirror>>,
    limits: UploadLimits,
    page_size: usize,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("registry", &self.registry)
            .field("files", &self.files.root_directory())
            .field("stats", &self.stats.path())
            .field("mirror", &self.mirror.is_some())
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl Repository {
    /// Opens the repository described by `config`.
    ///
    /// Creates the files root and one directory per seeded category. When the configuration
    /// names a mirror directory, a [`DirectoryMirror`] is attached.
    ///
    /// # Errors
    ///
    /// Returns an error if the files root or a category directory cannot be created.
    pub fn open(config: &RepositoryConfig, store: Box<dyn CategoryStore>) -> RepositoryResult<Self> {
        let files = Arc::new(FileStore::open(config.files_dir())?);
        let registry =
            CategoryRegistry::open(config.initial_categories(), store, Arc::clone(&files))?;

        let mirror = config.mirror_dir().map(|dir| {
            tracing::info!("mirroring uploads into {}", dir.display());
            Box::new(DirectoryMirror::new(dir)) as Box<dyn CloudMirror>
        });

        Ok(Self {
            registry,
            catalog: Catalog::new(Arc::clone(&files)),
            files,
            stats: StatsLedger::new(config.stats_file()),
            mirror,
            limits: config.limits().clone(),
            page_size: config.page_size(),
        })
    }

    /// Replaces the mirror collaborator.
    pub fn with_mirror(mut self, mirror: Box<dyn CloudMirror>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    pub fn categories(&self) -> Vec<CategoryName> {
        self.registry.list()
    }

    pub fn category_at(&self, index: usize) -> RepositoryResult<CategoryName> {
        self.registry.get(index)
    }

    pub fn add_category(&self, name: &str) -> RepositoryResult<CategoryName> {
        self.registry.add(name)
    }

    /// Stores an upload, mirrors it and credits the uploader.
    ///
    /// Only the local store is authoritative. A mirror failure leaves `remote_id` empty and a
    /// ledger failure leaves `stats` empty; both are logged and neither removes the stored file.
    ///
    /// # Errors
    ///
    /// - `CategoryNotFound` if `category` is not registered
    /// - any [`FileStore::submit`] error (size, extension, I/O)
    pub fn submit_upload(
        &self,
        category: &str,
        proposed_name: &str,
        declared_size: u64,
        content: impl Read,
        uploader: &Uploader,
    ) -> RepositoryResult<UploadOutcome> {
        let category = self.registry.lookup(category)?;
        let file = self.files.submit(
            &category,
            proposed_name,
            declared_size,
            content,
            &self.limits,
        )?;

        let remote_id = self.mirror_upload(&category, &file);

        let stats = match self
            .stats
            .record(&uploader.id, uploader.display_name.as_deref())
        {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(
                    user = %uploader.id,
                    file = %file.name,
                    "upload stored but stats were not updated: {}",
                    e
                );
                None
            }
        };

        Ok(UploadOutcome {
            category,
            file,
            remote_id,
            stats,
        })
    }

    fn mirror_upload(&self, category: &CategoryName, file: &StoredFile) -> Option<String> {
        let mirror = self.mirror.as_ref()?;
        let path = self.files.category_dir(category).join(&file.name);

        match mirror.upload(&path, category) {
            Ok(remote_id) => {
                tracing::debug!(file = %file.name, remote_id = %remote_id, "mirrored upload");
                Some(remote_id)
            }
            Err(e) => {
                tracing::warn!(category = %category, file = %file.name, "mirror failed: {}", e);
                None
            }
        }
    }

    /// Page `page_number` (one-based) of a category, using the configured page size.
    pub fn list_category(&self, category: &str, page_number: usize) -> RepositoryResult<Page> {
        let category = self.registry.lookup(category)?;
        self.catalog.page(&category, page_number, self.page_size)
    }

    /// As [`Repository::list_category`], addressing the category by registry index.
    pub fn list_category_at(&self, index: usize, page_number: usize) -> RepositoryResult<Page> {
        let category = self.registry.get(index)?;
        self.catalog.page(&category, page_number, self.page_size)
    }

    /// Searches every registered category, in registry order.
    pub fn search(&self, query: &str) -> RepositoryResult<Vec<SearchHit>> {
        self.catalog.search(query, &self.registry.list())
    }

    /// Credits one upload to `uploader` without storing a file.
    pub fn record_activity(&self, uploader: &Uploader) -> RepositoryResult<UserStatsRecord> {
        self.stats
            .record(&uploader.id, uploader.display_name.as_deref())
    }

    pub fn delete_file(&self, category: &str, filename: &str) -> RepositoryResult<()> {
        let category = self.registry.lookup(category)?;
        self.files.delete(&category, filename)?;
        Ok(())
    }

    /// Path of a stored file, for download.
    pub fn resolve_file(&self, category: &str, filename: &str) -> RepositoryResult<PathBuf> {
        let category = self.registry.lookup(category)?;
        Ok(self.files.resolve(&category, filename)?)
    }

    pub fn user_stats(&self, user_id: &UserId) -> RepositoryResult<UserStatsRecord> {
        self.stats.get(user_id)
    }

    pub fn top_uploaders(&self, n: usize) -> RepositoryResult<Vec<UserStatsRecord>> {
        self.stats.top(n)
    }

    pub fn ledger_summary(&self) -> RepositoryResult<LedgerSummary> {
        self.stats.summary()
    }
}
