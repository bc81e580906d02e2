//! Category registry.
//!
//! The registry is the ordered set of category names. Order is insertion order: seed order
//! from configuration, then additions in the order they were made. Categories are additive
//! only; there is no removal or rename.
//!
//! Adding a category creates its directory in the [`FileStore`] and persists the full list
//! through a [`CategoryStore`]. The in-memory list is only updated once both succeeded, so a
//! failed persist leaves the registry exactly as it was.

use crate::config::AppConfig;
use crate::{RepositoryError, RepositoryResult};
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use studyshare_files::FileStore;
use studyshare_types::CategoryName;

/// Durable representation of the category list.
pub trait CategoryStore: Send + Sync {
    /// Persists the complete, ordered category list.
    fn persist(&self, names: &[CategoryName]) -> RepositoryResult<()>;
}

/// Persists categories into the `general.categories` key of the YAML configuration file.
///
/// The file is re-read on every persist so edits made to other keys since startup survive.
#[derive(Debug, Clone)]
pub struct ConfigFileCategoryStore {
    path: PathBuf,
}

impl ConfigFileCategoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CategoryStore for ConfigFileCategoryStore {
    fn persist(&self, names: &[CategoryName]) -> RepositoryResult<()> {
        let mut config = AppConfig::load_or_init(&self.path)?;
        config.set_categories(names);
        config.save(&self.path)?;
        Ok(())
    }
}

/// Keeps the last persisted list in memory. Used when there is no configuration file.
#[derive(Debug, Default)]
pub struct MemoryCategoryStore {
    saved: Mutex<Vec<CategoryName>>,
}

impl MemoryCategoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently persisted list.
    pub fn saved(&self) -> Vec<CategoryName> {
        self.saved.lock().clone()
    }
}

impl CategoryStore for MemoryCategoryStore {
    fn persist(&self, names: &[CategoryName]) -> RepositoryResult<()> {
        *self.saved.lock() = names.to_vec();
        Ok(())
    }
}

impl<T: CategoryStore + ?Sized> CategoryStore for Arc<T> {
    fn persist(&self, names: &[CategoryName]) -> RepositoryResult<()> {
        (**self).persist(names)
    }
}

pub struct CategoryRegistry {
    names: RwLock<Vec<CategoryName>>,
    /// Serialises `add` end to end; readers only ever take `names`
    mutation: Mutex<()>,
    store: Box<dyn CategoryStore>,
    files: Arc<FileStore>,
}

impl std::fmt::Debug for CategoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CategoryRegistry")
            .field("names", &*self.names.read())
            .finish_non_exhaustive()
    }
}

impl CategoryRegistry {
    /// Builds the registry from seed names and provisions a directory for each.
    ///
    /// Seed names that are invalid or repeat an earlier seed are skipped with a warning.
    /// Seeding does not persist: the seed already comes from the durable representation.
    ///
    /// # Errors
    ///
    /// Returns an error if a category directory cannot be created.
    pub fn open<I, S>(
        seed: I,
        store: Box<dyn CategoryStore>,
        files: Arc<FileStore>,
    ) -> RepositoryResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names: Vec<CategoryName> = Vec::new();

        for raw in seed {
            let raw = raw.as_ref();
            match CategoryName::new(raw) {
                Ok(name) if names.contains(&name) => {
                    tracing::warn!("skipping duplicate seed category {:?}", raw);
                }
                Ok(name) => {
                    files.create_category(&name)?;
                    names.push(name);
                }
                Err(e) => {
                    tracing::warn!("skipping invalid seed category {:?}: {}", raw, e);
                }
            }
        }

        tracing::info!("category registry opened with {} categories", names.len());

        Ok(Self {
            names: RwLock::new(names),
            mutation: Mutex::new(()),
            store,
            files,
        })
    }

    /// All categories in insertion order.
    pub fn list(&self) -> Vec<CategoryName> {
        self.names.read().clone()
    }

    pub fn len(&self) -> usize {
        self.names.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.read().is_empty()
    }

    /// Membership test on the trimmed name, case-sensitive like `add`.
    pub fn exists(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn index_of(&self, name: &str) -> RepositoryResult<usize> {
        self.position(name)
            .ok_or_else(|| RepositoryError::CategoryNotFound(name.trim().to_owned()))
    }

    /// Returns the registered category with this name after trimming.
    pub fn lookup(&self, name: &str) -> RepositoryResult<CategoryName> {
        let index = self.index_of(name)?;
        self.get(index)
    }

    fn position(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.names.read().iter().position(|n| n.as_str() == name)
    }

    /// Returns the category at `index` (zero-based, insertion order).
    pub fn get(&self, index: usize) -> RepositoryResult<CategoryName> {
        let names = self.names.read();
        names
            .get(index)
            .cloned()
            .ok_or(RepositoryError::CategoryIndexOutOfRange {
                index,
                len: names.len(),
            })
    }

    /// Adds a category.
    ///
    /// Surrounding whitespace is trimmed before the duplicate check.
    ///
    /// # Errors
    ///
    /// - `InvalidCategoryName` for empty/whitespace names or names that are unsafe as a
    ///   directory segment or list entry
    /// - `CategoryExists` if the trimmed name is already registered
    /// - directory creation or persistence failures, in which case the registry is unchanged
    pub fn add(&self, name: &str) -> RepositoryResult<CategoryName> {
        let category =
            CategoryName::new(name).map_err(|reason| RepositoryError::InvalidCategoryName {
                name: name.to_owned(),
                reason,
            })?;

        let _guard = self.mutation.lock();

        let mut updated = self.list();
        if updated.contains(&category) {
            return Err(RepositoryError::CategoryExists(category.to_string()));
        }

        self.files.create_category(&category)?;

        updated.push(category.clone());
        self.store.persist(&updated)?;

        *self.names.write() = updated;
        tracing::info!("added category {}", category);
        Ok(category)
    }
}
