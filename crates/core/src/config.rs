//! Runtime configuration.
//!
//! Configuration lives in a human-editable YAML file. It is read once at process startup and
//! resolved into a [`RepositoryConfig`] that is passed into the repository; nothing in the
//! core reads the environment or the file again while handling requests. The one exception
//! is the category list, which the registry writes back through
//! [`crate::registry::ConfigFileCategoryStore`] when a category is added.
//!
//! ```yaml
//! bot:
//!   token: "123:abc"
//!   admin_ids: [123456789]
//! files:
//!   max_file_size: 52428800
//!   allowed_extensions: .pdf,.docx
//! general:
//!   university_site: https://example.edu
//!   categories: Math,Physics
//! webhook:
//!   host: ""
//!   port: 8443
//!   listen: 0.0.0.0
//! storage:
//!   files_dir: files
//!   stats_file: user_stats.json
//! ```

use crate::constants::{
    DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_CATEGORIES, DEFAULT_FILES_DIR, DEFAULT_MAX_FILE_SIZE,
    DEFAULT_PAGE_SIZE, DEFAULT_STATS_FILE, DEFAULT_WEBHOOK_LISTEN, DEFAULT_WEBHOOK_PORT,
};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use studyshare_files::{ExtensionPolicy, UploadLimits};
use studyshare_types::CategoryName;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}", path = path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write config file {path}: {source}", path = path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}", path = path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Transport settings; carried for the bot, not interpreted by the core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotSection {
    pub token: String,
    pub admin_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesSection {
    pub max_file_size: u64,
    /// Comma-joined, `*` admits everything
    pub allowed_extensions: String,
}

impl Default for FilesSection {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSection {
    pub university_site: String,
    /// Comma-joined category names in registry order
    pub categories: String,
}

impl Default for GeneralSection {
    fn default() -> Self {
        Self {
            university_site: String::new(),
            categories: DEFAULT_CATEGORIES.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookSection {
    pub host: String,
    pub port: u16,
    pub listen: String,
}

impl Default for WebhookSection {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_WEBHOOK_PORT,
            listen: DEFAULT_WEBHOOK_LISTEN.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub files_dir: PathBuf,
    pub stats_file: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirror_dir: Option<PathBuf>,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            files_dir: PathBuf::from(DEFAULT_FILES_DIR),
            stats_file: PathBuf::from(DEFAULT_STATS_FILE),
            mirror_dir: None,
        }
    }
}

/// The configuration file as written on disk.
///
/// Every section and key is optional when reading; missing values take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bot: BotSection,
    pub files: FilesSection,
    pub general: GeneralSection,
    pub webhook: WebhookSection,
    pub storage: StorageSection,
}

impl AppConfig {
    /// Reads and parses the configuration file at `path`.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads the configuration file, writing the defaults first if it does not exist.
    pub fn load_or_init(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            return Self::load(path);
        }

        let config = Self::default();
        config.save(path)?;
        tracing::info!("created default configuration file: {}", path.display());
        Ok(config)
    }

    /// Writes the configuration to `path`, replacing the previous file atomically.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let yaml = serde_yaml::to_string(self).map_err(ConfigError::Serialize)?;
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(write_err)?;

        let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        staged.write_all(yaml.as_bytes()).map_err(write_err)?;
        staged.persist(path).map_err(|e| write_err(e.error))?;
        Ok(())
    }

    /// Replaces the bot token when an override (typically from the environment) is present.
    pub fn with_token_override(mut self, token: Option<String>) -> Self {
        if let Some(token) = token.map(|t| t.trim().to_owned()).filter(|t| !t.is_empty()) {
            self.bot.token = token;
        }
        self
    }

    /// Category names from `general.categories`, trimmed, empties dropped, in file order.
    pub fn category_names(&self) -> Vec<String> {
        self.general
            .categories
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect()
    }

    pub fn set_categories(&mut self, names: &[CategoryName]) {
        self.general.categories = names
            .iter()
            .map(CategoryName::as_str)
            .collect::<Vec<_>>()
            .join(",");
    }

    /// Validated upload limits.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `max_file_size` is zero.
    pub fn upload_limits(&self) -> ConfigResult<UploadLimits> {
        if self.files.max_file_size == 0 {
            return Err(ConfigError::Invalid(
                "files.max_file_size must be greater than zero".into(),
            ));
        }

        Ok(UploadLimits::new(
            self.files.max_file_size,
            ExtensionPolicy::parse(&self.files.allowed_extensions),
        ))
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.bot.admin_ids.contains(&user_id)
    }

    /// Resolves the file into a [`RepositoryConfig`].
    ///
    /// Relative storage paths are taken relative to `base_dir`, normally the directory
    /// containing the configuration file.
    pub fn resolve(&self, base_dir: &Path) -> ConfigResult<RepositoryConfig> {
        let absolutize = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                base_dir.join(p)
            }
        };

        RepositoryConfig::new(
            absolutize(&self.storage.files_dir),
            absolutize(&self.storage.stats_file),
            self.storage.mirror_dir.as_deref().map(absolutize),
            self.upload_limits()?,
            DEFAULT_PAGE_SIZE,
            self.category_names(),
        )
    }
}

/// Repository configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct RepositoryConfig {
    files_dir: PathBuf,
    stats_file: PathBuf,
    mirror_dir: Option<PathBuf>,
    limits: UploadLimits,
    page_size: usize,
    initial_categories: Vec<String>,
}

impl RepositoryConfig {
    pub fn new(
        files_dir: PathBuf,
        stats_file: PathBuf,
        mirror_dir: Option<PathBuf>,
        limits: UploadLimits,
        page_size: usize,
        initial_categories: Vec<String>,
    ) -> ConfigResult<Self> {
        if page_size == 0 {
            return Err(ConfigError::Invalid("page size must be at least 1".into()));
        }

        if limits.max_file_size == 0 {
            return Err(ConfigError::Invalid(
                "max_file_size must be greater than zero".into(),
            ));
        }

        Ok(Self {
            files_dir,
            stats_file,
            mirror_dir,
            limits,
            page_size,
            initial_categories,
        })
    }

    pub fn files_dir(&self) -> &Path {
        &self.files_dir
    }

    pub fn stats_file(&self) -> &Path {
        &self.stats_file
    }

    pub fn mirror_dir(&self) -> Option<&Path> {
        self.mirror_dir.as_deref()
    }

    pub fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn initial_categories(&self) -> &[String] {
        &self.initial_categories
    }
}
