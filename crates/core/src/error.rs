use crate::config::ConfigError;
use std::path::PathBuf;
use studyshare_files::FilesError;
use studyshare_types::TextError;

/// Coarse classification of a failure, for callers deciding how to report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad input from the user; safe to show and retry with different input
    Validation,
    /// The named category, file or stats record does not exist
    NotFound,
    /// Disk or persisted-state failure; the caller may re-invoke
    Io,
    /// An external collaborator (the cloud mirror) failed
    Collaborator,
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid category name {name:?}: {reason}")]
    InvalidCategoryName {
        name: String,
        #[source]
        reason: TextError,
    },
    #[error("category already exists: {0}")]
    CategoryExists(String),
    #[error("category not found: {0}")]
    CategoryNotFound(String),
    #[error("category index {index} is out of range (have {len})")]
    CategoryIndexOutOfRange { index: usize, len: usize },
    #[error("page {page} is out of range (1..={total_pages})")]
    InvalidPage { page: usize, total_pages: usize },
    #[error("search query must have at least {min} characters")]
    QueryTooShort { min: usize },
    #[error("no stats recorded for user {0}")]
    StatsRecordNotFound(String),

    #[error(transparent)]
    Files(#[from] FilesError),
    #[error("failed to read stats ledger: {0}")]
    StatsRead(std::io::Error),
    #[error("failed to write stats ledger: {0}")]
    StatsWrite(std::io::Error),
    #[error(
        "stats ledger {path} is not valid JSON and was left untouched: {source}",
        path = path.display()
    )]
    StatsCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize stats ledger: {0}")]
    StatsSerialization(serde_json::Error),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl RepositoryError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidInput(_)
            | Self::InvalidCategoryName { .. }
            | Self::CategoryExists(_)
            | Self::InvalidPage { .. }
            | Self::QueryTooShort { .. } => ErrorClass::Validation,

            Self::CategoryNotFound(_)
            | Self::CategoryIndexOutOfRange { .. }
            | Self::StatsRecordNotFound(_) => ErrorClass::NotFound,

            Self::Files(e) => match e {
                FilesError::InvalidFileName(_)
                | FilesError::FileTooLarge { .. }
                | FilesError::DisallowedExtension { .. } => ErrorClass::Validation,
                FilesError::CategoryNotFound(_) | FilesError::FileNotFound { .. } => {
                    ErrorClass::NotFound
                }
                FilesError::InvalidRootDirectory(_)
                | FilesError::WriteFailed(_)
                | FilesError::Io(_) => ErrorClass::Io,
            },

            Self::Config(ConfigError::Invalid(_)) => ErrorClass::Validation,

            Self::StatsRead(_)
            | Self::StatsWrite(_)
            | Self::StatsCorrupt { .. }
            | Self::StatsSerialization(_)
            | Self::Config(_) => ErrorClass::Io,
        }
    }
}

pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;
