//! # StudyShare Core
//!
//! Business logic for the study-material repository.
//!
//! This crate sequences the pieces a transport needs:
//! - [`registry::CategoryRegistry`]: the ordered, additive set of categories and their persistence
//! - [`catalog::Catalog`]: paginated listing and substring search over stored files
//! - [`stats::StatsLedger`]: per-user upload counts in a JSON ledger
//! - [`mirror::CloudMirror`]: best-effort secondary copies of uploads
//! - [`config`]: the YAML configuration file and the resolved [`config::RepositoryConfig`]
//! - [`repository::Repository`]: the facade that ties them together
//!
//! File storage itself lives in `studyshare_files`. Message handling, keyboards and other
//! transport concerns belong to the caller.
//!
//! ```no_run
//! use studyshare_core::config::AppConfig;
//! use studyshare_core::registry::ConfigFileCategoryStore;
//! use studyshare_core::repository::{Repository, Uploader};
//! use studyshare_types::UserId;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let path = Path::new("studyshare.yaml");
//! let config = AppConfig::load_or_init(path)?.resolve(Path::new("."))?;
//! let repo = Repository::open(&config, Box::new(ConfigFileCategoryStore::new(path)))?;
//!
//! let uploader = Uploader::new(UserId::from(42), Some("alice".into()));
//! let body = std::fs::File::open("notes.pdf")?;
//! let outcome = repo.submit_upload("Математика", "notes.pdf", 1024, body, &uploader)?;
//! println!("stored as {}", outcome.file.name);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod mirror;
pub mod registry;
pub mod repository;
pub mod stats;
pub mod validation;

pub use error::{ErrorClass, RepositoryError, RepositoryResult};
pub use repository::{Repository, UploadOutcome, Uploader};
