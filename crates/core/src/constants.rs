//! Constants used throughout the StudyShare core crate.
//!
//! Defaults here are what a freshly initialised configuration file contains.

/// Configuration file used when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "studyshare.yaml";

/// Directory (relative to the configuration file) holding one directory per category.
pub const DEFAULT_FILES_DIR: &str = "files";

/// Stats ledger file (relative to the configuration file).
pub const DEFAULT_STATS_FILE: &str = "user_stats.json";

/// Upload size limit: 50 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Comma-joined extension allow-list.
pub const DEFAULT_ALLOWED_EXTENSIONS: &str =
    ".pdf,.docx,.jpg,.jpeg,.png,.txt,.zip,.rar,.pptx,.xls,.xlsx";

/// Comma-joined seed categories.
pub const DEFAULT_CATEGORIES: &str =
    "Математика,Физика,Бағдарламалау,Диплом жұмыстары,Информатика,IT,Ағылшын тілі,Тарих";

/// Files per catalog page.
pub const DEFAULT_PAGE_SIZE: usize = 5;

/// Minimum number of characters in a normalised search query.
pub const MIN_SEARCH_QUERY_CHARS: usize = 3;

/// Leaderboard length used when the caller does not choose one.
pub const DEFAULT_TOP_USERS: usize = 10;

/// Search hits a caller shows before truncating.
pub const DEFAULT_SEARCH_DISPLAY_LIMIT: usize = 10;

pub const DEFAULT_WEBHOOK_PORT: u16 = 8443;

pub const DEFAULT_WEBHOOK_LISTEN: &str = "0.0.0.0";
