/// Prefix of in-flight upload files inside a category directory.
///
/// Anything starting with a dot is invisible to listings and rejected by `resolve`, so a
/// partially written upload can never be returned as a stored file.
pub const TEMP_FILE_PREFIX: &str = ".upload-";

/// Separator placed between a file stem and its collision counter (`notes_1.pdf`).
pub const COLLISION_SEPARATOR: char = '_';

/// Replacement for characters outside the filename allow-list.
pub const REPLACEMENT_CHAR: char = '_';

/// Extension-list entry that admits every file type.
pub const EXTENSION_WILDCARD: &str = "*";
