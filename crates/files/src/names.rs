//! Filename sanitisation, extension policy and collision naming.
//!
//! Everything in this module is pure string manipulation; no filesystem access happens
//! here. [`crate::FileStore`] combines these helpers with directory probing.

use crate::constants::{COLLISION_SEPARATOR, EXTENSION_WILDCARD, REPLACEMENT_CHAR};
use crate::{FilesError, FilesResult};
use serde::{Deserialize, Serialize};

fn is_allowed_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '-' | '[' | ']' | '(' | ')')
}

/// Turns a user-supplied filename into a safe, single path segment.
///
/// - Every run of characters outside the allow-list (Unicode alphanumerics plus
///   `_ . - [ ] ( )`) collapses into a single `_`.
/// - A leading `.` becomes `_`, so the result is never hidden and never `.` or `..`.
/// - An empty input yields `_`.
///
/// Path separators are outside the allow-list, so the result cannot traverse directories.
pub fn sanitize_filename(proposed: &str) -> String {
    let mut out = String::with_capacity(proposed.len());
    let mut in_run = false;

    for c in proposed.chars() {
        if is_allowed_char(c) {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push(REPLACEMENT_CHAR);
            in_run = true;
        }
    }

    if out.starts_with('.') {
        out.replace_range(..1, &REPLACEMENT_CHAR.to_string());
    }

    if out.is_empty() {
        out.push(REPLACEMENT_CHAR);
    }

    out
}

/// Splits a filename into `(stem, extension)`, the extension keeping its leading dot.
///
/// The extension starts at the last dot, unless that dot is the first character, in which
/// case there is no extension (`.profile` has stem `.profile`).
pub fn split_extension(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => filename.split_at(idx),
        _ => (filename, ""),
    }
}

/// Name used for the `attempt`-th collision: `notes.pdf` → `notes_3.pdf`.
///
/// Attempt zero is the unmodified name.
pub fn collision_name(filename: &str, attempt: u64) -> String {
    if attempt == 0 {
        return filename.to_owned();
    }
    let (stem, ext) = split_extension(filename);
    format!("{stem}{COLLISION_SEPARATOR}{attempt}{ext}")
}

/// Checks that a filename handed to a read or delete path is a plain, visible segment.
///
/// This is enforced independently of [`sanitize_filename`] because callers may pass names
/// straight from user input.
pub fn validate_stored_name(filename: &str) -> FilesResult<()> {
    if filename.is_empty() {
        return Err(FilesError::InvalidFileName("filename cannot be empty".into()));
    }

    if filename.contains(['/', '\\', '\0']) {
        return Err(FilesError::InvalidFileName(format!(
            "filename must be a single path segment: {filename:?}"
        )));
    }

    // Covers `.`, `..` and in-flight temp files.
    if filename.starts_with('.') {
        return Err(FilesError::InvalidFileName(format!(
            "filename must not start with a dot: {filename:?}"
        )));
    }

    Ok(())
}

/// Which file extensions an upload may carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtensionPolicy {
    /// Wildcard: every extension, including none, is accepted.
    Any,
    /// Only the listed extensions (lowercase, with leading dot).
    Only(Vec<String>),
}

impl ExtensionPolicy {
    /// Builds a policy from configured entries.
    ///
    /// Entries are trimmed and lower-cased and gain a leading dot when missing; empty
    /// entries are dropped. Any `*` entry turns the policy into [`ExtensionPolicy::Any`].
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut allowed: Vec<String> = Vec::new();

        for entry in entries {
            let entry = entry.as_ref().trim().to_lowercase();
            if entry.is_empty() {
                continue;
            }
            if entry == EXTENSION_WILDCARD {
                return Self::Any;
            }
            let normalised = if entry.starts_with('.') {
                entry
            } else {
                format!(".{entry}")
            };
            if !allowed.contains(&normalised) {
                allowed.push(normalised);
            }
        }

        Self::Only(allowed)
    }

    /// Parses the comma-joined form used in the configuration file.
    pub fn parse(list: &str) -> Self {
        Self::from_entries(list.split(','))
    }

    /// Comma-joined form, the inverse of [`ExtensionPolicy::parse`].
    pub fn to_list_string(&self) -> String {
        match self {
            Self::Any => EXTENSION_WILDCARD.to_owned(),
            Self::Only(allowed) => allowed.join(","),
        }
    }

    /// Whether a lowercased extension (with leading dot, or empty) is admitted.
    pub fn allows(&self, extension: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Only(allowed) => allowed.iter().any(|a| a == extension),
        }
    }
}

/// Constraints applied to every submitted file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_file_size: u64,
    pub allowed_extensions: ExtensionPolicy,
}

impl UploadLimits {
    pub fn new(max_file_size: u64, allowed_extensions: ExtensionPolicy) -> Self {
        Self {
            max_file_size,
            allowed_extensions,
        }
    }

    /// Validates a sanitised filename and its declared size against these limits.
    pub(crate) fn check(&self, filename: &str, declared_size: u64) -> FilesResult<()> {
        if declared_size > self.max_file_size {
            return Err(FilesError::FileTooLarge {
                size: declared_size,
                max: self.max_file_size,
            });
        }

        let extension = split_extension(filename).1.to_lowercase();
        if !self.allowed_extensions.allows(&extension) {
            return Err(FilesError::DisallowedExtension { extension });
        }

        Ok(())
    }
}
