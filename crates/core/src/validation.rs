//! Input validation utilities.
//!
//! This module contains functions for validating and normalising user input before it is
//! used in catalog queries.

use crate::constants::MIN_SEARCH_QUERY_CHARS;
use crate::{RepositoryError, RepositoryResult};

/// Normalises a free-text search query: trimmed and lower-cased.
///
/// # Errors
///
/// Returns `RepositoryError::QueryTooShort` if the normalised query has fewer than
/// [`MIN_SEARCH_QUERY_CHARS`] characters (counted as Unicode scalar values, not bytes).
pub fn normalize_search_query(query: &str) -> RepositoryResult<String> {
    let normalized = query.trim().to_lowercase();

    if normalized.chars().count() < MIN_SEARCH_QUERY_CHARS {
        return Err(RepositoryError::QueryTooShort {
            min: MIN_SEARCH_QUERY_CHARS,
        });
    }

    Ok(normalized)
}

/// Validates a page size.
pub fn validate_page_size(page_size: usize) -> RepositoryResult<()> {
    if page_size == 0 {
        return Err(RepositoryError::InvalidInput(
            "page size must be at least 1".into(),
        ));
    }
    Ok(())
}
