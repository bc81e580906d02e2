//! Read-side queries over the file store: pagination and substring search.
//!
//! Results are computed from the filesystem on every call, so two identical queries over an
//! unchanged catalog return identical results.

use crate::validation::{normalize_search_query, validate_page_size};
use crate::{RepositoryError, RepositoryResult};
use serde::Serialize;
use std::sync::Arc;
use studyshare_files::{FileStore, FilesError, StoredFile};
use studyshare_types::CategoryName;

/// One page of a category listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub items: Vec<StoredFile>,
    /// One-based
    pub page_number: usize,
    /// At least 1, even for an empty category
    pub total_pages: usize,
    pub total_items: usize,
}

impl Page {
    /// One-based position of the first item on this page within the whole listing.
    pub fn first_position(&self, page_size: usize) -> usize {
        (self.page_number - 1) * page_size + 1
    }

    pub fn has_next(&self) -> bool {
        self.page_number < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page_number > 1
    }
}

/// A search match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub category: CategoryName,
    pub file: StoredFile,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    files: Arc<FileStore>,
}

impl Catalog {
    pub fn new(files: Arc<FileStore>) -> Self {
        Self { files }
    }

    /// Returns page `page_number` (one-based) of `category`'s files in ascending filename order.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if `page_size` is zero
    /// - `InvalidPage` if `page_number` is outside `1..=total_pages`
    /// - `Files(CategoryNotFound)` if the category directory does not exist
    pub fn page(
        &self,
        category: &CategoryName,
        page_number: usize,
        page_size: usize,
    ) -> RepositoryResult<Page> {
        validate_page_size(page_size)?;

        let all = self.files.list(category)?;
        let total_items = all.len();
        let total_pages = total_items.div_ceil(page_size).max(1);

        if page_number == 0 || page_number > total_pages {
            return Err(RepositoryError::InvalidPage {
                page: page_number,
                total_pages,
            });
        }

        let items = all
            .into_iter()
            .skip((page_number - 1) * page_size)
            .take(page_size)
            .collect();

        Ok(Page {
            items,
            page_number,
            total_pages,
            total_items,
        })
    }

    /// Finds files whose name, or whose category's name, contains `query`.
    ///
    /// Matching is case-insensitive on the trimmed query. Results are category-major in the
    /// order of `categories`, then ascending by filename. Categories whose directory is
    /// missing are skipped. The result is not truncated.
    ///
    /// # Errors
    ///
    /// Returns `QueryTooShort` if the normalised query has fewer than three characters.
    pub fn search(
        &self,
        query: &str,
        categories: &[CategoryName],
    ) -> RepositoryResult<Vec<SearchHit>> {
        let needle = normalize_search_query(query)?;
        let mut hits = Vec::new();

        for category in categories {
            let files = match self.files.list(category) {
                Ok(files) => files,
                Err(FilesError::CategoryNotFound(_)) => {
                    tracing::debug!("search skipping category without directory: {}", category);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let category_matches = category.as_str().to_lowercase().contains(&needle);

            hits.extend(
                files
                    .into_iter()
                    .filter(|f| category_matches || f.name.to_lowercase().contains(&needle))
                    .map(|file| SearchHit {
                        category: category.clone(),
                        file,
                    }),
            );
        }

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn cat(name: &str) -> CategoryName {
        CategoryName::new(name).unwrap()
    }

    fn catalog_with(temp: &TempDir, layout: &[(&str, &[&str])]) -> (Catalog, Vec<CategoryName>) {
        let files = Arc::new(FileStore::open(&temp.path().join("files")).unwrap());
        let mut categories = Vec::new();
        for (category, names) in layout {
            let category = cat(category);
            files.create_category(&category).unwrap();
            for name in *names {
                fs::write(files.category_dir(&category).join(name), name.as_bytes()).unwrap();
            }
            categories.push(category);
        }
        (Catalog::new(files), categories)
    }

    fn names(page: &Page) -> Vec<&str> {
        page.items.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_empty_category_has_one_page() {
        let temp = TempDir::new().unwrap();
        let (catalog, _) = catalog_with(&temp, &[("Math", &[])]);

        let page = catalog.page(&cat("Math"), 1, 5).unwrap();

        assert!(page.items.is_empty());
        assert_eq!(page.page_number, 1);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.total_items, 0);
        assert!(!page.has_next());
    }

    #[test]
    fn test_pages_split_in_order() {
        let temp = TempDir::new().unwrap();
        let (catalog, _) = catalog_with(
            &temp,
            &[(
                "Math",
                &["f.pdf", "a.pdf", "c.pdf", "b.pdf", "e.pdf", "g.pdf", "d.pdf"],
            )],
        );

        let first = catalog.page(&cat("Math"), 1, 5).unwrap();
        let second = catalog.page(&cat("Math"), 2, 5).unwrap();

        assert_eq!(first.total_pages, 2);
        assert_eq!(names(&first), vec!["a.pdf", "b.pdf", "c.pdf", "d.pdf", "e.pdf"]);
        assert_eq!(names(&second), vec!["f.pdf", "g.pdf"]);
        assert_eq!(second.first_position(5), 6);
        assert!(second.has_previous());
        assert!(!second.has_next());
    }

    #[test]
    fn test_pages_concatenate_to_listing() {
        let temp = TempDir::new().unwrap();
        let files: Vec<String> = (0..13).map(|i| format!("file{i:02}.pdf")).collect();
        let refs: Vec<&str> = files.iter().map(String::as_str).collect();
        let (catalog, _) = catalog_with(&temp, &[("Math", refs.as_slice())]);
        let expected: Vec<String> = catalog
            .files
            .list(&cat("Math"))
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();

        for page_size in 1..=15 {
            let first = catalog.page(&cat("Math"), 1, page_size).unwrap();
            let mut collected = Vec::new();
            for p in 1..=first.total_pages {
                let page = catalog.page(&cat("Math"), p, page_size).unwrap();
                collected.extend(page.items.into_iter().map(|f| f.name));
            }
            assert_eq!(collected, expected, "page size {page_size}");
        }
    }

    #[test]
    fn test_out_of_range_pages() {
        let temp = TempDir::new().unwrap();
        let (catalog, _) = catalog_with(&temp, &[("Math", &["a.pdf"])]);

        assert!(matches!(
            catalog.page(&cat("Math"), 0, 5),
            Err(RepositoryError::InvalidPage { page: 0, total_pages: 1 })
        ));
        assert!(matches!(
            catalog.page(&cat("Math"), 2, 5),
            Err(RepositoryError::InvalidPage { page: 2, total_pages: 1 })
        ));
        assert!(matches!(
            catalog.page(&cat("Math"), 1, 0),
            Err(RepositoryError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_page_missing_category() {
        let temp = TempDir::new().unwrap();
        let (catalog, _) = catalog_with(&temp, &[]);

        assert!(matches!(
            catalog.page(&cat("Math"), 1, 5),
            Err(RepositoryError::Files(FilesError::CategoryNotFound(_)))
        ));
    }

    #[test]
    fn test_search_short_query() {
        let temp = TempDir::new().unwrap();
        let (catalog, categories) = catalog_with(&temp, &[("Math", &["matrix.pdf"])]);

        assert!(matches!(
            catalog.search("ma", &categories),
            Err(RepositoryError::QueryTooShort { min: 3 })
        ));
    }

    #[test]
    fn test_search_matches_filename_and_category() {
        let temp = TempDir::new().unwrap();
        let (catalog, categories) = catalog_with(
            &temp,
            &[
                ("Physics", &["Lecture-1.pdf", "lab.pdf"]),
                ("Lectures", &["b.pdf", "a.pdf"]),
                ("History", &["notes.pdf"]),
            ],
        );

        let hits = catalog.search("  LECTURE ", &categories).unwrap();

        let flat: Vec<(&str, &str)> = hits
            .iter()
            .map(|h| (h.category.as_str(), h.file.name.as_str()))
            .collect();
        assert_eq!(
            flat,
            vec![
                ("Physics", "Lecture-1.pdf"),
                ("Lectures", "a.pdf"),
                ("Lectures", "b.pdf"),
            ]
        );
    }

    #[test]
    fn test_search_follows_given_category_order() {
        let temp = TempDir::new().unwrap();
        let (catalog, mut categories) =
            catalog_with(&temp, &[("A", &["notes.pdf"]), ("B", &["notes.pdf"])]);
        categories.reverse();

        let hits = catalog.search("notes", &categories).unwrap();

        let order: Vec<&str> = hits.iter().map(|h| h.category.as_str()).collect();
        assert_eq!(order, vec!["B", "A"]);
    }

    #[test]
    fn test_search_skips_missing_directories() {
        let temp = TempDir::new().unwrap();
        let (catalog, mut categories) = catalog_with(&temp, &[("Math", &["algebra.pdf"])]);
        categories.insert(0, cat("Ghost"));

        let hits = catalog.search("algebra", &categories).unwrap();

        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_search_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let (catalog, categories) =
            catalog_with(&temp, &[("Math", &["algebra.pdf", "algorithms.pdf"])]);

        let first = catalog.search("alg", &categories).unwrap();
        let second = catalog.search("alg", &categories).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_search_unicode_case_folding() {
        let temp = TempDir::new().unwrap();
        let (catalog, categories) = catalog_with(&temp, &[("Математика", &["x.pdf"])]);

        let hits = catalog.search("МАТЕМ", &categories).unwrap();

        assert_eq!(hits.len(), 1);
    }
}
