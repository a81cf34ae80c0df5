//! Key/value search predicate and result pagination.

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{Error, Result};
use crate::models::Metadata;

/// True when the record's `key` field equals `value` exactly.
///
/// Unknown keys never match.
pub fn matches_key_value(metadata: &Metadata, key: &str, value: &str) -> bool {
    metadata.field(key).is_some_and(|field| field == value)
}

/// Validated pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: usize,
    pub limit: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: defaults::PAGE,
            limit: defaults::PAGE_LIMIT,
        }
    }
}

impl PageRequest {
    /// Build a request, rejecting `page < 1` and `limit` outside `1..=100`.
    pub fn new(page: usize, limit: usize) -> Result<Self> {
        if page < 1 {
            return Err(Error::Validation(format!(
                "page must be at least 1, got {}",
                page
            )));
        }
        if !(1..=defaults::PAGE_LIMIT_MAX).contains(&limit) {
            return Err(Error::Validation(format!(
                "limit must be between 1 and {}, got {}",
                defaults::PAGE_LIMIT_MAX,
                limit
            )));
        }
        Ok(Self { page, limit })
    }

    /// Number of records skipped before this page.
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// One page of results plus the bookkeeping clients need to walk pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub results: Vec<T>,
    pub total_count: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl<T> Page<T> {
    /// Slice `items` down to the requested window.
    ///
    /// An offset at or past the end yields empty results with the totals
    /// still reported.
    pub fn paginate(items: Vec<T>, request: PageRequest) -> Self {
        let total_count = items.len();
        let total_pages = total_count.div_ceil(request.limit);

        let results: Vec<T> = items
            .into_iter()
            .skip(request.offset())
            .take(request.limit)
            .collect();

        Self {
            results,
            total_count,
            page: request.page,
            limit: request.limit,
            total_pages,
            has_next: request.page < total_pages,
            has_prev: request.page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    #[test]
    fn test_page_request_bounds() {
        assert!(PageRequest::new(1, 1).is_ok());
        assert!(PageRequest::new(3, 100).is_ok());
        assert!(matches!(PageRequest::new(0, 10), Err(Error::Validation(_))));
        assert!(matches!(PageRequest::new(1, 0), Err(Error::Validation(_))));
        assert!(matches!(PageRequest::new(1, 101), Err(Error::Validation(_))));
    }

    #[test]
    fn test_page_request_default() {
        let req = PageRequest::default();
        assert_eq!(req.page, 1);
        assert_eq!(req.limit, 10);
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn test_last_partial_page() {
        let page = Page::paginate(numbers(25), PageRequest::new(3, 10).unwrap());
        assert_eq!(page.results, vec![20, 21, 22, 23, 24]);
        assert_eq!(page.total_count, 25);
        assert_eq!(page.total_pages, 3);
        assert!(!page.has_next);
        assert!(page.has_prev);
    }

    #[test]
    fn test_page_past_end_is_empty() {
        let page = Page::paginate(numbers(25), PageRequest::new(10, 10).unwrap());
        assert!(page.results.is_empty());
        assert_eq!(page.total_count, 25);
        assert_eq!(page.total_pages, 3);
        assert!(!page.has_next);
        assert!(page.has_prev);
    }

    #[test]
    fn test_first_page_flags() {
        let page = Page::paginate(numbers(25), PageRequest::default());
        assert_eq!(page.results.len(), 10);
        assert!(page.has_next);
        assert!(!page.has_prev);
    }

    #[test]
    fn test_empty_input() {
        let page = Page::paginate(Vec::<usize>::new(), PageRequest::default());
        assert!(page.results.is_empty());
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next);
        assert!(!page.has_prev);
    }

    #[test]
    fn test_matches_key_value_exact() {
        let meta = Metadata {
            author: "Ada".to_string(),
            ..Default::default()
        };
        assert!(matches_key_value(&meta, "Author", "Ada"));
        assert!(!matches_key_value(&meta, "Author", "ada"));
        assert!(!matches_key_value(&meta, "Author", "Ad"));
        assert!(!matches_key_value(&meta, "author", "Ada"));
        assert!(!matches_key_value(&meta, "Publisher", "Ada"));
    }

    #[test]
    fn test_matches_uuid_field() {
        let meta = Metadata::new("Notes");
        let id = meta.id.unwrap().to_string();
        assert!(matches_key_value(&meta, "Uuid", &id));
    }
}
