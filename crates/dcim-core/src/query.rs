//! Pagination, sorting and the paginated result envelope.
//!
//! Raw options arrive from an untrusted collaborator; [`ListOptions::resolve`]
//! normalizes them against a per-resource whitelist of sortable columns so
//! that client input never reaches an ORDER BY clause directly.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;
/// Fallback sort column; every table carries it.
pub const DEFAULT_SORT: &str = "created_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Raw list options as received from the caller.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// 1-indexed page number.
    pub page: Option<u64>,
    /// Page size.
    pub limit: Option<u64>,
    /// Requested sort column; validated against the resource whitelist.
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
}

/// Options after defaulting and sort-column whitelisting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedOptions {
    pub page: u64,
    pub limit: u64,
    pub sort_by: &'static str,
    pub order: SortOrder,
}

impl ResolvedOptions {
    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.limit
    }
}

impl ListOptions {
    /// Normalize against a resource's sortable-column whitelist.
    ///
    /// Absent or zero page/limit fall back to the defaults rather than
    /// erroring; a sort column not in the whitelist silently falls back
    /// to `created_at`.
    pub fn resolve(&self, sortable: &'static [&'static str]) -> ResolvedOptions {
        let page = match self.page {
            Some(p) if p >= 1 => p,
            _ => DEFAULT_PAGE,
        };
        let limit = match self.limit {
            Some(l) if l >= 1 => l,
            _ => DEFAULT_LIMIT,
        };
        let sort_by = self
            .sort_by
            .as_deref()
            .and_then(|requested| sortable.iter().find(|col| **col == requested))
            .copied()
            .unwrap_or(DEFAULT_SORT);

        ResolvedOptions {
            page,
            limit,
            sort_by,
            order: self.sort_order.unwrap_or_default(),
        }
    }
}

/// A paginated result set; shape is stable across all resources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub results: Vec<T>,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
    pub total_results: u64,
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>, page: u64, limit: u64, total_results: u64) -> Self {
        Self {
            results,
            page,
            limit,
            total_pages: total_results.div_ceil(limit),
            total_results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SORTABLE: &[&str] = &["name", "created_at", "updated_at"];

    #[test]
    fn defaults_apply_when_options_are_absent() {
        let resolved = ListOptions::default().resolve(SORTABLE);
        assert_eq!(resolved.page, 1);
        assert_eq!(resolved.limit, 10);
        assert_eq!(resolved.sort_by, "created_at");
        assert_eq!(resolved.order, SortOrder::Desc);
        assert_eq!(resolved.offset(), 0);
    }

    #[test]
    fn zero_page_and_limit_fall_back_to_defaults() {
        let options = ListOptions {
            page: Some(0),
            limit: Some(0),
            ..Default::default()
        };
        let resolved = options.resolve(SORTABLE);
        assert_eq!(resolved.page, 1);
        assert_eq!(resolved.limit, 10);
    }

    #[test]
    fn unknown_sort_column_falls_back() {
        let options = ListOptions {
            sort_by: Some("password_hash; DROP TABLE user".into()),
            sort_order: Some(SortOrder::Asc),
            ..Default::default()
        };
        let resolved = options.resolve(SORTABLE);
        assert_eq!(resolved.sort_by, "created_at");
        assert_eq!(resolved.order, SortOrder::Asc);
    }

    #[test]
    fn whitelisted_sort_column_is_kept() {
        let options = ListOptions {
            sort_by: Some("name".into()),
            ..Default::default()
        };
        assert_eq!(options.resolve(SORTABLE).sort_by, "name");
    }

    #[test]
    fn offset_reflects_page_and_limit() {
        let options = ListOptions {
            page: Some(3),
            limit: Some(25),
            ..Default::default()
        };
        assert_eq!(options.resolve(SORTABLE).offset(), 50);
    }

    #[test]
    fn page_math_rounds_up() {
        let page = Page::new(vec![1, 2, 3], 1, 10, 23);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_results, 23);
    }

    #[test]
    fn empty_set_has_zero_pages() {
        let page: Page<u32> = Page::new(vec![], 1, 10, 0);
        assert_eq!(page.total_pages, 0);
    }
}
