//! List-query resolution shared by every collection endpoint.
//!
//! Raw query parameters (`page`, `page_size`, `sort`) are validated and turned
//! into a [`ListQuery`]: a bounded limit/offset pair plus a sort column that is
//! guaranteed to come from the endpoint's static allow-list. Storage backends
//! interpolate [`ListQuery::sort_column`] into SQL, so it must never carry a
//! user-supplied string.
//!
//! ```text
//! ?page=3&page_size=20&sort=-name
//!          │
//!          ▼
//! ListQuery { page: 3, page_size: 20, sort_column: "name", direction: Desc }
//!          │
//!          ▼
//! ORDER BY name DESC, id ASC LIMIT 20 OFFSET 40
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::error::AppResult;
use crate::validation::{Validator, permitted_value};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;
pub const DEFAULT_SORT: &str = "id";

/// Sortable columns for `GET /v1/products`.
pub const PRODUCT_SORT_SAFELIST: &[&str] = &["id", "name", "-id", "-name"];

/// Sortable columns for `GET /v1/reviews`.
pub const REVIEW_SORT_SAFELIST: &[&str] = &["id", "author", "-id", "-author"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A validated, bounded list request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u64,
    pub page_size: u64,
    /// Column name taken from the allow-list entry, `-` stripped.
    pub sort_column: &'static str,
    pub direction: SortDirection,
}

impl ListQuery {
    /// Validate `page`, `page_size` and `sort` from the query string.
    ///
    /// Missing parameters take their defaults. Any violation yields
    /// `AppError::FailedValidation` naming the offending field and no query
    /// is produced.
    pub fn from_params(
        params: &HashMap<String, String>,
        safelist: &'static [&'static str],
    ) -> AppResult<Self> {
        let mut v = Validator::new();

        let page = read_int(params, "page", DEFAULT_PAGE, &mut v);
        let page_size = read_int(params, "page_size", DEFAULT_PAGE_SIZE, &mut v);
        let sort = params
            .get("sort")
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SORT);

        v.check(page > 0, "page", "must be greater than zero");
        v.check(page_size > 0, "page_size", "must be greater than zero");
        v.check(
            page_size <= MAX_PAGE_SIZE,
            "page_size",
            "must be a maximum of 100",
        );

        v.check(permitted_value(sort, safelist), "sort", "invalid sort value");

        v.into_result()?;

        // The column handed to storage is the allow-list's own string
        let (sort_column, direction) = safelist
            .iter()
            .copied()
            .find(|entry| *entry == sort)
            .map_or((DEFAULT_SORT, SortDirection::Asc), split_sort);

        Ok(Self {
            page: page.unsigned_abs(),
            page_size: page_size.unsigned_abs(),
            sort_column,
            direction,
        })
    }

    pub fn limit(&self) -> u64 {
        self.page_size
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }
}

/// Split an allow-list entry into its column and direction.
fn split_sort(entry: &'static str) -> (&'static str, SortDirection) {
    match entry.strip_prefix('-') {
        Some(column) => (column, SortDirection::Desc),
        None => (entry, SortDirection::Asc),
    }
}

/// Read an integer query parameter, falling back to `default` when absent.
///
/// A value that does not parse records an error and returns `default`, so the
/// range checks that follow do not add a second message for the same key.
fn read_int(params: &HashMap<String, String>, key: &str, default: i64, v: &mut Validator) -> i64 {
    match params.get(key).map(|s| s.trim()).filter(|s| !s.is_empty()) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            v.add_error(key, "must be an integer value");
            default
        }),
    }
}

/// Read a free-text filter; absent means the empty (pass-through) filter.
pub fn read_text(params: &HashMap<String, String>, key: &str) -> String {
    params.get(key).cloned().unwrap_or_default()
}

/// Pagination summary returned under `@metadata`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub current_page: u64,
    pub page_size: u64,
    pub first_page: u64,
    pub last_page: u64,
    pub total_records: u64,
}

impl Metadata {
    /// Derive page metadata from a total row count. An empty result is all zeros.
    pub fn calculate(total_records: u64, page: u64, page_size: u64) -> Self {
        if total_records == 0 || page_size == 0 {
            return Self::default();
        }

        Self {
            current_page: page,
            page_size,
            first_page: 1,
            last_page: total_records.div_ceil(page_size),
            total_records,
        }
    }

    pub fn for_query(total_records: u64, query: &ListQuery) -> Self {
        Self::calculate(total_records, query.page, query.page_size)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn field_errors(result: AppResult<ListQuery>) -> crate::error::FieldErrors {
        match result {
            Err(AppError::FailedValidation(errors)) => errors,
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults() {
        let q = ListQuery::from_params(&HashMap::new(), PRODUCT_SORT_SAFELIST).unwrap();
        assert_eq!(q.page, 1);
        assert_eq!(q.page_size, 10);
        assert_eq!(q.sort_column, "id");
        assert_eq!(q.direction, SortDirection::Asc);
        assert_eq!(q.limit(), 10);
        assert_eq!(q.offset(), 0);
    }

    #[test]
    fn test_limit_and_offset() {
        let q = ListQuery::from_params(
            &params(&[("page", "3"), ("page_size", "20")]),
            PRODUCT_SORT_SAFELIST,
        )
        .unwrap();
        assert_eq!(q.limit(), 20);
        assert_eq!(q.offset(), 40);
    }

    #[test]
    fn test_descending_sort_strips_prefix() {
        let q = ListQuery::from_params(&params(&[("sort", "-name")]), PRODUCT_SORT_SAFELIST)
            .unwrap();
        assert_eq!(q.sort_column, "name");
        assert_eq!(q.direction, SortDirection::Desc);

        let q = ListQuery::from_params(&params(&[("sort", "author")]), REVIEW_SORT_SAFELIST)
            .unwrap();
        assert_eq!(q.sort_column, "author");
        assert_eq!(q.direction, SortDirection::Asc);
    }

    #[test]
    fn test_page_size_zero_names_page_size() {
        let errors = field_errors(ListQuery::from_params(
            &params(&[("page_size", "0")]),
            PRODUCT_SORT_SAFELIST,
        ));
        assert_eq!(errors.get("page_size").unwrap(), "must be greater than zero");
        assert!(!errors.contains_key("page"));
    }

    #[test]
    fn test_page_size_over_maximum() {
        let errors = field_errors(ListQuery::from_params(
            &params(&[("page_size", "101")]),
            PRODUCT_SORT_SAFELIST,
        ));
        assert_eq!(errors.get("page_size").unwrap(), "must be a maximum of 100");

        assert!(
            ListQuery::from_params(&params(&[("page_size", "100")]), PRODUCT_SORT_SAFELIST)
                .is_ok()
        );
    }

    #[test]
    fn test_page_must_be_positive() {
        for bad in ["0", "-4"] {
            let errors = field_errors(ListQuery::from_params(
                &params(&[("page", bad)]),
                PRODUCT_SORT_SAFELIST,
            ));
            assert_eq!(errors.get("page").unwrap(), "must be greater than zero");
        }
    }

    #[test]
    fn test_non_integer_reports_once() {
        let errors = field_errors(ListQuery::from_params(
            &params(&[("page", "two"), ("page_size", "1.5")]),
            PRODUCT_SORT_SAFELIST,
        ));
        assert_eq!(errors.get("page").unwrap(), "must be an integer value");
        assert_eq!(errors.get("page_size").unwrap(), "must be an integer value");
    }

    #[test]
    fn test_sort_outside_safelist_is_rejected_for_every_list() {
        let hostile = [
            "price",
            "name; DROP TABLE products",
            "--name",
            "-",
            "ID",
            "created_at",
            " id",
        ];
        for safelist in [PRODUCT_SORT_SAFELIST, REVIEW_SORT_SAFELIST] {
            for sort in hostile {
                let errors = field_errors(ListQuery::from_params(
                    &params(&[("sort", sort)]),
                    safelist,
                ));
                assert_eq!(errors.get("sort").unwrap(), "invalid sort value");
            }
        }
        // A column valid for one endpoint is not valid for the other
        assert!(
            ListQuery::from_params(&params(&[("sort", "author")]), PRODUCT_SORT_SAFELIST).is_err()
        );
        assert!(
            ListQuery::from_params(&params(&[("sort", "-name")]), REVIEW_SORT_SAFELIST).is_err()
        );
    }

    #[test]
    fn test_every_safelist_entry_resolves_to_static_column() {
        for safelist in [PRODUCT_SORT_SAFELIST, REVIEW_SORT_SAFELIST] {
            for entry in safelist {
                let q = ListQuery::from_params(&params(&[("sort", *entry)]), safelist).unwrap();
                assert!(!q.sort_column.starts_with('-'));
                assert!(safelist.contains(&q.sort_column));
            }
        }
    }

    #[test]
    fn test_huge_page_offset_saturates() {
        let max_page = i64::MAX.to_string();
        let q = ListQuery::from_params(
            &params(&[("page", max_page.as_str()), ("page_size", "100")]),
            PRODUCT_SORT_SAFELIST,
        )
        .unwrap();
        assert_eq!(q.offset(), u64::MAX);
    }

    #[test]
    fn test_metadata_zero_total() {
        assert_eq!(Metadata::calculate(0, 3, 10), Metadata::default());
    }

    #[test]
    fn test_metadata_last_page_is_ceiling() {
        let cases = [(1, 10, 1), (10, 10, 1), (11, 10, 2), (95, 20, 5), (100, 1, 100)];
        for (total, size, last) in cases {
            let m = Metadata::calculate(total, 1, size);
            assert_eq!(m.last_page, last, "total={total} size={size}");
            assert_eq!(m.first_page, 1);
            assert_eq!(m.total_records, total);
            assert_eq!(m.page_size, size);
        }
    }

    #[test]
    fn test_metadata_past_last_page() {
        let m = Metadata::calculate(25, 9, 10);
        assert_eq!(m.current_page, 9);
        assert_eq!(m.last_page, 3);
    }

    #[test]
    fn test_read_text_defaults_to_empty() {
        let p = params(&[("name", "lamp")]);
        assert_eq!(read_text(&p, "name"), "lamp");
        assert_eq!(read_text(&p, "category"), "");
    }
}
