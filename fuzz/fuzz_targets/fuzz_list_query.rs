//! Fuzz target for list-query resolution.
//!
//! Feeds arbitrary `page`, `page_size` and `sort` values to
//! `ListQuery::from_params` and checks that a resolved query never carries a
//! sort column outside the allow-list and never exceeds the page-size ceiling.
//!
//! ```bash
//! cargo +nightly fuzz run fuzz_list_query -- -max_total_time=60
//! ```

#![no_main]

use std::collections::HashMap;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use product_reviews::pagination::{
    ListQuery, MAX_PAGE_SIZE, Metadata, PRODUCT_SORT_SAFELIST, REVIEW_SORT_SAFELIST,
};

#[derive(Debug, Arbitrary)]
struct Input {
    page: Option<String>,
    page_size: Option<String>,
    sort: Option<String>,
    reviews: bool,
    total: u64,
}

fuzz_target!(|input: Input| {
    let mut params = HashMap::new();
    if let Some(page) = input.page {
        params.insert("page".to_string(), page);
    }
    if let Some(page_size) = input.page_size {
        params.insert("page_size".to_string(), page_size);
    }
    if let Some(sort) = input.sort {
        params.insert("sort".to_string(), sort);
    }

    let safelist = if input.reviews {
        REVIEW_SORT_SAFELIST
    } else {
        PRODUCT_SORT_SAFELIST
    };

    if let Ok(query) = ListQuery::from_params(&params, safelist) {
        assert!(safelist.contains(&query.sort_column));
        assert!(query.page >= 1);
        assert!(query.page_size >= 1 && query.page_size <= MAX_PAGE_SIZE as u64);
        let _ = query.offset();

        let meta = Metadata::for_query(input.total, &query);
        if input.total > 0 {
            assert!(meta.last_page >= 1);
        }
    }
});
