//! In-process storage backend.
//!
//! Used for local development (`DATABASE_URL=memory://`) and by the test
//! suite. Text filters mimic `plainto_tsquery('simple', ...)`: the filter is
//! split into whitespace-separated terms and every term must equal one of the
//! column's words, case-insensitively.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use tokio::sync::RwLock;

use super::{ProductStore, ReviewStore, StoreError, StoreResult};
use crate::models::{Product, ProductDetails, ProductFilter, Review, ReviewDetails, ReviewFilter};
use crate::pagination::{ListQuery, SortDirection};

#[derive(Default)]
struct Tables {
    products: BTreeMap<i64, Product>,
    reviews: BTreeMap<i64, Review>,
    next_product_id: i64,
    next_review_id: i64,
}

/// Products and reviews kept in ordered maps behind one lock.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// True when every term of `query` appears as a word of `text`.
fn term_match(text: &str, query: &str) -> bool {
    let words: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();
    query
        .split_whitespace()
        .all(|term| words.iter().any(|w| *w == term.to_lowercase()))
}

/// Order by the resolved column and direction, ties broken by ascending id.
fn compare_by<T>(
    a: &T,
    b: &T,
    query: &ListQuery,
    id: impl Fn(&T) -> i64,
    column: impl Fn(&T, &T) -> Ordering,
) -> Ordering {
    let primary = match query.sort_column {
        "id" => id(a).cmp(&id(b)),
        _ => column(a, b),
    };
    let primary = match query.direction {
        SortDirection::Asc => primary,
        SortDirection::Desc => primary.reverse(),
    };
    primary.then_with(|| id(a).cmp(&id(b)))
}

/// Apply limit/offset to an already ordered list.
fn page<T: Clone>(rows: Vec<&T>, query: &ListQuery) -> (Vec<T>, u64) {
    let total = rows.len() as u64;
    let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(query.limit()).unwrap_or(usize::MAX);
    let items = rows
        .into_iter()
        .skip(offset)
        .take(limit)
        .cloned()
        .collect();
    (items, total)
}

/// Round a price to the two decimal places of the `price` column.
fn column_price(price: Decimal) -> Decimal {
    price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Copy of `details` as the relational store would persist it.
fn stored_details(details: &ProductDetails) -> ProductDetails {
    ProductDetails {
        price: column_price(details.price),
        ..details.clone()
    }
}

fn product_matches(product: &Product, filter: &ProductFilter) -> bool {
    let d = &product.details;
    term_match(&d.name, &filter.name)
        && term_match(&d.description, &filter.description)
        && term_match(&d.category, &filter.category)
        && term_match(&format!("{:.2}", d.price), &filter.price)
        && term_match(&d.average_rating.to_string(), &filter.average_rating)
        && term_match(&d.image_url, &filter.image_url)
}

fn review_matches(review: &Review, filter: &ReviewFilter) -> bool {
    let d = &review.details;
    term_match(&d.author, &filter.author)
        && term_match(&d.rating.to_string(), &filter.rating)
        && term_match(&d.helpful_count.to_string(), &filter.helpful_count)
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn insert(&self, details: &ProductDetails) -> StoreResult<Product> {
        let mut tables = self.tables.write().await;
        tables.next_product_id += 1;
        let product = Product {
            id: tables.next_product_id,
            details: stored_details(details),
            created_at: Utc::now(),
        };
        tables.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn get(&self, id: i64) -> StoreResult<Product> {
        self.tables
            .read()
            .await
            .products
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_all(
        &self,
        filter: &ProductFilter,
        query: &ListQuery,
    ) -> StoreResult<(Vec<Product>, u64)> {
        let tables = self.tables.read().await;
        let mut rows: Vec<&Product> = tables
            .products
            .values()
            .filter(|p| product_matches(p, filter))
            .collect();
        rows.sort_by(|a, b| {
            compare_by(a, b, query, |p| p.id, |a, b| {
                a.details.name.cmp(&b.details.name)
            })
        });
        Ok(page(rows, query))
    }

    async fn update(&self, product: &Product) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .products
            .get_mut(&product.id)
            .ok_or(StoreError::NotFound)?;
        stored.details = stored_details(&product.details);
        Ok(())
    }

    /// Reviews of the product go with it.
    async fn delete(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.products.remove(&id).ok_or(StoreError::NotFound)?;
        tables.reviews.retain(|_, review| review.details.product_id != id);
        Ok(())
    }

    async fn exists(&self, id: i64) -> StoreResult<bool> {
        Ok(self.tables.read().await.products.contains_key(&id))
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn insert(&self, details: &ReviewDetails) -> StoreResult<Review> {
        let mut tables = self.tables.write().await;
        tables.next_review_id += 1;
        let review = Review {
            id: tables.next_review_id,
            details: details.clone(),
            created_at: Utc::now(),
        };
        tables.reviews.insert(review.id, review.clone());
        Ok(review)
    }

    async fn get(&self, id: i64) -> StoreResult<Review> {
        self.tables
            .read()
            .await
            .reviews
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_all(
        &self,
        filter: &ReviewFilter,
        query: &ListQuery,
    ) -> StoreResult<(Vec<Review>, u64)> {
        let tables = self.tables.read().await;
        let mut rows: Vec<&Review> = tables
            .reviews
            .values()
            .filter(|r| review_matches(r, filter))
            .collect();
        rows.sort_by(|a, b| {
            compare_by(a, b, query, |r| r.id, |a, b| {
                a.details.author.cmp(&b.details.author)
            })
        });
        Ok(page(rows, query))
    }

    async fn update(&self, review: &Review) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .reviews
            .get_mut(&review.id)
            .ok_or(StoreError::NotFound)?;
        stored.details.author = review.details.author.clone();
        stored.details.rating = review.details.rating;
        stored.details.helpful_count = review.details.helpful_count;
        Ok(())
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .reviews
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn exists(&self, id: i64) -> StoreResult<bool> {
        Ok(self.tables.read().await.reviews.contains_key(&id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::collections::HashMap;

    use crate::pagination::{PRODUCT_SORT_SAFELIST, REVIEW_SORT_SAFELIST};

    fn details(name: &str, category: &str) -> ProductDetails {
        ProductDetails {
            name: name.to_string(),
            description: "something useful".to_string(),
            category: category.to_string(),
            price: Decimal::new(1999, 2),
            average_rating: 4.0,
            image_url: "https://img.example.com/x.png".to_string(),
        }
    }

    fn query(pairs: &[(&str, &str)], safelist: &'static [&'static str]) -> ListQuery {
        let params: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ListQuery::from_params(&params, safelist).unwrap()
    }

    async fn seed(store: &MemoryStore, names: &[&str]) {
        for name in names {
            ProductStore::insert(store, &details(name, "tools")).await.unwrap();
        }
    }

    fn ids(products: &[Product]) -> Vec<i64> {
        products.iter().map(|p| p.id).collect()
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let store = MemoryStore::new();
        let a = ProductStore::insert(&store, &details("a", "x")).await.unwrap();
        let b = ProductStore::insert(&store, &details("b", "x")).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert!(a.created_at <= b.created_at);
    }

    #[tokio::test]
    async fn test_get_update_delete_missing() {
        let store = MemoryStore::new();
        assert!(matches!(
            ProductStore::get(&store, 42).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            ProductStore::delete(&store, 42).await,
            Err(StoreError::NotFound)
        ));
        let ghost = Product {
            id: 42,
            details: details("ghost", "x"),
            created_at: Utc::now(),
        };
        assert!(matches!(
            ProductStore::update(&store, &ghost).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_update_keeps_created_at() {
        let store = MemoryStore::new();
        let mut product = ProductStore::insert(&store, &details("a", "x")).await.unwrap();
        let created = product.created_at;
        product.details.name = "renamed".to_string();
        product.created_at = Utc::now() + chrono::Duration::days(1);
        ProductStore::update(&store, &product).await.unwrap();

        let stored = ProductStore::get(&store, product.id).await.unwrap();
        assert_eq!(stored.details.name, "renamed");
        assert_eq!(stored.created_at, created);
    }

    #[tokio::test]
    async fn test_ties_sorted_by_id_in_both_directions() {
        let store = MemoryStore::new();
        seed(&store, &["pear", "apple", "pear", "apple"]).await;

        let (asc, _) = ProductStore::get_all(
            &store,
            &ProductFilter::default(),
            &query(&[("sort", "name")], PRODUCT_SORT_SAFELIST),
        )
        .await
        .unwrap();
        assert_eq!(ids(&asc), vec![2, 4, 1, 3]);

        let (desc, _) = ProductStore::get_all(
            &store,
            &ProductFilter::default(),
            &query(&[("sort", "-name")], PRODUCT_SORT_SAFELIST),
        )
        .await
        .unwrap();
        assert_eq!(ids(&desc), vec![1, 3, 2, 4]);
    }

    #[tokio::test]
    async fn test_sort_by_id_descending() {
        let store = MemoryStore::new();
        seed(&store, &["a", "b", "c"]).await;
        let (rows, _) = ProductStore::get_all(
            &store,
            &ProductFilter::default(),
            &query(&[("sort", "-id")], PRODUCT_SORT_SAFELIST),
        )
        .await
        .unwrap();
        assert_eq!(ids(&rows), vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_paging_and_total() {
        let store = MemoryStore::new();
        seed(&store, &["a", "b", "c", "d", "e"]).await;

        let (rows, total) = ProductStore::get_all(
            &store,
            &ProductFilter::default(),
            &query(&[("page", "2"), ("page_size", "2")], PRODUCT_SORT_SAFELIST),
        )
        .await
        .unwrap();
        assert_eq!(total, 5);
        assert_eq!(ids(&rows), vec![3, 4]);

        let (rows, total) = ProductStore::get_all(
            &store,
            &ProductFilter::default(),
            &query(&[("page", "4"), ("page_size", "2")], PRODUCT_SORT_SAFELIST),
        )
        .await
        .unwrap();
        assert!(rows.is_empty());
        assert_eq!(total, 5);
    }

    #[tokio::test]
    async fn test_text_filter_terms() {
        let store = MemoryStore::new();
        ProductStore::insert(&store, &details("Red Desk Lamp", "lighting"))
            .await
            .unwrap();
        ProductStore::insert(&store, &details("Blue Lamp", "lighting"))
            .await
            .unwrap();
        ProductStore::insert(&store, &details("Hammer", "tools"))
            .await
            .unwrap();

        let q = query(&[], PRODUCT_SORT_SAFELIST);
        let filter = ProductFilter {
            name: "lamp".to_string(),
            ..ProductFilter::default()
        };
        let (_, total) = ProductStore::get_all(&store, &filter, &q).await.unwrap();
        assert_eq!(total, 2);

        let filter = ProductFilter {
            name: "desk lamp".to_string(),
            ..ProductFilter::default()
        };
        let (rows, _) = ProductStore::get_all(&store, &filter, &q).await.unwrap();
        assert_eq!(ids(&rows), vec![1]);

        let filter = ProductFilter {
            category: "tools".to_string(),
            price: "19.99".to_string(),
            ..ProductFilter::default()
        };
        let (rows, _) = ProductStore::get_all(&store, &filter, &q).await.unwrap();
        assert_eq!(ids(&rows), vec![3]);
    }

    #[tokio::test]
    async fn test_reviews_sorted_by_author() {
        let store = MemoryStore::new();
        for (author, rating) in [("zoe", 5), ("adam", 3), ("zoe", 1)] {
            ReviewStore::insert(
                &store,
                &ReviewDetails {
                    product_id: 1,
                    author: author.to_string(),
                    rating,
                    helpful_count: 0,
                },
            )
            .await
            .unwrap();
        }

        let (rows, total) = ReviewStore::get_all(
            &store,
            &ReviewFilter::default(),
            &query(&[("sort", "-author")], REVIEW_SORT_SAFELIST),
        )
        .await
        .unwrap();
        assert_eq!(total, 3);
        let order: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(order, vec![1, 3, 2]);

        let filter = ReviewFilter {
            rating: "5".to_string(),
            ..ReviewFilter::default()
        };
        let (rows, _) = ReviewStore::get_all(&store, &filter, &query(&[], REVIEW_SORT_SAFELIST))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].details.author, "zoe");
    }

    #[tokio::test]
    async fn test_deleting_product_removes_its_reviews() {
        let store = MemoryStore::new();
        seed(&store, &["kept", "doomed"]).await;
        for product_id in [1, 2, 2] {
            let review = ReviewDetails {
                product_id,
                author: "ann".to_string(),
                rating: 4,
                helpful_count: 0,
            };
            ReviewStore::insert(&store, &review).await.unwrap();
        }

        ProductStore::delete(&store, 2).await.unwrap();

        assert!(ReviewStore::exists(&store, 1).await.unwrap());
        assert!(matches!(
            ReviewStore::get(&store, 2).await,
            Err(StoreError::NotFound)
        ));
        let (_, total) = ReviewStore::get_all(
            &store,
            &ReviewFilter::default(),
            &query(&[], REVIEW_SORT_SAFELIST),
        )
        .await
        .unwrap();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn test_price_kept_at_two_decimal_places() {
        let store = MemoryStore::new();
        let mut product = details("lamp", "lighting");
        product.price = Decimal::new(249, 1);
        ProductStore::insert(&store, &product).await.unwrap();
        product.price = Decimal::new(12_345, 3);
        let rounded = ProductStore::insert(&store, &product).await.unwrap();
        assert_eq!(rounded.details.price, Decimal::new(1235, 2));

        let q = query(&[], PRODUCT_SORT_SAFELIST);
        for (term, expected) in [("24.90", vec![1]), ("24.9", vec![]), ("12.35", vec![2])] {
            let filter = ProductFilter {
                price: term.to_string(),
                ..ProductFilter::default()
            };
            let (rows, _) = ProductStore::get_all(&store, &filter, &q).await.unwrap();
            assert_eq!(ids(&rows), expected, "{term}");
        }
    }

    #[tokio::test]
    async fn test_exists() {
        let store = MemoryStore::new();
        assert!(!ProductStore::exists(&store, 1).await.unwrap());
        seed(&store, &["a"]).await;
        assert!(ProductStore::exists(&store, 1).await.unwrap());
        assert!(!ReviewStore::exists(&store, 1).await.unwrap());
    }
}
