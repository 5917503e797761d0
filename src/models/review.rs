use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Patch;
use crate::pagination::read_text;
use crate::validation::{MAX_AUTHOR_BYTES, MAX_RATING, MIN_RATING, Validator};

/// Fields of a review before storage assigns identity and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewDetails {
    pub product_id: i64,
    pub author: String,
    pub rating: i64,
    pub helpful_count: i64,
}

impl ReviewDetails {
    pub fn validate(&self, v: &mut Validator) {
        v.check(!self.author.is_empty(), "author", "must be provided");
        v.check(
            self.author.len() <= MAX_AUTHOR_BYTES,
            "author",
            "must not be more than 25 bytes long",
        );
        v.check(self.product_id > 0, "product_id", "must be a positive integer");
        v.check(
            (MIN_RATING..=MAX_RATING).contains(&self.rating),
            "rating",
            "must be between 1 and 5",
        );
        v.check(
            self.helpful_count >= 0,
            "helpful_count",
            "must not be negative",
        );
    }
}

/// A stored review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Review {
    pub id: i64,
    #[serde(flatten)]
    pub details: ReviewDetails,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /v1/review`.
///
/// `product_id` is checked before anything else (400 when missing, 404 when
/// the product does not exist); the remaining fields go through validation.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CreateReviewRequest {
    pub product_id: Option<i64>,
    pub author: String,
    pub rating: i64,
    pub helpful_count: Option<i64>,
}

impl CreateReviewRequest {
    pub fn into_details(self, product_id: i64) -> ReviewDetails {
        ReviewDetails {
            product_id,
            author: self.author,
            rating: self.rating,
            helpful_count: self.helpful_count.unwrap_or(0),
        }
    }
}

/// Body of `PATCH /v1/review/{id}`. The product reference is fixed at creation.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReviewPatch {
    pub author: Patch<String>,
    pub rating: Patch<i64>,
    pub helpful_count: Patch<i64>,
}

impl ReviewPatch {
    pub fn apply(self, details: &mut ReviewDetails) {
        self.author.apply_to(&mut details.author);
        self.rating.apply_to(&mut details.rating);
        self.helpful_count.apply_to(&mut details.helpful_count);
    }
}

/// Free-text filters for `GET /v1/reviews`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewFilter {
    pub author: String,
    pub rating: String,
    pub helpful_count: String,
}

impl ReviewFilter {
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        Self {
            author: read_text(params, "author"),
            rating: read_text(params, "rating"),
            helpful_count: read_text(params, "helpful_count"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn review() -> ReviewDetails {
        ReviewDetails {
            product_id: 1,
            author: "dana".to_string(),
            rating: 4,
            helpful_count: 0,
        }
    }

    #[test]
    fn test_valid_review_passes() {
        let mut v = Validator::new();
        review().validate(&mut v);
        assert!(v.is_empty());
    }

    #[test]
    fn test_rating_bounds() {
        for (rating, ok) in [(0, false), (1, true), (5, true), (6, false), (-1, false)] {
            let mut details = review();
            details.rating = rating;
            let mut v = Validator::new();
            details.validate(&mut v);
            assert_eq!(v.is_empty(), ok, "rating {rating}");
        }
    }

    #[test]
    fn test_author_rules() {
        let mut details = review();
        details.author = String::new();
        let mut v = Validator::new();
        details.validate(&mut v);
        assert_eq!(v.errors().get("author").unwrap(), "must be provided");

        details.author = "x".repeat(26);
        let mut v = Validator::new();
        details.validate(&mut v);
        assert_eq!(
            v.errors().get("author").unwrap(),
            "must not be more than 25 bytes long"
        );
    }

    #[test]
    fn test_negative_helpful_count() {
        let mut details = review();
        details.helpful_count = -3;
        let mut v = Validator::new();
        details.validate(&mut v);
        assert!(v.errors().contains_key("helpful_count"));
    }

    #[test]
    fn test_create_request_defaults_helpful_count() {
        let req: CreateReviewRequest =
            serde_json::from_str(r#"{"product_id": 3, "author": "kim", "rating": 5}"#).unwrap();
        let details = req.into_details(3);
        assert_eq!(details.helpful_count, 0);
        assert_eq!(details.product_id, 3);
    }

    #[test]
    fn test_out_of_range_rating_reaches_validation() {
        let req: CreateReviewRequest = serde_json::from_str(
            r#"{"product_id": 1, "author": "kim", "rating": 3000000000, "helpful_count": 3000000000}"#,
        )
        .unwrap();
        let details = req.into_details(1);
        let mut v = Validator::new();
        details.validate(&mut v);
        assert_eq!(v.errors().get("rating").unwrap(), "must be between 1 and 5");
        assert!(!v.errors().contains_key("helpful_count"));
    }

    #[test]
    fn test_create_request_without_product_id() {
        let req: CreateReviewRequest = serde_json::from_str(r#"{"author": "kim"}"#).unwrap();
        assert!(req.product_id.is_none());
    }

    #[test]
    fn test_patch_rejects_product_id() {
        let result: Result<ReviewPatch, _> = serde_json::from_str(r#"{"product_id": 9}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_patch_apply() {
        let mut details = review();
        let patch: ReviewPatch = serde_json::from_str(r#"{"helpful_count": 12}"#).unwrap();
        patch.apply(&mut details);
        assert_eq!(details.helpful_count, 12);
        assert_eq!(details.rating, 4);
        assert_eq!(details.author, "dana");
    }
}
