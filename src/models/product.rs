use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Patch;
use crate::pagination::read_text;
use crate::validation::{MAX_PRICE, MAX_PRODUCT_TEXT_BYTES, Validator};

/// Client-editable product fields.
///
/// Also the body of `POST /v1/product`. Missing fields take their zero value
/// so that validation, not decoding, reports them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProductDetails {
    pub name: String,
    pub description: String,
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub average_rating: f64,
    pub image_url: String,
}

impl ProductDetails {
    pub fn validate(&self, v: &mut Validator) {
        v.check(!self.name.is_empty(), "name", "must be provided");
        v.check(!self.description.is_empty(), "description", "must be provided");
        v.check(!self.category.is_empty(), "category", "must be provided");
        v.check(self.average_rating != 0.0, "average_rating", "must be provided");
        v.check(!self.image_url.is_empty(), "image_url", "must be provided");

        v.check(
            self.name.len() <= MAX_PRODUCT_TEXT_BYTES,
            "name",
            "must not be more than 100 bytes long",
        );
        v.check(
            self.description.len() <= MAX_PRODUCT_TEXT_BYTES,
            "description",
            "must not be more than 100 bytes long",
        );
        v.check(
            self.category.len() <= MAX_PRODUCT_TEXT_BYTES,
            "category",
            "must not be more than 100 bytes long",
        );
        v.check(
            self.price.abs() <= MAX_PRICE,
            "price",
            "must not be more than 9999999999.99",
        );
    }
}

/// A stored product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: i64,
    #[serde(flatten)]
    pub details: ProductDetails,
    pub created_at: DateTime<Utc>,
}

/// Body of `PATCH /v1/products/{id}`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProductPatch {
    pub name: Patch<String>,
    pub description: Patch<String>,
    pub category: Patch<String>,
    pub price: Patch<PatchPrice>,
    pub average_rating: Patch<f64>,
    pub image_url: Patch<String>,
}

/// Decimal price as it appears in a patch body (a JSON number).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct PatchPrice(#[serde(with = "rust_decimal::serde::float")] pub Decimal);

impl ProductPatch {
    /// Overwrite only the fields present in the payload.
    pub fn apply(self, details: &mut ProductDetails) {
        self.name.apply_to(&mut details.name);
        self.description.apply_to(&mut details.description);
        self.category.apply_to(&mut details.category);
        if let Patch::Set(PatchPrice(price)) = self.price {
            details.price = price;
        }
        self.average_rating.apply_to(&mut details.average_rating);
        self.image_url.apply_to(&mut details.image_url);
    }
}

/// Free-text filters for `GET /v1/products`. Empty strings match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: String,
    pub average_rating: String,
    pub image_url: String,
}

impl ProductFilter {
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        Self {
            name: read_text(params, "name"),
            description: read_text(params, "description"),
            category: read_text(params, "category"),
            price: read_text(params, "price"),
            average_rating: read_text(params, "average_rating"),
            image_url: read_text(params, "image_url"),
        }
    }
}
