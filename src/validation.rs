//! Field-level validation.
//!
//! A [`Validator`] is created per request, collects at most one message per
//! field key, and is discarded when the request ends. Domain rules for
//! products and reviews live next to their models and write into it.

use rust_decimal::Decimal;

use crate::error::{AppError, AppResult, FieldErrors};

// =============================================================================
// Validation Constants
// =============================================================================

/// Maximum byte length for product name, description and category.
pub const MAX_PRODUCT_TEXT_BYTES: usize = 100;

/// Largest price magnitude the `NUMERIC(12, 2)` price column can hold.
// 999_999_999_999 at scale 2 (`Decimal::new` is not `const`).
pub const MAX_PRICE: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// Maximum byte length for a review author.
pub const MAX_AUTHOR_BYTES: usize = 25;

/// Inclusive rating bounds for a review.
pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

/// Accumulates field-level error messages.
#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no error has been recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Record `message` under `key` unless the key already has an error.
    pub fn add_error(&mut self, key: &str, message: &str) {
        self.errors
            .entry(key.to_string())
            .or_insert_with(|| message.to_string());
    }

    /// Record `message` under `key` when `ok` is false.
    pub fn check(&mut self, ok: bool, key: &str, message: &str) {
        if !ok {
            self.add_error(key, message);
        }
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Convert into `Err(AppError::FailedValidation)` if anything was recorded.
    pub fn into_result(self) -> AppResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::FailedValidation(self.errors))
        }
    }
}

/// True when `value` equals one of `permitted`.
pub fn permitted_value<T: PartialEq + ?Sized>(value: &T, permitted: &[&T]) -> bool {
    permitted.iter().any(|p| *p == value)
}
