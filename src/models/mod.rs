//! Request, response and domain types.

mod api;
mod patch;
mod product;
mod review;

pub use api::{
    HealthResponse, MessageResponse, ProductEnvelope, ProductList, ReviewEnvelope, ReviewList,
    SystemInfo,
};
pub use patch::Patch;
pub use product::{PatchPrice, Product, ProductDetails, ProductFilter, ProductPatch};
pub use review::{CreateReviewRequest, Review, ReviewDetails, ReviewFilter, ReviewPatch};
