mod health;
mod products;
mod reviews;
mod util;

pub use health::health_check;
pub use products::{create_product, delete_product, list_products, show_product, update_product};
pub use reviews::{create_review, delete_review, list_reviews, show_review, update_review};
pub use util::parse_id;
