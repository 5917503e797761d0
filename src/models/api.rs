use serde::Serialize;

use super::{Product, Review};
use crate::pagination::Metadata;

/// `{"product": {...}}`
#[derive(Debug, Serialize)]
pub struct ProductEnvelope {
    pub product: Product,
}

/// `{"products": [...], "@metadata": {...}}`
#[derive(Debug, Serialize)]
pub struct ProductList {
    pub products: Vec<Product>,
    #[serde(rename = "@metadata")]
    pub metadata: Metadata,
}

/// `{"review": {...}}`
#[derive(Debug, Serialize)]
pub struct ReviewEnvelope {
    pub review: Review,
}

/// `{"reviews": [...], "@metadata": {...}}`
#[derive(Debug, Serialize)]
pub struct ReviewList {
    pub reviews: Vec<Review>,
    #[serde(rename = "@metadata")]
    pub metadata: Metadata,
}

/// Plain acknowledgement, e.g. after a delete.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Body of `GET /v1/healthcheck`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"available"` when the process can answer
    pub status: &'static str,
    pub system_info: SystemInfo,
}

#[derive(Debug, Serialize)]
pub struct SystemInfo {
    /// Deployment environment name (development, staging, production)
    pub environment: String,
    /// Crate version
    pub version: &'static str,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "available",
            system_info: SystemInfo {
                environment: "development".to_string(),
                version: "0.1.0",
            },
        };

        let json = serde_json::to_value(&response).expect("Serialization should succeed");
        assert_eq!(json["status"], "available");
        assert_eq!(json["system_info"]["environment"], "development");
    }

    #[test]
    fn test_empty_list_keeps_metadata_fields() {
        let list = ReviewList {
            reviews: vec![],
            metadata: Metadata::default(),
        };
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json["reviews"], serde_json::json!([]));
        assert_eq!(json["@metadata"]["last_page"], 0);
        assert_eq!(json["@metadata"]["total_records"], 0);
    }
}
