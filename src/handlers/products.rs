//! Product endpoints.
//!
//! - `POST /v1/product` - create
//! - `GET /v1/products/{id}` - show
//! - `PATCH /v1/products/{id}` - partial update
//! - `DELETE /v1/products/{id}` - delete
//! - `GET /v1/products` - filtered, sorted, paginated list

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use tracing::{info, instrument};

use super::util::{QueryParams, json_response, parse_id, with_location};
use crate::error::AppResult;
use crate::models::{
    MessageResponse, ProductDetails, ProductEnvelope, ProductFilter, ProductList, ProductPatch,
};
use crate::pagination::{ListQuery, Metadata, PRODUCT_SORT_SAFELIST};
use crate::state::AppState;
use crate::validation::Validator;

/// Create a product.
#[instrument(skip(state, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<ProductDetails>, JsonRejection>,
) -> AppResult<Response> {
    let Json(details) = payload?;

    let mut v = Validator::new();
    details.validate(&mut v);
    v.into_result()?;

    let product = state.stores.products.insert(&details).await?;
    info!(id = product.id, "Product created");

    let location = format!("/v1/products/{}", product.id);
    Ok(with_location(
        json_response(StatusCode::CREATED, ProductEnvelope { product }),
        location,
    ))
}

/// Show one product.
#[instrument(skip(state))]
pub async fn show_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ProductEnvelope>> {
    let id = parse_id(&id)?;
    let product = state.stores.products.get(id).await?;
    Ok(Json(ProductEnvelope { product }))
}

/// Apply the fields present in the body, then validate the merged product.
#[instrument(skip(state, payload))]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ProductPatch>, JsonRejection>,
) -> AppResult<Json<ProductEnvelope>> {
    let id = parse_id(&id)?;
    let mut product = state.stores.products.get(id).await?;

    let Json(patch) = payload?;
    patch.apply(&mut product.details);

    let mut v = Validator::new();
    product.details.validate(&mut v);
    v.into_result()?;

    state.stores.products.update(&product).await?;
    Ok(Json(ProductEnvelope { product }))
}

/// Delete a product.
#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_id(&id)?;
    state.stores.products.delete(id).await?;
    info!(id, "Product deleted");
    Ok(Json(MessageResponse {
        message: "product successfully deleted",
    }))
}

/// List products.
///
/// Filters: `name`, `description`, `category`, `price`, `average_rating`,
/// `image_url`. Paging: `page`, `page_size`, `sort` (`id`, `name`, `-id`, `-name`).
#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> AppResult<Json<ProductList>> {
    let Query(params) = params?;
    let query = ListQuery::from_params(&params, PRODUCT_SORT_SAFELIST)?;
    let filter = ProductFilter::from_params(&params);

    let (products, total) = state.stores.products.get_all(&filter, &query).await?;

    Ok(Json(ProductList {
        products,
        metadata: Metadata::for_query(total, &query),
    }))
}
