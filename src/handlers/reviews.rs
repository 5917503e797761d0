//! Review endpoints.
//!
//! Single-review routes are served under both `/v1/review/{id}` and
//! `/v1/reviews/{id}`.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use tracing::{debug, info, instrument};

use super::util::{QueryParams, json_response, parse_id, with_location};
use crate::error::{AppError, AppResult};
use crate::models::{
    CreateReviewRequest, MessageResponse, ReviewEnvelope, ReviewFilter, ReviewList, ReviewPatch,
};
use crate::pagination::{ListQuery, Metadata, REVIEW_SORT_SAFELIST};
use crate::state::AppState;
use crate::validation::Validator;

/// Create a review for an existing product.
///
/// The product reference is resolved before field validation: a missing
/// `product_id` is a 400 and an unknown product a 404, and nothing is stored
/// in either case.
#[instrument(skip(state, payload))]
pub async fn create_review(
    State(state): State<AppState>,
    payload: Result<Json<CreateReviewRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(request) = payload?;

    let product_id = request
        .product_id
        .ok_or_else(|| AppError::BadRequest("product id is required".to_string()))?;

    if !state.stores.products.exists(product_id).await? {
        debug!(product_id, "Review refers to a missing product");
        return Err(AppError::NotFound);
    }

    let details = request.into_details(product_id);
    let mut v = Validator::new();
    details.validate(&mut v);
    v.into_result()?;

    let review = state.stores.reviews.insert(&details).await?;
    info!(id = review.id, product_id, "Review created");

    let location = format!("/v1/review/{}", review.id);
    Ok(with_location(
        json_response(StatusCode::CREATED, ReviewEnvelope { review }),
        location,
    ))
}

#[instrument(skip(state))]
pub async fn show_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ReviewEnvelope>> {
    let id = parse_id(&id)?;
    let review = state.stores.reviews.get(id).await?;
    Ok(Json(ReviewEnvelope { review }))
}

#[instrument(skip(state, payload))]
pub async fn update_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ReviewPatch>, JsonRejection>,
) -> AppResult<Json<ReviewEnvelope>> {
    let id = parse_id(&id)?;
    let mut review = state.stores.reviews.get(id).await?;

    let Json(patch) = payload?;
    patch.apply(&mut review.details);

    let mut v = Validator::new();
    review.details.validate(&mut v);
    v.into_result()?;

    state.stores.reviews.update(&review).await?;
    Ok(Json(ReviewEnvelope { review }))
}

#[instrument(skip(state))]
pub async fn delete_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_id(&id)?;
    state.stores.reviews.delete(id).await?;
    info!(id, "Review deleted");
    Ok(Json(MessageResponse {
        message: "review successfully deleted",
    }))
}

/// List reviews.
///
/// Filters: `author`, `rating`, `helpful_count`. Sort: `id`, `author`, `-id`, `-author`.
#[instrument(skip(state))]
pub async fn list_reviews(
    State(state): State<AppState>,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> AppResult<Json<ReviewList>> {
    let Query(params) = params?;
    let query = ListQuery::from_params(&params, REVIEW_SORT_SAFELIST)?;
    let filter = ReviewFilter::from_params(&params);

    let (reviews, total) = state.stores.reviews.get_all(&filter, &query).await?;

    Ok(Json(ReviewList {
        reviews,
        metadata: Metadata::for_query(total, &query),
    }))
}
