use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use roost_db::listings::ListingFilter;
use roost_db::models::{ListingRow, ReviewRow};
use roost_db::StoreError;
use roost_types::api::{AddReviewRequest, CreateListingRequest, ListingResponse, ReviewResponse};

use crate::auth::{extract_claims, user_response};
use crate::bookings::booking_response_for_row;
use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    /// Price bounds in cents.
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub location: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

/// GET /listings — public, filterable.
pub async fn list_listings(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = ListingFilter {
        min_price_cents: query.min_price,
        max_price_cents: query.max_price,
        location: query.location,
        search: query.search,
        ordering: query.ordering,
    };

    let rows = state.db.list_listings(&filter)?;

    // Batch the rating aggregates instead of one query per listing.
    let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
    let ratings: HashMap<String, (f64, i64)> = state
        .db
        .rating_for_listings(&ids)?
        .into_iter()
        .map(|(id, avg, count)| (id, (avg, count)))
        .collect();

    let mut listings = Vec::with_capacity(rows.len());
    for row in rows {
        let (average_rating, reviews_count) =
            ratings.get(&row.id).copied().unwrap_or((0.0, 0));
        listings.push(listing_response(&state, &row, average_rating, reviews_count)?);
    }

    Ok(Json(listings))
}

/// GET /listings/{id} — public.
pub async fn get_listing(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state
        .db
        .get_listing(&listing_id.to_string())?
        .ok_or_else(|| ApiError::NotFound("Listing not found".into()))?;

    let (average_rating, reviews_count) = state.db.rating_for_listing(&row.id)?;
    Ok(Json(listing_response(&state, &row, average_rating, reviews_count)?))
}

/// POST /listings — host creates a listing.
pub async fn create_listing(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateListingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let claims = extract_claims(&headers, &state.jwt_secret)?;

    if req.price_per_night_cents <= 0 {
        return Err(ApiError::Validation(
            "Price per night must be greater than 0".into(),
        ));
    }

    let listing_id = Uuid::new_v4();
    state.db.create_listing(
        &listing_id.to_string(),
        &claims.sub.to_string(),
        &req.name,
        &req.description,
        &req.location,
        req.price_per_night_cents,
    )?;

    let row = state
        .db
        .get_listing(&listing_id.to_string())?
        .ok_or_else(|| ApiError::Internal("listing vanished after insert".into()))?;

    Ok((
        StatusCode::CREATED,
        Json(listing_response(&state, &row, 0.0, 0)?),
    ))
}

/// PUT /listings/{id} — host only.
pub async fn update_listing(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<CreateListingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let claims = extract_claims(&headers, &state.jwt_secret)?;
    let row = require_host(&state, &listing_id, &claims.sub)?;

    if req.price_per_night_cents <= 0 {
        return Err(ApiError::Validation(
            "Price per night must be greater than 0".into(),
        ));
    }

    state.db.update_listing(
        &row.id,
        &req.name,
        &req.description,
        &req.location,
        req.price_per_night_cents,
    )?;

    let updated = state
        .db
        .get_listing(&row.id)?
        .ok_or_else(|| ApiError::NotFound("Listing not found".into()))?;
    let (average_rating, reviews_count) = state.db.rating_for_listing(&updated.id)?;

    Ok(Json(listing_response(&state, &updated, average_rating, reviews_count)?))
}

/// DELETE /listings/{id} — host only.
pub async fn delete_listing(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let claims = extract_claims(&headers, &state.jwt_secret)?;
    let row = require_host(&state, &listing_id, &claims.sub)?;

    state.db.delete_listing(&row.id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /listings/my_listings
pub async fn my_listings(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let claims = extract_claims(&headers, &state.jwt_secret)?;

    let rows = state.db.listings_for_host(&claims.sub.to_string())?;
    let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
    let ratings: HashMap<String, (f64, i64)> = state
        .db
        .rating_for_listings(&ids)?
        .into_iter()
        .map(|(id, avg, count)| (id, (avg, count)))
        .collect();

    let mut listings = Vec::with_capacity(rows.len());
    for row in rows {
        let (average_rating, reviews_count) =
            ratings.get(&row.id).copied().unwrap_or((0.0, 0));
        listings.push(listing_response(&state, &row, average_rating, reviews_count)?);
    }

    Ok(Json(listings))
}

/// GET /listings/{id}/reviews — public.
pub async fn list_reviews(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let listing = state
        .db
        .get_listing(&listing_id.to_string())?
        .ok_or_else(|| ApiError::NotFound("Listing not found".into()))?;

    let rows = state.db.reviews_for_listing(&listing.id)?;
    let mut reviews = Vec::with_capacity(rows.len());
    for row in rows {
        reviews.push(review_response(&state, &row)?);
    }
    Ok(Json(reviews))
}

/// POST /listings/{id}/reviews — one review per (listing, user).
pub async fn add_review(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<AddReviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let claims = extract_claims(&headers, &state.jwt_secret)?;

    if !(1..=5).contains(&req.rating) {
        return Err(ApiError::Validation("Rating must be between 1 and 5".into()));
    }

    let listing = state
        .db
        .get_listing(&listing_id.to_string())?
        .ok_or_else(|| ApiError::NotFound("Listing not found".into()))?;

    let review_id = Uuid::new_v4();
    let row = state
        .db
        .add_review(
            &review_id.to_string(),
            &listing.id,
            &claims.sub.to_string(),
            req.rating,
            &req.comment,
        )
        .map_err(|e| match e {
            StoreError::DuplicateReview => {
                ApiError::Validation("You have already reviewed this listing".into())
            }
            other => other.into(),
        })?;

    Ok((StatusCode::CREATED, Json(review_response(&state, &row)?)))
}

/// GET /listings/{id}/bookings — host only.
pub async fn listing_bookings(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let claims = extract_claims(&headers, &state.jwt_secret)?;
    let listing = state
        .db
        .get_listing(&listing_id.to_string())?
        .ok_or_else(|| ApiError::NotFound("Listing not found".into()))?;

    if listing.host_id != claims.sub.to_string() {
        return Err(ApiError::Forbidden(
            "Only the host can view all bookings for this listing".into(),
        ));
    }

    let rows = state.db.bookings_for_listing(&listing.id)?;
    let mut bookings = Vec::with_capacity(rows.len());
    for row in rows {
        bookings.push(booking_response_for_row(&state, row)?);
    }
    Ok(Json(bookings))
}

fn require_host(
    state: &AppState,
    listing_id: &Uuid,
    user_id: &Uuid,
) -> Result<ListingRow, ApiError> {
    let row = state
        .db
        .get_listing(&listing_id.to_string())?
        .ok_or_else(|| ApiError::NotFound("Listing not found".into()))?;

    if row.host_id != user_id.to_string() {
        return Err(ApiError::Forbidden(
            "Only the host can modify this listing".into(),
        ));
    }
    Ok(row)
}

fn listing_response(
    state: &AppState,
    row: &ListingRow,
    average_rating: f64,
    reviews_count: i64,
) -> Result<ListingResponse, ApiError> {
    let host = state
        .db
        .get_user_by_id(&row.host_id)?
        .ok_or_else(|| ApiError::Internal(format!("listing {} has no host row", row.id)))?;

    Ok(ListingResponse {
        id: parse_id(&row.id),
        host: user_response(&host),
        name: row.name.clone(),
        description: row.description.clone(),
        location: row.location.clone(),
        price_per_night_cents: row.price_per_night_cents,
        average_rating,
        reviews_count,
        created_at: row.created_at.clone(),
        updated_at: row.updated_at.clone(),
    })
}

fn review_response(state: &AppState, row: &ReviewRow) -> Result<ReviewResponse, ApiError> {
    let user = state
        .db
        .get_user_by_id(&row.user_id)?
        .ok_or_else(|| ApiError::Internal(format!("review {} has no user row", row.id)))?;

    Ok(ReviewResponse {
        id: parse_id(&row.id),
        user: user_response(&user),
        rating: row.rating,
        comment: row.comment.clone(),
        created_at: row.created_at.clone(),
    })
}

pub(crate) fn parse_id(raw: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt id '{}': {}", raw, e);
        Uuid::default()
    })
}
