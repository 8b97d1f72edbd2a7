use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::NaiveDate;
use tracing::warn;
use uuid::Uuid;

use roost_db::StoreError;
use roost_db::models::{BookingRow, ListingRow, UserRow};
use roost_notify::Notification;
use roost_types::api::{BookingResponse, CreateBookingRequest, ListingSummary};
use roost_types::models::BookingStatus;

use crate::auth::{extract_claims, user_response};
use crate::error::ApiError;
use crate::listings::parse_id;
use crate::AppState;

/// POST /bookings — availability-gated creation with derived price.
pub async fn create_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let claims = extract_claims(&headers, &state.jwt_secret)?;

    let booking_id = Uuid::new_v4();
    let row = state
        .db
        .create_booking(
            &booking_id.to_string(),
            &req.listing_id.to_string(),
            &claims.sub.to_string(),
            req.start_date,
            req.end_date,
        )
        .map_err(|e| match e {
            StoreError::NotFound => ApiError::Validation("Listing not found".into()),
            other => other.into(),
        })?;

    let listing = load_listing(&state, &row.listing_id)?;
    let guest = load_user(&state, &row.guest_id)?;

    state.notifier.submit(Notification::BookingCreated {
        to: guest.email.clone(),
        guest_name: format!("{} {}", guest.first_name, guest.last_name),
        listing_name: listing.name.clone(),
        location: listing.location.clone(),
        start_date: row.start_date.clone(),
        end_date: row.end_date.clone(),
        total_price_cents: row.total_price_cents,
    });

    Ok((
        StatusCode::CREATED,
        Json(booking_response(&row, &listing, &guest)),
    ))
}

/// GET /bookings — bookings where the caller is guest or host.
pub async fn list_bookings(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let claims = extract_claims(&headers, &state.jwt_secret)?;
    rows_to_responses(&state, state.db.bookings_involving(&claims.sub.to_string())?)
}

/// GET /bookings/my_bookings — caller as guest.
pub async fn my_bookings(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let claims = extract_claims(&headers, &state.jwt_secret)?;
    rows_to_responses(&state, state.db.bookings_for_guest(&claims.sub.to_string())?)
}

/// GET /bookings/hosting_bookings — bookings on listings the caller hosts.
pub async fn hosting_bookings(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let claims = extract_claims(&headers, &state.jwt_secret)?;
    rows_to_responses(&state, state.db.bookings_for_host(&claims.sub.to_string())?)
}

/// GET /bookings/{id} — visible to the guest and the host only.
pub async fn get_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let claims = extract_claims(&headers, &state.jwt_secret)?;

    let row = state
        .db
        .get_booking(&booking_id.to_string())?
        .ok_or_else(|| ApiError::NotFound("Booking not found".into()))?;
    let listing = load_listing(&state, &row.listing_id)?;

    let caller = claims.sub.to_string();
    if row.guest_id != caller && listing.host_id != caller {
        // Scoped like the list endpoints: outsiders can't probe for existence.
        return Err(ApiError::NotFound("Booking not found".into()));
    }

    let guest = load_user(&state, &row.guest_id)?;
    Ok(Json(booking_response(&row, &listing, &guest)))
}

/// POST /bookings/{id}/confirm — host only. The source state is deliberately
/// not checked; see DESIGN.md.
pub async fn confirm_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let claims = extract_claims(&headers, &state.jwt_secret)?;

    let row = state
        .db
        .get_booking(&booking_id.to_string())?
        .ok_or_else(|| ApiError::NotFound("Booking not found".into()))?;
    let listing = load_listing(&state, &row.listing_id)?;

    if listing.host_id != claims.sub.to_string() {
        return Err(ApiError::Forbidden("Only the host can confirm bookings".into()));
    }

    let row = state.db.set_booking_status(&row.id, BookingStatus::Confirmed)?;
    let guest = load_user(&state, &row.guest_id)?;
    let host = load_user(&state, &listing.host_id)?;

    state.notifier.submit(Notification::BookingConfirmed {
        to: guest.email.clone(),
        guest_name: format!("{} {}", guest.first_name, guest.last_name),
        listing_name: listing.name.clone(),
        location: listing.location.clone(),
        start_date: row.start_date.clone(),
        end_date: row.end_date.clone(),
        total_price_cents: row.total_price_cents,
        host_name: format!("{} {}", host.first_name, host.last_name),
        host_email: host.email.clone(),
        host_phone: host.phone_number.clone(),
    });

    Ok(Json(booking_response(&row, &listing, &guest)))
}

/// POST /bookings/{id}/cancel — guest or host, from any state; see DESIGN.md.
pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let claims = extract_claims(&headers, &state.jwt_secret)?;

    let row = state
        .db
        .get_booking(&booking_id.to_string())?
        .ok_or_else(|| ApiError::NotFound("Booking not found".into()))?;
    let listing = load_listing(&state, &row.listing_id)?;

    let caller = claims.sub.to_string();
    if row.guest_id != caller && listing.host_id != caller {
        return Err(ApiError::Forbidden(
            "You do not have permission to cancel this booking".into(),
        ));
    }

    let row = state.db.set_booking_status(&row.id, BookingStatus::Cancelled)?;
    let guest = load_user(&state, &row.guest_id)?;
    Ok(Json(booking_response(&row, &listing, &guest)))
}

// ── Response assembly ───────────────────────────────────────────────────

fn rows_to_responses(
    state: &AppState,
    rows: Vec<BookingRow>,
) -> Result<Json<Vec<BookingResponse>>, ApiError> {
    let mut bookings = Vec::with_capacity(rows.len());
    for row in rows {
        bookings.push(booking_response_for_row(state, row)?);
    }
    Ok(Json(bookings))
}

pub(crate) fn booking_response_for_row(
    state: &AppState,
    row: BookingRow,
) -> Result<BookingResponse, ApiError> {
    let listing = load_listing(state, &row.listing_id)?;
    let guest = load_user(state, &row.guest_id)?;
    Ok(booking_response(&row, &listing, &guest))
}

fn booking_response(row: &BookingRow, listing: &ListingRow, guest: &UserRow) -> BookingResponse {
    let start_date = parse_date(&row.start_date, &row.id);
    let end_date = parse_date(&row.end_date, &row.id);

    BookingResponse {
        id: parse_id(&row.id),
        listing: ListingSummary {
            id: parse_id(&listing.id),
            name: listing.name.clone(),
            location: listing.location.clone(),
            price_per_night_cents: listing.price_per_night_cents,
        },
        guest: user_response(guest),
        start_date,
        end_date,
        total_price_cents: row.total_price_cents,
        status: row.status.clone(),
        duration_days: (end_date - start_date).num_days(),
        created_at: row.created_at.clone(),
    }
}

fn parse_date(raw: &str, booking_id: &str) -> NaiveDate {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt date '{}' on booking '{}': {}", raw, booking_id, e);
        NaiveDate::default()
    })
}

fn load_listing(state: &AppState, id: &str) -> Result<ListingRow, ApiError> {
    state
        .db
        .get_listing(id)?
        .ok_or_else(|| ApiError::Internal(format!("booking references missing listing {id}")))
}

fn load_user(state: &AppState, id: &str) -> Result<UserRow, ApiError> {
    state
        .db
        .get_user_by_id(id)?
        .ok_or_else(|| ApiError::Internal(format!("booking references missing user {id}")))
}
