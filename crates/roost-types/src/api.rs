use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// JWT claims shared by the REST middleware and token issuance. Canonical
/// definition lives here in roost-types to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub email: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub created_at: String,
}

// -- Listings --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateListingRequest {
    pub name: String,
    pub description: String,
    pub location: String,
    pub price_per_night_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct ListingResponse {
    pub id: Uuid,
    pub host: UserResponse,
    pub name: String,
    pub description: String,
    pub location: String,
    pub price_per_night_cents: i64,
    pub average_rating: f64,
    pub reviews_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Compact listing shape embedded in booking responses.
#[derive(Debug, Serialize)]
pub struct ListingSummary {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub price_per_night_cents: i64,
}

// -- Reviews --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddReviewRequest {
    pub rating: i64,
    pub comment: String,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub id: Uuid,
    pub user: UserResponse,
    pub rating: i64,
    pub comment: String,
    pub created_at: String,
}

// -- Bookings --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateBookingRequest {
    pub listing_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub listing: ListingSummary,
    pub guest: UserResponse,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_price_cents: i64,
    pub status: String,
    pub duration_days: i64,
    pub created_at: String,
}

// -- Payments --

#[derive(Debug, Deserialize)]
pub struct InitiatePaymentRequest {
    #[serde(default)]
    pub method_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub status: String,
    pub transaction_id: Option<String>,
    pub tx_ref: Option<String>,
    pub method_name: String,
    pub created_at: String,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub recipient_id: Uuid,
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub body: String,
    pub sent_at: String,
}
