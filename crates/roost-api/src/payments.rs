use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use roost_chapa::{InitializePayment, WebhookPayload, make_tx_ref, payment_status_from_provider};
use roost_db::StoreError;
use roost_db::models::PaymentRow;
use roost_db::payments::ReconcileOutcome;
use roost_notify::Notification;
use roost_types::api::{InitiatePaymentRequest, PaymentResponse};
use roost_types::models::PaymentStatus;

use crate::auth::extract_claims;
use crate::error::ApiError;
use crate::listings::parse_id;
use crate::AppState;

const DEFAULT_CURRENCY: &str = "NGN";
const DEFAULT_METHOD: &str = "Chapa";

/// POST /payments/{booking_id}/initiate — create a payment row for the
/// booking and open a hosted checkout with the gateway.
pub async fn initiate_payment(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<InitiatePaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let claims = extract_claims(&headers, &state.jwt_secret)?;

    let booking = state
        .db
        .get_booking(&booking_id.to_string())?
        .ok_or_else(|| ApiError::NotFound("Booking not found".into()))?;

    if booking.guest_id != claims.sub.to_string() {
        return Err(ApiError::Forbidden(
            "Only the guest can pay for this booking".into(),
        ));
    }

    let listing = state
        .db
        .get_listing(&booking.listing_id)?
        .ok_or_else(|| ApiError::Internal("booking references missing listing".into()))?;
    let user = state
        .db
        .get_user_by_id(&booking.guest_id)?
        .ok_or_else(|| ApiError::Internal("booking references missing user".into()))?;

    let method_name = req.method_name.as_deref().unwrap_or(DEFAULT_METHOD);
    let payment_id = Uuid::new_v4();
    let payment = state.db.create_payment(
        &payment_id.to_string(),
        &booking.id,
        &user.id,
        booking.total_price_cents,
        DEFAULT_CURRENCY,
        method_name,
    )?;

    let tx_ref = make_tx_ref(&booking.id);
    let init = InitializePayment {
        amount_cents: payment.amount_cents,
        currency: payment.currency.clone(),
        email: user.email.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        phone_number: user.phone_number.clone().unwrap_or_default(),
        tx_ref: tx_ref.clone(),
        callback_url: format!("{}/payments/webhook", state.public_url),
        return_url: format!("{}/payments/status/{}", state.public_url, tx_ref),
        title: format!("Booking Payment - {}", listing.name),
        description: format!(
            "Payment for booking from {} to {}",
            booking.start_date, booking.end_date
        ),
    };

    match state.chapa.initialize(&init).await {
        Ok(data) => {
            state.db.set_payment_tx_ref(&payment.id, &tx_ref)?;

            Ok((
                StatusCode::CREATED,
                Json(json!({
                    "status": "success",
                    "payment_id": payment.id,
                    "checkout_url": data.checkout_url,
                    "tx_ref": tx_ref,
                    "data": data.data,
                    "message": data.message,
                })),
            ))
        }
        Err(e) => {
            error!("Chapa API error during payment initialization: {}", e);
            Err(ApiError::Upstream(
                "Failed to initialize payment with Chapa".into(),
            ))
        }
    }
}

/// GET /payments/status/{tx_ref} — verify a transaction with the gateway and
/// report the locally reconciled state alongside.
pub async fn payment_status(
    State(state): State<AppState>,
    Path(tx_ref): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let _claims = extract_claims(&headers, &state.jwt_secret)?;

    let verification = state.chapa.verify(&tx_ref).await;

    let payment = state
        .db
        .get_payment_by_tx_ref(&tx_ref)?
        .ok_or_else(|| ApiError::NotFound("Payment record not found".into()))?;

    match verification {
        Ok(verified) => Ok(Json(json!({
            "status": "success",
            "payment_status": payment.status,
            "payment_data": verified.data,
            "message": "Payment verified successfully",
        }))),
        Err(e) => {
            error!("Payment verification failed for tx_ref {}: {}", tx_ref, e);
            Err(ApiError::Upstream("Failed to verify payment".into()))
        }
    }
}

/// POST /payments/webhook — unauthenticated provider callback.
///
/// The asserted status is re-verified with the gateway, mapped through the
/// provider-status table and applied with a compare-and-set, so a redelivered
/// webhook neither rewrites the row nor re-sends email.
pub async fn webhook(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, ApiError> {
    let payload: WebhookPayload = serde_json::from_value(body)
        .map_err(|_| ApiError::Validation("Malformed webhook payload".into()))?;

    let report = state.chapa.handle_webhook(&payload).await;

    let new_status = payment_status_from_provider(&payload.status);
    let outcome = state
        .db
        .apply_gateway_status(&payload.tx_ref, new_status, payload.reference.as_deref())
        .map_err(|e| match e {
            StoreError::NotFound => ApiError::NotFound("Payment record not found".into()),
            other => other.into(),
        })?;

    // Exactly one notification per terminal transition. Replays land in the
    // Unchanged arm and send nothing.
    if let ReconcileOutcome::Transitioned(payment) = &outcome {
        match new_status {
            PaymentStatus::Completed => submit_payment_confirmed(&state, payment)?,
            PaymentStatus::Failed => submit_payment_failed(&state, payment)?,
            _ => {}
        }
    }

    Ok(Json(json!({
        "status": "success",
        "tx_ref": report.tx_ref,
        "payment_status": report.payment_status,
        "verification": report.verification,
    })))
}

/// GET /payments — scoped to the requesting user.
pub async fn list_payments(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let claims = extract_claims(&headers, &state.jwt_secret)?;

    let rows = state.db.payments_for_user(&claims.sub.to_string())?;
    let payments: Vec<PaymentResponse> = rows.iter().map(payment_response).collect();
    Ok(Json(payments))
}

/// GET /payments/{id} — owner only.
pub async fn get_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let claims = extract_claims(&headers, &state.jwt_secret)?;

    let row = state
        .db
        .get_payment(&payment_id.to_string())?
        .ok_or_else(|| ApiError::NotFound("Payment not found".into()))?;

    if row.user_id != claims.sub.to_string() {
        return Err(ApiError::Forbidden(
            "You do not have permission to access this payment".into(),
        ));
    }

    Ok(Json(payment_response(&row)))
}

// ── Notification assembly ───────────────────────────────────────────────

fn submit_payment_confirmed(state: &AppState, payment: &PaymentRow) -> Result<(), ApiError> {
    let booking = state
        .db
        .get_booking(&payment.booking_id)?
        .ok_or_else(|| ApiError::Internal("payment references missing booking".into()))?;
    let listing = state
        .db
        .get_listing(&booking.listing_id)?
        .ok_or_else(|| ApiError::Internal("booking references missing listing".into()))?;
    let guest = state
        .db
        .get_user_by_id(&payment.user_id)?
        .ok_or_else(|| ApiError::Internal("payment references missing user".into()))?;

    let nights = booking_nights(&booking.start_date, &booking.end_date);

    state.notifier.submit(Notification::PaymentConfirmed {
        to: guest.email.clone(),
        guest_name: format!("{} {}", guest.first_name, guest.last_name),
        listing_name: listing.name,
        location: listing.location,
        start_date: booking.start_date,
        end_date: booking.end_date,
        nights,
        amount_cents: payment.amount_cents,
        currency: payment.currency.clone(),
        transaction_id: payment.transaction_id.clone().unwrap_or_default(),
        payment_date: payment.updated_at.clone(),
    });
    Ok(())
}

fn submit_payment_failed(state: &AppState, payment: &PaymentRow) -> Result<(), ApiError> {
    let guest = state
        .db
        .get_user_by_id(&payment.user_id)?
        .ok_or_else(|| ApiError::Internal("payment references missing user".into()))?;

    state.notifier.submit(Notification::PaymentFailed {
        to: guest.email.clone(),
        guest_name: format!("{} {}", guest.first_name, guest.last_name),
        booking_id: payment.booking_id.clone(),
        amount_cents: payment.amount_cents,
        currency: payment.currency.clone(),
    });
    Ok(())
}

fn booking_nights(start: &str, end: &str) -> i64 {
    match (
        start.parse::<chrono::NaiveDate>(),
        end.parse::<chrono::NaiveDate>(),
    ) {
        (Ok(s), Ok(e)) => (e - s).num_days(),
        _ => 0,
    }
}

fn payment_response(row: &PaymentRow) -> PaymentResponse {
    PaymentResponse {
        id: parse_id(&row.id),
        booking_id: parse_id(&row.booking_id),
        amount_cents: row.amount_cents,
        currency: row.currency.clone(),
        status: row.status.clone(),
        transaction_id: row.transaction_id.clone(),
        tx_ref: row.tx_ref.clone(),
        method_name: row.method_name.clone(),
        created_at: row.created_at.clone(),
    }
}
