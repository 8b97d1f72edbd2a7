use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use roost_types::models::PaymentStatus;

/// Failures talking to the gateway. Captured at the client boundary and
/// returned as values; the API layer decides the HTTP response shape.
#[derive(Debug, Error)]
pub enum ChapaError {
    #[error("request timed out")]
    Timeout,

    #[error("gateway returned HTTP {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("malformed gateway response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ChapaError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ChapaError::Timeout
        } else if let Some(status) = e.status() {
            ChapaError::Status(status.as_u16())
        } else if e.is_decode() {
            ChapaError::Malformed(e.to_string())
        } else {
            ChapaError::Transport(e.to_string())
        }
    }
}

/// Raw envelope every Chapa endpoint wraps its payload in.
#[derive(Debug, Deserialize)]
pub struct ChapaEnvelope {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Inputs for a payment-intent initialization.
#[derive(Debug, Clone)]
pub struct InitializePayment {
    pub amount_cents: i64,
    pub currency: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub tx_ref: String,
    pub callback_url: String,
    pub return_url: String,
    pub title: String,
    pub description: String,
}

/// Successful initialization: a hosted checkout to redirect the payer to.
#[derive(Debug)]
pub struct InitializeData {
    pub checkout_url: String,
    pub message: String,
    pub data: serde_json::Value,
}

/// Successful verification of a transaction by reference.
#[derive(Debug)]
pub struct VerifyData {
    pub message: String,
    pub data: serde_json::Value,
}

/// Callback body posted by the provider. Extra fields are ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookPayload {
    pub tx_ref: String,
    pub status: String,
    #[serde(default)]
    pub reference: Option<String>,
}

/// Normalized webhook result handed to reconciliation. `verification` is the
/// provider's answer when asked to confirm the asserted status — either
/// `{"status":"success",...}` or `{"status":"error",...}`.
#[derive(Debug, Serialize)]
pub struct WebhookReport {
    pub tx_ref: String,
    pub payment_status: String,
    pub verification: serde_json::Value,
}

/// Explicit table from the provider's status vocabulary to local payment
/// state. Anything unrecognized stays pending.
pub fn payment_status_from_provider(provider_status: &str) -> PaymentStatus {
    match provider_status {
        "success" => PaymentStatus::Completed,
        "failed/cancelled" => PaymentStatus::Failed,
        "refunded" => PaymentStatus::Refunded,
        "reversed" => PaymentStatus::Reversed,
        _ => PaymentStatus::Pending,
    }
}

/// Caller-assigned transaction reference, created before the checkout session
/// exists so the booking can be correlated across initiate/verify/webhook.
pub fn make_tx_ref(booking_id: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("booking-{}-{}", booking_id, &suffix[..8])
}

/// Cents to the provider's decimal string form, e.g. 40000 -> "400.00".
pub fn format_amount(amount_cents: i64) -> String {
    format!("{}.{:02}", amount_cents / 100, amount_cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_status_mapping_table() {
        assert_eq!(payment_status_from_provider("success"), PaymentStatus::Completed);
        assert_eq!(payment_status_from_provider("failed/cancelled"), PaymentStatus::Failed);
        assert_eq!(payment_status_from_provider("refunded"), PaymentStatus::Refunded);
        assert_eq!(payment_status_from_provider("reversed"), PaymentStatus::Reversed);
        // Default branch: unknown vocabulary never reaches a terminal state.
        assert_eq!(payment_status_from_provider("processing"), PaymentStatus::Pending);
        assert_eq!(payment_status_from_provider(""), PaymentStatus::Pending);
    }

    #[test]
    fn tx_ref_embeds_booking_id() {
        let tx_ref = make_tx_ref("b-123");
        assert!(tx_ref.starts_with("booking-b-123-"));
        assert_eq!(tx_ref.len(), "booking-b-123-".len() + 8);

        // Each call yields a fresh suffix.
        assert_ne!(make_tx_ref("b-123"), make_tx_ref("b-123"));
    }

    #[test]
    fn amount_formatting() {
        assert_eq!(format_amount(40_000), "400.00");
        assert_eq!(format_amount(40_005), "400.05");
        assert_eq!(format_amount(99), "0.99");
    }

    #[test]
    fn webhook_payload_tolerates_extra_fields() {
        let payload: WebhookPayload = serde_json::from_str(
            r#"{"tx_ref":"X","status":"success","reference":"R1","event":"charge.success"}"#,
        )
        .unwrap();
        assert_eq!(payload.tx_ref, "X");
        assert_eq!(payload.status, "success");
        assert_eq!(payload.reference.as_deref(), Some("R1"));

        let minimal: WebhookPayload =
            serde_json::from_str(r#"{"tx_ref":"Y","status":"reversed"}"#).unwrap();
        assert!(minimal.reference.is_none());
    }
}
