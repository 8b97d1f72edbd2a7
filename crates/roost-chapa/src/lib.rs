pub mod types;

pub use types::{
    ChapaError, InitializeData, InitializePayment, VerifyData, WebhookPayload, WebhookReport,
    format_amount, make_tx_ref, payment_status_from_provider,
};

use std::time::Duration;

use serde_json::json;
use tracing::{info, warn};

use types::ChapaEnvelope;

pub const DEFAULT_BASE_URL: &str = "https://api.chapa.co/v1";

/// Gateway credentials and endpoint, injected at construction — no hidden
/// process-wide state.
#[derive(Debug, Clone)]
pub struct ChapaConfig {
    pub secret_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl ChapaConfig {
    pub fn new(secret_key: String) -> Self {
        Self {
            secret_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Thin client for the Chapa payment API. One attempt per call, bounded by
/// the configured timeout; every failure comes back as a [`ChapaError`]
/// value rather than crossing the boundary.
pub struct ChapaClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl ChapaClient {
    pub fn new(config: ChapaConfig) -> Result<Self, ChapaError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ChapaError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url,
            secret_key: config.secret_key,
        })
    }

    /// Initialize a hosted-checkout transaction for a booking payment.
    pub async fn initialize(
        &self,
        payment: &InitializePayment,
    ) -> Result<InitializeData, ChapaError> {
        let body = json!({
            "amount": format_amount(payment.amount_cents),
            "currency": payment.currency,
            "email": payment.email,
            "first_name": payment.first_name,
            "last_name": payment.last_name,
            "phone_number": payment.phone_number,
            "tx_ref": payment.tx_ref,
            "callback_url": payment.callback_url,
            "return_url": payment.return_url,
            "customization": {
                "title": payment.title,
                "description": payment.description,
            }
        });

        let response = self
            .http
            .post(format!("{}/transaction/initialize", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let envelope: ChapaEnvelope = response.json().await?;

        let checkout_url = envelope
            .data
            .get("checkout_url")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| ChapaError::Malformed("missing checkout_url".into()))?;

        info!("Payment initialized: {}", payment.tx_ref);

        Ok(InitializeData {
            checkout_url,
            message: envelope
                .message
                .unwrap_or_else(|| "Payment initialized successfully".into()),
            data: envelope.data,
        })
    }

    /// Query the current state of a transaction by its caller-assigned
    /// reference.
    pub async fn verify(&self, tx_ref: &str) -> Result<VerifyData, ChapaError> {
        let response = self
            .http
            .get(format!("{}/transaction/verify/{}", self.base_url, tx_ref))
            .bearer_auth(&self.secret_key)
            .send()
            .await?
            .error_for_status()?;

        let envelope: ChapaEnvelope = response.json().await?;

        info!("Payment verification for {}: {}", tx_ref, envelope.status);

        Ok(VerifyData {
            message: envelope
                .message
                .unwrap_or_else(|| "Payment verified successfully".into()),
            data: envelope.data,
        })
    }

    /// Normalize a provider callback. The asserted status is re-verified
    /// against the provider instead of being trusted at face value; a failed
    /// verification is reported inside the result, not raised, so the caller
    /// still sees the asserted status alongside what the provider answered.
    pub async fn handle_webhook(&self, payload: &WebhookPayload) -> WebhookReport {
        info!("Webhook received for {}: {}", payload.tx_ref, payload.status);

        let verification = match self.verify(&payload.tx_ref).await {
            Ok(verified) => json!({
                "status": "success",
                "data": verified.data,
                "message": verified.message,
            }),
            Err(e) => {
                warn!("Webhook verification failed for {}: {}", payload.tx_ref, e);
                json!({
                    "status": "error",
                    "message": format!("Payment verification failed: {e}"),
                })
            }
        };

        WebhookReport {
            tx_ref: payload.tx_ref.clone(),
            payment_status: payload.status.clone(),
            verification,
        }
    }
}

impl std::fmt::Debug for ChapaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the secret key.
        f.debug_struct("ChapaClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_client() -> ChapaClient {
        // Nothing listens on port 1; connections fail immediately.
        ChapaClient::new(ChapaConfig {
            secret_key: "test-key".into(),
            base_url: "http://127.0.0.1:1/v1".into(),
            timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn transport_failure_is_captured_as_a_value() {
        let client = unreachable_client();
        let err = client.verify("booking-x-deadbeef").await.unwrap_err();
        assert!(matches!(err, ChapaError::Transport(_) | ChapaError::Timeout));
    }

    #[tokio::test]
    async fn webhook_handling_survives_gateway_outage() {
        let client = unreachable_client();
        let payload = WebhookPayload {
            tx_ref: "booking-x-deadbeef".into(),
            status: "success".into(),
            reference: Some("R1".into()),
        };

        // Verification fails, but the normalized report still carries the
        // asserted status for reconciliation.
        let report = client.handle_webhook(&payload).await;
        assert_eq!(report.tx_ref, "booking-x-deadbeef");
        assert_eq!(report.payment_status, "success");
        assert_eq!(report.verification["status"], "error");
    }
}
