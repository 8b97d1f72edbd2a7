use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use uuid::Uuid;

use roost_db::StoreError;
use roost_db::models::MessageRow;
use roost_types::api::{MessageResponse, SendMessageRequest};

use crate::auth::extract_claims;
use crate::error::ApiError;
use crate::listings::parse_id;
use crate::AppState;

/// POST /messages
pub async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let claims = extract_claims(&headers, &state.jwt_secret)?;

    if req.body.is_empty() {
        return Err(ApiError::Validation("Message body must not be empty".into()));
    }

    let message_id = Uuid::new_v4();
    let row = state
        .db
        .send_message(
            &message_id.to_string(),
            &claims.sub.to_string(),
            &req.recipient_id.to_string(),
            &req.body,
        )
        .map_err(|e| match e {
            StoreError::NotFound => ApiError::Validation("Recipient not found".into()),
            other => other.into(),
        })?;

    Ok((StatusCode::CREATED, Json(message_response(&row))))
}

/// GET /messages — conversations where the caller is sender or recipient.
pub async fn list_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let claims = extract_claims(&headers, &state.jwt_secret)?;

    let rows = state.db.messages_involving(&claims.sub.to_string())?;
    let messages: Vec<MessageResponse> = rows.iter().map(message_response).collect();
    Ok(Json(messages))
}

fn message_response(row: &MessageRow) -> MessageResponse {
    MessageResponse {
        id: parse_id(&row.id),
        sender_id: parse_id(&row.sender_id),
        recipient_id: parse_id(&row.recipient_id),
        body: row.body.clone(),
        sent_at: row.sent_at.clone(),
    }
}
