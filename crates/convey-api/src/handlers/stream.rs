//! Stream token issuance.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use tracing::info;
use validator::Validate;

use convey_core::error::AppError;
use convey_core::types::ConversationId;

use crate::dto::request::WatermarkQuery;
use crate::dto::response::{ApiResponse, StreamTokenResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// POST /api/conversations/{conversation_id}/stream[?watermark=N]
///
/// Issues a one-time token for opening the conversation's socket. With a
/// watermark, the socket replays only the messages after it.
pub async fn issue_stream_token(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    Query(query): Query<WatermarkQuery>,
) -> Result<(StatusCode, Json<ApiResponse<StreamTokenResponse>>), ApiError> {
    query
        .validate()
        .map_err(|e| AppError::validation(format!("Invalid watermark: {e}")))?;
    let conversation_id = parse_conversation_id(conversation_id)?;
    let watermark = query.watermark.unwrap_or(0);

    let token = state.engine.issue_token(conversation_id.clone(), watermark);
    let stream_config = state.engine.config();

    info!(
        conversation_id = %conversation_id,
        watermark,
        "Stream token issued"
    );

    let response = StreamTokenResponse {
        stream_url: format!("{}?t={}", stream_config.stream_path, token),
        token: token.into_string(),
        expires_in: stream_config.token_ttl_seconds,
        conversation_id,
    };

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(response))))
}

/// Rejects blank conversation ids.
pub(crate) fn parse_conversation_id(raw: String) -> Result<ConversationId, ApiError> {
    if raw.trim().is_empty() {
        return Err(AppError::validation("Conversation id must not be blank").into());
    }
    Ok(ConversationId::new(raw))
}
