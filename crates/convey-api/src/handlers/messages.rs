//! Message posting and polling against the in-memory store.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use validator::Validate;

use convey_core::error::AppError;
use convey_realtime::DeliveryFrame;

use crate::dto::request::{PostMessageRequest, WatermarkQuery};
use crate::dto::response::{ApiResponse, MessagePostedResponse};
use crate::error::ApiError;
use crate::handlers::stream::parse_conversation_id;
use crate::state::AppState;

/// POST /api/conversations/{conversation_id}/messages
///
/// Appends a message. Every socket streaming the conversation receives it.
pub async fn post_message(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    Json(req): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MessagePostedResponse>>), ApiError> {
    req.validate()
        .map_err(|e| AppError::validation(format!("Invalid message: {e}")))?;
    let conversation_id = parse_conversation_id(conversation_id)?;

    let message = state.store.append(req.into_message(conversation_id));
    let id = message
        .id
        .clone()
        .ok_or_else(|| AppError::internal("Store did not assign a message id"))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(MessagePostedResponse { id, message })),
    ))
}

/// GET /api/conversations/{conversation_id}/messages[?watermark=N]
///
/// Returns the messages after `watermark` in the same frame shape the
/// socket uses, so a client can poll and later resume streaming.
pub async fn get_messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    Query(query): Query<WatermarkQuery>,
) -> Result<Json<DeliveryFrame>, ApiError> {
    query
        .validate()
        .map_err(|e| AppError::validation(format!("Invalid watermark: {e}")))?;
    let conversation_id = parse_conversation_id(conversation_id)?;
    let watermark = query.watermark.unwrap_or(0);

    let messages = state.store.get_messages_from(&conversation_id, watermark);
    let next = watermark.saturating_add(messages.len() as u64);

    Ok(Json(DeliveryFrame::tracked(messages, next)))
}
