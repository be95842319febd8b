use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::debug;
use uuid::Uuid;

use threadline_db::models::NewMessage;
use threadline_types::api::SendMessageRequest;
use threadline_types::events::GatewayEvent;

use crate::auth::AppState;
use crate::convert::{conversation_summary, message};
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::{blocking, path_id};

/// POST /api/messages
pub async fn send_message(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    WithRejection(Json(req), _): WithRejection<Json<SendMessageRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(recipient) = req.recipient_id else {
        return Err(ApiError::bad_request("recipientId and message are required"));
    };
    if req.message.trim().is_empty() {
        return Err(ApiError::bad_request("recipientId and message are required"));
    }
    if recipient == caller.id {
        return Err(ApiError::bad_request("You cannot message yourself"));
    }

    let message_id = Uuid::new_v4().to_string();
    let (sender_id, recipient_id) = (caller.id.to_string(), recipient.to_string());
    let text = req.message;

    let row = blocking(&state, move |db| {
        if db.get_user_by_id(&recipient_id)?.is_none() {
            return Ok(None);
        }
        let (_, row) = db.send_message(&NewMessage {
            id: &message_id,
            sender_id: &sender_id,
            recipient_id: &recipient_id,
            text: &text,
        })?;
        Ok(Some(row))
    })
    .await?
    .ok_or_else(|| ApiError::not_found("User not found"))?;

    let msg = message(row);
    let delivered = state
        .dispatcher
        .send_to_user(recipient, GatewayEvent::NewMessage(msg.clone()))
        .await;
    debug!(
        "Message {} from {} relayed to {} connection(s)",
        msg.id, caller.id, delivered
    );

    Ok((StatusCode::CREATED, Json(msg)))
}

/// GET /api/messages/conversations
pub async fn get_conversations(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = caller.id.to_string();
    let rows = blocking(&state, move |db| db.list_conversations(&uid)).await?;

    Ok(Json(
        rows.into_iter()
            .map(conversation_summary)
            .collect::<Vec<_>>(),
    ))
}

/// GET /api/messages/{other_user_id}
pub async fn get_messages(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(other): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let other = path_id(&other, "Conversation not found")?.to_string();
    let uid = caller.id.to_string();

    let rows = blocking(&state, move |db| {
        let Some(conversation) = db.get_conversation_between(&uid, &other)? else {
            return Ok(None);
        };
        db.get_messages(&conversation.id).map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("Conversation not found"))?;

    Ok(Json(rows.into_iter().map(message).collect::<Vec<_>>()))
}
