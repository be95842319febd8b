use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::LastMessage;

// -- JWT Claims --

/// Session token claims, shared by the REST middleware and the gateway
/// upgrade check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Users --

/// Missing fields deserialize as empty so the handler can answer with a
/// readable validation error instead of a body rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub bio: Option<String>,
    /// Base64 data URL of a new avatar.
    pub profile_pic: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FollowResponse {
    pub message: String,
    pub following: bool,
}

// -- Posts --

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub posted_by: Option<Uuid>,
    pub text: String,
    /// Base64 data URL of an attached image.
    pub img: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReplyRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LikeResponse {
    pub message: String,
    pub liked: bool,
}

// -- Messages --

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub recipient_id: Option<Uuid>,
    pub message: String,
}

/// The other side of a conversation, as shown in the conversation list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_id: Uuid,
    pub username: String,
    pub profile_pic: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    pub id: Uuid,
    pub participant: Participant,
    pub last_message: LastMessage,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

// -- Generic --

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusMessage {
    pub message: String,
}

impl StatusMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
