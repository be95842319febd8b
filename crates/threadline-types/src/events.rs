use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Message;

/// Events sent over the WebSocket gateway. Payload fields are camelCase,
/// like the REST bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all_fields = "camelCase")]
pub enum GatewayEvent {
    /// Server confirms the connection is registered
    Ready { user_id: Uuid, username: String },

    /// Full list of user ids holding at least one open connection
    OnlineUsers { user_ids: Vec<Uuid> },

    /// A direct message addressed to this user was stored
    NewMessage(Message),

    /// The other participant has read this conversation
    MessagesSeen { conversation_id: Uuid },
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all_fields = "camelCase")]
pub enum GatewayCommand {
    /// Acknowledge every message the other participant sent in a conversation
    MarkMessagesSeen { conversation_id: Uuid },
}
