//! Rows as read from SQLite, plus the borrowed parameter structs used for
//! inserts and profile patches. Ids and timestamps stay as stored text;
//! `threadline-api` converts them to wire models.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub bio: String,
    pub profile_pic: String,
    pub signup_ip: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct NewUser<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub signup_ip: Option<&'a str>,
}

/// Profile edits. `None` leaves the column untouched.
#[derive(Debug, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub bio: Option<String>,
    pub profile_pic: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PostRow {
    pub id: String,
    pub author_id: String,
    pub text: String,
    pub img: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct LikeRow {
    pub post_id: String,
    pub user_id: String,
}

#[derive(Debug, Clone)]
pub struct ReplyRow {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub text: String,
    pub username: String,
    pub user_profile_pic: String,
    pub created_at: String,
}

pub struct NewReply<'a> {
    pub id: &'a str,
    pub post_id: &'a str,
    pub user_id: &'a str,
    pub text: &'a str,
    pub username: &'a str,
    pub user_profile_pic: &'a str,
}

#[derive(Debug, Clone)]
pub struct ConversationRow {
    pub id: String,
    pub participant_a: String,
    pub participant_b: String,
    pub last_message_text: String,
    pub last_message_sender: Option<String>,
    pub last_message_seen: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl ConversationRow {
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participant_a == user_id || self.participant_b == user_id
    }

    /// The participant that is not `user_id`, or `None` if `user_id` is not
    /// part of this conversation.
    pub fn other_participant(&self, user_id: &str) -> Option<&str> {
        if self.participant_a == user_id {
            Some(&self.participant_b)
        } else if self.participant_b == user_id {
            Some(&self.participant_a)
        } else {
            None
        }
    }
}

/// A conversation joined with the other participant's public profile.
pub struct ConversationListRow {
    pub conversation: ConversationRow,
    pub other_id: String,
    pub other_username: String,
    pub other_profile_pic: String,
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub text: String,
    pub seen: bool,
    pub created_at: String,
}

pub struct NewMessage<'a> {
    pub id: &'a str,
    pub sender_id: &'a str,
    pub recipient_id: &'a str,
    pub text: &'a str,
}

/// Result of acknowledging a conversation as read.
#[derive(Debug)]
pub struct SeenOutcome {
    /// Participant whose messages were marked seen.
    pub other_participant: String,
    /// Number of messages flipped from unseen to seen.
    pub updated: usize,
}

pub struct LoginRecord<'a> {
    pub id: &'a str,
    pub user_id: &'a str,
    pub ip: Option<&'a str>,
    pub browser: Option<&'a str>,
    pub os: Option<&'a str>,
    pub device: Option<&'a str>,
    /// Raw JSON from the geo lookup.
    pub location: Option<&'a str>,
}
