//! Store rows -> wire models.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use threadline_db::models::{
    ConversationListRow, ConversationRow, MessageRow, PostRow, ReplyRow, UserRow,
};
use threadline_db::{Database, parse_timestamp};
use threadline_types::api::{ConversationResponse, Participant};
use threadline_types::models::{LastMessage, Message, Post, Reply, User};

pub(crate) fn parse_id(raw: &str, context: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt id '{}' on {}: {}", raw, context, e);
        Uuid::default()
    })
}

pub(crate) fn parse_time(raw: &str, context: &str) -> DateTime<Utc> {
    parse_timestamp(raw).unwrap_or_else(|| {
        warn!("Corrupt timestamp '{}' on {}", raw, context);
        DateTime::default()
    })
}

/// Public user with follower/following lists.
pub fn load_user(db: &Database, row: UserRow) -> anyhow::Result<User> {
    let followers = db.get_followers(&row.id)?;
    let following = db.get_following(&row.id)?;

    let context = format!("user '{}'", row.id);
    Ok(User {
        id: parse_id(&row.id, &context),
        name: row.name,
        username: row.username,
        email: row.email,
        bio: row.bio,
        profile_pic: row.profile_pic,
        followers: followers.iter().map(|id| parse_id(id, &context)).collect(),
        following: following.iter().map(|id| parse_id(id, &context)).collect(),
        created_at: parse_time(&row.created_at, &context),
        updated_at: parse_time(&row.updated_at, &context),
    })
}

/// Posts with their likes and replies, keeping the order of `rows`.
pub fn load_posts(db: &Database, rows: Vec<PostRow>) -> anyhow::Result<Vec<Post>> {
    let post_ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
    let like_rows = db.get_likes_for_posts(&post_ids)?;
    let reply_rows = db.get_replies_for_posts(&post_ids)?;

    let mut likes: HashMap<String, Vec<Uuid>> = HashMap::new();
    for like in like_rows {
        let user_id = parse_id(&like.user_id, "like");
        likes.entry(like.post_id).or_default().push(user_id);
    }

    let mut replies: HashMap<String, Vec<Reply>> = HashMap::new();
    for row in reply_rows {
        let post_id = row.post_id.clone();
        replies.entry(post_id).or_default().push(reply(row));
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let context = format!("post '{}'", row.id);
            Post {
                id: parse_id(&row.id, &context),
                posted_by: parse_id(&row.author_id, &context),
                likes: likes.remove(&row.id).unwrap_or_default(),
                replies: replies.remove(&row.id).unwrap_or_default(),
                text: row.text,
                img: row.img,
                created_at: parse_time(&row.created_at, &context),
                updated_at: parse_time(&row.updated_at, &context),
            }
        })
        .collect())
}

pub fn load_post(db: &Database, row: PostRow) -> anyhow::Result<Post> {
    let id = row.id.clone();
    load_posts(db, vec![row])?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Post {} dropped while loading", id))
}

pub fn reply(row: ReplyRow) -> Reply {
    let context = format!("reply '{}'", row.id);
    Reply {
        id: parse_id(&row.id, &context),
        user_id: parse_id(&row.user_id, &context),
        text: row.text,
        username: row.username,
        user_profile_pic: row.user_profile_pic,
        created_at: parse_time(&row.created_at, &context),
    }
}

pub fn message(row: MessageRow) -> Message {
    let context = format!("message '{}'", row.id);
    Message {
        id: parse_id(&row.id, &context),
        conversation_id: parse_id(&row.conversation_id, &context),
        sender: parse_id(&row.sender_id, &context),
        text: row.text,
        seen: row.seen,
        created_at: parse_time(&row.created_at, &context),
    }
}

pub fn last_message(row: &ConversationRow) -> LastMessage {
    LastMessage {
        text: row.last_message_text.clone(),
        sender: row
            .last_message_sender
            .as_deref()
            .map(|id| parse_id(id, "last message")),
        seen: row.last_message_seen,
    }
}

pub fn conversation_summary(row: ConversationListRow) -> ConversationResponse {
    let context = format!("conversation '{}'", row.conversation.id);
    ConversationResponse {
        id: parse_id(&row.conversation.id, &context),
        participant: Participant {
            user_id: parse_id(&row.other_id, &context),
            username: row.other_username,
            profile_pic: row.other_profile_pic,
        },
        last_message: last_message(&row.conversation),
        updated_at: parse_time(&row.conversation.updated_at, &context),
    }
}
