use anyhow::Result;
use rusqlite::{Connection, Row};

use crate::models::{
    ConversationListRow, ConversationRow, MessageRow, NewMessage, SeenOutcome,
};
use crate::{Database, OptionalExt, now_timestamp};

const CONVERSATION_COLUMNS: &str = "id, participant_a, participant_b, last_message_text, \
     last_message_sender, last_message_seen, created_at, updated_at";

impl Database {
    // -- Conversations --

    pub fn get_conversation(&self, id: &str) -> Result<Option<ConversationRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1");
            conn.query_row(&sql, [id], conversation_from_row).optional()
        })
    }

    pub fn get_conversation_between(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Option<ConversationRow>> {
        self.with_conn(|conn| query_conversation_between(conn, user_a, user_b))
    }

    /// The user's conversations, most recently active first, each joined with
    /// the other participant's profile.
    pub fn list_conversations(&self, user_id: &str) -> Result<Vec<ConversationListRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.participant_a, c.participant_b, c.last_message_text,
                        c.last_message_sender, c.last_message_seen, c.created_at, c.updated_at,
                        u.id, u.username, u.profile_pic
                 FROM conversations c
                 JOIN users u ON u.id = CASE WHEN c.participant_a = ?1
                                             THEN c.participant_b
                                             ELSE c.participant_a END
                 WHERE c.participant_a = ?1 OR c.participant_b = ?1
                 ORDER BY c.updated_at DESC, c.rowid DESC",
            )?;

            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(ConversationListRow {
                        conversation: conversation_from_row(row)?,
                        other_id: row.get(8)?,
                        other_username: row.get(9)?,
                        other_profile_pic: row.get(10)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Messages --

    /// Store a message, creating the conversation between sender and
    /// recipient on first contact and refreshing its last-message snapshot.
    /// All of it commits or none of it does.
    pub fn send_message(&self, msg: &NewMessage<'_>) -> Result<(ConversationRow, MessageRow)> {
        let now = now_timestamp();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let (a, b) = ordered_pair(msg.sender_id, msg.recipient_id);
            let conversation_id = match query_conversation_between(&tx, a, b)? {
                Some(existing) => existing.id,
                None => {
                    let id = uuid::Uuid::new_v4().to_string();
                    tx.execute(
                        "INSERT INTO conversations (id, participant_a, participant_b, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?4)",
                        rusqlite::params![id, a, b, now],
                    )?;
                    id
                }
            };

            tx.execute(
                "INSERT INTO messages (id, conversation_id, sender_id, text, seen, created_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5)",
                rusqlite::params![msg.id, conversation_id, msg.sender_id, msg.text, now],
            )?;

            tx.execute(
                "UPDATE conversations SET
                    last_message_text   = ?2,
                    last_message_sender = ?3,
                    last_message_seen   = 0,
                    updated_at          = ?4
                 WHERE id = ?1",
                rusqlite::params![conversation_id, msg.text, msg.sender_id, now],
            )?;

            let conversation = query_conversation_between(&tx, a, b)?
                .ok_or_else(|| anyhow::anyhow!("Conversation vanished: {}", conversation_id))?;
            tx.commit()?;

            let message = MessageRow {
                id: msg.id.to_string(),
                conversation_id,
                sender_id: msg.sender_id.to_string(),
                text: msg.text.to_string(),
                seen: false,
                created_at: now,
            };
            Ok((conversation, message))
        })
    }

    /// Messages of a conversation in insertion order.
    pub fn get_messages(&self, conversation_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, sender_id, text, seen, created_at
                 FROM messages
                 WHERE conversation_id = ?1
                 ORDER BY created_at ASC, rowid ASC",
            )?;
            let rows = stmt
                .query_map([conversation_id], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        conversation_id: row.get(1)?,
                        sender_id: row.get(2)?,
                        text: row.get(3)?,
                        seen: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Mark every unseen message the other participant sent in this
    /// conversation as seen. Returns `None` when the conversation does not
    /// exist or `reader_id` is not one of its participants.
    pub fn mark_conversation_seen(
        &self,
        conversation_id: &str,
        reader_id: &str,
    ) -> Result<Option<SeenOutcome>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let sql = format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1");
            let Some(conversation) = tx
                .query_row(&sql, [conversation_id], conversation_from_row)
                .optional()?
            else {
                return Ok(None);
            };
            let Some(other) = conversation.other_participant(reader_id) else {
                return Ok(None);
            };
            let other = other.to_string();

            let updated = tx.execute(
                "UPDATE messages SET seen = 1
                 WHERE conversation_id = ?1 AND sender_id = ?2 AND seen = 0",
                [conversation_id, other.as_str()],
            )?;
            tx.execute(
                "UPDATE conversations SET last_message_seen = 1
                 WHERE id = ?1 AND last_message_sender = ?2",
                [conversation_id, other.as_str()],
            )?;
            tx.commit()?;

            Ok(Some(SeenOutcome {
                other_participant: other,
                updated,
            }))
        })
    }
}

/// Conversations store their participants sorted so each pair has one row.
fn ordered_pair<'a>(x: &'a str, y: &'a str) -> (&'a str, &'a str) {
    if x <= y { (x, y) } else { (y, x) }
}

fn query_conversation_between(
    conn: &Connection,
    user_a: &str,
    user_b: &str,
) -> Result<Option<ConversationRow>> {
    let (a, b) = ordered_pair(user_a, user_b);
    let sql = format!(
        "SELECT {CONVERSATION_COLUMNS} FROM conversations
         WHERE participant_a = ?1 AND participant_b = ?2"
    );
    conn.query_row(&sql, [a, b], conversation_from_row).optional()
}

fn conversation_from_row(row: &Row<'_>) -> rusqlite::Result<ConversationRow> {
    Ok(ConversationRow {
        id: row.get(0)?,
        participant_a: row.get(1)?,
        participant_b: row.get(2)?,
        last_message_text: row.get(3)?,
        last_message_sender: row.get(4)?,
        last_message_seen: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::tests::seed_user;

    fn send(db: &Database, from: &str, to: &str, text: &str) -> (ConversationRow, MessageRow) {
        let id = uuid::Uuid::new_v4().to_string();
        db.send_message(&NewMessage {
            id: &id,
            sender_id: from,
            recipient_id: to,
            text,
        })
        .unwrap()
    }

    #[test]
    fn conversation_is_created_once_per_pair() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");

        let (first, _) = send(&db, &alice.id, &bob.id, "hi bob");
        let (second, reply) = send(&db, &bob.id, &alice.id, "hi alice");

        assert_eq!(first.id, second.id);
        assert!(second.has_participant(&alice.id) && second.has_participant(&bob.id));
        assert_eq!(second.last_message_text, "hi alice");
        assert_eq!(second.last_message_sender.as_deref(), Some(bob.id.as_str()));
        assert_eq!(reply.conversation_id, first.id);

        let between = db.get_conversation_between(&bob.id, &alice.id).unwrap().unwrap();
        assert_eq!(between.id, first.id);
    }

    #[test]
    fn history_in_insertion_order() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");

        let (conv, _) = send(&db, &alice.id, &bob.id, "one");
        send(&db, &bob.id, &alice.id, "two");
        send(&db, &alice.id, &bob.id, "three");

        let texts: Vec<String> = db
            .get_messages(&conv.id)
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
    }

    #[test]
    fn mark_seen_only_flips_other_participants_messages() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");
        let mallory = seed_user(&db, "mallory");

        let (conv, _) = send(&db, &alice.id, &bob.id, "a1");
        send(&db, &alice.id, &bob.id, "a2");
        send(&db, &bob.id, &alice.id, "b1");
        send(&db, &alice.id, &bob.id, "a3");

        assert!(db.mark_conversation_seen(&conv.id, &mallory.id).unwrap().is_none());
        assert!(db.mark_conversation_seen("missing", &bob.id).unwrap().is_none());

        let outcome = db.mark_conversation_seen(&conv.id, &bob.id).unwrap().unwrap();
        assert_eq!(outcome.other_participant, alice.id);
        assert_eq!(outcome.updated, 3);

        for m in db.get_messages(&conv.id).unwrap() {
            assert_eq!(m.seen, m.sender_id == alice.id, "message {}", m.text);
        }
        assert!(db.get_conversation(&conv.id).unwrap().unwrap().last_message_seen);

        let again = db.mark_conversation_seen(&conv.id, &bob.id).unwrap().unwrap();
        assert_eq!(again.updated, 0);
    }

    #[test]
    fn new_message_resets_last_seen() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");

        let (conv, _) = send(&db, &alice.id, &bob.id, "hi");
        db.mark_conversation_seen(&conv.id, &bob.id).unwrap();
        let (conv, _) = send(&db, &alice.id, &bob.id, "still there?");
        assert!(!conv.last_message_seen);
    }

    #[test]
    fn lists_conversations_with_other_participant() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");
        let carol = seed_user(&db, "carol");

        send(&db, &alice.id, &bob.id, "to bob");
        send(&db, &carol.id, &alice.id, "from carol");

        let list = db.list_conversations(&alice.id).unwrap();
        let others: Vec<&str> = list.iter().map(|c| c.other_username.as_str()).collect();
        assert_eq!(others, vec!["carol", "bob"]);
        assert_eq!(list[0].other_id, carol.id);

        assert_eq!(db.list_conversations(&bob.id).unwrap().len(), 1);
    }
}
