use anyhow::Result;
use rusqlite::{Connection, Row};

use crate::models::{LikeRow, NewReply, PostRow, ReplyRow};
use crate::{Database, OptionalExt, now_timestamp, placeholders};

const POST_COLUMNS: &str = "id, author_id, text, img, created_at, updated_at";

impl Database {
    // -- Posts --

    pub fn create_post(
        &self,
        id: &str,
        author_id: &str,
        text: &str,
        img: Option<&str>,
    ) -> Result<PostRow> {
        let now = now_timestamp();
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO posts (id, author_id, text, img, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                rusqlite::params![id, author_id, text, img, now],
            )?;
            Ok(PostRow {
                id: id.to_string(),
                author_id: author_id.to_string(),
                text: text.to_string(),
                img: img.map(str::to_string),
                created_at: now.clone(),
                updated_at: now,
            })
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1");
            conn.query_row(&sql, [id], post_from_row).optional()
        })
    }

    /// Delete a post together with its likes and replies.
    pub fn delete_post(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let removed = conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            Ok(removed > 0)
        })
    }

    /// A user's posts, newest first.
    pub fn get_posts_by_author(&self, author_id: &str) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            query_posts(
                conn,
                "author_id = ?1 ORDER BY created_at DESC, rowid DESC",
                author_id,
            )
        })
    }

    /// Posts by followed authors (newest first), then every other post
    /// (newest first). The segments are concatenated, not interleaved.
    pub fn get_feed(&self, user_id: &str) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut feed = query_posts(
                conn,
                "author_id IN (SELECT followee_id FROM follows WHERE follower_id = ?1)
                 ORDER BY created_at DESC, rowid DESC",
                user_id,
            )?;
            let others = query_posts(
                conn,
                "author_id NOT IN (SELECT followee_id FROM follows WHERE follower_id = ?1)
                 ORDER BY created_at DESC, rowid DESC",
                user_id,
            )?;
            feed.extend(others);
            Ok(feed)
        })
    }

    // -- Likes --

    /// Toggle a like: removes it if present, inserts it if not.
    /// Returns true when the post is now liked by the user.
    pub fn toggle_like(&self, post_id: &str, user_id: &str) -> Result<bool> {
        let now = now_timestamp();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let removed = tx.execute(
                "DELETE FROM post_likes WHERE post_id = ?1 AND user_id = ?2",
                [post_id, user_id],
            )?;
            if removed == 0 {
                tx.execute(
                    "INSERT INTO post_likes (post_id, user_id, created_at) VALUES (?1, ?2, ?3)",
                    [post_id, user_id, now.as_str()],
                )?;
            }
            tx.commit()?;
            Ok(removed == 0)
        })
    }

    /// Batch-fetch likes for a set of post IDs, oldest first.
    pub fn get_likes_for_posts(&self, post_ids: &[String]) -> Result<Vec<LikeRow>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT post_id, user_id FROM post_likes WHERE post_id IN ({}) ORDER BY rowid",
                placeholders(post_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(post_ids), |row| {
                    Ok(LikeRow {
                        post_id: row.get(0)?,
                        user_id: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Replies --

    pub fn add_reply(&self, reply: &NewReply<'_>) -> Result<ReplyRow> {
        let now = now_timestamp();
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO replies (id, post_id, user_id, text, username, user_profile_pic, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    reply.id,
                    reply.post_id,
                    reply.user_id,
                    reply.text,
                    reply.username,
                    reply.user_profile_pic,
                    now,
                ],
            )?;
            Ok(ReplyRow {
                id: reply.id.to_string(),
                post_id: reply.post_id.to_string(),
                user_id: reply.user_id.to_string(),
                text: reply.text.to_string(),
                username: reply.username.to_string(),
                user_profile_pic: reply.user_profile_pic.to_string(),
                created_at: now,
            })
        })
    }

    /// Batch-fetch replies for a set of post IDs in insertion order.
    pub fn get_replies_for_posts(&self, post_ids: &[String]) -> Result<Vec<ReplyRow>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT id, post_id, user_id, text, username, user_profile_pic, created_at
                 FROM replies WHERE post_id IN ({}) ORDER BY rowid",
                placeholders(post_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(post_ids), |row| {
                    Ok(ReplyRow {
                        id: row.get(0)?,
                        post_id: row.get(1)?,
                        user_id: row.get(2)?,
                        text: row.get(3)?,
                        username: row.get(4)?,
                        user_profile_pic: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_posts(conn: &Connection, clause: &str, value: &str) -> Result<Vec<PostRow>> {
    let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE {clause}");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([value], post_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        text: row.get(2)?,
        img: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}
