use anyhow::Result;
use rusqlite::{Connection, Row};

use crate::models::{LoginRecord, NewUser, UserChanges, UserRow};
use crate::{Database, OptionalExt, now_timestamp};

const USER_COLUMNS: &str =
    "id, name, username, email, password, bio, profile_pic, signup_ip, created_at, updated_at";

impl Database {
    // -- Users --

    pub fn create_user(&self, user: &NewUser<'_>) -> Result<UserRow> {
        let now = now_timestamp();
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, username, email, password, signup_ip, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                rusqlite::params![
                    user.id,
                    user.name,
                    user.username,
                    user.email,
                    user.password_hash,
                    user.signup_ip,
                    now,
                ],
            )?;
            query_user(conn, "id = ?1", user.id)?
                .ok_or_else(|| anyhow::anyhow!("User vanished after insert: {}", user.id))
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username = ?1", username))
    }

    /// Look up a login by username or email; either may be absent.
    pub fn find_user_by_username_or_email(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM users WHERE username = ?1 OR email = ?2 LIMIT 1"
            );
            conn.query_row(&sql, rusqlite::params![username, email], user_from_row)
                .optional()
        })
    }

    /// Another user already holding `username` or `email`.
    pub fn find_conflicting_user(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        exclude_id: &str,
    ) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM users
                 WHERE (username = ?1 OR email = ?2) AND id != ?3
                 LIMIT 1"
            );
            conn.query_row(&sql, rusqlite::params![username, email, exclude_id], user_from_row)
                .optional()
        })
    }

    /// Apply profile edits and refresh the reply snapshots of this user in
    /// one transaction. Returns the updated row, or `None` if the user does
    /// not exist.
    pub fn update_user(&self, id: &str, changes: &UserChanges) -> Result<Option<UserRow>> {
        let now = now_timestamp();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let updated = tx.execute(
                "UPDATE users SET
                    name        = COALESCE(?2, name),
                    email       = COALESCE(?3, email),
                    username    = COALESCE(?4, username),
                    password    = COALESCE(?5, password),
                    bio         = COALESCE(?6, bio),
                    profile_pic = COALESCE(?7, profile_pic),
                    updated_at  = ?8
                 WHERE id = ?1",
                rusqlite::params![
                    id,
                    changes.name,
                    changes.email,
                    changes.username,
                    changes.password_hash,
                    changes.bio,
                    changes.profile_pic,
                    now,
                ],
            )?;
            if updated == 0 {
                return Ok(None);
            }

            tx.execute(
                "UPDATE replies SET
                    username         = (SELECT username FROM users WHERE id = ?1),
                    user_profile_pic = (SELECT profile_pic FROM users WHERE id = ?1)
                 WHERE user_id = ?1",
                [id],
            )?;

            let row = query_user(&tx, "id = ?1", id)?;
            tx.commit()?;
            Ok(row)
        })
    }

    // -- Follows --

    /// Users following `user_id`, oldest edge first.
    pub fn get_followers(&self, user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT follower_id FROM follows WHERE followee_id = ?1 ORDER BY rowid",
            )?;
            let ids = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(ids)
        })
    }

    /// Users `user_id` follows, oldest edge first.
    pub fn get_following(&self, user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT followee_id FROM follows WHERE follower_id = ?1 ORDER BY rowid",
            )?;
            let ids = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(ids)
        })
    }

    pub fn is_following(&self, follower_id: &str, followee_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
                    [follower_id, followee_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Toggle a follow edge: removes it if present, inserts it if not.
    /// Returns true when the follower now follows the followee.
    pub fn toggle_follow(&self, follower_id: &str, followee_id: &str) -> Result<bool> {
        let now = now_timestamp();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let removed = tx.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
                [follower_id, followee_id],
            )?;
            if removed == 0 {
                tx.execute(
                    "INSERT INTO follows (follower_id, followee_id, created_at) VALUES (?1, ?2, ?3)",
                    [follower_id, followee_id, now.as_str()],
                )?;
            }
            tx.commit()?;
            Ok(removed == 0)
        })
    }

    // -- Logins --

    pub fn insert_login(&self, record: &LoginRecord<'_>) -> Result<()> {
        let now = now_timestamp();
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO logins (id, user_id, ip, browser, os, device, location, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    record.id,
                    record.user_id,
                    record.ip,
                    record.browser,
                    record.os,
                    record.device,
                    record.location,
                    now,
                ],
            )?;
            Ok(())
        })
    }

    pub fn count_logins(&self, user_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM logins WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(n as usize)
        })
    }
}

fn query_user(conn: &Connection, predicate: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {predicate}");
    conn.query_row(&sql, [value], user_from_row).optional()
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        username: row.get(2)?,
        email: row.get(3)?,
        password: row.get(4)?,
        bio: row.get(5)?,
        profile_pic: row.get(6)?,
        signup_ip: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}
