use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                username    TEXT NOT NULL UNIQUE,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                bio         TEXT NOT NULL DEFAULT '',
                profile_pic TEXT NOT NULL DEFAULT '',
                signup_ip   TEXT,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            -- One row per edge: both sides of the relationship read from it
            CREATE TABLE follows (
                follower_id TEXT NOT NULL REFERENCES users(id),
                followee_id TEXT NOT NULL REFERENCES users(id),
                created_at  TEXT NOT NULL,
                PRIMARY KEY (follower_id, followee_id)
            );

            CREATE INDEX idx_follows_followee ON follows(followee_id);

            CREATE TABLE posts (
                id          TEXT PRIMARY KEY,
                author_id   TEXT NOT NULL REFERENCES users(id),
                text        TEXT NOT NULL,
                img         TEXT,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX idx_posts_author ON posts(author_id, created_at);

            CREATE TABLE post_likes (
                post_id     TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id),
                created_at  TEXT NOT NULL,
                PRIMARY KEY (post_id, user_id)
            );

            CREATE TABLE replies (
                id               TEXT PRIMARY KEY,
                post_id          TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                user_id          TEXT NOT NULL REFERENCES users(id),
                text             TEXT NOT NULL,
                username         TEXT NOT NULL,
                user_profile_pic TEXT NOT NULL DEFAULT '',
                created_at       TEXT NOT NULL
            );

            CREATE INDEX idx_replies_post ON replies(post_id);
            CREATE INDEX idx_replies_user ON replies(user_id);

            -- participant_a < participant_b, so a pair maps to one row
            CREATE TABLE conversations (
                id                  TEXT PRIMARY KEY,
                participant_a       TEXT NOT NULL REFERENCES users(id),
                participant_b       TEXT NOT NULL REFERENCES users(id),
                last_message_text   TEXT NOT NULL DEFAULT '',
                last_message_sender TEXT,
                last_message_seen   INTEGER NOT NULL DEFAULT 0,
                created_at          TEXT NOT NULL,
                updated_at          TEXT NOT NULL,
                UNIQUE (participant_a, participant_b),
                CHECK (participant_a < participant_b)
            );

            CREATE TABLE messages (
                id              TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL REFERENCES conversations(id),
                sender_id       TEXT NOT NULL REFERENCES users(id),
                text            TEXT NOT NULL,
                seen            INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_messages_conversation
                ON messages(conversation_id, created_at);

            CREATE TABLE logins (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id),
                ip          TEXT,
                browser     TEXT,
                os          TEXT,
                device      TEXT,
                location    TEXT,
                created_at  TEXT NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);
            "
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
