//! # rf-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `rf-core` domain models.
//!
//! Searches push a `LIKE '%q%'` predicate down to SQLite. SQLite's `LIKE` only
//! folds ASCII case, so for a query with any non-ASCII character the filter
//! would miss matches like "Шахматы" for "шахматы"; those queries fetch the
//! whole table and leave the filtering to the ranker.

use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use rf_core::models::{
    Board, Club, Comment, CommentId, Post, PostId, UserId, VoteEvent, VoteTarget, VoteValue,
};
use rf_core::traits::{ContentRepo, VoteStore};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS clubs (
        id          INTEGER PRIMARY KEY,
        name        TEXT NOT NULL,
        topic       TEXT NOT NULL DEFAULT '',
        description TEXT NOT NULL DEFAULT '',
        image_data  BLOB
    )",
    "CREATE TABLE IF NOT EXISTS boards (
        id          INTEGER PRIMARY KEY,
        slug        TEXT NOT NULL UNIQUE,
        title       TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        club_id     INTEGER REFERENCES clubs(id)
    )",
    "CREATE TABLE IF NOT EXISTS posts (
        id          INTEGER PRIMARY KEY,
        board_id    INTEGER NOT NULL REFERENCES boards(id),
        title       TEXT NOT NULL,
        content     TEXT NOT NULL,
        author_id   INTEGER NOT NULL,
        image_url   TEXT,
        link_url    TEXT,
        created_at  TEXT NOT NULL,
        updated_at  TEXT NOT NULL
    )",
    // parent_id has no foreign key: deleting a comment leaves its replies in place.
    "CREATE TABLE IF NOT EXISTS comments (
        id          INTEGER PRIMARY KEY,
        post_id     INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
        author_id   INTEGER NOT NULL,
        content     TEXT NOT NULL,
        image_data  BLOB,
        created_at  TEXT NOT NULL,
        updated_at  TEXT NOT NULL,
        parent_id   INTEGER
    )",
    "CREATE INDEX IF NOT EXISTS comments_post_id ON comments (post_id)",
    // One live vote per voter per target.
    "CREATE TABLE IF NOT EXISTS votes (
        voter_id    INTEGER NOT NULL,
        target_kind TEXT NOT NULL CHECK (target_kind IN ('post', 'comment')),
        target_id   INTEGER NOT NULL,
        value       INTEGER NOT NULL CHECK (value IN (1, -1)),
        cast_at     TEXT NOT NULL,
        PRIMARY KEY (voter_id, target_kind, target_id)
    )",
    "CREATE INDEX IF NOT EXISTS votes_target ON votes (target_kind, target_id)",
];

const SEARCH_POSTS: &str = "SELECT id, board_id, title, content, author_id, image_url, link_url, created_at, updated_at
     FROM posts
     WHERE title LIKE ? ESCAPE '\\' OR content LIKE ? ESCAPE '\\'";
const ALL_POSTS: &str =
    "SELECT id, board_id, title, content, author_id, image_url, link_url, created_at, updated_at FROM posts";

const SEARCH_BOARDS: &str = "SELECT id, slug, title, description, club_id
     FROM boards
     WHERE title LIKE ? ESCAPE '\\' OR slug LIKE ? ESCAPE '\\' OR description LIKE ? ESCAPE '\\'";
const ALL_BOARDS: &str = "SELECT id, slug, title, description, club_id FROM boards";

const SEARCH_CLUBS: &str = "SELECT id, name, topic, description, image_data
     FROM clubs
     WHERE name LIKE ? ESCAPE '\\' OR topic LIKE ? ESCAPE '\\' OR description LIKE ? ESCAPE '\\'";
const ALL_CLUBS: &str = "SELECT id, name, topic, description, image_data FROM clubs";

pub struct SqliteContentStore {
    pool: SqlitePool,
}

impl SqliteContentStore {
    /// Connects (creating the database file if needed) and bootstraps the schema.
    ///
    /// `sqlite::memory:` gets a single, never-recycled connection, since every
    /// new connection would otherwise open a fresh empty database.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("invalid database url {url}"))?
            .create_if_missing(true);

        let pool_options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(8)
        };
        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("connecting to {url}"))?;

        let store = Self { pool };
        store.bootstrap().await?;
        log::info!("sqlite store ready at {url}");
        Ok(store)
    }

    async fn bootstrap(&self) -> anyhow::Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("bootstrapping schema")?;
        }
        Ok(())
    }

    pub async fn insert_club(&self, club: &Club) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO clubs (id, name, topic, description, image_data) VALUES (?, ?, ?, ?, ?)")
            .bind(club.id)
            .bind(&club.name)
            .bind(&club.topic)
            .bind(&club.description)
            .bind(&club.image_data)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn insert_board(&self, board: &Board) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO boards (id, slug, title, description, club_id) VALUES (?, ?, ?, ?, ?)")
            .bind(board.id)
            .bind(&board.slug)
            .bind(&board.title)
            .bind(&board.description)
            .bind(board.club_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn insert_post(&self, post: &Post) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO posts (id, board_id, title, content, author_id, image_url, link_url, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)")
            .bind(post.id)
            .bind(post.board_id)
            .bind(&post.title)
            .bind(&post.content)
            .bind(post.author_id)
            .bind(&post.image_url)
            .bind(&post.link_url)
            .bind(post.created_at)
            .bind(post.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Inserts a comment. A reply must point at an existing comment of the
    /// same post; parent links are never rewritten afterwards, so they stay
    /// acyclic.
    pub async fn insert_comment(&self, comment: &Comment) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        if let Some(parent_id) = comment.parent_id {
            let parent_post = sqlx::query_scalar::<_, i64>("SELECT post_id FROM comments WHERE id = ?")
                .bind(parent_id)
                .fetch_optional(&mut *tx)
                .await?;
            match parent_post {
                None => anyhow::bail!("parent comment {parent_id} does not exist"),
                Some(post_id) if post_id != comment.post_id => anyhow::bail!(
                    "parent comment {parent_id} belongs to post {post_id}, not {}",
                    comment.post_id
                ),
                Some(_) => {}
            }
        }

        sqlx::query("INSERT INTO comments (id, post_id, author_id, content, image_data, created_at, updated_at, parent_id) VALUES (?, ?, ?, ?, ?, ?, ?, ?)")
            .bind(comment.id)
            .bind(comment.post_id)
            .bind(comment.author_id)
            .bind(&comment.content)
            .bind(&comment.image_data)
            .bind(comment.created_at)
            .bind(comment.updated_at)
            .bind(comment.parent_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Deletes one comment. Its replies stay and become orphans.
    pub async fn delete_comment(&self, id: CommentId) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Records a vote, replacing the voter's earlier vote on the same target.
    pub async fn cast_vote(&self, voter_id: UserId, target: VoteTarget, value: VoteValue) -> anyhow::Result<VoteEvent> {
        let event = VoteEvent {
            voter_id,
            target,
            value,
            cast_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO votes (voter_id, target_kind, target_id, value, cast_at) VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (voter_id, target_kind, target_id)
             DO UPDATE SET value = excluded.value, cast_at = excluded.cast_at",
        )
        .bind(voter_id)
        .bind(target.kind().as_str())
        .bind(target.id())
        .bind(i64::from(value))
        .bind(event.cast_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("casting vote on {target}"))?;

        Ok(event)
    }

    pub async fn retract_vote(&self, voter_id: UserId, target: VoteTarget) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM votes WHERE voter_id = ? AND target_kind = ? AND target_id = ?")
            .bind(voter_id)
            .bind(target.kind().as_str())
            .bind(target.id())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// `%query%` with LIKE wildcards escaped, or `None` when SQLite could not
/// match it case-insensitively.
///
/// Two non-ASCII characters lowercase to ASCII: KELVIN SIGN to `k` and
/// LATIN CAPITAL I WITH DOT to `i` plus a combining dot. `LIKE` would miss
/// them, so `k` and `i` become the single-character wildcard `_`. The result
/// may over-match; the ranker drops the extras.
fn like_pattern(query: &str) -> Option<String> {
    if !query.is_ascii() {
        return None;
    }
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for ch in query.chars() {
        match ch {
            '\\' | '%' | '_' => {
                pattern.push('\\');
                pattern.push(ch);
            }
            'k' | 'K' | 'i' | 'I' => pattern.push('_'),
            _ => pattern.push(ch),
        }
    }
    pattern.push('%');
    Some(pattern)
}

fn post_from_row(row: &SqliteRow) -> Result<Post, sqlx::Error> {
    Ok(Post {
        id: row.try_get("id")?,
        board_id: row.try_get("board_id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        author_id: row.try_get("author_id")?,
        image_url: row.try_get("image_url")?,
        link_url: row.try_get("link_url")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn board_from_row(row: &SqliteRow) -> Result<Board, sqlx::Error> {
    Ok(Board {
        id: row.try_get("id")?,
        slug: row.try_get("slug")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        club_id: row.try_get("club_id")?,
    })
}

fn club_from_row(row: &SqliteRow) -> Result<Club, sqlx::Error> {
    Ok(Club {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        topic: row.try_get("topic")?,
        description: row.try_get("description")?,
        image_data: row.try_get("image_data")?,
    })
}

fn comment_from_row(row: &SqliteRow) -> Result<Comment, sqlx::Error> {
    Ok(Comment {
        id: row.try_get("id")?,
        post_id: row.try_get("post_id")?,
        author_id: row.try_get("author_id")?,
        content: row.try_get("content")?,
        image_data: row.try_get("image_data")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        parent_id: row.try_get("parent_id")?,
    })
}

#[async_trait]
impl ContentRepo for SqliteContentStore {
    async fn search_posts(&self, query: &str) -> anyhow::Result<Vec<Post>> {
        let rows = match like_pattern(query) {
            Some(pattern) => {
                sqlx::query(SEARCH_POSTS)
                    .bind(pattern.as_str())
                    .bind(pattern.as_str())
                    .fetch_all(&self.pool)
                    .await
            }
            None => sqlx::query(ALL_POSTS).fetch_all(&self.pool).await,
        }
        .context("searching posts")?;

        Ok(rows.iter().map(post_from_row).collect::<Result<Vec<_>, _>>()?)
    }

    async fn search_boards(&self, query: &str) -> anyhow::Result<Vec<Board>> {
        let rows = match like_pattern(query) {
            Some(pattern) => {
                sqlx::query(SEARCH_BOARDS)
                    .bind(pattern.as_str())
                    .bind(pattern.as_str())
                    .bind(pattern.as_str())
                    .fetch_all(&self.pool)
                    .await
            }
            None => sqlx::query(ALL_BOARDS).fetch_all(&self.pool).await,
        }
        .context("searching boards")?;

        Ok(rows.iter().map(board_from_row).collect::<Result<Vec<_>, _>>()?)
    }

    async fn search_clubs(&self, query: &str) -> anyhow::Result<Vec<Club>> {
        let rows = match like_pattern(query) {
            Some(pattern) => {
                sqlx::query(SEARCH_CLUBS)
                    .bind(pattern.as_str())
                    .bind(pattern.as_str())
                    .bind(pattern.as_str())
                    .fetch_all(&self.pool)
                    .await
            }
            None => sqlx::query(ALL_CLUBS).fetch_all(&self.pool).await,
        }
        .context("searching clubs")?;

        Ok(rows.iter().map(club_from_row).collect::<Result<Vec<_>, _>>()?)
    }

    async fn get_post(&self, id: PostId) -> anyhow::Result<Option<Post>> {
        let row = sqlx::query(
            "SELECT id, board_id, title, content, author_id, image_url, link_url, created_at, updated_at FROM posts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(post_from_row).transpose()?)
    }

    async fn comments_for_post(&self, post_id: PostId) -> anyhow::Result<Vec<Comment>> {
        let rows = sqlx::query(
            "SELECT id, post_id, author_id, content, image_data, created_at, updated_at, parent_id FROM comments WHERE post_id = ?",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(comment_from_row).collect::<Result<Vec<_>, _>>()?)
    }
}

#[async_trait]
impl VoteStore for SqliteContentStore {
    async fn votes_for_target(&self, target: VoteTarget) -> anyhow::Result<Vec<VoteEvent>> {
        let rows = sqlx::query("SELECT voter_id, value, cast_at FROM votes WHERE target_kind = ? AND target_id = ?")
            .bind(target.kind().as_str())
            .bind(target.id())
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> anyhow::Result<VoteEvent> {
                let raw: i64 = row.try_get("value")?;
                Ok(VoteEvent {
                    voter_id: row.try_get("voter_id")?,
                    target,
                    value: VoteValue::try_from(raw)?,
                    cast_at: row.try_get("cast_at")?,
                })
            })
            .collect()
    }
}
