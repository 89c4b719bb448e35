//! Shared fixtures: a small forum seeded into the in-memory store.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rf_core::models::{Board, Club, Comment, CommentId, Post, PostId};
use rf_store_memory::MemoryStore;

pub fn at(minute: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 14, 9, 0, 0).unwrap() + Duration::minutes(minute)
}

pub fn board(id: i64, slug: &str, title: &str, description: &str) -> Board {
    Board {
        id,
        slug: slug.into(),
        title: title.into(),
        description: description.into(),
        club_id: None,
    }
}

pub fn club(id: i64, name: &str, topic: &str, description: &str) -> Club {
    Club {
        id,
        name: name.into(),
        topic: topic.into(),
        description: description.into(),
        image_data: None,
    }
}

pub fn post(id: PostId, title: &str, content: &str, minute: i64) -> Post {
    Post {
        id,
        board_id: 1,
        title: title.into(),
        content: content.into(),
        author_id: 1,
        image_url: None,
        link_url: None,
        created_at: at(minute),
        updated_at: at(minute),
    }
}

pub fn comment(id: CommentId, post_id: PostId, parent_id: Option<CommentId>, minute: i64) -> Comment {
    Comment {
        id,
        post_id,
        author_id: 2,
        content: format!("comment {id}"),
        image_data: None,
        created_at: at(minute),
        updated_at: at(minute),
        parent_id,
    }
}

/// Boards, clubs and two posts about Go. Post 1 carries a small thread:
///
/// ```text
/// 1 (t=10)
/// ├── 2 (t=11)
/// └── 4 (t=12)
/// 3 (t=10)   <- same instant as 1, higher id
/// ```
pub fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());

    store.insert_board(board(1, "golang", "Go", "all things gopher"));
    store.insert_board(board(2, "rust", "Rust", "fearless concurrency, go figure"));
    store.insert_club(club(1, "Gophers", "golang", "weekly meetups"));

    store.insert_post(post(1, "Go Basics", "variables and loops", 0));
    store.insert_post(post(2, "Learning Go Basics", "a longer tour", 5));
    store.insert_post(post(3, "Rust ownership", "borrowing explained", 7));

    for c in [
        comment(1, 1, None, 10),
        comment(3, 1, None, 10),
        comment(2, 1, Some(1), 11),
        comment(4, 1, Some(1), 12),
    ] {
        store.insert_comment(c).unwrap();
    }
    store
}

/// Ids in the order a reader sees them.
pub fn reading_order(roots: &[rf_core::models::CommentNode]) -> Vec<CommentId> {
    rf_core::models::flatten_tree(roots)
        .into_iter()
        .map(|n| n.comment.id)
        .collect()
}
