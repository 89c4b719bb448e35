//! rusty-forum/crates/rf-core/src/lib.rs
//!
//! Domain models, storage ports and the content query engine for Rusty-Forum:
//! vote aggregation, comment trees and tiered cross-entity search.

pub mod models;
pub mod traits;
pub mod error;
pub mod votes;
pub mod thread;
pub mod ranking;
pub mod search;
pub mod engine;

// Re-exporting for easier access in other crates
pub use models::*;
pub use traits::*;
pub use error::*;
pub use engine::QueryEngine;

#[cfg(test)]
mod tests {
    use super::models::*;

    #[test]
    fn test_tallied_post_serializes_flat() {
        let now = chrono::Utc::now();
        let post = Tallied::new(
            Post {
                id: 1,
                board_id: 2,
                title: "Hello Rust!".to_string(),
                content: "first".to_string(),
                author_id: 3,
                image_url: None,
                link_url: None,
                created_at: now,
                updated_at: now,
            },
            VoteTally::new(4, 1),
        );

        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["title"], "Hello Rust!");
        assert_eq!(json["likes"], 4);
        assert_eq!(json["dislikes"], 1);
        assert!(json.get("image_url").is_none());
    }

    #[test]
    fn test_vote_value_rejects_zero() {
        assert!(VoteValue::try_from(0_i64).is_err());
        assert_eq!(VoteValue::try_from(-1_i64), Ok(VoteValue::Down));
        assert_eq!(i64::from(VoteValue::Up), 1);
    }

    #[test]
    fn test_vote_target_kind_parses() {
        assert_eq!("comment".parse::<VoteTargetKind>(), Ok(VoteTargetKind::Comment));
        assert!("thread".parse::<VoteTargetKind>().is_err());
        assert_eq!(VoteTargetKind::Post.target(9), VoteTarget::Post(9));
    }

    #[test]
    fn test_comment_node_walk_is_preorder() {
        let now = chrono::Utc::now();
        let leaf = |id| CommentNode {
            comment: Comment {
                id,
                post_id: 1,
                author_id: 1,
                content: String::new(),
                image_data: Some(vec![1, 2, 3]),
                created_at: now,
                updated_at: now,
                parent_id: None,
            },
            votes: VoteTally::default(),
            replies: vec![],
        };
        let mut root = leaf(1);
        let mut middle = leaf(2);
        middle.replies.push(leaf(3));
        root.replies.push(middle);
        root.replies.push(leaf(4));

        let order: Vec<CommentId> = root.walk().iter().map(|n| n.comment.id).collect();
        assert_eq!(order, vec![1, 2, 3, 4]);
        assert_eq!(root.len(), 4);

        let json = serde_json::to_value(&root).unwrap();
        assert!(json.get("image_data").is_none());
        assert_eq!(json["replies"][0]["replies"][0]["id"], 3);
    }
}
