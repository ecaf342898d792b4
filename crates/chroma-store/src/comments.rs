//! Outfit comments.
//!
//! Append-only from the user-facing surface: comments are created on
//! post and never edited or deleted here.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::engine::{COMMENTS, ObjectStore};
use crate::error::{StoreError, StoreResult};

/// A comment on a published outfit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub outfit_id: String,
    /// Authoring user.
    pub user_id: String,
    pub text: String,
    /// Unix timestamp when the comment was posted.
    pub created_at: i64,
}

/// Operations on outfit comments.
#[derive(Clone)]
pub struct CommentStore {
    store: ObjectStore,
}

impl CommentStore {
    pub fn new(store: ObjectStore) -> Self {
        Self { store }
    }

    /// Post a comment.
    pub async fn add(&self, outfit_id: &str, user_id: &str, text: &str) -> StoreResult<Comment> {
        if text.trim().is_empty() {
            return Err(StoreError::Validation("comment text must not be empty".into()));
        }

        let comment = Comment {
            id: Uuid::now_v7().to_string(),
            outfit_id: outfit_id.to_string(),
            user_id: user_id.to_string(),
            text: text.to_string(),
            created_at: Utc::now().timestamp(),
        };
        self.store.add(&COMMENTS, &comment.id, &comment).await?;
        debug!(comment_id = %comment.id, outfit_id = %outfit_id, "comment posted");
        Ok(comment)
    }

    /// All comments on an outfit, oldest first.
    pub async fn get_by_outfit(&self, outfit_id: &str) -> StoreResult<Vec<Comment>> {
        let mut comments: Vec<Comment> = self
            .store
            .get_all_by_index(&COMMENTS, "outfit_id", outfit_id)
            .await?;
        comments.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(comments)
    }
}

// ── tests ────────────────────────────────────────────────────────────
