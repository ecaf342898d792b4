//! Like and collect toggles.
//!
//! Both are idempotent membership flips over a set-valued field: liking
//! twice returns the like-set to its original contents, as does
//! collecting twice. Each flip runs its read-modify-write inside one
//! transaction via [`ObjectStore::modify`], so two back-to-back toggles
//! against the same record serialize instead of overwriting each other.

use tracing::instrument;

use crate::engine::{ObjectStore, SAVED_OUTFITS, USERS};
use crate::error::StoreResult;
use crate::outfits::Outfit;
use crate::users::User;

/// Flip `member` in or out of `set`, preserving set semantics.
fn toggle_membership(set: &mut Vec<String>, member: &str) {
    if let Some(pos) = set.iter().position(|m| m == member) {
        set.remove(pos);
    } else {
        set.push(member.to_string());
    }
}

/// Idempotent like/collect toggles.
#[derive(Clone)]
pub struct EngagementService {
    store: ObjectStore,
}

impl EngagementService {
    pub fn new(store: ObjectStore) -> Self {
        Self { store }
    }

    /// Flip `user_id`'s membership in the outfit's like-set and return
    /// the updated outfit.
    #[instrument(skip(self))]
    pub async fn toggle_like(&self, outfit_id: &str, user_id: &str) -> StoreResult<Outfit> {
        let user_id = user_id.to_string();
        self.store
            .modify::<Outfit, _>(&SAVED_OUTFITS, outfit_id, move |outfit| {
                toggle_membership(&mut outfit.likes, &user_id);
            })
            .await
    }

    /// Flip `outfit_id`'s membership in the user's collected list and
    /// return the updated user.
    #[instrument(skip(self))]
    pub async fn toggle_collect(&self, outfit_id: &str, user_id: &str) -> StoreResult<User> {
        let outfit_id = outfit_id.to_string();
        self.store
            .modify::<User, _>(&USERS, user_id, move |user| {
                toggle_membership(&mut user.collected_outfit_ids, &outfit_id);
            })
            .await
    }
}

// ── tests ────────────────────────────────────────────────────────────
