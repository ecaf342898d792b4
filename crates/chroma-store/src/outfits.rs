//! Saved and published outfits.
//!
//! An outfit holds weak references to its items (ids, not records); the
//! full items are joined back in at read time by hydration. Publication
//! is a one-way flag flip that puts the outfit into the community feed.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::engine::{ObjectStore, SAVED_OUTFITS};
use crate::error::{StoreError, StoreResult};

/// A saved outfit. `item_ids` is ordered and weakly referenced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outfit {
    /// Unique identifier (UUID v7) — also the creation-order key.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    pub name: String,
    pub occasion: String,
    /// Styling explanation supplied by the generation client.
    pub explanation: String,
    /// Ordered references to wardrobe items, by id.
    pub item_ids: Vec<String>,
    /// Whether the outfit appears in the community feed.
    #[serde(default)]
    pub is_public: bool,
    /// User ids that have liked this outfit. Set semantics.
    #[serde(default)]
    pub likes: Vec<String>,
    /// Unix timestamp when the outfit was saved.
    pub created_at: i64,
}

/// A generated outfit from the AI client, not yet persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOutfit {
    pub name: String,
    pub occasion: String,
    pub item_ids: Vec<String>,
    pub explanation: String,
}

/// CRUD operations on saved outfits.
#[derive(Clone)]
pub struct OutfitStore {
    store: ObjectStore,
}

impl OutfitStore {
    pub fn new(store: ObjectStore) -> Self {
        Self { store }
    }

    /// Persist a new outfit for `user_id`, private and unliked.
    ///
    /// Item ownership is validated by the caller before this point —
    /// the repository itself does no cross-entity reads.
    #[instrument(skip(self, new_outfit))]
    pub async fn add(&self, user_id: &str, new_outfit: NewOutfit) -> StoreResult<Outfit> {
        if new_outfit.name.is_empty() {
            return Err(StoreError::Validation("outfit name must not be empty".into()));
        }

        let outfit = Outfit {
            id: Uuid::now_v7().to_string(),
            user_id: user_id.to_string(),
            name: new_outfit.name,
            occasion: new_outfit.occasion,
            explanation: new_outfit.explanation,
            item_ids: new_outfit.item_ids,
            is_public: false,
            likes: Vec::new(),
            created_at: Utc::now().timestamp(),
        };
        self.store.add(&SAVED_OUTFITS, &outfit.id, &outfit).await?;
        debug!(outfit_id = %outfit.id, "outfit saved");
        Ok(outfit)
    }

    /// Fetch a single outfit, returning `None` if not found.
    pub async fn get(&self, id: &str) -> StoreResult<Option<Outfit>> {
        self.store.get(&SAVED_OUTFITS, id).await
    }

    /// Fetch a single outfit, failing with [`StoreError::NotFound`].
    pub async fn get_required(&self, id: &str) -> StoreResult<Outfit> {
        self.get(id).await?.ok_or_else(|| StoreError::NotFound {
            entity: "saved_outfits",
            id: id.to_string(),
        })
    }

    /// Every saved outfit, in insertion order.
    pub async fn get_all(&self) -> StoreResult<Vec<Outfit>> {
        self.store.get_all(&SAVED_OUTFITS).await
    }

    /// Every outfit saved by `user_id`.
    pub async fn get_by_owner(&self, user_id: &str) -> StoreResult<Vec<Outfit>> {
        self.store
            .get_all_by_index(&SAVED_OUTFITS, "user_id", user_id)
            .await
    }

    /// Every published outfit, feed candidates.
    pub async fn get_public(&self) -> StoreResult<Vec<Outfit>> {
        self.store
            .get_all_by_index(&SAVED_OUTFITS, "is_public", true)
            .await
    }

    /// Rename an outfit.
    #[instrument(skip(self))]
    pub async fn rename(&self, id: &str, name: &str) -> StoreResult<Outfit> {
        if name.is_empty() {
            return Err(StoreError::Validation("outfit name must not be empty".into()));
        }
        let name = name.to_string();
        self.store
            .modify::<Outfit, _>(&SAVED_OUTFITS, id, move |outfit| outfit.name = name)
            .await
    }

    /// Set the publication flag, placing the outfit in the community feed.
    #[instrument(skip(self))]
    pub async fn publish(&self, id: &str) -> StoreResult<Outfit> {
        self.store
            .modify::<Outfit, _>(&SAVED_OUTFITS, id, |outfit| outfit.is_public = true)
            .await
    }

    /// Delete an outfit.
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        self.store.delete(&SAVED_OUTFITS, id).await
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn setup_store() -> OutfitStore {
        let db = Database::open_in_memory().unwrap();
        db.run_migrations().await.unwrap();
        OutfitStore::new(ObjectStore::new(db))
    }

    fn new_outfit(name: &str) -> NewOutfit {
        NewOutfit {
            name: name.to_string(),
            occasion: "Casual".to_string(),
            item_ids: vec!["i1".to_string(), "i2".to_string()],
            explanation: "Goes well together.".to_string(),
        }
    }

    #[tokio::test]
    async fn add_starts_private_and_unliked() {
        let store = setup_store().await;
        let outfit = store.add("u1", new_outfit("Weekend")).await.unwrap();

        assert!(!outfit.is_public);
        assert!(outfit.likes.is_empty());
        assert_eq!(outfit.item_ids.len(), 2);

        let fetched = store.get(&outfit.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Weekend");
    }

    #[tokio::test]
    async fn empty_name_rejected() {
        let store = setup_store().await;
        let result = store.add("u1", new_outfit("")).await;
        assert!(matches!(result, Err(StoreError::Validation(_))));
    }

    #[tokio::test]
    async fn rename_outfit() {
        let store = setup_store().await;
        let outfit = store.add("u1", new_outfit("Old Name")).await.unwrap();

        let renamed = store.rename(&outfit.id, "New Name").await.unwrap();
        assert_eq!(renamed.name, "New Name");

        let fetched = store.get(&outfit.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "New Name");
    }

    #[tokio::test]
    async fn publish_flips_flag_once() {
        let store = setup_store().await;
        let outfit = store.add("u1", new_outfit("Party")).await.unwrap();

        assert!(store.get_public().await.unwrap().is_empty());

        let published = store.publish(&outfit.id).await.unwrap();
        assert!(published.is_public);

        // Publishing again is a no-op.
        let again = store.publish(&outfit.id).await.unwrap();
        assert!(again.is_public);

        assert_eq!(store.get_public().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_by_owner_filters() {
        let store = setup_store().await;
        store.add("u1", new_outfit("A")).await.unwrap();
        store.add("u2", new_outfit("B")).await.unwrap();

        let owned = store.get_by_owner("u1").await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].name, "A");
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let store = setup_store().await;
        let result = store.delete("ghost").await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }
}
