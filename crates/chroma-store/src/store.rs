//! Wired store facade.
//!
//! [`ChromaStore`] opens the database, runs migrations, seeds the
//! administrative account on a fresh install, and hands out the typed
//! repositories and services over one shared engine handle. It also
//! composes the login flow (authenticate, streak bookkeeping, session
//! refresh) and the ownership check on outfit creation.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{info, instrument};

use crate::achievements::AchievementEngine;
use crate::comments::CommentStore;
use crate::db::Database;
use crate::engagement::EngagementService;
use crate::engine::ObjectStore;
use crate::error::{StoreError, StoreResult};
use crate::feed::FeedService;
use crate::hydrate::Hydrator;
use crate::items::ItemStore;
use crate::outfits::{NewOutfit, Outfit, OutfitStore};
use crate::recovery::RecoveryService;
use crate::session::SessionHolder;
use crate::users::{User, UserStore};

/// Store configuration, injected at open time.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Location of the SQLite file.
    pub path: PathBuf,
    /// Whether a fresh install seeds the administrative account.
    pub seed_admin: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("chroma.db"),
            seed_admin: true,
        }
    }
}

/// The assembled storage core.
#[derive(Clone)]
pub struct ChromaStore {
    pub users: UserStore,
    pub items: ItemStore,
    pub outfits: OutfitStore,
    pub comments: CommentStore,
    pub hydrator: Hydrator,
    pub feed: FeedService,
    pub engagement: EngagementService,
    pub recovery: RecoveryService,
    pub achievements: AchievementEngine,
    pub session: SessionHolder,
}

impl ChromaStore {
    /// Open the store at the configured path, migrating and seeding as
    /// needed.
    #[instrument(skip(config), fields(path = %config.path.display()))]
    pub async fn open(config: StoreConfig) -> StoreResult<Self> {
        let db = Database::open_and_migrate(config.path).await?;
        let store = Self::wire(db);
        if config.seed_admin && store.users.seed_admin_if_empty().await? {
            info!("fresh install initialized");
        }
        Ok(store)
    }

    /// In-memory store for tests; migrated and admin-seeded.
    pub async fn open_in_memory() -> StoreResult<Self> {
        let db = Database::open_in_memory()?;
        db.run_migrations().await?;
        let store = Self::wire(db);
        store.users.seed_admin_if_empty().await?;
        Ok(store)
    }

    fn wire(db: Database) -> Self {
        let engine = ObjectStore::new(db);
        let users = UserStore::new(engine.clone());
        let items = ItemStore::new(engine.clone());
        let outfits = OutfitStore::new(engine.clone());
        let comments = CommentStore::new(engine.clone());
        let hydrator = Hydrator::new(items.clone(), users.clone());
        let feed = FeedService::new(outfits.clone(), users.clone(), hydrator.clone());
        let engagement = EngagementService::new(engine.clone());
        let recovery = RecoveryService::new(users.clone());
        let achievements = AchievementEngine::new(users.clone());

        Self {
            users,
            items,
            outfits,
            comments,
            hydrator,
            feed,
            engagement,
            recovery,
            achievements,
            session: SessionHolder::new(),
        }
    }

    /// Authenticate and, on success, record the login and refresh the
    /// session slot. Returns `None` on bad credentials.
    pub async fn login(&self, email: &str, password: &str) -> StoreResult<Option<User>> {
        let Some(user) = self.users.authenticate(email, password).await? else {
            return Ok(None);
        };

        let user = self.users.record_login(&user.id).await?;
        self.session.set(user.clone());
        Ok(Some(user))
    }

    /// Clear the session slot.
    pub fn logout(&self) {
        self.session.clear();
    }

    /// Persist profile changes and refresh the session snapshot when it
    /// belongs to the same account.
    pub async fn update_profile(&self, user: User) -> StoreResult<User> {
        let user = self.users.update(user).await?;
        self.session.refresh(&user);
        Ok(user)
    }

    /// Save a new outfit after checking that every referenced item is
    /// owned by the author. Deleting items later does not re-trigger
    /// this check — hydration reports such references as missing.
    pub async fn save_outfit(&self, user_id: &str, new_outfit: NewOutfit) -> StoreResult<Outfit> {
        let owned = self.items.get_by_owner(user_id).await?;
        for item_id in &new_outfit.item_ids {
            if !owned.iter().any(|item| &item.id == item_id) {
                return Err(StoreError::Validation(format!(
                    "outfit references item {item_id} not owned by user {user_id}"
                )));
            }
        }
        self.outfits.add(user_id, new_outfit).await
    }
}

// ── tests ────────────────────────────────────────────────────────────
