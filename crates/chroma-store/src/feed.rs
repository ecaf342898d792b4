//! Community feed ranking and pagination.
//!
//! Published outfits are scored by `likes * LIKE_WEIGHT - age_in_days`,
//! so each like buys an outfit roughly two days of freshness. Pages are
//! fixed-size slices of the score-sorted sequence; ties break on the
//! creation-order id so repeated reads of the same snapshot always
//! produce the same pages.

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::error::{StoreError, StoreResult};
use crate::hydrate::{Hydrator, OutfitView};
use crate::outfits::{Outfit, OutfitStore};
use crate::users::UserStore;

/// Outfits per feed page.
pub const PAGE_SIZE: usize = 9;

/// How many days of freshness one like is worth.
const LIKE_WEIGHT: f64 = 2.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// One page of the community feed.
#[derive(Debug, Clone)]
pub struct FeedPage {
    pub outfits: Vec<OutfitView>,
    /// Whether pages beyond this one exist.
    pub has_more: bool,
}

/// Serves the ranked community feed and the collected-outfits view.
#[derive(Clone)]
pub struct FeedService {
    outfits: OutfitStore,
    users: UserStore,
    hydrator: Hydrator,
}

impl FeedService {
    pub fn new(outfits: OutfitStore, users: UserStore, hydrator: Hydrator) -> Self {
        Self {
            outfits,
            users,
            hydrator,
        }
    }

    /// Serve page `page` (1-based) of the ranked public feed.
    pub async fn public_outfits(&self, page: usize) -> StoreResult<FeedPage> {
        self.public_outfits_at(page, Utc::now()).await
    }

    /// [`Self::public_outfits`] with an explicit clock, for tests.
    #[instrument(skip(self, now))]
    pub async fn public_outfits_at(
        &self,
        page: usize,
        now: DateTime<Utc>,
    ) -> StoreResult<FeedPage> {
        if page == 0 {
            return Err(StoreError::Validation("page numbers start at 1".into()));
        }

        let candidates = self.outfits.get_public().await?;
        let mut views = self.hydrator.outfits_with_creators(candidates).await?;

        let now_ts = now.timestamp();
        views.sort_by(|a, b| {
            score(&b.outfit, now_ts)
                .total_cmp(&score(&a.outfit, now_ts))
                .then_with(|| b.outfit.id.cmp(&a.outfit.id))
        });

        let total = views.len();
        let start = (page - 1) * PAGE_SIZE;
        let outfits: Vec<OutfitView> =
            views.into_iter().skip(start).take(PAGE_SIZE).collect();

        debug!(page, total, "feed page served");
        Ok(FeedPage {
            outfits,
            has_more: total > page * PAGE_SIZE,
        })
    }

    /// The outfits a user has collected, hydrated with their creators.
    ///
    /// Collected ids whose outfit has since been deleted are skipped.
    pub async fn collected_outfits(&self, user_id: &str) -> StoreResult<Vec<OutfitView>> {
        let user = self.users.get_required(user_id).await?;

        let mut outfits = Vec::with_capacity(user.collected_outfit_ids.len());
        for outfit_id in &user.collected_outfit_ids {
            if let Some(outfit) = self.outfits.get(outfit_id).await? {
                outfits.push(outfit);
            }
        }

        self.hydrator.outfits_with_creators(outfits).await
    }
}

/// Composite popularity/freshness score.
fn score(outfit: &Outfit, now_ts: i64) -> f64 {
    let age_days = (now_ts - outfit.created_at) as f64 / SECONDS_PER_DAY;
    outfit.likes.len() as f64 * LIKE_WEIGHT - age_days
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::engine::{ObjectStore, SAVED_OUTFITS};
    use crate::items::ItemStore;

    struct Fixture {
        engine: ObjectStore,
        users: UserStore,
        feed: FeedService,
    }

    async fn setup() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        db.run_migrations().await.unwrap();
        let engine = ObjectStore::new(db);
        let users = UserStore::new(engine.clone());
        let items = ItemStore::new(engine.clone());
        let outfits = OutfitStore::new(engine.clone());
        let hydrator = Hydrator::new(items, users.clone());
        Fixture {
            feed: FeedService::new(outfits, users.clone(), hydrator),
            engine,
            users,
        }
    }

    /// Insert a public outfit with a controlled id, age, and like count.
    async fn seed_outfit(
        fx: &Fixture,
        id: &str,
        user_id: &str,
        age_days: i64,
        likes: usize,
        now: DateTime<Utc>,
    ) {
        let outfit = Outfit {
            id: id.to_string(),
            user_id: user_id.to_string(),
            name: format!("outfit-{id}"),
            occasion: String::new(),
            explanation: String::new(),
            item_ids: Vec::new(),
            is_public: true,
            likes: (0..likes).map(|i| format!("liker-{i}")).collect(),
            created_at: (now - chrono::Duration::days(age_days)).timestamp(),
        };
        fx.engine.put(&SAVED_OUTFITS, id, &outfit).await.unwrap();
    }

    #[tokio::test]
    async fn page_zero_is_rejected() {
        let fx = setup().await;
        let result = fx.feed.public_outfits_at(0, Utc::now()).await;
        assert!(matches!(result, Err(StoreError::Validation(_))));
    }

    #[tokio::test]
    async fn likes_outweigh_freshness() {
        let fx = setup().await;
        let user = fx.users.sign_up("Ann", "ann@example.com", "pw").await.unwrap();
        let now = Utc::now();

        // Liked-but-older outfit: score 2*2 - 1 = 3.
        seed_outfit(&fx, "liked", &user.id, 1, 2, now).await;
        // Fresh but unliked: score 0 - 0 = 0.
        seed_outfit(&fx, "fresh", &user.id, 0, 0, now).await;

        let page = fx.feed.public_outfits_at(1, now).await.unwrap();
        let ids: Vec<&str> = page.outfits.iter().map(|v| v.outfit.id.as_str()).collect();
        assert_eq!(ids, vec!["liked", "fresh"]);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn score_ties_break_by_id_descending() {
        let fx = setup().await;
        let user = fx.users.sign_up("Ann", "ann@example.com", "pw").await.unwrap();
        let now = Utc::now();

        seed_outfit(&fx, "a", &user.id, 3, 0, now).await;
        seed_outfit(&fx, "b", &user.id, 3, 0, now).await;
        seed_outfit(&fx, "c", &user.id, 3, 0, now).await;

        let page = fx.feed.public_outfits_at(1, now).await.unwrap();
        let ids: Vec<&str> = page.outfits.iter().map(|v| v.outfit.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn pages_are_disjoint_and_ordered() {
        let fx = setup().await;
        let user = fx.users.sign_up("Ann", "ann@example.com", "pw").await.unwrap();
        let now = Utc::now();

        // 12 outfits with distinct ages → distinct scores.
        for i in 0..12 {
            seed_outfit(&fx, &format!("o{i:02}"), &user.id, i, 0, now).await;
        }

        let page1 = fx.feed.public_outfits_at(1, now).await.unwrap();
        let page2 = fx.feed.public_outfits_at(2, now).await.unwrap();

        assert_eq!(page1.outfits.len(), PAGE_SIZE);
        assert!(page1.has_more);
        assert_eq!(page2.outfits.len(), 3);
        assert!(!page2.has_more);

        let ids1: Vec<String> = page1.outfits.iter().map(|v| v.outfit.id.clone()).collect();
        let ids2: Vec<String> = page2.outfits.iter().map(|v| v.outfit.id.clone()).collect();
        assert!(ids1.iter().all(|id| !ids2.contains(id)));

        // Union preserves the global ordering: youngest (highest score) first.
        let all: Vec<String> = ids1.into_iter().chain(ids2).collect();
        let expected: Vec<String> = (0..12).map(|i| format!("o{i:02}")).collect();
        assert_eq!(all, expected);
    }

    #[tokio::test]
    async fn repeated_reads_return_identical_pages() {
        let fx = setup().await;
        let user = fx.users.sign_up("Ann", "ann@example.com", "pw").await.unwrap();
        let now = Utc::now();

        for i in 0..10 {
            seed_outfit(&fx, &format!("o{i}"), &user.id, 2, 1, now).await;
        }

        let first = fx.feed.public_outfits_at(1, now).await.unwrap();
        let second = fx.feed.public_outfits_at(1, now).await.unwrap();
        let ids = |p: &FeedPage| -> Vec<String> {
            p.outfits.iter().map(|v| v.outfit.id.clone()).collect()
        };
        assert_eq!(ids(&first), ids(&second));
    }

    #[tokio::test]
    async fn private_outfits_never_appear() {
        let fx = setup().await;
        let user = fx.users.sign_up("Ann", "ann@example.com", "pw").await.unwrap();
        let now = Utc::now();

        seed_outfit(&fx, "public", &user.id, 0, 0, now).await;
        let private = Outfit {
            id: "private".to_string(),
            user_id: user.id.clone(),
            name: "hidden".to_string(),
            occasion: String::new(),
            explanation: String::new(),
            item_ids: Vec::new(),
            is_public: false,
            likes: Vec::new(),
            created_at: now.timestamp(),
        };
        fx.engine
            .put(&SAVED_OUTFITS, "private", &private)
            .await
            .unwrap();

        let page = fx.feed.public_outfits_at(1, now).await.unwrap();
        assert_eq!(page.outfits.len(), 1);
        assert_eq!(page.outfits[0].outfit.id, "public");
    }

    #[tokio::test]
    async fn creatorless_candidates_are_excluded() {
        let fx = setup().await;
        let now = Utc::now();

        seed_outfit(&fx, "orphan", "no-such-user", 0, 5, now).await;

        let page = fx.feed.public_outfits_at(1, now).await.unwrap();
        assert!(page.outfits.is_empty());
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn collected_outfits_skip_deleted() {
        let fx = setup().await;
        let creator = fx.users.sign_up("Ann", "ann@example.com", "pw").await.unwrap();
        let mut collector = fx.users.sign_up("Bob", "bob@example.com", "pw").await.unwrap();
        let now = Utc::now();

        seed_outfit(&fx, "kept", &creator.id, 0, 0, now).await;
        collector.collected_outfit_ids =
            vec!["kept".to_string(), "long-gone".to_string()];
        fx.users.update(collector.clone()).await.unwrap();

        let collected = fx.feed.collected_outfits(&collector.id).await.unwrap();
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].outfit.id, "kept");
        assert_eq!(collected[0].creator.id, creator.id);
    }
}
