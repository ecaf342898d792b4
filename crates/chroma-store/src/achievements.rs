//! Threshold-based achievement rules.
//!
//! A fixed rule table maps counters to badge ids. Rules are independent
//! and monotonic: re-running a check with the same or higher counters
//! never removes a badge and never awards one twice.

use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::StoreResult;
use crate::users::UserStore;

pub const NOVICE_COLLECTOR: &str = "novice_collector";
pub const FASHIONISTA: &str = "fashionista";
pub const STYLE_SAVANT: &str = "style_savant";
pub const OUTFIT_ARCHITECT: &str = "outfit_architect";
pub const SOCIAL_BUTTERFLY: &str = "social_butterfly";

/// Which counter a rule watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Counter {
    WardrobeSize,
    SavedOutfitCount,
    HasShared,
}

/// One threshold rule.
struct Rule {
    counter: Counter,
    threshold: usize,
    id: &'static str,
}

static RULES: &[Rule] = &[
    Rule {
        counter: Counter::WardrobeSize,
        threshold: 10,
        id: NOVICE_COLLECTOR,
    },
    Rule {
        counter: Counter::WardrobeSize,
        threshold: 50,
        id: FASHIONISTA,
    },
    Rule {
        counter: Counter::WardrobeSize,
        threshold: 100,
        id: STYLE_SAVANT,
    },
    Rule {
        counter: Counter::SavedOutfitCount,
        threshold: 10,
        id: OUTFIT_ARCHITECT,
    },
    Rule {
        counter: Counter::HasShared,
        threshold: 1,
        id: SOCIAL_BUTTERFLY,
    },
];

/// Badge metadata for UI rendering.
#[derive(Debug, Clone, Serialize)]
pub struct AchievementDef {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

/// The full badge catalog.
pub static ACHIEVEMENTS: &[AchievementDef] = &[
    AchievementDef {
        id: NOVICE_COLLECTOR,
        title: "Novice Collector",
        description: "You've started your collection by adding 10 items to your wardrobe.",
    },
    AchievementDef {
        id: FASHIONISTA,
        title: "Fashionista",
        description: "Your wardrobe has grown to an impressive 50 items.",
    },
    AchievementDef {
        id: STYLE_SAVANT,
        title: "Style Savant",
        description: "A true connoisseur! You have cataloged over 100 items.",
    },
    AchievementDef {
        id: OUTFIT_ARCHITECT,
        title: "Outfit Architect",
        description: "You've saved your first 10 custom outfits.",
    },
    AchievementDef {
        id: SOCIAL_BUTTERFLY,
        title: "Social Butterfly",
        description: "You've shared your first outfit with the Chroma community.",
    },
];

/// Current counter snapshot for one user. Absent counters are not
/// evaluated — callers pass only what they just recomputed.
#[derive(Debug, Clone, Copy, Default)]
pub struct AchievementCheck {
    pub wardrobe_size: Option<usize>,
    pub saved_outfit_count: Option<usize>,
    pub has_shared: bool,
}

/// Pure rule evaluation: every badge id the counters currently satisfy.
fn earned_ids(check: &AchievementCheck) -> Vec<&'static str> {
    RULES
        .iter()
        .filter(|rule| match rule.counter {
            Counter::WardrobeSize => check
                .wardrobe_size
                .is_some_and(|n| n >= rule.threshold),
            Counter::SavedOutfitCount => check
                .saved_outfit_count
                .is_some_and(|n| n >= rule.threshold),
            Counter::HasShared => check.has_shared,
        })
        .map(|rule| rule.id)
        .collect()
}

/// Evaluates the rule table and persists newly earned badges.
#[derive(Clone)]
pub struct AchievementEngine {
    users: UserStore,
}

impl AchievementEngine {
    pub fn new(users: UserStore) -> Self {
        Self { users }
    }

    /// Award every satisfied, not-yet-held badge to `user_id`.
    ///
    /// Persists at most one user write and returns the ids granted by
    /// this call (empty when nothing new was earned).
    #[instrument(skip(self, check))]
    pub async fn check_and_award(
        &self,
        user_id: &str,
        check: AchievementCheck,
    ) -> StoreResult<Vec<&'static str>> {
        let mut user = self.users.get_required(user_id).await?;

        let newly_awarded: Vec<&'static str> = earned_ids(&check)
            .into_iter()
            .filter(|id| !user.achievements.iter().any(|held| held == id))
            .collect();

        if newly_awarded.is_empty() {
            return Ok(newly_awarded);
        }

        user.achievements
            .extend(newly_awarded.iter().map(|id| id.to_string()));
        self.users.update(user).await?;

        debug!(user_id = %user_id, awarded = ?newly_awarded, "achievements granted");
        Ok(newly_awarded)
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::engine::ObjectStore;

    struct Fixture {
        users: UserStore,
        engine: AchievementEngine,
    }

    async fn setup() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        db.run_migrations().await.unwrap();
        let users = UserStore::new(ObjectStore::new(db));
        Fixture {
            engine: AchievementEngine::new(users.clone()),
            users,
        }
    }

    #[test]
    fn rule_table_matches_catalog() {
        for rule in RULES {
            assert!(
                ACHIEVEMENTS.iter().any(|a| a.id == rule.id),
                "rule {} has no catalog entry",
                rule.id
            );
        }
    }

    #[test]
    fn earned_ids_thresholds() {
        let none = earned_ids(&AchievementCheck::default());
        assert!(none.is_empty());

        let nine = earned_ids(&AchievementCheck {
            wardrobe_size: Some(9),
            ..Default::default()
        });
        assert!(nine.is_empty());

        let hundred = earned_ids(&AchievementCheck {
            wardrobe_size: Some(100),
            ..Default::default()
        });
        assert_eq!(hundred, vec![NOVICE_COLLECTOR, FASHIONISTA, STYLE_SAVANT]);

        let shared = earned_ids(&AchievementCheck {
            has_shared: true,
            ..Default::default()
        });
        assert_eq!(shared, vec![SOCIAL_BUTTERFLY]);
    }

    #[tokio::test]
    async fn awarded_exactly_once_across_repeated_checks() {
        let fx = setup().await;
        let user = fx.users.sign_up("Ann", "ann@example.com", "pw").await.unwrap();

        // Simulate the check running after each of ten single-item adds.
        for size in 1..=10usize {
            let awarded = fx
                .engine
                .check_and_award(
                    &user.id,
                    AchievementCheck {
                        wardrobe_size: Some(size),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            if size < 10 {
                assert!(awarded.is_empty());
            } else {
                assert_eq!(awarded, vec![NOVICE_COLLECTOR]);
            }
        }

        let fetched = fx.users.get(&user.id).await.unwrap().unwrap();
        assert_eq!(fetched.achievements, vec![NOVICE_COLLECTOR.to_string()]);
    }

    #[tokio::test]
    async fn achievements_are_monotonic() {
        let fx = setup().await;
        let user = fx.users.sign_up("Bob", "bob@example.com", "pw").await.unwrap();

        fx.engine
            .check_and_award(
                &user.id,
                AchievementCheck {
                    wardrobe_size: Some(60),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // A later check with an absent counter must not remove anything.
        fx.engine
            .check_and_award(
                &user.id,
                AchievementCheck {
                    has_shared: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let fetched = fx.users.get(&user.id).await.unwrap().unwrap();
        assert!(fetched
            .achievements
            .contains(&NOVICE_COLLECTOR.to_string()));
        assert!(fetched.achievements.contains(&FASHIONISTA.to_string()));
        assert!(fetched
            .achievements
            .contains(&SOCIAL_BUTTERFLY.to_string()));
    }

    #[tokio::test]
    async fn no_write_when_nothing_new() {
        let fx = setup().await;
        let user = fx.users.sign_up("Cay", "cay@example.com", "pw").await.unwrap();

        let awarded = fx
            .engine
            .check_and_award(
                &user.id,
                AchievementCheck {
                    wardrobe_size: Some(3),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(awarded.is_empty());

        let fetched = fx.users.get(&user.id).await.unwrap().unwrap();
        assert_eq!(fetched.updated_at, user.updated_at);
    }
}
