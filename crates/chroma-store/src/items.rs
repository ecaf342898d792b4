//! Wardrobe items.
//!
//! Typed repository over the `items` collection. New items usually
//! arrive from the image-analysis client as an [`ItemAnalysis`]; the
//! store validates the category against the closed enum and fills the
//! remaining fields with the catalog defaults, persisting everything
//! else verbatim.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::engine::{BatchOp, ITEMS, ObjectStore};
use crate::error::{StoreError, StoreResult};

/// Closed set of clothing categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Top,
    Bottom,
    Outerwear,
    Footwear,
    Accessory,
    Dress,
}

impl Category {
    /// Parse a category label, rejecting anything outside the closed set.
    pub fn parse(s: &str) -> StoreResult<Self> {
        match s {
            "Top" => Ok(Self::Top),
            "Bottom" => Ok(Self::Bottom),
            "Outerwear" => Ok(Self::Outerwear),
            "Footwear" => Ok(Self::Footwear),
            "Accessory" => Ok(Self::Accessory),
            "Dress" => Ok(Self::Dress),
            other => Err(StoreError::Validation(format!(
                "unknown clothing category: {other}"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Top => "Top",
            Self::Bottom => "Bottom",
            Self::Outerwear => "Outerwear",
            Self::Footwear => "Footwear",
            Self::Accessory => "Accessory",
            Self::Dress => "Dress",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cataloged piece of clothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClothingItem {
    /// Unique identifier (UUID v7).
    pub id: String,
    /// Owning user.
    pub user_id: String,
    pub name: String,
    pub category: Category,
    pub color: String,
    pub style: String,
    /// Opaque image reference, stored verbatim.
    pub image_url: String,
    /// Unix timestamp when the item entered the wardrobe.
    pub purchase_date: i64,
}

/// Image-analysis output from the AI client. All fields are optional —
/// absent values fall back to the catalog defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemAnalysis {
    pub name: Option<String>,
    pub category: Option<String>,
    pub color: Option<String>,
    pub style: Option<String>,
}

/// An analyzed item plus its uploaded image reference, ready to persist.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub analysis: ItemAnalysis,
    pub image_url: String,
}

/// CRUD operations on wardrobe items.
#[derive(Clone)]
pub struct ItemStore {
    store: ObjectStore,
}

impl ItemStore {
    pub fn new(store: ObjectStore) -> Self {
        Self { store }
    }

    /// Persist a batch of analyzed items for `user_id` as one unit.
    ///
    /// Category labels are checked against the closed enum before
    /// anything is written; the batch applies all-or-nothing.
    #[instrument(skip(self, new_items), fields(count = new_items.len()))]
    pub async fn add_analyzed(
        &self,
        user_id: &str,
        new_items: Vec<NewItem>,
    ) -> StoreResult<Vec<ClothingItem>> {
        let now = Utc::now().timestamp();
        let mut items = Vec::with_capacity(new_items.len());
        for new_item in new_items {
            let category = match new_item.analysis.category.as_deref() {
                Some(label) => Category::parse(label)?,
                None => Category::Top,
            };
            items.push(ClothingItem {
                id: Uuid::now_v7().to_string(),
                user_id: user_id.to_string(),
                name: new_item
                    .analysis
                    .name
                    .unwrap_or_else(|| "New Item".to_string()),
                category,
                color: new_item
                    .analysis
                    .color
                    .unwrap_or_else(|| "Unknown".to_string()),
                style: new_item
                    .analysis
                    .style
                    .unwrap_or_else(|| "Unknown".to_string()),
                image_url: new_item.image_url,
                purchase_date: now,
            });
        }

        let ops = items
            .iter()
            .map(|item| BatchOp::add(&ITEMS, &item.id, item))
            .collect::<StoreResult<Vec<_>>>()?;
        self.store.apply_batch(ops).await?;

        debug!(user_id = %user_id, count = items.len(), "items added");
        Ok(items)
    }

    /// Fetch a single item, returning `None` if not found.
    pub async fn get(&self, id: &str) -> StoreResult<Option<ClothingItem>> {
        self.store.get(&ITEMS, id).await
    }

    /// Every item in the catalog, in insertion order.
    pub async fn get_all(&self) -> StoreResult<Vec<ClothingItem>> {
        self.store.get_all(&ITEMS).await
    }

    /// Every item owned by `user_id`, via the owner index.
    pub async fn get_by_owner(&self, user_id: &str) -> StoreResult<Vec<ClothingItem>> {
        self.store.get_all_by_index(&ITEMS, "user_id", user_id).await
    }

    /// Persist an edited item.
    pub async fn update(&self, item: &ClothingItem) -> StoreResult<()> {
        self.store.put(&ITEMS, &item.id, item).await
    }

    /// Delete a single item. Outfits referencing it keep their weak
    /// references; hydration reports them as missing.
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        self.store.delete(&ITEMS, id).await
    }

    /// Delete several items as one all-or-nothing unit: when any id does
    /// not exist, nothing is deleted and the failure names it.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn delete_many(&self, ids: &[String]) -> StoreResult<()> {
        let ops = ids
            .iter()
            .map(|id| BatchOp::delete(&ITEMS, id))
            .collect::<Vec<_>>();
        self.store.apply_batch(ops).await
    }
}

// ── tests ────────────────────────────────────────────────────────────
