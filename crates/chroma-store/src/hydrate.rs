//! Relational hydration — read-side joins.
//!
//! Outfits store weak item references and comments store author ids;
//! this module replaces those references with the full current records
//! when building views. Foreign keys are deduplicated before lookup so
//! the cost stays at one fetch per distinct reference. Hydration never
//! mutates the store.
//!
//! An item deleted after an outfit referenced it is surfaced as
//! [`OutfitItem::Missing`] rather than dropped or treated as an error.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::comments::Comment;
use crate::error::StoreResult;
use crate::items::{ClothingItem, ItemStore};
use crate::outfits::Outfit;
use crate::users::{User, UserStore};

/// A resolved outfit item reference.
#[derive(Debug, Clone, Serialize)]
pub enum OutfitItem {
    /// The referenced item still exists.
    Available(ClothingItem),
    /// The referenced item has been deleted since the outfit was saved.
    Missing { id: String },
}

impl OutfitItem {
    /// The referenced item id, whether or not it resolved.
    pub fn id(&self) -> &str {
        match self {
            Self::Available(item) => &item.id,
            Self::Missing { id } => id,
        }
    }

    /// The full item record, when available.
    pub fn item(&self) -> Option<&ClothingItem> {
        match self {
            Self::Available(item) => Some(item),
            Self::Missing { .. } => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing { .. })
    }
}

/// An outfit with its item references resolved.
#[derive(Debug, Clone, Serialize)]
pub struct HydratedOutfit {
    pub outfit: Outfit,
    pub items: Vec<OutfitItem>,
}

/// An outfit with items resolved and its creator attached, as served to
/// the community feed and collection views.
#[derive(Debug, Clone, Serialize)]
pub struct OutfitView {
    pub outfit: Outfit,
    pub items: Vec<OutfitItem>,
    pub creator: User,
}

/// A comment with its author attached.
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub comment: Comment,
    /// `None` when the authoring account no longer resolves.
    pub author: Option<User>,
}

/// Read-side projection joining outfits and comments against their
/// referenced items and users.
#[derive(Clone)]
pub struct Hydrator {
    items: ItemStore,
    users: UserStore,
}

impl Hydrator {
    pub fn new(items: ItemStore, users: UserStore) -> Self {
        Self { items, users }
    }

    /// Resolve the item references of each outfit.
    pub async fn outfits(&self, outfits: Vec<Outfit>) -> StoreResult<Vec<HydratedOutfit>> {
        let item_map = self.fetch_items(&outfits).await?;

        Ok(outfits
            .into_iter()
            .map(|outfit| {
                let items = resolve_items(&outfit, &item_map);
                HydratedOutfit { outfit, items }
            })
            .collect())
    }

    /// Resolve item references and attach each outfit's creator.
    ///
    /// Outfits whose creator no longer resolves are excluded — the feed
    /// never serves an authorless card.
    pub async fn outfits_with_creators(
        &self,
        outfits: Vec<Outfit>,
    ) -> StoreResult<Vec<OutfitView>> {
        let item_map = self.fetch_items(&outfits).await?;
        let user_map = self
            .fetch_users(outfits.iter().map(|o| o.user_id.as_str()))
            .await?;

        Ok(outfits
            .into_iter()
            .filter_map(|outfit| {
                let creator = user_map.get(&outfit.user_id).cloned()?;
                let items = resolve_items(&outfit, &item_map);
                Some(OutfitView {
                    outfit,
                    items,
                    creator,
                })
            })
            .collect())
    }

    /// Attach the authoring user to each comment.
    pub async fn comments(&self, comments: Vec<Comment>) -> StoreResult<Vec<CommentView>> {
        let user_map = self
            .fetch_users(comments.iter().map(|c| c.user_id.as_str()))
            .await?;

        Ok(comments
            .into_iter()
            .map(|comment| {
                let author = user_map.get(&comment.user_id).cloned();
                CommentView { comment, author }
            })
            .collect())
    }

    /// Fetch every distinct referenced item once.
    async fn fetch_items(
        &self,
        outfits: &[Outfit],
    ) -> StoreResult<HashMap<String, ClothingItem>> {
        let distinct: HashSet<&str> = outfits
            .iter()
            .flat_map(|o| o.item_ids.iter().map(String::as_str))
            .collect();

        let mut map = HashMap::with_capacity(distinct.len());
        for id in distinct {
            if let Some(item) = self.items.get(id).await? {
                map.insert(item.id.clone(), item);
            }
        }
        Ok(map)
    }

    /// Fetch every distinct referenced user once.
    async fn fetch_users<'a>(
        &self,
        ids: impl Iterator<Item = &'a str>,
    ) -> StoreResult<HashMap<String, User>> {
        let distinct: HashSet<&str> = ids.collect();

        let mut map = HashMap::with_capacity(distinct.len());
        for id in distinct {
            if let Some(user) = self.users.get(id).await? {
                map.insert(user.id.clone(), user);
            }
        }
        Ok(map)
    }
}

/// Resolve an outfit's references against the prefetched item map,
/// preserving order.
fn resolve_items(outfit: &Outfit, item_map: &HashMap<String, ClothingItem>) -> Vec<OutfitItem> {
    outfit
        .item_ids
        .iter()
        .map(|id| match item_map.get(id) {
            Some(item) => OutfitItem::Available(item.clone()),
            None => OutfitItem::Missing { id: id.clone() },
        })
        .collect()
}

// ── tests ────────────────────────────────────────────────────────────
