//! # chroma-store
//!
//! Storage core for Chroma, the personal-wardrobe assistant.
//!
//! Provides the embedded object store that plays the role of the
//! application's database when no server is available: SQLite-backed
//! JSON-document collections with declared secondary indexes, typed
//! repositories per entity, read-side hydration, community-feed ranking,
//! engagement toggles, password-reset tokens, and the achievement rule
//! engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  ChromaStore facade  ·  SessionHolder (sync) │
//! ├──────────────────────────────────────────────┤
//! │  Feed · Hydrator · Engagement · Recovery ·   │
//! │  Achievements                                │
//! ├──────────────────────────────────────────────┤
//! │  UserStore · ItemStore · OutfitStore ·       │
//! │  CommentStore                                │
//! ├──────────────────────────────────────────────┤
//! │  ObjectStore (collections + indexes, batch)  │
//! │  Database (rusqlite WAL) · Migrations        │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```ignore
//! use chroma_store::{ChromaStore, StoreConfig};
//!
//! let store = ChromaStore::open(StoreConfig::default()).await?;
//! let user = store.login("admin@chroma.ai", "password123").await?;
//! let page = store.feed.public_outfits(1).await?;
//! ```

pub mod achievements;
pub mod comments;
pub mod db;
pub mod engagement;
pub mod engine;
pub mod error;
pub mod feed;
pub mod hydrate;
pub mod items;
pub mod migration;
pub mod outfits;
pub mod recovery;
pub mod session;
pub mod store;
pub mod users;

// ── re-exports ───────────────────────────────────────────────────────

pub use achievements::{ACHIEVEMENTS, AchievementCheck, AchievementDef, AchievementEngine};
pub use comments::{Comment, CommentStore};
pub use db::Database;
pub use engagement::EngagementService;
pub use engine::{BatchOp, Collection, IndexKey, ObjectStore};
pub use error::{StoreError, StoreResult};
pub use feed::{FeedPage, FeedService, PAGE_SIZE};
pub use hydrate::{CommentView, HydratedOutfit, Hydrator, OutfitItem, OutfitView};
pub use items::{Category, ClothingItem, ItemAnalysis, ItemStore, NewItem};
pub use outfits::{NewOutfit, Outfit, OutfitStore};
pub use recovery::{RecoveryService, TOKEN_TTL_MINUTES};
pub use session::SessionHolder;
pub use store::{ChromaStore, StoreConfig};
pub use users::{User, UserRole, UserStore};
