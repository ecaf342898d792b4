//! Generic object-store engine over [`Database`].
//!
//! Collections are named sets of JSON documents addressed by a primary
//! key, with zero or more declared secondary indexes. The four Chroma
//! collections are declared as statics here and created by the schema
//! migrations; callers address them through the typed [`Collection`]
//! handles so table names never come from runtime input.
//!
//! Reads return records in insertion order (`rowid`). Mutations are
//! single-record; [`ObjectStore::apply_batch`] groups several of them
//! into one all-or-nothing SQLite transaction.

use rusqlite::types::{ToSqlOutput, Value};
use rusqlite::ToSql;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::db::Database;
use crate::error::{StoreError, StoreResult};

// ═══════════════════════════════════════════════════════════════════════
//  Collection registry
// ═══════════════════════════════════════════════════════════════════════

/// A declared secondary index on a collection.
#[derive(Debug)]
pub struct IndexDef {
    /// Name callers use with [`ObjectStore::get_all_by_index`].
    pub name: &'static str,
    /// `json_extract` path into the document body.
    pub path: &'static str,
    /// Whether the indexed value must be unique across the collection.
    pub unique: bool,
}

/// A named record collection with its declared indexes.
#[derive(Debug)]
pub struct Collection {
    pub name: &'static str,
    pub indexes: &'static [IndexDef],
}

impl Collection {
    fn index(&self, name: &str) -> StoreResult<&IndexDef> {
        self.indexes
            .iter()
            .find(|idx| idx.name == name)
            .ok_or_else(|| {
                StoreError::Validation(format!(
                    "undeclared index '{name}' on collection '{}'",
                    self.name
                ))
            })
    }
}

/// User accounts, unique by email.
pub static USERS: Collection = Collection {
    name: "users",
    indexes: &[IndexDef {
        name: "email",
        path: "$.email",
        unique: true,
    }],
};

/// Wardrobe items, addressable by owner.
pub static ITEMS: Collection = Collection {
    name: "items",
    indexes: &[IndexDef {
        name: "user_id",
        path: "$.user_id",
        unique: false,
    }],
};

/// Saved and published outfits, addressable by owner and publication flag.
pub static SAVED_OUTFITS: Collection = Collection {
    name: "saved_outfits",
    indexes: &[
        IndexDef {
            name: "user_id",
            path: "$.user_id",
            unique: false,
        },
        IndexDef {
            name: "is_public",
            path: "$.is_public",
            unique: false,
        },
    ],
};

/// Outfit comments, addressable by outfit.
pub static COMMENTS: Collection = Collection {
    name: "comments",
    indexes: &[IndexDef {
        name: "outfit_id",
        path: "$.outfit_id",
        unique: false,
    }],
};

/// A secondary-index lookup key.
///
/// JSON booleans are stored by SQLite's `json_extract` as 0/1 integers,
/// so `Bool` binds as an integer.
#[derive(Debug, Clone)]
pub enum IndexKey {
    Text(String),
    Int(i64),
    Bool(bool),
}

impl ToSql for IndexKey {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            IndexKey::Text(s) => ToSqlOutput::Owned(Value::Text(s.clone())),
            IndexKey::Int(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            IndexKey::Bool(b) => ToSqlOutput::Owned(Value::Integer(i64::from(*b))),
        })
    }
}

impl From<&str> for IndexKey {
    fn from(s: &str) -> Self {
        IndexKey::Text(s.to_string())
    }
}

impl From<bool> for IndexKey {
    fn from(b: bool) -> Self {
        IndexKey::Bool(b)
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Batch operations
// ═══════════════════════════════════════════════════════════════════════

/// One member of an all-or-nothing batch.
pub enum BatchOp {
    /// Insert a new record; fails the batch on a key or unique conflict.
    Add {
        collection: &'static Collection,
        id: String,
        body: String,
    },
    /// Insert or replace a record.
    Put {
        collection: &'static Collection,
        id: String,
        body: String,
    },
    /// Delete a record; fails the batch if it does not exist.
    Delete {
        collection: &'static Collection,
        id: String,
    },
}

impl BatchOp {
    /// Build an `Add` op from a serializable record.
    pub fn add<T: Serialize>(
        collection: &'static Collection,
        id: &str,
        record: &T,
    ) -> StoreResult<Self> {
        Ok(Self::Add {
            collection,
            id: id.to_string(),
            body: serde_json::to_string(record)?,
        })
    }

    /// Build a `Put` op from a serializable record.
    pub fn put<T: Serialize>(
        collection: &'static Collection,
        id: &str,
        record: &T,
    ) -> StoreResult<Self> {
        Ok(Self::Put {
            collection,
            id: id.to_string(),
            body: serde_json::to_string(record)?,
        })
    }

    /// Build a `Delete` op.
    pub fn delete(collection: &'static Collection, id: &str) -> Self {
        Self::Delete {
            collection,
            id: id.to_string(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  ObjectStore
// ═══════════════════════════════════════════════════════════════════════

/// Keyed, indexed document collections over SQLite.
#[derive(Clone)]
pub struct ObjectStore {
    db: Database,
}

impl ObjectStore {
    /// Create a new engine over `db`. The schema must already be migrated.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// The underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Fetch a single record by primary key, returning `None` if not found.
    pub async fn get<T: DeserializeOwned>(
        &self,
        col: &'static Collection,
        id: &str,
    ) -> StoreResult<Option<T>> {
        let id = id.to_string();
        let sql = format!("SELECT body FROM {} WHERE id = ?1", col.name);
        let body: Option<String> = self
            .db
            .execute(move |conn| {
                let result = conn.query_row(&sql, rusqlite::params![id], |row| row.get(0));
                match result {
                    Ok(body) => Ok(Some(body)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(StoreError::Sqlite(e)),
                }
            })
            .await?;

        body.map(|b| serde_json::from_str(&b).map_err(StoreError::from))
            .transpose()
    }

    /// Fetch every record in a collection, in insertion order.
    pub async fn get_all<T: DeserializeOwned>(
        &self,
        col: &'static Collection,
    ) -> StoreResult<Vec<T>> {
        let sql = format!("SELECT body FROM {} ORDER BY rowid", col.name);
        let bodies: Vec<String> = self
            .db
            .execute(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        bodies
            .iter()
            .map(|b| serde_json::from_str(b).map_err(StoreError::from))
            .collect()
    }

    /// Fetch every record whose indexed value equals `key`, in insertion
    /// order. The index must be declared on the collection.
    pub async fn get_all_by_index<T: DeserializeOwned>(
        &self,
        col: &'static Collection,
        index: &str,
        key: impl Into<IndexKey>,
    ) -> StoreResult<Vec<T>> {
        let idx = col.index(index)?;
        let key = key.into();
        let sql = format!(
            "SELECT body FROM {} WHERE json_extract(body, '{}') = ?1 ORDER BY rowid",
            col.name, idx.path
        );
        let bodies: Vec<String> = self
            .db
            .execute(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(rusqlite::params![key], |row| row.get(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        bodies
            .iter()
            .map(|b| serde_json::from_str(b).map_err(StoreError::from))
            .collect()
    }

    /// Insert a new record. Fails with [`StoreError::Conflict`] if the
    /// primary key or a unique index value already exists.
    #[instrument(skip(self, record))]
    pub async fn add<T: Serialize>(
        &self,
        col: &'static Collection,
        id: &str,
        record: &T,
    ) -> StoreResult<()> {
        let body = serde_json::to_string(record)?;
        let id = id.to_string();
        let sql = format!("INSERT INTO {} (id, body) VALUES (?1, ?2)", col.name);
        self.db
            .execute(move |conn| {
                conn.execute(&sql, rusqlite::params![id, body])
                    .map_err(|e| map_conflict(col, &id, e))?;
                debug!(collection = col.name, id = %id, "record added");
                Ok(())
            })
            .await
    }

    /// Insert or replace a record. A unique-index collision with a
    /// *different* record is still a [`StoreError::Conflict`].
    #[instrument(skip(self, record))]
    pub async fn put<T: Serialize>(
        &self,
        col: &'static Collection,
        id: &str,
        record: &T,
    ) -> StoreResult<()> {
        let body = serde_json::to_string(record)?;
        let id = id.to_string();
        let sql = format!(
            "INSERT INTO {} (id, body) VALUES (?1, ?2) \
             ON CONFLICT(id) DO UPDATE SET body = excluded.body",
            col.name
        );
        self.db
            .execute(move |conn| {
                conn.execute(&sql, rusqlite::params![id, body])
                    .map_err(|e| map_conflict(col, &id, e))?;
                Ok(())
            })
            .await
    }

    /// Delete a record by primary key, failing with [`StoreError::NotFound`]
    /// if it does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, col: &'static Collection, id: &str) -> StoreResult<()> {
        let id = id.to_string();
        let sql = format!("DELETE FROM {} WHERE id = ?1", col.name);
        self.db
            .execute(move |conn| {
                let deleted = conn.execute(&sql, rusqlite::params![id])?;
                if deleted == 0 {
                    return Err(StoreError::NotFound {
                        entity: col.name,
                        id,
                    });
                }
                Ok(())
            })
            .await
    }

    /// Read a record, apply `f` to it, and write it back — all inside one
    /// transaction, so the read-modify-write cannot interleave with any
    /// other store call. Returns the updated record.
    pub async fn modify<T, F>(
        &self,
        col: &'static Collection,
        id: &str,
        f: F,
    ) -> StoreResult<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce(&mut T) + Send + 'static,
    {
        let id = id.to_string();
        let select = format!("SELECT body FROM {} WHERE id = ?1", col.name);
        let update = format!("UPDATE {} SET body = ?2 WHERE id = ?1", col.name);
        self.db
            .execute_mut(move |conn| {
                let tx = conn.transaction()?;

                let body: String = tx
                    .query_row(&select, rusqlite::params![id], |row| row.get(0))
                    .map_err(|e| match e {
                        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound {
                            entity: col.name,
                            id: id.clone(),
                        },
                        other => StoreError::Sqlite(other),
                    })?;

                let mut record: T = serde_json::from_str(&body)?;
                f(&mut record);
                let body = serde_json::to_string(&record)?;

                tx.execute(&update, rusqlite::params![id, body])
                    .map_err(|e| map_conflict(col, &id, e))?;
                tx.commit()?;
                Ok(record)
            })
            .await
    }

    /// Apply a batch of mutations as one all-or-nothing unit: if any
    /// member fails, none of the batch's effects are visible.
    #[instrument(skip(self, ops), fields(count = ops.len()))]
    pub async fn apply_batch(&self, ops: Vec<BatchOp>) -> StoreResult<()> {
        if ops.is_empty() {
            return Ok(());
        }
        self.db
            .execute_mut(move |conn| {
                let tx = conn.transaction()?;
                for op in ops {
                    match op {
                        BatchOp::Add {
                            collection,
                            id,
                            body,
                        } => {
                            let sql = format!(
                                "INSERT INTO {} (id, body) VALUES (?1, ?2)",
                                collection.name
                            );
                            tx.execute(&sql, rusqlite::params![id, body])
                                .map_err(|e| map_conflict(collection, &id, e))?;
                        }
                        BatchOp::Put {
                            collection,
                            id,
                            body,
                        } => {
                            let sql = format!(
                                "INSERT INTO {} (id, body) VALUES (?1, ?2) \
                                 ON CONFLICT(id) DO UPDATE SET body = excluded.body",
                                collection.name
                            );
                            tx.execute(&sql, rusqlite::params![id, body])
                                .map_err(|e| map_conflict(collection, &id, e))?;
                        }
                        BatchOp::Delete { collection, id } => {
                            let sql =
                                format!("DELETE FROM {} WHERE id = ?1", collection.name);
                            let deleted = tx.execute(&sql, rusqlite::params![id])?;
                            if deleted == 0 {
                                return Err(StoreError::NotFound {
                                    entity: collection.name,
                                    id,
                                });
                            }
                        }
                    }
                }
                tx.commit()?;
                debug!("batch applied");
                Ok(())
            })
            .await
    }

    /// Number of records in a collection.
    pub async fn count(&self, col: &'static Collection) -> StoreResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", col.name);
        self.db
            .execute(move |conn| {
                let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
                Ok(count)
            })
            .await
    }
}

/// Map a SQLite constraint violation to [`StoreError::Conflict`].
fn map_conflict(col: &'static Collection, id: &str, e: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(ref err, _) = e
        && err.code == rusqlite::ErrorCode::ConstraintViolation
    {
        return StoreError::Conflict(format!(
            "constraint violation in '{}' for record {id}",
            col.name
        ));
    }
    StoreError::Sqlite(e)
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Doc {
        email: String,
        note: String,
    }

    async fn setup() -> ObjectStore {
        let db = Database::open_in_memory().unwrap();
        db.run_migrations().await.unwrap();
        ObjectStore::new(db)
    }

    fn doc(email: &str, note: &str) -> Doc {
        Doc {
            email: email.to_string(),
            note: note.to_string(),
        }
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let store = setup().await;
        let got: Option<Doc> = store.get(&USERS, "nope").await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn add_and_get_roundtrip() {
        let store = setup().await;
        let d = doc("a@b.c", "hello");
        store.add(&USERS, "u1", &d).await.unwrap();

        let got: Option<Doc> = store.get(&USERS, "u1").await.unwrap();
        assert_eq!(got, Some(d));
    }

    #[tokio::test]
    async fn add_duplicate_key_is_conflict() {
        let store = setup().await;
        store.add(&USERS, "u1", &doc("a@b.c", "x")).await.unwrap();

        let result = store.add(&USERS, "u1", &doc("d@e.f", "y")).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn add_duplicate_unique_index_is_conflict() {
        let store = setup().await;
        store.add(&USERS, "u1", &doc("a@b.c", "x")).await.unwrap();

        let result = store.add(&USERS, "u2", &doc("a@b.c", "y")).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn put_upserts() {
        let store = setup().await;
        store.put(&USERS, "u1", &doc("a@b.c", "old")).await.unwrap();
        store.put(&USERS, "u1", &doc("a@b.c", "new")).await.unwrap();

        let got: Option<Doc> = store.get(&USERS, "u1").await.unwrap();
        assert_eq!(got.unwrap().note, "new");
    }

    #[tokio::test]
    async fn get_all_preserves_insertion_order() {
        let store = setup().await;
        for i in 0..5 {
            store
                .add(&USERS, &format!("u{i}"), &doc(&format!("{i}@x.y"), "n"))
                .await
                .unwrap();
        }

        let all: Vec<Doc> = store.get_all(&USERS).await.unwrap();
        let emails: Vec<&str> = all.iter().map(|d| d.email.as_str()).collect();
        assert_eq!(emails, vec!["0@x.y", "1@x.y", "2@x.y", "3@x.y", "4@x.y"]);
    }

    #[tokio::test]
    async fn get_all_by_index_filters() {
        let store = setup().await;
        store.add(&USERS, "u1", &doc("a@b.c", "x")).await.unwrap();
        store.add(&USERS, "u2", &doc("d@e.f", "y")).await.unwrap();

        let found: Vec<Doc> = store
            .get_all_by_index(&USERS, "email", "d@e.f")
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].note, "y");
    }

    #[tokio::test]
    async fn undeclared_index_is_rejected() {
        let store = setup().await;
        let result: StoreResult<Vec<Doc>> =
            store.get_all_by_index(&USERS, "no_such_index", "v").await;
        assert!(matches!(result, Err(StoreError::Validation(_))));
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let store = setup().await;
        let result = store.delete(&USERS, "ghost").await;
        assert!(matches!(
            result,
            Err(StoreError::NotFound { entity: "users", .. })
        ));
    }

    #[tokio::test]
    async fn modify_missing_is_not_found() {
        let store = setup().await;
        let result = store
            .modify::<Doc, _>(&USERS, "ghost", |d| d.note.clear())
            .await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn modify_applies_in_place() {
        let store = setup().await;
        store.add(&USERS, "u1", &doc("a@b.c", "old")).await.unwrap();

        let updated = store
            .modify::<Doc, _>(&USERS, "u1", |d| d.note = "new".to_string())
            .await
            .unwrap();
        assert_eq!(updated.note, "new");

        let got: Option<Doc> = store.get(&USERS, "u1").await.unwrap();
        assert_eq!(got.unwrap().note, "new");
    }

    #[tokio::test]
    async fn batch_is_all_or_nothing() {
        let store = setup().await;
        store.add(&USERS, "u1", &doc("a@b.c", "x")).await.unwrap();

        // Second op deletes a nonexistent record, so the first must not apply.
        let ops = vec![
            BatchOp::delete(&USERS, "u1"),
            BatchOp::delete(&USERS, "ghost"),
        ];
        let result = store.apply_batch(ops).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));

        let still_there: Option<Doc> = store.get(&USERS, "u1").await.unwrap();
        assert!(still_there.is_some());
    }

    #[tokio::test]
    async fn batch_applies_all_on_success() {
        let store = setup().await;
        let ops = vec![
            BatchOp::add(&USERS, "u1", &doc("a@b.c", "x")).unwrap(),
            BatchOp::add(&USERS, "u2", &doc("d@e.f", "y")).unwrap(),
        ];
        store.apply_batch(ops).await.unwrap();

        assert_eq!(store.count(&USERS).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn empty_batch_is_noop() {
        let store = setup().await;
        store.apply_batch(Vec::new()).await.unwrap();
    }
}
