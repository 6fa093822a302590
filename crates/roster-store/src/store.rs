//! SQLite-backed player store.
//!
//! One table, `players`, keyed by the national ID. The descriptor is kept as
//! a JSON array in a TEXT column. The database file is created on the first
//! operation, not when the store is constructed.

use roster_core::{Descriptor, PlayerRecord};
use rusqlite::params;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::OnceCell;
use tokio_rusqlite::Connection;

pub const SCHEMA_VERSION: i64 = 1;

const CREATE_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS players (
        id                TEXT PRIMARY KEY NOT NULL,
        year              INTEGER,
        facial_descriptor TEXT
    );
    PRAGMA user_version = 1;
";

const INSERT_OR_REPLACE: &str =
    "INSERT OR REPLACE INTO players (id, year, facial_descriptor) VALUES (?1, ?2, ?3)";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),
    #[error("cannot create database directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("database schema version {0} is newer than supported version {SCHEMA_VERSION}")]
    UnsupportedSchema(i64),
    #[error("cannot encode descriptor for player {id}: {source}")]
    Encode {
        id: String,
        source: serde_json::Error,
    },
    #[error("corrupt descriptor stored for player {id}: {source}")]
    CorruptDescriptor {
        id: String,
        source: serde_json::Error,
    },
}

enum Location {
    File(PathBuf),
    Memory,
}

/// A player as laid out in the `players` table.
struct StoredRow {
    id: String,
    year: Option<i32>,
    descriptor: Option<String>,
}

impl StoredRow {
    fn encode(record: &PlayerRecord) -> Result<Self, StoreError> {
        let descriptor = record
            .facial_descriptor
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|source| StoreError::Encode {
                id: record.id.clone(),
                source,
            })?;
        Ok(Self {
            id: record.id.clone(),
            year: record.year,
            descriptor,
        })
    }

    fn decode(self) -> Result<PlayerRecord, StoreError> {
        let facial_descriptor = match self.descriptor {
            Some(text) => Some(serde_json::from_str::<Descriptor>(&text).map_err(|source| {
                StoreError::CorruptDescriptor {
                    id: self.id.clone(),
                    source,
                }
            })?),
            None => None,
        };
        Ok(PlayerRecord {
            id: self.id,
            year: self.year,
            facial_descriptor,
        })
    }

    fn from_sql(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            year: row.get(1)?,
            descriptor: row.get(2)?,
        })
    }
}

/// Keyed persistence for [`PlayerRecord`]s.
///
/// Writes are upserts: the last `put` for an ID wins.
pub struct PlayerStore {
    location: Location,
    conn: OnceCell<Connection>,
}

impl PlayerStore {
    /// Store backed by the SQLite file at `path`. Nothing is touched on disk
    /// until the first operation.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            location: Location::File(path.into()),
            conn: OnceCell::new(),
        }
    }

    /// Private in-memory store, mainly for tests.
    pub fn in_memory() -> Self {
        Self {
            location: Location::Memory,
            conn: OnceCell::new(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            Location::File(p) => Some(p),
            Location::Memory => None,
        }
    }

    async fn conn(&self) -> Result<&Connection, StoreError> {
        self.conn
            .get_or_try_init(|| async move {
                let conn = match &self.location {
                    Location::File(path) => {
                        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                            tokio::fs::create_dir_all(dir).await.map_err(|source| {
                                StoreError::CreateDir {
                                    path: dir.to_path_buf(),
                                    source,
                                }
                            })?;
                        }
                        Connection::open(path).await?
                    }
                    Location::Memory => Connection::open_in_memory().await?,
                };

                let version = conn.call(migrate).await?;
                if version != SCHEMA_VERSION {
                    return Err(StoreError::UnsupportedSchema(version));
                }

                tracing::debug!(path = ?self.path(), "player database opened");
                Ok::<_, StoreError>(conn)
            })
            .await
    }

    /// Insert `record`, replacing any player with the same ID.
    pub async fn put(&self, record: &PlayerRecord) -> Result<(), StoreError> {
        let row = StoredRow::encode(record)?;
        self.conn()
            .await?
            .call(move |c| {
                c.execute(INSERT_OR_REPLACE, params![row.id, row.year, row.descriptor])?;
                Ok(())
            })
            .await?;
        tracing::debug!(id = %record.id, "player stored");
        Ok(())
    }

    /// Look up a player; `Ok(None)` if the ID was never written.
    pub async fn get(&self, id: &str) -> Result<Option<PlayerRecord>, StoreError> {
        let id = id.to_string();
        let row = self
            .conn()
            .await?
            .call(move |c| {
                let mut stmt = c.prepare(
                    "SELECT id, year, facial_descriptor FROM players WHERE id = ?1",
                )?;
                let mut rows = stmt.query_map(params![id], StoredRow::from_sql)?;
                let row = rows.next().transpose()?;
                Ok(row)
            })
            .await?;
        row.map(StoredRow::decode).transpose()
    }

    /// Every stored player, ordered by ID.
    pub async fn get_all(&self) -> Result<Vec<PlayerRecord>, StoreError> {
        let rows = self
            .conn()
            .await?
            .call(|c| {
                let mut stmt =
                    c.prepare("SELECT id, year, facial_descriptor FROM players ORDER BY id")?;
                let rows = stmt
                    .query_map([], StoredRow::from_sql)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;
        rows.into_iter().map(StoredRow::decode).collect()
    }

    pub async fn count(&self) -> Result<usize, StoreError> {
        let n = self
            .conn()
            .await?
            .call(|c| {
                let n: i64 = c.query_row("SELECT COUNT(*) FROM players", [], |r| r.get(0))?;
                Ok(n)
            })
            .await?;
        Ok(n as usize)
    }

    /// Clear the store and insert `records` in order, in one transaction.
    ///
    /// A duplicate ID within `records` (or any other failure) rolls the
    /// whole operation back, leaving the previous contents in place.
    pub async fn replace_all(&self, records: &[PlayerRecord]) -> Result<usize, StoreError> {
        let rows = records
            .iter()
            .map(StoredRow::encode)
            .collect::<Result<Vec<_>, _>>()?;
        let count = rows.len();

        self.conn()
            .await?
            .call(move |c| {
                let tx = c.transaction()?;
                tx.execute("DELETE FROM players", [])?;
                {
                    let mut insert = tx.prepare(
                        "INSERT INTO players (id, year, facial_descriptor) VALUES (?1, ?2, ?3)",
                    )?;
                    for row in &rows {
                        insert.execute(params![row.id, row.year, row.descriptor])?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await?;

        tracing::info!(count, "player store replaced");
        Ok(count)
    }
}

/// Create the schema on a fresh database and report its version.
fn migrate(c: &mut rusqlite::Connection) -> tokio_rusqlite::Result<i64> {
    let version: i64 = c.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    if version == 0 {
        c.execute_batch(CREATE_SCHEMA)?;
        return Ok(SCHEMA_VERSION);
    }
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, year: Option<i32>, descriptor: Option<&[f32]>) -> PlayerRecord {
        PlayerRecord {
            id: id.into(),
            year,
            facial_descriptor: descriptor.map(|d| Descriptor::new(d.to_vec())),
        }
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = PlayerStore::in_memory();
        let r = record("12345678", Some(2024), Some(&[0.1, 0.2, 0.3]));
        store.put(&r).await.unwrap();
        assert_eq!(store.get("12345678").await.unwrap(), Some(r));
    }

    #[tokio::test]
    async fn test_put_without_optional_fields() {
        let store = PlayerStore::in_memory();
        let r = record("1", None, None);
        store.put(&r).await.unwrap();
        assert_eq!(store.get("1").await.unwrap(), Some(r));
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let store = PlayerStore::in_memory();
        let first = record("7", Some(2023), Some(&[1.0]));
        let second = record("7", Some(2024), None);
        store.put(&first).await.unwrap();
        store.put(&second).await.unwrap();

        assert_eq!(store.get("7").await.unwrap(), Some(second));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_get_unknown_is_none() {
        let store = PlayerStore::in_memory();
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_replace_all_drops_previous() {
        let store = PlayerStore::in_memory();
        store.put(&record("old", Some(2020), None)).await.unwrap();

        let a = record("a", Some(2024), Some(&[0.5]));
        let b = record("b", None, Some(&[0.25]));
        assert_eq!(store.replace_all(&[a.clone(), b.clone()]).await.unwrap(), 2);

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.contains(&a));
        assert!(all.contains(&b));
        assert_eq!(store.get("old").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_replace_all_duplicate_rolls_back() {
        let store = PlayerStore::in_memory();
        let existing = record("keep", Some(2021), None);
        store.put(&existing).await.unwrap();

        let dup = [record("x", None, None), record("x", Some(1), None)];
        assert!(store.replace_all(&dup).await.is_err());

        assert_eq!(store.get_all().await.unwrap(), vec![existing]);
    }

    #[tokio::test]
    async fn test_replace_all_empty_clears() {
        let store = PlayerStore::in_memory();
        store.put(&record("a", None, None)).await.unwrap();
        store.replace_all(&[]).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_all_ordered_by_id() {
        let store = PlayerStore::in_memory();
        for id in ["30", "10", "20"] {
            store.put(&record(id, None, None)).await.unwrap();
        }
        let ids: Vec<_> = store
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["10", "20", "30"]);
    }

    #[tokio::test]
    async fn test_database_created_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("players.db");

        let store = PlayerStore::open(&path);
        assert!(!path.exists());

        assert_eq!(store.get("nobody").await.unwrap(), None);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("players.db");
        let r = record("99", Some(2022), Some(&[0.75, 0.5]));

        PlayerStore::open(&path).put(&r).await.unwrap();
        let reopened = PlayerStore::open(&path);
        assert_eq!(reopened.get("99").await.unwrap(), Some(r));
    }

    #[tokio::test]
    async fn test_newer_schema_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("players.db");
        {
            let c = rusqlite::Connection::open(&path).unwrap();
            c.execute_batch("PRAGMA user_version = 2;").unwrap();
        }

        let err = PlayerStore::open(&path).count().await.unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedSchema(2)));
    }
}
