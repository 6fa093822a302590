//! JSON export and import of the whole player store.

use crate::store::{PlayerStore, StoreError};
use chrono::{DateTime, TimeZone, Utc};
use roster_core::PlayerRecord;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid player file: {0}")]
    Json(#[from] serde_json::Error),
}

/// `players_<YYYY-MM-DD>.json`, dated by the UTC calendar day of `at`.
pub fn export_file_name<Tz: TimeZone>(at: &DateTime<Tz>) -> String {
    let day = at.with_timezone(&Utc).date_naive();
    format!("players_{}.json", day.format("%Y-%m-%d"))
}

/// Pretty-printed JSON array of the records, field names as stored.
pub fn to_json(records: &[PlayerRecord]) -> Result<String, ArchiveError> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Parse an import file: a JSON array of player objects. Only `id` is
/// required; unknown fields are ignored.
pub fn from_json(bytes: &[u8]) -> Result<Vec<PlayerRecord>, ArchiveError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Write every stored player into `dir`, named for the UTC day of `at`.
/// Returns the file path.
pub async fn export_to_dir(
    store: &PlayerStore,
    dir: &Path,
    at: DateTime<Utc>,
) -> Result<PathBuf, ArchiveError> {
    let records = store.get_all().await?;
    let json = to_json(&records)?;
    let path = dir.join(export_file_name(&at));

    tokio::fs::write(&path, json)
        .await
        .map_err(|source| ArchiveError::Io {
            path: path.clone(),
            source,
        })?;

    tracing::info!(path = %path.display(), count = records.len(), "players exported");
    Ok(path)
}

/// Replace the store's contents with the players in the file at `path`.
pub async fn import_file(store: &PlayerStore, path: &Path) -> Result<usize, ArchiveError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| ArchiveError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records = from_json(&bytes)?;
    let count = store.replace_all(&records).await?;
    tracing::info!(path = %path.display(), count, "players imported");
    Ok(count)
}
