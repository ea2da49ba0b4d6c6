//! SQLite-backed persistent cache of previously-valid URLs and DOIs.
//!
//! Load is read-only and best-effort: any error (missing file, missing
//! tables, corrupt database) is swallowed and logged, and the run proceeds
//! with an empty cache. Write-back is unlink-then-recreate, so a run that
//! never reaches the persist stage cannot leave a half-written cache behind.

use crate::store::Store;
use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache_file parent directory does not exist: {0}")]
    ParentMissing(String),
    #[error("cache_file path is a directory: {0}")]
    IsDirectory(String),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Validate that `path` could plausibly be written to, before the probe
/// phase runs. Mirrors the Python original's `__check_cache_file_path`:
/// an existing file is fine; a path whose parent does not exist, or that
/// is itself a directory, is a fatal configuration error.
pub fn check_cache_file_path(path: &Path) -> Result<(), CacheError> {
    if path.exists() && path.is_file() {
        return Ok(());
    }
    match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() || parent.is_dir() => {}
        _ => return Err(CacheError::ParentMissing(path.display().to_string())),
    }
    if path.is_dir() {
        return Err(CacheError::IsDirectory(path.display().to_string()));
    }
    Ok(())
}

/// Load fresh `validUrls` rows (within `ttl_hours`) and all `validDois` rows
/// from `path` into `store`. Any failure is swallowed here; the caller logs
/// it and continues with whatever was merged (possibly nothing).
pub fn load_into_store(path: &Path, ttl_hours: u64, store: &mut Store) -> Result<(), CacheError> {
    if !path.exists() {
        return Ok(());
    }
    let conn = Connection::open(path)?;

    let mut url_stmt = conn.prepare(
        "SELECT normalizedUrl, lastValid FROM validUrls \
         WHERE lastValid > (strftime('%s','now') - (?1 * 3600))",
    )?;
    let urls = url_stmt
        .query_map([ttl_hours as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?
        .filter_map(Result::ok);
    store.merge_cached_valid_urls(urls);

    let mut doi_stmt = conn.prepare("SELECT doi, lastSeen FROM validDois")?;
    let dois = doi_stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .filter_map(Result::ok);
    store.merge_cached_valid_dois(dois);

    Ok(())
}

/// Atomically replace the cache file with the run's `valid_urls`/`valid_dois`
/// tables. Only called after the probe phases have completed.
pub fn snapshot_to_disk(path: &Path, store: &Store) -> Result<(), CacheError> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS validUrls (normalizedUrl TEXT, lastValid INTEGER);
         CREATE TABLE IF NOT EXISTS validDois (doi TEXT, lastSeen INTEGER);",
    )?;

    let tx = conn.unchecked_transaction()?;
    {
        let mut insert_url =
            tx.prepare("INSERT INTO validUrls (normalizedUrl, lastValid) VALUES (?1, ?2)")?;
        for (url, last_valid) in &store.valid_urls {
            insert_url.execute(rusqlite::params![url, last_valid])?;
        }
        let mut insert_doi =
            tx.prepare("INSERT INTO validDois (doi, lastSeen) VALUES (?1, ?2)")?;
        for (doi, last_seen) in &store.valid_dois {
            insert_doi.execute(rusqlite::params![doi, last_seen])?;
        }
    }
    tx.commit()?;
    Ok(())
}
