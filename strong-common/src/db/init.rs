//! Output store creation
//!
//! The converter always writes a fresh store; it never merges into an
//! existing one. Data goes to a staging file next to the target, which is
//! renamed into place only once everything is committed.

use crate::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Create a new SQLite store at `db_path`
///
/// Fails with [`Error::OutputExists`] if the file is already there, unless
/// `overwrite` is set, in which case the old file and its WAL/SHM siblings
/// are removed first. The pool holds a single connection with foreign keys
/// enforced and a rollback journal, so a closed store is one self-contained
/// file.
pub async fn create_output_store(db_path: &Path, overwrite: bool) -> Result<SqlitePool> {
    if db_path.exists() {
        if !overwrite {
            return Err(Error::OutputExists(db_path.to_path_buf()));
        }
        warn!("Replacing existing store: {}", db_path.display());
        remove_output_store(db_path)?;
    }

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Delete)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    info!("Created output store: {}", db_path.display());
    Ok(pool)
}

/// Staging location for a store that will end up at `db_path`
///
/// Same directory as the target so the final rename never crosses
/// filesystems.
pub fn staging_path(db_path: &Path) -> PathBuf {
    sibling(db_path, ".partial")
}

/// Move a fully written store from `staging` to `target`
///
/// The target is replaced in a single rename, so readers see either the old
/// store or the new one. Without `overwrite` an existing target is left alone
/// and the staging file is discarded.
pub fn publish_output_store(staging: &Path, target: &Path, overwrite: bool) -> Result<()> {
    if target.exists() {
        if !overwrite {
            remove_output_store(staging)?;
            return Err(Error::OutputExists(target.to_path_buf()));
        }
        warn!("Replacing existing store: {}", target.display());
        // stale journals of the old store must not be applied to the new one
        for path in &store_files(target)[1..] {
            remove_if_present(path)?;
        }
    }
    std::fs::rename(staging, target)?;
    info!("Published store: {}", target.display());
    Ok(())
}

/// Delete a store file together with its `-wal`/`-shm` siblings
///
/// Missing files are not an error.
pub fn remove_output_store(db_path: &Path) -> Result<()> {
    for path in store_files(db_path) {
        remove_if_present(&path)?;
    }
    Ok(())
}

fn remove_if_present(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn sibling(db_path: &Path, suffix: &str) -> PathBuf {
    let mut name = db_path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn store_files(db_path: &Path) -> [PathBuf; 3] {
    [
        db_path.to_path_buf(),
        sibling(db_path, "-wal"),
        sibling(db_path, "-shm"),
    ]
}
