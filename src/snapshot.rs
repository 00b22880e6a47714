//! On-disk persistence for the database set.
//!
//! A snapshot is the full `Vec<Database>` encoded with `bincode` and written
//! atomically: the new image lands in a temp file in the same directory,
//! then is renamed over the old snapshot so a reader never observes a
//! partially-written file.

use crate::db::Database;
use crate::Result;

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// On-disk envelope around the database set. Carrying a format version
/// alongside the payload is what makes the file self-describing: a reader
/// can refuse an incompatible snapshot instead of misinterpreting its bytes.
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    saved_at_ms: u64,
    databases: Vec<Database>,
}

const SNAPSHOT_VERSION: u32 = 1;

fn snapshot_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.rdb"))
}

/// Writes `databases` to `<dir>/<name>.rdb`, replacing any existing
/// snapshot. The write goes to a sibling temp file first and is renamed into
/// place, so a crash mid-write leaves the previous snapshot intact.
pub fn save(dir: &Path, name: &str, databases: &[Database], saved_at_ms: u64) -> Result<()> {
    std::fs::create_dir_all(dir)?;

    let snapshot = Snapshot {
        version: SNAPSHOT_VERSION,
        saved_at_ms,
        databases: databases.to_vec(),
    };
    let encoded = bincode::serialize(&snapshot)?;

    let final_path = snapshot_path(dir, name);
    let tmp_path = dir.join(format!("{name}.rdb.tmp"));

    let mut file = std::fs::File::create(&tmp_path)?;
    file.write_all(&encoded)?;
    file.sync_all()?;
    std::fs::rename(&tmp_path, &final_path)?;

    info!(path = ?final_path, bytes = encoded.len(), "wrote snapshot");
    Ok(())
}

/// Loads `<dir>/<name>.rdb` if it exists. Returns `None` when there is no
/// snapshot yet, which is the normal state on a fresh data directory.
pub fn load(dir: &Path, name: &str) -> Result<Option<(Vec<Database>, u64)>> {
    let path = snapshot_path(dir, name);
    if !path.exists() {
        return Ok(None);
    }

    let bytes = std::fs::read(&path)?;
    let snapshot: Snapshot = bincode::deserialize(&bytes)
        .map_err(|err| format!("corrupt snapshot at {path:?}: {err}"))?;

    if snapshot.version != SNAPSHOT_VERSION {
        return Err(format!(
            "snapshot at {path:?} has version {}, expected {SNAPSHOT_VERSION}",
            snapshot.version
        )
        .into());
    }

    info!(path = ?path, databases = snapshot.databases.len(), "loaded snapshot");
    Ok(Some((snapshot.databases, snapshot.saved_at_ms)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_an_empty_dataset() {
        let dir = std::env::temp_dir().join(format!("mapuche-snapshot-test-{}", std::process::id()));
        let databases = vec![Database::default()];

        save(&dir, "test", &databases, 1).unwrap();
        let (loaded, saved_at_ms) = load(&dir, "test").unwrap().expect("snapshot should exist");

        assert_eq!(saved_at_ms, 1);
        assert_eq!(loaded.len(), 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_snapshot_is_not_an_error() {
        let dir = std::env::temp_dir().join("mapuche-snapshot-test-missing");
        assert!(load(&dir, "nonexistent").unwrap().is_none());
    }
}
