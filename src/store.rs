//! Crash-safe persistence for an in-progress compass check.
//!
//! Every completed pedestal point triggers a full-state snapshot write,
//! so a crash between heading prompts loses at most the batch that was
//! in flight. The snapshot is keyed by vehicle and date through
//! [`RunContext`], serialized with [serde] and [ron], and deleted only
//! on a clean `q` exit.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use log::{info, warn};

use crate::context::RunContext;
use crate::observation::SessionData;

/// Things that can go wrong while writing a snapshot. Read-side
/// failures are deliberately not represented; a snapshot that cannot be
/// read is treated as absent.
#[derive(Debug)]
pub enum StoreError {
    /// Filesystem trouble creating the snapshot directory or file.
    Io(std::io::Error),
    /// Serialization of the session state failed.
    Ron(ron::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StoreError::Io(error) => write!(f, "snapshot io error: {}", error),
            StoreError::Ron(error) => write!(f, "snapshot encode error: {}", error),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        StoreError::Io(value)
    }
}

impl From<ron::Error> for StoreError {
    fn from(value: ron::Error) -> Self {
        StoreError::Ron(value)
    }
}

/// Durable snapshot of a session's [`SessionData`] at a fixed
/// per-vehicle, per-date path.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
    root: PathBuf,
}

impl SnapshotStore {
    /// Binds a store to the snapshot location named by `ctx`.
    pub fn new(ctx: &RunContext) -> Self {
        SnapshotStore {
            path: ctx.snapshot_path(),
            root: ctx.snapshot_root().to_path_buf(),
        }
    }

    /// Whether a snapshot exists for this vehicle and date.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Loads the prior snapshot, or `None` if there is none or it is
    /// unreadable. An unreadable snapshot is logged and otherwise
    /// treated the same as a missing one.
    pub fn load(&self) -> Option<SessionData> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return None,
        };
        match ron::from_str(&raw) {
            Ok(data) => {
                info!("loaded saved data from {}", self.path.display());
                Some(data)
            }
            Err(error) => {
                warn!(
                    "snapshot {} exists but did not decode ({}); starting fresh",
                    self.path.display(),
                    error
                );
                None
            }
        }
    }

    /// Writes a full-state snapshot. Failures propagate: losing the
    /// durability guarantee silently would be worse than stopping.
    pub fn save(&self, data: &SessionData) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root)?;
        let encoded = ron::ser::to_string(data)?;
        fs::write(&self.path, encoded)?;
        Ok(())
    }

    /// Removes the snapshot. Idempotent: deleting a snapshot that is
    /// already gone is not an error.
    pub fn delete(&self) {
        if let Err(error) = fs::remove_file(&self.path) {
            if error.kind() != std::io::ErrorKind::NotFound {
                warn!("could not remove snapshot {}: {}", self.path.display(), error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::CompassObservation;
    use chrono::{TimeZone, Utc};

    fn test_ctx(root: &std::path::Path) -> RunContext {
        let t = Utc.with_ymd_and_hms(2014, 7, 9, 14, 32, 5).unwrap();
        RunContext::new("unit_540", t, root)
    }

    fn sample_data() -> SessionData {
        let mut data = SessionData {
            observations: Default::default(),
            mag_var: -0.232,
        };
        for deg in [0u16, 90, 275] {
            data.observations.insert(
                deg,
                CompassObservation::derive(deg, vec![0.11, 0.12, 0.13], -0.232, 1.5),
            );
        }
        data
    }

    #[test]
    fn round_trips_field_for_field() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(&test_ctx(dir.path()));
        let data = sample_data();

        assert!(!store.exists());
        store.save(&data).unwrap();
        assert!(store.exists());
        assert_eq!(store.load(), Some(data));
    }

    #[test]
    fn missing_snapshot_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(&test_ctx(dir.path()));
        assert_eq!(store.load(), None);
    }

    #[test]
    fn corrupt_snapshot_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(dir.path());
        let store = SnapshotStore::new(&ctx);
        fs::create_dir_all(ctx.snapshot_root()).unwrap();
        fs::write(ctx.snapshot_path(), "not a snapshot").unwrap();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn delete_twice_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(&test_ctx(dir.path()));
        store.save(&sample_data()).unwrap();
        store.delete();
        store.delete();
        assert!(!store.exists());
    }
}
