//! Identity of one run of the compass check: which vehicle, and when.
//!
//! The timestamp is captured once at startup and handed to whichever
//! component needs it, so snapshot paths and export filenames agree
//! with each other and nothing reads the clock behind the session's
//! back.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// Names and timestamps shared by the persistence and export layers.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Vehicle under test.
    pub vehicle: String,
    /// Calendar date of the run, `YYYY-MM-DD`.
    pub date: String,
    /// Wall-clock time of the run, `HHMM`, used in export filenames.
    pub stamp: String,
    /// Wall-clock time of the run, `HH:MM`, used in rendered output.
    pub clock: String,
    snapshot_root: PathBuf,
}

impl RunContext {
    /// Builds a context for `vehicle` at the given instant, with
    /// snapshots kept under `snapshot_root`.
    pub fn new(vehicle: &str, now: DateTime<Utc>, snapshot_root: impl Into<PathBuf>) -> Self {
        RunContext {
            vehicle: vehicle.to_string(),
            date: now.format("%Y-%m-%d").to_string(),
            stamp: now.format("%H%M").to_string(),
            clock: now.format("%H:%M").to_string(),
            snapshot_root: snapshot_root.into(),
        }
    }

    /// Builds a context for `vehicle` at the current instant.
    pub fn now(vehicle: &str, snapshot_root: impl Into<PathBuf>) -> Self {
        Self::new(vehicle, Utc::now(), snapshot_root)
    }

    /// Where this vehicle's snapshot for this date lives.
    pub fn snapshot_path(&self) -> PathBuf {
        self.snapshot_root
            .join(format!("{}_cc_{}.ron", self.vehicle, self.date))
    }

    /// Directory holding the snapshot file.
    pub fn snapshot_root(&self) -> &Path {
        &self.snapshot_root
    }

    /// Base name for export artifacts, without an extension.
    pub fn export_stem(&self) -> String {
        format!("{}_cc_{}_{}", self.vehicle, self.date, self.stamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn paths_and_stems_agree_on_the_date() {
        let t = Utc.with_ymd_and_hms(2014, 7, 9, 14, 32, 5).unwrap();
        let ctx = RunContext::new("unit_540", t, "/tmp/cc");
        assert_eq!(
            ctx.snapshot_path(),
            PathBuf::from("/tmp/cc/unit_540_cc_2014-07-09.ron")
        );
        assert_eq!(ctx.export_stem(), "unit_540_cc_2014-07-09_1432");
        assert_eq!(ctx.clock, "14:32");
    }
}
