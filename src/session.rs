//! The interactive calibration session: prompt for a pedestal heading,
//! acquire a sample batch over the channel, derive the observation,
//! snapshot the whole session, repeat until the operator quits.
//!
//! The session owns all mutable state. The channel layer only ever
//! hands parsed values back into this thread, and the store only ever
//! sees full-state snapshots, so a crash between heading prompts loses
//! at most the batch that was in flight.

use std::fmt;
use std::io::{self, BufRead};

use log::{debug, info};

use crate::channel::{ChannelError, GliderChannel};
use crate::compass_math::check_heading;
use crate::console::{alert, prompt};
use crate::export;
use crate::observation::{CompassObservation, Radian, SessionData};
use crate::store::{SnapshotStore, StoreError};

/// Session-constant settings fixed before acquisition starts.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Mechanical offset between glider and pedestal reference, degrees.
    pub offset_deg: f64,
    /// Heading samples per pedestal point.
    pub sample_count: usize,
    /// Operator-supplied declination in radians, skipping acquisition.
    pub mag_var_override: Option<Radian>,
}

/// Anything that can end a session early.
#[derive(Debug)]
pub enum SessionError {
    /// The glider link failed.
    Channel(ChannelError),
    /// A snapshot write failed; durability is gone, so the session is.
    Store(StoreError),
    /// The operator input or console stream failed.
    Io(io::Error),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SessionError::Channel(error) => write!(f, "{}", error),
            SessionError::Store(error) => write!(f, "{}", error),
            SessionError::Io(error) => write!(f, "console error: {}", error),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<ChannelError> for SessionError {
    fn from(value: ChannelError) -> Self {
        SessionError::Channel(value)
    }
}

impl From<StoreError> for SessionError {
    fn from(value: StoreError) -> Self {
        SessionError::Store(value)
    }
}

impl From<io::Error> for SessionError {
    fn from(value: io::Error) -> Self {
        SessionError::Io(value)
    }
}

enum PedestalReply {
    Heading(u16),
    Quit,
}

/// One interactive compass check. Generic over the channel and the
/// operator input stream so the whole loop can be driven from a script.
pub struct CalibrationSession<C: GliderChannel, In: BufRead> {
    channel: C,
    input: In,
    store: SnapshotStore,
    config: SessionConfig,
    data: SessionData,
}

impl<C: GliderChannel, In: BufRead> CalibrationSession<C, In> {
    /// Builds a session around an already-verified channel.
    pub fn new(channel: C, input: In, store: SnapshotStore, config: SessionConfig) -> Self {
        CalibrationSession {
            channel,
            input,
            store,
            config,
            data: SessionData::default(),
        }
    }

    /// Drives the session to completion and hands back everything that
    /// was collected. A clean `q` exit deletes the snapshot; any error
    /// leaves it on disk for the next run to resume from.
    pub fn run(mut self) -> Result<SessionData, SessionError> {
        // A prior snapshot for this vehicle and date already knows the
        // declination, so acquisition is skipped entirely.
        let resumed = match self.store.load() {
            Some(prior) => {
                println!("Loaded previously saved data.");
                export::print_table(&prior, self.config.offset_deg)?;
                self.data = prior;
                true
            }
            None => false,
        };
        if !resumed {
            self.data.mag_var = match self.config.mag_var_override {
                Some(value) => {
                    debug!("using operator-supplied magnetic declination");
                    value
                }
                None => self.channel.get_mag_var()?,
            };
        }

        self.confirm_config()?;

        println!("\nMove glider to initial heading");
        loop {
            match self.pedestal_prompt()? {
                PedestalReply::Quit => {
                    self.store.delete();
                    break;
                }
                PedestalReply::Heading(pedestal_deg) => {
                    self.acquire_point(pedestal_deg)?;
                    println!("\nMove glider to next heading");
                }
            }
        }
        Ok(self.data)
    }

    /// Shows the offset and declination in use and lets the operator
    /// edit either before acquisition starts. Out-of-range or garbled
    /// replies re-prompt; they never end the session.
    fn confirm_config(&mut self) -> Result<(), SessionError> {
        println!("Using values:");
        println!("  offset = {:.1} deg", self.config.offset_deg);
        println!(
            "  magnetic declination = {:.2} deg ({:.3} rad)",
            self.data.mag_var.to_degrees(),
            self.data.mag_var
        );
        let reply = prompt(
            &mut self.input,
            "Press enter to continue with these values or e to edit them\n>> ",
        )?;
        if reply == "e" {
            if let Some(offset) = self.edit_value("offset")? {
                self.config.offset_deg = offset;
            }
            if let Some(declination_deg) = self.edit_value("mag dec")? {
                self.data.mag_var = declination_deg.to_radians();
            }
        }
        Ok(())
    }

    fn edit_value(&mut self, name: &str) -> Result<Option<f64>, SessionError> {
        loop {
            let reply = prompt(
                &mut self.input,
                &format!(
                    "Enter a new {name} value in degrees, or press enter to \
                     keep the current value\n{name} = "
                ),
            )?;
            if reply.is_empty() {
                return Ok(None);
            }
            let value: f64 = match reply.parse() {
                Ok(value) => value,
                Err(_) => {
                    alert("Value not a valid number");
                    continue;
                }
            };
            if check_heading(value).is_err() {
                alert("Not in the valid range of -180 to 360 degrees.");
                continue;
            }
            return Ok(Some(value));
        }
    }

    fn pedestal_prompt(&mut self) -> Result<PedestalReply, SessionError> {
        loop {
            let reply = prompt(
                &mut self.input,
                "\nOnce glider is in position and magnetic fields are away,\n\
                 enter the pedestal heading in positive degrees\nand hit \
                 return to continue.\nType d to view data and q to quit:\n>> ",
            )?;
            match reply.as_str() {
                "q" => return Ok(PedestalReply::Quit),
                "d" => export::print_table(&self.data, self.config.offset_deg)?,
                other => match other.parse::<i64>() {
                    Ok(deg) if (0..=360).contains(&deg) => {
                        return Ok(PedestalReply::Heading(deg as u16))
                    }
                    Ok(_) => alert("Enter a valid compass heading (0-360 degrees)"),
                    Err(_) => alert("Answer is not a valid number."),
                },
            }
        }
    }

    /// One pedestal point: sample, derive, record, snapshot.
    fn acquire_point(&mut self, pedestal_deg: u16) -> Result<(), SessionError> {
        info!(
            "sampling {} headings at pedestal {}",
            self.config.sample_count, pedestal_deg
        );
        let samples = self.channel.read_headings(self.config.sample_count)?;
        let observation = CompassObservation::derive(
            pedestal_deg,
            samples,
            self.data.mag_var,
            self.config.offset_deg,
        );
        export::print_observation(&observation, self.config.offset_deg, self.data.mag_var)?;
        self.data.observations.insert(pedestal_deg, observation);
        self.store.save(&self.data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RunContext;
    use crate::sim_channel::SimChannel;
    use chrono::{TimeZone, Utc};
    use std::io::Cursor;
    use std::path::Path;

    fn test_ctx(root: &Path) -> RunContext {
        let t = Utc.with_ymd_and_hms(2014, 7, 9, 14, 32, 5).unwrap();
        RunContext::new("unit_540", t, root)
    }

    fn config() -> SessionConfig {
        SessionConfig {
            offset_deg: 0.0,
            sample_count: 3,
            mag_var_override: Some(0.0),
        }
    }

    fn script(s: &str) -> Cursor<Vec<u8>> {
        Cursor::new(s.as_bytes().to_vec())
    }

    /// A channel that must not be used at all; resuming from a snapshot
    /// is supposed to skip every acquisition step until sampling.
    struct UntouchableChannel;

    impl GliderChannel for UntouchableChannel {
        fn write_command(&mut self, _command: &str) -> Result<(), ChannelError> {
            panic!("channel written during resume");
        }
        fn read_headings(&mut self, _count: usize) -> Result<Vec<Radian>, ChannelError> {
            panic!("headings read during resume");
        }
        fn get_mag_var(&mut self) -> Result<Radian, ChannelError> {
            panic!("magnetic variation re-acquired despite a snapshot");
        }
    }

    #[test]
    fn full_pass_collects_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(dir.path());
        let sim = SimChannel::new(90.0, 0.0, 0.0);
        let session = CalibrationSession::new(
            sim,
            script("\n90\nq\n"),
            SnapshotStore::new(&ctx),
            config(),
        );
        let data = session.run().unwrap();
        assert_eq!(data.observations.len(), 1);
        let obs = &data.observations[&90];
        assert_eq!(obs.samples_rad.len(), 3);
        assert!(obs.error_deg.abs() < 1e-9);
        // Clean exit deletes the snapshot.
        assert!(!SnapshotStore::new(&ctx).exists());
    }

    #[test]
    fn rejected_input_reprompts_without_losing_progress() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(dir.path());
        let sim = SimChannel::new(45.0, 0.0, 0.0);
        let session = CalibrationSession::new(
            sim,
            script("\nbanana\n400\n-1\n45\nd\nq\n"),
            SnapshotStore::new(&ctx),
            config(),
        );
        let data = session.run().unwrap();
        assert_eq!(data.observations.len(), 1);
        assert!(data.observations.contains_key(&45));
    }

    #[test]
    fn config_edit_applies_offset_and_declination() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(dir.path());
        let sim = SimChannel::new(0.0, 0.0, 0.0);
        // Edit: offset first (500 rejected, then 12.5), declination kept.
        let session = CalibrationSession::new(
            sim,
            script("e\n500\n12.5\n\n0\nq\n"),
            SnapshotStore::new(&ctx),
            config(),
        );
        let data = session.run().unwrap();
        let obs = &data.observations[&0];
        assert!((obs.error_deg - 12.5).abs() < 1e-9);
        assert!((obs.glider_true_deg - 12.5).abs() < 1e-9);
    }

    #[test]
    fn interrupted_session_leaves_a_snapshot_behind() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(dir.path());
        let sim = SimChannel::new(10.0, 0.0, 0.0);
        let session = CalibrationSession::new(
            sim,
            // Input ends after one point, as if the console died.
            script("\n10\n"),
            SnapshotStore::new(&ctx),
            config(),
        );
        match session.run() {
            Err(SessionError::Io(_)) => {}
            other => panic!("expected Io error, got {:?}", other),
        }
        let saved = SnapshotStore::new(&ctx).load().expect("snapshot survives");
        assert!(saved.observations.contains_key(&10));
    }

    #[test]
    fn resume_skips_mag_var_acquisition() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(dir.path());

        // First run dies after completing one pedestal point.
        let sim = SimChannel::new(10.0, 0.0, -0.05);
        let first = CalibrationSession::new(
            sim,
            script("\n10\n"),
            SnapshotStore::new(&ctx),
            SessionConfig {
                mag_var_override: Some(-0.05),
                ..config()
            },
        );
        assert!(first.run().is_err());

        // Second run must load the snapshot and never touch the channel
        // before sampling; it confirms config and quits immediately.
        let second = CalibrationSession::new(
            UntouchableChannel,
            script("\nq\n"),
            SnapshotStore::new(&ctx),
            SessionConfig {
                mag_var_override: None,
                ..config()
            },
        );
        let data = second.run().unwrap();
        assert!((data.mag_var + 0.05).abs() < 1e-12);
        assert!(data.observations.contains_key(&10));
    }
}
