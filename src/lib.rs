//! Compass accuracy check for Slocum electric gliders.
//!
//! An operator rotates a glider on a pedestal to a sequence of known
//! true headings. For each one, this program samples the vehicle's
//! self-reported compass over a live telemetry link, averages the
//! samples, corrects for magnetic declination and a fixed mechanical
//! offset, and records the angular error against the commanded heading.
//! Partial sessions survive a crash: every completed pedestal point
//! re-snapshots the whole session to disk, and the next run on the same
//! day resumes from it.
//!
//! The telemetry link comes in two flavors behind one trait: a direct
//! serial connection through a Freewave RF modem, and a dockserver TCP
//! connection with a background receiver feeding a line queue. Both
//! treat the glider as "write bytes, receive newline-terminated text";
//! anything meeting that contract would do.

#![warn(missing_docs)]
pub mod args;
pub mod channel;
pub mod compass_math;
pub mod console;
pub mod context;
pub mod dock_channel;
pub mod export;
pub mod observation;
pub mod port_picker;
pub mod serial_channel;
pub mod session;
pub mod sim_channel;
pub mod store;
pub mod telemetry;
