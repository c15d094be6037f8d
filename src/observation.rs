//! Record types for a calibration session: one [`CompassObservation`]
//! per pedestal position, collected into [`SessionData`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::compass_math::{average_heading, heading_error, true_heading};

/// An angle in radians.
pub type Radian = f64;

/// The averaged, corrected result for one pedestal heading. Built once
/// when the sample batch for that heading completes, then never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompassObservation {
    /// The commanded true heading of the pedestal, in degrees.
    pub pedestal_deg: u16,
    /// Pedestal heading plus the mechanical offset, wrapped to [0, 360).
    pub glider_true_deg: f64,
    /// The raw heading samples from the telemetry stream, in batch order.
    pub samples_rad: Vec<Radian>,
    /// Average magnetic heading over the batch, radians.
    pub mag_rad: Radian,
    /// Average magnetic heading over the batch, degrees.
    pub mag_deg: f64,
    /// Declination-corrected true heading, radians in [0, 2pi).
    pub true_rad: Radian,
    /// Declination-corrected true heading, degrees.
    pub true_deg: f64,
    /// Signed error against the commanded heading, degrees in (-180, 180].
    pub error_deg: f64,
}

impl CompassObservation {
    /// Derives the full observation record from a finished sample batch.
    pub fn derive(
        pedestal_deg: u16,
        samples_rad: Vec<Radian>,
        mag_var: Radian,
        offset_deg: f64,
    ) -> Self {
        let mag_rad = average_heading(&samples_rad);
        let glider_true = pedestal_deg as f64 + offset_deg;
        let true_rad = true_heading(mag_rad, mag_var);
        let true_deg = true_rad.to_degrees();
        let error_deg = heading_error(glider_true, true_deg);
        CompassObservation {
            pedestal_deg,
            glider_true_deg: glider_true.rem_euclid(360.0),
            mag_deg: mag_rad.to_degrees(),
            mag_rad,
            true_rad,
            true_deg,
            error_deg,
            samples_rad,
        }
    }
}

/// Everything a session accumulates: the observations keyed by pedestal
/// heading and the magnetic declination in use. The key ordering of the
/// map gives the presentation layer its ascending-heading iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    /// Completed observations, keyed and ordered by pedestal heading.
    pub observations: BTreeMap<u16, CompassObservation>,
    /// Magnetic declination applied to every observation, radians.
    pub mag_var: Radian,
}
