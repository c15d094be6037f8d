//! Angle arithmetic for the compass check: averaging a batch of raw
//! heading samples, applying the magnetic declination, and folding the
//! difference between the commanded and measured true headings into a
//! signed error.
//!
//! All of these functions are pure so the session logic stays testable
//! without a glider on the bench.

use std::f64::consts::TAU;
use std::fmt;

use crate::observation::Radian;

/// Returned when a heading, offset, or declination value falls outside
/// the accepted compass domain of -180 to 360 degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct CompassRangeError {
    /// The offending value, in degrees.
    pub value: f64,
}

impl fmt::Display for CompassRangeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} is not in a valid compass range of -180 to 180 degrees, or 0 to 360 degrees",
            self.value
        )
    }
}

impl std::error::Error for CompassRangeError {}

/// Checks that a heading-like value (heading, offset, or declination in
/// degrees) is within -180 to 180 or 0 to 360 degrees.
pub fn check_heading(value: f64) -> Result<(), CompassRangeError> {
    if (-180.0..=360.0).contains(&value) {
        Ok(())
    } else {
        Err(CompassRangeError { value })
    }
}

/// Arithmetic mean of a batch of heading samples in radians.
///
/// No wraparound correction is applied; within a single pedestal point
/// the spread is assumed small and far from the 0/2pi boundary.
pub fn average_heading(samples: &[Radian]) -> Radian {
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Corrects an averaged magnetic heading by the magnetic declination,
/// keeping the result in [0, 2pi).
pub fn true_heading(avg_mag: Radian, mag_var: Radian) -> Radian {
    (avg_mag + mag_var).rem_euclid(TAU)
}

/// Signed error between the commanded and measured true headings, both
/// in degrees, folded into (-180, 180].
pub fn heading_error(commanded_deg: f64, measured_deg: f64) -> f64 {
    let folded = (commanded_deg - measured_deg + 180.0).rem_euclid(360.0) - 180.0;
    if folded == -180.0 {
        180.0
    } else {
        folded
    }
}
