//! A stand-in glider for bench work without a vehicle: answers heading
//! reads with noisy samples around a settable heading and the mag-var
//! query with a canned value. Useful for dry-running the session loop
//! and for exercising it in tests.

use std::f64::consts::TAU;

use log::debug;
use rand::prelude::*;

use crate::channel::{ChannelError, GliderChannel};
use crate::observation::Radian;

/// Pretend glider. Point it somewhere with [`SimChannel::set_heading`]
/// and it will report samples scattered around that heading.
pub struct SimChannel {
    heading_rad: Radian,
    noise: f64,
    mag_var: Radian,
    commands: Vec<String>,
}

impl SimChannel {
    /// A simulated glider pointed at `heading_deg` true-ish degrees,
    /// with `noise` radians of scatter and `mag_var` radians of stored
    /// magnetic variation (correction sign).
    pub fn new(heading_deg: f64, noise: f64, mag_var: Radian) -> Self {
        SimChannel {
            heading_rad: heading_deg.to_radians(),
            noise,
            mag_var,
            commands: Vec::new(),
        }
    }

    /// Rotates the pretend pedestal.
    pub fn set_heading(&mut self, heading_deg: f64) {
        self.heading_rad = heading_deg.to_radians();
    }

    /// Every command written so far, oldest first.
    pub fn commands(&self) -> &[String] {
        &self.commands
    }
}

impl GliderChannel for SimChannel {
    fn write_command(&mut self, command: &str) -> Result<(), ChannelError> {
        debug!("sim glider received command: {}", command);
        self.commands.push(command.to_string());
        Ok(())
    }

    fn read_headings(&mut self, count: usize) -> Result<Vec<Radian>, ChannelError> {
        let mut rng = thread_rng();
        let headings = (0..count)
            .map(|_| {
                let jitter = if self.noise > 0.0 {
                    rng.gen_range(-self.noise..self.noise)
                } else {
                    0.0
                };
                (self.heading_rad + jitter).rem_euclid(TAU)
            })
            .collect();
        Ok(headings)
    }

    fn get_mag_var(&mut self) -> Result<Radian, ChannelError> {
        self.commands.push("get m_gps_mag_var".to_string());
        Ok(self.mag_var)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_scatter_around_the_set_heading() {
        let mut sim = SimChannel::new(90.0, 0.01, 0.0);
        let samples = sim.read_headings(20).unwrap();
        assert_eq!(samples.len(), 20);
        let center = 90.0_f64.to_radians();
        for s in samples {
            assert!((s - center).abs() < 0.01 + 1e-12);
        }
    }

    #[test]
    fn zero_noise_is_deterministic() {
        let mut sim = SimChannel::new(180.0, 0.0, 0.0);
        let samples = sim.read_headings(3).unwrap();
        assert_eq!(samples.len(), 3);
        for s in samples {
            assert!((s - std::f64::consts::PI).abs() < 1e-12);
        }
    }
}
