//! Parsers for the glider's line-oriented telemetry dialect.
//!
//! In lab mode with `report ++ m_heading` active, the glider prints a
//! line per cycle of the form:
//!
//! ```text
//! behavior surface_2: SUBSTATE 3 ->3 : sensor: m_heading = 4.783 rad
//! ```
//!
//! and answers a `get m_gps_mag_var` query with a line such as:
//!
//! ```text
//! sensor: m_gps_mag_var(rad) = -0.232 rad
//! ```
//!
//! Everything that does not match one of these shapes is noise as far as
//! the check is concerned and is left to the caller to echo or drop.

use nom::{
    bytes::complete::{tag, take_until},
    combinator::map,
    number::complete::double,
    sequence::{delimited, preceded, tuple},
    Finish, IResult,
};

use std::str::FromStr;

use crate::observation::Radian;

const HEADING_MARKER: &str = "m_heading = ";
const MAG_VAR_MARKER: &str = "m_gps_mag_var";

/// A telemetry line that carries a field the compass check cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    /// A compass heading report, in radians, as printed by the device.
    Heading(Radian),
    /// A reply to the magnetic-variation query, in radians, with the
    /// device's own sign convention (opposite of the correction sign).
    MagVar(Radian),
}

fn parse_heading(s: &str) -> IResult<&str, Radian> {
    preceded(
        tuple((take_until(HEADING_MARKER), tag(HEADING_MARKER))),
        map(tuple((double, tag(" rad"))), |(v, _)| v),
    )(s)
}

fn parse_mag_var(s: &str) -> IResult<&str, Radian> {
    preceded(
        tuple((take_until(MAG_VAR_MARKER), tag(MAG_VAR_MARKER))),
        delimited(
            tuple((take_until("= "), tag("= "))),
            double,
            tag(" rad"),
        ),
    )(s)
}

fn parse_event(s: &str) -> IResult<&str, TelemetryEvent> {
    // A heading line also contains an `= ... rad` clause, so the more
    // specific mag-var marker is tried first.
    if s.contains(MAG_VAR_MARKER) {
        map(parse_mag_var, TelemetryEvent::MagVar)(s)
    } else {
        map(parse_heading, TelemetryEvent::Heading)(s)
    }
}

impl FromStr for TelemetryEvent {
    type Err = nom::error::Error<String>;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parse_event(s).finish() {
            Ok((_remaining, event)) => Ok(event),
            Err(nom::error::Error { input, code }) => Err(nom::error::Error {
                input: input.to_string(),
                code,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_line_with_prefix() {
        let s = "behavior surface_2: SUBSTATE 3 ->3 : sensor: m_heading = 4.783 rad";
        assert_eq!(s.parse(), Ok(TelemetryEvent::Heading(4.783)));
    }

    #[test]
    fn bare_heading_line() {
        let s = "sensor: m_heading = 0.01 rad";
        assert_eq!(s.parse(), Ok(TelemetryEvent::Heading(0.01)));
    }

    #[test]
    fn mag_var_reply_negative() {
        let s = "sensor: m_gps_mag_var(rad) = -0.232 rad";
        assert_eq!(s.parse(), Ok(TelemetryEvent::MagVar(-0.232)));
    }

    #[test]
    fn mag_var_reply_not_mistaken_for_heading() {
        let s = "  m_gps_mag_var = 0.105 rad";
        assert_eq!(s.parse(), Ok(TelemetryEvent::MagVar(0.105)));
    }

    #[test]
    fn noise_lines_do_not_parse() {
        for s in [
            "GliderLAB v7.17",
            "behavior abend: waiting for gps fix",
            "m_heading reported without a value",
            "",
        ] {
            assert!(s.parse::<TelemetryEvent>().is_err(), "parsed noise: {s:?}");
        }
    }
}
