//! Rendering of finished observations: the per-sample console readout,
//! the accumulated table, and the delimited text export.
//!
//! Everything here consumes [`SessionData`] read-only, in ascending
//! pedestal-heading order.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::context::RunContext;
use crate::observation::{CompassObservation, SessionData};

/// Console tables print at most this many observations side by side so
/// lines do not wrap on a standard terminal.
const COLUMNS_PER_BLOCK: usize = 6;

fn fmt_pedestal(o: &CompassObservation) -> String {
    format!("{:6}", o.pedestal_deg)
}

fn fmt_glider_true(o: &CompassObservation) -> String {
    format!("{:6.0}", o.glider_true_deg)
}

fn fmt_mag(o: &CompassObservation) -> String {
    format!("{:6.2}", o.mag_deg)
}

fn fmt_true(o: &CompassObservation) -> String {
    format!("{:6.2}", o.true_deg)
}

fn fmt_error(o: &CompassObservation) -> String {
    format!("{:6.2}", o.error_deg)
}

/// Row headers and per-observation formatters, in display order.
const ROWS: [(&str, fn(&CompassObservation) -> String); 5] = [
    ("Pedestal Heading:", fmt_pedestal),
    ("Glider True Heading:", fmt_glider_true),
    ("Compass Magnetic Reading:", fmt_mag),
    ("Compass True Heading:", fmt_true),
    ("Error:", fmt_error),
];

fn header_width() -> usize {
    ROWS.iter().map(|(header, _)| header.len()).max().unwrap_or(0)
}

fn write_values_line(
    out: &mut impl Write,
    offset_deg: f64,
    mag_var_rad: f64,
) -> io::Result<()> {
    writeln!(
        out,
        "Offset: {:.1}; Magnetic Declination: {:.2}",
        offset_deg,
        mag_var_rad.to_degrees()
    )
}

fn write_block(
    out: &mut impl Write,
    block: &[&CompassObservation],
) -> io::Result<()> {
    let width = header_width();
    for (header, value) in ROWS {
        write!(out, "{:>width$}", header, width = width)?;
        for obs in block {
            write!(out, " {}", value(obs))?;
        }
        writeln!(out)?;
    }
    let n_samples = block.iter().map(|o| o.samples_rad.len()).max().unwrap_or(0);
    write!(out, "{:>width$}", "Data:", width = width)?;
    for row in 0..n_samples {
        if row > 0 {
            write!(out, "{}", " ".repeat(width))?;
        }
        for obs in block {
            match obs.samples_rad.get(row) {
                Some(sample) => write!(out, " {:6.2}", sample)?,
                None => write!(out, "       ")?,
            }
        }
        writeln!(out)?;
    }
    writeln!(out)
}

/// Renders the readout for a single completed pedestal point.
pub fn render_observation(
    out: &mut impl Write,
    obs: &CompassObservation,
    offset_deg: f64,
    mag_var_rad: f64,
) -> io::Result<()> {
    write_values_line(out, offset_deg, mag_var_rad)?;
    write_block(out, &[obs])
}

/// Renders the accumulated table, six observations per block.
pub fn render_table(
    out: &mut impl Write,
    data: &SessionData,
    offset_deg: f64,
) -> io::Result<()> {
    write_values_line(out, offset_deg, data.mag_var)?;
    let all: Vec<&CompassObservation> = data.observations.values().collect();
    for block in all.chunks(COLUMNS_PER_BLOCK) {
        write_block(out, block)?;
    }
    Ok(())
}

/// Prints a single observation's readout to stdout.
pub fn print_observation(
    obs: &CompassObservation,
    offset_deg: f64,
    mag_var_rad: f64,
) -> io::Result<()> {
    render_observation(&mut io::stdout().lock(), obs, offset_deg, mag_var_rad)
}

/// Prints the accumulated table to stdout.
pub fn print_table(data: &SessionData, offset_deg: f64) -> io::Result<()> {
    render_table(&mut io::stdout().lock(), data, offset_deg)
}

/// Writes the delimited export next to wherever the operator ran the
/// check from, and returns its path.
pub fn write_csv(
    data: &SessionData,
    ctx: &RunContext,
    offset_deg: f64,
    dir: &Path,
) -> io::Result<PathBuf> {
    let path = dir.join(format!("{}.csv", ctx.export_stem()));
    let mut out = File::create(&path)?;
    writeln!(
        out,
        "{},Compass Check,{},{},Offset:,{:.0} deg,Declination:,{:.2} deg",
        ctx.vehicle,
        ctx.date,
        ctx.clock,
        offset_deg,
        data.mag_var.to_degrees()
    )?;
    writeln!(out)?;
    let all: Vec<&CompassObservation> = data.observations.values().collect();
    for (header, value) in ROWS {
        write!(out, "{}", header)?;
        for obs in &all {
            write!(out, ",{}", value(obs).trim())?;
        }
        writeln!(out)?;
    }
    write!(out, "Data:")?;
    let n_samples = all.iter().map(|o| o.samples_rad.len()).max().unwrap_or(0);
    for row in 0..n_samples {
        for obs in &all {
            match obs.samples_rad.get(row) {
                Some(sample) => write!(out, ",{:.2}", sample)?,
                None => write!(out, ",")?,
            }
        }
        writeln!(out)?;
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::CompassObservation;
    use chrono::{TimeZone, Utc};

    fn sample_data() -> SessionData {
        let mut data = SessionData {
            observations: Default::default(),
            mag_var: -0.232,
        };
        for deg in [90u16, 0, 180] {
            data.observations.insert(
                deg,
                CompassObservation::derive(deg, vec![0.11, 0.12], -0.232, 0.0),
            );
        }
        data
    }

    #[test]
    fn table_lists_headings_in_ascending_order() {
        let mut buf = Vec::new();
        render_table(&mut buf, &sample_data(), 0.0).unwrap();
        let rendered = String::from_utf8(buf).unwrap();
        let line = rendered
            .lines()
            .find(|l| l.contains("Pedestal Heading:"))
            .unwrap();
        let p0 = line.find("  0").unwrap();
        let p90 = line.find("90").unwrap();
        let p180 = line.find("180").unwrap();
        assert!(p0 < p90 && p90 < p180, "unexpected order in {line:?}");
    }

    #[test]
    fn observation_readout_carries_the_error() {
        let obs = CompassObservation::derive(10, vec![0.1, 0.1], 0.0, 0.0);
        let mut buf = Vec::new();
        render_observation(&mut buf, &obs, 0.0, 0.0).unwrap();
        let rendered = String::from_utf8(buf).unwrap();
        assert!(rendered.contains("Error:"));
        assert!(rendered.contains("Magnetic Declination: 0.00"));
    }

    #[test]
    fn csv_carries_the_numeric_content() {
        let dir = tempfile::tempdir().unwrap();
        let t = Utc.with_ymd_and_hms(2014, 7, 9, 14, 32, 5).unwrap();
        let ctx = RunContext::new("unit_540", t, dir.path());
        let path = write_csv(&sample_data(), &ctx, 1.0, dir.path()).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "unit_540_cc_2014-07-09_1432.csv"
        );
        let contents = std::fs::read_to_string(path).unwrap();
        assert!(contents.starts_with("unit_540,Compass Check,2014-07-09,14:32"));
        assert!(contents.contains("Pedestal Heading:,0,90,180"));
        assert!(contents.contains("Data:,0.11,0.11,0.11"));
        assert!(contents.contains("\n,0.12,0.12,0.12"));
    }
}
