//! Entry point for the compass accuracy check.

use clap::Parser;
use compass_check::{
    args::CheckArgs,
    channel::{ChannelTuning, GliderChannel},
    compass_math::check_heading,
    console::alert,
    context::RunContext,
    dock_channel::DockChannel,
    export,
    observation::SessionData,
    port_picker,
    serial_channel::SerialChannel,
    session::{CalibrationSession, SessionConfig},
    store::SnapshotStore,
};
use log::LevelFilter;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

// Example:
// cargo run --bin compass_check --
//                               --offset  1.5
//                               --samples 10
//                               dockserver.example.org unit_540

fn main() -> ExitCode {
    let args = CheckArgs::parse();

    let mut logging = env_logger::Builder::from_default_env();
    if args.debug {
        logging.filter_level(LevelFilter::Debug);
    } else if args.verbose {
        logging.filter_level(LevelFilter::Info);
    }
    logging.init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(mesg) => {
            alert(&mesg);
            ExitCode::FAILURE
        }
    }
}

fn run(args: CheckArgs) -> Result<(), String> {
    if args.list_ports {
        return port_picker::print_ports()
            .map_err(|error| format!("could not list serial ports: {}", error));
    }

    let vehicle = args
        .vehicle
        .clone()
        .ok_or("compass check needs the glider name; see --help")?;
    if args.offset != 0.0 {
        check_heading(args.offset).map_err(|error| error.to_string())?;
    }

    println!("Compass Accuracy Check v{}", env!("CARGO_PKG_VERSION"));

    let ctx = RunContext::now(&vehicle, snapshot_root());
    let store = SnapshotStore::new(&ctx);
    let config = SessionConfig {
        offset_deg: args.offset,
        sample_count: args.samples,
        mag_var_override: args.magvar,
    };
    let tuning = ChannelTuning::default();

    let data = if args.serial {
        let port = match args.host_or_port.clone() {
            Some(port) => PathBuf::from(port),
            None => port_picker::pick_port()
                .map_err(|error| format!("could not list serial ports: {}", error))?
                .ok_or("no serial port chosen")?,
        };
        let channel = SerialChannel::open(&port.to_string_lossy(), tuning, args.verbose)
            .map_err(|error| error.to_string())?;
        drive(channel, io::stdin().lock(), store, config)?
    } else {
        let host = args
            .host_or_port
            .clone()
            .ok_or("compass check needs a dockserver hostname; see --help")?;
        let channel = DockChannel::connect(&host, &vehicle, tuning, args.verbose)
            .map_err(|error| error.to_string())?;
        drive(channel, io::stdin().lock(), store, config)?
    };

    if data.observations.is_empty() {
        println!("No observations were collected; nothing to export.");
        return Ok(());
    }
    export::print_table(&data, args.offset).map_err(|error| error.to_string())?;
    let csv_path = export::write_csv(&data, &ctx, args.offset, Path::new("."))
        .map_err(|error| format!("could not write export: {}", error))?;
    println!("Wrote {}", csv_path.display());
    Ok(())
}

fn drive<C: GliderChannel>(
    channel: C,
    input: impl BufRead,
    store: SnapshotStore,
    config: SessionConfig,
) -> Result<SessionData, String> {
    CalibrationSession::new(channel, input, store, config)
        .run()
        .map_err(|error| error.to_string())
}

/// Snapshots live under the operator's home directory so an aborted
/// check can be resumed from anywhere.
fn snapshot_root() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cc")
}
