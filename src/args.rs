// Commandline argument parser using clap for the compass check

use clap::Parser;

/// Glider compass accuracy check: compares the vehicle's internal
/// compass heading against known true headings while an operator
/// rotates it on a pedestal. Talks to the glider over a dockserver
/// connection by default, or over a serial port with a Freewave modem
/// attached when `--serial` is given.
#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct CheckArgs {
    /// Dockserver hostname, or the serial port device with --serial.
    /// In serial mode this may be omitted to pick a port interactively
    pub host_or_port: Option<String>,

    /// Name of the glider under test
    pub vehicle: Option<String>,

    /// Connect through an RF modem on a local serial port instead of a
    /// dockserver
    #[arg(short = 's', long = "serial")]
    pub serial: bool,

    /// Offset between the glider's compass heading and the pedestal
    /// heading, in degrees. Positive if the glider is rotated right of
    /// the pedestal heading direction
    #[arg(short = 'o', long = "offset", default_value_t = 0.0, allow_negative_numbers = true)]
    pub offset: f64,

    /// Magnetic variation/declination in radians, entered with the
    /// opposite sign of what the glider prints. Skips asking the glider
    #[arg(short = 'm', long = "magvar", allow_negative_numbers = true)]
    pub magvar: Option<f64>,

    /// Heading samples to average per pedestal position
    #[arg(short = 'n', long = "samples", default_value_t = 10)]
    pub samples: usize,

    /// Explicitly print program actions
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Print debug messages and tracebacks (development mode)
    #[arg(long)]
    pub debug: bool,

    /// List the serial ports available on this machine and exit
    #[arg(long = "list-ports")]
    pub list_ports: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_arguments_and_defaults() {
        let args =
            CheckArgs::parse_from(["compass_check", "dockserver.example.org", "unit_540"]);
        assert_eq!(args.host_or_port.as_deref(), Some("dockserver.example.org"));
        assert_eq!(args.vehicle.as_deref(), Some("unit_540"));
        assert!(!args.serial);
        assert_eq!(args.offset, 0.0);
        assert_eq!(args.samples, 10);
        assert_eq!(args.magvar, None);
    }

    #[test]
    fn serial_mode_with_options() {
        let args = CheckArgs::parse_from([
            "compass_check",
            "-s",
            "-o",
            "-2.5",
            "-n",
            "5",
            "/dev/ttyUSB0",
            "unit_540",
        ]);
        assert!(args.serial);
        assert_eq!(args.offset, -2.5);
        assert_eq!(args.samples, 5);
        assert_eq!(args.host_or_port.as_deref(), Some("/dev/ttyUSB0"));
    }
}
