//! The direct, fully synchronous channel variant: a Freewave RF modem
//! on a local serial port, carrying the glider's console dialect.
//!
//! The glider must be set up so that the compass heading reports every
//! cycle (`report ++ m_heading`) and must be in GliderLAB. The
//! verification handshake checks for evidence of both before the
//! session is allowed to start sampling.

use std::io::{self, ErrorKind};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info};
use serial2::SerialPort;

use crate::channel::{ChannelError, ChannelTuning, GliderChannel, MAG_VAR_QUERY};
use crate::observation::Radian;
use crate::telemetry::TelemetryEvent;

const HEADING_EVIDENCE: &str = "m_heading";
const LAB_MODE_EVIDENCE: &str = "GliderLAB";
const VERIFY_TRIES: usize = 3;

/// The byte transport under a [`SerialChannel`]. The only operation
/// beyond `Read + Write` is discarding whatever the OS has buffered;
/// transports without a kernel-side buffer can keep the no-op default.
pub trait DirectTransport: io::Read + io::Write {
    /// Drops any bytes received but not yet read.
    fn discard_input(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl DirectTransport for SerialPort {
    fn discard_input(&mut self) -> io::Result<()> {
        SerialPort::discard_input_buffer(self)
    }
}

/// Synchronous glider link over a serial port. Every read and write
/// blocks the calling thread.
pub struct SerialChannel<P: DirectTransport> {
    transport: P,
    tuning: ChannelTuning,
    verbose: bool,
    pending: Vec<u8>,
    eof: bool,
}

impl SerialChannel<SerialPort> {
    /// Opens `port_name` at the glider's fixed baud rate and runs the
    /// verification handshake before handing the channel back.
    pub fn open(
        port_name: &str,
        tuning: ChannelTuning,
        verbose: bool,
    ) -> Result<Self, ChannelError> {
        debug!("attempting connection with serial port {}", port_name);
        let port = SerialPort::open(port_name, 115200).map_err(|_| {
            ChannelError::LinkConfiguration(format!(
                "cannot open serial port {}; check ports and connection and try again",
                port_name
            ))
        })?;
        port.set_read_timeout(Duration::from_millis(200))?;
        let mut channel = Self::from_transport(port, tuning, verbose);
        channel.verify_link()?;
        info!("connection to port {} successful", port_name);
        Ok(channel)
    }
}

impl<P: DirectTransport> SerialChannel<P> {
    /// Wraps an already-open transport. No handshake is performed;
    /// callers that need one run [`SerialChannel::verify_link`].
    pub fn from_transport(transport: P, tuning: ChannelTuning, verbose: bool) -> Self {
        SerialChannel {
            transport,
            tuning,
            verbose,
            pending: Vec::new(),
            eof: false,
        }
    }

    /// Probes the link up to three times, looking for evidence that the
    /// heading field is present in the stream and that the glider is in
    /// lab mode. Distinguishes a misconfigured glider (link readable,
    /// marker missing) from a dead or garbled link.
    pub fn verify_link(&mut self) -> Result<(), ChannelError> {
        let mut hdg_present = false;
        let mut lab_on = false;
        let mut readable = false;
        for _ in 0..VERIFY_TRIES {
            self.write_command("")?;
            thread::sleep(self.tuning.probe_delay);
            for line in self.drain_lines()? {
                if line.contains(HEADING_EVIDENCE) {
                    hdg_present = true;
                    readable = true;
                }
                if line.contains(LAB_MODE_EVIDENCE) {
                    lab_on = true;
                    readable = true;
                }
            }
            if hdg_present && lab_on {
                debug!("port configured correctly and glider setup correctly");
                return Ok(());
            }
        }
        if readable {
            Err(ChannelError::DeviceConfiguration(
                "serial port correct, but glider may be incorrectly configured; \
                 turn GliderLAB on and report m_heading, then try again"
                    .to_string(),
            ))
        } else {
            Err(ChannelError::LinkConfiguration(
                "serial port appears to be configured incorrectly; \
                 characters are not what is expected"
                    .to_string(),
            ))
        }
    }

    /// Reads one complete line, or `None` if the transport timed out or
    /// ran out of data before a terminator arrived.
    fn read_line(&mut self) -> Result<Option<String>, ChannelError> {
        loop {
            if let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
                let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }
            if self.eof {
                return Ok(None);
            }
            let mut buf = [0u8; 256];
            match self.transport.read(&mut buf) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(None);
                }
                Ok(n) => self.pending.extend_from_slice(&buf[..n]),
                Err(error)
                    if error.kind() == ErrorKind::TimedOut
                        || error.kind() == ErrorKind::WouldBlock =>
                {
                    return Ok(None)
                }
                Err(error) => return Err(error.into()),
            }
        }
    }

    /// Drains every line currently available on the transport.
    fn drain_lines(&mut self) -> Result<Vec<String>, ChannelError> {
        let mut lines = Vec::new();
        while let Some(line) = self.read_line()? {
            lines.push(line);
        }
        Ok(lines)
    }

    fn flush_input(&mut self) -> Result<(), ChannelError> {
        self.transport.discard_input()?;
        self.pending.clear();
        Ok(())
    }
}

impl<P: DirectTransport> GliderChannel for SerialChannel<P> {
    fn write_command(&mut self, command: &str) -> Result<(), ChannelError> {
        // The RF link wants characters paced out, not a single burst.
        for byte in command.bytes() {
            self.transport.write_all(&[byte])?;
        }
        self.transport.write_all(b"\r")?;
        self.transport.flush()?;
        Ok(())
    }

    fn read_headings(&mut self, count: usize) -> Result<Vec<Radian>, ChannelError> {
        let mut headings = Vec::with_capacity(count);
        let mut other_lines = Vec::new();
        self.flush_input()?;
        while headings.len() < count {
            match self.read_line()? {
                Some(line) => {
                    if line.is_empty() {
                        continue;
                    }
                    println!("{}", line);
                    match line.parse::<TelemetryEvent>() {
                        Ok(TelemetryEvent::Heading(heading)) => {
                            debug!("parsed heading = {}", heading);
                            headings.push(heading);
                        }
                        _ => other_lines.push(line),
                    }
                }
                None if self.eof => return Err(ChannelError::Disconnected),
                None => {}
            }
        }
        if self.verbose && !other_lines.is_empty() {
            println!("\nAdditional output:");
            for line in &other_lines {
                println!("{}", line);
            }
        }
        Ok(headings)
    }

    fn get_mag_var(&mut self) -> Result<Radian, ChannelError> {
        let started = Instant::now();
        loop {
            if let Some(deadline) = self.tuning.query_deadline {
                if started.elapsed() >= deadline {
                    return Err(ChannelError::QueryTimeout);
                }
            }
            self.flush_input()?;
            self.write_command(MAG_VAR_QUERY)?;
            // The first line back is the glider echoing the command.
            let echo = self.read_line()?;
            debug!("query echo: {:?}", echo);
            let mut tries = 0;
            while tries < self.tuning.reply_window {
                match self.read_line()? {
                    Some(line) => {
                        debug!("query reply candidate: {}", line);
                        if let Ok(TelemetryEvent::MagVar(value)) = line.parse() {
                            // The gliders report variation with the
                            // opposite sign of the correction.
                            debug!("mag_var = {} radians", -value);
                            return Ok(-value);
                        }
                        tries += 1;
                    }
                    None if self.eof => return Err(ChannelError::Disconnected),
                    None => tries += 1,
                }
            }
        }
    }
}
