//! The queued channel variant: a dockserver connection multiplexing the
//! glider's console over TCP.
//!
//! A background receiver owns the read half of the stream, assembles
//! complete lines out of the byte flow, and pushes them onto an
//! unbounded queue tagged with the vehicle name. The foreground side
//! drains the queue with bounded polling; the queue is the only state
//! the two sides share.

use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::channel::{ChannelError, ChannelTuning, GliderChannel, MAG_VAR_QUERY};
use crate::observation::Radian;
use crate::telemetry::TelemetryEvent;

/// The port dockservers listen on.
const DOCKSERVER_PORT: u16 = 6564;

/// A complete telemetry line, tagged with the vehicle it came from.
pub type TaggedLine = (String, String);

/// Glider link through a dockserver. Reading happens on a background
/// thread; the session thread only ever sees parsed values.
pub struct DockChannel {
    writer: Box<dyn Write + Send>,
    lines: Receiver<TaggedLine>,
    receiver: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
    tuning: ChannelTuning,
    verbose: bool,
}

impl DockChannel {
    /// Connects to a dockserver. `host` may carry an explicit port;
    /// otherwise the standard dockserver port is used.
    pub fn connect(
        host: &str,
        vehicle: &str,
        tuning: ChannelTuning,
        verbose: bool,
    ) -> Result<Self, ChannelError> {
        let address = if host.contains(':') {
            host.to_string()
        } else {
            format!("{}:{}", host, DOCKSERVER_PORT)
        };
        debug!("connecting to dockserver {}", address);
        let stream = TcpStream::connect(&address)?;
        // The receiver wakes up on this cadence to notice a stop request.
        stream.set_read_timeout(Some(Duration::from_millis(250)))?;
        let reader = stream.try_clone()?;
        let channel = Self::from_transport(reader, Box::new(stream), vehicle, tuning, verbose);
        info!("connected to dockserver {}", address);
        Ok(channel)
    }

    /// Builds a channel over an arbitrary transport pair and starts the
    /// background receiver.
    pub fn from_transport<R: Read + Send + 'static>(
        mut reader: R,
        writer: Box<dyn Write + Send>,
        vehicle: &str,
        tuning: ChannelTuning,
        verbose: bool,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let receiver_stop = Arc::clone(&stop);
        let tag = vehicle.to_string();

        let receiver = thread::spawn(move || {
            let mut pending: Vec<u8> = Vec::new();
            let mut buf = [0u8; 256];
            while !receiver_stop.load(Ordering::Relaxed) {
                match reader.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        pending.extend_from_slice(&buf[..n]);
                        while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
                            let mut line: Vec<u8> = pending.drain(..=pos).collect();
                            line.pop();
                            if line.last() == Some(&b'\r') {
                                line.pop();
                            }
                            let line = String::from_utf8_lossy(&line).into_owned();
                            if tx.send((tag.clone(), line)).is_err() {
                                return;
                            }
                        }
                    }
                    Err(error)
                        if error.kind() == ErrorKind::TimedOut
                            || error.kind() == ErrorKind::WouldBlock =>
                    {
                        continue
                    }
                    Err(error) => {
                        debug!("dockserver receiver stopping: {}", error);
                        break;
                    }
                }
            }
        });

        DockChannel {
            writer,
            lines: rx,
            receiver: Some(receiver),
            stop,
            tuning,
            verbose,
        }
    }

    /// Signals the background receiver and waits for it to finish, so
    /// nothing appends to the queue once the channel is gone.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.receiver.take() {
            let _ = handle.join();
        }
    }

    fn flush_queue(&self) {
        while self.lines.try_recv().is_ok() {}
    }
}

impl Drop for DockChannel {
    fn drop(&mut self) {
        self.stop();
    }
}

impl GliderChannel for DockChannel {
    fn write_command(&mut self, command: &str) -> Result<(), ChannelError> {
        self.writer.write_all(command.as_bytes())?;
        self.writer.write_all(b"\r")?;
        self.writer.flush()?;
        debug!("wrote command: {}", command);
        Ok(())
    }

    fn read_headings(&mut self, count: usize) -> Result<Vec<Radian>, ChannelError> {
        let mut headings = Vec::with_capacity(count);
        if self.tuning.flush_stale {
            self.flush_queue();
        }
        if self.verbose {
            info!("gathering {} headings", count);
        }
        while headings.len() < count {
            let mut drained = false;
            loop {
                match self.lines.try_recv() {
                    Ok((_vehicle, line)) => {
                        drained = true;
                        println!("{}", line);
                        if let Ok(TelemetryEvent::Heading(heading)) = line.parse() {
                            debug!("parsed heading = {}", heading);
                            headings.push(heading);
                            if headings.len() == count {
                                break;
                            }
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => return Err(ChannelError::Disconnected),
                }
            }
            if headings.len() < count && !drained {
                spin_sleep::sleep(self.tuning.poll_interval);
            }
        }
        Ok(headings)
    }

    fn get_mag_var(&mut self) -> Result<Radian, ChannelError> {
        let started = Instant::now();
        if self.tuning.flush_stale {
            self.flush_queue();
        }
        loop {
            if let Some(deadline) = self.tuning.query_deadline {
                if started.elapsed() >= deadline {
                    return Err(ChannelError::QueryTimeout);
                }
            }
            // Queued delivery can silently drop an in-flight request
            // during channel setup, so the query goes out again on
            // every cycle.
            self.write_command(MAG_VAR_QUERY)?;
            let mut tries = 0;
            while tries <= self.tuning.reply_window {
                match self.lines.try_recv() {
                    Ok((_vehicle, line)) => {
                        tries += 1;
                        if self.verbose {
                            println!("{}", line);
                        }
                        if let Ok(TelemetryEvent::MagVar(value)) = line.parse() {
                            debug!("matched mag var; mag_var = {} radians", -value);
                            return Ok(-value);
                        }
                    }
                    Err(TryRecvError::Empty) => {
                        tries += 1;
                        spin_sleep::sleep(self.tuning.poll_interval);
                    }
                    Err(TryRecvError::Disconnected) => return Err(ChannelError::Disconnected),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};

    fn quick_tuning() -> ChannelTuning {
        ChannelTuning {
            poll_interval: Duration::from_millis(10),
            flush_stale: false,
            ..ChannelTuning::default()
        }
    }

    fn channel(script: &str) -> DockChannel {
        DockChannel::from_transport(
            Cursor::new(script.as_bytes().to_vec()),
            Box::new(io::sink()),
            "unit_540",
            quick_tuning(),
            false,
        )
    }

    #[test]
    fn collects_exact_count_through_noise() {
        let mut ch = channel(
            "behavior abend: waiting for gps fix\r\n\
             sensor: m_heading = 0.10 rad\r\n\
             unrelated chatter\r\n\
             sensor: m_heading = 0.11 rad\r\n\
             more chatter\r\n\
             sensor: m_heading = 0.12 rad\r\n",
        );
        let headings = ch.read_headings(3).unwrap();
        assert_eq!(headings, vec![0.10, 0.11, 0.12]);
    }

    #[test]
    fn reports_disconnect_when_stream_ends_short() {
        let mut ch = channel("sensor: m_heading = 0.10 rad\r\n");
        match ch.read_headings(2) {
            Err(ChannelError::Disconnected) => {}
            other => panic!("expected Disconnected, got {:?}", other),
        }
    }

    #[test]
    fn mag_var_query_is_reissued_and_negated() {
        let mut ch = channel(
            "chatter before the reply\r\n\
             more chatter\r\n\
             still more chatter\r\n\
             even more chatter\r\n\
             sensor: m_gps_mag_var(rad) = 0.105 rad\r\n",
        );
        let mag_var = ch.get_mag_var().unwrap();
        assert!((mag_var + 0.105).abs() < 1e-12);
    }

    #[test]
    fn mag_var_deadline_is_honored() {
        let mut ch = DockChannel::from_transport(
            Cursor::new(Vec::new()),
            Box::new(io::sink()),
            "unit_540",
            ChannelTuning {
                query_deadline: Some(Duration::ZERO),
                ..quick_tuning()
            },
            false,
        );
        match ch.get_mag_var() {
            Err(ChannelError::QueryTimeout) => {}
            other => panic!("expected QueryTimeout, got {:?}", other),
        }
    }

    #[test]
    fn stop_joins_the_receiver() {
        let mut ch = channel("sensor: m_heading = 0.10 rad\r\n");
        ch.stop();
        // Stopping twice is harmless; the handle is already gone.
        ch.stop();
    }
}
