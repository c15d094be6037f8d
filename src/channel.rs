//! The capability a calibration session needs from its link to the
//! glider, independent of whether that link is a Freewave serial modem
//! or a dockserver connection.

use std::fmt;
use std::time::Duration;

use crate::observation::Radian;

/// The query that asks the glider for its stored magnetic variation.
pub const MAG_VAR_QUERY: &str = "get m_gps_mag_var";

/// Knobs shared by the channel implementations. The defaults match
/// field behavior; tests tighten them so nothing sleeps for real.
#[derive(Debug, Clone)]
pub struct ChannelTuning {
    /// How long the queued consumer sleeps when its queue runs dry.
    pub poll_interval: Duration,
    /// How many reply lines to scan after issuing a value query before
    /// re-issuing it.
    pub reply_window: usize,
    /// Pause between link-verification probes.
    pub probe_delay: Duration,
    /// Whether to discard already-queued lines before a read, so a
    /// heading batch is not built out of stale data.
    pub flush_stale: bool,
    /// Overall limit on the mag-var query cycle. `None` retries forever,
    /// which is the field default: a slow glider eventually answers.
    pub query_deadline: Option<Duration>,
}

impl Default for ChannelTuning {
    fn default() -> Self {
        ChannelTuning {
            poll_interval: Duration::from_millis(250),
            reply_window: 3,
            probe_delay: Duration::from_millis(300),
            flush_stale: true,
            query_deadline: None,
        }
    }
}

/// Fatal channel failures. Parse misses are not represented here; a
/// telemetry line that fails to match is expected noise and simply does
/// not advance whatever count the caller is keeping.
#[derive(Debug)]
pub enum ChannelError {
    /// The transport opened but never produced the expected text. Wrong
    /// port, wrong baud, or nothing on the other end.
    LinkConfiguration(String),
    /// The transport is readable but the glider is not set up for the
    /// check (lab mode off, or heading reporting off).
    DeviceConfiguration(String),
    /// Underlying transport error while opening or talking.
    Io(std::io::Error),
    /// The far side stopped producing data mid-session.
    Disconnected,
    /// A configured [`ChannelTuning::query_deadline`] elapsed while
    /// waiting for a value reply.
    QueryTimeout,
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChannelError::LinkConfiguration(msg) => {
                write!(f, "link misconfigured: {}", msg)
            }
            ChannelError::DeviceConfiguration(msg) => {
                write!(f, "glider misconfigured: {}", msg)
            }
            ChannelError::Io(error) => write!(f, "channel io error: {}", error),
            ChannelError::Disconnected => write!(f, "connection to the glider was lost"),
            ChannelError::QueryTimeout => {
                write!(f, "glider never answered the value query within the deadline")
            }
        }
    }
}

impl std::error::Error for ChannelError {}

impl From<std::io::Error> for ChannelError {
    fn from(value: std::io::Error) -> Self {
        ChannelError::Io(value)
    }
}

/// One live link to a glider, able to issue commands and harvest the
/// telemetry fields the compass check needs.
pub trait GliderChannel {
    /// Sends a command string, terminated by a single carriage return.
    /// No acknowledgement is expected at this layer.
    fn write_command(&mut self, command: &str) -> Result<(), ChannelError>;

    /// Blocks until exactly `count` heading reports have been observed,
    /// returning them in arrival order. Non-matching lines are echoed
    /// for the operator and otherwise ignored.
    fn read_headings(&mut self, count: usize) -> Result<Vec<Radian>, ChannelError>;

    /// Queries the glider for its magnetic variation and returns the
    /// value with the sign flipped into the correction convention. The
    /// query cycle repeats until a reply matches, or until the tuning's
    /// deadline (if any) runs out.
    fn get_mag_var(&mut self) -> Result<Radian, ChannelError>;
}
