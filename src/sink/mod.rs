//! Destinations for encoded event lines.
//!
//! A sink accepts one self-contained event line at a time. Sinks do not
//! buffer or retry; a failed send is reported to the caller as-is.
//!
//! ## Available Sinks
//!
//! - **SyslogSink**: Sends each line as a syslog message to a QRadar syslog input (TCP or UDP)
//! - **StdoutSink**: Writes each line to stdout (dry runs)

mod stdout;
mod syslog;
#[cfg(test)]
pub(crate) mod test_utils;

use async_trait::async_trait;

pub use stdout::StdoutSink;
pub use syslog::{SyslogFormatter, SyslogSink};

/// Trait for event line sinks.
#[async_trait]
pub trait EventSink: Send {
    /// Send one event line as a single message.
    async fn send_line(&mut self, line: &str) -> Result<(), SinkError>;

    /// Release the underlying connection.
    async fn close(&mut self) -> Result<(), SinkError>;

    /// Get the sink name for logging.
    fn name(&self) -> &'static str;
}

/// Errors from event sinks.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("connect to qradar syslog input failed: {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connect to qradar syslog input failed: {address}: timed out")]
    Timeout { address: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sink is closed")]
    Closed,
}
