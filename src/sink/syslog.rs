//! Syslog sender for the QRadar syslog input.
//!
//! Messages follow the layout used by common network syslog writers:
//!
//! ```text
//! <PRI>TIMESTAMP HOSTNAME TAG[PID]: MSG
//! ```
//!
//! - **PRI**: Priority value = (Facility * 8) + Severity. Events are always
//!   sent at severity *alert* (1).
//! - **TIMESTAMP**: RFC 3339 timestamp with local offset
//! - **HOSTNAME**: Machine hostname (configurable)
//! - **TAG**: Application tag (configurable, default: "NFR")
//! - **PID**: Process ID
//! - **MSG**: The LEEF event line
//!
//! Over TCP each message is terminated by a newline; over UDP each message is
//! one datagram.
//!
//! # References
//!
//! - [RFC 3164 - The BSD syslog Protocol](https://datatracker.ietf.org/doc/html/rfc3164)
//! - [RFC 6587 - Transmission of Syslog Messages over TCP](https://datatracker.ietf.org/doc/html/rfc6587)

use std::{
    fmt::Write as FmtWrite,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr},
};

use async_trait::async_trait;
use chrono::{DateTime, Local, SecondsFormat, TimeZone};
use tokio::{
    io::AsyncWriteExt,
    net::{TcpStream, UdpSocket},
};

use super::{EventSink, SinkError};
use crate::config::{QRadarConfig, SyslogFacility, SyslogTransport};

/// Syslog severity used for every forwarded event.
const SEVERITY_ALERT: u8 = 1;

/// Builds syslog messages around event lines.
#[derive(Debug, Clone)]
pub struct SyslogFormatter {
    facility: SyslogFacility,
    hostname: String,
    tag: String,
    pid: u32,
}

impl SyslogFormatter {
    pub fn new(facility: SyslogFacility, hostname: &str, tag: &str) -> Self {
        Self {
            facility,
            hostname: sanitize_syslog_field(hostname, 255),
            tag: sanitize_syslog_field(tag, 32),
            pid: std::process::id(),
        }
    }

    pub fn from_config(config: &QRadarConfig) -> Self {
        Self::new(config.facility, &config.get_hostname(), &config.tag)
    }

    /// PRI value for forwarded events.
    pub fn priority(&self) -> u16 {
        self.facility.code() as u16 * 8 + SEVERITY_ALERT as u16
    }

    /// Format a message stamped with the current time.
    pub fn format(&self, msg: &str) -> String {
        self.format_at(&Local::now(), msg)
    }

    pub fn format_at<Tz: TimeZone>(&self, timestamp: &DateTime<Tz>, msg: &str) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        let mut output = String::with_capacity(msg.len() + 64);
        let _ = write!(
            output,
            "<{}>{} {} {}[{}]: {}",
            self.priority(),
            timestamp.to_rfc3339_opts(SecondsFormat::Secs, false),
            self.hostname,
            self.tag,
            self.pid,
            msg.trim_end_matches('\n'),
        );
        output
    }
}

enum Connection {
    Tcp(TcpStream),
    Udp(UdpSocket),
}

/// Sink that sends each event line as one syslog message.
pub struct SyslogSink {
    address: String,
    formatter: SyslogFormatter,
    connection: Option<Connection>,
}

impl SyslogSink {
    /// Connect to the configured syslog input.
    pub async fn connect(config: &QRadarConfig) -> Result<Self, SinkError> {
        let address = config.address.clone();
        let timeout = config.connect_timeout();

        let result = tokio::time::timeout(timeout, open(config.transport, &address)).await;
        let connection = match result {
            Ok(Ok(connection)) => connection,
            Ok(Err(source)) => {
                tracing::warn!(address = %address, error = %source, "Failed to connect to syslog input");
                return Err(SinkError::Connect { address, source });
            }
            Err(_) => {
                tracing::warn!(
                    address = %address,
                    timeout_secs = timeout.as_secs(),
                    "Timed out connecting to syslog input"
                );
                return Err(SinkError::Timeout { address });
            }
        };

        tracing::info!(
            address = %address,
            transport = config.transport.as_str(),
            "Connected to syslog input"
        );

        Ok(Self {
            address,
            formatter: SyslogFormatter::from_config(config),
            connection: Some(connection),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

async fn open(transport: SyslogTransport, address: &str) -> std::io::Result<Connection> {
    match transport {
        SyslogTransport::Tcp => TcpStream::connect(address).await.map(Connection::Tcp),
        SyslogTransport::Udp => {
            let peer = tokio::net::lookup_host(address).await?.next().ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::AddrNotAvailable,
                    format!("no addresses resolved for {}", address),
                )
            })?;
            // The local socket must match the peer's address family
            let local: SocketAddr = if peer.is_ipv6() {
                (Ipv6Addr::UNSPECIFIED, 0).into()
            } else {
                (Ipv4Addr::UNSPECIFIED, 0).into()
            };
            let socket = UdpSocket::bind(local).await?;
            socket.connect(peer).await?;
            Ok(Connection::Udp(socket))
        }
    }
}

#[async_trait]
impl EventSink for SyslogSink {
    async fn send_line(&mut self, line: &str) -> Result<(), SinkError> {
        let message = self.formatter.format(line);
        match self.connection.as_mut().ok_or(SinkError::Closed)? {
            Connection::Tcp(stream) => {
                let framed = format!("{}\n", message);
                stream.write_all(framed.as_bytes()).await?;
            }
            Connection::Udp(socket) => {
                socket.send(message.as_bytes()).await?;
            }
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        match self.connection.take() {
            Some(Connection::Tcp(mut stream)) => {
                stream.shutdown().await?;
                tracing::debug!(address = %self.address, "Closed syslog connection");
            }
            Some(Connection::Udp(_)) => {}
            None => {}
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "syslog"
    }
}

/// Sanitize a syslog header field.
///
/// Only printable US-ASCII without spaces is kept, truncated to `max_len`.
fn sanitize_syslog_field(s: &str, max_len: usize) -> String {
    let sanitized: String = s
        .chars()
        .filter(|c| *c >= '\x21' && *c <= '\x7e')
        .take(max_len)
        .collect();

    if sanitized.is_empty() {
        "-".to_string()
    } else {
        sanitized
    }
}
