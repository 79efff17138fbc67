use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Connection settings for the QRadar syslog input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QRadarConfig {
    /// Syslog input address as `host:port`.
    pub address: String,

    /// Transport used to reach the syslog input.
    #[serde(default)]
    pub transport: SyslogTransport,

    /// Syslog facility for forwarded events.
    #[serde(default)]
    pub facility: SyslogFacility,

    /// Syslog tag (APP-NAME) for forwarded events.
    #[serde(default = "default_tag")]
    pub tag: String,

    /// Override hostname written into syslog headers.
    /// If not specified, uses the system hostname.
    #[serde(default)]
    pub hostname: Option<String>,

    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl QRadarConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            transport: SyslogTransport::default(),
            facility: SyslogFacility::default(),
            tag: default_tag(),
            hostname: None,
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }

    /// Get the hostname, falling back to the system hostname.
    pub fn get_hostname(&self) -> String {
        self.hostname.clone().unwrap_or_else(|| {
            hostname::get()
                .map(|h| h.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "localhost".to_string())
        })
    }

    pub fn connect_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.connect_timeout_secs)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let Some((host, port)) = self.address.rsplit_once(':') else {
            return Err(ConfigError::Validation(format!(
                "qradar.address '{}' must be in host:port form",
                self.address
            )));
        };
        if host.is_empty() {
            return Err(ConfigError::Validation(format!(
                "qradar.address '{}' is missing a host",
                self.address
            )));
        }
        if port.parse::<u16>().is_err() {
            return Err(ConfigError::Validation(format!(
                "qradar.address '{}' has an invalid port",
                self.address
            )));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "qradar.connect_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.tag.trim().is_empty() {
            return Err(ConfigError::Validation("qradar.tag must not be empty".into()));
        }
        Ok(())
    }
}

fn default_tag() -> String {
    "NFR".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

/// Transport used to reach the syslog input.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyslogTransport {
    /// Newline-framed messages over a TCP stream.
    #[default]
    Tcp,
    /// One datagram per message.
    Udp,
}

impl SyslogTransport {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyslogTransport::Tcp => "tcp",
            SyslogTransport::Udp => "udp",
        }
    }
}

/// Syslog facility as defined in RFC 5424.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum SyslogFacility {
    Kern = 0,
    #[default]
    User = 1,
    Mail = 2,
    Daemon = 3,
    Auth = 4,
    Syslog = 5,
    Lpr = 6,
    News = 7,
    Uucp = 8,
    Cron = 9,
    Authpriv = 10,
    Ftp = 11,
    Ntp = 12,
    Audit = 13,
    Alert = 14,
    Clock = 15,
    Local0 = 16,
    Local1 = 17,
    Local2 = 18,
    Local3 = 19,
    Local4 = 20,
    Local5 = 21,
    Local6 = 22,
    Local7 = 23,
}

impl SyslogFacility {
    /// Returns the numeric facility code (0-23).
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = QRadarConfig::new("qradar.local:514");
        assert_eq!(config.transport, SyslogTransport::Tcp);
        assert_eq!(config.facility, SyslogFacility::User);
        assert_eq!(config.tag, "NFR");
        assert_eq!(config.connect_timeout().as_secs(), 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_hostname_override() {
        let config = QRadarConfig {
            hostname: Some("sensor-1".to_string()),
            ..QRadarConfig::new("qradar.local:514")
        };
        assert_eq!(config.get_hostname(), "sensor-1");
        assert!(!QRadarConfig::new("qradar.local:514").get_hostname().is_empty());
    }

    #[test]
    fn test_facility_codes() {
        assert_eq!(SyslogFacility::Kern.code(), 0);
        assert_eq!(SyslogFacility::User.code(), 1);
        assert_eq!(SyslogFacility::Audit.code(), 13);
        assert_eq!(SyslogFacility::Local0.code(), 16);
        assert_eq!(SyslogFacility::Local7.code(), 23);
    }

    #[test]
    fn test_address_validation() {
        assert!(QRadarConfig::new("[::1]:514").validate().is_ok());
        assert!(QRadarConfig::new("10.1.1.1:6514").validate().is_ok());

        for bad in ["qradar.local", ":514", "qradar.local:http", "qradar.local:70000", ""] {
            assert!(
                matches!(
                    QRadarConfig::new(bad).validate(),
                    Err(ConfigError::Validation(_))
                ),
                "expected '{}' to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = QRadarConfig {
            connect_timeout_secs: 0,
            ..QRadarConfig::new("qradar.local:514")
        };
        assert!(config.validate().is_err());
    }
}
