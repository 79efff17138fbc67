use std::{collections::HashMap, net::IpAddr};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A batch of alerts as returned by the alerts API.
///
/// Threat identifiers referenced by an [`Alert`] are expected to be keys of
/// `threats`, but a missing key is tolerated (see [`AlertBatch::threat_info`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertBatch {
    #[serde(default)]
    pub alerts: Vec<Alert>,

    #[serde(default)]
    pub threats: HashMap<String, ThreatInfo>,
}

impl AlertBatch {
    /// Parse a batch from its JSON representation.
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    /// Number of (alert, threat) pairs in the batch, i.e. events to emit.
    pub fn event_count(&self) -> usize {
        self.alerts.iter().map(|a| a.threats.len()).sum()
    }

    /// Metadata for a threat identifier, if the batch carries any.
    pub fn threat_info(&self, threat_id: &str) -> Option<&ThreatInfo> {
        self.threats.get(threat_id)
    }
}

/// Threat metadata shared by every alert that references it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatInfo {
    /// Severity on a 0-5 scale.
    #[serde(default)]
    pub severity: u8,

    /// Policy violation (true) rather than a security threat (false).
    #[serde(default)]
    pub policy: bool,

    #[serde(default)]
    pub title: String,
}

/// Tags attached to an alert by the analysis engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wisdom {
    #[serde(default)]
    pub flags: Vec<String>,
}

/// One detected event occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AlertRecord", into = "AlertRecord")]
pub struct Alert {
    pub payload: EventPayload,
    /// Threat identifiers matched by this event, in first-seen order.
    pub threats: Vec<String>,
    pub wisdom: Wisdom,
}

impl Alert {
    /// Wire name of the event type (`dns`, `ip`, or whatever unknown value was received).
    pub fn event_type(&self) -> &str {
        self.payload.event_type()
    }
}

/// Event data carried by an alert, discriminated by event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
    Dns(DnsEvent),
    Ip(IpEvent),
    /// Unrecognized event type, or a known type without its event body.
    Unknown(String),
}

impl EventPayload {
    pub fn event_type(&self) -> &str {
        match self {
            EventPayload::Dns(_) => "dns",
            EventPayload::Ip(_) => "ip",
            EventPayload::Unknown(event_type) => event_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsEvent {
    /// Event time with the offset it was reported in.
    #[serde(rename = "ts")]
    pub timestamp: DateTime<FixedOffset>,
    #[serde(rename = "srcIP")]
    pub src_ip: IpAddr,
    pub query: String,
    pub qtype: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpEvent {
    /// Event time with the offset it was reported in.
    #[serde(rename = "ts")]
    pub timestamp: DateTime<FixedOffset>,
    #[serde(rename = "proto")]
    pub protocol: String,
    #[serde(rename = "srcIP")]
    pub src_ip: IpAddr,
    pub src_port: u16,
    #[serde(rename = "destIP")]
    pub dst_ip: IpAddr,
    #[serde(rename = "destPort")]
    pub dst_port: u16,
    #[serde(default)]
    pub bytes_in: i64,
    #[serde(default)]
    pub bytes_out: i64,
}

/// Wire shape of an alert: a string discriminator next to optional event bodies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlertRecord {
    #[serde(default)]
    event_type: String,
    #[serde(default)]
    threats: Vec<String>,
    #[serde(default)]
    wisdom: Wisdom,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dns_event: Option<DnsEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ip_event: Option<IpEvent>,
}

impl From<AlertRecord> for Alert {
    fn from(record: AlertRecord) -> Self {
        let payload = match (record.event_type.as_str(), record.dns_event, record.ip_event) {
            ("dns", Some(dns), _) => EventPayload::Dns(dns),
            ("ip", _, Some(ip)) => EventPayload::Ip(ip),
            _ => EventPayload::Unknown(record.event_type),
        };

        let mut threats: Vec<String> = Vec::with_capacity(record.threats.len());
        for threat in record.threats {
            if !threats.contains(&threat) {
                threats.push(threat);
            }
        }

        Self {
            payload,
            threats,
            wisdom: record.wisdom,
        }
    }
}

impl From<Alert> for AlertRecord {
    fn from(alert: Alert) -> Self {
        let mut record = AlertRecord {
            event_type: alert.payload.event_type().to_string(),
            threats: alert.threats,
            wisdom: alert.wisdom,
            ..Default::default()
        };
        match alert.payload {
            EventPayload::Dns(dns) => record.dns_event = Some(dns),
            EventPayload::Ip(ip) => record.ip_event = Some(ip),
            EventPayload::Unknown(_) => {}
        }
        record
    }
}
