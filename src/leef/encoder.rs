use super::LeefEvent;
use crate::models::{Alert, EventPayload, ThreatInfo};

/// Pattern announced in `devTimeFormat`, in the Java notation QRadar expects.
pub const DEV_TIME_FORMAT: &str = "MMM dd yyyy HH:mm:ss";

/// chrono equivalent of [`DEV_TIME_FORMAT`].
const DEV_TIME_CHRONO: &str = "%b %d %Y %H:%M:%S";

/// Highest severity on the LEEF scale.
const MAX_LEEF_SEVERITY: u8 = 10;

/// Identity written into every event header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductIdentity {
    pub vendor: String,
    pub product: String,
    pub version: String,
}

impl ProductIdentity {
    pub fn new(
        vendor: impl Into<String>,
        product: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            vendor: vendor.into(),
            product: product.into(),
            version: version.into(),
        }
    }
}

/// Turns (alert, threat) pairs into LEEF event lines.
#[derive(Debug, Clone)]
pub struct LeefEncoder {
    identity: ProductIdentity,
}

impl LeefEncoder {
    /// Create an encoder. A leading `v` in the product version is dropped
    /// (`v1.2.3` is written as `1.2.3`).
    pub fn new(identity: ProductIdentity) -> Self {
        let version = normalize_version(&identity.version).to_string();
        Self {
            identity: ProductIdentity {
                version,
                ..identity
            },
        }
    }

    pub fn identity(&self) -> &ProductIdentity {
        &self.identity
    }

    /// Encode one event for `alert` as seen through `threat_id`.
    ///
    /// IP byte counters use the LEEF keys `srcBytes` (`bytesIn`) and
    /// `dstBytes` (`bytesOut`). `devTime` keeps the clock time of the event's
    /// own offset.
    pub fn encode(&self, alert: &Alert, threat_id: &str, threat: &ThreatInfo) -> String {
        self.build_event(alert, threat_id, threat).to_string()
    }

    pub(crate) fn build_event(
        &self,
        alert: &Alert,
        threat_id: &str,
        threat: &ThreatInfo,
    ) -> LeefEvent {
        let mut e = LeefEvent::new();
        e.set_header(
            &self.identity.vendor,
            &self.identity.product,
            &self.identity.version,
            threat_id,
        );

        e.set_sev_attr(leef_severity(threat.severity));
        e.set_policy_attr(if threat.policy { "1" } else { "0" });
        e.set_attr("flags", alert.wisdom.flags.join(","));
        e.set_attr("description", threat.title.as_str());
        e.set_dev_time_format_attr(DEV_TIME_FORMAT);

        match &alert.payload {
            EventPayload::Dns(dns) => {
                e.set_dev_time_attr(dns.timestamp.format(DEV_TIME_CHRONO).to_string());
                e.set_src_attr(dns.src_ip);
                e.set_attr("query", dns.query.as_str());
                e.set_attr("recordType", dns.qtype.as_str());
            }
            EventPayload::Ip(ip) => {
                e.set_dev_time_attr(ip.timestamp.format(DEV_TIME_CHRONO).to_string());
                e.set_proto_attr(&ip.protocol);
                e.set_src_attr(ip.src_ip);
                e.set_src_port_attr(ip.src_port);
                e.set_dst_attr(ip.dst_ip);
                e.set_dst_port_attr(ip.dst_port);
                e.set_src_bytes_attr(ip.bytes_in);
                e.set_dst_bytes_attr(ip.bytes_out);
            }
            EventPayload::Unknown(_) => {}
        }

        e
    }
}

/// Map the 0-5 threat severity onto the 0-10 LEEF scale.
fn leef_severity(severity: u8) -> u8 {
    severity.saturating_mul(2).min(MAX_LEEF_SEVERITY)
}

fn normalize_version(version: &str) -> &str {
    version.strip_prefix('v').unwrap_or(version)
}
