//! LEEF (Log Event Extended Format) event construction.
//!
//! LEEF is the event format ingested by IBM QRadar. Events emitted here use
//! `|` both between header fields and between attributes:
//!
//! ```text
//! Vendor|Product|Version|EventID|attr1=value1|attr2=value2
//! ```
//!
//! - **Vendor / Product / Version**: identity of the emitting product
//! - **EventID**: threat identifier the event was raised for
//! - **Attributes**: `key=value` pairs, emitted in insertion order
//!
//! Attribute order is part of the output contract; downstream parsers rely on
//! it, so [`LeefEvent`] keeps attributes in a `Vec` rather than a map.
//!
//! # Escaping
//!
//! Header fields and attribute values escape `\`, `|`, CR and LF with a
//! backslash. Values free of those characters are emitted verbatim.
//!
//! # References
//!
//! - [LEEF Format Guide (IBM)](https://www.ibm.com/docs/en/dsm?topic=leef-overview)

mod encoder;

use std::fmt;

pub use encoder::{DEV_TIME_FORMAT, LeefEncoder, ProductIdentity};

/// Field and attribute delimiter.
pub const DELIMITER: char = '|';

/// A single LEEF event being assembled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeefEvent {
    vendor: String,
    product: String,
    version: String,
    event_id: String,
    attributes: Vec<(&'static str, String)>,
}

impl LeefEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_header(
        &mut self,
        vendor: impl Into<String>,
        product: impl Into<String>,
        version: impl Into<String>,
        event_id: impl Into<String>,
    ) {
        self.vendor = vendor.into();
        self.product = product.into();
        self.version = version.into();
        self.event_id = event_id.into();
    }

    /// Append an attribute. Keys are not deduplicated.
    pub fn set_attr(&mut self, key: &'static str, value: impl Into<String>) {
        self.attributes.push((key, value.into()));
    }

    /// Severity on the LEEF 0-10 scale.
    pub fn set_sev_attr(&mut self, sev: u8) {
        self.set_attr("sev", sev.to_string());
    }

    pub fn set_policy_attr(&mut self, value: &str) {
        self.set_attr("cat", value);
    }

    pub fn set_dev_time_format_attr(&mut self, format: &str) {
        self.set_attr("devTimeFormat", format);
    }

    pub fn set_dev_time_attr(&mut self, time: impl Into<String>) {
        self.set_attr("devTime", time);
    }

    pub fn set_proto_attr(&mut self, proto: &str) {
        self.set_attr("proto", proto);
    }

    pub fn set_src_attr(&mut self, src: impl fmt::Display) {
        self.set_attr("src", src.to_string());
    }

    pub fn set_src_port_attr(&mut self, port: u16) {
        self.set_attr("srcPort", port.to_string());
    }

    pub fn set_dst_attr(&mut self, dst: impl fmt::Display) {
        self.set_attr("dst", dst.to_string());
    }

    pub fn set_dst_port_attr(&mut self, port: u16) {
        self.set_attr("dstPort", port.to_string());
    }

    pub fn set_src_bytes_attr(&mut self, bytes: i64) {
        self.set_attr("srcBytes", bytes.to_string());
    }

    pub fn set_dst_bytes_attr(&mut self, bytes: i64) {
        self.set_attr("dstBytes", bytes.to_string());
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    /// Value of the first attribute named `key`.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Attribute keys in emission order.
    pub fn attr_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.attributes.iter().map(|(k, _)| *k)
    }
}

impl fmt::Display for LeefEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            escape_leef(&self.vendor),
            escape_leef(&self.product),
            escape_leef(&self.version),
            escape_leef(&self.event_id),
        )?;
        for (key, value) in &self.attributes {
            write!(f, "{}{}={}", DELIMITER, key, escape_leef(value))?;
        }
        Ok(())
    }
}

/// Escape characters that would break LEEF framing.
fn escape_leef(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            DELIMITER => result.push_str("\\|"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_leef() {
        assert_eq!(escape_leef("simple"), "simple");
        assert_eq!(escape_leef("with|pipe"), "with\\|pipe");
        assert_eq!(escape_leef("with\\backslash"), "with\\\\backslash");
        assert_eq!(escape_leef("multi|pipe|test"), "multi\\|pipe\\|test");
        assert_eq!(escape_leef("new\nline"), "new\\nline");
        assert_eq!(escape_leef("carriage\rreturn"), "carriage\\rreturn");
        // Only framing characters are touched
        assert_eq!(escape_leef("key=value,tab\t"), "key=value,tab\t");
    }

    #[test]
    fn test_header_only() {
        let mut event = LeefEvent::new();
        event.set_header("AlphaSOC", "NFR", "1.2.3", "c2_communication");

        assert_eq!(event.to_string(), "AlphaSOC|NFR|1.2.3|c2_communication");
        assert_eq!(event.event_id(), "c2_communication");
    }

    #[test]
    fn test_attributes_keep_insertion_order() {
        let mut event = LeefEvent::new();
        event.set_header("V", "P", "1", "id");
        event.set_attr("zeta", "1");
        event.set_attr("alpha", "2");
        event.set_sev_attr(4);

        assert_eq!(event.to_string(), "V|P|1|id|zeta=1|alpha=2|sev=4");
        assert_eq!(
            event.attr_keys().collect::<Vec<_>>(),
            vec!["zeta", "alpha", "sev"]
        );
    }

    #[test]
    fn test_typed_setters_use_leef_keys() {
        let mut event = LeefEvent::new();
        event.set_policy_attr("1");
        event.set_proto_attr("udp");
        event.set_src_attr("10.0.0.1");
        event.set_src_port_attr(53);
        event.set_dst_attr("10.0.0.2");
        event.set_dst_port_attr(8080);
        event.set_src_bytes_attr(10);
        event.set_dst_bytes_attr(20);

        assert_eq!(
            event.attr_keys().collect::<Vec<_>>(),
            vec!["cat", "proto", "src", "srcPort", "dst", "dstPort", "srcBytes", "dstBytes"]
        );
        assert_eq!(event.attr("dstPort"), Some("8080"));
        assert_eq!(event.attr("missing"), None);
    }

    #[test]
    fn test_values_are_escaped_on_render() {
        let mut event = LeefEvent::new();
        event.set_header("Test|Vendor", "Test\\Product", "1", "id");
        event.set_attr("description", "a|b\nc");

        let output = event.to_string();
        assert!(output.starts_with("Test\\|Vendor|Test\\\\Product|1|id|"));
        assert!(output.ends_with("description=a\\|b\\nc"));
        // The stored value stays raw
        assert_eq!(event.attr("description"), Some("a|b\nc"));
    }
}
