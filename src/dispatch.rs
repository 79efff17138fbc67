//! Alert dispatch: fan a batch out into one LEEF event per (alert, threat)
//! pair and hand each event to a sink.
//!
//! Events are sent strictly one after another, in batch order. The first sink
//! failure aborts the batch and is returned unchanged; events already sent
//! stay sent.

use std::borrow::Cow;

use crate::{
    leef::LeefEncoder,
    models::{AlertBatch, ThreatInfo},
    sink::{EventSink, SinkError},
};

/// Owns an encoder and the sink events are forwarded to.
pub struct AlertDispatcher<S> {
    encoder: LeefEncoder,
    sink: S,
}

impl<S: EventSink> AlertDispatcher<S> {
    pub fn new(encoder: LeefEncoder, sink: S) -> Self {
        Self { encoder, sink }
    }

    /// Encode and send every event in `batch`.
    ///
    /// Returns the number of events sent.
    pub async fn dispatch(&mut self, batch: &AlertBatch) -> Result<usize, SinkError> {
        if batch.is_empty() {
            return Ok(0);
        }

        let mut sent = 0;
        for alert in &batch.alerts {
            for threat_id in &alert.threats {
                let threat = match batch.threat_info(threat_id) {
                    Some(info) => Cow::Borrowed(info),
                    None => {
                        tracing::debug!(
                            threat = %threat_id,
                            "No metadata for threat, using defaults"
                        );
                        Cow::Owned(ThreatInfo::default())
                    }
                };

                let line = self.encoder.encode(alert, threat_id, &threat);
                if let Err(e) = self.sink.send_line(&line).await {
                    tracing::error!(
                        sink = self.sink.name(),
                        threat = %threat_id,
                        sent,
                        error = %e,
                        "Failed to send event"
                    );
                    return Err(e);
                }
                sent += 1;
            }
        }

        tracing::info!(
            sink = self.sink.name(),
            alerts = batch.alerts.len(),
            events = sent,
            "Dispatched alert batch"
        );
        Ok(sent)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Close the sink and consume the dispatcher.
    pub async fn close(mut self) -> Result<S, SinkError> {
        self.sink.close().await?;
        Ok(self.sink)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{
        leef::ProductIdentity,
        models::{Alert, DnsEvent, EventPayload, Wisdom},
        sink::test_utils::RecordingSink,
    };

    fn encoder() -> LeefEncoder {
        LeefEncoder::new(ProductIdentity::new("AlphaSOC", "NFR", "v1.0.0"))
    }

    fn dns_alert(threats: &[&str]) -> Alert {
        Alert {
            payload: EventPayload::Dns(DnsEvent {
                timestamp: Utc
                    .with_ymd_and_hms(2018, 3, 1, 12, 0, 0)
                    .unwrap()
                    .fixed_offset(),
                src_ip: "10.0.0.5".parse().unwrap(),
                query: "example.com".to_string(),
                qtype: "A".to_string(),
            }),
            threats: threats.iter().map(|t| t.to_string()).collect(),
            wisdom: Wisdom::default(),
        }
    }

    fn batch(alerts: Vec<Alert>, known: &[(&str, u8)]) -> AlertBatch {
        AlertBatch {
            alerts,
            threats: known
                .iter()
                .map(|(id, severity)| {
                    (
                        id.to_string(),
                        ThreatInfo {
                            severity: *severity,
                            policy: false,
                            title: format!("{} title", id),
                        },
                    )
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_sink_calls() {
        let mut dispatcher = AlertDispatcher::new(encoder(), RecordingSink::new());

        let sent = dispatcher.dispatch(&AlertBatch::default()).await.unwrap();

        assert_eq!(sent, 0);
        assert_eq!(dispatcher.sink().calls, 0);
    }

    #[tokio::test]
    async fn test_alert_without_threats_emits_nothing() {
        let mut dispatcher = AlertDispatcher::new(encoder(), RecordingSink::new());

        let sent = dispatcher
            .dispatch(&batch(vec![dns_alert(&[])], &[]))
            .await
            .unwrap();

        assert_eq!(sent, 0);
        assert_eq!(dispatcher.sink().calls, 0);
    }

    #[tokio::test]
    async fn test_one_event_per_alert_threat_pair_in_order() {
        let mut dispatcher = AlertDispatcher::new(encoder(), RecordingSink::new());
        let input = batch(
            vec![dns_alert(&["a", "b"]), dns_alert(&["c"])],
            &[("a", 1), ("b", 2), ("c", 3)],
        );

        let sent = dispatcher.dispatch(&input).await.unwrap();

        assert_eq!(sent, 3);
        let lines = &dispatcher.sink().lines;
        assert!(lines[0].starts_with("AlphaSOC|NFR|1.0.0|a|sev=2|"));
        assert!(lines[1].starts_with("AlphaSOC|NFR|1.0.0|b|sev=4|"));
        assert!(lines[2].starts_with("AlphaSOC|NFR|1.0.0|c|sev=6|"));
    }

    #[tokio::test]
    async fn test_missing_threat_metadata_uses_defaults() {
        let mut dispatcher = AlertDispatcher::new(encoder(), RecordingSink::new());

        dispatcher
            .dispatch(&batch(vec![dns_alert(&["unlisted"])], &[]))
            .await
            .unwrap();

        let line = &dispatcher.sink().lines[0];
        assert!(line.contains("|unlisted|sev=0|cat=0|"));
        assert!(line.contains("|description=|"));
    }

    #[tokio::test]
    async fn test_send_failure_aborts_batch() {
        let mut dispatcher = AlertDispatcher::new(encoder(), RecordingSink::failing_on(2));
        let input = batch(
            vec![dns_alert(&["a", "b"]), dns_alert(&["c"])],
            &[("a", 1), ("b", 2), ("c", 3)],
        );

        let err = dispatcher.dispatch(&input).await.unwrap_err();

        match err {
            SinkError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::BrokenPipe),
            other => panic!("unexpected error: {}", other),
        }
        // Third event never attempted; first one stays sent
        assert_eq!(dispatcher.sink().calls, 2);
        assert_eq!(dispatcher.sink().lines.len(), 1);
    }

    #[tokio::test]
    async fn test_batch_delivered_over_syslog_tcp() {
        use tokio::{
            io::{AsyncBufReadExt, BufReader},
            net::TcpListener,
        };

        use crate::{config::QRadarConfig, sink::SyslogSink};

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut lines = BufReader::new(socket).lines();
            let mut received = Vec::new();
            while let Some(line) = lines.next_line().await.unwrap() {
                received.push(line);
            }
            received
        });

        let input = AlertBatch::from_json(
            r#"{
                "alerts": [{
                    "eventType": "ip",
                    "threats": ["tor_traffic"],
                    "wisdom": {"flags": ["tor"]},
                    "ipEvent": {
                        "ts": "2018-03-01T12:31:00Z",
                        "proto": "tcp",
                        "srcIP": "10.0.0.6",
                        "srcPort": 51234,
                        "destIP": "198.51.100.7",
                        "destPort": 9001,
                        "bytesIn": 10,
                        "bytesOut": 20
                    }
                }],
                "threats": {"tor_traffic": {"severity": 4, "policy": true, "title": "Tor"}}
            }"#,
        )
        .unwrap();

        let sink = SyslogSink::connect(&QRadarConfig::new(address))
            .await
            .unwrap();
        let mut dispatcher = AlertDispatcher::new(encoder(), sink);
        assert_eq!(dispatcher.dispatch(&input).await.unwrap(), 1);
        dispatcher.close().await.unwrap();

        let received = server.await.unwrap();
        assert_eq!(received.len(), 1);
        assert!(received[0].starts_with("<9>"));
        assert!(received[0].ends_with(
            "]: AlphaSOC|NFR|1.0.0|tor_traffic|sev=8|cat=1|flags=tor|description=Tor|\
             devTimeFormat=MMM dd yyyy HH:mm:ss|devTime=Mar 01 2018 12:31:00|proto=tcp|\
             src=10.0.0.6|srcPort=51234|dst=198.51.100.7|dstPort=9001|srcBytes=10|dstBytes=20"
        ));
    }

    #[tokio::test]
    async fn test_close_closes_sink() {
        let dispatcher = AlertDispatcher::new(encoder(), RecordingSink::new());
        let sink = dispatcher.close().await.unwrap();
        assert!(sink.closed);
    }
}
