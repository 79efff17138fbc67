//! In-memory sink for dispatcher tests.

use async_trait::async_trait;

use super::{EventSink, SinkError};

/// Records every line it is asked to send, optionally failing on the Nth call.
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    pub lines: Vec<String>,
    pub calls: usize,
    pub closed: bool,
    fail_on_call: Option<usize>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `n`th `send_line` call (1-based) with a broken-pipe error.
    pub fn failing_on(n: usize) -> Self {
        Self {
            fail_on_call: Some(n),
            ..Self::default()
        }
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn send_line(&mut self, line: &str) -> Result<(), SinkError> {
        self.calls += 1;
        if self.fail_on_call == Some(self.calls) {
            return Err(SinkError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "collector went away",
            )));
        }
        self.lines.push(line.to_string());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        self.closed = true;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
