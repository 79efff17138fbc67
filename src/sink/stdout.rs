use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};

use super::{EventSink, SinkError};

/// Sink that writes each event line to a local writer, one per line.
pub struct StdoutSink<W = Stdout> {
    writer: W,
}

impl StdoutSink<Stdout> {
    pub fn new() -> Self {
        Self {
            writer: tokio::io::stdout(),
        }
    }
}

impl Default for StdoutSink<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: AsyncWrite + Unpin + Send> StdoutSink<W> {
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> EventSink for StdoutSink<W> {
    async fn send_line(&mut self, line: &str) -> Result<(), SinkError> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        self.writer.flush().await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdout"
    }
}
