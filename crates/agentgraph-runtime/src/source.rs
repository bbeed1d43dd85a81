//! Event sources: where runtime events come from.

use futures::future::BoxFuture;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::Result;
use crate::event::EventRecord;

/// Delivers events in arrival order, one at a time. `Ok(None)` means the
/// stream has ended.
pub trait EventSource: Send {
    fn next_event(&mut self) -> BoxFuture<'_, Result<Option<EventRecord>>>;
}

/// Newline-delimited JSON records from any async reader. Blank lines are
/// skipped; undecodable lines are logged and skipped.
pub struct JsonLinesSource<R> {
    lines: Lines<R>,
    line_no: usize,
    skipped: usize,
}

impl<R: AsyncBufRead + Unpin + Send> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            skipped: 0,
        }
    }

    /// Lines that could not be decoded so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl<R: AsyncBufRead + Unpin + Send> EventSource for JsonLinesSource<R> {
    fn next_event(&mut self) -> BoxFuture<'_, Result<Option<EventRecord>>> {
        Box::pin(async move {
            while let Some(line) = self.lines.next_line().await? {
                self.line_no += 1;
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str(line) {
                    Ok(record) => return Ok(Some(record)),
                    Err(e) => {
                        self.skipped += 1;
                        warn!(line = self.line_no, error = %e, "undecodable event skipped");
                    }
                }
            }
            Ok(None)
        })
    }
}

/// Events pushed by another task.
pub struct ChannelSource {
    rx: mpsc::Receiver<EventRecord>,
}

impl ChannelSource {
    pub fn new(rx: mpsc::Receiver<EventRecord>) -> Self {
        Self { rx }
    }

    /// A source and the sender feeding it.
    pub fn channel(capacity: usize) -> (mpsc::Sender<EventRecord>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }
}

impl EventSource for ChannelSource {
    fn next_event(&mut self) -> BoxFuture<'_, Result<Option<EventRecord>>> {
        Box::pin(async move { Ok(self.rx.recv().await) })
    }
}
