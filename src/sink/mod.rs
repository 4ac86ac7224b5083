//! Delivery targets for extracted records
//!
//! The scheduler hands every record, wrapped in a [`Message`], to a
//! [`MessageSink`]. Sink failures are logged by the caller and never stop
//! the poll loop, so implementations must not block indefinitely.

use crate::error::SinkError;
use crate::events::{Message, Timestamp};
use serde::Serialize;
use std::io::Write;
use std::sync::mpsc::{Sender, SyncSender, TrySendError};

/// Receives messages produced by the poll loop
#[cfg_attr(test, mockall::automock)]
pub trait MessageSink: Send {
    /// Deliver one message
    fn submit(&mut self, message: &Message) -> Result<(), SinkError>;

    /// Push out anything buffered; called after every pass
    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

enum ChannelSender {
    Unbounded(Sender<Message>),
    Bounded(SyncSender<Message>),
}

/// Forwards messages over a `std::sync::mpsc` channel
///
/// With a bounded channel a full queue rejects the message instead of
/// waiting for the consumer.
pub struct ChannelSink {
    sender: ChannelSender,
}

impl ChannelSink {
    pub fn new(sender: Sender<Message>) -> Self {
        Self {
            sender: ChannelSender::Unbounded(sender),
        }
    }

    pub fn bounded(sender: SyncSender<Message>) -> Self {
        Self {
            sender: ChannelSender::Bounded(sender),
        }
    }
}

impl MessageSink for ChannelSink {
    fn submit(&mut self, message: &Message) -> Result<(), SinkError> {
        match &self.sender {
            ChannelSender::Unbounded(sender) => sender
                .send(message.clone())
                .map_err(|_| SinkError::Disconnected),
            ChannelSender::Bounded(sender) => match sender.try_send(message.clone()) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(_)) => Err(SinkError::Rejected("channel full".to_string())),
                Err(TrySendError::Disconnected(_)) => Err(SinkError::Disconnected),
            },
        }
    }
}

#[derive(Serialize)]
struct JsonLine<'a> {
    timestamp: &'a Timestamp,
    hostname: &'a str,
    tag: &'a str,
    facility: u8,
    severity: u8,
    message: String,
}

/// Writes one JSON object per message to any `Write`r
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> MessageSink for JsonLinesSink<W> {
    fn submit(&mut self, message: &Message) -> Result<(), SinkError> {
        let line = JsonLine {
            timestamp: &message.timestamp,
            hostname: &message.hostname,
            tag: &message.tag,
            facility: message.facility.code(),
            severity: message.severity.code(),
            message: message.record.to_string_lossy(),
        };

        serde_json::to_writer(&mut self.writer, &line)
            .map_err(|e| SinkError::Rejected(e.to_string()))?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}
