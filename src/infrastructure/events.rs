//! Event sink implementations.

use std::sync::mpsc::Sender;
use std::sync::Mutex;

use crate::domain::{AppEvent, EventSink};

/// Sink that forwards events into an SPSC channel; the consumer observes
/// completion when the sender side is dropped.
pub struct ChannelSink {
    tx: Mutex<Sender<AppEvent>>,
}

impl ChannelSink {
    #[must_use]
    pub fn new(tx: Sender<AppEvent>) -> Self {
        Self { tx: Mutex::new(tx) }
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: AppEvent) {
        // Fire-and-forget: a disconnected receiver is not an error.
        if let Ok(tx) = self.tx.lock() {
            let _ = tx.send(event);
        }
    }
}
