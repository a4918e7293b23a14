use async_trait::async_trait;
use log::debug;
use std::sync::Mutex;

use super::{EventSink, Transport};
use crate::bot::events::Event;
use crate::chat::{BotIdentity, Channel, ChannelId};
use crate::config::Credentials;
use crate::error::{BotError, BotResult};

/// Transport that keeps every outgoing message in memory.
///
/// `connect` emits `ready` immediately; further events are pushed with [`MemoryTransport::inject`].
#[derive(Debug)]
pub struct MemoryTransport {
    identity: BotIdentity,
    sink: Mutex<Option<EventSink>>,
    sent: Mutex<Vec<(ChannelId, String)>>,
}

impl MemoryTransport {
    pub fn new(identity: BotIdentity) -> Self {
        Self {
            identity,
            sink: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn inject(&self, event: Event) -> BotResult<()> {
        match self.sink.lock().expect("memory sink mutex poisoned").as_ref() {
            Some(sink) => sink.emit(event),
            None => Err(BotError::Transport("not connected".into())),
        }
    }

    pub fn hang_up(&self) {
        if let Some(sink) = self.sink.lock().expect("memory sink mutex poisoned").take() {
            sink.disconnect();
        }
    }

    /// Everything sent so far, as `(channel, text)` pairs.
    pub fn sent(&self) -> Vec<(ChannelId, String)> {
        self.sent.lock().expect("memory sent mutex poisoned").clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|(_, text)| text).collect()
    }

    pub fn last_sent(&self) -> Option<String> {
        self.sent_texts().pop()
    }

    pub fn clear_sent(&self) {
        self.sent.lock().expect("memory sent mutex poisoned").clear();
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&self, credentials: &Credentials, events: EventSink) -> BotResult<()> {
        debug!("Memory transport connecting as {}", credentials.email);
        events.emit(Event::Ready)?;
        *self.sink.lock().expect("memory sink mutex poisoned") = Some(events);
        Ok(())
    }

    async fn send_text(&self, channel: &Channel, text: &str) -> BotResult<()> {
        self.sent
            .lock()
            .expect("memory sent mutex poisoned")
            .push((channel.id.clone(), text.to_string()));
        Ok(())
    }

    fn identity(&self) -> Option<BotIdentity> {
        Some(self.identity.clone())
    }
}
