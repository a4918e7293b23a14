//! # Chat Transport Capability
//!
//! The bot never speaks a chat service's wire protocol itself. A [`Transport`]
//! logs in, turns service events into [`Event`]s pushed through an [`EventSink`],
//! and delivers text replies to channels.
//!
//! - [`console`] - stdin/stdout transport for local use
//! - [`memory`] - recording transport for tests and embedding

pub mod console;
pub mod memory;

pub use console::ConsoleTransport;
pub use memory::MemoryTransport;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::bot::events::{Event, EventKind};
use crate::chat::{BotIdentity, Channel};
use crate::config::Credentials;
use crate::error::{BotError, BotResult};

#[async_trait]
pub trait Transport: Send + Sync {
    /// Log in and start delivering events into `events`.
    async fn connect(&self, credentials: &Credentials, events: EventSink) -> BotResult<()>;

    async fn send_text(&self, channel: &Channel, text: &str) -> BotResult<()>;

    /// The bot's own account, once known (normally after `ready`).
    fn identity(&self) -> Option<BotIdentity>;
}

/// What the runtime's inbound queue carries.
#[derive(Debug)]
pub(crate) enum Inbound {
    Event(Event),
    Disconnected,
}

/// Handle a transport uses to feed events to the bot.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<Inbound>,
}

impl EventSink {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Inbound>) -> Self {
        Self { tx }
    }

    pub fn emit(&self, event: Event) -> BotResult<()> {
        self.tx
            .send(Inbound::Event(event))
            .map_err(|_| BotError::Transport("bot event queue closed".into()))
    }

    /// Emit a lifecycle event by its service name.
    ///
    /// Names outside the fixed set are refused. `ready` needs no payload;
    /// `message` must go through [`EventSink::emit`] with a structured message.
    pub fn emit_named(&self, name: &str, payload: serde_json::Value) -> BotResult<()> {
        let kind: EventKind = name.parse()?;
        let event = match kind {
            EventKind::Ready => Event::Ready,
            EventKind::Message => {
                return Err(BotError::Transport(
                    "message events need a structured payload".into(),
                ))
            }
            kind => Event::Other { kind, payload },
        };
        self.emit(event)
    }

    /// Tell the runtime the connection is gone; the run loop exits once it gets here.
    pub fn disconnect(&self) {
        let _ = self.tx.send(Inbound::Disconnected);
    }
}
