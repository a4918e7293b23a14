//! The fixed set of events a transport may deliver, and their payloads.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::chat::Message;
use crate::error::BotError;

macro_rules! event_kinds {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Every event name handlers may subscribe to.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum EventKind {
            $($variant),+
        }

        impl EventKind {
            pub const ALL: &'static [EventKind] = &[$(EventKind::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(EventKind::$variant => $name),+
                }
            }
        }

        impl FromStr for EventKind {
            type Err = BotError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(EventKind::$variant),)+
                    other => Err(BotError::UnknownEvent(other.to_string())),
                }
            }
        }
    };
}

event_kinds! {
    Ready => "ready",
    Message => "message",
    SocketOpened => "socket_opened",
    SocketClosed => "socket_closed",
    SocketUpdate => "socket_update",
    SocketResponse => "socket_response",
    SocketRawReceive => "socket_raw_receive",
    SocketRawSend => "socket_raw_send",
    MessageDelete => "message_delete",
    MessageEdit => "message_edit",
    ChannelDelete => "channel_delete",
    ChannelCreate => "channel_create",
    ChannelUpdate => "channel_update",
    MemberJoin => "member_join",
    MemberRemove => "member_remove",
    MemberUpdate => "member_update",
    ServerJoin => "server_join",
    ServerRemove => "server_remove",
    ServerUpdate => "server_update",
    ServerRoleCreate => "server_role_create",
    ServerRoleDelete => "server_role_delete",
    ServerRoleUpdate => "server_role_update",
    ServerAvailable => "server_available",
    ServerUnavailable => "server_unavailable",
    VoiceStateUpdate => "voice_state_update",
    MemberBan => "member_ban",
    MemberUnban => "member_unban",
    Typing => "typing",
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One inbound event. Cloning is cheap; every handler in a tier gets its own copy.
#[derive(Debug, Clone)]
pub enum Event {
    Ready,
    Message(Arc<Message>),
    /// Lifecycle events the core does not interpret; the payload is transport-defined.
    Other {
        kind: EventKind,
        payload: serde_json::Value,
    },
}

impl Event {
    pub fn message(message: Message) -> Self {
        Event::Message(Arc::new(message))
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Event::Ready => EventKind::Ready,
            Event::Message(_) => EventKind::Message,
            Event::Other { kind, .. } => *kind,
        }
    }
}
