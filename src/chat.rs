//! Chat entities as the bot sees them.
//!
//! These are the transport-neutral shapes the core works with: identifiers,
//! channels, server directories and inbound messages. A transport converts its
//! own wire objects into these before handing events to the dispatcher.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::permissions::{ChannelScope, ServerScope, Subject};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Stable identifier of a server (guild).
    ServerId
);
string_id!(
    /// Stable identifier of a channel.
    ChannelId
);
string_id!(
    /// Stable identifier of a user account.
    UserId
);
string_id!(
    /// Stable identifier of a server role.
    RoleId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// A channel that belongs to a server.
    Text,
    /// A direct message channel between the bot and one user.
    Private,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    /// Owning server; always `None` for private channels.
    pub server: Option<ServerId>,
    pub kind: ChannelKind,
}

impl Channel {
    pub fn text(id: impl Into<String>, name: impl Into<String>, server: ServerId) -> Self {
        Self {
            id: ChannelId::new(id),
            name: name.into(),
            server: Some(server),
            kind: ChannelKind::Text,
        }
    }

    pub fn private(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id: ChannelId(id),
            server: None,
            kind: ChannelKind::Private,
        }
    }

    pub fn is_private(&self) -> bool {
        self.kind == ChannelKind::Private
    }

    /// The server this channel is inferred to live in.
    pub fn server_scope(&self) -> ServerScope {
        match (&self.server, self.kind) {
            (Some(server), ChannelKind::Text) => ServerScope::Server(server.clone()),
            _ => ServerScope::Global,
        }
    }

    pub fn scope(&self) -> ChannelScope {
        ChannelScope::Channel(self.id.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleInfo {
    pub id: RoleId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    pub id: UserId,
    pub name: String,
}

/// Directory of a server: its roles and members, in the order the service lists them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub id: Option<ServerId>,
    pub name: String,
    pub roles: Vec<RoleInfo>,
    pub members: Vec<MemberInfo>,
}

impl ServerInfo {
    pub fn new(id: ServerId, name: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
            roles: Vec::new(),
            members: Vec::new(),
        }
    }

    pub fn with_role(mut self, id: &str, name: &str) -> Self {
        self.roles.push(RoleInfo {
            id: RoleId::from(id),
            name: name.to_string(),
        });
        self
    }

    pub fn with_member(mut self, id: &str, name: &str) -> Self {
        self.members.push(MemberInfo {
            id: UserId::from(id),
            name: name.to_string(),
        });
        self
    }

    pub fn role_named(&self, name: &str) -> Option<&RoleInfo> {
        self.roles.iter().find(|r| r.name == name)
    }

    pub fn member_named(&self, name: &str) -> Option<&MemberInfo> {
        self.members.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: UserId,
    pub name: String,
    /// Role memberships in the message's server, in membership order.
    #[serde(default)]
    pub roles: Vec<RoleId>,
}

impl Author {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: UserId::from(id),
            name: name.to_string(),
            roles: Vec::new(),
        }
    }

    pub fn with_roles(mut self, roles: &[&str]) -> Self {
        self.roles = roles.iter().map(|r| RoleId::from(*r)).collect();
        self
    }

    /// Mention form the chat service renders as a ping.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

/// How the bot appears on the chat service; source of the mention and name prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub id: UserId,
    pub name: String,
}

impl BotIdentity {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: UserId::from(id),
            name: name.to_string(),
        }
    }

    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub author: Author,
    pub channel: Channel,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Directory of the server the message was sent in, if any.
    pub server: Option<Arc<ServerInfo>>,
}

impl Message {
    pub fn new(author: Author, channel: Channel, content: impl Into<String>) -> Self {
        Self {
            author,
            channel,
            content: content.into(),
            timestamp: Utc::now(),
            server: None,
        }
    }

    pub fn in_server(mut self, server: Arc<ServerInfo>) -> Self {
        self.server = Some(server);
        self
    }

    pub fn server_scope(&self) -> ServerScope {
        self.channel.server_scope()
    }

    /// The permission subject for the author in the context of this message.
    ///
    /// A private channel carries no server membership, so no server or role layers apply.
    pub fn subject(&self) -> Subject {
        if self.channel.is_private() {
            return Subject::user(self.author.id.clone(), None, Vec::new());
        }
        Subject::user(
            self.author.id.clone(),
            self.channel.server.clone(),
            self.author.roles.clone(),
        )
    }
}
