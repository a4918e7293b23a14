//! # Layered Permissions
//!
//! Permissions are stored as a tri-state value per `(server, channel, target, name)`
//! key. Keys may use the global server and global channel scopes, and the
//! [`Target::Everyone`] target, so a single check consults several layers:
//!
//! ```text
//! global / everyone        global / user
//! server / everyone        server / user
//! channel / everyone       channel / user
//! server / role ...        channel / role ...
//! ```
//!
//! A [`PermissionValue::Deny`] in any applicable layer vetoes the permission.
//! Otherwise one [`PermissionValue::Grant`] anywhere is enough. With nothing stored
//! the answer is deny. Configured superusers skip the table entirely.
//!
//! - [`store`] - the permission table and the layered lookup
//! - [`grants`] - parsing of the `<where> <who> <what>` arguments of grant/revoke

pub mod grants;
pub mod store;

pub use grants::{parse_revoke_grant, PermissionAssignment, UsageError, WHERE_ERROR, WHO_ERROR};
pub use store::{Layer, PermissionKey, PermissionStore};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::chat::{ChannelId, RoleId, ServerId, UserId};

/// Stored state of one permission at one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PermissionValue {
    Grant,
    Deny,
    #[default]
    Unset,
}

impl PermissionValue {
    pub fn is_grant(self) -> bool {
        self == PermissionValue::Grant
    }
}

impl fmt::Display for PermissionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PermissionValue::Grant => "grant",
            PermissionValue::Deny => "deny",
            PermissionValue::Unset => "unset",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ServerScope {
    Global,
    Server(ServerId),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChannelScope {
    Global,
    Channel(ChannelId),
}

/// Who a stored entry applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Target {
    Everyone,
    User(UserId),
    Role(RoleId),
}

impl fmt::Display for ServerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerScope::Global => f.write_str("global:server"),
            ServerScope::Server(id) => write!(f, "server:{id}"),
        }
    }
}

impl fmt::Display for ChannelScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelScope::Global => f.write_str("global:channel"),
            ChannelScope::Channel(id) => write!(f, "channel:{id}"),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Everyone => f.write_str("everyone"),
            Target::User(id) => write!(f, "user:{id}"),
            Target::Role(id) => write!(f, "role:{id}"),
        }
    }
}

/// A user in the context of a check: optional server membership plus roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSubject {
    pub id: UserId,
    pub server: Option<ServerId>,
    pub roles: Vec<RoleId>,
}

/// The party a permission check is made for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    User(UserSubject),
    Role(RoleId),
}

impl Subject {
    pub fn user(id: UserId, server: Option<ServerId>, roles: Vec<RoleId>) -> Self {
        Subject::User(UserSubject { id, server, roles })
    }

    /// A user with no server membership, as seen in a private channel.
    pub fn lone_user(id: &str) -> Self {
        Subject::user(UserId::from(id), None, Vec::new())
    }

    pub fn target(&self) -> Target {
        match self {
            Subject::User(u) => Target::User(u.id.clone()),
            Subject::Role(r) => Target::Role(r.clone()),
        }
    }

    pub fn server(&self) -> Option<&ServerId> {
        match self {
            Subject::User(u) => u.server.as_ref(),
            Subject::Role(_) => None,
        }
    }

    pub fn roles(&self) -> &[RoleId] {
        match self {
            Subject::User(u) => &u.roles,
            Subject::Role(_) => &[],
        }
    }

    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Subject::User(u) => Some(&u.id),
            Subject::Role(_) => None,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.target().fmt(f)
    }
}
