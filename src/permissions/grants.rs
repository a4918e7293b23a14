//! Argument parsing for the `grant` and `revoke` commands.
//!
//! Both commands take `<where> <who> <what>`:
//! - `where`: `global`, `server` or `channel` (relative to the message)
//! - `who`: `everyone`, a role name (not at global scope) or a member name
//! - `what`: the permission name, verbatim (e.g. `core:help`)
use super::{ChannelScope, PermissionKey, ServerScope, Target};
use crate::chat::Message;

pub const WHERE_ERROR: &str = r#"<where> must be "global", "server", or "channel""#;
pub const WHO_ERROR: &str =
    r#"<who> must be a username or a role - roles cannot be used if <where> is "global""#;

/// A parsed grant/revoke request, ready to be written to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionAssignment {
    pub server: ServerScope,
    pub channel: ChannelScope,
    pub target: Target,
    pub permission: String,
    target_name: String,
    channel_name: Option<String>,
}

impl PermissionAssignment {
    pub fn key(&self) -> PermissionKey {
        PermissionKey {
            server: self.server.clone(),
            channel: self.channel.clone(),
            target: self.target.clone(),
            permission: self.permission.clone(),
        }
    }

    /// Human name of the target: `everyone`, or the role/member name.
    pub fn who(&self) -> &str {
        &self.target_name
    }

    /// Human description of the scope used in confirmation replies.
    pub fn place(&self) -> String {
        match (&self.server, &self.channel_name) {
            (ServerScope::Global, _) => "every server".to_string(),
            (_, None) => "this server".to_string(),
            (_, Some(name)) => format!("#{}", name),
        }
    }
}

/// The arguments could not be turned into an assignment.
///
/// `message` is `None` when the argument count was wrong; callers then show
/// their own usage line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageError {
    pub message: Option<String>,
}

impl UsageError {
    fn wrong_arity() -> Self {
        Self { message: None }
    }

    fn with(msg: &str) -> Self {
        Self {
            message: Some(msg.to_string()),
        }
    }

    pub fn reply_or(&self, usage: &str) -> String {
        self.message.clone().unwrap_or_else(|| usage.to_string())
    }
}

pub fn parse_revoke_grant(message: &Message, rest: &str) -> Result<PermissionAssignment, UsageError> {
    let bits: Vec<&str> = rest.split_whitespace().collect();
    let [where_str, who_str, what_str] = bits.as_slice() else {
        return Err(UsageError::wrong_arity());
    };

    let here = message.server_scope();
    let (server, channel, channel_name) = match *where_str {
        "global" => (ServerScope::Global, ChannelScope::Global, None),
        "server" | "channel" if here == ServerScope::Global => {
            return Err(UsageError::with(WHERE_ERROR));
        }
        "server" => (here, ChannelScope::Global, None),
        "channel" => (
            here,
            message.channel.scope(),
            Some(message.channel.name.clone()),
        ),
        _ => return Err(UsageError::with(WHERE_ERROR)),
    };

    let directory = message.server.as_deref();
    let target = if *who_str == "everyone" {
        Some((Target::Everyone, "everyone".to_string()))
    } else {
        let role = match server {
            ServerScope::Global => None,
            ServerScope::Server(_) => directory
                .and_then(|d| d.role_named(who_str))
                .map(|r| (Target::Role(r.id.clone()), r.name.clone())),
        };
        role.or_else(|| {
            directory
                .and_then(|d| d.member_named(who_str))
                .map(|m| (Target::User(m.id.clone()), m.name.clone()))
        })
    };
    let Some((target, target_name)) = target else {
        return Err(UsageError::with(WHO_ERROR));
    };

    Ok(PermissionAssignment {
        server,
        channel,
        target,
        permission: what_str.to_string(),
        target_name,
        channel_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{Author, Channel, RoleId, ServerId, ServerInfo, UserId};
    use std::sync::Arc;

    fn message_in_general() -> Message {
        let server = ServerInfo::new(ServerId::from("s1"), "Test Server")
            .with_role("r-mods", "mods")
            .with_role("r-dup", "alice")
            .with_member("u-alice", "alice")
            .with_member("u-bob", "bob");
        Message::new(
            Author::new("u-bob", "bob"),
            Channel::text("c1", "general", ServerId::from("s1")),
            "!grant",
        )
        .in_server(Arc::new(server))
    }

    #[test]
    fn global_everyone() {
        let msg = message_in_general();
        let a = parse_revoke_grant(&msg, "global everyone core:help").expect("parsed");
        assert_eq!(a.server, ServerScope::Global);
        assert_eq!(a.channel, ChannelScope::Global);
        assert_eq!(a.target, Target::Everyone);
        assert_eq!(a.permission, "core:help");
        assert_eq!(a.who(), "everyone");
        assert_eq!(a.place(), "every server");
    }

    #[test]
    fn channel_scope_uses_message_channel() {
        let msg = message_in_general();
        let a = parse_revoke_grant(&msg, "channel mods core:reload").expect("parsed");
        assert_eq!(a.server, ServerScope::Server(ServerId::from("s1")));
        assert_eq!(a.channel, ChannelScope::Channel("c1".into()));
        assert_eq!(a.target, Target::Role(RoleId::from("r-mods")));
        assert_eq!(a.place(), "#general");
    }

    #[test]
    fn role_beats_member_with_same_name() {
        let msg = message_in_general();
        let a = parse_revoke_grant(&msg, "server alice x").expect("parsed");
        assert_eq!(a.target, Target::Role(RoleId::from("r-dup")));
        assert_eq!(a.place(), "this server");
    }

    #[test]
    fn global_scope_skips_roles() {
        let msg = message_in_general();
        let a = parse_revoke_grant(&msg, "global alice x").expect("parsed");
        assert_eq!(a.target, Target::User(UserId::from("u-alice")));
        assert_eq!(
            parse_revoke_grant(&msg, "global mods x"),
            Err(UsageError::with(WHO_ERROR))
        );
    }

    #[test]
    fn wrong_arity_has_no_message() {
        let msg = message_in_general();
        let err = parse_revoke_grant(&msg, "global everyone").unwrap_err();
        assert_eq!(err.message, None);
        assert_eq!(err.reply_or("usage"), "usage");
        assert!(parse_revoke_grant(&msg, "global everyone a b").is_err());
    }

    #[test]
    fn bad_where_is_reported() {
        let msg = message_in_general();
        let err = parse_revoke_grant(&msg, "galaxy everyone x").unwrap_err();
        assert_eq!(err.message.as_deref(), Some(WHERE_ERROR));
    }

    #[test]
    fn unknown_who_is_reported() {
        let msg = message_in_general();
        let err = parse_revoke_grant(&msg, "server nobody x").unwrap_err();
        assert_eq!(err.message.as_deref(), Some(WHO_ERROR));
    }
}
