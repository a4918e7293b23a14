//! Permission table and layered authorization lookup.
use log::{debug, info, trace};
use std::collections::{HashMap, HashSet};
use std::fmt;

use super::{ChannelScope, PermissionValue, ServerScope, Subject, Target};
use crate::chat::{Channel, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PermissionKey {
    pub server: ServerScope,
    pub channel: ChannelScope,
    pub target: Target,
    pub permission: String,
}

/// One `(server, channel, target)` slot consulted during a check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub server: ServerScope,
    pub channel: ChannelScope,
    pub target: Target,
}

impl Layer {
    fn new(server: ServerScope, channel: ChannelScope, target: Target) -> Self {
        Self {
            server,
            channel,
            target,
        }
    }

    fn key(&self, permission: &str) -> PermissionKey {
        PermissionKey {
            server: self.server.clone(),
            channel: self.channel.clone(),
            target: self.target.clone(),
            permission: permission.to_string(),
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.server, self.channel, self.target)
    }
}

/// In-memory permission table plus the configured superuser set.
#[derive(Debug, Default)]
pub struct PermissionStore {
    entries: HashMap<PermissionKey, PermissionValue>,
    superusers: HashSet<UserId>,
}

impl PermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store whose superuser set is fixed for its whole lifetime.
    pub fn with_superusers<I>(superusers: I) -> Self
    where
        I: IntoIterator<Item = UserId>,
    {
        Self {
            entries: HashMap::new(),
            superusers: superusers.into_iter().collect(),
        }
    }

    pub fn is_superuser(&self, id: &UserId) -> bool {
        self.superusers.contains(id)
    }

    pub fn superusers(&self) -> impl Iterator<Item = &UserId> {
        self.superusers.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Store `value` for `target`, scoping it from the optional channel and server.
    ///
    /// Without an explicit server, a non-private channel contributes its own server;
    /// everything else lands on the global server. The channel defaults to global.
    pub fn set_permission(
        &mut self,
        target: Target,
        permission: &str,
        value: PermissionValue,
        channel: Option<&Channel>,
        server: Option<ServerScope>,
    ) {
        let server = match (server, channel) {
            (Some(server), _) => server,
            (None, Some(ch)) if !ch.is_private() => ch.server_scope(),
            _ => ServerScope::Global,
        };
        let channel = channel.map(Channel::scope).unwrap_or(ChannelScope::Global);
        self.set_entry(
            PermissionKey {
                server,
                channel,
                target,
                permission: permission.to_string(),
            },
            value,
        );
    }

    /// Write one fully scoped entry. `Unset` removes the entry.
    pub fn set_entry(&mut self, key: PermissionKey, value: PermissionValue) {
        debug!(
            "Setting {} at {}/{}/{} to {}",
            key.permission, key.server, key.channel, key.target, value
        );
        match value {
            PermissionValue::Unset => {
                self.entries.remove(&key);
            }
            v => {
                self.entries.insert(key, v);
            }
        }
    }

    pub fn get(&self, key: &PermissionKey) -> PermissionValue {
        self.entries.get(key).copied().unwrap_or_default()
    }

    /// The layers that apply to `subject` in `channel`, in scan order.
    pub fn layers(&self, subject: &Subject, channel: Option<&Channel>) -> Vec<Layer> {
        let me = subject.target();
        let mut layers = vec![
            Layer::new(ServerScope::Global, ChannelScope::Global, Target::Everyone),
            Layer::new(ServerScope::Global, ChannelScope::Global, me.clone()),
        ];

        let home = subject
            .server()
            .map(|s| ServerScope::Server(s.clone()))
            .unwrap_or(ServerScope::Global);

        if subject.server().is_some() {
            layers.push(Layer::new(home.clone(), ChannelScope::Global, Target::Everyone));
            layers.push(Layer::new(home.clone(), ChannelScope::Global, me.clone()));
        }

        if let Some(ch) = channel {
            layers.push(Layer::new(ch.server_scope(), ch.scope(), Target::Everyone));
            layers.push(Layer::new(ch.server_scope(), ch.scope(), me));
        }

        for role in subject.roles() {
            let role = Target::Role(role.clone());
            layers.push(Layer::new(home.clone(), ChannelScope::Global, role.clone()));
            if let Some(ch) = channel {
                layers.push(Layer::new(home.clone(), ch.scope(), role));
            }
        }

        layers
    }

    /// Decide whether `subject` holds `permission`, optionally in `channel`.
    ///
    /// Always returns `Grant` or `Deny`, never `Unset`.
    pub fn has_permission(
        &self,
        subject: &Subject,
        permission: &str,
        channel: Option<&Channel>,
    ) -> PermissionValue {
        debug!("Checking permission {} for {}", permission, subject);
        if let Some(id) = subject.user_id() {
            if self.is_superuser(id) {
                info!(target: "security", "Permission {} granted to {}: is superuser", permission, id);
                return PermissionValue::Grant;
            }
        }

        let mut verdict = PermissionValue::Deny;
        for layer in self.layers(subject, channel) {
            match self.get(&layer.key(permission)) {
                PermissionValue::Deny => {
                    debug!(
                        "Permission {} denied to {}: deny found in layer {}",
                        permission, subject, layer
                    );
                    return PermissionValue::Deny;
                }
                PermissionValue::Grant => {
                    trace!(
                        "Permission {} might be granted to {}: grant found in layer {}",
                        permission,
                        subject,
                        layer
                    );
                    verdict = PermissionValue::Grant;
                }
                PermissionValue::Unset => {}
            }
        }

        debug!(
            "Final verdict: {} for {} is {}",
            permission, subject, verdict
        );
        verdict
    }
}
