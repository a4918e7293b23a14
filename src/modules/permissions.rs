//! `grant` and `revoke`: write permission entries from chat.
//!
//! Both take `<where> <who> <what>` (see [`crate::permissions::grants`]) and must be
//! sent in a server channel. Who may run them is itself a permission:
//! `permissions:grant` and `permissions:revoke`.
use async_trait::async_trait;
use log::info;
use std::sync::Arc;

use crate::bot::registry::{BotModule, CommandInvocation, ModuleDescriptor};
use crate::bot::{sec_log, BotContext};
use crate::error::BotResult;
use crate::permissions::{parse_revoke_grant, PermissionValue};

pub const NAME: &str = "permissions";

pub fn descriptor() -> ModuleDescriptor {
    ModuleDescriptor { name: NAME, build }
}

fn build(ctx: &BotContext) -> BotResult<Arc<dyn BotModule>> {
    info!("DiscobotPermissions, at your service.");
    let module: Arc<dyn BotModule> = Arc::new(PermissionsModule { ctx: ctx.clone() });
    Ok(module)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Grant,
    Revoke,
}

impl Verb {
    fn name(self) -> &'static str {
        match self {
            Verb::Grant => "grant",
            Verb::Revoke => "revoke",
        }
    }

    fn value(self) -> PermissionValue {
        match self {
            Verb::Grant => PermissionValue::Grant,
            Verb::Revoke => PermissionValue::Deny,
        }
    }

    fn usage(self) -> String {
        format!(
            "{} <where:global/server/channel> <who:everyone/username/rolename> <what>",
            self.name()
        )
    }

    fn confirmation(self, what: &str, who: &str, place: &str) -> String {
        match self {
            Verb::Grant => format!("Granted {} to {} on {}", what, who, place),
            Verb::Revoke => format!("Revoked {} from {} on {}", what, who, place),
        }
    }
}

pub struct PermissionsModule {
    ctx: BotContext,
}

impl PermissionsModule {
    async fn assign(&self, verb: Verb, invocation: CommandInvocation) -> anyhow::Result<()> {
        let message = &invocation.message;
        if message.channel.is_private() {
            let reply = format!("{} must be sent in a channel, not via PM", verb.name());
            self.ctx.respond(message, &reply).await?;
            return Ok(());
        }

        let assignment = match parse_revoke_grant(message, &invocation.rest) {
            Ok(assignment) => assignment,
            Err(usage) => {
                self.ctx
                    .respond(message, &usage.reply_or(&verb.usage()))
                    .await?;
                return Ok(());
            }
        };

        self.ctx
            .permissions()
            .set_entry(assignment.key(), verb.value());
        sec_log!(
            "{} by {} ({}): {} for {} at {}/{}",
            verb.name(),
            message.author.name,
            message.author.id,
            assignment.permission,
            assignment.target,
            assignment.server,
            assignment.channel
        );

        let reply = verb.confirmation(&assignment.permission, assignment.who(), &assignment.place());
        self.ctx.respond(message, &reply).await?;
        Ok(())
    }
}

#[async_trait]
impl BotModule for PermissionsModule {
    fn name(&self) -> &str {
        NAME
    }

    fn commands(&self) -> &[&'static str] {
        &["grant", "revoke"]
    }

    async fn run_command(&self, command: &str, invocation: CommandInvocation) -> anyhow::Result<()> {
        match command {
            "grant" => self.assign(Verb::Grant, invocation).await,
            "revoke" => self.assign(Verb::Revoke, invocation).await,
            other => Err(anyhow::anyhow!("permissions has no command {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_and_confirmations() {
        assert_eq!(
            Verb::Revoke.usage(),
            "revoke <where:global/server/channel> <who:everyone/username/rolename> <what>"
        );
        assert_eq!(
            Verb::Grant.confirmation("core:help", "everyone", "every server"),
            "Granted core:help to everyone on every server"
        );
        assert_eq!(
            Verb::Revoke.confirmation("core:help", "mods", "#general"),
            "Revoked core:help from mods on #general"
        );
        assert_eq!(Verb::Revoke.value(), PermissionValue::Deny);
    }
}
