//! The core module: turns chat messages into authorized command invocations.
use async_trait::async_trait;
use log::{debug, error, info};
use rand::seq::SliceRandom;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::bot::dispatcher::{EventHandler, DEFAULT_PRIORITY};
use crate::bot::events::Event;
use crate::bot::registry::{BotModule, CommandInvocation, ModuleDescriptor};
use crate::bot::router::{CommandRouter, Resolution};
use crate::bot::{sec_log, BotContext};
use crate::chat::Message;
use crate::error::BotResult;

pub const NAME: &str = "core";
pub const NOT_FOUND_REPLY: &str = "I can't find that command.";
pub const FAULT_REPLY: &str = "Something went wrong.";
pub const RELOAD_REPLY: &str = "Discobot reloaded, maybe?";

const VERSION_WORDS: &[&str] = &[
    "semver",
    "alpha",
    "beta",
    "gamma",
    "delta",
    "sigma",
    "kappa",
    "prerelease",
    "rc",
];

pub fn descriptor() -> ModuleDescriptor {
    ModuleDescriptor { name: NAME, build }
}

pub fn denied_reply(qualified: &str) -> String {
    format!(
        "I'm sorry, but you don't have permission to do '{}'.",
        qualified
    )
}

/// `Discobot v<version>-<four random words>`.
pub fn version_string() -> String {
    let mut rng = rand::thread_rng();
    let words: Vec<&str> = (0..4)
        .filter_map(|_| VERSION_WORDS.choose(&mut rng).copied())
        .collect();
    format!("Discobot v{}-{}", env!("CARGO_PKG_VERSION"), words.join("-"))
}

fn build(ctx: &BotContext) -> BotResult<Arc<dyn BotModule>> {
    let core = Arc::new(CoreModule {
        ctx: ctx.clone(),
        router: Mutex::new(None),
        first_time: AtomicBool::new(true),
    });

    let on_ready = core.clone();
    ctx.register(
        "ready",
        0,
        EventHandler::new("core.on_ready", move |_| {
            let core = on_ready.clone();
            async move {
                core.on_ready();
                Ok(())
            }
        }),
    )?;

    let on_message = core.clone();
    ctx.register(
        "message",
        DEFAULT_PRIORITY,
        EventHandler::new("core.on_message", move |event| {
            let core = on_message.clone();
            async move {
                match event {
                    Event::Message(message) => core.on_message(message).await,
                    _ => Ok(()),
                }
            }
        }),
    )?;

    info!("DiscobotCore, at your service.");
    let module: Arc<dyn BotModule> = core;
    Ok(module)
}

pub struct CoreModule {
    ctx: BotContext,
    /// Set on `ready`, once the bot's own identity is known.
    router: Mutex<Option<CommandRouter>>,
    first_time: AtomicBool,
}

impl CoreModule {
    fn router(&self) -> Option<CommandRouter> {
        self.router.lock().expect("core router mutex poisoned").clone()
    }

    fn on_ready(&self) {
        let first = self.first_time.swap(false, Ordering::SeqCst);
        info!(
            "Transport reports ready {}",
            if first { "for the first time" } else { "again..." }
        );
        debug!("Setting up command prefixes");
        let identity = self.ctx.transport().identity();
        let router = CommandRouter::new(&self.ctx.config().bot.prefix, identity.as_ref());
        *self.router.lock().expect("core router mutex poisoned") = Some(router);
    }

    async fn on_message(&self, message: Arc<Message>) -> anyhow::Result<()> {
        info!(
            "[{}] <{}@{}> {}",
            message.timestamp.format("%Y-%m-%dT%H:%M:%SZ"),
            message.author.name,
            message.channel.name,
            message.content.escape_debug()
        );
        if let Some(me) = self.ctx.transport().identity() {
            if me.id == message.author.id {
                return Ok(());
            }
        }
        let Some(router) = self.router() else {
            debug!("Ignoring message received before ready");
            return Ok(());
        };

        let modules = self.ctx.registry().instances();
        match router.resolve(&message.content, message.channel.kind, &modules) {
            Resolution::NotACommand => Ok(()),
            Resolution::NotFound(parsed) => {
                debug!("No module exposes command {:?}", parsed.command);
                self.ctx.respond(&message, NOT_FOUND_REPLY).await?;
                Ok(())
            }
            Resolution::Found { command, rest } => {
                let verdict = self.ctx.has_permission(
                    &message.subject(),
                    &command.qualified,
                    Some(&message.channel),
                );
                if !verdict.is_grant() {
                    sec_log!(
                        "Denied {} to {} ({}) in #{}",
                        command.qualified,
                        message.author.name,
                        message.author.id,
                        message.channel.name
                    );
                    self.ctx
                        .respond(&message, &denied_reply(&command.qualified))
                        .await?;
                    return Ok(());
                }
                let invocation = CommandInvocation {
                    message: message.clone(),
                    rest,
                };
                if let Err(e) = command.invoke(invocation).await {
                    error!("Command {} failed: {:#}", command.qualified, e);
                    self.ctx.respond(&message, FAULT_REPLY).await?;
                }
                Ok(())
            }
        }
    }

    async fn cmd_help(&self, invocation: CommandInvocation) -> anyhow::Result<()> {
        self.ctx
            .respond(&invocation.message, &version_string())
            .await?;
        Ok(())
    }

    async fn cmd_reload(&self, invocation: CommandInvocation) -> anyhow::Result<()> {
        self.ctx.reload()?;
        self.ctx.respond(&invocation.message, RELOAD_REPLY).await?;
        Ok(())
    }
}

#[async_trait]
impl BotModule for CoreModule {
    fn name(&self) -> &str {
        NAME
    }

    fn commands(&self) -> &[&'static str] {
        &["help", "reload"]
    }

    async fn run_command(&self, command: &str, invocation: CommandInvocation) -> anyhow::Result<()> {
        match command {
            "help" => self.cmd_help(invocation).await,
            "reload" => self.cmd_reload(invocation).await,
            other => Err(anyhow::anyhow!("core has no command {}", other)),
        }
    }

    fn unload(&self) {
        self.router.lock().expect("core router mutex poisoned").take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_has_four_words() {
        let v = version_string();
        let suffix = v
            .strip_prefix(&format!("Discobot v{}-", env!("CARGO_PKG_VERSION")))
            .expect("prefix");
        let words: Vec<&str> = suffix.split('-').collect();
        assert_eq!(words.len(), 4);
        assert!(words.iter().all(|w| VERSION_WORDS.contains(w)));
    }

    #[test]
    fn denial_names_the_command() {
        assert_eq!(
            denied_reply("core:reload"),
            "I'm sorry, but you don't have permission to do 'core:reload'."
        );
    }
}
