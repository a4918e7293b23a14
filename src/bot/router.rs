//! Command recognition and resolution.
//!
//! A message is a command when it starts with one of the recognised prefixes:
//! the static prefix (e.g. `!`), the bot's mention, or `"<name>: "`. In private
//! channels no prefix is needed at all. After the prefix comes
//! `[module:]command [args]`; modules are searched newest first so a later
//! module can shadow an earlier one, and a module qualifier picks one explicitly.
use log::trace;
use std::sync::Arc;

use super::registry::{BotModule, CommandInvocation};
use crate::chat::{BotIdentity, ChannelKind};

/// The pieces of a command line, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub module: Option<String>,
    pub command: String,
    pub rest: String,
}

/// A command bound to the module that will run it.
#[derive(Clone)]
pub struct ResolvedCommand {
    pub module: Arc<dyn BotModule>,
    pub command: String,
    /// `"<module>:<command>"`; also the permission checked before running.
    pub qualified: String,
}

impl ResolvedCommand {
    pub async fn invoke(&self, invocation: CommandInvocation) -> anyhow::Result<()> {
        self.module.run_command(&self.command, invocation).await
    }
}

impl std::fmt::Debug for ResolvedCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedCommand")
            .field("qualified", &self.qualified)
            .finish()
    }
}

#[derive(Debug)]
pub enum Resolution {
    /// No recognised prefix; the text is ordinary chat.
    NotACommand,
    /// Looked like a command but no module exposes it.
    NotFound(ParsedCommand),
    Found {
        command: ResolvedCommand,
        rest: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRouter {
    prefixes: Vec<String>,
}

impl CommandRouter {
    pub fn new(static_prefix: &str, identity: Option<&BotIdentity>) -> Self {
        let mut prefixes = vec![static_prefix.to_string()];
        if let Some(me) = identity {
            prefixes.push(me.mention());
            prefixes.push(format!("{}: ", me.name));
        }
        prefixes.retain(|p| !p.is_empty());
        Self { prefixes }
    }

    /// Prefixes recognised in a channel of the given kind, in match order.
    pub fn prefixes(&self, kind: ChannelKind) -> Vec<&str> {
        let mut out: Vec<&str> = self.prefixes.iter().map(String::as_str).collect();
        if kind == ChannelKind::Private {
            out.push("");
        }
        out
    }

    /// Text after the first matching prefix, or `None` if nothing matches.
    pub fn strip_prefix<'a>(&self, text: &'a str, kind: ChannelKind) -> Option<&'a str> {
        self.prefixes(kind)
            .into_iter()
            .find_map(|prefix| text.strip_prefix(prefix))
    }

    pub fn parse(&self, text: &str, kind: ChannelKind) -> Option<ParsedCommand> {
        let body = self.strip_prefix(text, kind)?.trim_start();
        if body.is_empty() {
            return None;
        }
        let (token, rest) = match body.split_once(char::is_whitespace) {
            Some((token, rest)) => (token, rest.trim_start()),
            None => (body, ""),
        };
        let (module, command) = match token.split_once(':') {
            Some((module, command)) => (Some(module.to_string()), command),
            None => (None, token),
        };
        trace!("Parsed command {:?} (module {:?}) from '{}'", command, module, text);
        Some(ParsedCommand {
            module,
            command: command.to_string(),
            rest: rest.to_string(),
        })
    }

    pub fn resolve(
        &self,
        text: &str,
        kind: ChannelKind,
        modules: &[Arc<dyn BotModule>],
    ) -> Resolution {
        let Some(parsed) = self.parse(text, kind) else {
            return Resolution::NotACommand;
        };
        match find_command(modules, parsed.module.as_deref(), &parsed.command) {
            Some(command) => Resolution::Found {
                command,
                rest: parsed.rest,
            },
            None => Resolution::NotFound(parsed),
        }
    }
}

/// Search `modules` newest first, optionally restricted to the module named `qualifier`.
pub fn find_command(
    modules: &[Arc<dyn BotModule>],
    qualifier: Option<&str>,
    command: &str,
) -> Option<ResolvedCommand> {
    modules
        .iter()
        .rev()
        .filter(|m| qualifier.map_or(true, |q| m.name() == q))
        .find(|m| m.has_command(command))
        .map(|m| ResolvedCommand {
            module: m.clone(),
            command: command.to_string(),
            qualified: format!("{}:{}", m.name(), command),
        })
}
