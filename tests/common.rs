//! Test utilities & fixtures.
//! One server ("s1") with two text channels, a handful of members and a `mods` role,
//! plus a bot wired to a [`MemoryTransport`].
#![allow(dead_code)]

use std::sync::Arc;

use discobot::bot::events::Event;
use discobot::bot::registry::ModuleDescriptor;
use discobot::bot::Bot;
use discobot::chat::{Author, BotIdentity, Channel, Message, ServerId, ServerInfo};
use discobot::config::{Config, MapEnviron, ENV_EMAIL, ENV_PASSWORD};
use discobot::modules::default_descriptors;
use discobot::transport::MemoryTransport;

pub const BOT_ID: &str = "999";
pub const BOT_NAME: &str = "disco";
pub const ADMIN_ID: &str = "1";
pub const SERVER: &str = "s1";

pub fn server() -> Arc<ServerInfo> {
    Arc::new(
        ServerInfo::new(ServerId::new(SERVER), "Disco Hall")
            .with_role("r-mods", "mods")
            .with_member(ADMIN_ID, "admin")
            .with_member("2", "bob")
            .with_member("3", "carol"),
    )
}

pub fn general() -> Channel {
    Channel::text("c1", "general", ServerId::new(SERVER))
}

pub fn random() -> Channel {
    Channel::text("c2", "random", ServerId::new(SERVER))
}

pub fn admin() -> Author {
    Author::new(ADMIN_ID, "admin")
}

pub fn bob() -> Author {
    Author::new("2", "bob")
}

pub fn carol() -> Author {
    Author::new("3", "carol").with_roles(&["r-mods"])
}

/// A message event; server channels carry the server directory.
pub fn said(author: Author, channel: Channel, content: &str) -> Event {
    let private = channel.is_private();
    let message = Message::new(author, channel, content);
    if private {
        Event::message(message)
    } else {
        Event::message(message.in_server(server()))
    }
}

pub fn environ() -> MapEnviron {
    MapEnviron::new()
        .with(ENV_EMAIL, "bot@example.com")
        .with(ENV_PASSWORD, "hunter2")
}

pub fn config() -> Config {
    let mut config = Config::default();
    config.bot.superusers = vec![ADMIN_ID.to_string()];
    config
}

pub fn transport() -> Arc<MemoryTransport> {
    Arc::new(MemoryTransport::new(BotIdentity::new(BOT_ID, BOT_NAME)))
}

/// Bot built from `descriptors` that has not seen `ready` yet.
pub fn bot_with(descriptors: Vec<ModuleDescriptor>) -> (Bot, Arc<MemoryTransport>) {
    let transport = transport();
    let bot = Bot::new(config(), Arc::new(environ()), transport.clone(), descriptors)
        .expect("bot builds");
    (bot, transport)
}

/// Default modules, already past `ready`.
pub async fn ready_bot() -> (Bot, Arc<MemoryTransport>) {
    ready_bot_with(default_descriptors()).await
}

pub async fn ready_bot_with(descriptors: Vec<ModuleDescriptor>) -> (Bot, Arc<MemoryTransport>) {
    let (bot, transport) = bot_with(descriptors);
    bot.handle(Event::Ready).await.expect("ready dispatches");
    (bot, transport)
}
