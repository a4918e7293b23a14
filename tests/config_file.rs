use std::sync::Arc;

use discobot::bot::dispatcher::FaultPolicy;
use discobot::bot::events::Event;
use discobot::bot::Bot;
use discobot::chat::{Author, BotIdentity, Channel, Message, ServerId};
use discobot::config::{Config, MapEnviron, ENV_BOTMASTERS, ENV_PREFIX};
use discobot::transport::MemoryTransport;
use discobot::BotError;

#[tokio::test]
async fn default_file_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let path = path.to_str().unwrap();

    Config::create_default(path).await.unwrap();
    let config = Config::load(path).await.unwrap();
    assert_eq!(config.bot.prefix, "!");
    assert_eq!(config.bot.name, "discobot");
    assert_eq!(config.bot.fault_policy, FaultPolicy::Isolate);
    assert!(config.bot.superusers.is_empty());
    assert_eq!(config.logging.level, "info");
    assert!(config.logging.file.is_none());
}

#[tokio::test]
async fn file_values_and_environment_overlay() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bot.toml");
    std::fs::write(
        &path,
        r#"
[bot]
name = "groovy"
prefix = "?"
fault_policy = "fail_fast"
superusers = ["10"]

[logging]
file = "groovy.log"
"#,
    )
    .unwrap();

    let mut config = Config::load(path.to_str().unwrap()).await.unwrap();
    assert_eq!(config.bot.name, "groovy");
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.file.as_deref(), Some("groovy.log"));

    let env = MapEnviron::new()
        .with(ENV_PREFIX, "$")
        .with(ENV_BOTMASTERS, "10;20");
    config.apply_environ(&env);
    assert_eq!(config.bot.prefix, "$");
    assert_eq!(config.bot.superusers, vec!["10", "20"]);
    assert_eq!(config.bot.fault_policy, FaultPolicy::FailFast);
}

#[tokio::test]
async fn unreadable_or_malformed_files_fail_with_context() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    let err = Config::load(missing.to_str().unwrap()).await.unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));

    let broken = dir.path().join("broken.toml");
    std::fs::write(&broken, "[bot\nprefix = ").unwrap();
    let err = Config::load(broken.to_str().unwrap()).await.unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}

#[tokio::test]
async fn configured_prefix_drives_routing() {
    let mut config = Config::default();
    config.bot.prefix = "?".into();
    config.bot.superusers = vec!["1".into()];
    let transport = Arc::new(MemoryTransport::new(BotIdentity::new("999", "disco")));
    let bot = Bot::with_default_modules(config, Arc::new(MapEnviron::new()), transport.clone())
        .unwrap();
    bot.handle(Event::Ready).await.unwrap();

    let channel = Channel::text("c1", "general", ServerId::new("s1"));
    bot.handle(Event::message(Message::new(
        Author::new("1", "admin"),
        channel.clone(),
        "!help",
    )))
    .await
    .unwrap();
    assert!(transport.sent().is_empty());

    bot.handle(Event::message(Message::new(
        Author::new("1", "admin"),
        channel,
        "?help",
    )))
    .await
    .unwrap();
    assert!(transport.last_sent().unwrap().starts_with("<@1> Discobot v"));
}

#[test]
fn invalid_prefix_is_rejected_at_startup() {
    let mut config = Config::default();
    config.bot.prefix = "hey bot".into();
    let transport = Arc::new(MemoryTransport::new(BotIdentity::new("999", "disco")));
    let result = Bot::with_default_modules(config, Arc::new(MapEnviron::new()), transport);
    assert!(matches!(result, Err(BotError::InvalidConfig(_))));
}

#[tokio::test]
async fn environ_supplies_superusers_and_prefix() {
    let environ = MapEnviron::new()
        .with(ENV_BOTMASTERS, "2;")
        .with(ENV_PREFIX, "%");
    let transport = Arc::new(MemoryTransport::new(BotIdentity::new("999", "disco")));
    let bot = Bot::with_default_modules(Config::default(), Arc::new(environ), transport.clone())
        .unwrap();
    assert_eq!(bot.context().config().bot.prefix, "%");
    assert!(bot
        .context()
        .permissions()
        .superusers()
        .any(|id| id.as_str() == "2"));

    bot.handle(Event::Ready).await.unwrap();
    let channel = Channel::text("c1", "general", ServerId::new("s1"));
    bot.handle(Event::message(Message::new(
        Author::new("2", "bob"),
        channel.clone(),
        "%help",
    )))
    .await
    .unwrap();
    assert!(transport.last_sent().unwrap().starts_with("<@2> Discobot v"));

    let subject = discobot::permissions::Subject::lone_user("2");
    assert_eq!(
        bot.context().has_permission(&subject, "core:reload", Some(&channel)),
        discobot::permissions::PermissionValue::Grant
    );
}
