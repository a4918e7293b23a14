//! # Discobot - Modular Chat Bot Runtime
//!
//! Discobot receives events from a chat transport, fans them out to module
//! handlers in priority order, and authorizes every command against a layered
//! permission table before running it.
//!
//! ## Features
//!
//! - **Prioritized Dispatch**: Handlers subscribe to named events at an integer priority;
//!   lower tiers finish before higher tiers start, handlers within a tier run concurrently.
//! - **Module Registry**: Modules expose commands and subscriptions and can be rebuilt at runtime.
//! - **Command Routing**: `!cmd`, `@mention cmd`, `name: cmd`, bare `cmd` in private channels,
//!   and `module:cmd` to pick a specific module.
//! - **Layered Permissions**: Grant/deny/unset per global, server, channel, user and role,
//!   with deny acting as a veto and configured superusers bypassing checks.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use discobot::bot::Bot;
//! use discobot::config::{Config, ProcessEnviron};
//! use discobot::transport::ConsoleTransport;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let transport = Arc::new(ConsoleTransport::new(&config.bot.name));
//!     let mut bot = Bot::with_default_modules(config, Arc::new(ProcessEnviron), transport)?;
//!     bot.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`bot`] - runtime, event dispatcher, module registry and command router
//! - [`permissions`] - permission table, layered lookup, grant/revoke parsing
//! - [`modules`] - built-in `core` and `permissions` modules
//! - [`transport`] - the chat transport capability and bundled transports
//! - [`chat`] - transport-neutral chat entities
//! - [`config`] - configuration file and environment lookup

pub mod bot;
pub mod chat;
pub mod config;
pub mod error;
pub mod modules;
pub mod permissions;
pub mod transport;

pub use error::{BotError, BotResult};
