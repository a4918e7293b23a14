//! # Bot Runtime
//!
//! Ties the pieces together:
//!
//! - [`events`] - the fixed event set and payloads
//! - [`dispatcher`] - priority-tiered fan-out of events to handlers
//! - [`registry`] - module descriptors and live instances
//! - [`router`] - prefix recognition and command resolution
//!
//! ```text
//! transport ─→ queue ─→ EventDispatcher ─→ core.on_message
//!                                              │
//!                             CommandRouter ───┤
//!                             PermissionStore ─┤
//!                                              └─→ module command ─→ transport.send_text
//! ```
//!
//! Events are processed one at a time from a single queue. Inside a dispatch the
//! handlers of one priority tier run concurrently on the same task.

pub mod dispatcher;
pub mod events;
pub mod registry;
pub mod router;

use log::{debug, error, info};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

use self::dispatcher::{DispatchSummary, EventDispatcher, EventHandler};
use self::events::Event;
use self::registry::{BotModule, ModuleDescriptor, ModuleRegistry};
use crate::chat::{Channel, Message};
use crate::config::{Config, Credentials, Environ};
use crate::error::{BotError, BotResult};
use crate::permissions::{PermissionStore, PermissionValue, Subject};
use crate::transport::{EventSink, Inbound, Transport};

macro_rules! sec_log {
    ($($arg:tt)*) => { log::warn!(target: "security", $($arg)*); };
}
pub(crate) use sec_log;

/// Shared state handed to every module. Cloning is cheap.
#[derive(Clone)]
pub struct BotContext {
    config: Arc<Config>,
    environ: Arc<dyn Environ>,
    dispatcher: Arc<EventDispatcher>,
    permissions: Arc<Mutex<PermissionStore>>,
    registry: Arc<ModuleRegistry>,
    transport: Arc<dyn Transport>,
    queue: mpsc::UnboundedSender<Inbound>,
}

impl BotContext {
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn environ(&self) -> &dyn Environ {
        self.environ.as_ref()
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Lock the permission table. Never hold the guard across an await.
    pub fn permissions(&self) -> MutexGuard<'_, PermissionStore> {
        self.permissions
            .lock()
            .expect("permission store mutex poisoned")
    }

    pub fn register(&self, event: &str, priority: i64, handler: EventHandler) -> BotResult<()> {
        self.dispatcher.register(event, priority, handler)
    }

    pub fn has_permission(
        &self,
        subject: &Subject,
        permission: &str,
        channel: Option<&Channel>,
    ) -> PermissionValue {
        self.permissions().has_permission(subject, permission, channel)
    }

    pub fn get_module(&self, name: &str) -> Option<Arc<dyn BotModule>> {
        self.registry.get(name)
    }

    /// Queue an event behind whatever is currently being dispatched.
    pub fn schedule(&self, event: Event) -> BotResult<()> {
        self.queue
            .send(Inbound::Event(event))
            .map_err(|_| BotError::Transport("bot event queue closed".into()))
    }

    /// Send `content` to the message's channel, addressed to its author outside private channels.
    pub async fn respond(&self, message: &Message, content: &str) -> BotResult<()> {
        let text = if message.channel.is_private() {
            content.to_string()
        } else {
            format!("{} {}", message.author.mention(), content)
        };
        self.transport.send_text(&message.channel, &text).await
    }

    /// Rebuild every module and queue a fresh `ready` so they can initialise.
    pub fn reload(&self) -> BotResult<()> {
        self.registry.rebuild(self)?;
        self.schedule(Event::Ready)
    }
}

pub struct Bot {
    ctx: BotContext,
    inbound: mpsc::UnboundedReceiver<Inbound>,
}

impl Bot {
    /// Build the runtime and instantiate every module from `descriptors`.
    ///
    /// `environ` is overlaid on `config` first, so `DISCOBOT_PREFIX` and
    /// `DISCOBOT_BOTMASTERS` apply however the config was obtained.
    pub fn new(
        mut config: Config,
        environ: Arc<dyn Environ>,
        transport: Arc<dyn Transport>,
        descriptors: Vec<ModuleDescriptor>,
    ) -> BotResult<Self> {
        config.apply_environ(environ.as_ref());
        config.validate()?;
        info!("Discobot coming online!");
        let store = PermissionStore::with_superusers(config.superuser_ids());
        for id in store.superusers() {
            sec_log!("Superuser configured: {}", id);
        }
        let (tx, inbound) = mpsc::unbounded_channel();
        let ctx = BotContext {
            dispatcher: Arc::new(EventDispatcher::new(config.bot.fault_policy)),
            permissions: Arc::new(Mutex::new(store)),
            registry: Arc::new(ModuleRegistry::new(descriptors)),
            config: Arc::new(config),
            environ,
            transport,
            queue: tx,
        };
        ctx.registry.load(&ctx)?;
        Ok(Self { ctx, inbound })
    }

    /// Runtime with the built-in `core` and `permissions` modules.
    pub fn with_default_modules(
        config: Config,
        environ: Arc<dyn Environ>,
        transport: Arc<dyn Transport>,
    ) -> BotResult<Self> {
        Self::new(config, environ, transport, crate::modules::default_descriptors())
    }

    pub fn context(&self) -> &BotContext {
        &self.ctx
    }

    /// Read credentials and log in. Missing credentials fail before any connection attempt.
    pub async fn connect(&self) -> BotResult<()> {
        let credentials = Credentials::from_environ(self.ctx.environ())?;
        info!("Connecting as {}", credentials.email);
        self.ctx
            .transport
            .connect(&credentials, EventSink::new(self.ctx.queue.clone()))
            .await
    }

    pub async fn handle(&self, event: Event) -> BotResult<DispatchSummary> {
        self.ctx.dispatcher.dispatch(event).await
    }

    pub fn reload(&self) -> BotResult<()> {
        self.ctx.reload()
    }

    /// Dispatch everything already queued, returning how many events ran.
    pub async fn process_pending(&mut self) -> BotResult<usize> {
        let mut count = 0;
        while let Ok(inbound) = self.inbound.try_recv() {
            if let Inbound::Event(event) = inbound {
                self.handle(event).await?;
                count += 1;
            }
        }
        Ok(count)
    }

    /// Connect, then process events serially until the transport disconnects or Ctrl-C.
    pub async fn run(&mut self) -> BotResult<()> {
        self.connect().await?;
        debug!(
            "Processing events with {:?} fault policy",
            self.ctx.dispatcher.policy()
        );
        loop {
            tokio::select! {
                inbound = self.inbound.recv() => {
                    match inbound {
                        Some(Inbound::Event(event)) => {
                            let kind = event.kind();
                            if let Err(e) = self.ctx.dispatcher.dispatch(event).await {
                                error!("Dispatch of {} failed: {}", kind, e);
                            }
                        }
                        Some(Inbound::Disconnected) | None => {
                            info!("Transport disconnected");
                            break;
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, shutting down");
                    break;
                }
            }
        }
        self.shutdown();
        Ok(())
    }

    /// Unload every module and drop all registrations.
    pub fn shutdown(&self) {
        debug!("Unloading modules for shutdown");
        self.ctx.registry.unload_all();
        self.ctx.dispatcher.clear();
    }
}
