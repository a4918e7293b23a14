//! Module registry: descriptors in, live module instances out.
//!
//! Modules are built from a static list of [`ModuleDescriptor`]s. Each factory
//! receives the shared [`BotContext`] and subscribes its own event handlers while
//! it is being constructed. Rebuilding tears every live instance down before
//! constructing fresh ones from the (possibly replaced) descriptor list.
use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::sync::{Arc, Mutex};

use super::BotContext;
use crate::chat::Message;
use crate::config::Environ;
use crate::error::BotResult;

/// Arguments handed to a command: the triggering message and the text after the command token.
#[derive(Debug, Clone)]
pub struct CommandInvocation {
    pub message: Arc<Message>,
    pub rest: String,
}

/// A named unit of bot behaviour exposing commands and event subscriptions.
#[async_trait]
pub trait BotModule: Send + Sync {
    fn name(&self) -> &str;

    /// Names of the commands this module answers to.
    fn commands(&self) -> &[&'static str];

    fn has_command(&self, command: &str) -> bool {
        self.commands().contains(&command)
    }

    async fn run_command(&self, command: &str, invocation: CommandInvocation) -> anyhow::Result<()>;

    /// Read module settings. Called after every (re)instantiation.
    fn configure(&self, _environ: &dyn Environ) -> anyhow::Result<()> {
        Ok(())
    }

    /// Release resources before the instance is discarded by a rebuild.
    fn unload(&self) {}
}

pub type ModuleFactory = fn(&BotContext) -> BotResult<Arc<dyn BotModule>>;

#[derive(Clone, Copy)]
pub struct ModuleDescriptor {
    pub name: &'static str,
    pub build: ModuleFactory,
}

impl std::fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("name", &self.name)
            .finish()
    }
}

#[derive(Default)]
pub struct ModuleRegistry {
    descriptors: Mutex<Vec<ModuleDescriptor>>,
    instances: Mutex<Vec<Arc<dyn BotModule>>>,
}

impl ModuleRegistry {
    pub fn new(descriptors: Vec<ModuleDescriptor>) -> Self {
        Self {
            descriptors: Mutex::new(descriptors),
            instances: Mutex::new(Vec::new()),
        }
    }

    pub fn descriptors(&self) -> Vec<ModuleDescriptor> {
        self.descriptors
            .lock()
            .expect("registry descriptors mutex poisoned")
            .clone()
    }

    /// Swap in a freshly supplied descriptor list; takes effect at the next rebuild.
    pub fn replace_descriptors(&self, descriptors: Vec<ModuleDescriptor>) {
        *self
            .descriptors
            .lock()
            .expect("registry descriptors mutex poisoned") = descriptors;
    }

    /// Snapshot of live instances in registration order.
    pub fn instances(&self) -> Vec<Arc<dyn BotModule>> {
        self.instances
            .lock()
            .expect("registry instances mutex poisoned")
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn BotModule>> {
        self.instances
            .lock()
            .expect("registry instances mutex poisoned")
            .iter()
            .find(|m| m.name() == name)
            .cloned()
    }

    /// Build one instance per descriptor, in descriptor order.
    pub fn instantiate_all(&self, ctx: &BotContext) -> BotResult<Vec<Arc<dyn BotModule>>> {
        let descriptors = self.descriptors();
        let mut modules = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            debug!("Instantiating module {}", descriptor.name);
            modules.push((descriptor.build)(ctx)?);
        }
        Ok(modules)
    }

    /// Instantiate, configure and install every module.
    pub fn load(&self, ctx: &BotContext) -> BotResult<()> {
        info!("Registering modules...");
        let modules = self.instantiate_all(ctx)?;
        for module in &modules {
            if let Err(e) = module.configure(ctx.environ()) {
                warn!("Module {} failed to configure: {:#}", module.name(), e);
            }
        }
        *self
            .instances
            .lock()
            .expect("registry instances mutex poisoned") = modules;
        info!("Done registering modules!");
        Ok(())
    }

    /// Unload and discard every live instance, clear the dispatcher, then load again.
    ///
    /// Safe to call from inside a running handler: the live list is detached
    /// before teardown and dispatches already in flight keep their own snapshot.
    /// If a factory fails the registry stays empty until the next successful rebuild.
    pub fn rebuild(&self, ctx: &BotContext) -> BotResult<()> {
        info!("Reloading: unloading modules");
        let old = std::mem::take(
            &mut *self
                .instances
                .lock()
                .expect("registry instances mutex poisoned"),
        );
        for module in &old {
            debug!("Requesting that {} unload", module.name());
            module.unload();
        }
        drop(old);
        ctx.dispatcher().clear();
        self.load(ctx).map_err(|e| {
            error!("Reload failed, no modules are loaded: {}", e);
            e
        })
    }

    /// Unload every live instance without rebuilding.
    pub fn unload_all(&self) {
        let old = std::mem::take(
            &mut *self
                .instances
                .lock()
                .expect("registry instances mutex poisoned"),
        );
        for module in &old {
            module.unload();
        }
    }
}
