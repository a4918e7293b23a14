//! Priority-tiered event fan-out.
//!
//! Handlers are registered per event name at an integer priority. A dispatch walks
//! the distinct priorities in ascending order; all handlers of one tier are polled
//! concurrently and the next tier starts only once every handler of the current
//! tier has finished. Tiers never overlap.
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use log::{debug, error, info, trace};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use super::events::{Event, EventKind};
use crate::error::{BotError, BotResult};

pub const DEFAULT_PRIORITY: i64 = 100;

pub type HandlerFuture = BoxFuture<'static, anyhow::Result<()>>;

/// What to do when a handler inside a tier fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultPolicy {
    /// Log the failure; siblings and later tiers still run.
    #[default]
    Isolate,
    /// Let the tier finish, then stop the dispatch with [`BotError::Handler`].
    FailFast,
}

/// A named, shareable event callback.
#[derive(Clone)]
pub struct EventHandler {
    name: String,
    f: Arc<dyn Fn(Event) -> HandlerFuture + Send + Sync>,
}

impl EventHandler {
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            f: Arc::new(move |event| Box::pin(f(event))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, event: Event) -> HandlerFuture {
        (self.f)(event)
    }
}

impl std::fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHandler").field("name", &self.name).finish()
    }
}

/// Counters describing one completed dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub tiers: usize,
    pub handlers: usize,
    pub failures: usize,
}

type Tiers = BTreeMap<i64, Vec<EventHandler>>;

#[derive(Debug, Default)]
pub struct EventDispatcher {
    registrations: Mutex<HashMap<EventKind, Tiers>>,
    policy: FaultPolicy,
}

impl EventDispatcher {
    pub fn new(policy: FaultPolicy) -> Self {
        Self {
            registrations: Mutex::new(HashMap::new()),
            policy,
        }
    }

    pub fn policy(&self) -> FaultPolicy {
        self.policy
    }

    /// Register `handler` for the event called `event`.
    pub fn register(&self, event: &str, priority: i64, handler: EventHandler) -> BotResult<()> {
        let kind: EventKind = event.parse()?;
        self.register_kind(kind, priority, handler);
        Ok(())
    }

    pub fn register_kind(&self, kind: EventKind, priority: i64, handler: EventHandler) {
        info!(
            "Registering {} with priority {} for event {}",
            handler.name(),
            priority,
            kind
        );
        let mut guard = self
            .registrations
            .lock()
            .expect("dispatcher registrations mutex poisoned");
        guard
            .entry(kind)
            .or_default()
            .entry(priority)
            .or_default()
            .push(handler);
    }

    /// Drop every registration for every event.
    pub fn clear(&self) {
        debug!("Clearing all event registrations");
        self.registrations
            .lock()
            .expect("dispatcher registrations mutex poisoned")
            .clear();
    }

    /// Registered priorities for `kind`, ascending.
    pub fn priorities(&self, kind: EventKind) -> Vec<i64> {
        self.registrations
            .lock()
            .expect("dispatcher registrations mutex poisoned")
            .get(&kind)
            .map(|tiers| tiers.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.registrations
            .lock()
            .expect("dispatcher registrations mutex poisoned")
            .get(&kind)
            .map(|tiers| tiers.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// Dispatch by event name; unknown names are rejected.
    pub async fn dispatch_named(&self, event: &str, payload: Event) -> BotResult<DispatchSummary> {
        let kind: EventKind = event.parse()?;
        if kind != payload.kind() {
            return Err(BotError::EventMismatch {
                event: kind.to_string(),
                payload: payload.kind().to_string(),
            });
        }
        self.dispatch(payload).await
    }

    /// Run every handler registered for the event's kind, tier by tier.
    ///
    /// The registration table is snapshotted first, so handlers may register,
    /// clear or rebuild without affecting the dispatch already underway.
    pub async fn dispatch(&self, event: Event) -> BotResult<DispatchSummary> {
        let kind = event.kind();
        let tiers: Tiers = self
            .registrations
            .lock()
            .expect("dispatcher registrations mutex poisoned")
            .get(&kind)
            .cloned()
            .unwrap_or_default();
        trace!("Got event {} with {} tier(s)", kind, tiers.len());

        let mut summary = DispatchSummary::default();
        for (priority, handlers) in tiers {
            if handlers.is_empty() {
                continue;
            }
            debug!("Executing handlers for {} at priority {}", kind, priority);
            let results = join_all(handlers.iter().map(|h| {
                AssertUnwindSafe(h.call(event.clone()))
                    .catch_unwind()
                    .map(|outcome| outcome.unwrap_or_else(|panic| Err(panic_error(panic))))
            }))
            .await;
            summary.tiers += 1;
            summary.handlers += handlers.len();

            let mut first_failure = None;
            for (handler, result) in handlers.iter().zip(results) {
                if let Err(e) = result {
                    summary.failures += 1;
                    error!(
                        "Handler {} for {} at priority {} failed: {:#}",
                        handler.name(),
                        kind,
                        priority,
                        e
                    );
                    if first_failure.is_none() {
                        first_failure = Some(format!("{}: {:#}", handler.name(), e));
                    }
                }
            }

            if let (FaultPolicy::FailFast, Some(message)) = (self.policy, first_failure) {
                return Err(BotError::Handler {
                    event: kind.to_string(),
                    priority,
                    message,
                });
            }
        }
        Ok(summary)
    }
}

/// A panicking handler counts as a failed one.
fn panic_error(panic: Box<dyn Any + Send>) -> anyhow::Error {
    let reason = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    anyhow::anyhow!("handler panicked: {}", reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::Notify;

    fn recorder(log: &Arc<Mutex<Vec<String>>>, name: &str, delay_ms: u64) -> EventHandler {
        let log = log.clone();
        let entry = name.to_string();
        EventHandler::new(name, move |_| {
            let log = log.clone();
            let entry = entry.clone();
            async move {
                if delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                log.lock().unwrap().push(entry);
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn lower_priority_tier_finishes_first() {
        let d = EventDispatcher::new(FaultPolicy::Isolate);
        let log = Arc::new(Mutex::new(Vec::new()));
        d.register("ready", 100, recorder(&log, "B", 0)).unwrap();
        d.register("ready", 0, recorder(&log, "A", 20)).unwrap();
        let summary = d.dispatch(Event::Ready).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["A", "B"]);
        assert_eq!(summary.tiers, 2);
        assert_eq!(summary.handlers, 2);
    }

    #[tokio::test]
    async fn handlers_in_one_tier_run_concurrently() {
        let d = EventDispatcher::new(FaultPolicy::Isolate);
        let notify = Arc::new(Notify::new());
        let waiter = notify.clone();
        d.register(
            "typing",
            5,
            EventHandler::new("waiter", move |_| {
                let waiter = waiter.clone();
                async move {
                    waiter.notified().await;
                    Ok(())
                }
            }),
        )
        .unwrap();
        let signal = notify.clone();
        d.register(
            "typing",
            5,
            EventHandler::new("signaller", move |_| {
                let signal = signal.clone();
                async move {
                    signal.notify_one();
                    Ok(())
                }
            }),
        )
        .unwrap();
        let event = Event::Other {
            kind: EventKind::Typing,
            payload: serde_json::Value::Null,
        };
        let res = tokio::time::timeout(Duration::from_secs(2), d.dispatch(event)).await;
        assert!(res.is_ok(), "tier handlers were serialized");
    }

    #[test]
    fn unknown_event_rejected_on_register() {
        let d = EventDispatcher::default();
        let err = d
            .register("error", DEFAULT_PRIORITY, EventHandler::new("x", |_| async { Ok(()) }))
            .unwrap_err();
        assert!(matches!(err, BotError::UnknownEvent(name) if name == "error"));
    }

    #[tokio::test]
    async fn unknown_event_rejected_on_dispatch() {
        let d = EventDispatcher::default();
        assert!(matches!(
            d.dispatch_named("nope", Event::Ready).await,
            Err(BotError::UnknownEvent(_))
        ));
    }

    #[tokio::test]
    async fn mismatched_payload_is_not_an_unknown_event() {
        let d = EventDispatcher::default();
        match d.dispatch_named("typing", Event::Ready).await {
            Err(BotError::EventMismatch { event, payload }) => {
                assert_eq!(event, "typing");
                assert_eq!(payload, "ready");
            }
            other => panic!("expected EventMismatch, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let d = EventDispatcher::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        d.register("ready", 0, recorder(&log, "A", 0)).unwrap();
        d.register("message", 3, recorder(&log, "M", 0)).unwrap();
        d.clear();
        assert_eq!(d.handler_count(EventKind::Ready), 0);
        assert!(d.priorities(EventKind::Message).is_empty());
        let summary = d.dispatch(Event::Ready).await.unwrap();
        assert_eq!(summary, DispatchSummary::default());
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn isolate_keeps_going_after_failure() {
        let d = EventDispatcher::new(FaultPolicy::Isolate);
        let log = Arc::new(Mutex::new(Vec::new()));
        d.register(
            "ready",
            0,
            EventHandler::new("broken", |_| async { Err(anyhow::anyhow!("boom")) }),
        )
        .unwrap();
        d.register("ready", 0, recorder(&log, "sibling", 5)).unwrap();
        d.register("ready", 1, recorder(&log, "later", 0)).unwrap();
        let summary = d.dispatch(Event::Ready).await.unwrap();
        assert_eq!(summary.failures, 1);
        assert_eq!(*log.lock().unwrap(), vec!["sibling", "later"]);
    }

    fn explode() -> anyhow::Result<()> {
        panic!("oh no")
    }

    #[tokio::test]
    async fn panicking_handler_is_isolated() {
        let d = EventDispatcher::new(FaultPolicy::Isolate);
        let log = Arc::new(Mutex::new(Vec::new()));
        d.register(
            "ready",
            0,
            EventHandler::new("explodes", |_| async { explode() }),
        )
        .unwrap();
        d.register("ready", 0, recorder(&log, "sibling", 5)).unwrap();
        d.register("ready", 1, recorder(&log, "later", 0)).unwrap();
        let summary = d.dispatch(Event::Ready).await.unwrap();
        assert_eq!(summary.failures, 1);
        assert_eq!(*log.lock().unwrap(), vec!["sibling", "later"]);
    }

    #[tokio::test]
    async fn panic_under_fail_fast_becomes_handler_error() {
        let d = EventDispatcher::new(FaultPolicy::FailFast);
        d.register(
            "ready",
            0,
            EventHandler::new("explodes", |_| async { explode() }),
        )
        .unwrap();
        match d.dispatch(Event::Ready).await {
            Err(BotError::Handler { message, .. }) => {
                assert!(message.contains("handler panicked: oh no"), "{}", message)
            }
            other => panic!("expected Handler error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn fail_fast_stops_after_failing_tier() {
        let d = EventDispatcher::new(FaultPolicy::FailFast);
        let log = Arc::new(Mutex::new(Vec::new()));
        d.register(
            "ready",
            0,
            EventHandler::new("broken", |_| async { Err(anyhow::anyhow!("boom")) }),
        )
        .unwrap();
        d.register("ready", 0, recorder(&log, "sibling", 5)).unwrap();
        d.register("ready", 1, recorder(&log, "later", 0)).unwrap();
        match d.dispatch(Event::Ready).await {
            Err(BotError::Handler { priority, .. }) => assert_eq!(priority, 0),
            other => panic!("expected handler error, got {:?}", other),
        }
        assert_eq!(*log.lock().unwrap(), vec!["sibling"]);
    }
}
