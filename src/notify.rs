//! Best-effort change notifications.
//!
//! The core calls [`EventSink::emit`] after a state change has been committed. Delivery is never
//! awaited and a failing notifier is logged and ignored; nothing about correctness depends on
//! a notification arriving.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::constants::EVENT_CHANNEL_CAPACITY;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    MarketsChanged,
    /// `user_id` is set when only one user's wagers changed.
    WagersChanged { user_id: Option<i64> },
    BalancesChanged { user_id: Option<i64> },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::MarketsChanged => "markets_changed",
            Event::WagersChanged { .. } => "wagers_changed",
            Event::BalancesChanged { .. } => "balances_changed",
        }
    }
}

pub trait Notifier: Send + Sync {
    /// Must return quickly; slow transports should hand the event off to a task.
    fn notify(&self, event: &Event) -> Result<()>;
}

/// Writes every event to the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &Event) -> Result<()> {
        info!("📣 {}", serde_json::to_string(event)?);
        Ok(())
    }
}

/// Fans events out to real-time listeners over a broadcast channel.
pub struct BroadcastNotifier {
    tx: broadcast::Sender<Event>,
}

impl BroadcastNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, event: &Event) -> Result<()> {
        // No listeners is not a failure.
        if self.tx.receiver_count() == 0 {
            return Ok(());
        }
        self.tx
            .send(event.clone())
            .map(|_| ())
            .map_err(|e| Error::Notification(format!("broadcast closed: {}", e)))
    }
}

/// The capability handed to the engines: a set of notifiers whose failures are swallowed.
#[derive(Clone, Default)]
pub struct EventSink {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl EventSink {
    /// A sink that drops everything.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    pub fn emit(&self, event: Event) {
        for notifier in &self.notifiers {
            if let Err(e) = notifier.notify(&event) {
                debug!("Dropped {} notification: {}", event.name(), e);
            }
        }
    }
}
