//! SQL debugging: unit-of-work lifecycle and statement events.
//!
//! When enabled, the data store publishes a [`DataEvent`] for every opened,
//! committed, rolled back and closed unit of work and for every statement it
//! executes. Any number of listeners may subscribe; new subscribers get the
//! retained backlog first so they can catch up.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 1024;
const DEFAULT_BACKLOG: usize = 256;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DataEvent {
    Opened {
        unit: Uuid,
    },
    Query {
        unit: Uuid,
        statement: String,
        /// Source location that issued the statement
        context: String,
        elapsed_ms: f64,
    },
    Committed {
        unit: Uuid,
    },
    RolledBack {
        unit: Uuid,
    },
    Closed {
        unit: Uuid,
    },
}

impl DataEvent {
    pub fn unit(&self) -> Uuid {
        match self {
            Self::Opened { unit }
            | Self::Query { unit, .. }
            | Self::Committed { unit }
            | Self::RolledBack { unit }
            | Self::Closed { unit } => *unit,
        }
    }
}

/// Human readable duration, milliseconds below a second.
pub fn pretty_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs >= 1.0 {
        format!("took {secs:.2} s")
    } else {
        format!("took {:.3} ms", secs * 1000.0)
    }
}

#[derive(Clone, Debug)]
pub struct DataEventBus {
    sender: broadcast::Sender<DataEvent>,
    backlog: Arc<Mutex<VecDeque<DataEvent>>>,
    backlog_limit: usize,
}

/// A listener's view of the bus: what happened before it subscribed, and a
/// receiver for everything after.
pub struct DataEventSubscription {
    pub backlog: Vec<DataEvent>,
    pub receiver: broadcast::Receiver<DataEvent>,
}

impl Default for DataEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl DataEventBus {
    pub fn new() -> Self {
        Self::with_backlog(DEFAULT_BACKLOG)
    }

    pub fn with_backlog(backlog_limit: usize) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            backlog: Arc::new(Mutex::new(VecDeque::with_capacity(backlog_limit))),
            backlog_limit,
        }
    }

    pub fn publish(&self, event: DataEvent) {
        if let Ok(mut backlog) = self.backlog.lock() {
            if backlog.len() == self.backlog_limit {
                backlog.pop_front();
            }
            if self.backlog_limit > 0 {
                backlog.push_back(event.clone());
            }
        }
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> DataEventSubscription {
        // Hold the backlog lock while subscribing so no event is both in the
        // backlog and delivered on the receiver.
        let guard = self.backlog.lock();
        let receiver = self.sender.subscribe();
        let backlog = guard.map(|b| b.iter().cloned().collect()).unwrap_or_default();
        DataEventSubscription { backlog, receiver }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Forward every data event to `tracing` at debug level.
pub fn spawn_query_logger(bus: &DataEventBus) -> JoinHandle<()> {
    let DataEventSubscription {
        backlog,
        mut receiver,
    } = bus.subscribe();

    tokio::spawn(async move {
        for event in backlog {
            log_event(&event);
        }
        loop {
            match receiver.recv().await {
                Ok(event) => log_event(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Query logger lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn log_event(event: &DataEvent) {
    match event {
        DataEvent::Query {
            unit,
            statement,
            context,
            elapsed_ms,
        } => tracing::debug!(
            %unit,
            %context,
            "{} ({})",
            statement.trim(),
            pretty_elapsed(Duration::from_secs_f64(elapsed_ms / 1000.0))
        ),
        other => tracing::debug!(unit = %other.unit(), "{:?}", other),
    }
}
