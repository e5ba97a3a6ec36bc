//! Event Bus implementation.
//!
//! Synchronous filtered handlers plus a broadcast channel for receivers
//! that poll (for example a UI task).

use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::events::{AppEvent, EventCategory};

/// Subscription handle for unsubscribing from events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", &self.0.to_string()[..8])
    }
}

/// Filter to receive only specific event types
#[derive(Debug, Clone, Default)]
pub enum EventFilter {
    /// Receive all events.
    #[default]
    All,
    /// Receive events matching any of these categories.
    Categories(Vec<EventCategory>),
}

impl EventFilter {
    /// Check if an event matches this filter
    pub fn matches(&self, event: &AppEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Categories(categories) => categories.contains(&event.category()),
        }
    }
}

type EventHandler = Box<dyn Fn(AppEvent) + Send + Sync>;

/// Configuration for the event bus
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Channel capacity for broadcast.
    pub channel_capacity: usize,
    /// Whether to keep event history.
    pub enable_history: bool,
    /// Maximum number of events to retain in history.
    pub max_history_size: usize,
    /// How long to retain events in history.
    pub history_retention: Duration,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            enable_history: false,
            max_history_size: 500,
            history_retention: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone)]
struct TimestampedEvent {
    event: AppEvent,
    timestamp: Instant,
}

/// Error types for event bus operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum EventBusError {
    /// No subscribers are listening
    #[error("No active subscribers")]
    NoSubscribers,
    /// Channel is closed
    #[error("Event channel is closed")]
    ChannelClosed,
}

/// Event bus owned by a document
pub struct EventBus {
    sender: broadcast::Sender<AppEvent>,
    handlers: Arc<RwLock<HashMap<SubscriptionId, (EventFilter, EventHandler)>>>,
    history: Arc<RwLock<VecDeque<TimestampedEvent>>>,
    config: EventBusConfig,
}

impl EventBus {
    /// Create a new event bus with default configuration
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    /// Create a new event bus with custom configuration
    pub fn with_config(config: EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            sender,
            handlers: Arc::new(RwLock::new(HashMap::new())),
            history: Arc::new(RwLock::new(VecDeque::new())),
            config,
        }
    }

    /// Publish an event to all subscribers
    ///
    /// Returns the number of broadcast receivers reached, or
    /// [`EventBusError::NoSubscribers`] when nobody is listening at all.
    pub fn publish(&self, event: AppEvent) -> Result<usize, EventBusError> {
        tracing::trace!("publish: {}", event.description());
        if self.config.enable_history {
            self.add_to_history(&event);
        }

        let handlers = self.handlers.read();
        for (_, (filter, handler)) in handlers.iter() {
            if filter.matches(&event) {
                handler(event.clone());
            }
        }

        match self.sender.send(event) {
            Ok(count) => Ok(count),
            Err(_) => {
                if handlers.is_empty() {
                    Err(EventBusError::NoSubscribers)
                } else {
                    Ok(0)
                }
            }
        }
    }

    /// Subscribe to events with a synchronous handler
    ///
    /// The handler runs inside the publishing command, so it must not call
    /// back into the document.
    pub fn subscribe<F>(&self, filter: EventFilter, handler: F) -> SubscriptionId
    where
        F: Fn(AppEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new();
        self.handlers.write().insert(id, (filter, Box::new(handler)));
        tracing::debug!("Subscription {} added", id);
        id
    }

    /// Get a receiver for manual event polling
    pub fn receiver(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    /// Unsubscribe from events
    ///
    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.handlers.write().remove(&id).is_some();
        if removed {
            tracing::debug!("Subscription {} removed", id);
        }
        removed
    }

    /// Get the number of active subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Get recent event history (if enabled)
    pub fn history(&self, since: Option<Instant>) -> Vec<AppEvent> {
        if !self.config.enable_history {
            return Vec::new();
        }

        let history = self.history.read();
        match since {
            Some(since) => history
                .iter()
                .filter(|e| e.timestamp >= since)
                .map(|e| e.event.clone())
                .collect(),
            None => history.iter().map(|e| e.event.clone()).collect(),
        }
    }

    /// Clear event history
    pub fn clear_history(&self) {
        self.history.write().clear();
    }

    /// Get the current configuration
    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }

    fn add_to_history(&self, event: &AppEvent) {
        let mut history = self.history.write();
        let now = Instant::now();

        history.push_back(TimestampedEvent {
            event: event.clone(),
            timestamp: now,
        });

        let retention = self.config.history_retention;
        while history
            .front()
            .is_some_and(|e| now.duration_since(e.timestamp) > retention)
        {
            history.pop_front();
        }

        while history.len() > self.config.max_history_size {
            history.pop_front();
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .field("config", &self.config)
            .finish()
    }
}
