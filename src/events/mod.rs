//! Decision observability.
//!
//! Every authorization query produces one [`DecisionEvent`] handed to a
//! [`DecisionSink`]. Sinks are fire-and-forget: they return nothing and must
//! swallow their own failures, so emitting can never change a decision.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::authz::{Identity, Role};

/// Severity levels for decision events.
/// Controls which events the listener surfaces at `info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Denials and unauthenticated access
    Important,
    /// Routine allows
    Noise,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Important => "important",
            Severity::Noise => "noise",
        }
    }
}

/// Which public query produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    HasPermission,
    CheckPermission,
    PageAccess,
    DataAccessLevel,
    CanModify,
    Filter,
    ElevatedAccess,
    EffectivePermissions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub role: Role,
}

impl From<&Identity> for Actor {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id.clone(),
            name: identity.display_name().to_string(),
            role: identity.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionEvent {
    pub id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub query: Query,
    /// `None` when the caller was not authenticated.
    pub actor: Option<Actor>,
    /// Permission token, route, data type or level the query was about.
    pub subject: String,
    pub allowed: bool,
    /// Query-specific counters such as grant set sizes or record counts.
    #[serde(skip_serializing_if = "Value::is_null", default)]
    pub detail: Value,
}

impl DecisionEvent {
    pub fn new(query: Query, identity: Option<&Identity>, subject: impl Into<String>, allowed: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            query,
            actor: identity.map(Actor::from),
            subject: subject.into(),
            allowed,
            detail: Value::Null,
        }
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = detail;
        self
    }

    pub fn severity(&self) -> Severity {
        if self.allowed && self.actor.is_some() {
            Severity::Noise
        } else {
            Severity::Important
        }
    }
}

/// Receives every decision. Implementations must not panic and must not block.
pub trait DecisionSink: Send + Sync {
    fn record(&self, event: DecisionEvent);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl DecisionSink for NoopSink {
    fn record(&self, _event: DecisionEvent) {}
}

/// Structured `tracing` output at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DecisionSink for TracingSink {
    fn record(&self, event: DecisionEvent) {
        let (actor_id, actor_name, actor_role) = match &event.actor {
            Some(actor) => (actor.id.as_str(), actor.name.as_str(), actor.role.as_str()),
            None => ("-", "-", "-"),
        };

        tracing::debug!(
            query = ?event.query,
            actor_id = %actor_id,
            actor_name = %actor_name,
            actor_role = %actor_role,
            subject = %event.subject,
            allowed = event.allowed,
            detail = %event.detail,
            "authorization decision"
        );
    }
}

pub type EventBus = broadcast::Sender<DecisionEvent>;

pub fn init_event_bus() -> (EventBus, broadcast::Receiver<DecisionEvent>) {
    broadcast::channel(1024)
}

/// Publishes onto an [`EventBus`] for an out-of-band listener.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    bus: EventBus,
}

impl BroadcastSink {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }
}

impl DecisionSink for BroadcastSink {
    fn record(&self, event: DecisionEvent) {
        // Fire and forget - no subscribers is not an error for the caller
        let _ = self.bus.send(event);
    }
}

/// Keeps events in memory. Intended for tests and debug tooling.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<DecisionEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DecisionEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl DecisionSink for MemorySink {
    fn record(&self, event: DecisionEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Drain the bus and log each decision. Important events go out at `info`.
pub async fn start_decision_listener(mut rx: broadcast::Receiver<DecisionEvent>) {
    tracing::info!("Decision listener started");
    loop {
        match rx.recv().await {
            Ok(event) => {
                let actor = event.actor.as_ref().map(|a| a.id.as_str()).unwrap_or("anonymous");
                match event.severity() {
                    Severity::Important => tracing::info!(
                        event_id = %event.id,
                        query = ?event.query,
                        actor = %actor,
                        subject = %event.subject,
                        allowed = event.allowed,
                        severity = event.severity().as_str(),
                        "authorization decision"
                    ),
                    Severity::Noise => tracing::debug!(
                        event_id = %event.id,
                        query = ?event.query,
                        actor = %actor,
                        subject = %event.subject,
                        allowed = event.allowed,
                        severity = event.severity().as_str(),
                        "authorization decision"
                    ),
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::error!("Decision listener lagged, {} events dropped", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    tracing::info!("Decision listener stopped");
}
