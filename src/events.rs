//! Record change notifications
//!
//! Every successful create, update or delete in the entity store produces a
//! [`ChangeEvent`] routed as `data.<entity>.<action>` on a topic exchange.
//! Delivery is delegated to a [`ChangePublisher`]; this crate ships a no-op
//! publisher, one that writes events to the log, and an in-memory recorder.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Mutex;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Change event '{0}' was rejected by the publisher")]
    Rejected(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChangeKind::Created => "created",
            ChangeKind::Updated => "updated",
            ChangeKind::Deleted => "deleted",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeEvent {
    pub exchange: String,
    pub exchange_type: String,
    pub routing_key: String,
    pub kind: ChangeKind,
    pub entity: String,
    pub payload: Value,
    pub published_at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(exchange: &str, entity: &str, kind: ChangeKind, payload: Value) -> Self {
        Self {
            exchange: exchange.to_string(),
            exchange_type: "topic".to_string(),
            routing_key: format!("data.{entity}.{kind}"),
            kind,
            entity: entity.to_string(),
            payload,
            published_at: Utc::now(),
        }
    }

    /// Updated records carry the changed attributes under `updated_data`
    pub fn updated(exchange: &str, entity: &str, record: &Value, dirty: Value) -> Self {
        let mut payload = record.clone();
        if let Some(object) = payload.as_object_mut() {
            object.insert("updated_data".to_string(), dirty);
        }
        Self::new(exchange, entity, ChangeKind::Updated, payload)
    }
}

pub trait ChangePublisher: Send + Sync {
    fn publish(&self, event: &ChangeEvent) -> Result<(), PublishError>;
}

/// Used when publication is disabled
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

impl ChangePublisher for NoopPublisher {
    fn publish(&self, _event: &ChangeEvent) -> Result<(), PublishError> {
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPublisher;

impl ChangePublisher for TracingPublisher {
    fn publish(&self, event: &ChangeEvent) -> Result<(), PublishError> {
        info!(
            exchange = %event.exchange,
            routing_key = %event.routing_key,
            payload = %event.payload,
            "change event published"
        );
        Ok(())
    }
}

/// Keeps every event in memory, in publication order
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    events: Mutex<Vec<ChangeEvent>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl ChangePublisher for MemoryPublisher {
    fn publish(&self, event: &ChangeEvent) -> Result<(), PublishError> {
        let mut events = self
            .events
            .lock()
            .map_err(|_| PublishError::Rejected(event.routing_key.clone()))?;
        events.push(event.clone());
        Ok(())
    }
}
