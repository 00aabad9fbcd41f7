use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use super::AuditEvent;

/// Envelope wrapping an audit event with metadata
#[derive(Debug, Clone)]
pub struct AuditEventEnvelope {
    pub timestamp: DateTime<Utc>,
    pub event: AuditEvent,
}

/// Handle for emitting audit events
///
/// This is cheaply cloneable and can be shared across tasks.
/// Events are sent through an async channel to be written by the AuditWriter.
#[derive(Clone)]
pub struct AuditHandle {
    tx: mpsc::Sender<AuditEventEnvelope>,
}

impl AuditHandle {
    /// Create a new audit handle from a channel sender
    pub fn new(tx: mpsc::Sender<AuditEventEnvelope>) -> Self {
        Self { tx }
    }

    fn envelope(event: AuditEvent) -> AuditEventEnvelope {
        AuditEventEnvelope {
            timestamp: Utc::now(),
            event,
        }
    }

    /// Emit an audit event, waiting for channel capacity.
    ///
    /// A closed channel is logged, never returned to the caller.
    pub async fn emit(&self, event: AuditEvent) {
        if let Err(e) = self.tx.send(Self::envelope(event)).await {
            tracing::error!("Failed to emit audit event: {}", e);
        }
    }

    /// Try to emit an audit event without blocking
    ///
    /// Returns true if the event was sent successfully, false otherwise.
    /// Used from synchronous queue operations, where a full channel must not
    /// hold up a teller.
    pub fn try_emit(&self, event: AuditEvent) -> bool {
        match self.tx.try_send(Self::envelope(event)) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to emit audit event: {}", e);
                false
            }
        }
    }
}
