use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ticket::Step;

/// Audit event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    // System events
    ServiceStarted {
        version: String,
        config_hash: String,
    },
    ServiceStopped {
        reason: String,
    },

    // Ticket lifecycle
    TicketIssued {
        ticket_id: i64,
        number: u32,
        /// Board code, e.g. `P0003`.
        display_code: String,
        transaction_type: i64,
        is_priority: bool,
    },
    TicketClaimed {
        ticket_id: i64,
        teller_id: String,
        step: Step,
        /// Selection rounds needed; above 1 means other tellers won earlier claims.
        attempts: u32,
    },
    StepCompleted {
        ticket_id: i64,
        teller_id: String,
        step: Step,
        /// Transaction type assigned at step 1.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        classification: Option<i64>,
    },
    NoShowMarked {
        ticket_id: i64,
        teller_id: String,
        step: Step,
    },
    ManualOverride {
        ticket_id: i64,
        teller_id: String,
        step: Step,
        /// Number as the teller typed it.
        input: String,
        to_state: String,
    },

    // Teller sessions
    SessionReset {
        teller_id: String,
        /// Ticket the session pointed at when it was reset. It stays serving in the store.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        current_ticket_id: Option<i64>,
    },
}

impl AuditEvent {
    /// Returns the event type as a string for storage
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ServiceStarted { .. } => "service_started",
            Self::ServiceStopped { .. } => "service_stopped",
            Self::TicketIssued { .. } => "ticket_issued",
            Self::TicketClaimed { .. } => "ticket_claimed",
            Self::StepCompleted { .. } => "step_completed",
            Self::NoShowMarked { .. } => "no_show_marked",
            Self::ManualOverride { .. } => "manual_override",
            Self::SessionReset { .. } => "session_reset",
        }
    }

    /// Extract ticket_id if this event is ticket-related
    pub fn ticket_id(&self) -> Option<i64> {
        match self {
            Self::TicketIssued { ticket_id, .. }
            | Self::TicketClaimed { ticket_id, .. }
            | Self::StepCompleted { ticket_id, .. }
            | Self::NoShowMarked { ticket_id, .. }
            | Self::ManualOverride { ticket_id, .. } => Some(*ticket_id),
            Self::SessionReset {
                current_ticket_id, ..
            } => *current_ticket_id,
            _ => None,
        }
    }

    /// Extract the teller who triggered this event, if any
    pub fn teller_id(&self) -> Option<&str> {
        match self {
            Self::TicketClaimed { teller_id, .. }
            | Self::StepCompleted { teller_id, .. }
            | Self::NoShowMarked { teller_id, .. }
            | Self::ManualOverride { teller_id, .. }
            | Self::SessionReset { teller_id, .. } => Some(teller_id),
            _ => None,
        }
    }
}

/// A stored audit record with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub ticket_id: Option<i64>,
    pub teller_id: Option<String>,
    pub data: AuditEvent,
}
