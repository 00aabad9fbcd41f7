//! Ticket storage trait and types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::ticket::{PriorityClass, SequencePartition, Status, Step, Ticket, TicketEvent, TicketState};

/// Error type for ticket storage operations.
#[derive(Debug, Error)]
pub enum TicketError {
    /// Ticket not found.
    #[error("Ticket not found: {0}")]
    NotFound(String),

    /// The ticket is not in the state the operation requires.
    #[error("Cannot {operation} ticket {ticket_id}: current state is {current_state}")]
    InvalidState {
        ticket_id: String,
        current_state: String,
        operation: String,
    },

    /// A conditional claim matched no row because another claim won first.
    #[error("Ticket {0} was claimed by another teller")]
    Conflict(String),

    /// The teller already has a ticket in service at this step.
    #[error("Teller {teller_id} is already serving ticket {ticket_id}")]
    TellerBusy { teller_id: String, ticket_id: i64 },

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for TicketError {
    fn from(e: rusqlite::Error) -> Self {
        TicketError::Database(e.to_string())
    }
}

/// Request to issue a new ticket.
#[derive(Debug, Clone)]
pub struct CreateTicketRequest {
    pub transaction_type: i64,
    pub is_priority: bool,
    /// Lane and day the number is allocated in.
    pub partition: SequencePartition,
}

/// Selection criteria for the next ticket to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueQuery {
    pub step: Step,
    /// Matched against the intake type at step 1 and the classified type at step 2.
    pub transaction_type: i64,
    pub priority: PriorityClass,
}

/// Lookup of a ticket by the number a teller typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberLookup {
    pub step: Step,
    /// Matched the same way as [`QueueQuery::transaction_type`].
    pub transaction_type: i64,
    pub number: u32,
    /// Restrict to one lane.
    pub is_priority: Option<bool>,
    /// Restrict to one issuing day.
    pub sequence_day: Option<String>,
}

/// Data captured when a step-1 teller completes a ticket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepNotes {
    pub classification: Option<i64>,
    pub remarks: Option<String>,
}

/// Filter for listing tickets.
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub status: Option<Status>,
    pub step: Option<Step>,
    pub transaction_type: Option<i64>,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl TicketFilter {
    /// Create a new filter with defaults.
    pub fn new() -> Self {
        Self {
            limit: 100,
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_step(mut self, step: Step) -> Self {
        self.step = Some(step);
        self
    }

    pub fn with_transaction_type(mut self, transaction_type: i64) -> Self {
        self.transaction_type = Some(transaction_type);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Serving and waiting tickets read in one consistent pass.
#[derive(Debug, Clone)]
pub struct BoardRows {
    /// Most recently updated first.
    pub serving: Vec<Ticket>,
    /// Oldest created first.
    pub waiting: Vec<Ticket>,
    pub read_at: DateTime<Utc>,
}

/// Number of tickets in one state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateCount {
    pub step: Step,
    pub status: Status,
    pub count: i64,
}

/// Aggregate service figures over all stored tickets.
#[derive(Debug, Clone, Serialize)]
pub struct QueueStats {
    pub generated_at: DateTime<Utc>,
    pub counts: Vec<StateCount>,
    pub avg_wait_secs_step1: Option<f64>,
    pub avg_service_secs_step1: Option<f64>,
    pub avg_service_secs_step2: Option<f64>,
}

impl QueueStats {
    /// Count for one state, zero when absent.
    pub fn count(&self, step: Step, status: Status) -> i64 {
        self.counts
            .iter()
            .find(|c| c.step == step && c.status == status)
            .map(|c| c.count)
            .unwrap_or(0)
    }
}

/// Trait for ticket storage backends.
///
/// Tickets only change state through [`claim`](TicketStore::claim) and
/// [`transition`](TicketStore::transition), both conditional on the state the
/// caller last observed.
pub trait TicketStore: Send + Sync {
    /// Allocate the next number in the request's partition and store a
    /// `(1, waiting)` ticket, atomically.
    fn create(&self, request: CreateTicketRequest) -> Result<Ticket, TicketError>;

    /// Get a ticket by ID.
    fn get(&self, id: i64) -> Result<Option<Ticket>, TicketError>;

    /// Most recent ticket at the lookup's step matching a typed number.
    fn find_by_number(&self, lookup: &NumberLookup) -> Result<Option<Ticket>, TicketError>;

    /// Oldest waiting ticket eligible for the query, without claiming it.
    fn next_candidate(&self, query: &QueueQuery) -> Result<Option<Ticket>, TicketError>;

    /// Move a `(step, waiting)` ticket to `(step, serving)` bound to `teller_id`.
    /// Fails with [`TicketError::Conflict`] if the ticket is no longer waiting and
    /// with [`TicketError::TellerBusy`] if the teller is serving another ticket.
    fn claim(&self, id: i64, step: Step, teller_id: &str) -> Result<Ticket, TicketError>;

    /// Apply a non-claim `event` to a ticket currently in `from`, stamping the
    /// step's finish time. `notes` are stored only when completing step 1.
    fn transition(
        &self,
        id: i64,
        from: TicketState,
        event: TicketEvent,
        notes: Option<&StepNotes>,
    ) -> Result<Ticket, TicketError>;

    /// Ticket a teller is serving at a step, if any.
    fn serving_for(&self, teller_id: &str, step: Step) -> Result<Option<Ticket>, TicketError>;

    /// Serving and waiting tickets for the public board.
    fn snapshot(&self, serving_limit: u32, waiting_limit: u32) -> Result<BoardRows, TicketError>;

    /// List tickets matching the filter, oldest first.
    fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketError>;

    /// Count tickets matching the filter (limit and offset ignored).
    fn count(&self, filter: &TicketFilter) -> Result<i64, TicketError>;

    /// State counts and average service times.
    fn stats(&self) -> Result<QueueStats, TicketError>;
}
