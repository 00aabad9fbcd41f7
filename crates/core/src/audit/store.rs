use chrono::{DateTime, Utc};
use thiserror::Error;

use super::AuditRecord;

/// Page size used when a caller does not pick one.
pub const DEFAULT_AUDIT_PAGE: u32 = 100;

/// Upper bound on a single audit page.
pub const MAX_AUDIT_PAGE: u32 = 1000;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Audit storage error: {0}")]
    Storage(String),

    #[error("Audit payload could not be encoded or decoded: {0}")]
    Payload(String),
}

impl From<rusqlite::Error> for AuditError {
    fn from(e: rusqlite::Error) -> Self {
        AuditError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for AuditError {
    fn from(e: serde_json::Error) -> Self {
        AuditError::Payload(e.to_string())
    }
}

/// Order of returned records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuditOrder {
    /// Latest activity first, for operator screens.
    #[default]
    NewestFirst,
    /// Replay order, for reconstructing a ticket's visit.
    OldestFirst,
}

/// Which audit records to read.
///
/// All set fields must match. `event_types` matches any of its entries.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditFilter {
    pub ticket_id: Option<i64>,
    pub teller_id: Option<String>,
    pub event_types: Vec<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub order: AuditOrder,
    pub limit: u32,
    pub offset: u32,
}

impl Default for AuditFilter {
    fn default() -> Self {
        Self {
            ticket_id: None,
            teller_id: None,
            event_types: Vec::new(),
            since: None,
            until: None,
            order: AuditOrder::NewestFirst,
            limit: DEFAULT_AUDIT_PAGE,
            offset: 0,
        }
    }
}

impl AuditFilter {
    /// The latest page of records, newest first.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded for one ticket, in the order it happened.
    pub fn ticket_history(ticket_id: i64) -> Self {
        Self {
            ticket_id: Some(ticket_id),
            order: AuditOrder::OldestFirst,
            limit: MAX_AUDIT_PAGE,
            ..Self::default()
        }
    }

    pub fn with_ticket_id(mut self, ticket_id: i64) -> Self {
        self.ticket_id = Some(ticket_id);
        self
    }

    /// Records produced by one teller's actions.
    pub fn with_teller(mut self, teller_id: impl Into<String>) -> Self {
        self.teller_id = Some(teller_id.into());
        self
    }

    /// Add an accepted event type; may be called repeatedly.
    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_types.push(event_type.into());
        self
    }

    pub fn between(mut self, since: Option<DateTime<Utc>>, until: Option<DateTime<Utc>>) -> Self {
        self.since = since;
        self.until = until;
        self
    }

    pub fn oldest_first(mut self) -> Self {
        self.order = AuditOrder::OldestFirst;
        self
    }

    /// Select a page. The size is clamped to `1..=MAX_AUDIT_PAGE`.
    pub fn page(mut self, limit: u32, offset: u32) -> Self {
        self.limit = limit.clamp(1, MAX_AUDIT_PAGE);
        self.offset = offset;
        self
    }
}

/// Durable sink and reader for audit records.
pub trait AuditStore: Send + Sync {
    /// Persist one record and return its assigned id.
    fn append(&self, record: &AuditRecord) -> Result<i64, AuditError>;

    /// Persist records as one unit: either all are stored or none are.
    ///
    /// The default appends one by one; stores with transactions should override.
    fn append_batch(&self, records: &[AuditRecord]) -> Result<usize, AuditError> {
        for record in records {
            self.append(record)?;
        }
        Ok(records.len())
    }

    fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>, AuditError>;

    /// Number of records matching the filter, ignoring its page.
    fn count(&self, filter: &AuditFilter) -> Result<i64, AuditError>;

    /// A ticket's recorded visit, oldest event first.
    fn ticket_history(&self, ticket_id: i64) -> Result<Vec<AuditRecord>, AuditError> {
        self.query(&AuditFilter::ticket_history(ticket_id))
    }
}
