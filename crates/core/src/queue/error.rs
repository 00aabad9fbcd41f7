use thiserror::Error;

use crate::catalog::CatalogError;
use crate::ticket::TicketError;

/// Errors returned by [`QueueService`](super::QueueService) operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Input the operation cannot accept: unknown type, missing classification,
    /// malformed ticket number.
    #[error("{0}")]
    Validation(String),

    /// The teller's session or the ticket is not in the state the operation needs.
    #[error("{0}")]
    Precondition(String),

    #[error("{0}")]
    NotFound(String),

    /// Every claim attempt lost the race to another teller.
    #[error("queue is busy: claim lost to another teller {attempts} time(s)")]
    Conflict { attempts: u32 },

    /// Storage failed; nothing was changed.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl QueueError {
    /// Short machine-readable kind, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            QueueError::Validation(_) => "validation",
            QueueError::Precondition(_) => "precondition",
            QueueError::NotFound(_) => "not_found",
            QueueError::Conflict { .. } => "conflict",
            QueueError::Persistence(_) => "persistence",
        }
    }
}

impl From<TicketError> for QueueError {
    fn from(e: TicketError) -> Self {
        match e {
            TicketError::NotFound(id) => QueueError::NotFound(format!("ticket {} not found", id)),
            e @ TicketError::InvalidState { .. } => QueueError::Precondition(e.to_string()),
            e @ TicketError::TellerBusy { .. } => QueueError::Precondition(e.to_string()),
            TicketError::Conflict(_) => QueueError::Conflict { attempts: 1 },
            TicketError::Database(msg) => QueueError::Persistence(msg),
        }
    }
}

impl From<CatalogError> for QueueError {
    fn from(e: CatalogError) -> Self {
        QueueError::Persistence(e.to_string())
    }
}
