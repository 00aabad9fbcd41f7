//! Public display board projection.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::TransactionType;
use crate::ticket::{BoardRows, Status, Step, Ticket};

/// One ticket as shown on the board.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardEntry {
    pub id: i64,
    pub number: u32,
    pub display_code: String,
    pub step: Step,
    pub status: Status,
    pub is_priority: bool,
    /// Type the ticket is queued under at its current step.
    pub transaction_type: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_type_name: Option<String>,
    /// Teller serving the ticket at its current step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub served_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BoardEntry {
    fn from_ticket(ticket: &Ticket, types: &[TransactionType]) -> Self {
        let transaction_type = match ticket.step() {
            Step::One => ticket.transaction_type,
            Step::Two => ticket.effective_transaction_type(),
        };
        let served_by = match ticket.status() {
            Status::Serving => ticket.served_by(ticket.step()).map(String::from),
            _ => None,
        };

        Self {
            id: ticket.id,
            number: ticket.number,
            display_code: ticket.display_code(),
            step: ticket.step(),
            status: ticket.status(),
            is_priority: ticket.is_priority,
            transaction_type,
            transaction_type_name: types
                .iter()
                .find(|t| t.id == transaction_type)
                .map(|t| t.name.clone()),
            served_by,
            created_at: ticket.created_at,
            updated_at: ticket.updated_at,
        }
    }
}

/// What the lobby screens display.
#[derive(Debug, Clone, Serialize)]
pub struct BoardSnapshot {
    pub generated_at: DateTime<Utc>,
    /// Most recently called first.
    pub serving: Vec<BoardEntry>,
    /// Next in line first.
    pub waiting: Vec<BoardEntry>,
}

impl BoardSnapshot {
    /// Label rows read from the store with catalog names.
    pub fn build(rows: &BoardRows, types: &[TransactionType]) -> Self {
        Self {
            generated_at: rows.read_at,
            serving: rows
                .serving
                .iter()
                .map(|t| BoardEntry::from_ticket(t, types))
                .collect(),
            waiting: rows
                .waiting
                .iter()
                .map(|t| BoardEntry::from_ticket(t, types))
                .collect(),
        }
    }
}
