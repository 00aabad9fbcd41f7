//! Per-teller working state between requests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ticket::{PriorityClass, Step};

/// What a teller is working on: the queue they pull from and the ticket in hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TellerSession {
    pub teller_id: String,
    pub step: Option<Step>,
    pub transaction_type_filter: Option<i64>,
    pub priority_filter: Option<PriorityClass>,
    pub current_ticket_id: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

impl TellerSession {
    /// Empty session for a teller seen for the first time.
    pub fn new(teller_id: impl Into<String>) -> Self {
        Self {
            teller_id: teller_id.into(),
            step: None,
            transaction_type_filter: None,
            priority_filter: None,
            current_ticket_id: None,
            updated_at: Utc::now(),
        }
    }

    /// Point the session at a ticket being served at `step`.
    pub fn bind(&mut self, step: Step, ticket_id: i64) {
        self.step = Some(step);
        self.current_ticket_id = Some(ticket_id);
        self.touch();
    }

    pub fn release(&mut self) {
        self.current_ticket_id = None;
        self.touch();
    }

    pub fn set_filters(&mut self, step: Step, transaction_type: i64, priority: PriorityClass) {
        self.step = Some(step);
        self.transaction_type_filter = Some(transaction_type);
        self.priority_filter = Some(priority);
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// In-memory session registry, keyed by teller id.
///
/// A request checks a session out with [`get`](TellerSessions::get), works on
/// the copy and writes it back with [`put`](TellerSessions::put). Only the
/// owning teller's requests touch a session.
#[derive(Debug, Default)]
pub struct TellerSessions {
    sessions: Mutex<HashMap<String, TellerSession>>,
}

impl TellerSessions {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned map is still a valid map; sessions are plain values.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, TellerSession>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current session, or a fresh one if the teller has none.
    pub fn get(&self, teller_id: &str) -> TellerSession {
        self.lock()
            .get(teller_id)
            .cloned()
            .unwrap_or_else(|| TellerSession::new(teller_id))
    }

    pub fn put(&self, session: TellerSession) {
        self.lock().insert(session.teller_id.clone(), session);
    }

    /// Drop a teller's session, returning what it held.
    pub fn reset(&self, teller_id: &str) -> Option<TellerSession> {
        self.lock().remove(teller_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
