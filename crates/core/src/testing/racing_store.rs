//! Ticket store wrapper that loses claim races on demand.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::ticket::{
    BoardRows, CreateTicketRequest, NumberLookup, QueueQuery, QueueStats, Step, StepNotes, Ticket,
    TicketError, TicketEvent, TicketFilter, TicketState, TicketStore,
};

/// Wraps a real store; before each of the next N claims a rival teller claims
/// the same ticket first, so the caller's conditional update finds it taken.
///
/// # Example
///
/// ```rust,ignore
/// let store = Arc::new(RacingTicketStore::new(fixtures::memory_store(), "rival"));
/// store.lose_next_claims(1);
/// // The first grab loses ticket 1 to "rival-1" and retries with ticket 2.
/// ```
pub struct RacingTicketStore {
    inner: Arc<dyn TicketStore>,
    rival: String,
    pending: AtomicU32,
    lost: AtomicU32,
}

impl RacingTicketStore {
    pub fn new(inner: Arc<dyn TicketStore>, rival: impl Into<String>) -> Self {
        Self {
            inner,
            rival: rival.into(),
            pending: AtomicU32::new(0),
            lost: AtomicU32::new(0),
        }
    }

    /// Make the next `n` claims lose to a rival.
    pub fn lose_next_claims(&self, n: u32) {
        self.pending.store(n, Ordering::SeqCst);
    }

    /// Claims lost so far.
    pub fn claims_lost(&self) -> u32 {
        self.lost.load(Ordering::SeqCst)
    }

    fn take_race(&self) -> bool {
        self.pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl TicketStore for RacingTicketStore {
    fn create(&self, request: CreateTicketRequest) -> Result<Ticket, TicketError> {
        self.inner.create(request)
    }

    fn get(&self, id: i64) -> Result<Option<Ticket>, TicketError> {
        self.inner.get(id)
    }

    fn find_by_number(&self, lookup: &NumberLookup) -> Result<Option<Ticket>, TicketError> {
        self.inner.find_by_number(lookup)
    }

    fn next_candidate(&self, query: &QueueQuery) -> Result<Option<Ticket>, TicketError> {
        self.inner.next_candidate(query)
    }

    fn claim(&self, id: i64, step: Step, teller_id: &str) -> Result<Ticket, TicketError> {
        if self.take_race() {
            // Each rival is a separate teller so none of them is ever busy.
            let n = self.lost.fetch_add(1, Ordering::SeqCst) + 1;
            self.inner
                .claim(id, step, &format!("{}-{}", self.rival, n))?;
        }
        self.inner.claim(id, step, teller_id)
    }

    fn transition(
        &self,
        id: i64,
        from: TicketState,
        event: TicketEvent,
        notes: Option<&StepNotes>,
    ) -> Result<Ticket, TicketError> {
        self.inner.transition(id, from, event, notes)
    }

    fn serving_for(&self, teller_id: &str, step: Step) -> Result<Option<Ticket>, TicketError> {
        self.inner.serving_for(teller_id, step)
    }

    fn snapshot(&self, serving_limit: u32, waiting_limit: u32) -> Result<BoardRows, TicketError> {
        self.inner.snapshot(serving_limit, waiting_limit)
    }

    fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketError> {
        self.inner.list(filter)
    }

    fn count(&self, filter: &TicketFilter) -> Result<i64, TicketError> {
        self.inner.count(filter)
    }

    fn stats(&self) -> Result<QueueStats, TicketError> {
        self.inner.stats()
    }
}
