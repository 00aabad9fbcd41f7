use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::audit::{AuditEvent, AuditHandle};
use crate::board::BoardSnapshot;
use crate::catalog::{TransactionType, TransactionTypeCatalog};
use crate::config::{BoardConfig, QueueConfig};
use crate::metrics::{
    CLAIM_CONFLICTS, GRAB_RESULTS, SERVICE_DURATION, TICKETS_ISSUED, TICKET_TRANSITIONS,
    WAIT_DURATION,
};
use crate::teller::{TellerSession, TellerSessions};
use crate::ticket::{
    CreateTicketRequest, NumberLookup, Numbering, PriorityClass, QueueQuery, QueueStats, Status,
    Step, StepNotes, Ticket, TicketError, TicketEvent, TicketFilter, TicketNumberInput,
    TicketStore,
};

use super::QueueError;

/// Result of a grab-next request.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GrabOutcome {
    /// The ticket is now serving and bound to the teller.
    Claimed { ticket: Ticket },
    /// Nothing eligible was waiting.
    Empty,
}

/// The queue engine: issues tickets and drives them through both teller steps.
///
/// Every ticket mutation goes through the [`TicketStore`]; the service adds
/// catalog validation, teller sessions, claim retries, metrics and audit.
pub struct QueueService {
    store: Arc<dyn TicketStore>,
    catalog: Arc<dyn TransactionTypeCatalog>,
    sessions: TellerSessions,
    numbering: Numbering,
    claim_max_attempts: u32,
    board: BoardConfig,
    audit: Option<AuditHandle>,
}

impl QueueService {
    pub fn new(
        store: Arc<dyn TicketStore>,
        catalog: Arc<dyn TransactionTypeCatalog>,
        queue: &QueueConfig,
        board: BoardConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            sessions: TellerSessions::new(),
            numbering: Numbering::new(queue.sequence_policy, queue.sequence_reset),
            claim_max_attempts: queue.claim_max_attempts.max(1),
            board,
            audit: None,
        }
    }

    /// Emit audit events through `handle`.
    pub fn with_audit(mut self, handle: AuditHandle) -> Self {
        self.audit = Some(handle);
        self
    }

    pub fn numbering(&self) -> Numbering {
        self.numbering
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    fn audit(&self, event: AuditEvent) {
        if let Some(ref handle) = self.audit {
            handle.try_emit(event);
        }
    }

    fn require_type(&self, transaction_type: i64) -> Result<(), QueueError> {
        if self.catalog.contains(transaction_type)? {
            Ok(())
        } else {
            Err(QueueError::Validation(format!(
                "unknown transaction type {}",
                transaction_type
            )))
        }
    }

    fn require_teller(teller_id: &str) -> Result<(), QueueError> {
        if teller_id.trim().is_empty() {
            return Err(QueueError::Validation("teller id is required".to_string()));
        }
        Ok(())
    }

    // =========================================================================
    // Intake
    // =========================================================================

    /// Issue a new ticket at `(1, waiting)`.
    pub fn create_ticket(
        &self,
        transaction_type: i64,
        is_priority: bool,
    ) -> Result<Ticket, QueueError> {
        self.require_type(transaction_type)?;

        let ticket = self.store.create(CreateTicketRequest {
            transaction_type,
            is_priority,
            partition: self.numbering.partition(is_priority, Self::today()),
        })?;

        let lane = if is_priority { "priority" } else { "regular" };
        TICKETS_ISSUED.with_label_values(&[lane]).inc();

        info!(
            ticket_id = ticket.id,
            code = %ticket.display_code(),
            transaction_type,
            "Ticket issued"
        );

        self.audit(AuditEvent::TicketIssued {
            ticket_id: ticket.id,
            number: ticket.number,
            display_code: ticket.display_code(),
            transaction_type,
            is_priority,
        });

        Ok(ticket)
    }

    // =========================================================================
    // Teller actions
    // =========================================================================

    /// Claim the oldest eligible waiting ticket for a teller.
    pub fn grab_next(
        &self,
        teller_id: &str,
        step: Step,
        transaction_type: i64,
        priority: PriorityClass,
    ) -> Result<GrabOutcome, QueueError> {
        Self::require_teller(teller_id)?;
        self.require_type(transaction_type)?;

        let mut session = self.sessions.get(teller_id);
        let result = self.grab_with_session(&mut session, step, transaction_type, priority);
        self.sessions.put(session);
        result
    }

    fn grab_with_session(
        &self,
        session: &mut TellerSession,
        step: Step,
        transaction_type: i64,
        priority: PriorityClass,
    ) -> Result<GrabOutcome, QueueError> {
        let teller_id = session.teller_id.clone();

        // One ticket in service per teller, whatever the step.
        if let (Some(bound_step), Some(id)) = (session.step, session.current_ticket_id) {
            match self.store.get(id)? {
                Some(ticket)
                    if ticket.status() == Status::Serving
                        && ticket.served_by(ticket.step()) == Some(teller_id.as_str()) =>
                {
                    return Err(Self::busy(&teller_id, &ticket));
                }
                _ => {
                    debug!(teller_id = %teller_id, ticket_id = id, step = %bound_step, "Releasing stale session");
                    session.release();
                }
            }
        }
        for serving_step in Step::ALL {
            if let Some(stored) = self.store.serving_for(&teller_id, serving_step)? {
                session.bind(serving_step, stored.id);
                return Err(Self::busy(&teller_id, &stored));
            }
        }

        session.set_filters(step, transaction_type, priority);

        let query = QueueQuery {
            step,
            transaction_type,
            priority,
        };
        let step_label = step.to_string();

        for attempt in 1..=self.claim_max_attempts {
            let Some(candidate) = self.store.next_candidate(&query)? else {
                GRAB_RESULTS
                    .with_label_values(&[step_label.as_str(), "empty"])
                    .inc();
                debug!(teller_id = %teller_id, step = %step, transaction_type, "Queue empty");
                return Ok(GrabOutcome::Empty);
            };

            match self.store.claim(candidate.id, step, &teller_id) {
                Ok(ticket) => {
                    session.bind(step, ticket.id);
                    self.record_claim(&ticket, &teller_id, step, attempt);
                    return Ok(GrabOutcome::Claimed { ticket });
                }
                Err(TicketError::Conflict(_)) => {
                    CLAIM_CONFLICTS.inc();
                    debug!(
                        teller_id = %teller_id,
                        ticket_id = candidate.id,
                        attempt,
                        "Claim lost to another teller, retrying"
                    );
                }
                Err(TicketError::TellerBusy { ticket_id, .. }) => {
                    let Some(held) = self.store.get(ticket_id)? else {
                        return Err(TicketError::NotFound(ticket_id.to_string()).into());
                    };
                    session.bind(held.step(), held.id);
                    return Err(Self::busy(&teller_id, &held));
                }
                Err(e) => return Err(e.into()),
            }
        }

        GRAB_RESULTS
            .with_label_values(&[step_label.as_str(), "conflict"])
            .inc();
        warn!(
            teller_id = %teller_id,
            step = %step,
            attempts = self.claim_max_attempts,
            "Giving up after losing every claim"
        );
        Err(QueueError::Conflict {
            attempts: self.claim_max_attempts,
        })
    }

    fn busy(teller_id: &str, ticket: &Ticket) -> QueueError {
        QueueError::Precondition(format!(
            "teller {} is already serving {} at step {}",
            teller_id,
            ticket.display_code(),
            ticket.step()
        ))
    }

    fn record_claim(&self, ticket: &Ticket, teller_id: &str, step: Step, attempts: u32) {
        let step_label = step.to_string();
        GRAB_RESULTS
            .with_label_values(&[step_label.as_str(), "claimed"])
            .inc();
        TICKET_TRANSITIONS
            .with_label_values(&[step_label.as_str(), TicketEvent::Claim.as_str()])
            .inc();

        let waited = match step {
            Step::One => secs_between(Some(ticket.created_at), ticket.started_at_step1),
            Step::Two => secs_between(ticket.finished_at_step1, ticket.started_at_step2),
        };
        if let Some(secs) = waited {
            WAIT_DURATION
                .with_label_values(&[step_label.as_str()])
                .observe(secs);
        }

        info!(
            ticket_id = ticket.id,
            code = %ticket.display_code(),
            teller_id = %teller_id,
            step = %step,
            attempts,
            "Ticket claimed"
        );

        self.audit(AuditEvent::TicketClaimed {
            ticket_id: ticket.id,
            teller_id: teller_id.to_string(),
            step,
            attempts,
        });
    }

    /// The ticket a teller is serving at `step`, re-binding it to the session
    /// when only the store still knows about it.
    fn current_ticket(&self, session: &mut TellerSession, step: Step) -> Result<Ticket, QueueError> {
        let teller_id = session.teller_id.clone();

        if session.step == Some(step) {
            if let Some(id) = session.current_ticket_id {
                if let Some(ticket) = self.store.get(id)? {
                    if ticket.step() == step
                        && ticket.status() == Status::Serving
                        && ticket.served_by(step) == Some(teller_id.as_str())
                    {
                        return Ok(ticket);
                    }
                }
                session.release();
            }
        }

        match self.store.serving_for(&teller_id, step)? {
            Some(ticket) => {
                session.bind(step, ticket.id);
                Ok(ticket)
            }
            None => Err(QueueError::Precondition(format!(
                "teller {} has no ticket in service at step {}",
                teller_id, step
            ))),
        }
    }

    /// Finish the teller's current ticket at `step`.
    ///
    /// Step 1 needs a `classification` from the catalog; it decides which step-2
    /// queue the ticket joins. `remarks` travel with it.
    pub fn complete_current(
        &self,
        teller_id: &str,
        step: Step,
        classification: Option<i64>,
        remarks: Option<String>,
    ) -> Result<Ticket, QueueError> {
        Self::require_teller(teller_id)?;

        let mut session = self.sessions.get(teller_id);
        let result = self.complete_with_session(&mut session, step, classification, remarks);
        self.sessions.put(session);
        result
    }

    fn complete_with_session(
        &self,
        session: &mut TellerSession,
        step: Step,
        classification: Option<i64>,
        remarks: Option<String>,
    ) -> Result<Ticket, QueueError> {
        let ticket = self.current_ticket(session, step)?;

        let notes = match step {
            Step::One => {
                let classification = classification.ok_or_else(|| {
                    QueueError::Validation(
                        "a classification is required to complete step 1".to_string(),
                    )
                })?;
                self.require_type(classification)?;
                Some(StepNotes {
                    classification: Some(classification),
                    remarks: remarks
                        .map(|r| r.trim().to_string())
                        .filter(|r| !r.is_empty()),
                })
            }
            Step::Two => {
                self.require_type(ticket.effective_transaction_type())?;
                None
            }
        };

        let done = self.store.transition(
            ticket.id,
            ticket.state,
            TicketEvent::Complete,
            notes.as_ref(),
        )?;
        session.release();

        self.record_finish(&done, step, TicketEvent::Complete);
        info!(
            ticket_id = done.id,
            code = %done.display_code(),
            teller_id = %session.teller_id,
            step = %step,
            to_state = %done.state,
            "Step completed"
        );
        self.audit(AuditEvent::StepCompleted {
            ticket_id: done.id,
            teller_id: session.teller_id.clone(),
            step,
            classification: notes.and_then(|n| n.classification),
        });

        Ok(done)
    }

    /// Mark the client of the teller's current ticket as absent.
    pub fn mark_no_show(&self, teller_id: &str, step: Step) -> Result<Ticket, QueueError> {
        Self::require_teller(teller_id)?;

        let mut session = self.sessions.get(teller_id);
        let result = self.no_show_with_session(&mut session, step);
        self.sessions.put(session);
        result
    }

    fn no_show_with_session(
        &self,
        session: &mut TellerSession,
        step: Step,
    ) -> Result<Ticket, QueueError> {
        let ticket = self.current_ticket(session, step)?;
        let absent = self
            .store
            .transition(ticket.id, ticket.state, TicketEvent::NoShow, None)?;
        session.release();

        self.record_finish(&absent, step, TicketEvent::NoShow);
        info!(
            ticket_id = absent.id,
            code = %absent.display_code(),
            teller_id = %session.teller_id,
            step = %step,
            "Ticket marked no-show"
        );
        self.audit(AuditEvent::NoShowMarked {
            ticket_id: absent.id,
            teller_id: session.teller_id.clone(),
            step,
        });

        Ok(absent)
    }

    fn record_finish(&self, ticket: &Ticket, step: Step, event: TicketEvent) {
        let step_label = step.to_string();
        TICKET_TRANSITIONS
            .with_label_values(&[step_label.as_str(), event.as_str()])
            .inc();
        if let Some(secs) = ticket.service_secs(step) {
            SERVICE_DURATION
                .with_label_values(&[step_label.as_str()])
                .observe(secs);
        }
    }

    /// Recover a no-show ticket by the number the client holds.
    ///
    /// The ticket is looked up under `transaction_type`, or the teller's current
    /// queue filter, in today's numbering. The recovered ticket is not bound to
    /// the teller.
    pub fn manual_override(
        &self,
        teller_id: &str,
        step: Step,
        input: &str,
        transaction_type: Option<i64>,
    ) -> Result<Ticket, QueueError> {
        Self::require_teller(teller_id)?;
        let parsed = TicketNumberInput::parse(input).map_err(QueueError::Validation)?;

        let session = self.sessions.get(teller_id);
        let transaction_type = transaction_type
            .or(session.transaction_type_filter)
            .ok_or_else(|| {
                QueueError::Validation(
                    "a transaction type is required when the teller has no queue selected"
                        .to_string(),
                )
            })?;
        self.require_type(transaction_type)?;

        let lane = if self.numbering.is_per_lane() {
            let lane = parsed.lane.or(session.priority_filter).ok_or_else(|| {
                QueueError::Validation(format!(
                    "'{}' needs a P or R prefix when numbers are kept per lane",
                    input.trim()
                ))
            })?;
            Some(lane)
        } else {
            parsed.lane
        };

        let lookup = NumberLookup {
            step,
            transaction_type,
            number: parsed.number,
            is_priority: lane.map(PriorityClass::is_priority),
            sequence_day: Some(self.numbering.day_key(Self::today())),
        };
        let ticket = self.store.find_by_number(&lookup)?.ok_or_else(|| {
            QueueError::NotFound(format!(
                "no ticket {} for transaction type {} at step {}",
                input.trim(),
                transaction_type,
                step
            ))
        })?;

        if ticket.status() != Status::NoShow {
            return Err(QueueError::Precondition(format!(
                "ticket {} is {}, only no-show tickets can be recovered",
                ticket.display_code(),
                ticket.state
            )));
        }

        let recovered =
            self.store
                .transition(ticket.id, ticket.state, TicketEvent::Override, None)?;

        TICKET_TRANSITIONS
            .with_label_values(&[step.to_string().as_str(), TicketEvent::Override.as_str()])
            .inc();
        info!(
            ticket_id = recovered.id,
            code = %recovered.display_code(),
            teller_id = %teller_id,
            step = %step,
            to_state = %recovered.state,
            "No-show ticket recovered"
        );
        self.audit(AuditEvent::ManualOverride {
            ticket_id: recovered.id,
            teller_id: teller_id.to_string(),
            step,
            input: input.trim().to_string(),
            to_state: recovered.state.to_string(),
        });

        Ok(recovered)
    }

    /// Forget a teller's filters and current ticket. Tickets are not touched.
    pub fn reset_session(&self, teller_id: &str) -> Result<(), QueueError> {
        Self::require_teller(teller_id)?;

        let previous = self.sessions.reset(teller_id);
        let current_ticket_id = previous.and_then(|s| s.current_ticket_id);

        info!(teller_id = %teller_id, current_ticket_id = ?current_ticket_id, "Teller session reset");
        self.audit(AuditEvent::SessionReset {
            teller_id: teller_id.to_string(),
            current_ticket_id,
        });
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn session(&self, teller_id: &str) -> TellerSession {
        self.sessions.get(teller_id)
    }

    pub fn get_ticket(&self, id: i64) -> Result<Ticket, QueueError> {
        self.store
            .get(id)?
            .ok_or_else(|| QueueError::NotFound(format!("ticket {} not found", id)))
    }

    pub fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, QueueError> {
        Ok(self.store.list(filter)?)
    }

    pub fn count_tickets(&self, filter: &TicketFilter) -> Result<i64, QueueError> {
        Ok(self.store.count(filter)?)
    }

    pub fn stats(&self) -> Result<QueueStats, QueueError> {
        Ok(self.store.stats()?)
    }

    pub fn transaction_types(&self) -> Result<Vec<TransactionType>, QueueError> {
        Ok(self.catalog.list()?)
    }

    /// What the lobby screens show right now.
    pub fn board_snapshot(&self) -> Result<BoardSnapshot, QueueError> {
        let rows = self
            .store
            .snapshot(self.board.serving_limit, self.board.waiting_limit)?;
        let types = self.catalog.list()?;
        Ok(BoardSnapshot::build(&rows, &types))
    }
}

fn secs_between(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Option<f64> {
    let millis = (end? - start?).num_milliseconds();
    Some(millis as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditEventEnvelope;
    use crate::testing::fixtures;
    use tokio::sync::mpsc;

    fn claimed(outcome: GrabOutcome) -> Ticket {
        match outcome {
            GrabOutcome::Claimed { ticket } => ticket,
            GrabOutcome::Empty => panic!("expected a claimed ticket"),
        }
    }

    #[test]
    fn test_create_ticket_rejects_unknown_type() {
        let service = fixtures::service();
        let err = service.create_ticket(99, false).unwrap_err();
        assert!(matches!(err, QueueError::Validation(_)));
        assert_eq!(service.count_tickets(&TicketFilter::new()).unwrap(), 0);
    }

    #[test]
    fn test_create_ticket_numbers_from_one() {
        let service = fixtures::service();
        let first = service.create_ticket(fixtures::GENERAL, false).unwrap();
        let second = service.create_ticket(fixtures::GENERAL, true).unwrap();
        assert_eq!(first.number, 1);
        assert_eq!(second.number, 2);
        assert_eq!(second.display_code(), "P0002");
        assert_eq!(first.state, crate::ticket::TicketState::initial());
    }

    #[test]
    fn test_grab_rejects_blank_teller() {
        let service = fixtures::service();
        let err = service
            .grab_next("  ", Step::One, fixtures::GENERAL, PriorityClass::Regular)
            .unwrap_err();
        assert!(matches!(err, QueueError::Validation(_)));
    }

    #[test]
    fn test_grab_records_filters_even_when_empty() {
        let service = fixtures::service();
        let outcome = service
            .grab_next("t1", Step::One, fixtures::PERMIT, PriorityClass::Priority)
            .unwrap();
        assert!(matches!(outcome, GrabOutcome::Empty));

        let session = service.session("t1");
        assert_eq!(session.step, Some(Step::One));
        assert_eq!(session.transaction_type_filter, Some(fixtures::PERMIT));
        assert_eq!(session.priority_filter, Some(PriorityClass::Priority));
        assert!(session.current_ticket_id.is_none());
    }

    #[test]
    fn test_grab_after_reset_rebinds_ticket_from_other_step() {
        let service = fixtures::service();
        let first = service.create_ticket(fixtures::GENERAL, false).unwrap();
        service.create_ticket(fixtures::GENERAL, false).unwrap();
        claimed(
            service
                .grab_next("admin", Step::One, fixtures::GENERAL, PriorityClass::Regular)
                .unwrap(),
        );
        service.reset_session("admin").unwrap();

        let err = service
            .grab_next("admin", Step::Two, fixtures::GENERAL, PriorityClass::Regular)
            .unwrap_err();
        assert!(matches!(err, QueueError::Precondition(_)));

        let session = service.session("admin");
        assert_eq!(session.step, Some(Step::One));
        assert_eq!(session.current_ticket_id, Some(first.id));
    }

    #[test]
    fn test_complete_step_one_requires_classification() {
        let service = fixtures::service();
        let ticket = service.create_ticket(fixtures::GENERAL, false).unwrap();
        claimed(
            service
                .grab_next("t1", Step::One, fixtures::GENERAL, PriorityClass::Regular)
                .unwrap(),
        );

        let err = service
            .complete_current("t1", Step::One, None, None)
            .unwrap_err();
        assert!(matches!(err, QueueError::Validation(_)));

        let err = service
            .complete_current("t1", Step::One, Some(42), None)
            .unwrap_err();
        assert!(matches!(err, QueueError::Validation(_)));

        // Still serving and still bound.
        let stored = service.get_ticket(ticket.id).unwrap();
        assert_eq!(stored.status(), Status::Serving);
        assert_eq!(service.session("t1").current_ticket_id, Some(ticket.id));
    }

    #[test]
    fn test_complete_trims_blank_remarks() {
        let service = fixtures::service();
        service.create_ticket(fixtures::GENERAL, false).unwrap();
        service
            .grab_next("t1", Step::One, fixtures::GENERAL, PriorityClass::Regular)
            .unwrap();

        let done = service
            .complete_current("t1", Step::One, Some(fixtures::PERMIT), Some("   ".to_string()))
            .unwrap();
        assert_eq!(done.classification, Some(fixtures::PERMIT));
        assert!(done.remarks.is_none());
        assert!(service.session("t1").current_ticket_id.is_none());
    }

    #[test]
    fn test_complete_without_ticket_is_precondition() {
        let service = fixtures::service();
        let err = service
            .complete_current("t1", Step::Two, None, None)
            .unwrap_err();
        assert!(matches!(err, QueueError::Precondition(_)));

        let err = service.mark_no_show("t1", Step::One).unwrap_err();
        assert!(matches!(err, QueueError::Precondition(_)));
    }

    #[test]
    fn test_override_rejects_malformed_number() {
        let service = fixtures::service();
        let err = service
            .manual_override("t1", Step::One, "X12", Some(fixtures::GENERAL))
            .unwrap_err();
        assert!(matches!(err, QueueError::Validation(_)));
    }

    #[test]
    fn test_override_needs_a_transaction_type() {
        let service = fixtures::service();
        let err = service
            .manual_override("t1", Step::One, "1", None)
            .unwrap_err();
        assert!(matches!(err, QueueError::Validation(_)));
    }

    #[test]
    fn test_override_of_waiting_ticket_is_precondition() {
        let service = fixtures::service();
        service.create_ticket(fixtures::GENERAL, false).unwrap();

        let err = service
            .manual_override("t1", Step::One, "R0001", Some(fixtures::GENERAL))
            .unwrap_err();
        assert!(matches!(err, QueueError::Precondition(_)));

        let err = service
            .manual_override("t1", Step::One, "7", Some(fixtures::GENERAL))
            .unwrap_err();
        assert!(matches!(err, QueueError::NotFound(_)));
    }

    #[test]
    fn test_get_ticket_not_found() {
        let service = fixtures::service();
        assert!(matches!(
            service.get_ticket(5),
            Err(QueueError::NotFound(_))
        ));
    }

    #[test]
    fn test_board_snapshot_names_types() {
        let service = fixtures::service();
        service.create_ticket(fixtures::GENERAL, false).unwrap();
        service.create_ticket(fixtures::PERMIT, true).unwrap();
        service
            .grab_next("t1", Step::One, fixtures::PERMIT, PriorityClass::Priority)
            .unwrap();

        let board = service.board_snapshot().unwrap();
        assert_eq!(board.serving.len(), 1);
        assert_eq!(board.serving[0].served_by.as_deref(), Some("t1"));
        assert_eq!(board.waiting.len(), 1);
        assert_eq!(
            board.waiting[0].transaction_type_name.as_deref(),
            Some("General Inquiry")
        );
    }

    #[test]
    fn test_operations_emit_audit_events() {
        let (tx, mut rx) = mpsc::channel::<AuditEventEnvelope>(16);
        let service = fixtures::service().with_audit(AuditHandle::new(tx));

        service.create_ticket(fixtures::GENERAL, false).unwrap();
        service
            .grab_next("t1", Step::One, fixtures::GENERAL, PriorityClass::Regular)
            .unwrap();
        service.mark_no_show("t1", Step::One).unwrap();
        service
            .manual_override("t1", Step::One, "1", None)
            .unwrap();
        service.reset_session("t1").unwrap();

        let mut types = Vec::new();
        while let Ok(envelope) = rx.try_recv() {
            types.push(envelope.event.event_type());
        }
        assert_eq!(
            types,
            vec![
                "ticket_issued",
                "ticket_claimed",
                "no_show_marked",
                "manual_override",
                "session_reset"
            ]
        );
    }

    #[test]
    fn test_secs_between() {
        let start = Utc::now();
        let end = start + chrono::Duration::milliseconds(1500);
        assert_eq!(secs_between(Some(start), Some(end)), Some(1.5));
        assert_eq!(secs_between(None, Some(end)), None);
    }
}
