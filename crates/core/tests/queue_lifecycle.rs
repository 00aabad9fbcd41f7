//! Queue lifecycle integration tests.
//!
//! These tests drive tickets through both teller steps using the public
//! `QueueService` API:
//! (1, waiting) -> (1, serving) -> (2, waiting) -> (2, serving) -> (2, done)

use pila_core::testing::fixtures::{self, CEDULA, GENERAL, PERMIT};
use pila_core::{
    GrabOutcome, PriorityClass, QueueError, QueueService, Status, Step, Ticket, TicketFilter,
};

fn claim(service: &QueueService, teller: &str, step: Step, tt: i64, lane: PriorityClass) -> Ticket {
    match service.grab_next(teller, step, tt, lane).expect("grab failed") {
        GrabOutcome::Claimed { ticket } => ticket,
        GrabOutcome::Empty => panic!("{} found an empty queue", teller),
    }
}

fn assert_empty(service: &QueueService, teller: &str, step: Step, tt: i64, lane: PriorityClass) {
    let outcome = service.grab_next(teller, step, tt, lane).expect("grab failed");
    assert!(
        matches!(outcome, GrabOutcome::Empty),
        "expected empty queue, got {:?}",
        outcome
    );
}

#[test]
fn test_round_trip_through_both_steps() {
    let service = fixtures::service();
    let issued = service.create_ticket(GENERAL, false).unwrap();
    assert_eq!(issued.display_code(), "R0001");

    // Step 1
    let ticket = claim(&service, "intake-1", Step::One, GENERAL, PriorityClass::Regular);
    assert_eq!(ticket.id, issued.id);
    assert_eq!(ticket.status(), Status::Serving);
    assert_eq!(ticket.served_by_step1.as_deref(), Some("intake-1"));
    assert!(ticket.started_at_step1.is_some());
    assert_eq!(service.session("intake-1").current_ticket_id, Some(ticket.id));

    let ticket = service
        .complete_current(
            "intake-1",
            Step::One,
            Some(PERMIT),
            Some(" bring barangay clearance ".to_string()),
        )
        .unwrap();
    assert_eq!((ticket.step(), ticket.status()), (Step::Two, Status::Waiting));
    assert_eq!(ticket.classification, Some(PERMIT));
    assert_eq!(ticket.remarks.as_deref(), Some("bring barangay clearance"));
    assert!(ticket.finished_at_step1.is_some());
    assert!(service.session("intake-1").current_ticket_id.is_none());

    // The step-2 queue is keyed by classification, not intake type.
    assert_empty(&service, "desk-1", Step::Two, GENERAL, PriorityClass::Regular);
    let ticket = claim(&service, "desk-1", Step::Two, PERMIT, PriorityClass::Regular);
    assert_eq!(ticket.served_by_step2.as_deref(), Some("desk-1"));
    assert_eq!(ticket.transaction_type, GENERAL);

    let ticket = service
        .complete_current("desk-1", Step::Two, None, None)
        .unwrap();
    assert_eq!((ticket.step(), ticket.status()), (Step::Two, Status::Done));
    assert!(ticket.finished_at_step2.is_some());
    assert_eq!(ticket.served_by_step1.as_deref(), Some("intake-1"));
    assert_eq!(ticket.served_by_step2.as_deref(), Some("desk-1"));

    let board = service.board_snapshot().unwrap();
    assert!(board.serving.is_empty());
    assert!(board.waiting.is_empty());

    let stats = service.stats().unwrap();
    assert_eq!(stats.count(Step::Two, Status::Done), 1);
    assert!(stats.avg_service_secs_step1.is_some());
    assert!(stats.avg_service_secs_step2.is_some());
}

#[test]
fn test_no_show_and_manual_recovery() {
    let service = fixtures::service();
    let issued = service.create_ticket(GENERAL, false).unwrap();

    claim(&service, "intake-1", Step::One, GENERAL, PriorityClass::Regular);
    let absent = service.mark_no_show("intake-1", Step::One).unwrap();
    assert_eq!((absent.step(), absent.status()), (Step::One, Status::NoShow));
    assert!(absent.finished_at_step1.is_some());
    assert!(service.session("intake-1").current_ticket_id.is_none());

    // No-show tickets are never picked by the normal pull.
    assert_empty(&service, "intake-1", Step::One, GENERAL, PriorityClass::Regular);

    // The client comes back holding R0001.
    let recovered = service
        .manual_override("intake-1", Step::One, "R0001", None)
        .unwrap();
    assert_eq!(recovered.id, issued.id);
    assert_eq!(
        (recovered.step(), recovered.status()),
        (Step::Two, Status::Waiting)
    );
    // The step-1 visit keeps the times recorded when the client went missing.
    assert_eq!(recovered.started_at_step1, absent.started_at_step1);
    assert_eq!(recovered.finished_at_step1, absent.finished_at_step1);
    assert!(recovered.started_at_step2.is_none());
    assert!(recovered.remarks.is_none());
    // Recovery does not hand the ticket to the teller.
    assert!(service.session("intake-1").current_ticket_id.is_none());

    // Unclassified tickets queue at step 2 under their intake type.
    claim(&service, "desk-1", Step::Two, GENERAL, PriorityClass::Regular);
    service.mark_no_show("desk-1", Step::Two).unwrap();

    // A different teller with no session recovers it by explicit type.
    let done = service
        .manual_override("desk-2", Step::Two, "1", Some(GENERAL))
        .unwrap();
    assert_eq!((done.step(), done.status()), (Step::Two, Status::Done));
    assert!(done.finished_at_step2.is_some());

    // Already done.
    let err = service
        .manual_override("desk-2", Step::Two, "1", Some(GENERAL))
        .unwrap_err();
    assert!(matches!(err, QueueError::Precondition(_)));

    // Wrong step.
    let err = service
        .manual_override("intake-1", Step::One, "1", Some(GENERAL))
        .unwrap_err();
    assert!(matches!(err, QueueError::NotFound(_)));
}

#[test]
fn test_priority_lanes_are_isolated() {
    let service = fixtures::service();
    let regular = service.create_ticket(GENERAL, false).unwrap();
    let priority = service.create_ticket(GENERAL, true).unwrap();
    assert_eq!(regular.display_code(), "R0001");
    assert_eq!(priority.display_code(), "P0002");

    let ticket = claim(&service, "p-desk", Step::One, GENERAL, PriorityClass::Priority);
    assert_eq!(ticket.id, priority.id);

    let ticket = claim(&service, "r-desk", Step::One, GENERAL, PriorityClass::Regular);
    assert_eq!(ticket.id, regular.id);

    service
        .complete_current("p-desk", Step::One, Some(GENERAL), None)
        .unwrap();
    assert_empty(&service, "p-desk", Step::One, GENERAL, PriorityClass::Priority);

    // Regular step-2 desk does not see the priority ticket.
    assert_empty(&service, "r2-desk", Step::Two, GENERAL, PriorityClass::Regular);
    let ticket = claim(&service, "p2-desk", Step::Two, GENERAL, PriorityClass::Priority);
    assert_eq!(ticket.id, priority.id);
}

#[test]
fn test_transaction_types_are_isolated() {
    let service = fixtures::service();
    service.create_ticket(PERMIT, false).unwrap();
    let cedula = service.create_ticket(CEDULA, false).unwrap();

    let ticket = claim(&service, "t1", Step::One, CEDULA, PriorityClass::Regular);
    assert_eq!(ticket.id, cedula.id);
    // Each type numbers from 1.
    assert_eq!(ticket.number, 1);
    assert_empty(&service, "t2", Step::One, CEDULA, PriorityClass::Regular);
}

#[test]
fn test_fifo_by_issue_time() {
    let service = fixtures::service();
    let first = service.create_ticket(GENERAL, false).unwrap();
    let second = service.create_ticket(GENERAL, false).unwrap();
    let third = service.create_ticket(GENERAL, false).unwrap();

    let a = claim(&service, "t1", Step::One, GENERAL, PriorityClass::Regular);
    let b = claim(&service, "t2", Step::One, GENERAL, PriorityClass::Regular);
    assert_eq!((a.id, b.id), (first.id, second.id));

    // Second finishes step 1 before first; step 2 still serves first first.
    service
        .complete_current("t2", Step::One, Some(GENERAL), None)
        .unwrap();
    service
        .complete_current("t1", Step::One, Some(GENERAL), None)
        .unwrap();

    let c = claim(&service, "t3", Step::One, GENERAL, PriorityClass::Regular);
    assert_eq!(c.id, third.id);

    let next = claim(&service, "desk-1", Step::Two, GENERAL, PriorityClass::Regular);
    assert_eq!(next.id, first.id);
    let next = claim(&service, "desk-2", Step::Two, GENERAL, PriorityClass::Regular);
    assert_eq!(next.id, second.id);
}

#[test]
fn test_empty_grab_changes_nothing() {
    let service = fixtures::service();
    assert_empty(&service, "t1", Step::One, GENERAL, PriorityClass::Regular);
    assert_empty(&service, "t1", Step::One, GENERAL, PriorityClass::Regular);
    assert_eq!(service.count_tickets(&TicketFilter::new()).unwrap(), 0);

    let waiting = service.create_ticket(PERMIT, false).unwrap();
    let before = service.get_ticket(waiting.id).unwrap();
    assert_empty(&service, "t1", Step::One, GENERAL, PriorityClass::Regular);
    assert_empty(&service, "t1", Step::Two, PERMIT, PriorityClass::Regular);

    let after = service.get_ticket(waiting.id).unwrap();
    assert_eq!(after, before);
}

#[test]
fn test_no_double_binding() {
    let service = fixtures::service();
    let first = service.create_ticket(GENERAL, false).unwrap();
    let second = service.create_ticket(GENERAL, false).unwrap();

    claim(&service, "t1", Step::One, GENERAL, PriorityClass::Regular);
    let err = service
        .grab_next("t1", Step::One, GENERAL, PriorityClass::Regular)
        .unwrap_err();
    assert!(matches!(err, QueueError::Precondition(_)));
    assert_eq!(
        service.get_ticket(second.id).unwrap().status(),
        Status::Waiting
    );

    // Reset forgets the session but the store still records t1 serving.
    service.reset_session("t1").unwrap();
    let session = service.session("t1");
    assert!(session.current_ticket_id.is_none());
    assert!(session.transaction_type_filter.is_none());
    assert_eq!(
        service.get_ticket(first.id).unwrap().served_by_step1.as_deref(),
        Some("t1")
    );

    let err = service
        .grab_next("t1", Step::One, GENERAL, PriorityClass::Regular)
        .unwrap_err();
    assert!(matches!(err, QueueError::Precondition(_)));
    assert_eq!(service.session("t1").current_ticket_id, Some(first.id));
    assert_eq!(
        service.get_ticket(second.id).unwrap().status(),
        Status::Waiting
    );
}

#[test]
fn test_one_ticket_per_teller_across_steps() {
    let service = fixtures::service();
    let first = service.create_ticket(GENERAL, false).unwrap();
    let second = service.create_ticket(GENERAL, false).unwrap();

    // Move the second ticket to step 2 through another teller.
    claim(&service, "intake-1", Step::One, GENERAL, PriorityClass::Regular);
    service
        .complete_current("intake-1", Step::One, Some(GENERAL), None)
        .unwrap();
    assert_eq!(service.get_ticket(first.id).unwrap().step(), Step::Two);

    // An administrator may act at either step, but serves one ticket at a time.
    let held = claim(&service, "admin", Step::One, GENERAL, PriorityClass::Regular);
    assert_eq!(held.id, second.id);
    let err = service
        .grab_next("admin", Step::Two, GENERAL, PriorityClass::Regular)
        .unwrap_err();
    assert!(matches!(err, QueueError::Precondition(_)));

    let waiting = service.get_ticket(first.id).unwrap();
    assert_eq!((waiting.step(), waiting.status()), (Step::Two, Status::Waiting));
    assert!(waiting.served_by_step2.is_none());

    let serving = service
        .list_tickets(&TicketFilter::new().with_status(Status::Serving))
        .unwrap();
    assert_eq!(serving.len(), 1);
    assert_eq!(serving[0].id, second.id);

    // Once the step-1 ticket is finished the same administrator can move on.
    service
        .complete_current("admin", Step::One, Some(GENERAL), None)
        .unwrap();
    let next = claim(&service, "admin", Step::Two, GENERAL, PriorityClass::Regular);
    assert_eq!(next.id, first.id);
}

#[test]
fn test_override_picks_absent_ticket_when_numbers_repeat_at_step_two() {
    let service = fixtures::service();

    // R0001 of the general queue is sent to the permit desk and goes missing.
    let absent = service.create_ticket(GENERAL, false).unwrap();
    claim(&service, "intake-1", Step::One, GENERAL, PriorityClass::Regular);
    service
        .complete_current("intake-1", Step::One, Some(PERMIT), None)
        .unwrap();
    claim(&service, "desk-1", Step::Two, PERMIT, PriorityClass::Regular);
    service.mark_no_show("desk-1", Step::Two).unwrap();

    // R0001 of the permit queue arrives at the same desk later.
    let waiting = service.create_ticket(PERMIT, false).unwrap();
    assert_eq!(waiting.display_code(), absent.display_code());
    claim(&service, "intake-2", Step::One, PERMIT, PriorityClass::Regular);
    service
        .complete_current("intake-2", Step::One, Some(PERMIT), None)
        .unwrap();

    let done = service
        .manual_override("desk-2", Step::Two, "R0001", Some(PERMIT))
        .unwrap();
    assert_eq!(done.id, absent.id);
    assert_eq!((done.step(), done.status()), (Step::Two, Status::Done));

    let untouched = service.get_ticket(waiting.id).unwrap();
    assert_eq!(
        (untouched.step(), untouched.status()),
        (Step::Two, Status::Waiting)
    );
}

#[test]
fn test_reset_then_complete_rebinds_stored_ticket() {
    let service = fixtures::service();
    let issued = service.create_ticket(GENERAL, true).unwrap();
    claim(&service, "t1", Step::One, GENERAL, PriorityClass::Priority);

    service.reset_session("t1").unwrap();
    let done = service
        .complete_current("t1", Step::One, Some(CEDULA), None)
        .unwrap();
    assert_eq!(done.id, issued.id);
    assert_eq!(done.classification, Some(CEDULA));
}

#[test]
fn test_teller_cannot_finish_anothers_ticket() {
    let service = fixtures::service();
    service.create_ticket(GENERAL, false).unwrap();
    claim(&service, "t1", Step::One, GENERAL, PriorityClass::Regular);

    let err = service.mark_no_show("t2", Step::One).unwrap_err();
    assert!(matches!(err, QueueError::Precondition(_)));
    // Nothing to do at the other step either.
    let err = service
        .complete_current("t1", Step::Two, None, None)
        .unwrap_err();
    assert!(matches!(err, QueueError::Precondition(_)));
}

#[test]
fn test_per_lane_numbering_and_override() {
    let service = fixtures::per_lane_service();
    let regular = service.create_ticket(GENERAL, false).unwrap();
    let priority = service.create_ticket(GENERAL, true).unwrap();
    assert_eq!(regular.display_code(), "R0001");
    assert_eq!(priority.display_code(), "P0001");

    claim(&service, "p-desk", Step::One, GENERAL, PriorityClass::Priority);
    service.mark_no_show("p-desk", Step::One).unwrap();

    // A teller with no lane selected has to type the prefix.
    let err = service
        .manual_override("other", Step::One, "1", Some(GENERAL))
        .unwrap_err();
    assert!(matches!(err, QueueError::Validation(_)));

    // The session's lane is used when the prefix is omitted.
    let recovered = service
        .manual_override("p-desk", Step::One, "0001", None)
        .unwrap();
    assert_eq!(recovered.id, priority.id);
    assert_eq!(
        service.get_ticket(regular.id).unwrap().status(),
        Status::Waiting
    );
}

#[test]
fn test_list_and_filter_tickets() {
    let service = fixtures::service();
    for _ in 0..3 {
        service.create_ticket(GENERAL, false).unwrap();
    }
    service.create_ticket(PERMIT, false).unwrap();
    claim(&service, "t1", Step::One, GENERAL, PriorityClass::Regular);

    let waiting = TicketFilter::new().with_status(Status::Waiting);
    assert_eq!(service.count_tickets(&waiting).unwrap(), 3);

    let general = TicketFilter::new()
        .with_transaction_type(GENERAL)
        .with_limit(2);
    let page = service.list_tickets(&general).unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(service.count_tickets(&general).unwrap(), 3);

    let types = service.transaction_types().unwrap();
    assert_eq!(types.len(), 3);
}
