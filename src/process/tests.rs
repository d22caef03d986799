#![cfg(test)]

use std::time::Duration;

use crate::config::GroupConfig;
use crate::error::CausalError;
use crate::events::EventKind;
use crate::process::core::{ArrivalOutcome, CausalProcess};
use crate::testing::{message, RecordingTransport};
use crate::time::VectorClock;
use crate::types::{MessageId, ProcessId};

// --- Test Utilities ---

const P0: ProcessId = ProcessId(0);
const P1: ProcessId = ProcessId(1);
const P2: ProcessId = ProcessId(2);

fn create_test_process(id: ProcessId, n: usize) -> CausalProcess<String> {
    CausalProcess::new(id, &GroupConfig::new(n)).unwrap()
}

fn vc(entries: &[u64]) -> VectorClock {
    VectorClock::from_entries(entries.to_vec())
}

fn mid(sender: ProcessId, seq: u64) -> MessageId {
    MessageId { sender, seq }
}

// --- Construction ---

#[test]
fn new_process_starts_with_zero_clock() {
    let p = create_test_process(P1, 3);
    assert_eq!(p.clock(), &vc(&[0, 0, 0]));
    assert_eq!(p.local_events(), 0);
    assert!(p.is_quiescent());
}

#[test]
fn new_rejects_id_outside_group() {
    let err = CausalProcess::<String>::new(ProcessId(3), &GroupConfig::new(3)).unwrap_err();
    assert_eq!(err, CausalError::InvalidProcessId { id: 3, num_processes: 3 });
}

// --- Send ---

#[test]
fn send_increments_own_entry_and_stamps_snapshot() {
    let mut p = create_test_process(P0, 3);
    let mut transport = RecordingTransport::new();

    let msg = p.send(&[P1, P2], "hello".to_string(), &mut transport).unwrap();

    assert_eq!(msg.snapshot(), &vc(&[1, 0, 0]));
    assert_eq!(msg.id(), mid(P0, 1));
    assert_eq!(p.clock(), &vc(&[1, 0, 0]));
    assert_eq!(transport.dispatched.len(), 2);
    assert!(transport.dispatched.iter().all(|d| d.delay == Duration::from_millis(10)));

    let events = p.take_events();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.kind == EventKind::Sent));
    assert_eq!(events[1].peer, P2);
}

#[test]
fn snapshot_is_unaffected_by_later_sends() {
    let mut p = create_test_process(P0, 2);
    let mut transport = RecordingTransport::new();
    let first = p.send(&[P1], "a".into(), &mut transport).unwrap();
    let _second = p.send(&[P1], "b".into(), &mut transport).unwrap();
    assert_eq!(first.snapshot(), &vc(&[1, 0]));
    assert_eq!(p.clock(), &vc(&[2, 0]));
}

#[test]
fn send_to_invalid_recipient_mutates_nothing() {
    let mut p = create_test_process(P0, 2);
    let mut transport = RecordingTransport::new();

    let err = p.send(&[P1, ProcessId(7)], "x".into(), &mut transport).unwrap_err();

    assert_eq!(err, CausalError::InvalidProcessId { id: 7, num_processes: 2 });
    assert_eq!(p.clock(), &vc(&[0, 0]));
    assert!(transport.dispatched.is_empty());
    assert!(p.take_events().is_empty());
}

#[test]
fn send_without_recipients_is_rejected() {
    let mut p = create_test_process(P0, 2);
    let mut transport = RecordingTransport::new();
    assert_eq!(p.send(&[], "x".into(), &mut transport), Err(CausalError::NoRecipients));
}

#[test]
fn send_with_delays_routes_each_recipient() {
    let mut p = create_test_process(P2, 3);
    let mut transport = RecordingTransport::new();
    let routes = [(P0, Duration::from_millis(50)), (P1, Duration::from_millis(1))];

    p.send_with_delays(&routes, "relay".into(), &mut transport).unwrap();

    let delays: Vec<_> = transport.dispatched.iter().map(|d| (d.recipient, d.delay)).collect();
    assert_eq!(delays, routes.to_vec());
}

#[test]
fn broadcast_skips_self() {
    let mut p = create_test_process(P1, 4);
    let mut transport = RecordingTransport::new();
    let msg = p.broadcast("hi".into(), &mut transport).unwrap();
    assert_eq!(msg.recipients(), &[ProcessId(0), ProcessId(2), ProcessId(3)]);
}

// --- Deliver ---

#[test]
fn in_order_arrival_is_delivered_and_merged() {
    let mut p1 = create_test_process(P1, 2);
    let arrival = p1.deliver_incoming(message(0, &[1], &[1, 0], "m".to_string())).unwrap();

    assert_eq!(arrival.outcome, ArrivalOutcome::Delivered);
    assert!(arrival.released.is_empty());
    assert_eq!(p1.clock(), &vc(&[1, 0]));
    assert_eq!(p1.local_events(), 1);
    assert_eq!(p1.history(), &[mid(P0, 1)]);

    let delivered = p1.take_delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].payload(), "m");
}

#[test]
fn gap_is_queued_without_clock_change() {
    let mut p1 = create_test_process(P1, 2);
    let arrival = p1.deliver_incoming(message(0, &[1], &[2, 0], "second".to_string())).unwrap();

    assert_eq!(arrival.outcome, ArrivalOutcome::Queued);
    assert_eq!(p1.clock(), &vc(&[0, 0]));
    assert_eq!(p1.pending().len(), 1);
    assert!(p1.take_delivered().is_empty());
    assert_eq!(p1.take_events()[0].kind, EventKind::Queued);
}

#[test]
fn predecessor_arrival_releases_queue() {
    let mut p1 = create_test_process(P1, 2);
    p1.deliver_incoming(message(0, &[1], &[2, 0], "second".to_string())).unwrap();
    let arrival = p1.deliver_incoming(message(0, &[1], &[1, 0], "first".to_string())).unwrap();

    assert_eq!(arrival.outcome, ArrivalOutcome::Delivered);
    assert_eq!(arrival.released, vec![mid(P0, 2)]);
    assert_eq!(p1.history(), &[mid(P0, 1), mid(P0, 2)]);
    assert_eq!(p1.clock(), &vc(&[2, 0]));
    assert!(p1.is_quiescent());

    let kinds: Vec<_> = p1.take_events().into_iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![EventKind::Queued, EventKind::Delivered, EventKind::DelayedDelivered]);
}

#[test]
fn repeated_arrival_is_duplicate() {
    let mut p1 = create_test_process(P1, 2);
    p1.deliver_incoming(message(0, &[1], &[1, 0], "m".to_string())).unwrap();
    let again = p1.deliver_incoming(message(0, &[1], &[1, 0], "m".to_string())).unwrap();
    assert_eq!(again.outcome, ArrivalOutcome::Duplicate);
    assert_eq!(p1.history().len(), 1);
}

#[test]
fn repeated_held_arrival_is_not_queued_twice() {
    let mut p1 = create_test_process(P1, 2);
    p1.deliver_incoming(message(0, &[1], &[3, 0], "m".to_string())).unwrap();
    let again = p1.deliver_incoming(message(0, &[1], &[3, 0], "m".to_string())).unwrap();
    assert_eq!(again.outcome, ArrivalOutcome::Duplicate);
    assert_eq!(p1.pending().len(), 1);
}

#[test]
fn out_of_range_sender_is_rejected() {
    let mut p1 = create_test_process(P1, 2);
    let err = p1.deliver_incoming(message(5, &[1], &[1, 0], "bad".to_string())).unwrap_err();
    assert_eq!(err, CausalError::InvalidProcessId { id: 5, num_processes: 2 });
    assert_eq!(p1.clock(), &vc(&[0, 0]));
    assert!(p1.pending().is_empty());
}

#[test]
fn wrong_width_snapshot_is_rejected_not_queued() {
    let mut p1 = create_test_process(P1, 3);
    let err = p1.deliver_incoming(message(0, &[1], &[1, 0], "bad".to_string())).unwrap_err();
    assert_eq!(err, CausalError::MalformedSnapshot { expected: 3, actual: 2 });
    assert!(p1.pending().is_empty());
    assert_eq!(p1.clock(), &vc(&[0, 0, 0]));
}

#[test]
fn misrouted_message_is_rejected() {
    let mut p1 = create_test_process(P1, 3);
    let err = p1.deliver_incoming(message(0, &[2], &[1, 0, 0], "x".to_string())).unwrap_err();
    assert_eq!(err, CausalError::NotARecipient { process: P1, message: mid(P0, 1) });
}

#[test]
fn full_pending_queue_reports_backpressure() {
    let config = GroupConfig::new(2).with_pending_capacity(1);
    let mut p1: CausalProcess<String> = CausalProcess::new(P1, &config).unwrap();
    p1.deliver_incoming(message(0, &[1], &[2, 0], "a".to_string())).unwrap();
    let err = p1.deliver_incoming(message(0, &[1], &[3, 0], "b".to_string())).unwrap_err();
    assert_eq!(err, CausalError::BackpressureExceeded { process: P1, capacity: 1 });
    assert_eq!(p1.pending().len(), 1);
}

#[test]
fn self_loop_is_delivered() {
    let mut p0 = create_test_process(P0, 2);
    let mut transport = RecordingTransport::new();
    p0.send(&[P0, P1], "me too".into(), &mut transport).unwrap();
    let mine = transport.take_for(P0);
    let arrival = p0.deliver_incoming(mine[0].clone()).unwrap();
    assert_eq!(arrival.outcome, ArrivalOutcome::Delivered);
    assert_eq!(p0.clock(), &vc(&[1, 0]));
}

#[test]
fn repeated_self_loop_is_delivered_once() {
    let mut p0 = create_test_process(P0, 2);
    let mut transport = RecordingTransport::new();
    p0.send(&[P0, P1], "me too".into(), &mut transport).unwrap();
    let mine = transport.take_for(P0);

    p0.deliver_incoming(mine[0].clone()).unwrap();
    let again = p0.deliver_incoming(mine[0].clone()).unwrap();

    assert_eq!(again.outcome, ArrivalOutcome::Duplicate);
    assert_eq!(p0.history(), &[mid(P0, 1)]);
    assert_eq!(p0.local_events(), 2);
}

#[test]
fn inflated_self_loop_cannot_lift_foreign_entries() {
    let mut p0 = create_test_process(P0, 3);
    let forged = p0.deliver_incoming(message(0, &[0], &[0, 5, 0], "forged".to_string())).unwrap();
    assert_eq!(forged.outcome, ArrivalOutcome::Queued);
    assert_eq!(p0.clock(), &vc(&[0, 0, 0]));

    // The genuine first message from P1 is still accepted.
    let genuine = p0.deliver_incoming(message(1, &[0], &[0, 1, 0], "real".to_string())).unwrap();
    assert_eq!(genuine.outcome, ArrivalOutcome::Delivered);
    assert_eq!(p0.clock(), &vc(&[0, 1, 0]));
    assert_eq!(p0.pending().len(), 1);
}

// --- Counters ---

#[test]
fn own_entry_counts_sends_and_local_events_count_everything() {
    let mut p0 = create_test_process(P0, 2);
    let mut p1 = create_test_process(P1, 2);
    let mut transport = RecordingTransport::new();

    p1.send(&[P0], "x".into(), &mut transport).unwrap();
    for m in transport.take_for(P0) {
        p0.deliver_incoming(m).unwrap();
    }
    p0.send(&[P1], "y".into(), &mut transport).unwrap();
    p0.send(&[P1], "z".into(), &mut transport).unwrap();

    assert_eq!(p0.clock().get(P0), 2);
    assert_eq!(p0.local_events(), 3);
    assert_eq!(p0.clock(), &vc(&[2, 1]));
}

#[test]
fn summary_reflects_state() {
    let mut p1 = create_test_process(P1, 2);
    p1.deliver_incoming(message(0, &[1], &[1, 0], "a".to_string())).unwrap();
    p1.deliver_incoming(message(0, &[1], &[3, 0], "c".to_string())).unwrap();
    let summary = p1.summary();
    assert_eq!(summary.id, P1);
    assert_eq!(summary.clock, vc(&[1, 0]));
    assert_eq!(summary.delivered, vec![mid(P0, 1)]);
    assert_eq!(summary.pending, 1);
}
