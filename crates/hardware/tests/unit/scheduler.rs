//! # Scheduler Tests

use pretty_assertions::assert_eq;
use socsec_core::sim::Scheduler;

#[test]
fn test_next_wake_tracks_minimum() {
    let mut sched = Scheduler::new(4);
    assert_eq!(sched.next_wake(), None);

    sched.set(2, Some(30));
    sched.set(0, Some(10));
    sched.set(3, Some(20));
    assert_eq!(sched.next_wake(), Some(10));

    sched.set(0, None);
    assert_eq!(sched.next_wake(), Some(20));

    sched.set(3, Some(50));
    assert_eq!(sched.next_wake(), Some(30));
}

#[test]
fn test_due_returns_slots_in_ascending_order() {
    let mut sched = Scheduler::new(4);
    sched.set(3, Some(5));
    sched.set(1, Some(5));
    sched.set(2, Some(9));
    assert_eq!(sched.due(4), Vec::<usize>::new());
    assert_eq!(sched.due(5), vec![1, 3]);
    assert_eq!(sched.due(9), vec![1, 2, 3]);
}

#[test]
fn test_cancelled_slot_is_never_due() {
    let mut sched = Scheduler::new(2);
    sched.set(0, Some(1));
    sched.set(0, None);
    assert_eq!(sched.get(0), None);
    assert_eq!(sched.due(100), Vec::<usize>::new());
}

#[test]
fn test_unknown_slot_is_ignored() {
    let mut sched = Scheduler::new(1);
    sched.set(7, Some(1));
    assert_eq!(sched.next_wake(), None);
    assert_eq!(sched.len(), 1);
}
