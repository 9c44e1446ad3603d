//! # AAR Tests
//!
//! Address resolution against real AES: the Bluetooth `ah` sample vector, match indexing,
//! the cycle-based duration and the premature-end paths.

use crate::common::harness::TestSystem;
use pretty_assertions::assert_eq;
use socsec_core::crypto::Key;
use socsec_core::soc::Task;
use socsec_core::soc::devices::aar::address_hash;
use socsec_core::soc::devices::{ErrorStatus, EventKind, Unit};

/// Bluetooth Core sample IRK, most significant byte first.
const SAMPLE_IRK: Key = [
    0xec, 0x02, 0x34, 0xa3, 0x57, 0xc8, 0xad, 0x05, 0x34, 0x10, 0x10, 0xa6, 0x0a, 0x39, 0x7d,
    0x9b,
];
/// Sample prand 0x708194 as stored in memory.
const SAMPLE_PRAND: [u8; 3] = [0x94, 0x81, 0x70];
/// Sample hash 0x0dfbaa as stored in memory.
const SAMPLE_HASH: [u8; 3] = [0xaa, 0xfb, 0x0d];

fn irk(seed: u8) -> Key {
    [seed; 16]
}

/// Programs AAR 0 and returns the addresses of `slots` 2-byte output buffers.
fn program(
    ts: &mut TestSystem,
    hash: &[u8],
    prand: &[u8],
    irks: &[Key],
    slots: usize,
) -> Vec<u32> {
    let mut fields: Vec<(&[u8], u8)> = vec![(hash, 0), (prand, 0)];
    fields.extend(irks.iter().map(|k| (&k[..], 1)));
    let in_ptr = ts.input_list(&fields);
    let (out_ptr, buffers) = ts.output_list(&vec![(2usize, 0u8); slots]);
    let aar = ts.system_mut().aar_mut(0).unwrap();
    aar.set_enabled(true);
    aar.set_in_ptr(in_ptr);
    aar.set_out_ptr(out_ptr);
    buffers
}

fn start(ts: &mut TestSystem) {
    ts.system_mut().trigger(Task::start(Unit::Aar, 0)).unwrap();
}

fn is_set(ts: &TestSystem, event: EventKind) -> bool {
    ts.system().aar(0).unwrap().events.regs.is_set(event)
}

#[test]
fn test_sample_address_hash() {
    let ts = TestSystem::new();
    assert_eq!(
        address_hash(ts.system().crypto(), &SAMPLE_IRK, &SAMPLE_PRAND),
        SAMPLE_HASH
    );
}

#[test]
fn test_resolves_sample_address() {
    let mut ts = TestSystem::new();
    let out = program(
        &mut ts,
        &SAMPLE_HASH,
        &SAMPLE_PRAND,
        &[irk(1), SAMPLE_IRK, irk(3)],
        1,
    );
    start(&mut ts);

    let aar = ts.system().aar(0).unwrap();
    assert!(aar.is_running());
    assert_eq!(aar.resolved(), 1);
    assert_eq!(aar.checked(), 2);
    assert!(!is_set(&ts, EventKind::Resolved));
    assert_eq!(ts.read(out[0], 2), vec![1, 0]);

    // 4 setup + 2 * 24 per key + 2 per match = 54 cycles at 16 MHz.
    assert_eq!(ts.sim.step().unwrap(), Some(4));
    assert!(is_set(&ts, EventKind::Resolved));
    assert!(is_set(&ts, EventKind::End));
    assert!(!is_set(&ts, EventKind::NotResolved));
    assert!(!ts.system().aar(0).unwrap().is_running());
}

#[test]
fn test_unmatched_list_reports_not_resolved() {
    let mut ts = TestSystem::new();
    let _ = program(
        &mut ts,
        &SAMPLE_HASH,
        &SAMPLE_PRAND,
        &[irk(1), irk(2), irk(3)],
        1,
    );
    start(&mut ts);
    assert_eq!(ts.system().aar(0).unwrap().checked(), 3);

    // 4 + 3 * 24 = 76 cycles.
    assert_eq!(ts.sim.step().unwrap(), Some(5));
    assert!(is_set(&ts, EventKind::NotResolved));
    assert!(is_set(&ts, EventKind::End));
    assert!(!is_set(&ts, EventKind::Resolved));
}

#[test]
fn test_empty_irk_list() {
    let mut ts = TestSystem::new();
    let out = program(&mut ts, &SAMPLE_HASH, &SAMPLE_PRAND, &[], 1);
    start(&mut ts);
    assert_eq!(ts.system().aar(0).unwrap().checked(), 0);
    assert_eq!(ts.sim.step().unwrap(), Some(1));
    assert!(is_set(&ts, EventKind::NotResolved));
    assert!(is_set(&ts, EventKind::End));
    assert_eq!(ts.read(out[0], 2), vec![0, 0]);
}

#[test]
fn test_multiple_matches_up_to_limit() {
    let mut ts = TestSystem::new();
    let out = program(
        &mut ts,
        &SAMPLE_HASH,
        &SAMPLE_PRAND,
        &[SAMPLE_IRK, irk(7), SAMPLE_IRK, SAMPLE_IRK],
        2,
    );
    ts.system_mut().aar_mut(0).unwrap().set_max_resolved(2);
    start(&mut ts);

    let aar = ts.system().aar(0).unwrap();
    assert_eq!(aar.resolved(), 2);
    assert_eq!(aar.checked(), 3);
    assert_eq!(ts.read(out[0], 2), vec![0, 0]);
    assert_eq!(ts.read(out[1], 2), vec![2, 0]);
}

#[test]
fn test_non_resolvable_prand_still_resolves() {
    let mut ts = TestSystem::new();
    let prand = [0x01, 0x02, 0xC3];
    let key = irk(9);
    let hash = address_hash(ts.system().crypto(), &key, &prand);
    let out = program(&mut ts, &hash, &prand, &[key], 1);
    start(&mut ts);
    assert_eq!(ts.system().aar(0).unwrap().resolved(), 1);
    assert_eq!(ts.read(out[0], 2), vec![0, 0]);
}

#[test]
fn test_latency_override_scales_with_keys_checked() {
    let mut ts = TestSystem::new();
    let _ = program(
        &mut ts,
        &SAMPLE_HASH,
        &SAMPLE_PRAND,
        &[irk(1), irk(2)],
        1,
    );
    ts.system_mut().set_block_latency_override(3);
    start(&mut ts);
    assert_eq!(ts.sim.next_wake(), Some(6));
}

#[test]
fn test_short_hash_is_premature_input_end() {
    let mut ts = TestSystem::new();
    let _ = program(&mut ts, &SAMPLE_HASH[..2], &[], &[], 1);
    start(&mut ts);

    let aar = ts.system().aar(0).unwrap();
    assert_eq!(aar.error_status(), ErrorStatus::PrematureInptrEnd);
    assert!(!aar.is_running());
    assert!(is_set(&ts, EventKind::Error));
    assert_eq!(ts.sim.next_wake(), None);
}

#[test]
fn test_missing_result_slot_is_premature_output_end() {
    let mut ts = TestSystem::new();
    let _ = program(&mut ts, &SAMPLE_HASH, &SAMPLE_PRAND, &[SAMPLE_IRK], 0);
    start(&mut ts);

    let aar = ts.system().aar(0).unwrap();
    assert_eq!(aar.error_status(), ErrorStatus::PrematureOutptrEnd);
    assert!(is_set(&ts, EventKind::Error));
    assert_eq!(ts.sim.next_wake(), None);
}

#[test]
fn test_stop_cancels_resolution() {
    let mut ts = TestSystem::new();
    let _ = program(&mut ts, &SAMPLE_HASH, &SAMPLE_PRAND, &[SAMPLE_IRK], 1);
    start(&mut ts);
    ts.system_mut().trigger(Task::stop(Unit::Aar, 0)).unwrap();

    let aar = ts.system().aar(0).unwrap();
    assert_eq!(aar.error_status(), ErrorStatus::Aborted);
    assert!(is_set(&ts, EventKind::Error));
    assert_eq!(ts.sim.step().unwrap(), None);
    assert!(!is_set(&ts, EventKind::Resolved));
    assert!(!is_set(&ts, EventKind::End));
}

#[test]
fn test_start_while_running_is_ignored() {
    let mut ts = TestSystem::new();
    let _ = program(&mut ts, &SAMPLE_HASH, &SAMPLE_PRAND, &[SAMPLE_IRK], 1);
    start(&mut ts);
    let wake = ts.sim.next_wake();
    start(&mut ts);
    assert_eq!(ts.sim.next_wake(), wake);
    assert_eq!(ts.system().aar(0).unwrap().events.regs.flags(), 0);
}
