//! # CCM Tests
//!
//! Packet transforms through a full system. Real-crypto round trips cover the data path;
//! the mocked provider pins down exactly what reaches the primitives (masked header,
//! `no_mac`) and proves the degenerate paths never call them.

use crate::common::harness::TestSystem;
use crate::common::mocks::crypto::MockedCrypto;
use pretty_assertions::assert_eq;
use rstest::rstest;
use socsec_core::common::SimError;
use socsec_core::config::Config;
use socsec_core::crypto::{Decrypted, Key, Nonce, PLACEHOLDER_TAG};
use socsec_core::soc::Task;
use socsec_core::soc::devices::ccm::{CcmMode, MacLength, MacStatus, Protocol};
use socsec_core::soc::devices::{ErrorStatus, EventKind, Unit};
use socsec_core::soc::dma::Direction;

const KEY: Key = [
    0x99, 0xad, 0x1b, 0x52, 0x26, 0xa3, 0x7e, 0x3e, 0x05, 0x8e, 0x3b, 0x8e, 0x27, 0xc2, 0xc6,
    0x66,
];
const NONCE: Nonce = [
    0x48, 0x0c, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xef, 0xbe, 0xad, 0xde,
];
const MESSAGE: &[u8] = b"sixteen byte msg";

/// One packet's worth of input and the buffers its output lands in.
struct Packet {
    len: u32,
    adata: u32,
    payload: u32,
}

fn configure(ts: &mut TestSystem, mode: CcmMode, protocol: Protocol, mac: MacLength) {
    let ccm = ts.system_mut().ccm_mut(0).unwrap();
    ccm.set_enabled(true);
    ccm.set_key(KEY);
    ccm.set_nonce(NONCE);
    ccm.set_mode(mode);
    ccm.set_protocol(protocol);
    ccm.set_mac_length(mac);
}

/// Lays out `adata` and `message` with their length headers and an output list sized for
/// `out_len` payload bytes.
fn load(ts: &mut TestSystem, adata: &[u8], message: &[u8], out_len: usize) -> Packet {
    let a_len = (adata.len() as u16).to_le_bytes();
    let m_len = (message.len() as u16).to_le_bytes();
    let in_ptr = ts.input_list(&[(&a_len, 0), (&m_len, 0), (adata, 1), (message, 2)]);
    let (out_ptr, buffers) = ts.output_list(&[(2, 0), (adata.len(), 1), (out_len, 2)]);
    let ccm = ts.system_mut().ccm_mut(0).unwrap();
    ccm.set_in_ptr(in_ptr);
    ccm.set_out_ptr(out_ptr);
    Packet {
        len: buffers[0],
        adata: buffers[1],
        payload: buffers[2],
    }
}

fn start(ts: &mut TestSystem) {
    ts.system_mut().trigger(Task::start(Unit::Ccm, 0)).unwrap();
}

fn flags(ts: &TestSystem) -> (bool, bool) {
    let regs = ts.system().ccm(0).unwrap().events.regs;
    (regs.is_set(EventKind::End), regs.is_set(EventKind::Error))
}

fn read_len(ts: &mut TestSystem, packet: &Packet) -> u16 {
    let raw = ts.read(packet.len, 2);
    u16::from_le_bytes([raw[0], raw[1]])
}

#[test]
fn test_aes_round_trip() {
    let mut ts = TestSystem::new();
    let header = [0xFFu8];

    configure(&mut ts, CcmMode::Encryption, Protocol::Ble, MacLength::M4);
    let sealed = load(&mut ts, &header, MESSAGE, MESSAGE.len() + 4);
    start(&mut ts);
    assert_eq!(flags(&ts), (true, false));
    assert_eq!(read_len(&mut ts, &sealed), 20);
    assert_eq!(ts.read(sealed.adata, 1), vec![0xFF]);
    let ciphertext = ts.read(sealed.payload, 20);
    let expected = ts
        .system()
        .crypto()
        .ccm_encrypt(&[0xFF & 0xE3], MESSAGE, &KEY, &NONCE, 4);
    assert_eq!(ciphertext, expected);

    ts.system_mut().events_mut(Unit::Ccm, 0).unwrap().regs.clear(EventKind::End);
    configure(&mut ts, CcmMode::Decryption, Protocol::Ble, MacLength::M4);
    let opened = load(&mut ts, &header, &ciphertext, MESSAGE.len());
    start(&mut ts);
    assert_eq!(flags(&ts), (true, false));
    assert_eq!(read_len(&mut ts, &opened), 16);
    assert_eq!(ts.read(opened.payload, 16), MESSAGE.to_vec());
    assert_eq!(
        ts.system().ccm(0).unwrap().mac_status(),
        MacStatus::CheckPassed
    );
}

#[test]
fn test_tampered_packet_fails_mac_check() {
    let mut ts = TestSystem::new();
    let sealed = ts
        .system()
        .crypto()
        .ccm_encrypt(&[0x02], MESSAGE, &KEY, &NONCE, 8);
    let mut tampered = sealed.clone();
    tampered[3] ^= 0x01;

    configure(&mut ts, CcmMode::Decryption, Protocol::Ieee802154, MacLength::M8);
    let _ = load(&mut ts, &[0x02], &tampered, MESSAGE.len());
    start(&mut ts);
    let ccm = ts.system().ccm(0).unwrap();
    assert_eq!(ccm.mac_status(), MacStatus::CheckFailed);
    assert_eq!(ccm.error_status(), ErrorStatus::NoError);
    assert_eq!(flags(&ts), (true, false));
}

#[test]
fn test_passthrough_appends_placeholder_tag() {
    let mut ts = TestSystem::passthrough();
    configure(&mut ts, CcmMode::Encryption, Protocol::Ble, MacLength::M6);
    let packet = load(&mut ts, &[0x01], MESSAGE, MESSAGE.len() + 6);
    start(&mut ts);

    let mut expected = MESSAGE.to_vec();
    expected.extend(PLACEHOLDER_TAG.iter().cycle().take(6));
    assert_eq!(read_len(&mut ts, &packet), 22);
    assert_eq!(ts.read(packet.payload, 22), expected);
}

#[test]
fn test_passthrough_round_trip() {
    let mut ts = TestSystem::passthrough();
    configure(&mut ts, CcmMode::Encryption, Protocol::Ieee802154, MacLength::M16);
    let sealed = load(&mut ts, &[0x07, 0x08], MESSAGE, MESSAGE.len() + 16);
    start(&mut ts);
    let ciphertext = ts.read(sealed.payload, MESSAGE.len() + 16);

    configure(&mut ts, CcmMode::Decryption, Protocol::Ieee802154, MacLength::M16);
    let opened = load(&mut ts, &[0x07, 0x08], &ciphertext, MESSAGE.len());
    start(&mut ts);
    assert_eq!(read_len(&mut ts, &opened), 16);
    assert_eq!(ts.read(opened.adata, 2), vec![0x07, 0x08]);
    assert_eq!(ts.read(opened.payload, 16), MESSAGE.to_vec());
    assert_eq!(
        ts.system().ccm(0).unwrap().mac_status(),
        MacStatus::CheckPassed
    );
}

#[rstest]
#[case::ble_encrypt_empty(Protocol::Ble, CcmMode::Encryption, &[], EventKind::End)]
#[case::ble_decrypt_empty(Protocol::Ble, CcmMode::Decryption, &[], EventKind::Error)]
#[case::ble_encrypt_header_only(Protocol::Ble, CcmMode::Encryption, &[1, 2, 3], EventKind::End)]
#[case::ble_decrypt_header_only(Protocol::Ble, CcmMode::Decryption, &[1, 2, 3], EventKind::Error)]
#[case::ieee_encrypt_empty(Protocol::Ieee802154, CcmMode::Encryption, &[], EventKind::End)]
#[case::ieee_decrypt_empty(Protocol::Ieee802154, CcmMode::Decryption, &[], EventKind::Error)]
fn test_degenerate_packet_skips_crypto(
    #[case] protocol: Protocol,
    #[case] mode: CcmMode,
    #[case] adata: &[u8],
    #[case] event: EventKind,
) {
    let mut ts = TestSystem::with_crypto(&Config::default(), Box::new(MockedCrypto::strict()));
    configure(&mut ts, mode, protocol, MacLength::M4);
    let packet = load(&mut ts, adata, &[], 4);
    start(&mut ts);

    let regs = ts.system().ccm(0).unwrap().events.regs;
    assert!(regs.is_set(event));
    assert_eq!(regs.flags(), event.bit());
    assert_eq!(read_len(&mut ts, &packet), 0);
}

#[rstest]
#[case::ble(Protocol::Ble, true)]
#[case::ieee(Protocol::Ieee802154, false)]
fn test_packet_shorter_than_mac(#[case] protocol: Protocol, #[case] error: bool) {
    let mut ops = MockedCrypto::strict();
    let _ = ops.0.expect_ccm_decrypt().never();
    let mut ts = TestSystem::with_crypto(&Config::default(), Box::new(ops));
    configure(&mut ts, CcmMode::Decryption, protocol, MacLength::M4);
    let _ = load(&mut ts, &[0x01], &[0xAA, 0xBB, 0xCC], 0);
    start(&mut ts);

    assert_eq!(flags(&ts), (true, error));
    assert_eq!(
        ts.system().ccm(0).unwrap().mac_status(),
        MacStatus::CheckFailed
    );
}

#[test]
fn test_adata_mask_applies_to_crypto_input_only() {
    let mut ops = MockedCrypto::strict();
    let _ = ops
        .0
        .expect_ccm_encrypt()
        .withf(|adata, payload, _, _, mac_len| {
            adata.to_vec() == vec![0xE3, 0x55] && payload.to_vec() == b"abc".to_vec() && *mac_len == 4
        })
        .times(1)
        .returning(|_, payload, _, _, _| {
            let mut out = payload.to_vec();
            out.extend([0x11; 4]);
            out
        });
    let mut ts = TestSystem::with_crypto(&Config::default(), Box::new(ops));
    configure(&mut ts, CcmMode::Encryption, Protocol::Ble, MacLength::M4);
    let packet = load(&mut ts, &[0xFF, 0x55], b"abc", 7);
    start(&mut ts);

    assert_eq!(ts.read(packet.adata, 2), vec![0xFF, 0x55]);
    assert_eq!(
        ts.read(packet.payload, 7),
        vec![b'a', b'b', b'c', 0x11, 0x11, 0x11, 0x11]
    );
}

#[test]
fn test_custom_adata_mask() {
    let mut ops = MockedCrypto::strict();
    let _ = ops
        .0
        .expect_ccm_encrypt()
        .withf(|adata, _, _, _, _| adata.to_vec() == vec![0x0F])
        .times(1)
        .returning(|_, payload, _, _, _| payload.to_vec());
    let mut ts = TestSystem::with_crypto(&Config::default(), Box::new(ops));
    configure(&mut ts, CcmMode::Encryption, Protocol::Ble, MacLength::M0);
    ts.system_mut().ccm_mut(0).unwrap().set_adata_mask(0x0F);
    let _ = load(&mut ts, &[0xFF], b"x", 1);
    start(&mut ts);
    assert_eq!(flags(&ts), (true, false));
}

#[test]
fn test_zero_mac_decrypt_requests_no_mac() {
    let mut ops = MockedCrypto::strict();
    let _ = ops
        .0
        .expect_ccm_decrypt()
        .withf(|_, _, _, _, mac_len, no_mac| *mac_len == 0 && *no_mac)
        .times(1)
        .returning(|_, payload, _, _, _, _| Decrypted {
            plaintext: payload.to_vec(),
            mac_error: false,
        });
    let mut ts = TestSystem::with_crypto(&Config::default(), Box::new(ops));
    configure(&mut ts, CcmMode::Decryption, Protocol::Ble, MacLength::M0);
    let packet = load(&mut ts, &[0x01], b"plain", 5);
    start(&mut ts);

    assert_eq!(read_len(&mut ts, &packet), 5);
    assert_eq!(ts.read(packet.payload, 5), b"plain".to_vec());
    assert_eq!(
        ts.system().ccm(0).unwrap().mac_status(),
        MacStatus::CheckPassed
    );
}

#[test]
fn test_truncated_adata_is_premature_input_end() {
    let mut ts = TestSystem::new();
    configure(&mut ts, CcmMode::Encryption, Protocol::Ble, MacLength::M4);
    let a_len = 8u16.to_le_bytes();
    let m_len = 4u16.to_le_bytes();
    let in_ptr = ts.input_list(&[(&a_len, 0), (&m_len, 0), (&[1, 2, 3, 4], 1)]);
    let (out_ptr, _) = ts.output_list(&[(2, 0), (8, 1), (8, 2)]);
    let ccm = ts.system_mut().ccm_mut(0).unwrap();
    ccm.set_in_ptr(in_ptr);
    ccm.set_out_ptr(out_ptr);
    start(&mut ts);

    assert_eq!(
        ts.system().ccm(0).unwrap().error_status(),
        ErrorStatus::PrematureInptrEnd
    );
    assert_eq!(flags(&ts), (false, true));
}

#[test]
fn test_missing_output_is_premature_output_end() {
    let mut ts = TestSystem::new();
    configure(&mut ts, CcmMode::Encryption, Protocol::Ble, MacLength::M4);
    let _ = load(&mut ts, &[0x01], MESSAGE, 20);
    let empty = ts.job_list(&[]);
    ts.system_mut().ccm_mut(0).unwrap().set_out_ptr(empty);
    start(&mut ts);

    assert_eq!(
        ts.system().ccm(0).unwrap().error_status(),
        ErrorStatus::PrematureOutptrEnd
    );
    assert_eq!(flags(&ts), (false, true));
}

#[test]
fn test_invalid_mac_length_encoding() {
    let mut ts = TestSystem::new();
    let ccm = ts.system_mut().ccm_mut(0).unwrap();
    assert!(ccm.set_mac_length_encoding(3).is_ok());
    assert_eq!(ccm.mac_length(), MacLength::M8);
    assert!(matches!(
        ccm.set_mac_length_encoding(8),
        Err(SimError::InvalidMacLength(8))
    ));
    assert_eq!(ccm.mac_length(), MacLength::M8);
}

#[test]
fn test_null_output_list_is_fatal() {
    let mut ts = TestSystem::new();
    configure(&mut ts, CcmMode::Encryption, Protocol::Ble, MacLength::M4);
    let _ = load(&mut ts, &[0x01], MESSAGE, 20);
    ts.system_mut().ccm_mut(0).unwrap().set_out_ptr(0);
    assert!(matches!(
        ts.system_mut().trigger(Task::start(Unit::Ccm, 0)),
        Err(SimError::NullJobList {
            unit: Unit::Ccm,
            direction: Direction::Write,
            ..
        })
    ));
}

#[test]
fn test_disabled_ccm_ignores_start() {
    let mut ts = TestSystem::with_crypto(&Config::default(), Box::new(MockedCrypto::strict()));
    configure(&mut ts, CcmMode::Encryption, Protocol::Ble, MacLength::M4);
    let _ = load(&mut ts, &[0x01], MESSAGE, 20);
    ts.system_mut().ccm_mut(0).unwrap().set_enabled(false);
    start(&mut ts);
    assert_eq!(flags(&ts), (false, false));
}
