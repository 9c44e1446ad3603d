//! CCM authenticated encryption engine.
//!
//! The engine completes synchronously inside START. It consumes four fields from the input
//! job list, each as its own job:
//! 1. **`a_len`:** 2-byte little-endian associated-data length.
//! 2. **`m_len`:** 2-byte little-endian message length.
//! 3. **Associated data:** `a_len` bytes; the first byte is masked before authentication.
//! 4. **Message:** `m_len` bytes of plaintext, or ciphertext followed by the MAC.
//!
//! The output job list receives the 2-byte output length, the associated data (unmasked) and
//! the processed message, again one job per field.

use super::{
    DeviceContext, ErrorStatus, EventKind, EventPort, Signal, Unit, open_job_list, read_field,
    write_field,
};
use crate::common::SimError;
use crate::crypto::{BLOCK_SIZE, Key, NONCE_SIZE, Nonce};
use crate::soc::dma::Direction;

/// Mask applied to the first associated-data byte by default (BLE header bits NESN, SN, MD).
pub const DEFAULT_ADATA_MASK: u8 = 0xE3;

/// Direction of the transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CcmMode {
    /// Plaintext in, ciphertext and MAC out.
    #[default]
    Encryption,
    /// Ciphertext and MAC in, plaintext out.
    Decryption,
}

/// Packet format profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    /// Bluetooth LE: an empty payload is never processed and short packets raise ERROR.
    #[default]
    Ble,
    /// IEEE 802.15.4.
    Ieee802154,
}

/// Result of the last MAC check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MacStatus {
    /// The MAC did not match or the packet was too short to carry one.
    #[default]
    CheckFailed,
    /// The MAC matched.
    CheckPassed,
}

/// Supported MAC lengths, in register encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MacLength {
    /// No MAC (encryption only).
    M0,
    /// 4-byte MAC.
    #[default]
    M4,
    /// 6-byte MAC.
    M6,
    /// 8-byte MAC.
    M8,
    /// 10-byte MAC.
    M10,
    /// 12-byte MAC.
    M12,
    /// 14-byte MAC.
    M14,
    /// 16-byte MAC.
    M16,
}

impl MacLength {
    /// Decodes the MAC-length register field.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidMacLength`] for encodings above 7.
    pub fn from_encoding(encoding: u32) -> Result<Self, SimError> {
        Ok(match encoding {
            0 => Self::M0,
            1 => Self::M4,
            2 => Self::M6,
            3 => Self::M8,
            4 => Self::M10,
            5 => Self::M12,
            6 => Self::M14,
            7 => Self::M16,
            other => return Err(SimError::InvalidMacLength(other)),
        })
    }

    /// MAC size in bytes.
    pub const fn bytes(self) -> usize {
        match self {
            Self::M0 => 0,
            Self::M4 => 4,
            Self::M6 => 6,
            Self::M8 => 8,
            Self::M10 => 10,
            Self::M12 => 12,
            Self::M14 => 14,
            Self::M16 => 16,
        }
    }
}

/// One CCM instance.
#[derive(Debug, Clone)]
pub struct Ccm {
    instance: usize,
    enabled: bool,
    key: Key,
    nonce: Nonce,
    mode: CcmMode,
    protocol: Protocol,
    mac_len: MacLength,
    adata_mask: u8,
    in_ptr: u32,
    out_ptr: u32,
    error_status: ErrorStatus,
    mac_status: MacStatus,
    /// Event flags and interrupt enables.
    pub events: EventPort,
}

impl Ccm {
    /// Creates a disabled instance: BLE profile, encryption, 4-byte MAC, default mask.
    pub const fn new(instance: usize) -> Self {
        Self {
            instance,
            enabled: false,
            key: [0; BLOCK_SIZE],
            nonce: [0; NONCE_SIZE],
            mode: CcmMode::Encryption,
            protocol: Protocol::Ble,
            mac_len: MacLength::M4,
            adata_mask: DEFAULT_ADATA_MASK,
            in_ptr: 0,
            out_ptr: 0,
            error_status: ErrorStatus::NoError,
            mac_status: MacStatus::CheckFailed,
            events: EventPort::new(Unit::Ccm, instance),
        }
    }

    /// Hardware index.
    pub const fn instance(&self) -> usize {
        self.instance
    }

    /// Writes the enable register.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Returns whether the unit accepts tasks.
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Programs the 128-bit key.
    pub fn set_key(&mut self, key: Key) {
        self.key = key;
    }

    /// Programs the 13-byte nonce.
    pub fn set_nonce(&mut self, nonce: Nonce) {
        self.nonce = nonce;
    }

    /// Selects encryption or decryption.
    pub fn set_mode(&mut self, mode: CcmMode) {
        self.mode = mode;
    }

    /// Current mode.
    pub const fn mode(&self) -> CcmMode {
        self.mode
    }

    /// Selects the packet format profile.
    pub fn set_protocol(&mut self, protocol: Protocol) {
        self.protocol = protocol;
    }

    /// Programs the MAC length.
    pub fn set_mac_length(&mut self, mac_len: MacLength) {
        self.mac_len = mac_len;
    }

    /// Programs the MAC length from its register encoding.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidMacLength`] for encodings above 7; the register keeps its
    /// previous value.
    pub fn set_mac_length_encoding(&mut self, encoding: u32) -> Result<(), SimError> {
        match MacLength::from_encoding(encoding) {
            Ok(mac_len) => {
                self.mac_len = mac_len;
                Ok(())
            }
            Err(err) => {
                tracing::error!(instance = self.instance, encoding, "invalid CCM MAC length");
                Err(err)
            }
        }
    }

    /// Programmed MAC length.
    pub const fn mac_length(&self) -> MacLength {
        self.mac_len
    }

    /// Programs the mask ANDed into the first associated-data byte.
    pub fn set_adata_mask(&mut self, mask: u8) {
        self.adata_mask = mask;
    }

    /// Programs the input job-list pointer.
    pub fn set_in_ptr(&mut self, ptr: u32) {
        self.in_ptr = ptr;
    }

    /// Programs the output job-list pointer.
    pub fn set_out_ptr(&mut self, ptr: u32) {
        self.out_ptr = ptr;
    }

    /// Returns `true` once both job-list pointers are programmed.
    pub const fn has_job_lists(&self) -> bool {
        self.in_ptr != 0 && self.out_ptr != 0
    }

    /// Error status register.
    pub const fn error_status(&self) -> ErrorStatus {
        self.error_status
    }

    /// MAC status register.
    pub const fn mac_status(&self) -> MacStatus {
        self.mac_status
    }

    /// START task: runs the whole packet transform before returning.
    ///
    /// A decryption whose message is shorter than the MAC records `CheckFailed` without calling
    /// the crypto provider and still signals END; under BLE it signals ERROR first, so
    /// firmware sees ERROR then END.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NullJobList`] if either job-list pointer is null.
    pub fn start(&mut self, ctx: &mut DeviceContext<'_>) -> Result<(), SimError> {
        if !self.enabled {
            tracing::debug!(instance = self.instance, "CCM start ignored while disabled");
            return Ok(());
        }
        let mut input = open_job_list(Unit::Ccm, self.instance, self.in_ptr, Direction::Read)?;
        let mut output =
            open_job_list(Unit::Ccm, self.instance, self.out_ptr, Direction::Write)?;
        self.error_status = ErrorStatus::NoError;

        let mut header = [0u8; 2];
        if !read_field(&mut input, ctx.bus, &mut header, Unit::Ccm, self.instance) {
            self.fail(ErrorStatus::PrematureInptrEnd, ctx.signals);
            return Ok(());
        }
        let a_len = usize::from(u16::from_le_bytes(header));
        if !read_field(&mut input, ctx.bus, &mut header, Unit::Ccm, self.instance) {
            self.fail(ErrorStatus::PrematureInptrEnd, ctx.signals);
            return Ok(());
        }
        let m_len = usize::from(u16::from_le_bytes(header));
        tracing::debug!(instance = self.instance, a_len, m_len, mode = ?self.mode, "CCM packet");

        if m_len == 0 && (a_len == 0 || self.protocol == Protocol::Ble) {
            tracing::debug!(instance = self.instance, "CCM packet has nothing to process");
            let event = match self.mode {
                CcmMode::Encryption => EventKind::End,
                CcmMode::Decryption => EventKind::Error,
            };
            self.events.signal(ctx.signals, event);
            return Ok(());
        }

        let mut adata = vec![0u8; a_len];
        if a_len > 0 && !read_field(&mut input, ctx.bus, &mut adata, Unit::Ccm, self.instance) {
            self.fail(ErrorStatus::PrematureInptrEnd, ctx.signals);
            return Ok(());
        }
        let mut message = vec![0u8; m_len];
        if m_len > 0 && !read_field(&mut input, ctx.bus, &mut message, Unit::Ccm, self.instance) {
            self.fail(ErrorStatus::PrematureInptrEnd, ctx.signals);
            return Ok(());
        }

        let mut masked = adata.clone();
        if let Some(first) = masked.first_mut() {
            *first &= self.adata_mask;
        }
        let mac_len = self.mac_len.bytes();

        let processed = match self.mode {
            CcmMode::Encryption => {
                let sealed = ctx.crypto.ccm_encrypt(
                    &masked,
                    &message,
                    &self.key,
                    &self.nonce,
                    mac_len,
                );
                if sealed.len() > usize::from(u16::MAX) {
                    tracing::warn!(
                        instance = self.instance,
                        len = sealed.len(),
                        "CCM output does not fit its length field"
                    );
                    self.events.signal(ctx.signals, EventKind::Error);
                    return Ok(());
                }
                sealed
            }
            CcmMode::Decryption => {
                if m_len < mac_len {
                    tracing::debug!(
                        instance = self.instance,
                        m_len,
                        mac_len,
                        "CCM packet too short for its MAC"
                    );
                    self.mac_status = MacStatus::CheckFailed;
                    if self.protocol == Protocol::Ble {
                        self.events.signal(ctx.signals, EventKind::Error);
                    }
                    self.events.signal(ctx.signals, EventKind::End);
                    return Ok(());
                }
                let opened = ctx.crypto.ccm_decrypt(
                    &masked,
                    &message,
                    &self.key,
                    &self.nonce,
                    mac_len,
                    mac_len == 0,
                );
                self.mac_status = if opened.mac_error {
                    MacStatus::CheckFailed
                } else {
                    MacStatus::CheckPassed
                };
                tracing::debug!(
                    instance = self.instance,
                    mac_status = ?self.mac_status,
                    "CCM MAC checked"
                );
                opened.plaintext
            }
        };

        let out_len = u16::try_from(processed.len()).unwrap_or(u16::MAX).to_le_bytes();
        let written = write_field(&mut output, ctx.bus, &out_len, Unit::Ccm, self.instance)
            && (adata.is_empty()
                || write_field(&mut output, ctx.bus, &adata, Unit::Ccm, self.instance))
            && (processed.is_empty()
                || write_field(&mut output, ctx.bus, &processed, Unit::Ccm, self.instance));
        if !written {
            self.fail(ErrorStatus::PrematureOutptrEnd, ctx.signals);
            return Ok(());
        }

        self.events.signal(ctx.signals, EventKind::End);
        Ok(())
    }

    /// STOP task. The engine never stays busy past START, so this only traces.
    pub fn stop(&mut self, _signals: &mut Vec<Signal>) {
        tracing::info!(instance = self.instance, "CCM stop while idle");
    }

    fn fail(&mut self, status: ErrorStatus, signals: &mut Vec<Signal>) {
        tracing::debug!(instance = self.instance, ?status, "CCM job list ended early");
        self.error_status = status;
        self.events.signal(signals, EventKind::Error);
    }
}
