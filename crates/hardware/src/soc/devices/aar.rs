//! Resolvable private address resolver.
//!
//! AAR matches a Bluetooth resolvable private address against a list of identity resolving
//! keys (IRKs). The input job list carries, each as its own job:
//! 1. **Hash:** the 3-byte hash half of the address.
//! 2. **Prand:** the 3-byte random half of the address.
//! 3. **IRKs:** 16-byte keys, one per job, until the list ends.
//!
//! The index of every matching IRK is written to the output job list as a 2-byte
//! little-endian value. Matching runs to completion inside START; RESOLVED or NOT_RESOLVED
//! and END are deferred by a duration derived from how many keys were checked.

use super::{
    CipherTiming, DeviceContext, ErrorStatus, EventKind, EventPort, Signal, Unit, open_job_list,
    read_field, write_field,
};
use crate::common::{SimError, SimTime};
use crate::crypto::{BLOCK_SIZE, CryptoBackend, Key};
use crate::soc::dma::Direction;

/// Hard bound on the IRK list length.
pub const MAX_CANDIDATES: usize = 4095;

/// Fixed cycles per resolution run.
const SETUP_CYCLES: u64 = 4;
/// Cycles per IRK checked.
const IRK_CYCLES: u64 = 24;
/// Cycles per match written out.
const RESULT_CYCLES: u64 = 2;

/// Computes the 24-bit address hash of `prand` under `irk`.
///
/// The cipher input is 13 zero bytes followed by `prand` most significant byte first; the
/// hash is the least significant three bytes of the output, returned in memory order.
pub fn address_hash(crypto: &dyn CryptoBackend, irk: &Key, prand: &[u8; 3]) -> [u8; 3] {
    let mut block = [0u8; BLOCK_SIZE];
    block[13] = prand[2];
    block[14] = prand[1];
    block[15] = prand[0];
    let out = crypto.ecb_encrypt(irk, &block);
    [out[15], out[14], out[13]]
}

/// One AAR instance.
#[derive(Debug, Clone)]
pub struct Aar {
    instance: usize,
    enabled: bool,
    running: bool,
    clock_mhz: u32,
    max_resolved: usize,
    in_ptr: u32,
    out_ptr: u32,
    resolved: usize,
    checked: usize,
    error_status: ErrorStatus,
    wake: Option<SimTime>,
    /// Event flags and interrupt enables.
    pub events: EventPort,
}

impl Aar {
    /// Creates a disabled, idle instance that stops at the first match.
    ///
    /// # Arguments
    ///
    /// * `instance` - Hardware index.
    /// * `clock_mhz` - Core clock used to convert cycles to microseconds (non-zero).
    pub const fn new(instance: usize, clock_mhz: u32) -> Self {
        Self {
            instance,
            enabled: false,
            running: false,
            clock_mhz,
            max_resolved: 1,
            in_ptr: 0,
            out_ptr: 0,
            resolved: 0,
            checked: 0,
            error_status: ErrorStatus::NoError,
            wake: None,
            events: EventPort::new(Unit::Aar, instance),
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

    /// Returns whether a resolution is in flight.
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Programs how many matches end the search, clamped to `1..=MAX_CANDIDATES`.
    pub fn set_max_resolved(&mut self, max: usize) {
        self.max_resolved = max.clamp(1, MAX_CANDIDATES);
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

    /// Matches found by the last run.
    pub const fn resolved(&self) -> usize {
        self.resolved
    }

    /// IRKs checked by the last run.
    pub const fn checked(&self) -> usize {
        self.checked
    }

    /// Error status register.
    pub const fn error_status(&self) -> ErrorStatus {
        self.error_status
    }

    /// Pending wake time.
    pub const fn wake(&self) -> Option<SimTime> {
        self.wake
    }

    /// Time the last run takes on the simulated core.
    ///
    /// With a latency override every checked key costs one override period (at least one
    /// period overall); otherwise cycles are converted at the core clock, rounding up.
    pub fn duration(&self, timing: &CipherTiming) -> SimTime {
        if let Some(latency) = timing.latency_override() {
            return latency * self.checked.max(1) as SimTime;
        }
        let cycles = SETUP_CYCLES
            + self.checked as u64 * IRK_CYCLES
            + self.resolved as u64 * RESULT_CYCLES;
        cycles.div_ceil(u64::from(self.clock_mhz.max(1)))
    }

    /// START task.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NullJobList`] if either job-list pointer is null.
    pub fn start(&mut self, ctx: &mut DeviceContext<'_>) -> Result<(), SimError> {
        if !self.enabled {
            tracing::debug!(instance = self.instance, "AAR start ignored while disabled");
            return Ok(());
        }
        if self.running {
            tracing::warn!(instance = self.instance, "AAR started while running; ignored");
            return Ok(());
        }
        let mut input = open_job_list(Unit::Aar, self.instance, self.in_ptr, Direction::Read)?;
        let mut output =
            open_job_list(Unit::Aar, self.instance, self.out_ptr, Direction::Write)?;
        self.error_status = ErrorStatus::NoError;
        self.resolved = 0;
        self.checked = 0;

        let mut hash = [0u8; 3];
        let mut prand = [0u8; 3];
        if !read_field(&mut input, ctx.bus, &mut hash, Unit::Aar, self.instance)
            || !read_field(&mut input, ctx.bus, &mut prand, Unit::Aar, self.instance)
        {
            self.fail(ErrorStatus::PrematureInptrEnd, ctx.signals);
            return Ok(());
        }
        if prand[2] >> 6 != 0b01 {
            tracing::warn!(
                instance = self.instance,
                prand = ?prand,
                "address is not resolvable private; resolving anyway"
            );
        }

        let mut irk = [0u8; BLOCK_SIZE];
        while self.checked < MAX_CANDIDATES && self.resolved < self.max_resolved {
            if !read_field(&mut input, ctx.bus, &mut irk, Unit::Aar, self.instance) {
                break;
            }
            let index = self.checked;
            self.checked += 1;
            if address_hash(ctx.crypto, &irk, &prand) != hash {
                continue;
            }
            tracing::debug!(instance = self.instance, index, "IRK matched");
            let encoded = (index as u16).to_le_bytes();
            if !write_field(&mut output, ctx.bus, &encoded, Unit::Aar, self.instance) {
                self.fail(ErrorStatus::PrematureOutptrEnd, ctx.signals);
                return Ok(());
            }
            self.resolved += 1;
        }

        self.running = true;
        self.wake = Some(ctx.now + self.duration(ctx.timing));
        tracing::debug!(
            instance = self.instance,
            checked = self.checked,
            resolved = self.resolved,
            wake = ?self.wake,
            "AAR run armed"
        );
        Ok(())
    }

    /// STOP task.
    pub fn stop(&mut self, signals: &mut Vec<Signal>) {
        if !self.running {
            tracing::info!(instance = self.instance, "AAR stop while idle");
            return;
        }
        self.abort(signals);
    }

    /// Forces the unit idle with an `Aborted` status and signals ERROR.
    ///
    /// Does nothing while idle.
    pub fn abort(&mut self, signals: &mut Vec<Signal>) {
        if !self.running {
            return;
        }
        tracing::debug!(instance = self.instance, "AAR aborted");
        self.running = false;
        self.wake = None;
        self.error_status = ErrorStatus::Aborted;
        self.events.signal(signals, EventKind::Error);
    }

    /// Wake-time expiry: reports the outcome, then END.
    pub fn on_timer(&mut self, signals: &mut Vec<Signal>) {
        if !self.running {
            return;
        }
        self.running = false;
        self.wake = None;
        let outcome = if self.resolved > 0 {
            EventKind::Resolved
        } else {
            EventKind::NotResolved
        };
        self.events.signal(signals, outcome);
        self.events.signal(signals, EventKind::End);
    }

    fn fail(&mut self, status: ErrorStatus, signals: &mut Vec<Signal>) {
        tracing::debug!(instance = self.instance, ?status, "AAR job list ended early");
        self.running = false;
        self.wake = None;
        self.error_status = status;
        self.events.signal(signals, EventKind::Error);
    }
}
