//! AES-ECB single-block cipher.
//!
//! START reads one 16-byte block through the input job list, encrypts it with the programmed
//! key and writes the result through the output job list. The result lands in memory
//! immediately; END is deferred by the per-block latency so firmware observes realistic
//! completion timing.
//!
//! States are Idle and Running. The shared AES core is arbitrated by the
//! [`System`](crate::soc::System), which aborts AAR or CCM before this unit starts.

use super::{DeviceContext, ErrorStatus, EventKind, EventPort, Signal, Unit, open_job_list};
use crate::common::{SimError, SimTime};
use crate::config::EcbBusyPolicy;
use crate::crypto::{BLOCK_SIZE, Key};
use crate::soc::dma::{Direction, DmaError};

/// One ECB instance.
#[derive(Debug, Clone)]
pub struct Ecb {
    instance: usize,
    enabled: bool,
    running: bool,
    key: Key,
    in_ptr: u32,
    out_ptr: u32,
    error_status: ErrorStatus,
    /// Pending END time, `None` while idle.
    wake: Option<SimTime>,
    busy_policy: EcbBusyPolicy,
    /// Event flags and interrupt enables.
    pub events: EventPort,
}

impl Ecb {
    /// Creates a disabled, idle instance with a zero key.
    ///
    /// # Arguments
    ///
    /// * `instance` - Hardware index.
    /// * `busy_policy` - Error status written when START arrives while running.
    pub const fn new(instance: usize, busy_policy: EcbBusyPolicy) -> Self {
        Self {
            instance,
            enabled: false,
            running: false,
            key: [0; BLOCK_SIZE],
            in_ptr: 0,
            out_ptr: 0,
            error_status: ErrorStatus::NoError,
            wake: None,
            busy_policy,
            events: EventPort::new(Unit::Ecb, instance),
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

    /// Returns whether a block is in flight.
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Programs the 128-bit key.
    pub fn set_key(&mut self, key: Key) {
        self.key = key;
    }

    /// Programmed key.
    pub const fn key(&self) -> &Key {
        &self.key
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

    /// Pending wake time.
    pub const fn wake(&self) -> Option<SimTime> {
        self.wake
    }

    /// START task.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NullJobList`] if either job-list pointer is null.
    pub fn start(&mut self, ctx: &mut DeviceContext<'_>) -> Result<(), SimError> {
        if !self.enabled {
            tracing::debug!(instance = self.instance, "ECB start ignored while disabled");
            return Ok(());
        }
        if self.running {
            tracing::warn!(instance = self.instance, "ECB started while running");
            if self.busy_policy == EcbBusyPolicy::Aborted {
                self.error_status = ErrorStatus::Aborted;
            }
            self.events.signal(ctx.signals, EventKind::Error);
            return Ok(());
        }

        let mut input = open_job_list(Unit::Ecb, self.instance, self.in_ptr, Direction::Read)?;
        let mut output =
            open_job_list(Unit::Ecb, self.instance, self.out_ptr, Direction::Write)?;
        self.error_status = ErrorStatus::NoError;

        let mut block = [0u8; BLOCK_SIZE];
        match input.read(ctx.bus, &mut block, true) {
            Ok(n) if n > 0 => {
                if n < BLOCK_SIZE {
                    tracing::debug!(instance = self.instance, read = n, "short ECB input padded");
                }
            }
            result => {
                self.fail(ErrorStatus::PrematureInptrEnd, result.err(), ctx.signals);
                return Ok(());
            }
        }

        let ciphertext = ctx.crypto.ecb_encrypt(&self.key, &block);
        match output.write(ctx.bus, &ciphertext, true) {
            Ok(n) if n > 0 => {
                if n < BLOCK_SIZE {
                    tracing::debug!(instance = self.instance, written = n, "short ECB output");
                }
            }
            result => {
                self.fail(ErrorStatus::PrematureOutptrEnd, result.err(), ctx.signals);
                return Ok(());
            }
        }

        self.running = true;
        self.wake = Some(ctx.now + ctx.timing.block_latency());
        tracing::trace!(instance = self.instance, wake = ?self.wake, "ECB block armed");
        Ok(())
    }

    /// STOP task.
    pub fn stop(&mut self, signals: &mut Vec<Signal>) {
        if !self.running {
            tracing::info!(instance = self.instance, "ECB stop while idle");
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
        tracing::debug!(instance = self.instance, "ECB aborted");
        self.running = false;
        self.wake = None;
        self.error_status = ErrorStatus::Aborted;
        self.events.signal(signals, EventKind::Error);
    }

    /// Wake-time expiry: completes the block and signals END.
    pub fn on_timer(&mut self, signals: &mut Vec<Signal>) {
        if !self.running {
            return;
        }
        self.running = false;
        self.wake = None;
        self.events.signal(signals, EventKind::End);
    }

    fn fail(&mut self, status: ErrorStatus, cause: Option<DmaError>, signals: &mut Vec<Signal>) {
        tracing::debug!(instance = self.instance, ?status, ?cause, "ECB job list ended early");
        self.running = false;
        self.wake = None;
        self.error_status = status;
        self.events.signal(signals, EventKind::Error);
    }
}
