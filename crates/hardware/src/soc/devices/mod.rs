//! Security peripherals.
//!
//! This module contains the peripheral state machines found in one crypto cluster: the ECB
//! single-block cipher, the CCM authenticated-encryption engine and the AAR address
//! resolver, plus the event register block they share.

/// Resolvable private address resolver.
pub mod aar;

/// CCM authenticated encryption engine.
pub mod ccm;

/// AES-ECB single-block cipher.
pub mod ecb;

/// Event flags, interrupt enables and the outgoing signal record.
pub mod events;

use std::fmt;

pub use aar::Aar;
pub use ccm::Ccm;
pub use ecb::Ecb;
pub use events::{EventKind, EventPort, EventRegisters, Signal, TaskKind};

use crate::common::{SimError, SimTime};
use crate::crypto::CryptoBackend;
use crate::soc::dma::{Direction, DmaError, JobCursor};
use crate::soc::traits::DmaBus;

/// Peripheral type within a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Unit {
    /// AES-ECB block cipher.
    Ecb,
    /// CCM authenticated encryption.
    Ccm,
    /// Address resolver.
    Aar,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ecb => write!(f, "ECB"),
            Self::Ccm => write!(f, "CCM"),
            Self::Aar => write!(f, "AAR"),
        }
    }
}

/// Value of a peripheral's error status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum ErrorStatus {
    /// Last operation completed without error.
    #[default]
    NoError = 0,
    /// The input job list ended before all input was read.
    PrematureInptrEnd = 1,
    /// The output job list ended before all output was written.
    PrematureOutptrEnd = 2,
    /// The operation was aborted, by STOP or by another peripheral claiming the core.
    Aborted = 3,
}

/// Shared cipher timing, including the test-only latency override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherTiming {
    block_latency: SimTime,
    override_latency: Option<SimTime>,
}

impl CipherTiming {
    /// Creates timing with the configured per-block latency and no override.
    pub const fn new(block_latency: SimTime) -> Self {
        Self {
            block_latency,
            override_latency: None,
        }
    }

    /// Effective per-block latency.
    pub fn block_latency(&self) -> SimTime {
        self.override_latency.unwrap_or(self.block_latency)
    }

    /// The override, if one is set.
    pub const fn latency_override(&self) -> Option<SimTime> {
        self.override_latency
    }

    /// Pins all cipher timing to `latency` per block.
    pub fn set_override(&mut self, latency: SimTime) {
        self.override_latency = Some(latency);
    }

    /// Returns to the configured timing.
    pub fn reset_override(&mut self) {
        self.override_latency = None;
    }
}

/// Everything a peripheral operation may touch outside its own registers.
pub struct DeviceContext<'a> {
    /// Firmware memory the job lists live in.
    pub bus: &'a mut dyn DmaBus,
    /// Injected crypto primitives.
    pub crypto: &'a dyn CryptoBackend,
    /// Current simulated time.
    pub now: SimTime,
    /// Cipher timing.
    pub timing: &'a CipherTiming,
    /// Events signaled during the operation, in order.
    pub signals: &'a mut Vec<Signal>,
}

impl fmt::Debug for DeviceContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceContext")
            .field("crypto", &self.crypto.name())
            .field("now", &self.now)
            .field("timing", &self.timing)
            .field("signals", &self.signals)
            .finish_non_exhaustive()
    }
}

/// Starts a cursor on a peripheral job list, mapping a null pointer to the fatal error.
pub(crate) fn open_job_list(
    unit: Unit,
    instance: usize,
    ptr: u32,
    direction: Direction,
) -> Result<JobCursor, SimError> {
    let mut cursor = JobCursor::new();
    if cursor.start(ptr).is_err() {
        tracing::error!(%unit, instance, %direction, "started with a null job list");
        return Err(SimError::NullJobList {
            unit,
            instance,
            direction,
        });
    }
    Ok(cursor)
}

/// Reads exactly `buf.len()` bytes as a new job; returns `false` on any shortfall.
pub(crate) fn read_field(
    cursor: &mut JobCursor,
    bus: &mut dyn DmaBus,
    buf: &mut [u8],
    unit: Unit,
    instance: usize,
) -> bool {
    match cursor.read(bus, buf, true) {
        Ok(n) if n == buf.len() => true,
        Ok(n) => {
            tracing::debug!(%unit, instance, wanted = buf.len(), got = n, "short input field");
            false
        }
        Err(DmaError::EndOfList) => {
            tracing::debug!(%unit, instance, "input job list ended");
            false
        }
        Err(err) => {
            tracing::warn!(%unit, instance, %err, "input job list access failed");
            false
        }
    }
}

/// Writes all of `data` as a new job; returns `false` on any shortfall.
pub(crate) fn write_field(
    cursor: &mut JobCursor,
    bus: &mut dyn DmaBus,
    data: &[u8],
    unit: Unit,
    instance: usize,
) -> bool {
    match cursor.write(bus, data, true) {
        Ok(n) if n == data.len() => true,
        Ok(n) => {
            tracing::debug!(%unit, instance, wanted = data.len(), got = n, "short output field");
            false
        }
        Err(DmaError::EndOfList) => {
            tracing::debug!(%unit, instance, "output job list ended");
            false
        }
        Err(err) => {
            tracing::warn!(%unit, instance, %err, "output job list access failed");
            false
        }
    }
}
