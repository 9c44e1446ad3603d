//! Simulation error definitions.
//!
//! This module defines the two error layers of the simulator:
//! 1. **Bus faults:** An access touched memory no region claims.
//! 2. **Fatal errors:** Configuration bugs that stop the host process (null job lists on an
//!    enabled peripheral, unknown MAC-length encodings, runaway task chains).
//!
//! Runtime conditions such as premature end of a job list or a failed MAC check are not
//! errors at this level; they are recorded in the owning peripheral's status registers.

use thiserror::Error;

use crate::soc::devices::Unit;
use crate::soc::dma::Direction;

/// An access to firmware memory that no region fully covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("bus fault at {addr:#010x} ({len} bytes)")]
pub struct BusFault {
    /// First address of the faulting access.
    pub addr: u32,
    /// Length of the faulting access in bytes.
    pub len: usize,
}

/// Fatal simulation errors.
///
/// Every variant is a host-side configuration bug rather than something firmware could
/// recover from, so callers are expected to stop the simulation when one is returned.
#[derive(Debug, Error)]
pub enum SimError {
    /// A peripheral was started while enabled with a null job-list pointer.
    #[error("{unit}[{instance}] started with a null {direction} job list")]
    NullJobList {
        /// Peripheral type.
        unit: Unit,
        /// Hardware instance index.
        instance: usize,
        /// Which of the two job lists was null.
        direction: Direction,
    },

    /// The CCM MAC-length register was written with an encoding outside `0..=7`.
    #[error("unrecognized MAC length encoding {0}")]
    InvalidMacLength(u32),

    /// A task or accessor referenced an instance index that does not exist.
    #[error("no {unit} instance {instance}")]
    NoSuchInstance {
        /// Peripheral type.
        unit: Unit,
        /// Requested instance index.
        instance: usize,
    },

    /// A fabric operation referenced a channel outside the configured range.
    #[error("signaling channel {0} out of range")]
    InvalidChannel(usize),

    /// A fabric operation referenced a channel group outside the configured range.
    #[error("channel group {0} out of range")]
    InvalidGroup(usize),

    /// Event-to-task chaining exceeded the per-step budget (usually a subscription loop).
    #[error("more than {0} chained tasks dispatched in one step")]
    RunawayDispatch(usize),

    /// The configuration is structurally invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configuration could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
