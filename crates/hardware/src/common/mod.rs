//! Common utilities and types used throughout the simulator.
//!
//! This module provides the building blocks shared by every component:
//! 1. **Simulated time:** The microsecond time base used by the scheduler and peripherals.
//! 2. **Error Handling:** Fatal host errors and bus faults.

/// Error types (fatal simulation errors and bus faults).
pub mod error;

pub use error::{BusFault, SimError};

/// Simulated time in microseconds since simulation start.
pub type SimTime = u64;
