//! Discrete-event timing.
//!
//! Peripherals compute their results immediately and defer the observable completion to a
//! wake time. This module keeps those wake times and advances simulated time between them.

/// Per-instance wake slots with a cached global minimum.
pub mod scheduler;

/// Top-level simulation driver.
pub mod simulator;

pub use scheduler::Scheduler;
pub use simulator::Simulator;
