//! Simulator: advances simulated time from one peripheral completion to the next.
//!
//! Firmware-side activity (register writes, `System::trigger`) happens at the current time
//! between steps; each step jumps to the earliest pending wake time and dispatches every
//! completion due at that instant, including the task chains they set off.

use crate::common::{SimError, SimTime};
use crate::config::Config;
use crate::soc::System;

/// Top-level simulator: the peripheral system plus the time-advance loop.
#[derive(Debug)]
pub struct Simulator {
    /// Memory, peripherals and fabric.
    pub system: System,
}

impl Simulator {
    /// Wraps an already built system.
    pub fn new(system: System) -> Self {
        Self { system }
    }

    /// Builds the system from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] if the configuration fails validation.
    pub fn from_config(config: &Config) -> Result<Self, SimError> {
        Ok(Self::new(System::new(config)?))
    }

    /// Current simulated time in microseconds.
    pub const fn now(&self) -> SimTime {
        self.system.now()
    }

    /// Time of the next pending completion.
    pub const fn next_wake(&self) -> Option<SimTime> {
        self.system.next_wake()
    }

    /// Advances to the next pending completion and dispatches everything due then.
    ///
    /// # Returns
    ///
    /// The time stepped to, or `None` if nothing is pending.
    ///
    /// # Errors
    ///
    /// Returns the fatal [`SimError`] raised by a chained task.
    pub fn step(&mut self) -> Result<Option<SimTime>, SimError> {
        let Some(wake) = self.system.next_wake() else {
            return Ok(None);
        };
        let _ = self.system.dispatch_due(wake)?;
        Ok(Some(wake))
    }

    /// Steps until no completion is pending at or before `end`, then moves time to `end`.
    ///
    /// # Returns
    ///
    /// The number of steps taken.
    ///
    /// # Errors
    ///
    /// Returns the fatal [`SimError`] raised by a chained task; time stays at the failing
    /// step.
    pub fn run_until(&mut self, end: SimTime) -> Result<usize, SimError> {
        let mut steps = 0;
        while self.system.next_wake().is_some_and(|wake| wake <= end) {
            let _ = self.step()?;
            steps += 1;
        }
        self.system.advance_to(end);
        tracing::trace!(now = self.now(), steps, "run complete");
        Ok(steps)
    }
}
