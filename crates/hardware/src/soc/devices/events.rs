//! Event flags and interrupt enables.
//!
//! Every peripheral instance owns an [`EventPort`]: the event flag register firmware polls and
//! clears, the interrupt-enable mask, and the hook that records each signaled event so the
//! [`System`](crate::soc::System) can route it through the signaling fabric.

use std::fmt;

use super::Unit;

/// Events a peripheral can signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// Operation completed.
    End,
    /// Operation failed or was aborted.
    Error,
    /// AAR found at least one matching IRK.
    Resolved,
    /// AAR checked every IRK without a match.
    NotResolved,
}

impl EventKind {
    /// Bit of this event in the flag and interrupt-enable registers.
    pub const fn bit(self) -> u32 {
        match self {
            Self::End => 1 << 0,
            Self::Error => 1 << 1,
            Self::Resolved => 1 << 2,
            Self::NotResolved => 1 << 3,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::End => write!(f, "END"),
            Self::Error => write!(f, "ERROR"),
            Self::Resolved => write!(f, "RESOLVED"),
            Self::NotResolved => write!(f, "NOT_RESOLVED"),
        }
    }
}

/// Tasks a peripheral accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Begin an operation.
    Start,
    /// Abort the running operation.
    Stop,
}

/// One signaled event, queued for routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signal {
    /// Signaling peripheral type.
    pub unit: Unit,
    /// Signaling instance.
    pub instance: usize,
    /// The event.
    pub event: EventKind,
}

/// Event flag and interrupt-enable registers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventRegisters {
    flags: u32,
    inten: u32,
}

impl EventRegisters {
    /// Sets the flag for `event`.
    pub fn raise(&mut self, event: EventKind) {
        self.flags |= event.bit();
    }

    /// Clears the flag for `event` (firmware write of zero).
    pub fn clear(&mut self, event: EventKind) {
        self.flags &= !event.bit();
    }

    /// Returns whether `event` has been signaled and not yet cleared.
    pub const fn is_set(&self, event: EventKind) -> bool {
        self.flags & event.bit() != 0
    }

    /// Raw flag bits.
    pub const fn flags(&self) -> u32 {
        self.flags
    }

    /// `INTENSET`: enables interrupts for every event bit in `mask`.
    pub fn set_inten(&mut self, mask: u32) {
        self.inten |= mask;
    }

    /// `INTENCLR`: disables interrupts for every event bit in `mask`.
    pub fn clear_inten(&mut self, mask: u32) {
        self.inten &= !mask;
    }

    /// Interrupt-enable mask.
    pub const fn inten(&self) -> u32 {
        self.inten
    }

    /// Interrupt line level: any flag whose interrupt is enabled.
    pub const fn irq_pending(&self) -> bool {
        self.flags & self.inten != 0
    }
}

/// A peripheral's event output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventPort {
    unit: Unit,
    instance: usize,
    /// Flag and interrupt-enable registers.
    pub regs: EventRegisters,
}

impl EventPort {
    /// Creates the port of `unit[instance]` with every flag clear.
    pub const fn new(unit: Unit, instance: usize) -> Self {
        Self {
            unit,
            instance,
            regs: EventRegisters {
                flags: 0,
                inten: 0,
            },
        }
    }

    /// Raises `event` and queues it for fabric routing.
    ///
    /// # Arguments
    ///
    /// * `out` - Signal queue drained by the system after the current operation.
    /// * `event` - The event to signal.
    pub fn signal(&mut self, out: &mut Vec<Signal>, event: EventKind) {
        tracing::debug!(unit = %self.unit, instance = self.instance, %event, "event");
        self.regs.raise(event);
        out.push(Signal {
            unit: self.unit,
            instance: self.instance,
            event,
        });
    }
}
