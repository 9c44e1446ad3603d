//! System-on-Chip (SoC) Components.
//!
//! This module organizes the components that make up the simulated peripheral cluster,
//! including the firmware memory bus, the scatter/gather access engine, the signaling
//! fabric, the peripherals themselves, and the registry that owns them.

/// Peripheral registry and task dispatch.
pub mod builder;

/// ECB, CCM and AAR peripheral implementations.
pub mod devices;

/// Scatter/gather job-list access engine.
pub mod dma;

/// Task/event publish-subscribe fabric.
pub mod fabric;

/// Firmware memory bus routing.
pub mod interconnect;

/// RAM regions backing firmware memory.
pub mod memory;

/// Memory access trait used by the access engine.
pub mod traits;

pub use builder::{System, Task};
