//! SoC security peripheral simulator library.
//!
//! This crate models a cluster of security peripherals so firmware can run against a
//! discrete-event simulation instead of silicon:
//! 1. **Access engine:** Scatter/gather job-list DMA shared by every peripheral.
//! 2. **Peripherals:** ECB single-block cipher, CCM authenticated encryption, AAR address resolver.
//! 3. **Fabric:** Channel-indexed publish/subscribe wiring from events to tasks.
//! 4. **Simulation:** Wake-time scheduler and the driver that advances simulated time.
//! 5. **Crypto:** Injected AES/CCM primitive providers (real or pass-through).

/// Common types (errors, simulated time).
pub mod common;
/// Simulator configuration (defaults, backend selection, timing).
pub mod config;
/// Crypto primitive providers consumed by the peripherals.
pub mod crypto;
/// Wake-time scheduler and simulation driver.
pub mod sim;
/// System-on-chip (memory bus, access engine, fabric, peripherals, registry).
pub mod soc;

/// Root configuration type; use `Config::default()` or `Config::from_json`.
pub use crate::config::Config;
/// Top-level simulation driver.
pub use crate::sim::Simulator;
/// Peripheral registry; construct with `System::new`.
pub use crate::soc::System;
