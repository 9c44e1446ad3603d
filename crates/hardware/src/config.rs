//! Configuration system for the peripheral simulator.
//!
//! This module defines all configuration structures and enums used to parameterize
//! the simulator. It provides:
//! 1. **Defaults:** Baseline cluster size, fabric dimensions and timing constants.
//! 2. **Structures:** Hierarchical config for the system, timing and crypto backend.
//! 3. **Enums:** Crypto backend selection and the ECB busy-status policy.
//!
//! Configuration is supplied as JSON (`Config::from_json`) or built with `Config::default()`.

use serde::Deserialize;

use crate::common::SimError;

/// Default configuration constants for the simulator.
mod defaults {
    /// Number of peripheral clusters (each one ECB, one CCM and one AAR).
    pub const INSTANCES: usize = 1;

    /// Number of signaling fabric channels.
    pub const CHANNELS: usize = 16;

    /// Number of signaling fabric channel groups.
    pub const CHANNEL_GROUPS: usize = 6;

    /// Upper bound on tasks triggered by event chaining within one dispatch step.
    pub const MAX_CHAINED_TASKS: usize = 1024;

    /// Time for the ECB to process one block, in microseconds.
    pub const ECB_BLOCK_LATENCY_US: u64 = 1;

    /// AAR core clock in MHz.
    pub const AAR_CLOCK_MHZ: u32 = 16;

    /// Channel enable masks are 32 bits wide.
    pub const MAX_CHANNELS: usize = 32;
}

/// Crypto primitive provider selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum CryptoBackendKind {
    /// Real AES-128 and CCM (falls back to `Passthrough` when built without `aes-backend`).
    #[default]
    #[serde(alias = "AES", alias = "aes")]
    Aes,
    /// Plaintext passes through unmodified; MACs are a fixed placeholder pattern.
    #[serde(alias = "passthrough", alias = "Fake", alias = "fake")]
    Passthrough,
}

/// Error status written when ECB START arrives while the ECB itself is running.
///
/// Real hardware behavior is unconfirmed here, so the choice is left to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum EcbBusyPolicy {
    /// Signal ERROR but leave the error status register untouched.
    #[default]
    KeepStatus,
    /// Signal ERROR and set the error status to `Aborted`.
    Aborted,
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Cluster and fabric dimensions.
    #[serde(default)]
    pub system: SystemConfig,
    /// Peripheral timing parameters.
    #[serde(default)]
    pub timing: TimingConfig,
    /// Crypto backend selection.
    #[serde(default)]
    pub crypto: CryptoConfig,
    /// Error status policy for ECB start-while-running.
    #[serde(default)]
    pub ecb_busy_policy: EcbBusyPolicy,
}

impl Config {
    /// Parses a configuration from a JSON document and validates it.
    ///
    /// Missing sections and fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Parse`] for malformed JSON and [`SimError::InvalidConfig`] when
    /// the values are out of range.
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks structural constraints that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] describing the first violated constraint.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.system.instances == 0 {
            return Err(SimError::InvalidConfig(
                "system.instances must be at least 1".into(),
            ));
        }
        if self.system.channels == 0 || self.system.channels > defaults::MAX_CHANNELS {
            return Err(SimError::InvalidConfig(format!(
                "system.channels must be within 1..={}",
                defaults::MAX_CHANNELS
            )));
        }
        if self.system.max_chained_tasks == 0 {
            return Err(SimError::InvalidConfig(
                "system.max_chained_tasks must be at least 1".into(),
            ));
        }
        if self.timing.aar_clock_mhz == 0 {
            return Err(SimError::InvalidConfig(
                "timing.aar_clock_mhz must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Cluster and fabric dimensions.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    /// Number of peripheral clusters.
    #[serde(default = "SystemConfig::default_instances")]
    pub instances: usize,

    /// Number of fabric channels (at most 32).
    #[serde(default = "SystemConfig::default_channels")]
    pub channels: usize,

    /// Number of fabric channel groups.
    #[serde(default = "SystemConfig::default_channel_groups")]
    pub channel_groups: usize,

    /// Maximum tasks dispatched through event chaining in one step.
    #[serde(default = "SystemConfig::default_max_chained_tasks")]
    pub max_chained_tasks: usize,
}

impl SystemConfig {
    fn default_instances() -> usize {
        defaults::INSTANCES
    }

    fn default_channels() -> usize {
        defaults::CHANNELS
    }

    fn default_channel_groups() -> usize {
        defaults::CHANNEL_GROUPS
    }

    fn default_max_chained_tasks() -> usize {
        defaults::MAX_CHAINED_TASKS
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            instances: defaults::INSTANCES,
            channels: defaults::CHANNELS,
            channel_groups: defaults::CHANNEL_GROUPS,
            max_chained_tasks: defaults::MAX_CHAINED_TASKS,
        }
    }
}

/// Peripheral timing parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct TimingConfig {
    /// ECB per-block latency in microseconds.
    #[serde(default = "TimingConfig::default_ecb_block_latency")]
    pub ecb_block_latency_us: u64,

    /// AAR core clock in MHz; resolution time scales inversely with it.
    #[serde(default = "TimingConfig::default_aar_clock")]
    pub aar_clock_mhz: u32,
}

impl TimingConfig {
    fn default_ecb_block_latency() -> u64 {
        defaults::ECB_BLOCK_LATENCY_US
    }

    fn default_aar_clock() -> u32 {
        defaults::AAR_CLOCK_MHZ
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            ecb_block_latency_us: defaults::ECB_BLOCK_LATENCY_US,
            aar_clock_mhz: defaults::AAR_CLOCK_MHZ,
        }
    }
}

/// Crypto backend selection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CryptoConfig {
    /// Which provider to construct at system start.
    #[serde(default)]
    pub backend: CryptoBackendKind,
}
