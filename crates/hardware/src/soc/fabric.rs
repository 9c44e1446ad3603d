//! Task/event signaling fabric.
//!
//! A channel-indexed publish/subscribe registry that lets one peripheral's event trigger
//! another peripheral's task without firmware in the loop. It provides:
//! 1. **Subscriptions:** Each channel holds an ordered, duplicate-free list of task handles.
//! 2. **Publishing:** Every current subscriber of an enabled channel is dispatched once, in
//!    subscription order, synchronously.
//! 3. **Channel groups:** Masks of channels that can be enabled or disabled in bulk.
//!
//! The visible channel-enable mask is the only gate: enabling or disabling a group writes
//! straight into it.

use crate::common::SimError;

/// Publish/subscribe registry over task handles of type `T`.
#[derive(Debug, Clone)]
pub struct SignalFabric<T> {
    /// Subscribers per channel, in subscription order.
    channels: Vec<Vec<T>>,
    /// Channel enable mask; bit `n` gates channel `n`.
    enabled: u32,
    /// Channel membership mask per group.
    groups: Vec<u32>,
}

impl<T: Copy + PartialEq> SignalFabric<T> {
    /// Creates a fabric with all channels disabled and all groups empty.
    ///
    /// # Arguments
    ///
    /// * `channels` - Number of channels (at most 32).
    /// * `groups` - Number of channel groups.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] for more than 32 channels.
    pub fn new(channels: usize, groups: usize) -> Result<Self, SimError> {
        if channels > u32::BITS as usize {
            return Err(SimError::InvalidConfig(format!(
                "{channels} channels do not fit a 32-bit enable mask"
            )));
        }
        Ok(Self {
            channels: vec![Vec::new(); channels],
            enabled: 0,
            groups: vec![0; groups],
        })
    }

    /// Number of channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of channel groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Adds `task` to `channel`; subscribing twice to the same channel is a no-op.
    ///
    /// # Returns
    ///
    /// `true` if the task was newly added.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidChannel`] for an out-of-range channel.
    pub fn subscribe(&mut self, channel: usize, task: T) -> Result<bool, SimError> {
        let subscribers = self
            .channels
            .get_mut(channel)
            .ok_or(SimError::InvalidChannel(channel))?;
        if subscribers.contains(&task) {
            return Ok(false);
        }
        subscribers.push(task);
        Ok(true)
    }

    /// Removes `task` from every channel.
    ///
    /// # Returns
    ///
    /// The number of channels it was removed from.
    pub fn unsubscribe(&mut self, task: T) -> usize {
        let mut removed = 0;
        for subscribers in &mut self.channels {
            let before = subscribers.len();
            subscribers.retain(|t| *t != task);
            removed += before - subscribers.len();
        }
        removed
    }

    /// Current subscribers of `channel` in subscription order (empty if out of range).
    pub fn subscribers(&self, channel: usize) -> &[T] {
        self.channels.get(channel).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Dispatches every subscriber of `channel` once, in subscription order.
    ///
    /// Nothing is dispatched while the channel is disabled.
    ///
    /// # Returns
    ///
    /// The number of tasks dispatched.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidChannel`] for an out-of-range channel.
    pub fn publish(&self, channel: usize, mut dispatch: impl FnMut(T)) -> Result<usize, SimError> {
        let subscribers = self
            .channels
            .get(channel)
            .ok_or(SimError::InvalidChannel(channel))?;
        if !self.is_enabled(channel) {
            tracing::trace!(channel, "publish on disabled channel dropped");
            return Ok(0);
        }
        for task in subscribers {
            dispatch(*task);
        }
        Ok(subscribers.len())
    }

    /// Returns whether `channel` currently participates in dispatch.
    pub fn is_enabled(&self, channel: usize) -> bool {
        channel < self.channels.len() && self.enabled & (1 << channel) != 0
    }

    /// The visible channel-enable mask.
    pub const fn enabled_mask(&self) -> u32 {
        self.enabled
    }

    /// Replaces the channel-enable mask; bits beyond the channel count are dropped.
    pub fn set_enabled_mask(&mut self, mask: u32) {
        self.enabled = mask & self.valid_mask();
    }

    /// Enables every channel set in `mask`.
    pub fn enable_channels(&mut self, mask: u32) {
        self.set_enabled_mask(self.enabled | mask);
    }

    /// Disables every channel set in `mask`.
    pub fn disable_channels(&mut self, mask: u32) {
        self.set_enabled_mask(self.enabled & !mask);
    }

    /// Sets which channels belong to `group`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidGroup`] for an out-of-range group.
    pub fn set_group(&mut self, group: usize, mask: u32) -> Result<(), SimError> {
        let valid = self.valid_mask();
        let slot = self
            .groups
            .get_mut(group)
            .ok_or(SimError::InvalidGroup(group))?;
        *slot = mask & valid;
        Ok(())
    }

    /// Channel membership mask of `group`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidGroup`] for an out-of-range group.
    pub fn group_mask(&self, group: usize) -> Result<u32, SimError> {
        self.groups
            .get(group)
            .copied()
            .ok_or(SimError::InvalidGroup(group))
    }

    /// Enables every channel in `group`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidGroup`] for an out-of-range group.
    pub fn enable_group(&mut self, group: usize) -> Result<(), SimError> {
        let mask = self.group_mask(group)?;
        self.enable_channels(mask);
        Ok(())
    }

    /// Disables every channel in `group`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidGroup`] for an out-of-range group.
    pub fn disable_group(&mut self, group: usize) -> Result<(), SimError> {
        let mask = self.group_mask(group)?;
        self.disable_channels(mask);
        Ok(())
    }

    fn valid_mask(&self) -> u32 {
        match self.channels.len() {
            n if n >= u32::BITS as usize => u32::MAX,
            n => (1u32 << n) - 1,
        }
    }
}
