//! Firmware RAM regions.
//!
//! A [`Memory`] is one contiguous, zero-initialized region mapped at a 32-bit base address.
//! Firmware images, job lists and the buffers they reference are all placed in regions
//! registered on the [`Bus`](crate::soc::interconnect::Bus).

use std::ops::Range;

use crate::common::BusFault;
use crate::soc::traits::DmaBus;

/// One RAM region.
#[derive(Debug, Clone)]
pub struct Memory {
    /// Short region name for logs (e.g. `"RAM"`).
    name: String,
    /// Physical address of the first byte.
    base_addr: u32,
    /// Region contents.
    data: Vec<u8>,
}

impl Memory {
    /// Creates a zeroed region of `size` bytes at `base_addr`.
    ///
    /// # Arguments
    ///
    /// * `name` - Region name used in logs.
    /// * `base_addr` - Starting physical address.
    /// * `size` - Region size in bytes.
    pub fn new(name: impl Into<String>, base_addr: u32, size: usize) -> Self {
        Self {
            name: name.into(),
            base_addr,
            data: vec![0; size],
        }
    }

    /// Returns the region name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns (base_address, size_in_bytes).
    pub fn address_range(&self) -> (u32, usize) {
        (self.base_addr, self.data.len())
    }

    /// Returns `true` if `[addr, addr + len)` lies entirely inside this region.
    pub fn contains(&self, addr: u32, len: usize) -> bool {
        self.offsets(addr, len).is_some()
    }

    fn offsets(&self, addr: u32, len: usize) -> Option<Range<usize>> {
        let start = addr.checked_sub(self.base_addr)? as usize;
        let end = start.checked_add(len)?;
        (end <= self.data.len()).then_some(start..end)
    }
}

impl DmaBus for Memory {
    fn read_bytes(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), BusFault> {
        let range = self.offsets(addr, buf.len()).ok_or(BusFault {
            addr,
            len: buf.len(),
        })?;
        buf.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn write_bytes(&mut self, addr: u32, data: &[u8]) -> Result<(), BusFault> {
        let range = self.offsets(addr, data.len()).ok_or(BusFault {
            addr,
            len: data.len(),
        })?;
        self.data[range].copy_from_slice(data);
        Ok(())
    }
}
