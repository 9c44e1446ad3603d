//! Firmware memory interconnect.
//!
//! This module implements the bus that routes DMA accesses to RAM regions. It provides:
//! 1. **Region registration:** Regions are added by address range and kept sorted for lookup.
//! 2. **Access routing:** Reads/writes by address, with a last-region hint since job lists and
//!    their buffers usually sit in the same region.
//! 3. **Host loading:** Convenience helpers to place data before the simulation runs.

use crate::common::BusFault;
use crate::soc::memory::Memory;
use crate::soc::traits::DmaBus;

/// Memory bus seen by the peripherals' access engines.
#[derive(Debug, Default)]
pub struct Bus {
    /// Registered regions, sorted by base address.
    regions: Vec<Memory>,
    last_region_idx: usize,
}

impl Bus {
    /// Creates an empty bus; add regions with `add_region`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a region; regions are sorted by base address for lookup.
    ///
    /// # Arguments
    ///
    /// * `region` - The RAM region to map.
    pub fn add_region(&mut self, region: Memory) {
        tracing::debug!(
            region = region.name(),
            base = format_args!("{:#010x}", region.address_range().0),
            size = region.address_range().1,
            "mapping memory region"
        );
        self.regions.push(region);
        self.regions.sort_by_key(|r| r.address_range().0);
        self.last_region_idx = 0;
    }

    /// Writes a host-side blob into firmware memory.
    ///
    /// # Errors
    ///
    /// Returns [`BusFault`] if the blob does not fit in one region.
    pub fn load(&mut self, addr: u32, data: &[u8]) -> Result<(), BusFault> {
        self.write_bytes(addr, data)
    }

    /// Reads `len` bytes into a new vector.
    ///
    /// # Errors
    ///
    /// Returns [`BusFault`] if the range is not backed by one region.
    pub fn dump(&mut self, addr: u32, len: usize) -> Result<Vec<u8>, BusFault> {
        let mut out = vec![0; len];
        self.read_bytes(addr, &mut out)?;
        Ok(out)
    }

    fn find_region(&mut self, addr: u32, len: usize) -> Option<&mut Memory> {
        if self
            .regions
            .get(self.last_region_idx)
            .is_some_and(|r| r.contains(addr, len))
        {
            return self.regions.get_mut(self.last_region_idx);
        }
        let idx = self.regions.iter().position(|r| r.contains(addr, len))?;
        self.last_region_idx = idx;
        self.regions.get_mut(idx)
    }
}

impl DmaBus for Bus {
    fn read_bytes(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), BusFault> {
        let len = buf.len();
        self.find_region(addr, len)
            .ok_or(BusFault { addr, len })?
            .read_bytes(addr, buf)
    }

    fn write_bytes(&mut self, addr: u32, data: &[u8]) -> Result<(), BusFault> {
        let len = data.len();
        self.find_region(addr, len)
            .ok_or(BusFault { addr, len })?
            .write_bytes(addr, data)
    }
}
