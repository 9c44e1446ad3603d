//! Memory access trait for DMA-capable peripherals.
//!
//! Everything the access engine touches (job lists and the buffers they point at) lives in
//! firmware memory reached through [`DmaBus`]. The trait provides:
//! 1. **Bulk access:** Byte-slice reads and writes at 32-bit physical addresses.
//! 2. **Word access:** Little-endian 32-bit helpers for hand-built job entries and registers.
//!
//! Accesses are all-or-nothing: an access that is not fully backed by memory fails with
//! [`BusFault`] and transfers nothing.

use crate::common::BusFault;

/// Byte-addressed firmware memory as seen by a DMA master.
pub trait DmaBus {
    /// Fills `buf` with the bytes starting at `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`BusFault`] if any byte of the range is unmapped.
    fn read_bytes(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), BusFault>;

    /// Stores `data` starting at `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`BusFault`] if any byte of the range is unmapped.
    fn write_bytes(&mut self, addr: u32, data: &[u8]) -> Result<(), BusFault>;

    /// Reads a little-endian 32-bit word.
    ///
    /// # Errors
    ///
    /// Returns [`BusFault`] if the word is unmapped.
    fn read_u32(&mut self, addr: u32) -> Result<u32, BusFault> {
        let mut word = [0u8; 4];
        self.read_bytes(addr, &mut word)?;
        Ok(u32::from_le_bytes(word))
    }

    /// Writes a little-endian 32-bit word.
    ///
    /// # Errors
    ///
    /// Returns [`BusFault`] if the word is unmapped.
    fn write_u32(&mut self, addr: u32, val: u32) -> Result<(), BusFault> {
        self.write_bytes(addr, &val.to_le_bytes())
    }
}
