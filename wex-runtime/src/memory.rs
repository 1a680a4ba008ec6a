// SPDX-License-Identifier: MIT

//! Linear memory instances.
//!
//! Every access performs an overflow-safe bounds check before touching any
//! byte, so a failing bulk operation leaves the memory unmodified. All
//! address arithmetic is in `u64` regardless of the memory's index type;
//! the 32-bit 4 GiB ceiling is enforced at allocation and growth.

use wex_error::{
    kinds::{InstantiationError, Trap},
    Error, Result,
};
use wex_foundation::{MemoryType, PAGE_SIZE};

/// Hard page-count ceiling for 32-bit memories (4 GiB).
const MAX_PAGES_32: u64 = 65536;

/// A linear memory instance.
#[derive(Debug)]
pub struct MemoryInstance {
    ty: MemoryType,
    data: Vec<u8>,
}

impl MemoryInstance {
    /// Allocates a memory at its minimum size, zero-filled.
    pub fn new(ty: MemoryType) -> Result<Self> {
        if ty.is_64 || ty.shared {
            return Err(Error::Instantiation(InstantiationError::Unsupported(
                "64-bit and shared memories",
            )));
        }
        if ty.limits.min > MAX_PAGES_32 {
            return Err(Error::Instantiation(InstantiationError::OutOfBoundsMemoryAccess));
        }
        let bytes = (ty.limits.min as usize)
            .checked_mul(PAGE_SIZE)
            .ok_or(Error::Instantiation(InstantiationError::OutOfBoundsMemoryAccess))?;
        Ok(Self { ty, data: vec![0; bytes] })
    }

    /// The memory's type. The minimum reflects the original declaration,
    /// not the current size.
    #[must_use]
    pub const fn ty(&self) -> MemoryType {
        self.ty
    }

    /// Current size in pages.
    #[must_use]
    pub fn size_pages(&self) -> u64 {
        (self.data.len() / PAGE_SIZE) as u64
    }

    /// Current size in bytes.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Grows by `delta` pages. Returns the previous page count, or `None`
    /// when the declared maximum or the 4 GiB ceiling would be exceeded;
    /// failure leaves the memory untouched.
    pub fn grow(&mut self, delta: u64) -> Option<u64> {
        let old_pages = self.size_pages();
        let new_pages = old_pages.checked_add(delta)?;
        let ceiling = self.ty.limits.max.map_or(MAX_PAGES_32, |max| max.min(MAX_PAGES_32));
        if new_pages > ceiling {
            return None;
        }
        self.data.resize((new_pages as usize) * PAGE_SIZE, 0);
        Some(old_pages)
    }

    /// Bounds-checks `[addr, addr + len)` and returns the start as `usize`.
    fn check(&self, addr: u64, len: u64) -> Result<usize> {
        let oob = || {
            Error::Trap(Trap::OutOfBoundsMemoryAccess { address: addr, length: len })
        };
        let end = addr.checked_add(len).ok_or_else(oob)?;
        if end > self.data.len() as u64 {
            return Err(oob());
        }
        Ok(addr as usize)
    }

    /// Reads `N` bytes at `addr`, little-endian order preserved.
    pub fn read<const N: usize>(&self, addr: u64) -> Result<[u8; N]> {
        let start = self.check(addr, N as u64)?;
        let mut out = [0; N];
        out.copy_from_slice(&self.data[start..start + N]);
        Ok(out)
    }

    /// Writes `N` bytes at `addr`.
    pub fn write<const N: usize>(&mut self, addr: u64, bytes: [u8; N]) -> Result<()> {
        let start = self.check(addr, N as u64)?;
        self.data[start..start + N].copy_from_slice(&bytes);
        Ok(())
    }

    /// `memory.fill`: sets `len` bytes at `addr` to `byte`.
    pub fn fill(&mut self, addr: u64, byte: u8, len: u64) -> Result<()> {
        let start = self.check(addr, len)?;
        self.data[start..start + len as usize].fill(byte);
        Ok(())
    }

    /// `memory.copy`: copies `len` bytes from `src` to `dst`, correct for
    /// overlapping ranges.
    pub fn copy_within(&mut self, dst: u64, src: u64, len: u64) -> Result<()> {
        let src_start = self.check(src, len)?;
        let dst_start = self.check(dst, len)?;
        self.data.copy_within(src_start..src_start + len as usize, dst_start);
        Ok(())
    }

    /// `memory.init` and active data segments: copies a slice of segment
    /// bytes into memory. The source range is checked against the segment,
    /// the destination against the memory, both before any write.
    pub fn init(&mut self, dst: u64, segment: &[u8], src: u64, len: u64) -> Result<()> {
        let src_end = src.checked_add(len).ok_or(Error::Trap(Trap::OutOfBoundsMemoryAccess {
            address: src,
            length: len,
        }))?;
        if src_end > segment.len() as u64 {
            return Err(Error::Trap(Trap::OutOfBoundsMemoryAccess { address: src, length: len }));
        }
        let dst_start = self.check(dst, len)?;
        self.data[dst_start..dst_start + len as usize]
            .copy_from_slice(&segment[src as usize..src_end as usize]);
        Ok(())
    }

    /// A read-only view of the whole memory.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// A mutable view of the whole memory.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;

    fn one_page() -> MemoryInstance {
        MemoryInstance::new(MemoryType::new(1, Some(2))).unwrap()
    }

    #[test]
    fn edge_accesses() {
        let mut mem = one_page();
        // Last valid 4-byte slot is 65532.
        mem.write::<4>(65532, [1, 2, 3, 4]).unwrap();
        assert_eq!(mem.read::<4>(65532).unwrap(), [1, 2, 3, 4]);
        assert!(mem.read::<4>(65533).is_err());
        assert!(mem.read::<1>(65536).is_err());
    }

    #[test]
    fn huge_offsets_do_not_wrap() {
        let mem = one_page();
        assert!(mem.read::<8>(u64::MAX - 3).is_err());
        assert!(mem.check(u64::MAX, 2).is_err());
    }

    #[test]
    fn grow_respects_declared_max() {
        let mut mem = one_page();
        assert_eq!(mem.grow(1), Some(1));
        assert_eq!(mem.size_pages(), 2);
        assert_eq!(mem.grow(1), None);
        assert_eq!(mem.size_pages(), 2);
        assert_eq!(mem.grow(0), Some(2));
    }

    #[test]
    fn grow_respects_the_4gib_ceiling() {
        let mut mem = MemoryInstance::new(MemoryType::new(0, None)).unwrap();
        assert_eq!(mem.grow(MAX_PAGES_32 + 1), None);
        assert_eq!(mem.grow(u64::MAX), None);
    }

    #[test]
    fn failed_fill_leaves_memory_unmodified() {
        let mut mem = one_page();
        assert!(mem.fill(65530, 0xaa, 100).is_err());
        assert!(mem.data().iter().all(|b| *b == 0));
    }

    #[test]
    fn overlapping_copy_is_correct() {
        let mut mem = one_page();
        mem.write::<4>(0, [1, 2, 3, 4]).unwrap();
        mem.copy_within(2, 0, 4).unwrap();
        assert_eq!(mem.read::<6>(0).unwrap(), [1, 2, 1, 2, 3, 4]);
    }

    #[test]
    fn init_checks_both_ranges() {
        let mut mem = one_page();
        let segment = [9u8, 8, 7];
        assert!(mem.init(0, &segment, 1, 3).is_err());
        assert!(mem.init(65534, &segment, 0, 3).is_err());
        mem.init(10, &segment, 1, 2).unwrap();
        assert_eq!(mem.read::<2>(10).unwrap(), [8, 7]);
    }
}
