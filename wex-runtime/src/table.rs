// SPDX-License-Identifier: MIT

//! Table and element segment instances.
//!
//! Bulk operations bounds-check the whole affected span before writing any
//! slot, and in-table copies handle overlap. Element segments keep their
//! items until dropped, after which `table.init` from them traps for any
//! non-empty span.

use wex_error::{kinds::Trap, Error, Result};
use wex_foundation::{Ref, RefType, TableType};

/// A table instance: a bounded, growable array of references.
#[derive(Debug)]
pub struct TableInstance {
    ty: TableType,
    elements: Vec<Ref>,
}

impl TableInstance {
    /// Allocates a table at its minimum size, null-filled.
    #[must_use]
    pub fn new(ty: TableType) -> Self {
        let null = Ref::null(ty.element);
        Self { ty, elements: vec![null; ty.limits.min as usize] }
    }

    /// The table's type.
    #[must_use]
    pub const fn ty(&self) -> TableType {
        self.ty
    }

    /// Current element count.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.elements.len() as u64
    }

    /// Reads one element.
    pub fn get(&self, index: u64) -> Result<Ref> {
        self.elements
            .get(usize::try_from(index).unwrap_or(usize::MAX))
            .copied()
            .ok_or(Error::Trap(Trap::OutOfBoundsTableAccess { index }))
    }

    /// Writes one element.
    pub fn set(&mut self, index: u64, value: Ref) -> Result<()> {
        let slot = self
            .elements
            .get_mut(usize::try_from(index).unwrap_or(usize::MAX))
            .ok_or(Error::Trap(Trap::OutOfBoundsTableAccess { index }))?;
        *slot = value;
        Ok(())
    }

    /// Grows by `delta` elements initialized to `init`. Returns the
    /// previous size, or `None` when the declared maximum is exceeded.
    pub fn grow(&mut self, delta: u64, init: Ref) -> Option<u64> {
        let old_size = self.size();
        let new_size = old_size.checked_add(delta)?;
        if new_size > self.ty.limits.max.unwrap_or(u64::from(u32::MAX)) {
            return None;
        }
        let new_len = usize::try_from(new_size).ok()?;
        self.elements.resize(new_len, init);
        Some(old_size)
    }

    /// Bounds-checks `[start, start + len)`.
    fn check(&self, start: u64, len: u64) -> Result<usize> {
        let end = start
            .checked_add(len)
            .ok_or(Error::Trap(Trap::OutOfBoundsTableAccess { index: start }))?;
        if end > self.size() {
            return Err(Error::Trap(Trap::OutOfBoundsTableAccess { index: start }));
        }
        Ok(start as usize)
    }

    /// `table.fill`: sets `len` elements starting at `start`.
    pub fn fill(&mut self, start: u64, value: Ref, len: u64) -> Result<()> {
        let begin = self.check(start, len)?;
        self.elements[begin..begin + len as usize].fill(value);
        Ok(())
    }

    /// In-table `table.copy`, correct for overlapping ranges.
    pub fn copy_within(&mut self, dst: u64, src: u64, len: u64) -> Result<()> {
        let src_start = self.check(src, len)?;
        let dst_start = self.check(dst, len)?;
        self.elements.copy_within(src_start..src_start + len as usize, dst_start);
        Ok(())
    }

    /// Copies a span out of another table into this one.
    pub fn copy_from(&mut self, dst: u64, src_table: &Self, src: u64, len: u64) -> Result<()> {
        let src_start = src_table.check(src, len)?;
        let dst_start = self.check(dst, len)?;
        self.elements[dst_start..dst_start + len as usize]
            .copy_from_slice(&src_table.elements[src_start..src_start + len as usize]);
        Ok(())
    }

    /// `table.init` and active element segments: copies segment items in.
    pub fn init(&mut self, dst: u64, items: &[Ref], src: u64, len: u64) -> Result<()> {
        let src_end = src
            .checked_add(len)
            .ok_or(Error::Trap(Trap::OutOfBoundsTableAccess { index: src }))?;
        if src_end > items.len() as u64 {
            return Err(Error::Trap(Trap::OutOfBoundsTableAccess { index: src }));
        }
        let dst_start = self.check(dst, len)?;
        self.elements[dst_start..dst_start + len as usize]
            .copy_from_slice(&items[src as usize..src_end as usize]);
        Ok(())
    }
}

/// A runtime element segment: its items, or nothing once dropped.
#[derive(Debug)]
pub struct ElementInstance {
    ty: RefType,
    items: Box<[Ref]>,
}

impl ElementInstance {
    /// A live segment holding `items`.
    #[must_use]
    pub fn new(ty: RefType, items: Box<[Ref]>) -> Self {
        Self { ty, items }
    }

    /// The segment's element type.
    #[must_use]
    pub const fn ty(&self) -> RefType {
        self.ty
    }

    /// The remaining items; empty once dropped.
    #[must_use]
    pub fn items(&self) -> &[Ref] {
        &self.items
    }

    /// `elem.drop`: releases the items. Idempotent.
    pub fn drop_items(&mut self) {
        self.items = Box::new([]);
    }
}

/// A runtime data segment: its bytes, or nothing once dropped.
#[derive(Debug)]
pub struct DataInstance {
    bytes: Box<[u8]>,
}

impl DataInstance {
    /// A live segment holding `bytes`.
    #[must_use]
    pub fn new(bytes: Box<[u8]>) -> Self {
        Self { bytes }
    }

    /// The remaining bytes; empty once dropped.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// `data.drop`: releases the bytes. Idempotent.
    pub fn drop_bytes(&mut self) {
        self.bytes = Box::new([]);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use wex_foundation::FuncAddr;

    use super::*;

    fn table(min: u64, max: Option<u64>) -> TableInstance {
        TableInstance::new(TableType::new(RefType::Func, min, max))
    }

    #[test]
    fn fresh_tables_are_null_filled() {
        let t = table(3, None);
        assert_eq!(t.size(), 3);
        assert_eq!(t.get(2).unwrap(), Ref::Func(None));
        assert!(t.get(3).is_err());
    }

    #[test]
    fn grow_respects_max() {
        let mut t = table(1, Some(2));
        let marker = Ref::Func(Some(FuncAddr(7)));
        assert_eq!(t.grow(1, marker), Some(1));
        assert_eq!(t.get(1).unwrap(), marker);
        assert_eq!(t.grow(1, marker), None);
        assert_eq!(t.size(), 2);
    }

    #[test]
    fn failed_fill_is_atomic() {
        let mut t = table(4, None);
        let marker = Ref::Func(Some(FuncAddr(1)));
        assert!(t.fill(2, marker, 3).is_err());
        assert_eq!(t.get(2).unwrap(), Ref::Func(None));
        assert_eq!(t.get(3).unwrap(), Ref::Func(None));
    }

    #[test]
    fn overlapping_copy_is_correct() {
        let mut t = table(5, None);
        for i in 0..3 {
            t.set(i, Ref::Func(Some(FuncAddr(i as u32 + 1)))).unwrap();
        }
        t.copy_within(1, 0, 3).unwrap();
        assert_eq!(t.get(1).unwrap(), Ref::Func(Some(FuncAddr(1))));
        assert_eq!(t.get(2).unwrap(), Ref::Func(Some(FuncAddr(2))));
        assert_eq!(t.get(3).unwrap(), Ref::Func(Some(FuncAddr(3))));
    }

    #[test]
    fn init_from_dropped_segment_traps_for_nonempty_spans() {
        let mut seg = ElementInstance::new(
            RefType::Func,
            vec![Ref::Func(Some(FuncAddr(1)))].into(),
        );
        let mut t = table(2, None);
        seg.drop_items();
        assert!(t.init(0, seg.items(), 0, 1).is_err());
        // Zero-length init from a dropped segment is permitted.
        t.init(0, seg.items(), 0, 0).unwrap();
    }
}
