// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! POD, zero-initialized and fixed-size POD memory blocks.
//!
//! Allocations are addressed by byte offset into the block, so growing the backing
//! storage never invalidates earlier allocations.

use super::{range_end, MemoryBlock, MemoryBlockType, Payload};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::fmt;

/// Allocator interface of `pod` and `zeroinit` blocks.
pub trait PodAllocatorApi: Sync {
    /// Reserves `size` bytes aligned to `alignment`, returning their offset.
    fn allocate(&self, block: &MemoryBlock, size: usize, alignment: usize) -> Result<usize>;
    /// Grows or shrinks an allocation, returning its (possibly new) offset.
    fn resize(
        &self,
        block: &MemoryBlock,
        offset: usize,
        old_size: usize,
        new_size: usize,
    ) -> Result<usize>;
    /// Releases spare capacity; no further allocation is expected.
    fn finalize(&self, block: &MemoryBlock) -> Result<()>;
}

pub(crate) struct PodArena {
    zeroinit: bool,
    data: Mutex<Vec<u8>>,
}

impl PodArena {
    pub(crate) fn new(initial_capacity: usize, zeroinit: bool) -> Self {
        Self {
            zeroinit,
            data: Mutex::new(Vec::with_capacity(initial_capacity)),
        }
    }

    fn allocate(&self, size: usize, alignment: usize) -> Result<usize> {
        if !alignment.is_power_of_two() {
            return Err(Error::Memory(format!(
                "allocation alignment {} is not a power of two",
                alignment
            )));
        }
        let mut data = self.data.lock();
        let offset = range_end(data.len(), alignment - 1)? & !(alignment - 1);
        data.resize(range_end(offset, size)?, 0);
        Ok(offset)
    }

    fn resize(&self, offset: usize, old_size: usize, new_size: usize) -> Result<usize> {
        let mut data = self.data.lock();
        let end = range_end(offset, old_size)?;
        if end > data.len() {
            return Err(Error::Memory(format!(
                "resize of [{}, {}) exceeds block size {}",
                offset,
                end,
                data.len()
            )));
        }
        // The most recent allocation grows in place.
        if end == data.len() {
            data.resize(range_end(offset, new_size)?, 0);
            return Ok(offset);
        }
        if new_size <= old_size {
            if self.zeroinit {
                data[offset + new_size..end].fill(0);
            }
            return Ok(offset);
        }
        let new_offset = data.len();
        let new_end = range_end(new_offset, new_size)?;
        data.extend_from_within(offset..end);
        data.resize(new_end, 0);
        Ok(new_offset)
    }

    pub(crate) fn read(&self, offset: usize, len: usize) -> Result<Vec<u8>> {
        let end = range_end(offset, len)?;
        let data = self.data.lock();
        data.get(offset..end)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| out_of_bounds(offset, len, data.len()))
    }

    pub(crate) fn write(&self, offset: usize, bytes: &[u8]) -> Result<()> {
        let end = range_end(offset, bytes.len())?;
        let mut data = self.data.lock();
        let size = data.len();
        data.get_mut(offset..end)
            .ok_or_else(|| out_of_bounds(offset, bytes.len(), size))?
            .copy_from_slice(bytes);
        Ok(())
    }

    pub(crate) fn debug_print(&self, out: &mut dyn fmt::Write, indent: &str) -> fmt::Result {
        let data = self.data.lock();
        writeln!(out, "{} allocated bytes: {}", indent, data.len())?;
        writeln!(out, "{} capacity: {}", indent, data.capacity())
    }
}

pub(crate) struct FixedSizePod {
    alignment: usize,
    data: Mutex<Vec<u8>>,
}

impl FixedSizePod {
    pub(crate) fn read(&self, offset: usize, len: usize) -> Result<Vec<u8>> {
        let end = range_end(offset, len)?;
        let data = self.data.lock();
        data.get(offset..end)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| out_of_bounds(offset, len, data.len()))
    }

    pub(crate) fn write(&self, offset: usize, bytes: &[u8]) -> Result<()> {
        let end = range_end(offset, bytes.len())?;
        let mut data = self.data.lock();
        let size = data.len();
        data.get_mut(offset..end)
            .ok_or_else(|| out_of_bounds(offset, bytes.len(), size))?
            .copy_from_slice(bytes);
        Ok(())
    }

    pub(crate) fn debug_print(&self, out: &mut dyn fmt::Write, indent: &str) -> fmt::Result {
        writeln!(out, "{} size: {}", indent, self.data.lock().len())?;
        writeln!(out, "{} alignment: {}", indent, self.alignment)
    }
}

fn out_of_bounds(offset: usize, len: usize, size: usize) -> Error {
    Error::Memory(format!(
        "access [{}, {}) out of bounds for block of {} bytes",
        offset,
        offset.saturating_add(len),
        size
    ))
}

pub(crate) struct PodApi {
    block_type: MemoryBlockType,
}

pub(crate) static POD_ALLOCATOR_API: PodApi = PodApi {
    block_type: MemoryBlockType::Pod,
};

pub(crate) static ZEROINIT_ALLOCATOR_API: PodApi = PodApi {
    block_type: MemoryBlockType::ZeroInit,
};

impl PodApi {
    fn arena<'a>(&self, block: &'a MemoryBlock) -> Result<&'a PodArena> {
        let tag = block.block_type()?;
        match block.payload() {
            Payload::Pod(arena) if tag == self.block_type => Ok(arena),
            _ => Err(Error::Corruption(format!(
                "{} allocator API applied to a {} memory block",
                self.block_type, tag
            ))),
        }
    }
}

impl PodAllocatorApi for PodApi {
    fn allocate(&self, block: &MemoryBlock, size: usize, alignment: usize) -> Result<usize> {
        self.arena(block)?.allocate(size, alignment)
    }

    fn resize(
        &self,
        block: &MemoryBlock,
        offset: usize,
        old_size: usize,
        new_size: usize,
    ) -> Result<usize> {
        self.arena(block)?.resize(offset, old_size, new_size)
    }

    fn finalize(&self, block: &MemoryBlock) -> Result<()> {
        self.arena(block)?.data.lock().shrink_to_fit();
        Ok(())
    }
}

/// Creates a growable POD block.
pub fn make_pod_memory_block(initial_capacity: usize) -> MemoryBlock {
    MemoryBlock::new(
        MemoryBlockType::Pod,
        Payload::Pod(PodArena::new(initial_capacity, false)),
    )
}

/// Creates a growable block whose allocations always start zeroed.
pub fn make_zeroinit_memory_block(initial_capacity: usize) -> MemoryBlock {
    MemoryBlock::new(
        MemoryBlockType::ZeroInit,
        Payload::Pod(PodArena::new(initial_capacity, true)),
    )
}

/// Creates a block holding exactly `size` zeroed bytes.
pub fn make_fixed_size_pod_memory_block(size: usize, alignment: usize) -> MemoryBlock {
    MemoryBlock::new(
        MemoryBlockType::FixedSizePod,
        Payload::FixedSizePod(FixedSizePod {
            alignment,
            data: Mutex::new(vec![0; size]),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memblock::get_pod_allocator_api;

    #[test]
    fn test_allocate_respects_alignment() {
        let block = make_pod_memory_block(0);
        let api = get_pod_allocator_api(&block).expect("pod api");
        let a = api.allocate(&block, 3, 1).expect("alloc");
        let b = api.allocate(&block, 8, 8).expect("alloc");
        assert_eq!(a, 0);
        assert_eq!(b, 8);
        assert!(api.allocate(&block, 4, 3).is_err());
    }

    #[test]
    fn test_resize_last_allocation_in_place() {
        let block = make_zeroinit_memory_block(16);
        let api = get_pod_allocator_api(&block).expect("zeroinit api");
        let off = api.allocate(&block, 4, 4).expect("alloc");
        block.write(off, b"abcd").expect("write");
        let grown = api.resize(&block, off, 4, 10).expect("resize");
        assert_eq!(grown, off);
        assert_eq!(block.read(off, 10).expect("read"), b"abcd\0\0\0\0\0\0");
    }

    #[test]
    fn test_resize_earlier_allocation_moves() {
        let block = make_pod_memory_block(16);
        let api = get_pod_allocator_api(&block).expect("pod api");
        let first = api.allocate(&block, 2, 1).expect("alloc");
        block.write(first, b"hi").expect("write");
        let _second = api.allocate(&block, 2, 1).expect("alloc");
        let moved = api.resize(&block, first, 2, 5).expect("resize");
        assert_ne!(moved, first);
        assert_eq!(&block.read(moved, 2).expect("read"), b"hi");
        api.finalize(&block).expect("finalize");
    }

    #[test]
    fn test_wrong_api_for_block_is_corruption() {
        let block = make_pod_memory_block(0);
        assert!(matches!(
            ZEROINIT_ALLOCATOR_API.allocate(&block, 1, 1),
            Err(Error::Corruption(_))
        ));
    }

    #[test]
    fn test_fixed_size_bounds() {
        let block = make_fixed_size_pod_memory_block(4, 4);
        block.write(0, &[1, 2, 3, 4]).expect("write");
        assert!(block.write(2, &[0, 0, 0]).is_err());
        assert_eq!(block.read(1, 2).expect("read"), vec![2, 3]);
    }

    #[test]
    fn test_overflowing_range_is_rejected() {
        let block = make_pod_memory_block(0);
        let api = get_pod_allocator_api(&block).expect("pod api");
        let off = api.allocate(&block, 4, 1).expect("alloc");
        assert!(matches!(block.read(usize::MAX, 2), Err(Error::Memory(_))));
        assert!(matches!(block.write(off + 1, &[0; 4]), Err(Error::Memory(_))));
        assert!(matches!(
            api.resize(&block, usize::MAX - 1, 4, 8),
            Err(Error::Memory(_))
        ));

        let fixed = make_fixed_size_pod_memory_block(8, 8);
        assert!(matches!(fixed.read(1, usize::MAX), Err(Error::Memory(_))));
    }
}
