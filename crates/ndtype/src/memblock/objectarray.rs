// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object-array memory blocks: element storage for a single element type.
//!
//! Allocations are counted in elements. Every allocated element is default-initialized
//! (zeroed) and released together with the block.

use super::{range_end, MemoryBlock, MemoryBlockType, Payload};
use crate::error::{Error, Result};
use crate::types::DType;
use parking_lot::Mutex;

/// Allocator interface of `objectarray` blocks.
pub trait ObjectArrayAllocatorApi: Sync {
    /// Reserves `count` elements, returning the byte offset of the first.
    fn allocate(&self, block: &MemoryBlock, count: usize) -> Result<usize>;
    /// Resizes an allocation of `old_count` elements, returning its byte offset.
    fn resize(
        &self,
        block: &MemoryBlock,
        offset: usize,
        old_count: usize,
        new_count: usize,
    ) -> Result<usize>;
    fn finalize(&self, block: &MemoryBlock) -> Result<()>;
}

pub(crate) struct ObjectArray {
    element_type: DType,
    data: Mutex<Vec<u8>>,
}

impl ObjectArray {
    fn stride(&self) -> usize {
        let size = self.element_type.element_size();
        let align = self.element_type.alignment() as usize;
        (size + align - 1) & !(align - 1)
    }

    pub(crate) fn read(&self, offset: usize, len: usize) -> Result<Vec<u8>> {
        let end = range_end(offset, len)?;
        let data = self.data.lock();
        data.get(offset..end)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| Error::Memory(format!("objectarray read at {} out of bounds", offset)))
    }

    pub(crate) fn write(&self, offset: usize, bytes: &[u8]) -> Result<()> {
        let end = range_end(offset, bytes.len())?;
        self.data
            .lock()
            .get_mut(offset..end)
            .ok_or_else(|| Error::Memory(format!("objectarray write at {} out of bounds", offset)))?
            .copy_from_slice(bytes);
        Ok(())
    }
}

fn span(count: usize, stride: usize) -> Result<usize> {
    count.checked_mul(stride).ok_or_else(|| {
        Error::Memory(format!("objectarray of {} elements overflows the address space", count))
    })
}

pub(crate) struct ObjectArrayApi;

pub(crate) static OBJECTARRAY_ALLOCATOR_API: ObjectArrayApi = ObjectArrayApi;

fn objects(block: &MemoryBlock) -> Result<&ObjectArray> {
    match block.payload() {
        Payload::ObjectArray(objects) => Ok(objects),
        _ => Err(Error::Corruption(
            "objectarray allocator API applied to another memory block type".into(),
        )),
    }
}

impl ObjectArrayAllocatorApi for ObjectArrayApi {
    fn allocate(&self, block: &MemoryBlock, count: usize) -> Result<usize> {
        let objects = objects(block)?;
        let stride = objects.stride();
        let mut data = objects.data.lock();
        let offset = data.len();
        data.resize(range_end(offset, span(count, stride)?)?, 0);
        Ok(offset)
    }

    fn resize(
        &self,
        block: &MemoryBlock,
        offset: usize,
        old_count: usize,
        new_count: usize,
    ) -> Result<usize> {
        let objects = objects(block)?;
        let stride = objects.stride();
        let mut data = objects.data.lock();
        let end = range_end(offset, span(old_count, stride)?)?;
        let new_len = span(new_count, stride)?;
        if end == data.len() {
            data.resize(range_end(offset, new_len)?, 0);
            return Ok(offset);
        }
        if end > data.len() {
            return Err(Error::Memory(format!(
                "objectarray resize at {} out of bounds",
                offset
            )));
        }
        let new_offset = data.len();
        let keep = old_count.min(new_count) * stride;
        let new_end = range_end(new_offset, new_len)?;
        data.extend_from_within(offset..offset + keep);
        data.resize(new_end, 0);
        Ok(new_offset)
    }

    fn finalize(&self, block: &MemoryBlock) -> Result<()> {
        objects(block)?.data.lock().shrink_to_fit();
        Ok(())
    }
}

/// Creates an object-array block for elements of `element_type`.
pub fn make_objectarray_memory_block(
    element_type: &DType,
    initial_count: usize,
) -> Result<MemoryBlock> {
    if element_type.element_size() == 0 {
        return Err(Error::Construction(format!(
            "Cannot create an objectarray memory block for type {} without a fixed element size",
            element_type
        )));
    }
    Ok(MemoryBlock::new(
        MemoryBlockType::ObjectArray,
        Payload::ObjectArray(ObjectArray {
            element_type: element_type.clone(),
            data: Mutex::new(Vec::with_capacity(initial_count * element_type.element_size())),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memblock::get_objectarray_allocator_api;
    use crate::types::TypeId;

    #[test]
    fn test_allocate_counts_elements() {
        let int32 = DType::builtin(TypeId::Int32).expect("builtin");
        let block = make_objectarray_memory_block(&int32, 4).expect("block");
        let api = get_objectarray_allocator_api(&block).expect("api");
        assert_eq!(api.allocate(&block, 3).expect("alloc"), 0);
        assert_eq!(api.allocate(&block, 1).expect("alloc"), 12);
        let moved = api.resize(&block, 0, 3, 5).expect("resize");
        assert_eq!(moved, 16);
        api.finalize(&block).expect("finalize");
    }

    #[test]
    fn test_void_elements_rejected() {
        let void = DType::builtin(TypeId::Void).expect("builtin");
        assert!(make_objectarray_memory_block(&void, 1).is_err());
    }
}
