// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reference-counted memory blocks.
//!
//! A [`MemoryBlock`] is an `Arc`-shared allocation carrying a raw type tag in its
//! header. Every dispatch point (release, debug printing, allocator API lookup)
//! decodes the tag through [`MemoryBlockType::try_from`]; a tag outside the closed set
//! is reported as [`Error::Corruption`], never treated as bad user input.
//!
//! # Block kinds
//!
//! | Tag | Factory | Allocator API |
//! |-----|---------|---------------|
//! | `pod` | [`make_pod_memory_block`] | [`PodAllocatorApi`] |
//! | `zeroinit` | [`make_zeroinit_memory_block`] | [`PodAllocatorApi`] |
//! | `fixed_size_pod` | [`make_fixed_size_pod_memory_block`] | none |
//! | `objectarray` | [`make_objectarray_memory_block`] | [`ObjectArrayAllocatorApi`] |
//! | `external` | [`make_external_memory_block`] | none |
//! | `executable` | [`make_executable_memory_block`] (unix) | none |
//! | `memmap` | [`make_memmap_memory_block`] (unix) | none |
//! | `array` | owned by the array container | none |

mod external;
#[cfg(unix)]
mod mapped;
mod objectarray;
mod pod;

pub use external::make_external_memory_block;
#[cfg(unix)]
pub use mapped::{
    allocate_executable_memory, make_executable_memory_block, make_memmap_memory_block,
    seal_executable_memory_block,
};
pub use objectarray::{make_objectarray_memory_block, ObjectArrayAllocatorApi};
pub use pod::{
    make_fixed_size_pod_memory_block, make_pod_memory_block, make_zeroinit_memory_block,
    PodAllocatorApi,
};

use crate::error::{Error, Result};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// End of the byte range `[offset, offset + len)`.
///
/// Offsets read back from element data are untrusted, so the sum is checked.
pub(crate) fn range_end(offset: usize, len: usize) -> Result<usize> {
    offset.checked_add(len).ok_or_else(|| {
        Error::Memory(format!(
            "byte range at {} of length {} overflows the address space",
            offset, len
        ))
    })
}

/// Memory block tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MemoryBlockType {
    External = 0,
    FixedSizePod = 1,
    Pod = 2,
    ZeroInit = 3,
    ObjectArray = 4,
    Executable = 5,
    Array = 6,
    Memmap = 7,
}

impl MemoryBlockType {
    pub const fn name(self) -> &'static str {
        match self {
            MemoryBlockType::External => "external",
            MemoryBlockType::FixedSizePod => "fixed_size_pod",
            MemoryBlockType::Pod => "pod",
            MemoryBlockType::ZeroInit => "zeroinit",
            MemoryBlockType::ObjectArray => "objectarray",
            MemoryBlockType::Executable => "executable",
            MemoryBlockType::Array => "array",
            MemoryBlockType::Memmap => "memmap",
        }
    }
}

impl TryFrom<u8> for MemoryBlockType {
    type Error = Error;

    fn try_from(raw: u8) -> Result<Self> {
        Ok(match raw {
            0 => MemoryBlockType::External,
            1 => MemoryBlockType::FixedSizePod,
            2 => MemoryBlockType::Pod,
            3 => MemoryBlockType::ZeroInit,
            4 => MemoryBlockType::ObjectArray,
            5 => MemoryBlockType::Executable,
            6 => MemoryBlockType::Array,
            7 => MemoryBlockType::Memmap,
            other => {
                return Err(Error::Corruption(format!(
                    "unrecognized memory block type, {}, likely memory corruption",
                    other
                )))
            }
        })
    }
}

impl fmt::Display for MemoryBlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) enum Payload {
    External(external::ExternalObject),
    FixedSizePod(pod::FixedSizePod),
    Pod(pod::PodArena),
    ObjectArray(objectarray::ObjectArray),
    #[cfg(unix)]
    Executable(mapped::ExecutableRegion),
    #[cfg(unix)]
    Memmap(mapped::MemmapRegion),
}

pub(crate) struct MemoryBlockData {
    raw_type: u8,
    payload: Payload,
}

impl Drop for MemoryBlockData {
    fn drop(&mut self) {
        match MemoryBlockType::try_from(self.raw_type) {
            Ok(tag) => log::trace!("[ndtype::memblock] releasing {} memory block", tag),
            Err(e) => log::error!("[ndtype::memblock] {}", e),
        }
    }
}

/// Shared handle to a memory block.
#[derive(Clone)]
pub struct MemoryBlock {
    inner: Arc<MemoryBlockData>,
}

impl MemoryBlock {
    pub(crate) fn new(block_type: MemoryBlockType, payload: Payload) -> Self {
        log::trace!("[ndtype::memblock] creating {} memory block", block_type);
        Self {
            inner: Arc::new(MemoryBlockData {
                raw_type: block_type as u8,
                payload,
            }),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_raw_tag(raw_type: u8, payload: Payload) -> Self {
        Self {
            inner: Arc::new(MemoryBlockData { raw_type, payload }),
        }
    }

    /// Decodes the header tag.
    pub fn block_type(&self) -> Result<MemoryBlockType> {
        MemoryBlockType::try_from(self.inner.raw_type)
    }

    /// Number of handles sharing this block.
    pub fn use_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    pub fn ptr_eq(&self, other: &MemoryBlock) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn payload(&self) -> &Payload {
        &self.inner.payload
    }

    /// Copies `len` bytes starting at `offset`.
    pub fn read(&self, offset: usize, len: usize) -> Result<Vec<u8>> {
        match self.payload() {
            Payload::Pod(arena) => arena.read(offset, len),
            Payload::FixedSizePod(fixed) => fixed.read(offset, len),
            Payload::ObjectArray(objects) => objects.read(offset, len),
            #[cfg(unix)]
            Payload::Executable(region) => region.read(offset, len),
            #[cfg(unix)]
            Payload::Memmap(region) => region.read(offset, len),
            Payload::External(_) => Err(Error::Memory(
                "external memory blocks expose no byte storage".into(),
            )),
        }
    }

    /// Overwrites bytes starting at `offset`.
    pub fn write(&self, offset: usize, bytes: &[u8]) -> Result<()> {
        match self.payload() {
            Payload::Pod(arena) => arena.write(offset, bytes),
            Payload::FixedSizePod(fixed) => fixed.write(offset, bytes),
            Payload::ObjectArray(objects) => objects.write(offset, bytes),
            #[cfg(unix)]
            Payload::Executable(region) => region.write(offset, bytes),
            #[cfg(unix)]
            Payload::Memmap(_) => Err(Error::Memory("memmap memory blocks are read-only".into())),
            Payload::External(_) => Err(Error::Memory(
                "external memory blocks expose no byte storage".into(),
            )),
        }
    }

    /// Borrows the foreign object owned by an external block.
    pub fn external_object<T: Any>(&self) -> Option<&T> {
        match self.payload() {
            Payload::External(object) => object.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl fmt::Debug for MemoryBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBlock")
            .field("type", &self.block_type().map(MemoryBlockType::name).ok())
            .field("use_count", &self.use_count())
            .finish()
    }
}

/// Returns the POD allocator API of a `pod` or `zeroinit` block.
pub fn get_pod_allocator_api(block: &MemoryBlock) -> Result<&'static dyn PodAllocatorApi> {
    let what = match block.block_type()? {
        MemoryBlockType::Pod => return Ok(&pod::POD_ALLOCATOR_API),
        MemoryBlockType::ZeroInit => return Ok(&pod::ZEROINIT_ALLOCATOR_API),
        MemoryBlockType::External => "external",
        MemoryBlockType::FixedSizePod => "fixed_size_pod",
        MemoryBlockType::ObjectArray => "objectarray",
        MemoryBlockType::Executable => "executable",
        MemoryBlockType::Array => "array",
        MemoryBlockType::Memmap => "memmap",
    };
    Err(Error::Memory(format!(
        "Cannot get a POD allocator API from an {}_memory_block",
        what
    )))
}

/// Returns the object-array allocator API of an `objectarray` block.
pub fn get_objectarray_allocator_api(
    block: &MemoryBlock,
) -> Result<&'static dyn ObjectArrayAllocatorApi> {
    match block.block_type()? {
        MemoryBlockType::ObjectArray => Ok(&objectarray::OBJECTARRAY_ALLOCATOR_API),
        other => Err(Error::Memory(format!(
            "Cannot get an objectarray allocator API from a {} memory block",
            other
        ))),
    }
}

/// Writes a human-readable dump of a block (or of its absence).
pub fn memory_block_debug_print(
    block: Option<&MemoryBlock>,
    out: &mut dyn fmt::Write,
    indent: &str,
) -> fmt::Result {
    let block = match block {
        Some(block) => block,
        None => return writeln!(out, "{}------ NULL memory block", indent),
    };
    writeln!(
        out,
        "{}------ memory_block at {:p}",
        indent,
        Arc::as_ptr(&block.inner)
    )?;
    writeln!(out, "{} reference count: {}", indent, block.use_count())?;
    match block.block_type() {
        Ok(tag) => writeln!(out, "{} type: {}", indent, tag)?,
        Err(_) => writeln!(
            out,
            "{} type: unknown memory_block_type({})",
            indent, block.inner.raw_type
        )?,
    }
    match block.payload() {
        Payload::External(object) => object.debug_print(out, indent)?,
        Payload::FixedSizePod(fixed) => fixed.debug_print(out, indent)?,
        Payload::Pod(arena) => arena.debug_print(out, indent)?,
        Payload::ObjectArray(_) => {}
        #[cfg(unix)]
        Payload::Executable(region) => region.debug_print(out, indent)?,
        #[cfg(unix)]
        Payload::Memmap(region) => region.debug_print(out, indent)?,
    }
    writeln!(out, "{}------", indent)
}
