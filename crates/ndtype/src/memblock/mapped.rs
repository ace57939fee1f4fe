// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `mmap`-backed memory blocks: executable code regions and read-only file maps.
//!
//! Both regions are unmapped when the last block reference is dropped.

use super::{range_end, MemoryBlock, MemoryBlockType, Payload};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::fmt;
use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};

pub(crate) struct ExecutableRegion {
    ptr: *mut u8,
    capacity: usize,
    used: Mutex<usize>,
    sealed: AtomicBool,
}

// SAFETY: the mapping is owned exclusively by this region; writes go through the
// `used` mutex-guarded bump allocator and are refused once the region is sealed.
unsafe impl Send for ExecutableRegion {}
unsafe impl Sync for ExecutableRegion {}

impl ExecutableRegion {
    fn map(capacity: usize) -> Result<Self> {
        // SAFETY:
        // - Null address lets the kernel choose the placement
        // - MAP_PRIVATE | MAP_ANONYMOUS needs no file descriptor (-1) and offset 0
        // - The region starts read/write; `seal` switches it to read/execute
        // - mmap returns MAP_FAILED on error (checked below)
        let raw = unsafe {
            libc::mmap(
                ptr::null_mut(),
                capacity,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if raw == libc::MAP_FAILED {
            return Err(Error::Io(io::Error::last_os_error()));
        }
        Ok(Self {
            ptr: raw as *mut u8,
            capacity,
            used: Mutex::new(0),
            sealed: AtomicBool::new(false),
        })
    }

    fn allocate(&self, size: usize, alignment: usize) -> Result<usize> {
        if !alignment.is_power_of_two() {
            return Err(Error::Memory(format!(
                "allocation alignment {} is not a power of two",
                alignment
            )));
        }
        if self.sealed.load(Ordering::Acquire) {
            return Err(Error::Memory("executable memory block is sealed".into()));
        }
        let mut used = self.used.lock();
        let offset = range_end(*used, alignment - 1)? & !(alignment - 1);
        if range_end(offset, size)? > self.capacity {
            return Err(Error::Memory(format!(
                "executable memory block exhausted: need {} bytes, {} available",
                size,
                self.capacity.saturating_sub(offset)
            )));
        }
        *used = range_end(offset, size)?;
        Ok(offset)
    }

    fn seal(&self) -> Result<()> {
        // SAFETY:
        // - ptr/capacity describe exactly the mapping created in `map`
        // - PROT_READ | PROT_EXEC is a valid protection for an anonymous private map
        let ret = unsafe {
            libc::mprotect(
                self.ptr as *mut libc::c_void,
                self.capacity,
                libc::PROT_READ | libc::PROT_EXEC,
            )
        };
        if ret != 0 {
            return Err(Error::Io(io::Error::last_os_error()));
        }
        self.sealed.store(true, Ordering::Release);
        Ok(())
    }

    pub(crate) fn read(&self, offset: usize, len: usize) -> Result<Vec<u8>> {
        if range_end(offset, len)? > *self.used.lock() {
            return Err(Error::Memory(format!(
                "executable read at {} past allocated bytes",
                offset
            )));
        }
        // SAFETY: [offset, offset + len) lies inside the allocated prefix of the mapping,
        // which is readable in both the writable and sealed states.
        let bytes = unsafe { std::slice::from_raw_parts(self.ptr.add(offset), len) };
        Ok(bytes.to_vec())
    }

    pub(crate) fn write(&self, offset: usize, bytes: &[u8]) -> Result<()> {
        if self.sealed.load(Ordering::Acquire) {
            return Err(Error::Memory("executable memory block is sealed".into()));
        }
        let used = self.used.lock();
        if range_end(offset, bytes.len())? > *used {
            return Err(Error::Memory(format!(
                "executable write at {} past allocated bytes",
                offset
            )));
        }
        // SAFETY: the range is inside the allocated prefix, the region is still
        // PROT_WRITE (not sealed), and the `used` lock serializes writers.
        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr(), self.ptr.add(offset), bytes.len());
        }
        Ok(())
    }

    pub(crate) fn debug_print(&self, out: &mut dyn fmt::Write, indent: &str) -> fmt::Result {
        writeln!(out, "{} executable memory at {:p}", indent, self.ptr)?;
        writeln!(
            out,
            "{} used: {} of {} bytes{}",
            indent,
            *self.used.lock(),
            self.capacity,
            if self.sealed.load(Ordering::Acquire) {
                " (sealed)"
            } else {
                ""
            }
        )
    }
}

impl Drop for ExecutableRegion {
    fn drop(&mut self) {
        // SAFETY: ptr/capacity come from the successful mmap in `map` and are unmapped once.
        unsafe {
            libc::munmap(self.ptr as *mut libc::c_void, self.capacity);
        }
    }
}

pub(crate) struct MemmapRegion {
    ptr: *mut u8,
    mapped_len: usize,
    begin: usize,
    end: usize,
    path: PathBuf,
}

// SAFETY: the mapping is read-only (PROT_READ) and owned by this region.
unsafe impl Send for MemmapRegion {}
unsafe impl Sync for MemmapRegion {}

impl MemmapRegion {
    fn bytes(&self) -> &[u8] {
        if self.mapped_len == 0 {
            return &[];
        }
        // SAFETY: [begin, end) was validated against the file length at map time and the
        // mapping lives as long as `self`.
        unsafe { std::slice::from_raw_parts(self.ptr.add(self.begin), self.end - self.begin) }
    }

    pub(crate) fn read(&self, offset: usize, len: usize) -> Result<Vec<u8>> {
        self.bytes()
            .get(offset..range_end(offset, len)?)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| Error::Memory(format!("memmap read at {} out of bounds", offset)))
    }

    pub(crate) fn debug_print(&self, out: &mut dyn fmt::Write, indent: &str) -> fmt::Result {
        writeln!(out, "{} file: {}", indent, self.path.display())?;
        writeln!(out, "{} range: [{}, {})", indent, self.begin, self.end)
    }
}

impl Drop for MemmapRegion {
    fn drop(&mut self) {
        if self.mapped_len > 0 {
            // SAFETY: ptr/mapped_len come from the successful mmap in
            // `make_memmap_memory_block` and are unmapped once.
            unsafe {
                libc::munmap(self.ptr as *mut libc::c_void, self.mapped_len);
            }
        }
    }
}

/// Creates an executable block with room for `capacity` bytes of code.
///
/// Allocate and write while the block is writable, then call
/// [`seal_executable_memory_block`] to make it executable.
pub fn make_executable_memory_block(capacity: usize) -> Result<MemoryBlock> {
    let region = ExecutableRegion::map(capacity)?;
    Ok(MemoryBlock::new(
        MemoryBlockType::Executable,
        Payload::Executable(region),
    ))
}

/// Reserves `size` bytes inside an executable block.
pub fn allocate_executable_memory(
    block: &MemoryBlock,
    size: usize,
    alignment: usize,
) -> Result<usize> {
    match block.payload() {
        Payload::Executable(region) => region.allocate(size, alignment),
        _ => Err(Error::Memory(format!(
            "Cannot allocate executable memory from a {} memory block",
            block.block_type()?
        ))),
    }
}

/// Switches an executable block from read/write to read/execute.
pub fn seal_executable_memory_block(block: &MemoryBlock) -> Result<()> {
    match block.payload() {
        Payload::Executable(region) => region.seal(),
        _ => Err(Error::Memory(format!(
            "Cannot seal a {} memory block",
            block.block_type()?
        ))),
    }
}

/// Maps `path` read-only and exposes bytes `[begin, end)` (to end of file when `end` is `None`).
pub fn make_memmap_memory_block(
    path: &Path,
    begin: usize,
    end: Option<usize>,
) -> Result<MemoryBlock> {
    let file = File::open(path)?;
    let file_len = file.metadata()?.len() as usize;
    let end = end.unwrap_or(file_len);
    if begin > end || end > file_len {
        return Err(Error::Memory(format!(
            "memmap range [{}, {}) invalid for {} of {} bytes",
            begin,
            end,
            path.display(),
            file_len
        )));
    }

    let ptr = if file_len == 0 {
        ptr::null_mut()
    } else {
        // SAFETY:
        // - Null address lets the kernel choose the placement
        // - file_len > 0 and matches the file size read above
        // - PROT_READ with MAP_PRIVATE never writes back to the file
        // - The fd is valid for the duration of the call; the mapping keeps its own reference
        // - mmap returns MAP_FAILED on error (checked below)
        let raw = unsafe {
            libc::mmap(
                ptr::null_mut(),
                file_len,
                libc::PROT_READ,
                libc::MAP_PRIVATE,
                file.as_raw_fd(),
                0,
            )
        };
        if raw == libc::MAP_FAILED {
            return Err(Error::Io(io::Error::last_os_error()));
        }
        raw as *mut u8
    };

    log::debug!(
        "[ndtype::memblock] mapped {} bytes of {}",
        end - begin,
        path.display()
    );
    Ok(MemoryBlock::new(
        MemoryBlockType::Memmap,
        Payload::Memmap(MemmapRegion {
            ptr,
            mapped_len: file_len,
            begin,
            end,
            path: path.to_path_buf(),
        }),
    ))
}
