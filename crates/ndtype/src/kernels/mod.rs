// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Kernel instantiation protocol.
//!
//! A kernel is a slot in a [`KernelBuilder`] arena, addressed by its offset (slot
//! index). Each slot holds a [`KernelPrefix`]: exactly one function shape chosen at
//! instantiation ([`KernelRequest`]), an optional destructor, typed kernel data and the
//! relative offsets of its child kernels.
//!
//! # Lifecycle
//!
//! ```text
//! make_*_kernel(builder, offset, ..)      children first at offset+1.., then the
//!        |                                parent is constructed at `offset`
//!        v
//! KernelBuilder::construct(offset, prefix)  fails if the slot is occupied
//!        |
//!        v
//! builder.get(offset)?.call_single(..)    any number of calls, `&self` only
//!        |
//!        v
//! KernelBuilder::destroy(offset)          destructor runs once, children follow;
//!                                         remaining slots are destroyed on drop
//! ```
//!
//! Slots never move: children are found through offsets relative to their parent,
//! so growing the arena never invalidates a constructed kernel.

pub mod assignment;
pub mod chain;
pub mod comparison;
pub mod errmode;
mod pod_copy;
pub mod string_kernels;
pub mod struct_kernels;

pub use assignment::{
    assign_element, is_lossless_assignment, make_assignment_kernel, make_builtin_assignment_kernel,
};
pub use chain::make_buffered_chain_kernel;
pub use comparison::{compare_elements, make_comparison_kernel, ComparisonType};
pub use errmode::AssignErrorMode;
pub use pod_copy::make_pod_copy_kernel;

use crate::error::{Error, Result};
use std::any::Any;
use std::fmt;

/// Call shape requested at instantiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelRequest {
    /// One element per call.
    Single,
    /// `count` elements per call with explicit byte strides.
    Strided,
    /// Boolean verdict over the source operands.
    Predicate,
}

/// Strides known at instantiation time, used to pick contiguous fast paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedStrides {
    pub dst: Option<usize>,
    pub src: Option<usize>,
}

impl FixedStrides {
    pub const UNKNOWN: FixedStrides = FixedStrides {
        dst: None,
        src: None,
    };

    pub const fn contiguous(element_size: usize) -> Self {
        FixedStrides {
            dst: Some(element_size),
            src: Some(element_size),
        }
    }
}

/// Writes one destination element from one element of each source.
pub type SingleFn = fn(dst: &mut [u8], src: &[&[u8]], kernel: KernelRef<'_>) -> Result<()>;

/// Processes `count` elements; element `i` of an operand starts at `i * stride`.
pub type StridedFn = fn(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[&[u8]],
    src_strides: &[usize],
    count: usize,
    kernel: KernelRef<'_>,
) -> Result<()>;

/// Returns a verdict about one element of each source.
pub type PredicateFn = fn(src: &[&[u8]], kernel: KernelRef<'_>) -> Result<bool>;

/// Runs once when a slot is destroyed, before its data is dropped.
pub type KernelDestructor = fn(builder: &mut KernelBuilder, offset: usize, prefix: &KernelPrefix);

/// The function baked into a kernel slot.
#[derive(Clone, Copy)]
pub enum KernelFunction {
    Single(SingleFn),
    Strided(StridedFn),
    Predicate(PredicateFn),
}

impl KernelFunction {
    pub fn request(&self) -> KernelRequest {
        match self {
            KernelFunction::Single(_) => KernelRequest::Single,
            KernelFunction::Strided(_) => KernelRequest::Strided,
            KernelFunction::Predicate(_) => KernelRequest::Predicate,
        }
    }
}

/// Contents of one kernel slot.
pub struct KernelPrefix {
    function: KernelFunction,
    destructor: Option<KernelDestructor>,
    children: Vec<usize>,
    data: Option<Box<dyn Any + Send + Sync>>,
}

impl KernelPrefix {
    pub fn new(function: KernelFunction) -> Self {
        Self {
            function,
            destructor: None,
            children: Vec::new(),
            data: None,
        }
    }

    /// Picks the unary function matching `kernreq`; predicates are rejected.
    pub fn unary(kernreq: KernelRequest, single: SingleFn, strided: StridedFn) -> Result<Self> {
        match kernreq {
            KernelRequest::Single => Ok(Self::new(KernelFunction::Single(single))),
            KernelRequest::Strided => Ok(Self::new(KernelFunction::Strided(strided))),
            KernelRequest::Predicate => Err(Error::InvalidKernelRequest(
                "a predicate was requested from an assignment kernel".into(),
            )),
        }
    }

    pub fn with_data<T: Any + Send + Sync>(mut self, data: T) -> Self {
        self.data = Some(Box::new(data));
        self
    }

    /// Registers a child kernel at `relative` slots after this one.
    ///
    /// The first child registration installs [`destroy_child_kernels`] unless a
    /// destructor was already set.
    pub fn with_child(mut self, relative: usize) -> Self {
        self.children.push(relative);
        if self.destructor.is_none() {
            self.destructor = Some(destroy_child_kernels);
        }
        self
    }

    pub fn with_destructor(mut self, destructor: KernelDestructor) -> Self {
        self.destructor = Some(destructor);
        self
    }

    pub fn function(&self) -> KernelFunction {
        self.function
    }

    pub fn children(&self) -> &[usize] {
        &self.children
    }

    pub fn data<T: Any>(&self) -> Option<&T> {
        self.data.as_ref().and_then(|d| d.downcast_ref::<T>())
    }
}

impl fmt::Debug for KernelPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelPrefix")
            .field("request", &self.function.request())
            .field("children", &self.children)
            .field("has_destructor", &self.destructor.is_some())
            .finish()
    }
}

/// Destroys every registered child of `prefix`.
pub fn destroy_child_kernels(builder: &mut KernelBuilder, offset: usize, prefix: &KernelPrefix) {
    for &relative in prefix.children() {
        if relative != 0 {
            builder.destroy(offset + relative);
        }
    }
}

/// Arena of kernel slots.
#[derive(Default)]
pub struct KernelBuilder {
    slots: Vec<Option<KernelPrefix>>,
}

impl KernelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots (constructed or not).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Grows the arena so that slots `..end` exist.
    pub fn ensure_capacity(&mut self, end: usize) {
        if self.slots.len() < end {
            self.slots.resize_with(end, || None);
        }
    }

    /// Constructs a kernel in place. Each slot is constructed at most once.
    pub fn construct(&mut self, offset: usize, prefix: KernelPrefix) -> Result<()> {
        self.ensure_capacity(offset + 1);
        let slot = &mut self.slots[offset];
        if slot.is_some() {
            return Err(Error::InvalidKernelRequest(format!(
                "kernel slot {} is already constructed",
                offset
            )));
        }
        *slot = Some(prefix);
        Ok(())
    }

    /// Builds the children of a parent kernel at `offset` and then the parent itself.
    ///
    /// `build` constructs children after `offset` and finally the parent at `offset`,
    /// returning the end offset. If it fails, every child it constructed is destroyed
    /// before the error is returned, so a failed negotiation leaves the arena as it was.
    pub fn construct_with_children<F>(&mut self, offset: usize, build: F) -> Result<usize>
    where
        F: FnOnce(&mut Self) -> Result<usize>,
    {
        if self.is_constructed(offset) {
            return Err(Error::InvalidKernelRequest(format!(
                "kernel slot {} is already constructed",
                offset
            )));
        }
        self.ensure_capacity(offset + 1);
        let occupied: Vec<usize> = (offset + 1..self.slots.len())
            .filter(|&slot| self.is_constructed(slot))
            .collect();
        let result = build(self);
        if result.is_err() {
            let built: Vec<usize> = (offset..self.slots.len())
                .filter(|slot| self.is_constructed(*slot) && !occupied.contains(slot))
                .collect();
            for slot in built {
                self.destroy(slot);
            }
        }
        result
    }

    pub fn is_constructed(&self, offset: usize) -> bool {
        matches!(self.slots.get(offset), Some(Some(_)))
    }

    /// Destroys the kernel at `offset` and its children. Destroying an empty slot is a no-op.
    pub fn destroy(&mut self, offset: usize) {
        let prefix = match self.slots.get_mut(offset).and_then(Option::take) {
            Some(prefix) => prefix,
            None => return,
        };
        if let Some(destructor) = prefix.destructor {
            destructor(self, offset, &prefix);
        }
    }

    /// Destroys all kernels and empties the arena.
    pub fn reset(&mut self) {
        for offset in 0..self.slots.len() {
            self.destroy(offset);
        }
        self.slots.clear();
    }

    /// Borrows the constructed kernel at `offset`.
    pub fn get(&self, offset: usize) -> Result<KernelRef<'_>> {
        if !self.is_constructed(offset) {
            return Err(Error::InvalidKernelRequest(format!(
                "no kernel constructed at slot {}",
                offset
            )));
        }
        Ok(KernelRef {
            builder: self,
            offset,
        })
    }
}

impl Drop for KernelBuilder {
    fn drop(&mut self) {
        self.reset();
    }
}

impl fmt::Debug for KernelBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.slots.iter()).finish()
    }
}

/// Borrowed view of a constructed kernel, passed to kernel functions.
#[derive(Clone, Copy)]
pub struct KernelRef<'a> {
    builder: &'a KernelBuilder,
    offset: usize,
}

impl<'a> KernelRef<'a> {
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn prefix(&self) -> Result<&'a KernelPrefix> {
        self.builder
            .slots
            .get(self.offset)
            .and_then(Option::as_ref)
            .ok_or_else(|| {
                Error::InvalidKernelRequest(format!("kernel slot {} was destroyed", self.offset))
            })
    }

    /// Typed kernel data.
    pub fn data<T: Any>(&self) -> Result<&'a T> {
        self.prefix()?.data::<T>().ok_or_else(|| {
            Error::Corruption(format!(
                "kernel slot {} does not hold {}",
                self.offset,
                std::any::type_name::<T>()
            ))
        })
    }

    /// The `index`-th registered child.
    pub fn child(&self, index: usize) -> Result<KernelRef<'a>> {
        let relative = *self.prefix()?.children.get(index).ok_or_else(|| {
            Error::Corruption(format!(
                "kernel slot {} has no child {}",
                self.offset, index
            ))
        })?;
        self.builder.get(self.offset + relative)
    }

    pub fn call_single(&self, dst: &mut [u8], src: &[&[u8]]) -> Result<()> {
        match self.prefix()?.function {
            KernelFunction::Single(f) => f(dst, src, *self),
            other => Err(shape_mismatch(KernelRequest::Single, other.request())),
        }
    }

    pub fn call_strided(
        &self,
        dst: &mut [u8],
        dst_stride: usize,
        src: &[&[u8]],
        src_strides: &[usize],
        count: usize,
    ) -> Result<()> {
        if src.len() != src_strides.len() {
            return Err(Error::InvalidKernelRequest(format!(
                "{} sources but {} source strides",
                src.len(),
                src_strides.len()
            )));
        }
        match self.prefix()?.function {
            KernelFunction::Strided(f) => f(dst, dst_stride, src, src_strides, count, *self),
            other => Err(shape_mismatch(KernelRequest::Strided, other.request())),
        }
    }

    pub fn call_predicate(&self, src: &[&[u8]]) -> Result<bool> {
        match self.prefix()?.function {
            KernelFunction::Predicate(f) => f(src, *self),
            other => Err(shape_mismatch(KernelRequest::Predicate, other.request())),
        }
    }
}

fn shape_mismatch(requested: KernelRequest, constructed: KernelRequest) -> Error {
    Error::InvalidKernelRequest(format!(
        "called as {:?} but constructed as {:?}",
        requested, constructed
    ))
}

/// Element `index` of a strided operand (the slice runs to the end of the buffer).
pub(crate) fn element(buf: &[u8], index: usize, stride: usize) -> Result<&[u8]> {
    let start = index * stride;
    buf.get(start..).ok_or_else(|| {
        Error::Memory(format!(
            "strided element {} at byte {} outside buffer of {} bytes",
            index,
            start,
            buf.len()
        ))
    })
}

pub(crate) fn element_mut(buf: &mut [u8], index: usize, stride: usize) -> Result<&mut [u8]> {
    let start = index * stride;
    let len = buf.len();
    buf.get_mut(start..).ok_or_else(|| {
        Error::Memory(format!(
            "strided element {} at byte {} outside buffer of {} bytes",
            index, start, len
        ))
    })
}

/// First source operand of a unary kernel.
pub(crate) fn unary_source<'s>(src: &[&'s [u8]]) -> Result<&'s [u8]> {
    src.first()
        .copied()
        .ok_or_else(|| Error::InvalidKernelRequest("unary kernel called without a source".into()))
}

/// Drives a per-element closure over a strided call with up to two sources.
pub(crate) fn strided_loop<F>(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[&[u8]],
    src_strides: &[usize],
    count: usize,
    mut op: F,
) -> Result<()>
where
    F: FnMut(&mut [u8], &[&[u8]]) -> Result<()>,
{
    let arity = src.len();
    if arity > 2 {
        return Err(Error::InvalidKernelRequest(format!(
            "strided loop supports at most 2 sources, got {}",
            arity
        )));
    }
    let mut args: [&[u8]; 2] = [&[], &[]];
    for i in 0..count {
        for j in 0..arity {
            args[j] = element(src[j], i, src_strides[j])?;
        }
        op(element_mut(dst, i, dst_stride)?, &args[..arity])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests;
