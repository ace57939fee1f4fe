// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Extended type descriptors.
//!
//! Every non-builtin [`DType`] is backed by one immutable [`ExtendedDType`] shared
//! through an `Arc`. The descriptor answers identity queries, prints types and
//! elements, drives the metadata and iteration-data lifecycles and takes part in
//! kernel negotiation.
//!
//! # Negotiation
//!
//! For assignment the destination descriptor is asked first. The provided
//! [`ExtendedDType::make_assignment_kernel`] implements the fallback: when the
//! destination cannot handle a pairing it forwards the request to the source
//! descriptor's hook, and the source's hook reports a type mismatch naming both
//! types if it cannot handle it either. Comparison follows the same order with the
//! first operand in the destination's role.

use crate::config::EvalContext;
use crate::error::{Error, Result};
use crate::kernels::{AssignErrorMode, ComparisonType, FixedStrides, KernelBuilder, KernelRequest};
use crate::memblock::MemoryBlock;
use crate::types::encoding::StringEncoding;
use crate::types::iterdata::IterData;
use crate::types::metadata::Metadata;
use crate::types::type_id::{MemoryManagement, TypeId, TypeKind};
use crate::types::DType;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// True when `tp` is backed by exactly the descriptor instance `this`.
pub fn is_descriptor_of<T: ?Sized>(this: &T, tp: &DType) -> bool {
    tp.extended()
        .map_or(false, |ext| std::ptr::addr_eq(this as *const T, Arc::as_ptr(ext)))
}

/// Fallback for a descriptor that cannot handle an assignment pairing.
///
/// When `this` backs the destination and the source has a different descriptor, the
/// request goes to the source's hook. Otherwise the pairing is a type mismatch.
pub fn forward_assignment_kernel<T: ?Sized>(
    this: &T,
    builder: &mut KernelBuilder,
    offset: usize,
    dst: &DType,
    dst_meta: &Metadata,
    src: &DType,
    src_meta: &Metadata,
    kernreq: KernelRequest,
    errmode: AssignErrorMode,
    ectx: &EvalContext,
) -> Result<usize> {
    if is_descriptor_of(this, dst) && !is_descriptor_of(this, src) {
        if let Some(src_ext) = src.extended() {
            log::debug!(
                "[ndtype::negotiate] {} declined assignment from {}, asking the source",
                dst,
                src
            );
            return src_ext.make_assignment_kernel(
                builder, offset, dst, dst_meta, src, src_meta, kernreq, errmode, ectx,
            );
        }
    }
    Err(Error::mismatch(dst, src, "no assignment kernel"))
}

/// Comparison counterpart of [`forward_assignment_kernel`], with `src0` first.
pub fn forward_comparison_kernel<T: ?Sized>(
    this: &T,
    builder: &mut KernelBuilder,
    offset: usize,
    src0: &DType,
    src0_meta: &Metadata,
    src1: &DType,
    src1_meta: &Metadata,
    comptype: ComparisonType,
    ectx: &EvalContext,
) -> Result<usize> {
    if is_descriptor_of(this, src0) && !is_descriptor_of(this, src1) {
        if let Some(other) = src1.extended() {
            return other.make_comparison_kernel(
                builder, offset, src0, src0_meta, src1, src1_meta, comptype, ectx,
            );
        }
    }
    Err(Error::NotComparable {
        lhs: src0.to_string(),
        rhs: src1.to_string(),
        comparison: comptype.symbol().to_string(),
    })
}

/// Polymorphic descriptor behind every non-builtin type.
pub trait ExtendedDType: fmt::Debug + Send + Sync + 'static {
    fn dtype_id(&self) -> TypeId;
    fn kind(&self) -> TypeKind;
    fn alignment(&self) -> u8;
    /// Fixed element size in bytes, 0 when the size depends on metadata.
    fn element_size(&self) -> usize;
    fn memory_management(&self) -> MemoryManagement;

    /// Renders one element. Must not mutate `data`.
    fn print_element(&self, out: &mut dyn fmt::Write, data: &[u8], metadata: &Metadata)
        -> Result<()>;
    /// Renders the type string, re-parsable by `DType::from_str`.
    fn print_dtype(&self, out: &mut dyn fmt::Write) -> fmt::Result;

    /// Structural equality; reflexive, symmetric and consistent with `DType` equality.
    fn equals(&self, other: &dyn ExtendedDType) -> bool;
    fn as_any(&self) -> &dyn Any;

    /// True when assigning `src` to `dst` can never lose information.
    fn is_lossless_assignment(&self, _dst: &DType, _src: &DType) -> bool {
        false
    }

    fn default_element_size(&self, _shape: &[isize]) -> usize {
        self.element_size()
    }

    fn is_scalar(&self) -> bool {
        true
    }

    fn ndim(&self) -> usize {
        0
    }

    /// Extent of each dimension, -1 when not known without metadata.
    fn get_shape(&self, _metadata: Option<&Metadata>) -> Vec<isize> {
        Vec::new()
    }

    /// Byte stride of each dimension, -1 when not a simple known stride.
    fn get_strides(&self, _metadata: Option<&Metadata>) -> Vec<isize> {
        Vec::new()
    }

    // --- Metadata lifecycle ---

    fn metadata_default_construct(&self, _shape: &[isize]) -> Result<Metadata> {
        Ok(Metadata::None)
    }

    /// Produces metadata that can be destructed independently of `src`.
    ///
    /// `embedded_reference`, when given, is the block the copied data now lives in.
    fn metadata_copy_construct(
        &self,
        src: &Metadata,
        _embedded_reference: Option<&MemoryBlock>,
    ) -> Result<Metadata> {
        match src {
            Metadata::None => Ok(Metadata::None),
            other => Err(Error::Construction(format!(
                "unexpected {} metadata for a type without metadata",
                other.kind_name()
            ))),
        }
    }

    /// Releases metadata. Calling it again on the result is a no-op.
    fn metadata_destruct(&self, metadata: &mut Metadata) {
        *metadata = Metadata::None;
    }

    fn metadata_debug_dump(
        &self,
        _metadata: &Metadata,
        _out: &mut dyn fmt::Write,
        _indent: &str,
    ) -> fmt::Result {
        Ok(())
    }

    // --- Iteration data lifecycle ---

    fn iterdata_construct(&self, _metadata: &Metadata) -> Result<IterData> {
        Ok(IterData::default())
    }

    fn iterdata_destruct(&self, iterdata: &mut IterData) {
        iterdata.clear();
    }

    // --- Kernel production ---

    /// Builds an assignment kernel at `offset`, returning the offset past it.
    ///
    /// The provided implementation is [`forward_assignment_kernel`].
    fn make_assignment_kernel(
        &self,
        builder: &mut KernelBuilder,
        offset: usize,
        dst: &DType,
        dst_meta: &Metadata,
        src: &DType,
        src_meta: &Metadata,
        kernreq: KernelRequest,
        errmode: AssignErrorMode,
        ectx: &EvalContext,
    ) -> Result<usize> {
        forward_assignment_kernel(
            self, builder, offset, dst, dst_meta, src, src_meta, kernreq, errmode, ectx,
        )
    }

    /// Builds a predicate kernel comparing `src0` with `src1`.
    ///
    /// The provided implementation is [`forward_comparison_kernel`].
    fn make_comparison_kernel(
        &self,
        builder: &mut KernelBuilder,
        offset: usize,
        src0: &DType,
        src0_meta: &Metadata,
        src1: &DType,
        src1_meta: &Metadata,
        comptype: ComparisonType,
        ectx: &EvalContext,
    ) -> Result<usize> {
        forward_comparison_kernel(
            self, builder, offset, src0, src0_meta, src1, src1_meta, comptype, ectx,
        )
    }

    // --- Capabilities ---

    fn as_expression(&self) -> Option<&dyn ExpressionDType> {
        None
    }

    fn as_string(&self) -> Option<&dyn StringDType> {
        None
    }
}

/// Descriptor of an expression-kind type: a value computed from an operand.
///
/// Chains are built bottom-up from strictly more primitive operands, so following
/// `operand_type` always reaches a non-expression storage type.
pub trait ExpressionDType: ExtendedDType {
    /// Semantic type used for computation and printing.
    fn value_type(&self) -> &DType;
    /// Type one link down the chain.
    fn operand_type(&self) -> &DType;

    /// Kernel converting operand data into value data.
    fn make_operand_to_value_kernel(
        &self,
        builder: &mut KernelBuilder,
        offset: usize,
        value_meta: &Metadata,
        operand_meta: &Metadata,
        strides: FixedStrides,
        kernreq: KernelRequest,
        ectx: &EvalContext,
    ) -> Result<usize>;

    /// Kernel converting value data back into operand data.
    fn make_value_to_operand_kernel(
        &self,
        builder: &mut KernelBuilder,
        offset: usize,
        operand_meta: &Metadata,
        value_meta: &Metadata,
        strides: FixedStrides,
        kernreq: KernelRequest,
        ectx: &EvalContext,
    ) -> Result<usize>;

    /// Rebuilds this chain on top of `replacement`, whose value type must equal the
    /// current storage type.
    fn with_replaced_storage_type(&self, replacement: &DType) -> Result<DType>;
}

/// Descriptor of a string-kind type.
pub trait StringDType: ExtendedDType {
    fn encoding(&self) -> StringEncoding;
    fn get_string(&self, data: &[u8], metadata: &Metadata) -> Result<String>;
    fn set_string(
        &self,
        data: &mut [u8],
        metadata: &Metadata,
        value: &str,
        errmode: AssignErrorMode,
    ) -> Result<()>;
}
