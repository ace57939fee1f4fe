// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Expression types: a value computed from an operand.
//!
//! # Chains
//!
//! ```text
//! convert<to=float64, from=byteswap<int32>>
//!   value   float64
//!   operand byteswap<int32>            (value int32)
//!     operand fixedbytes<4,4>          storage type
//! ```
//!
//! An expression's metadata is its operand's metadata, so every layer of a chain
//! reads the same storage metadata. Converting storage to value composes one
//! operand-to-value kernel per layer through buffered chain kernels, with each
//! intermediate buffer of the lower layer's value type.

pub mod byteswap;
pub mod convert;
pub mod view;

pub use byteswap::{make_byteswap, make_byteswap_over, ByteswapDType};
pub use convert::{make_convert, ConvertDType};
pub use view::{make_unaligned, make_view, ViewDType};

use crate::config::{runtime, EvalContext};
use crate::error::{Error, Result};
use crate::kernels::comparison::binary_sources;
use crate::kernels::{
    make_assignment_kernel, make_buffered_chain_kernel, make_comparison_kernel, AssignErrorMode,
    ComparisonType, FixedStrides, KernelBuilder, KernelFunction, KernelPrefix, KernelRef,
    KernelRequest,
};
use crate::types::extended::ExpressionDType;
use crate::types::{DType, Metadata};
use std::fmt;

/// Kernel converting data of the full chain under `expr` into value data.
pub fn make_expression_to_value_kernel(
    builder: &mut KernelBuilder,
    offset: usize,
    expr: &dyn ExpressionDType,
    value_meta: &Metadata,
    expr_meta: &Metadata,
    kernreq: KernelRequest,
    ectx: &EvalContext,
) -> Result<usize> {
    let operand = expr.operand_type();
    match operand.expression() {
        None => expr.make_operand_to_value_kernel(
            builder,
            offset,
            value_meta,
            expr_meta,
            FixedStrides::UNKNOWN,
            kernreq,
            ectx,
        ),
        Some(inner) => make_buffered_chain_kernel(
            builder,
            offset,
            operand.value_type(),
            kernreq,
            |b, off, buffer_meta, req| {
                make_expression_to_value_kernel(b, off, inner, buffer_meta, expr_meta, req, ectx)
            },
            |b, off, buffer_meta, req| {
                expr.make_operand_to_value_kernel(
                    b,
                    off,
                    value_meta,
                    buffer_meta,
                    FixedStrides::UNKNOWN,
                    req,
                    ectx,
                )
            },
        ),
    }
}

/// Kernel converting value data into data of the full chain under `expr`.
pub fn make_value_to_expression_kernel(
    builder: &mut KernelBuilder,
    offset: usize,
    expr: &dyn ExpressionDType,
    expr_meta: &Metadata,
    value_meta: &Metadata,
    kernreq: KernelRequest,
    ectx: &EvalContext,
) -> Result<usize> {
    let operand = expr.operand_type();
    match operand.expression() {
        None => expr.make_value_to_operand_kernel(
            builder,
            offset,
            expr_meta,
            value_meta,
            FixedStrides::UNKNOWN,
            kernreq,
            ectx,
        ),
        Some(inner) => make_buffered_chain_kernel(
            builder,
            offset,
            operand.value_type(),
            kernreq,
            |b, off, buffer_meta, req| {
                expr.make_value_to_operand_kernel(
                    b,
                    off,
                    buffer_meta,
                    value_meta,
                    FixedStrides::UNKNOWN,
                    req,
                    ectx,
                )
            },
            |b, off, buffer_meta, req| {
                make_value_to_expression_kernel(b, off, inner, expr_meta, buffer_meta, req, ectx)
            },
        ),
    }
}

/// Assignment hook shared by the expression types.
///
/// An expression source is first reduced to its value type; an expression
/// destination is then filled from its value type. A mismatch found between the
/// intermediate value types is reported against `dst` and `src`.
pub fn make_expression_assignment_kernel(
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
    assign_through_values(
        builder, offset, dst, dst_meta, src, src_meta, kernreq, errmode, ectx,
    )
    .map_err(|err| match err {
        Error::TypeMismatch { context, .. } => Error::mismatch(dst, src, context),
        other => other,
    })
}

fn assign_through_values(
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
    if let Some(src_expr) = src.expression() {
        let value = src.value_type();
        if dst == value {
            return make_expression_to_value_kernel(
                builder, offset, src_expr, dst_meta, src_meta, kernreq, ectx,
            );
        }
        return make_buffered_chain_kernel(
            builder,
            offset,
            value,
            kernreq,
            |b, off, buffer_meta, req| {
                make_expression_to_value_kernel(b, off, src_expr, buffer_meta, src_meta, req, ectx)
            },
            |b, off, buffer_meta, req| {
                make_assignment_kernel(
                    b, off, dst, dst_meta, value, buffer_meta, req, errmode, ectx,
                )
            },
        );
    }

    if let Some(dst_expr) = dst.expression() {
        let value = dst.value_type();
        if src == value {
            return make_value_to_expression_kernel(
                builder, offset, dst_expr, dst_meta, src_meta, kernreq, ectx,
            );
        }
        return make_buffered_chain_kernel(
            builder,
            offset,
            value,
            kernreq,
            |b, off, buffer_meta, req| {
                make_assignment_kernel(
                    b, off, value, buffer_meta, src, src_meta, req, errmode, ectx,
                )
            },
            |b, off, buffer_meta, req| {
                make_value_to_expression_kernel(b, off, dst_expr, dst_meta, buffer_meta, req, ectx)
            },
        );
    }

    Err(Error::mismatch(dst, src, "expression assignment"))
}

/// Scratch buffer holding one operand converted to its value type.
struct ValueBuffer {
    value_type: DType,
    meta: Metadata,
}

impl Drop for ValueBuffer {
    fn drop(&mut self) {
        self.value_type.metadata_destruct(&mut self.meta);
    }
}

struct ExpressionComparison {
    lhs: Option<ValueBuffer>,
    rhs: Option<ValueBuffer>,
}

fn to_value(
    buffer: &Option<ValueBuffer>,
    data: &[u8],
    kernel: KernelRef<'_>,
    child: &mut usize,
) -> Result<Option<Vec<u8>>> {
    let Some(buffer) = buffer else {
        return Ok(None);
    };
    let mut value = vec![0u8; buffer.value_type.element_size()];
    kernel.child(*child)?.call_single(&mut value, &[data])?;
    *child += 1;
    Ok(Some(value))
}

fn compare_expressions(src: &[&[u8]], kernel: KernelRef<'_>) -> Result<bool> {
    let data = kernel.data::<ExpressionComparison>()?;
    let (a, b) = binary_sources(src)?;
    let mut child = 0;
    let lhs = to_value(&data.lhs, a, kernel, &mut child)?;
    let rhs = to_value(&data.rhs, b, kernel, &mut child)?;
    kernel.child(child)?.call_predicate(&[
        lhs.as_deref().unwrap_or(a),
        rhs.as_deref().unwrap_or(b),
    ])
}

/// Comparison hook shared by the expression types: compares values.
pub fn make_expression_comparison_kernel(
    builder: &mut KernelBuilder,
    offset: usize,
    src0: &DType,
    src0_meta: &Metadata,
    src1: &DType,
    src1_meta: &Metadata,
    comptype: ComparisonType,
    ectx: &EvalContext,
) -> Result<usize> {
    builder.construct_with_children(offset, |builder| {
        let mut end = offset + 1;
        let mut children = Vec::new();
        let mut buffers = [None, None];

        for (slot, (tp, meta)) in [(src0, src0_meta), (src1, src1_meta)].into_iter().enumerate()
        {
            if let Some(expr) = tp.expression() {
                let value_type = tp.value_type().clone();
                let value_meta = value_type.metadata_default_construct(&[])?;
                children.push(end - offset);
                end = make_expression_to_value_kernel(
                    builder,
                    end,
                    expr,
                    &value_meta,
                    meta,
                    KernelRequest::Single,
                    ectx,
                )?;
                buffers[slot] = Some(ValueBuffer {
                    value_type,
                    meta: value_meta,
                });
            }
        }

        let [lhs, rhs] = buffers;
        let lhs_meta = lhs.as_ref().map_or(src0_meta, |b| &b.meta);
        let rhs_meta = rhs.as_ref().map_or(src1_meta, |b| &b.meta);
        children.push(end - offset);
        end = make_comparison_kernel(
            builder,
            end,
            src0.value_type(),
            lhs_meta,
            src1.value_type(),
            rhs_meta,
            comptype,
            ectx,
        )?;

        let mut prefix = KernelPrefix::new(KernelFunction::Predicate(compare_expressions));
        for relative in children {
            prefix = prefix.with_child(relative);
        }
        builder.construct(offset, prefix.with_data(ExpressionComparison { lhs, rhs }))?;
        Ok(end)
    })
}

/// Prints an expression element by converting it to its value first.
pub fn print_expression_element(
    expr: &dyn ExpressionDType,
    out: &mut dyn fmt::Write,
    data: &[u8],
    metadata: &Metadata,
) -> Result<()> {
    let value = expr.value_type();
    let ectx = runtime().eval_context();
    let mut value_meta = value.metadata_default_construct(&[])?;
    let mut builder = KernelBuilder::new();
    make_expression_to_value_kernel(
        &mut builder,
        0,
        expr,
        &value_meta,
        metadata,
        KernelRequest::Single,
        &ectx,
    )?;
    let mut buffer = vec![0u8; value.element_size()];
    builder.get(0)?.call_single(&mut buffer, &[data])?;
    let printed = value.print_element(out, &buffer, &value_meta);
    value.metadata_destruct(&mut value_meta);
    printed
}

/// Rebuilds `operand` with its storage replaced by `replacement`.
///
/// A non-expression operand is itself the storage, so `replacement` must produce
/// exactly that type as its value.
pub(crate) fn replace_operand_storage(operand: &DType, replacement: &DType) -> Result<DType> {
    match operand.expression() {
        Some(inner) => inner.with_replaced_storage_type(replacement),
        None if replacement.value_type() == operand => Ok(replacement.clone()),
        None => Err(Error::Construction(format!(
            "Cannot replace storage type {} with {}, whose value type is {}",
            operand,
            replacement,
            replacement.value_type()
        ))),
    }
}

/// Builds `make(storage)` under the chain of `value`.
///
/// A non-expression `value` is built directly; otherwise the new layer goes at the
/// storage level of `value` and the chain above it is re-attached.
pub(crate) fn layer_at_storage<F>(value: &DType, make: F) -> Result<DType>
where
    F: FnOnce(&DType) -> Result<DType>,
{
    match value.expression() {
        None => make(value),
        Some(expr) => expr.with_replaced_storage_type(&make(value.storage_type())?),
    }
}

/// Trait items every expression descriptor shares: printing through the value
/// type, operand-delegated metadata and the expression kernel hooks.
macro_rules! expression_descriptor_items {
    () => {
        fn print_element(
            &self,
            out: &mut dyn ::std::fmt::Write,
            data: &[u8],
            metadata: &$crate::types::Metadata,
        ) -> $crate::Result<()> {
            $crate::types::expr::print_expression_element(self, out, data, metadata)
        }

        fn metadata_default_construct(
            &self,
            shape: &[isize],
        ) -> $crate::Result<$crate::types::Metadata> {
            self.operand_type().metadata_default_construct(shape)
        }

        fn metadata_copy_construct(
            &self,
            src: &$crate::types::Metadata,
            embedded_reference: Option<&$crate::memblock::MemoryBlock>,
        ) -> $crate::Result<$crate::types::Metadata> {
            self.operand_type()
                .metadata_copy_construct(src, embedded_reference)
        }

        fn metadata_destruct(&self, metadata: &mut $crate::types::Metadata) {
            self.operand_type().metadata_destruct(metadata)
        }

        fn metadata_debug_dump(
            &self,
            metadata: &$crate::types::Metadata,
            out: &mut dyn ::std::fmt::Write,
            indent: &str,
        ) -> ::std::fmt::Result {
            self.operand_type().metadata_debug_dump(metadata, out, indent)
        }

        fn make_assignment_kernel(
            &self,
            builder: &mut $crate::kernels::KernelBuilder,
            offset: usize,
            dst: &$crate::types::DType,
            dst_meta: &$crate::types::Metadata,
            src: &$crate::types::DType,
            src_meta: &$crate::types::Metadata,
            kernreq: $crate::kernels::KernelRequest,
            errmode: $crate::kernels::AssignErrorMode,
            ectx: &$crate::config::EvalContext,
        ) -> $crate::Result<usize> {
            $crate::types::expr::make_expression_assignment_kernel(
                builder, offset, dst, dst_meta, src, src_meta, kernreq, errmode, ectx,
            )
        }

        fn make_comparison_kernel(
            &self,
            builder: &mut $crate::kernels::KernelBuilder,
            offset: usize,
            src0: &$crate::types::DType,
            src0_meta: &$crate::types::Metadata,
            src1: &$crate::types::DType,
            src1_meta: &$crate::types::Metadata,
            comptype: $crate::kernels::ComparisonType,
            ectx: &$crate::config::EvalContext,
        ) -> $crate::Result<usize> {
            $crate::types::expr::make_expression_comparison_kernel(
                builder, offset, src0, src0_meta, src1, src1_meta, comptype, ectx,
            )
        }

        fn as_expression(&self) -> Option<&dyn $crate::types::extended::ExpressionDType> {
            Some(self)
        }
    };
}
pub(crate) use expression_descriptor_items;
