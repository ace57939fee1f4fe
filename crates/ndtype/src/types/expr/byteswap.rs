// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Numeric values stored with the opposite byte order.

use super::{expression_descriptor_items, layer_at_storage, replace_operand_storage};
use crate::config::EvalContext;
use crate::error::{Error, Result};
use crate::kernels::{
    strided_loop, unary_source, FixedStrides, KernelBuilder, KernelPrefix, KernelRef,
    KernelRequest,
};
use crate::types::extended::{ExpressionDType, ExtendedDType};
use crate::types::fixedbytes::make_fixedbytes_dtype;
use crate::types::metadata::Metadata;
use crate::types::type_id::{MemoryManagement, TypeId, TypeKind};
use crate::types::DType;
use std::any::Any;
use std::fmt;

#[derive(Debug)]
pub struct ByteswapDType {
    value: DType,
    operand: DType,
}

fn default_operand(value: &DType) -> Result<DType> {
    make_fixedbytes_dtype(value.element_size(), value.alignment() as usize)
}

impl ByteswapDType {
    pub fn new(value: DType, operand: DType) -> Result<Self> {
        let numeric = value.is_builtin()
            && matches!(
                value.kind(),
                TypeKind::Int | TypeKind::UInt | TypeKind::Real | TypeKind::Complex
            );
        if !numeric {
            return Err(Error::Construction(format!(
                "byteswap_dtype: Can only byteswap builtin numeric types, not {}",
                value
            )));
        }
        if operand.value_type().element_size() != value.element_size() || !operand.is_pod() {
            return Err(Error::Construction(format!(
                "byteswap_dtype: Cannot store {} in {}, the operand must be POD of the same size",
                value, operand
            )));
        }
        Ok(Self { value, operand })
    }

    /// Bytes reversed as a unit; complex values swap each component.
    fn component_size(&self) -> usize {
        if self.value.kind() == TypeKind::Complex {
            self.value.element_size() / 2
        } else {
            self.value.element_size()
        }
    }
}

/// `value` stored byte-swapped in `fixedbytes<size,align>`.
pub fn make_byteswap(value: &DType) -> Result<DType> {
    Ok(DType::new(ByteswapDType::new(
        value.clone(),
        default_operand(value)?,
    )?))
}

/// `value` stored byte-swapped in `operand`.
pub fn make_byteswap_over(value: &DType, operand: &DType) -> Result<DType> {
    layer_at_storage(value, |storage| {
        Ok(DType::new(ByteswapDType::new(storage.clone(), operand.clone())?))
    })
}

/// Element size and component size of a swap.
struct SwapLayout {
    size: usize,
    component: usize,
}

fn swap_into(dst: &mut [u8], src: &[u8], layout: &SwapLayout) -> Result<()> {
    let (dst_len, src_len) = (dst.len(), src.len());
    match (dst.get_mut(..layout.size), src.get(..layout.size)) {
        (Some(d), Some(s)) => {
            for (dc, sc) in d
                .chunks_exact_mut(layout.component)
                .zip(s.chunks_exact(layout.component))
            {
                for (db, sb) in dc.iter_mut().zip(sc.iter().rev()) {
                    *db = *sb;
                }
            }
            Ok(())
        }
        _ => Err(Error::Memory(format!(
            "byteswap of {} bytes with dst of {} and src of {} bytes",
            layout.size, dst_len, src_len
        ))),
    }
}

fn single_swap(dst: &mut [u8], src: &[&[u8]], kernel: KernelRef<'_>) -> Result<()> {
    swap_into(dst, unary_source(src)?, kernel.data::<SwapLayout>()?)
}

fn strided_swap(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[&[u8]],
    src_strides: &[usize],
    count: usize,
    kernel: KernelRef<'_>,
) -> Result<()> {
    let layout = kernel.data::<SwapLayout>()?;
    strided_loop(dst, dst_stride, src, src_strides, count, |d, s| {
        swap_into(d, unary_source(s)?, layout)
    })
}

impl ByteswapDType {
    fn make_swap_kernel(
        &self,
        builder: &mut KernelBuilder,
        offset: usize,
        kernreq: KernelRequest,
    ) -> Result<usize> {
        let prefix = KernelPrefix::unary(kernreq, single_swap, strided_swap)?.with_data(
            SwapLayout {
                size: self.value.element_size(),
                component: self.component_size(),
            },
        );
        builder.construct(offset, prefix)?;
        Ok(offset + 1)
    }
}

impl ExtendedDType for ByteswapDType {
    fn dtype_id(&self) -> TypeId {
        TypeId::ByteSwap
    }

    fn kind(&self) -> TypeKind {
        TypeKind::Expression
    }

    fn alignment(&self) -> u8 {
        self.operand.alignment()
    }

    fn element_size(&self) -> usize {
        self.operand.element_size()
    }

    fn memory_management(&self) -> MemoryManagement {
        MemoryManagement::Pod
    }

    fn print_dtype(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        let is_default = default_operand(&self.value).map_or(false, |d| d == self.operand);
        if is_default {
            write!(out, "byteswap<{}>", self.value)
        } else {
            write!(out, "byteswap<{}, original={}>", self.value, self.operand)
        }
    }

    fn equals(&self, other: &dyn ExtendedDType) -> bool {
        other
            .as_any()
            .downcast_ref::<ByteswapDType>()
            .map_or(false, |o| o.value == self.value && o.operand == self.operand)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    expression_descriptor_items!();
}

impl ExpressionDType for ByteswapDType {
    fn value_type(&self) -> &DType {
        &self.value
    }

    fn operand_type(&self) -> &DType {
        &self.operand
    }

    fn make_operand_to_value_kernel(
        &self,
        builder: &mut KernelBuilder,
        offset: usize,
        _value_meta: &Metadata,
        _operand_meta: &Metadata,
        _strides: FixedStrides,
        kernreq: KernelRequest,
        _ectx: &EvalContext,
    ) -> Result<usize> {
        self.make_swap_kernel(builder, offset, kernreq)
    }

    fn make_value_to_operand_kernel(
        &self,
        builder: &mut KernelBuilder,
        offset: usize,
        _operand_meta: &Metadata,
        _value_meta: &Metadata,
        _strides: FixedStrides,
        kernreq: KernelRequest,
        _ectx: &EvalContext,
    ) -> Result<usize> {
        self.make_swap_kernel(builder, offset, kernreq)
    }

    fn with_replaced_storage_type(&self, replacement: &DType) -> Result<DType> {
        let operand = replace_operand_storage(&self.operand, replacement)?;
        Ok(DType::new(ByteswapDType::new(self.value.clone(), operand)?))
    }
}
