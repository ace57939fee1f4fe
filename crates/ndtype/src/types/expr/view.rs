// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reinterpreting the bytes of a POD operand as another POD type.

use super::{expression_descriptor_items, layer_at_storage, replace_operand_storage};
use crate::config::EvalContext;
use crate::error::{Error, Result};
use crate::kernels::{make_pod_copy_kernel, FixedStrides, KernelBuilder, KernelRequest};
use crate::types::extended::{is_descriptor_of, ExpressionDType, ExtendedDType};
use crate::types::fixedbytes::make_fixedbytes_dtype;
use crate::types::metadata::Metadata;
use crate::types::type_id::{MemoryManagement, TypeId, TypeKind};
use crate::types::DType;
use std::any::Any;
use std::fmt;

#[derive(Debug)]
pub struct ViewDType {
    value: DType,
    operand: DType,
}

impl ViewDType {
    pub fn new(value: DType, operand: DType) -> Result<Self> {
        if value.is_expression() {
            return Err(Error::Construction(format!(
                "view_dtype: value type {} must not be an expression",
                value
            )));
        }
        let operand_value = operand.value_type();
        if value.element_size() != operand_value.element_size() {
            return Err(Error::Construction(format!(
                "view_dtype: Cannot view {} as {} because they have different sizes",
                operand_value, value
            )));
        }
        if !value.is_pod() || !operand.is_pod() {
            return Err(Error::Construction(
                "view_dtype: Only POD dtypes are supported".into(),
            ));
        }
        Ok(Self { value, operand })
    }
}

/// Views `operand` as `value`; returns `operand` itself when it already has that value.
pub fn make_view(value: &DType, operand: &DType) -> Result<DType> {
    if operand.value_type() == value {
        return Ok(operand.clone());
    }
    layer_at_storage(value, |storage| {
        Ok(DType::new(ViewDType::new(storage.clone(), operand.clone())?))
    })
}

/// `value` stored without alignment requirements.
pub fn make_unaligned(value: &DType) -> Result<DType> {
    if value.alignment() <= 1 {
        return Ok(value.clone());
    }
    let storage = value.storage_type();
    make_view(value, &make_fixedbytes_dtype(storage.element_size(), 1)?)
}

impl ExtendedDType for ViewDType {
    fn dtype_id(&self) -> TypeId {
        TypeId::View
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
        write!(out, "view<as={}, original={}>", self.value, self.operand)
    }

    fn equals(&self, other: &dyn ExtendedDType) -> bool {
        other
            .as_any()
            .downcast_ref::<ViewDType>()
            .map_or(false, |o| o.value == self.value && o.operand == self.operand)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn is_lossless_assignment(&self, dst: &DType, src: &DType) -> bool {
        // Reinterpretation in either direction is a byte copy.
        (is_descriptor_of(self, dst) && src == &self.value)
            || (is_descriptor_of(self, src) && dst == &self.value)
    }

    expression_descriptor_items!();
}

impl ExpressionDType for ViewDType {
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
        strides: FixedStrides,
        kernreq: KernelRequest,
        _ectx: &EvalContext,
    ) -> Result<usize> {
        make_pod_copy_kernel(builder, offset, self.value.element_size(), kernreq, strides)
    }

    fn make_value_to_operand_kernel(
        &self,
        builder: &mut KernelBuilder,
        offset: usize,
        _operand_meta: &Metadata,
        _value_meta: &Metadata,
        strides: FixedStrides,
        kernreq: KernelRequest,
        _ectx: &EvalContext,
    ) -> Result<usize> {
        make_pod_copy_kernel(builder, offset, self.value.element_size(), kernreq, strides)
    }

    fn with_replaced_storage_type(&self, replacement: &DType) -> Result<DType> {
        let operand = replace_operand_storage(&self.operand, replacement)?;
        Ok(DType::new(ViewDType::new(self.value.clone(), operand)?))
    }
}
