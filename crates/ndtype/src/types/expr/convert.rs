// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Values computed by assignment from an operand of another type.

use super::{expression_descriptor_items, layer_at_storage, replace_operand_storage};
use crate::config::EvalContext;
use crate::error::{Error, Result};
use crate::kernels::{
    make_assignment_kernel, AssignErrorMode, FixedStrides, KernelBuilder, KernelRequest,
};
use crate::types::extended::{ExpressionDType, ExtendedDType};
use crate::types::metadata::Metadata;
use crate::types::type_id::{MemoryManagement, TypeId, TypeKind};
use crate::types::DType;
use std::any::Any;
use std::fmt;

#[derive(Debug)]
pub struct ConvertDType {
    value: DType,
    operand: DType,
    errmode: AssignErrorMode,
}

impl ConvertDType {
    pub fn new(value: DType, operand: DType, errmode: AssignErrorMode) -> Result<Self> {
        if value.is_expression() {
            return Err(Error::Construction(format!(
                "convert_dtype: value type {} must not be an expression",
                value
            )));
        }
        if value.element_size() == 0 || operand.element_size() == 0 {
            return Err(Error::Construction(format!(
                "convert_dtype: cannot convert {} to {}, both need a fixed element size",
                operand, value
            )));
        }
        Ok(Self {
            value,
            operand,
            errmode,
        })
    }

    pub fn errmode(&self) -> AssignErrorMode {
        self.errmode
    }
}

/// Value `value` computed from `operand`; returns `operand` when it already has that value.
pub fn make_convert(value: &DType, operand: &DType, errmode: AssignErrorMode) -> Result<DType> {
    if operand.value_type() == value {
        return Ok(operand.clone());
    }
    layer_at_storage(value, |storage| {
        Ok(DType::new(ConvertDType::new(
            storage.clone(),
            operand.clone(),
            errmode,
        )?))
    })
}

impl ExtendedDType for ConvertDType {
    fn dtype_id(&self) -> TypeId {
        TypeId::Convert
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
        self.operand.memory_management()
    }

    fn print_dtype(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "convert<to={}, from={}", self.value, self.operand)?;
        if self.errmode != AssignErrorMode::Default {
            write!(out, ", errmode={}", self.errmode)?;
        }
        out.write_char('>')
    }

    fn equals(&self, other: &dyn ExtendedDType) -> bool {
        other.as_any().downcast_ref::<ConvertDType>().map_or(false, |o| {
            o.value == self.value && o.operand == self.operand && o.errmode == self.errmode
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    expression_descriptor_items!();
}

impl ExpressionDType for ConvertDType {
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
        value_meta: &Metadata,
        operand_meta: &Metadata,
        _strides: FixedStrides,
        kernreq: KernelRequest,
        ectx: &EvalContext,
    ) -> Result<usize> {
        make_assignment_kernel(
            builder,
            offset,
            &self.value,
            value_meta,
            self.operand.value_type(),
            operand_meta,
            kernreq,
            self.errmode,
            ectx,
        )
    }

    fn make_value_to_operand_kernel(
        &self,
        builder: &mut KernelBuilder,
        offset: usize,
        operand_meta: &Metadata,
        value_meta: &Metadata,
        _strides: FixedStrides,
        kernreq: KernelRequest,
        ectx: &EvalContext,
    ) -> Result<usize> {
        make_assignment_kernel(
            builder,
            offset,
            self.operand.value_type(),
            operand_meta,
            &self.value,
            value_meta,
            kernreq,
            self.errmode,
            ectx,
        )
    }

    fn with_replaced_storage_type(&self, replacement: &DType) -> Result<DType> {
        let operand = replace_operand_storage(&self.operand, replacement)?;
        Ok(DType::new(ConvertDType::new(
            self.value.clone(),
            operand,
            self.errmode,
        )?))
    }
}
