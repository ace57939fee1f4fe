// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed-size opaque bytes.

use crate::config::EvalContext;
use crate::error::{Error, Result};
use crate::kernels::{
    make_pod_copy_kernel, AssignErrorMode, FixedStrides, KernelBuilder, KernelRequest,
};
use crate::types::builtin::hexadecimal_print;
use crate::types::extended::{forward_assignment_kernel, ExtendedDType};
use crate::types::metadata::Metadata;
use crate::types::type_id::{MemoryManagement, TypeId, TypeKind};
use crate::types::DType;
use std::any::Any;
use std::fmt;

/// Largest alignment a fixedbytes type may request.
pub const MAX_FIXEDBYTES_ALIGNMENT: usize = 16;

#[derive(Debug, PartialEq, Eq)]
pub struct FixedBytesDType {
    size: usize,
    alignment: u8,
}

impl FixedBytesDType {
    pub fn new(size: usize, alignment: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::Construction(
                "fixedbytes: data size must be greater than zero".into(),
            ));
        }
        if !alignment.is_power_of_two() || alignment > MAX_FIXEDBYTES_ALIGNMENT {
            return Err(Error::Construction(format!(
                "fixedbytes: alignment {} is not a power of two up to {}",
                alignment, MAX_FIXEDBYTES_ALIGNMENT
            )));
        }
        if size % alignment != 0 {
            return Err(Error::Construction(format!(
                "fixedbytes: data size {} must be a multiple of its alignment {}",
                size, alignment
            )));
        }
        Ok(Self {
            size,
            alignment: alignment as u8,
        })
    }
}

pub fn make_fixedbytes_dtype(size: usize, alignment: usize) -> Result<DType> {
    Ok(DType::new(FixedBytesDType::new(size, alignment)?))
}

impl ExtendedDType for FixedBytesDType {
    fn dtype_id(&self) -> TypeId {
        TypeId::FixedBytes
    }

    fn kind(&self) -> TypeKind {
        TypeKind::Bytes
    }

    fn alignment(&self) -> u8 {
        self.alignment
    }

    fn element_size(&self) -> usize {
        self.size
    }

    fn memory_management(&self) -> MemoryManagement {
        MemoryManagement::Pod
    }

    fn print_element(
        &self,
        out: &mut dyn fmt::Write,
        data: &[u8],
        _metadata: &Metadata,
    ) -> Result<()> {
        let bytes = data.get(..self.size).ok_or_else(|| {
            Error::Memory(format!("fixedbytes<{}> element has {} bytes", self.size, data.len()))
        })?;
        hexadecimal_print(out, bytes)?;
        Ok(())
    }

    fn print_dtype(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        if self.alignment == 1 {
            write!(out, "fixedbytes<{}>", self.size)
        } else {
            write!(out, "fixedbytes<{},{}>", self.size, self.alignment)
        }
    }

    fn equals(&self, other: &dyn ExtendedDType) -> bool {
        other
            .as_any()
            .downcast_ref::<FixedBytesDType>()
            .map_or(false, |o| o == self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn is_lossless_assignment(&self, dst: &DType, src: &DType) -> bool {
        dst.type_id() == TypeId::FixedBytes
            && src.type_id() == TypeId::FixedBytes
            && dst.element_size() == src.element_size()
    }

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
        // Bytes of equal size copy regardless of alignment.
        if self.is_lossless_assignment(dst, src) {
            return make_pod_copy_kernel(
                builder,
                offset,
                self.size,
                kernreq,
                FixedStrides::UNKNOWN,
            );
        }
        forward_assignment_kernel(
            self, builder, offset, dst, dst_meta, src, src_meta, kernreq, errmode, ectx,
        )
    }
}
