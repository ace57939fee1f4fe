// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Variable-length strings.
//!
//! An element is a 16-byte reference `(offset: u64, len: u64)` into the POD memory
//! block carried by the metadata. Printed as `string` for utf8 and `string<'enc'>`
//! otherwise.

use crate::config::EvalContext;
use crate::error::{Error, Result};
use crate::kernels::string_kernels::{
    make_string_assignment_kernel, make_string_comparison_kernel,
};
use crate::kernels::{AssignErrorMode, ComparisonType, KernelBuilder, KernelRequest};
use crate::memblock::{get_pod_allocator_api, make_pod_memory_block, memory_block_debug_print, MemoryBlock};
use crate::types::builtin::read_array;
use crate::types::encoding::{print_escaped_string, StringEncoding};
use crate::types::extended::{ExtendedDType, StringDType};
use crate::types::metadata::Metadata;
use crate::types::type_id::{MemoryManagement, TypeId, TypeKind};
use crate::types::DType;
use std::any::Any;
use std::fmt;

/// Bytes of one element: offset and length, both `u64`.
pub const STRING_ELEMENT_SIZE: usize = 16;

/// Initial capacity of the block created by default metadata construction.
const DEFAULT_STRING_BLOCK_CAPACITY: usize = 64;

#[derive(Debug, PartialEq, Eq)]
pub struct VarStringDType {
    encoding: StringEncoding,
}

impl VarStringDType {
    pub fn new(encoding: StringEncoding) -> Self {
        Self { encoding }
    }

    fn block<'m>(&self, metadata: &'m Metadata) -> Result<&'m MemoryBlock> {
        metadata.block().ok_or_else(|| Error::TypeMismatch {
            dst: self.type_string(),
            src: format!("{} metadata", metadata.kind_name()),
            context: "string data requires blockref metadata",
        })
    }

    fn type_string(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.print_dtype(&mut out);
        out
    }
}

pub fn make_string_dtype(encoding: StringEncoding) -> DType {
    DType::new(VarStringDType::new(encoding))
}

fn read_reference(data: &[u8]) -> Result<(usize, usize)> {
    let offset = u64::from_ne_bytes(read_array(data)?);
    let len = u64::from_ne_bytes(read_array(data.get(8..).unwrap_or_default())?);
    Ok((offset as usize, len as usize))
}

fn write_reference(data: &mut [u8], offset: usize, len: usize) -> Result<()> {
    let size = data.len();
    let out = data.get_mut(..STRING_ELEMENT_SIZE).ok_or_else(|| {
        Error::Memory(format!(
            "string element needs {} bytes, have {}",
            STRING_ELEMENT_SIZE, size
        ))
    })?;
    out[..8].copy_from_slice(&(offset as u64).to_ne_bytes());
    out[8..].copy_from_slice(&(len as u64).to_ne_bytes());
    Ok(())
}

impl ExtendedDType for VarStringDType {
    fn dtype_id(&self) -> TypeId {
        TypeId::String
    }

    fn kind(&self) -> TypeKind {
        TypeKind::String
    }

    fn alignment(&self) -> u8 {
        8
    }

    fn element_size(&self) -> usize {
        STRING_ELEMENT_SIZE
    }

    fn memory_management(&self) -> MemoryManagement {
        MemoryManagement::BlockRef
    }

    fn print_element(
        &self,
        out: &mut dyn fmt::Write,
        data: &[u8],
        metadata: &Metadata,
    ) -> Result<()> {
        print_escaped_string(out, &self.get_string(data, metadata)?)?;
        Ok(())
    }

    fn print_dtype(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        match self.encoding {
            StringEncoding::Utf8 => out.write_str("string"),
            enc => write!(out, "string<'{}'>", enc),
        }
    }

    fn equals(&self, other: &dyn ExtendedDType) -> bool {
        other
            .as_any()
            .downcast_ref::<VarStringDType>()
            .map_or(false, |o| o == self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn is_lossless_assignment(&self, dst: &DType, src: &DType) -> bool {
        dst.type_id() == TypeId::String
            && src.kind() == TypeKind::String
            && dst.string_encoding() == src.string_encoding()
    }

    fn metadata_default_construct(&self, _shape: &[isize]) -> Result<Metadata> {
        Ok(Metadata::BlockRef(Some(make_pod_memory_block(
            DEFAULT_STRING_BLOCK_CAPACITY,
        ))))
    }

    fn metadata_copy_construct(
        &self,
        src: &Metadata,
        embedded_reference: Option<&MemoryBlock>,
    ) -> Result<Metadata> {
        match src {
            Metadata::BlockRef(block) => Ok(Metadata::BlockRef(
                embedded_reference.or(block.as_ref()).cloned(),
            )),
            other => Err(Error::TypeMismatch {
                dst: self.type_string(),
                src: format!("{} metadata", other.kind_name()),
                context: "copying string metadata",
            }),
        }
    }

    fn metadata_debug_dump(
        &self,
        metadata: &Metadata,
        out: &mut dyn fmt::Write,
        indent: &str,
    ) -> fmt::Result {
        writeln!(out, "{}string metadata", indent)?;
        memory_block_debug_print(metadata.block(), out, &format!("{} ", indent))
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
        make_string_assignment_kernel(
            self, builder, offset, dst, dst_meta, src, src_meta, kernreq, errmode, ectx,
        )
    }

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
        make_string_comparison_kernel(
            self, builder, offset, src0, src0_meta, src1, src1_meta, comptype, ectx,
        )
    }

    fn as_string(&self) -> Option<&dyn StringDType> {
        Some(self)
    }
}

impl StringDType for VarStringDType {
    fn encoding(&self) -> StringEncoding {
        self.encoding
    }

    fn get_string(&self, data: &[u8], metadata: &Metadata) -> Result<String> {
        let (offset, len) = read_reference(data)?;
        if len == 0 {
            return Ok(String::new());
        }
        let bytes = self.block(metadata)?.read(offset, len)?;
        self.encoding.decode(&bytes)
    }

    fn set_string(
        &self,
        data: &mut [u8],
        metadata: &Metadata,
        value: &str,
        errmode: AssignErrorMode,
    ) -> Result<()> {
        let encoded = self.encoding.encode(value, errmode)?;
        if encoded.is_empty() {
            return write_reference(data, 0, 0);
        }
        let block = self.block(metadata)?;
        let api = get_pod_allocator_api(block)?;
        let offset = api.allocate(block, encoded.len(), self.encoding.unit_size())?;
        block.write(offset, &encoded)?;
        write_reference(data, offset, encoded.len())
    }
}
