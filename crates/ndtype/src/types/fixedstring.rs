// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed-size strings.
//!
//! An element holds exactly `size` code units of its encoding, zero-padded. Printed
//! as `string<N>` for utf8 and `string<N,'enc'>` otherwise.

use crate::config::EvalContext;
use crate::error::{Error, Result};
use crate::kernels::string_kernels::{
    make_string_assignment_kernel, make_string_comparison_kernel,
};
use crate::kernels::{AssignErrorMode, ComparisonType, KernelBuilder, KernelRequest};
use crate::types::encoding::{print_escaped_string, StringEncoding};
use crate::types::extended::{ExtendedDType, StringDType};
use crate::types::metadata::Metadata;
use crate::types::type_id::{MemoryManagement, TypeId, TypeKind};
use crate::types::DType;
use std::any::Any;
use std::fmt;

#[derive(Debug, PartialEq, Eq)]
pub struct FixedStringDType {
    size: usize,
    encoding: StringEncoding,
}

impl FixedStringDType {
    /// `size` counts code units, not bytes.
    pub fn new(size: usize, encoding: StringEncoding) -> Result<Self> {
        if size == 0 {
            return Err(Error::Construction(
                "fixedstring: string size must be greater than zero".into(),
            ));
        }
        Ok(Self { size, encoding })
    }

    /// Length in code units.
    pub fn size(&self) -> usize {
        self.size
    }

    fn byte_size(&self) -> usize {
        self.size * self.encoding.unit_size()
    }

    fn element<'a>(&self, data: &'a [u8]) -> Result<&'a [u8]> {
        data.get(..self.byte_size()).ok_or_else(|| {
            Error::Memory(format!(
                "{} element needs {} bytes, have {}",
                DisplayType(self),
                self.byte_size(),
                data.len()
            ))
        })
    }
}

struct DisplayType<'a>(&'a FixedStringDType);

impl fmt::Display for DisplayType<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.print_dtype(f)
    }
}

pub fn make_fixedstring_dtype(size: usize, encoding: StringEncoding) -> Result<DType> {
    Ok(DType::new(FixedStringDType::new(size, encoding)?))
}

/// Longest prefix of `bytes` that ends on a code point boundary of `encoding`.
fn truncate_encoded(encoding: StringEncoding, bytes: &[u8], max: usize) -> &[u8] {
    let mut end = max.min(bytes.len());
    match encoding {
        StringEncoding::Utf8 => {
            // Back up over continuation bytes.
            while end > 0 && end < bytes.len() && bytes[end] & 0xc0 == 0x80 {
                end -= 1;
            }
        }
        StringEncoding::Utf16 => {
            if end >= 2 && end < bytes.len() {
                let last = u16::from_ne_bytes([bytes[end - 2], bytes[end - 1]]);
                if (0xd800..0xdc00).contains(&last) {
                    end -= 2;
                }
            }
        }
        StringEncoding::Ascii | StringEncoding::Ucs2 | StringEncoding::Utf32 => {}
    }
    &bytes[..end]
}

impl ExtendedDType for FixedStringDType {
    fn dtype_id(&self) -> TypeId {
        TypeId::FixedString
    }

    fn kind(&self) -> TypeKind {
        TypeKind::String
    }

    fn alignment(&self) -> u8 {
        self.encoding.unit_size() as u8
    }

    fn element_size(&self) -> usize {
        self.byte_size()
    }

    fn memory_management(&self) -> MemoryManagement {
        MemoryManagement::Pod
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
            StringEncoding::Utf8 => write!(out, "string<{}>", self.size),
            enc => write!(out, "string<{},'{}'>", self.size, enc),
        }
    }

    fn equals(&self, other: &dyn ExtendedDType) -> bool {
        other
            .as_any()
            .downcast_ref::<FixedStringDType>()
            .map_or(false, |o| o == self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn is_lossless_assignment(&self, dst: &DType, src: &DType) -> bool {
        match (
            dst.extended_as::<FixedStringDType>(),
            src.extended_as::<FixedStringDType>(),
        ) {
            (Some(d), Some(s)) => {
                d.size >= s.size
                    && (d.encoding == s.encoding
                        || matches!(
                            (d.encoding, s.encoding),
                            (_, StringEncoding::Ascii)
                                | (StringEncoding::Utf32, _)
                                | (StringEncoding::Utf16, StringEncoding::Ucs2)
                        ))
            }
            _ => false,
        }
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

impl StringDType for FixedStringDType {
    fn encoding(&self) -> StringEncoding {
        self.encoding
    }

    fn get_string(&self, data: &[u8], _metadata: &Metadata) -> Result<String> {
        self.encoding.decode(self.element(data)?)
    }

    fn set_string(
        &self,
        data: &mut [u8],
        _metadata: &Metadata,
        value: &str,
        errmode: AssignErrorMode,
    ) -> Result<()> {
        let capacity = self.byte_size();
        let len = data.len();
        let out = data.get_mut(..capacity).ok_or_else(|| {
            Error::Memory(format!(
                "fixedstring element needs {} bytes, have {}",
                capacity, len
            ))
        })?;
        let encoded = self.encoding.encode(value, errmode)?;
        let kept = if encoded.len() > capacity {
            if errmode != AssignErrorMode::None {
                return Err(Error::Overflow {
                    value: format!("{:?}", value),
                    dst: DisplayType(self).to_string(),
                });
            }
            truncate_encoded(self.encoding, &encoded, capacity)
        } else {
            &encoded[..]
        };
        out[..kept.len()].copy_from_slice(kept);
        out[kept.len()..].fill(0);
        Ok(())
    }
}
