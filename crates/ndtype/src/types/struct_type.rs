// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Struct type with a fixed, aligned field layout.
//!
//! Printed as `{x : int32, y : float64}`; elements print as `[1, 2.5]`. Struct
//! metadata is `Metadata::Struct` with one entry per field.

use crate::config::EvalContext;
use crate::error::{Error, Result};
use crate::kernels::struct_kernels::{make_struct_assignment_kernel, make_struct_comparison_kernel};
use crate::kernels::{AssignErrorMode, ComparisonType, KernelBuilder, KernelRequest};
use crate::memblock::MemoryBlock;
use crate::types::extended::{
    forward_assignment_kernel, forward_comparison_kernel, ExtendedDType,
};
use crate::types::metadata::Metadata;
use crate::types::type_id::{MemoryManagement, TypeId, TypeKind};
use crate::types::DType;
use std::any::Any;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug)]
pub struct StructDType {
    field_names: Vec<String>,
    field_types: Vec<DType>,
    field_offsets: Vec<usize>,
    alignment: u8,
    element_size: usize,
    memory_management: MemoryManagement,
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl StructDType {
    pub fn new(fields: Vec<(String, DType)>) -> Result<Self> {
        if fields.is_empty() {
            return Err(Error::Construction("struct type requires at least one field".into()));
        }
        let mut seen = HashSet::new();
        let mut field_names = Vec::with_capacity(fields.len());
        let mut field_types = Vec::with_capacity(fields.len());
        let mut field_offsets = Vec::with_capacity(fields.len());
        let mut offset = 0usize;
        let mut alignment = 1u8;
        let mut memory_management = MemoryManagement::Pod;

        for (name, tp) in fields {
            if !is_identifier(&name) {
                return Err(Error::Construction(format!("invalid struct field name '{}'", name)));
            }
            if !seen.insert(name.clone()) {
                return Err(Error::Construction(format!("duplicate struct field name '{}'", name)));
            }
            if tp.element_size() == 0 {
                return Err(Error::Construction(format!(
                    "struct field '{}' of type {} has no fixed size",
                    name, tp
                )));
            }
            offset = tp.inc_to_alignment(offset);
            field_offsets.push(offset);
            offset += tp.element_size();
            alignment = alignment.max(tp.alignment());
            memory_management = match (memory_management, tp.memory_management()) {
                (MemoryManagement::Object, _) | (_, MemoryManagement::Object) => {
                    MemoryManagement::Object
                }
                (MemoryManagement::BlockRef, _) | (_, MemoryManagement::BlockRef) => {
                    MemoryManagement::BlockRef
                }
                _ => MemoryManagement::Pod,
            };
            field_names.push(name);
            field_types.push(tp);
        }

        let align = alignment as usize;
        Ok(Self {
            field_names,
            field_types,
            field_offsets,
            alignment,
            element_size: (offset + align - 1) & !(align - 1),
            memory_management,
        })
    }

    pub fn field_count(&self) -> usize {
        self.field_types.len()
    }

    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    pub fn field_types(&self) -> &[DType] {
        &self.field_types
    }

    pub fn field_offsets(&self) -> &[usize] {
        &self.field_offsets
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.field_names.iter().position(|n| n == name)
    }

    /// Bytes of field `index` within an element.
    pub fn field_data<'a>(&self, data: &'a [u8], index: usize) -> Result<&'a [u8]> {
        data.get(self.field_offsets[index]..).ok_or_else(|| {
            Error::Memory(format!(
                "struct element of {} bytes has no field {}",
                data.len(),
                index
            ))
        })
    }
}

/// Builds a struct type from `(name, type)` pairs.
pub fn make_struct_dtype(fields: Vec<(String, DType)>) -> Result<DType> {
    Ok(DType::new(StructDType::new(fields)?))
}

impl ExtendedDType for StructDType {
    fn dtype_id(&self) -> TypeId {
        TypeId::Struct
    }

    fn kind(&self) -> TypeKind {
        TypeKind::Composite
    }

    fn alignment(&self) -> u8 {
        self.alignment
    }

    fn element_size(&self) -> usize {
        self.element_size
    }

    fn memory_management(&self) -> MemoryManagement {
        self.memory_management
    }

    fn print_element(
        &self,
        out: &mut dyn fmt::Write,
        data: &[u8],
        metadata: &Metadata,
    ) -> Result<()> {
        out.write_char('[')?;
        for (i, tp) in self.field_types.iter().enumerate() {
            if i > 0 {
                out.write_str(", ")?;
            }
            tp.print_element(out, self.field_data(data, i)?, metadata.field(i))?;
        }
        out.write_char(']')?;
        Ok(())
    }

    fn print_dtype(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_char('{')?;
        for (i, (name, tp)) in self.field_names.iter().zip(&self.field_types).enumerate() {
            if i > 0 {
                out.write_str(", ")?;
            }
            write!(out, "{} : {}", name, tp)?;
        }
        out.write_char('}')
    }

    fn equals(&self, other: &dyn ExtendedDType) -> bool {
        other
            .as_any()
            .downcast_ref::<StructDType>()
            .map_or(false, |o| {
                self.field_names == o.field_names && self.field_types == o.field_types
            })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn is_lossless_assignment(&self, dst: &DType, src: &DType) -> bool {
        let (Some(d), Some(s)) = (
            dst.extended_as::<StructDType>(),
            src.extended_as::<StructDType>(),
        ) else {
            return false;
        };
        d.field_names.iter().zip(&d.field_types).all(|(name, dtp)| {
            s.field_index(name).map_or(false, |j| {
                crate::kernels::is_lossless_assignment(dtp, &s.field_types[j])
            })
        }) && d.field_count() == s.field_count()
    }

    fn metadata_default_construct(&self, _shape: &[isize]) -> Result<Metadata> {
        if self.memory_management == MemoryManagement::Pod {
            return Ok(Metadata::None);
        }
        let fields = self
            .field_types
            .iter()
            .map(|tp| tp.metadata_default_construct(&[]))
            .collect::<Result<Vec<_>>>()?;
        Ok(Metadata::Struct(fields))
    }

    fn metadata_copy_construct(
        &self,
        src: &Metadata,
        embedded_reference: Option<&MemoryBlock>,
    ) -> Result<Metadata> {
        match src {
            Metadata::None => Ok(Metadata::None),
            Metadata::Struct(_) => {
                let fields = self
                    .field_types
                    .iter()
                    .enumerate()
                    .map(|(i, tp)| tp.metadata_copy_construct(src.field(i), embedded_reference))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Metadata::Struct(fields))
            }
            other => Err(Error::Construction(format!(
                "struct type cannot copy {} metadata",
                other.kind_name()
            ))),
        }
    }

    fn metadata_destruct(&self, metadata: &mut Metadata) {
        if let Metadata::Struct(fields) = metadata {
            for (tp, field) in self.field_types.iter().zip(fields.iter_mut()) {
                tp.metadata_destruct(field);
            }
        }
        *metadata = Metadata::None;
    }

    fn metadata_debug_dump(
        &self,
        metadata: &Metadata,
        out: &mut dyn fmt::Write,
        indent: &str,
    ) -> fmt::Result {
        let inner = format!("{}  ", indent);
        for (i, (name, tp)) in self.field_names.iter().zip(&self.field_types).enumerate() {
            writeln!(out, "{}field {} ({}):", indent, name, tp)?;
            tp.metadata_debug_dump(metadata.field(i), out, &inner)?;
        }
        Ok(())
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
        if let (Some(d), Some(s)) = (
            dst.extended_as::<StructDType>(),
            src.extended_as::<StructDType>(),
        ) {
            return make_struct_assignment_kernel(
                builder, offset, d, dst_meta, s, src_meta, kernreq, errmode, ectx,
            );
        }
        forward_assignment_kernel(
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
        if let (Some(a), Some(b)) = (
            src0.extended_as::<StructDType>(),
            src1.extended_as::<StructDType>(),
        ) {
            return make_struct_comparison_kernel(
                builder, offset, a, src0_meta, b, src1_meta, comptype, ectx,
            );
        }
        forward_comparison_kernel(
            self, builder, offset, src0, src0_meta, src1, src1_meta, comptype, ectx,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::make_dtype;

    fn point() -> DType {
        make_struct_dtype(vec![
            ("x".into(), make_dtype::<i8>()),
            ("y".into(), make_dtype::<f64>()),
            ("z".into(), make_dtype::<i16>()),
        ])
        .expect("struct")
    }

    #[test]
    fn test_aligned_layout() {
        let t = point();
        let s = t.extended_as::<StructDType>().expect("struct");
        assert_eq!(s.field_offsets(), &[0, 8, 16]);
        assert_eq!(t.alignment(), 8);
        assert_eq!(t.element_size(), 24);
        assert!(t.is_pod());
        assert_eq!(t.to_string(), "{x : int8, y : float64, z : int16}");
    }

    #[test]
    fn test_print_element() {
        let t = point();
        let mut data = vec![0u8; 24];
        data[0] = 3;
        data[8..16].copy_from_slice(&2.5f64.to_ne_bytes());
        data[16..18].copy_from_slice(&(-1i16).to_ne_bytes());
        assert_eq!(
            t.element_to_string(&data, &Metadata::None).expect("print"),
            "[3, 2.5, -1]"
        );
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(point(), point());
        let other = make_struct_dtype(vec![("x".into(), make_dtype::<i8>())]).expect("struct");
        assert_ne!(point(), other);
    }

    #[test]
    fn test_invalid_fields() {
        assert!(make_struct_dtype(vec![]).is_err());
        assert!(make_struct_dtype(vec![
            ("a".into(), make_dtype::<i8>()),
            ("a".into(), make_dtype::<i8>()),
        ])
        .is_err());
        assert!(make_struct_dtype(vec![("v".into(), DType::default())]).is_err());
        assert!(make_struct_dtype(vec![("1x".into(), make_dtype::<i8>())]).is_err());
    }
}
