// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! One strided dimension over an element type.
//!
//! The extent and byte stride live in `Metadata::Dim`, so the type itself has no
//! fixed element size. Printed as `strided_dim<T>`; elements print as `[a, b, ..]`.

use crate::config::EvalContext;
use crate::error::{Error, Result};
use crate::kernels::{
    make_assignment_kernel, strided_loop, unary_source, AssignErrorMode, KernelBuilder,
    KernelPrefix, KernelRef, KernelRequest,
};
use crate::memblock::MemoryBlock;
use crate::types::extended::{forward_assignment_kernel, is_descriptor_of, ExtendedDType};
use crate::types::iterdata::{IterData, IterLevel};
use crate::types::metadata::Metadata;
use crate::types::type_id::{MemoryManagement, TypeId, TypeKind};
use crate::types::DType;
use std::any::Any;
use std::fmt;

#[derive(Debug)]
pub struct StridedDimDType {
    element_type: DType,
}

impl StridedDimDType {
    pub fn new(element_type: DType) -> Result<Self> {
        if element_type.type_id() == TypeId::Void {
            return Err(Error::Construction(
                "strided_dim: element type cannot be void".into(),
            ));
        }
        Ok(Self { element_type })
    }

    pub fn element_type(&self) -> &DType {
        &self.element_type
    }

    /// `(size, stride, element metadata)` of a dimension.
    fn dim<'m>(&self, metadata: &'m Metadata) -> Result<(usize, usize, &'m Metadata)> {
        match metadata {
            Metadata::Dim {
                size,
                stride,
                element,
            } => Ok((*size, *stride, &**element)),
            other => Err(Error::TypeMismatch {
                dst: format!("strided_dim<{}>", self.element_type),
                src: format!("{} metadata", other.kind_name()),
                context: "strided_dim requires dim metadata",
            }),
        }
    }
}

pub fn make_strided_dim_dtype(element_type: DType) -> Result<DType> {
    Ok(DType::new(StridedDimDType::new(element_type)?))
}

/// Builds `ndim` nested strided dimensions over `element_type`.
pub fn make_strided_dim_dtype_nd(element_type: DType, ndim: usize) -> Result<DType> {
    (0..ndim).try_fold(element_type, |tp, _| make_strided_dim_dtype(tp))
}

struct DimAssign {
    size: usize,
    dst_stride: usize,
    src_stride: usize,
}

fn assign_dim(dst: &mut [u8], src: &[u8], kernel: KernelRef<'_>) -> Result<()> {
    let dim = kernel.data::<DimAssign>()?;
    kernel
        .child(0)?
        .call_strided(dst, dim.dst_stride, &[src], &[dim.src_stride], dim.size)
}

fn single_dim_assign(dst: &mut [u8], src: &[&[u8]], kernel: KernelRef<'_>) -> Result<()> {
    assign_dim(dst, unary_source(src)?, kernel)
}

fn strided_dim_assign(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[&[u8]],
    src_strides: &[usize],
    count: usize,
    kernel: KernelRef<'_>,
) -> Result<()> {
    strided_loop(dst, dst_stride, src, src_strides, count, |d, s| {
        assign_dim(d, unary_source(s)?, kernel)
    })
}

impl ExtendedDType for StridedDimDType {
    fn dtype_id(&self) -> TypeId {
        TypeId::StridedDim
    }

    fn kind(&self) -> TypeKind {
        TypeKind::Composite
    }

    fn alignment(&self) -> u8 {
        self.element_type.alignment()
    }

    fn element_size(&self) -> usize {
        0
    }

    fn memory_management(&self) -> MemoryManagement {
        self.element_type.memory_management()
    }

    fn print_element(
        &self,
        out: &mut dyn fmt::Write,
        data: &[u8],
        metadata: &Metadata,
    ) -> Result<()> {
        let (size, stride, element) = self.dim(metadata)?;
        out.write_char('[')?;
        for i in 0..size {
            if i > 0 {
                out.write_str(", ")?;
            }
            let item = data.get(i * stride..).ok_or_else(|| {
                Error::Memory(format!("strided_dim element {} outside {} bytes", i, data.len()))
            })?;
            self.element_type.print_element(out, item, element)?;
        }
        out.write_char(']')?;
        Ok(())
    }

    fn print_dtype(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "strided_dim<{}>", self.element_type)
    }

    fn equals(&self, other: &dyn ExtendedDType) -> bool {
        other
            .as_any()
            .downcast_ref::<StridedDimDType>()
            .map_or(false, |o| o.element_type == self.element_type)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn default_element_size(&self, shape: &[isize]) -> usize {
        let Some((&size, inner)) = shape.split_first() else {
            return 0;
        };
        size.max(0) as usize * self.element_type.default_element_size(inner)
    }

    fn is_scalar(&self) -> bool {
        false
    }

    fn ndim(&self) -> usize {
        1 + self.element_type.ndim()
    }

    fn get_shape(&self, metadata: Option<&Metadata>) -> Vec<isize> {
        match metadata.map(|m| self.dim(m)) {
            Some(Ok((size, _, element))) => {
                let mut shape = vec![size as isize];
                shape.extend(self.element_type.shape(Some(element)));
                shape
            }
            _ => {
                let mut shape = vec![-1];
                shape.extend(self.element_type.shape(None));
                shape
            }
        }
    }

    fn get_strides(&self, metadata: Option<&Metadata>) -> Vec<isize> {
        match metadata.map(|m| self.dim(m)) {
            Some(Ok((_, stride, element))) => {
                let mut strides = vec![stride as isize];
                strides.extend(self.element_type.strides(Some(element)));
                strides
            }
            _ => {
                let mut strides = vec![-1];
                strides.extend(self.element_type.strides(None));
                strides
            }
        }
    }

    fn metadata_default_construct(&self, shape: &[isize]) -> Result<Metadata> {
        let (size, inner) = match shape.split_first() {
            Some((&size, inner)) if size >= 0 => (size as usize, inner),
            _ => {
                return Err(Error::Construction(format!(
                    "strided_dim<{}>: default metadata needs a known size, got shape {:?}",
                    self.element_type, shape
                )))
            }
        };
        let element = self.element_type.metadata_default_construct(inner)?;
        Ok(Metadata::Dim {
            size,
            stride: self.element_type.default_element_size(inner),
            element: Box::new(element),
        })
    }

    fn metadata_copy_construct(
        &self,
        src: &Metadata,
        embedded_reference: Option<&MemoryBlock>,
    ) -> Result<Metadata> {
        let (size, stride, element) = self.dim(src)?;
        Ok(Metadata::Dim {
            size,
            stride,
            element: Box::new(
                self.element_type
                    .metadata_copy_construct(element, embedded_reference)?,
            ),
        })
    }

    fn metadata_destruct(&self, metadata: &mut Metadata) {
        if let Metadata::Dim { element, .. } = metadata {
            self.element_type.metadata_destruct(element);
        }
        *metadata = Metadata::None;
    }

    fn metadata_debug_dump(
        &self,
        metadata: &Metadata,
        out: &mut dyn fmt::Write,
        indent: &str,
    ) -> fmt::Result {
        match self.dim(metadata) {
            Ok((size, stride, element)) => {
                writeln!(out, "{}strided_dim metadata", indent)?;
                writeln!(out, "{} size: {}", indent, size)?;
                writeln!(out, "{} stride: {}", indent, stride)?;
                self.element_type
                    .metadata_debug_dump(element, out, &format!("{} ", indent))
            }
            Err(_) => writeln!(out, "{}strided_dim metadata missing", indent),
        }
    }

    fn iterdata_construct(&self, metadata: &Metadata) -> Result<IterData> {
        let (size, stride, element) = self.dim(metadata)?;
        let mut levels = vec![IterLevel {
            size,
            stride,
            index: 0,
        }];
        levels.extend_from_slice(self.element_type.iterdata_construct(element)?.levels());
        Ok(IterData::new(levels))
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
        if !is_descriptor_of(self, dst) {
            return forward_assignment_kernel(
                self, builder, offset, dst, dst_meta, src, src_meta, kernreq, errmode, ectx,
            );
        }
        let (size, dst_stride, dst_element) = self.dim(dst_meta)?;

        // A source of lower dimension broadcasts across this dimension.
        let (src_stride, src_element_type, src_element_meta) =
            match src.extended_as::<StridedDimDType>() {
                Some(s) if src.ndim() >= dst.ndim() => {
                    let (src_size, src_stride, src_element) = s.dim(src_meta)?;
                    let src_stride = match src_size {
                        n if n == size => src_stride,
                        1 => 0,
                        _ => {
                            return Err(Error::Broadcast {
                                dst: size,
                                src: src_size,
                            })
                        }
                    };
                    (src_stride, &s.element_type, src_element)
                }
                _ if src.ndim() < dst.ndim() => (0, src, src_meta),
                _ => return Err(Error::mismatch(dst, src, "strided_dim assignment")),
            };

        builder.construct_with_children(offset, |builder| {
            let end = make_assignment_kernel(
                builder,
                offset + 1,
                &self.element_type,
                dst_element,
                src_element_type,
                src_element_meta,
                KernelRequest::Strided,
                errmode,
                ectx,
            )?;
            let prefix = KernelPrefix::unary(kernreq, single_dim_assign, strided_dim_assign)?
                .with_child(1)
                .with_data(DimAssign {
                    size,
                    dst_stride,
                    src_stride,
                });
            builder.construct(offset, prefix)?;
            Ok(end)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::assign_element;
    use crate::types::make_dtype;

    fn int32_dim() -> DType {
        make_strided_dim_dtype(make_dtype::<i32>()).expect("dim")
    }

    fn ints(values: &[i32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_ne_bytes()).collect()
    }

    #[test]
    fn test_shape_and_strides() {
        let t = make_strided_dim_dtype_nd(make_dtype::<i16>(), 2).expect("2d");
        assert_eq!(t.to_string(), "strided_dim<strided_dim<int16>>");
        assert_eq!(t.ndim(), 2);
        assert!(!t.is_scalar());
        assert_eq!(t.element_size(), 0);
        assert_eq!(t.shape(None), vec![-1, -1]);

        let meta = t.metadata_default_construct(&[3, 4]).expect("meta");
        assert_eq!(t.shape(Some(&meta)), vec![3, 4]);
        assert_eq!(t.strides(Some(&meta)), vec![8, 2]);
        assert_eq!(t.default_element_size(&[3, 4]), 24);
    }

    #[test]
    fn test_default_metadata_needs_size() {
        assert!(int32_dim().metadata_default_construct(&[]).is_err());
        assert!(int32_dim().metadata_default_construct(&[-1]).is_err());
    }

    #[test]
    fn test_iterdata_levels() {
        let t = make_strided_dim_dtype_nd(make_dtype::<u8>(), 2).expect("2d");
        let meta = t.metadata_default_construct(&[2, 3]).expect("meta");
        let mut it = t.iterdata_construct(&meta).expect("iterdata");
        assert_eq!(it.ndim(), 2);
        let mut offsets = vec![it.offset()];
        while it.advance() {
            offsets.push(it.offset());
        }
        assert_eq!(offsets, vec![0, 1, 2, 3, 4, 5]);
        t.iterdata_destruct(&mut it);
        assert_eq!(it.ndim(), 0);
    }

    #[test]
    fn test_print_element() {
        let t = int32_dim();
        let meta = t.metadata_default_construct(&[3]).expect("meta");
        assert_eq!(
            t.element_to_string(&ints(&[1, -2, 3]), &meta).expect("print"),
            "[1, -2, 3]"
        );
        assert!(matches!(
            t.element_to_string(&ints(&[1]), &Metadata::None),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_assign_converts_elements() {
        let dst_tp = make_strided_dim_dtype(make_dtype::<i64>()).expect("dim");
        let dst_meta = dst_tp.metadata_default_construct(&[3]).expect("meta");
        let src_tp = int32_dim();
        let src_meta = src_tp.metadata_default_construct(&[3]).expect("meta");
        let mut dst = vec![0u8; 24];
        assign_element(
            &dst_tp,
            &dst_meta,
            &mut dst,
            &src_tp,
            &src_meta,
            &ints(&[4, 5, -6]),
            AssignErrorMode::Default,
        )
        .expect("assign");
        let got: Vec<i64> = dst
            .chunks_exact(8)
            .map(|c| i64::from_ne_bytes(c.try_into().expect("8 bytes")))
            .collect();
        assert_eq!(got, vec![4, 5, -6]);
    }

    #[test]
    fn test_broadcasting() {
        let t = int32_dim();
        let dst_meta = t.metadata_default_construct(&[3]).expect("meta");
        let mut dst = vec![0u8; 12];

        // Scalar source.
        assign_element(
            &t,
            &dst_meta,
            &mut dst,
            &make_dtype::<i32>(),
            &Metadata::None,
            &7i32.to_ne_bytes(),
            AssignErrorMode::Default,
        )
        .expect("scalar broadcast");
        assert_eq!(dst, ints(&[7, 7, 7]));

        // Size-one dimension.
        let one = t.metadata_default_construct(&[1]).expect("meta");
        assign_element(&t, &dst_meta, &mut dst, &t, &one, &ints(&[9]), AssignErrorMode::Default)
            .expect("size one broadcast");
        assert_eq!(dst, ints(&[9, 9, 9]));

        let two = t.metadata_default_construct(&[2]).expect("meta");
        assert!(matches!(
            assign_element(&t, &dst_meta, &mut dst, &t, &two, &ints(&[1, 2]), AssignErrorMode::Default),
            Err(Error::Broadcast { dst: 3, src: 2 })
        ));
    }

    #[test]
    fn test_array_into_scalar_is_mismatch() {
        let t = int32_dim();
        let meta = t.metadata_default_construct(&[2]).expect("meta");
        let mut dst = [0u8; 4];
        assert!(matches!(
            assign_element(
                &make_dtype::<i32>(),
                &Metadata::None,
                &mut dst,
                &t,
                &meta,
                &ints(&[1, 2]),
                AssignErrorMode::Default
            ),
            Err(Error::TypeMismatch { .. })
        ));
    }
}
