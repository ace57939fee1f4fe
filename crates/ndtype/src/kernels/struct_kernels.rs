// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Struct assignment and comparison kernels.
//!
//! Both build one child kernel per field (two per field for ordered comparisons)
//! at increasing offsets after the parent.

use super::comparison::binary_sources;
use super::{
    make_assignment_kernel, make_comparison_kernel, strided_loop, unary_source, AssignErrorMode,
    ComparisonType, KernelBuilder, KernelFunction, KernelPrefix, KernelRef, KernelRequest,
};
use crate::config::EvalContext;
use crate::error::{Error, Result};
use crate::types::struct_type::StructDType;
use crate::types::Metadata;

/// Byte offsets of each field pair, in child order.
struct FieldPairs {
    offsets: Vec<(usize, usize)>,
}

fn field_slice(data: &[u8], offset: usize) -> Result<&[u8]> {
    data.get(offset..)
        .ok_or_else(|| Error::Memory(format!("struct field at {} outside element", offset)))
}

fn assign_struct_element(dst: &mut [u8], src: &[u8], kernel: KernelRef<'_>) -> Result<()> {
    let fields = kernel.data::<FieldPairs>()?;
    for (i, &(dst_off, src_off)) in fields.offsets.iter().enumerate() {
        let dst_len = dst.len();
        let dst_field = dst.get_mut(dst_off..).ok_or_else(|| {
            Error::Memory(format!(
                "struct field at {} outside element of {} bytes",
                dst_off, dst_len
            ))
        })?;
        kernel
            .child(i)?
            .call_single(dst_field, &[field_slice(src, src_off)?])?;
    }
    Ok(())
}

fn single_struct_assign(dst: &mut [u8], src: &[&[u8]], kernel: KernelRef<'_>) -> Result<()> {
    assign_struct_element(dst, unary_source(src)?, kernel)
}

fn strided_struct_assign(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[&[u8]],
    src_strides: &[usize],
    count: usize,
    kernel: KernelRef<'_>,
) -> Result<()> {
    strided_loop(dst, dst_stride, src, src_strides, count, |d, s| {
        assign_struct_element(d, unary_source(s)?, kernel)
    })
}

/// Assigns struct to struct, matching destination fields to source fields by name.
pub fn make_struct_assignment_kernel(
    builder: &mut KernelBuilder,
    offset: usize,
    dst: &StructDType,
    dst_meta: &Metadata,
    src: &StructDType,
    src_meta: &Metadata,
    kernreq: KernelRequest,
    errmode: AssignErrorMode,
    ectx: &EvalContext,
) -> Result<usize> {
    if src.field_count() != dst.field_count() {
        return Err(Error::TypeMismatch {
            dst: format!("struct with {} fields", dst.field_count()),
            src: format!("struct with {} fields", src.field_count()),
            context: "struct assignment",
        });
    }
    builder.construct_with_children(offset, |builder| {
        let mut pairs = Vec::with_capacity(dst.field_count());
        let mut children = Vec::with_capacity(dst.field_count());
        let mut end = offset + 1;

        for (i, name) in dst.field_names().iter().enumerate() {
            let j = src.field_index(name).ok_or_else(|| Error::TypeMismatch {
                dst: format!("struct field '{}'", name),
                src: "a struct without that field".into(),
                context: "struct assignment",
            })?;
            children.push(end - offset);
            end = make_assignment_kernel(
                builder,
                end,
                &dst.field_types()[i],
                dst_meta.field(i),
                &src.field_types()[j],
                src_meta.field(j),
                KernelRequest::Single,
                errmode,
                ectx,
            )?;
            pairs.push((dst.field_offsets()[i], src.field_offsets()[j]));
        }

        let mut prefix =
            KernelPrefix::unary(kernreq, single_struct_assign, strided_struct_assign)?;
        for relative in children {
            prefix = prefix.with_child(relative);
        }
        builder.construct(offset, prefix.with_data(FieldPairs { offsets: pairs }))?;
        Ok(end)
    })
}

struct StructComparison {
    comptype: ComparisonType,
    fields: FieldPairs,
}

fn compare_structs(src: &[&[u8]], kernel: KernelRef<'_>) -> Result<bool> {
    let data = kernel.data::<StructComparison>()?;
    let (a, b) = binary_sources(src)?;
    let ordered = data.comptype.is_ordered();
    let stride = if ordered { 2 } else { 1 };

    for (i, &(off0, off1)) in data.fields.offsets.iter().enumerate() {
        let args = [field_slice(a, off0)?, field_slice(b, off1)?];
        let equal = kernel.child(i * stride)?.call_predicate(&args)?;
        if !equal {
            return match data.comptype {
                ComparisonType::Equal => Ok(false),
                ComparisonType::NotEqual => Ok(true),
                _ => kernel.child(i * stride + 1)?.call_predicate(&args),
            };
        }
    }
    Ok(matches!(
        data.comptype,
        ComparisonType::Equal | ComparisonType::LessEqual | ComparisonType::GreaterEqual
    ))
}

/// Compares two structs with the same field names, lexicographically in field order.
pub fn make_struct_comparison_kernel(
    builder: &mut KernelBuilder,
    offset: usize,
    src0: &StructDType,
    src0_meta: &Metadata,
    src1: &StructDType,
    src1_meta: &Metadata,
    comptype: ComparisonType,
    ectx: &EvalContext,
) -> Result<usize> {
    if src0.field_names() != src1.field_names() {
        return Err(Error::NotComparable {
            lhs: format!("struct with fields {:?}", src0.field_names()),
            rhs: format!("struct with fields {:?}", src1.field_names()),
            comparison: comptype.symbol().to_string(),
        });
    }
    // Strict part of the requested ordering, decided at the first unequal field.
    let strict = match comptype {
        ComparisonType::Less | ComparisonType::LessEqual => Some(ComparisonType::Less),
        ComparisonType::Greater | ComparisonType::GreaterEqual => Some(ComparisonType::Greater),
        ComparisonType::Equal | ComparisonType::NotEqual => None,
    };

    builder.construct_with_children(offset, |builder| {
        let mut end = offset + 1;
        let mut children = Vec::new();
        let mut pairs = Vec::with_capacity(src0.field_count());
        for i in 0..src0.field_count() {
            let (t0, t1) = (&src0.field_types()[i], &src1.field_types()[i]);
            let (m0, m1) = (src0_meta.field(i), src1_meta.field(i));
            children.push(end - offset);
            end = make_comparison_kernel(
                builder,
                end,
                t0,
                m0,
                t1,
                m1,
                ComparisonType::Equal,
                ectx,
            )?;
            if let Some(strict) = strict {
                children.push(end - offset);
                end = make_comparison_kernel(builder, end, t0, m0, t1, m1, strict, ectx)?;
            }
            pairs.push((src0.field_offsets()[i], src1.field_offsets()[i]));
        }

        let mut prefix = KernelPrefix::new(KernelFunction::Predicate(compare_structs));
        for relative in children {
            prefix = prefix.with_child(relative);
        }
        builder.construct(
            offset,
            prefix.with_data(StructComparison {
                comptype,
                fields: FieldPairs { offsets: pairs },
            }),
        )?;
        Ok(end)
    })
}
