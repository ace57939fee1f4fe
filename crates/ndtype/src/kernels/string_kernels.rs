// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Kernels for string-kind types.
//!
//! Strings convert through decoded text: string to string re-encodes, string to
//! builtin parses the text, builtin to string prints the value. Comparison orders
//! decoded text by code point.

use super::comparison::binary_sources;
use super::errmode::{with_error_policy, ErrorPolicy};
use super::{
    strided_loop, unary_source, AssignErrorMode, ComparisonType, KernelBuilder, KernelFunction,
    KernelPrefix, KernelRef, KernelRequest, SingleFn, StridedFn,
};
use crate::config::EvalContext;
use crate::error::{Error, Result};
use crate::types::builtin::{parse_scalar_text, print_builtin_element, with_scalar_type, Scalar};
use crate::types::extended::{forward_assignment_kernel, forward_comparison_kernel, StringDType};
use crate::types::{DType, Metadata, TypeId};

/// A string type and an owned copy of the metadata its kernel reads.
struct StringOperand {
    tp: DType,
    meta: Metadata,
}

impl StringOperand {
    fn new(tp: &DType, meta: &Metadata) -> Result<Self> {
        Ok(Self {
            tp: tp.clone(),
            meta: tp.metadata_copy_construct(meta, None)?,
        })
    }

    fn string(&self) -> Result<&dyn StringDType> {
        string_capability(&self.tp)
    }

    fn get(&self, data: &[u8]) -> Result<String> {
        self.string()?.get_string(data, &self.meta)
    }

    fn set(&self, data: &mut [u8], value: &str, errmode: AssignErrorMode) -> Result<()> {
        self.string()?.set_string(data, &self.meta, value, errmode)
    }
}

impl Drop for StringOperand {
    fn drop(&mut self) {
        self.tp.metadata_destruct(&mut self.meta);
    }
}

fn string_capability(tp: &DType) -> Result<&dyn StringDType> {
    tp.extended()
        .and_then(|ext| ext.as_string())
        .ok_or_else(|| Error::Corruption(format!("{} has no string capability", tp)))
}

fn is_string(tp: &DType) -> bool {
    tp.extended().map_or(false, |ext| ext.as_string().is_some())
}

fn is_builtin_scalar(tp: &DType) -> bool {
    tp.is_builtin() && tp.type_id().is_builtin_scalar()
}

// --- string to string ---

struct StringToString {
    dst: StringOperand,
    src: StringOperand,
    errmode: AssignErrorMode,
}

fn string_to_string(dst: &mut [u8], src: &[u8], data: &StringToString) -> Result<()> {
    let text = data.src.get(src)?;
    data.dst.set(dst, &text, data.errmode)
}

fn single_string_to_string(dst: &mut [u8], src: &[&[u8]], kernel: KernelRef<'_>) -> Result<()> {
    string_to_string(dst, unary_source(src)?, kernel.data::<StringToString>()?)
}

fn strided_string_to_string(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[&[u8]],
    src_strides: &[usize],
    count: usize,
    kernel: KernelRef<'_>,
) -> Result<()> {
    let data = kernel.data::<StringToString>()?;
    strided_loop(dst, dst_stride, src, src_strides, count, |d, s| {
        string_to_string(d, unary_source(s)?, data)
    })
}

// --- string to builtin ---

fn string_to_builtin<D: Scalar, P: ErrorPolicy>(
    dst: &mut [u8],
    src: &[u8],
    data: &StringOperand,
) -> Result<()> {
    let text = data.get(src)?;
    D::from_value::<P>(parse_scalar_text(&text, D::TYPE_ID)?)?.store(dst)
}

fn single_string_to_builtin<D: Scalar, P: ErrorPolicy>(
    dst: &mut [u8],
    src: &[&[u8]],
    kernel: KernelRef<'_>,
) -> Result<()> {
    string_to_builtin::<D, P>(dst, unary_source(src)?, kernel.data::<StringOperand>()?)
}

fn strided_string_to_builtin<D: Scalar, P: ErrorPolicy>(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[&[u8]],
    src_strides: &[usize],
    count: usize,
    kernel: KernelRef<'_>,
) -> Result<()> {
    let data = kernel.data::<StringOperand>()?;
    strided_loop(dst, dst_stride, src, src_strides, count, |d, s| {
        string_to_builtin::<D, P>(d, unary_source(s)?, data)
    })
}

// --- builtin to string ---

struct BuiltinToString {
    dst: StringOperand,
    src_id: TypeId,
    errmode: AssignErrorMode,
}

fn builtin_to_string(dst: &mut [u8], src: &[u8], data: &BuiltinToString) -> Result<()> {
    let mut text = String::new();
    print_builtin_element(data.src_id, &mut text, src)?;
    data.dst.set(dst, &text, data.errmode)
}

fn single_builtin_to_string(dst: &mut [u8], src: &[&[u8]], kernel: KernelRef<'_>) -> Result<()> {
    builtin_to_string(dst, unary_source(src)?, kernel.data::<BuiltinToString>()?)
}

fn strided_builtin_to_string(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[&[u8]],
    src_strides: &[usize],
    count: usize,
    kernel: KernelRef<'_>,
) -> Result<()> {
    let data = kernel.data::<BuiltinToString>()?;
    strided_loop(dst, dst_stride, src, src_strides, count, |d, s| {
        builtin_to_string(d, unary_source(s)?, data)
    })
}

/// Assignment hook shared by the string types.
///
/// Handles string to string, string to builtin scalar and builtin scalar to string;
/// other pairings fall back to [`forward_assignment_kernel`].
pub fn make_string_assignment_kernel<T: ?Sized>(
    this: &T,
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
    let errmode = errmode.resolve(ectx);
    let prefix = if is_string(dst) && is_string(src) {
        KernelPrefix::unary(kernreq, single_string_to_string, strided_string_to_string)?
            .with_data(StringToString {
                dst: StringOperand::new(dst, dst_meta)?,
                src: StringOperand::new(src, src_meta)?,
                errmode,
            })
    } else if is_string(dst) && is_builtin_scalar(src) {
        KernelPrefix::unary(kernreq, single_builtin_to_string, strided_builtin_to_string)?
            .with_data(BuiltinToString {
                dst: StringOperand::new(dst, dst_meta)?,
                src_id: src.type_id(),
                errmode,
            })
    } else if is_string(src) && is_builtin_scalar(dst) {
        let dst_id = dst.type_id();
        let (single, strided): (SingleFn, StridedFn) = with_scalar_type!(
            dst_id,
            D => with_error_policy!(
                errmode,
                P => (
                    single_string_to_builtin::<D, P> as SingleFn,
                    strided_string_to_builtin::<D, P> as StridedFn,
                )
            ),
            _ => return Err(Error::mismatch(dst, src, "string assignment"))
        );
        KernelPrefix::unary(kernreq, single, strided)?
            .with_data(StringOperand::new(src, src_meta)?)
    } else {
        return forward_assignment_kernel(
            this, builder, offset, dst, dst_meta, src, src_meta, kernreq, errmode, ectx,
        );
    };
    builder.construct(offset, prefix)?;
    Ok(offset + 1)
}

struct StringComparison {
    lhs: StringOperand,
    rhs: StringOperand,
    comptype: ComparisonType,
}

fn compare_strings(src: &[&[u8]], kernel: KernelRef<'_>) -> Result<bool> {
    let data = kernel.data::<StringComparison>()?;
    let (a, b) = binary_sources(src)?;
    let ordering = data.lhs.get(a)?.cmp(&data.rhs.get(b)?);
    Ok(data.comptype.holds(Some(ordering)))
}

/// Comparison hook shared by the string types; both operands must be strings.
pub fn make_string_comparison_kernel<T: ?Sized>(
    this: &T,
    builder: &mut KernelBuilder,
    offset: usize,
    src0: &DType,
    src0_meta: &Metadata,
    src1: &DType,
    src1_meta: &Metadata,
    comptype: ComparisonType,
    ectx: &EvalContext,
) -> Result<usize> {
    if !(is_string(src0) && is_string(src1)) {
        return forward_comparison_kernel(
            this, builder, offset, src0, src0_meta, src1, src1_meta, comptype, ectx,
        );
    }
    let prefix = KernelPrefix::new(KernelFunction::Predicate(compare_strings)).with_data(
        StringComparison {
            lhs: StringOperand::new(src0, src0_meta)?,
            rhs: StringOperand::new(src1, src1_meta)?,
            comptype,
        },
    );
    builder.construct(offset, prefix)?;
    Ok(offset + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::{assign_element, compare_elements};
    use crate::types::encoding::StringEncoding;
    use crate::types::{make_dtype, make_fixedstring_dtype, make_string_dtype};

    fn fixed(size: usize) -> DType {
        make_fixedstring_dtype(size, StringEncoding::Utf8).expect("string")
    }

    #[test]
    fn test_builtin_to_fixed_string() {
        let dst_tp = fixed(8);
        let mut dst = [0u8; 8];
        assign_element(
            &dst_tp,
            &Metadata::None,
            &mut dst,
            &make_dtype::<i32>(),
            &Metadata::None,
            &(-42i32).to_ne_bytes(),
            AssignErrorMode::Default,
        )
        .expect("assign");
        assert_eq!(&dst, b"-42\0\0\0\0\0");
    }

    #[test]
    fn test_fixed_string_to_builtin() {
        let mut dst = [0u8; 8];
        assign_element(
            &make_dtype::<f64>(),
            &Metadata::None,
            &mut dst,
            &fixed(4),
            &Metadata::None,
            b"2.5\0",
            AssignErrorMode::Default,
        )
        .expect("assign");
        assert_eq!(f64::from_ne_bytes(dst), 2.5);

        let mut small = [0u8; 1];
        let err = assign_element(
            &make_dtype::<i8>(),
            &Metadata::None,
            &mut small,
            &fixed(4),
            &Metadata::None,
            b"300\0",
            AssignErrorMode::Overflow,
        )
        .expect_err("overflow");
        assert!(matches!(err, Error::Overflow { .. }));
    }

    #[test]
    fn test_fixed_to_var_string_and_back() {
        let var = make_string_dtype(StringEncoding::Utf8);
        let meta = var.metadata_default_construct(&[]).expect("meta");
        let mut element = [0u8; 16];
        assign_element(
            &var,
            &meta,
            &mut element,
            &fixed(5),
            &Metadata::None,
            b"hello",
            AssignErrorMode::Default,
        )
        .expect("to var");

        let narrow = make_fixedstring_dtype(3, StringEncoding::Ascii).expect("string");
        let mut out = [0u8; 3];
        assign_element(
            &narrow,
            &Metadata::None,
            &mut out,
            &var,
            &meta,
            &element,
            AssignErrorMode::None,
        )
        .expect("truncating");
        assert_eq!(&out, b"hel");
        assert!(assign_element(
            &narrow,
            &Metadata::None,
            &mut out,
            &var,
            &meta,
            &element,
            AssignErrorMode::Overflow,
        )
        .is_err());
    }

    #[test]
    fn test_string_comparison() {
        let (a, b) = (fixed(4), make_fixedstring_dtype(2, StringEncoding::Utf16).expect("s"));
        let mut wide = [0u8; 4];
        b.extended()
            .and_then(|e| e.as_string())
            .expect("string")
            .set_string(&mut wide, &Metadata::None, "ab", AssignErrorMode::None)
            .expect("set");
        let cmp = |lhs: &[u8], c| {
            compare_elements(&a, &Metadata::None, lhs, &b, &Metadata::None, &wide, c)
                .expect("compare")
        };
        assert!(cmp(b"ab\0\0", ComparisonType::Equal));
        assert!(cmp(b"abc\0", ComparisonType::Greater));
        assert!(cmp(b"a\0\0\0", ComparisonType::Less));
    }

    #[test]
    fn test_string_vs_int_not_comparable() {
        let data = [0u8; 4];
        assert!(matches!(
            compare_elements(
                &fixed(4),
                &Metadata::None,
                &data,
                &make_dtype::<i32>(),
                &Metadata::None,
                &data,
                ComparisonType::Equal
            ),
            Err(Error::NotComparable { .. })
        ));
    }
}
