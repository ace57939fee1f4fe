// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Assignment kernel negotiation and the builtin assignment table.
//!
//! # Negotiation order
//!
//! 1. `Default` resolves through the [`EvalContext`]; a lossless pair runs unchecked.
//! 2. Identical POD types copy bytes.
//! 3. Two builtins use the builtin table.
//! 4. A destination descriptor is asked first. Its fallback asks the source.
//! 5. Otherwise the source descriptor is asked.
//!
//! Every builtin kernel is a monomorphization over `(dst, src, policy)`, so the
//! error mode is fixed when the function pointer is chosen.

use super::errmode::{with_error_policy, ErrorPolicy};
use super::{
    element, element_mut, make_pod_copy_kernel, unary_source, AssignErrorMode, FixedStrides,
    KernelBuilder, KernelPrefix, KernelRef, KernelRequest, SingleFn, StridedFn,
};
use crate::config::{runtime, EvalContext};
use crate::error::{Error, Result};
use crate::types::builtin::{with_scalar_type, Scalar};
use crate::types::{DType, Metadata, TypeId, TypeKind};
use crate::{assert_aligned, trace_assignment};

fn assign_one<D: Scalar, S: Scalar, P: ErrorPolicy>(dst: &mut [u8], src: &[u8]) -> Result<()> {
    let value = S::load(src)?;
    let converted = D::from_value::<P>(value.to_value())?;
    trace_assignment!(
        "{} {:?} -> {} {:?} ({})",
        S::TYPE_ID,
        value,
        D::TYPE_ID,
        converted,
        P::MODE
    );
    converted.store(dst)
}

fn single_builtin<D: Scalar, S: Scalar, P: ErrorPolicy>(
    dst: &mut [u8],
    src: &[&[u8]],
    _kernel: KernelRef<'_>,
) -> Result<()> {
    assign_one::<D, S, P>(dst, unary_source(src)?)
}

fn strided_builtin<D: Scalar, S: Scalar, P: ErrorPolicy>(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[&[u8]],
    src_strides: &[usize],
    count: usize,
    _kernel: KernelRef<'_>,
) -> Result<()> {
    let src0 = unary_source(src)?;
    let src_stride = src_strides[0];
    assert_aligned!(
        std::mem::align_of::<D>(),
        dst.as_ptr(),
        dst_stride,
        "builtin assignment dst"
    );
    assert_aligned!(
        std::mem::align_of::<S>(),
        src0.as_ptr(),
        src_stride,
        "builtin assignment src"
    );
    for i in 0..count {
        assign_one::<D, S, P>(
            element_mut(dst, i, dst_stride)?,
            element(src0, i, src_stride)?,
        )?;
    }
    Ok(())
}

fn single_noop(_dst: &mut [u8], _src: &[&[u8]], _kernel: KernelRef<'_>) -> Result<()> {
    Ok(())
}

fn strided_noop(
    _dst: &mut [u8],
    _dst_stride: usize,
    _src: &[&[u8]],
    _src_strides: &[usize],
    _count: usize,
    _kernel: KernelRef<'_>,
) -> Result<()> {
    Ok(())
}

fn builtin_mismatch(dst: TypeId, src: TypeId) -> Error {
    Error::TypeMismatch {
        dst: dst.name().to_string(),
        src: src.name().to_string(),
        context: "builtin assignment",
    }
}

/// Instantiates a builtin-to-builtin assignment kernel.
///
/// `errmode` must already be resolved; `Default` is treated as `Inexact`.
pub fn make_builtin_assignment_kernel(
    builder: &mut KernelBuilder,
    offset: usize,
    dst_id: TypeId,
    src_id: TypeId,
    kernreq: KernelRequest,
    errmode: AssignErrorMode,
) -> Result<usize> {
    if dst_id == TypeId::Void || src_id == TypeId::Void {
        if dst_id != src_id {
            return Err(builtin_mismatch(dst_id, src_id));
        }
        builder.construct(offset, KernelPrefix::unary(kernreq, single_noop, strided_noop)?)?;
        return Ok(offset + 1);
    }

    let (single, strided): (SingleFn, StridedFn) = with_scalar_type!(
        dst_id,
        D => with_scalar_type!(
            src_id,
            S => with_error_policy!(
                errmode,
                P => (
                    single_builtin::<D, S, P> as SingleFn,
                    strided_builtin::<D, S, P> as StridedFn,
                )
            ),
            _ => return Err(builtin_mismatch(dst_id, src_id))
        ),
        _ => return Err(builtin_mismatch(dst_id, src_id))
    );

    builder.construct(offset, KernelPrefix::unary(kernreq, single, strided)?)?;
    Ok(offset + 1)
}

/// True when every `src` value of one builtin is representable in another.
pub fn is_lossless_builtin(dst: TypeId, src: TypeId) -> bool {
    if dst == src {
        return true;
    }
    let (Some(d), Some(s)) = (dst.builtin_layout(), src.builtin_layout()) else {
        return false;
    };
    let (dsize, ssize) = (d.element_size, s.element_size);
    match (s.kind, d.kind) {
        (TypeKind::Bool, TypeKind::Int | TypeKind::UInt | TypeKind::Real | TypeKind::Complex) => {
            true
        }
        (TypeKind::Int, TypeKind::Int) | (TypeKind::UInt, TypeKind::UInt) => dsize > ssize,
        (TypeKind::UInt, TypeKind::Int) => dsize > ssize,
        // Integers fit a float mantissa of at least twice their width.
        (TypeKind::Int | TypeKind::UInt, TypeKind::Real) => ssize * 2 <= dsize,
        (TypeKind::Int | TypeKind::UInt, TypeKind::Complex) => ssize * 4 <= dsize,
        (TypeKind::Real, TypeKind::Real) => dsize > ssize,
        (TypeKind::Real, TypeKind::Complex) => dsize >= ssize * 2,
        (TypeKind::Complex, TypeKind::Complex) => dsize > ssize,
        _ => false,
    }
}

/// True when assigning `src` to `dst` can never lose information.
pub fn is_lossless_assignment(dst: &DType, src: &DType) -> bool {
    if dst == src {
        return true;
    }
    if dst.is_builtin() && src.is_builtin() {
        return is_lossless_builtin(dst.type_id(), src.type_id());
    }
    match (dst.extended(), src.extended()) {
        (Some(ext), _) if ext.is_lossless_assignment(dst, src) => true,
        (_, Some(ext)) => ext.is_lossless_assignment(dst, src),
        _ => false,
    }
}

/// Instantiates a kernel assigning `src` elements to `dst` elements at `offset`.
///
/// Returns the offset past the kernel and its children.
pub fn make_assignment_kernel(
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
    let mut errmode = errmode.resolve(ectx);
    if errmode != AssignErrorMode::None && is_lossless_assignment(dst, src) {
        errmode = AssignErrorMode::None;
    }
    log::debug!(
        "[ndtype::kernels] assignment kernel {} <- {} at slot {} ({}, {:?})",
        dst,
        src,
        offset,
        errmode,
        kernreq
    );

    if dst == src && dst.is_pod() {
        return make_pod_copy_kernel(
            builder,
            offset,
            dst.element_size(),
            kernreq,
            FixedStrides::UNKNOWN,
        );
    }

    if dst.is_builtin() && src.is_builtin() {
        return make_builtin_assignment_kernel(
            builder,
            offset,
            dst.type_id(),
            src.type_id(),
            kernreq,
            errmode,
        );
    }

    if let Some(ext) = dst.extended() {
        return ext.make_assignment_kernel(
            builder, offset, dst, dst_meta, src, src_meta, kernreq, errmode, ectx,
        );
    }
    if let Some(ext) = src.extended() {
        return ext.make_assignment_kernel(
            builder, offset, dst, dst_meta, src, src_meta, kernreq, errmode, ectx,
        );
    }
    Err(Error::mismatch(dst, src, "no assignment kernel"))
}

/// Assigns one element, using the global evaluation context.
pub fn assign_element(
    dst_tp: &DType,
    dst_meta: &Metadata,
    dst: &mut [u8],
    src_tp: &DType,
    src_meta: &Metadata,
    src: &[u8],
    errmode: AssignErrorMode,
) -> Result<()> {
    let ectx = runtime().eval_context();
    let mut builder = KernelBuilder::new();
    make_assignment_kernel(
        &mut builder,
        0,
        dst_tp,
        dst_meta,
        src_tp,
        src_meta,
        KernelRequest::Single,
        errmode,
        &ectx,
    )?;
    builder.get(0)?.call_single(dst, &[src])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::make_dtype;

    fn assign<D: Scalar + Default, S: Scalar>(value: S, errmode: AssignErrorMode) -> Result<D> {
        let mut src = [0u8; 16];
        value.store(&mut src)?;
        let mut dst = [0u8; 16];
        assign_element(
            &make_dtype::<D>(),
            &Metadata::None,
            &mut dst,
            &make_dtype::<S>(),
            &Metadata::None,
            &src,
            errmode,
        )?;
        D::load(&dst)
    }

    #[test]
    fn test_int_narrowing_modes() {
        assert_eq!(assign::<i8, i32>(300, AssignErrorMode::None).expect("wrap"), 44);
        assert!(matches!(
            assign::<i8, i32>(300, AssignErrorMode::Overflow),
            Err(Error::Overflow { .. })
        ));
        assert_eq!(assign::<i8, i32>(-5, AssignErrorMode::Inexact).expect("fits"), -5);
    }

    #[test]
    fn test_float_to_int_fractional() {
        assert_eq!(assign::<i32, f64>(2.5, AssignErrorMode::Overflow).expect("trunc"), 2);
        assert!(matches!(
            assign::<i32, f64>(2.5, AssignErrorMode::Fractional),
            Err(Error::Fractional { .. })
        ));
        assert_eq!(assign::<i32, f64>(4.0, AssignErrorMode::Fractional).expect("whole"), 4);
    }

    #[test]
    fn test_default_mode_resolves_to_context() {
        // The global default is fractional.
        assert!(assign::<i32, f64>(2.5, AssignErrorMode::Default).is_err());
    }

    #[test]
    fn test_lossless_pairs() {
        assert!(is_lossless_builtin(TypeId::Int64, TypeId::Int32));
        assert!(is_lossless_builtin(TypeId::Float64, TypeId::Int32));
        assert!(!is_lossless_builtin(TypeId::Float64, TypeId::Int64));
        assert!(is_lossless_builtin(TypeId::Int32, TypeId::UInt16));
        assert!(!is_lossless_builtin(TypeId::Int32, TypeId::UInt32));
        assert!(is_lossless_builtin(TypeId::Complex128, TypeId::Float64));
        assert!(!is_lossless_builtin(TypeId::Bool, TypeId::Int8));
        assert!(!is_lossless_builtin(TypeId::Void, TypeId::Int8));
    }

    #[test]
    fn test_identical_pod_is_copy() {
        let t = make_dtype::<u64>();
        let mut builder = KernelBuilder::new();
        let end = make_assignment_kernel(
            &mut builder,
            0,
            &t,
            &Metadata::None,
            &t,
            &Metadata::None,
            KernelRequest::Strided,
            AssignErrorMode::Inexact,
            &EvalContext::default(),
        )
        .expect("kernel");
        assert_eq!(end, 1);
        let src: Vec<u8> = (0..16).collect();
        let mut dst = vec![0u8; 16];
        builder
            .get(0)
            .expect("kernel")
            .call_strided(&mut dst, 8, &[src.as_slice()], &[8], 2)
            .expect("copy");
        assert_eq!(dst, src);
    }

    #[test]
    fn test_strided_conversion() {
        let mut builder = KernelBuilder::new();
        make_builtin_assignment_kernel(
            &mut builder,
            0,
            TypeId::Float64,
            TypeId::Int16,
            KernelRequest::Strided,
            AssignErrorMode::Inexact,
        )
        .expect("kernel");
        let mut src = Vec::new();
        for v in [1i16, -2, 300] {
            src.extend_from_slice(&v.to_ne_bytes());
        }
        let mut dst = vec![0u8; 24];
        builder
            .get(0)
            .expect("kernel")
            .call_strided(&mut dst, 8, &[src.as_slice()], &[2], 3)
            .expect("convert");
        let out: Vec<f64> = dst
            .chunks(8)
            .map(|c| f64::load(c).expect("load"))
            .collect();
        assert_eq!(out, vec![1.0, -2.0, 300.0]);
    }

    #[test]
    fn test_void_pairs() {
        let mut builder = KernelBuilder::new();
        assert!(make_builtin_assignment_kernel(
            &mut builder,
            0,
            TypeId::Void,
            TypeId::Void,
            KernelRequest::Single,
            AssignErrorMode::None,
        )
        .is_ok());
        assert!(matches!(
            make_builtin_assignment_kernel(
                &mut builder,
                1,
                TypeId::Int8,
                TypeId::Void,
                KernelRequest::Single,
                AssignErrorMode::None,
            ),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_predicate_request_rejected() {
        let mut builder = KernelBuilder::new();
        assert!(matches!(
            make_builtin_assignment_kernel(
                &mut builder,
                0,
                TypeId::Int8,
                TypeId::Int16,
                KernelRequest::Predicate,
                AssignErrorMode::None,
            ),
            Err(Error::InvalidKernelRequest(_))
        ));
    }
}
