// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Byte-copy kernels for identical POD types.

use super::{
    element, element_mut, unary_source, FixedStrides, KernelBuilder, KernelFunction,
    KernelPrefix, KernelRef, KernelRequest, SingleFn, StridedFn,
};
use crate::error::{Error, Result};

fn copy_prefix(dst: &mut [u8], src: &[u8], size: usize) -> Result<()> {
    let (dst_len, src_len) = (dst.len(), src.len());
    match (dst.get_mut(..size), src.get(..size)) {
        (Some(d), Some(s)) => {
            d.copy_from_slice(s);
            Ok(())
        }
        _ => Err(Error::Memory(format!(
            "pod copy of {} bytes with dst {} / src {} bytes",
            size, dst_len, src_len
        ))),
    }
}

fn single_fixed<const N: usize>(dst: &mut [u8], src: &[&[u8]], _kernel: KernelRef<'_>) -> Result<()> {
    copy_prefix(dst, unary_source(src)?, N)
}

fn single_general(dst: &mut [u8], src: &[&[u8]], kernel: KernelRef<'_>) -> Result<()> {
    let size = *kernel.data::<usize>()?;
    copy_prefix(dst, unary_source(src)?, size)
}

fn strided_fixed<const N: usize>(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[&[u8]],
    src_strides: &[usize],
    count: usize,
    _kernel: KernelRef<'_>,
) -> Result<()> {
    let src0 = unary_source(src)?;
    for i in 0..count {
        copy_prefix(
            element_mut(dst, i, dst_stride)?,
            element(src0, i, src_strides[0])?,
            N,
        )?;
    }
    Ok(())
}

fn strided_general(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[&[u8]],
    src_strides: &[usize],
    count: usize,
    kernel: KernelRef<'_>,
) -> Result<()> {
    let size = *kernel.data::<usize>()?;
    let src0 = unary_source(src)?;
    for i in 0..count {
        copy_prefix(
            element_mut(dst, i, dst_stride)?,
            element(src0, i, src_strides[0])?,
            size,
        )?;
    }
    Ok(())
}

/// One memcpy when both operands are packed; falls back to the strided loop otherwise.
fn strided_contiguous(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[&[u8]],
    src_strides: &[usize],
    count: usize,
    kernel: KernelRef<'_>,
) -> Result<()> {
    let size = *kernel.data::<usize>()?;
    if dst_stride == size && src_strides[0] == size {
        copy_prefix(dst, unary_source(src)?, size * count)
    } else {
        strided_general(dst, dst_stride, src, src_strides, count, kernel)
    }
}

/// Instantiates a copy of `size` bytes per element.
pub fn make_pod_copy_kernel(
    builder: &mut KernelBuilder,
    offset: usize,
    size: usize,
    kernreq: KernelRequest,
    strides: FixedStrides,
) -> Result<usize> {
    let (single, strided): (SingleFn, StridedFn) = match size {
        1 => (single_fixed::<1>, strided_fixed::<1>),
        2 => (single_fixed::<2>, strided_fixed::<2>),
        4 => (single_fixed::<4>, strided_fixed::<4>),
        8 => (single_fixed::<8>, strided_fixed::<8>),
        16 => (single_fixed::<16>, strided_fixed::<16>),
        _ => (single_general, strided_general),
    };
    let strided: StridedFn = if strides == FixedStrides::contiguous(size) {
        strided_contiguous
    } else {
        strided
    };
    let prefix = match kernreq {
        KernelRequest::Single => KernelPrefix::new(KernelFunction::Single(single)),
        KernelRequest::Strided => KernelPrefix::new(KernelFunction::Strided(strided)),
        KernelRequest::Predicate => {
            return Err(Error::InvalidKernelRequest(
                "a predicate was requested from a copy kernel".into(),
            ))
        }
    };
    builder.construct(offset, prefix.with_data(size))?;
    Ok(offset + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_copy_sizes() {
        for size in [1usize, 2, 3, 4, 8, 16, 24] {
            let mut builder = KernelBuilder::new();
            let end = make_pod_copy_kernel(
                &mut builder,
                0,
                size,
                KernelRequest::Single,
                FixedStrides::UNKNOWN,
            )
            .expect("kernel");
            assert_eq!(end, 1);
            let src: Vec<u8> = (0..size as u8).collect();
            let mut dst = vec![0u8; size];
            builder
                .get(0)
                .expect("kernel")
                .call_single(&mut dst, &[src.as_slice()])
                .expect("copy");
            assert_eq!(dst, src);
        }
    }

    #[test]
    fn test_contiguous_and_strided() {
        let mut builder = KernelBuilder::new();
        make_pod_copy_kernel(
            &mut builder,
            0,
            2,
            KernelRequest::Strided,
            FixedStrides::contiguous(2),
        )
        .expect("kernel");
        let kernel = builder.get(0).expect("kernel");

        let src = [1u8, 2, 3, 4, 5, 6];
        let mut dst = [0u8; 6];
        kernel
            .call_strided(&mut dst, 2, &[&src[..]], &[2], 3)
            .expect("packed copy");
        assert_eq!(dst, src);

        // Broadcast a single source element with stride 0.
        let mut dst = [0u8; 6];
        kernel
            .call_strided(&mut dst, 2, &[&src[..2]], &[0], 3)
            .expect("broadcast copy");
        assert_eq!(dst, [1, 2, 1, 2, 1, 2]);
    }

    #[test]
    fn test_short_buffer_is_error() {
        let mut builder = KernelBuilder::new();
        make_pod_copy_kernel(&mut builder, 0, 8, KernelRequest::Single, FixedStrides::UNKNOWN)
            .expect("kernel");
        let mut dst = [0u8; 4];
        assert!(builder
            .get(0)
            .expect("kernel")
            .call_single(&mut dst, &[&[0u8; 8][..]])
            .is_err());
    }
}
