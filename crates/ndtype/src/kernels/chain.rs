// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Two-stage kernels joined through a scratch buffer.
//!
//! ```text
//! src --child 0--> buffer (intermediate type) --child 1--> dst
//! ```
//!
//! Strided calls are processed in chunks so the scratch buffer stays bounded.

use super::{
    element, element_mut, unary_source, KernelBuilder, KernelPrefix, KernelRef, KernelRequest,
};
use crate::error::{Error, Result};
use crate::types::{DType, Metadata};

/// Elements per scratch chunk in strided calls.
const CHAIN_CHUNK_SIZE: usize = 128;

struct ChainData {
    buffer_type: DType,
    buffer_meta: Metadata,
    buffer_size: usize,
}

impl Drop for ChainData {
    fn drop(&mut self) {
        self.buffer_type.metadata_destruct(&mut self.buffer_meta);
    }
}

fn single_chain(dst: &mut [u8], src: &[&[u8]], kernel: KernelRef<'_>) -> Result<()> {
    let data = kernel.data::<ChainData>()?;
    let mut buffer = vec![0u8; data.buffer_size];
    kernel.child(0)?.call_single(&mut buffer, src)?;
    kernel.child(1)?.call_single(dst, &[buffer.as_slice()])
}

fn strided_chain(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[&[u8]],
    src_strides: &[usize],
    count: usize,
    kernel: KernelRef<'_>,
) -> Result<()> {
    let data = kernel.data::<ChainData>()?;
    let (first, second) = (kernel.child(0)?, kernel.child(1)?);
    let src0 = unary_source(src)?;
    let size = data.buffer_size;
    let mut buffer = vec![0u8; size * CHAIN_CHUNK_SIZE.min(count)];

    let mut done = 0;
    while done < count {
        let chunk = CHAIN_CHUNK_SIZE.min(count - done);
        first.call_strided(
            &mut buffer,
            size,
            &[element(src0, done, src_strides[0])?],
            &src_strides[..1],
            chunk,
        )?;
        second.call_strided(
            element_mut(dst, done, dst_stride)?,
            dst_stride,
            &[buffer.as_slice()],
            &[size],
            chunk,
        )?;
        done += chunk;
    }
    Ok(())
}

/// Instantiates `second(first(src))` through a buffer of `buffer_type`.
///
/// `first` is built at `offset + 1` and receives the buffer metadata as its
/// destination metadata; `second` is built after it and receives the same metadata
/// as its source metadata. Both are requested with `kernreq`.
pub fn make_buffered_chain_kernel<F, S>(
    builder: &mut KernelBuilder,
    offset: usize,
    buffer_type: &DType,
    kernreq: KernelRequest,
    first: F,
    second: S,
) -> Result<usize>
where
    F: FnOnce(&mut KernelBuilder, usize, &Metadata, KernelRequest) -> Result<usize>,
    S: FnOnce(&mut KernelBuilder, usize, &Metadata, KernelRequest) -> Result<usize>,
{
    if kernreq == KernelRequest::Predicate {
        return Err(Error::InvalidKernelRequest(
            "a predicate was requested from a buffered chain".into(),
        ));
    }
    if buffer_type.element_size() == 0 {
        return Err(Error::Construction(format!(
            "cannot buffer elements of type {} without a fixed size",
            buffer_type
        )));
    }

    let buffer_meta = buffer_type.metadata_default_construct(&[])?;
    builder.construct_with_children(offset, |builder| {
        let first_end = first(builder, offset + 1, &buffer_meta, kernreq)?;
        let end = second(builder, first_end, &buffer_meta, kernreq)?;

        let prefix = KernelPrefix::unary(kernreq, single_chain, strided_chain)?
            .with_child(1)
            .with_child(first_end - offset)
            .with_data(ChainData {
                buffer_type: buffer_type.clone(),
                buffer_meta,
                buffer_size: buffer_type.element_size(),
            });
        builder.construct(offset, prefix)?;
        Ok(end)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvalContext;
    use crate::kernels::{make_assignment_kernel, AssignErrorMode};
    use crate::types::builtin::Scalar;
    use crate::types::make_dtype;

    fn int8_via_float64(kernreq: KernelRequest) -> KernelBuilder {
        let ectx = EvalContext::default();
        let (i8t, f64t, i32t) = (make_dtype::<i8>(), make_dtype::<f64>(), make_dtype::<i32>());
        let mut builder = KernelBuilder::new();
        make_buffered_chain_kernel(
            &mut builder,
            0,
            &f64t,
            kernreq,
            |b, off, meta, req| {
                make_assignment_kernel(
                    b, off, &f64t, meta, &i8t, &Metadata::None, req, AssignErrorMode::None, &ectx,
                )
            },
            |b, off, meta, req| {
                make_assignment_kernel(
                    b, off, &i32t, &Metadata::None, &f64t, meta, req, AssignErrorMode::None, &ectx,
                )
            },
        )
        .expect("chain");
        builder
    }

    #[test]
    fn test_single_chain() {
        let builder = int8_via_float64(KernelRequest::Single);
        assert_eq!(builder.len(), 3);
        let mut dst = [0u8; 4];
        builder
            .get(0)
            .expect("kernel")
            .call_single(&mut dst, &[&[0xfeu8][..]])
            .expect("call");
        assert_eq!(i32::load(&dst).expect("load"), -2);
    }

    #[test]
    fn test_strided_chain_spans_chunks() {
        let builder = int8_via_float64(KernelRequest::Strided);
        let count = CHAIN_CHUNK_SIZE * 2 + 5;
        let src: Vec<u8> = (0..count).map(|i| (i % 100) as u8).collect();
        let mut dst = vec![0u8; count * 4];
        builder
            .get(0)
            .expect("kernel")
            .call_strided(&mut dst, 4, &[src.as_slice()], &[1], count)
            .expect("call");
        for i in [0, 127, 128, 255, 256, count - 1] {
            assert_eq!(
                i32::load(&dst[i * 4..]).expect("load"),
                (i % 100) as i32,
                "element {}",
                i
            );
        }
    }

    #[test]
    fn test_sized_buffer_required() {
        let mut builder = KernelBuilder::new();
        let result = make_buffered_chain_kernel(
            &mut builder,
            0,
            &DType::default(),
            KernelRequest::Single,
            |_, off, _, _| Ok(off + 1),
            |_, off, _, _| Ok(off + 1),
        );
        assert!(matches!(result, Err(Error::Construction(_))));
    }
}
