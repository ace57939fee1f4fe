// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn noop_single(_dst: &mut [u8], _src: &[&[u8]], _kernel: KernelRef<'_>) -> Result<()> {
    Ok(())
}

fn noop_strided(
    _dst: &mut [u8],
    _dst_stride: usize,
    _src: &[&[u8]],
    _src_strides: &[usize],
    _count: usize,
    _kernel: KernelRef<'_>,
) -> Result<()> {
    Ok(())
}

fn always_true(_src: &[&[u8]], _kernel: KernelRef<'_>) -> Result<bool> {
    Ok(true)
}

fn counting_destructor(builder: &mut KernelBuilder, offset: usize, prefix: &KernelPrefix) {
    if let Some(counter) = prefix.data::<Arc<AtomicUsize>>() {
        counter.fetch_add(1, Ordering::SeqCst);
    }
    destroy_child_kernels(builder, offset, prefix);
}

fn counted(counter: &Arc<AtomicUsize>) -> KernelPrefix {
    KernelPrefix::new(KernelFunction::Single(noop_single))
        .with_destructor(counting_destructor)
        .with_data(Arc::clone(counter))
}

#[test]
fn test_destructor_runs_once() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut builder = KernelBuilder::new();
    builder.construct(0, counted(&counter)).expect("construct");

    builder.destroy(0);
    builder.destroy(0);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert!(!builder.is_constructed(0));

    drop(builder);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_drop_destroys_remaining_kernels() {
    let counter = Arc::new(AtomicUsize::new(0));
    {
        let mut builder = KernelBuilder::new();
        builder.construct(0, counted(&counter)).expect("construct");
        builder.construct(3, counted(&counter)).expect("construct");
        assert_eq!(builder.len(), 4);
    }
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn test_children_destroyed_with_parent() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut builder = KernelBuilder::new();
    builder.construct(1, counted(&counter)).expect("child");
    builder.construct(2, counted(&counter)).expect("child");
    let parent = counted(&counter).with_child(1).with_child(2);
    builder.construct(0, parent).expect("parent");

    builder.destroy(0);
    assert_eq!(counter.load(Ordering::SeqCst), 3);
    assert!(!builder.is_constructed(1));
    assert!(!builder.is_constructed(2));

    // Children already gone: a second pass is a no-op.
    builder.reset();
    assert_eq!(counter.load(Ordering::SeqCst), 3);
    assert!(builder.is_empty());
}

#[test]
fn test_failed_children_are_destroyed() {
    let counter = Arc::new(AtomicUsize::new(0));
    let unrelated = Arc::new(AtomicUsize::new(0));
    let mut builder = KernelBuilder::new();
    builder.construct(5, counted(&unrelated)).expect("unrelated");

    let result = builder.construct_with_children(0, |b| {
        b.construct(1, counted(&counter))?;
        b.construct(2, counted(&counter))?;
        Err(Error::Construction("third child failed".into()))
    });
    assert!(matches!(result, Err(Error::Construction(_))));
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert!((0..5).all(|slot| !builder.is_constructed(slot)));
    assert!(builder.is_constructed(5));
    assert_eq!(unrelated.load(Ordering::SeqCst), 0);

    // The same offsets are free again.
    let end = builder
        .construct_with_children(0, |b| {
            b.construct(1, counted(&counter))?;
            b.construct(0, counted(&counter).with_child(1))?;
            Ok(2)
        })
        .expect("retry");
    assert_eq!(end, 2);
    assert!(builder.is_constructed(0) && builder.is_constructed(1));
}

#[test]
fn test_parent_slot_checked_before_children() {
    let mut builder = KernelBuilder::new();
    builder
        .construct(0, KernelPrefix::new(KernelFunction::Single(noop_single)))
        .expect("first");
    let result = builder.construct_with_children(0, |b| {
        b.construct(1, KernelPrefix::new(KernelFunction::Single(noop_single)))?;
        Ok(2)
    });
    assert!(matches!(result, Err(Error::InvalidKernelRequest(_))));
    assert!(!builder.is_constructed(1));
}

#[test]
fn test_slot_constructed_once() {
    let mut builder = KernelBuilder::new();
    builder
        .construct(0, KernelPrefix::new(KernelFunction::Single(noop_single)))
        .expect("first");
    assert!(matches!(
        builder.construct(0, KernelPrefix::new(KernelFunction::Single(noop_single))),
        Err(Error::InvalidKernelRequest(_))
    ));
}

#[test]
fn test_call_shape_must_match() {
    let mut builder = KernelBuilder::new();
    builder
        .construct(0, KernelPrefix::new(KernelFunction::Predicate(always_true)))
        .expect("predicate");
    let kernel = builder.get(0).expect("kernel");
    assert!(kernel.call_predicate(&[&[0u8; 0][..], &[0u8; 0][..]]).expect("call"));
    let mut dst = [0u8; 1];
    assert!(matches!(
        kernel.call_single(&mut dst, &[]),
        Err(Error::InvalidKernelRequest(_))
    ));
}

#[test]
fn test_strided_stride_count_checked() {
    let mut builder = KernelBuilder::new();
    builder
        .construct(0, KernelPrefix::new(KernelFunction::Strided(noop_strided)))
        .expect("strided");
    let mut dst = [0u8; 4];
    let src = [0u8; 4];
    let kernel = builder.get(0).expect("kernel");
    assert!(kernel
        .call_strided(&mut dst, 1, &[src.as_slice()], &[1], 4)
        .is_ok());
    assert!(kernel
        .call_strided(&mut dst, 1, &[src.as_slice()], &[1, 1], 4)
        .is_err());
}

#[test]
fn test_unary_prefix_rejects_predicate() {
    assert!(KernelPrefix::unary(KernelRequest::Predicate, noop_single, noop_strided).is_err());
    let prefix = KernelPrefix::unary(KernelRequest::Strided, noop_single, noop_strided)
        .expect("strided");
    assert_eq!(prefix.function().request(), KernelRequest::Strided);
}

#[test]
fn test_missing_kernel_and_data() {
    let mut builder = KernelBuilder::new();
    assert!(builder.get(0).is_err());
    builder
        .construct(0, KernelPrefix::new(KernelFunction::Single(noop_single)).with_data(7u32))
        .expect("construct");
    let kernel = builder.get(0).expect("kernel");
    assert_eq!(*kernel.data::<u32>().expect("data"), 7);
    assert!(matches!(kernel.data::<u64>(), Err(Error::Corruption(_))));
    assert!(kernel.child(0).is_err());
}

#[test]
fn test_strided_loop_binary() {
    let a = [1u8, 2, 3];
    let b = [10u8];
    let mut dst = [0u8; 3];
    strided_loop(&mut dst, 1, &[&a[..], &b[..]], &[1, 0], 3, |d, s| {
        d[0] = s[0][0] + s[1][0];
        Ok(())
    })
    .expect("loop");
    assert_eq!(dst, [11, 12, 13]);
}
