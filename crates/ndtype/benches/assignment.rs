// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Assignment Kernel Benchmark
//!
//! Measures strided assignment throughput for:
//! - POD copies between equal types
//! - Builtin conversions under each error mode
//! - Expression chains (byteswap + convert) that go through scratch buffers
//!
//! Also measures type-string parsing with and without the type cache.

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_precision_loss)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ndtype::config::EvalContext;
use ndtype::kernels::{make_assignment_kernel, AssignErrorMode, KernelBuilder, KernelRequest};
use ndtype::types::{parse_dtype_cached, TypeCache};
use ndtype::{make_byteswap, make_convert, make_dtype, parse_dtype, DType, Metadata};

const ELEMENTS: usize = 4096;

fn strided_kernel(dst: &DType, src: &DType, errmode: AssignErrorMode) -> KernelBuilder {
    let mut builder = KernelBuilder::new();
    make_assignment_kernel(
        &mut builder,
        0,
        dst,
        &Metadata::None,
        src,
        &Metadata::None,
        KernelRequest::Strided,
        errmode,
        &EvalContext::default(),
    )
    .expect("kernel");
    builder
}

fn run(builder: &KernelBuilder, dst: &mut [u8], dst_size: usize, src: &[u8], src_size: usize) {
    builder
        .get(0)
        .expect("root")
        .call_strided(dst, dst_size, &[src], &[src_size], ELEMENTS)
        .expect("call");
}

/// Benchmark: strided copy of equal POD types
fn bench_pod_copy(c: &mut Criterion) {
    let t = make_dtype::<f64>();
    let builder = strided_kernel(&t, &t, AssignErrorMode::Default);
    let src = vec![1u8; 8 * ELEMENTS];
    let mut dst = vec![0u8; 8 * ELEMENTS];

    let mut group = c.benchmark_group("pod_copy");
    group.throughput(Throughput::Bytes((8 * ELEMENTS) as u64));
    group.bench_function("float64", |b| {
        b.iter(|| run(&builder, black_box(&mut dst), 8, black_box(&src), 8));
    });
    group.finish();
}

/// Benchmark: float64 -> int32 under each error mode
fn bench_builtin_errmodes(c: &mut Criterion) {
    let (dst_t, src_t) = (make_dtype::<i32>(), make_dtype::<f64>());
    let src: Vec<u8> = (0..ELEMENTS)
        .flat_map(|i| (i as f64).to_ne_bytes())
        .collect();
    let mut dst = vec![0u8; 4 * ELEMENTS];

    let mut group = c.benchmark_group("float64_to_int32");
    group.throughput(Throughput::Elements(ELEMENTS as u64));
    for errmode in [
        AssignErrorMode::None,
        AssignErrorMode::Overflow,
        AssignErrorMode::Fractional,
        AssignErrorMode::Inexact,
    ] {
        let builder = strided_kernel(&dst_t, &src_t, errmode);
        group.bench_with_input(BenchmarkId::from_parameter(errmode), &errmode, |b, _| {
            b.iter(|| run(&builder, black_box(&mut dst), 4, black_box(&src), 8));
        });
    }
    group.finish();
}

/// Benchmark: reading byte-swapped int32 storage as float64
fn bench_expression_chain(c: &mut Criterion) {
    let swapped = make_byteswap(&make_dtype::<i32>()).expect("byteswap");
    let chain = make_convert(&make_dtype::<f64>(), &swapped, AssignErrorMode::Default)
        .expect("convert");
    let float64 = make_dtype::<f64>();
    let src: Vec<u8> = (0..ELEMENTS as i32)
        .flat_map(|i| {
            let mut bytes = i.to_ne_bytes();
            bytes.reverse();
            bytes
        })
        .collect();
    let mut dst = vec![0u8; 8 * ELEMENTS];

    let mut group = c.benchmark_group("expression_chain");
    group.throughput(Throughput::Elements(ELEMENTS as u64));

    let builder = strided_kernel(&float64, &swapped, AssignErrorMode::Default);
    group.bench_function("byteswap_int32_to_float64", |b| {
        b.iter(|| run(&builder, black_box(&mut dst), 8, black_box(&src), 4));
    });

    let builder = strided_kernel(&float64, &chain, AssignErrorMode::Default);
    group.bench_function("convert_byteswap_to_float64", |b| {
        b.iter(|| run(&builder, black_box(&mut dst), 8, black_box(&src), 4));
    });
    group.finish();
}

/// Benchmark: type-string parsing, uncached vs cached
fn bench_parse(c: &mut Criterion) {
    let text = "{id : uint32, at : {x : float64, y : float64}, raw : byteswap<int64>}";
    let cache = TypeCache::new(16);

    let mut group = c.benchmark_group("parse");
    group.bench_function("uncached", |b| {
        b.iter(|| parse_dtype(black_box(text)).expect("parse"));
    });
    group.bench_function("local_cache", |b| {
        b.iter(|| cache.get_or_parse(black_box(text)).expect("parse"));
    });
    group.bench_function("global_cache", |b| {
        b.iter(|| parse_dtype_cached(black_box(text)).expect("parse"));
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_pod_copy,
    bench_builtin_errmodes,
    bench_expression_chain,
    bench_parse
);
criterion_main!(benches);
