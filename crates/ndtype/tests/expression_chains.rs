// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test readability
#![allow(clippy::missing_panics_doc)] // Tests panic on failure

//! Expression chains: termination, the view size contract and end-to-end scenarios.

use ndtype::kernels::{assign_element, compare_elements, AssignErrorMode, ComparisonType};
use ndtype::{
    make_byteswap, make_convert, make_dtype, make_fixedbytes_dtype, make_unaligned, make_view,
    DType, Error, Metadata, TypeId, TypeKind,
};

fn chain_depth(tp: &DType) -> usize {
    let mut depth = 0;
    let mut current = tp;
    while let Some(expr) = current.expression() {
        current = expr.operand_type();
        depth += 1;
    }
    depth
}

#[test]
fn test_storage_type_terminates() {
    let mut rng = fastrand::Rng::with_seed(42);
    let numeric = [
        make_dtype::<i16>(),
        make_dtype::<i32>(),
        make_dtype::<u64>(),
        make_dtype::<f32>(),
        make_dtype::<f64>(),
    ];
    for _ in 0..30 {
        let mut tp = make_dtype::<i32>();
        let mut layers = 0;
        for _ in 0..rng.usize(1..6) {
            let next = match rng.u8(..3) {
                0 => make_convert(
                    &numeric[rng.usize(..numeric.len())],
                    &tp,
                    AssignErrorMode::Default,
                ),
                1 => make_unaligned(&tp),
                _ => make_byteswap(tp.value_type()),
            };
            let next = next.expect("layer");
            if next != tp {
                layers += 1;
            }
            tp = next;
        }
        let storage = tp.storage_type();
        assert_ne!(storage.kind(), TypeKind::Expression, "storage of {}", tp);
        assert!(chain_depth(&tp) <= layers, "{} has depth {}", tp, chain_depth(&tp));
        assert_eq!(storage.element_size(), tp.element_size());
        assert_ne!(tp.value_type().kind(), TypeKind::Expression);
    }
}

#[test]
fn test_view_size_contract() {
    let pairs: [(DType, DType); 4] = [
        (make_dtype::<f32>(), make_dtype::<u64>()),
        (make_dtype::<i64>(), make_dtype::<u8>()),
        (make_dtype::<u16>(), make_fixedbytes_dtype(4, 1).expect("bytes")),
        (make_dtype::<i32>(), make_dtype::<u32>()),
    ];
    for (value, operand) in &pairs {
        let result = make_view(value, operand);
        if value.element_size() == operand.element_size() {
            let view = result.expect("same size");
            assert_eq!(view.element_size(), operand.element_size());
            assert_eq!(view.value_type(), value);
        } else {
            assert!(matches!(result, Err(Error::Construction(_))), "{} over {}", value, operand);
        }
    }
}

#[test]
fn test_scenario_view_prints_value() {
    let t = make_view(&make_dtype::<f64>(), &make_dtype::<u64>()).expect("view");
    let bits = 1.0f64.to_bits().to_ne_bytes();
    assert_eq!(t.element_to_string(&bits, &Metadata::None).expect("print"), "1.0");
}

#[test]
fn test_scenario_view_size_mismatch() {
    let err = make_view(&make_dtype::<f32>(), &make_dtype::<u64>()).expect_err("mismatch");
    assert!(matches!(err, Error::Construction(_)));
}

#[test]
fn test_scenario_builtin_identity() {
    let a = make_dtype::<i32>();
    let b = DType::builtin(TypeId::Int32).expect("builtin");
    assert_eq!(a, b);
    assert!(a.extended().is_none() && b.extended().is_none());
}

#[test]
fn test_big_endian_storage_end_to_end() {
    // Big-endian int32 storage exposed as float64.
    let stored = if cfg!(target_endian = "little") {
        make_byteswap(&make_dtype::<i32>()).expect("byteswap")
    } else {
        make_dtype::<i32>()
    };
    let t = make_convert(&make_dtype::<f64>(), &stored, AssignErrorMode::Default).expect("convert");
    let data = 1234i32.to_be_bytes();
    assert_eq!(t.element_to_string(&data, &Metadata::None).expect("print"), "1234.0");

    let mut out = [0u8; 4];
    assign_element(
        &t,
        &Metadata::None,
        &mut out,
        &make_dtype::<i16>(),
        &Metadata::None,
        &(-3i16).to_ne_bytes(),
        AssignErrorMode::Default,
    )
    .expect("assign");
    assert_eq!(i32::from_be_bytes(out), -3);

    assert!(compare_elements(
        &t,
        &Metadata::None,
        &data,
        &make_dtype::<f64>(),
        &Metadata::None,
        &1234.0f64.to_ne_bytes(),
        ComparisonType::Equal,
    )
    .expect("compare"));
}

#[test]
fn test_fractional_errmode_through_chain() {
    let t = make_convert(&make_dtype::<i32>(), &make_dtype::<f64>(), AssignErrorMode::Fractional)
        .expect("convert");
    assert!(matches!(
        t.element_to_string(&2.5f64.to_ne_bytes(), &Metadata::None),
        Err(Error::Fractional { .. })
    ));
    assert_eq!(
        t.element_to_string(&2.0f64.to_ne_bytes(), &Metadata::None)
            .expect("whole"),
        "2"
    );
}
