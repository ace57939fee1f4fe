// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test readability
#![allow(clippy::missing_panics_doc)] // Tests panic on failure
#![allow(clippy::too_many_arguments)] // Kernel hook signatures

//! Kernel negotiation between descriptors that only know one side of a pairing.

use ndtype::config::EvalContext;
use ndtype::kernels::{
    assign_element, compare_elements, is_lossless_assignment, make_pod_copy_kernel,
    AssignErrorMode, ComparisonType, FixedStrides, KernelBuilder, KernelRequest,
};
use ndtype::types::extended::{forward_assignment_kernel, is_descriptor_of};
use ndtype::types::{MemoryManagement, TypeKind};
use ndtype::{make_dtype, DType, Error, ExtendedDType, Metadata, Result, TypeId};
use std::any::Any;
use std::fmt;

/// A float64 stored under another name; knows how to move data to and from float64.
#[derive(Debug)]
struct Celsius;

impl ExtendedDType for Celsius {
    fn dtype_id(&self) -> TypeId {
        TypeId::Custom
    }

    fn kind(&self) -> TypeKind {
        TypeKind::Custom
    }

    fn alignment(&self) -> u8 {
        8
    }

    fn element_size(&self) -> usize {
        8
    }

    fn memory_management(&self) -> MemoryManagement {
        MemoryManagement::Pod
    }

    fn print_element(&self, out: &mut dyn fmt::Write, data: &[u8], meta: &Metadata) -> Result<()> {
        make_dtype::<f64>().print_element(out, data, meta)?;
        out.write_str(" C")?;
        Ok(())
    }

    fn print_dtype(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str("celsius")
    }

    fn equals(&self, other: &dyn ExtendedDType) -> bool {
        other.as_any().is::<Celsius>()
    }

    fn as_any(&self) -> &dyn Any {
        self
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
        let float64 = make_dtype::<f64>();
        let handled = (is_descriptor_of(self, dst) && (src == &float64 || src == dst))
            || (is_descriptor_of(self, src) && dst == &float64);
        if handled {
            return make_pod_copy_kernel(builder, offset, 8, kernreq, FixedStrides::UNKNOWN);
        }
        forward_assignment_kernel(
            self, builder, offset, dst, dst_meta, src, src_meta, kernreq, errmode, ectx,
        )
    }
}

/// Knows nothing about any other type.
#[derive(Debug)]
struct Opaque;

impl ExtendedDType for Opaque {
    fn dtype_id(&self) -> TypeId {
        TypeId::Custom
    }

    fn kind(&self) -> TypeKind {
        TypeKind::Custom
    }

    fn alignment(&self) -> u8 {
        1
    }

    fn element_size(&self) -> usize {
        8
    }

    fn memory_management(&self) -> MemoryManagement {
        MemoryManagement::Pod
    }

    fn print_element(&self, out: &mut dyn fmt::Write, _: &[u8], _: &Metadata) -> Result<()> {
        out.write_str("?")?;
        Ok(())
    }

    fn print_dtype(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str("opaque")
    }

    fn equals(&self, other: &dyn ExtendedDType) -> bool {
        other.as_any().is::<Opaque>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn assign(dst_tp: &DType, src_tp: &DType, src: &[u8]) -> Result<[u8; 8]> {
    let mut out = [0u8; 8];
    assign_element(
        dst_tp,
        &Metadata::None,
        &mut out,
        src_tp,
        &Metadata::None,
        src,
        AssignErrorMode::Default,
    )?;
    Ok(out)
}

#[test]
fn test_destination_handles_pairing() {
    let celsius = DType::new(Celsius);
    let out = assign(&celsius, &make_dtype::<f64>(), &21.5f64.to_ne_bytes()).expect("into celsius");
    assert_eq!(
        celsius.element_to_string(&out, &Metadata::None).expect("print"),
        "21.5 C"
    );
}

#[test]
fn test_source_handles_when_destination_is_builtin() {
    let celsius = DType::new(Celsius);
    let out = assign(&make_dtype::<f64>(), &celsius, &(-4.0f64).to_ne_bytes()).expect("from celsius");
    assert_eq!(f64::from_ne_bytes(out), -4.0);
}

#[test]
fn test_source_handles_when_destination_declines() {
    // Opaque declines and forwards; Celsius cannot pair with Opaque either.
    let err = assign(&DType::new(Opaque), &DType::new(Celsius), &[0u8; 8]).expect_err("no kernel");
    match &err {
        Error::TypeMismatch { dst, src, .. } => {
            assert_eq!(dst, "opaque");
            assert_eq!(src, "celsius");
        }
        other => panic!("unexpected {:?}", other),
    }
    let text = err.to_string();
    assert!(text.contains("opaque") && text.contains("celsius"), "{}", text);
}

#[test]
fn test_mismatch_names_both_types() {
    let err = assign(&DType::new(Opaque), &make_dtype::<i32>(), &[0u8; 4]).expect_err("no kernel");
    assert!(matches!(
        &err,
        Error::TypeMismatch { dst, src, .. } if dst == "opaque" && src == "int32"
    ));

    let err = assign(&make_dtype::<i32>(), &DType::new(Opaque), &[0u8; 8]).expect_err("no kernel");
    assert!(matches!(
        &err,
        Error::TypeMismatch { dst, src, .. } if dst == "int32" && src == "opaque"
    ));
}

#[test]
fn test_same_descriptor_on_both_sides() {
    let celsius = DType::new(Celsius);
    let other = DType::new(Celsius);
    let out = assign(&celsius, &other, &7.0f64.to_ne_bytes()).expect("celsius to celsius");
    assert_eq!(f64::from_ne_bytes(out), 7.0);
    assert_eq!(celsius, other);
}

#[test]
fn test_lossless_and_comparison_defaults() {
    let celsius = DType::new(Celsius);
    assert!(is_lossless_assignment(&celsius, &celsius));
    assert!(!is_lossless_assignment(&celsius, &make_dtype::<f64>()));
    assert!(is_lossless_assignment(&make_dtype::<i64>(), &make_dtype::<i32>()));

    let err = compare_elements(
        &celsius,
        &Metadata::None,
        &[0u8; 8],
        &DType::new(Opaque),
        &Metadata::None,
        &[0u8; 8],
        ComparisonType::Less,
    )
    .expect_err("not comparable");
    assert!(matches!(err, Error::NotComparable { .. }));
}

#[test]
fn test_builder_reuse_after_failure() {
    let mut builder = KernelBuilder::new();
    let ectx = EvalContext::default();
    let opaque = DType::new(Opaque);
    assert!(ndtype::kernels::make_assignment_kernel(
        &mut builder,
        0,
        &opaque,
        &Metadata::None,
        &make_dtype::<u8>(),
        &Metadata::None,
        KernelRequest::Single,
        AssignErrorMode::Default,
        &ectx,
    )
    .is_err());
    builder.reset();

    let end = ndtype::kernels::make_assignment_kernel(
        &mut builder,
        0,
        &make_dtype::<f64>(),
        &Metadata::None,
        &DType::new(Celsius),
        &Metadata::None,
        KernelRequest::Single,
        AssignErrorMode::Default,
        &ectx,
    )
    .expect("kernel");
    assert_eq!(end, 1);
    let mut out = [0u8; 8];
    builder
        .get(0)
        .expect("root")
        .call_single(&mut out, &[&1.25f64.to_ne_bytes()])
        .expect("call");
    assert_eq!(f64::from_ne_bytes(out), 1.25);
}
