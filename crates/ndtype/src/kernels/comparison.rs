// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Comparison predicate kernels.

use super::{KernelBuilder, KernelFunction, KernelPrefix, KernelRef, PredicateFn};
use crate::config::{runtime, EvalContext};
use crate::error::{Error, Result};
use crate::types::builtin::{compare_values, with_scalar_type, Scalar};
use crate::types::{DType, Metadata, TypeId};
use std::cmp::Ordering;
use std::fmt;

/// Comparison computed by a predicate kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ComparisonType {
    Less = 0,
    LessEqual = 1,
    Equal = 2,
    NotEqual = 3,
    GreaterEqual = 4,
    Greater = 5,
}

impl ComparisonType {
    pub const fn symbol(self) -> &'static str {
        match self {
            ComparisonType::Less => "<",
            ComparisonType::LessEqual => "<=",
            ComparisonType::Equal => "==",
            ComparisonType::NotEqual => "!=",
            ComparisonType::GreaterEqual => ">=",
            ComparisonType::Greater => ">",
        }
    }

    /// True for the comparisons that need an ordering, not just equality.
    pub const fn is_ordered(self) -> bool {
        !matches!(self, ComparisonType::Equal | ComparisonType::NotEqual)
    }

    /// Verdict for an ordering; `None` (unordered) only satisfies `NotEqual`.
    pub fn holds(self, ordering: Option<Ordering>) -> bool {
        match self {
            ComparisonType::Less => ordering == Some(Ordering::Less),
            ComparisonType::LessEqual => {
                matches!(ordering, Some(Ordering::Less | Ordering::Equal))
            }
            ComparisonType::Equal => ordering == Some(Ordering::Equal),
            ComparisonType::NotEqual => ordering != Some(Ordering::Equal),
            ComparisonType::GreaterEqual => {
                matches!(ordering, Some(Ordering::Greater | Ordering::Equal))
            }
            ComparisonType::Greater => ordering == Some(Ordering::Greater),
        }
    }

    const fn from_code(code: u8) -> Self {
        match code {
            0 => ComparisonType::Less,
            1 => ComparisonType::LessEqual,
            2 => ComparisonType::Equal,
            3 => ComparisonType::NotEqual,
            4 => ComparisonType::GreaterEqual,
            _ => ComparisonType::Greater,
        }
    }
}

impl fmt::Display for ComparisonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// The two operands of a binary predicate.
pub(crate) fn binary_sources<'s>(src: &[&'s [u8]]) -> Result<(&'s [u8], &'s [u8])> {
    match src {
        [a, b] => Ok((*a, *b)),
        _ => Err(Error::InvalidKernelRequest(format!(
            "comparison kernel called with {} sources",
            src.len()
        ))),
    }
}

fn compare_builtin<T: Scalar, const OP: u8>(src: &[&[u8]], _kernel: KernelRef<'_>) -> Result<bool> {
    let (a, b) = binary_sources(src)?;
    let ordering = compare_values(T::load(a)?.to_value(), T::load(b)?.to_value());
    Ok(ComparisonType::from_code(OP).holds(ordering))
}

fn builtin_predicate<T: Scalar>(comptype: ComparisonType) -> PredicateFn {
    match comptype {
        ComparisonType::Less => compare_builtin::<T, 0>,
        ComparisonType::LessEqual => compare_builtin::<T, 1>,
        ComparisonType::Equal => compare_builtin::<T, 2>,
        ComparisonType::NotEqual => compare_builtin::<T, 3>,
        ComparisonType::GreaterEqual => compare_builtin::<T, 4>,
        ComparisonType::Greater => compare_builtin::<T, 5>,
    }
}

fn not_comparable(lhs: &dyn fmt::Display, rhs: &dyn fmt::Display, comptype: ComparisonType) -> Error {
    Error::NotComparable {
        lhs: lhs.to_string(),
        rhs: rhs.to_string(),
        comparison: comptype.symbol().to_string(),
    }
}

/// Instantiates a predicate comparing two elements of the builtin type `id`.
pub fn make_builtin_comparison_kernel(
    builder: &mut KernelBuilder,
    offset: usize,
    id: TypeId,
    comptype: ComparisonType,
) -> Result<usize> {
    if id.is_complex() && comptype.is_ordered() {
        return Err(not_comparable(&id, &id, comptype));
    }
    let predicate: PredicateFn = with_scalar_type!(
        id,
        T => builtin_predicate::<T>(comptype),
        _ => return Err(not_comparable(&id, &id, comptype))
    );
    builder.construct(offset, KernelPrefix::new(KernelFunction::Predicate(predicate)))?;
    Ok(offset + 1)
}

/// Instantiates a predicate kernel for `src0 <comptype> src1` at `offset`.
///
/// Builtins compare only against the same builtin; other pairs are negotiated with
/// `src0`'s descriptor first.
pub fn make_comparison_kernel(
    builder: &mut KernelBuilder,
    offset: usize,
    src0: &DType,
    src0_meta: &Metadata,
    src1: &DType,
    src1_meta: &Metadata,
    comptype: ComparisonType,
    ectx: &EvalContext,
) -> Result<usize> {
    log::debug!(
        "[ndtype::kernels] comparison kernel {} {} {} at slot {}",
        src0,
        comptype,
        src1,
        offset
    );

    if src0.is_builtin() && src1.is_builtin() {
        if src0 != src1 {
            return Err(not_comparable(src0, src1, comptype));
        }
        return make_builtin_comparison_kernel(builder, offset, src0.type_id(), comptype);
    }

    if let Some(ext) = src0.extended() {
        return ext.make_comparison_kernel(
            builder, offset, src0, src0_meta, src1, src1_meta, comptype, ectx,
        );
    }
    if let Some(ext) = src1.extended() {
        return ext.make_comparison_kernel(
            builder, offset, src0, src0_meta, src1, src1_meta, comptype, ectx,
        );
    }
    Err(not_comparable(src0, src1, comptype))
}

/// Compares one pair of elements, using the global evaluation context.
pub fn compare_elements(
    src0_tp: &DType,
    src0_meta: &Metadata,
    src0: &[u8],
    src1_tp: &DType,
    src1_meta: &Metadata,
    src1: &[u8],
    comptype: ComparisonType,
) -> Result<bool> {
    let ectx = runtime().eval_context();
    let mut builder = KernelBuilder::new();
    make_comparison_kernel(
        &mut builder,
        0,
        src0_tp,
        src0_meta,
        src1_tp,
        src1_meta,
        comptype,
        &ectx,
    )?;
    builder.get(0)?.call_predicate(&[src0, src1])
}
