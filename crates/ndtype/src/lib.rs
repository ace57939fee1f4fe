// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # ndtype - runtime type descriptors and kernels for dynamically-typed arrays
//!
//! Describes element types at runtime, prints and parses them, and builds the
//! assignment and comparison kernels that move and compare data between any two
//! types.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ndtype::kernels::{assign_element, AssignErrorMode};
//! use ndtype::{make_dtype, make_view, DType, Metadata, Result};
//!
//! fn main() -> Result<()> {
//!     // uint64 storage read as float64
//!     let view = make_view(&make_dtype::<f64>(), &make_dtype::<u64>())?;
//!     assert_eq!(view.to_string(), "view<as=float64, original=uint64>");
//!
//!     let mut out = [0u8; 4];
//!     assign_element(
//!         &make_dtype::<f32>(),
//!         &Metadata::None,
//!         &mut out,
//!         &view,
//!         &Metadata::None,
//!         &1.5f64.to_bits().to_ne_bytes(),
//!         AssignErrorMode::Default,
//!     )?;
//!
//!     let parsed: DType = "convert<to=float64, from=byteswap<int32>>".parse()?;
//!     assert_eq!(parsed.storage_type().to_string(), "fixedbytes<4,4>");
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                          Type handles                               |
//! |   DType (builtin table | Arc<dyn ExtendedDType>) | parse / print     |
//! +---------------------------------------------------------------------+
//! |                          Descriptors                                |
//! |   fixedbytes | strings | struct | strided_dim | typevar            |
//! |   expressions: view | convert | byteswap                           |
//! +---------------------------------------------------------------------+
//! |                          Kernels                                    |
//! |   negotiation | builtin assignment x errmode | comparison | chains |
//! +---------------------------------------------------------------------+
//! |                          Memory blocks                              |
//! |   pod | zeroinit | fixed-size pod | objectarray | external | memmap  |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`DType`] | Cheap-to-clone type handle |
//! | [`ExtendedDType`] | Descriptor trait behind every non-builtin type |
//! | [`Metadata`] | Per-instance description (memory block, dimension, fields) |
//! | [`kernels::KernelBuilder`] | Arena holding an instantiated kernel tree |
//! | [`EvalContext`] | Decides what `AssignErrorMode::Default` means |
//!
//! ## Modules Overview
//!
//! - [`types`] - type handles, descriptors, parsing and the type cache
//! - [`kernels`] - kernel negotiation, assignment and comparison
//! - [`memblock`] - reference-counted memory blocks and allocator APIs
//! - [`config`] - evaluation context and runtime configuration
//! - [`diagnostics`] - feature-gated inner-loop checks

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod kernels;
pub mod memblock;
pub mod types;

pub use config::{runtime, EvalContext, RuntimeConfig};
pub use error::{Error, Result};
pub use types::{
    make_byteswap, make_convert, make_dtype, make_fixedbytes_dtype, make_fixedstring_dtype,
    make_strided_dim_dtype, make_string_dtype, make_struct_dtype, make_typevar_dtype,
    make_unaligned, make_view, parse_dtype, DType, ExpressionDType, ExtendedDType, Metadata,
    StringEncoding, TypeId, TypeKind,
};
