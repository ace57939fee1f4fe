// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime type system.
//!
//! [`DType`] is the handle; builtins are resolved from a static table and every other
//! type is backed by a shared [`ExtendedDType`] descriptor. [`Metadata`] carries the
//! per-instance part of a description, [`IterData`] the iteration state over
//! dimensions. Type strings parse back to equal handles through [`parse_dtype`] or
//! the cached [`parse_dtype_cached`].

pub mod builtin;
pub mod cache;
pub mod dtype;
pub mod encoding;
pub mod expr;
pub mod extended;
pub mod fixedbytes;
pub mod fixedstring;
pub mod iterdata;
pub mod metadata;
pub mod parse;
pub mod strided_dim;
pub mod string;
pub mod struct_type;
pub mod type_id;
pub mod typevar;

pub use builtin::{Complex, Scalar, ScalarValue};
pub use cache::{parse_dtype_cached, type_cache, LookupStats, TypeCache};
pub use dtype::{make_dtype, DType};
pub use encoding::StringEncoding;
pub use expr::{
    make_byteswap, make_byteswap_over, make_convert, make_unaligned, make_view, ByteswapDType,
    ConvertDType, ViewDType,
};
pub use extended::{ExpressionDType, ExtendedDType, StringDType};
pub use fixedbytes::{make_fixedbytes_dtype, FixedBytesDType};
pub use fixedstring::{make_fixedstring_dtype, FixedStringDType};
pub use iterdata::{IterData, IterLevel};
pub use metadata::Metadata;
pub use parse::parse_dtype;
pub use strided_dim::{make_strided_dim_dtype, make_strided_dim_dtype_nd, StridedDimDType};
pub use string::{make_string_dtype, VarStringDType};
pub use struct_type::{make_struct_dtype, StructDType};
pub use type_id::{MemoryManagement, TypeId, TypeKind};
pub use typevar::{make_typevar_dtype, TypeVarDType};
