// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type identity and classification tags.
//!
//! `TypeKind` is the coarse classification generic algorithms switch on
//! (e.g. "does this participate in numeric promotion"). `TypeId` distinguishes
//! concrete representations. The first [`BUILTIN_TYPE_ID_COUNT`] ids are the builtin
//! types, fully described by [`BuiltinLayout`] with no heap allocation.

use crate::error::{Error, Result};
use std::fmt;

/// Number of builtin type ids (13 scalars plus `void`).
pub const BUILTIN_TYPE_ID_COUNT: usize = 14;

/// Coarse type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeKind {
    Bool = 0,
    Int = 1,
    UInt = 2,
    Real = 3,
    Complex = 4,
    String = 5,
    Bytes = 6,
    Void = 7,
    Datetime = 8,
    Composite = 9,
    Expression = 10,
    Pattern = 11,
    Custom = 12,
}

impl TypeKind {
    /// True for kinds taking part in numeric promotion.
    pub const fn participates_in_promotion(self) -> bool {
        matches!(
            self,
            TypeKind::Bool | TypeKind::Int | TypeKind::UInt | TypeKind::Real | TypeKind::Complex
        )
    }

    pub const fn name(self) -> &'static str {
        match self {
            TypeKind::Bool => "bool",
            TypeKind::Int => "int",
            TypeKind::UInt => "uint",
            TypeKind::Real => "real",
            TypeKind::Complex => "complex",
            TypeKind::String => "string",
            TypeKind::Bytes => "bytes",
            TypeKind::Void => "void",
            TypeKind::Datetime => "datetime",
            TypeKind::Composite => "composite",
            TypeKind::Expression => "expression",
            TypeKind::Pattern => "pattern",
            TypeKind::Custom => "custom",
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Concrete type representation id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TypeId {
    // --- Builtin types (0..=13) ---
    Bool = 0,
    Int8 = 1,
    Int16 = 2,
    Int32 = 3,
    Int64 = 4,
    UInt8 = 5,
    UInt16 = 6,
    UInt32 = 7,
    UInt64 = 8,
    Float32 = 9,
    Float64 = 10,
    Complex64 = 11,
    Complex128 = 12,
    Void = 13,

    // --- Descriptor-backed types ---
    VoidPointer = 14,
    FixedBytes = 15,
    FixedString = 16,
    Categorical = 17,
    Date = 18,
    BusDate = 19,
    Pointer = 20,
    String = 21,
    Array = 22,
    StridedDim = 23,
    Struct = 24,
    Tuple = 25,
    NdArray = 26,

    // --- Expression types ---
    Convert = 27,
    ByteSwap = 28,
    Align = 29,
    View = 30,

    // --- Symbolic / extension ---
    Pattern = 31,
    Custom = 32,
}

const ALL_TYPE_IDS: [TypeId; 33] = [
    TypeId::Bool,
    TypeId::Int8,
    TypeId::Int16,
    TypeId::Int32,
    TypeId::Int64,
    TypeId::UInt8,
    TypeId::UInt16,
    TypeId::UInt32,
    TypeId::UInt64,
    TypeId::Float32,
    TypeId::Float64,
    TypeId::Complex64,
    TypeId::Complex128,
    TypeId::Void,
    TypeId::VoidPointer,
    TypeId::FixedBytes,
    TypeId::FixedString,
    TypeId::Categorical,
    TypeId::Date,
    TypeId::BusDate,
    TypeId::Pointer,
    TypeId::String,
    TypeId::Array,
    TypeId::StridedDim,
    TypeId::Struct,
    TypeId::Tuple,
    TypeId::NdArray,
    TypeId::Convert,
    TypeId::ByteSwap,
    TypeId::Align,
    TypeId::View,
    TypeId::Pattern,
    TypeId::Custom,
];

impl TypeId {
    /// Decodes a raw tag, rejecting values outside the closed set.
    pub fn from_raw(raw: u8) -> Result<TypeId> {
        ALL_TYPE_IDS
            .get(raw as usize)
            .copied()
            .ok_or(Error::InvalidTypeId(raw))
    }

    pub const fn is_builtin(self) -> bool {
        (self as usize) < BUILTIN_TYPE_ID_COUNT
    }

    /// True for the 13 builtin numeric/bool scalars (excludes `void`).
    pub const fn is_builtin_scalar(self) -> bool {
        (self as usize) < BUILTIN_TYPE_ID_COUNT - 1
    }

    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            TypeId::Int8
                | TypeId::Int16
                | TypeId::Int32
                | TypeId::Int64
                | TypeId::UInt8
                | TypeId::UInt16
                | TypeId::UInt32
                | TypeId::UInt64
        )
    }

    pub const fn is_complex(self) -> bool {
        matches!(self, TypeId::Complex64 | TypeId::Complex128)
    }

    /// Type-string name (builtins print exactly this).
    pub const fn name(self) -> &'static str {
        match self {
            TypeId::Bool => "bool",
            TypeId::Int8 => "int8",
            TypeId::Int16 => "int16",
            TypeId::Int32 => "int32",
            TypeId::Int64 => "int64",
            TypeId::UInt8 => "uint8",
            TypeId::UInt16 => "uint16",
            TypeId::UInt32 => "uint32",
            TypeId::UInt64 => "uint64",
            TypeId::Float32 => "float32",
            TypeId::Float64 => "float64",
            TypeId::Complex64 => "complex<float32>",
            TypeId::Complex128 => "complex<float64>",
            TypeId::Void => "void",
            TypeId::VoidPointer => "void_pointer",
            TypeId::FixedBytes => "fixedbytes",
            TypeId::FixedString => "fixedstring",
            TypeId::Categorical => "categorical",
            TypeId::Date => "date",
            TypeId::BusDate => "busdate",
            TypeId::Pointer => "pointer",
            TypeId::String => "string",
            TypeId::Array => "array",
            TypeId::StridedDim => "strided_dim",
            TypeId::Struct => "struct",
            TypeId::Tuple => "tuple",
            TypeId::NdArray => "ndarray",
            TypeId::Convert => "convert",
            TypeId::ByteSwap => "byteswap",
            TypeId::Align => "align",
            TypeId::View => "view",
            TypeId::Pattern => "pattern",
            TypeId::Custom => "custom",
        }
    }

    /// Layout of a builtin id, `None` for descriptor-backed ids.
    pub const fn builtin_layout(self) -> Option<BuiltinLayout> {
        if self.is_builtin() {
            Some(BUILTIN_LAYOUTS[self as usize])
        } else {
            None
        }
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for TypeId {
    type Error = Error;

    fn try_from(raw: u8) -> Result<Self> {
        TypeId::from_raw(raw)
    }
}

/// How instances of a type manage their memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryManagement {
    /// Plain bytes; copyable with memcpy.
    Pod,
    /// Holds references into a memory block named by the metadata.
    BlockRef,
    /// Needs full construct/destruct lifecycle.
    Object,
}

/// Static description of a builtin type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinLayout {
    pub kind: TypeKind,
    pub alignment: u8,
    pub element_size: usize,
}

const fn layout(kind: TypeKind, alignment: u8, element_size: usize) -> BuiltinLayout {
    BuiltinLayout {
        kind,
        alignment,
        element_size,
    }
}

/// Indexed by `TypeId as usize` for every builtin id.
pub const BUILTIN_LAYOUTS: [BuiltinLayout; BUILTIN_TYPE_ID_COUNT] = [
    layout(TypeKind::Bool, 1, 1),
    layout(TypeKind::Int, 1, 1),
    layout(TypeKind::Int, 2, 2),
    layout(TypeKind::Int, 4, 4),
    layout(TypeKind::Int, 8, 8),
    layout(TypeKind::UInt, 1, 1),
    layout(TypeKind::UInt, 2, 2),
    layout(TypeKind::UInt, 4, 4),
    layout(TypeKind::UInt, 8, 8),
    layout(TypeKind::Real, 4, 4),
    layout(TypeKind::Real, 8, 8),
    layout(TypeKind::Complex, 4, 8),
    layout(TypeKind::Complex, 8, 16),
    layout(TypeKind::Void, 1, 0),
];
