// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-instance metadata.
//!
//! Metadata is the out-of-band part of an element's description: which memory block
//! holds its variable-length payload, the size and stride of a dimension, the metadata
//! of each struct field. It is only created through a type's lifecycle hooks
//! (`metadata_default_construct` / `metadata_copy_construct`), which is why it has no
//! `Clone`.

use crate::memblock::MemoryBlock;

/// Shared empty metadata for callers that need a `&'static Metadata`.
pub static NO_METADATA: Metadata = Metadata::None;

#[derive(Debug, Default)]
pub enum Metadata {
    /// The type needs no metadata.
    #[default]
    None,
    /// Reference to the block holding variable-length data.
    BlockRef(Option<MemoryBlock>),
    /// One strided dimension.
    Dim {
        size: usize,
        /// Byte distance between elements; dimensions only run forward.
        stride: usize,
        element: Box<Metadata>,
    },
    /// One entry per struct field.
    Struct(Vec<Metadata>),
}

impl Metadata {
    pub fn is_none(&self) -> bool {
        matches!(self, Metadata::None)
    }

    /// The referenced block of a `BlockRef`.
    pub fn block(&self) -> Option<&MemoryBlock> {
        match self {
            Metadata::BlockRef(block) => block.as_ref(),
            _ => None,
        }
    }

    /// Metadata of struct field `index`; empty when not a struct entry.
    pub fn field(&self, index: usize) -> &Metadata {
        match self {
            Metadata::Struct(fields) => fields.get(index).unwrap_or(&NO_METADATA),
            _ => &NO_METADATA,
        }
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Metadata::None => "none",
            Metadata::BlockRef(_) => "blockref",
            Metadata::Dim { .. } => "dim",
            Metadata::Struct(_) => "struct",
        }
    }
}
