// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! External memory blocks: a block that keeps a foreign owner alive.

use super::{MemoryBlock, MemoryBlockType, Payload};
use std::any::Any;
use std::fmt;

pub(crate) struct ExternalObject {
    object: Box<dyn Any + Send + Sync>,
}

impl ExternalObject {
    pub(crate) fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.object.downcast_ref::<T>()
    }

    pub(crate) fn debug_print(&self, out: &mut dyn fmt::Write, indent: &str) -> fmt::Result {
        writeln!(out, "{} object at {:p}", indent, self.object.as_ref())
    }
}

/// Wraps `object` so that it is released together with the last block reference.
pub fn make_external_memory_block(object: Box<dyn Any + Send + Sync>) -> MemoryBlock {
    MemoryBlock::new(
        MemoryBlockType::External,
        Payload::External(ExternalObject { object }),
    )
}
