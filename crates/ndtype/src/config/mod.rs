// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Evaluation context and runtime configuration.
//!
//! # Architecture
//!
//! - **Per call**: [`EvalContext`] is passed by reference to every kernel factory and
//!   decides what `AssignErrorMode::Default` means.
//! - **Process wide**: [`RuntimeConfig`] holds the context used when callers do not
//!   supply one, behind an `ArcSwap` so reads never lock.
//!
//! # Example
//!
//! ```ignore
//! use ndtype::config::{runtime, EvalContext};
//! use ndtype::kernels::AssignErrorMode;
//!
//! runtime().set_eval_context(EvalContext {
//!     default_errmode: AssignErrorMode::Inexact,
//! });
//! let ectx = runtime().eval_context();
//! ```

#[cfg(feature = "config-loaders")]
pub mod yaml;

use crate::kernels::AssignErrorMode;
use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

/// Default capacity of the global type-string cache.
pub const DEFAULT_TYPE_CACHE_CAPACITY: usize = 256;

/// Settings consulted while instantiating kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalContext {
    /// Mode substituted for `AssignErrorMode::Default`.
    pub default_errmode: AssignErrorMode,
}

impl Default for EvalContext {
    fn default() -> Self {
        Self {
            default_errmode: AssignErrorMode::Fractional,
        }
    }
}

/// Process-wide configuration.
pub struct RuntimeConfig {
    eval: ArcSwap<EvalContext>,
    type_cache_capacity: AtomicUsize,
}

impl RuntimeConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            eval: ArcSwap::from_pointee(EvalContext::default()),
            type_cache_capacity: AtomicUsize::new(DEFAULT_TYPE_CACHE_CAPACITY),
        }
    }

    /// Current default evaluation context (atomic load).
    #[inline]
    #[must_use]
    pub fn eval_context(&self) -> EvalContext {
        **self.eval.load()
    }

    #[inline]
    pub fn set_eval_context(&self, ectx: EvalContext) {
        log::debug!(
            "[ndtype::config] default errmode set to {}",
            ectx.default_errmode
        );
        self.eval.store(Arc::new(ectx));
    }

    #[must_use]
    pub fn type_cache_capacity(&self) -> usize {
        self.type_cache_capacity.load(Ordering::Relaxed)
    }

    /// Capacity used when the global type cache is first created.
    ///
    /// Has no effect once the cache exists.
    pub fn set_type_cache_capacity(&self, capacity: usize) {
        if capacity == 0 {
            log::warn!("[ndtype::config] type cache capacity must be > 0, keeping current value");
            return;
        }
        self.type_cache_capacity.store(capacity, Ordering::Relaxed);
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// The global runtime configuration.
pub fn runtime() -> &'static RuntimeConfig {
    static RUNTIME: OnceLock<RuntimeConfig> = OnceLock::new();
    RUNTIME.get_or_init(RuntimeConfig::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval_context_default() {
        assert_eq!(
            EvalContext::default().default_errmode,
            AssignErrorMode::Fractional
        );
    }

    #[test]
    fn test_swap_eval_context() {
        let config = RuntimeConfig::new();
        assert_eq!(config.eval_context(), EvalContext::default());

        config.set_eval_context(EvalContext {
            default_errmode: AssignErrorMode::None,
        });
        assert_eq!(config.eval_context().default_errmode, AssignErrorMode::None);
    }

    #[test]
    fn test_zero_cache_capacity_ignored() {
        let config = RuntimeConfig::new();
        config.set_type_cache_capacity(0);
        assert_eq!(config.type_cache_capacity(), DEFAULT_TYPE_CACHE_CAPACITY);
        config.set_type_cache_capacity(8);
        assert_eq!(config.type_cache_capacity(), 8);
    }
}
