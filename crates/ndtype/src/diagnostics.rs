// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Compile-time diagnostics for kernel inner loops.
//!
//! | Feature | Macro | Effect |
//! |---------|-------|--------|
//! | `alignment-assertions` | [`assert_aligned!`] | returns `Error::Alignment` on misaligned data or strides |
//! | `assignment-tracing` | [`trace_assignment!`] | logs each builtin element assignment at `trace` |
//!
//! With the feature off the macro expands to nothing.

/// Checks that an address and a stride are multiples of `alignment`.
///
/// Must be used inside a function returning `crate::Result`.
#[macro_export]
#[cfg(feature = "alignment-assertions")]
macro_rules! assert_aligned {
    ($alignment:expr, $addr:expr, $stride:expr, $what:expr) => {{
        let align = ($alignment) as usize;
        let addr = ($addr) as usize;
        let stride = ($stride) as usize;
        if align > 1 && (addr % align != 0 || stride % align != 0) {
            return Err($crate::Error::Alignment {
                file: file!(),
                line: line!(),
                detail: format!(
                    "{}: address {:#x} stride {} alignment {}",
                    $what, addr, stride, align
                ),
            });
        }
    }};
}

/// No-op alignment check (when `alignment-assertions` is disabled).
#[macro_export]
#[cfg(not(feature = "alignment-assertions"))]
macro_rules! assert_aligned {
    ($alignment:expr, $addr:expr, $stride:expr, $what:expr) => {};
}

/// Logs one builtin assignment.
#[macro_export]
#[cfg(feature = "assignment-tracing")]
macro_rules! trace_assignment {
    ($($arg:tt)*) => {
        ::log::trace!(target: "ndtype::assignment", $($arg)*)
    };
}

/// No-op assignment trace (when `assignment-tracing` is disabled).
#[macro_export]
#[cfg(not(feature = "assignment-tracing"))]
macro_rules! trace_assignment {
    ($($arg:tt)*) => {};
}

/// True when any diagnostic feature was compiled in.
pub const fn any_diagnostics_enabled() -> bool {
    cfg!(feature = "alignment-assertions") || cfg!(feature = "assignment-tracing")
}

/// One line per compiled-in diagnostic, empty when none are.
pub fn which_diagnostics_enabled() -> String {
    let mut out = String::new();
    if cfg!(feature = "alignment-assertions") {
        out.push_str("ALIGNMENT_ASSERTIONS - checks that data has correct alignment in inner loops\n");
    }
    if cfg!(feature = "assignment-tracing") {
        out.push_str("ASSIGNMENT_TRACING - prints individual builtin assignment operations\n");
    }
    out
}
