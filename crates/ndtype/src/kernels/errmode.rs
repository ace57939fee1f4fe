// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Assignment error modes.
//!
//! The runtime [`AssignErrorMode`] is only consulted at kernel instantiation. Each mode
//! maps to an [`ErrorPolicy`] marker type, and kernels are monomorphized over the
//! marker so the per-element loop never branches on a runtime mode.

use crate::config::EvalContext;
use std::fmt;

/// How strictly an assignment checks the values it converts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignErrorMode {
    /// Wrap integers, saturate float to int, truncate strings.
    None,
    /// Reject values outside the destination range.
    Overflow,
    /// Also reject float to int conversions that drop a fractional part.
    Fractional,
    /// Also reject any conversion that changes the value.
    Inexact,
    /// Use the evaluation context's default.
    Default,
}

impl AssignErrorMode {
    pub const fn name(self) -> &'static str {
        match self {
            AssignErrorMode::None => "none",
            AssignErrorMode::Overflow => "overflow",
            AssignErrorMode::Fractional => "fractional",
            AssignErrorMode::Inexact => "inexact",
            AssignErrorMode::Default => "default",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "none" => Some(AssignErrorMode::None),
            "overflow" => Some(AssignErrorMode::Overflow),
            "fractional" => Some(AssignErrorMode::Fractional),
            "inexact" => Some(AssignErrorMode::Inexact),
            "default" => Some(AssignErrorMode::Default),
            _ => None,
        }
    }

    /// Replaces `Default` with the context's default mode.
    pub fn resolve(self, ectx: &EvalContext) -> Self {
        match self {
            AssignErrorMode::Default => match ectx.default_errmode {
                // A context holding `Default` falls back to the library default.
                AssignErrorMode::Default => AssignErrorMode::Fractional,
                mode => mode,
            },
            mode => mode,
        }
    }

    pub const fn checks_overflow(self) -> bool {
        matches!(
            self,
            AssignErrorMode::Overflow | AssignErrorMode::Fractional | AssignErrorMode::Inexact
        )
    }

    pub const fn checks_fractional(self) -> bool {
        matches!(self, AssignErrorMode::Fractional | AssignErrorMode::Inexact)
    }

    pub const fn checks_inexact(self) -> bool {
        matches!(self, AssignErrorMode::Inexact)
    }
}

impl fmt::Display for AssignErrorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compile-time error mode carried by kernel monomorphizations.
pub trait ErrorPolicy: Send + Sync + 'static {
    const MODE: AssignErrorMode;
}

/// No checking: wrap, saturate, truncate.
pub struct NoCheck;
/// Range checking.
pub struct OverflowCheck;
/// Range and fractional-part checking.
pub struct FractionalCheck;
/// Any value change is an error.
pub struct InexactCheck;

impl ErrorPolicy for NoCheck {
    const MODE: AssignErrorMode = AssignErrorMode::None;
}

impl ErrorPolicy for OverflowCheck {
    const MODE: AssignErrorMode = AssignErrorMode::Overflow;
}

impl ErrorPolicy for FractionalCheck {
    const MODE: AssignErrorMode = AssignErrorMode::Fractional;
}

impl ErrorPolicy for InexactCheck {
    const MODE: AssignErrorMode = AssignErrorMode::Inexact;
}

/// Expands `$body` once with `$p` bound to the policy marker of a resolved mode.
macro_rules! with_error_policy {
    ($mode:expr, $p:ident => $body:expr) => {
        match $mode {
            $crate::kernels::AssignErrorMode::None => {
                type $p = $crate::kernels::errmode::NoCheck;
                $body
            }
            $crate::kernels::AssignErrorMode::Overflow => {
                type $p = $crate::kernels::errmode::OverflowCheck;
                $body
            }
            $crate::kernels::AssignErrorMode::Fractional => {
                type $p = $crate::kernels::errmode::FractionalCheck;
                $body
            }
            $crate::kernels::AssignErrorMode::Inexact
            | $crate::kernels::AssignErrorMode::Default => {
                type $p = $crate::kernels::errmode::InexactCheck;
                $body
            }
        }
    };
}
pub(crate) use with_error_policy;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_default() {
        let ectx = EvalContext::default();
        assert_eq!(
            AssignErrorMode::Default.resolve(&ectx),
            AssignErrorMode::Fractional
        );
        assert_eq!(AssignErrorMode::None.resolve(&ectx), AssignErrorMode::None);

        let strict = EvalContext {
            default_errmode: AssignErrorMode::Inexact,
        };
        assert_eq!(
            AssignErrorMode::Default.resolve(&strict),
            AssignErrorMode::Inexact
        );
    }

    #[test]
    fn test_check_levels_nest() {
        assert!(!AssignErrorMode::None.checks_overflow());
        assert!(AssignErrorMode::Overflow.checks_overflow());
        assert!(!AssignErrorMode::Overflow.checks_fractional());
        assert!(AssignErrorMode::Inexact.checks_fractional());
        assert!(AssignErrorMode::Inexact.checks_inexact());
    }

    #[test]
    fn test_names_roundtrip() {
        for mode in [
            AssignErrorMode::None,
            AssignErrorMode::Overflow,
            AssignErrorMode::Fractional,
            AssignErrorMode::Inexact,
            AssignErrorMode::Default,
        ] {
            assert_eq!(AssignErrorMode::from_name(mode.name()), Some(mode));
        }
        assert_eq!(AssignErrorMode::from_name("strict"), None);
    }
}
