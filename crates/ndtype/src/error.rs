// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Crate-wide error type.
//!
//! Errors fall into four families:
//!
//! - **Construction**: malformed type parameters, raised before a handle exists.
//! - **Type mismatch**: kernel negotiation found no viable pair, or a descriptor was
//!   handed metadata it cannot interpret. Always names both types.
//! - **Runtime assignment checks**: overflow / fractional / inexact values caught by a
//!   checked kernel.
//! - **Corruption**: an internal tag outside its closed set reached a dispatch point.
//!   This is a broken invariant, not bad input.

use std::fmt;

/// Errors produced by type construction, kernel instantiation and kernel execution.
#[derive(Debug)]
pub enum Error {
    // Construction
    /// Invalid type parameters (size/alignment mismatch, non-POD view, bad chain).
    Construction(String),
    /// Raw type id outside the known set, or not a builtin where one was required.
    InvalidTypeId(u8),
    /// Type string could not be parsed.
    Parse {
        input: String,
        position: usize,
        message: String,
    },
    /// Attempt to instantiate or store data for a symbolic (pattern) type.
    PatternType(String),

    // Negotiation
    /// Neither side of a kernel negotiation produced a kernel.
    TypeMismatch {
        dst: String,
        src: String,
        context: &'static str,
    },
    /// Comparison requested between types that do not support it.
    NotComparable {
        lhs: String,
        rhs: String,
        comparison: String,
    },
    /// Requested kernel shape does not match the constructed kernel, or the slot is in use.
    InvalidKernelRequest(String),
    /// Dimension sizes cannot be broadcast together.
    Broadcast { dst: usize, src: usize },

    // Runtime assignment checks
    /// Value out of range for the destination type.
    Overflow { value: String, dst: String },
    /// Value has a fractional part that the destination type would drop.
    Fractional { value: String, dst: String },
    /// Value would change in any way when assigned.
    Inexact { value: String, dst: String },

    // Faults
    /// Unknown internal tag reached a dispatch point.
    Corruption(String),
    /// Pointer or stride violates the required alignment.
    Alignment {
        file: &'static str,
        line: u32,
        detail: String,
    },
    /// Memory block operation failed (bounds, allocation, mapping).
    Memory(String),

    // Other
    /// Configuration document was invalid.
    Config(String),
    /// Underlying I/O error.
    Io(std::io::Error),
    /// Writing formatted output failed.
    Format,
}

impl Error {
    /// Builds a [`Error::TypeMismatch`] naming both types by their printed form.
    pub fn mismatch(dst: &crate::DType, src: &crate::DType, context: &'static str) -> Self {
        Error::TypeMismatch {
            dst: dst.to_string(),
            src: src.to_string(),
            context,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Construction
            Error::Construction(msg) => write!(f, "{}", msg),
            Error::InvalidTypeId(id) => write!(f, "Invalid builtin type id: {}", id),
            Error::Parse {
                input,
                position,
                message,
            } => write!(
                f,
                "Error parsing type string \"{}\" at position {}: {}",
                input, position, message
            ),
            Error::PatternType(msg) => write!(f, "{}", msg),
            // Negotiation
            Error::TypeMismatch { dst, src, context } => {
                write!(f, "{}: cannot handle {} -> {}", context, src, dst)
            }
            Error::NotComparable {
                lhs,
                rhs,
                comparison,
            } => write!(f, "Cannot compare {} {} {}", lhs, comparison, rhs),
            Error::InvalidKernelRequest(msg) => write!(f, "Invalid kernel request: {}", msg),
            Error::Broadcast { dst, src } => write!(
                f,
                "Cannot broadcast dimension of size {} into dimension of size {}",
                src, dst
            ),
            // Runtime assignment checks
            Error::Overflow { value, dst } => write!(f, "overflow while assigning {} to {}", value, dst),
            Error::Fractional { value, dst } => {
                write!(f, "fractional part lost while assigning {} to {}", value, dst)
            }
            Error::Inexact { value, dst } => {
                write!(f, "inexact value while assigning {} to {}", value, dst)
            }
            // Faults
            Error::Corruption(msg) => write!(f, "{}", msg),
            Error::Alignment { file, line, detail } => write!(
                f,
                "improper unalignment detected, {}: {}\n{}",
                file, line, detail
            ),
            Error::Memory(msg) => write!(f, "Memory block error: {}", msg),
            // Other
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Format => write!(f, "Formatter error"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<fmt::Error> for Error {
    fn from(_: fmt::Error) -> Self {
        Error::Format
    }
}

/// Crate result alias.
pub type Result<T> = std::result::Result<T, Error>;
