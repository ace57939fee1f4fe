// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! String encodings shared by the fixed-size and variable-length string types.

use crate::error::{Error, Result};
use crate::kernels::AssignErrorMode;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringEncoding {
    Ascii,
    Utf8,
    Utf16,
    Ucs2,
    Utf32,
}

impl StringEncoding {
    pub const fn name(self) -> &'static str {
        match self {
            StringEncoding::Ascii => "ascii",
            StringEncoding::Utf8 => "utf8",
            StringEncoding::Utf16 => "utf16",
            StringEncoding::Ucs2 => "ucs2",
            StringEncoding::Utf32 => "utf32",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ascii" | "A" => Some(StringEncoding::Ascii),
            "utf8" | "U8" => Some(StringEncoding::Utf8),
            "utf16" | "U16" => Some(StringEncoding::Utf16),
            "ucs2" | "ucs_2" => Some(StringEncoding::Ucs2),
            "utf32" | "U32" => Some(StringEncoding::Utf32),
            _ => None,
        }
    }

    /// Bytes per code unit; also the alignment of encoded data.
    pub const fn unit_size(self) -> usize {
        match self {
            StringEncoding::Ascii | StringEncoding::Utf8 => 1,
            StringEncoding::Utf16 | StringEncoding::Ucs2 => 2,
            StringEncoding::Utf32 => 4,
        }
    }

    /// Decodes `bytes`, stopping at the first zero code unit.
    pub fn decode(self, bytes: &[u8]) -> Result<String> {
        let invalid = || Error::Construction(format!("invalid {} data in string element", self));
        match self {
            StringEncoding::Ascii | StringEncoding::Utf8 => {
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                let text = std::str::from_utf8(&bytes[..end]).map_err(|_| invalid())?;
                if self == StringEncoding::Ascii && !text.is_ascii() {
                    return Err(invalid());
                }
                Ok(text.to_string())
            }
            StringEncoding::Utf16 | StringEncoding::Ucs2 => {
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|c| u16::from_ne_bytes([c[0], c[1]]))
                    .take_while(|&u| u != 0)
                    .collect();
                String::from_utf16(&units).map_err(|_| invalid())
            }
            StringEncoding::Utf32 => bytes
                .chunks_exact(4)
                .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
                .take_while(|&u| u != 0)
                .map(|u| char::from_u32(u).ok_or_else(invalid))
                .collect(),
        }
    }

    /// Encodes `text`. Characters this encoding cannot represent become `?` under
    /// [`AssignErrorMode::None`] and are an error otherwise.
    pub fn encode(self, text: &str, errmode: AssignErrorMode) -> Result<Vec<u8>> {
        let unrepresentable = |c: char| {
            if errmode == AssignErrorMode::None {
                Ok('?')
            } else {
                Err(Error::Inexact {
                    value: format!("{:?}", c),
                    dst: format!("string encoded as {}", self),
                })
            }
        };
        let mut out = Vec::with_capacity(text.len() * self.unit_size());
        match self {
            StringEncoding::Utf8 => out.extend_from_slice(text.as_bytes()),
            StringEncoding::Ascii => {
                for c in text.chars() {
                    let c = if c.is_ascii() { c } else { unrepresentable(c)? };
                    out.push(c as u8);
                }
            }
            StringEncoding::Utf16 => {
                for unit in text.encode_utf16() {
                    out.extend_from_slice(&unit.to_ne_bytes());
                }
            }
            StringEncoding::Ucs2 => {
                for c in text.chars() {
                    let c = if (c as u32) < 0x10000 { c } else { unrepresentable(c)? };
                    out.extend_from_slice(&(c as u32 as u16).to_ne_bytes());
                }
            }
            StringEncoding::Utf32 => {
                for c in text.chars() {
                    out.extend_from_slice(&(c as u32).to_ne_bytes());
                }
            }
        }
        Ok(out)
    }
}

impl fmt::Display for StringEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Writes `text` as a double-quoted, escaped literal.
pub fn print_escaped_string(out: &mut dyn fmt::Write, text: &str) -> fmt::Result {
    out.write_char('"')?;
    for c in text.chars() {
        match c {
            '"' => out.write_str("\\\"")?,
            '\\' => out.write_str("\\\\")?,
            '\n' => out.write_str("\\n")?,
            '\r' => out.write_str("\\r")?,
            '\t' => out.write_str("\\t")?,
            c if (c as u32) < 0x20 => write!(out, "\\u{:04x}", c as u32)?,
            c => out.write_char(c)?,
        }
    }
    out.write_char('"')
}
