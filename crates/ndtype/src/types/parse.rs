// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type-string parser.
//!
//! Accepts every form the descriptors print, so `parse(print(T)) == T`:
//!
//! ```text
//! bool, int8..int64, uint8..uint64, float32, float64, void
//! complex<float32>, complex<float64>
//! fixedbytes<N>, fixedbytes<N,A>
//! string, string<'enc'>, string<N>, string<N,'enc'>
//! strided_dim<T>
//! {name : T, other : U}
//! view<as=T, original=U>
//! convert<to=T, from=U[, errmode=mode]>
//! byteswap<T>, byteswap<T, original=U>
//! Typevar                       (leading uppercase letter)
//! ```
//!
//! Expression descriptors are rebuilt exactly as written rather than through the
//! layering factories.

use crate::error::{Error, Result};
use crate::kernels::AssignErrorMode;
use crate::types::encoding::StringEncoding;
use crate::types::expr::{ByteswapDType, ConvertDType, ViewDType};
use crate::types::fixedbytes::make_fixedbytes_dtype;
use crate::types::fixedstring::make_fixedstring_dtype;
use crate::types::strided_dim::make_strided_dim_dtype;
use crate::types::string::make_string_dtype;
use crate::types::struct_type::make_struct_dtype;
use crate::types::type_id::{TypeId, BUILTIN_TYPE_ID_COUNT};
use crate::types::typevar::make_typevar_dtype;
use crate::types::DType;

/// Deepest nesting of type parameters a type string may use.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Parses a complete type string.
pub fn parse_dtype(input: &str) -> Result<DType> {
    let mut parser = Parser {
        input,
        pos: 0,
        depth: 0,
    };
    let tp = parser.parse_type()?;
    parser.skip_ws();
    if parser.pos != input.len() {
        return Err(parser.error("unexpected trailing text"));
    }
    Ok(tp)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, message: impl Into<String>) -> Error {
        Error::Parse {
            input: self.input.to_string(),
            position: self.pos,
            message: message.into(),
        }
    }

    fn rest(&self) -> &'a str {
        self.input.get(self.pos..).unwrap_or("")
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.rest().chars().next()
    }

    fn eat(&mut self, token: char) -> bool {
        if self.peek() == Some(token) {
            self.pos += token.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect_token(&mut self, token: char) -> Result<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", token)))
        }
    }

    fn ident(&mut self) -> Result<&'a str> {
        self.skip_ws();
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(self.error("expected an identifier"));
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    /// `keyword=`, used by the named parameters of expression types.
    fn keyword(&mut self, keyword: &str) -> Result<()> {
        let start = self.pos;
        let found = self.ident()?;
        if found != keyword {
            self.pos = start;
            return Err(self.error(format!("expected '{}='", keyword)));
        }
        self.expect_token('=')
    }

    fn integer(&mut self) -> Result<usize> {
        self.skip_ws();
        let rest = self.rest();
        let len = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let value = rest[..len]
            .parse::<usize>()
            .map_err(|_| self.error("expected an integer"))?;
        self.pos += len;
        Ok(value)
    }

    fn quoted_encoding(&mut self) -> Result<StringEncoding> {
        self.expect_token('\'')?;
        let name = self.ident()?;
        let encoding = StringEncoding::from_name(name)
            .ok_or_else(|| self.error(format!("unknown string encoding '{}'", name)))?;
        self.expect_token('\'')?;
        Ok(encoding)
    }

    fn parse_type(&mut self) -> Result<DType> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error("type nesting too deep"));
        }
        self.depth += 1;
        let result = self.parse_type_at_depth();
        self.depth -= 1;
        result
    }

    fn parse_type_at_depth(&mut self) -> Result<DType> {
        if self.peek() == Some('{') {
            return self.parse_struct();
        }
        let start = self.pos;
        let name = self.ident()?;
        match name {
            "complex" => self.parse_complex(),
            "fixedbytes" => self.parse_fixedbytes(),
            "string" => self.parse_string(),
            "strided_dim" => {
                self.expect_token('<')?;
                let element = self.parse_type()?;
                self.expect_token('>')?;
                make_strided_dim_dtype(element)
            }
            "view" => self.parse_view(),
            "convert" => self.parse_convert(),
            "byteswap" => self.parse_byteswap(),
            _ if name.starts_with(|c: char| c.is_ascii_uppercase()) => make_typevar_dtype(name),
            _ => match builtin_by_name(name) {
                Some(id) => DType::builtin(id),
                None => {
                    self.pos = start;
                    Err(self.error(format!("unknown type name '{}'", name)))
                }
            },
        }
    }

    fn parse_complex(&mut self) -> Result<DType> {
        self.expect_token('<')?;
        let component = self.ident()?;
        let id = match component {
            "float32" => TypeId::Complex64,
            "float64" => TypeId::Complex128,
            other => {
                return Err(self.error(format!("complex of '{}' is not supported", other)));
            }
        };
        self.expect_token('>')?;
        DType::builtin(id)
    }

    fn parse_fixedbytes(&mut self) -> Result<DType> {
        self.expect_token('<')?;
        let size = self.integer()?;
        let alignment = if self.eat(',') { self.integer()? } else { 1 };
        self.expect_token('>')?;
        make_fixedbytes_dtype(size, alignment)
    }

    fn parse_string(&mut self) -> Result<DType> {
        if !self.eat('<') {
            return Ok(make_string_dtype(StringEncoding::Utf8));
        }
        if self.peek() == Some('\'') {
            let encoding = self.quoted_encoding()?;
            self.expect_token('>')?;
            return Ok(make_string_dtype(encoding));
        }
        let size = self.integer()?;
        let encoding = if self.eat(',') {
            self.quoted_encoding()?
        } else {
            StringEncoding::Utf8
        };
        self.expect_token('>')?;
        make_fixedstring_dtype(size, encoding)
    }

    fn parse_struct(&mut self) -> Result<DType> {
        self.expect_token('{')?;
        let mut fields = Vec::new();
        if !self.eat('}') {
            loop {
                let name = self.ident()?.to_string();
                self.expect_token(':')?;
                fields.push((name, self.parse_type()?));
                if self.eat('}') {
                    break;
                }
                self.expect_token(',')?;
            }
        }
        make_struct_dtype(fields)
    }

    fn parse_view(&mut self) -> Result<DType> {
        self.expect_token('<')?;
        self.keyword("as")?;
        let value = self.parse_type()?;
        self.expect_token(',')?;
        self.keyword("original")?;
        let operand = self.parse_type()?;
        self.expect_token('>')?;
        Ok(DType::new(ViewDType::new(value, operand)?))
    }

    fn parse_convert(&mut self) -> Result<DType> {
        self.expect_token('<')?;
        self.keyword("to")?;
        let value = self.parse_type()?;
        self.expect_token(',')?;
        self.keyword("from")?;
        let operand = self.parse_type()?;
        let errmode = if self.eat(',') {
            self.keyword("errmode")?;
            let name = self.ident()?;
            AssignErrorMode::from_name(name)
                .ok_or_else(|| self.error(format!("unknown error mode '{}'", name)))?
        } else {
            AssignErrorMode::Default
        };
        self.expect_token('>')?;
        Ok(DType::new(ConvertDType::new(value, operand, errmode)?))
    }

    fn parse_byteswap(&mut self) -> Result<DType> {
        self.expect_token('<')?;
        let value = self.parse_type()?;
        let tp = if self.eat(',') {
            self.keyword("original")?;
            let operand = self.parse_type()?;
            DType::new(ByteswapDType::new(value, operand)?)
        } else {
            crate::types::expr::make_byteswap(&value)?
        };
        self.expect_token('>')?;
        Ok(tp)
    }
}

fn builtin_by_name(name: &str) -> Option<TypeId> {
    (0..BUILTIN_TYPE_ID_COUNT as u8)
        .filter_map(|raw| TypeId::from_raw(raw).ok())
        .find(|id| !id.is_complex() && id.name() == name)
}
