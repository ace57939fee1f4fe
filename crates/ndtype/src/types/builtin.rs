// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Builtin scalar types.
//!
//! Every builtin scalar implements [`Scalar`]: native-endian load/store against raw
//! element bytes, a widened [`ScalarValue`] for conversions, and checked construction
//! from a value under an [`ErrorPolicy`].

use crate::error::{Error, Result};
use crate::kernels::errmode::ErrorPolicy;
use crate::types::type_id::TypeId;
use std::cmp::Ordering;
use std::fmt;

/// Complex number stored as two consecutive components.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct Complex<T> {
    pub re: T,
    pub im: T,
}

impl<T> Complex<T> {
    pub const fn new(re: T, im: T) -> Self {
        Self { re, im }
    }
}

/// Widened scalar used as the pivot of builtin conversions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalarValue {
    Bool(bool),
    Int(i128),
    Float(f64),
    Complex(f64, f64),
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Bool(b) => write!(f, "{}", b),
            ScalarValue::Int(n) => write!(f, "{}", n),
            ScalarValue::Float(x) => write!(f, "{:?}", x),
            ScalarValue::Complex(re, im) => write!(f, "({:?}, {:?})", re, im),
        }
    }
}

/// A builtin scalar with a fixed native layout.
pub trait Scalar: Copy + Send + Sync + fmt::Debug + 'static {
    const TYPE_ID: TypeId;

    /// Reads from the first `size_of::<Self>()` bytes.
    fn load(bytes: &[u8]) -> Result<Self>;
    /// Writes into the first `size_of::<Self>()` bytes.
    fn store(self, out: &mut [u8]) -> Result<()>;
    fn to_value(self) -> ScalarValue;
    /// Converts a widened value, checking it according to `P`.
    fn from_value<P: ErrorPolicy>(value: ScalarValue) -> Result<Self>;
    fn write_text(self, out: &mut dyn fmt::Write) -> fmt::Result;
}

pub(crate) fn read_array<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
    bytes
        .get(..N)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| Error::Memory(format!("need {} bytes, have {}", N, bytes.len())))
}

pub(crate) fn write_bytes(out: &mut [u8], bytes: &[u8]) -> Result<()> {
    let len = out.len();
    out.get_mut(..bytes.len())
        .ok_or_else(|| Error::Memory(format!("need {} bytes, have {}", bytes.len(), len)))?
        .copy_from_slice(bytes);
    Ok(())
}

fn overflow(value: ScalarValue, dst: TypeId) -> Error {
    Error::Overflow {
        value: value.to_string(),
        dst: dst.name().to_string(),
    }
}

fn fractional(value: ScalarValue, dst: TypeId) -> Error {
    Error::Fractional {
        value: value.to_string(),
        dst: dst.name().to_string(),
    }
}

fn inexact(value: ScalarValue, dst: TypeId) -> Error {
    Error::Inexact {
        value: value.to_string(),
        dst: dst.name().to_string(),
    }
}

/// Drops the imaginary part of a complex source, rejecting nonzero parts when inexact.
fn real_part<P: ErrorPolicy>(value: ScalarValue, dst: TypeId) -> Result<ScalarValue> {
    match value {
        ScalarValue::Complex(re, im) => {
            if P::MODE.checks_inexact() && im != 0.0 {
                return Err(inexact(value, dst));
            }
            Ok(ScalarValue::Float(re))
        }
        other => Ok(other),
    }
}

fn int_from_value<P: ErrorPolicy>(
    value: ScalarValue,
    dst: TypeId,
    min: i128,
    max: i128,
) -> Result<IntSource> {
    match real_part::<P>(value, dst)? {
        ScalarValue::Bool(b) => Ok(IntSource::Int(b as i128)),
        ScalarValue::Int(n) => {
            if P::MODE.checks_overflow() && (n < min || n > max) {
                return Err(overflow(value, dst));
            }
            Ok(IntSource::Int(n))
        }
        ScalarValue::Float(x) => {
            if P::MODE.checks_overflow() {
                let t = x.trunc();
                // Both bounds are exact powers of two (or zero) in f64.
                let upper = (max + 1) as f64;
                if x.is_nan() || t < min as f64 || t >= upper {
                    return Err(overflow(value, dst));
                }
            }
            if P::MODE.checks_fractional() && x.fract() != 0.0 {
                return Err(fractional(value, dst));
            }
            Ok(IntSource::Float(x))
        }
        ScalarValue::Complex(..) => Err(Error::Corruption(
            "complex value survived real-part extraction".into(),
        )),
    }
}

/// Intermediate result so float sources keep Rust's saturating `as` semantics.
enum IntSource {
    Int(i128),
    Float(f64),
}

fn f64_from_value<P: ErrorPolicy>(value: ScalarValue, dst: TypeId) -> Result<f64> {
    match real_part::<P>(value, dst)? {
        ScalarValue::Bool(b) => Ok(if b { 1.0 } else { 0.0 }),
        ScalarValue::Int(n) => {
            let x = n as f64;
            if P::MODE.checks_inexact() && x as i128 != n {
                return Err(inexact(value, dst));
            }
            Ok(x)
        }
        ScalarValue::Float(x) => Ok(x),
        ScalarValue::Complex(..) => Err(Error::Corruption(
            "complex value survived real-part extraction".into(),
        )),
    }
}

fn f32_from_value<P: ErrorPolicy>(value: ScalarValue, dst: TypeId) -> Result<f32> {
    match real_part::<P>(value, dst)? {
        ScalarValue::Bool(b) => Ok(if b { 1.0 } else { 0.0 }),
        ScalarValue::Int(n) => {
            let x = n as f32;
            if P::MODE.checks_inexact() && x as i128 != n {
                return Err(inexact(value, dst));
            }
            Ok(x)
        }
        ScalarValue::Float(x) => {
            if P::MODE.checks_overflow() && x.is_finite() && x.abs() > f32::MAX as f64 {
                return Err(overflow(value, dst));
            }
            let narrowed = x as f32;
            if P::MODE.checks_inexact() && !x.is_nan() && narrowed as f64 != x {
                return Err(inexact(value, dst));
            }
            Ok(narrowed)
        }
        ScalarValue::Complex(..) => Err(Error::Corruption(
            "complex value survived real-part extraction".into(),
        )),
    }
}

macro_rules! impl_int_scalar {
    ($($t:ty => $id:ident),* $(,)?) => {$(
        impl Scalar for $t {
            const TYPE_ID: TypeId = TypeId::$id;

            fn load(bytes: &[u8]) -> Result<Self> {
                Ok(<$t>::from_ne_bytes(read_array(bytes)?))
            }

            fn store(self, out: &mut [u8]) -> Result<()> {
                write_bytes(out, &self.to_ne_bytes())
            }

            fn to_value(self) -> ScalarValue {
                ScalarValue::Int(self as i128)
            }

            fn from_value<P: ErrorPolicy>(value: ScalarValue) -> Result<Self> {
                match int_from_value::<P>(value, TypeId::$id, <$t>::MIN as i128, <$t>::MAX as i128)? {
                    IntSource::Int(n) => Ok(n as $t),
                    IntSource::Float(x) => Ok(x as $t),
                }
            }

            fn write_text(self, out: &mut dyn fmt::Write) -> fmt::Result {
                write!(out, "{}", self)
            }
        }
    )*};
}

impl_int_scalar!(
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
);

impl Scalar for bool {
    const TYPE_ID: TypeId = TypeId::Bool;

    fn load(bytes: &[u8]) -> Result<Self> {
        Ok(read_array::<1>(bytes)?[0] != 0)
    }

    fn store(self, out: &mut [u8]) -> Result<()> {
        write_bytes(out, &[self as u8])
    }

    fn to_value(self) -> ScalarValue {
        ScalarValue::Bool(self)
    }

    fn from_value<P: ErrorPolicy>(value: ScalarValue) -> Result<Self> {
        let (zero, one) = match value {
            ScalarValue::Bool(b) => return Ok(b),
            ScalarValue::Int(n) => (n == 0, n == 1),
            ScalarValue::Float(x) => (x == 0.0, x == 1.0),
            ScalarValue::Complex(re, im) => (re == 0.0 && im == 0.0, re == 1.0 && im == 0.0),
        };
        if P::MODE.checks_overflow() && !zero && !one {
            return Err(overflow(value, TypeId::Bool));
        }
        Ok(!zero)
    }

    fn write_text(self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "{}", self)
    }
}

impl Scalar for f32 {
    const TYPE_ID: TypeId = TypeId::Float32;

    fn load(bytes: &[u8]) -> Result<Self> {
        Ok(f32::from_ne_bytes(read_array(bytes)?))
    }

    fn store(self, out: &mut [u8]) -> Result<()> {
        write_bytes(out, &self.to_ne_bytes())
    }

    fn to_value(self) -> ScalarValue {
        ScalarValue::Float(self as f64)
    }

    fn from_value<P: ErrorPolicy>(value: ScalarValue) -> Result<Self> {
        f32_from_value::<P>(value, TypeId::Float32)
    }

    fn write_text(self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "{:?}", self)
    }
}

impl Scalar for f64 {
    const TYPE_ID: TypeId = TypeId::Float64;

    fn load(bytes: &[u8]) -> Result<Self> {
        Ok(f64::from_ne_bytes(read_array(bytes)?))
    }

    fn store(self, out: &mut [u8]) -> Result<()> {
        write_bytes(out, &self.to_ne_bytes())
    }

    fn to_value(self) -> ScalarValue {
        ScalarValue::Float(self)
    }

    fn from_value<P: ErrorPolicy>(value: ScalarValue) -> Result<Self> {
        f64_from_value::<P>(value, TypeId::Float64)
    }

    fn write_text(self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "{:?}", self)
    }
}

impl Scalar for Complex<f32> {
    const TYPE_ID: TypeId = TypeId::Complex64;

    fn load(bytes: &[u8]) -> Result<Self> {
        let raw: [u8; 8] = read_array(bytes)?;
        Ok(Complex::new(
            f32::from_ne_bytes(read_array(&raw[..4])?),
            f32::from_ne_bytes(read_array(&raw[4..])?),
        ))
    }

    fn store(self, out: &mut [u8]) -> Result<()> {
        let mut raw = [0u8; 8];
        raw[..4].copy_from_slice(&self.re.to_ne_bytes());
        raw[4..].copy_from_slice(&self.im.to_ne_bytes());
        write_bytes(out, &raw)
    }

    fn to_value(self) -> ScalarValue {
        ScalarValue::Complex(self.re as f64, self.im as f64)
    }

    fn from_value<P: ErrorPolicy>(value: ScalarValue) -> Result<Self> {
        match value {
            ScalarValue::Complex(re, im) => Ok(Complex::new(
                f32_from_value::<P>(ScalarValue::Float(re), TypeId::Complex64)?,
                f32_from_value::<P>(ScalarValue::Float(im), TypeId::Complex64)?,
            )),
            other => Ok(Complex::new(f32_from_value::<P>(other, TypeId::Complex64)?, 0.0)),
        }
    }

    fn write_text(self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "({:?}, {:?})", self.re, self.im)
    }
}

impl Scalar for Complex<f64> {
    const TYPE_ID: TypeId = TypeId::Complex128;

    fn load(bytes: &[u8]) -> Result<Self> {
        let raw: [u8; 16] = read_array(bytes)?;
        Ok(Complex::new(
            f64::from_ne_bytes(read_array(&raw[..8])?),
            f64::from_ne_bytes(read_array(&raw[8..])?),
        ))
    }

    fn store(self, out: &mut [u8]) -> Result<()> {
        let mut raw = [0u8; 16];
        raw[..8].copy_from_slice(&self.re.to_ne_bytes());
        raw[8..].copy_from_slice(&self.im.to_ne_bytes());
        write_bytes(out, &raw)
    }

    fn to_value(self) -> ScalarValue {
        ScalarValue::Complex(self.re, self.im)
    }

    fn from_value<P: ErrorPolicy>(value: ScalarValue) -> Result<Self> {
        match value {
            ScalarValue::Complex(re, im) => Ok(Complex::new(re, im)),
            other => Ok(Complex::new(f64_from_value::<P>(other, TypeId::Complex128)?, 0.0)),
        }
    }

    fn write_text(self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "({:?}, {:?})", self.re, self.im)
    }
}

/// Expands `$body` with `$t` bound to the Rust type of a builtin scalar id.
macro_rules! with_scalar_type {
    ($id:expr, $t:ident => $body:expr, _ => $fallback:expr) => {
        match $id {
            $crate::types::TypeId::Bool => {
                type $t = bool;
                $body
            }
            $crate::types::TypeId::Int8 => {
                type $t = i8;
                $body
            }
            $crate::types::TypeId::Int16 => {
                type $t = i16;
                $body
            }
            $crate::types::TypeId::Int32 => {
                type $t = i32;
                $body
            }
            $crate::types::TypeId::Int64 => {
                type $t = i64;
                $body
            }
            $crate::types::TypeId::UInt8 => {
                type $t = u8;
                $body
            }
            $crate::types::TypeId::UInt16 => {
                type $t = u16;
                $body
            }
            $crate::types::TypeId::UInt32 => {
                type $t = u32;
                $body
            }
            $crate::types::TypeId::UInt64 => {
                type $t = u64;
                $body
            }
            $crate::types::TypeId::Float32 => {
                type $t = f32;
                $body
            }
            $crate::types::TypeId::Float64 => {
                type $t = f64;
                $body
            }
            $crate::types::TypeId::Complex64 => {
                type $t = $crate::types::builtin::Complex<f32>;
                $body
            }
            $crate::types::TypeId::Complex128 => {
                type $t = $crate::types::builtin::Complex<f64>;
                $body
            }
            _ => $fallback,
        }
    };
}
pub(crate) use with_scalar_type;

/// Loads a builtin scalar of type `id` as a widened value.
pub fn load_value(id: TypeId, bytes: &[u8]) -> Result<ScalarValue> {
    with_scalar_type!(id, T => Ok(T::load(bytes)?.to_value()), _ => Err(Error::InvalidTypeId(id as u8)))
}

/// Prints one builtin element.
pub fn print_builtin_element(id: TypeId, out: &mut dyn fmt::Write, data: &[u8]) -> Result<()> {
    with_scalar_type!(
        id,
        T => {
            T::load(data)?.write_text(out)?;
            Ok(())
        },
        _ => match id {
            TypeId::Void => Ok(()),
            other => Err(Error::InvalidTypeId(other as u8)),
        }
    )
}

/// Prints bytes as `0x` followed by lowercase hex pairs.
pub fn hexadecimal_print(out: &mut dyn fmt::Write, data: &[u8]) -> fmt::Result {
    out.write_str("0x")?;
    for byte in data {
        write!(out, "{:02x}", byte)?;
    }
    Ok(())
}

/// Orders two widened values of the same builtin type.
///
/// Complex values are only equal or unordered; NaN is unordered.
pub fn compare_values(a: ScalarValue, b: ScalarValue) -> Option<Ordering> {
    match (a, b) {
        (ScalarValue::Bool(x), ScalarValue::Bool(y)) => Some(x.cmp(&y)),
        (ScalarValue::Int(x), ScalarValue::Int(y)) => Some(x.cmp(&y)),
        (ScalarValue::Float(x), ScalarValue::Float(y)) => x.partial_cmp(&y),
        (ScalarValue::Complex(ar, ai), ScalarValue::Complex(br, bi)) => {
            if ar == br && ai == bi {
                Some(Ordering::Equal)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Parses the text form of a scalar destined for a builtin of type `dst`.
pub fn parse_scalar_text(text: &str, dst: TypeId) -> Result<ScalarValue> {
    let trimmed = text.trim();
    let invalid = || Error::TypeMismatch {
        dst: dst.name().to_string(),
        src: format!("string \"{}\"", trimmed),
        context: "parsing a scalar from text",
    };
    match dst {
        TypeId::Bool => match trimmed {
            "true" | "True" | "1" => Ok(ScalarValue::Bool(true)),
            "false" | "False" | "0" => Ok(ScalarValue::Bool(false)),
            _ => Err(invalid()),
        },
        id if id.is_integer() => match trimmed.parse::<i128>() {
            Ok(n) => Ok(ScalarValue::Int(n)),
            // Allow "3.0" into an integer; the policy decides about fractions.
            Err(_) => trimmed
                .parse::<f64>()
                .map(ScalarValue::Float)
                .map_err(|_| invalid()),
        },
        TypeId::Float32 | TypeId::Float64 | TypeId::Complex64 | TypeId::Complex128 => trimmed
            .parse::<f64>()
            .map(ScalarValue::Float)
            .map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}
