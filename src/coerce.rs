//! Primitive coercion from raw request strings.
//!
//! The rules are lenient about presence: a key that is present
//! with an empty value produces the type's zero value (`0`, `0.0`, `false`,
//! `""`) instead of an error. Absence is handled by the walker, which never
//! reaches this module for missing keys.

use std::num::{ParseFloatError, ParseIntError};
use std::str::FromStr;

use thiserror::Error;

use crate::error::BoxError;

/// Error converting a raw value into a field's type.
///
/// A conversion error never leaves the target half-written: the target keeps
/// its previous value.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The value is not a base-10 integer that fits the target width.
    #[error("cannot parse {value:?} as {target}: {source}")]
    Integer {
        /// Raw input.
        value: String,
        /// Target type name.
        target: &'static str,
        /// Parser error.
        #[source]
        source: ParseIntError,
    },
    /// The value is not a floating-point number.
    #[error("cannot parse {value:?} as {target}: {source}")]
    Float {
        /// Raw input.
        value: String,
        /// Target type name.
        target: &'static str,
        /// Parser error.
        #[source]
        source: ParseFloatError,
    },
    /// The value is not one of the accepted boolean spellings.
    #[error("cannot parse {value:?} as bool")]
    Bool {
        /// Raw input.
        value: String,
    },
    /// A custom decoder rejected the input.
    #[error("cannot decode into {target}: {source}")]
    Decode {
        /// Type whose decoder failed.
        target: &'static str,
        /// Error returned by the decoder.
        #[source]
        source: BoxError,
    },
    /// The field's type cannot be produced from strings.
    #[error("unsupported field type {target}")]
    UnsupportedType {
        /// Type that was asked for.
        target: &'static str,
    },
}

/// Mutable reference to a primitive field.
#[derive(Debug)]
pub enum Primitive<'a> {
    /// `i8` field.
    I8(&'a mut i8),
    /// `i16` field.
    I16(&'a mut i16),
    /// `i32` field.
    I32(&'a mut i32),
    /// `i64` field.
    I64(&'a mut i64),
    /// `isize` field.
    Isize(&'a mut isize),
    /// `u8` field.
    U8(&'a mut u8),
    /// `u16` field.
    U16(&'a mut u16),
    /// `u32` field.
    U32(&'a mut u32),
    /// `u64` field.
    U64(&'a mut u64),
    /// `usize` field.
    Usize(&'a mut usize),
    /// `f32` field.
    F32(&'a mut f32),
    /// `f64` field.
    F64(&'a mut f64),
    /// `bool` field.
    Bool(&'a mut bool),
    /// `String` field.
    Str(&'a mut String),
}

impl Primitive<'_> {
    /// Name of the referenced type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::I8(_) => "i8",
            Self::I16(_) => "i16",
            Self::I32(_) => "i32",
            Self::I64(_) => "i64",
            Self::Isize(_) => "isize",
            Self::U8(_) => "u8",
            Self::U16(_) => "u16",
            Self::U32(_) => "u32",
            Self::U64(_) => "u64",
            Self::Usize(_) => "usize",
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
            Self::Bool(_) => "bool",
            Self::Str(_) => "String",
        }
    }

    /// Parses `raw` and stores it in the referenced field.
    ///
    /// # Errors
    ///
    /// Returns `ConversionError` if `raw` does not parse; the field is left
    /// unchanged in that case.
    pub fn assign(self, raw: &str) -> Result<(), ConversionError> {
        match self {
            Self::I8(slot) => *slot = parse_int(raw, "i8")?,
            Self::I16(slot) => *slot = parse_int(raw, "i16")?,
            Self::I32(slot) => *slot = parse_int(raw, "i32")?,
            Self::I64(slot) => *slot = parse_int(raw, "i64")?,
            Self::Isize(slot) => *slot = parse_int(raw, "isize")?,
            Self::U8(slot) => *slot = parse_int(raw, "u8")?,
            Self::U16(slot) => *slot = parse_int(raw, "u16")?,
            Self::U32(slot) => *slot = parse_int(raw, "u32")?,
            Self::U64(slot) => *slot = parse_int(raw, "u64")?,
            Self::Usize(slot) => *slot = parse_int(raw, "usize")?,
            Self::F32(slot) => *slot = parse_float(raw, "f32")?,
            Self::F64(slot) => *slot = parse_float(raw, "f64")?,
            Self::Bool(slot) => *slot = parse_bool(raw)?,
            Self::Str(slot) => raw.clone_into(slot),
        }
        Ok(())
    }
}

/// Parses a base-10 integer; an empty string is zero.
///
/// The target width is the width of `T`, so `"300"` fails for `u8`.
///
/// # Examples
///
/// ```
/// use request_binder::coerce::parse_int;
///
/// assert_eq!(parse_int::<i16>("", "i16").unwrap(), 0);
/// assert_eq!(parse_int::<i16>("-42", "i16").unwrap(), -42);
/// assert!(parse_int::<u8>("300", "u8").is_err());
/// ```
pub fn parse_int<T>(raw: &str, target: &'static str) -> Result<T, ConversionError>
where
    T: FromStr<Err = ParseIntError>,
{
    let digits = if raw.is_empty() { "0" } else { raw };
    digits.parse().map_err(|source| ConversionError::Integer {
        value: raw.to_owned(),
        target,
        source,
    })
}

/// Parses a floating-point number; an empty string is `0.0`.
pub fn parse_float<T>(raw: &str, target: &'static str) -> Result<T, ConversionError>
where
    T: FromStr<Err = ParseFloatError>,
{
    let digits = if raw.is_empty() { "0.0" } else { raw };
    digits.parse().map_err(|source| ConversionError::Float {
        value: raw.to_owned(),
        target,
        source,
    })
}

/// Parses a boolean; an empty string is `false`.
///
/// Accepted spellings: `1 t T true TRUE True` and `0 f F false FALSE False`.
pub fn parse_bool(raw: &str) -> Result<bool, ConversionError> {
    match raw {
        "" | "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        _ => Err(ConversionError::Bool {
            value: raw.to_owned(),
        }),
    }
}
