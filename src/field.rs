//! How a field type presents itself to the walker.
//!
//! Every type that can appear as a field of a bound record implements
//! [`BindField`], which hands out a [`Slot`]: a typed, mutable view saying
//! what kind of value lives there (primitive, nested record, optional,
//! sequence, custom decoder, uploaded file). The walker dispatches on the
//! slot instead of inspecting types at runtime.
//!
//! Custom types opt into string decoding by implementing [`DecodeParam`]
//! (one value) or [`DecodeParams`] (all values under a key) and returning
//! the matching slot:
//!
//! ```
//! use request_binder::{BindField, BoxError, DecodeParam, Slot};
//!
//! #[derive(Default)]
//! struct Cents(u64);
//!
//! impl DecodeParam for Cents {
//!     fn decode_param(&mut self, value: &str) -> Result<(), BoxError> {
//!         let (whole, frac) = value.split_once('.').unwrap_or((value, "0"));
//!         self.0 = whole.parse::<u64>()? * 100 + frac.parse::<u64>()?;
//!         Ok(())
//!     }
//! }
//!
//! impl BindField for Cents {
//!     fn slot(&mut self) -> Slot<'_> {
//!         Slot::Decode(self)
//!     }
//! }
//! ```
//!
//! Types that already implement [`FromStr`] can be wrapped in [`Parsed`]
//! instead of writing a decoder.

use std::any::Any;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::coerce::{ConversionError, Primitive};
use crate::error::BoxError;
use crate::record::RecordSlot;
use crate::source::UploadedFile;

/// Single-value decoding hook.
///
/// Receives the first value supplied for the field's key.
pub trait DecodeParam {
    /// Decodes `value` into `self`.
    ///
    /// # Errors
    ///
    /// Any error is reported as a conversion failure for the field.
    fn decode_param(&mut self, value: &str) -> Result<(), BoxError>;

    /// Type name used in error messages.
    fn target_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Multi-value decoding hook.
///
/// Receives every value supplied for the field's key, in order, so a type
/// can consume repeated parameters (`?a=1&a=2`) as one unit. Takes
/// precedence over [`DecodeParam`].
pub trait DecodeParams {
    /// Decodes `values` into `self`.
    ///
    /// # Errors
    ///
    /// Any error is reported as a conversion failure for the field.
    fn decode_params(&mut self, values: &[String]) -> Result<(), BoxError>;

    /// Type name used in error messages.
    fn target_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Type-erased access to a field value.
///
/// Implemented for every `'static` type, so [`BindField`] implementors get
/// it for free. Lets two records of the same type exchange one field
/// through its descriptor.
pub trait AnyField: Any {
    /// Returns the value as [`Any`].
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Swaps values with `other` when it holds the same type.
    ///
    /// Returns `false`, leaving both untouched, on a type mismatch.
    fn swap_with(&mut self, other: &mut dyn Any) -> bool;
}

impl<F: Any> AnyField for F {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn swap_with(&mut self, other: &mut dyn Any) -> bool {
        match other.downcast_mut::<F>() {
            Some(other) => {
                std::mem::swap(self, other);
                true
            }
            None => false,
        }
    }
}

/// A type that can be the type of a bound field.
pub trait BindField: AnyField {
    /// Returns a mutable view of this value for the walker.
    fn slot(&mut self) -> Slot<'_>;
}

/// Mutable view of one field value.
pub enum Slot<'a> {
    /// Integer, float, bool or string.
    Primitive(Primitive<'a>),
    /// Nested record whose own fields are walked.
    Record(&'a mut dyn RecordSlot),
    /// `Option<T>`.
    Optional(&'a mut dyn OptionalSlot),
    /// `Vec<T>`.
    Sequence(&'a mut dyn SequenceSlot),
    /// Custom type decoded from a single value.
    Decode(&'a mut dyn DecodeParam),
    /// Custom type decoded from every value under the key.
    DecodeAll(&'a mut dyn DecodeParams),
    /// Uploaded file handle.
    File(&'a mut UploadedFile),
    /// A type that cannot be produced from request strings.
    Unsupported(&'static str),
}

impl Slot<'_> {
    /// Static shape of the viewed value.
    pub fn shape(&self) -> Shape {
        match self {
            Self::Primitive(_) => Shape::Bare(Kind::Primitive),
            Self::Record(_) => Shape::Bare(Kind::Record),
            Self::Optional(optional) => optional.inner_shape().optional(),
            Self::Sequence(sequence) => sequence.element_shape().sequence(),
            Self::Decode(_) => Shape::Bare(Kind::Decode),
            Self::DecodeAll(_) => Shape::Bare(Kind::DecodeAll),
            Self::File(_) => Shape::Bare(Kind::File),
            Self::Unsupported(_) => Shape::Bare(Kind::Unsupported),
        }
    }

    /// Type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Primitive(primitive) => primitive.type_name(),
            Self::Record(_) => "record",
            Self::Optional(_) => "Option",
            Self::Sequence(_) => "Vec",
            Self::Decode(decoder) => decoder.target_name(),
            Self::DecodeAll(decoder) => decoder.target_name(),
            Self::File(_) => "UploadedFile",
            Self::Unsupported(name) => *name,
        }
    }
}

/// Innermost kind of a field type, below any `Option`/`Vec` layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Integer, float, bool or string.
    Primitive,
    /// Nested record.
    Record,
    /// Custom single-value decoder.
    Decode,
    /// Custom multi-value decoder.
    DecodeAll,
    /// Uploaded file handle.
    File,
    /// Not bindable from strings.
    Unsupported,
}

/// A field type's wrapping layers around its [`Kind`].
///
/// At most one level of optionality and one of sequence are modelled;
/// anything deeper is [`Shape::Nested`] and is not bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// `K`
    Bare(Kind),
    /// `Option<K>`
    Optional(Kind),
    /// `Vec<K>`
    Sequence(Kind),
    /// `Option<Vec<K>>`
    OptionalSequence(Kind),
    /// `Vec<Option<K>>`
    SequenceOfOptional(Kind),
    /// Deeper nesting.
    Nested,
}

impl Shape {
    /// Wraps this shape in `Option`.
    pub const fn optional(self) -> Self {
        match self {
            Self::Bare(kind) => Self::Optional(kind),
            Self::Sequence(kind) => Self::OptionalSequence(kind),
            _ => Self::Nested,
        }
    }

    /// Wraps this shape in `Vec`.
    pub const fn sequence(self) -> Self {
        match self {
            Self::Bare(kind) => Self::Sequence(kind),
            Self::Optional(kind) => Self::SequenceOfOptional(kind),
            _ => Self::Nested,
        }
    }

    /// `true` for a record or an optional record.
    pub fn is_record(self) -> bool {
        matches!(self, Self::Bare(Kind::Record) | Self::Optional(Kind::Record))
    }
}

/// Object-safe view of an `Option<T>` field.
pub trait OptionalSlot {
    /// Shape of `T`.
    fn inner_shape(&self) -> Shape;

    /// Stores `T::default()` if the option is empty and returns the inner slot.
    fn allocate(&mut self) -> Slot<'_>;

    /// Fills a fresh `T::default()` through `fill` and stores it on success.
    ///
    /// On error the option keeps its previous value.
    fn replace_with(
        &mut self,
        fill: &mut dyn FnMut(Slot<'_>) -> Result<(), ConversionError>,
    ) -> Result<(), ConversionError>;
}

/// Object-safe view of a `Vec<T>` field.
pub trait SequenceSlot {
    /// Shape of `T`.
    fn element_shape(&self) -> Shape;

    /// Builds a new sequence of exactly `len` elements, filling each through
    /// `fill(index, slot)`, and stores it on success.
    ///
    /// On error the sequence keeps its previous contents.
    fn rebuild(
        &mut self,
        len: usize,
        fill: &mut dyn FnMut(usize, Slot<'_>) -> Result<(), ConversionError>,
    ) -> Result<(), ConversionError>;
}

impl<T: BindField + Default> OptionalSlot for Option<T> {
    fn inner_shape(&self) -> Shape {
        T::default().slot().shape()
    }

    fn allocate(&mut self) -> Slot<'_> {
        self.get_or_insert_with(T::default).slot()
    }

    fn replace_with(
        &mut self,
        fill: &mut dyn FnMut(Slot<'_>) -> Result<(), ConversionError>,
    ) -> Result<(), ConversionError> {
        let mut value = T::default();
        fill(value.slot())?;
        *self = Some(value);
        Ok(())
    }
}

impl<T: BindField + Default> SequenceSlot for Vec<T> {
    fn element_shape(&self) -> Shape {
        T::default().slot().shape()
    }

    fn rebuild(
        &mut self,
        len: usize,
        fill: &mut dyn FnMut(usize, Slot<'_>) -> Result<(), ConversionError>,
    ) -> Result<(), ConversionError> {
        let mut fresh: Vec<T> = std::iter::repeat_with(T::default).take(len).collect();
        for (index, element) in fresh.iter_mut().enumerate() {
            fill(index, element.slot())?;
        }
        *self = fresh;
        Ok(())
    }
}

impl<T: BindField + Default> BindField for Option<T> {
    fn slot(&mut self) -> Slot<'_> {
        Slot::Optional(self)
    }
}

impl<T: BindField + Default> BindField for Vec<T> {
    fn slot(&mut self) -> Slot<'_> {
        Slot::Sequence(self)
    }
}

impl BindField for UploadedFile {
    fn slot(&mut self) -> Slot<'_> {
        Slot::File(self)
    }
}

/// Binds any [`FromStr`] type from a single value.
///
/// # Examples
///
/// ```
/// use std::net::IpAddr;
///
/// use request_binder::{BindField, Parsed, Slot};
///
/// let mut peer: Parsed<IpAddr> = Parsed("0.0.0.0".parse().unwrap());
/// if let Slot::Decode(decoder) = peer.slot() {
///     decoder.decode_param("10.0.0.7").unwrap();
/// }
/// assert_eq!(peer.0.to_string(), "10.0.0.7");
/// ```
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parsed<T>(pub T);

impl<T> Parsed<T> {
    /// Unwraps the parsed value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: fmt::Debug> fmt::Debug for Parsed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<T> DecodeParam for Parsed<T>
where
    T: FromStr,
    T::Err: Into<BoxError>,
{
    fn decode_param(&mut self, value: &str) -> Result<(), BoxError> {
        self.0 = value.parse().map_err(Into::into)?;
        Ok(())
    }

    fn target_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

impl<T> BindField for Parsed<T>
where
    T: FromStr + 'static,
    T::Err: Into<BoxError>,
{
    fn slot(&mut self) -> Slot<'_> {
        Slot::Decode(self)
    }
}

macro_rules! primitive_fields {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl BindField for $ty {
                fn slot(&mut self) -> Slot<'_> {
                    Slot::Primitive(Primitive::$variant(self))
                }
            }
        )*
    };
}

primitive_fields! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => Isize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => Usize,
    f32 => F32,
    f64 => F64,
    bool => Bool,
    String => Str,
}
