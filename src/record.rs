//! Record descriptors and binding destinations.
//!
//! A record type describes its bindable fields once, as a static table of
//! [`FieldDescriptor`]s in declaration order. Each descriptor carries the
//! external name per source, the embedded/read-only flags and an accessor
//! returning the field as a [`BindField`].
//!
//! # Examples
//!
//! ```
//! use request_binder::{Bindable, BindField, FieldDescriptor, Slot};
//!
//! #[derive(Default)]
//! struct Paging {
//!     page: u32,
//!     per_page: Option<u32>,
//! }
//!
//! #[derive(Default)]
//! struct ListUsers {
//!     org: String,
//!     paging: Paging,
//!     tags: Vec<String>,
//! }
//!
//! impl Bindable for Paging {
//!     fn fields() -> &'static [FieldDescriptor<Self>] {
//!         const FIELDS: &[FieldDescriptor<Paging>] = &[
//!             FieldDescriptor::new("page", |p: &mut Paging| &mut p.page).query("page"),
//!             FieldDescriptor::new("per_page", |p: &mut Paging| &mut p.per_page)
//!                 .query("per_page"),
//!         ];
//!         FIELDS
//!     }
//! }
//!
//! impl BindField for Paging {
//!     fn slot(&mut self) -> Slot<'_> {
//!         Slot::Record(self)
//!     }
//! }
//!
//! impl Bindable for ListUsers {
//!     fn fields() -> &'static [FieldDescriptor<Self>] {
//!         const FIELDS: &[FieldDescriptor<ListUsers>] = &[
//!             FieldDescriptor::new("org", |l: &mut ListUsers| &mut l.org).param("org"),
//!             FieldDescriptor::new("paging", |l: &mut ListUsers| &mut l.paging).embedded(),
//!             FieldDescriptor::new("tags", |l: &mut ListUsers| &mut l.tags).query("tag"),
//!         ];
//!         FIELDS
//!     }
//! }
//! ```

use std::collections::HashMap;
use std::fmt;

use crate::error::Failure;
use crate::field::{AnyField, BindField};
use crate::walker::Walker;

/// Source a tag applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKey {
    /// Path parameters.
    Param,
    /// Query parameters.
    Query,
    /// Request headers.
    Header,
    /// URL-encoded and multipart form bodies.
    Form,
}

impl TagKey {
    /// Tag name as written in descriptors and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Param => "param",
            Self::Query => "query",
            Self::Header => "header",
            Self::Form => "form",
        }
    }
}

impl fmt::Display for TagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accessor returning one field of `T`.
pub type Accessor<T> = fn(&mut T) -> &mut dyn BindField;

/// Static description of one bindable field.
///
/// An external name of `""` opts the field out of that source entirely.
/// A field with no name for a source is skipped for it, unless it is a
/// nested record, which is then walked for its own tagged fields.
pub struct FieldDescriptor<T> {
    name: &'static str,
    param: Option<&'static str>,
    query: Option<&'static str>,
    header: Option<&'static str>,
    form: Option<&'static str>,
    embedded: bool,
    read_only: bool,
    access: Accessor<T>,
}

impl<T> FieldDescriptor<T> {
    /// Describes the field called `name` reached through `access`.
    pub const fn new(name: &'static str, access: Accessor<T>) -> Self {
        Self {
            name,
            param: None,
            query: None,
            header: None,
            form: None,
            embedded: false,
            read_only: false,
            access,
        }
    }

    /// Binds the field from the path parameter `external`.
    pub const fn param(mut self, external: &'static str) -> Self {
        self.param = Some(external);
        self
    }

    /// Binds the field from the query parameter `external`.
    pub const fn query(mut self, external: &'static str) -> Self {
        self.query = Some(external);
        self
    }

    /// Binds the field from the header `external`.
    pub const fn header(mut self, external: &'static str) -> Self {
        self.header = Some(external);
        self
    }

    /// Binds the field from the form field `external`.
    pub const fn form(mut self, external: &'static str) -> Self {
        self.form = Some(external);
        self
    }

    /// Marks the field as embedded: its record's fields are flattened into
    /// the parent's namespace.
    pub const fn embedded(mut self) -> Self {
        self.embedded = true;
        self
    }

    /// Marks the field as never written by the binder.
    pub const fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Field name.
    ///
    /// Must match the field's serde name: after a JSON or XML body is
    /// decoded, fields whose name serde does not deserialize keep the value
    /// earlier phases bound.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// External name for `key`, if one was declared.
    pub fn tag(&self, key: TagKey) -> Option<&'static str> {
        match key {
            TagKey::Param => self.param,
            TagKey::Query => self.query,
            TagKey::Header => self.header,
            TagKey::Form => self.form,
        }
    }

    /// Whether the field is embedded.
    pub fn is_embedded(&self) -> bool {
        self.embedded
    }

    /// Whether the field is read-only.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Returns the field of `record` this descriptor points at.
    pub fn get_mut<'r>(&self, record: &'r mut T) -> &'r mut dyn BindField {
        (self.access)(record)
    }
}

impl<T> fmt::Debug for FieldDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("param", &self.param)
            .field("query", &self.query)
            .field("header", &self.header)
            .field("form", &self.form)
            .field("embedded", &self.embedded)
            .field("read_only", &self.read_only)
            .finish_non_exhaustive()
    }
}

/// A record type with a static field table.
pub trait Bindable: Sized + 'static {
    /// Bindable fields in declaration order.
    fn fields() -> &'static [FieldDescriptor<Self>];
}

/// Object-safe handle to a [`Bindable`] record.
pub trait RecordSlot {
    /// Walks this record's fields with `walker`.
    ///
    /// # Errors
    ///
    /// Propagates the first field failure.
    fn bind_with(&mut self, walker: &Walker<'_>) -> Result<(), Failure>;
}

impl<T: Bindable> RecordSlot for T {
    fn bind_with(&mut self, walker: &Walker<'_>) -> Result<(), Failure> {
        walker.walk(self)
    }
}

/// What a binding root looks like.
pub enum Target<'a> {
    /// A record walked field by field.
    Record(&'a mut dyn RecordSlot),
    /// A string-keyed map filled key by key.
    Map(MapTarget<'a>),
    /// Anything else.
    Unsupported,
}

/// String-keyed map roots.
pub enum MapTarget<'a> {
    /// Receives the first value of every key.
    First(&'a mut HashMap<String, String>),
    /// Receives all values of every key.
    All(&'a mut HashMap<String, Vec<String>>),
    /// Receives the first value of every key as a JSON string.
    Value(&'a mut HashMap<String, serde_json::Value>),
}

/// A value that can be the root of a bind call.
pub trait Destination {
    /// Returns the root view.
    fn target(&mut self) -> Target<'_>;

    /// Moves back from `previous` the fields a body decoder cannot write.
    ///
    /// Called on the freshly decoded value after a JSON or XML body, with
    /// `previous` holding the state before the body phase. `decoded` tells
    /// whether serde deserializes a field of that name. The default keeps
    /// the decoded value as is.
    fn restore_undecoded(&mut self, previous: &mut Self, decoded: &dyn Fn(&str) -> bool)
    where
        Self: Sized,
    {
        let _ = (previous, decoded);
    }
}

impl<T: Bindable> Destination for T {
    fn target(&mut self) -> Target<'_> {
        Target::Record(self)
    }

    fn restore_undecoded(&mut self, previous: &mut Self, decoded: &dyn Fn(&str) -> bool) {
        for field in T::fields() {
            if !decoded(field.name()) {
                AnyField::swap_with(field.get_mut(self), field.get_mut(previous).as_any_mut());
            }
        }
    }
}

impl Destination for HashMap<String, String> {
    fn target(&mut self) -> Target<'_> {
        Target::Map(MapTarget::First(self))
    }
}

impl Destination for HashMap<String, Vec<String>> {
    fn target(&mut self) -> Target<'_> {
        Target::Map(MapTarget::All(self))
    }
}

impl Destination for HashMap<String, serde_json::Value> {
    fn target(&mut self) -> Target<'_> {
        Target::Map(MapTarget::Value(self))
    }
}

impl Destination for String {
    fn target(&mut self) -> Target<'_> {
        Target::Unsupported
    }
}

impl Destination for Vec<String> {
    fn target(&mut self) -> Target<'_> {
        Target::Unsupported
    }
}
