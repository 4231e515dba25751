//! Tag-driven binding of request data into typed records.
//!
//! This crate takes the stringly-typed parts of an HTTP request and fills
//! caller-defined records with them:
//! - **Path parameters**, **query parameters** and **headers**, matched to
//!   fields by per-source external names
//! - **Bodies**: JSON and XML through serde, URL-encoded and multipart forms
//!   through the same field walker as the other sources
//!
//! Binding is layered. [`Binder::bind`] runs path, then query (for `GET`,
//! `DELETE` and `HEAD` only), then body, and each phase may overwrite what
//! the previous one bound.
//!
//! # Core Types
//!
//! - [`Bindable`]: a record's static table of [`FieldDescriptor`]s
//! - [`BindField`]: how a field type presents itself ([`Slot`])
//! - [`DecodeParam`] / [`DecodeParams`]: custom decoding from one or all values,
//!   with [`Parsed`] adapting any `FromStr` type
//! - [`Binder`]: runs the phases against a [`web::RequestContext`]
//! - [`Error`]: classified failure with an HTTP status
//!
//! # Examples
//!
//! ```
//! use request_binder::web::RequestAdapter;
//! use request_binder::{Binder, Bindable, FieldDescriptor, HttpMethod};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Default, Serialize, Deserialize)]
//! #[serde(default)]
//! struct SearchUsers {
//!     org: String,
//!     tags: Vec<String>,
//!     page: Option<u32>,
//! }
//!
//! impl Bindable for SearchUsers {
//!     fn fields() -> &'static [FieldDescriptor<Self>] {
//!         const FIELDS: &[FieldDescriptor<SearchUsers>] = &[
//!             FieldDescriptor::new("org", |s: &mut SearchUsers| &mut s.org).param("org"),
//!             FieldDescriptor::new("tags", |s: &mut SearchUsers| &mut s.tags).query("tag"),
//!             FieldDescriptor::new("page", |s: &mut SearchUsers| &mut s.page).query("page"),
//!         ];
//!         FIELDS
//!     }
//! }
//!
//! let mut request = RequestAdapter::new(HttpMethod::Get);
//! request.add_path_param("org", "acme");
//! request.set_query("tag=admin&tag=ops&page=2");
//!
//! let mut search = SearchUsers::default();
//! Binder::new().bind(&mut search, &request).expect("valid request");
//!
//! assert_eq!(search.org, "acme");
//! assert_eq!(search.tags, ["admin", "ops"]);
//! assert_eq!(search.page, Some(2));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod binder;
pub mod body;
pub mod coerce;
mod error;
mod field;
mod http;
mod record;
mod source;
mod walker;
pub mod web;

pub use binder::{Binder, Phase};
pub use body::{JsonDeserializer, SerdeJson};
pub use coerce::{ConversionError, Primitive};
pub use error::{BodyFormat, BoxError, Error, Failure, MalformedBody, MalformedKind, Position};
pub use field::{
    AnyField, BindField, DecodeParam, DecodeParams, Kind, OptionalSlot, Parsed, SequenceSlot,
    Shape, Slot,
};
pub use http::{HttpMethod, UnknownMethod};
pub use record::{
    Accessor, Bindable, Destination, FieldDescriptor, MapTarget, RecordSlot, TagKey, Target,
};
pub use source::{FieldSource, FileSource, Multimap, MultipartForm, UploadedFile};
pub use walker::Walker;
