//! Body deserializer adapter.
//!
//! Picks a decoder from the request's media type. Structured documents go
//! through serde (JSON via an injectable [`JsonDeserializer`], XML via
//! quick-xml); form bodies go through the field walker under the `form` tag.

use std::collections::HashSet;
use std::fmt;

use serde::de::value::StrDeserializer;
use serde::de::{
    DeserializeOwned, DeserializeSeed, Deserializer, Error as _, IntoDeserializer, MapAccess,
    SeqAccess, Visitor,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::binder::Phase;
use crate::error::{BodyFormat, BoxError, Error, Failure, MalformedBody, MalformedKind};
use crate::record::{Destination, TagKey};
use crate::walker::Walker;
use crate::web::{form_source, RequestContext};

/// `application/json`
pub const MIME_APPLICATION_JSON: &str = "application/json";
/// `application/xml`
pub const MIME_APPLICATION_XML: &str = "application/xml";
/// `text/xml`
pub const MIME_TEXT_XML: &str = "text/xml";
/// `application/x-www-form-urlencoded`
pub const MIME_APPLICATION_FORM: &str = "application/x-www-form-urlencoded";
/// `multipart/form-data`
pub const MIME_MULTIPART_FORM: &str = "multipart/form-data";

/// Strips parameters from a `Content-Type` value and normalizes case.
///
/// # Examples
///
/// ```
/// use request_binder::body::media_type;
///
/// assert_eq!(media_type(" Application/JSON ; charset=utf-8"), "application/json");
/// ```
pub fn media_type(content_type: &str) -> String {
    let base = content_type
        .split_once(';')
        .map_or(content_type, |(base, _)| base);
    base.trim().to_ascii_lowercase()
}

/// Turns a JSON body into a document.
///
/// The default is [`SerdeJson`]. A custom implementation may return a
/// [`crate::Error`] boxed as the cause; it is passed to the caller unchanged.
pub trait JsonDeserializer: Send + Sync {
    /// Parses `body`.
    ///
    /// # Errors
    ///
    /// Returns the parser's error.
    fn deserialize(&self, body: &[u8]) -> Result<Value, BoxError>;
}

/// [`JsonDeserializer`] backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerdeJson;

impl JsonDeserializer for SerdeJson {
    fn deserialize(&self, body: &[u8]) -> Result<Value, BoxError> {
        Ok(serde_json::from_slice(body)?)
    }
}

/// Decodes a JSON body over the destination's current state.
///
/// Keys present in the body replace the destination's values; objects are
/// merged key by key, so fields the body omits keep what earlier phases
/// bound. Fields serde skips are carried over untouched.
pub(crate) fn decode_json<T>(
    deserializer: &dyn JsonDeserializer,
    body: &[u8],
    destination: &mut T,
) -> Result<(), Error>
where
    T: Destination + Serialize + DeserializeOwned,
{
    let document = match deserializer.deserialize(body) {
        Ok(document) => document,
        Err(err) => return Err(classify_json(err)),
    };
    if document.is_null() {
        return Ok(());
    }

    let mut merged = current_state(destination)?;
    merge(&mut merged, document);

    let mut fields = None;
    let fresh = T::deserialize(Overlay::new(merged, &Map::new(), &mut fields)).map_err(|err| {
        Error::bad_request(
            Phase::Body,
            MalformedBody::new(BodyFormat::Json, MalformedKind::Structure, err),
        )
    })?;
    replace_decoded(destination, fresh, fields);
    Ok(())
}

fn classify_json(err: BoxError) -> Error {
    let err = match err.downcast::<Error>() {
        Ok(classified) => return *classified,
        Err(other) => other,
    };
    let body = match err.downcast::<serde_json::Error>() {
        Ok(json) => {
            let kind = match json.classify() {
                serde_json::error::Category::Data => MalformedKind::Structure,
                _ => MalformedKind::Syntax,
            };
            let (line, column) = (json.line(), json.column());
            let body = MalformedBody::new(BodyFormat::Json, kind, json);
            if line > 0 {
                body.at(line, column)
            } else {
                body
            }
        }
        Err(other) => MalformedBody::new(BodyFormat::Json, MalformedKind::Syntax, other),
    };
    Error::bad_request(Phase::Body, body)
}

fn merge(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            for (key, value) in patch {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, patch) => *base = patch,
    }
}

/// Decodes an XML body over the destination's current state.
///
/// Top-level elements and attributes present in the document replace the
/// matching fields; every other field keeps its value.
pub(crate) fn decode_xml<T>(body: &[u8], destination: &mut T) -> Result<(), Error>
where
    T: Destination + Serialize + DeserializeOwned,
{
    let current = current_state(destination)?;
    let empty = Map::new();
    let fallback = current.as_object().unwrap_or(&empty);

    let mut fields = None;
    let mut reader = quick_xml::de::Deserializer::from_reader(body);
    let fresh = T::deserialize(Overlay::new(&mut reader, fallback, &mut fields)).map_err(|err| {
        let kind = match err {
            quick_xml::de::DeError::InvalidXml(_) => MalformedKind::Syntax,
            _ => MalformedKind::Structure,
        };
        Error::bad_request(Phase::Body, MalformedBody::new(BodyFormat::Xml, kind, err))
    })?;
    replace_decoded(destination, fresh, fields);
    Ok(())
}

fn current_state<T: Serialize>(destination: &T) -> Result<Value, Error> {
    serde_json::to_value(destination).map_err(|err| {
        Error::bad_request(
            Phase::Body,
            Failure::InvalidDestination {
                reason: format!("destination cannot be serialized for merging: {err}"),
            },
        )
    })
}

fn replace_decoded<T: Destination>(
    destination: &mut T,
    mut fresh: T,
    fields: Option<&'static [&'static str]>,
) {
    if let Some(fields) = fields {
        fresh.restore_undecoded(destination, &|name: &str| fields.contains(&name));
    }
    *destination = fresh;
}

/// Deserializer that fills the root's missing keys from `fallback`.
///
/// Keys the document supplies win; every other key present in `fallback`
/// is fed to the visitor afterwards. The root struct's serde field list is
/// recorded in `fields`.
struct Overlay<'s, D> {
    inner: D,
    fallback: &'s Map<String, Value>,
    fields: &'s mut Option<&'static [&'static str]>,
}

impl<'s, D> Overlay<'s, D> {
    fn new(
        inner: D,
        fallback: &'s Map<String, Value>,
        fields: &'s mut Option<&'static [&'static str]>,
    ) -> Self {
        Self {
            inner,
            fallback,
            fields,
        }
    }
}

macro_rules! forward_to_inner {
    ($($method:ident),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
                self.inner.$method(visitor)
            }
        )*
    };
}

impl<'de, D: Deserializer<'de>> Deserializer<'de> for Overlay<'_, D> {
    type Error = D::Error;

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        *self.fields = Some(fields);
        let visitor = OverlayVisitor {
            visitor,
            fallback: self.fallback,
        };
        self.inner.deserialize_struct(name, fields, visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        let visitor = OverlayVisitor {
            visitor,
            fallback: self.fallback,
        };
        self.inner.deserialize_map(visitor)
    }

    forward_to_inner! {
        deserialize_any,
        deserialize_bool,
        deserialize_i8,
        deserialize_i16,
        deserialize_i32,
        deserialize_i64,
        deserialize_i128,
        deserialize_u8,
        deserialize_u16,
        deserialize_u32,
        deserialize_u64,
        deserialize_u128,
        deserialize_f32,
        deserialize_f64,
        deserialize_char,
        deserialize_str,
        deserialize_string,
        deserialize_bytes,
        deserialize_byte_buf,
        deserialize_option,
        deserialize_unit,
        deserialize_seq,
        deserialize_identifier,
        deserialize_ignored_any,
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.inner.deserialize_unit_struct(name, visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.inner.deserialize_newtype_struct(name, visitor)
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.inner.deserialize_tuple(len, visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.inner.deserialize_tuple_struct(name, len, visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.inner.deserialize_enum(name, variants, visitor)
    }

    fn is_human_readable(&self) -> bool {
        self.inner.is_human_readable()
    }
}

struct OverlayVisitor<'s, V> {
    visitor: V,
    fallback: &'s Map<String, Value>,
}

impl<'de, V: Visitor<'de>> Visitor<'de> for OverlayVisitor<'_, V> {
    type Value = V::Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.visitor.expecting(f)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<Self::Value, A::Error> {
        self.visitor.visit_seq(seq)
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
        self.visitor.visit_map(OverlayMap {
            inner: Some(map),
            fallback: self.fallback.iter(),
            seen: HashSet::new(),
            pending: None,
        })
    }
}

struct OverlayMap<'s, A> {
    inner: Option<A>,
    fallback: serde_json::map::Iter<'s>,
    seen: HashSet<String>,
    pending: Option<Value>,
}

impl<'de, A: MapAccess<'de>> MapAccess<'de> for OverlayMap<'_, A> {
    type Error = A::Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, Self::Error> {
        if let Some(inner) = self.inner.as_mut() {
            if let Some(key) = inner.next_key::<String>()? {
                let name: StrDeserializer<'_, A::Error> = key.as_str().into_deserializer();
                let key_value = seed.deserialize(name)?;
                self.seen.insert(key);
                return Ok(Some(key_value));
            }
            self.inner = None;
        }

        let seen = &self.seen;
        let Some((key, value)) = self.fallback.by_ref().find(|(key, _)| !seen.contains(*key))
        else {
            return Ok(None);
        };
        self.pending = Some(value.clone());
        let name: StrDeserializer<'_, A::Error> = key.as_str().into_deserializer();
        seed.deserialize(name).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, Self::Error> {
        if let Some(value) = self.pending.take() {
            return seed.deserialize(value).map_err(A::Error::custom);
        }
        match self.inner.as_mut() {
            Some(inner) => inner.next_value_seed(seed),
            None => Err(A::Error::custom("map value requested before its key")),
        }
    }
}

/// Binds a URL-encoded body, merged with the query string, under `form`.
pub(crate) fn decode_form<D, R>(request: &R, destination: &mut D) -> Result<(), Error>
where
    D: Destination + ?Sized,
    R: RequestContext + ?Sized,
{
    let values = form_source(request.raw_query(), request.body());
    Walker::new(TagKey::Form, &values)
        .bind(destination)
        .map_err(|failure| Error::bad_request(Phase::Body, failure))
}

/// Binds a decoded multipart body under `form`, with its uploaded files.
pub(crate) fn decode_multipart<D, R>(request: &R, destination: &mut D) -> Result<(), Error>
where
    D: Destination + ?Sized,
    R: RequestContext + ?Sized,
{
    let Some(form) = request.multipart_form() else {
        return Err(Error::bad_request(
            Phase::Body,
            MalformedBody::new(
                BodyFormat::Multipart,
                MalformedKind::Syntax,
                "multipart body was not decoded by the transport",
            ),
        ));
    };

    let mut walker = Walker::new(TagKey::Form, &form.values);
    if !form.files.is_empty() {
        walker = walker.with_files(&form.files);
    }
    walker
        .bind(destination)
        .map_err(|failure| Error::bad_request(Phase::Body, failure))
}
