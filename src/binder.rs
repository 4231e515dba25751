//! Precedence orchestrator.
//!
//! [`Binder::bind`] runs the path, query and body phases in that order,
//! each one overwriting what the previous bound for the same field.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::body::{self, JsonDeserializer, SerdeJson};
use crate::error::Error;
use crate::record::{Destination, TagKey};
use crate::walker::Walker;
use crate::web::{header_source, path_source, query_source, RequestContext};

/// A binding phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Path parameters, tag `param`.
    Path,
    /// Query parameters, tag `query`.
    Query,
    /// Headers, tag `header`.
    Header,
    /// Request body, tag `form` for form bodies.
    Body,
}

impl Phase {
    /// Tag key the phase reads field names from.
    pub fn tag(self) -> TagKey {
        match self {
            Phase::Path => TagKey::Param,
            Phase::Query => TagKey::Query,
            Phase::Header => TagKey::Header,
            Phase::Body => TagKey::Form,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Path => write!(f, "path"),
            Phase::Query => write!(f, "query"),
            Phase::Header => write!(f, "header"),
            Phase::Body => write!(f, "body"),
        }
    }
}

/// Binds request data into destinations.
///
/// A `Binder` holds no per-request state and can be shared across threads.
///
/// # Examples
///
/// ```
/// use request_binder::web::RequestAdapter;
/// use request_binder::{Binder, Bindable, FieldDescriptor, HttpMethod};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Default, Serialize, Deserialize)]
/// struct UpdateUser {
///     #[serde(default)]
///     id: u64,
///     #[serde(default)]
///     name: String,
/// }
///
/// impl Bindable for UpdateUser {
///     fn fields() -> &'static [FieldDescriptor<Self>] {
///         const FIELDS: &[FieldDescriptor<UpdateUser>] = &[
///             FieldDescriptor::new("id", |u: &mut UpdateUser| &mut u.id).param("id"),
///             FieldDescriptor::new("name", |u: &mut UpdateUser| &mut u.name).form("name"),
///         ];
///         FIELDS
///     }
/// }
///
/// let mut request = RequestAdapter::new(HttpMethod::Put);
/// request.add_path_param("id", "7");
/// request.set_body("application/json", br#"{"name":"Ada"}"#.to_vec());
///
/// let mut user = UpdateUser::default();
/// Binder::new().bind(&mut user, &request)?;
///
/// assert_eq!(user.id, 7);
/// assert_eq!(user.name, "Ada");
/// # Ok::<(), request_binder::Error>(())
/// ```
#[derive(Clone)]
pub struct Binder {
    json: Arc<dyn JsonDeserializer>,
}

impl Binder {
    /// Creates a binder decoding JSON with `serde_json`.
    pub fn new() -> Self {
        Self {
            json: Arc::new(SerdeJson),
        }
    }

    /// Replaces the JSON deserializer.
    pub fn with_json_deserializer(mut self, json: impl JsonDeserializer + 'static) -> Self {
        self.json = Arc::new(json);
        self
    }

    /// Binds path parameters, then query parameters (for `GET`, `DELETE`
    /// and `HEAD` only), then the body.
    ///
    /// # Errors
    ///
    /// Stops at the first failing phase. Fields bound before the failure
    /// keep their new values; use [`Binder::bind_atomic`] to avoid that.
    pub fn bind<T, R>(&self, destination: &mut T, request: &R) -> Result<(), Error>
    where
        T: Destination + Serialize + DeserializeOwned,
        R: RequestContext + ?Sized,
    {
        let method = request.method();
        let span = tracing::debug_span!(
            "bind",
            request_id = request.request_id().unwrap_or("-"),
            method = %method,
        );
        let _enter = span.enter();

        self.bind_path_params(destination, request)?;
        if method.binds_query_params() {
            self.bind_query_params(destination, request)?;
        } else {
            tracing::debug!(phase = %Phase::Query, "skipped for method with a body");
        }
        self.bind_body(destination, request)
    }

    /// Like [`Binder::bind`], but leaves `destination` untouched on error.
    ///
    /// # Errors
    ///
    /// Same as [`Binder::bind`].
    pub fn bind_atomic<T, R>(&self, destination: &mut T, request: &R) -> Result<(), Error>
    where
        T: Destination + Serialize + DeserializeOwned + Clone,
        R: RequestContext + ?Sized,
    {
        let mut staged = destination.clone();
        self.bind(&mut staged, request)?;
        *destination = staged;
        Ok(())
    }

    /// Binds path parameters into fields tagged `param`.
    ///
    /// # Errors
    ///
    /// Returns a [`Phase::Path`] error on conversion or mapping failures.
    pub fn bind_path_params<D, R>(&self, destination: &mut D, request: &R) -> Result<(), Error>
    where
        D: Destination + ?Sized,
        R: RequestContext + ?Sized,
    {
        let values = path_source(request.path_params());
        self.walk(Phase::Path, Walker::new(TagKey::Param, &values), destination)
    }

    /// Binds query parameters into fields tagged `query`, regardless of
    /// method.
    ///
    /// # Errors
    ///
    /// Returns a [`Phase::Query`] error on conversion or mapping failures.
    pub fn bind_query_params<D, R>(&self, destination: &mut D, request: &R) -> Result<(), Error>
    where
        D: Destination + ?Sized,
        R: RequestContext + ?Sized,
    {
        let values = query_source(request.raw_query());
        self.walk(Phase::Query, Walker::new(TagKey::Query, &values), destination)
    }

    /// Binds headers into fields tagged `header`.
    ///
    /// Never run by [`Binder::bind`].
    ///
    /// # Errors
    ///
    /// Returns a [`Phase::Header`] error on conversion or mapping failures.
    pub fn bind_headers<D, R>(&self, destination: &mut D, request: &R) -> Result<(), Error>
    where
        D: Destination + ?Sized,
        R: RequestContext + ?Sized,
    {
        let values = header_source(request.headers());
        self.walk(Phase::Header, Walker::new(TagKey::Header, &values), destination)
    }

    /// Binds the body according to its media type.
    ///
    /// A body whose declared length is zero is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedMediaType`] for media types without a
    /// decoder, otherwise a [`Phase::Body`] error.
    pub fn bind_body<T, R>(&self, destination: &mut T, request: &R) -> Result<(), Error>
    where
        T: Destination + Serialize + DeserializeOwned,
        R: RequestContext + ?Sized,
    {
        if request.content_length() == Some(0) {
            tracing::debug!(phase = %Phase::Body, "empty body");
            return Ok(());
        }

        let media_type = body::media_type(request.content_type().unwrap_or_default());
        tracing::debug!(phase = %Phase::Body, media_type = %media_type, "binding");

        match media_type.as_str() {
            body::MIME_APPLICATION_JSON => {
                body::decode_json(self.json.as_ref(), request.body(), destination)
            }
            body::MIME_APPLICATION_XML | body::MIME_TEXT_XML => {
                body::decode_xml(request.body(), destination)
            }
            body::MIME_APPLICATION_FORM => body::decode_form(request, destination),
            body::MIME_MULTIPART_FORM => body::decode_multipart(request, destination),
            _ => {
                tracing::warn!(media_type = %media_type, "unsupported media type");
                Err(Error::UnsupportedMediaType { media_type })
            }
        }
    }

    fn walk<D: Destination + ?Sized>(
        &self,
        phase: Phase,
        walker: Walker<'_>,
        destination: &mut D,
    ) -> Result<(), Error> {
        tracing::debug!(phase = %phase, tag = %walker.tag(), "binding");
        walker
            .bind(destination)
            .map_err(|failure| Error::bad_request(phase, failure))
    }
}

impl Default for Binder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder").finish_non_exhaustive()
    }
}
