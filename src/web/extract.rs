//! Extraction boundary for web integration.
//!
//! This module defines what the binder needs from a framework-specific
//! request ([`RequestContext`]) and normalizes each origin into a
//! [`FieldSource`].

use url::form_urlencoded;

use crate::http::HttpMethod;
use crate::source::{FieldSource, MultipartForm};

/// Read access to the parts of a request the binder consumes.
///
/// Framework integrations implement this for their request type, or fill a
/// [`RequestAdapter`](super::RequestAdapter).
///
/// # Design Notes
///
/// This trait intentionally does NOT:
/// - Parse multipart bodies (the transport hands over a decoded form)
/// - Route requests (path parameters arrive already matched)
///
/// # Examples
///
/// ```
/// use request_binder::web::RequestContext;
/// use request_binder::HttpMethod;
///
/// struct Incoming {
///     query: String,
/// }
///
/// impl RequestContext for Incoming {
///     fn method(&self) -> HttpMethod {
///         HttpMethod::Get
///     }
///     fn path_params(&self) -> &[(String, String)] {
///         &[]
///     }
///     fn raw_query(&self) -> &str {
///         &self.query
///     }
///     fn headers(&self) -> &[(String, String)] {
///         &[]
///     }
///     fn body(&self) -> &[u8] {
///         &[]
///     }
/// }
///
/// let request = Incoming { query: "page=2".to_string() };
/// assert_eq!(request.content_length(), Some(0));
/// ```
pub trait RequestContext {
    /// Identifier used to correlate log lines, if the transport assigns one.
    fn request_id(&self) -> Option<&str> {
        None
    }

    /// Request method.
    fn method(&self) -> HttpMethod;

    /// Matched path parameters, in route order.
    fn path_params(&self) -> &[(String, String)];

    /// Raw query component, with or without a leading `?`.
    fn raw_query(&self) -> &str;

    /// Header pairs in arrival order. Names may repeat.
    fn headers(&self) -> &[(String, String)];

    /// Value of the `Content-Type` header, if present.
    fn content_type(&self) -> Option<&str> {
        self.headers()
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| value.as_str())
    }

    /// Declared body length, `None` when unknown.
    ///
    /// Defaults to the length of [`body`](Self::body), or `None` once the
    /// transport has decoded a multipart form, since its raw body is gone.
    fn content_length(&self) -> Option<u64> {
        if self.multipart_form().is_some() {
            return None;
        }
        u64::try_from(self.body().len()).ok()
    }

    /// Raw body bytes.
    fn body(&self) -> &[u8];

    /// Decoded multipart form, for `multipart/form-data` requests.
    fn multipart_form(&self) -> Option<&MultipartForm> {
        None
    }
}

/// Path parameters as a source. A repeated name keeps its last value.
pub fn path_source(params: &[(String, String)]) -> FieldSource {
    let mut source = FieldSource::new();
    for (name, value) in params {
        source.set(name.as_str(), value.clone());
    }
    source
}

/// Decoded query parameters, repeated keys kept in order.
///
/// # Examples
///
/// ```
/// use request_binder::web::query_source;
///
/// let source = query_source("?tag=a&tag=b%20c");
/// assert_eq!(source.get("tag").unwrap(), ["a", "b c"]);
/// ```
pub fn query_source(raw_query: &str) -> FieldSource {
    let raw_query = raw_query.strip_prefix('?').unwrap_or(raw_query);
    form_urlencoded::parse(raw_query.as_bytes())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

/// Header pairs as a source, names kept as received.
pub fn header_source(headers: &[(String, String)]) -> FieldSource {
    headers
        .iter()
        .map(|(name, value)| (name.as_str(), value.clone()))
        .collect()
}

/// Values of a URL-encoded form: body values first, then query values under
/// the same names.
pub fn form_source(raw_query: &str, body: &[u8]) -> FieldSource {
    let mut source: FieldSource = form_urlencoded::parse(body)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    source.extend(
        query_source(raw_query)
            .iter()
            .flat_map(|(key, values)| values.iter().map(move |value| (key, value.clone()))),
    );
    source
}
