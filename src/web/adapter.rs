//! Owned request representation for framework integrations.

use url::form_urlencoded;

use crate::http::HttpMethod;
use crate::source::MultipartForm;

use super::RequestContext;

/// Owned request data the binder can read.
///
/// `RequestAdapter` is the primary integration point between web frameworks
/// and the binder: framework-specific code copies the routed request into
/// it (typically via `From<FrameworkRequest>`) and hands it to
/// [`Binder`](crate::Binder).
///
/// # Examples
///
/// ```
/// use request_binder::web::{RequestAdapter, RequestContext};
/// use request_binder::HttpMethod;
///
/// let mut adapter = RequestAdapter::new(HttpMethod::Post);
/// adapter.add_path_param("id", "42");
/// adapter.add_query_param("q", "a b");
/// adapter.set_body("application/json", br#"{"name":"x"}"#.to_vec());
///
/// assert_eq!(adapter.raw_query(), "q=a+b");
/// assert_eq!(adapter.content_type(), Some("application/json"));
/// assert_eq!(adapter.content_length(), Some(12));
/// ```
#[derive(Debug, Clone)]
pub struct RequestAdapter {
    request_id: Option<String>,
    method: HttpMethod,
    path_params: Vec<(String, String)>,
    raw_query: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    content_length: Option<u64>,
    multipart: Option<MultipartForm>,
}

impl RequestAdapter {
    /// Creates an adapter for a request with no parameters, headers or body.
    pub fn new(method: HttpMethod) -> Self {
        Self {
            request_id: None,
            method,
            path_params: Vec::new(),
            raw_query: String::new(),
            headers: Vec::new(),
            body: Vec::new(),
            content_length: Some(0),
            multipart: None,
        }
    }

    /// Sets the identifier attached to log lines for this request.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Adds a matched path parameter.
    pub fn add_path_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.path_params.push((name.into(), value.into()));
    }

    /// Appends a query parameter, URL-encoding it.
    pub fn add_query_param(&mut self, key: &str, value: &str) {
        let mut query = form_urlencoded::Serializer::new(std::mem::take(&mut self.raw_query));
        query.append_pair(key, value);
        self.raw_query = query.finish();
    }

    /// Replaces the raw query string as received.
    pub fn set_query(&mut self, raw_query: impl Into<String>) {
        self.raw_query = raw_query.into();
    }

    /// Appends a header.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// Sets the body and its `Content-Type`, with a known length.
    pub fn set_body(&mut self, content_type: &str, body: Vec<u8>) {
        self.set_content_type(content_type);
        self.content_length = u64::try_from(body.len()).ok();
        self.body = body;
    }

    /// Sets a decoded multipart form.
    ///
    /// The content type becomes `multipart/form-data` and the length unknown,
    /// as for a streamed upload.
    pub fn set_multipart_form(&mut self, form: MultipartForm) {
        self.set_content_type("multipart/form-data; boundary=request-binder");
        self.content_length = None;
        self.multipart = Some(form);
    }

    /// Overrides the declared body length.
    pub fn set_content_length(&mut self, content_length: Option<u64>) {
        self.content_length = content_length;
    }

    fn set_content_type(&mut self, content_type: &str) {
        self.headers
            .retain(|(name, _)| !name.eq_ignore_ascii_case("content-type"));
        self.headers
            .push(("Content-Type".to_string(), content_type.to_string()));
    }
}

impl RequestContext for RequestAdapter {
    fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    fn method(&self) -> HttpMethod {
        self.method
    }

    fn path_params(&self) -> &[(String, String)] {
        &self.path_params
    }

    fn raw_query(&self) -> &str {
        &self.raw_query
    }

    fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    fn body(&self) -> &[u8] {
        &self.body
    }

    fn multipart_form(&self) -> Option<&MultipartForm> {
        self.multipart.as_ref()
    }
}
