use std::fmt;
use std::str::FromStr;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// HTTP GET method
    Get,
    /// HTTP HEAD method
    Head,
    /// HTTP POST method
    Post,
    /// HTTP PUT method
    Put,
    /// HTTP PATCH method
    Patch,
    /// HTTP DELETE method
    Delete,
    /// HTTP OPTIONS method
    Options,
    /// HTTP CONNECT method
    Connect,
    /// HTTP TRACE method
    Trace,
}

impl HttpMethod {
    /// Returns `true` if [`Binder::bind`](crate::Binder::bind) reads query
    /// parameters for this method.
    ///
    /// Only methods that carry no body (`GET`, `DELETE`, `HEAD`) do. For the
    /// others a query key would race the body for the same field, so the
    /// query phase is left out.
    ///
    /// # Examples
    ///
    /// ```
    /// use request_binder::HttpMethod;
    ///
    /// assert!(HttpMethod::Get.binds_query_params());
    /// assert!(!HttpMethod::Post.binds_query_params());
    /// ```
    pub fn binds_query_params(self) -> bool {
        matches!(self, HttpMethod::Get | HttpMethod::Delete | HttpMethod::Head)
    }

    /// Canonical upper-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Connect => "CONNECT",
            HttpMethod::Trace => "TRACE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing an unknown method token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown HTTP method {0:?}")]
pub struct UnknownMethod(pub String);

impl FromStr for HttpMethod {
    type Err = UnknownMethod;

    /// Parses a method token. Methods are case-sensitive.
    fn from_str(token: &str) -> Result<Self, Self::Err> {
        Ok(match token {
            "GET" => HttpMethod::Get,
            "HEAD" => HttpMethod::Head,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "PATCH" => HttpMethod::Patch,
            "DELETE" => HttpMethod::Delete,
            "OPTIONS" => HttpMethod::Options,
            "CONNECT" => HttpMethod::Connect,
            "TRACE" => HttpMethod::Trace,
            other => return Err(UnknownMethod(other.to_string())),
        })
    }
}
