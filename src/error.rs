use std::fmt;

use thiserror::Error;

use crate::binder::Phase;
use crate::coerce::ConversionError;

/// Boxed cause carried by decoder and deserializer failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by the binder.
#[derive(Debug, Error)]
pub enum Error {
    /// The request body's media type has no decoder.
    #[error("unsupported media type {media_type:?}")]
    UnsupportedMediaType {
        /// Normalized media type as received.
        media_type: String,
    },
    /// A binding phase failed on client-supplied data.
    #[error("{phase} binding failed: {failure}")]
    BadRequest {
        /// Phase that failed.
        phase: Phase,
        /// What went wrong.
        #[source]
        failure: Failure,
    },
}

impl Error {
    pub(crate) fn bad_request(phase: Phase, failure: impl Into<Failure>) -> Self {
        Self::BadRequest {
            phase,
            failure: failure.into(),
        }
    }

    /// HTTP status code for a response reporting this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use request_binder::Error;
    ///
    /// let err = Error::UnsupportedMediaType { media_type: "text/csv".into() };
    /// assert_eq!(err.status(), 415);
    /// ```
    pub fn status(&self) -> u16 {
        match self {
            Self::UnsupportedMediaType { .. } => 415,
            Self::BadRequest { .. } => 400,
        }
    }

    /// Phase that failed, if the error came from one.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::UnsupportedMediaType { .. } => Some(Phase::Body),
            Self::BadRequest { phase, .. } => Some(*phase),
        }
    }

    /// Underlying failure of a bad request.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::UnsupportedMediaType { .. } => None,
            Self::BadRequest { failure, .. } => Some(failure),
        }
    }
}

/// Why a phase could not bind.
#[derive(Debug, Error)]
pub enum Failure {
    /// The body could not be decoded.
    #[error(transparent)]
    MalformedBody(#[from] MalformedBody),
    /// The destination cannot receive form data.
    #[error("invalid destination: {reason}")]
    InvalidDestination {
        /// Description of the problem.
        reason: String,
    },
    /// A field's declaration cannot be mapped unambiguously.
    #[error("ambiguous mapping for field {field}: {reason}")]
    AmbiguousMapping {
        /// Rust field name.
        field: &'static str,
        /// Description of the problem.
        reason: &'static str,
    },
    /// A supplied value did not convert into its field's type.
    #[error("invalid value for {field:?}: {source}")]
    Conversion {
        /// External name the value was supplied under.
        field: String,
        /// Conversion error.
        #[source]
        source: ConversionError,
    },
}

/// A request body that did not decode.
#[derive(Debug)]
pub struct MalformedBody {
    /// Body format being decoded.
    pub format: BodyFormat,
    /// Whether the document was unreadable or just the wrong shape.
    pub kind: MalformedKind,
    /// Position of the failure, when the decoder reports one.
    pub position: Option<Position>,
    source: BoxError,
}

impl MalformedBody {
    /// Creates a malformed body error from its cause.
    pub fn new(format: BodyFormat, kind: MalformedKind, source: impl Into<BoxError>) -> Self {
        Self {
            format,
            kind,
            position: None,
            source: source.into(),
        }
    }

    /// Attaches the position of the failure.
    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.position = Some(Position { line, column });
        self
    }
}

impl fmt::Display for MalformedBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed {} body ({})", self.format, self.kind)?;
        if let Some(position) = self.position {
            write!(f, " at {}", position)?;
        }
        write!(f, ": {}", self.source)
    }
}

impl std::error::Error for MalformedBody {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Body format named in a [`MalformedBody`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    /// `application/json`
    Json,
    /// `application/xml` or `text/xml`
    Xml,
    /// `application/x-www-form-urlencoded`
    Form,
    /// `multipart/form-data`
    Multipart,
}

impl fmt::Display for BodyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyFormat::Json => write!(f, "JSON"),
            BodyFormat::Xml => write!(f, "XML"),
            BodyFormat::Form => write!(f, "form"),
            BodyFormat::Multipart => write!(f, "multipart"),
        }
    }
}

/// Sub-kind of a [`MalformedBody`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedKind {
    /// The document is not well-formed.
    Syntax,
    /// The document is well-formed but does not fit the destination.
    Structure,
}

impl fmt::Display for MalformedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedKind::Syntax => write!(f, "syntax error"),
            MalformedKind::Structure => write!(f, "type mismatch"),
        }
    }
}

/// Line and column in a body, both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Line number.
    pub line: usize,
    /// Column number.
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn status_codes() {
        let unsupported = Error::UnsupportedMediaType {
            media_type: "text/csv".to_string(),
        };
        let bad = Error::bad_request(
            Phase::Query,
            Failure::InvalidDestination {
                reason: "x".to_string(),
            },
        );

        assert_eq!(unsupported.status(), 415);
        assert_eq!(bad.status(), 400);
        assert_eq!(bad.phase(), Some(Phase::Query));
        assert!(unsupported.failure().is_none());
    }

    #[test]
    fn malformed_body_display_includes_position() {
        let body = MalformedBody::new(BodyFormat::Json, MalformedKind::Syntax, "expected value")
            .at(3, 14);

        assert_eq!(
            body.to_string(),
            "malformed JSON body (syntax error) at line 3, column 14: expected value"
        );
    }

    #[test]
    fn cause_chain_is_preserved() {
        let err = Error::bad_request(
            Phase::Body,
            MalformedBody::new(BodyFormat::Xml, MalformedKind::Structure, "missing field `id`"),
        );

        let failure = err.source().expect("failure is the source");
        let cause = failure.source().expect("decoder error is preserved");
        assert_eq!(cause.to_string(), "missing field `id`");
    }

    #[test]
    fn conversion_failure_names_the_external_field() {
        let source = crate::coerce::parse_bool("maybe").unwrap_err();
        let err = Error::bad_request(
            Phase::Path,
            Failure::Conversion {
                field: "active".to_string(),
                source,
            },
        );

        let message = err.to_string();
        assert!(message.starts_with("path binding failed"));
        assert!(message.contains("\"active\""));
    }
}
