//! Error types of the binding pipeline.
//!
//! Every failure that reaches the client is first normalized into an [`HttpError`], the
//! status-bearing envelope. It serializes as a projection of its message only, e.g.
//! `{"message":"Bad Request"}` in JSON and `<error><message>Bad Request</message></error>`
//! in XML.
//!
//! - [`StatusError`]: the standard status-backed error kinds
//! - [`HttpError`]: the envelope, built with [`error`]
//! - [`ConversionError`]: a request value that could not be converted into its field
//! - [`BindError`]: a request shape that could not be compiled into binders

use crate::binder::Tag;
use crate::response::StatusCoder;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::convert::Infallible;
use std::error::Error;
use std::fmt;
use thiserror::Error;

/// The type-erased error handlers and codecs report.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Standard HTTP status errors, each using the canonical reason phrase as its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusError {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    NotAcceptable,
    UnsupportedMediaType,
    InternalServerError,
}

impl StatusError {
    pub fn status(self) -> StatusCode {
        match self {
            StatusError::BadRequest => StatusCode::BAD_REQUEST,
            StatusError::Unauthorized => StatusCode::UNAUTHORIZED,
            StatusError::Forbidden => StatusCode::FORBIDDEN,
            StatusError::NotFound => StatusCode::NOT_FOUND,
            StatusError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            StatusError::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            StatusError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            StatusError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(self) -> &'static str {
        self.status().canonical_reason().unwrap_or("Unknown Error")
    }
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl Error for StatusError {}

impl StatusCoder for StatusError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }
}

impl Serialize for StatusError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_message(serializer, self.message())
    }
}

/// The error envelope: an underlying error plus the status and headers it is answered with.
///
/// Wrapping is idempotent, [`error`] hands back an existing `HttpError` untouched, and an
/// envelope around a [`StatusError`] always reports that error's own status.
pub struct HttpError {
    inner: BoxError,
    code: Option<StatusCode>,
    headers: HeaderMap,
}

/// Wraps `err` with a status code.
///
/// Returns `err` itself when it already is an [`HttpError`], so wrapping never overrides a
/// status that is already set. A `None` code reports `500 Internal Server Error`.
///
/// # Example
/// ```
/// use http::StatusCode;
/// use micro_bind::{error, StatusError};
///
/// let inner = error(std::io::Error::other("boom"), StatusCode::BAD_REQUEST);
/// assert_eq!(error(inner, StatusCode::INTERNAL_SERVER_ERROR).status_code(), StatusCode::BAD_REQUEST);
///
/// assert_eq!(error(StatusError::NotFound, None).status_code(), StatusCode::NOT_FOUND);
/// assert_eq!(error(std::io::Error::other("boom"), None).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
/// ```
pub fn error<E: Into<BoxError>>(err: E, code: impl Into<Option<StatusCode>>) -> HttpError {
    HttpError::new(err, code)
}

impl HttpError {
    pub fn new<E: Into<BoxError>>(err: E, code: impl Into<Option<StatusCode>>) -> Self {
        match err.into().downcast::<HttpError>() {
            Ok(envelope) => *envelope,
            Err(inner) => Self { inner, code: code.into(), headers: HeaderMap::new() },
        }
    }

    /// The status this error is answered with.
    pub fn status_code(&self) -> StatusCode {
        if let Some(status_error) = self.inner.downcast_ref::<StatusError>() {
            return status_error.status();
        }
        self.code.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Whether a status was chosen for this error, rather than the `500` fallback.
    pub fn has_status(&self) -> bool {
        self.code.is_some() || self.inner.is::<StatusError>()
    }

    /// Adds a header sent along with the error response.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The only part of the error that is ever written to the client.
    pub fn message(&self) -> String {
        self.inner.to_string()
    }

    pub fn get_ref(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.inner.as_ref()
    }

    pub fn into_inner(self) -> BoxError {
        self.inner
    }
}

impl fmt::Debug for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpError")
            .field("status", &self.status_code())
            .field("inner", &self.inner)
            .field("headers", &self.headers)
            .finish()
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl Error for HttpError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.inner.as_ref())
    }
}

impl Serialize for HttpError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_message(serializer, &self.message())
    }
}

/// Errors that know their own status, such as [`StatusError`] or an application error
/// implementing [`StatusCoder`], keep that status in the envelope.
impl<E> From<E> for HttpError
where
    E: Error + StatusCoder + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        let code = err.status_code();
        HttpError::new(err, code)
    }
}

/// Type-erased errors keep the envelope they may carry, otherwise they have no status yet.
impl From<BoxError> for HttpError {
    fn from(err: BoxError) -> Self {
        HttpError::new(err, None)
    }
}

impl From<std::io::Error> for HttpError {
    fn from(err: std::io::Error) -> Self {
        HttpError::new(err, None)
    }
}

impl From<Infallible> for HttpError {
    fn from(err: Infallible) -> Self {
        match err {}
    }
}

fn serialize_message<S: Serializer>(serializer: S, message: &str) -> Result<S::Ok, S::Error> {
    let mut state = serializer.serialize_struct("error", 1)?;
    state.serialize_field("message", message)?;
    state.end()
}

/// A raw source value that could not be parsed into the target type.
#[derive(Debug, Clone, Error)]
#[error("invalid value `{value}`: {reason}")]
pub struct ValueError {
    value: String,
    reason: String,
}

impl ValueError {
    pub fn new<S: ToString>(value: impl Into<String>, reason: S) -> Self {
        Self { value: value.into(), reason: reason.to_string() }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// A present request value that does not fit the field it is bound to.
#[derive(Debug, Clone, Error)]
#[error("cannot bind {tag} `{key}` into field `{field}`: {cause}")]
pub struct ConversionError {
    field: String,
    tag: Tag,
    key: String,
    cause: ValueError,
}

impl StatusCoder for ConversionError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

impl ConversionError {
    pub(crate) fn new(field: impl Into<String>, tag: Tag, key: impl Into<String>, cause: ValueError) -> Self {
        Self { field: field.into(), tag, key: key.into(), cause }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        self.cause.value()
    }
}

/// Raised while compiling a request shape into its binders.
#[derive(Debug, Clone, Error)]
pub enum BindError {
    #[error("field `{field}` declares more than one {tag} binding")]
    DuplicateTag { field: String, tag: Tag },

    #[error("field `{field}` declares an empty {tag} key")]
    EmptyKey { field: String, tag: Tag },

    #[error("field `{field}` refers to unknown request attribute `{key}`")]
    UnknownRequestKey { field: String, key: String },

    #[error("default of field `{field}` is invalid: {source}")]
    InvalidDefault {
        field: String,
        #[source]
        source: ConversionError,
    },
}
