//! HTTP-facing error type and its mapping from [`sepex_core::Error`].
//!
//! `sepex-core`'s [`ErrorKind`](sepex_core::ErrorKind) is transport-agnostic;
//! this module is the one place that decides what HTTP status code and body
//! a caller actually sees. Only the kinds the [`Dispatcher`](sepex_core::Dispatcher)
//! can return synchronously (`Validation`, `Admission`, `InternalInvariantViolation`)
//! have a direct mapping — `Backend`, `Execution`, `DismissedDuringExecution`, and
//! `Auxiliary` only ever occur inside a job's own lifecycle and are reflected
//! back to callers as a job status, never as a request failure.

use std::borrow::Cow;
use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// The error type returned by `sepex-server` handlers.
#[derive(Clone)]
#[must_use = "errors do nothing unless serialized"]
pub struct Error<'a> {
    kind: ErrorKind,
    message: Option<Cow<'a, str>>,
    resource: Option<Cow<'a, str>>,
}

impl Error<'static> {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            resource: None,
        }
    }
}

impl<'a> Error<'a> {
    #[inline]
    pub fn with_message(self, message: impl Into<Cow<'a, str>>) -> Self {
        Self {
            message: Some(message.into()),
            ..self
        }
    }

    #[inline]
    pub fn with_resource(self, resource: impl Into<Cow<'a, str>>) -> Self {
        Self {
            resource: Some(resource.into()),
            ..self
        }
    }

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Debug for Error<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("resource", &self.resource)
            .finish()
    }
}

impl fmt::Display for Error<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.kind.status_code())?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error<'_> {}

impl From<ErrorKind> for Error<'static> {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// Maps a scheduling-core error onto its HTTP representation.
///
/// `Backend`/`Execution`/`DismissedDuringExecution`/`Auxiliary` cannot reach
/// this path from a well-formed handler (they only ever arise after a job has
/// been admitted, inside `job::run`), but a catch-all to 500 is kept so a
/// future caller of `sepex_core::Dispatcher` that surfaces one some other way
/// still gets a response instead of a panic.
impl From<sepex_core::Error> for Error<'static> {
    fn from(err: sepex_core::Error) -> Self {
        let kind = match err.kind() {
            sepex_core::ErrorKind::Validation => ErrorKind::BadRequest,
            sepex_core::ErrorKind::Admission => ErrorKind::TooManyRequests,
            sepex_core::ErrorKind::InternalInvariantViolation => ErrorKind::InternalServerError,
            sepex_core::ErrorKind::Backend
            | sepex_core::ErrorKind::Execution
            | sepex_core::ErrorKind::DismissedDuringExecution
            | sepex_core::ErrorKind::Auxiliary => ErrorKind::InternalServerError,
        };
        Self::new(kind).with_message(err.message().to_owned())
    }
}

/// A specialized [`Result`] type for HTTP operations.
pub type Result<T, E = Error<'static>> = std::result::Result<T, E>;

/// HTTP error kinds `sepex-server` may return.
#[must_use = "error kinds do nothing unless used to create errors"]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 400 Bad Request - invalid process spec, inputs, or request body.
    BadRequest,
    /// 404 Not Found - unknown process id or job id.
    NotFound,
    /// 409 Conflict - dismiss requested for an already-terminal job.
    Conflict,
    /// 429 Too Many Requests - sync execution rejected by admission control.
    TooManyRequests,
    /// 503 Service Unavailable - a required collaborator (storage, remote batch) is down.
    ServiceUnavailable,
    /// 500 Internal Server Error - an invariant was violated or an unexpected failure occurred.
    #[default]
    InternalServerError,
}

impl ErrorKind {
    pub fn into_error(self) -> Error<'static> {
        Error::new(self)
    }

    pub fn with_message<'a>(self, message: impl Into<Cow<'a, str>>) -> Error<'a> {
        Error::new(self).with_message(message)
    }

    pub fn with_resource<'a>(self, resource: impl Into<Cow<'a, str>>) -> Error<'a> {
        Error::new(self).with_resource(resource)
    }

    pub fn status_code(self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::BadRequest => "bad_request",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::TooManyRequests => "too_many_requests",
            Self::ServiceUnavailable => "service_unavailable",
            Self::InternalServerError => "internal_server_error",
        }
    }

    fn default_message(self) -> &'static str {
        match self {
            Self::BadRequest => "the request could not be processed due to invalid data",
            Self::NotFound => "the requested resource was not found",
            Self::Conflict => "the request conflicts with the current state of the resource",
            Self::TooManyRequests => "insufficient capacity to admit this request right now",
            Self::ServiceUnavailable => "a required backend service is currently unavailable",
            Self::InternalServerError => "an internal server error occurred",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The JSON body returned for every error response.
#[derive(Debug, Clone, Serialize, schemars::JsonSchema)]
pub struct ErrorBody {
    pub name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
}

impl IntoResponse for Error<'_> {
    fn into_response(self) -> Response {
        let status = self.kind.status_code();
        let body = ErrorBody {
            name: self.kind.name().to_owned(),
            message: self
                .message
                .map(Cow::into_owned)
                .unwrap_or_else(|| self.kind.default_message().to_owned()),
            resource: self.resource.map(Cow::into_owned),
        };
        (status, axum::Json(body)).into_response()
    }
}

impl IntoResponse for ErrorKind {
    fn into_response(self) -> Response {
        Error::new(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let core_err = sepex_core::Error::validation("bad input");
        let err: Error<'static> = core_err.into();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(err.kind().status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn admission_maps_to_too_many_requests() {
        let core_err = sepex_core::Error::admission("no capacity");
        let err: Error<'static> = core_err.into();
        assert_eq!(err.kind(), ErrorKind::TooManyRequests);
    }

    #[test]
    fn invariant_violation_maps_to_internal_server_error() {
        let core_err = sepex_core::Error::invariant("duplicate id");
        let err: Error<'static> = core_err.into();
        assert_eq!(err.kind(), ErrorKind::InternalServerError);
    }

    #[test]
    fn default_message_used_when_none_set() {
        let err = ErrorKind::NotFound.into_error();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
