//! Error types and result definitions for BigQuery ingestion.
//!
//! Every failure surfaced by this crate is a [`BqError`]. Errors produced from a server
//! error payload keep that payload, the sibling errors that accompanied it and the job
//! they pertain to, so callers can inspect them after classification.

use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use crate::model::{ErrorPayload, JobRef};

/// Convenient result type for BigQuery operations using [`BqError`] as the error type.
pub type BqResult<T> = Result<T, BqError>;

/// Categories of errors reported by the BigQuery client.
///
/// The first group is produced by [`crate::classify::classify`] from a server error
/// payload, the remaining ones are raised directly by the transport or by the client.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Server reported errors
    Authorization,
    NotFound,
    Duplicate,
    AccessDenied,
    TermsOfServiceNotAccepted,
    InvalidQuery,
    Backend,
    Service,
    Interface,

    // Transport errors
    Communication,

    // Streaming insert errors
    StreamingRowTooLarge,

    // Client errors
    Client,
    Configuration,
    Schema,
}

impl ErrorKind {
    /// Returns `true` for access denials, including terms of service not being accepted.
    pub fn is_access_denied(self) -> bool {
        matches!(
            self,
            ErrorKind::AccessDenied | ErrorKind::TermsOfServiceNotAccepted
        )
    }

    /// Returns `true` when the condition is transient on the server side.
    ///
    /// The client never retries these itself.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Backend)
    }
}

/// Server error payload kept by service errors for caller inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceErrorDetail {
    /// The primary error entry the error was classified from.
    pub error: ErrorPayload,
    /// All error entries reported alongside the primary one, unchanged.
    pub error_list: Vec<ErrorPayload>,
    /// The job the error pertains to, if any.
    pub job_ref: Option<JobRef>,
}

/// Diagnostic context attached to an error depending on where it came from.
#[derive(Debug, Clone, PartialEq)]
enum ErrorContext {
    None,
    Service(Box<ServiceErrorDetail>),
    Http { status: Option<u16>, body: String },
    ServerError(String),
}

/// Main error type for BigQuery operations.
#[derive(Debug, Clone)]
pub struct BqError {
    kind: ErrorKind,
    message: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    context: ErrorContext,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
}

impl BqError {
    /// Creates a service error carrying the server payload it was classified from.
    #[track_caller]
    pub(crate) fn service(
        kind: ErrorKind,
        message: String,
        error: ErrorPayload,
        error_list: Vec<ErrorPayload>,
        job_ref: Option<JobRef>,
    ) -> Self {
        let detail = ServiceErrorDetail {
            error,
            error_list,
            job_ref,
        };

        Self::from_components(
            kind,
            Cow::Owned(message),
            None,
            ErrorContext::Service(Box::new(detail)),
        )
    }

    /// Creates an authorization error, which keeps no server payload.
    #[track_caller]
    pub(crate) fn authorization(message: String) -> Self {
        Self::from_components(
            ErrorKind::Authorization,
            Cow::Owned(message),
            None,
            ErrorContext::None,
        )
    }

    /// Creates an error for a server response that is missing required fields.
    #[track_caller]
    pub(crate) fn interface(message: String, server_error: String) -> Self {
        Self::from_components(
            ErrorKind::Interface,
            Cow::Owned(message),
            None,
            ErrorContext::ServerError(server_error),
        )
    }

    /// Creates a [`ErrorKind::Communication`] error for a transport failure whose body
    /// could not be interpreted as a BigQuery error.
    ///
    /// The HTTP status and the body are kept verbatim.
    #[track_caller]
    pub fn communication(status: Option<u16>, body: impl Into<String>) -> Self {
        let body = body.into();
        let rendered_status = status
            .map(|status| status.to_string())
            .unwrap_or_else(|| "(unexpected)".to_string());
        let message = format!(
            "Could not connect with BigQuery server.\nHttp response status: {rendered_status}\nHttp response content:\n{body}"
        );

        Self::from_components(
            ErrorKind::Communication,
            Cow::Owned(message),
            None,
            ErrorContext::Http { status, body },
        )
    }

    /// Returns the [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the human-readable message of this error.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the additional detail attached to this error, if any.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Returns the server payload kept by service errors.
    pub fn service_detail(&self) -> Option<&ServiceErrorDetail> {
        match &self.context {
            ErrorContext::Service(detail) => Some(detail),
            _ => None,
        }
    }

    /// Returns the primary server error entry for service errors.
    pub fn error(&self) -> Option<&ErrorPayload> {
        self.service_detail().map(|detail| &detail.error)
    }

    /// Returns the error entries reported alongside the primary one.
    ///
    /// Empty for errors that were not classified from a server payload.
    pub fn error_list(&self) -> &[ErrorPayload] {
        self.service_detail()
            .map(|detail| detail.error_list.as_slice())
            .unwrap_or_default()
    }

    /// Returns the job this error pertains to, if any.
    pub fn job_ref(&self) -> Option<&JobRef> {
        self.service_detail()
            .and_then(|detail| detail.job_ref.as_ref())
    }

    /// Returns the HTTP status of a communication error.
    pub fn http_status(&self) -> Option<u16> {
        match &self.context {
            ErrorContext::Http { status, .. } => *status,
            _ => None,
        }
    }

    /// Returns the raw HTTP body of a communication error.
    pub fn http_body(&self) -> Option<&str> {
        match &self.context {
            ErrorContext::Http { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Returns the raw server error attached to interface errors.
    pub fn server_error(&self) -> Option<&str> {
        match &self.context {
            ErrorContext::ServerError(server_error) => Some(server_error),
            _ => None,
        }
    }

    /// Returns `true` when the caller may retry the failed operation.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// Attaches an originating [`error::Error`] to this error and returns the modified instance.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    /// Creates a [`BqError`] from its components.
    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        message: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        context: ErrorContext,
    ) -> Self {
        BqError {
            kind,
            message,
            detail,
            context,
            source: None,
            location: Location::caller(),
        }
    }
}

impl PartialEq for BqError {
    /// Compares the observable content of two errors, ignoring the callsite and source.
    fn eq(&self, other: &BqError) -> bool {
        self.kind == other.kind
            && self.message == other.message
            && self.detail == other.detail
            && self.context == other.context
    }
}

impl fmt::Display for BqError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = self.location;
        write!(
            f,
            "[{:?}] {} @ {}:{}:{}",
            self.kind,
            self.message,
            location.file(),
            location.line(),
            location.column()
        )?;

        if let Some(detail) = self.detail.as_deref() {
            write!(f, "\n  Detail:")?;
            for line in detail.lines() {
                if line.trim().is_empty() {
                    write!(f, "\n    ")?;
                } else {
                    write!(f, "\n    {line}")?;
                }
            }
        }

        Ok(())
    }
}

impl error::Error for BqError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| source as &(dyn error::Error + 'static))
    }
}

/// Creates a [`BqError`] from an error kind and static message.
impl From<(ErrorKind, &'static str)> for BqError {
    #[track_caller]
    fn from((kind, message): (ErrorKind, &'static str)) -> BqError {
        BqError::from_components(kind, Cow::Borrowed(message), None, ErrorContext::None)
    }
}

/// Creates a [`BqError`] from an error kind, static message and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for BqError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, message, detail): (ErrorKind, &'static str, D)) -> BqError {
        BqError::from_components(
            kind,
            Cow::Borrowed(message),
            Some(detail.into()),
            ErrorContext::None,
        )
    }
}

/// Converts [`std::io::Error`] to [`BqError`] with [`ErrorKind::Configuration`].
///
/// I/O only happens while reading client configuration such as service account keys.
impl From<std::io::Error> for BqError {
    #[track_caller]
    fn from(err: std::io::Error) -> BqError {
        let detail = err.to_string();
        BqError::from((ErrorKind::Configuration, "I/O operation failed", detail)).with_source(err)
    }
}

/// Converts [`serde_json::Error`] to [`BqError`] with [`ErrorKind::Client`].
impl From<serde_json::Error> for BqError {
    #[track_caller]
    fn from(err: serde_json::Error) -> BqError {
        let message = match err.classify() {
            serde_json::error::Category::Io => "JSON I/O operation failed",
            serde_json::error::Category::Syntax
            | serde_json::error::Category::Data
            | serde_json::error::Category::Eof => "JSON deserialization failed",
        };

        let detail = err.to_string();
        BqError::from((ErrorKind::Client, message, detail)).with_source(err)
    }
}
