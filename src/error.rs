use thiserror::Error;

use crate::context::ContextError;
use crate::decode::DecodeError;
use crate::response::Response;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorCode {
    MissingDeadline,
    MissingDependency,
    ExecutorInit,
    Executor,
    Cancelled,
    Decode,
    InvalidUri,
    InvalidHeaderName,
    InvalidHeaderValue,
    SerializeForm,
    UnknownDecoder,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingDeadline => "missing_deadline",
            Self::MissingDependency => "missing_dependency",
            Self::ExecutorInit => "executor_init",
            Self::Executor => "executor",
            Self::Cancelled => "cancelled",
            Self::Decode => "decode",
            Self::InvalidUri => "invalid_uri",
            Self::InvalidHeaderName => "invalid_header_name",
            Self::InvalidHeaderValue => "invalid_header_value",
            Self::SerializeForm => "serialize_form",
            Self::UnknownDecoder => "unknown_decoder",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("request context is missing a deadline")]
    MissingDeadline,
    #[error("client dependency is not configured: {dependency}")]
    MissingDependency { dependency: &'static str },
    #[error("failed to initialize default executor: {source}")]
    ExecutorInit {
        #[source]
        source: BoxError,
    },
    #[error(
        "request failed after {attempts} attempt(s){}: {source}",
        interrupted_suffix(.interrupted)
    )]
    Executor {
        attempts: u32,
        #[source]
        source: BoxError,
        interrupted: Option<ContextError>,
    },
    #[error("request context {cause} before the request was attempted")]
    Cancelled { cause: ContextError },
    #[error("failed to decode response body: {source}")]
    Decode {
        #[source]
        source: DecodeError,
        response: Box<Response>,
    },
    #[error("invalid request uri: {uri}")]
    InvalidUri { uri: String },
    #[error("invalid header name {name}: {source}")]
    InvalidHeaderName {
        name: String,
        #[source]
        source: http::header::InvalidHeaderName,
    },
    #[error("invalid header value for {name}: {source}")]
    InvalidHeaderValue {
        name: String,
        #[source]
        source: http::header::InvalidHeaderValue,
    },
    #[error("failed to serialize request form: {source}")]
    SerializeForm {
        #[source]
        source: serde_urlencoded::ser::Error,
    },
    #[error("unknown body decoder: {name}")]
    UnknownDecoder { name: String },
}

fn interrupted_suffix(interrupted: &Option<ContextError>) -> String {
    match interrupted {
        Some(cause) => format!(" (retry wait interrupted: context {cause})"),
        None => String::new(),
    }
}

impl Error {
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::MissingDeadline => ErrorCode::MissingDeadline,
            Self::MissingDependency { .. } => ErrorCode::MissingDependency,
            Self::ExecutorInit { .. } => ErrorCode::ExecutorInit,
            Self::Executor { .. } => ErrorCode::Executor,
            Self::Cancelled { .. } => ErrorCode::Cancelled,
            Self::Decode { .. } => ErrorCode::Decode,
            Self::InvalidUri { .. } => ErrorCode::InvalidUri,
            Self::InvalidHeaderName { .. } => ErrorCode::InvalidHeaderName,
            Self::InvalidHeaderValue { .. } => ErrorCode::InvalidHeaderValue,
            Self::SerializeForm { .. } => ErrorCode::SerializeForm,
            Self::UnknownDecoder { .. } => ErrorCode::UnknownDecoder,
        }
    }

    /// The context condition that ended the retry loop, if any.
    ///
    /// Set for [`Error::Cancelled`] and for an [`Error::Executor`] whose backoff
    /// wait was cut short by the request context.
    pub fn context_error(&self) -> Option<ContextError> {
        match self {
            Self::Cancelled { cause, .. } => Some(*cause),
            Self::Executor { interrupted, .. } => *interrupted,
            _ => None,
        }
    }

    /// Number of executor attempts made before the error surfaced.
    ///
    /// Precondition, cancellation and request-construction errors report `0`;
    /// decode errors follow a successful attempt and are not counted here.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Executor { attempts, .. } => *attempts,
            _ => 0,
        }
    }

    /// The response kept alongside a decode failure.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Decode { response, .. } => Some(response),
            _ => None,
        }
    }

    pub fn into_response(self) -> Option<Response> {
        match self {
            Self::Decode { response, .. } => Some(*response),
            _ => None,
        }
    }
}
