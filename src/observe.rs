use std::sync::Arc;
use std::time::Duration;

use http::{Method, StatusCode};

use crate::error::BoxError;

/// Where a request stands inside its retry loop.
#[derive(Clone, Debug)]
pub struct AttemptContext {
    method: Method,
    uri: String,
    attempt: u32,
    max_attempts: u32,
}

impl AttemptContext {
    pub(crate) fn new(method: Method, uri: String, attempt: u32, max_attempts: u32) -> Self {
        Self {
            method,
            uri,
            attempt,
            max_attempts,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request URI with credentials, query and fragment stripped.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// 1-based index of the attempt.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

/// Hook for watching the retry loop from outside.
///
/// Callbacks run inline on the request's task and must not block.
pub trait RetryObserver: Send + Sync {
    fn on_attempt_start(&self, _context: &AttemptContext) {}

    /// A failed attempt will be retried after `delay`.
    fn on_retry_scheduled(&self, _context: &AttemptContext, _delay: Duration, _error: &BoxError) {}

    /// The attempt succeeded; `read` says whether the gate let the body be consumed.
    fn on_response(&self, _context: &AttemptContext, _status: StatusCode, _read: bool) {}
}

impl<O> RetryObserver for Arc<O>
where
    O: RetryObserver + ?Sized,
{
    fn on_attempt_start(&self, context: &AttemptContext) {
        (**self).on_attempt_start(context);
    }

    fn on_retry_scheduled(&self, context: &AttemptContext, delay: Duration, error: &BoxError) {
        (**self).on_retry_scheduled(context, delay, error);
    }

    fn on_response(&self, context: &AttemptContext, status: StatusCode, read: bool) {
        (**self).on_response(context, status, read);
    }
}

#[derive(Debug, Default)]
pub struct NoopObserver;

impl RetryObserver for NoopObserver {}
