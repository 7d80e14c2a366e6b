use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::{Instrument, Span, debug, info_span, warn};

use crate::Result;
use crate::backoff::{BackoffStrategy, ConstantBackoff};
use crate::context::{Context, ContextError};
use crate::decode::{BodyDecoder, DecodeError};
use crate::error::{BoxError, Error};
use crate::executor::RequestExecutor;
use crate::gate::ResponseGate;
use crate::metrics::ClientMetrics;
use crate::observe::{AttemptContext, RetryObserver};
use crate::request::{Request, ensure_deadline};
use crate::response::{ReadBodyError, Response};
use crate::util::redact_uri_for_logs;

/// How many times a failed attempt is repeated and how long to wait between.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff: Arc<dyn BackoffStrategy>,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Arc<dyn BackoffStrategy>) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self::new(0, Arc::new(ConstantBackoff::zero()))
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn backoff(&self) -> &dyn BackoffStrategy {
        self.backoff.as_ref()
    }

    pub(crate) fn shared_backoff(&self) -> Arc<dyn BackoffStrategy> {
        Arc::clone(&self.backoff)
    }

    pub(crate) fn delay_for_retry(&self, retry_num: u32) -> Duration {
        self.backoff.interval_for_retry(retry_num)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Everything a client resolved at build time, shared by all of its clones.
pub(crate) struct RetryOrchestrator<D> {
    pub(crate) client_name: String,
    pub(crate) executor: Arc<dyn RequestExecutor>,
    pub(crate) policy: RetryPolicy,
    pub(crate) gate: Arc<dyn ResponseGate>,
    pub(crate) decoder: Option<D>,
    pub(crate) max_response_body_bytes: usize,
    pub(crate) metrics: ClientMetrics,
    pub(crate) observer: Arc<dyn RetryObserver>,
}

impl<D> RetryOrchestrator<D>
where
    D: BodyDecoder,
{
    pub(crate) async fn execute<T>(
        &self,
        request: &Request,
        target: Option<&mut T>,
    ) -> Result<Response>
    where
        T: DeserializeOwned,
    {
        self.metrics.record_request_started();
        let _in_flight = self.metrics.enter_in_flight();
        let result = self.run(request, target).await;
        match &result {
            Ok(_) => self.metrics.record_request_succeeded(),
            Err(error) => self.metrics.record_request_failed(error),
        }
        result
    }

    async fn run<T>(&self, request: &Request, mut target: Option<&mut T>) -> Result<Response>
    where
        T: DeserializeOwned,
    {
        ensure_deadline(request.context())?;

        let max_attempts = self.policy.max_attempts();
        let redacted_uri = redact_uri_for_logs(&request.uri().to_string());
        let mut retries = 0_u32;
        let mut delay = Duration::ZERO;
        let mut last_error: Option<BoxError> = None;

        loop {
            if let Err(cause) = wait_for_retry(request.context(), delay).await {
                return Err(match last_error {
                    Some(source) => Error::Executor {
                        attempts: retries,
                        source,
                        interrupted: Some(cause),
                    },
                    None => Error::Cancelled { cause },
                });
            }

            let attempt = retries + 1;
            let span = info_span!(
                "reqloop.request",
                client = %self.client_name,
                method = %request.method(),
                uri = %redacted_uri,
                attempt = attempt,
                max_attempts = max_attempts
            );
            let attempt_context = AttemptContext::new(
                request.method().clone(),
                redacted_uri.clone(),
                attempt,
                max_attempts,
            );
            self.observer.on_attempt_start(&attempt_context);
            self.metrics.record_attempt();
            span.in_scope(|| debug!("sending request"));

            match self.executor.execute(request).instrument(span.clone()).await {
                Ok(response) => {
                    return self
                        .read_response(response, target.take(), &attempt_context, &span)
                        .await;
                }
                Err(error) => {
                    retries += 1;
                    if retries > self.policy.max_retries() {
                        span.in_scope(|| warn!(error = %error, "request failed, no retries left"));
                        return Err(Error::Executor {
                            attempts: retries,
                            source: error,
                            interrupted: None,
                        });
                    }

                    delay = self.policy.delay_for_retry(retries);
                    span.in_scope(|| {
                        warn!(
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            error = %error,
                            "retrying request after executor error"
                        )
                    });
                    self.metrics.record_retry();
                    self.observer
                        .on_retry_scheduled(&attempt_context, delay, &error);
                    last_error = Some(error);
                }
            }
        }
    }

    async fn read_response<T>(
        &self,
        mut response: Response,
        target: Option<&mut T>,
        attempt_context: &AttemptContext,
        span: &Span,
    ) -> Result<Response>
    where
        T: DeserializeOwned,
    {
        let status = response.status();
        if !self.gate.should_read(Some(&response)) {
            self.metrics.record_unread_response();
            self.observer.on_response(attempt_context, status, false);
            span.in_scope(|| debug!(status = status.as_u16(), "returning response unread"));
            return Ok(response);
        }
        self.observer.on_response(attempt_context, status, true);

        let Some(decoder) = &self.decoder else {
            response.close_body();
            span.in_scope(|| debug!(status = status.as_u16(), "request completed"));
            return Ok(response);
        };

        let source = match response.take_body() {
            Some(body) => match body.read_all_limited(self.max_response_body_bytes).await {
                Ok(bytes) => Some(bytes),
                Err(ReadBodyError::Read(source)) => {
                    return Err(decode_failure(DecodeError::Read(source), response));
                }
                Err(ReadBodyError::TooLarge { actual_bytes }) => {
                    let source = DecodeError::TooLarge {
                        limit_bytes: self.max_response_body_bytes,
                        actual_bytes,
                    };
                    return Err(decode_failure(source, response));
                }
            },
            None => None,
        };

        match decoder.decode(source.as_deref(), target) {
            Ok(()) => {
                span.in_scope(|| debug!(status = status.as_u16(), "request completed"));
                Ok(response)
            }
            Err(source) => {
                span.in_scope(|| warn!(error = %source, "failed to decode response body"));
                Err(decode_failure(source, response))
            }
        }
    }
}

fn decode_failure(source: DecodeError, response: Response) -> Error {
    Error::Decode {
        source,
        response: Box::new(response),
    }
}

/// Waits out `delay` unless the context finishes first.
///
/// A context that is already done wins even over a zero delay.
async fn wait_for_retry(
    context: &Context,
    delay: Duration,
) -> std::result::Result<(), ContextError> {
    if let Some(cause) = context.err() {
        return Err(cause);
    }
    if delay.is_zero() {
        return Ok(());
    }
    tokio::select! {
        biased;
        cause = context.done() => Err(cause),
        () = sleep(delay) => Ok(()),
    }
}
