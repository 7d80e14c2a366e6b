use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Error;
use crate::util::lock_unpoisoned;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClientMetricsSnapshot {
    pub requests_started: u64,
    pub requests_succeeded: u64,
    pub requests_failed: u64,
    pub attempts: u64,
    pub retries: u64,
    pub cancelled: u64,
    pub decode_errors: u64,
    pub unread_responses: u64,
    pub in_flight: u64,
    pub error_counts: BTreeMap<String, u64>,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct ClientMetrics {
    inner: Arc<ClientMetricsInner>,
}

#[derive(Debug, Default)]
struct ClientMetricsInner {
    requests_started: AtomicU64,
    requests_succeeded: AtomicU64,
    requests_failed: AtomicU64,
    attempts: AtomicU64,
    retries: AtomicU64,
    cancelled: AtomicU64,
    decode_errors: AtomicU64,
    unread_responses: AtomicU64,
    in_flight: AtomicU64,
    error_counts: Mutex<BTreeMap<String, u64>>,
}

pub(crate) struct InFlightGuard {
    metrics: ClientMetrics,
}

impl ClientMetrics {
    pub(crate) fn record_request_started(&self) {
        self.inner.requests_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn enter_in_flight(&self) -> InFlightGuard {
        self.inner.in_flight.fetch_add(1, Ordering::Relaxed);
        InFlightGuard {
            metrics: self.clone(),
        }
    }

    pub(crate) fn record_attempt(&self) {
        self.inner.attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retry(&self) {
        self.inner.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unread_response(&self) {
        self.inner.unread_responses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_request_succeeded(&self) {
        self.inner
            .requests_succeeded
            .fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_request_failed(&self, error: &Error) {
        self.inner.requests_failed.fetch_add(1, Ordering::Relaxed);
        match error {
            Error::Cancelled { .. } => {
                self.inner.cancelled.fetch_add(1, Ordering::Relaxed);
            }
            Error::Executor {
                interrupted: Some(_),
                ..
            } => {
                self.inner.cancelled.fetch_add(1, Ordering::Relaxed);
            }
            Error::Decode { .. } => {
                self.inner.decode_errors.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
        let mut error_counts = lock_unpoisoned(&self.inner.error_counts);
        *error_counts
            .entry(error.code().as_str().to_owned())
            .or_insert(0) += 1;
    }

    pub(crate) fn snapshot(&self) -> ClientMetricsSnapshot {
        ClientMetricsSnapshot {
            requests_started: self.inner.requests_started.load(Ordering::Relaxed),
            requests_succeeded: self.inner.requests_succeeded.load(Ordering::Relaxed),
            requests_failed: self.inner.requests_failed.load(Ordering::Relaxed),
            attempts: self.inner.attempts.load(Ordering::Relaxed),
            retries: self.inner.retries.load(Ordering::Relaxed),
            cancelled: self.inner.cancelled.load(Ordering::Relaxed),
            decode_errors: self.inner.decode_errors.load(Ordering::Relaxed),
            unread_responses: self.inner.unread_responses.load(Ordering::Relaxed),
            in_flight: self.inner.in_flight.load(Ordering::Relaxed),
            error_counts: lock_unpoisoned(&self.inner.error_counts).clone(),
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.metrics.inner.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}
