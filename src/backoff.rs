use std::time::Duration;

/// Maps the number of retries already issued to the wait before the next one.
///
/// Implementations must be pure: the same `retry_num` always yields the same
/// duration, with no state carried between calls. A single strategy value is
/// shared by every request a client sends.
pub trait BackoffStrategy: std::fmt::Debug + Send + Sync {
    fn interval_for_retry(&self, retry_num: u32) -> Duration;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConstantBackoff {
    interval: Duration,
}

impl ConstantBackoff {
    pub const fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub const fn zero() -> Self {
        Self::new(Duration::ZERO)
    }

    pub const fn interval(&self) -> Duration {
        self.interval
    }
}

impl BackoffStrategy for ConstantBackoff {
    fn interval_for_retry(&self, _retry_num: u32) -> Duration {
        self.interval
    }
}

/// `interval * base^retry_num`, saturating at [`Duration::MAX`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExponentialBackoff {
    interval: Duration,
    base: u32,
}

impl ExponentialBackoff {
    pub const fn new(interval: Duration, base: u32) -> Self {
        Self { interval, base }
    }

    pub const fn interval(&self) -> Duration {
        self.interval
    }

    pub const fn base(&self) -> u32 {
        self.base
    }
}

impl BackoffStrategy for ExponentialBackoff {
    fn interval_for_retry(&self, retry_num: u32) -> Duration {
        self.base
            .checked_pow(retry_num)
            .and_then(|factor| self.interval.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }
}
