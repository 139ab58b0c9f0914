//! Backoff and retry for page fetches.
//!
//! Every transport failure is treated as transient: connection errors,
//! timeouts, and non-2xx statuses (including 403 and 503, which anti-bot
//! layers hand out freely) are all retried until the attempt budget is spent.
//! The last error is then wrapped in [`AcquisitionError::Exhausted`].

use std::future::Future;
use std::time::Duration;

use crate::error::{AcquisitionError, TransportError};
use crate::types::AcquisitionAttempt;

/// Delay schedule between attempts.
///
/// | Attempt | Backoff before it (`base = 2 s`) |
/// |---------|----------------------------------|
/// | 1       | none                             |
/// | 2       | 2 s × 2⁰ = 2 s                   |
/// | 3       | 2 s × 2¹ = 4 s                   |
/// | 4       | 2 s × 2² = 8 s                   |
///
/// Each backoff is capped at `max_delay`. A random jitter in
/// `[0, jitter_max]` is added before every attempt, the first included, so
/// request timing never settles into a fixed interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter_max: Duration,
}

impl BackoffPolicy {
    /// A policy that never sleeps. Used by tests.
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter_max: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn from_millis(base_ms: u64, max_ms: u64, jitter_max_ms: u64) -> Self {
        Self {
            base_delay: Duration::from_millis(base_ms),
            max_delay: Duration::from_millis(max_ms),
            jitter_max: Duration::from_millis(jitter_max_ms),
        }
    }

    /// Deterministic backoff slept before 1-based attempt `attempt`.
    ///
    /// `retry_after` (seconds) raises the delay to at least the server's
    /// advertised value; the cap still applies.
    #[must_use]
    pub fn delay_before(&self, attempt: u32, retry_after: Option<u64>) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = (attempt - 2).min(31);
        let computed = self.base_delay.saturating_mul(1u32 << exponent);
        let floor = retry_after.map_or(Duration::ZERO, Duration::from_secs);
        computed.max(floor).min(self.max_delay)
    }

    /// Random delay in `[0, jitter_max]`.
    #[must_use]
    pub fn jitter(&self) -> Duration {
        random_jitter(self.jitter_max)
    }
}

/// Random delay in `[0, max]`, at millisecond granularity.
#[must_use]
pub fn random_jitter(max: Duration) -> Duration {
    let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::random_range(0..=max_ms))
}

/// Runs `operation` up to `max_attempts` times (at least once).
///
/// The operation receives the [`AcquisitionAttempt`] it is running as. On
/// success the value is returned immediately and no further attempt is made.
/// When the budget is exhausted the last [`TransportError`] is returned inside
/// [`AcquisitionError::Exhausted`].
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    policy: &BackoffPolicy,
    max_attempts: u32,
    mut operation: F,
) -> Result<T, AcquisitionError>
where
    F: FnMut(AcquisitionAttempt) -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut number = 1u32;
    let mut backoff = Duration::ZERO;

    loop {
        let attempt = AcquisitionAttempt {
            number,
            max_attempts,
            backoff,
            jitter: policy.jitter(),
        };
        let pause = attempt.backoff + attempt.jitter;
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }

        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt.is_last() {
                    tracing::warn!(
                        attempts = number,
                        error = %err,
                        "fetch attempts exhausted"
                    );
                    return Err(AcquisitionError::Exhausted {
                        attempts: number,
                        last: err,
                    });
                }
                // A raised Retry-After floor carries forward to later attempts.
                backoff = policy
                    .delay_before(number + 1, err.retry_after_secs())
                    .max(backoff);
                tracing::warn!(
                    attempt = number,
                    max_attempts,
                    delay_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "transient fetch error, retrying after backoff"
                );
                number += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn status_error(status: u16) -> TransportError {
        TransportError::Status {
            status,
            url: "https://www.olx.in/items/q-car-cover".to_owned(),
            retry_after_secs: None,
        }
    }

    #[test]
    fn first_attempt_has_no_backoff() {
        let policy = BackoffPolicy::from_millis(2000, 60_000, 0);
        assert_eq!(policy.delay_before(1, None), Duration::ZERO);
    }

    #[test]
    fn backoff_doubles_from_base() {
        let policy = BackoffPolicy::from_millis(2000, 60_000, 0);
        assert_eq!(policy.delay_before(2, None), Duration::from_millis(2000));
        assert_eq!(policy.delay_before(3, None), Duration::from_millis(4000));
        assert_eq!(policy.delay_before(4, None), Duration::from_millis(8000));
    }

    #[test]
    fn backoff_is_non_decreasing_for_any_attempt_count() {
        for base_ms in [0, 1, 250, 2000, 45_000] {
            let policy = BackoffPolicy::from_millis(base_ms, 30_000, 0);
            let mut previous = Duration::ZERO;
            for attempt in 1..=64 {
                let delay = policy.delay_before(attempt, None);
                assert!(
                    delay >= previous,
                    "delay before attempt {attempt} ({delay:?}) shrank from {previous:?} with base {base_ms}ms"
                );
                previous = delay;
            }
        }
    }

    #[test]
    fn backoff_is_capped() {
        let policy = BackoffPolicy::from_millis(2000, 5000, 0);
        assert_eq!(policy.delay_before(10, None), Duration::from_millis(5000));
    }

    #[test]
    fn retry_after_raises_backoff_but_respects_cap() {
        let policy = BackoffPolicy::from_millis(1000, 30_000, 0);
        assert_eq!(policy.delay_before(2, Some(7)), Duration::from_secs(7));
        assert_eq!(policy.delay_before(2, Some(600)), Duration::from_secs(30));
    }

    #[test]
    fn jitter_stays_within_bound() {
        let policy = BackoffPolicy::from_millis(0, 0, 50);
        for _ in 0..200 {
            assert!(policy.jitter() <= Duration::from_millis(50));
        }
        assert_eq!(BackoffPolicy::immediate().jitter(), Duration::ZERO);
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(&BackoffPolicy::immediate(), 3, |_| {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, TransportError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_status_errors_then_succeeds() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(&BackoffPolicy::immediate(), 3, |_| {
            let cc = Arc::clone(&cc);
            async move {
                let n = cc.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(status_error(403))
                } else {
                    Ok::<u32, TransportError>(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn never_exceeds_attempt_budget() {
        for max_attempts in 1..=6 {
            let call_count = Arc::new(AtomicU32::new(0));
            let cc = Arc::clone(&call_count);
            let result = retry_with_backoff(&BackoffPolicy::immediate(), max_attempts, |_| {
                let cc = Arc::clone(&cc);
                async move {
                    cc.fetch_add(1, Ordering::SeqCst);
                    Err::<u32, TransportError>(status_error(503))
                }
            })
            .await;
            assert_eq!(call_count.load(Ordering::SeqCst), max_attempts);
            assert!(
                matches!(
                    result,
                    Err(AcquisitionError::Exhausted { attempts, .. }) if attempts == max_attempts
                ),
                "expected Exhausted after {max_attempts} attempts, got: {result:?}"
            );
        }
    }

    #[tokio::test]
    async fn zero_budget_still_makes_one_attempt() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(&BackoffPolicy::immediate(), 0, |_| {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, TransportError>(status_error(500))
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn retry_after_floor_is_not_lost_on_next_failure() {
        let policy = BackoffPolicy::from_millis(10, 5_000, 0);
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let result = retry_with_backoff(&policy, 3, |attempt| {
            let s = Arc::clone(&s);
            async move {
                s.lock().unwrap().push(attempt.backoff);
                let retry_after_secs = (attempt.number == 1).then_some(1);
                Err::<u32, TransportError>(TransportError::Status {
                    status: 429,
                    url: "https://www.olx.in/items/q-car-cover".to_owned(),
                    retry_after_secs,
                })
            }
        })
        .await;
        assert!(result.is_err());

        let backoffs = seen.lock().unwrap().clone();
        assert_eq!(backoffs.len(), 3);
        assert_eq!(backoffs[1], Duration::from_secs(1));
        assert!(
            backoffs[2] >= backoffs[1],
            "backoff shrank after Retry-After: {backoffs:?}"
        );
    }

    #[tokio::test]
    async fn attempts_are_numbered_from_one() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let _ = retry_with_backoff(&BackoffPolicy::immediate(), 3, |attempt| {
            let s = Arc::clone(&s);
            async move {
                s.lock().unwrap().push((attempt.number, attempt.is_last()));
                Err::<u32, TransportError>(status_error(503))
            }
        })
        .await;
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(1, false), (2, false), (3, true)]
        );
    }
}
