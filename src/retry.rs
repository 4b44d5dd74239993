//! Timeout and retry policy for remote reads.
//!
//! Every fallible network operation of the aggregator is routed through [`RetryExecutor`].

use crate::{
    error::{ErrorClass, ReadError, classify},
    metrics::{EventSink, NoopSink, Outcome},
    platform::PlatformProfile,
};
use std::{future::Future, sync::Arc};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

/// Runs operations with a per-attempt timeout and classification-driven linear backoff.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    profile: PlatformProfile,
    sink: Arc<dyn EventSink>,
}

impl RetryExecutor {
    /// Creates an executor for the given profile, reporting to `sink`.
    pub fn new(profile: PlatformProfile, sink: Arc<dyn EventSink>) -> Self {
        Self { profile, sink }
    }

    /// Creates an executor that does not report anywhere.
    pub fn without_sink(profile: PlatformProfile) -> Self {
        Self::new(profile, Arc::new(NoopSink))
    }

    /// The profile driving this executor.
    pub fn profile(&self) -> &PlatformProfile {
        &self.profile
    }

    /// Runs `operation` until it succeeds, a failure is not worth retrying, or the profile's
    /// retry count is exhausted.
    ///
    /// Each attempt races a fresh future from `operation` against the profile timeout; an
    /// elapsed timeout becomes [`ReadError::Timeout`]. After a retryable failure on attempt
    /// `n` the executor sleeps `retry_delay * n`. The last error is returned once attempts
    /// run out.
    pub async fn execute<T, F, Fut>(&self, context: &str, mut operation: F) -> Result<T, ReadError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ReadError>>,
    {
        let platform = self.profile.class;
        let max_attempts = self.profile.retry_count.max(1);
        let mut attempt = 1;

        loop {
            let started = Instant::now();
            let result = tokio::time::timeout(self.profile.timeout, operation())
                .await
                .unwrap_or(Err(ReadError::Timeout(self.profile.timeout)));
            let elapsed = started.elapsed();

            let err = match result {
                Ok(value) => {
                    self.sink.record(context, platform, elapsed, &Outcome::Success);
                    return Ok(value);
                }
                Err(err) => err,
            };

            let class = classify(&err);
            self.sink.record(context, platform, elapsed, &Outcome::Failure(class.clone()));

            if let Some(reason) = self.abort_reason(&class) {
                debug!(context, attempt, %class, reason, "Not retrying failed read");
                return Err(err);
            }

            if attempt >= max_attempts {
                warn!(context, attempts = attempt, %class, %err, "Read failed after all attempts");
                return Err(err);
            }

            let delay = self.profile.retry_delay * attempt;
            trace!(context, attempt, %class, ?delay, "Retrying failed read");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Returns why a failure of `class` must not be retried under this profile, if so.
    fn abort_reason(&self, class: &ErrorClass) -> Option<&'static str> {
        match class {
            ErrorClass::Network if self.profile.is_constrained() => {
                Some("network failure on constrained platform")
            }
            class if class.is_retryable() => None,
            ErrorClass::UserRejected => Some("rejected by user"),
            _ => Some("rejected by contract"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::RaffleErrors,
        metrics::OperationMetrics,
        platform::PlatformClass,
        test_utils::{network_error, revert_error, rpc_error},
    };
    use alloy::{primitives::Bytes, sol_types::SolError};
    use std::{
        sync::{
            Mutex,
            atomic::{AtomicU32, Ordering},
        },
        time::Duration,
    };

    /// Runs an operation that always fails with `make_err`, returning the attempt instants.
    async fn run_failing(
        executor: &RetryExecutor,
        make_err: fn() -> ReadError,
    ) -> (ReadError, Vec<Instant>) {
        let attempts = Arc::new(Mutex::new(Vec::new()));
        let err = executor
            .execute("test.op", || {
                let attempts = attempts.clone();
                async move {
                    attempts.lock().unwrap().push(Instant::now());
                    Err::<(), _>(make_err())
                }
            })
            .await
            .unwrap_err();
        let attempts = attempts.lock().unwrap().clone();
        (err, attempts)
    }

    #[tokio::test(start_paused = true)]
    async fn returns_first_success() {
        let executor = RetryExecutor::without_sink(PlatformProfile::UNCONSTRAINED);
        let calls = Arc::new(AtomicU32::new(0));
        let value = executor
            .execute("test.op", || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                }
            })
            .await
            .unwrap();
        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn user_rejection_is_attempted_once() {
        let executor = RetryExecutor::without_sink(PlatformProfile::UNCONSTRAINED);
        let (err, attempts) = run_failing(&executor, || rpc_error(4001, "User rejected")).await;
        assert_eq!(attempts.len(), 1);
        assert_eq!(err.class(), ErrorClass::UserRejected);
    }

    #[tokio::test(start_paused = true)]
    async fn business_rule_is_attempted_once() {
        let executor = RetryExecutor::without_sink(PlatformProfile::UNCONSTRAINED);
        let (err, attempts) = run_failing(&executor, || {
            revert_error(Bytes::from(RaffleErrors::DurationElapsed {}.abi_encode()))
        })
        .await;
        assert_eq!(attempts.len(), 1);
        assert_eq!(err.class(), ErrorClass::BusinessRule("DurationElapsed".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn network_failures_back_off_linearly_when_unconstrained() {
        let profile = PlatformProfile::UNCONSTRAINED;
        let executor = RetryExecutor::without_sink(profile);
        let (err, attempts) = run_failing(&executor, || network_error("connection refused")).await;

        assert_eq!(attempts.len(), profile.retry_count as usize);
        assert_eq!(err.class(), ErrorClass::Network);

        let gaps: Vec<Duration> = attempts.windows(2).map(|pair| pair[1] - pair[0]).collect();
        assert_eq!(gaps, vec![profile.retry_delay, profile.retry_delay * 2]);
        assert!(gaps.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn network_failures_abort_when_constrained() {
        let executor = RetryExecutor::without_sink(PlatformProfile::CONSTRAINED);
        let (_, attempts) = run_failing(&executor, || network_error("connection refused")).await;
        assert_eq!(attempts.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_failures_are_retried_when_constrained() {
        let profile = PlatformProfile::CONSTRAINED;
        let executor = RetryExecutor::without_sink(profile);
        let (_, attempts) = run_failing(&executor, || ReadError::Decode {
            method: "state",
            reason: "short return data".into(),
        })
        .await;
        assert_eq!(attempts.len(), profile.retry_count as usize);
    }

    #[test]
    fn constrained_profile_only_stops_network_retries() {
        let unconstrained = RetryExecutor::without_sink(PlatformProfile::UNCONSTRAINED);
        let constrained = RetryExecutor::without_sink(PlatformProfile::CONSTRAINED);
        let classes = [
            ErrorClass::UserRejected,
            ErrorClass::BusinessRule("NotAWinner".into()),
            ErrorClass::Network,
            ErrorClass::Unknown,
        ];

        for class in &classes {
            let retried = unconstrained.abort_reason(class).is_none();
            assert_eq!(retried, class.is_retryable(), "{class}");
        }
        assert!(constrained.abort_reason(&ErrorClass::Network).is_some());
        assert!(constrained.abort_reason(&ErrorClass::Unknown).is_none());
        assert_eq!(
            constrained.abort_reason(&ErrorClass::UserRejected),
            unconstrained.abort_reason(&ErrorClass::UserRejected)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failure() {
        let executor = RetryExecutor::without_sink(PlatformProfile::UNCONSTRAINED);
        let calls = Arc::new(AtomicU32::new(0));
        let value = executor
            .execute("test.op", || {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(network_error("connection reset"))
                    } else {
                        Ok("ok")
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(value, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn timeouts_are_network_failures() {
        let profile = PlatformProfile::UNCONSTRAINED.with_retries(2, Duration::from_secs(1));
        let executor = RetryExecutor::without_sink(profile);
        let started = Instant::now();

        let err = executor
            .execute("test.op", || std::future::pending::<Result<(), ReadError>>())
            .await
            .unwrap_err();

        assert!(matches!(err, ReadError::Timeout(timeout) if timeout == profile.timeout));
        assert_eq!(err.class(), ErrorClass::Network);
        assert_eq!(started.elapsed(), profile.timeout * 2 + profile.retry_delay);
    }

    #[tokio::test(start_paused = true)]
    async fn records_every_attempt() {
        let metrics = Arc::new(OperationMetrics::new());
        let executor = RetryExecutor::new(PlatformProfile::UNCONSTRAINED, metrics.clone());
        let _ = run_failing(&executor, || network_error("connection refused")).await;

        let stats = metrics.get("test.op", PlatformClass::Unconstrained).unwrap();
        assert_eq!(stats.calls, 3);
        assert_eq!(stats.errors, 3);
    }
}
