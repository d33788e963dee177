//! Retries gRPC invocations with exponential backoff, refreshing
//! credentials once on the first UNAUTHENTICATED failure.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::Error;

/// How often blocking waits (operation streams, backoff sleeps) check for
/// cancellation.
pub const POLL_WAIT: Duration = Duration::from_millis(250);

/// A process-wide cancellation flag, set by the signal bridge and polled at
/// [POLL_WAIT] granularity by anything that blocks.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How many times to retry, and how long to back off between attempts.
///
/// `limit == 0` means a single attempt with no retries. The delay before
/// re-attempt `n` (zero-based) is `base_delay * 2^n`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub limit: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            limit: 0,
            base_delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    pub fn new(limit: u32, base_delay: Duration) -> Self {
        RetryPolicy { limit, base_delay }
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

/// What [retry] needs from the surrounding request context: a cancellation
/// flag to poll, and a credential-refresh hook.
pub trait RetryContext {
    fn cancelled(&self) -> bool;
    fn auth_refresh(&self) -> impl Future<Output = Result<(), Error>> + Send;
}

/// Runs `invocation` until it succeeds, the error is not retryable, or the
/// retry limit is exhausted.
///
/// The first UNAUTHENTICATED failure triggers one credential refresh which
/// does not count as an attempt; if the refresh fails, or a later attempt
/// is UNAUTHENTICATED again, the failure takes the normal retry path.
/// RPC and protocol errors are retryable; everything else aborts
/// immediately. The backoff sleep polls the cancellation flag.
pub async fn retry<C, T, F, Fut>(
    policy: &RetryPolicy,
    ctx: &C,
    mut invocation: F,
) -> Result<T, Error>
where
    C: RetryContext,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let mut attempts: u32 = 0;
    let mut refreshed = false;

    loop {
        if ctx.cancelled() {
            return Err(Error::Cancelled);
        }

        let err = match invocation().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        match &err {
            Error::Rpc { code, message } => {
                if *code == tonic::Code::Unauthenticated && !refreshed {
                    refreshed = true;
                    match ctx.auth_refresh().await {
                        Ok(()) => {
                            // The free retry: not counted against the limit.
                            warn!("refreshed credentials after UNAUTHENTICATED");
                            continue;
                        }
                        Err(refresh_err) => {
                            warn!(%refresh_err, "credential refresh failed");
                        }
                    }
                }

                if attempts >= policy.limit {
                    return Err(if policy.limit > 0 {
                        Error::RetryLimitExceeded {
                            code: *code,
                            message: message.clone(),
                        }
                    } else {
                        err
                    });
                }

                let delay = policy.delay_for_attempt(attempts);
                warn!(
                    "Attempt {}/{} failed with gRPC error {}: {}. Retrying in {} ms",
                    attempts + 1,
                    policy.limit + 1,
                    *code as i32,
                    message,
                    delay.as_millis(),
                );
                sleep_cancellable(ctx, delay).await?;
                attempts += 1;
            }
            Error::Protocol(message) => {
                if attempts >= policy.limit {
                    return Err(err);
                }
                let delay = policy.delay_for_attempt(attempts);
                warn!(
                    "Attempt {}/{} failed: {}. Retrying in {} ms",
                    attempts + 1,
                    policy.limit + 1,
                    message,
                    delay.as_millis(),
                );
                sleep_cancellable(ctx, delay).await?;
                attempts += 1;
            }
            // Io, Precondition, Cancelled and an already-exhausted retry
            // are terminal.
            _ => return Err(err),
        }
    }
}

/// Sleeps for `delay`, waking at [POLL_WAIT] granularity to observe
/// cancellation.
async fn sleep_cancellable<C: RetryContext>(ctx: &C, delay: Duration) -> Result<(), Error> {
    let mut remaining = delay;
    while !remaining.is_zero() {
        if ctx.cancelled() {
            return Err(Error::Cancelled);
        }
        let step = remaining.min(POLL_WAIT);
        tokio::time::sleep(step).await;
        remaining -= step;
    }
    if ctx.cancelled() {
        return Err(Error::Cancelled);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    /// A context with a scripted refresh outcome, counting refresh calls.
    struct FakeContext {
        cancel: CancelFlag,
        refreshes: AtomicU32,
        refresh_fails: bool,
    }

    impl FakeContext {
        fn new() -> Self {
            FakeContext {
                cancel: CancelFlag::new(),
                refreshes: AtomicU32::new(0),
                refresh_fails: false,
            }
        }
    }

    impl RetryContext for FakeContext {
        fn cancelled(&self) -> bool {
            self.cancel.is_set()
        }

        fn auth_refresh(&self) -> impl Future<Output = Result<(), Error>> + Send {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            let fails = self.refresh_fails;
            async move {
                if fails {
                    Err(Error::Precondition("no auth session configured".into()))
                } else {
                    Ok(())
                }
            }
        }
    }

    fn unavailable() -> Error {
        Error::Rpc {
            code: tonic::Code::Unavailable,
            message: "connection refused".into(),
        }
    }

    fn fast_policy(limit: u32) -> RetryPolicy {
        RetryPolicy::new(limit, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn success_needs_one_attempt() {
        let ctx = FakeContext::new();
        let calls = AtomicU32::new(0);
        let result = retry(&fast_policy(3), &ctx, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, Error>(42) }
        })
        .await
        .unwrap();
        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn limit_zero_means_single_attempt() {
        let ctx = FakeContext::new();
        let calls = AtomicU32::new(0);
        let err = retry(&fast_policy(0), &ctx, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(unavailable()) }
        })
        .await
        .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // no "retry limit" prefix when retries are disabled
        assert!(matches!(err, Error::Rpc { .. }));
    }

    #[tokio::test]
    async fn exhaustion_after_limit_plus_one_attempts() {
        let ctx = FakeContext::new();
        let calls = AtomicU32::new(0);
        let err = retry(&fast_policy(2), &ctx, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(unavailable()) }
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(err.rpc_code(), Some(tonic::Code::Unavailable));
        let message = err.to_string();
        assert!(message.starts_with("Retry limit exceeded. Last gRPC error was 14:"));
        assert!(message.contains("connection refused"));
    }

    #[tokio::test]
    async fn unauthenticated_gets_one_free_refresh() {
        let ctx = FakeContext::new();
        let calls = AtomicU32::new(0);
        let result = retry(&fast_policy(0), &ctx, || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(Error::Rpc {
                        code: tonic::Code::Unauthenticated,
                        message: "token expired".into(),
                    })
                } else {
                    Ok(7)
                }
            }
        })
        .await
        .unwrap();

        // two invocations, one refresh, and the free retry did not count
        // against limit 0
        assert_eq!(result, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(ctx.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn second_unauthenticated_is_a_normal_failure() {
        let ctx = FakeContext::new();
        let calls = AtomicU32::new(0);
        let err = retry(&fast_policy(0), &ctx, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err::<(), _>(Error::Rpc {
                    code: tonic::Code::Unauthenticated,
                    message: "token expired".into(),
                })
            }
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(ctx.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(err.rpc_code(), Some(tonic::Code::Unauthenticated));
    }

    #[tokio::test]
    async fn failed_refresh_takes_the_normal_path() {
        let mut ctx = FakeContext::new();
        ctx.refresh_fails = true;
        let calls = AtomicU32::new(0);
        let err = retry(&fast_policy(0), &ctx, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err::<(), _>(Error::Rpc {
                    code: tonic::Code::Unauthenticated,
                    message: "token expired".into(),
                })
            }
        })
        .await
        .unwrap_err();

        // refresh failed, so the UNAUTHENTICATED error is final with limit 0
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(err.rpc_code(), Some(tonic::Code::Unauthenticated));
    }

    #[tokio::test]
    async fn io_errors_are_not_retried() {
        let ctx = FakeContext::new();
        let calls = AtomicU32::new(0);
        let err = retry(&fast_policy(5), &ctx, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err::<(), _>(Error::io(
                    "/some/path",
                    std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
                ))
            }
        })
        .await
        .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(err, Error::Io { .. }));
    }

    #[tokio::test]
    async fn cancellation_interrupts_the_backoff() {
        let ctx = FakeContext::new();
        ctx.cancel.set();
        let err = retry(&fast_policy(5), &ctx, || async {
            Err::<(), _>(unavailable())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }
}
