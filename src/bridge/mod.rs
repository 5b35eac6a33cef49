mod local;
mod types;

pub use local::LocalExtensionHost;
pub use types::{ExtensionHost, HostError, ReloadError, ReloadRequest, RetryPolicy};

use crate::config::ExtensionConfig;
use crate::stats::SyncStats;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Asks the host to re-run the call-directory extension after a store write.
///
/// Each attempt is bounded by a timeout and transient failures are retried
/// with backoff. Several calls may be served by one extension run, so callers
/// must not count on one invocation per reload.
pub struct ExtensionBridge {
    host: Arc<dyn ExtensionHost>,
    extension_id: String,
    timeout: Duration,
    retry: RetryPolicy,
    stats: Arc<SyncStats>,
}

impl ExtensionBridge {
    pub fn new(
        host: Arc<dyn ExtensionHost>,
        extension_id: impl Into<String>,
        timeout: Duration,
        retry: RetryPolicy,
        stats: Arc<SyncStats>,
    ) -> Self {
        Self {
            host,
            extension_id: extension_id.into(),
            timeout,
            retry,
            stats,
        }
    }

    pub fn from_config(
        host: Arc<dyn ExtensionHost>,
        config: &ExtensionConfig,
        stats: Arc<SyncStats>,
    ) -> Self {
        let retry = RetryPolicy {
            max_attempts: config.max_attempts,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        };
        Self::new(
            host,
            config.identifier.clone(),
            config.reload_timeout(),
            retry,
            stats,
        )
    }

    pub fn extension_id(&self) -> &str {
        &self.extension_id
    }

    pub async fn reload(&self) -> Result<(), ReloadError> {
        self.stats.inc_reloads_requested();
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let request = ReloadRequest {
                extension_id: self.extension_id.clone(),
                attempt,
            };

            match tokio::time::timeout(self.timeout, self.host.reload_extension(&request)).await {
                Ok(Ok(())) => {
                    self.stats.inc_reloads_succeeded();
                    info!(
                        "Extension '{}' reloaded (attempt {})",
                        self.extension_id, attempt
                    );
                    return Ok(());
                }
                Ok(Err(e)) => {
                    if !e.is_transient() || attempt >= max_attempts {
                        return Err(self.fail(ReloadError::Declined {
                            extension_id: self.extension_id.clone(),
                            attempts: attempt,
                            source: e,
                        }));
                    }
                    warn!(
                        "Reload of '{}' failed on attempt {}: {}",
                        self.extension_id, attempt, e
                    );
                }
                Err(_) => {
                    if attempt >= max_attempts {
                        return Err(self.fail(ReloadError::TimedOut {
                            extension_id: self.extension_id.clone(),
                            attempts: attempt,
                        }));
                    }
                    warn!(
                        "Reload of '{}' timed out after {:?} on attempt {}",
                        self.extension_id, self.timeout, attempt
                    );
                }
            }

            tokio::time::sleep(self.retry.backoff(attempt)).await;
            attempt += 1;
        }
    }

    fn fail(&self, error: ReloadError) -> ReloadError {
        self.stats.inc_reloads_failed();
        warn!("{}", error);
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails a fixed number of times before succeeding.
    struct FlakyHost {
        failures_left: AtomicU32,
        calls: AtomicU32,
        error: HostError,
    }

    #[async_trait::async_trait]
    impl ExtensionHost for FlakyHost {
        async fn reload_extension(&self, request: &ReloadRequest) -> Result<(), HostError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            assert_eq!(request.attempt, call);
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(self.error.clone());
            }
            Ok(())
        }
    }

    struct StuckHost;

    #[async_trait::async_trait]
    impl ExtensionHost for StuckHost {
        async fn reload_extension(&self, _request: &ReloadRequest) -> Result<(), HostError> {
            std::future::pending().await
        }
    }

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(20),
        }
    }

    fn flaky(failures: u32, error: HostError) -> Arc<FlakyHost> {
        Arc::new(FlakyHost {
            failures_left: AtomicU32::new(failures),
            calls: AtomicU32::new(0),
            error,
        })
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let host = flaky(2, HostError::RateLimited);
        let stats = SyncStats::new();
        let bridge = ExtensionBridge::new(
            host.clone(),
            "ext",
            Duration::from_secs(1),
            fast_retry(3),
            stats.clone(),
        );

        bridge.reload().await.unwrap();
        assert_eq!(host.calls.load(Ordering::SeqCst), 3);
        assert_eq!(stats.snapshot().reloads_succeeded, 1);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let host = flaky(10, HostError::Unavailable("busy".into()));
        let stats = SyncStats::new();
        let bridge = ExtensionBridge::new(
            host.clone(),
            "ext",
            Duration::from_secs(1),
            fast_retry(3),
            stats.clone(),
        );

        let err = bridge.reload().await.unwrap_err();
        assert!(matches!(err, ReloadError::Declined { attempts: 3, .. }));
        assert_eq!(host.calls.load(Ordering::SeqCst), 3);
        assert_eq!(stats.snapshot().reloads_failed, 1);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let host = flaky(10, HostError::UnknownExtension("ext".into()));
        let bridge = ExtensionBridge::new(
            host.clone(),
            "ext",
            Duration::from_secs(1),
            fast_retry(5),
            SyncStats::new(),
        );

        let err = bridge.reload().await.unwrap_err();
        assert!(matches!(
            err,
            ReloadError::Declined {
                attempts: 1,
                source: HostError::UnknownExtension(_),
                ..
            }
        ));
        assert_eq!(host.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hung_host_times_out() {
        let bridge = ExtensionBridge::new(
            Arc::new(StuckHost),
            "ext",
            Duration::from_millis(20),
            fast_retry(2),
            SyncStats::new(),
        );

        let err = bridge.reload().await.unwrap_err();
        assert_eq!(
            err,
            ReloadError::TimedOut {
                extension_id: "ext".to_string(),
                attempts: 2
            }
        );
    }
}
