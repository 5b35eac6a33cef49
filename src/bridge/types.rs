use std::time::Duration;

/// One reload signal for one extension. Built per mutation, dropped once the
/// host has answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadRequest {
    pub extension_id: String,
    pub attempt: u32,
}

/// Failures reported by the host that owns the extension.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("extension '{0}' is not registered with the host")]
    UnknownExtension(String),
    #[error("reload rejected by host rate limiting")]
    RateLimited,
    #[error("extension request was cancelled: {0}")]
    Cancelled(String),
    #[error("extension host unavailable: {0}")]
    Unavailable(String),
}

impl HostError {
    pub fn is_transient(&self) -> bool {
        !matches!(self, HostError::UnknownExtension(_))
    }
}

/// The block-list mutation is already durable when any of these is returned;
/// only the externally visible directory is stale.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReloadError {
    #[error("reload of '{extension_id}' timed out after {attempts} attempt(s)")]
    TimedOut { extension_id: String, attempts: u32 },

    #[error("reload of '{extension_id}' failed after {attempts} attempt(s): {source}")]
    Declined {
        extension_id: String,
        attempts: u32,
        #[source]
        source: HostError,
    },
}

/// The OS facility that re-invokes a call-directory extension.
#[async_trait::async_trait]
pub trait ExtensionHost: Send + Sync {
    /// Resolves once the host has finished (or refused) the reload.
    async fn reload_extension(&self, request: &ReloadRequest) -> Result<(), HostError>;
}

/// Bounded exponential backoff between reload attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`, where `attempt` starts at 1.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(4),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(500),
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
        assert_eq!(policy.backoff(4), Duration::from_millis(500));
        assert_eq!(policy.backoff(40), Duration::from_millis(500));
    }

    #[test]
    fn test_unknown_extension_is_permanent() {
        assert!(!HostError::UnknownExtension("x".into()).is_transient());
        assert!(HostError::RateLimited.is_transient());
        assert!(HostError::Cancelled("store".into()).is_transient());
    }
}
