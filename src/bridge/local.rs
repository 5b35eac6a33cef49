use super::types::{ExtensionHost, HostError, ReloadRequest};
use crate::directory::{CallDirectoryProvider, SequentialDirectory};
use crate::number::PhoneNumber;
use crate::stats::SyncStats;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

type Waiter = oneshot::Sender<Result<(), HostError>>;

/// In-process stand-in for the OS call-directory service.
///
/// Reload signals queue up while an invocation is running; the next invocation
/// answers every signal queued before it started. The directory the "OS"
/// applied last is published on a watch channel.
pub struct LocalExtensionHost {
    extension_id: String,
    min_interval: Duration,
    last_accepted: Mutex<Option<Instant>>,
    requests: mpsc::UnboundedSender<Waiter>,
    directory: watch::Receiver<Arc<Vec<PhoneNumber>>>,
}

impl LocalExtensionHost {
    /// Registers `provider` under `extension_id` and starts the invocation
    /// worker. Must be called inside a Tokio runtime.
    pub fn spawn(
        extension_id: impl Into<String>,
        provider: CallDirectoryProvider,
        min_interval: Duration,
        stats: Arc<SyncStats>,
    ) -> Self {
        let extension_id = extension_id.into();
        let (requests, rx) = mpsc::unbounded_channel();
        let (directory_tx, directory) = watch::channel(Arc::new(Vec::new()));

        tokio::spawn(run_invocations(
            extension_id.clone(),
            Arc::new(provider),
            rx,
            directory_tx,
            stats,
        ));

        Self {
            extension_id,
            min_interval,
            last_accepted: Mutex::new(None),
            requests,
            directory,
        }
    }

    /// Entries applied by the most recent successful invocation.
    pub fn applied_directory(&self) -> Arc<Vec<PhoneNumber>> {
        self.directory.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<PhoneNumber>>> {
        self.directory.clone()
    }

    fn admit(&self) -> Result<(), HostError> {
        let mut last = self
            .last_accepted
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        if let Some(prev) = *last {
            if now.duration_since(prev) < self.min_interval {
                return Err(HostError::RateLimited);
            }
        }
        *last = Some(now);
        Ok(())
    }
}

#[async_trait::async_trait]
impl ExtensionHost for LocalExtensionHost {
    async fn reload_extension(&self, request: &ReloadRequest) -> Result<(), HostError> {
        if request.extension_id != self.extension_id {
            return Err(HostError::UnknownExtension(request.extension_id.clone()));
        }
        self.admit()?;

        let (tx, rx) = oneshot::channel();
        self.requests
            .send(tx)
            .map_err(|_| HostError::Unavailable("extension worker stopped".to_string()))?;

        rx.await.unwrap_or_else(|_| {
            Err(HostError::Unavailable(
                "extension worker dropped the request".to_string(),
            ))
        })
    }
}

async fn run_invocations(
    extension_id: String,
    provider: Arc<CallDirectoryProvider>,
    mut rx: mpsc::UnboundedReceiver<Waiter>,
    directory: watch::Sender<Arc<Vec<PhoneNumber>>>,
    stats: Arc<SyncStats>,
) {
    while let Some(first) = rx.recv().await {
        let mut waiters = vec![first];
        while let Ok(next) = rx.try_recv() {
            waiters.push(next);
        }
        debug!(
            "Invoking extension '{}' for {} pending reload(s)",
            extension_id,
            waiters.len()
        );

        stats.inc_extension_invocations();
        let provider = provider.clone();
        let result = match tokio::task::spawn_blocking(move || {
            provider.begin_request(SequentialDirectory::new())
        })
        .await
        {
            Ok(invocation) => match invocation.output {
                Ok(entries) => {
                    info!(
                        "Extension '{}' applied {} blocking entries",
                        extension_id,
                        entries.len()
                    );
                    directory.send_replace(Arc::new(entries));
                    Ok(())
                }
                Err(e) => Err(HostError::Cancelled(e.to_string())),
            },
            Err(e) => {
                warn!("Extension '{}' invocation aborted: {}", extension_id, e);
                Err(HostError::Unavailable(e.to_string()))
            }
        };

        for waiter in waiters {
            // The caller may have timed out and gone away.
            let _ = waiter.send(result.clone());
        }
    }

    debug!("Extension host for '{}' shut down", extension_id);
}
