//! Block / unblock / screen flows for the main application.
//!
//! A mutation is written to the shared store first and only then is the
//! extension asked to reload. A failed reload never undoes the write.

use crate::bridge::{ExtensionBridge, ReloadError};
use crate::config::PolicyConfig;
use crate::intel::{LookupError, NumberIntelligence, NumberReport};
use crate::number::PhoneNumber;
use crate::stats::SyncStats;
use crate::store::{AddOutcome, BlockListStore, RemoveOutcome, StoreError};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Block,
    Allow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockPolicy {
    pub min_risk_score: u8,
    pub min_times_reported: u32,
}

impl BlockPolicy {
    pub fn from_config(config: &PolicyConfig) -> Self {
        Self {
            min_risk_score: config.min_risk_score,
            min_times_reported: config.min_times_reported,
        }
    }

    pub fn decide(&self, report: &NumberReport) -> Verdict {
        if report.times_reported >= self.min_times_reported
            && report.risk_score >= self.min_risk_score
        {
            Verdict::Block
        } else {
            Verdict::Allow
        }
    }
}

/// Whether the extension has picked up a store change yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Propagation {
    Applied,
    /// The store is correct; the OS-visible list catches up on a later reload.
    Pending(ReloadError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockOutcome {
    pub number: PhoneNumber,
    pub change: AddOutcome,
    pub propagation: Propagation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnblockOutcome {
    pub number: PhoneNumber,
    pub change: RemoveOutcome,
    pub propagation: Propagation,
}

#[derive(Debug)]
pub struct ScreeningOutcome {
    pub report: NumberReport,
    pub verdict: Verdict,
    /// Present only when the verdict led to a block.
    pub block: Option<BlockOutcome>,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("number intelligence is not configured")]
    NoIntelligence,
}

pub struct BlockService {
    store: Arc<dyn BlockListStore>,
    bridge: ExtensionBridge,
    intelligence: Option<Arc<dyn NumberIntelligence>>,
    policy: BlockPolicy,
    stats: Arc<SyncStats>,
    // Tokio's mutex is FIFO, so mutations land in the order they were issued.
    write_gate: Mutex<()>,
}

impl BlockService {
    pub fn new(
        store: Arc<dyn BlockListStore>,
        bridge: ExtensionBridge,
        policy: BlockPolicy,
        stats: Arc<SyncStats>,
    ) -> Self {
        Self {
            store,
            bridge,
            intelligence: None,
            policy,
            stats,
            write_gate: Mutex::new(()),
        }
    }

    pub fn with_intelligence(mut self, intelligence: Arc<dyn NumberIntelligence>) -> Self {
        self.intelligence = Some(intelligence);
        self
    }

    pub async fn block(&self, input: &str) -> Result<BlockOutcome, StoreError> {
        let number = PhoneNumber::parse(input)?;
        let change = self.mutate(move |store| store.add(number)).await?;
        match change {
            AddOutcome::Added => info!("Blocked {}", number.international()),
            AddOutcome::AlreadyPresent => info!("{} was already blocked", number.international()),
        }

        Ok(BlockOutcome {
            number,
            change,
            propagation: self.propagate().await,
        })
    }

    pub async fn unblock(&self, input: &str) -> Result<UnblockOutcome, StoreError> {
        let number = PhoneNumber::parse(input)?;
        let change = self.mutate(move |store| store.remove(number)).await?;
        match change {
            RemoveOutcome::Removed => info!("Unblocked {}", number.international()),
            RemoveOutcome::NotPresent => info!("{} was not blocked", number.international()),
        }

        Ok(UnblockOutcome {
            number,
            change,
            propagation: self.propagate().await,
        })
    }

    pub async fn list(&self) -> Result<Vec<PhoneNumber>, StoreError> {
        let store = self.store.clone();
        run_blocking(move || store.list()).await
    }

    /// Looks a number up and blocks it when the policy says so. An unknown
    /// number yields a zero-risk report and is left alone.
    pub async fn screen(&self, input: &str) -> Result<ScreeningOutcome, ServiceError> {
        let intelligence = self
            .intelligence
            .as_ref()
            .ok_or(ServiceError::NoIntelligence)?;
        let number = PhoneNumber::parse(input).map_err(StoreError::from)?;
        let report = intelligence.assess_number(number).await?;
        let verdict = self.policy.decide(&report);
        info!(
            "Screened {}: risk {}/100, reported {} time(s) -> {:?}",
            number.international(),
            report.risk_score,
            report.times_reported,
            verdict
        );

        let block = match verdict {
            Verdict::Block => Some(self.block(&number.to_string()).await?),
            Verdict::Allow => None,
        };

        Ok(ScreeningOutcome {
            report,
            verdict,
            block,
        })
    }

    async fn mutate<T, F>(&self, apply: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn BlockListStore) -> Result<T, StoreError> + Send + 'static,
    {
        let _gate = self.write_gate.lock().await;
        let store = self.store.clone();
        let result = run_blocking(move || apply(store.as_ref())).await?;
        self.stats.inc_mutations();
        Ok(result)
    }

    // Sent after every successful mutation call, no-ops included: a repeat
    // reload also heals a directory left stale by an earlier failure.
    async fn propagate(&self) -> Propagation {
        match self.bridge.reload().await {
            Ok(()) => Propagation::Applied,
            Err(e) => {
                warn!("Block list saved; it will take effect shortly ({})", e);
                Propagation::Pending(e)
            }
        }
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .unwrap_or_else(|e| {
            Err(StoreError::Unavailable {
                path: Default::default(),
                reason: format!("store task failed: {}", e),
            })
        })
}
