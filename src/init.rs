//! Initialization helpers for the main-app and extension entry points.

use crate::blocker::{BlockPolicy, BlockService};
use crate::bridge::{ExtensionBridge, LocalExtensionHost};
use crate::config::Config;
use crate::directory::CallDirectoryProvider;
use crate::intel::NumberIntelligenceClient;
use crate::stats::SyncStats;
use crate::store::SharedContainer;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Sets up the tracing subscriber with the configured filters.
pub fn setup_logging(config: &Config) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut filter = config.logging.level.clone();

        // HTTP client internals are noisy at debug level
        if !filter.contains("hyper") {
            filter.push_str(",hyper=off,hyper_util=off");
        }
        if !filter.contains("reqwest") {
            filter.push_str(",reqwest=warn");
        }

        tracing_subscriber::EnvFilter::new(filter)
    });

    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);
    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Everything the main application needs to block and unblock numbers.
pub struct MainApp {
    pub service: BlockService,
    pub host: Arc<LocalExtensionHost>,
    pub stats: Arc<SyncStats>,
}

/// Wires the shared store, the local extension host and the remote lookup
/// client together. Must run inside a Tokio runtime.
pub fn init_main_app(config: &Config) -> Result<MainApp> {
    let stats = SyncStats::new();
    let container = SharedContainer::from_config(&config.storage);

    let store = Arc::new(
        container
            .open_store()
            .with_context(|| format!("Failed to open shared container '{}'", container.group_id()))?,
    );
    info!("Using shared store at {}", store.path().display());

    let provider = CallDirectoryProvider::new(Arc::new(container.clone()));
    let host = Arc::new(LocalExtensionHost::spawn(
        config.extension.identifier.clone(),
        provider,
        Duration::from_millis(config.extension.min_reload_interval_ms),
        stats.clone(),
    ));
    let bridge = ExtensionBridge::from_config(host.clone(), &config.extension, stats.clone());

    let intelligence = init_intelligence(config, stats.clone())?;

    let service = BlockService::new(
        store,
        bridge,
        BlockPolicy::from_config(&config.policy),
        stats.clone(),
    )
    .with_intelligence(Arc::new(intelligence));

    Ok(MainApp {
        service,
        host,
        stats,
    })
}

/// Remote lookups only; nothing on disk is opened or created.
pub fn init_intelligence(config: &Config, stats: Arc<SyncStats>) -> Result<NumberIntelligenceClient> {
    NumberIntelligenceClient::new(&config.intelligence, stats)
        .context("Failed to build number intelligence client")
}

/// The extension process only ever gets a read-only view of the container.
pub fn init_extension(config: &Config) -> CallDirectoryProvider {
    let container = SharedContainer::from_config(&config.storage);
    info!(
        "Extension '{}' reading {}",
        config.extension.identifier,
        container.store_path().display()
    );
    CallDirectoryProvider::new(Arc::new(container))
}
