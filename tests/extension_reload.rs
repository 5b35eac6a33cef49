use scamshield::blocker::{BlockPolicy, BlockService, Propagation};
use scamshield::bridge::{
    ExtensionBridge, ExtensionHost, HostError, LocalExtensionHost, ReloadError, RetryPolicy,
};
use scamshield::directory::{CallDirectoryProvider, RequestState, SequentialDirectory};
use scamshield::stats::SyncStats;
use scamshield::store::{AddOutcome, BlockListReader, BlockListStore, RemoveOutcome, SharedContainer};
use std::sync::Arc;
use std::time::Duration;

const EXTENSION_ID: &str = "T.ScamShield.MyAppCallDirectory";

fn container(dir: &tempfile::TempDir) -> SharedContainer {
    SharedContainer::new(dir.path(), "group.com.T.scamshield", "BlockedNumbers")
}

fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(60),
        max_backoff: Duration::from_millis(240),
    }
}

fn spawn_host(
    shared: &SharedContainer,
    min_interval: Duration,
    stats: &Arc<SyncStats>,
) -> Arc<LocalExtensionHost> {
    let provider = CallDirectoryProvider::new(Arc::new(shared.clone()));
    Arc::new(LocalExtensionHost::spawn(
        EXTENSION_ID,
        provider,
        min_interval,
        stats.clone(),
    ))
}

fn bridge(host: Arc<dyn ExtensionHost>, extension_id: &str, stats: &Arc<SyncStats>) -> ExtensionBridge {
    ExtensionBridge::new(
        host,
        extension_id,
        Duration::from_secs(5),
        fast_retry(5),
        stats.clone(),
    )
}

fn policy() -> BlockPolicy {
    BlockPolicy {
        min_risk_score: 70,
        min_times_reported: 1,
    }
}

fn as_ints(numbers: &[scamshield::number::PhoneNumber]) -> Vec<i64> {
    numbers.iter().map(|n| n.as_i64()).collect()
}

#[tokio::test]
async fn test_block_reaches_extension_in_sorted_position() {
    let dir = tempfile::tempdir().unwrap();
    let shared = container(&dir);
    let store = Arc::new(shared.open_store().unwrap());
    store.add_raw("94779999999").unwrap();
    store.add_raw("94771234567").unwrap();

    let stats = SyncStats::new();
    let host = spawn_host(&shared, Duration::ZERO, &stats);
    let service = BlockService::new(
        store.clone(),
        bridge(host.clone(), EXTENSION_ID, &stats),
        policy(),
        stats.clone(),
    );

    let outcome = service.block("+94 77 000 0001").await.unwrap();
    assert_eq!(outcome.change, AddOutcome::Added);
    assert_eq!(outcome.propagation, Propagation::Applied);

    let expected = vec![94770000001, 94771234567, 94779999999];
    assert_eq!(as_ints(&host.applied_directory()), expected);
    assert_eq!(as_ints(&service.list().await.unwrap()), expected);

    // A later, independent extension run sees the same sequence.
    let extension = CallDirectoryProvider::new(Arc::new(container(&dir)));
    let invocation = extension.begin_request(SequentialDirectory::new());
    assert_eq!(invocation.state, RequestState::Completed { emitted: 3 });
    assert_eq!(as_ints(&invocation.output.unwrap()), expected);
}

#[tokio::test]
async fn test_unblock_propagates_removal() {
    let dir = tempfile::tempdir().unwrap();
    let shared = container(&dir);
    let store = Arc::new(shared.open_store().unwrap());
    let stats = SyncStats::new();
    let host = spawn_host(&shared, Duration::ZERO, &stats);
    let service = BlockService::new(
        store,
        bridge(host.clone(), EXTENSION_ID, &stats),
        policy(),
        stats.clone(),
    );

    service.block("94771234567").await.unwrap();
    service.block("94771234567").await.unwrap();
    assert_eq!(as_ints(&host.applied_directory()), vec![94771234567]);

    let outcome = service.unblock("94771234567").await.unwrap();
    assert_eq!(outcome.propagation, Propagation::Applied);
    assert!(host.applied_directory().is_empty());
    assert_eq!(stats.snapshot().mutations, 3);
}

#[tokio::test]
async fn test_mutations_apply_in_issue_order() {
    let dir = tempfile::tempdir().unwrap();
    let shared = container(&dir);
    let store = Arc::new(shared.open_store().unwrap());
    let stats = SyncStats::new();
    let host = spawn_host(&shared, Duration::ZERO, &stats);
    let service = BlockService::new(
        store.clone(),
        bridge(host.clone(), EXTENSION_ID, &stats),
        policy(),
        stats.clone(),
    );

    let (blocked, unblocked) = tokio::join!(
        service.block("94771234567"),
        service.unblock("94771234567")
    );
    assert_eq!(blocked.unwrap().change, AddOutcome::Added);
    assert_eq!(unblocked.unwrap().change, RemoveOutcome::Removed);
    assert!(store.list().unwrap().is_empty());
    assert!(host.applied_directory().is_empty());

    let (unblocked, blocked) = tokio::join!(
        service.unblock("94771234567"),
        service.block("94771234567")
    );
    assert_eq!(unblocked.unwrap().change, RemoveOutcome::NotPresent);
    assert_eq!(blocked.unwrap().change, AddOutcome::Added);
    assert_eq!(as_ints(&store.list().unwrap()), vec![94771234567]);
    assert_eq!(as_ints(&host.applied_directory()), vec![94771234567]);
    assert_eq!(stats.snapshot().mutations, 4);
}

#[tokio::test]
async fn test_empty_container_reload_publishes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let shared = container(&dir);
    let stats = SyncStats::new();
    let host = spawn_host(&shared, Duration::ZERO, &stats);

    bridge(host.clone(), EXTENSION_ID, &stats)
        .reload()
        .await
        .unwrap();

    assert!(host.applied_directory().is_empty());
    assert!(!shared.store_path().exists());
}

#[tokio::test]
async fn test_concurrent_reloads_may_coalesce() {
    let dir = tempfile::tempdir().unwrap();
    let shared = container(&dir);
    shared.open_store().unwrap().add_raw("94771234567").unwrap();
    let stats = SyncStats::new();
    let host = spawn_host(&shared, Duration::ZERO, &stats);
    let bridge = Arc::new(bridge(host.clone(), EXTENSION_ID, &stats));

    let tasks: Vec<_> = (0..20)
        .map(|_| {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.reload().await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.reloads_requested, 20);
    assert_eq!(snapshot.reloads_succeeded, 20);
    assert!(snapshot.extension_invocations >= 1);
    assert!(snapshot.extension_invocations <= 20);
    assert_eq!(as_ints(&host.applied_directory()), vec![94771234567]);
}

#[tokio::test]
async fn test_rate_limited_reload_is_retried() {
    let dir = tempfile::tempdir().unwrap();
    let shared = container(&dir);
    let stats = SyncStats::new();
    let host = spawn_host(&shared, Duration::from_millis(100), &stats);
    let bridge = bridge(host.clone(), EXTENSION_ID, &stats);

    // Straight at the host: the second signal inside the window is refused.
    let direct = scamshield::bridge::ReloadRequest {
        extension_id: EXTENSION_ID.to_string(),
        attempt: 1,
    };
    host.reload_extension(&direct).await.unwrap();
    assert_eq!(
        host.reload_extension(&direct).await,
        Err(HostError::RateLimited)
    );

    // Through the bridge the refusal is absorbed by backoff.
    bridge.reload().await.unwrap();
    assert_eq!(stats.snapshot().reloads_succeeded, 1);
}

#[tokio::test]
async fn test_failed_reload_keeps_the_mutation() {
    let dir = tempfile::tempdir().unwrap();
    let shared = container(&dir);
    let store = Arc::new(shared.open_store().unwrap());
    let stats = SyncStats::new();
    let host = spawn_host(&shared, Duration::ZERO, &stats);

    // Signalling an identifier the host does not know about always fails.
    let service = BlockService::new(
        store.clone(),
        bridge(host.clone(), "some.other.Extension", &stats),
        policy(),
        stats.clone(),
    );

    let outcome = service.block("94771234567").await.unwrap();
    match outcome.propagation {
        Propagation::Pending(ReloadError::Declined {
            attempts, source, ..
        }) => {
            assert_eq!(attempts, 1);
            assert_eq!(
                source,
                HostError::UnknownExtension("some.other.Extension".to_string())
            );
        }
        other => panic!("expected a pending propagation, got {:?}", other),
    }

    assert!(host.applied_directory().is_empty());
    assert_eq!(as_ints(&store.list().unwrap()), vec![94771234567]);
    assert_eq!(stats.snapshot().reloads_failed, 1);
}

#[tokio::test]
async fn test_unreadable_store_cancels_extension_request() {
    let dir = tempfile::tempdir().unwrap();
    let shared = container(&dir);
    shared.open_store().unwrap();
    // Replace the database with something SQLite cannot read.
    std::fs::write(shared.store_path(), vec![0x5a_u8; 4096]).unwrap();
    for suffix in ["-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{}", shared.store_path().display(), suffix));
    }

    let stats = SyncStats::new();
    let host = spawn_host(&shared, Duration::ZERO, &stats);
    let err = ExtensionBridge::new(
        host.clone(),
        EXTENSION_ID,
        Duration::from_secs(5),
        fast_retry(2),
        stats.clone(),
    )
    .reload()
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        ReloadError::Declined {
            attempts: 2,
            source: HostError::Cancelled(_),
            ..
        }
    ));
    assert_eq!(stats.snapshot().extension_invocations, 2);
}
