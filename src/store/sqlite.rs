use super::traits::{BlockListReader, BlockListStore};
use super::types::{
    decode_collection, encode_collection, insert_sorted, remove_sorted, AddOutcome,
    RemoveOutcome, StoreError,
};
use crate::number::PhoneNumber;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Block list persisted as a single JSON collection row in SQLite.
///
/// Both the main process and the extension open the same file. Mutations run
/// inside an IMMEDIATE transaction and replace the whole value, so a reader in
/// the other process sees either the old or the new collection.
#[derive(Debug)]
pub struct SqliteBlockList {
    db_path: PathBuf,
    collection: String,
    read_only: bool,
    conn: Mutex<Connection>,
}

impl SqliteBlockList {
    /// Opens (creating if needed) the store for reading and writing.
    pub fn open(db_path: impl Into<PathBuf>, collection: impl Into<String>) -> Result<Self, StoreError> {
        let db_path = db_path.into();
        let conn = Connection::open(&db_path).map_err(|e| unavailable(&db_path, e))?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let store = Self {
            db_path,
            collection: collection.into(),
            read_only: false,
            conn: Mutex::new(conn),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Opens an existing store without ever creating or writing it.
    pub fn open_read_only(
        db_path: impl Into<PathBuf>,
        collection: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let db_path = db_path.into();
        if !db_path.exists() {
            return Err(StoreError::Missing(db_path));
        }
        let conn = Connection::open_with_flags(
            &db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| unavailable(&db_path, e))?;
        conn.busy_timeout(Duration::from_secs(5))?;

        Ok(Self {
            db_path,
            collection: collection.into(),
            read_only: true,
            conn: Mutex::new(conn),
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn initialize(&self) -> Result<(), StoreError> {
        let conn = self.lock();
        conn.execute(
            "CREATE TABLE IF NOT EXISTS collections (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;
        info!("Block list store initialized at {}", self.db_path.display());
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_collection(&self, conn: &Connection) -> Result<Vec<PhoneNumber>, StoreError> {
        let raw: Option<String> = conn
            .prepare_cached("SELECT value FROM collections WHERE key = ?1")?
            .query_row(params![self.collection], |row| row.get(0))
            .optional()?;

        match raw {
            Some(raw) => decode_collection(&self.collection, &raw),
            None => Ok(Vec::new()),
        }
    }

    /// Read-modify-replace of the whole collection in one write transaction.
    fn replace_with<T>(&self, apply: impl FnOnce(&mut Vec<PhoneNumber>) -> T) -> Result<T, StoreError> {
        if self.read_only {
            return Err(StoreError::Unavailable {
                path: self.db_path.clone(),
                reason: "store was opened read-only".to_string(),
            });
        }

        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut numbers = self.read_collection(&tx)?;
        let outcome = apply(&mut numbers);
        let encoded = encode_collection(&self.collection, &numbers)?;

        tx.execute(
            "INSERT INTO collections (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![self.collection, encoded, unix_now()],
        )?;
        tx.commit()?;

        debug!(
            "Collection '{}' replaced ({} numbers)",
            self.collection,
            numbers.len()
        );
        Ok(outcome)
    }
}

impl BlockListReader for SqliteBlockList {
    fn list(&self) -> Result<Vec<PhoneNumber>, StoreError> {
        let conn = self.lock();
        self.read_collection(&conn)
    }
}

impl BlockListStore for SqliteBlockList {
    fn add(&self, number: PhoneNumber) -> Result<AddOutcome, StoreError> {
        self.replace_with(|numbers| insert_sorted(numbers, number))
    }

    fn remove(&self, number: PhoneNumber) -> Result<RemoveOutcome, StoreError> {
        self.replace_with(|numbers| remove_sorted(numbers, number))
    }
}

fn unavailable(path: &Path, e: rusqlite::Error) -> StoreError {
    StoreError::Unavailable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
