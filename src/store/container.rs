use super::sqlite::SqliteBlockList;
use super::traits::{BlockListReader, BlockListSource};
use super::types::StoreError;
use crate::config::StorageConfig;
use std::path::PathBuf;

pub const STORE_FILE_NAME: &str = "blocklist.sqlite";

/// A directory shared by the app and its extension, scoped by a group id.
///
/// Both processes build the same `SharedContainer` from configuration and
/// therefore resolve the same store path without any global state.
#[derive(Debug, Clone)]
pub struct SharedContainer {
    root: PathBuf,
    group_id: String,
    collection_key: String,
}

impl SharedContainer {
    pub fn new(
        root: impl Into<PathBuf>,
        group_id: impl Into<String>,
        collection_key: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            group_id: group_id.into(),
            collection_key: collection_key.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(
            &config.container_root,
            &config.group_id,
            &config.collection_key,
        )
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn collection_key(&self) -> &str {
        &self.collection_key
    }

    pub fn directory(&self) -> PathBuf {
        self.root.join(&self.group_id)
    }

    pub fn store_path(&self) -> PathBuf {
        self.directory().join(STORE_FILE_NAME)
    }

    /// Main-process entry point: creates the container on first run.
    pub fn open_store(&self) -> Result<SqliteBlockList, StoreError> {
        let dir = self.directory();
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::Unavailable {
            path: dir.clone(),
            reason: e.to_string(),
        })?;
        SqliteBlockList::open(self.store_path(), &self.collection_key)
    }

    /// Extension entry point: never creates anything.
    pub fn open_store_read_only(&self) -> Result<SqliteBlockList, StoreError> {
        SqliteBlockList::open_read_only(self.store_path(), &self.collection_key)
    }
}

impl BlockListSource for SharedContainer {
    fn open_reader(&self) -> Result<Box<dyn BlockListReader>, StoreError> {
        Ok(Box::new(self.open_store_read_only()?))
    }
}
