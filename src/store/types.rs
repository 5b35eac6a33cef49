use crate::number::{InvalidNumber, PhoneNumber};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotPresent,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    InvalidNumber(#[from] InvalidNumber),

    #[error("shared storage unavailable at {path}: {reason}")]
    Unavailable { path: PathBuf, reason: String },

    #[error("block list store does not exist at {0}")]
    Missing(PathBuf),

    #[error("collection '{key}' holds undecodable data")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("collection '{key}' could not be encoded")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("block list backend error: {0}")]
    Backend(#[from] rusqlite::Error),
}

impl StoreError {
    /// Whether the store simply has not been created yet.
    pub fn is_missing(&self) -> bool {
        matches!(self, StoreError::Missing(_))
    }
}

/// Decodes a persisted collection into its canonical form.
///
/// Older writers appended numbers in insertion order, so anything read back is
/// sorted and deduplicated before it leaves the store.
pub(crate) fn decode_collection(key: &str, raw: &str) -> Result<Vec<PhoneNumber>, StoreError> {
    let mut numbers: Vec<PhoneNumber> =
        serde_json::from_str(raw).map_err(|source| StoreError::Corrupt {
            key: key.to_string(),
            source,
        })?;
    numbers.sort_unstable();
    numbers.dedup();
    Ok(numbers)
}

pub(crate) fn encode_collection(key: &str, numbers: &[PhoneNumber]) -> Result<String, StoreError> {
    serde_json::to_string(numbers).map_err(|source| StoreError::Encode {
        key: key.to_string(),
        source,
    })
}

/// Inserts into a sorted, deduplicated collection.
pub(crate) fn insert_sorted(numbers: &mut Vec<PhoneNumber>, number: PhoneNumber) -> AddOutcome {
    match numbers.binary_search(&number) {
        Ok(_) => AddOutcome::AlreadyPresent,
        Err(idx) => {
            numbers.insert(idx, number);
            AddOutcome::Added
        }
    }
}

pub(crate) fn remove_sorted(numbers: &mut Vec<PhoneNumber>, number: PhoneNumber) -> RemoveOutcome {
    match numbers.binary_search(&number) {
        Ok(idx) => {
            numbers.remove(idx);
            RemoveOutcome::Removed
        }
        Err(_) => RemoveOutcome::NotPresent,
    }
}
