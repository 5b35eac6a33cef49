use super::types::{AddOutcome, RemoveOutcome, StoreError};
use crate::number::PhoneNumber;

/// Read side of the block list. This is all the call-directory extension gets.
pub trait BlockListReader: Send + Sync {
    /// Blocked numbers in strictly ascending order, without duplicates.
    fn list(&self) -> Result<Vec<PhoneNumber>, StoreError>;

    fn contains(&self, number: PhoneNumber) -> Result<bool, StoreError> {
        Ok(self.list()?.binary_search(&number).is_ok())
    }
}

/// Mutating side, owned by the main application process.
///
/// Every mutation replaces the whole collection; a caller that gets `Ok` back
/// may assume the write is durable before it signals a reload.
pub trait BlockListStore: BlockListReader {
    fn add(&self, number: PhoneNumber) -> Result<AddOutcome, StoreError>;

    fn remove(&self, number: PhoneNumber) -> Result<RemoveOutcome, StoreError>;

    fn add_raw(&self, input: &str) -> Result<AddOutcome, StoreError> {
        self.add(PhoneNumber::parse(input)?)
    }

    fn remove_raw(&self, input: &str) -> Result<RemoveOutcome, StoreError> {
        self.remove(PhoneNumber::parse(input)?)
    }
}

/// Opens a fresh reader at extension-invocation time.
pub trait BlockListSource: Send + Sync {
    fn open_reader(&self) -> Result<Box<dyn BlockListReader>, StoreError>;
}
