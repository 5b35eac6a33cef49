use super::traits::{BlockListReader, BlockListSource, BlockListStore};
use super::types::{insert_sorted, remove_sorted, AddOutcome, RemoveOutcome, StoreError};
use crate::number::PhoneNumber;
use std::sync::{Arc, PoisonError, RwLock};

/// Process-local block list with the same contract as the SQLite store.
///
/// Cloning shares the underlying collection; each mutation swaps in a new
/// `Arc<Vec<_>>`, so a reader holding a snapshot never sees a half-applied
/// change.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlockList {
    numbers: Arc<RwLock<Arc<Vec<PhoneNumber>>>>,
}

impl MemoryBlockList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<Vec<PhoneNumber>> {
        self.numbers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace_with<T>(&self, apply: impl FnOnce(&mut Vec<PhoneNumber>) -> T) -> T {
        let mut guard = self.numbers.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.as_ref().clone();
        let outcome = apply(&mut next);
        *guard = Arc::new(next);
        outcome
    }
}

impl BlockListReader for MemoryBlockList {
    fn list(&self) -> Result<Vec<PhoneNumber>, StoreError> {
        Ok(self.snapshot().as_ref().clone())
    }
}

impl BlockListStore for MemoryBlockList {
    fn add(&self, number: PhoneNumber) -> Result<AddOutcome, StoreError> {
        Ok(self.replace_with(|numbers| insert_sorted(numbers, number)))
    }

    fn remove(&self, number: PhoneNumber) -> Result<RemoveOutcome, StoreError> {
        Ok(self.replace_with(|numbers| remove_sorted(numbers, number)))
    }
}

impl BlockListSource for MemoryBlockList {
    fn open_reader(&self) -> Result<Box<dyn BlockListReader>, StoreError> {
        Ok(Box::new(self.clone()))
    }
}
