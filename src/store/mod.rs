mod container;
mod memory;
mod sqlite;
mod traits;
mod types;

pub use container::{SharedContainer, STORE_FILE_NAME};
pub use memory::MemoryBlockList;
pub use sqlite::SqliteBlockList;
pub use traits::{BlockListReader, BlockListSource, BlockListStore};
pub use types::{AddOutcome, RemoveOutcome, StoreError};
