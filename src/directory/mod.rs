mod context;
mod provider;

pub use context::{CallDirectoryContext, EntryRejected, SequentialDirectory};
pub use provider::{CallDirectoryProvider, DirectoryError, Invocation, RequestState};
