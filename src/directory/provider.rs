use super::context::{CallDirectoryContext, EntryRejected};
use crate::number::PhoneNumber;
use crate::store::{BlockListSource, StoreError};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("block list store is unreadable: {0}")]
    StoreUnreadable(#[source] StoreError),

    #[error("call directory rejected an entry: {0}")]
    EntryRejected(#[from] EntryRejected),
}

/// Lifecycle of one extension invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Started,
    Populating { emitted: usize },
    Completed { emitted: usize },
    Cancelled { emitted: usize },
}

impl RequestState {
    fn emitted(self) -> usize {
        match self {
            RequestState::Started => 0,
            RequestState::Populating { emitted }
            | RequestState::Completed { emitted }
            | RequestState::Cancelled { emitted } => emitted,
        }
    }
}

/// Final state of an invocation together with whatever the context produced.
#[derive(Debug)]
pub struct Invocation<T> {
    pub state: RequestState,
    pub output: T,
}

/// Extension-side reader: turns the shared block list into blocking entries.
///
/// It never writes. Ordering is the store's job; if the store hands back a bad
/// sequence the context rejects it and the request is cancelled.
pub struct CallDirectoryProvider {
    source: Arc<dyn BlockListSource>,
}

impl CallDirectoryProvider {
    pub fn new(source: Arc<dyn BlockListSource>) -> Self {
        Self { source }
    }

    pub fn begin_request<C: CallDirectoryContext>(&self, mut context: C) -> Invocation<C::Output> {
        let mut state = RequestState::Started;
        debug!("Call directory request started");

        let numbers = match self.load() {
            Ok(numbers) => numbers,
            Err(e) => {
                warn!("Cancelling call directory request: {}", e);
                return Self::cancel(state, context, DirectoryError::StoreUnreadable(e));
            }
        };

        state = RequestState::Populating { emitted: 0 };
        for number in numbers {
            if let Err(e) = context.add_blocking_entry(number) {
                warn!("Cancelling call directory request: {}", e);
                return Self::cancel(state, context, e.into());
            }
            state = RequestState::Populating {
                emitted: state.emitted() + 1,
            };
        }

        let emitted = state.emitted();
        info!("Call directory request completed with {} entries", emitted);
        Invocation {
            state: RequestState::Completed { emitted },
            output: context.complete_request(),
        }
    }

    /// An absent store means nothing has been blocked yet.
    fn load(&self) -> Result<Vec<PhoneNumber>, StoreError> {
        match self.source.open_reader() {
            Ok(reader) => reader.list(),
            Err(e) if e.is_missing() => {
                info!("No block list store yet; publishing an empty directory");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    fn cancel<C: CallDirectoryContext>(
        state: RequestState,
        context: C,
        error: DirectoryError,
    ) -> Invocation<C::Output> {
        Invocation {
            state: RequestState::Cancelled {
                emitted: state.emitted(),
            },
            output: context.cancel_request(error),
        }
    }
}
