use super::provider::DirectoryError;
use crate::number::PhoneNumber;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntryRejected {
    #[error("entry {next} is not strictly greater than previous entry {previous}")]
    OutOfOrder {
        previous: PhoneNumber,
        next: PhoneNumber,
    },
}

/// The OS side of a single extension invocation.
///
/// `complete_request` and `cancel_request` take `self`, so a context is
/// finished exactly once.
pub trait CallDirectoryContext {
    type Output;

    fn add_blocking_entry(&mut self, number: PhoneNumber) -> Result<(), EntryRejected>;

    fn complete_request(self) -> Self::Output;

    fn cancel_request(self, error: DirectoryError) -> Self::Output;
}

/// Collects blocking entries and enforces the strictly increasing order the
/// telephony framework requires.
#[derive(Debug, Default)]
pub struct SequentialDirectory {
    entries: Vec<PhoneNumber>,
}

impl SequentialDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CallDirectoryContext for SequentialDirectory {
    type Output = Result<Vec<PhoneNumber>, DirectoryError>;

    fn add_blocking_entry(&mut self, number: PhoneNumber) -> Result<(), EntryRejected> {
        if let Some(&previous) = self.entries.last() {
            if number <= previous {
                return Err(EntryRejected::OutOfOrder {
                    previous,
                    next: number,
                });
            }
        }
        self.entries.push(number);
        Ok(())
    }

    fn complete_request(self) -> Self::Output {
        Ok(self.entries)
    }

    fn cancel_request(self, error: DirectoryError) -> Self::Output {
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(v: i64) -> PhoneNumber {
        PhoneNumber::try_from(v).unwrap()
    }

    #[test]
    fn test_rejects_equal_and_decreasing_entries() {
        let mut ctx = SequentialDirectory::new();
        ctx.add_blocking_entry(n(5)).unwrap();
        assert_eq!(
            ctx.add_blocking_entry(n(5)),
            Err(EntryRejected::OutOfOrder {
                previous: n(5),
                next: n(5)
            })
        );
        assert!(ctx.add_blocking_entry(n(4)).is_err());
        ctx.add_blocking_entry(n(6)).unwrap();
        assert_eq!(ctx.complete_request().unwrap(), vec![n(5), n(6)]);
    }
}
