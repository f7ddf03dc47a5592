//! Bounded source of sequential task identifiers.

use crate::error::TaskError;

/// Hands out 1, 2, ... up to (but excluding) `bound`, then fails forever.
#[derive(Debug)]
pub struct IdSource {
    next: u32,
    bound: u32,
}

impl IdSource {
    pub const fn new(bound: u32) -> Self {
        Self { next: 1, bound }
    }

    pub fn next_id(&mut self) -> Result<u32, TaskError> {
        if self.next >= self.bound {
            return Err(TaskError::ExhaustedIdentifierSource { bound: self.bound });
        }
        let id = self.next;
        self.next += 1;
        Ok(id)
    }

    /// Number of identifiers handed out so far.
    pub fn issued(&self) -> u32 {
        self.next - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential_from_one() {
        let mut ids = IdSource::new(10);
        let got: Vec<u32> = (0..5).map(|_| ids.next_id().expect("exhausted")).collect();
        assert_eq!(got, vec![1, 2, 3, 4, 5]);
        assert_eq!(ids.issued(), 5);
    }

    #[test]
    fn tenth_request_is_exhausted() {
        let mut ids = IdSource::new(10);
        for expected in 1..=9 {
            assert_eq!(ids.next_id(), Ok(expected));
        }
        assert_eq!(
            ids.next_id(),
            Err(TaskError::ExhaustedIdentifierSource { bound: 10 })
        );
        // Stays exhausted; nothing wraps around.
        assert!(ids.next_id().is_err());
        assert_eq!(ids.issued(), 9);
    }

    #[test]
    fn tiny_bounds_issue_nothing() {
        assert!(IdSource::new(0).next_id().is_err());
        assert!(IdSource::new(1).next_id().is_err());
        assert_eq!(IdSource::new(1).issued(), 0);
    }
}
