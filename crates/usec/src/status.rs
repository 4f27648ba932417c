//! Aggregate result of multi-step operations.
//!
//! Multi-panel refreshes and chunked uploads attempt every step even after a
//! failure. [`Outcome`] keeps the count and every failure so the caller can
//! tell "all succeeded" from "some failed" and see which.

use crate::cdb::Opcode;
use crate::error::UsecError;

/// One failed step.
#[derive(Debug)]
pub struct Failure {
    /// Panel the step targeted.
    pub panel: usize,
    /// Step index within the operation (chunk number, or refresh position).
    pub step: usize,
    /// Why it failed.
    pub error: UsecError,
}

/// Accumulated status of an operation that does not short-circuit.
#[derive(Debug)]
pub struct Outcome {
    opcode: Opcode,
    attempted: usize,
    failures: Vec<Failure>,
}

impl Outcome {
    /// Empty outcome for steps issuing `opcode`.
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            attempted: 0,
            failures: Vec::new(),
        }
    }

    /// Record the result of one step and keep going.
    pub fn record<T>(&mut self, panel: usize, result: Result<T, UsecError>) {
        let step = self.attempted;
        self.attempted = self.attempted.saturating_add(1);
        if let Err(error) = result {
            self.failures.push(Failure { panel, step, error });
        }
    }

    /// True when every recorded step succeeded.
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of recorded steps.
    pub fn attempted(&self) -> usize {
        self.attempted
    }

    /// Number of failed steps.
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Failed steps in the order they were attempted.
    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    /// Panels with at least one failed step, in attempt order, deduplicated.
    pub fn failed_panels(&self) -> Vec<usize> {
        let mut panels: Vec<usize> = Vec::new();
        for failure in &self.failures {
            if !panels.contains(&failure.panel) {
                panels.push(failure.panel);
            }
        }
        panels
    }

    /// Collapse into a single result; the first failure becomes the source.
    pub fn into_result(self) -> Result<(), UsecError> {
        let failed = self.failures.len();
        match self.failures.into_iter().next() {
            None => Ok(()),
            Some(first) => Err(UsecError::Partial {
                panel: first.panel,
                opcode: self.opcode,
                failed,
                attempted: self.attempted,
                source: Box::new(first.error),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn empty_outcome_is_ok() {
        let outcome = Outcome::new(Opcode::DisplayArea);
        assert!(outcome.is_ok());
        assert_eq!(outcome.attempted(), 0);
        outcome.into_result().unwrap();
    }

    #[test]
    fn failures_do_not_stop_counting() {
        let mut outcome = Outcome::new(Opcode::DisplayArea);
        outcome.record(0, Ok(()));
        outcome.record(1, Err::<(), _>(UsecError::Closed));
        outcome.record(3, Ok(()));
        outcome.record(2, Err::<(), _>(UsecError::InvalidPanel(9)));

        assert!(!outcome.is_ok());
        assert_eq!(outcome.attempted(), 4);
        assert_eq!(outcome.failed(), 2);
        assert_eq!(outcome.failed_panels(), vec![1, 2]);
        assert_eq!(outcome.failures().get(1).map(|f| f.step), Some(3));

        match outcome.into_result() {
            Err(UsecError::Partial {
                panel,
                failed,
                attempted,
                source,
                ..
            }) => {
                assert_eq!((panel, failed, attempted), (1, 2, 4));
                assert!(matches!(*source, UsecError::Closed));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
