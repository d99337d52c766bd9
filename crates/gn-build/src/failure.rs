use std::sync::{Mutex, PoisonError};

use tracing::warn;

use crate::BuildError;

/// Keeps the first error of a run.
///
/// Recording never blocks beyond a short critical section. Every error after
/// the first is logged and dropped; only one failure is ever reported.
#[derive(Debug, Default)]
pub struct FailureSlot {
    first: Mutex<Option<BuildError>>,
}

impl FailureSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `error` became the reported failure.
    pub fn record(&self, error: BuildError) -> bool {
        let mut first = self.first.lock().unwrap_or_else(PoisonError::into_inner);
        if first.is_none() {
            warn!(error = %error, "recorded failure");
            *first = Some(error);
            true
        } else {
            warn!(error = %error, "discarding failure, an earlier one will be reported");
            false
        }
    }

    pub fn take(&self) -> Option<BuildError> {
        self.first
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}
