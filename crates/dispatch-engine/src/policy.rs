//! Coordinator-level dispatch policy.

use dispatch_core::config::DEFAULT_REJECT_REASON_MIN_LEN;
use dispatch_core::ValidationError;
use dispatch_state::{RequestStatus, Trigger};

/// Input rules applied by the coordinator before a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchPolicy {
    /// Minimum rejection reason length in characters, after trimming.
    pub reject_reason_min_len: usize,
    /// Whether revert and reopen need a non-blank note. On by default.
    pub require_reversal_note: bool,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            reject_reason_min_len: DEFAULT_REJECT_REASON_MIN_LEN,
            require_reversal_note: true,
        }
    }
}

impl DispatchPolicy {
    /// Check a rejection reason and return it trimmed.
    pub fn check_reject_reason(&self, reason: &str) -> Result<String, ValidationError> {
        let trimmed = reason.trim();
        let actual = trimmed.chars().count();
        if actual < self.reject_reason_min_len {
            return Err(ValidationError::ReasonTooShort {
                min: self.reject_reason_min_len,
                actual,
            });
        }
        Ok(trimmed.to_string())
    }

    /// Check the note attached to a status update and return it trimmed
    /// (`None` when blank).
    pub fn check_update_note(
        &self,
        from: RequestStatus,
        trigger: Trigger,
        notes: Option<&str>,
    ) -> Result<Option<String>, ValidationError> {
        let note = notes.map(str::trim).filter(|n| !n.is_empty());
        if note.is_none() && trigger.is_reversal() && self.require_reversal_note {
            return Err(ValidationError::NoteRequired {
                from: from.as_str().to_string(),
            });
        }
        Ok(note.map(str::to_string))
    }
}
