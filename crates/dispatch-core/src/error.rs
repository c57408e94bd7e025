//! # Validation Errors
//!
//! Input constraint violations raised by domain primitives and by the
//! dispatch operations that accept free text. Each variant carries the
//! offending value and the expected constraint so the message can be shown
//! to a user without further context.

use thiserror::Error;

/// Validation errors for domain primitives and operation inputs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Latitude is not a finite number in [-90, 90].
    #[error("invalid latitude {0} (expected a finite value in [-90, 90])")]
    InvalidLatitude(f64),

    /// Longitude is not a finite number in [-180, 180].
    #[error("invalid longitude {0} (expected a finite value in [-180, 180])")]
    InvalidLongitude(f64),

    /// Rating outside the 1–5 scale.
    #[error("invalid rating {0} (expected an integer from 1 to 5)")]
    InvalidRating(i64),

    /// Rejection reason shorter than the configured minimum.
    #[error("rejection reason must be at least {min} characters (got {actual})")]
    ReasonTooShort {
        /// Minimum accepted length in characters.
        min: usize,
        /// Length of the provided reason after trimming.
        actual: usize,
    },

    /// A reversal transition was attempted without an explanatory note.
    #[error("a note is required when moving a request back from {from}")]
    NoteRequired {
        /// Status the request is being moved back from.
        from: String,
    },

    /// Request number is empty or whitespace.
    #[error("request number must be non-empty")]
    BlankRequestNumber,

    /// Free-text field exceeds its maximum length.
    #[error("{field} must not exceed {max} characters")]
    TooLong {
        /// Field name.
        field: &'static str,
        /// Maximum accepted length in characters.
        max: usize,
    },

    /// A required text field is empty.
    #[error("{0} must be non-empty")]
    Required(&'static str),
}
