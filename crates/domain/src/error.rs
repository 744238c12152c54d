//! Unified error types for the domain layer
//!
//! Invariant violations are rejected at the point of mutation; every fallible
//! method on a record returns one of these.

use thiserror::Error;

/// Unified error type for domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Validation failed (e.g., invalid field values)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Invalid ID format
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Parse error (for enumerations read from the wire or storage)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Slot already held by a different player
    #[error("Slot {seat} is already held by {holder}")]
    SlotTaken { seat: String, holder: String },

    /// State transition not allowed
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Creates a parse error for string-to-type conversion failures.
    ///
    /// Used by the `FromStr` implementations of the status and mode enums.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn invalid_state_transition(msg: impl Into<String>) -> Self {
        Self::InvalidStateTransition(msg.into())
    }

    pub fn slot_taken(seat: impl ToString, holder: impl ToString) -> Self {
        Self::SlotTaken {
            seat: seat.to_string(),
            holder: holder.to_string(),
        }
    }
}
