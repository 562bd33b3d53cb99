// Typed errors with thiserror. Surface meaningful messages to JS.

use thiserror::Error;

use crate::types::{CategoryId, Degrees, SessionId};

/// A wheel face that cannot be spun. Returned synchronously from `start_spin`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("You need at least {min} categories to spin the wheel (found {found})")]
    TooFewCategories { min: usize, found: usize },

    #[error("You can have at most {max} categories (found {found})")]
    TooManyCategories { max: usize, found: usize },

    #[error("Category {index}: name is required")]
    EmptyName { index: usize },

    #[error("Category {index}: name must be at most {max} characters")]
    NameTooLong { index: usize, max: usize },

    #[error("Category {index}: rarity {weight} must be between {min} and {max}")]
    WeightOutOfRange {
        index: usize,
        weight: u32,
        min: u32,
        max: u32,
    },

    #[error("Category {index}: id {id} is already used on this wheel")]
    DuplicateId { index: usize, id: CategoryId },
}

/// Engine error types.
#[derive(Error, Debug)]
pub enum WheelError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Selection and resolution disagree. A defect in the landing math.
    #[error("Session {session}: selected {expected} but the landing angle {angle} resolves to {resolved}")]
    InvariantViolation {
        session: SessionId,
        expected: CategoryId,
        resolved: CategoryId,
        angle: Degrees,
    },

    /// Machine bookkeeping is inconsistent with its phase.
    #[error("Invalid engine state: {0}")]
    InvalidState(String),

    #[error("Category {0} is not on this wheel")]
    UnknownCategory(CategoryId),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for WheelError {
    fn from(err: serde_json::Error) -> Self {
        WheelError::Serialization(err.to_string())
    }
}
