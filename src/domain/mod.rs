/// Domain module containing the progression rules and data types
///
/// This module defines the core entities (Lesson, SkillSnapshot) and the
/// pure logic that gates lessons and applies completions. Nothing in here
/// performs I/O.

pub mod catalog;
pub mod clock;
pub mod lesson;
pub mod progression;
pub mod snapshot;
pub mod streak;
pub mod types;

// Re-export public types for easy access
pub use catalog::*;
pub use clock::*;
pub use lesson::*;
pub use progression::*;
pub use snapshot::*;
pub use streak::*;
pub use types::*;

use thiserror::Error;

/// Errors that can occur during domain operations
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid reward: {0}")]
    InvalidReward(String),

    #[error("Invalid skill threshold: {0}")]
    InvalidThreshold(String),

    #[error("Invalid level: {0}")]
    InvalidLevel(String),

    #[error("Invalid identifier: {0}")]
    InvalidId(String),
}
