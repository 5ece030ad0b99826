/// Storage layer for persisting lessons and skill snapshots
///
/// This module handles all database operations using SQLite. It provides
/// a clean interface for the catalog and for the per-learner snapshot
/// record that the progression engine reads and conditionally replaces.

pub mod sqlite;
pub mod migrations;

// Re-export the main storage types
pub use sqlite::*;

use thiserror::Error;
use crate::domain::{LearnerId, Lesson, LessonId, SkillSnapshot};

/// Maximum number of ids bound into a single batched lookup query
pub const LOOKUP_BATCH_SIZE: usize = 100;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database query error: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Lesson not found: {lesson_id}")]
    LessonNotFound { lesson_id: String },

    #[error("Duplicate lesson: {lesson_id} already exists")]
    DuplicateLesson { lesson_id: String },

    #[error("Skill snapshot for learner {learner_id} changed concurrently (expected revision {expected})")]
    RevisionConflict { learner_id: String, expected: u64 },

    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    #[error("Migration error: {0}")]
    Migration(String),
}

/// Trait defining the storage interface for the progression engine
///
/// Snapshot writes are conditional: a write names the revision it was
/// computed from and fails with `RevisionConflict` if another write got
/// there first. That is what keeps two completions for the same learner
/// from overwriting each other.
pub trait ProgressStorage {
    /// Create a new lesson
    fn create_lesson(&self, lesson: &Lesson) -> Result<(), StorageError>;

    /// Get a lesson by ID
    fn get_lesson(&self, lesson_id: &LessonId) -> Result<Lesson, StorageError>;

    /// Replace an existing lesson
    fn update_lesson(&self, lesson: &Lesson) -> Result<(), StorageError>;

    /// Remove a lesson from the catalog
    fn delete_lesson(&self, lesson_id: &LessonId) -> Result<(), StorageError>;

    /// List lessons ordered by `order` ascending
    fn list_lessons(&self, active_only: bool) -> Result<Vec<Lesson>, StorageError>;

    /// List the active lessons ordered by `order` ascending
    fn list_active_lessons(&self) -> Result<Vec<Lesson>, StorageError> {
        self.list_lessons(true)
    }

    /// Look up lessons by id, in batches; unknown ids are skipped
    fn get_lessons_by_ids(&self, lesson_ids: &[LessonId]) -> Result<Vec<Lesson>, StorageError>;

    /// Read a learner's snapshot; `None` if the learner has no record yet
    fn read_skill_snapshot(&self, learner_id: &LearnerId)
        -> Result<Option<SkillSnapshot>, StorageError>;

    /// Replace a learner's snapshot if its stored revision is still
    /// `expected_revision` (0 meaning "no record yet"); returns the new
    /// revision
    fn write_skill_snapshot(
        &self,
        learner_id: &LearnerId,
        snapshot: &SkillSnapshot,
        expected_revision: u64,
    ) -> Result<u64, StorageError>;

    /// Create the zero-valued record if missing and return the stored one
    fn ensure_skill_snapshot(&self, learner_id: &LearnerId) -> Result<SkillSnapshot, StorageError>;
}
