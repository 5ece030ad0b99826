/// Progression engine
///
/// Ties the pure catalog and progression rules to a storage backend. The
/// engine owns the read-modify-write cycle for a completion: it reads the
/// snapshot, computes the update, and writes it back conditionally on the
/// revision it read, retrying from a fresh read when another write won.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{
    apply_completion, lesson_path, select_available, DomainError, LearnerId, Lesson, LessonId,
    LessonStatus, Skill, SkillGap, SkillSnapshot, StreakTransition,
};
use crate::storage::{ProgressStorage, StorageError};

/// Default number of attempts before a contended completion gives up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Errors that can occur while running a progression operation
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Gave up completing lesson for learner {learner_id} after {attempts} conflicting attempts")]
    ConflictRetriesExhausted { learner_id: String, attempts: u32 },
}

/// Engine settings
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Attempts at the conditional write before reporting a conflict
    pub max_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_MAX_ATTEMPTS }
    }
}

/// Result of a persisted completion
#[derive(Debug, Clone, Serialize)]
pub struct CompletionOutcome {
    pub previous: SkillSnapshot,
    pub updated: SkillSnapshot,
    pub streak_transition: StreakTransition,
    /// Skills whose level went up
    pub improved_skills: Vec<Skill>,
    /// False when the lesson was already in the completed set
    pub newly_completed: bool,
}

/// A lesson on the learner's path, owned for returning across layers
#[derive(Debug, Clone, Serialize)]
pub struct PathItem {
    pub lesson: Lesson,
    pub status: LessonStatus,
    pub missing: Vec<SkillGap>,
}

/// Runs catalog and progression operations against a storage backend
#[derive(Debug, Clone, Default)]
pub struct ProgressionEngine {
    config: EngineConfig,
}

impl ProgressionEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Read a learner's snapshot, substituting the zero-valued default for a
    /// learner with no record
    pub fn load_snapshot<S: ProgressStorage>(
        &self,
        storage: &S,
        learner_id: &LearnerId,
    ) -> Result<SkillSnapshot, EngineError> {
        let snapshot = storage
            .read_skill_snapshot(learner_id)?
            .unwrap_or_else(|| SkillSnapshot::new(learner_id.clone()));
        Ok(snapshot)
    }

    /// Lessons the learner can attempt now, in catalog order
    pub fn available_lessons<S: ProgressStorage>(
        &self,
        storage: &S,
        learner_id: &LearnerId,
    ) -> Result<Vec<Lesson>, EngineError> {
        let snapshot = self.load_snapshot(storage, learner_id)?;
        let lessons = storage.list_active_lessons()?;
        let available: Vec<Lesson> = select_available(&snapshot, &lessons)
            .into_iter()
            .cloned()
            .collect();

        debug!(
            "Learner {} has {} of {} active lessons available",
            learner_id,
            available.len(),
            lessons.len()
        );
        Ok(available)
    }

    /// Every active lesson with its status for the learner
    pub fn learning_path<S: ProgressStorage>(
        &self,
        storage: &S,
        learner_id: &LearnerId,
    ) -> Result<Vec<PathItem>, EngineError> {
        let snapshot = self.load_snapshot(storage, learner_id)?;
        let lessons = storage.list_active_lessons()?;

        Ok(lesson_path(&snapshot, &lessons)
            .into_iter()
            .map(|entry| PathItem {
                lesson: entry.lesson.clone(),
                status: entry.status,
                missing: entry.missing,
            })
            .collect())
    }

    /// Lessons the learner has completed that still exist in the catalog
    pub fn completed_lessons<S: ProgressStorage>(
        &self,
        storage: &S,
        snapshot: &SkillSnapshot,
    ) -> Result<Vec<Lesson>, EngineError> {
        if snapshot.completed_lessons.is_empty() {
            return Ok(Vec::new());
        }
        Ok(storage.get_lessons_by_ids(&snapshot.completed_ids())?)
    }

    /// Complete a lesson for a learner and persist the result
    ///
    /// The lesson's reward configuration is read from storage. A storage
    /// failure leaves the stored snapshot as it was and is returned as is;
    /// only revision conflicts are retried.
    pub fn complete_lesson<S: ProgressStorage>(
        &self,
        storage: &S,
        learner_id: &LearnerId,
        lesson_id: &LessonId,
        today: NaiveDate,
    ) -> Result<CompletionOutcome, EngineError> {
        let lesson = storage.get_lesson(lesson_id)?;
        let attempts = self.config.max_attempts.max(1);

        for attempt in 1..=attempts {
            let previous = self.load_snapshot(storage, learner_id)?;
            let (mut updated, streak_transition) =
                apply_completion(&previous, &lesson.id, &lesson.reward, today);

            match storage.write_skill_snapshot(learner_id, &updated, previous.revision) {
                Ok(revision) => {
                    updated.revision = revision;
                    let outcome = CompletionOutcome {
                        improved_skills: updated.improved_skills(&previous),
                        newly_completed: !previous.has_completed(&lesson.id),
                        streak_transition,
                        previous,
                        updated,
                    };

                    info!(
                        "Learner {} completed lesson {} (xp {} -> {}, streak {} -> {})",
                        learner_id,
                        lesson.id,
                        outcome.previous.total_xp,
                        outcome.updated.total_xp,
                        outcome.previous.streak,
                        outcome.updated.streak
                    );
                    return Ok(outcome);
                }
                Err(StorageError::RevisionConflict { expected, .. }) => {
                    warn!(
                        "Snapshot for learner {} moved past revision {} (attempt {}/{}), retrying",
                        learner_id, expected, attempt, attempts
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(EngineError::ConflictRetriesExhausted {
            learner_id: learner_id.to_string(),
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use crate::domain::{LessonDraft, RewardConfig, SkillLevels};
    use crate::storage::SqliteStorage;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn add_lesson(storage: &SqliteStorage, title: &str, order: i64, required: u8) -> Lesson {
        let lesson = Lesson::new(LessonDraft {
            title: title.to_string(),
            language: "German".to_string(),
            level: 1,
            requirements: SkillLevels::uniform(required),
            reward: RewardConfig::new(SkillLevels::uniform(5), 50),
            created_by: "admin".to_string(),
            is_active: true,
            order,
            ..Default::default()
        })
        .unwrap();
        storage.create_lesson(&lesson).unwrap();
        lesson
    }

    /// Wraps a storage and lets another writer sneak in before the first
    /// `interleave` writes
    struct Interleaving<'a> {
        inner: &'a SqliteStorage,
        interleave: Cell<u32>,
        rival_lesson: LessonId,
    }

    impl ProgressStorage for Interleaving<'_> {
        fn create_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
            self.inner.create_lesson(lesson)
        }
        fn get_lesson(&self, lesson_id: &LessonId) -> Result<Lesson, StorageError> {
            self.inner.get_lesson(lesson_id)
        }
        fn update_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
            self.inner.update_lesson(lesson)
        }
        fn delete_lesson(&self, lesson_id: &LessonId) -> Result<(), StorageError> {
            self.inner.delete_lesson(lesson_id)
        }
        fn list_lessons(&self, active_only: bool) -> Result<Vec<Lesson>, StorageError> {
            self.inner.list_lessons(active_only)
        }
        fn get_lessons_by_ids(&self, ids: &[LessonId]) -> Result<Vec<Lesson>, StorageError> {
            self.inner.get_lessons_by_ids(ids)
        }
        fn read_skill_snapshot(&self, id: &LearnerId) -> Result<Option<SkillSnapshot>, StorageError> {
            self.inner.read_skill_snapshot(id)
        }
        fn write_skill_snapshot(
            &self,
            id: &LearnerId,
            snapshot: &SkillSnapshot,
            expected_revision: u64,
        ) -> Result<u64, StorageError> {
            if self.interleave.get() > 0 {
                self.interleave.set(self.interleave.get() - 1);
                ProgressionEngine::default()
                    .complete_lesson(self.inner, id, &self.rival_lesson, snapshot.last_practice_date.unwrap())
                    .map_err(|e| StorageError::InvalidData(e.to_string()))?;
            }
            self.inner.write_skill_snapshot(id, snapshot, expected_revision)
        }
        fn ensure_skill_snapshot(&self, id: &LearnerId) -> Result<SkillSnapshot, StorageError> {
            self.inner.ensure_skill_snapshot(id)
        }
    }

    #[test]
    fn test_end_to_end_scenario() {
        let storage = SqliteStorage::in_memory().unwrap();
        let engine = ProgressionEngine::default();
        let learner = LearnerId("learner".to_string());

        let mut start = SkillSnapshot::new(learner.clone());
        start.skills = SkillLevels::uniform(40);
        storage.write_skill_snapshot(&learner, &start, 0).unwrap();

        let l1 = add_lesson(&storage, "L1", 1, 30);

        let available = engine.available_lessons(&storage, &learner).unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].id, l1.id);

        let outcome = engine.complete_lesson(&storage, &learner, &l1.id, date("2024-03-01")).unwrap();
        let updated = &outcome.updated;
        assert_eq!(updated.skills, SkillLevels::uniform(45));
        assert_eq!(updated.total_xp, 50);
        assert_eq!(updated.streak, 1);
        assert_eq!(updated.last_practice_date, Some(date("2024-03-01")));
        assert_eq!(updated.completed_ids(), vec![l1.id.clone()]);
        assert_eq!(outcome.improved_skills, Skill::ALL.to_vec());
        assert!(outcome.newly_completed);

        assert_eq!(storage.read_skill_snapshot(&learner).unwrap().unwrap(), *updated);
        assert!(engine.available_lessons(&storage, &learner).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_learner_starts_from_zero() {
        let storage = SqliteStorage::in_memory().unwrap();
        let engine = ProgressionEngine::default();
        let learner = LearnerId("fresh".to_string());
        add_lesson(&storage, "intro", 1, 0);
        add_lesson(&storage, "advanced", 2, 10);

        let available = engine.available_lessons(&storage, &learner).unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].title, "intro");
    }

    #[test]
    fn test_repeat_completion_same_day() {
        let storage = SqliteStorage::in_memory().unwrap();
        let engine = ProgressionEngine::default();
        let learner = LearnerId("repeat".to_string());
        let lesson = add_lesson(&storage, "again", 1, 0);

        engine.complete_lesson(&storage, &learner, &lesson.id, date("2024-01-01")).unwrap();
        let second = engine.complete_lesson(&storage, &learner, &lesson.id, date("2024-01-01")).unwrap();

        assert!(!second.newly_completed);
        assert_eq!(second.streak_transition, StreakTransition::SameDay);
        assert_eq!(second.updated.streak, 1);
        assert_eq!(second.updated.completed_lessons.len(), 1);
        assert_eq!(second.updated.total_xp, 100);
    }

    #[test]
    fn test_unknown_lesson_is_not_found() {
        let storage = SqliteStorage::in_memory().unwrap();
        let engine = ProgressionEngine::default();
        let result = engine.complete_lesson(
            &storage,
            &LearnerId("x".to_string()),
            &LessonId("missing".to_string()),
            date("2024-01-01"),
        );
        assert!(matches!(result, Err(EngineError::Storage(StorageError::LessonNotFound { .. }))));
        assert!(storage.read_skill_snapshot(&LearnerId("x".to_string())).unwrap().is_none());
    }

    #[test]
    fn test_conflict_is_retried_and_both_gains_kept() {
        let storage = SqliteStorage::in_memory().unwrap();
        let learner = LearnerId("contended".to_string());
        let mine = add_lesson(&storage, "mine", 1, 0);
        let rival = add_lesson(&storage, "rival", 2, 0);

        let racing = Interleaving {
            inner: &storage,
            interleave: Cell::new(1),
            rival_lesson: rival.id.clone(),
        };

        let outcome = ProgressionEngine::default()
            .complete_lesson(&racing, &learner, &mine.id, date("2024-01-01"))
            .unwrap();

        assert_eq!(outcome.updated.total_xp, 100);
        assert_eq!(outcome.updated.skills, SkillLevels::uniform(10));
        assert!(outcome.updated.has_completed(&mine.id));
        assert!(outcome.updated.has_completed(&rival.id));
        assert_eq!(outcome.updated.revision, 2);
    }

    #[test]
    fn test_conflicts_exhaust_attempts() {
        let storage = SqliteStorage::in_memory().unwrap();
        let learner = LearnerId("starved".to_string());
        let mine = add_lesson(&storage, "mine", 1, 0);
        let rival = add_lesson(&storage, "rival", 2, 0);

        let racing = Interleaving {
            inner: &storage,
            interleave: Cell::new(10),
            rival_lesson: rival.id.clone(),
        };

        let engine = ProgressionEngine::new(EngineConfig { max_attempts: 3 });
        let result = engine.complete_lesson(&racing, &learner, &mine.id, date("2024-01-01"));
        assert!(matches!(
            result,
            Err(EngineError::ConflictRetriesExhausted { attempts: 3, .. })
        ));

        let stored = storage.read_skill_snapshot(&learner).unwrap().unwrap();
        assert!(!stored.has_completed(&mine.id));
        assert_eq!(stored.total_xp, 150);
    }

    #[test]
    fn test_completed_lessons_history() {
        let storage = SqliteStorage::in_memory().unwrap();
        let engine = ProgressionEngine::default();
        let learner = LearnerId("history".to_string());
        let a = add_lesson(&storage, "a", 1, 0);
        let b = add_lesson(&storage, "b", 2, 0);

        engine.complete_lesson(&storage, &learner, &b.id, date("2024-01-01")).unwrap();
        let outcome = engine.complete_lesson(&storage, &learner, &a.id, date("2024-01-02")).unwrap();

        let history = engine.completed_lessons(&storage, &outcome.updated).unwrap();
        let titles: Vec<&str> = history.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b"]);
        assert_eq!(outcome.updated.streak, 2);
    }
}
