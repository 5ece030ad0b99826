/// SQLite implementation of the progress storage interface
///
/// This module provides the concrete SQLite implementation for storing
/// lessons and skill snapshots. It handles all SQL queries and data
/// conversion.

use std::collections::BTreeSet;
use std::path::PathBuf;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use rusqlite::types::Type;
use chrono::{NaiveDate, Utc};

use crate::domain::{
    LearnerId, Lesson, LessonContent, LessonId, RewardConfig, SkillLevels, SkillSnapshot,
};
use crate::storage::{migrations, ProgressStorage, StorageError, LOOKUP_BATCH_SIZE};

const LESSON_COLUMNS: &str = "id, title, description, language, level,
    context, target_sentence, correct_translation, source_title, source_author,
    required_vocabulary, required_grammar, required_reading, required_writing,
    vocabulary_gain, grammar_gain, reading_gain, writing_gain, xp_reward,
    created_by, created_at, is_active, sort_order";

/// SQLite-based storage implementation
///
/// This struct holds a connection to the SQLite database and implements
/// all the storage operations defined in the ProgressStorage trait.
pub struct SqliteStorage {
    conn: Connection,
}

/// Snapshot columns as stored, before range checks
struct SnapshotRow {
    skills: SkillLevels,
    total_xp: i64,
    streak: u32,
    last_practice_date: Option<String>,
    completed_lessons: String,
    revision: i64,
}

impl SqliteStorage {
    /// Create a new SQLite storage instance
    ///
    /// This opens the database file and runs any necessary migrations
    /// to ensure the schema is up to date.
    pub fn new(db_path: PathBuf) -> Result<Self, StorageError> {
        let conn = Connection::open(&db_path)
            .map_err(|e| StorageError::Connection(format!("Failed to open database: {}", e)))?;

        migrations::initialize_database(&conn)?;

        tracing::info!("SQLite storage initialized at: {:?}", db_path);

        Ok(Self { conn })
    }

    /// Create a storage instance backed by an in-memory database
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Connection(format!("Failed to open database: {}", e)))?;

        migrations::initialize_database(&conn)?;

        Ok(Self { conn })
    }

    /// Map a row selected with `LESSON_COLUMNS` to a Lesson
    fn row_to_lesson(row: &Row<'_>) -> rusqlite::Result<Lesson> {
        let created_at_str: String = row.get(20)?;
        let created_at = chrono::DateTime::parse_from_rfc3339(&created_at_str)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(20, Type::Text, Box::new(e)))?
            .with_timezone(&Utc);

        Ok(Lesson {
            id: LessonId(row.get(0)?),
            title: row.get(1)?,
            description: row.get(2)?,
            language: row.get(3)?,
            level: row.get(4)?,
            content: LessonContent {
                context: row.get(5)?,
                target_sentence: row.get(6)?,
                correct_translation: row.get(7)?,
                source_title: row.get(8)?,
                source_author: row.get(9)?,
            },
            requirements: SkillLevels::new(row.get(10)?, row.get(11)?, row.get(12)?, row.get(13)?),
            reward: RewardConfig::new(
                SkillLevels::new(row.get(14)?, row.get(15)?, row.get(16)?, row.get(17)?),
                row.get(18)?,
            ),
            created_by: row.get(19)?,
            created_at,
            is_active: row.get(21)?,
            order: row.get(22)?,
        })
    }

    fn to_stored_i64(value: u64, what: &str) -> Result<i64, StorageError> {
        i64::try_from(value)
            .map_err(|_| StorageError::InvalidData(format!("{} {} does not fit in the database", what, value)))
    }

    fn snapshot_from_row(learner_id: &LearnerId, row: SnapshotRow) -> Result<SkillSnapshot, StorageError> {
        let total_xp = u64::try_from(row.total_xp).map_err(|_| {
            StorageError::InvalidData(format!("Negative total XP for learner {}", learner_id))
        })?;
        let revision = u64::try_from(row.revision).map_err(|_| {
            StorageError::InvalidData(format!("Negative revision for learner {}", learner_id))
        })?;

        let last_practice_date = match row.last_practice_date.as_deref() {
            None | Some("") => None,
            Some(s) => Some(NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
                StorageError::InvalidData(format!("Invalid last practice date '{}'", s))
            })?),
        };

        let completed: Vec<LessonId> = serde_json::from_str(&row.completed_lessons)?;
        let completed_lessons: BTreeSet<LessonId> = completed.into_iter().collect();

        SkillSnapshot::from_existing(
            learner_id.clone(),
            row.skills,
            total_xp,
            row.streak,
            last_practice_date,
            completed_lessons,
            revision,
        )
        .map_err(|e| StorageError::InvalidData(e.to_string()))
    }
}

impl ProgressStorage for SqliteStorage {
    /// Create a new lesson in the database
    fn create_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let result = self.conn.execute(
            &format!(
                "INSERT INTO lessons ({}) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                    ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23
                )",
                LESSON_COLUMNS
            ),
            params![
                lesson.id.as_str(),
                lesson.title,
                lesson.description,
                lesson.language,
                lesson.level,
                lesson.content.context,
                lesson.content.target_sentence,
                lesson.content.correct_translation,
                lesson.content.source_title,
                lesson.content.source_author,
                lesson.requirements.vocabulary,
                lesson.requirements.grammar,
                lesson.requirements.reading,
                lesson.requirements.writing,
                lesson.reward.gains.vocabulary,
                lesson.reward.gains.grammar,
                lesson.reward.gains.reading,
                lesson.reward.gains.writing,
                lesson.reward.xp_reward,
                lesson.created_by,
                lesson.created_at.to_rfc3339(),
                lesson.is_active,
                lesson.order,
            ],
        );

        match result {
            Ok(_) => {
                tracing::debug!("Created lesson: {} ({})", lesson.title, lesson.id);
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StorageError::DuplicateLesson { lesson_id: lesson.id.to_string() })
            }
            Err(e) => Err(StorageError::Query(e)),
        }
    }

    /// Get a lesson by its ID
    fn get_lesson(&self, lesson_id: &LessonId) -> Result<Lesson, StorageError> {
        let lesson = self
            .conn
            .query_row(
                &format!("SELECT {} FROM lessons WHERE id = ?1", LESSON_COLUMNS),
                params![lesson_id.as_str()],
                Self::row_to_lesson,
            )
            .optional()?;

        lesson.ok_or_else(|| StorageError::LessonNotFound { lesson_id: lesson_id.to_string() })
    }

    /// Update an existing lesson
    fn update_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let rows_affected = self.conn.execute(
            "UPDATE lessons SET
                title = ?2,
                description = ?3,
                language = ?4,
                level = ?5,
                context = ?6,
                target_sentence = ?7,
                correct_translation = ?8,
                source_title = ?9,
                source_author = ?10,
                required_vocabulary = ?11,
                required_grammar = ?12,
                required_reading = ?13,
                required_writing = ?14,
                vocabulary_gain = ?15,
                grammar_gain = ?16,
                reading_gain = ?17,
                writing_gain = ?18,
                xp_reward = ?19,
                is_active = ?20,
                sort_order = ?21
             WHERE id = ?1",
            params![
                lesson.id.as_str(),
                lesson.title,
                lesson.description,
                lesson.language,
                lesson.level,
                lesson.content.context,
                lesson.content.target_sentence,
                lesson.content.correct_translation,
                lesson.content.source_title,
                lesson.content.source_author,
                lesson.requirements.vocabulary,
                lesson.requirements.grammar,
                lesson.requirements.reading,
                lesson.requirements.writing,
                lesson.reward.gains.vocabulary,
                lesson.reward.gains.grammar,
                lesson.reward.gains.reading,
                lesson.reward.gains.writing,
                lesson.reward.xp_reward,
                lesson.is_active,
                lesson.order,
            ],
        )?;

        if rows_affected == 0 {
            return Err(StorageError::LessonNotFound { lesson_id: lesson.id.to_string() });
        }

        tracing::debug!("Updated lesson: {} ({})", lesson.title, lesson.id);
        Ok(())
    }

    /// Delete a lesson; learners' completed sets may keep the dangling id
    fn delete_lesson(&self, lesson_id: &LessonId) -> Result<(), StorageError> {
        let rows_affected = self.conn.execute(
            "DELETE FROM lessons WHERE id = ?1",
            params![lesson_id.as_str()],
        )?;

        if rows_affected == 0 {
            return Err(StorageError::LessonNotFound { lesson_id: lesson_id.to_string() });
        }

        tracing::debug!("Deleted lesson: {}", lesson_id);
        Ok(())
    }

    /// List lessons ordered for display
    fn list_lessons(&self, active_only: bool) -> Result<Vec<Lesson>, StorageError> {
        let mut sql = format!("SELECT {} FROM lessons", LESSON_COLUMNS);

        if active_only {
            sql.push_str(" WHERE is_active = 1");
        }

        // rowid keeps lessons with equal order in insertion order
        sql.push_str(" ORDER BY sort_order ASC, rowid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let lesson_iter = stmt.query_map([], Self::row_to_lesson)?;

        let mut lessons = Vec::new();
        for lesson in lesson_iter {
            lessons.push(lesson?);
        }

        Ok(lessons)
    }

    /// Look up lessons by id, LOOKUP_BATCH_SIZE ids per query
    fn get_lessons_by_ids(&self, lesson_ids: &[LessonId]) -> Result<Vec<Lesson>, StorageError> {
        let mut lessons = Vec::with_capacity(lesson_ids.len());

        for batch in lesson_ids.chunks(LOOKUP_BATCH_SIZE) {
            let placeholders = (1..=batch.len())
                .map(|i| format!("?{}", i))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "SELECT {} FROM lessons WHERE id IN ({})",
                LESSON_COLUMNS, placeholders
            );

            let mut stmt = self.conn.prepare(&sql)?;
            let lesson_iter = stmt.query_map(
                params_from_iter(batch.iter().map(|id| id.as_str())),
                Self::row_to_lesson,
            )?;

            for lesson in lesson_iter {
                lessons.push(lesson?);
            }
        }

        lessons.sort_by_key(|lesson| lesson.order);
        tracing::debug!("Looked up {} of {} lessons by id", lessons.len(), lesson_ids.len());
        Ok(lessons)
    }

    /// Read the learner's snapshot, if one has been stored
    fn read_skill_snapshot(
        &self,
        learner_id: &LearnerId,
    ) -> Result<Option<SkillSnapshot>, StorageError> {
        let row = self
            .conn
            .query_row(
                "SELECT vocabulary, grammar, reading, writing, total_xp, streak,
                        last_practice_date, completed_lessons, revision
                 FROM skill_snapshots WHERE learner_id = ?1",
                params![learner_id.as_str()],
                |row| {
                    Ok(SnapshotRow {
                        skills: SkillLevels::new(row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?),
                        total_xp: row.get(4)?,
                        streak: row.get(5)?,
                        last_practice_date: row.get(6)?,
                        completed_lessons: row.get(7)?,
                        revision: row.get(8)?,
                    })
                },
            )
            .optional()?;

        row.map(|row| Self::snapshot_from_row(learner_id, row)).transpose()
    }

    /// Conditionally replace the learner's snapshot
    ///
    /// Revision 0 means the caller saw no record, so the write is an insert
    /// that conflicts if a record appeared in the meantime. Otherwise the update
    /// only matches while the stored revision is unchanged.
    fn write_skill_snapshot(
        &self,
        learner_id: &LearnerId,
        snapshot: &SkillSnapshot,
        expected_revision: u64,
    ) -> Result<u64, StorageError> {
        let completed: Vec<&LessonId> = snapshot.completed_lessons.iter().collect();
        let completed_json = serde_json::to_string(&completed)?;
        let last_practice = snapshot.last_practice_date.map(|d| d.format("%Y-%m-%d").to_string());
        let total_xp = Self::to_stored_i64(snapshot.total_xp, "Total XP")?;
        let new_revision = expected_revision + 1;
        let now = Utc::now().to_rfc3339();

        let rows_affected = if expected_revision == 0 {
            let inserted = self.conn.execute(
                "INSERT INTO skill_snapshots (
                    learner_id, vocabulary, grammar, reading, writing, total_xp, streak,
                    last_practice_date, completed_lessons, revision, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    learner_id.as_str(),
                    snapshot.skills.vocabulary,
                    snapshot.skills.grammar,
                    snapshot.skills.reading,
                    snapshot.skills.writing,
                    total_xp,
                    snapshot.streak,
                    last_practice,
                    completed_json,
                    Self::to_stored_i64(new_revision, "Revision")?,
                    now
                ],
            );

            // Only an existing row for this learner is a conflict; CHECK and
            // NOT NULL failures stay query errors
            match inserted {
                Ok(rows) => rows,
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
                {
                    0
                }
                Err(e) => return Err(StorageError::Query(e)),
            }
        } else {
            self.conn.execute(
                "UPDATE skill_snapshots SET
                    vocabulary = ?2,
                    grammar = ?3,
                    reading = ?4,
                    writing = ?5,
                    total_xp = ?6,
                    streak = ?7,
                    last_practice_date = ?8,
                    completed_lessons = ?9,
                    revision = ?10,
                    updated_at = ?11
                 WHERE learner_id = ?1 AND revision = ?12",
                params![
                    learner_id.as_str(),
                    snapshot.skills.vocabulary,
                    snapshot.skills.grammar,
                    snapshot.skills.reading,
                    snapshot.skills.writing,
                    total_xp,
                    snapshot.streak,
                    last_practice,
                    completed_json,
                    Self::to_stored_i64(new_revision, "Revision")?,
                    now,
                    Self::to_stored_i64(expected_revision, "Revision")?
                ],
            )?
        };

        if rows_affected == 0 {
            return Err(StorageError::RevisionConflict {
                learner_id: learner_id.to_string(),
                expected: expected_revision,
            });
        }

        tracing::debug!("Stored skill snapshot for learner {} at revision {}", learner_id, new_revision);
        Ok(new_revision)
    }

    /// Single idempotent upsert of the zero-valued record
    fn ensure_skill_snapshot(&self, learner_id: &LearnerId) -> Result<SkillSnapshot, StorageError> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO skill_snapshots (learner_id, revision, updated_at)
             VALUES (?1, 1, ?2)",
            params![learner_id.as_str(), Utc::now().to_rfc3339()],
        )?;

        if inserted > 0 {
            tracing::info!("Initialized skill snapshot for learner {}", learner_id);
        }

        self.read_skill_snapshot(learner_id)?.ok_or_else(|| {
            StorageError::InvalidData(format!("Snapshot for learner {} vanished after upsert", learner_id))
        })
    }
}
