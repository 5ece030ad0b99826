/// Integration tests for the tools running against a SQLite database
use chrono::NaiveDate;
use lesson_progress_mcp::tools::*;
use lesson_progress_mcp::*;
use tempfile::NamedTempFile;

/// Storage whose snapshot writes always fail, for exercising error paths
struct FailingWrites {
    inner: SqliteStorage,
}

impl ProgressStorage for FailingWrites {
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

    fn get_lessons_by_ids(&self, lesson_ids: &[LessonId]) -> Result<Vec<Lesson>, StorageError> {
        self.inner.get_lessons_by_ids(lesson_ids)
    }

    fn read_skill_snapshot(&self, learner_id: &LearnerId) -> Result<Option<SkillSnapshot>, StorageError> {
        self.inner.read_skill_snapshot(learner_id)
    }

    fn write_skill_snapshot(
        &self,
        _learner_id: &LearnerId,
        _snapshot: &SkillSnapshot,
        _expected_revision: u64,
    ) -> Result<u64, StorageError> {
        Err(StorageError::Connection("disk unavailable".to_string()))
    }

    fn ensure_skill_snapshot(&self, learner_id: &LearnerId) -> Result<SkillSnapshot, StorageError> {
        self.inner.ensure_skill_snapshot(learner_id)
    }
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn create_params(title: &str, required: i64, gain: i64) -> CreateLessonParams {
    CreateLessonParams {
        title: title.to_string(),
        description: None,
        language: "Spanish".to_string(),
        level: None,
        context: "Hola. ¿Cómo estás? Estoy bien.".to_string(),
        target_sentence: "¿Cómo estás?".to_string(),
        correct_translation: "How are you?".to_string(),
        source_title: None,
        source_author: None,
        required_vocabulary: Some(required),
        required_grammar: Some(required),
        required_reading: Some(required),
        required_writing: Some(required),
        vocabulary_gain: Some(gain),
        grammar_gain: Some(gain),
        reading_gain: Some(gain),
        writing_gain: Some(gain),
        xp_reward: None,
        created_by: None,
        is_active: None,
        order: None,
    }
}

fn complete(learner: &str, lesson_id: &str) -> CompleteLessonParams {
    CompleteLessonParams {
        learner_id: learner.to_string(),
        lesson_id: lesson_id.to_string(),
    }
}

#[cfg(test)]
mod basic_integration_tests {
    use super::*;

    #[tokio::test]
    async fn test_server_basic_workflow() {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let server = ProgressionServer::new(temp_file.path().to_path_buf(), EngineConfig::default())
            .await
            .expect("Failed to create server");
        let storage = server.storage();
        let engine = server.engine();

        let basics = create_lesson(storage, create_params("Basics", 0, 10)).unwrap();
        let club = create_lesson(storage, create_params("Reading club", 10, 5)).unwrap();

        let available = available_lessons(
            storage,
            engine,
            AvailableLessonsParams { learner_id: "maria".to_string(), include_locked: None },
        )
        .unwrap();
        assert_eq!(available.lessons.len(), 1);
        assert_eq!(available.lessons[0].lesson_id, basics.lesson_id);

        let first = record_completion(storage, engine, date("2024-05-01"), complete("maria", &basics.lesson_id))
            .unwrap();
        assert_eq!(first.xp_gained, 50);
        assert_eq!(first.streak, 1);
        assert_eq!(first.streak_transition, StreakTransition::Started);
        assert!(first.newly_completed);

        let path = available_lessons(
            storage,
            engine,
            AvailableLessonsParams { learner_id: "maria".to_string(), include_locked: Some(true) },
        )
        .unwrap();
        assert_eq!(path.lessons.len(), 2);
        assert_eq!(path.lessons[0].status, LessonStatus::Completed);
        assert_eq!(path.lessons[1].lesson_id, club.lesson_id);
        assert_eq!(path.lessons[1].status, LessonStatus::Available);

        let second = record_completion(storage, engine, date("2024-05-02"), complete("maria", &club.lesson_id))
            .unwrap();
        assert_eq!(second.streak, 2);
        assert_eq!(second.total_xp, 100);
        assert_eq!(second.skills, SkillLevels::uniform(15));

        let status = skills_status(
            storage,
            engine,
            SkillsStatusParams { learner_id: "maria".to_string(), include_history: Some(true) },
        )
        .unwrap();
        assert_eq!(status.completed_count, 2);
        let titles: Vec<&str> = status.completed.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Basics", "Reading club"]);
        assert_eq!(status.last_practice_date.as_deref(), Some("2024-05-02"));
    }

    #[tokio::test]
    async fn test_database_persistence() {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let db_path = temp_file.path().to_path_buf();

        let lesson_id = {
            let server = ProgressionServer::new(db_path.clone(), EngineConfig::default())
                .await
                .expect("Failed to create first server");
            let created = create_lesson(server.storage(), create_params("Basics", 0, 5)).unwrap();
            record_completion(
                server.storage(),
                server.engine(),
                date("2024-06-10"),
                complete("ana", &created.lesson_id),
            )
            .unwrap();
            created.lesson_id
        };

        let server = ProgressionServer::new(db_path, EngineConfig::default())
            .await
            .expect("Failed to create second server");

        let learner = LearnerId::parse("ana").unwrap();
        let snapshot = server
            .storage()
            .read_skill_snapshot(&learner)
            .unwrap()
            .expect("snapshot survives reopen");
        assert_eq!(snapshot.total_xp, 50);
        assert_eq!(snapshot.streak, 1);
        assert_eq!(snapshot.last_practice_date, Some(date("2024-06-10")));
        assert!(snapshot.has_completed(&LessonId::parse(&lesson_id).unwrap()));

        // Continuing the next day picks up the stored streak
        let next = record_completion(
            server.storage(),
            server.engine(),
            date("2024-06-11"),
            complete("ana", &lesson_id),
        )
        .unwrap();
        assert_eq!(next.streak, 2);
        assert!(!next.newly_completed);
    }

    #[test]
    fn test_lesson_admin_lifecycle() {
        let storage = SqliteStorage::in_memory().unwrap();
        let created = create_lesson(&storage, create_params("Basics", 0, 5)).unwrap();

        let lesson_id = LessonId::parse(&created.lesson_id).unwrap();

        let updated = update_lesson(
            &storage,
            UpdateLessonParams {
                lesson_id: created.lesson_id.clone(),
                description: Some("Saying hello".to_string()),
                required_grammar: Some(20),
                xp_reward: Some(80),
                is_active: Some(false),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(updated.success);

        let lesson = storage.get_lesson(&lesson_id).unwrap();
        assert_eq!(lesson.requirements, SkillLevels::new(0, 20, 0, 0));
        assert_eq!(lesson.reward.xp_reward, 80);
        assert_eq!(lesson.description.as_deref(), Some("Saying hello"));
        assert!(!lesson.is_active);

        // Content edits survive a round trip; blank strings clear optional text
        update_lesson(
            &storage,
            UpdateLessonParams {
                lesson_id: created.lesson_id.clone(),
                description: Some(String::new()),
                language: Some("Portuguese".to_string()),
                context: Some("Olá. Como vai? Vou bem.".to_string()),
                target_sentence: Some("Como vai?".to_string()),
                correct_translation: Some("How are you doing?".to_string()),
                source_title: Some("Conversas".to_string()),
                source_author: Some(String::new()),
                ..Default::default()
            },
        )
        .unwrap();

        let lesson = storage.get_lesson(&lesson_id).unwrap();
        assert_eq!(lesson.description, None);
        assert_eq!(lesson.language, "Portuguese");
        assert_eq!(lesson.content.context, "Olá. Como vai? Vou bem.");
        assert_eq!(lesson.content.target_sentence, "Como vai?");
        assert_eq!(lesson.content.correct_translation, "How are you doing?");
        assert_eq!(lesson.content.source_title.as_deref(), Some("Conversas"));
        assert_eq!(lesson.content.source_author, None);
        assert_eq!(lesson.reward.xp_reward, 80);

        let blank_language = update_lesson(
            &storage,
            UpdateLessonParams {
                lesson_id: created.lesson_id.clone(),
                language: Some("  ".to_string()),
                ..Default::default()
            },
        );
        assert!(matches!(blank_language, Err(ServerError::Domain(DomainError::Validation { .. }))));
        assert_eq!(storage.get_lesson(&lesson_id).unwrap().language, "Portuguese");

        let listed = list_lessons(&storage, ListLessonsParams { active_only: Some(true), language: None }).unwrap();
        assert_eq!(listed.total, 0);
        let listed = list_lessons(&storage, ListLessonsParams::default()).unwrap();
        assert_eq!(listed.total, 1);
        assert_eq!(listed.active, 0);

        delete_lesson(&storage, DeleteLessonParams { lesson_id: created.lesson_id.clone() }).unwrap();
        let missing = storage.get_lesson(&lesson_id);
        assert!(matches!(missing, Err(StorageError::LessonNotFound { .. })));
    }

    #[test]
    fn test_invalid_lesson_input_is_rejected() {
        let storage = SqliteStorage::in_memory().unwrap();

        let negative_gain = create_lesson(&storage, create_params("Basics", 0, -5));
        assert!(matches!(negative_gain, Err(ServerError::Domain(DomainError::InvalidReward(_)))));

        let threshold = create_lesson(&storage, create_params("Basics", 101, 5));
        assert!(matches!(threshold, Err(ServerError::Domain(DomainError::InvalidThreshold(_)))));

        assert!(storage.list_lessons(false).unwrap().is_empty());
    }

    #[test]
    fn test_storage_failure_leaves_snapshot_unchanged() {
        let storage = FailingWrites { inner: SqliteStorage::in_memory().unwrap() };
        let engine = ProgressionEngine::default();
        let created = create_lesson(&storage, create_params("Basics", 0, 5)).unwrap();

        let learner = LearnerId::parse("ana").unwrap();
        let before = storage.ensure_skill_snapshot(&learner).unwrap();

        let result = record_completion(&storage, &engine, date("2024-06-10"), complete("ana", &created.lesson_id));
        assert!(matches!(
            result,
            Err(ServerError::Engine(EngineError::Storage(StorageError::Connection(_))))
        ));

        let after = storage.read_skill_snapshot(&learner).unwrap().unwrap();
        assert_eq!(after, before);
    }

    #[test]
    fn test_completion_of_unknown_lesson_fails() {
        let storage = SqliteStorage::in_memory().unwrap();
        let engine = ProgressionEngine::default();

        let result = record_completion(&storage, &engine, date("2024-06-10"), complete("ana", "missing"));
        assert!(matches!(
            result,
            Err(ServerError::Engine(EngineError::Storage(StorageError::LessonNotFound { .. })))
        ));
        assert!(storage.read_skill_snapshot(&LearnerId::parse("ana").unwrap()).unwrap().is_none());
    }

    #[test]
    fn test_storage_interface() {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let storage = SqliteStorage::new(temp_file.path().to_path_buf())
            .expect("Failed to create storage");

        let _: &dyn ProgressStorage = &storage;
    }
}
