/// Unit tests for the progression rules through the public API
use chrono::NaiveDate;
use lesson_progress_mcp::*;
use tempfile::NamedTempFile;

#[cfg(test)]
mod basic_unit_tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn lesson(title: &str, order: i64, requirements: SkillLevels, reward: RewardConfig) -> Lesson {
        Lesson::new(LessonDraft {
            title: title.to_string(),
            language: "Spanish".to_string(),
            level: 1,
            requirements,
            reward,
            created_by: "admin".to_string(),
            is_active: true,
            order,
            ..Default::default()
        })
        .expect("valid lesson")
    }

    fn learner() -> SkillSnapshot {
        SkillSnapshot::new(LearnerId::parse("maria").unwrap())
    }

    #[test]
    fn test_lesson_creation() {
        let reward = RewardConfig::new(SkillLevels::uniform(5), 50);
        let lesson = lesson("Greetings", 1, SkillLevels::default(), reward);

        assert_eq!(lesson.title, "Greetings");
        assert!(lesson.is_active);
        assert!(!lesson.id.as_str().is_empty());
    }

    #[test]
    fn test_invalid_lessons_rejected() {
        let blank_title = Lesson::new(LessonDraft {
            title: "   ".to_string(),
            language: "Spanish".to_string(),
            level: 1,
            ..Default::default()
        });
        assert!(blank_title.is_err());

        let too_hard = Lesson::new(LessonDraft {
            title: "Subjunctive".to_string(),
            language: "Spanish".to_string(),
            level: 11,
            ..Default::default()
        });
        assert!(matches!(too_hard, Err(DomainError::InvalidLevel(_))));

        assert!(matches!(
            RewardConfig::from_raw(5, -1, 5, 5, 50),
            Err(DomainError::InvalidReward(_))
        ));
    }

    #[test]
    fn test_beginner_sees_only_unlocked_lessons() {
        let reward = RewardConfig::new(SkillLevels::uniform(5), 50);
        let lessons = vec![
            lesson("Basics", 1, SkillLevels::default(), reward),
            lesson("Past tense", 2, SkillLevels::new(0, 20, 0, 0), reward),
            lesson("Reading club", 3, SkillLevels::new(10, 10, 10, 10), reward),
        ];

        let available = select_available(&learner(), &lessons);
        let titles: Vec<&str> = available.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["Basics"]);
    }

    #[test]
    fn test_completing_unlocks_next_lesson() {
        let reward = RewardConfig::new(SkillLevels::uniform(10), 50);
        let lessons = vec![
            lesson("Basics", 1, SkillLevels::default(), reward),
            lesson("Reading club", 2, SkillLevels::new(10, 10, 10, 10), reward),
        ];

        let before = learner();
        let after = complete_lesson(&before, &lessons[0].id, &lessons[0].reward, date("2024-05-01"));

        let available = select_available(&after, &lessons);
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].title, "Reading club");
        assert_eq!(after.improved_skills(&before).len(), Skill::ALL.len());
    }

    #[test]
    fn test_learning_path_statuses() {
        let reward = RewardConfig::new(SkillLevels::uniform(5), 50);
        let lessons = vec![
            lesson("Basics", 1, SkillLevels::default(), reward),
            lesson("Numbers", 2, SkillLevels::default(), reward),
            lesson("Essays", 3, SkillLevels::new(0, 30, 0, 40), reward),
        ];

        let snapshot = complete_lesson(&learner(), &lessons[0].id, &reward, date("2024-05-01"));
        let path = lesson_path(&snapshot, &lessons);

        let statuses: Vec<LessonStatus> = path.iter().map(|entry| entry.status).collect();
        assert_eq!(
            statuses,
            vec![LessonStatus::Completed, LessonStatus::Available, LessonStatus::Locked]
        );

        let gaps = &path[2].missing;
        assert_eq!(gaps.len(), 2);
        assert_eq!(gaps[0].skill, Skill::Grammar);
        assert_eq!(gaps[0].current, 5);
        assert_eq!(gaps[1].skill, Skill::Writing);
        assert_eq!(gaps[1].required, 40);
    }

    #[test]
    fn test_daily_streak_over_a_week() {
        let reward = RewardConfig::new(SkillLevels::uniform(1), 10);
        let basics = lesson("Basics", 1, SkillLevels::default(), reward);

        let mut snapshot = learner();
        for day in ["2024-05-01", "2024-05-02", "2024-05-03"] {
            snapshot = complete_lesson(&snapshot, &basics.id, &reward, date(day));
        }
        assert_eq!(snapshot.streak, 3);

        // Skipping the 4th breaks the streak
        snapshot = complete_lesson(&snapshot, &basics.id, &reward, date("2024-05-05"));
        assert_eq!(snapshot.streak, 1);
        assert_eq!(snapshot.total_xp, 40);
        assert_eq!(snapshot.completed_lessons.len(), 1);
    }

    #[test]
    fn test_skills_never_exceed_maximum() {
        let reward = RewardConfig::new(SkillLevels::uniform(MAX_SKILL_LEVEL), 1);
        let basics = lesson("Basics", 1, SkillLevels::default(), reward);

        let mut snapshot = learner();
        snapshot.skills = SkillLevels::new(99, 50, 0, 100);
        let updated = complete_lesson(&snapshot, &basics.id, &reward, date("2024-05-01"));

        for skill in Skill::ALL {
            assert_eq!(updated.level(skill), MAX_SKILL_LEVEL);
        }
    }

    #[test]
    fn test_streak_transitions() {
        assert_eq!(
            StreakTransition::evaluate(None, date("2024-01-01")),
            StreakTransition::Started
        );
        assert_eq!(
            StreakTransition::evaluate(Some(date("2023-12-31")), date("2024-01-01")),
            StreakTransition::Continued
        );
        assert_eq!(advance_streak(7, Some(date("2024-01-01")), date("2024-01-01")), (7, StreakTransition::SameDay));
        assert_eq!(advance_streak(7, Some(date("2023-12-25")), date("2024-01-01")), (1, StreakTransition::Reset));
    }

    #[tokio::test]
    async fn test_server_creation() {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let server = ProgressionServer::new(temp_file.path().to_path_buf(), EngineConfig::default()).await;
        assert!(server.is_ok());
    }

    #[test]
    fn test_storage_creation() {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let storage = SqliteStorage::new(temp_file.path().to_path_buf());
        assert!(storage.is_ok());
    }
}
