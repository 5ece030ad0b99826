/// Tool for listing the lessons a learner can attempt
///
/// This module implements the lesson_available MCP tool. By default it
/// returns only attemptable lessons; with `include_locked` it returns the
/// learner's whole path with the skills still missing for locked lessons.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use crate::domain::{LearnerId, LessonStatus, SkillGap};
use crate::engine::ProgressionEngine;
use crate::storage::ProgressStorage;
use crate::ServerError;

/// Parameters for listing available lessons
#[derive(Debug, Deserialize, JsonSchema)]
pub struct AvailableLessonsParams {
    pub learner_id: String,
    /// Also list completed and locked lessons (default false)
    pub include_locked: Option<bool>,
}

/// A lesson as seen by one learner
#[derive(Debug, Serialize)]
pub struct LearnerLesson {
    pub lesson_id: String,
    pub title: String,
    pub language: String,
    pub level: u8,
    pub xp_reward: u32,
    pub status: LessonStatus,
    pub missing: Vec<SkillGap>,
}

/// Response from listing available lessons
#[derive(Debug, Serialize)]
pub struct AvailableLessonsResponse {
    pub lessons: Vec<LearnerLesson>,
    pub available_count: usize,
    pub message: String,
}

/// List lessons for a learner using the provided storage
pub fn available_lessons<S: ProgressStorage>(
    storage: &S,
    engine: &ProgressionEngine,
    params: AvailableLessonsParams,
) -> Result<AvailableLessonsResponse, ServerError> {
    let learner_id = LearnerId::parse(&params.learner_id)?;

    let lessons: Vec<LearnerLesson> = if params.include_locked.unwrap_or(false) {
        engine
            .learning_path(storage, &learner_id)?
            .into_iter()
            .map(|item| LearnerLesson {
                lesson_id: item.lesson.id.to_string(),
                title: item.lesson.title,
                language: item.lesson.language,
                level: item.lesson.level,
                xp_reward: item.lesson.reward.xp_reward,
                status: item.status,
                missing: item.missing,
            })
            .collect()
    } else {
        engine
            .available_lessons(storage, &learner_id)?
            .into_iter()
            .map(|lesson| LearnerLesson {
                lesson_id: lesson.id.to_string(),
                title: lesson.title,
                language: lesson.language,
                level: lesson.level,
                xp_reward: lesson.reward.xp_reward,
                status: LessonStatus::Available,
                missing: Vec::new(),
            })
            .collect()
    };

    let available_count = lessons
        .iter()
        .filter(|l| l.status == LessonStatus::Available)
        .count();

    let message = if lessons.is_empty() {
        "No lessons available right now. Keep practicing to unlock more!".to_string()
    } else {
        let lines = lessons
            .iter()
            .map(|l| {
                let marker = match l.status {
                    LessonStatus::Completed => "✅",
                    LessonStatus::Available => "▶️",
                    LessonStatus::Locked => "🔒",
                };
                let missing = if l.missing.is_empty() || l.status != LessonStatus::Locked {
                    String::new()
                } else {
                    let gaps = l
                        .missing
                        .iter()
                        .map(|g| format!("{} {}/{}", g.skill, g.current, g.required))
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("\n   Needs: {}", gaps)
                };
                format!(
                    "{} **{}** ({}, level {}) +{} XP\n   ID: {}{}",
                    marker, l.title, l.language, l.level, l.xp_reward, l.lesson_id, missing
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        format!("📖 {} lesson(s) available\n\n{}", available_count, lines)
    };

    Ok(AvailableLessonsResponse {
        lessons,
        available_count,
        message,
    })
}
