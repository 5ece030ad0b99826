/// Tool for listing the lesson catalog
///
/// This module implements the lesson_list MCP tool used by the admin.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use crate::domain::{Lesson, SkillLevels};
use crate::storage::ProgressStorage;
use crate::ServerError;

/// Parameters for listing lessons
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListLessonsParams {
    /// Show only active lessons (default false)
    pub active_only: Option<bool>,
    /// Only lessons for this language (case-insensitive)
    pub language: Option<String>,
}

/// Catalog view of a lesson
#[derive(Debug, Serialize)]
pub struct LessonSummary {
    pub lesson_id: String,
    pub title: String,
    pub language: String,
    pub level: u8,
    pub order: i64,
    pub is_active: bool,
    pub requirements: SkillLevels,
    pub gains: SkillLevels,
    pub xp_reward: u32,
}

impl From<&Lesson> for LessonSummary {
    fn from(lesson: &Lesson) -> Self {
        Self {
            lesson_id: lesson.id.to_string(),
            title: lesson.title.clone(),
            language: lesson.language.clone(),
            level: lesson.level,
            order: lesson.order,
            is_active: lesson.is_active,
            requirements: lesson.requirements,
            gains: lesson.reward.gains,
            xp_reward: lesson.reward.xp_reward,
        }
    }
}

/// Response from listing lessons
#[derive(Debug, Serialize)]
pub struct ListLessonsResponse {
    pub lessons: Vec<LessonSummary>,
    pub total: usize,
    pub active: usize,
}

/// List lessons in catalog order using the provided storage
pub fn list_lessons<S: ProgressStorage>(
    storage: &S,
    params: ListLessonsParams,
) -> Result<ListLessonsResponse, ServerError> {
    let language = params.language.map(|l| l.trim().to_lowercase());

    let lessons: Vec<LessonSummary> = storage
        .list_lessons(params.active_only.unwrap_or(false))?
        .iter()
        .filter(|lesson| match &language {
            Some(language) => lesson.language.to_lowercase() == *language,
            None => true,
        })
        .map(LessonSummary::from)
        .collect();

    let active = lessons.iter().filter(|l| l.is_active).count();

    Ok(ListLessonsResponse {
        total: lessons.len(),
        active,
        lessons,
    })
}
