/// Tool for creating lessons
///
/// This module implements the lesson_create MCP tool used by the admin to
/// add lessons to the catalog.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use crate::domain::{
    DomainError, Lesson, LessonContent, LessonDraft, RewardConfig, SkillLevels, MAX_SKILL_LEVEL,
};
use crate::storage::ProgressStorage;
use crate::ServerError;

// Defaults used by the lesson editor for a new lesson
const DEFAULT_LEVEL: u8 = 1;
const DEFAULT_SKILL_GAIN: i64 = 5;
const DEFAULT_XP_REWARD: i64 = 50;

/// Parameters for creating a new lesson
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateLessonParams {
    /// Lesson title
    pub title: String,
    pub description: Option<String>,
    /// Language being learned
    pub language: String,
    /// Difficulty 1-10 (default 1)
    pub level: Option<u8>,
    /// Paragraph of 3-4 sentences from the source text
    #[serde(default)]
    pub context: String,
    /// Sentence from the context to translate
    #[serde(default)]
    pub target_sentence: String,
    #[serde(default)]
    pub correct_translation: String,
    pub source_title: Option<String>,
    pub source_author: Option<String>,
    /// Minimum vocabulary level 0-100 (default 0)
    pub required_vocabulary: Option<i64>,
    pub required_grammar: Option<i64>,
    pub required_reading: Option<i64>,
    pub required_writing: Option<i64>,
    /// Vocabulary gained on completion (default 5)
    pub vocabulary_gain: Option<i64>,
    pub grammar_gain: Option<i64>,
    pub reading_gain: Option<i64>,
    pub writing_gain: Option<i64>,
    /// XP granted on completion (default 50)
    pub xp_reward: Option<i64>,
    /// Who authored the lesson
    pub created_by: Option<String>,
    /// Whether learners can see the lesson (default true)
    pub is_active: Option<bool>,
    /// Position in the catalog (default: after the last lesson)
    pub order: Option<i64>,
}

/// Response from creating a lesson
#[derive(Debug, Serialize)]
pub struct CreateLessonResponse {
    pub success: bool,
    pub lesson_id: String,
    pub message: String,
}

/// Convert a signed prerequisite into a skill threshold
pub(crate) fn parse_threshold(name: &str, value: i64) -> Result<u8, DomainError> {
    if !(0..=i64::from(MAX_SKILL_LEVEL)).contains(&value) {
        return Err(DomainError::InvalidThreshold(format!(
            "{} requirement must be between 0 and {}, got {}",
            name, MAX_SKILL_LEVEL, value
        )));
    }
    Ok(value as u8)
}

/// Create a new lesson using the provided storage
pub fn create_lesson<S: ProgressStorage>(
    storage: &S,
    params: CreateLessonParams,
) -> Result<CreateLessonResponse, ServerError> {
    let requirements = SkillLevels::new(
        parse_threshold("Vocabulary", params.required_vocabulary.unwrap_or(0))?,
        parse_threshold("Grammar", params.required_grammar.unwrap_or(0))?,
        parse_threshold("Reading", params.required_reading.unwrap_or(0))?,
        parse_threshold("Writing", params.required_writing.unwrap_or(0))?,
    );

    let reward = RewardConfig::from_raw(
        params.vocabulary_gain.unwrap_or(DEFAULT_SKILL_GAIN),
        params.grammar_gain.unwrap_or(DEFAULT_SKILL_GAIN),
        params.reading_gain.unwrap_or(DEFAULT_SKILL_GAIN),
        params.writing_gain.unwrap_or(DEFAULT_SKILL_GAIN),
        params.xp_reward.unwrap_or(DEFAULT_XP_REWARD),
    )?;

    let order = match params.order {
        Some(order) => order,
        None => storage
            .list_lessons(false)?
            .iter()
            .map(|lesson| lesson.order)
            .max()
            .map_or(1, |max| max + 1),
    };

    let lesson = Lesson::new(LessonDraft {
        title: params.title,
        description: params.description,
        language: params.language,
        level: params.level.unwrap_or(DEFAULT_LEVEL),
        content: LessonContent {
            context: params.context,
            target_sentence: params.target_sentence,
            correct_translation: params.correct_translation,
            source_title: params.source_title,
            source_author: params.source_author,
        },
        requirements,
        reward,
        created_by: params.created_by.unwrap_or_else(|| "admin".to_string()),
        is_active: params.is_active.unwrap_or(true),
        order,
    })?;

    storage.create_lesson(&lesson)?;

    Ok(CreateLessonResponse {
        success: true,
        lesson_id: lesson.id.to_string(),
        message: format!(
            "📚 Created lesson '{}' ({}, level {}) at position {}",
            lesson.title, lesson.language, lesson.level, lesson.order
        ),
    })
}
