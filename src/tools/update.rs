/// Tools for changing existing lessons
///
/// This module implements the lesson_update and lesson_delete MCP tools.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use crate::domain::{DomainError, LessonContent, LessonId, LessonUpdate, RewardConfig, SkillLevels};
use crate::storage::ProgressStorage;
use crate::tools::create::parse_threshold;
use crate::ServerError;

/// Parameters for updating an existing lesson; omitted fields are unchanged
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct UpdateLessonParams {
    pub lesson_id: String,
    pub title: Option<String>,
    /// An empty string clears the description
    pub description: Option<String>,
    pub language: Option<String>,
    pub level: Option<u8>,
    pub context: Option<String>,
    pub target_sentence: Option<String>,
    pub correct_translation: Option<String>,
    /// An empty string clears the source title
    pub source_title: Option<String>,
    /// An empty string clears the source author
    pub source_author: Option<String>,
    pub required_vocabulary: Option<i64>,
    pub required_grammar: Option<i64>,
    pub required_reading: Option<i64>,
    pub required_writing: Option<i64>,
    pub vocabulary_gain: Option<i64>,
    pub grammar_gain: Option<i64>,
    pub reading_gain: Option<i64>,
    pub writing_gain: Option<i64>,
    pub xp_reward: Option<i64>,
    /// false hides the lesson from learners
    pub is_active: Option<bool>,
    pub order: Option<i64>,
}

/// Parameters for deleting a lesson
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteLessonParams {
    pub lesson_id: String,
}

/// Response from updating or deleting a lesson
#[derive(Debug, Serialize)]
pub struct UpdateLessonResponse {
    pub success: bool,
    pub message: String,
}

/// Update an existing lesson using the provided storage
pub fn update_lesson<S: ProgressStorage>(
    storage: &S,
    params: UpdateLessonParams,
) -> Result<UpdateLessonResponse, ServerError> {
    let lesson_id = LessonId::parse(&params.lesson_id)?;
    let mut lesson = storage.get_lesson(&lesson_id)?;

    let requirements = if params.required_vocabulary.is_some()
        || params.required_grammar.is_some()
        || params.required_reading.is_some()
        || params.required_writing.is_some()
    {
        let current = lesson.requirements;
        Some(SkillLevels::new(
            merge_threshold("Vocabulary", params.required_vocabulary, current.vocabulary)?,
            merge_threshold("Grammar", params.required_grammar, current.grammar)?,
            merge_threshold("Reading", params.required_reading, current.reading)?,
            merge_threshold("Writing", params.required_writing, current.writing)?,
        ))
    } else {
        None
    };

    let reward = if params.vocabulary_gain.is_some()
        || params.grammar_gain.is_some()
        || params.reading_gain.is_some()
        || params.writing_gain.is_some()
        || params.xp_reward.is_some()
    {
        let current = lesson.reward;
        Some(RewardConfig::from_raw(
            params.vocabulary_gain.unwrap_or(i64::from(current.gains.vocabulary)),
            params.grammar_gain.unwrap_or(i64::from(current.gains.grammar)),
            params.reading_gain.unwrap_or(i64::from(current.gains.reading)),
            params.writing_gain.unwrap_or(i64::from(current.gains.writing)),
            params.xp_reward.unwrap_or(i64::from(current.xp_reward)),
        )?)
    } else {
        None
    };

    let content = if params.context.is_some()
        || params.target_sentence.is_some()
        || params.correct_translation.is_some()
        || params.source_title.is_some()
        || params.source_author.is_some()
    {
        let current = lesson.content.clone();
        Some(LessonContent {
            context: params.context.unwrap_or(current.context),
            target_sentence: params.target_sentence.unwrap_or(current.target_sentence),
            correct_translation: params.correct_translation.unwrap_or(current.correct_translation),
            source_title: merge_optional_text(params.source_title, current.source_title),
            source_author: merge_optional_text(params.source_author, current.source_author),
        })
    } else {
        None
    };

    lesson.update(LessonUpdate {
        title: params.title,
        description: params.description.map(clear_if_blank),
        language: params.language,
        level: params.level,
        content,
        requirements,
        reward,
        is_active: params.is_active,
        order: params.order,
    })?;

    storage.update_lesson(&lesson)?;

    let message = match params.is_active {
        Some(false) => format!("⏸️ Deactivated lesson '{}'", lesson.title),
        Some(true) => format!("▶️ Activated lesson '{}'", lesson.title),
        None => format!("✅ Updated lesson '{}'", lesson.title),
    };

    Ok(UpdateLessonResponse { success: true, message })
}

/// Delete a lesson from the catalog
///
/// Learners who completed it keep the id in their completed set; it simply
/// never matches an active lesson again.
pub fn delete_lesson<S: ProgressStorage>(
    storage: &S,
    params: DeleteLessonParams,
) -> Result<UpdateLessonResponse, ServerError> {
    let lesson_id = LessonId::parse(&params.lesson_id)?;
    let lesson = storage.get_lesson(&lesson_id)?;
    storage.delete_lesson(&lesson_id)?;

    Ok(UpdateLessonResponse {
        success: true,
        message: format!("🗑️ Deleted lesson '{}'", lesson.title),
    })
}

fn merge_threshold(name: &str, new_value: Option<i64>, current: u8) -> Result<u8, DomainError> {
    match new_value {
        Some(value) => parse_threshold(name, value),
        None => Ok(current),
    }
}

fn clear_if_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn merge_optional_text(new_value: Option<String>, current: Option<String>) -> Option<String> {
    match new_value {
        Some(value) => clear_if_blank(value),
        None => current,
    }
}
