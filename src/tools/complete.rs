/// Tool for recording lesson completions
///
/// This module implements the lesson_complete MCP tool.

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use crate::domain::{streak_message, LearnerId, LessonId, Skill, SkillLevels, StreakTransition};
use crate::engine::ProgressionEngine;
use crate::storage::ProgressStorage;
use crate::ServerError;

/// Parameters for completing a lesson
///
/// The completion always counts for the server's current UTC date, so
/// unknown fields such as a caller-chosen date are rejected.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CompleteLessonParams {
    pub learner_id: String,
    pub lesson_id: String,
}

/// Response from completing a lesson
#[derive(Debug, Serialize)]
pub struct CompleteLessonResponse {
    pub success: bool,
    pub message: String,
    pub skills: SkillLevels,
    pub total_xp: u64,
    pub xp_gained: u64,
    pub streak: u32,
    pub streak_transition: StreakTransition,
    pub improved_skills: Vec<Skill>,
    pub newly_completed: bool,
}

/// Complete a lesson for a learner on `today`, the server's UTC date, and
/// persist the new snapshot
pub fn record_completion<S: ProgressStorage>(
    storage: &S,
    engine: &ProgressionEngine,
    today: NaiveDate,
    params: CompleteLessonParams,
) -> Result<CompleteLessonResponse, ServerError> {
    let learner_id = LearnerId::parse(&params.learner_id)?;
    let lesson_id = LessonId::parse(&params.lesson_id)?;
    let outcome = engine.complete_lesson(storage, &learner_id, &lesson_id, today)?;
    let updated = &outcome.updated;
    let xp_gained = updated.total_xp - outcome.previous.total_xp;

    let mut message = format!(
        "🎉 Lesson complete! +{} XP (total {})\n🔥 {}",
        xp_gained,
        updated.total_xp,
        streak_message(updated.streak)
    );
    if !outcome.improved_skills.is_empty() {
        let improved = outcome
            .improved_skills
            .iter()
            .map(|skill| format!("{} {}", skill, updated.level(*skill)))
            .collect::<Vec<_>>()
            .join(", ");
        message.push_str(&format!("\n📈 Improved: {}", improved));
    }
    if !outcome.newly_completed {
        message.push_str("\n(Lesson was already completed; practice still counts.)");
    }

    Ok(CompleteLessonResponse {
        success: true,
        message,
        skills: updated.skills,
        total_xp: updated.total_xp,
        xp_gained,
        streak: updated.streak,
        streak_transition: outcome.streak_transition,
        improved_skills: outcome.improved_skills.clone(),
        newly_completed: outcome.newly_completed,
    })
}
