/// Tool for checking a learner's skills and streak
///
/// This module implements the skills_status MCP tool.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use crate::domain::{streak_message, LearnerId, Skill, SkillLevels};
use crate::engine::ProgressionEngine;
use crate::storage::ProgressStorage;
use crate::ServerError;

/// Parameters for checking skill status
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SkillsStatusParams {
    pub learner_id: String,
    /// Include titles of completed lessons (default false)
    pub include_history: Option<bool>,
}

/// A completed lesson still present in the catalog
#[derive(Debug, Serialize)]
pub struct CompletedLesson {
    pub lesson_id: String,
    pub title: String,
}

/// Response from checking skill status
#[derive(Debug, Serialize)]
pub struct SkillsStatusResponse {
    pub learner_id: String,
    pub skills: SkillLevels,
    pub total_xp: u64,
    pub streak: u32,
    pub last_practice_date: Option<String>,
    pub completed_count: usize,
    pub completed: Vec<CompletedLesson>,
    pub message: String,
}

/// Get a learner's status, creating their zero-valued record on first use
pub fn skills_status<S: ProgressStorage>(
    storage: &S,
    engine: &ProgressionEngine,
    params: SkillsStatusParams,
) -> Result<SkillsStatusResponse, ServerError> {
    let learner_id = LearnerId::parse(&params.learner_id)?;
    let snapshot = storage.ensure_skill_snapshot(&learner_id)?;

    let completed: Vec<CompletedLesson> = if params.include_history.unwrap_or(false) {
        engine
            .completed_lessons(storage, &snapshot)?
            .into_iter()
            .map(|lesson| CompletedLesson {
                lesson_id: lesson.id.to_string(),
                title: lesson.title,
            })
            .collect()
    } else {
        Vec::new()
    };

    let skill_lines = Skill::ALL
        .iter()
        .map(|skill| format!("   {}: {}/100", skill, snapshot.level(*skill)))
        .collect::<Vec<_>>()
        .join("\n");

    let mut message = format!(
        "📊 Skills\n{}\n⭐ {} XP | 🔥 {}-day streak\n{}",
        skill_lines,
        snapshot.total_xp,
        snapshot.streak,
        streak_message(snapshot.streak)
    );
    if let Some(last) = snapshot.last_practice_date {
        message.push_str(&format!("\nLast practiced: {}", last));
    }
    if !completed.is_empty() {
        let titles = completed
            .iter()
            .map(|c| format!("   ✅ {}", c.title))
            .collect::<Vec<_>>()
            .join("\n");
        message.push_str(&format!("\nCompleted lessons:\n{}", titles));
    }

    Ok(SkillsStatusResponse {
        learner_id: learner_id.to_string(),
        skills: snapshot.skills,
        total_xp: snapshot.total_xp,
        streak: snapshot.streak,
        last_practice_date: snapshot.last_practice_date.map(|d| d.to_string()),
        completed_count: snapshot.completed_lessons.len(),
        completed,
        message,
    })
}
