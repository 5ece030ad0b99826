/// Progression updater
///
/// Pure computation of the snapshot that results from completing a lesson.
/// Nothing here touches storage or reads a clock; `today` is always passed
/// in by the caller.

use chrono::NaiveDate;
use crate::domain::{advance_streak, LessonId, RewardConfig, SkillSnapshot, StreakTransition};

/// Compute the snapshot after completing `lesson_id` on `today`
///
/// Skills gain with a cap at 100, XP accumulates, the streak advances by the
/// daily state machine and the lesson joins the completed set if absent.
/// The revision is carried over untouched; storage bumps it on write.
pub fn complete_lesson(
    snapshot: &SkillSnapshot,
    lesson_id: &LessonId,
    reward: &RewardConfig,
    today: NaiveDate,
) -> SkillSnapshot {
    apply_completion(snapshot, lesson_id, reward, today).0
}

/// Same as [`complete_lesson`] but also reports the streak transition taken
pub fn apply_completion(
    snapshot: &SkillSnapshot,
    lesson_id: &LessonId,
    reward: &RewardConfig,
    today: NaiveDate,
) -> (SkillSnapshot, StreakTransition) {
    let (streak, transition) = advance_streak(snapshot.streak, snapshot.last_practice_date, today);

    let mut completed_lessons = snapshot.completed_lessons.clone();
    completed_lessons.insert(lesson_id.clone());

    let updated = SkillSnapshot {
        learner_id: snapshot.learner_id.clone(),
        skills: snapshot.skills.gain_clamped(&reward.gains),
        total_xp: snapshot.total_xp.saturating_add(u64::from(reward.xp_reward)),
        streak,
        last_practice_date: Some(today),
        completed_lessons,
        revision: snapshot.revision,
    };

    (updated, transition)
}
