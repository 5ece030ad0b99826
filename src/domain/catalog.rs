/// Catalog filter
///
/// Decides which lessons a learner may attempt. Every function here is a
/// pure function of a snapshot and a lesson sequence, and none of them
/// reorder their input.

use serde::Serialize;
use crate::domain::{Lesson, Skill, SkillSnapshot};

/// Where a lesson stands for a particular learner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonStatus {
    Completed,
    Available,
    Locked,
}

/// A prerequisite the learner has not reached yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillGap {
    pub skill: Skill,
    pub required: u8,
    pub current: u8,
}

/// One lesson on the learner's path, with the reason it is locked
#[derive(Debug, Clone, Serialize)]
pub struct PathEntry<'a> {
    pub lesson: &'a Lesson,
    pub status: LessonStatus,
    pub missing: Vec<SkillGap>,
}

/// True when every skill meets the lesson's threshold
pub fn meets_prerequisites(snapshot: &SkillSnapshot, lesson: &Lesson) -> bool {
    snapshot.skills.satisfies(&lesson.requirements)
}

/// Lessons the learner can attempt right now, in input order
///
/// A lesson qualifies when it is active, all four prerequisites hold and it
/// is not in the learner's completed set.
pub fn select_available<'a>(snapshot: &SkillSnapshot, lessons: &'a [Lesson]) -> Vec<&'a Lesson> {
    lessons
        .iter()
        .filter(|lesson| lesson.is_active)
        .filter(|lesson| !snapshot.has_completed(&lesson.id))
        .filter(|lesson| meets_prerequisites(snapshot, lesson))
        .collect()
}

/// Status of a single lesson; completion takes precedence over prerequisites
pub fn lesson_status(snapshot: &SkillSnapshot, lesson: &Lesson) -> LessonStatus {
    if snapshot.has_completed(&lesson.id) {
        LessonStatus::Completed
    } else if meets_prerequisites(snapshot, lesson) {
        LessonStatus::Available
    } else {
        LessonStatus::Locked
    }
}

/// Every skill whose requirement exceeds the learner's current level
pub fn missing_requirements(snapshot: &SkillSnapshot, lesson: &Lesson) -> Vec<SkillGap> {
    Skill::ALL
        .into_iter()
        .filter_map(|skill| {
            let required = lesson.requirements.get(skill);
            let current = snapshot.level(skill);
            (required > current).then_some(SkillGap { skill, required, current })
        })
        .collect()
}

/// Status and gaps for every active lesson, in input order
pub fn lesson_path<'a>(snapshot: &SkillSnapshot, lessons: &'a [Lesson]) -> Vec<PathEntry<'a>> {
    lessons
        .iter()
        .filter(|lesson| lesson.is_active)
        .map(|lesson| PathEntry {
            lesson,
            status: lesson_status(snapshot, lesson),
            missing: missing_requirements(snapshot, lesson),
        })
        .collect()
}
