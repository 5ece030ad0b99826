/// Learner skill snapshot
///
/// One record per learner holding the four skill levels, XP, the practice
/// streak and the set of completed lessons. The snapshot is replaced as a
/// whole on every completion; it is never patched field by field.

use std::collections::BTreeSet;
use serde::{Deserialize, Serialize};
use chrono::NaiveDate;
use crate::domain::{DomainError, LearnerId, LessonId, Skill, SkillLevels};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillSnapshot {
    pub learner_id: LearnerId,
    /// Current level per skill, each within [0, 100]
    pub skills: SkillLevels,
    /// Never decreases
    pub total_xp: u64,
    /// Consecutive practice days
    pub streak: u32,
    /// `None` until the first completion
    pub last_practice_date: Option<NaiveDate>,
    /// Each lesson id appears at most once
    pub completed_lessons: BTreeSet<LessonId>,
    /// Storage revision this snapshot was read at; 0 if never persisted
    #[serde(default)]
    pub revision: u64,
}

impl SkillSnapshot {
    /// Zero-valued snapshot for a learner who has never been evaluated
    pub fn new(learner_id: LearnerId) -> Self {
        Self {
            learner_id,
            skills: SkillLevels::default(),
            total_xp: 0,
            streak: 0,
            last_practice_date: None,
            completed_lessons: BTreeSet::new(),
            revision: 0,
        }
    }

    /// Rebuild a snapshot from stored data, checking the skill range
    pub fn from_existing(
        learner_id: LearnerId,
        skills: SkillLevels,
        total_xp: u64,
        streak: u32,
        last_practice_date: Option<NaiveDate>,
        completed_lessons: BTreeSet<LessonId>,
        revision: u64,
    ) -> Result<Self, DomainError> {
        skills.validate("level")?;
        Ok(Self {
            learner_id,
            skills,
            total_xp,
            streak,
            last_practice_date,
            completed_lessons,
            revision,
        })
    }

    pub fn level(&self, skill: Skill) -> u8 {
        self.skills.get(skill)
    }

    pub fn has_completed(&self, lesson_id: &LessonId) -> bool {
        self.completed_lessons.contains(lesson_id)
    }

    /// Skills whose level is higher here than in `before`
    pub fn improved_skills(&self, before: &SkillSnapshot) -> Vec<Skill> {
        Skill::ALL
            .into_iter()
            .filter(|&skill| self.level(skill) > before.level(skill))
            .collect()
    }

    /// Ids of completed lessons, in a stable order
    pub fn completed_ids(&self) -> Vec<LessonId> {
        self.completed_lessons.iter().cloned().collect()
    }
}
