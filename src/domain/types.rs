/// Core types used throughout the domain layer
///
/// This module defines identifier types and the `Skill` enum that the
/// snapshot, lesson and catalog modules are built on.

use std::fmt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::DomainError;

/// Upper bound for every skill level and prerequisite threshold
pub const MAX_SKILL_LEVEL: u8 = 100;

/// Unique identifier for a lesson
///
/// Lesson ids are opaque strings. Lessons created through this server get a
/// UUID, but ids imported from elsewhere are accepted as-is.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LessonId(pub String);

impl LessonId {
    /// Generate a new random lesson ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a lesson ID from a string, rejecting blank input
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidId("Lesson ID cannot be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LessonId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LessonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the learner who owns a skill snapshot
///
/// This comes from the authentication layer and is never generated here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LearnerId(pub String);

impl LearnerId {
    /// Create a learner ID from a string, rejecting blank input
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidId("Learner ID cannot be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LearnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The four skills every learner is measured on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Skill {
    Vocabulary,
    Grammar,
    Reading,
    Writing,
}

impl Skill {
    /// All skills in display order
    pub const ALL: [Skill; 4] = [
        Skill::Vocabulary,
        Skill::Grammar,
        Skill::Reading,
        Skill::Writing,
    ];

    /// Get the display name for this skill
    pub fn display_name(&self) -> &'static str {
        match self {
            Skill::Vocabulary => "Vocabulary",
            Skill::Grammar => "Grammar",
            Skill::Reading => "Reading",
            Skill::Writing => "Writing",
        }
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One value per skill
///
/// Used for learner levels, lesson prerequisites and lesson gains alike, so
/// the per-skill arithmetic is written once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillLevels {
    pub vocabulary: u8,
    pub grammar: u8,
    pub reading: u8,
    pub writing: u8,
}

impl SkillLevels {
    pub fn new(vocabulary: u8, grammar: u8, reading: u8, writing: u8) -> Self {
        Self { vocabulary, grammar, reading, writing }
    }

    /// The same value for every skill
    pub fn uniform(value: u8) -> Self {
        Self::new(value, value, value, value)
    }

    pub fn get(&self, skill: Skill) -> u8 {
        match skill {
            Skill::Vocabulary => self.vocabulary,
            Skill::Grammar => self.grammar,
            Skill::Reading => self.reading,
            Skill::Writing => self.writing,
        }
    }

    fn get_mut(&mut self, skill: Skill) -> &mut u8 {
        match skill {
            Skill::Vocabulary => &mut self.vocabulary,
            Skill::Grammar => &mut self.grammar,
            Skill::Reading => &mut self.reading,
            Skill::Writing => &mut self.writing,
        }
    }

    /// Add `gains` to every skill, capping each result at `MAX_SKILL_LEVEL`
    pub fn gain_clamped(&self, gains: &SkillLevels) -> SkillLevels {
        let mut next = *self;
        for skill in Skill::ALL {
            let sum = u16::from(self.get(skill)) + u16::from(gains.get(skill));
            *next.get_mut(skill) = sum.min(u16::from(MAX_SKILL_LEVEL)) as u8;
        }
        next
    }

    /// True when every skill is at least the corresponding value in `required`
    pub fn satisfies(&self, required: &SkillLevels) -> bool {
        Skill::ALL.iter().all(|&skill| self.get(skill) >= required.get(skill))
    }

    /// Check every value is within [0, 100]
    pub fn validate(&self, what: &str) -> Result<(), DomainError> {
        for skill in Skill::ALL {
            let value = self.get(skill);
            if value > MAX_SKILL_LEVEL {
                return Err(DomainError::InvalidThreshold(format!(
                    "{} {} must be between 0 and {}, got {}",
                    skill.display_name(), what, MAX_SKILL_LEVEL, value
                )));
            }
        }
        Ok(())
    }
}
