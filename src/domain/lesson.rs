/// Lesson entity and related functionality
///
/// A lesson is authored by an admin and is immutable from the progression
/// engine's point of view. It carries the prerequisites that gate it, the
/// reward granted on completion, and the excerpt the learner translates.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::domain::{DomainError, LessonId, SkillLevels, MAX_SKILL_LEVEL};

const MAX_TITLE_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 1000;
const MIN_LEVEL: u8 = 1;
const MAX_LEVEL: u8 = 10;

/// Skill gains and XP granted when a lesson is completed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardConfig {
    pub gains: SkillLevels,
    pub xp_reward: u32,
}

impl RewardConfig {
    pub fn new(gains: SkillLevels, xp_reward: u32) -> Self {
        Self { gains, xp_reward }
    }

    /// Build a reward from untrusted signed input
    ///
    /// Negative gains or XP are a contract violation and are rejected instead
    /// of being allowed to pull a skill below zero.
    pub fn from_raw(
        vocabulary_gain: i64,
        grammar_gain: i64,
        reading_gain: i64,
        writing_gain: i64,
        xp_reward: i64,
    ) -> Result<Self, DomainError> {
        let gain = |name: &str, value: i64| -> Result<u8, DomainError> {
            if value < 0 {
                return Err(DomainError::InvalidReward(format!(
                    "{} gain cannot be negative, got {}", name, value
                )));
            }
            if value > i64::from(MAX_SKILL_LEVEL) {
                return Err(DomainError::InvalidReward(format!(
                    "{} gain cannot exceed {}, got {}", name, MAX_SKILL_LEVEL, value
                )));
            }
            Ok(value as u8)
        };

        let gains = SkillLevels::new(
            gain("Vocabulary", vocabulary_gain)?,
            gain("Grammar", grammar_gain)?,
            gain("Reading", reading_gain)?,
            gain("Writing", writing_gain)?,
        );

        let xp_reward = u32::try_from(xp_reward).map_err(|_| {
            DomainError::InvalidReward(format!(
                "XP reward must be between 0 and {}, got {}", u32::MAX, xp_reward
            ))
        })?;

        Ok(Self { gains, xp_reward })
    }

    fn validate(&self) -> Result<(), DomainError> {
        self.gains
            .validate("gain")
            .map_err(|e| DomainError::InvalidReward(e.to_string()))
    }
}

/// The literary excerpt a lesson asks the learner to translate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonContent {
    /// A paragraph of 3-4 sentences from the source text
    pub context: String,
    /// The sentence within `context` to translate
    pub target_sentence: String,
    pub correct_translation: String,
    pub source_title: Option<String>,
    pub source_author: Option<String>,
}

/// Everything needed to create a lesson; the id and timestamps are assigned
/// by `Lesson::new`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LessonDraft {
    pub title: String,
    pub description: Option<String>,
    pub language: String,
    pub level: u8,
    pub content: LessonContent,
    pub requirements: SkillLevels,
    pub reward: RewardConfig,
    pub created_by: String,
    pub is_active: bool,
    pub order: i64,
}

/// Partial update applied by an admin; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct LessonUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub language: Option<String>,
    pub level: Option<u8>,
    pub content: Option<LessonContent>,
    pub requirements: Option<SkillLevels>,
    pub reward: Option<RewardConfig>,
    pub is_active: Option<bool>,
    pub order: Option<i64>,
}

/// A lesson in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    pub title: String,
    pub description: Option<String>,
    /// Language being learned (e.g. "Spanish")
    pub language: String,
    /// Difficulty from 1 to 10
    pub level: u8,
    pub content: LessonContent,
    /// Minimum skill levels a learner needs before the lesson is offered
    pub requirements: SkillLevels,
    pub reward: RewardConfig,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    /// Inactive lessons are never offered to learners
    pub is_active: bool,
    /// Display order only; never used for gating
    pub order: i64,
}

impl Lesson {
    /// Create a new lesson with validation
    pub fn new(draft: LessonDraft) -> Result<Self, DomainError> {
        Self::validate_title(&draft.title)?;
        Self::validate_description(&draft.description)?;
        Self::validate_language(&draft.language)?;
        Self::validate_level(draft.level)?;
        draft.requirements.validate("requirement")?;
        draft.reward.validate()?;

        Ok(Self {
            id: LessonId::new(),
            title: draft.title.trim().to_string(),
            description: draft.description,
            language: draft.language.trim().to_string(),
            level: draft.level,
            content: draft.content,
            requirements: draft.requirements,
            reward: draft.reward,
            created_by: draft.created_by,
            created_at: Utc::now(),
            is_active: draft.is_active,
            order: draft.order,
        })
    }

    /// Apply an admin update, validating every changed field first so a
    /// rejected update leaves the lesson untouched
    pub fn update(&mut self, update: LessonUpdate) -> Result<(), DomainError> {
        if let Some(ref title) = update.title {
            Self::validate_title(title)?;
        }
        if let Some(ref description) = update.description {
            Self::validate_description(description)?;
        }
        if let Some(ref language) = update.language {
            Self::validate_language(language)?;
        }
        if let Some(level) = update.level {
            Self::validate_level(level)?;
        }
        if let Some(ref requirements) = update.requirements {
            requirements.validate("requirement")?;
        }
        if let Some(ref reward) = update.reward {
            reward.validate()?;
        }

        if let Some(title) = update.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(language) = update.language {
            self.language = language.trim().to_string();
        }
        if let Some(level) = update.level {
            self.level = level;
        }
        if let Some(content) = update.content {
            self.content = content;
        }
        if let Some(requirements) = update.requirements {
            self.requirements = requirements;
        }
        if let Some(reward) = update.reward {
            self.reward = reward;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        if let Some(order) = update.order {
            self.order = order;
        }

        Ok(())
    }

    // Validation helper methods

    fn validate_title(title: &str) -> Result<(), DomainError> {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return Err(DomainError::Validation {
                message: "Lesson title cannot be empty".to_string(),
            });
        }
        if trimmed.chars().count() > MAX_TITLE_LEN {
            return Err(DomainError::Validation {
                message: format!("Lesson title cannot be longer than {} characters", MAX_TITLE_LEN),
            });
        }
        Ok(())
    }

    fn validate_description(description: &Option<String>) -> Result<(), DomainError> {
        if let Some(desc) = description {
            if desc.chars().count() > MAX_DESCRIPTION_LEN {
                return Err(DomainError::Validation {
                    message: format!(
                        "Description cannot be longer than {} characters",
                        MAX_DESCRIPTION_LEN
                    ),
                });
            }
        }
        Ok(())
    }

    fn validate_language(language: &str) -> Result<(), DomainError> {
        if language.trim().is_empty() {
            return Err(DomainError::Validation {
                message: "Lesson language cannot be empty".to_string(),
            });
        }
        Ok(())
    }

    fn validate_level(level: u8) -> Result<(), DomainError> {
        if !(MIN_LEVEL..=MAX_LEVEL).contains(&level) {
            return Err(DomainError::InvalidLevel(format!(
                "Level must be between {} and {}, got {}", MIN_LEVEL, MAX_LEVEL, level
            )));
        }
        Ok(())
    }
}
