/// Daily practice streak tracking
///
/// A streak counts consecutive UTC calendar days on which the learner
/// completed at least one lesson. Only the last practice date is stored, so
/// the streak is advanced one completion at a time by a small state machine
/// instead of being recomputed from a history of entries.

use serde::{Deserialize, Serialize};
use chrono::NaiveDate;

/// How a completion on `today` affects the streak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakTransition {
    /// Last practice was yesterday: the streak grows by one
    Continued,
    /// Already practiced today: the streak is unchanged
    SameDay,
    /// First practice ever: the streak starts at one
    Started,
    /// A gap of more than one day (or a last date after `today`): back to one
    Reset,
}

impl StreakTransition {
    /// Decide the transition from the last practice date
    pub fn evaluate(last_practice: Option<NaiveDate>, today: NaiveDate) -> Self {
        match last_practice {
            None => StreakTransition::Started,
            Some(last) if last == today => StreakTransition::SameDay,
            Some(last) if today.pred_opt() == Some(last) => StreakTransition::Continued,
            Some(_) => StreakTransition::Reset,
        }
    }

    /// Apply this transition to the current streak count
    pub fn apply(&self, current_streak: u32) -> u32 {
        match self {
            StreakTransition::Continued => current_streak.saturating_add(1),
            StreakTransition::SameDay => current_streak,
            StreakTransition::Started | StreakTransition::Reset => 1,
        }
    }
}

/// Advance a streak for a completion on `today`
///
/// Returns the new streak and the transition taken. The caller always stores
/// `today` as the new last practice date.
pub fn advance_streak(
    current_streak: u32,
    last_practice: Option<NaiveDate>,
    today: NaiveDate,
) -> (u32, StreakTransition) {
    let transition = StreakTransition::evaluate(last_practice, today);
    (transition.apply(current_streak), transition)
}

/// Get a motivational message for a streak length
pub fn streak_message(streak: u32) -> String {
    match streak {
        0 => "Ready to start your streak! Complete a lesson today.".to_string(),
        1 => "Great start! One day down, keep the momentum going.".to_string(),
        2..=6 => format!("Nice work! {} days in a row.", streak),
        7..=29 => format!("Excellent! {} days strong. You're in the groove now!", streak),
        _ => format!("Incredible! {} days of practice. Keep reading!", streak),
    }
}
