//! Streak tracking
//!
//! Login and quiz streaks follow the same once-per-calendar-day rule.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::progression::calendar::is_previous_day;

/// Type of streak being tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreakKind {
    /// Consecutive days with at least one login
    Login,
    /// Consecutive days with at least one quiz submission
    Quiz,
}

impl StreakKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Quiz => "quiz",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Login => "Login Streak",
            Self::Quiz => "Quiz Streak",
        }
    }
}

/// Result of presenting one event to a streak
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakUpdate {
    /// An event was already counted for this day
    AlreadyCounted,
    /// Last event was yesterday
    Extended { count: u32 },
    /// Gap, or first-ever event
    Restarted,
}

impl StreakUpdate {
    /// New streak length, `None` if the event was not counted
    pub fn count(&self) -> Option<u32> {
        match self {
            Self::AlreadyCounted => None,
            Self::Extended { count } => Some(*count),
            Self::Restarted => Some(1),
        }
    }

    /// Whether this is the first counted event of the day
    pub fn is_new_day(&self) -> bool {
        !matches!(self, Self::AlreadyCounted)
    }
}

/// Decide how an event on `today` affects a streak last counted on `last`.
///
/// A `last` date after `today` only happens with clock skew and counts as
/// already counted.
pub fn track(current: u32, last: Option<NaiveDate>, today: NaiveDate) -> StreakUpdate {
    let Some(last) = last else {
        return StreakUpdate::Restarted;
    };

    if last >= today {
        StreakUpdate::AlreadyCounted
    } else if is_previous_day(last, today) {
        StreakUpdate::Extended {
            count: current.saturating_add(1),
        }
    } else {
        StreakUpdate::Restarted
    }
}

/// Apply an event to a `(count, last_date)` pair in place
pub fn record(count: &mut u32, last: &mut Option<NaiveDate>, today: NaiveDate) -> StreakUpdate {
    let update = track(*count, *last, today);
    if let Some(new_count) = update.count() {
        *count = new_count;
        *last = Some(today);
    }
    update
}
