//! Progression rules: badges, levels, streaks and themes
//!
//! Pure functions over domain types. Nothing here touches storage.

pub mod badges;
pub mod levels;
pub mod streaks;
pub mod themes;

pub use badges::{DEFAULT_SPEED_GENIUS_SECS, average_answer_time, check_quiz_badges};
pub use levels::{DEFAULT_XP_PER_LEVEL, LevelUp, LevelingOutcome, XpRewards, apply_xp, xp_to_leave};
pub use streaks::{StreakKind, StreakUpdate};
pub use themes::{THEME_LADDER, ThemeUnlock, unlock_for_level};
