use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::badge::BadgeId;

/// Theme every user may select without unlocking anything
pub const DEFAULT_THEME: &str = "Default";

/// Per-user progression state
///
/// Mutated only through the engine's settle operations. `xp` is the XP held
/// within the current level, `total_xp` is lifetime XP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProgression {
    pub user_id: String,
    pub xp: u64,
    pub total_xp: u64,
    pub level: u32,
    pub badges: BTreeSet<BadgeId>,
    pub unlocked_themes: BTreeSet<String>,
    pub selected_theme: String,
    pub login_streak: u32,
    pub last_login_date: Option<NaiveDate>,
    pub quiz_streak: u32,
    pub last_quiz_date: Option<NaiveDate>,
    /// Registration time (ms since epoch)
    pub created_at: i64,
}

impl UserProgression {
    /// Fresh progression for a newly registered user
    pub fn new(user_id: impl Into<String>, created_at: i64) -> Self {
        Self {
            user_id: user_id.into(),
            xp: 0,
            total_xp: 0,
            level: 1,
            badges: BTreeSet::new(),
            unlocked_themes: BTreeSet::new(),
            selected_theme: DEFAULT_THEME.to_string(),
            login_streak: 0,
            last_login_date: None,
            quiz_streak: 0,
            last_quiz_date: None,
            created_at,
        }
    }

    /// XP still missing before the next level-up
    pub fn xp_to_next_level(&self, xp_per_level: u64) -> u64 {
        (u64::from(self.level) * xp_per_level).saturating_sub(self.xp)
    }

    /// Progress within the current level (0.0 - 1.0)
    pub fn progress_to_next(&self, xp_per_level: u64) -> f32 {
        let needed = u64::from(self.level) * xp_per_level;
        if needed == 0 {
            1.0
        } else {
            (self.xp as f32) / (needed as f32)
        }
    }

    pub fn has_theme(&self, theme: &str) -> bool {
        theme == DEFAULT_THEME || self.unlocked_themes.contains(theme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_progression_defaults() {
        let p = UserProgression::new("ada", 0);
        assert_eq!(p.level, 1);
        assert_eq!(p.xp, 0);
        assert_eq!(p.selected_theme, DEFAULT_THEME);
        assert!(p.badges.is_empty());
        assert!(p.unlocked_themes.is_empty());
        assert!(p.last_login_date.is_none());
    }

    #[test]
    fn test_progress_to_next() {
        let mut p = UserProgression::new("ada", 0);
        p.level = 2;
        p.xp = 50;
        assert_eq!(p.xp_to_next_level(100), 150);
        assert!((p.progress_to_next(100) - 0.25).abs() < 0.01);
    }

    #[test]
    fn test_default_theme_always_available() {
        let p = UserProgression::new("ada", 0);
        assert!(p.has_theme(DEFAULT_THEME));
        assert!(!p.has_theme("Dark"));
    }
}
