//! Settings sections of the config file

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// XP granted per event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardSettings {
    /// Base quiz XP per point scored
    #[serde(default = "default_xp_per_score_point")]
    pub xp_per_score_point: u64,

    /// Bonus for the first quiz of a calendar day
    #[serde(default = "default_quiz_streak_bonus")]
    pub quiz_streak_bonus: u64,

    /// Bonus for the first login of a calendar day
    #[serde(default = "default_login_streak_bonus")]
    pub login_streak_bonus: u64,
}

fn default_xp_per_score_point() -> u64 {
    10
}

fn default_quiz_streak_bonus() -> u64 {
    20
}

fn default_login_streak_bonus() -> u64 {
    50
}

impl Default for RewardSettings {
    fn default() -> Self {
        Self {
            xp_per_score_point: default_xp_per_score_point(),
            quiz_streak_bonus: default_quiz_streak_bonus(),
            login_streak_bonus: default_login_streak_bonus(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelingSettings {
    /// Leaving level L costs `L * xp_per_level`
    #[serde(default = "default_xp_per_level")]
    pub xp_per_level: u64,
}

fn default_xp_per_level() -> u64 {
    crate::progression::rules::DEFAULT_XP_PER_LEVEL
}

impl Default for LevelingSettings {
    fn default() -> Self {
        Self {
            xp_per_level: default_xp_per_level(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeSettings {
    /// Speed Genius needs an average answer time strictly below this
    #[serde(default = "default_speed_genius_max_avg_secs")]
    pub speed_genius_max_avg_secs: f64,
}

fn default_speed_genius_max_avg_secs() -> f64 {
    crate::progression::rules::DEFAULT_SPEED_GENIUS_SECS
}

impl Default for BadgeSettings {
    fn default() -> Self {
        Self {
            speed_genius_max_avg_secs: default_speed_genius_max_avg_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// How often a settle is recomputed after losing a version race
    #[serde(default = "default_max_settle_attempts")]
    pub max_settle_attempts: u32,
}

fn default_max_settle_attempts() -> u32 {
    5
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_settle_attempts: default_max_settle_attempts(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// SQLite database file (defaults to ~/.questline/progression.db)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
}
