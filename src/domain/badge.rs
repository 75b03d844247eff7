//! Badge definitions and metadata
//!
//! The rules that grant badges live in `progression::rules::badges`.

use serde::{Deserialize, Serialize};

/// Unique identifier for each badge
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BadgeId {
    #[serde(rename = "Perfect Score")]
    PerfectScore,
    #[serde(rename = "Speed Genius")]
    SpeedGenius,
}

impl BadgeId {
    /// Get the string ID for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PerfectScore => "Perfect Score",
            Self::SpeedGenius => "Speed Genius",
        }
    }

    /// Parse from database string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Perfect Score" => Some(Self::PerfectScore),
            "Speed Genius" => Some(Self::SpeedGenius),
            _ => None,
        }
    }

    /// Get all badge IDs
    pub fn all() -> &'static [BadgeId] {
        &[Self::PerfectScore, Self::SpeedGenius]
    }
}

impl std::fmt::Display for BadgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Badge definition with display metadata
#[derive(Debug, Clone)]
pub struct Badge {
    pub id: BadgeId,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
}

/// All badge definitions
pub static BADGES: &[Badge] = &[
    Badge {
        id: BadgeId::PerfectScore,
        name: "Perfect Score",
        description: "Answer every question of a quiz correctly",
        icon: "🏅",
    },
    Badge {
        id: BadgeId::SpeedGenius,
        name: "Speed Genius",
        description: "Average under ten seconds per timed answer in a quiz",
        icon: "⚡",
    },
];

impl Badge {
    /// Look up the definition for a badge
    pub fn get(id: BadgeId) -> &'static Badge {
        match id {
            BadgeId::PerfectScore => &BADGES[0],
            BadgeId::SpeedGenius => &BADGES[1],
        }
    }
}
