use serde::{Deserialize, Serialize};

/// Why XP was granted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum XpReason {
    /// Base XP for a graded quiz
    QuizScore,
    /// First quiz of the calendar day
    QuizStreakBonus,
    /// First login of the calendar day
    LoginStreakBonus,
}

impl XpReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuizScore => "quiz-score",
            Self::QuizStreakBonus => "quiz-streak-bonus",
            Self::LoginStreakBonus => "login-streak-bonus",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "quiz-score" => Some(Self::QuizScore),
            "quiz-streak-bonus" => Some(Self::QuizStreakBonus),
            "login-streak-bonus" => Some(Self::LoginStreakBonus),
            _ => None,
        }
    }
}

/// Immutable XP ledger entry
///
/// `reason` stays a free-form string so entries written by other tools
/// (manual adjustments, imports) still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpLogEntry {
    pub user_id: String,
    pub amount: u64,
    pub reason: String,
    /// Grant time (ms since epoch)
    pub timestamp: i64,
}

impl XpLogEntry {
    pub fn new(user_id: impl Into<String>, amount: u64, reason: XpReason, timestamp: i64) -> Self {
        Self {
            user_id: user_id.into(),
            amount,
            reason: reason.as_str().to_string(),
            timestamp,
        }
    }
}
