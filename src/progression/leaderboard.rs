//! Windowed leaderboards over the XP ledger and stored reports

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::calendar::days_back_start_ms;
use super::error::ProgressionError;
use crate::domain::{Report, XpLogEntry};

/// Number of scorers kept per quiz
pub const TOP_SCORERS_PER_QUIZ: usize = 5;

/// Time window for leaderboard queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardWindow {
    Week,
    Month,
}

impl LeaderboardWindow {
    /// Days subtracted from today to find the window start.
    ///
    /// The window opens at midnight of `today - days` and runs through now,
    /// so a week spans 8 calendar days (today plus the 7 before it) and a
    /// month 31.
    pub fn days(&self) -> u64 {
        match self {
            Self::Week => 7,
            Self::Month => 30,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Week => "Weekly",
            Self::Month => "Monthly",
        }
    }

    /// Midnight (UTC) of the first day inside the window
    pub fn start_ms(&self, now: DateTime<Utc>) -> i64 {
        days_back_start_ms(now, self.days())
    }
}

impl FromStr for LeaderboardWindow {
    type Err = ProgressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "week" | "weekly" => Ok(Self::Week),
            "month" | "monthly" => Ok(Self::Month),
            _ => Err(ProgressionError::InvalidWindow(s.to_string())),
        }
    }
}

/// One ranked row of the XP leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub total_xp: u64,
}

/// Sum ledger amounts per user from `start_ms` on and rank them.
///
/// Highest total first; equal totals are ordered by user id.
pub fn rank_xp(entries: &[XpLogEntry], start_ms: i64) -> Vec<LeaderboardEntry> {
    let mut totals: HashMap<&str, u64> = HashMap::new();
    for entry in entries.iter().filter(|e| e.timestamp >= start_ms) {
        let total = totals.entry(entry.user_id.as_str()).or_default();
        *total = total.saturating_add(entry.amount);
    }

    let mut ranked: Vec<LeaderboardEntry> = totals
        .into_iter()
        .map(|(user_id, total_xp)| LeaderboardEntry {
            user_id: user_id.to_string(),
            total_xp,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.total_xp
            .cmp(&a.total_xp)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    ranked
}

/// A single high score on a quiz
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopScore {
    pub username: String,
    pub score: f64,
    pub total: f64,
    pub created_at: i64,
}

/// Best attempts of one quiz
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizTopScorers {
    pub quiz_name: String,
    pub top_users: Vec<TopScore>,
}

/// Group reports from `start_ms` on by quiz and keep the best `limit` each.
///
/// Quizzes come back sorted by name; within a quiz, higher scores first and
/// earlier submissions win ties.
pub fn top_scorers(reports: &[Report], start_ms: i64, limit: usize) -> Vec<QuizTopScorers> {
    let mut by_quiz: BTreeMap<&str, Vec<TopScore>> = BTreeMap::new();
    for report in reports.iter().filter(|r| r.created_at >= start_ms) {
        by_quiz
            .entry(report.attempt.quiz_name.as_str())
            .or_default()
            .push(TopScore {
                username: report.attempt.username.clone(),
                score: report.attempt.score,
                total: report.attempt.total,
                created_at: report.created_at,
            });
    }

    by_quiz
        .into_iter()
        .map(|(quiz_name, mut scores)| {
            scores.sort_by(|a, b| {
                b.score
                    .total_cmp(&a.score)
                    .then_with(|| a.created_at.cmp(&b.created_at))
            });
            scores.truncate(limit);
            QuizTopScorers {
                quiz_name: quiz_name.to_string(),
                top_users: scores,
            }
        })
        .collect()
}
