//! Progression engine
//!
//! Settles quiz submissions and logins into XP, levels, streaks, badges and
//! themes. Each settle reads the user's progression, plans the change, and
//! commits it together with its ledger entries in one versioned write.
//! Settles for one user are serialized in-process and retried from fresh
//! state when another writer won the version race.

pub mod calendar;
pub mod leaderboard;
pub mod rules;
pub mod scorer;

mod db;
mod error;
mod locks;
mod memory;
mod settle;
mod store;

pub use db::SqliteStore;
pub use error::{ProgressionError, Result};
pub use leaderboard::{
    LeaderboardEntry, LeaderboardWindow, QuizTopScorers, TOP_SCORERS_PER_QUIZ, TopScore,
};
pub use locks::UserLocks;
pub use memory::MemoryStore;
pub use settle::{Draft, ProgressionEvent, UpdatedProgression};
pub use store::{ProgressionStore, Settlement, StoredProgression};

use std::sync::{Arc, PoisonError};

use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::domain::{AnswerKey, QuizAttempt, QuizSubmission, Report, UserProgression};

/// Entry point for every progression operation
pub struct ProgressionEngine {
    store: Arc<dyn ProgressionStore>,
    config: Config,
    locks: UserLocks,
}

impl ProgressionEngine {
    pub fn new(store: Arc<dyn ProgressionStore>, config: Config) -> Self {
        Self {
            store,
            config,
            locks: UserLocks::new(),
        }
    }

    /// Engine over a fresh in-memory store
    pub fn in_memory(config: Config) -> Self {
        Self::new(Arc::new(MemoryStore::new()), config)
    }

    /// Engine over the SQLite database named by `config`
    pub fn open(config: Config) -> anyhow::Result<Self> {
        let path = config.database_path();
        let store = SqliteStore::open(&path)
            .with_context(|| format!("Failed to open store at {}", path.display()))?;
        Ok(Self::new(Arc::new(store), config))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Create the default progression for a new user
    pub fn register_user(&self, user_id: &str, now: DateTime<Utc>) -> Result<UserProgression> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(ProgressionError::InvalidAttempt(
                "user id must not be empty".to_string(),
            ));
        }

        let progression = UserProgression::new(user_id, now.timestamp_millis());
        self.store.insert_user(&progression)?;
        info!("Registered user {}", user_id);
        Ok(progression)
    }

    /// Read-only snapshot
    pub fn get_progression(&self, user_id: &str) -> Result<UserProgression> {
        self.store
            .load(user_id)?
            .map(|stored| stored.progression)
            .ok_or_else(|| ProgressionError::UserNotFound(user_id.to_string()))
    }

    /// Count today's login and grant the daily login bonus
    pub fn settle_login(&self, user_id: &str, now: DateTime<Utc>) -> Result<UpdatedProgression> {
        self.settle(user_id, "login", |p| settle::plan_login(p, now, &self.config))
    }

    /// Settle an already graded attempt
    pub fn settle_quiz_submission(
        &self,
        user_id: &str,
        attempt: &QuizAttempt,
        now: DateTime<Utc>,
    ) -> Result<UpdatedProgression> {
        self.settle(user_id, "quiz", |p| {
            settle::plan_quiz(p, attempt, now, &self.config)
        })
    }

    /// Grade a submission, then settle it and store the report in the same
    /// commit.
    pub fn submit_report(
        &self,
        user_id: &str,
        key: &AnswerKey,
        submission: &QuizSubmission,
        now: DateTime<Utc>,
    ) -> Result<(Report, UpdatedProgression)> {
        let attempt = scorer::grade(user_id, key, submission)?;
        let report = Report::new(attempt, now.timestamp_millis());

        let update = self.settle(user_id, "report", |p| {
            let mut draft = settle::plan_quiz(p, &report.attempt, now, &self.config)?;
            draft.report = Some(report.clone());
            Ok(draft)
        })?;

        Ok((report, update))
    }

    /// Switch the active theme; it must be unlocked
    pub fn select_theme(&self, user_id: &str, theme: &str) -> Result<UserProgression> {
        let update = self.settle(user_id, "theme", |p| settle::plan_theme_selection(p, theme))?;
        Ok(update.progression)
    }

    /// XP leaderboard for a window named `week` or `month`
    pub fn get_leaderboard(
        &self,
        window: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<LeaderboardEntry>> {
        self.leaderboard(window.parse()?, now)
    }

    pub fn leaderboard(
        &self,
        window: LeaderboardWindow,
        now: DateTime<Utc>,
    ) -> Result<Vec<LeaderboardEntry>> {
        let start_ms = window.start_ms(now);
        let entries = self.store.ledger_since(start_ms)?;
        Ok(leaderboard::rank_xp(&entries, start_ms))
    }

    /// Best scores per quiz within the window
    pub fn get_top_scorers(
        &self,
        window: LeaderboardWindow,
        now: DateTime<Utc>,
    ) -> Result<Vec<QuizTopScorers>> {
        let start_ms = window.start_ms(now);
        let reports = self.store.reports_since(start_ms)?;
        Ok(leaderboard::top_scorers(
            &reports,
            start_ms,
            TOP_SCORERS_PER_QUIZ,
        ))
    }

    /// Reports of one user, oldest first
    pub fn reports_for_user(&self, user_id: &str) -> Result<Vec<Report>> {
        self.get_progression(user_id)?;
        self.store.reports_for_user(user_id)
    }

    /// One stored report by id
    pub fn get_report(&self, report_id: &str) -> Result<Report> {
        self.store
            .report(report_id)?
            .ok_or_else(|| ProgressionError::ReportNotFound(report_id.to_string()))
    }

    /// `total_xp` minus the ledger sum; 0 when both agree
    pub fn ledger_drift(&self, user_id: &str) -> Result<i64> {
        let progression = self.get_progression(user_id)?;
        let ledger: i128 = self
            .store
            .ledger_for_user(user_id)?
            .iter()
            .map(|e| i128::from(e.amount))
            .sum();
        let drift = i128::from(progression.total_xp) - ledger;
        i64::try_from(drift).map_err(|_| {
            ProgressionError::InvariantViolation(format!("ledger drift out of range: {}", drift))
        })
    }

    /// Read, plan and commit under the user's lock, recomputing from fresh
    /// state whenever the commit loses a version race.
    fn settle<F>(&self, user_id: &str, kind: &str, mut plan: F) -> Result<UpdatedProgression>
    where
        F: FnMut(UserProgression) -> Result<settle::Draft>,
    {
        let handle = self.locks.handle(user_id);
        let _guard = handle.lock().unwrap_or_else(PoisonError::into_inner);

        let max_attempts = self.config.engine.max_settle_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let stored = self
                .store
                .load(user_id)?
                .ok_or_else(|| ProgressionError::UserNotFound(user_id.to_string()))?;

            let draft = plan(stored.progression.clone())?;
            if draft.is_noop(&stored.progression) {
                debug!("Settle {} for {} changed nothing", kind, user_id);
                return Ok(draft.into_update());
            }

            let settlement = Settlement {
                expected_version: stored.version,
                progression: draft.progression.clone(),
                ledger: draft.ledger.clone(),
                report: draft.report.clone(),
            };

            match self.store.commit(&settlement) {
                Ok(version) => {
                    let update = draft.into_update();
                    info!(
                        "Settled {} for {}: +{} XP, level {}, version {}",
                        kind,
                        user_id,
                        update.xp_awarded(),
                        update.progression.level,
                        version
                    );
                    return Ok(update);
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    warn!(
                        "Settle {} for {} lost a version race (attempt {}/{}), retrying",
                        kind, user_id, attempt, max_attempts
                    );
                }
                Err(ProgressionError::ConcurrentUpdateConflict { .. }) => {
                    return Err(ProgressionError::ConcurrentUpdateConflict {
                        user_id: user_id.to_string(),
                        attempts: attempt,
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_unknown_user() {
        let engine = ProgressionEngine::in_memory(Config::default());
        assert!(matches!(
            engine.settle_login("ghost", day(1)),
            Err(ProgressionError::UserNotFound(_))
        ));
        assert!(matches!(
            engine.get_progression("ghost"),
            Err(ProgressionError::UserNotFound(_))
        ));
    }

    #[test]
    fn test_register_twice() {
        let engine = ProgressionEngine::in_memory(Config::default());
        engine.register_user("ada", day(1)).unwrap();
        assert!(matches!(
            engine.register_user("ada", day(2)),
            Err(ProgressionError::UserExists(_))
        ));
    }

    #[test]
    fn test_login_bonus_once_per_day() {
        let engine = ProgressionEngine::in_memory(Config::default());
        engine.register_user("ada", day(1)).unwrap();

        let first = engine.settle_login("ada", day(1)).unwrap();
        assert_eq!(first.xp_awarded(), 50);

        let second = engine.settle_login("ada", day(1)).unwrap();
        assert_eq!(second.xp_awarded(), 0);
        assert!(second.events.is_empty());

        assert_eq!(engine.get_progression("ada").unwrap().total_xp, 50);
        assert_eq!(engine.ledger_drift("ada").unwrap(), 0);
    }

    #[test]
    fn test_select_locked_theme() {
        let engine = ProgressionEngine::in_memory(Config::default());
        engine.register_user("ada", day(1)).unwrap();
        assert!(matches!(
            engine.select_theme("ada", "Dark"),
            Err(ProgressionError::ThemeLocked(_))
        ));
        let p = engine.select_theme("ada", "Default").unwrap();
        assert_eq!(p.selected_theme, "Default");
    }

    #[test]
    fn test_invalid_window() {
        let engine = ProgressionEngine::in_memory(Config::default());
        assert!(matches!(
            engine.get_leaderboard("year", day(1)),
            Err(ProgressionError::InvalidWindow(_))
        ));
    }
}
