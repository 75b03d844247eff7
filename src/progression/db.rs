//! SQLite progression store
//!
//! Manages the `~/.questline/progression.db` database with automatic schema
//! migration. Every settle is one IMMEDIATE transaction guarded by the
//! per-user `version` column, so several processes can share one file.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use chrono::Utc;
use rusqlite::{Connection, ErrorCode, OptionalExtension, TransactionBehavior, params};
use tracing::{debug, warn};

use super::calendar::day_bucket;
use super::error::{ProgressionError, Result};
use super::scorer::performance_tier;
use super::store::{ProgressionStore, Settlement, StoredProgression};
use crate::domain::{
    BadgeId, GradedQuestion, PerformanceTier, QuizAttempt, Report, UserProgression, XpLogEntry,
};

/// SQLite-backed store
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create the database at a specific path
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data dir: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open progression db: {}", path.display()))?;

        // WAL lets leaderboard reads run next to settles from other processes
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        Self::from_connection(conn)
    }

    /// Throwaway database, mostly for tests
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> anyhow::Result<Self> {
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema().context("Failed to initialize progression schema")?;
        Ok(db)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute_batch(SCHEMA_SQL)?;
        drop(conn);
        self.run_migrations()
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn();

        let version: i32 = conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |r| r.get(0),
        )?;

        // Migration 2: store the performance tier with each report
        if version < 2 {
            let has_tier = conn.query_row(
                "SELECT COUNT(*) FROM pragma_table_info('reports') WHERE name = 'performance_tier'",
                [],
                |r| r.get::<_, i32>(0),
            )? > 0;

            if !has_tier {
                conn.execute_batch("ALTER TABLE reports ADD COLUMN performance_tier TEXT;")?;
            }

            conn.execute("INSERT OR REPLACE INTO schema_version VALUES (2)", [])?;
            debug!("Progression schema migrated to version 2");
        }

        Ok(())
    }

    fn load_badges(conn: &Connection, user_id: &str) -> Result<BTreeSet<BadgeId>> {
        let mut stmt = conn.prepare("SELECT badge FROM user_badges WHERE user_id = ?1")?;
        let names = stmt
            .query_map([user_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut badges = BTreeSet::new();
        for name in names {
            match BadgeId::from_str(&name) {
                Some(id) => {
                    badges.insert(id);
                }
                None => warn!("Ignoring unknown badge '{}' for user {}", name, user_id),
            }
        }
        Ok(badges)
    }

    fn load_themes(conn: &Connection, user_id: &str) -> Result<BTreeSet<String>> {
        let mut stmt = conn.prepare("SELECT theme FROM user_themes WHERE user_id = ?1")?;
        let themes = stmt
            .query_map([user_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<BTreeSet<_>>>()?;
        Ok(themes)
    }

    /// Insert badges and themes; existing rows are kept, nothing is removed
    fn write_unlocks(conn: &Connection, progression: &UserProgression, now: i64) -> Result<()> {
        for badge in &progression.badges {
            conn.execute(
                "INSERT OR IGNORE INTO user_badges (user_id, badge, granted_at) VALUES (?1, ?2, ?3)",
                params![progression.user_id, badge.as_str(), now],
            )?;
        }
        for theme in &progression.unlocked_themes {
            conn.execute(
                "INSERT OR IGNORE INTO user_themes (user_id, theme, unlocked_at) VALUES (?1, ?2, ?3)",
                params![progression.user_id, theme, now],
            )?;
        }
        Ok(())
    }

    fn query_reports(
        &self,
        filter_sql: &str,
        param: &dyn rusqlite::ToSql,
    ) -> Result<Vec<Report>> {
        let conn = self.conn();
        let sql = format!(
            "SELECT id, username, quiz_name, score, total, performance_tier, questions, created_at
             FROM reports WHERE {filter_sql} ORDER BY created_at ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([param], |row| {
                Ok(ReportRow {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    quiz_name: row.get(2)?,
                    score: row.get(3)?,
                    total: row.get(4)?,
                    performance_tier: row.get(5)?,
                    questions: row.get(6)?,
                    created_at: row.get(7)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(ReportRow::into_report).collect()
    }

    fn query_ledger(&self, filter_sql: &str, param: &dyn rusqlite::ToSql) -> Result<Vec<XpLogEntry>> {
        let conn = self.conn();
        let sql = format!(
            "SELECT user_id, amount, reason, timestamp FROM xp_log WHERE {filter_sql} ORDER BY id ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map([param], |row| {
                Ok(XpLogEntry {
                    user_id: row.get(0)?,
                    amount: row.get(1)?,
                    reason: row.get(2)?,
                    timestamp: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}

struct ReportRow {
    id: String,
    username: String,
    quiz_name: String,
    score: f64,
    total: f64,
    performance_tier: Option<String>,
    questions: String,
    created_at: i64,
}

impl ReportRow {
    fn into_report(self) -> Result<Report> {
        let questions: Vec<GradedQuestion> = serde_json::from_str(&self.questions)?;
        // Rows written before migration 2 have no tier
        let tier = self
            .performance_tier
            .as_deref()
            .and_then(PerformanceTier::from_str)
            .unwrap_or_else(|| performance_tier(self.score, self.total));

        Ok(Report {
            id: self.id,
            created_at: self.created_at,
            attempt: QuizAttempt {
                username: self.username,
                quiz_name: self.quiz_name,
                score: self.score,
                total: self.total,
                performance_tier: tier,
                questions,
            },
        })
    }
}

impl ProgressionStore for SqliteStore {
    fn insert_user(&self, progression: &UserProgression) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let inserted = tx.execute(
            r#"INSERT INTO users
               (user_id, xp, total_xp, level, selected_theme, login_streak, last_login_date,
                quiz_streak, last_quiz_date, created_at, version)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0)"#,
            params![
                progression.user_id, progression.xp, progression.total_xp, progression.level,
                progression.selected_theme, progression.login_streak, progression.last_login_date,
                progression.quiz_streak, progression.last_quiz_date, progression.created_at,
            ],
        );
        match inserted {
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                return Err(ProgressionError::UserExists(progression.user_id.clone()));
            }
            other => {
                other?;
            }
        }
        Self::write_unlocks(&tx, progression, progression.created_at)?;
        tx.commit()?;
        Ok(())
    }

    fn load(&self, user_id: &str) -> Result<Option<StoredProgression>> {
        let mut conn = self.conn();
        // Read transaction: one snapshot for the row and its unlock sets
        let tx = conn.transaction()?;

        let row = tx
            .query_row(
                r#"SELECT xp, total_xp, level, selected_theme, login_streak, last_login_date,
                          quiz_streak, last_quiz_date, created_at, version
                   FROM users WHERE user_id = ?1"#,
                [user_id],
                |r| {
                    Ok((
                        UserProgression {
                            user_id: user_id.to_string(),
                            xp: r.get(0)?,
                            total_xp: r.get(1)?,
                            level: r.get(2)?,
                            badges: BTreeSet::new(),
                            unlocked_themes: BTreeSet::new(),
                            selected_theme: r.get(3)?,
                            login_streak: r.get(4)?,
                            last_login_date: r.get(5)?,
                            quiz_streak: r.get(6)?,
                            last_quiz_date: r.get(7)?,
                            created_at: r.get(8)?,
                        },
                        r.get::<_, u64>(9)?,
                    ))
                },
            )
            .optional()?;

        let Some((mut progression, version)) = row else {
            return Ok(None);
        };
        progression.badges = Self::load_badges(&tx, user_id)?;
        progression.unlocked_themes = Self::load_themes(&tx, user_id)?;

        Ok(Some(StoredProgression {
            progression,
            version,
        }))
    }

    fn commit(&self, settlement: &Settlement) -> Result<u64> {
        let p = &settlement.progression;
        let now = Utc::now().timestamp_millis();

        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let updated = tx.execute(
            r#"UPDATE users SET
                   xp = ?1, total_xp = ?2, level = ?3, selected_theme = ?4,
                   login_streak = ?5, last_login_date = ?6, quiz_streak = ?7, last_quiz_date = ?8,
                   version = version + 1
               WHERE user_id = ?9 AND version = ?10"#,
            params![
                p.xp, p.total_xp, p.level, p.selected_theme, p.login_streak, p.last_login_date,
                p.quiz_streak, p.last_quiz_date, p.user_id, settlement.expected_version,
            ],
        )?;

        if updated == 0 {
            let exists: i64 = tx.query_row(
                "SELECT COUNT(*) FROM users WHERE user_id = ?1",
                [&p.user_id],
                |r| r.get(0),
            )?;
            return Err(if exists > 0 {
                ProgressionError::ConcurrentUpdateConflict {
                    user_id: p.user_id.clone(),
                    attempts: 1,
                }
            } else {
                ProgressionError::UserNotFound(p.user_id.clone())
            });
        }

        Self::write_unlocks(&tx, p, now)?;

        for entry in &settlement.ledger {
            tx.execute(
                r#"INSERT INTO xp_log (user_id, amount, reason, timestamp, day_bucket)
                   VALUES (?1, ?2, ?3, ?4, ?5)"#,
                params![
                    entry.user_id, entry.amount, entry.reason, entry.timestamp,
                    day_bucket(entry.timestamp),
                ],
            )?;
        }

        if let Some(report) = &settlement.report {
            let attempt = &report.attempt;
            tx.execute(
                r#"INSERT INTO reports
                   (id, username, quiz_name, score, total, performance_tier, questions, created_at, day_bucket)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
                params![
                    report.id, attempt.username, attempt.quiz_name, attempt.score, attempt.total,
                    attempt.performance_tier.as_str(), serde_json::to_string(&attempt.questions)?,
                    report.created_at, day_bucket(report.created_at),
                ],
            )?;
        }

        tx.commit()?;
        Ok(settlement.expected_version + 1)
    }

    fn ledger_since(&self, start_ms: i64) -> Result<Vec<XpLogEntry>> {
        self.query_ledger("timestamp >= ?1", &start_ms)
    }

    fn ledger_for_user(&self, user_id: &str) -> Result<Vec<XpLogEntry>> {
        self.query_ledger("user_id = ?1", &user_id)
    }

    fn reports_since(&self, start_ms: i64) -> Result<Vec<Report>> {
        self.query_reports("created_at >= ?1", &start_ms)
    }

    fn reports_for_user(&self, user_id: &str) -> Result<Vec<Report>> {
        self.query_reports("username = ?1", &user_id)
    }

    fn report(&self, report_id: &str) -> Result<Option<Report>> {
        Ok(self.query_reports("id = ?1", &report_id)?.into_iter().next())
    }
}

/// SQL schema for the progression database
const SCHEMA_SQL: &str = r#"
-- One row per user; version backs compare-and-swap settles
CREATE TABLE IF NOT EXISTS users (
    user_id TEXT PRIMARY KEY,
    xp INTEGER NOT NULL DEFAULT 0,
    total_xp INTEGER NOT NULL DEFAULT 0,
    level INTEGER NOT NULL DEFAULT 1,
    selected_theme TEXT NOT NULL DEFAULT 'Default',
    login_streak INTEGER NOT NULL DEFAULT 0,
    last_login_date TEXT,
    quiz_streak INTEGER NOT NULL DEFAULT 0,
    last_quiz_date TEXT,
    created_at INTEGER NOT NULL,
    version INTEGER NOT NULL DEFAULT 0
);

-- Granted badges (rows are never deleted)
CREATE TABLE IF NOT EXISTS user_badges (
    user_id TEXT NOT NULL,
    badge TEXT NOT NULL,
    granted_at INTEGER NOT NULL,
    PRIMARY KEY (user_id, badge),
    FOREIGN KEY (user_id) REFERENCES users(user_id)
);

-- Unlocked themes (rows are never deleted)
CREATE TABLE IF NOT EXISTS user_themes (
    user_id TEXT NOT NULL,
    theme TEXT NOT NULL,
    unlocked_at INTEGER NOT NULL,
    PRIMARY KEY (user_id, theme),
    FOREIGN KEY (user_id) REFERENCES users(user_id)
);

-- Append-only XP ledger
CREATE TABLE IF NOT EXISTS xp_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    amount INTEGER NOT NULL,
    reason TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    day_bucket TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_xp_log_timestamp ON xp_log(timestamp);
CREATE INDEX IF NOT EXISTS idx_xp_log_user ON xp_log(user_id);

-- Graded quiz reports
CREATE TABLE IF NOT EXISTS reports (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL,
    quiz_name TEXT NOT NULL,
    score REAL NOT NULL,
    total REAL NOT NULL,
    questions TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    day_bucket TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_reports_created_at ON reports(created_at);
CREATE INDEX IF NOT EXISTS idx_reports_username ON reports(username);

-- Schema version
CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);
INSERT OR IGNORE INTO schema_version VALUES (1);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::XpReason;
    use tempfile::tempdir;

    #[test]
    fn test_open_and_init() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test_progression.db");
        let store = SqliteStore::open(&db_path).unwrap();

        let conn = store.conn();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .unwrap();
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        for table in ["users", "user_badges", "user_themes", "xp_log", "reports"] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }

        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 2);
    }

    #[test]
    fn test_migrates_version_one_database() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("v1.db");
        {
            // Layout before the tier column existed
            let conn = Connection::open(&db_path).unwrap();
            conn.execute_batch(
                r#"CREATE TABLE reports (
                       id TEXT PRIMARY KEY, username TEXT NOT NULL, quiz_name TEXT NOT NULL,
                       score REAL NOT NULL, total REAL NOT NULL, questions TEXT NOT NULL,
                       created_at INTEGER NOT NULL, day_bucket TEXT NOT NULL);
                   CREATE TABLE schema_version (version INTEGER PRIMARY KEY);
                   INSERT INTO schema_version VALUES (1);
                   INSERT INTO reports VALUES ('r1', 'ada', 'Traits', 8.0, 10.0, '[]', 5, '1970-01-01');"#,
            )
            .unwrap();
        }

        let store = SqliteStore::open(&db_path).unwrap();
        let report = store.report("r1").unwrap().unwrap();
        // Missing tier is derived from the score
        assert_eq!(report.attempt.performance_tier, PerformanceTier::High);

        drop(store);
        let store = SqliteStore::open(&db_path).unwrap();
        let version: i32 = store
            .conn()
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 2);
        assert!(store.report("missing").unwrap().is_none());
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("reopen.db");
        {
            let store = SqliteStore::open(&db_path).unwrap();
            store.insert_user(&UserProgression::new("ada", 7)).unwrap();
        }
        let store = SqliteStore::open(&db_path).unwrap();
        let stored = store.load("ada").unwrap().unwrap();
        assert_eq!(stored.version, 0);
        assert_eq!(stored.progression.created_at, 7);
    }

    #[test]
    fn test_progression_roundtrip_with_unlocks() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_user(&UserProgression::new("ada", 0)).unwrap();

        let mut p = store.load("ada").unwrap().unwrap().progression;
        p.level = 3;
        p.xp = 10;
        p.total_xp = 310;
        p.badges.insert(BadgeId::PerfectScore);
        p.unlocked_themes.insert("Light".to_string());
        p.unlocked_themes.insert("Dark".to_string());
        p.last_quiz_date = chrono::NaiveDate::from_ymd_opt(2024, 2, 29);
        p.quiz_streak = 2;

        let version = store
            .commit(&Settlement {
                expected_version: 0,
                progression: p.clone(),
                ledger: vec![XpLogEntry::new("ada", 310, XpReason::QuizScore, 1_000)],
                report: None,
            })
            .unwrap();
        assert_eq!(version, 1);

        let stored = store.load("ada").unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.progression, p);
        assert_eq!(store.ledger_since(1_000).unwrap().len(), 1);
        assert!(store.ledger_since(1_001).unwrap().is_empty());
    }

    #[test]
    fn test_stale_commit_writes_nothing() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_user(&UserProgression::new("ada", 0)).unwrap();
        let p = store.load("ada").unwrap().unwrap().progression;

        let settlement = Settlement {
            expected_version: 3,
            progression: p,
            ledger: vec![XpLogEntry::new("ada", 50, XpReason::LoginStreakBonus, 1)],
            report: None,
        };
        let err = store.commit(&settlement).unwrap_err();
        assert!(matches!(err, ProgressionError::ConcurrentUpdateConflict { .. }));
        assert!(store.ledger_for_user("ada").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_user_commit() {
        let store = SqliteStore::open_in_memory().unwrap();
        let settlement = Settlement {
            expected_version: 0,
            progression: UserProgression::new("ghost", 0),
            ledger: Vec::new(),
            report: None,
        };
        let err = store.commit(&settlement).unwrap_err();
        assert!(matches!(err, ProgressionError::UserNotFound(_)));
    }
}
