//! Storage abstraction for progressions, the XP ledger and reports

use crate::domain::{Report, UserProgression, XpLogEntry};

use super::error::Result;

/// A progression together with the version it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct StoredProgression {
    pub progression: UserProgression,
    pub version: u64,
}

/// Everything one settle writes, committed atomically
#[derive(Debug, Clone)]
pub struct Settlement {
    /// Version the progression was read at
    pub expected_version: u64,
    pub progression: UserProgression,
    pub ledger: Vec<XpLogEntry>,
    pub report: Option<Report>,
}

/// Backing store used by the progression engine.
///
/// `commit` is all-or-nothing: if the stored version differs from
/// `expected_version` it writes nothing and fails with
/// `ConcurrentUpdateConflict`.
pub trait ProgressionStore: Send + Sync {
    /// Create a new user; fails with `UserExists` on duplicates
    fn insert_user(&self, progression: &UserProgression) -> Result<()>;

    fn load(&self, user_id: &str) -> Result<Option<StoredProgression>>;

    /// Apply a settlement and return the new version
    fn commit(&self, settlement: &Settlement) -> Result<u64>;

    /// Ledger entries with `timestamp >= start_ms`
    fn ledger_since(&self, start_ms: i64) -> Result<Vec<XpLogEntry>>;

    fn ledger_for_user(&self, user_id: &str) -> Result<Vec<XpLogEntry>>;

    /// Reports with `created_at >= start_ms`
    fn reports_since(&self, start_ms: i64) -> Result<Vec<Report>>;

    fn reports_for_user(&self, user_id: &str) -> Result<Vec<Report>>;

    /// A single report by its id
    fn report(&self, report_id: &str) -> Result<Option<Report>>;
}
