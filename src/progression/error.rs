//! Error type for progression operations

/// Errors surfaced by the progression engine and its stores
#[derive(Debug, thiserror::Error)]
pub enum ProgressionError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Report not found: {0}")]
    ReportNotFound(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("Invalid quiz attempt: {0}")]
    InvalidAttempt(String),

    #[error("Concurrent update conflict for user {user_id} after {attempts} attempt(s)")]
    ConcurrentUpdateConflict { user_id: String, attempts: u32 },

    /// Internal state that must never occur; not retryable
    #[error("Progression invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Invalid leaderboard window '{0}' (use 'week' or 'month')")]
    InvalidWindow(String),

    #[error("Theme not unlocked yet: {0}")]
    ThemeLocked(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProgressionError {
    /// Whether the whole settle may be recomputed and retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentUpdateConflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, ProgressionError>;
