//! In-memory progression store

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::error::{ProgressionError, Result};
use super::store::{ProgressionStore, Settlement, StoredProgression};
use crate::domain::{Report, UserProgression, XpLogEntry};

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<String, StoredProgression>,
    ledger: Vec<XpLogEntry>,
    reports: Vec<Report>,
}

/// Store keeping everything in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ProgressionStore for MemoryStore {
    fn insert_user(&self, progression: &UserProgression) -> Result<()> {
        let mut state = self.state();
        if state.users.contains_key(&progression.user_id) {
            return Err(ProgressionError::UserExists(progression.user_id.clone()));
        }
        state.users.insert(
            progression.user_id.clone(),
            StoredProgression {
                progression: progression.clone(),
                version: 0,
            },
        );
        Ok(())
    }

    fn load(&self, user_id: &str) -> Result<Option<StoredProgression>> {
        Ok(self.state().users.get(user_id).cloned())
    }

    fn commit(&self, settlement: &Settlement) -> Result<u64> {
        let mut state = self.state();
        let user_id = &settlement.progression.user_id;

        let stored = state
            .users
            .get_mut(user_id)
            .ok_or_else(|| ProgressionError::UserNotFound(user_id.clone()))?;
        if stored.version != settlement.expected_version {
            return Err(ProgressionError::ConcurrentUpdateConflict {
                user_id: user_id.clone(),
                attempts: 1,
            });
        }

        stored.version += 1;
        stored.progression = settlement.progression.clone();
        let version = stored.version;

        state.ledger.extend(settlement.ledger.iter().cloned());
        if let Some(report) = &settlement.report {
            state.reports.push(report.clone());
        }
        Ok(version)
    }

    fn ledger_since(&self, start_ms: i64) -> Result<Vec<XpLogEntry>> {
        Ok(self
            .state()
            .ledger
            .iter()
            .filter(|e| e.timestamp >= start_ms)
            .cloned()
            .collect())
    }

    fn ledger_for_user(&self, user_id: &str) -> Result<Vec<XpLogEntry>> {
        Ok(self
            .state()
            .ledger
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }

    fn reports_since(&self, start_ms: i64) -> Result<Vec<Report>> {
        Ok(self
            .state()
            .reports
            .iter()
            .filter(|r| r.created_at >= start_ms)
            .cloned()
            .collect())
    }

    fn reports_for_user(&self, user_id: &str) -> Result<Vec<Report>> {
        Ok(self
            .state()
            .reports
            .iter()
            .filter(|r| r.attempt.username == user_id)
            .cloned()
            .collect())
    }

    fn report(&self, report_id: &str) -> Result<Option<Report>> {
        Ok(self
            .state()
            .reports
            .iter()
            .find(|r| r.id == report_id)
            .cloned())
    }
}
