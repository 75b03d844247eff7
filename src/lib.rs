//! Questline - quiz progression engine
//!
//! Turns quiz reports and daily logins into XP, levels, streaks, badges and
//! unlockable themes, and ranks users on windowed leaderboards.
//!
//! ## Settling
//!
//! Every state change goes through [`progression::ProgressionEngine`]:
//!
//! 1. **Quiz submissions** are graded against an answer key, checked for
//!    badges, and converted into base XP plus a once-per-day quiz bonus.
//!
//! 2. **Logins** extend the login streak and grant a once-per-day bonus.
//!
//! XP grants are appended to a ledger, which is what leaderboards sum over.

pub mod config;
pub mod domain;
pub mod progression;

pub use domain::*;
pub use progression::{ProgressionEngine, ProgressionError};
