//! Core domain types for questline

mod attempt;
mod badge;
mod ledger;
mod progression;

pub use attempt::{
    AnswerKey, AnswerKeyEntry, GradedQuestion, NOT_ANSWERED, PerformanceTier, QuizAttempt,
    QuizSubmission, Report, SubmittedAnswer,
};
pub use badge::{BADGES, Badge, BadgeId};
pub use ledger::{XpLogEntry, XpReason};
pub use progression::{DEFAULT_THEME, UserProgression};
