//! Shared test utilities for progression integration tests

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use questline::config::Config;
use questline::domain::{
    AnswerKey, AnswerKeyEntry, GradedQuestion, PerformanceTier, QuizAttempt, QuizSubmission,
    SubmittedAnswer,
};
use questline::progression::{MemoryStore, ProgressionEngine, ProgressionStore, SqliteStore};

/// Noon UTC on the given day of June 2024
pub fn june(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, day, 12, 0, 0).unwrap()
}

pub fn memory_engine() -> ProgressionEngine {
    ProgressionEngine::in_memory(Config::default())
}

/// Engine over a SQLite file in a temp dir; keep the dir alive for the test
pub fn sqlite_engine() -> (TempDir, ProgressionEngine) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = SqliteStore::open(&dir.path().join("progression.db"))
        .expect("Failed to open sqlite store");
    (dir, ProgressionEngine::new(Arc::new(store), Config::default()))
}

/// Engine over an arbitrary store with default config
pub fn engine_with(store: Arc<dyn ProgressionStore>) -> ProgressionEngine {
    ProgressionEngine::new(store, Config::default())
}

/// Run `check` against both store implementations
pub fn for_each_store(check: impl Fn(&ProgressionEngine)) {
    check(&memory_engine());

    let (_dir, engine) = sqlite_engine();
    check(&engine);
}

pub fn memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

/// Graded attempt with one question per answer time
pub fn attempt(user: &str, quiz: &str, score: f64, total: f64, times: &[f64]) -> QuizAttempt {
    QuizAttempt {
        username: user.to_string(),
        quiz_name: quiz.to_string(),
        score,
        total,
        performance_tier: PerformanceTier::Medium,
        questions: times
            .iter()
            .map(|t| GradedQuestion {
                question_text: "What does `?` do?".to_string(),
                options: vec!["Propagates errors".to_string(), "Panics".to_string()],
                user_answer: "A".to_string(),
                user_answer_text: Some("Propagates errors".to_string()),
                correct_answer: "A".to_string(),
                correct_answer_text: Some("Propagates errors".to_string()),
                is_correct: true,
                answer_time_secs: Some(*t),
            })
            .collect(),
    }
}

/// Four-question quiz worth `total_marks`; correct answers are A, B, C, D
pub fn answer_key(quiz: &str, total_marks: f64) -> AnswerKey {
    AnswerKey {
        quiz_name: quiz.to_string(),
        total_marks,
        questions: ["A", "B", "C", "D"]
            .iter()
            .enumerate()
            .map(|(i, letter)| AnswerKeyEntry {
                question: format!("Question {}", i + 1),
                options: vec![
                    "one".to_string(),
                    "two".to_string(),
                    "three".to_string(),
                    "four".to_string(),
                ],
                correct_answer: letter.to_string(),
            })
            .collect(),
    }
}

/// Submission answering with the given letters, each taking `secs`
pub fn submission(letters: &[Option<&str>], secs: f64) -> QuizSubmission {
    QuizSubmission {
        answers: letters
            .iter()
            .map(|l| SubmittedAnswer {
                answer: l.map(str::to_string),
                answer_time_secs: Some(secs),
            })
            .collect(),
    }
}
