//! Submit command implementation

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Deserialize;
use std::path::Path;

use questline::domain::{AnswerKey, QuizSubmission, Report, SubmittedAnswer};
use questline::progression::ProgressionEngine;

use super::user::print_update;

/// Submission file: the quiz's answer key plus the user's answers
#[derive(Debug, Deserialize)]
struct SubmissionFile {
    quiz: AnswerKey,
    #[serde(default)]
    answers: Vec<SubmittedAnswer>,
}

/// Grade a submission file and settle it for `user_id`
pub async fn submit_command(engine: &ProgressionEngine, user_id: &str, file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read submission: {}", file.display()))?;
    let parsed: SubmissionFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse submission: {}", file.display()))?;

    let submission = QuizSubmission {
        answers: parsed.answers,
    };
    let (report, update) = engine.submit_report(user_id, &parsed.quiz, &submission, Utc::now())?;

    print_report(&report);
    print_update(&update);

    Ok(())
}

/// Print one stored report with its graded questions
pub async fn report_command(engine: &ProgressionEngine, report_id: &str) -> Result<()> {
    let report = engine.get_report(report_id)?;
    println!("Report {} by {}", report.id, report.attempt.username);
    print_report(&report);
    Ok(())
}

fn print_report(report: &Report) {
    let a = &report.attempt;
    println!(
        "{}: {}/{} ({})",
        a.quiz_name, a.score, a.total, a.performance_tier
    );
    for (i, q) in a.questions.iter().enumerate() {
        let mark = if q.is_correct { "ok" } else { "x " };
        println!(
            "  [{}] Q{} answered {} (correct {})",
            mark,
            i + 1,
            q.user_answer,
            q.correct_answer
        );
    }
}
