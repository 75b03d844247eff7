//! Report scorer
//!
//! Grades a submission against a quiz's answer key. Pure; the caller stores
//! the resulting report.

use crate::domain::{
    AnswerKey, GradedQuestion, NOT_ANSWERED, PerformanceTier, QuizAttempt, QuizSubmission,
};
use crate::progression::error::{ProgressionError, Result};

/// Share of the total marks needed for the high tier
pub const HIGH_TIER_RATIO: f64 = 0.7;
/// Share of the total marks needed for the medium tier
pub const MEDIUM_TIER_RATIO: f64 = 0.4;

/// Letter addressing the option at `index` ("A" for 0)
pub fn option_letter(index: usize) -> Option<char> {
    u8::try_from(index)
        .ok()
        .filter(|i| *i < 26)
        .map(|i| char::from(b'A' + i))
}

/// Position of the option an answer letter addresses
pub fn option_index(letter: &str) -> Option<usize> {
    let mut chars = letter.trim().chars();
    let c = chars.next()?.to_ascii_uppercase();
    if chars.next().is_some() || !c.is_ascii_uppercase() {
        return None;
    }
    Some(usize::from(c as u8 - b'A'))
}

/// Tier for a score out of `total`
pub fn performance_tier(score: f64, total: f64) -> PerformanceTier {
    if score >= total * HIGH_TIER_RATIO {
        PerformanceTier::High
    } else if score >= total * MEDIUM_TIER_RATIO {
        PerformanceTier::Medium
    } else {
        PerformanceTier::Low
    }
}

/// Grade `submission` against `key`.
///
/// `score = correct / questions * total_marks`. Missing or blank answers are
/// recorded as [`NOT_ANSWERED`].
pub fn grade(username: &str, key: &AnswerKey, submission: &QuizSubmission) -> Result<QuizAttempt> {
    validate(key, submission)?;

    let mut questions = Vec::with_capacity(key.questions.len());
    for (idx, entry) in key.questions.iter().enumerate() {
        let correct_idx = option_index(&entry.correct_answer)
            .filter(|i| *i < entry.options.len())
            .ok_or_else(|| {
                ProgressionError::InvalidAttempt(format!(
                    "question {} has no option '{}'",
                    idx + 1,
                    entry.correct_answer
                ))
            })?;

        let submitted = submission.answers.get(idx);
        let chosen = submitted
            .and_then(|a| a.answer.as_deref())
            .map(str::trim)
            .filter(|a| !a.is_empty());

        let (user_answer, user_answer_text) = match chosen {
            Some(letter) => {
                let text = option_index(letter).and_then(|i| entry.options.get(i)).cloned();
                (letter.to_ascii_uppercase(), text)
            }
            None => (NOT_ANSWERED.to_string(), None),
        };

        let correct_answer = entry.correct_answer.trim().to_ascii_uppercase();
        questions.push(GradedQuestion {
            question_text: entry.question.clone(),
            options: entry.options.clone(),
            is_correct: user_answer == correct_answer,
            user_answer,
            user_answer_text,
            correct_answer,
            correct_answer_text: entry.options.get(correct_idx).cloned(),
            answer_time_secs: submitted.and_then(|a| a.answer_time_secs),
        });
    }

    let correct = questions.iter().filter(|q| q.is_correct).count();
    let score = (correct as f64 / questions.len() as f64) * key.total_marks;

    Ok(QuizAttempt {
        username: username.to_string(),
        quiz_name: key.quiz_name.clone(),
        score,
        total: key.total_marks,
        performance_tier: performance_tier(score, key.total_marks),
        questions,
    })
}

fn validate(key: &AnswerKey, submission: &QuizSubmission) -> Result<()> {
    if key.quiz_name.trim().is_empty() {
        return Err(ProgressionError::InvalidAttempt("missing quiz name".to_string()));
    }
    if key.questions.is_empty() {
        return Err(ProgressionError::InvalidAttempt(
            "answer key has no questions".to_string(),
        ));
    }
    if !key.total_marks.is_finite() || key.total_marks <= 0.0 {
        return Err(ProgressionError::InvalidAttempt(format!(
            "total marks must be positive, got {}",
            key.total_marks
        )));
    }
    if submission.answers.len() > key.questions.len() {
        return Err(ProgressionError::InvalidAttempt(format!(
            "{} answers for {} questions",
            submission.answers.len(),
            key.questions.len()
        )));
    }
    for (idx, answer) in submission.answers.iter().enumerate() {
        match answer.answer_time_secs {
            Some(t) if !(t.is_finite() && t >= 0.0) => {
                return Err(ProgressionError::InvalidAttempt(format!(
                    "answer {} has invalid time {t}",
                    idx + 1
                )));
            }
            _ => {}
        }
    }
    Ok(())
}
