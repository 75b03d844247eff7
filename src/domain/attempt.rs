//! Quiz attempts, answer keys and stored reports

use serde::{Deserialize, Serialize};

/// Answer recorded for a question the user skipped
pub const NOT_ANSWERED: &str = "Not Answered";

/// One question of a quiz's answer key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerKeyEntry {
    pub question: String,
    pub options: Vec<String>,
    /// Option letter ("A", "B", ...) of the correct answer
    pub correct_answer: String,
}

/// The answer key of a quiz
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerKey {
    pub quiz_name: String,
    pub total_marks: f64,
    pub questions: Vec<AnswerKeyEntry>,
}

/// A single answer as submitted by the user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    /// Chosen option letter, `None` if skipped
    #[serde(default)]
    pub answer: Option<String>,
    /// Seconds spent on the question, if timed
    #[serde(default)]
    pub answer_time_secs: Option<f64>,
}

/// Raw, ungraded answers in question order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuizSubmission {
    pub answers: Vec<SubmittedAnswer>,
}

/// Coarse classification of a graded attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceTier {
    High,
    Medium,
    Low,
}

impl PerformanceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

impl std::fmt::Display for PerformanceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A question after grading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedQuestion {
    pub question_text: String,
    pub options: Vec<String>,
    /// Submitted option letter or [`NOT_ANSWERED`]
    pub user_answer: String,
    pub user_answer_text: Option<String>,
    pub correct_answer: String,
    pub correct_answer_text: Option<String>,
    pub is_correct: bool,
    pub answer_time_secs: Option<f64>,
}

/// A graded quiz attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub username: String,
    pub quiz_name: String,
    pub score: f64,
    pub total: f64,
    pub performance_tier: PerformanceTier,
    pub questions: Vec<GradedQuestion>,
}

impl QuizAttempt {
    pub fn correct_count(&self) -> usize {
        self.questions.iter().filter(|q| q.is_correct).count()
    }

    /// Answer times that are actual numbers
    pub fn timed_answers(&self) -> impl Iterator<Item = f64> + '_ {
        self.questions
            .iter()
            .filter_map(|q| q.answer_time_secs)
            .filter(|t| t.is_finite())
    }
}

/// A stored attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub attempt: QuizAttempt,
    /// Submission time (ms since epoch)
    pub created_at: i64,
}

impl Report {
    pub fn new(attempt: QuizAttempt, created_at: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            attempt,
            created_at,
        }
    }
}
