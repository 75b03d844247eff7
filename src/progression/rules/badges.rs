//! Badge checking logic

use std::collections::BTreeSet;

use crate::domain::{BadgeId, QuizAttempt};

/// Default ceiling for the Speed Genius average, in seconds
pub const DEFAULT_SPEED_GENIUS_SECS: f64 = 10.0;

/// Check every badge rule against a graded attempt.
///
/// Only badges not already in `held` are returned.
pub fn check_quiz_badges(
    attempt: &QuizAttempt,
    held: &BTreeSet<BadgeId>,
    speed_genius_secs: f64,
) -> Vec<BadgeId> {
    let mut newly_granted = Vec::new();

    if is_perfect_score(attempt) && !held.contains(&BadgeId::PerfectScore) {
        newly_granted.push(BadgeId::PerfectScore);
    }

    let is_fast = average_answer_time(attempt).is_some_and(|avg| avg < speed_genius_secs);
    if is_fast && !held.contains(&BadgeId::SpeedGenius) {
        newly_granted.push(BadgeId::SpeedGenius);
    }

    newly_granted
}

fn is_perfect_score(attempt: &QuizAttempt) -> bool {
    let tolerance = f64::EPSILON * attempt.total.abs().max(1.0);
    (attempt.score - attempt.total).abs() <= tolerance
}

/// Mean over questions that carry a numeric answer time
pub fn average_answer_time(attempt: &QuizAttempt) -> Option<f64> {
    let (sum, count) = attempt
        .timed_answers()
        .fold((0.0, 0usize), |(sum, count), t| (sum + t, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GradedQuestion, PerformanceTier};

    fn attempt(score: f64, total: f64, times: &[Option<f64>]) -> QuizAttempt {
        QuizAttempt {
            username: "ada".to_string(),
            quiz_name: "Rust Basics".to_string(),
            score,
            total,
            performance_tier: PerformanceTier::Medium,
            questions: times
                .iter()
                .map(|t| GradedQuestion {
                    question_text: "q".to_string(),
                    options: vec!["a".to_string(), "b".to_string()],
                    user_answer: "A".to_string(),
                    user_answer_text: Some("a".to_string()),
                    correct_answer: "A".to_string(),
                    correct_answer_text: Some("a".to_string()),
                    is_correct: true,
                    answer_time_secs: *t,
                })
                .collect(),
        }
    }

    #[test]
    fn test_perfect_score_granted() {
        let a = attempt(10.0, 10.0, &[None]);
        assert_eq!(
            check_quiz_badges(&a, &BTreeSet::new(), DEFAULT_SPEED_GENIUS_SECS),
            vec![BadgeId::PerfectScore]
        );
    }

    #[test]
    fn test_slow_average_over_all_timed_answers() {
        let a = attempt(5.0, 10.0, &[Some(5.0), Some(8.0), Some(40.0)]);
        assert!((average_answer_time(&a).unwrap() - 17.666).abs() < 0.01);
        assert!(check_quiz_badges(&a, &BTreeSet::new(), DEFAULT_SPEED_GENIUS_SECS).is_empty());
    }

    #[test]
    fn test_fast_average_grants_speed_genius() {
        let a = attempt(5.0, 10.0, &[Some(5.0), Some(8.0)]);
        assert_eq!(average_answer_time(&a), Some(6.5));
        assert_eq!(
            check_quiz_badges(&a, &BTreeSet::new(), DEFAULT_SPEED_GENIUS_SECS),
            vec![BadgeId::SpeedGenius]
        );
    }

    #[test]
    fn test_untimed_answers_are_skipped() {
        let a = attempt(5.0, 10.0, &[Some(4.0), None, Some(f64::NAN)]);
        assert_eq!(average_answer_time(&a), Some(4.0));

        let none = attempt(5.0, 10.0, &[None, None]);
        assert_eq!(average_answer_time(&none), None);
        assert!(check_quiz_badges(&none, &BTreeSet::new(), DEFAULT_SPEED_GENIUS_SECS).is_empty());
    }

    #[test]
    fn test_held_badges_not_granted_twice() {
        let a = attempt(10.0, 10.0, &[Some(1.0)]);
        let held: BTreeSet<_> = BadgeId::all().iter().copied().collect();
        assert!(check_quiz_badges(&a, &held, DEFAULT_SPEED_GENIUS_SECS).is_empty());
    }
}
