//! Settle planning
//!
//! Turns a freshly loaded progression plus one event into the next
//! progression, its ledger entries and the events to report. Nothing here
//! touches the store; the engine commits the resulting [`Draft`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{ProgressionError, Result};
use super::rules::streaks::{self, StreakKind, StreakUpdate};
use super::rules::{LevelUp, XpRewards, apply_xp, check_quiz_badges, unlock_for_level};
use crate::config::Config;
use crate::domain::{BadgeId, QuizAttempt, Report, UserProgression, XpLogEntry, XpReason};

/// Events that can happen during a settle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressionEvent {
    XpAwarded { amount: u64, reason: String },
    StreakExtended { kind: StreakKind, count: u32 },
    BadgeGranted { badge: BadgeId },
    LevelUp(LevelUp),
    ThemeUnlocked { theme: String },
}

/// Progression snapshot after a settle plus what changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatedProgression {
    pub progression: UserProgression,
    pub events: Vec<ProgressionEvent>,
}

impl UpdatedProgression {
    pub fn new_badges(&self) -> Vec<BadgeId> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ProgressionEvent::BadgeGranted { badge } => Some(*badge),
                _ => None,
            })
            .collect()
    }

    pub fn new_themes(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ProgressionEvent::ThemeUnlocked { theme } => Some(theme.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn level_ups(&self) -> Vec<LevelUp> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ProgressionEvent::LevelUp(level_up) => Some(*level_up),
                _ => None,
            })
            .collect()
    }

    /// Total XP granted by this settle
    pub fn xp_awarded(&self) -> u64 {
        self.events
            .iter()
            .map(|e| match e {
                ProgressionEvent::XpAwarded { amount, .. } => *amount,
                _ => 0,
            })
            .sum()
    }
}

/// Uncommitted result of planning one settle
#[derive(Debug, Clone)]
pub struct Draft {
    pub progression: UserProgression,
    pub ledger: Vec<XpLogEntry>,
    pub events: Vec<ProgressionEvent>,
    pub report: Option<Report>,
}

impl Draft {
    fn new(progression: UserProgression) -> Self {
        Self {
            progression,
            ledger: Vec::new(),
            events: Vec::new(),
            report: None,
        }
    }

    /// Record a grant; zero amounts leave no trace
    fn grant(&mut self, amount: u64, reason: XpReason, timestamp: i64) {
        if amount == 0 {
            return;
        }
        self.ledger.push(XpLogEntry::new(
            self.progression.user_id.clone(),
            amount,
            reason,
            timestamp,
        ));
        self.events.push(ProgressionEvent::XpAwarded {
            amount,
            reason: reason.as_str().to_string(),
        });
    }

    fn record_streak(&mut self, kind: StreakKind, update: StreakUpdate) {
        if let Some(count) = update.count() {
            self.events.push(ProgressionEvent::StreakExtended { kind, count });
        }
    }

    /// Feed all pending grants through the leveling engine in one delta,
    /// then re-check the theme ladder for the current level.
    fn settle_xp(&mut self, xp_per_level: u64) -> Result<()> {
        let delta = self
            .ledger
            .iter()
            .try_fold(0u64, |acc, e| acc.checked_add(e.amount))
            .ok_or_else(|| {
                ProgressionError::InvariantViolation("XP delta overflows".to_string())
            })?;

        let outcome = apply_xp(&mut self.progression, delta, xp_per_level)?;
        self.events
            .extend(outcome.level_ups.into_iter().map(ProgressionEvent::LevelUp));

        let mut themes = outcome.unlocked_themes;
        themes.extend(unlock_for_level(
            self.progression.level,
            &mut self.progression.unlocked_themes,
        ));
        self.events
            .extend(themes.into_iter().map(|theme| ProgressionEvent::ThemeUnlocked { theme }));
        Ok(())
    }

    /// True if committing would change nothing
    pub fn is_noop(&self, original: &UserProgression) -> bool {
        self.ledger.is_empty() && self.report.is_none() && self.progression == *original
    }

    pub fn into_update(self) -> UpdatedProgression {
        UpdatedProgression {
            progression: self.progression,
            events: self.events,
        }
    }
}

/// Plan a graded quiz submission: badges, base XP, daily quiz bonus.
pub fn plan_quiz(
    progression: UserProgression,
    attempt: &QuizAttempt,
    now: DateTime<Utc>,
    config: &Config,
) -> Result<Draft> {
    validate_attempt(&progression.user_id, attempt)?;

    let timestamp = now.timestamp_millis();
    let mut draft = Draft::new(progression);

    let badges = check_quiz_badges(
        attempt,
        &draft.progression.badges,
        config.badges.speed_genius_max_avg_secs,
    );
    for badge in badges {
        draft.progression.badges.insert(badge);
        draft.events.push(ProgressionEvent::BadgeGranted { badge });
    }

    let base_xp = XpRewards::for_score(attempt.score, config.rewards.xp_per_score_point);
    draft.grant(base_xp, XpReason::QuizScore, timestamp);

    let p = &mut draft.progression;
    let update = streaks::record(&mut p.quiz_streak, &mut p.last_quiz_date, now.date_naive());
    draft.record_streak(StreakKind::Quiz, update);
    if update.is_new_day() {
        draft.grant(config.rewards.quiz_streak_bonus, XpReason::QuizStreakBonus, timestamp);
    }

    draft.settle_xp(config.leveling.xp_per_level)?;
    Ok(draft)
}

/// Plan a login: daily login streak and its bonus.
pub fn plan_login(
    progression: UserProgression,
    now: DateTime<Utc>,
    config: &Config,
) -> Result<Draft> {
    let mut draft = Draft::new(progression);

    let p = &mut draft.progression;
    let update = streaks::record(&mut p.login_streak, &mut p.last_login_date, now.date_naive());
    draft.record_streak(StreakKind::Login, update);
    if update.is_new_day() {
        draft.grant(
            config.rewards.login_streak_bonus,
            XpReason::LoginStreakBonus,
            now.timestamp_millis(),
        );
    }

    draft.settle_xp(config.leveling.xp_per_level)?;
    Ok(draft)
}

/// Plan a theme change; only unlocked themes (or the default) qualify.
pub fn plan_theme_selection(progression: UserProgression, theme: &str) -> Result<Draft> {
    if !progression.has_theme(theme) {
        return Err(ProgressionError::ThemeLocked(theme.to_string()));
    }
    let mut draft = Draft::new(progression);
    draft.progression.selected_theme = theme.to_string();
    Ok(draft)
}

fn validate_attempt(user_id: &str, attempt: &QuizAttempt) -> Result<()> {
    let invalid = |msg: String| Err(ProgressionError::InvalidAttempt(msg));

    if attempt.username != user_id {
        return invalid(format!(
            "attempt belongs to '{}', not '{}'",
            attempt.username, user_id
        ));
    }
    if attempt.questions.is_empty() {
        return invalid("attempt has no questions".to_string());
    }
    if !attempt.total.is_finite() || attempt.total <= 0.0 {
        return invalid(format!("total must be positive, got {}", attempt.total));
    }
    if !attempt.score.is_finite() || attempt.score < 0.0 || attempt.score > attempt.total {
        return invalid(format!(
            "score {} outside 0..={}",
            attempt.score, attempt.total
        ));
    }
    for (idx, question) in attempt.questions.iter().enumerate() {
        match question.answer_time_secs {
            Some(t) if !(t.is_finite() && t >= 0.0) => {
                return invalid(format!("answer {} has invalid time {t}", idx + 1));
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GradedQuestion, PerformanceTier};
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()
    }

    fn attempt(score: f64, times: &[f64]) -> QuizAttempt {
        QuizAttempt {
            username: "ada".to_string(),
            quiz_name: "Borrowing".to_string(),
            score,
            total: 10.0,
            performance_tier: PerformanceTier::Medium,
            questions: times
                .iter()
                .map(|t| GradedQuestion {
                    question_text: "q".to_string(),
                    options: vec!["x".to_string()],
                    user_answer: "A".to_string(),
                    user_answer_text: None,
                    correct_answer: "A".to_string(),
                    correct_answer_text: None,
                    is_correct: true,
                    answer_time_secs: Some(*t),
                })
                .collect(),
        }
    }

    #[test]
    fn test_quiz_first_of_day_gets_bonus() {
        let config = Config::default();
        let draft = plan_quiz(UserProgression::new("ada", 0), &attempt(7.0, &[30.0]), at(3, 9), &config)
            .unwrap();

        // 70 base + 20 bonus
        assert_eq!(draft.progression.total_xp, 90);
        assert_eq!(draft.progression.quiz_streak, 1);
        assert_eq!(draft.ledger.len(), 2);
        assert_eq!(draft.ledger[0].reason, "quiz-score");
        assert_eq!(draft.ledger[1].reason, "quiz-streak-bonus");
        assert_eq!(draft.clone().into_update().xp_awarded(), 90);
    }

    #[test]
    fn test_second_quiz_same_day_no_bonus() {
        let config = Config::default();
        let first = plan_quiz(UserProgression::new("ada", 0), &attempt(1.0, &[30.0]), at(3, 9), &config)
            .unwrap();
        let second = plan_quiz(first.progression, &attempt(1.0, &[30.0]), at(3, 22), &config).unwrap();

        assert_eq!(second.ledger.len(), 1);
        assert_eq!(second.progression.quiz_streak, 1);
        assert_eq!(second.progression.total_xp, 10 + 20 + 10);
    }

    #[test]
    fn test_quiz_grants_badges_and_levels() {
        let config = Config::default();
        let draft = plan_quiz(UserProgression::new("ada", 0), &attempt(10.0, &[2.0, 3.0]), at(3, 9), &config)
            .unwrap();
        let update = draft.into_update();

        assert_eq!(
            update.new_badges(),
            vec![BadgeId::PerfectScore, BadgeId::SpeedGenius]
        );
        // 100 + 20 = 120 -> level 2 with 20 XP
        assert_eq!(update.progression.level, 2);
        assert_eq!(update.progression.xp, 20);
        assert_eq!(update.new_themes(), vec!["Light".to_string()]);
        assert_eq!(update.level_ups().len(), 1);
    }

    #[test]
    fn test_zero_score_writes_no_base_entry() {
        let config = Config::default();
        let draft = plan_quiz(UserProgression::new("ada", 0), &attempt(0.0, &[30.0]), at(3, 9), &config)
            .unwrap();
        assert_eq!(draft.ledger.len(), 1);
        assert_eq!(draft.ledger[0].reason, "quiz-streak-bonus");
    }

    #[test]
    fn test_rejects_foreign_or_malformed_attempts() {
        let config = Config::default();
        let mut foreign = attempt(5.0, &[1.0]);
        foreign.username = "bob".to_string();
        assert!(matches!(
            plan_quiz(UserProgression::new("ada", 0), &foreign, at(3, 9), &config),
            Err(ProgressionError::InvalidAttempt(_))
        ));

        let empty = attempt(5.0, &[]);
        assert!(plan_quiz(UserProgression::new("ada", 0), &empty, at(3, 9), &config).is_err());

        let over = attempt(11.0, &[1.0]);
        assert!(plan_quiz(UserProgression::new("ada", 0), &over, at(3, 9), &config).is_err());
    }

    #[test]
    fn test_rejects_invalid_answer_times() {
        let config = Config::default();
        for bad in [-100.0, f64::NAN, f64::INFINITY] {
            let timed = attempt(5.0, &[bad, 40.0, 40.0]);
            let err = plan_quiz(UserProgression::new("ada", 0), &timed, at(3, 9), &config)
                .unwrap_err();
            assert!(matches!(err, ProgressionError::InvalidAttempt(_)));
        }

        // untimed questions are fine
        let mut untimed = attempt(5.0, &[40.0]);
        untimed.questions[0].answer_time_secs = None;
        assert!(plan_quiz(UserProgression::new("ada", 0), &untimed, at(3, 9), &config).is_ok());
    }

    #[test]
    fn test_login_streak_rules() {
        let config = Config::default();
        let mut p = UserProgression::new("ada", 0);
        p.login_streak = 4;
        p.last_login_date = Some(at(2, 8).date_naive());

        let draft = plan_login(p, at(3, 23), &config).unwrap();
        assert_eq!(draft.progression.login_streak, 5);
        assert_eq!(draft.progression.total_xp, 50);

        let again = plan_login(draft.progression.clone(), at(3, 23), &config).unwrap();
        assert!(again.is_noop(&draft.progression));
        assert_eq!(again.progression.login_streak, 5);

        let later = plan_login(draft.progression, at(6, 7), &config).unwrap();
        assert_eq!(later.progression.login_streak, 1);
    }

    #[test]
    fn test_login_catches_up_missing_themes() {
        let config = Config::default();
        let mut p = UserProgression::new("ada", 0);
        p.level = 4;
        p.last_login_date = Some(at(3, 8).date_naive());

        let update = plan_login(p, at(3, 9), &config).unwrap().into_update();
        assert_eq!(
            update.new_themes(),
            vec!["Light".to_string(), "Dark".to_string(), "material-light".to_string()]
        );
    }

    #[test]
    fn test_theme_selection() {
        let mut p = UserProgression::new("ada", 0);
        p.unlocked_themes.insert("Dark".to_string());

        let draft = plan_theme_selection(p.clone(), "Dark").unwrap();
        assert_eq!(draft.progression.selected_theme, "Dark");

        let err = plan_theme_selection(p, "nord").unwrap_err();
        assert!(matches!(err, ProgressionError::ThemeLocked(t) if t == "nord"));
    }
}
