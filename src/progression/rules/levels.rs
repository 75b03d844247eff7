//! XP and level system
//!
//! Leaving level `L` costs `L * xp_per_level` XP. XP held within the current
//! level is drained through those costs until it no longer covers the next
//! one.

use serde::{Deserialize, Serialize};

use super::themes::unlock_for_level;
use crate::domain::UserProgression;
use crate::progression::error::{ProgressionError, Result};

/// Default XP step between levels
pub const DEFAULT_XP_PER_LEVEL: u64 = 100;

/// A level up event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUp {
    pub old_level: u32,
    pub new_level: u32,
}

/// Everything a single XP settle changed besides the counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelingOutcome {
    pub level_ups: Vec<LevelUp>,
    pub unlocked_themes: Vec<String>,
}

/// XP needed to leave `level`
pub fn xp_to_leave(level: u32, xp_per_level: u64) -> Result<u64> {
    match u64::from(level).checked_mul(xp_per_level) {
        Some(cost) if cost > 0 => Ok(cost),
        Some(_) => Err(ProgressionError::InvariantViolation(format!(
            "level {level} with step {xp_per_level} has no XP cost"
        ))),
        None => Err(ProgressionError::InvariantViolation(format!(
            "XP cost of level {level} overflows"
        ))),
    }
}

/// Settle a non-negative XP delta into `progression`.
///
/// Themes are evaluated at every level crossed, not only the final one.
pub fn apply_xp(
    progression: &mut UserProgression,
    delta: u64,
    xp_per_level: u64,
) -> Result<LevelingOutcome> {
    let mut outcome = LevelingOutcome::default();

    progression.xp = progression.xp.checked_add(delta).ok_or_else(|| {
        ProgressionError::InvariantViolation("XP within level overflows".to_string())
    })?;
    progression.total_xp = progression.total_xp.checked_add(delta).ok_or_else(|| {
        ProgressionError::InvariantViolation("lifetime XP overflows".to_string())
    })?;

    let mut cost = xp_to_leave(progression.level, xp_per_level)?;
    while progression.xp >= cost {
        progression.xp -= cost;

        let old_level = progression.level;
        progression.level = old_level.checked_add(1).ok_or_else(|| {
            ProgressionError::InvariantViolation("level overflows".to_string())
        })?;
        outcome.level_ups.push(LevelUp {
            old_level,
            new_level: progression.level,
        });
        outcome.unlocked_themes.extend(unlock_for_level(
            progression.level,
            &mut progression.unlocked_themes,
        ));

        cost = xp_to_leave(progression.level, xp_per_level)?;
    }

    Ok(outcome)
}

/// XP rewards for quiz and login events
pub struct XpRewards;

impl XpRewards {
    /// Base XP for a graded score, rounded to whole XP
    pub fn for_score(score: f64, xp_per_score_point: u64) -> u64 {
        let xp = (score * xp_per_score_point as f64).round();
        if xp.is_finite() && xp > 0.0 {
            xp as u64
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> UserProgression {
        UserProgression::new("ada", 0)
    }

    #[test]
    fn test_exact_threshold_levels_up() {
        let mut p = fresh();
        let outcome = apply_xp(&mut p, 100, DEFAULT_XP_PER_LEVEL).unwrap();
        assert_eq!((p.level, p.xp, p.total_xp), (2, 0, 100));
        assert_eq!(
            outcome.level_ups,
            vec![LevelUp { old_level: 1, new_level: 2 }]
        );
        assert_eq!(outcome.unlocked_themes, vec!["Light".to_string()]);
    }

    #[test]
    fn test_second_delta_drains_level_two_cost() {
        let mut p = fresh();
        apply_xp(&mut p, 100, DEFAULT_XP_PER_LEVEL).unwrap();
        let outcome = apply_xp(&mut p, 210, DEFAULT_XP_PER_LEVEL).unwrap();
        assert_eq!((p.level, p.xp, p.total_xp), (3, 10, 310));
        assert_eq!(outcome.unlocked_themes, vec!["Dark".to_string()]);
    }

    #[test]
    fn test_single_grant_crosses_several_levels() {
        let mut p = fresh();
        // 100 + 200 + 300 = 600 to reach level 4
        let outcome = apply_xp(&mut p, 650, DEFAULT_XP_PER_LEVEL).unwrap();
        assert_eq!((p.level, p.xp), (4, 50));
        assert_eq!(outcome.level_ups.len(), 3);
        assert_eq!(
            outcome.unlocked_themes,
            vec![
                "Light".to_string(),
                "Dark".to_string(),
                "material-light".to_string()
            ]
        );
    }

    #[test]
    fn test_below_threshold_keeps_level() {
        let mut p = fresh();
        let outcome = apply_xp(&mut p, 99, DEFAULT_XP_PER_LEVEL).unwrap();
        assert_eq!((p.level, p.xp), (1, 99));
        assert!(outcome.level_ups.is_empty());
    }

    #[test]
    fn test_zero_level_is_invariant_violation() {
        let mut p = fresh();
        p.level = 0;
        let err = apply_xp(&mut p, 10, DEFAULT_XP_PER_LEVEL).unwrap_err();
        assert!(matches!(err, ProgressionError::InvariantViolation(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_zero_step_is_invariant_violation() {
        let mut p = fresh();
        assert!(apply_xp(&mut p, 10, 0).is_err());
    }

    #[test]
    fn test_invariant_holds_for_many_deltas() {
        let mut p = fresh();
        for delta in [0, 1, 99, 250, 1_000, 7, 12_345, 50] {
            let before = p.total_xp;
            apply_xp(&mut p, delta, DEFAULT_XP_PER_LEVEL).unwrap();
            assert!(p.xp < u64::from(p.level) * DEFAULT_XP_PER_LEVEL);
            assert_eq!(p.total_xp, before + delta);
        }
    }

    #[test]
    fn test_score_rewards_round() {
        assert_eq!(XpRewards::for_score(7.0, 10), 70);
        assert_eq!(XpRewards::for_score(6.666_666, 10), 67);
        assert_eq!(XpRewards::for_score(0.0, 10), 0);
        assert_eq!(XpRewards::for_score(f64::NAN, 10), 0);
    }
}
