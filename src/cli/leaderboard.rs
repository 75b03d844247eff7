//! Leaderboard commands

use anyhow::Result;
use chrono::Utc;

use questline::progression::{LeaderboardWindow, ProgressionEngine};

pub async fn leaderboard_command(
    engine: &ProgressionEngine,
    window: &str,
    top: Option<usize>,
) -> Result<()> {
    let window: LeaderboardWindow = window.parse()?;
    let mut entries = engine.leaderboard(window, Utc::now())?;
    if let Some(top) = top {
        entries.truncate(top);
    }

    if entries.is_empty() {
        println!("No XP earned in this window.");
        return Ok(());
    }

    println!("{} leaderboard:\n", window.label());
    for (rank, entry) in entries.iter().enumerate() {
        println!("  {:>3}. {:<24} {:>8} XP", rank + 1, entry.user_id, entry.total_xp);
    }

    Ok(())
}

pub async fn top_scorers_command(engine: &ProgressionEngine, window: &str) -> Result<()> {
    let window: LeaderboardWindow = window.parse()?;
    let quizzes = engine.get_top_scorers(window, Utc::now())?;

    if quizzes.is_empty() {
        println!("No reports in this window.");
        return Ok(());
    }

    println!("{} top scorers:\n", window.label());
    for quiz in quizzes {
        println!("  {}", quiz.quiz_name);
        for (rank, score) in quiz.top_users.iter().enumerate() {
            println!(
                "    {}. {:<24} {}/{}",
                rank + 1,
                score.username,
                score.score,
                score.total
            );
        }
    }

    Ok(())
}
