//! User commands: register, login, show, theme, reports

use anyhow::{Result, bail};
use chrono::{TimeZone, Utc};

use questline::domain::Badge;
use questline::progression::rules::themes;
use questline::progression::{
    ProgressionEngine, ProgressionError, ProgressionEvent, UpdatedProgression,
};

pub async fn register_command(engine: &ProgressionEngine, user_id: &str) -> Result<()> {
    let progression = engine.register_user(user_id, Utc::now())?;
    println!(
        "Registered {} (level {}, theme {})",
        progression.user_id, progression.level, progression.selected_theme
    );
    Ok(())
}

pub async fn login_command(engine: &ProgressionEngine, user_id: &str) -> Result<()> {
    let update = engine.settle_login(user_id, Utc::now())?;
    if update.events.is_empty() {
        println!("Already logged in today. Streak: {} day(s)", update.progression.login_streak);
        return Ok(());
    }
    print_update(&update);
    Ok(())
}

pub async fn show_command(engine: &ProgressionEngine, user_id: &str, json: bool) -> Result<()> {
    let p = engine.get_progression(user_id)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&p)?);
        return Ok(());
    }

    let step = engine.config().leveling.xp_per_level;
    println!("{}", p.user_id);
    println!(
        "  Level {}  ({}/{} XP, {:.0}%)",
        p.level,
        p.xp,
        u64::from(p.level) * step,
        p.progress_to_next(step) * 100.0
    );
    println!("  {} XP to level {}", p.xp_to_next_level(step), p.level + 1);
    println!("  Total XP: {}", p.total_xp);
    println!("  Login streak: {}  Quiz streak: {}", p.login_streak, p.quiz_streak);
    println!("  Theme: {}", p.selected_theme);

    if !p.unlocked_themes.is_empty() {
        let themes: Vec<_> = p.unlocked_themes.iter().map(String::as_str).collect();
        println!("  Unlocked themes: {}", themes.join(", "));
    }

    if !p.badges.is_empty() {
        println!("  Badges:");
        for id in &p.badges {
            let badge = Badge::get(*id);
            println!("    {} {} - {}", badge.icon, badge.name, badge.description);
        }
    }

    Ok(())
}

pub async fn theme_command(engine: &ProgressionEngine, user_id: &str, theme: &str) -> Result<()> {
    if !themes::is_known_theme(theme) {
        bail!("Unknown theme: {}", theme);
    }

    let p = match engine.select_theme(user_id, theme) {
        Ok(p) => p,
        Err(ProgressionError::ThemeLocked(_)) => {
            let level = themes::threshold_for(theme).unwrap_or_default();
            bail!("Theme {} unlocks at level {}", theme, level);
        }
        Err(e) => return Err(e.into()),
    };
    println!("Theme set to {}", p.selected_theme);
    Ok(())
}

pub async fn reports_command(engine: &ProgressionEngine, user_id: &str) -> Result<()> {
    let reports = engine.reports_for_user(user_id)?;
    if reports.is_empty() {
        println!("No reports found.");
        return Ok(());
    }

    println!("Reports ({}):\n", reports.len());
    for report in reports {
        let when = Utc
            .timestamp_millis_opt(report.created_at)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| report.created_at.to_string());
        let a = &report.attempt;
        println!(
            "  {} {} - {}/{} ({}, {}/{} correct)",
            when,
            a.quiz_name,
            a.score,
            a.total,
            a.performance_tier,
            a.correct_count(),
            a.questions.len()
        );
    }

    Ok(())
}

/// Print the events of a settle, one per line
pub fn print_update(update: &UpdatedProgression) {
    for event in &update.events {
        match event {
            ProgressionEvent::XpAwarded { amount, reason } => println!("  +{} XP ({})", amount, reason),
            ProgressionEvent::StreakExtended { kind, count } => {
                println!("  {}: {} day(s)", kind.label(), count)
            }
            ProgressionEvent::BadgeGranted { badge } => {
                let badge = Badge::get(*badge);
                println!("  Badge earned: {} {}", badge.icon, badge.name)
            }
            ProgressionEvent::LevelUp(level_up) => {
                println!("  Level up! {} -> {}", level_up.old_level, level_up.new_level)
            }
            ProgressionEvent::ThemeUnlocked { theme } => println!("  Theme unlocked: {}", theme),
        }
    }
    let p = &update.progression;
    println!("Level {} ({} XP, {} total)", p.level, p.xp, p.total_xp);
}
