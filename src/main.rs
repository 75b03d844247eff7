use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "questline")]
#[command(about = "Quiz progression - XP, streaks, badges, themes and leaderboards")]
#[command(version)]
struct Cli {
    /// Path to the progression database (defaults to ~/.questline/progression.db)
    #[arg(short, long, global = true)]
    db: Option<PathBuf>,

    /// Path to the config file (defaults to ~/.questline/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new user
    Register { user: String },

    /// Record today's login for a user
    Login { user: String },

    /// Grade a JSON submission file and settle it
    Submit {
        user: String,
        /// File holding `quiz` (answer key) and `answers`
        file: PathBuf,
    },

    /// Show a user's progression
    Show {
        user: String,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Select an unlocked theme
    Theme { user: String, theme: String },

    /// XP leaderboard for "week" or "month"
    Leaderboard {
        window: String,
        /// Only show the first N users
        #[arg(long)]
        top: Option<usize>,
    },

    /// Best scores per quiz for "week" or "month"
    TopScorers { window: String },

    /// List a user's quiz reports
    Reports { user: String },

    /// Show one report by id
    Report { id: String },

    /// Write a default config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    if let Commands::Init { force } = cli.command {
        return cli::init::init_command(cli.config, force).await;
    }

    let engine = cli::open_engine(cli.config.as_deref(), cli.db.as_deref())?;

    match &cli.command {
        Commands::Register { user } => cli::user::register_command(&engine, user).await?,
        Commands::Login { user } => cli::user::login_command(&engine, user).await?,
        Commands::Submit { user, file } => cli::quiz::submit_command(&engine, user, file).await?,
        Commands::Show { user, json } => cli::user::show_command(&engine, user, *json).await?,
        Commands::Theme { user, theme } => cli::user::theme_command(&engine, user, theme).await?,
        Commands::Leaderboard { window, top } => {
            cli::leaderboard::leaderboard_command(&engine, window, *top).await?
        }
        Commands::TopScorers { window } => {
            cli::leaderboard::top_scorers_command(&engine, window).await?
        }
        Commands::Reports { user } => cli::user::reports_command(&engine, user).await?,
        Commands::Report { id } => cli::quiz::report_command(&engine, id).await?,
        Commands::Init { .. } => {}
    }

    Ok(())
}
