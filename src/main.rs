use clap::{Parser, Subcommand};
use git_sync::commands::*;
use git_sync::core::{
    config::SyncConfig,
    dispatch::ChangeAction,
    error::{Result, SyncError},
    print_error,
    repository::Repository,
};
use std::env;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "git-sync")]
#[command(about = "Keep git working copies up to date without losing local work")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Print mutating git commands instead of running them
    #[arg(long, global = true)]
    dry_run: bool,

    /// Run as if started in <DIR>
    #[arg(short = 'C', value_name = "DIR", global = true)]
    directory: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show changed files grouped by staged, unstaged and untracked
    Status {
        /// Print the parsed records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Stage unstaged changes (all, or the given paths)
    Stage { paths: Vec<String> },
    /// Unstage staged changes (all, or the given paths)
    Unstage { paths: Vec<String> },
    /// Throw away changes (all, or the given paths)
    Discard { paths: Vec<String> },
    /// Update a branch from its remote, keeping local changes
    Update(UpdateArgs),
    /// List remotes
    Remotes,
    /// Show branch, tracking remote and local/remote heads
    Info(UpdateArgs),
}

fn load_config(dry_run: bool) -> SyncConfig {
    let mut config = SyncConfig::load_or_create().unwrap_or_else(|e| {
        log::warn!("Using default configuration: {e}");
        SyncConfig::default()
    });
    config.dry_run |= dry_run;
    config
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.dry_run);
    let start = match cli.directory {
        Some(dir) => dir,
        None => env::current_dir()?,
    };
    let repo = Repository::discover(&start, &config).await?;

    match cli.command {
        Commands::Status { json } => execute_status(&repo, json).await,
        Commands::Stage { paths } => execute_change_action(&repo, ChangeAction::Stage, paths).await,
        Commands::Unstage { paths } => execute_change_action(&repo, ChangeAction::Unstage, paths).await,
        Commands::Discard { paths } => execute_change_action(&repo, ChangeAction::Discard, paths).await,
        Commands::Update(args) => execute_update(&repo, &args, &config).await,
        Commands::Remotes => execute_remotes(&repo).await,
        Commands::Info(args) => execute_info(&repo, &args, &config).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Configure logging based on --debug flag; RUST_LOG still wins when set
    let level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(cli).await {
        match &e {
            SyncError::NotInGitRepo => print_error("Not in a git repository"),
            other => print_error(&other.to_string()),
        }
        std::process::exit(1);
    }
}
