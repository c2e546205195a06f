mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use hookgate_core::check::Stage;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "hookgate",
    about = "Pre/post tool-use guard pipeline for AI coding assistants",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .claude/ or .git/)
    #[arg(long, global = true, env = "HOOKGATE_ROOT")]
    root: Option<PathBuf>,

    /// Config file (default: <root>/.claude/hookgate.yaml)
    #[arg(long, global = true, env = "HOOKGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Audit log directory (default: ~/.claude/logs)
    #[arg(long, global = true, env = "HOOKGATE_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hook entry point: gate a proposed tool call (reads the event on stdin)
    PreToolUse,

    /// Hook entry point: review a completed tool call (reads the event on stdin)
    PostToolUse,

    /// List registered checks
    Checks {
        /// Only show one stage: pre or post
        #[arg(long)]
        stage: Option<Stage>,
    },

    /// Manage the hook configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Summarise the audit log for a day
    Log {
        /// UTC day as YYYYMMDD (default: today)
        #[arg(long)]
        date: Option<String>,

        /// Number of recent breadcrumbs to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| hookgate_core::paths::config_path(&root));

    let result = match cli.command {
        Commands::PreToolUse => {
            let code = cmd::hook::run(Stage::PreAction, &config_path, cli.log_dir);
            std::process::exit(code);
        }
        Commands::PostToolUse => {
            let code = cmd::hook::run(Stage::PostAction, &config_path, cli.log_dir);
            std::process::exit(code);
        }
        Commands::Checks { stage } => cmd::checks::run(&config_path, stage, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&config_path, subcommand, cli.json),
        Commands::Log { date, limit } => {
            cmd::log::run(cli.log_dir, date.as_deref(), limit, cli.json)
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
