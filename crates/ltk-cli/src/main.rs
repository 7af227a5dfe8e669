use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ltk")]
#[command(about = "League score reconciler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the scoreboard and record tonight's games until the session completes
    Run(RunArgs),

    /// Inspect or change the stored session length
    Session {
        #[command(subcommand)]
        cmd: SessionCmd,
    },

    /// Roster inspection
    Roster {
        #[command(subcommand)]
        cmd: RosterCmd,
    },

    /// Average maintenance
    Averages {
        #[command(subcommand)]
        cmd: AveragesCmd,
    },

    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> site -> night overrides...)
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[derive(clap::Args)]
pub struct RunArgs {
    /// Layered config paths in merge order
    #[arg(long = "config")]
    pub config_paths: Vec<String>,

    /// JSON feed URL (overrides source.url)
    #[arg(long, conflicts_with = "snapshot_file")]
    pub source_url: Option<String>,

    /// JSON snapshot file re-read every cycle (overrides source.snapshot_file)
    #[arg(long)]
    pub snapshot_file: Option<PathBuf>,

    #[arg(long, requires = "max_lane")]
    pub min_lane: Option<u32>,

    #[arg(long, requires = "min_lane")]
    pub max_lane: Option<u32>,

    /// Replace the stored session length before the run starts
    #[arg(long)]
    pub session_length: Option<u32>,

    /// Confirm a session length override that differs from the stored value
    #[arg(long, default_value_t = false)]
    pub yes: bool,

    /// Run a single cycle and exit
    #[arg(long, default_value_t = false, conflicts_with = "max_cycles")]
    pub once: bool,

    #[arg(long)]
    pub max_cycles: Option<u32>,

    /// Refuse configs with keys nothing reads
    #[arg(long, default_value_t = false)]
    pub strict_config: bool,
}

#[derive(Subcommand)]
enum SessionCmd {
    /// Print the stored session length
    Show,

    /// Overwrite the stored session length
    Set {
        #[arg(long)]
        length: u32,

        /// Acknowledge you are changing which slots tonight's games land in
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum RosterCmd {
    /// Print each bowler's state in the current session and the Active Set
    Status,
}

#[derive(Subcommand)]
enum AveragesCmd {
    /// Recompute every stored average from its scores
    Recompute {
        /// Print the new averages without writing them
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    commands::init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Run(args) => commands::run::run(args).await?,

        Commands::Session { cmd } => match cmd {
            SessionCmd::Show => commands::roster::session_show().await?,
            SessionCmd::Set { length, yes } => commands::roster::session_set(length, yes).await?,
        },

        Commands::Roster { cmd } => match cmd {
            RosterCmd::Status => commands::roster::roster_status().await?,
        },

        Commands::Averages { cmd } => match cmd {
            AveragesCmd::Recompute { dry_run } => {
                commands::roster::averages_recompute(dry_run).await?
            }
        },

        Commands::Db { cmd } => {
            let pool = ltk_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = ltk_db::status(&pool).await?;
                    println!("db_ok={} has_bowlers_table={}", s.ok, s.has_bowlers_table);
                }
                DbCmd::Migrate => {
                    ltk_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = ltk_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
    }

    Ok(())
}
