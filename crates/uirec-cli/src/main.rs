mod cmd_config;
mod cmd_import;
mod cmd_init;
mod cmd_project;
mod cmd_query;
mod cmd_record;
mod cmd_replay;
mod cmd_serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd_config::ConfigCmd;
use cmd_project::ProjectCmd;

#[derive(Parser)]
#[command(
    name = "uirec",
    version,
    about = "Record UI state alongside commits and replay it step by step"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize a new .uirec/ workspace
    Init,
    /// Start the recorder HTTP server
    Serve {
        /// Address to bind (overrides config `bind`)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (overrides config `port`)
        #[arg(long)]
        port: Option<u16>,
        /// Require an `x-uirec-user` project member on every request
        #[arg(long)]
        auth: bool,
    },
    /// Manage projects and their members
    Project {
        #[command(subcommand)]
        cmd: ProjectCmd,
    },
    /// Load commits, branches, objects and commit events from a JSON file
    Import {
        /// Path to the history file
        file: PathBuf,
    },
    /// Offer one commit event (JSON file) for recording
    Record {
        /// Path to the commit event
        file: PathBuf,
    },
    /// Does a commit have a recording?
    Status {
        /// Project id (owner+name)
        project: String,
        /// Commit id, with or without the leading '#'
        commit: String,
    },
    /// Distance from a branch tip to the nearest recorded commit
    BranchStatus {
        project: String,
        branch: String,
        /// Maximum commits to examine (default: config `max_entries`)
        #[arg(short, long)]
        n: Option<usize>,
    },
    /// List recordings between two commits, oldest first
    Recordings {
        project: String,
        start: String,
        end: String,
        /// Maximum commits to examine (default: config `max_entries`)
        #[arg(short, long)]
        n: Option<usize>,
    },
    /// Replay a recorded range against a headless session
    Replay {
        project: String,
        #[arg(required_unless_present = "branch")]
        start: Option<String>,
        #[arg(required_unless_present = "branch")]
        end: Option<String>,
        /// Replay what the branch gained since its latest recorded commit
        #[arg(long, conflicts_with_all = ["start", "end"])]
        branch: Option<String>,
        /// Maximum commits to examine (default: config `max_entries`)
        #[arg(short, long)]
        n: Option<usize>,
        /// Recorder server URL (default: config `server_url`)
        #[arg(long)]
        server: Option<String>,
        /// User sent in `x-uirec-user`
        #[arg(long)]
        user: Option<String>,
        /// Settle delay between steps in milliseconds (default: config `settle_delay_ms`)
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// Manage workspace configuration
    Config {
        #[command(subcommand)]
        cmd: ConfigCmd,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("UIREC_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    let cwd = std::env::current_dir()?;
    let repo_root = match cli.cmd {
        Command::Init => cwd,
        _ => uirec_ledger::paths::UirecPaths::find_root(&cwd).unwrap_or(cwd),
    };

    match cli.cmd {
        Command::Init => cmd_init::execute(&repo_root),
        Command::Serve { bind, port, auth } => {
            cmd_serve::execute(&repo_root, bind.as_deref(), port, auth)
        }
        Command::Project { cmd } => cmd_project::run(cmd, &repo_root),
        Command::Import { file } => cmd_import::execute(&repo_root, &file),
        Command::Record { file } => cmd_record::execute(&repo_root, &file),
        Command::Status { project, commit } => cmd_query::status(&repo_root, &project, &commit),
        Command::BranchStatus { project, branch, n } => {
            cmd_query::branch_status(&repo_root, &project, &branch, n)
        }
        Command::Recordings {
            project,
            start,
            end,
            n,
        } => cmd_query::recordings(&repo_root, &project, &start, &end, n),
        Command::Replay {
            project,
            start,
            end,
            branch,
            n,
            server,
            user,
            delay_ms,
        } => {
            let target = match (branch.as_deref(), start.as_deref(), end.as_deref()) {
                (Some(branch), _, _) => cmd_replay::ReplayTarget::Branch(branch),
                (None, Some(start), Some(end)) => cmd_replay::ReplayTarget::Range { start, end },
                _ => anyhow::bail!("replay needs <start> <end> or --branch"),
            };
            cmd_replay::execute(cmd_replay::ReplayParams {
                repo_root: &repo_root,
                project: &project,
                target,
                max_entries: n,
                server: server.as_deref(),
                user: user.as_deref(),
                delay_ms,
            })
        }
        Command::Config { cmd } => cmd_config::run(cmd, &repo_root),
    }
}
