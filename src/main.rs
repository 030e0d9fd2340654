//! repo-watch - keeps the file-change daemon running and asks it for reports.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use repo_watch::config::{locate_component_dir, ConfigLoader};
use repo_watch::display;
use repo_watch::supervisor::{Supervisor, SupervisorError};

#[derive(Parser)]
#[command(
    name = "repo-watch",
    about = "Supervise the repo-watch file-change daemon",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Component directory holding the daemon and its config
    /// (defaults to the current directory, or its inotify-watcher/).
    #[arg(short = 'd', long, global = true)]
    dir: Option<PathBuf>,

    /// Config document (defaults to <DIR>/index.json).
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Daemon executable (defaults to <DIR>/inotify-daemon).
    #[arg(long, global = true)]
    daemon: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Start the daemon if needed and ask it to refresh its report (default).
    Ping,
    /// Show whether the daemon is running.
    Status,
    /// Ask the daemon to shut down.
    Stop,
    /// Print the resolved configuration as JSON.
    Config,
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn build_supervisor(cli: &Cli) -> Result<Supervisor, SupervisorError> {
    let dir = match &cli.dir {
        Some(dir) => std::path::absolute(dir).unwrap_or_else(|_| dir.clone()),
        None => {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            locate_component_dir(&cwd)
        }
    };
    let loader = match &cli.config {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::for_component_dir(&dir),
    };
    let supervisor = Supervisor::load(&loader, &dir)?;
    Ok(match &cli.daemon {
        Some(daemon) => supervisor.with_daemon_executable(daemon),
        None => supervisor,
    })
}

async fn run(cli: &Cli) -> Result<(), SupervisorError> {
    let mut supervisor = build_supervisor(cli)?;

    match cli.command.unwrap_or(Commands::Ping) {
        Commands::Ping => {
            let outcome = supervisor.ping().await?;
            display::log_ping(&outcome);
        }
        Commands::Status => display::print_status(&supervisor.status()),
        Commands::Stop => display::print_stop(&supervisor.stop().await?),
        Commands::Config => println!("{}", supervisor.render_config()?),
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            display::print_error(&err);
            ExitCode::from(err.exit_code())
        }
    }
}
