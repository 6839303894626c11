pub mod daemon_path;
pub mod process;
pub mod show;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use process::{kill_previous_servers, restart_server, tracker_executables};
use show::{process_show_command, ShowCommand};
use tracing::level_filters::LevelFilter;

use crate::{
    config::TrackerArgs,
    daemon::start_tracker,
    utils::{
        dir::{absolute_path, create_application_default_path},
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "focus-tracker", version, long_about = None)]
#[command(about = "Tracks which application and window has your focus", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Starts a tracking daemon, replacing the running one")]
    Init {
        #[arg(
            long,
            help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
        )]
        dir: Option<PathBuf>,
        #[command(flatten)]
        tracker: TrackerArgs,
    },
    #[command(about = "Display the focus summary of a day")]
    Show {
        #[command(flatten)]
        command: ShowCommand,
    },
    #[command(
        about = "Run the tracker directly in current console. Stop it with Ctrl+C to write the summaries"
    )]
    Serve {
        #[arg(
            long,
            help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
        )]
        dir: Option<PathBuf>,
        #[command(flatten)]
        tracker: TrackerArgs,
    },
    #[command(about = "Stop currently running trackers.")]
    Stop {},
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };

    match args.commands {
        Commands::Init { dir, tracker } => {
            restart_server(dir.as_deref(), &tracker)?;
            Ok(())
        }
        Commands::Stop {} => {
            let stopped = kill_previous_servers(&tracker_executables()?)?;
            println!("Stopped {stopped} trackers");
            Ok(())
        }
        Commands::Serve { dir, tracker } => {
            let app_dir = dir
                .map(absolute_path)
                .map_or_else(create_application_default_path, Ok)?;
            enable_logging(CLI_PREFIX, &app_dir, logging_level, true)?;
            start_tracker(tracker.into_config(&app_dir)).await?;
            Ok(())
        }
        Commands::Show { command } => process_show_command(command).await,
    }
}
