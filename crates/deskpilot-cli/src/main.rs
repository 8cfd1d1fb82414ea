//! deskpilot CLI
//!
//! One subcommand per gesture, on top of the deskpilot library.
//!
//! Usage:
//!   deskpilot windows                                   # list top-level windows
//!   deskpilot find "role:Button && name:OK" -w "title~:Notepad" --stats
//!   deskpilot click "name:Save" -w "title~:Notepad"     # waits for the element first
//!   deskpilot type "hello" --into "id:15" -w "title~:Notepad"
//!   deskpilot hotkey ctrl+shift+p
//!   deskpilot drag 100,100 400,300 --steps 30
//!   deskpilot --dry-run click-at 640 480                # log input instead of sending it

use crate::cli::Cli;
use crate::command::{build_desktop, handle_command};
use crate::utils::init_logging;
use clap::Parser;
use colored::Colorize;
use deskpilot::DeferredAction;
use std::time::Duration;
use tracing::error;

mod cli;
mod command;
mod utils;

/// Exit status when the watchdog fires, as `timeout(1)` uses
const WATCHDOG_EXIT_CODE: i32 = 124;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let watchdog = cli.watchdog_ms.map(|ms| {
        DeferredAction::schedule(Duration::from_millis(ms), move || {
            error!("watchdog: command still running after {ms} ms, exiting");
            std::process::exit(WATCHDOG_EXIT_CODE);
        })
    });

    let result = match build_desktop(&cli) {
        Ok(desktop) => handle_command(&desktop, cli.command).await,
        Err(e) => Err(e),
    };

    if let Some(watchdog) = &watchdog {
        watchdog.cancel();
    }

    if let Err(e) = result {
        eprintln!("{} {e:#}", "error:".red().bold());
        std::process::exit(1);
    }
}
