// convoy-cli/src/main.rs
//
// Entry point of the `convoy` binary.
//
// Exit codes:
// - 0: every file completed or was skipped
// - 1: at least one file failed
// - 2: the run could not start (arguments, tables, configuration, tools)

use clap::Parser;
use convoy_cli::{Cli, Commands, run_batch, run_plan, terminal};
use std::process;

const EXIT_FILE_FAILURES: i32 = 1;
const EXIT_SETUP_ERROR: i32 = 2;

fn main() {
    let cli = Cli::parse();
    if cli.no_color {
        terminal::set_color(false);
    }

    let result = match cli.command {
        Commands::Run(args) => run_batch(args, cli.verbose).map(|summary| summary.has_failures()),
        Commands::Plan(args) => run_plan(args).map(|()| false),
    };

    match result {
        Ok(false) => {}
        Ok(true) => process::exit(EXIT_FILE_FAILURES),
        Err(e) => {
            log::error!("{e:#}");
            terminal::print_error("Convoy could not run", &format!("{e:#}"), None);
            process::exit(EXIT_SETUP_ERROR);
        }
    }
}
