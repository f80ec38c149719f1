// convoy-cli/src/lib.rs
//
// Library portion of the Convoy CLI application.
// Contains argument definitions, command logic and terminal output.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod progress;
pub mod terminal;

// Re-export items needed by the binary or integration tests
pub use cli::{Cli, Commands, ConversionArgs, PlanArgs, RunArgs};
pub use commands::plan::run_plan;
pub use commands::run::run_batch;
