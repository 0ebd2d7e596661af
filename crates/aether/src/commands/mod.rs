//! Command dispatch: bridges CLI args -> controller calls -> output formatting.

pub mod config_cmd;
pub mod control;
pub mod core_config;
pub mod metrics;
pub mod proxy;
pub mod status;
pub mod streams;
pub mod util;
pub mod watch;

use aether_core::Controller;

use crate::cli::Command;
use crate::error::CliError;
use crate::output::Ui;

/// Dispatch a Core-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, controller: &Controller, ui: &Ui) -> Result<(), CliError> {
    match cmd {
        Command::Status => status::handle(controller, ui).await,
        Command::Streams(args) => streams::handle(controller, args, ui).await,
        Command::Control(args) => control::handle(controller, args, ui).await,
        Command::Metrics => metrics::handle(controller, ui).await,
        Command::Watch(args) => watch::handle(controller, args, ui).await,
        Command::Proxy(args) => proxy::handle(controller, args, ui).await,
        Command::CoreConfig(args) => core_config::handle(controller, args, ui).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
