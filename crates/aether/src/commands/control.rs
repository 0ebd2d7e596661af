//! Start / stop / rotate.

use aether_core::Controller;

use crate::cli::{ControlArgs, ControlCommand};
use crate::error::CliError;
use crate::output::{self, Ui};

pub async fn handle(controller: &Controller, args: ControlArgs, ui: &Ui) -> Result<(), CliError> {
    let message = match args.command {
        ControlCommand::Start => {
            controller.start().await?;
            "Start requested"
        }
        ControlCommand::Stop => {
            controller.stop().await?;
            "Stop requested"
        }
        ControlCommand::Rotate => {
            controller.rotate().await?;
            "Rotation requested"
        }
    };
    // The resulting state change is pushed over the event channel;
    // follow it with `aether watch`.
    output::notice(message, ui.quiet);
    Ok(())
}
