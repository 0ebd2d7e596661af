//! System proxy toggle.

use aether_core::Controller;

use crate::cli::{ProxyArgs, ProxyCommand};
use crate::error::CliError;
use crate::output::{self, Ui};

pub async fn handle(controller: &Controller, args: ProxyArgs, ui: &Ui) -> Result<(), CliError> {
    let enabled = matches!(args.command, ProxyCommand::On);
    controller.set_system_proxy(enabled).await?;
    output::notice(
        if enabled {
            "System proxy enabled"
        } else {
            "System proxy disabled"
        },
        ui.quiet,
    );
    Ok(())
}
