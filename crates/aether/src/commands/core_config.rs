//! The Core's own configuration document, passed through verbatim.

use aether_core::{ConfigDocument, Controller};

use crate::cli::{CoreConfigArgs, CoreConfigCommand};
use crate::error::CliError;
use crate::output::{self, Ui};

use super::util;

pub async fn handle(
    controller: &Controller,
    args: CoreConfigArgs,
    ui: &Ui,
) -> Result<(), CliError> {
    match args.command {
        CoreConfigCommand::Show => {
            let config = controller.fetch_config().await?;
            let out = output::render_document(ui.format, &config)?;
            output::print_output(&out, ui.quiet);
            Ok(())
        }

        CoreConfigCommand::Apply { from_file } => {
            let document = ConfigDocument::new(util::read_json_file(&from_file)?);
            controller.update_config(document).await?;
            output::notice("Core configuration updated", ui.quiet);
            Ok(())
        }
    }
}
