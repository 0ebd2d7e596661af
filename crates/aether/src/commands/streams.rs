//! Stream command handlers.

use chrono::Utc;
use tabled::Tabled;

use aether_core::{Controller, StreamRecord};

use crate::cli::{StreamsArgs, StreamsCommand};
use crate::error::CliError;
use crate::output::{self, Ui};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct StreamRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Sent")]
    sent: String,
    #[tabled(rename = "Received")]
    received: String,
    #[tabled(rename = "Age")]
    age: String,
}

fn row(s: &StreamRecord, color: bool) -> StreamRow {
    StreamRow {
        id: s.id.clone(),
        target: s.target(),
        state: output::paint_stream_state(s.state, color),
        sent: output::bytes(s.bytes_sent),
        received: output::bytes(s.bytes_received),
        age: age(s),
    }
}

fn age(s: &StreamRecord) -> String {
    (Utc::now() - s.opened_at)
        .to_std()
        .map_or_else(|_| "-".into(), output::duration)
}

fn detail(s: &StreamRecord, color: bool) -> String {
    [
        format!("ID:       {}", s.id),
        format!("Target:   {}", s.target()),
        format!("State:    {}", output::paint_stream_state(s.state, color)),
        format!("Sent:     {}", output::bytes(s.bytes_sent)),
        format!("Received: {}", output::bytes(s.bytes_received)),
        format!("Opened:   {} ({} ago)", s.opened_at.to_rfc3339(), age(s)),
    ]
    .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(controller: &Controller, args: StreamsArgs, ui: &Ui) -> Result<(), CliError> {
    match args.command {
        StreamsCommand::List => {
            controller.refresh().await?;
            let streams = controller.store().streams_snapshot();
            let out = output::render_list(
                ui.format,
                streams.as_slice(),
                |s| row(s, ui.color),
                |s| s.id.clone(),
            )?;
            output::print_output(&out, ui.quiet);
            Ok(())
        }

        StreamsCommand::Get { id } => {
            controller.refresh().await?;
            let stream = controller
                .store()
                .stream_by_id(&id)
                .ok_or_else(|| CliError::NotFound {
                    resource_type: "stream".into(),
                    identifier: id.clone(),
                    list_command: "streams list".into(),
                })?;
            let out = output::render_single(
                ui.format,
                &stream,
                |s| detail(s, ui.color),
                |s| s.id.clone(),
            )?;
            output::print_output(&out, ui.quiet);
            Ok(())
        }

        StreamsCommand::Close { id } => {
            controller
                .close_stream(&id)
                .await
                .map_err(|e| CliError::or_not_found(e, "stream", &id, "streams list"))?;
            output::notice(&format!("Stream {id} closed"), ui.quiet);
            Ok(())
        }
    }
}
