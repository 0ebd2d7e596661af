//! Status command handler.

use chrono::{DateTime, Utc};
use serde::Serialize;

use aether_core::{Controller, CoreState};

use crate::error::CliError;
use crate::output::{self, Ui};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusView {
    api_url: String,
    state: CoreState,
    #[serde(skip_serializing_if = "Option::is_none")]
    started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    uptime_secs: Option<u64>,
    active_streams: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoint: Option<String>,
}

fn detail(view: &StatusView, color: bool) -> String {
    let mut lines = vec![
        format!("Core:     {}", view.api_url),
        format!("State:    {}", output::paint_core_state(view.state, color)),
    ];
    if let Some(secs) = view.uptime_secs {
        lines.push(format!(
            "Uptime:   {}",
            output::duration(std::time::Duration::from_secs(secs))
        ));
    }
    lines.push(format!("Streams:  {}", view.active_streams));
    if let Some(endpoint) = &view.endpoint {
        lines.push(format!("Endpoint: {endpoint}"));
    }
    lines.join("\n")
}

pub async fn handle(controller: &Controller, ui: &Ui) -> Result<(), CliError> {
    controller.refresh().await?;
    let snap = controller.snapshot();

    let session = snap.session.as_ref();
    let view = StatusView {
        api_url: controller.config().api_url.to_string(),
        state: snap.core_state,
        started_at: session.map(aether_core::Session::started_at),
        uptime_secs: session.map(|s| s.uptime().as_secs()),
        active_streams: snap.streams.len(),
        endpoint: snap
            .config
            .as_ref()
            .and_then(|c| c.get("url"))
            .and_then(|v| v.as_str())
            .map(str::to_owned),
    };

    let out = output::render_single(
        ui.format,
        &view,
        |v| detail(v, ui.color),
        |v| v.state.to_string(),
    )?;
    output::print_output(&out, ui.quiet);
    Ok(())
}
