//! One-off traffic sample.

use aether_core::{Controller, MetricsSample};

use crate::error::CliError;
use crate::output::{self, Ui};

fn detail(m: &MetricsSample) -> String {
    let mut lines = vec![
        format!("Sampled:  {}", m.timestamp.to_rfc3339()),
        format!("Upload:   {}", output::bytes(m.upload)),
        format!("Download: {}", output::bytes(m.download)),
    ];
    if let Some(latency) = m.latency_ms {
        lines.push(format!("Latency:  {latency} ms"));
    }
    lines.join("\n")
}

pub async fn handle(controller: &Controller, ui: &Ui) -> Result<(), CliError> {
    let sample = controller.fetch_metrics().await?;
    let out = output::render_single(ui.format, &sample, detail, |m| {
        format!("{} {}", m.upload, m.download)
    })?;
    output::print_output(&out, ui.quiet);
    Ok(())
}
