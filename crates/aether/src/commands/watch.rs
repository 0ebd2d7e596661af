//! Live view over the event channel.
//!
//! Connects the controller, then prints one line per change until Ctrl-C
//! or the `--for` limit. Structured formats emit one JSON object (or YAML
//! document) per change.

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;

use aether_core::{
    ConnectionState, Controller, CoreState, LogEntry, MetricsSample, StreamRecord, TrafficTotals,
};

use crate::cli::{OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output::{self, Ui};

// ── Lines ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum WatchLine<'a> {
    Connection {
        state: ConnectionState,
    },
    State {
        state: CoreState,
    },
    StreamOpened {
        stream: &'a StreamRecord,
    },
    StreamClosed {
        id: &'a str,
    },
    Metrics {
        sample: &'a MetricsSample,
        totals: TrafficTotals,
    },
    Log {
        entry: &'a LogEntry,
    },
}

impl WatchLine<'_> {
    fn human(&self, color: bool) -> String {
        match self {
            Self::Connection { state } => format!("channel {state}"),
            Self::State { state } => format!("core {}", output::paint_core_state(*state, color)),
            Self::StreamOpened { stream } => format!(
                "+ {} {} ({})",
                stream.id,
                stream.target(),
                output::paint_stream_state(stream.state, color)
            ),
            Self::StreamClosed { id } => format!("- {id}"),
            Self::Metrics { sample, totals } => format!(
                "up {} down {} | total up {} down {}",
                output::bytes(sample.upload),
                output::bytes(sample.download),
                output::bytes(totals.total_upload),
                output::bytes(totals.total_download),
            ),
            Self::Log { entry } => format!("[{}] {}", entry.level, entry.message),
        }
    }
}

struct Printer {
    ui: Ui,
}

impl Printer {
    fn emit(&self, line: &WatchLine<'_>) -> Result<(), CliError> {
        let text = match self.ui.format {
            OutputFormat::Table | OutputFormat::Plain => format!(
                "{} {}",
                Utc::now().format("%H:%M:%S"),
                line.human(self.ui.color)
            ),
            OutputFormat::Yaml => {
                let doc = output::render_document(OutputFormat::Yaml, line)?;
                format!("---\n{}", doc.trim_end())
            }
            OutputFormat::Json | OutputFormat::JsonCompact => {
                output::render_document(OutputFormat::JsonCompact, line)?
            }
        };
        output::print_output(&text, self.ui.quiet);
        Ok(())
    }
}

// ── Diffing helpers ─────────────────────────────────────────────────

/// Entries appended after `last`. Everything when `last` was evicted.
fn fresh_logs<'a>(entries: &'a [LogEntry], last: Option<&LogEntry>) -> &'a [LogEntry] {
    last.and_then(|l| entries.iter().rposition(|e| e == l))
        .and_then(|i| entries.get(i + 1..))
        .unwrap_or(entries)
}

/// Streams absent from `known`, and ids of `known` absent from `current`.
fn diff_streams<'a>(
    known: &'a HashSet<String>,
    current: &'a [StreamRecord],
) -> (Vec<&'a StreamRecord>, Vec<&'a str>) {
    let opened = current.iter().filter(|s| !known.contains(&s.id)).collect();
    let live: HashSet<&str> = current.iter().map(|s| s.id.as_str()).collect();
    let mut closed: Vec<&str> = known
        .iter()
        .map(String::as_str)
        .filter(|id| !live.contains(id))
        .collect();
    closed.sort_unstable();
    (opened, closed)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(controller: &Controller, args: WatchArgs, ui: &Ui) -> Result<(), CliError> {
    controller.connect().await;
    let result = follow(controller, &args, ui).await;
    controller.disconnect().await;
    result
}

async fn follow(controller: &Controller, args: &WatchArgs, ui: &Ui) -> Result<(), CliError> {
    let printer = Printer { ui: *ui };
    let mut connection = controller.connection_state();
    let mut core_state = controller.core_state();
    let mut streams = controller.streams();
    let mut metrics = controller.metrics();
    let mut logs = controller.logs();

    let mut known: HashSet<String> = streams.current().iter().map(|s| s.id.clone()).collect();
    let mut last_log: Option<LogEntry> = logs.current().last().cloned();

    let stop = shutdown(args.duration);
    tokio::pin!(stop);

    loop {
        tokio::select! {
            () = &mut stop => break,

            Some(state) = connection.changed() => {
                printer.emit(&WatchLine::Connection { state })?;
            }

            Some(state) = core_state.changed() => {
                printer.emit(&WatchLine::State { state })?;
            }

            Some(current) = streams.changed() => {
                let (opened, closed) = diff_streams(&known, &current);
                for stream in opened {
                    printer.emit(&WatchLine::StreamOpened { stream })?;
                }
                for id in closed {
                    printer.emit(&WatchLine::StreamClosed { id })?;
                }
                known = current.iter().map(|s| s.id.clone()).collect();
            }

            Some(history) = metrics.changed(), if args.metrics => {
                if let Some(sample) = history.last() {
                    let totals = controller.store().totals();
                    printer.emit(&WatchLine::Metrics { sample, totals })?;
                }
            }

            Some(entries) = logs.changed(), if args.logs => {
                for entry in fresh_logs(&entries, last_log.as_ref()) {
                    printer.emit(&WatchLine::Log { entry })?;
                }
                last_log = entries.last().cloned();
            }

            else => break,
        }
    }
    Ok(())
}

async fn shutdown(limit: Option<Duration>) {
    match limit {
        Some(limit) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                () = tokio::time::sleep(limit) => {}
            }
        }
        None => {
            let _ = tokio::signal::ctrl_c().await;
        }
    }
    tracing::debug!("watch stopping");
}
