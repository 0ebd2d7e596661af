//! Clap derive structures for the `aether` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// aether -- control panel for the Aether-Realist Core
#[derive(Debug, Parser)]
#[command(
    name = "aether",
    version,
    about = "Control and observe an Aether-Realist Core from the command line",
    long_about = "Talks to a running Core over its control endpoint (HTTP) and\n\
        event endpoint (WebSocket): query status and streams, issue\n\
        start/stop/rotate commands, and watch live state.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Core profile to use
    #[arg(long, short = 'p', env = "AETHER_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Control endpoint URL (overrides profile)
    #[arg(long, env = "AETHER_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Event endpoint URL (overrides profile; derived from --api-url otherwise)
    #[arg(long, env = "AETHER_EVENTS_URL", global = true)]
    pub events_url: Option<String>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "AETHER_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output [default: from config, else auto]
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds
    #[arg(long, env = "AETHER_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the Core's operational state and uptime
    #[command(alias = "st")]
    Status,

    /// List and close proxied streams
    #[command(alias = "s")]
    Streams(StreamsArgs),

    /// Start, stop or rotate the Core
    #[command(alias = "ctl")]
    Control(ControlArgs),

    /// Fetch one traffic sample
    Metrics,

    /// Follow live state over the event channel
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Toggle the OS system proxy through the Core
    Proxy(ProxyArgs),

    /// Show or replace the Core's own configuration
    CoreConfig(CoreConfigArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  STREAMS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct StreamsArgs {
    #[command(subcommand)]
    pub command: StreamsCommand,
}

#[derive(Debug, Subcommand)]
pub enum StreamsCommand {
    /// List live streams
    #[command(alias = "ls")]
    List,

    /// Show one stream
    Get {
        /// Stream ID
        id: String,
    },

    /// Ask the Core to close a stream
    Close {
        /// Stream ID
        id: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONTROL
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ControlArgs {
    #[command(subcommand)]
    pub command: ControlCommand,
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ControlCommand {
    /// Start proxying
    Start,
    /// Stop proxying
    Stop,
    /// Rotate the upstream session
    Rotate,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Also print every traffic sample
    #[arg(long, short = 'm')]
    pub metrics: bool,

    /// Also print Core log lines
    #[arg(long, short = 'l')]
    pub logs: bool,

    /// Stop after this long (e.g. "30s", "5m"); runs until Ctrl-C otherwise
    #[arg(long = "for", value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  PROXY
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ProxyArgs {
    #[command(subcommand)]
    pub command: ProxyCommand,
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ProxyCommand {
    /// Route system traffic through the Core
    On,
    /// Restore direct system networking
    Off,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CORE CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CoreConfigArgs {
    #[command(subcommand)]
    pub command: CoreConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum CoreConfigCommand {
    /// Print the Core's configuration document
    Show,

    /// Replace the Core's configuration with a JSON document
    Apply {
        /// JSON file holding the full document
        #[arg(long, short = 'f')]
        from_file: PathBuf,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create the config file with a single profile
    Init {
        /// Profile name
        #[arg(long, default_value = "default")]
        name: String,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Display the current configuration
    Show,

    /// Print the config file location
    Path,

    /// List configured profiles
    Profiles,

    /// Add or replace a profile
    AddProfile {
        /// Profile name
        name: String,

        /// Event endpoint URL; derived from the control endpoint when omitted
        #[arg(long = "events")]
        events: Option<String>,

        /// Control endpoint URL
        #[arg(long = "api", default_value = aether_config::LOCAL_API_URL)]
        api: String,
    },

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
