//! Flag-aware profile resolution on top of `aether_config`.
//!
//! This is the single place where CLI flags cross into
//! `aether_core::ControllerConfig`.

use aether_config::{Config, Profile};
use aether_core::ControllerConfig;

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output::{self, Ui};

/// Resolve the active profile name from flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Profile + flag overrides → `ControllerConfig`.
///
/// Precedence per field: flag (or its env var) > profile > defaults.
pub fn resolve_controller_config(
    global: &GlobalOpts,
    config: &Config,
) -> Result<ControllerConfig, CliError> {
    let name = active_profile_name(global, config);
    let (_, mut profile) = config.profile(Some(name.as_str()))?;
    apply_overrides(&mut profile, global);

    tracing::debug!(profile = %name, api_url = %profile.api_url, "resolved profile");
    Ok(aether_config::profile_to_controller_config(
        &profile,
        &config.defaults,
    )?)
}

fn apply_overrides(profile: &mut Profile, global: &GlobalOpts) {
    if let Some(api_url) = &global.api_url {
        profile.api_url.clone_from(api_url);
        // a flag-supplied control endpoint re-derives the event endpoint
        // unless that is overridden too
        profile.events_url = None;
    }
    if let Some(events_url) = &global.events_url {
        profile.events_url = Some(events_url.clone());
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
}

/// Output settings: flags win, then `[defaults]` from the config file.
pub fn resolve_ui(global: &GlobalOpts, config: &Config) -> Ui {
    let format = global.output.unwrap_or_else(|| {
        parse_or(&config.defaults.output, OutputFormat::Table)
    });
    let color = global
        .color
        .unwrap_or_else(|| parse_or(&config.defaults.color, ColorMode::Auto));

    Ui {
        format,
        color: output::should_color(color),
        quiet: global.quiet,
    }
}

fn parse_or<T: clap::ValueEnum>(raw: &str, fallback: T) -> T {
    T::from_str(raw, true).unwrap_or_else(|_| {
        tracing::warn!(value = raw, "ignoring unknown value in config defaults");
        fallback
    })
}
