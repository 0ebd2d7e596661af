//! Config subcommand handlers. These never contact the Core.

use tabled::Tabled;

use aether_config::{Config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::active_profile_name;
use crate::error::CliError;
use crate::output::{self, Ui};

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "")]
    marker: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Control endpoint")]
    api_url: String,
    #[tabled(rename = "Event endpoint")]
    events_url: String,
}

#[derive(serde::Serialize)]
struct ProfileEntry<'a> {
    name: &'a str,
    default: bool,
    #[serde(flatten)]
    profile: &'a Profile,
}

/// Confirm `raw` parses before it is written to disk.
fn check_url(field: &str, raw: &str) -> Result<(), CliError> {
    raw.parse::<url::Url>()
        .map(drop)
        .map_err(|e| CliError::Validation {
            field: field.into(),
            reason: format!("invalid URL '{raw}': {e}"),
        })
}

pub fn handle(
    args: ConfigArgs,
    global: &GlobalOpts,
    cfg: Config,
    ui: &Ui,
) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init { name, force } => {
            let path = aether_config::config_path();
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }

            let mut profile = Profile::default();
            if let Some(api_url) = &global.api_url {
                check_url("api_url", api_url)?;
                profile.api_url.clone_from(api_url);
            }
            if let Some(events_url) = &global.events_url {
                check_url("events_url", events_url)?;
                profile.events_url = Some(events_url.clone());
            }

            let mut fresh = Config {
                default_profile: Some(name.clone()),
                ..Config::default()
            };
            fresh.profiles.insert(name.clone(), profile);
            let written = aether_config::save_config(&fresh)?;
            output::notice(
                &format!("Wrote profile '{name}' to {}", written.display()),
                ui.quiet,
            );
            Ok(())
        }

        ConfigCommand::Show => {
            let out = match ui.format {
                OutputFormat::Table | OutputFormat::Plain => toml::to_string_pretty(&cfg)?,
                structured => output::render_document(structured, &cfg)?,
            };
            output::print_output(out.trim_end(), ui.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&aether_config::config_path().display().to_string(), ui.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let active = active_profile_name(global, &cfg);
            let mut names: Vec<&String> = cfg.profiles.keys().collect();
            names.sort();
            let entries: Vec<ProfileEntry<'_>> = names
                .into_iter()
                .filter_map(|name| {
                    cfg.profiles.get(name).map(|profile| ProfileEntry {
                        name,
                        default: *name == active,
                        profile,
                    })
                })
                .collect();

            let out = output::render_list(
                ui.format,
                &entries,
                |e| ProfileRow {
                    marker: if e.default { "*".into() } else { String::new() },
                    name: e.name.to_owned(),
                    api_url: e.profile.api_url.clone(),
                    events_url: e
                        .profile
                        .events_url
                        .clone()
                        .unwrap_or_else(|| "(derived)".into()),
                },
                |e| e.name.to_owned(),
            )?;
            output::print_output(&out, ui.quiet);
            Ok(())
        }

        ConfigCommand::AddProfile { name, api, events } => {
            check_url("api", &api)?;
            if let Some(events) = &events {
                check_url("events", events)?;
            }

            let mut cfg = cfg;
            let profile = cfg.profiles.entry(name.clone()).or_default();
            profile.api_url = api;
            profile.events_url = events;
            aether_config::save_config(&cfg)?;
            output::notice(&format!("Saved profile '{name}'"), ui.quiet);
            Ok(())
        }

        ConfigCommand::Use { name } => {
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound { name });
            }
            let mut cfg = cfg;
            cfg.default_profile = Some(name.clone());
            aether_config::save_config(&cfg)?;
            output::notice(&format!("Default profile set to '{name}'"), ui.quiet);
            Ok(())
        }
    }
}
