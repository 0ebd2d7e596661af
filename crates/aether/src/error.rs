//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a stable exit code.

use miette::Diagnostic;
use thiserror::Error;

use aether_config::ConfigError;
use aether_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the Core: {reason}")]
    #[diagnostic(
        code(aether::connection_failed),
        help(
            "Check that the Core is running and its control endpoint is reachable.\n\
             Inspect the endpoint with: aether config show"
        )
    )]
    ConnectionFailed { reason: String },

    // ── Control endpoint ─────────────────────────────────────────────

    #[error("Core rejected the request ({status}): {message}")]
    #[diagnostic(code(aether::request_failed))]
    RequestFailed { status: u16, message: String },

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(aether::not_found),
        help("Run: aether {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Core refused the request: {message}")]
    #[diagnostic(
        code(aether::conflict),
        help("The Core is probably in a state where this action is not allowed.\nRun: aether status")
    )]
    Conflict { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(aether::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(aether::profile_not_found),
        help(
            "List profiles with: aether config profiles\n\
             Create one with: aether config add-profile {name} --api <URL>"
        )
    )]
    ProfileNotFound { name: String },

    #[error("Configuration file already exists at {path}")]
    #[diagnostic(
        code(aether::config_exists),
        help("Use --force to overwrite it.")
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(code(aether::config))]
    Config(Box<ConfigError>),

    // ── Core-side failures without a better mapping ──────────────────

    #[error(transparent)]
    #[diagnostic(code(aether::core))]
    Core(Box<CoreError>),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(aether::json), help("Check the JSON file contents and try again."))]
    Json(#[from] serde_json::Error),

    #[error("YAML rendering failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML rendering failed: {0}")]
    Toml(#[from] toml::ser::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } | Self::ConfigExists { .. } => exit_code::CONFLICT,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Wrap a failed lookup of `identifier` so a 404 reads as "not found".
    pub fn or_not_found(
        err: CoreError,
        resource_type: &str,
        identifier: &str,
        list_command: &str,
    ) -> Self {
        if err.status() == Some(404) {
            return Self::NotFound {
                resource_type: resource_type.into(),
                identifier: identifier.into(),
                list_command: list_command.into(),
            };
        }
        err.into()
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::RequestFailed {
                status: None,
                message,
            }
            | CoreError::ConnectionFailed {
                reason: message, ..
            } => Self::ConnectionFailed { reason: message },
            CoreError::RequestFailed {
                status: Some(409),
                message,
            } => Self::Conflict { message },
            CoreError::RequestFailed {
                status: Some(status),
                message,
            } => Self::RequestFailed { status, message },
            CoreError::Config { message } => Self::Validation {
                field: "profile".into(),
                reason: message,
            },
            other => Self::Core(Box::new(other)),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::UnknownProfile { name } => Self::ProfileNotFound { name },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_core_is_a_connection_error() {
        let err: CliError = CoreError::RequestFailed {
            status: None,
            message: "connection refused".into(),
        }
        .into();
        assert_eq!(err.exit_code(), exit_code::CONNECTION);
    }

    #[test]
    fn conflict_and_plain_failures_keep_their_status() {
        let conflict: CliError = CoreError::RequestFailed {
            status: Some(409),
            message: "already active".into(),
        }
        .into();
        assert_eq!(conflict.exit_code(), exit_code::CONFLICT);

        let failed: CliError = CoreError::RequestFailed {
            status: Some(500),
            message: "boom".into(),
        }
        .into();
        assert!(matches!(failed, CliError::RequestFailed { status: 500, .. }));
        assert_eq!(failed.exit_code(), exit_code::GENERAL);
    }

    #[test]
    fn missing_stream_maps_to_not_found() {
        let err = CliError::or_not_found(
            CoreError::RequestFailed {
                status: Some(404),
                message: "no such stream".into(),
            },
            "stream",
            "s9",
            "streams list",
        );
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
        assert_eq!(err.to_string(), "stream 's9' not found");
    }

    #[test]
    fn unknown_profile_is_not_found() {
        let err: CliError = ConfigError::UnknownProfile { name: "lab".into() }.into();
        assert!(matches!(err, CliError::ProfileNotFound { .. }));
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
    }
}
