//! CLI error types with miette diagnostics.
//!
//! Maps config and connection errors into user-facing errors with help text
//! and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use hassnotify_config::ConfigError;
use hassnotify_core::CoreError;

/// Process exit codes. Usage errors exit with 2 from clap itself.
pub mod exit_code {
    pub const CONFIG: i32 = 3;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration file not found: {path}")]
    #[diagnostic(
        code(hassnotify::no_config),
        help(
            "Create a config file there, or point to one with --config / HASSNOTIFY_CONFIG.\n\
             Run: hassnotify config path"
        )
    )]
    NoConfig { path: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(
        code(hassnotify::invalid_config),
        help("Fix the value and re-run: hassnotify config check")
    )]
    InvalidConfig { field: String, reason: String },

    #[error("Failed to load configuration from {path}")]
    #[diagnostic(code(hassnotify::config), help("{message}"))]
    ConfigLoad { path: String, message: String },

    #[error("No Home Assistant access token configured")]
    #[diagnostic(
        code(hassnotify::no_credentials),
        help(
            "Set hass.token_env to the name of a variable holding the token,\n\
             export HASSNOTIFY_TOKEN, or set hass.token in the config file."
        )
    )]
    NoCredentials,

    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach Home Assistant at {url}")]
    #[diagnostic(
        code(hassnotify::connection_failed),
        help(
            "Check that Home Assistant is running, the URL ends in /api/websocket,\n\
             and the access token is valid. Re-run with -v to see connection attempts."
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: CoreError,
    },
}

impl CliError {
    /// Build from a config error, naming the file it came from.
    pub fn from_config(err: ConfigError, path: &std::path::Path) -> Self {
        match err {
            ConfigError::NotFound { path } => Self::NoConfig {
                path: path.display().to_string(),
            },
            ConfigError::Validation { field, reason } => Self::InvalidConfig { field, reason },
            ConfigError::NoCredentials { .. } => Self::NoCredentials,
            ConfigError::Figment(e) => Self::ConfigLoad {
                path: path.display().to_string(),
                message: e.to_string(),
            },
        }
    }

    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoConfig { .. }
            | Self::InvalidConfig { .. }
            | Self::ConfigLoad { .. }
            | Self::NoCredentials => exit_code::CONFIG,
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
        }
    }
}
