//! Command handlers and the config loading they share.

pub mod config_cmd;
pub mod run;

use std::path::PathBuf;

use hassnotify_api::ConnectOptions;
use hassnotify_config::Config;
use hassnotify_core::NotifierConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Config file in effect: `--config` / `HASSNOTIFY_CONFIG`, else the platform default.
pub fn effective_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(hassnotify_config::config_path)
}

/// Everything a command needs after config has been loaded and validated.
pub struct Loaded {
    pub path: PathBuf,
    pub config: Config,
    pub options: ConnectOptions,
    pub notifier: NotifierConfig,
}

pub fn load(global: &GlobalOpts) -> Result<Loaded, CliError> {
    let path = effective_path(global);
    let wrap = |e| CliError::from_config(e, &path);

    let config = hassnotify_config::load_config(global.config.as_deref()).map_err(wrap)?;
    let token = hassnotify_config::resolve_token(&config.hass).map_err(wrap)?;
    let options = hassnotify_config::connect_options(&config, token).map_err(wrap)?;
    let notifier = hassnotify_config::notifier_config(&config);

    tracing::debug!(path = %path.display(), "configuration loaded");

    Ok(Loaded {
        path,
        config,
        options,
        notifier,
    })
}
