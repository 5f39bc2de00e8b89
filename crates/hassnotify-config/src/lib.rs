//! Configuration for hassnotify.
//!
//! TOML (or YAML) file + `HASSNOTIFY_` environment, token resolution
//! (env var + plaintext), validation, and translation into
//! `hassnotify_api::ConnectOptions` and `hassnotify_core::NotifierConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml, Yaml},
};
use indexmap::IndexMap;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use hassnotify_api::ConnectOptions;
use hassnotify_core::{Household, Location, NotifierConfig, Person, Templates};

/// Environment prefix for overrides (`HASSNOTIFY_HASS__SERVER`, ...).
pub const ENV_PREFIX: &str = "HASSNOTIFY_";

/// Fallback variable consulted for the access token.
pub const TOKEN_ENV: &str = "HASSNOTIFY_TOKEN";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no access token configured for {server}")]
    NoCredentials { server: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── Config structs ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub hass: HassConfig,

    /// Tracked people keyed by entity id (`person.alice`).
    #[serde(default)]
    pub people: IndexMap<String, PersonConfig>,

    /// Known zones keyed by the state string Home Assistant reports.
    #[serde(default)]
    pub locations: IndexMap<String, LocationConfig>,

    #[serde(default)]
    pub notifications: NotificationsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HassConfig {
    /// WebSocket endpoint, e.g. `ws://homeassistant.local:8123/api/websocket`.
    pub server: Option<String>,

    /// Long-lived access token (plaintext; prefer `token_env`).
    pub token: Option<String>,

    /// Name of an environment variable holding the token.
    pub token_env: Option<String>,

    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for HassConfig {
    fn default() -> Self {
        Self {
            server: None,
            token: None,
            token_env: None,
            retry_delay_secs: default_retry_delay(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_retry_delay() -> u64 {
    1
}
fn default_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PersonConfig {
    pub name: String,

    /// Mobile-app device suffix (`notify.mobile_app_<device>`).
    pub notification_device: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LocationConfig {
    pub name: String,

    /// Entity id of the person who owns this location.
    pub owner: Option<String>,

    /// Possessive prefix shown to others, e.g. `"Bob's"`.
    pub owner_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default = "default_group")]
    pub group: String,
    #[serde(default = "default_arrived_title")]
    pub arrived_title: String,
    #[serde(default = "default_arrived_body")]
    pub arrived_body: String,
    #[serde(default = "default_left_title")]
    pub left_title: String,
    #[serde(default = "default_left_body")]
    pub left_body: String,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            group: default_group(),
            arrived_title: default_arrived_title(),
            arrived_body: default_arrived_body(),
            left_title: default_left_title(),
            left_body: default_left_body(),
        }
    }
}

fn default_channel() -> String {
    hassnotify_core::rules::DEFAULT_CHANNEL.into()
}
fn default_group() -> String {
    hassnotify_core::rules::DEFAULT_GROUP.into()
}
fn default_arrived_title() -> String {
    hassnotify_core::template::DEFAULT_ARRIVED_TITLE.into()
}
fn default_arrived_body() -> String {
    hassnotify_core::template::DEFAULT_ARRIVED_BODY.into()
}
fn default_left_title() -> String {
    hassnotify_core::template::DEFAULT_LEFT_TITLE.into()
}
fn default_left_body() -> String {
    hassnotify_core::template::DEFAULT_LEFT_BODY.into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the default config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "hassnotify", "hassnotify").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("hassnotify");
    p
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
}

// ── Config loading ──────────────────────────────────────────────────

/// Defaults → file → `HASSNOTIFY_` environment.
pub fn figment_for(path: &Path) -> Figment {
    let figment = Figment::new().merge(Serialized::defaults(Config::default()));
    let figment = if is_yaml(path) {
        figment.merge(Yaml::file(path))
    } else {
        figment.merge(Toml::file(path))
    };
    figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load and validate the configuration.
///
/// An explicit `path` must exist. The default location may be absent,
/// in which case everything comes from the environment.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config = match path {
        Some(path) if !path.is_file() => {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        Some(path) => figment_for(path).extract::<Config>()?,
        None => figment_for(&config_path()).extract::<Config>()?,
    };
    config.validate()?;
    Ok(config)
}

// ── Validation ──────────────────────────────────────────────────────

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server_url()?;

        if self.hass.retry_delay_secs == 0 {
            return Err(invalid("hass.retry_delay_secs", "must be at least 1"));
        }
        if self.hass.timeout_secs == 0 {
            return Err(invalid("hass.timeout_secs", "must be at least 1"));
        }

        for (id, person) in &self.people {
            if person.name.trim().is_empty() {
                return Err(invalid(format!("people.{id}.name"), "must not be empty"));
            }
            if person
                .notification_device
                .as_deref()
                .is_some_and(|d| d.trim().is_empty())
            {
                return Err(invalid(
                    format!("people.{id}.notification_device"),
                    "must not be empty",
                ));
            }
        }

        for (state, location) in &self.locations {
            if location.name.trim().is_empty() {
                return Err(invalid(format!("locations.{state}.name"), "must not be empty"));
            }
            if let Some(owner) = &location.owner {
                if !self.people.contains_key(owner) {
                    return Err(invalid(
                        format!("locations.{state}.owner"),
                        format!("'{owner}' is not a configured person"),
                    ));
                }
            }
        }

        Ok(())
    }

    /// The parsed `hass.server` URL; must be `ws://` or `wss://`.
    pub fn server_url(&self) -> Result<Url, ConfigError> {
        let raw = self
            .hass
            .server
            .as_deref()
            .ok_or_else(|| invalid("hass.server", "is required"))?;
        let url: Url = raw
            .parse()
            .map_err(|e| invalid("hass.server", format!("invalid URL '{raw}': {e}")))?;
        match url.scheme() {
            "ws" | "wss" => Ok(url),
            other => Err(invalid(
                "hass.server",
                format!("expected a ws:// or wss:// URL, got '{other}://'"),
            )),
        }
    }
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the access token from the process environment.
pub fn resolve_token(hass: &HassConfig) -> Result<SecretString, ConfigError> {
    resolve_token_with(hass, |name| std::env::var(name).ok())
}

/// Resolve the access token: `token_env` → `HASSNOTIFY_TOKEN` → plaintext.
pub fn resolve_token_with(
    hass: &HassConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    // 1. Configured env var name
    if let Some(ref env_name) = hass.token_env {
        if let Some(val) = lookup(env_name).filter(|v| !v.is_empty()) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. Well-known env var
    if let Some(val) = lookup(TOKEN_ENV).filter(|v| !v.is_empty()) {
        return Ok(SecretString::from(val));
    }

    // 3. Plaintext in config
    if let Some(ref token) = hass.token {
        if !token.is_empty() {
            return Ok(SecretString::from(token.clone()));
        }
    }

    Err(ConfigError::NoCredentials {
        server: hass.server.clone().unwrap_or_default(),
    })
}

// ── Translation to runtime types ────────────────────────────────────

/// Build `ConnectOptions` for the configured hub.
pub fn connect_options(config: &Config, token: SecretString) -> Result<ConnectOptions, ConfigError> {
    let url = config.server_url()?;
    Ok(ConnectOptions::new(url, token)
        .with_retry_delay(Duration::from_secs(config.hass.retry_delay_secs))
        .with_timeout(Duration::from_secs(config.hass.timeout_secs)))
}

/// Build the notifier's household and message settings.
pub fn notifier_config(config: &Config) -> NotifierConfig {
    let people = config
        .people
        .iter()
        .map(|(id, p)| {
            let person = Person {
                name: p.name.clone(),
                notification_device: p.notification_device.clone(),
            };
            (id.clone(), person)
        })
        .collect();

    let locations = config
        .locations
        .iter()
        .map(|(state, l)| {
            let location = Location {
                name: l.name.clone(),
                owner: l.owner.clone(),
                owner_name: l.owner_name.clone(),
            };
            (state.clone(), location)
        })
        .collect();

    let n = &config.notifications;
    NotifierConfig {
        household: Household { people, locations },
        templates: Templates {
            arrived_title: n.arrived_title.clone(),
            arrived_body: n.arrived_body.clone(),
            left_title: n.left_title.clone(),
            left_body: n.left_body.clone(),
        },
        channel: n.channel.clone(),
        group: n.group.clone(),
    }
}
