//! Config subcommand handlers.

use hassnotify_api::{ConnectOptions, HassClient};
use hassnotify_core::CoreError;

use super::Loaded;
use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;

pub async fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            println!("{}", super::effective_path(global).display());
            Ok(())
        }

        ConfigCommand::Check { connect } => {
            let loaded = super::load(global)?;
            print_summary(&loaded);

            if connect {
                check_connection(loaded.options).await?;
                println!("Connection: ok");
            }
            Ok(())
        }
    }
}

// ── Summary ─────────────────────────────────────────────────────────

fn print_summary(loaded: &Loaded) {
    let config = &loaded.config;
    let config_file = if loaded.path.is_file() {
        loaded.path.display().to_string()
    } else {
        "(none, environment only)".into()
    };

    println!("Config:    {config_file}");
    println!("Server:    {}", loaded.options.url);
    println!("Token:     configured");
    println!(
        "Retry:     every {}s, timeout {}s",
        config.hass.retry_delay_secs, config.hass.timeout_secs
    );

    println!("People:    {}", config.people.len());
    for (id, person) in &config.people {
        match &person.notification_device {
            Some(device) => println!("  {id}  {}  -> {device}", person.name),
            None => println!("  {id}  {}  (no device)", person.name),
        }
    }

    println!("Locations: {}", config.locations.len());
    for (state, location) in &config.locations {
        match (&location.owner, &location.owner_name) {
            (Some(owner), Some(owner_name)) => {
                println!("  {state}  {owner_name} {}  (owner {owner})", location.name);
            }
            (Some(owner), None) => println!("  {state}  {}  (owner {owner})", location.name),
            _ => println!("  {state}  {}", location.name),
        }
    }
}

// ── Connectivity ────────────────────────────────────────────────────

async fn check_connection(options: ConnectOptions) -> Result<(), CliError> {
    let url = options.url.to_string();
    let limit = options.timeout;
    let client = HassClient::connect(options);

    let ready = tokio::time::timeout(limit, client.wait_ready()).await;
    client.close().await;

    let result = match ready {
        Ok(ready) => ready.map_err(CoreError::from),
        Err(_) => Err(CoreError::Timeout {
            timeout_secs: limit.as_secs(),
        }),
    };
    result.map_err(|source| CliError::ConnectionFailed { url, source })
}
