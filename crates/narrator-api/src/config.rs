//! Server configuration, read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use narrator_core::settings::NarratorSettings;

use crate::error::AppError;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;

/// Everything the server needs to start.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// JSON file the shared state is persisted to; in memory when `None`.
    pub state_path: Option<PathBuf>,
    /// World-scoped narrator settings.
    pub settings: NarratorSettings,
}

impl ServerConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable holds an invalid value.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `HOST` | `0.0.0.0` |
    /// | `PORT` | `3000` |
    /// | `NARRATOR_STATE_PATH` | unset (in memory) |
    /// | `NARRATOR_DURATION_MULTIPLIER` | `1` |
    /// | `NARRATOR_START_PAUSED` | `false` |
    /// | `NARRATOR_PAUSE_LINKS_SCENERY` | `false` |
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable holds an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?,
            None => DEFAULT_PORT,
        };
        let state_path = lookup("NARRATOR_STATE_PATH")
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);

        let mut settings = NarratorSettings::default();
        if let Some(raw) = lookup("NARRATOR_DURATION_MULTIPLIER") {
            let multiplier = raw.parse().map_err(|e| {
                AppError::Config(format!("NARRATOR_DURATION_MULTIPLIER must be a number: {e}"))
            })?;
            settings = settings.with_duration_multiplier(multiplier);
        }
        if let Some(raw) = lookup("NARRATOR_START_PAUSED") {
            settings = settings.with_start_paused(parse_flag("NARRATOR_START_PAUSED", &raw)?);
        }
        if let Some(raw) = lookup("NARRATOR_PAUSE_LINKS_SCENERY") {
            settings = settings
                .with_pause_links_scenery(parse_flag("NARRATOR_PAUSE_LINKS_SCENERY", &raw)?);
        }
        settings
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;

        Ok(Self {
            host,
            port,
            state_path,
            settings,
        })
    }

    /// The address to listen on.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `host` and `port` do not form a socket
    /// address.
    pub fn socket_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }
}

fn parse_flag(name: &str, raw: &str) -> Result<bool, AppError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AppError::Config(format!(
            "{name} must be true or false, got {other:?}"
        ))),
    }
}
