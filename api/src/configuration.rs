use std::env;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Layered configuration, mirroring the teacher's `Settings`: a
/// `config/default.toml` base, an optional `config/local.toml` override, an
/// optional profile file selected by `CONFIG_FILE`/`CONFIG_PATH`, and
/// finally environment variables prefixed `GHN_` (double underscore for
/// nesting, e.g. `GHN_DATABASE__PORT`).
#[derive(Debug, Deserialize)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub redis: RedisSettings,
    pub github: GithubSettings,
    pub sync: SyncSettings,
}

#[derive(Debug, Deserialize)]
pub struct ApplicationSettings {
    pub port: u16,
    pub log_directive: String,
    pub api_path: String,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    pub max_connections: u32,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }

    /// Safe to print in logs: omits the password.
    pub fn safe_connection_string(&self) -> String {
        format!(
            "postgres://{}@{}:{}/{}",
            self.username, self.host, self.port, self.database_name
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
}

impl RedisSettings {
    pub fn connection_string(&self) -> String {
        format!("redis://{}:{}", self.host, self.port)
    }
}

/// Github provider settings (§6). `page_size` bounds each `ListSince` page;
/// `base_url` is overridable so tests can point at a mock server.
#[derive(Debug, Deserialize)]
pub struct GithubSettings {
    pub auth_token: String,
    pub base_url: Option<String>,
    pub page_size: usize,
}

/// Queue/interval knobs for the sync pipeline (§4.10, §5).
#[derive(Debug, Deserialize)]
pub struct SyncSettings {
    /// Fetch-New polling interval, in seconds. Default 30s per §4.10.
    pub fetch_new_interval_secs: u64,
    pub process_notification_workers: usize,
    pub apply_rule_workers: usize,
}

impl Settings {
    pub fn new_from_file(file: Option<String>) -> Result<Self, ConfigError> {
        let config_file_required = file.is_some();
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config".into());
        let config_file = file.unwrap_or_else(|| {
            env::var("CONFIG_FILE").unwrap_or_else(|_| format!("{}/dev", &config_path))
        });

        let default_config_file = format!("{}/default", config_path);
        let local_config_file = format!("{}/local", config_path);

        let config = Config::builder()
            .add_source(File::with_name(&default_config_file))
            .add_source(File::with_name(&local_config_file).required(false))
            .add_source(File::with_name(&config_file).required(config_file_required))
            .add_source(
                Environment::with_prefix("ghn")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn new() -> Result<Self, ConfigError> {
        Settings::new_from_file(None)
    }
}
