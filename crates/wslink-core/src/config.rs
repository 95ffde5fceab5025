use crate::error::CoreError;
use config::{Config as ConfigLoader, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

const DEFAULT_CONFIG_NAME: &str = "wslink";

/// Default idle period before a probe ping is sent.
pub const DEFAULT_ACTIVITY_TIMEOUT_MS: u64 = 120_000;
/// Default grace period for the pong answering a probe ping.
pub const DEFAULT_PONG_TIMEOUT_MS: u64 = 30_000;
/// Default wait for the peer to finish the close handshake.
pub const DEFAULT_CLOSE_TIMEOUT_MS: u64 = 30_000;

// Main configuration structure
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)] // Ensure fields default if missing in config source
pub struct Config {
    pub global: GlobalConfig,
    pub connection: ConnectionConfig,
}

// Global settings
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct GlobalConfig {
    pub log_level: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Settings for a single persistent connection.
///
/// Durations are kept in milliseconds here; the transport crate turns them
/// into `Duration`s when it builds its connect parameters.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Endpoint URL (`ws://` or `wss://`).
    pub url: Option<String>,
    /// HTTP proxy used to tunnel the connection, e.g. `http://proxy:3128`.
    pub agent: Option<String>,
    /// Delay between the transport opening and the connection reporting ready.
    pub wait_after_connect_ms: Option<u64>,
    pub verbose: bool,
    pub activity_timeout_ms: u64,
    pub pong_timeout_ms: u64,
    /// How long a closing transport waits for the peer before dropping the socket.
    pub close_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: None,
            agent: None,
            wait_after_connect_ms: None,
            verbose: false,
            activity_timeout_ms: DEFAULT_ACTIVITY_TIMEOUT_MS,
            pong_timeout_ms: DEFAULT_PONG_TIMEOUT_MS,
            close_timeout_ms: DEFAULT_CLOSE_TIMEOUT_MS,
        }
    }
}

impl ConnectionConfig {
    /// Returns the configured endpoint or an error naming the missing key.
    pub fn endpoint(&self) -> Result<&str, CoreError> {
        self.url
            .as_deref()
            .ok_or(CoreError::MissingValue("connection.url"))
    }
}

/// Loads configuration from defaults, a config file and the environment.
///
/// With `source_path` set, that file is required. Otherwise `wslink.toml`
/// (or `.json`, `.yaml`, ...) in the current directory is read if present.
/// Environment variables prefixed with `WSLINK_` override both, using `__`
/// for nested fields (e.g. `WSLINK_CONNECTION__VERBOSE=true`).
pub fn load_config(source_path: Option<PathBuf>) -> Result<Config, CoreError> {
    let mut builder = ConfigLoader::builder()
        .set_default("global.log_level", GlobalConfig::default().log_level)?
        .set_default(
            "connection.activity_timeout_ms",
            DEFAULT_ACTIVITY_TIMEOUT_MS,
        )?
        .set_default("connection.pong_timeout_ms", DEFAULT_PONG_TIMEOUT_MS)?
        .set_default("connection.close_timeout_ms", DEFAULT_CLOSE_TIMEOUT_MS)?;

    builder = match source_path {
        Some(path) => {
            log::debug!("Loading configuration from: {:?}", path);
            builder.add_source(File::from(path).required(true))
        }
        None => {
            log::debug!(
                "Attempting to load configuration from default location ({}.toml)",
                DEFAULT_CONFIG_NAME
            );
            builder.add_source(File::with_name(DEFAULT_CONFIG_NAME).required(false))
        }
    };

    let cfg = builder
        .add_source(
            Environment::with_prefix("WSLINK")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize::<Config>()?;

    log::debug!("Successfully loaded configuration: {:?}", cfg);
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_heartbeat_constants() {
        let cfg = Config::default();
        assert_eq!(cfg.global.log_level, "info");
        assert_eq!(cfg.connection.activity_timeout_ms, 120_000);
        assert_eq!(cfg.connection.pong_timeout_ms, 30_000);
        assert_eq!(cfg.connection.close_timeout_ms, 30_000);
        assert!(!cfg.connection.verbose);
        assert!(cfg.connection.endpoint().is_err());
    }

    #[test]
    fn loads_connection_section_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            r#"
[global]
log_level = "debug"

[connection]
url = "ws://127.0.0.1:9000/feed"
agent = "http://proxy.local:3128"
wait_after_connect_ms = 250
verbose = true
pong_timeout_ms = 5000
close_timeout_ms = 2000
"#
        )
        .unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.global.log_level, "debug");
        assert_eq!(cfg.connection.endpoint().unwrap(), "ws://127.0.0.1:9000/feed");
        assert_eq!(cfg.connection.agent.as_deref(), Some("http://proxy.local:3128"));
        assert_eq!(cfg.connection.wait_after_connect_ms, Some(250));
        assert!(cfg.connection.verbose);
        assert_eq!(cfg.connection.activity_timeout_ms, 120_000);
        assert_eq!(cfg.connection.pong_timeout_ms, 5000);
        assert_eq!(cfg.connection.close_timeout_ms, 2000);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config(Some(dir.path().join("absent.toml")));
        assert!(matches!(result, Err(CoreError::Config(_))));
    }
}
