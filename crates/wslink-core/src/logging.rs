//! Optional helper for setting up logging using `env_logger`.
//!
//! The base level comes from `global.log_level`. With `connection.verbose`
//! set, the transport crate logs at `info` at least, so ping and payload
//! diagnostics stay visible under a quieter global level. `RUST_LOG`, when
//! present, is applied on top.

use crate::config::Config;
use crate::error::CoreError;

/// Module path of the crate emitting the verbose connection diagnostics.
#[cfg(feature = "env_logger")]
const TRANSPORT_TARGET: &str = "wslink_transport";

#[cfg(feature = "env_logger")]
fn logger_builder(cfg: &Config) -> env_logger::Builder {
    use log::LevelFilter;
    use std::str::FromStr;

    let level = LevelFilter::from_str(&cfg.global.log_level).unwrap_or(LevelFilter::Info);
    // Dependencies never go above info, even when we run at debug/trace.
    let deps = level.min(LevelFilter::Info);

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level)
        .filter_module("tungstenite", deps)
        .filter_module("tokio_tungstenite", deps)
        .filter_module("rustls", deps);
    if cfg.connection.verbose {
        builder.filter_module(TRANSPORT_TARGET, level.max(LevelFilter::Info));
    }
    builder
}

#[cfg(feature = "env_logger")]
pub fn setup_logging(cfg: &Config) -> Result<(), CoreError> {
    let mut builder = logger_builder(cfg);
    builder.parse_env(env_logger::Env::default());
    builder
        .try_init()
        .map_err(|e| CoreError::LoggingSetup(e.to_string()))
}

#[cfg(not(feature = "env_logger"))]
pub fn setup_logging(_cfg: &Config) -> Result<(), CoreError> {
    log::debug!("env_logger feature not enabled, logging setup skipped via wslink-core helper.");
    Ok(())
}

#[cfg(all(test, feature = "env_logger"))]
mod tests {
    use super::*;
    use log::{Level, Record};

    fn passes(cfg: &Config, level: Level, target: &str) -> bool {
        let logger = logger_builder(cfg).build();
        let record = Record::builder().level(level).target(target).build();
        logger.matches(&record)
    }

    fn config(log_level: &str, verbose: bool) -> Config {
        let mut cfg = Config::default();
        cfg.global.log_level = log_level.to_string();
        cfg.connection.verbose = verbose;
        cfg
    }

    #[test]
    fn verbose_lifts_transport_diagnostics_above_a_quiet_level() {
        let cfg = config("warn", true);
        assert!(passes(&cfg, Level::Info, "wslink_transport::connection"));
        assert!(!passes(&cfg, Level::Debug, "wslink_transport::connection"));
        assert!(!passes(&cfg, Level::Info, "wslink_client::launch"));
    }

    #[test]
    fn quiet_level_hides_transport_info_without_verbose() {
        let cfg = config("warn", false);
        assert!(!passes(&cfg, Level::Info, "wslink_transport::connection"));
        assert!(passes(&cfg, Level::Warn, "wslink_transport::connection"));
    }

    #[test]
    fn dependencies_are_capped_at_info() {
        let cfg = config("trace", false);
        assert!(passes(&cfg, Level::Trace, "wslink_transport::websocket"));
        assert!(!passes(&cfg, Level::Debug, "tungstenite::protocol"));
        assert!(passes(&cfg, Level::Info, "tungstenite::protocol"));
    }

    #[test]
    fn unparsable_level_falls_back_to_info() {
        let cfg = config("chatty", false);
        assert!(passes(&cfg, Level::Info, "wslink_client"));
        assert!(!passes(&cfg, Level::Debug, "wslink_client"));
    }
}
