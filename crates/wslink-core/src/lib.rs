//! # wslink core
//!
//! Ambient pieces shared by the other crates: the configuration model and
//! loader, logging setup, and the top-level `CoreError`.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{Config, ConnectionConfig, GlobalConfig, load_config};
pub use error::CoreError;
