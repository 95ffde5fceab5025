use thiserror::Error;

// Re-export for convenience elsewhere
pub use config::ConfigError;

/// Errors raised by the ambient layer: configuration loading and logging setup.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Missing configuration value: {0}")]
    MissingValue(&'static str),

    #[error("Logging setup failed: {0}")]
    LoggingSetup(String),
}
