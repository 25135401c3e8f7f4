//! CLI module
//!
//! Provides:
//! - Argument parsing (clap derive)
//! - Logging bootstrap
//! - Mode dispatch (serve, query, check-config)

pub mod args;
pub mod dispatch;
pub mod logging;

// Re-exports
pub use args::{parse_args, Args, LogFormatArg, Mode};
pub use dispatch::{load_config, render_text, run_cli_mode, ExitCode};
pub use logging::init_logging;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Query failed: {0}")]
    Query(#[from] kubeassist_core::AssistantError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Exit codes (deterministic)
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_CONFIG_ERROR: i32 = 2;
/// `query` answered with a denial or clarification
pub const EXIT_DENIED: i32 = 3;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, Error>;
