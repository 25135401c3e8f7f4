//! CLI argument parsing
//!
//! Subcommands:
//! - serve: run the HTTP API
//! - query: answer one question from the terminal
//! - check-config: load, validate and print the effective configuration

use clap::{Parser, Subcommand, ValueEnum};
use kubeassist_core::config::LogFormat;
use std::path::PathBuf;

/// Parsed CLI arguments
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "kubeassist", version, about = "Read-only natural-language cluster assistant")]
pub struct Args {
    #[command(subcommand)]
    pub mode: Mode,

    /// Configuration file (TOML, JSON or YAML)
    #[arg(long, global = true, env = "KUBEASSIST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format, overrides the configured one
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormatArg>,
}

/// CLI modes
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Mode {
    /// Serve the query API over HTTP
    Serve {
        /// Listen address, overrides server.host
        #[arg(long)]
        host: Option<String>,

        /// Listen port, overrides server.port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Answer a single query and exit
    Query {
        /// The question, e.g. "list pods in kube-system"
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Print the full JSON response
        #[arg(long)]
        json: bool,
    },

    /// Validate the configuration and print it as TOML
    #[command(name = "check-config")]
    CheckConfig,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

/// Parse CLI arguments from any iterator, for tests
pub fn parse_args<I, T>(args: I) -> Result<Args, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Args::try_parse_from(args)
}
