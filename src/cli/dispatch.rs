//! CLI mode dispatch
//!
//! Loads configuration once, installs logging, then runs the selected mode:
//! - serve: HTTP API until Ctrl-C
//! - query: one pipeline run, printed as text or JSON
//! - check-config: print the effective configuration

use crate::cli::logging::init_logging;
use crate::cli::{Args, Error, Mode, Result, EXIT_CONFIG_ERROR, EXIT_DENIED, EXIT_FAILURE, EXIT_SUCCESS};
use kubeassist_api::{ApiConfig, ApiServer, ApiState};
use kubeassist_core::config::{AssistantConfig, ConfigFormat};
use kubeassist_core::{AssistantResponse, Pipeline};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Exit code wrapper for CLI operations
pub type ExitCode = i32;

/// Run CLI mode and return exit code
pub async fn run_cli_mode(args: Args) -> ExitCode {
    // Logging is not up yet, so configuration errors go straight to stderr.
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_CONFIG_ERROR;
        }
    };

    let _log_guard = init_logging(&config.logging);

    match run_mode(args.mode, config).await {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            match e {
                Error::Config(_) => EXIT_CONFIG_ERROR,
                _ => EXIT_FAILURE,
            }
        }
    }
}

/// Load the configuration and fold in command-line overrides
pub fn load_config(args: &Args) -> Result<AssistantConfig> {
    let mut config =
        AssistantConfig::load(args.config.as_deref()).map_err(|e| Error::Config(e.to_string()))?;

    if let Some(format) = args.log_format {
        config.logging.format = format.into();
    }
    if let Mode::Serve { host, port } = &args.mode {
        if let Some(host) = host {
            config.server.host = host.clone();
        }
        if let Some(port) = port {
            config.server.port = *port;
        }
    }
    config
        .validate()
        .map_err(|e| Error::Config(e.to_string()))?;
    Ok(config)
}

async fn run_mode(mode: Mode, config: AssistantConfig) -> Result<ExitCode> {
    match mode {
        Mode::Serve { .. } => serve(config).await.map(|_| EXIT_SUCCESS),
        Mode::Query { text, json } => query(config, &text.join(" "), json).await,
        Mode::CheckConfig => {
            let rendered = config
                .to_string_with_format(ConfigFormat::Toml)
                .map_err(|e| Error::Config(e.to_string()))?;
            println!("{}", rendered);
            Ok(EXIT_SUCCESS)
        }
    }
}

async fn serve(config: AssistantConfig) -> Result<()> {
    info!(
        provider = config.llm.provider.as_str(),
        binary = %config.cluster.binary,
        "Starting kubeassist server"
    );
    let state = Arc::new(ApiState::new(Pipeline::from_config(&config)));
    let server = ApiServer::new(ApiConfig::from(&config.server), state);

    let shutdown = CancellationToken::new();
    cancel_on_ctrl_c(shutdown.clone());

    server
        .start(shutdown)
        .await
        .map_err(|e| Error::Server(e.to_string()))
}

async fn query(config: AssistantConfig, text: &str, json: bool) -> Result<ExitCode> {
    let pipeline = Pipeline::from_config(&config);
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let response = pipeline.handle(text, &cancel).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("{}", render_text(&response));
    }

    Ok(if response.is_success() {
        EXIT_SUCCESS
    } else {
        EXIT_DENIED
    })
}

fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            token.cancel();
        }
    });
}

/// Human-readable rendering of a response
pub fn render_text(response: &AssistantResponse) -> String {
    match response {
        AssistantResponse::Success(success) => {
            let mut out = success.raw_response.trim_end().to_string();
            if let Some(summary) = &success.enhanced_response {
                out.push_str("\n\nSummary: ");
                out.push_str(summary.trim());
            }
            out
        }
        AssistantResponse::Denial(denial) => {
            let mut out = format!("Denied: {}", denial.error);
            if let Some(suggestion) = &denial.suggestion {
                out.push('\n');
                out.push_str(suggestion);
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::parse_args;
    use kubeassist_core::config::LogFormat;
    use kubeassist_core::synth::{DenialResponse, SuccessResponse};
    use kubeassist_core::{Intent, ResourceKind, Verb};
    use std::io::Write;

    fn config_file(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_cli_overrides_config_file() {
        let file = config_file("[server]\nhost = \"10.0.0.1\"\nport = 7000\n");
        let path = file.path().to_str().unwrap();
        let args = parse_args([
            "kubeassist",
            "serve",
            "--port",
            "7100",
            "--config",
            path,
            "--log-format",
            "json",
        ])
        .unwrap();

        let config = load_config(&args).unwrap();
        assert_eq!(config.server.host, "10.0.0.1");
        assert_eq!(config.server.port, 7100);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_missing_config_file_is_config_error() {
        let args = parse_args([
            "kubeassist",
            "check-config",
            "--config",
            "/nonexistent/kubeassist.toml",
        ])
        .unwrap();
        assert!(matches!(load_config(&args), Err(Error::Config(_))));
    }

    #[test]
    fn test_overrides_are_validated() {
        let file = config_file("[server]\nport = 7000\n");
        let path = file.path().to_str().unwrap();
        let args = parse_args(["kubeassist", "serve", "--host", " ", "--config", path]).unwrap();
        match load_config(&args) {
            Err(Error::Config(message)) => assert!(message.contains("server.host"), "{}", message),
            other => panic!("expected a config error, got {:?}", other.map(|c| c.server)),
        }
    }

    #[test]
    fn test_render_text_success_with_summary() {
        let intent = Intent::new(Verb::List, ResourceKind::Pod, "list pods");
        let response = AssistantResponse::Success(SuccessResponse {
            query: "list pods".to_string(),
            parsed_intent: intent,
            raw_response: "web-1   Running\n".to_string(),
            enhanced_response: Some("One pod is running.".to_string()),
            success: true,
        });
        assert_eq!(
            render_text(&response),
            "web-1   Running\n\nSummary: One pod is running."
        );
    }

    #[test]
    fn test_render_text_denial() {
        let response = AssistantResponse::Denial(DenialResponse {
            query: "delete pod web-1".to_string(),
            error: "only read-only inspection commands are permitted".to_string(),
            suggestion: Some("Try \"list pods\".".to_string()),
            parsed_intent: None,
            success: false,
        });
        let text = render_text(&response);
        assert!(text.starts_with("Denied: only read-only"));
        assert!(text.ends_with("Try \"list pods\"."));
    }
}
