//! kubeassist binary

use clap::Parser;
use kubeassist::cli::{run_cli_mode, Args};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let code = run_cli_mode(args).await;
    std::process::exit(code);
}
