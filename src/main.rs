//! Standalone entry point
//!
//! `douk-hooks api` serves the token-gated API boundary; any other first
//! argument (or none) runs the interactive mode, which reports the effective
//! hook settings and token status.

use async_trait::async_trait;
use axum::Router;
use clap::Parser;
use douk_hooks::{AccessGate, Application, Config, Hooks, Result, RunMode, app};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Pacing, batch throttling and API token gating for bulk downloads")]
struct Cli {
    /// Run mode: "api" starts the API server, anything else the interactive mode
    mode: Option<String>,

    /// Path to a JSON configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,
}

struct Standalone {
    config: Arc<Config>,
    gate: AccessGate,
    hooks: Hooks,
}

#[async_trait]
impl Application for Standalone {
    async fn run_interactive(&self, _cancel: CancellationToken) -> Result<()> {
        let throttle = self.hooks.throttle();
        let window = self.hooks.pacer().window();
        let credentials = self.gate.credentials();

        println!("batch size:        {}", throttle.batch_size());
        println!("cool-down:         {}s", throttle.cool_down().as_secs());
        println!(
            "pacing window:     {:.1}s - {:.1}s",
            window.lower(),
            window.upper()
        );
        println!(
            "env token names:   {}",
            self.config.access.env_token_names.join(", ")
        );
        println!(
            "env token:         {}",
            if credentials.env_secret().is_some() { "set" } else { "not set" }
        );
        println!("allow-list tokens: {}", credentials.allow_list_len());

        if self.gate.is_open() {
            println!("API token validation is off: every request without a token is accepted");
        } else {
            println!("API token validation is on");
        }
        Ok(())
    }

    async fn run_api(&self, cancel: CancellationToken) -> Result<()> {
        douk_hooks::api::start_api_server(
            self.gate.clone(),
            &self.config.api,
            Router::new(),
            cancel,
        )
        .await
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let config = Arc::new(config);

    let standalone = Standalone {
        gate: AccessGate::from_config(&config.access),
        hooks: Hooks::from_config(&config)?,
        config,
    };

    let mode = RunMode::from_arg(cli.mode.as_deref());
    app::run(mode, &standalone, douk_hooks::cancel_on_signal()).await?;
    Ok(())
}
