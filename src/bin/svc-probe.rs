//! Probe CLI for a running supervisor.
//!
//! Exits 0 when the probe answers with a 2xx status, 1 otherwise. Suitable as
//! a container health check command.

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "svc-probe")]
#[command(about = "Query the diagnostic endpoints of svc-supervisor", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:3000")]
    url: String,

    /// Request timeout in milliseconds.
    #[arg(short, long, default_value_t = 2000)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plain liveness check (`GET /`)
    Root,
    /// JSON liveness check (`GET /health`)
    Health,
    /// Database readiness (`GET /db`)
    Db,
    /// Cache readiness (`GET /redis`)
    Redis,
}

impl Commands {
    fn path(&self) -> &'static str {
        match self {
            Commands::Root => "/",
            Commands::Health => "/health",
            Commands::Db => "/db",
            Commands::Redis => "/redis",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match probe(&cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn probe(cli: &Cli) -> Result<bool, reqwest::Error> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(cli.timeout_ms))
        .build()?;

    let url = format!("{}{}", cli.url.trim_end_matches('/'), cli.command.path());
    let res = client.get(&url).send().await?;
    let status = res.status();
    let text = res.text().await?;

    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json).unwrap_or(text)),
        Err(_) => println!("{}", text),
    }

    if !status.is_success() {
        eprintln!("Error: {} returned status {}", url, status);
    }
    Ok(status.is_success())
}
