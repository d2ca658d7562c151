//! fanout CLI - runs one aggregated request and prints the result document.
//!
//! # Flow
//!
//! ```text
//! main() -> load config -> HttpUpstream -> Aggregator::aggregate(policy, timeout)
//!                                                 |
//!                                                 v
//!                         stdout: {"times": [..]} | {"error": .., "message": ..}
//! ```
//!
//! Ctrl-C cancels every in-flight deadline scope through the aggregator's
//! shutdown token; the process exits only after attempt tasks have wound down.
//!
//! # Exit Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Values returned (possibly empty for `collect`) |
//! | 1 | All attempts failed or the deadline was exceeded |
//! | 2 | Invalid timeout, rejected before any attempt |

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use fanout_config::{FanoutConfig, parse_url};
use fanout_engine::{AggregateError, AggregateResponse, Aggregator, HttpUpstream, PolicyKind, Timeout};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::try_new("warn").expect("warn filter is valid"));

    // stdout carries the result document; logs go to stderr.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
}

#[derive(Debug, Parser)]
#[command(name = "fanout", version, about)]
struct Cli {
    /// Aggregation policy: all, first, collect or smart.
    policy: Option<PolicyKind>,

    /// Request timeout in milliseconds, 100 to 5000 inclusive.
    /// Anything that is not an integer falls back to 1000.
    #[arg(short, long, allow_hyphen_values = true)]
    timeout: Option<String>,

    /// Upstream URL, overriding config and FANOUT_UPSTREAM_URL.
    #[arg(short, long)]
    upstream: Option<String>,

    /// Config file to use instead of ~/.fanout/config.toml.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pretty-print the result document.
    #[arg(long)]
    pretty: bool,
}

impl Cli {
    fn load_config(&self) -> Result<FanoutConfig> {
        if let Some(path) = &self.config {
            return FanoutConfig::load_from(path)
                .with_context(|| format!("loading config {}", path.display()));
        }
        match FanoutConfig::load() {
            Ok(config) => Ok(config.unwrap_or_default()),
            Err(e) => {
                tracing::warn!("Ignoring unusable config file: {e}");
                Ok(FanoutConfig::default())
            }
        }
    }

    /// Timeout from the flag, else the configured default. Validated here, before launch.
    fn timeout(&self, config: &FanoutConfig) -> Result<Timeout, AggregateError> {
        match self.timeout.as_deref() {
            Some(raw) => Timeout::parse_lenient(Some(raw)),
            None => Timeout::from_millis(config.default_timeout_ms()),
        }
    }
}

fn exit_status(response: &AggregateResponse) -> u8 {
    match response {
        AggregateResponse::Times { .. } => 0,
        AggregateResponse::Failure { error, .. } if error.is_validation() => 2,
        AggregateResponse::Failure { .. } => 1,
    }
}

async fn run(cli: &Cli) -> Result<AggregateResponse> {
    let config = cli.load_config()?;
    let policy = cli.policy.unwrap_or_else(|| config.default_policy());

    let mut options = config.upstream_options()?;
    if let Some(raw) = &cli.upstream {
        options.url = parse_url(raw)?;
    }
    let upstream = HttpUpstream::new(&options).context("building HTTP client")?;
    tracing::info!(upstream = %upstream.url(), policy = %policy, "Starting request");

    let aggregator = Arc::new(Aggregator::new(upstream));
    let shutdown = aggregator.shutdown_token();
    let interrupt = tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling in-flight requests");
            shutdown.cancel();
        }
    });

    let result = match cli.timeout(&config) {
        Ok(timeout) => aggregator.aggregate(policy, timeout).await,
        Err(err) => {
            tracing::info!(error = %err, "Rejected request");
            Err(err)
        }
    };

    aggregator.shutdown().await;
    interrupt.abort();

    Ok(AggregateResponse::from(result))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    let response = run(&cli).await?;
    let document = if cli.pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{document}");

    Ok(ExitCode::from(exit_status(&response)))
}
