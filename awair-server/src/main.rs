// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  awair-exporter — Awair Local API → Prometheus
//
//  Poller:  fixed-interval GET of /air-data/latest, 1s timeout
//  Scrape:  axum on tokio, GET /metrics
//  Config:  defaults / YAML / AWAIR_EXPORTER_* env / flags
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

mod lifecycle;
mod logging;

use anyhow::Context;
use awair_core::ExporterConfig;
use awair_core::config::{format_duration, parse_duration};
use clap::Parser;
use figment::providers::Serialized;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "awair-exporter",
    version,
    about = "Polls an Awair device's Local API and exposes the readings as Prometheus metrics"
)]
struct Cli {
    /// Optional YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address [default: 0.0.0.0]
    #[arg(long)]
    listen: Option<String>,

    /// Listen port number [default: 2112]
    #[arg(long)]
    port: Option<u16>,

    /// Awair air-data URL [default: http://localhost/air-data/latest]
    #[arg(long)]
    awair_address: Option<String>,

    /// Duration to wait between polling device, e.g. 30s or 1m30s [default: 30s]
    #[arg(long, value_parser = parse_poll_frequency)]
    poll_frequency: Option<Duration>,

    /// Log filter directive, overridden by RUST_LOG [default: info]
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format: json or text [default: json]
    #[arg(long)]
    log_format: Option<String>,
}

/// Flags that were actually given, in config-file shape.
#[derive(Serialize, Default, Debug, PartialEq)]
struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    listen: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    awair_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    poll_frequency: Option<String>,
    log: LogOverrides,
}

#[derive(Serialize, Default, Debug, PartialEq)]
struct LogOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            listen: self.listen.clone(),
            port: self.port,
            awair_address: self.awair_address.clone(),
            poll_frequency: self.poll_frequency.map(format_duration),
            log: LogOverrides {
                level: self.log_level.clone(),
                format: self.log_format.clone(),
            },
        }
    }

    fn load_config(&self) -> anyhow::Result<ExporterConfig> {
        ExporterConfig::load_with(
            self.config.as_deref(),
            Serialized::defaults(self.overrides()),
        )
        .context("invalid configuration")
    }
}

fn parse_poll_frequency(s: &str) -> Result<Duration, String> {
    parse_duration(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    // ── Tracing ──
    logging::init(&config.log)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config_file = ?cli.config,
        "awair-exporter starting"
    );

    lifecycle::run(config).await
}
