use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use airq_service::config::PollConfig;
use airq_service::host::{AccessoryBridge, StatusFaultSink};
use airq_service::ingest::HttpFetcher;
use airq_service::logging;
use airq_service::model::{ReadKey, ReadValue};
use airq_service::poll::{PollCoordinator, spawn_refresh_loop};
use airq_service::pollutants::find_pollutant;
use airq_service::verify::{VerificationStatus, verify_endpoint};

/// Poll an HTTP air quality sensor and classify what it reports.
#[derive(Debug, Parser)]
#[command(name = "airq", version)]
struct Args {
    /// Accessory configuration file.
    #[arg(short, long, env = "AIRQ_CONFIG", default_value = "airq.toml")]
    config: PathBuf,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, env = "AIRQ_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Append logs to this file instead of stderr.
    #[arg(long, env = "AIRQ_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Fetch once, print a JSON report and exit.
    #[arg(long)]
    check: bool,
}

/// Without a host attached, fault status changes just go to the log.
struct LogFaultChannel;

impl StatusFaultSink for LogFaultChannel {
    fn set_status_fault(&self, key: ReadKey, faulted: bool) {
        if faulted {
            warn!(%key, "status fault");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Before parsing so .env can supply AIRQ_* defaults.
    dotenv::dotenv().ok();
    let args = Args::parse();

    logging::init(&args.log_level, args.log_file.as_deref())?;

    let config = PollConfig::load(&args.config)?;
    let fetcher = Arc::new(HttpFetcher::new(&config)?);

    if args.check {
        let report = verify_endpoint(fetcher.as_ref(), &config.pollutants).await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        if report.status == VerificationStatus::Failed {
            return Err("endpoint check failed".into());
        }
        return Ok(());
    }

    info!(
        accessory = %config.name,
        endpoint = %config.url,
        method = %config.http_method,
        polling_interval_secs = config.polling_interval,
        "starting"
    );

    let coordinator = Arc::new(PollCoordinator::new(fetcher, config.polling_interval()));
    let bridge = AccessoryBridge::new(Arc::clone(&coordinator), &config, Arc::new(LogFaultChannel));
    let refresh = spawn_refresh_loop(Arc::clone(&coordinator));

    // Answer every characteristic once, as a host does right after registration.
    for characteristic in bridge.characteristics() {
        bridge
            .get(characteristic.key, |answer| match answer {
                Ok(ReadValue::Severity(level)) => {
                    info!(characteristic = %characteristic.name, "{}", level)
                }
                Ok(ReadValue::Concentration(Some(value))) => {
                    let unit = match characteristic.key {
                        ReadKey::Pollutant(p) => find_pollutant(p).map_or("", |info| info.unit),
                        ReadKey::AirQuality => "",
                    };
                    info!(characteristic = %characteristic.name, "{} {}", value, unit)
                }
                Ok(ReadValue::Concentration(None)) => {
                    info!(characteristic = %characteristic.name, "no value")
                }
                Err(e) => warn!(characteristic = %characteristic.name, "{}", e),
            })
            .await;
    }

    tokio::signal::ctrl_c().await?;
    if let Some(handle) = refresh {
        handle.abort();
    }
    info!(fetches = coordinator.fetch_count(), "shutting down");
    Ok(())
}
