use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use store_uptime::cli::{parse_args, print_help};
use store_uptime::config::Config;
use store_uptime::ingest::load_dataset;
use store_uptime::registry::{ReportRegistry, ReportService};
use store_uptime::report::generate_report_file;
use store_uptime::server;

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args();

    if args.help {
        print_help();
        return Ok(());
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("store_uptime=info")),
        )
        .init();

    info!("store-uptime v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded");
    info!("  Polls: {}", config.store_status_csv.display());
    info!("  Business hours: {}", config.menu_hours_csv.display());
    info!("  Timezones: {}", config.timezones_csv.display());
    info!("  Default timezone: {}", config.default_timezone);
    info!("  Output dir: {}", config.report_output_dir.display());

    // Handle --validate mode
    if args.validate {
        info!("Validating configuration...");
        match config.validate() {
            Ok(()) => {
                info!("Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("{}", e);
                std::process::exit(1);
            }
        }
    }

    config.validate()?;

    // Input tables are read once and shared read-only by every report
    let dataset = Arc::new(load_dataset(
        &config.store_status_csv,
        &config.menu_hours_csv,
        &config.timezones_csv,
        &config.default_timezone,
    )?);

    if args.once {
        let output = args
            .output
            .map(PathBuf::from)
            .unwrap_or_else(|| config.report_output_dir.join("report.csv"));
        info!("Generating single report (--once mode)");
        let rows = tokio::task::spawn_blocking({
            let dataset = dataset.clone();
            let output = output.clone();
            move || generate_report_file(&dataset, &output)
        })
        .await
        .context("Report worker panicked")?
        .with_context(|| format!("Failed to generate report {}", output.display()))?;
        info!("Wrote {} rows to {}", rows, output.display());
        return Ok(());
    }

    let service = ReportService::new(
        Arc::new(ReportRegistry::new()),
        dataset,
        config.report_output_dir.clone(),
    );

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            shutdown.cancel();
        }
    });

    server::serve(config.http_port, service, cancel)
        .await
        .with_context(|| format!("Report server failed on port {}", config.http_port))?;

    Ok(())
}
