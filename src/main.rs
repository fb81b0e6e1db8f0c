use anyhow::Result;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

use smsdispatch::alert::{EmailSettings, LogNotifier};
use smsdispatch::config::Config;
use smsdispatch::dispatch::Dispatcher;
use smsdispatch::telemetry::{counters, init_tracing, Metrics, TracingConfig};

#[derive(Parser, Debug)]
#[command(name = "smsdispatch")]
#[command(author, version, about = "Send SMS through capacity weighted gateways")]
struct Args {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Validate config and exit
    #[arg(long)]
    validate: bool,

    /// Destination number
    #[arg(short, long, requires = "message")]
    telephone: Option<String>,

    /// Message text
    #[arg(short, long, requires = "telephone")]
    message: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Load configuration first (to get log settings)
    let config = Config::load(&args.config)?;

    init_tracing(&TracingConfig::from(&config.telemetry))?;

    let metrics = Metrics::new()?;
    counters::init(&metrics.meter("smsdispatch"));

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        gateways = config.gateways.len(),
        "configuration loaded"
    );

    if args.validate {
        info!("configuration is valid");
        return Ok(ExitCode::SUCCESS);
    }

    let (Some(telephone), Some(message)) = (args.telephone, args.message) else {
        info!("no message given, nothing to send");
        return Ok(ExitCode::SUCCESS);
    };

    let notifier = Arc::new(LogNotifier::new(EmailSettings::from_config(&config.alert)));
    let dispatcher = Dispatcher::new(&config, notifier)?;

    let response = dispatcher.dispatch(&telephone, &message).await;

    if let Some(path) = &config.telemetry.metrics_file {
        metrics.write_textfile(path)?;
    }

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&response)?;
    stdout.write_all(b"\n")?;
    stdout.flush()?;

    if response == dispatcher.sentinels().success {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
