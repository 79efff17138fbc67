use std::path::{Path, PathBuf};

use clap::Parser;
use qradar_forwarder::{
    AlertBatch, AlertDispatcher, EventSink, LeefEncoder,
    config::{DEFAULT_CONFIG_FILE, ForwarderConfig},
    observability,
    sink::{StdoutSink, SyslogSink},
};
use tokio::io::AsyncReadExt;

/// CLI arguments for the QRadar forwarder
#[derive(Parser, Debug)]
#[command(version, about = "Forward alerts to QRadar as LEEF over syslog", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to config file (defaults to ./qradar-forwarder.toml if it exists,
    /// otherwise built-in defaults)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Send an alert batch to the configured QRadar syslog input
    Send {
        /// Alert batch JSON file (defaults to stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Print the LEEF events for an alert batch without sending them
    Encode {
        /// Alert batch JSON file (defaults to stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Validate the configuration and print the effective target
    Check,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match ForwarderConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = observability::init_tracing(&config.observability) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    match args.command {
        Command::Send { input } => run_send(&config, input.as_deref()).await,
        Command::Encode { input } => run_encode(&config, input.as_deref()).await,
        Command::Check => run_check(&config, args.config.as_deref()),
    }
}

/// Read, encode and send one alert batch.
async fn run_send(config: &ForwarderConfig, input: Option<&Path>) {
    let qradar = match config.require_qradar() {
        Ok(qradar) => qradar,
        Err(e) => {
            tracing::error!(error = %e, "Cannot send alerts");
            std::process::exit(1);
        }
    };

    let batch = read_batch(input).await;
    if batch.is_empty() {
        tracing::info!("Alert batch is empty, nothing to send");
        return;
    }

    let sink = match SyslogSink::connect(qradar).await {
        Ok(sink) => sink,
        Err(e) => {
            tracing::error!(error = %e, "Failed to open syslog connection");
            std::process::exit(1);
        }
    };

    dispatch_and_close(config, sink, &batch).await;
}

/// Encode one alert batch to stdout.
async fn run_encode(config: &ForwarderConfig, input: Option<&Path>) {
    let batch = read_batch(input).await;
    dispatch_and_close(config, StdoutSink::new(), &batch).await;
}

async fn dispatch_and_close<S: EventSink>(config: &ForwarderConfig, sink: S, batch: &AlertBatch) {
    let encoder = LeefEncoder::new(config.leef.identity());
    let mut dispatcher = AlertDispatcher::new(encoder, sink);

    let result = dispatcher.dispatch(batch).await;
    if let Err(e) = dispatcher.close().await {
        tracing::warn!(error = %e, "Failed to close sink");
    }

    match result {
        Ok(sent) => tracing::debug!(events = sent, "Batch complete"),
        Err(e) => {
            tracing::error!(error = %e, "Alert batch aborted");
            std::process::exit(1);
        }
    }
}

/// Load an alert batch from a file, or from stdin when no file is given.
async fn read_batch(input: Option<&Path>) -> AlertBatch {
    let contents = match input {
        Some(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
            format!("Failed to read alert batch {}: {}", path.display(), e)
        }),
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .map(|_| buf)
                .map_err(|e| format!("Failed to read alert batch from stdin: {}", e))
        }
    };

    let batch = contents.and_then(|contents| {
        AlertBatch::from_json(&contents).map_err(|e| format!("Invalid alert batch: {}", e))
    });

    match batch {
        Ok(batch) => {
            tracing::debug!(
                alerts = batch.alerts.len(),
                threats = batch.threats.len(),
                events = batch.event_count(),
                "Loaded alert batch"
            );
            batch
        }
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    }
}

fn run_check(config: &ForwarderConfig, path: Option<&Path>) {
    let source = path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| format!("{} (or defaults)", DEFAULT_CONFIG_FILE));
    println!("Configuration OK: {}", source);

    let identity = LeefEncoder::new(config.leef.identity()).identity().clone();
    println!(
        "LEEF header: {}|{}|{}",
        identity.vendor, identity.product, identity.version
    );

    match &config.qradar {
        Some(qradar) => println!(
            "QRadar target: {} over {} (facility {:?}, tag {})",
            qradar.address,
            qradar.transport.as_str(),
            qradar.facility,
            qradar.tag
        ),
        None => println!("QRadar target: not configured (send disabled)"),
    }
}
