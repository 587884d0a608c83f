// AssetWatch Server - HTTP API and Prometheus exporter
// Copyright (c) 2025 AssetWatch contributors
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # AssetWatch Server
//!
//! HTTP API for the AssetWatch monitor with a Prometheus endpoint and
//! optional fleet replay.
//!
//! ## Usage
//!
//! ```bash
//! # Serve the API with classifier artifacts from ./models
//! assetwatch-server --model-dir ./models
//!
//! # Replay a fleet recording ten times faster than real time
//! assetwatch-server --replay fleet.csv --speed 10.0
//!
//! # Load a JSON monitor configuration
//! assetwatch-server --config monitor.json --port 9090
//! ```

mod metrics;
mod replay;
mod routes;

use assetwatch::MemoryTelemetryStore;
use assetwatch_monitor::{
    FanoutAlertSink, LatestFixSource, LogAlertSink, MemoryAlertSink, Monitor, MonitorConfig,
};
use clap::Parser;
use replay::{ReplayConfig, ReplayEngine};
use routes::{router, AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// AssetWatch tracking server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "9100")]
    port: u16,

    /// JSON monitor configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fleet CSV recording to replay
    #[arg(short, long)]
    replay: Option<String>,

    /// Replay speed multiplier (1.0 = real-time)
    #[arg(short, long, default_value = "1.0")]
    speed: f64,

    /// Loop the replay when it reaches the end
    #[arg(short, long, default_value_t = true, action = clap::ArgAction::Set)]
    loop_replay: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Directory holding the classifier model and label encoder
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Interpreter that runs the scoring script
    #[arg(long)]
    python: Option<PathBuf>,

    /// Scoring script passed to the interpreter
    #[arg(long)]
    script: Option<PathBuf>,
}

impl Args {
    /// Load the monitor configuration and apply command-line overrides.
    fn monitor_config(&self) -> assetwatch_monitor::Result<MonitorConfig> {
        let mut config = match &self.config {
            Some(path) => MonitorConfig::from_json_file(path)?,
            None => MonitorConfig::default(),
        };
        if let Some(dir) = &self.model_dir {
            config.predictor.model_dir = dir.clone();
        }
        if let Some(program) = &self.python {
            config.predictor.program = program.clone();
        }
        if let Some(script) = &self.script {
            config.predictor.script = Some(script.clone());
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match args.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        EnvFilter::from_default_env().add_directive(level.into())
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("AssetWatch Server v{}", env!("CARGO_PKG_VERSION"));

    let config = match args.monitor_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Wire the monitor
    let source = Arc::new(LatestFixSource::with_history(config.fix_history));
    let alerts = Arc::new(MemoryAlertSink::with_capacity(config.alert_history));
    let sink = FanoutAlertSink::new()
        .with(alerts.clone())
        .with(Arc::new(LogAlertSink));
    let monitor = Arc::new(Monitor::new(
        config,
        Arc::new(MemoryTelemetryStore::new()),
        source.clone(),
        Arc::new(sink),
    ));

    if let Some(reason) = monitor.predictor_error() {
        warn!("Anomaly reports disabled: {}", reason);
    }

    // Initialize replay engine if a recording was provided
    let replay = if let Some(csv_path) = args.replay.clone() {
        let config = ReplayConfig {
            csv_path,
            speed: args.speed,
            loop_replay: args.loop_replay,
            ..Default::default()
        };

        match ReplayEngine::from_csv(config, source.clone(), monitor.clone()) {
            Ok(engine) => {
                let state = engine.state();
                let info = engine.dataset_info();

                // Start replay in background
                tokio::spawn(async move {
                    engine.run().await;
                });

                Some((state, info))
            }
            Err(e) => {
                error!("Failed to load fleet recording: {}", e);
                None
            }
        }
    } else {
        info!("No recording specified, waiting for device reports");
        None
    };

    let state = Arc::new(AppState {
        monitor: monitor.clone(),
        source,
        alerts,
        replay,
        start_time: std::time::Instant::now(),
    });

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };
    info!("Starting server on http://{}", addr);
    info!("Metrics endpoint: http://{}/metrics", addr);

    let served = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    let summaries = monitor.shutdown().await;
    info!("Stopped {} monitoring sessions", summaries.len());

    match served {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Resolves on Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
