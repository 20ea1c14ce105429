//! reqmeter gateway binary.
//!
//! - `serve`     : run the instrumented HTTP service (default)
//! - `summarize` : aggregate a JSON access log into windowed CSV
//! - `simulate`  : drive the demo routes of a running gateway

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};

use reqmeter_gateway::demo::traffic::{self, TrafficPlan};
use reqmeter_gateway::{app_state, config, logstats, obs, router};

#[derive(Parser)]
#[command(name = "reqmeter-gateway", about = "Instrumented HTTP service with Prometheus metrics")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service.
    Serve {
        #[arg(long, default_value = "reqmeter.yaml")]
        config: String,
    },
    /// Summarize a JSON access log into fixed windows (CSV on stdout).
    Summarize {
        #[arg(long)]
        log: PathBuf,

        /// Window width; 300 by default, 10 with `--follow`.
        #[arg(long)]
        window_secs: Option<u64>,

        /// Also report windows that deviate strongly from the mean.
        #[arg(long, default_value_t = false, conflicts_with = "follow")]
        anomalies: bool,

        /// Tail the log from its current end and emit windows as they close.
        #[arg(long, default_value_t = false)]
        follow: bool,
    },
    /// Send demo traffic to a running gateway.
    Simulate {
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        target: String,

        #[arg(long, default_value_t = 100)]
        rounds: u32,

        #[arg(long, default_value_t = 100)]
        pause_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve {
        config: "reqmeter.yaml".into(),
    }) {
        Command::Serve { config } => serve(&config).await,
        Command::Summarize {
            log,
            window_secs,
            anomalies,
            follow,
        } => {
            obs::logging::init_stderr("info")?;
            if follow {
                let window = window_secs.map_or(logstats::FOLLOW_WINDOW, window_from_secs);
                logstats::follow(&log, window, Duration::from_secs(1), std::io::stdout(), shutdown_signal())
                    .await?;
                Ok(())
            } else {
                let window = window_secs.map_or(logstats::DEFAULT_WINDOW, window_from_secs);
                summarize(&log, window, anomalies)
            }
        }
        Command::Simulate {
            target,
            rounds,
            pause_ms,
        } => {
            obs::logging::init_stderr("info")?;
            let plan = TrafficPlan {
                base_url: target,
                rounds,
                pause: Duration::from_millis(pause_ms),
            };
            let client = traffic::client(Duration::from_secs(10))?;
            traffic::drive(&client, &plan).await;
            Ok(())
        }
    }
}

async fn serve(config_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (cfg, from_file) = if Path::new(config_path).exists() {
        (config::load_from_file(config_path)?, true)
    } else {
        (config::GatewayConfig::default(), false)
    };
    obs::logging::init(&cfg.logging)?;
    if !from_file {
        tracing::warn!(path = %config_path, "config file not found, using defaults");
    }

    let listen = cfg.server.listen_addr()?;
    let metrics_path = cfg.metrics.path.clone();
    let state = app_state::AppState::new(cfg)?;
    let app = router::build_router(state);

    tracing::info!(%listen, %metrics_path, "reqmeter-gateway starting");
    let listener = tokio::net::TcpListener::bind(listen).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("reqmeter-gateway stopped");
    Ok(())
}

fn window_from_secs(secs: u64) -> Duration {
    Duration::from_secs(secs.max(1))
}

fn summarize(log: &Path, window: Duration, anomalies: bool) -> Result<(), Box<dyn std::error::Error>> {
    let stats = logstats::summarize(log, window, std::io::stdout().lock())?;

    if anomalies {
        let found = logstats::detect_anomalies(&stats);
        for a in &found {
            tracing::warn!(
                window = %a.start.to_rfc3339(),
                distance = a.distance,
                threshold = a.threshold,
                "anomaly detected"
            );
        }
        tracing::info!(windows = stats.len(), anomalies = found.len(), "anomaly scan complete");
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, starting graceful shutdown");
}
