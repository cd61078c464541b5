use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

mod api;
mod balancer;
mod cluster;
mod config;
mod db;
mod events;
mod histogram;
mod state;

#[cfg(test)]
mod tests;

use config::AppConfig;
use db::Database;
use events::EventHub;
pub use state::{AppState, DaemonState, DaemonStatus};

#[derive(Parser)]
#[command(name = "osd-balance", version, about = "Ceph OSD utilization histograms and swap planning")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Propose swaps that reduce utilization imbalance.
    Plan(PlanArgs),
    /// Render a utilization histogram as SVG.
    Histogram(HistogramArgs),
    /// Run the HTTP daemon.
    Serve,
}

#[derive(Args)]
struct PlanArgs {
    /// Report file (normalized device list or `ceph osd df tree -f json`). Defaults to stdin.
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long)]
    protected_level: Option<String>,
    #[arg(long)]
    min_improvement: Option<f64>,
    #[arg(long)]
    max_iterations: Option<usize>,
    /// Print the plan as JSON instead of the text report.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Args)]
struct HistogramArgs {
    /// Report file. Defaults to stdin.
    #[arg(long)]
    input: Option<PathBuf>,
    /// SVG destination. Defaults to stdout.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Bucket width in utilization percent.
    #[arg(long)]
    bucket_width: Option<f64>,
    #[arg(long)]
    title: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the report/SVG, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "osd_balance=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load()?;

    match cli.command {
        Command::Plan(args) => run_plan(&config, args),
        Command::Histogram(args) => run_histogram(&config, args),
        Command::Serve => serve(config).await,
    }
}

fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(p) => std::fs::read_to_string(p)
            .with_context(|| format!("Failed to read report from {}", p.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).context("Failed to read report from stdin")?;
            Ok(buf)
        }
    }
}

fn run_plan(config: &AppConfig, args: PlanArgs) -> Result<()> {
    let devices = cluster::load_devices(&read_input(args.input.as_ref())?)?;

    let mut planner_config = config.planner_config();
    if let Some(level) = args.protected_level {
        planner_config.protected_level = level;
    }
    if let Some(threshold) = args.min_improvement {
        planner_config.min_improvement = threshold;
    }
    if args.max_iterations.is_some() {
        planner_config.max_iterations = args.max_iterations;
    }

    let plan = balancer::generate_plan(&devices, &planner_config)?;

    let rendered = if args.json {
        let mut json = serde_json::to_string_pretty(&plan)?;
        json.push('\n');
        json
    } else {
        balancer::report::render_text(&devices, &plan)
    };

    std::io::stdout().lock().write_all(rendered.as_bytes())?;
    Ok(())
}

fn run_histogram(config: &AppConfig, args: HistogramArgs) -> Result<()> {
    let devices = cluster::load_devices(&read_input(args.input.as_ref())?)?;
    let stats = cluster::ClusterStats::compute(&devices);

    let title = args.title.unwrap_or_else(|| {
        format!("OSD utilization, {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"))
    });
    let mut options = config.histogram_options(title);
    if let Some(width) = args.bucket_width {
        anyhow::ensure!(
            (config::MIN_BUCKET_WIDTH..=100.0).contains(&width),
            "--bucket-width must be between {} and 100",
            config::MIN_BUCKET_WIDTH
        );
        options.bucket_width = width;
    }

    let svg = histogram::render_svg(&devices, &stats, &options)?;

    match args.output {
        Some(path) => std::fs::write(&path, svg)
            .with_context(|| format!("Failed to write histogram to {}", path.display()))?,
        None => std::io::stdout().lock().write_all(svg.as_bytes())?,
    }
    Ok(())
}

async fn serve(config: AppConfig) -> Result<()> {
    info!("osd-balance v{} starting up", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: port={}, db_path={}", config.port, config.db_path);

    let db = Database::open(&config.db_path)?;
    db.run_migrations()?;
    info!("Database initialized at {}", config.db_path);

    let bind_addr = format!("127.0.0.1:{}", config.port);
    let state = Arc::new(AppState::new(db, config, EventHub::new(256)));
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on {}", bind_addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("osd-balance shut down cleanly");
    Ok(())
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { warn!("Received Ctrl+C, shutting down..."); },
        () = terminate => { warn!("Received SIGTERM, shutting down..."); },
    }
}
