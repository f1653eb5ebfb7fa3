//! trader-sim: concurrent trader load harness.
//!
//! Usage:
//!   trader-sim run [OPTIONS]       Many traders submitting random orders
//!   trader-sim submit [OPTIONS]    One trader sending a fixed order script

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use trader_sim::config::{parse_seconds, HarnessConfig, Overrides};
use trader_sim::export::{build_export, write_to_file, RunParameters};
use trader_sim::orchestrator::Orchestrator;
use trader_sim::report::ReportAccumulator;
use trader_sim::script::{default_script, run_script, ScriptTiming};
use trader_sim::transport::{Endpoint, TcpConnector};
use types::ids::TraderId;

/// CLI arguments for trader-sim.
#[derive(Parser, Debug)]
#[command(name = "trader-sim")]
#[command(about = "Simulate traders continuously submitting orders to a matching server")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the concurrent simulation
    Run(RunArgs),
    /// Connect a single trader and submit a fixed set of orders
    Submit(SubmitArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Market server host
    #[arg(long)]
    host: Option<String>,

    /// Market server port
    #[arg(long)]
    port: Option<u16>,

    /// Number of traders
    #[arg(long)]
    traders: Option<usize>,

    /// Simulation duration in seconds
    #[arg(long)]
    duration: Option<f64>,

    /// Seconds between orders per trader
    #[arg(long)]
    interval: Option<f64>,

    /// Max concurrent connections
    #[arg(long)]
    workers: Option<usize>,

    /// Seed for reproducible order flow
    #[arg(long)]
    seed: Option<u64>,

    /// Write a JSON export of the run to this path
    #[arg(long)]
    json: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SubmitArgs {
    /// Market server host
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Market server port
    #[arg(long, default_value_t = 8888)]
    port: u16,

    /// Trader identity to register
    #[arg(long, default_value = "trader1")]
    trader: String,
}

fn init_logging(level: &str) -> Result<()> {
    let log_level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run(args, cli.log_level).await,
        Command::Submit(args) => {
            init_logging(cli.log_level.as_deref().unwrap_or("info"))?;
            submit(args).await
        }
    }
}

async fn run(args: RunArgs, log_level: Option<String>) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => HarnessConfig::from_file(path)?,
        None => HarnessConfig::default(),
    };

    config.apply_overrides(Overrides {
        host: args.host,
        port: args.port,
        traders: args.traders,
        duration: args.duration.map(parse_seconds).transpose()?,
        interval: args.interval.map(parse_seconds).transpose()?,
        max_concurrency: args.workers,
        seed: args.seed,
        log_level,
    });

    init_logging(&config.log_level)?;

    let sessions = config.session_configs().context("invalid run configuration")?;
    info!(
        endpoint = %config.endpoint,
        traders = config.traders,
        duration_secs = config.duration.as_secs_f64(),
        interval_secs = config.interval.as_secs_f64(),
        max_concurrency = config.max_concurrency,
        "starting simulation"
    );

    let orchestrator = Orchestrator::new(Arc::new(TcpConnector), config.max_concurrency);
    let mut totals = ReportAccumulator::new();
    let result = orchestrator
        .run_with(sessions, |outcome| {
            match &outcome.failure {
                Some(err) if err.is_fatal() => {
                    warn!(trader = %outcome.trader_id, error = %err, "trader failed")
                }
                failure => info!(
                    trader = %outcome.trader_id,
                    orders = outcome.orders_sent,
                    elapsed_secs = outcome.elapsed.as_secs_f64(),
                    note = ?failure,
                    "trader finished"
                ),
            }
            totals.record(outcome);
        })
        .await;

    let report = totals.finish(result.wall_clock);
    println!("{}", report.render());

    if let Some(path) = args.json {
        let parameters = RunParameters {
            endpoint: config.endpoint.to_string(),
            traders: config.traders,
            duration: config.duration,
            interval: config.interval,
            max_concurrency: config.max_concurrency,
            seed: config.seed,
        };
        let export = build_export(parameters, &report, &result.outcomes, result.peak_concurrency);
        write_to_file(&export, &path).with_context(|| format!("failed to write {:?}", path))?;
        info!(path = ?path, "run exported");
    }

    Ok(())
}

async fn submit(args: SubmitArgs) -> Result<()> {
    let trader_id = TraderId::try_new(args.trader.clone())
        .with_context(|| format!("invalid trader id {:?}", args.trader))?;
    let endpoint = Endpoint::new(args.host, args.port);

    let transcript = run_script(
        &TcpConnector,
        &endpoint,
        &trader_id,
        &default_script(),
        ScriptTiming::default(),
    )
    .await?;

    let rule = "=".repeat(60);
    println!("{rule}");
    println!("Scripted submission for {}", transcript.trader_id);
    println!("{rule}");
    for exchange in std::iter::once(&transcript.registration).chain(&transcript.orders) {
        println!("> {}", exchange.command.trim_end());
        match &exchange.response {
            Some(response) => println!("< {response}"),
            None => println!("< (no response)"),
        }
    }
    for notification in &transcript.notifications {
        println!("! {notification}");
    }
    println!("{rule}");
    Ok(())
}
