//! Domain Scan CLI Application
//!
//! Command-line front end for domain-scan-lib: launches, resumes and stops
//! scans, prints the persisted status and exports available domains.

mod logging;
mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Parser, Subcommand};
use console::style;
use domain_scan_lib::{
    export_csv, validate_pattern, AvailabilityProbe, BroadcastNotifier, DomainScanError,
    JsonStateStore, ProxyKind, ProxyPool, ScanConfig, ScanEvent, ScanLimits, ScanNotifier,
    ScanState, Scanner, StateStore,
};
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for domain-scan
#[derive(Parser, Debug)]
#[command(name = "domain-scan")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Scan domain name patterns for availability using RDAP, DNS and WHOIS")]
#[command(
    long_about = "Scan domain name patterns for availability.\n\nEvery candidate is checked with RDAP where the registry supports it, otherwise with DNS, and names DNS reports as taken are confirmed over WHOIS (optionally through public SOCKS proxies).\n\nPattern tokens: * = one of a-z, 0-9 or -; %d = digit; %w = letter; %s = hyphen."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", global = true, help_heading = "Configuration")]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. "info" or "domain_scan_lib=debug"
    #[arg(long = "log-level", value_name = "LEVEL", global = true, help_heading = "Configuration")]
    pub log_level: Option<String>,

    /// Also write logs to this file
    #[arg(long = "log-file", value_name = "FILE", global = true, help_heading = "Configuration")]
    pub log_file: Option<PathBuf>,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", global = true, help_heading = "Configuration")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Launch a scan and print results until it finishes (Ctrl-C stops it)
    Scan {
        /// Pattern to expand, e.g. "ab%d.ir" or "*.com"
        #[arg(long, value_name = "PATTERN")]
        pattern: String,

        /// Treat the pattern as a regular expression
        #[arg(long)]
        regex: bool,
    },

    /// Continue the stored scan if it is marked running
    Resume,

    /// Print the stored scan state
    Status {
        /// Print the status view as JSON
        #[arg(long)]
        json: bool,
    },

    /// Mark the stored scan as stopped
    Stop,

    /// Export available domains as CSV
    Export {
        /// Write to this file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Check a pattern without scanning and print its expansion count
    Validate {
        #[arg(long, value_name = "PATTERN")]
        pattern: String,

        #[arg(long)]
        regex: bool,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let mut config = ScanConfig::load(args.config.as_deref(), args.verbose)?;
    apply_cli_args(&mut config, &args);

    let _log_guard = logging::init(&config.logging)?;
    tracing::debug!(database = %config.database_path.display(), "Configuration loaded");

    match args.command {
        Command::Validate { pattern, regex } => {
            let count = validate_pattern(&pattern, regex)?;
            ui::print_validation(&pattern, count);
        }
        Command::Status { json } => {
            let view = JsonStateStore::open(&config.database_path)
                .load_state()
                .view();
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                ui::print_status(&view);
            }
        }
        Command::Stop => stop_offline(&config)?,
        Command::Export { output } => {
            let csv = export_csv(&JsonStateStore::open(&config.database_path).load_state())?;
            match output {
                Some(path) => {
                    fs::write(&path, csv).map_err(|e| {
                        DomainScanError::file_error(path.display().to_string(), e.to_string())
                    })?;
                    eprintln!("Exported to {}", path.display());
                }
                None => print!("{}", csv),
            }
        }
        Command::Scan { pattern, regex } => run_scan(&config, Some((pattern, regex))).await?,
        Command::Resume => run_scan(&config, None).await?,
    }

    Ok(())
}

/// CLI flags take precedence over file and environment configuration.
fn apply_cli_args(config: &mut ScanConfig, args: &Args) {
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    } else if args.verbose {
        config.logging.level = "debug".to_string();
    }

    if let Some(path) = &args.log_file {
        config.logging.file = Some(path.clone());
    }
}

/// Mark a stored running scan as stopped without any scanner alive.
fn stop_offline(config: &ScanConfig) -> Result<(), DomainScanError> {
    let store = JsonStateStore::open(&config.database_path);
    let mut state = store.load_state();
    if !state.running {
        return Err(DomainScanError::NotRunning);
    }

    state.running = false;
    store.save_state(&state)?;
    println!("Scan of '{}' stopped", state.pattern.as_deref().unwrap_or("-"));
    Ok(())
}

/// Launch (or resume) a scan and stream its results until it ends.
async fn run_scan(
    config: &ScanConfig,
    launch: Option<(String, bool)>,
) -> Result<(), Box<dyn Error>> {
    let store = Arc::new(JsonStateStore::open(&config.database_path));
    let notifier = Arc::new(BroadcastNotifier::default());
    let mut events = notifier.subscribe();

    let proxies = if config.use_proxy {
        Some(Arc::new(ProxyPool::from_url(
            &config.proxy_source_url,
            config.proxy_ttl,
        )?))
    } else {
        None
    };
    let probe = AvailabilityProbe::from_config(config, proxies.clone())?;
    let scanner = Scanner::new(
        Arc::new(probe),
        Arc::clone(&store) as Arc<dyn StateStore>,
        Arc::clone(&notifier) as Arc<dyn ScanNotifier>,
        ScanLimits::from_config(config),
    );

    match launch {
        Some((pattern, regex)) => scanner.launch(&pattern, regex).await?,
        None => {
            if !store.load_state().running {
                return Err(DomainScanError::NotRunning.into());
            }
            scanner.start().await?;
        }
    }
    ui::print_scan_header(&store.load_state());

    let mut interrupted = false;
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(ScanEvent::Check(check)) => ui::print_check(&check),
                Ok(ScanEvent::State(state)) if !state.running => break,
                Ok(ScanEvent::State(_)) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Output fell behind, some results were not printed");
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                eprintln!("{}", style("Stopping, waiting for running checks...").yellow());
                match scanner.stop().await {
                    Ok(()) | Err(DomainScanError::NotRunning) => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }

    let state: ScanState = store.load_state();
    ui::print_summary(&state, interrupted);

    if let Some(pool) = proxies {
        let mut failed = Vec::new();
        for kind in ProxyKind::ALL {
            failed.push((kind, pool.failed(kind).await.len()));
        }
        ui::print_proxy_failures(&failed);
    }
    Ok(())
}
