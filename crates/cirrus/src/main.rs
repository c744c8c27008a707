// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cirrus - multi-account, multi-region AWS inventory collector.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod commands;
mod serve;
mod shutdown;
mod stack;

use std::path::PathBuf;

use cirrus_config::CirrusConfig;
use cirrus_core::ServiceKind;
use cirrus_engine::ExportFormat;
use clap::{Args, Parser, Subcommand};

/// Cirrus - multi-account, multi-region AWS inventory collector.
#[derive(Parser, Debug)]
#[command(name = "cirrus", version, about, long_about = None)]
struct Cli {
    /// Load exactly this config file (plus CIRRUS_* environment overrides).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the daily sweep scheduler until interrupted.
    Serve,
    /// Run one scheduled-style sweep now and print its report.
    Sweep,
    /// Refresh a narrow scope on demand and print the run report.
    Refresh {
        /// Only this service.
        #[arg(long, value_parser = parse_service)]
        service: Option<ServiceKind>,
        /// Only these account ids.
        #[arg(long, value_delimiter = ',')]
        accounts: Option<Vec<String>>,
    },
    /// List stored resources for one service.
    Inventory {
        #[command(flatten)]
        filter: FilterArgs,
        /// Case-insensitive substring matched against ids and attributes.
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        page_size: Option<u32>,
    },
    /// Show per-triple freshness.
    Freshness {
        #[arg(long, value_parser = parse_service)]
        service: Option<ServiceKind>,
        #[arg(long)]
        account: Option<String>,
        #[arg(long)]
        region: Option<String>,
    },
    /// List the accounts the configured directory returns.
    Accounts,
    /// Count stored resources by lifecycle state for one service.
    Summary {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Export stored resources for one service as CSV or JSON.
    Export {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, default_value = "json")]
        format: ExportFormat,
        /// Write to this file instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Delete records past their retention.
    Purge,
}

/// Narrowing shared by the read commands.
#[derive(Args, Debug, Clone)]
struct FilterArgs {
    /// Service name, e.g. `compute-instance` or `ec2`.
    #[arg(long, value_parser = parse_service)]
    service: ServiceKind,
    #[arg(long, value_delimiter = ',')]
    accounts: Option<Vec<String>>,
    #[arg(long, value_delimiter = ',')]
    regions: Option<Vec<String>>,
}

fn parse_service(raw: &str) -> Result<ServiceKind, String> {
    raw.parse::<ServiceKind>().map_err(|_| {
        let known: Vec<String> = ServiceKind::ALL.iter().map(|s| s.to_string()).collect();
        format!("unknown service `{raw}`, expected one of: {}", known.join(", "))
    })
}

fn load_config(path: Option<&PathBuf>) -> CirrusConfig {
    let loaded = match path {
        Some(path) => cirrus_config::load_and_validate_path(path),
        None => cirrus_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            cirrus_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());
    init_tracing(&config.service.log_level);

    let Some(command) = cli.command else {
        println!("cirrus: use --help for available commands");
        return;
    };

    let result = match command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Sweep => commands::run_sweep(&config).await,
        Commands::Refresh { service, accounts } => {
            commands::run_refresh(&config, service, accounts).await
        }
        Commands::Inventory {
            filter,
            search,
            page,
            page_size,
        } => commands::run_inventory(&config, filter.into_filter(search), page, page_size).await,
        Commands::Freshness {
            service,
            account,
            region,
        } => commands::run_freshness(&config, service, account, region).await,
        Commands::Accounts => commands::run_accounts(&config).await,
        Commands::Summary { filter } => commands::run_summary(&config, filter.into_filter(None)).await,
        Commands::Export {
            filter,
            format,
            output,
        } => commands::run_export(&config, filter.into_filter(None), format, output).await,
        Commands::Purge => commands::run_purge(&config).await,
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

impl FilterArgs {
    fn into_filter(self, search: Option<String>) -> cirrus_core::InventoryFilter {
        cirrus_core::InventoryFilter {
            service: self.service,
            account_ids: self.accounts,
            regions: self.regions,
            search,
        }
    }
}

/// Logs go to stderr so command output on stdout stays machine-readable.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cirrus={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
