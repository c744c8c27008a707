// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `cirrus serve` command implementation.
//!
//! Builds the collection stack, optionally exposes Prometheus metrics, and
//! runs the daily sweep scheduler until SIGINT or SIGTERM.

use std::net::SocketAddr;

use cirrus_config::{CirrusConfig, PrometheusConfig};
use cirrus_core::{CirrusError, StorageAdapter};
use cirrus_cron::SweepScheduler;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{debug, info};

use crate::{shutdown, stack};

/// Installs the Prometheus recorder with its own HTTP listener.
fn install_prometheus(config: &PrometheusConfig) -> Result<(), CirrusError> {
    let addr: SocketAddr = config.listen_address.parse().map_err(|e| {
        CirrusError::Config(format!(
            "prometheus.listen_address `{}` is not a socket address: {e}",
            config.listen_address
        ))
    })?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| CirrusError::Internal(format!("failed to install Prometheus exporter: {e}")))?;
    cirrus_engine::recording::register_metrics();
    info!(%addr, "prometheus metrics listener started");
    Ok(())
}

/// Runs the `cirrus serve` command.
pub async fn run_serve(config: CirrusConfig) -> Result<(), CirrusError> {
    info!(name = %config.service.name, "starting cirrus serve");

    if config.prometheus.enabled {
        install_prometheus(&config.prometheus)?;
    } else {
        debug!("prometheus metrics disabled by configuration");
    }

    let stack = stack::build(&config).await?;
    let cancel = shutdown::install_signal_handler();

    if config.schedule.enabled {
        let scheduler =
            SweepScheduler::new(&config.schedule, stack.trigger.clone(), stack.store())?;
        scheduler.run(cancel).await?;
    } else {
        info!("scheduled sweeps disabled, idling until shutdown");
        cancel.cancelled().await;
    }

    stack.storage.close().await?;
    info!("cirrus serve shutdown complete");
    Ok(())
}
