//! Soft-limit controller
//!
//! Periodically compares live pod resource usage against annotation-declared
//! soft limits and terminates pods that exceed them.

use anyhow::{Context, Result};
use clap::Parser;
use controller_lib::{
    cluster::{MetricsServiceClient, PodEventRecorder, PodLister, PodTerminator},
    enforce::{Enforcer, EnforcementLoop, LoopConfig},
    health::{components, HealthRegistry},
    observability::ControllerMetrics,
};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let settings = config::ControllerConfig::parse();
    let namespace = settings.validate()?.to_string();
    info!(
        namespace = %namespace,
        interval_secs = settings.interval,
        "Starting soft-limit-controller"
    );

    let client = build_client(settings.kubeconfig.as_deref()).await?;

    // Health registry backing the probe endpoints
    let health = HealthRegistry::new();
    health.register(components::ENFORCER).await;
    health.register(components::METRICS_SERVICE).await;

    let stats = ControllerMetrics::new();

    let enforcer = Enforcer::new(
        Arc::new(PodLister::new(client.clone(), &namespace)),
        Arc::new(MetricsServiceClient::new(client.clone())),
        Arc::new(PodTerminator::new(client.clone())),
        stats.clone(),
    )
    .with_recorder(Arc::new(PodEventRecorder::new(client)));

    // Start health and metrics server
    let app_state = Arc::new(api::AppState::new(health.clone()));
    let api_handle = tokio::spawn(api::serve(settings.api_port, app_state));

    // Start the enforcement loop
    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
    let enforcement = EnforcementLoop::new(
        Arc::new(enforcer),
        LoopConfig {
            interval: Duration::from_secs(settings.interval),
        },
        health.clone(),
        stats,
    );
    let loop_handle = tokio::spawn(enforcement.run(shutdown_rx));

    health.set_ready(true).await;

    // Wait for shutdown signal, then stop the loop between ticks
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    let _ = shutdown_tx.send(());
    let _ = loop_handle.await;
    api_handle.abort();

    Ok(())
}

/// Build a Kubernetes client from an explicit kubeconfig path, or infer the
/// configuration (in-cluster service account, then default kubeconfig).
async fn build_client(kubeconfig: Option<&Path>) -> Result<Client> {
    match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("failed to read kubeconfig at {}", path.display()))?;
            let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .context("invalid kubeconfig")?;
            Client::try_from(config).context("failed to build Kubernetes client")
        }
        None => Client::try_default()
            .await
            .context("failed to infer Kubernetes configuration"),
    }
}
