//! Daemon orchestration -- assembly and lifecycle management.
//!
//! The [`Orchestrator`] validates configuration, builds the watch
//! pipeline with its shared reputation provider and banlist store,
//! and manages startup and graceful shutdown.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

use banwatch_core::config::BanwatchConfig;
use banwatch_core::pipeline::{HealthStatus, Pipeline};
use banwatch_pipeline::{
    BanlistStore, HttpScoreProvider, PipelineConfig, WatchPipeline, WatchPipelineBuilder,
};

/// The daemon orchestrator.
///
/// Owns the watch pipeline and drives its lifecycle from the loaded
/// configuration.
pub struct Orchestrator {
    /// The assembled watch pipeline.
    pipeline: WatchPipeline,
    /// Daemon start time (for uptime reporting on shutdown).
    start_time: Instant,
}

impl Orchestrator {
    /// Build the orchestrator from an already-loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration validation fails
    /// - The reputation HTTP client cannot be constructed
    pub fn build_from_config(config: BanwatchConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        let provider = HttpScoreProvider::new(&config.reputation)
            .map_err(|e| anyhow::anyhow!("failed to build reputation provider: {}", e))?;
        let store = BanlistStore::new(&config.banlist.path);

        let pipeline = WatchPipelineBuilder::new()
            .config(PipelineConfig::from_core(&config))
            .provider(Arc::new(provider))
            .store(Arc::new(store))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build watch pipeline: {}", e))?;

        Ok(Self {
            pipeline,
            start_time: Instant::now(),
        })
    }

    /// Current health of the watch pipeline.
    pub async fn health(&self) -> HealthStatus {
        self.pipeline.health_check().await
    }

    /// Start the pipeline, wait for a shutdown signal, then stop it.
    pub async fn run(&mut self) -> Result<()> {
        self.pipeline
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start watch pipeline: {}", e))?;

        tracing::info!("banwatch-daemon running, watching logs");
        tokio::signal::ctrl_c().await?;
        tracing::info!("shutdown signal received");

        self.shutdown().await
    }

    /// Stop the pipeline and log the daemon uptime.
    pub async fn shutdown(&mut self) -> Result<()> {
        if let Err(e) = self.pipeline.stop().await {
            tracing::error!(error = %e, "failed to stop watch pipeline");
        }

        tracing::info!(
            uptime_secs = self.start_time.elapsed().as_secs(),
            "banwatch-daemon shut down"
        );
        Ok(())
    }
}
