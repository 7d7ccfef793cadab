use crate::{
    config::Config,
    pump::{Pump, Status},
    sink::ChannelSink,
    source,
};
use anyhow::{Context, Result};
use clap::Args;
use heave_core::BroadcastScheduler;
use std::{
    path::PathBuf,
    sync::{Arc, RwLock},
    thread,
};
use tracing_subscriber::EnvFilter;

#[derive(Args)]
pub struct StartArgs {
    /// Path to the configuration file (TOML or JSON).
    pub config: PathBuf,
}

impl StartArgs {
    pub fn run(&self) -> Result<()> {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .init();

        let config = Config::from_file(&self.config)?;
        config.validate()?;

        tracing::info!("Starting heave with config: {}", self.config.display());

        let geometry = config.geometry()?;
        for line in geometry.degenerate() {
            tracing::warn!(
                pto = line.name(),
                "mount and anchor coincide, rate will always be zero"
            );
        }

        let sensor = source::bring_up(config.sensor.attempts, config.sensor.retry_delay(), |_| {
            source::open(&config.sensor)
        })?;

        let sink = ChannelSink::new(config.server.channel_capacity);
        let names = geometry.names().map(str::to_owned).to_vec();
        let status = Arc::new(RwLock::new(Status::new(names)));

        let scheduler = BroadcastScheduler::new(
            geometry,
            config.broadcast.engine(),
            config.broadcast.interval(),
            sensor,
        );
        let pump = Pump::new(
            scheduler,
            sink.clone(),
            config.energy.meter(),
            status.clone(),
        );
        let poll_period = config.broadcast.poll_period();
        thread::Builder::new()
            .name("broadcast".into())
            .spawn(move || pump.run(poll_period))
            .context("failed to spawn broadcast loop")?;

        start_server(config, sink, status)
    }
}

/// Start the HTTP server
#[tokio::main]
async fn start_server(
    config: Config,
    sink: ChannelSink,
    status: Arc<RwLock<Status>>,
) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    let state = crate::server::AppState::new(config, sink, status);
    let app = crate::server::create_router(state);

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
