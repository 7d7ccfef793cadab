use crate::{config::Config, source};
use anyhow::{Context, Result};
use clap::Args;
use heave_core::{BroadcastMessage, RigidBodyGeometry};
use std::path::PathBuf;

#[derive(Args)]
pub struct ComputeArgs {
    /// Angular velocity as `x,y,z` (roll, pitch, yaw).
    #[arg(long, allow_hyphen_values = true)]
    pub omega: String,

    /// Interpret `--omega` as degrees per second instead of rad/s.
    #[arg(long)]
    pub degrees: bool,

    /// Take geometry, deadband and interval from this configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl ComputeArgs {
    pub fn run(&self) -> Result<()> {
        let message = self.message()?;
        println!("{}", message.to_json().context("failed to encode message")?);
        Ok(())
    }

    pub fn message(&self) -> Result<BroadcastMessage> {
        let config = match &self.config {
            Some(path) => {
                let config = Config::from_file(path)?;
                config.validate()?;
                config
            }
            None => Config::default(),
        };
        let geometry: RigidBodyGeometry = config.geometry()?;

        let omega = source::parse_triplet(&self.omega).context("invalid --omega")?;
        let omega = if self.degrees {
            source::dps_to_rads(omega)
        } else {
            omega
        };

        let rates = config.broadcast.engine().compute(omega, &geometry);
        Ok(BroadcastMessage::new(rates, config.broadcast.interval()))
    }
}
