use anyhow::{Context, Result};
use heave_core::{
    KinematicEngine, PtoConfig, RigidBodyGeometry,
    energy::{DEFAULT_CAPACITY_KWH, DEFAULT_RATE_FLOOR, EnergyMeter},
    geometry::default_ptos,
    kinematics::DEFAULT_DEADBAND,
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

/// Main configuration for the Heave service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Broadcast scheduling
    #[serde(default)]
    pub broadcast: BroadcastConfig,

    /// Gyro sample source
    #[serde(default)]
    pub sensor: SensorConfig,

    /// Dashboard energy estimate
    #[serde(default)]
    pub energy: EnergyConfig,

    /// Exactly three PTOs, in broadcast order
    #[serde(default = "default_pto_list")]
    pub ptos: Vec<PtoConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            broadcast: BroadcastConfig::default(),
            sensor: SensorConfig::default(),
            energy: EnergyConfig::default(),
            ptos: default_pto_list(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to bind the server to
    #[serde(default = "default_port")]
    pub port: u16,

    /// Hostname/address to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Directory of dashboard files served at `/`
    pub static_dir: Option<String>,

    /// Messages buffered per subscriber before it starts skipping
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            static_dir: None,
            channel_capacity: default_channel_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    /// Minimum time between broadcasts
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Gyro deadband in rad/s
    #[serde(default = "default_deadband")]
    pub deadband: f32,

    /// Sleep between scheduler polls
    #[serde(default = "default_poll_ms")]
    pub poll_ms: u64,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            deadband: default_deadband(),
            poll_ms: default_poll_ms(),
        }
    }
}

impl BroadcastConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }

    pub fn engine(&self) -> KinematicEngine {
        KinematicEngine::new(self.deadband)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Simulated,
    Replay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    #[serde(default = "default_sensor_kind")]
    pub kind: SensorKind,

    /// Bring-up attempts before giving up
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Peak roll/pitch rate of the simulated swell, in deg/s
    #[serde(default = "default_amplitude_dps")]
    pub amplitude_dps: f32,

    /// Swell period in seconds
    #[serde(default = "default_period_s")]
    pub period_s: f32,

    /// Uniform noise added to each simulated axis, in deg/s
    #[serde(default)]
    pub noise_dps: f32,

    #[serde(default)]
    pub seed: u64,

    /// Recorded samples for `kind = "replay"`
    pub path: Option<String>,

    /// Restart the recording when it runs out
    #[serde(default)]
    pub looped: bool,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            kind: default_sensor_kind(),
            attempts: default_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            amplitude_dps: default_amplitude_dps(),
            period_s: default_period_s(),
            noise_dps: 0.0,
            seed: 0,
            path: None,
            looped: false,
        }
    }
}

impl SensorConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyConfig {
    #[serde(default = "default_capacity_kwh")]
    pub capacity_kwh: f64,

    /// Rates below this are not counted
    #[serde(default = "default_rate_floor")]
    pub rate_floor: f32,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            capacity_kwh: default_capacity_kwh(),
            rate_floor: default_rate_floor(),
        }
    }
}

impl EnergyConfig {
    pub fn meter(&self) -> EnergyMeter {
        EnergyMeter::new(self.capacity_kwh, self.rate_floor)
    }
}

fn default_port() -> u16 {
    3000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_channel_capacity() -> usize {
    16
}

fn default_interval_ms() -> u64 {
    100
}

fn default_deadband() -> f32 {
    DEFAULT_DEADBAND
}

fn default_poll_ms() -> u64 {
    1
}

fn default_sensor_kind() -> SensorKind {
    SensorKind::Simulated
}

fn default_attempts() -> u32 {
    10
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_amplitude_dps() -> f32 {
    30.0
}

fn default_period_s() -> f32 {
    4.0
}

fn default_capacity_kwh() -> f64 {
    DEFAULT_CAPACITY_KWH
}

fn default_rate_floor() -> f32 {
    DEFAULT_RATE_FLOOR
}

fn default_pto_list() -> Vec<PtoConfig> {
    default_ptos().to_vec()
}

impl Config {
    /// Load configuration from a file, auto-detecting TOML or JSON format
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => Self::from_toml(&content),
            Some("json") => Self::from_json(&content),
            _ => Self::from_toml(&content).or_else(|_| Self::from_json(&content)),
        }
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("failed to parse config as TOML")
    }

    /// Parse configuration from JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("failed to parse config as JSON")
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.broadcast.interval_ms == 0 {
            anyhow::bail!("broadcast.interval_ms must be positive");
        }
        if !(self.broadcast.deadband.is_finite() && self.broadcast.deadband >= 0.0) {
            anyhow::bail!("broadcast.deadband must be a non-negative number");
        }
        if self.server.channel_capacity == 0 {
            anyhow::bail!("server.channel_capacity must be positive");
        }
        if self.sensor.attempts == 0 {
            anyhow::bail!("sensor.attempts must be at least 1");
        }
        match self.sensor.kind {
            SensorKind::Simulated => {
                if !(self.sensor.period_s.is_finite() && self.sensor.period_s > 0.0) {
                    anyhow::bail!("sensor.period_s must be positive");
                }
            }
            SensorKind::Replay => {
                if self.sensor.path.as_deref().is_none_or(str::is_empty) {
                    anyhow::bail!("sensor.path is required for replay sensors");
                }
            }
        }
        if self.energy.capacity_kwh.is_nan() || self.energy.capacity_kwh <= 0.0 {
            anyhow::bail!("energy.capacity_kwh must be positive");
        }

        self.geometry()?;

        Ok(())
    }

    /// Build the PTO geometry described by `ptos`
    pub fn geometry(&self) -> Result<RigidBodyGeometry> {
        RigidBodyGeometry::try_from(self.ptos.clone()).context("invalid PTO geometry")
    }
}
