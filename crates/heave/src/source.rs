//! Production sample sources
//!
//! Gyros report degrees per second; every source here converts to rad/s
//! before handing samples to the scheduler.

use crate::config::{SensorConfig, SensorKind};
use anyhow::{Context, Result};
use heave_core::{Vec3, io::SampleSource};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::{
    fs,
    path::Path,
    thread,
    time::{Duration, Instant},
};

/// Convert a deg/s reading into rad/s.
pub fn dps_to_rads(v: Vec3) -> Vec3 {
    v * (std::f32::consts::PI / 180.0)
}

/// Open a sensor, retrying up to `attempts` times with `delay` between tries.
pub fn bring_up<T>(
    attempts: u32,
    delay: Duration,
    mut open: impl FnMut(u32) -> Result<T>,
) -> Result<T> {
    let mut last_err = None;
    for attempt in 1..=attempts {
        match open(attempt) {
            Ok(sensor) => {
                tracing::info!(attempt, "sensor connected");
                return Ok(sensor);
            }
            Err(err) => {
                tracing::warn!(attempt, attempts, "sensor not detected, retrying: {err:#}");
                last_err = Some(err);
                if attempt < attempts {
                    thread::sleep(delay);
                }
            }
        }
    }
    let err = last_err.unwrap_or_else(|| anyhow::anyhow!("no bring-up attempts configured"));
    Err(err.context(format!("sensor init failed after {attempts} attempts")))
}

/// Open the source described by the `[sensor]` section.
pub fn open(config: &SensorConfig) -> Result<Box<dyn SampleSource + Send>> {
    match config.kind {
        SensorKind::Simulated => Ok(Box::new(SimulatedGyro::from_config(config))),
        SensorKind::Replay => {
            let path = config
                .path
                .as_deref()
                .context("sensor.path is required for replay sensors")?;
            Ok(Box::new(ReplaySource::from_file(path, config.looped)?))
        }
    }
}

/// Synthetic swell: roll and pitch oscillate a quarter period apart.
pub struct SimulatedGyro {
    amplitude_dps: f32,
    period_s: f32,
    noise_dps: f32,
    rng: StdRng,
    clock: Box<dyn FnMut() -> Duration + Send>,
}

impl SimulatedGyro {
    pub fn new(amplitude_dps: f32, period_s: f32, noise_dps: f32, seed: u64) -> Self {
        let epoch = Instant::now();
        Self {
            amplitude_dps,
            period_s,
            noise_dps,
            rng: StdRng::seed_from_u64(seed),
            clock: Box::new(move || epoch.elapsed()),
        }
    }

    pub fn from_config(config: &SensorConfig) -> Self {
        Self::new(
            config.amplitude_dps,
            config.period_s,
            config.noise_dps,
            config.seed,
        )
    }

    /// Drive the phase from `clock` instead of wall time.
    pub fn with_clock(mut self, clock: impl FnMut() -> Duration + Send + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Reading in deg/s at `t` seconds into the run.
    pub fn sample_dps(&mut self, t: f32) -> Vec3 {
        let phase = std::f32::consts::TAU * t / self.period_s;
        let roll = self.amplitude_dps * phase.sin();
        let pitch = self.amplitude_dps * phase.cos();
        let mut v = Vec3::new(roll, pitch, 0.0);
        if self.noise_dps > 0.0 {
            let noise = self.noise_dps;
            v = v.map(|c| c + self.rng.random_range(-noise..=noise));
        }
        v
    }
}

impl SampleSource for SimulatedGyro {
    fn ready(&mut self) -> bool {
        true
    }

    fn read(&mut self) -> Vec3 {
        let t = (self.clock)().as_secs_f32();
        dps_to_rads(self.sample_dps(t))
    }
}

/// Recorded gyro samples, one `gx,gy,gz` line in deg/s per sample.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    samples: Vec<Vec3>,
    position: usize,
    looped: bool,
}

impl ReplaySource {
    pub fn new(samples: Vec<Vec3>, looped: bool) -> Self {
        Self {
            samples,
            position: 0,
            looped,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P, looped: bool) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read samples from {}", path.display()))?;
        let samples =
            parse_samples(&content).with_context(|| format!("in {}", path.display()))?;
        if samples.is_empty() {
            anyhow::bail!("{} contains no samples", path.display());
        }
        Ok(Self::new(samples, looped))
    }

    pub fn remaining(&self) -> usize {
        self.samples.len() - self.position
    }
}

impl SampleSource for ReplaySource {
    fn ready(&mut self) -> bool {
        if self.position == self.samples.len() && self.looped {
            self.position = 0;
        }
        self.position < self.samples.len()
    }

    fn read(&mut self) -> Vec3 {
        let Some(&sample) = self.samples.get(self.position) else {
            return Vec3::ZERO;
        };
        self.position += 1;
        dps_to_rads(sample)
    }
}

/// Parse `gx,gy,gz` lines. Blank lines and `#` comments are skipped.
pub fn parse_samples(content: &str) -> Result<Vec<Vec3>> {
    let mut samples = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let sample =
            parse_triplet(line).with_context(|| format!("bad sample on line {}", index + 1))?;
        samples.push(sample);
    }
    Ok(samples)
}

/// Parse `x,y,z` into a vector.
pub fn parse_triplet(s: &str) -> Result<Vec3> {
    let parts = s
        .split(',')
        .map(|p| {
            p.trim()
                .parse::<f32>()
                .with_context(|| format!("invalid number {:?}", p.trim()))
        })
        .collect::<Result<Vec<_>>>()?;
    let [x, y, z] = parts[..] else {
        anyhow::bail!("expected 3 comma-separated values, got {}", parts.len());
    };
    Ok(Vec3::new(x, y, z))
}
