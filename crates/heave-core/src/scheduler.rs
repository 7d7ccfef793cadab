//! Fixed-rate broadcast scheduling.
//!
//! [`BroadcastScheduler::tick`] is polled from a cooperative loop. Each call
//! either does nothing or yields exactly one [`BroadcastMessage`]. The
//! scheduler never measures elapsed time for the payload; `dt` is always the
//! nominal interval.

use crate::{
    geometry::RigidBodyGeometry,
    io::SampleSource,
    kinematics::KinematicEngine,
    message::{BroadcastMessage, nominal_dt},
};
use std::time::{Duration, Instant};

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

pub struct BroadcastScheduler<S: SampleSource> {
    interval: Duration,
    dt: f32,
    engine: KinematicEngine,
    geometry: RigidBodyGeometry,
    last_sent: Option<Instant>,
    source: S,
}

impl<S: SampleSource> BroadcastScheduler<S> {
    pub fn new(
        geometry: RigidBodyGeometry,
        engine: KinematicEngine,
        interval: Duration,
        source: S,
    ) -> Self {
        Self {
            interval,
            dt: nominal_dt(interval),
            engine,
            geometry,
            last_sent: None,
            source,
        }
    }

    /// Scheduler with the default engine and a 100 ms interval.
    pub fn with_defaults(geometry: RigidBodyGeometry, source: S) -> Self {
        Self::new(geometry, KinematicEngine::default(), DEFAULT_INTERVAL, source)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn geometry(&self) -> &RigidBodyGeometry {
        &self.geometry
    }

    pub fn engine(&self) -> &KinematicEngine {
        &self.engine
    }

    /// When the throttle gate was last passed.
    pub fn last_sent(&self) -> Option<Instant> {
        self.last_sent
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Whether a tick at `now` would pass the throttle gate.
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_sent {
            // an earlier `now` saturates to zero elapsed
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        }
    }

    pub fn tick(&mut self, now: Instant) -> Option<BroadcastMessage> {
        if !self.is_due(now) {
            return None;
        }
        // The window is consumed before readiness is checked, so a
        // not-ready sensor is also only polled once per interval.
        self.last_sent = Some(now);

        if !self.source.ready() {
            return None;
        }
        let omega = self.source.read();
        let rates = self.engine.compute(omega, &self.geometry);
        Some(BroadcastMessage { rates, dt: self.dt })
    }
}
