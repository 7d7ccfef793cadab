//! The cooperative loop that drives the scheduler.
//!
//! One pump runs on its own thread for the lifetime of the process. It is
//! the only owner of the scheduler; the server only ever sees the
//! [`Status`] snapshot.

use heave_core::{
    BroadcastMessage, BroadcastScheduler,
    energy::EnergyMeter,
    io::{SampleSource, Sink},
};
use serde::Serialize;
use std::{
    sync::{Arc, RwLock},
    thread,
    time::{Duration, Instant},
};

/// Snapshot of the broadcast stream for `/status`.
#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub started_at: String,
    pub names: Vec<String>,
    pub messages_sent: u64,
    pub last: Option<BroadcastMessage>,
    pub energy_kwh: f64,
    pub battery_level: f64,
    /// Set by the server, cleared by the pump once the meter is emptied.
    #[serde(skip)]
    pub reset_requested: bool,
}

impl Status {
    pub fn new(names: Vec<String>) -> Self {
        Self {
            started_at: chrono::Utc::now().to_rfc3339(),
            names,
            messages_sent: 0,
            last: None,
            energy_kwh: 0.0,
            battery_level: 0.0,
            reset_requested: false,
        }
    }

    /// Ask the pump to empty the energy meter. The snapshot reads zero
    /// immediately.
    pub fn request_energy_reset(&mut self) {
        self.reset_requested = true;
        self.energy_kwh = 0.0;
        self.battery_level = 0.0;
    }
}

pub type SharedStatus = Arc<RwLock<Status>>;

pub struct Pump<S: SampleSource, K: Sink> {
    scheduler: BroadcastScheduler<S>,
    sink: K,
    meter: EnergyMeter,
    status: SharedStatus,
}

impl<S: SampleSource, K: Sink> Pump<S, K> {
    pub fn new(
        scheduler: BroadcastScheduler<S>,
        sink: K,
        meter: EnergyMeter,
        status: SharedStatus,
    ) -> Self {
        Self {
            scheduler,
            sink,
            meter,
            status,
        }
    }

    pub fn scheduler(&self) -> &BroadcastScheduler<S> {
        &self.scheduler
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn meter(&self) -> &EnergyMeter {
        &self.meter
    }

    /// One loop iteration. Returns the message if one was published.
    pub fn poll(&mut self, now: Instant) -> Option<BroadcastMessage> {
        self.apply_energy_reset();
        let message = self.scheduler.tick(now)?;

        let payload = match message.to_json() {
            Ok(payload) => payload,
            Err(err) => {
                tracing::error!("failed to encode broadcast: {err}");
                return None;
            }
        };
        self.sink.send(payload.as_bytes());
        self.meter.record(&message);
        tracing::trace!(%payload, "broadcast");

        match self.status.write() {
            Ok(mut status) => {
                status.messages_sent += 1;
                status.last = Some(message);
                status.energy_kwh = self.meter.charge_kwh();
                status.battery_level = self.meter.level();
            }
            Err(_) => tracing::warn!("status lock poisoned, snapshot not updated"),
        }

        Some(message)
    }

    fn apply_energy_reset(&mut self) {
        let requested = self
            .status
            .read()
            .map(|status| status.reset_requested)
            .unwrap_or(false);
        if !requested {
            return;
        }
        if let Ok(mut status) = self.status.write() {
            self.meter.reset();
            status.reset_requested = false;
            status.energy_kwh = 0.0;
            status.battery_level = 0.0;
            tracing::info!("energy meter reset");
        }
    }

    /// Poll forever, sleeping `poll_period` between iterations.
    pub fn run(mut self, poll_period: Duration) {
        tracing::info!(
            interval_ms = self.scheduler.interval().as_millis() as u64,
            "broadcast loop running"
        );
        loop {
            self.poll(Instant::now());
            thread::sleep(poll_period);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heave_core::{
        RigidBodyGeometry, Vec3,
        io::{RecordingSink, ScriptedSource},
    };

    fn pump(source: ScriptedSource) -> Pump<ScriptedSource, RecordingSink> {
        let scheduler = BroadcastScheduler::with_defaults(RigidBodyGeometry::default(), source);
        let status = Arc::new(RwLock::new(Status::new(vec![])));
        Pump::new(
            scheduler,
            RecordingSink::default(),
            EnergyMeter::new(1.0, 1.0),
            status,
        )
    }

    #[test]
    fn publishes_encoded_message() {
        let mut pump = pump(ScriptedSource::constant(Vec3::new(0.0, 1.0, 0.0), 4));
        let t0 = Instant::now();
        let message = pump.poll(t0).unwrap();
        assert!(pump.poll(t0 + Duration::from_millis(10)).is_none());

        let texts: Vec<_> = pump.sink().texts().collect();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].starts_with(r#"{"rates":["#));
        let decoded = BroadcastMessage::from_json(texts[0]).unwrap();
        assert_eq!(decoded.dt, 0.1);
        for (a, b) in decoded.rates.iter().zip(message.rates.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn skipped_tick_publishes_nothing() {
        let mut pump = pump(ScriptedSource::new([None]));
        assert!(pump.poll(Instant::now()).is_none());
        assert!(pump.sink().payloads.is_empty());
        assert_eq!(pump.status.read().unwrap().messages_sent, 0);
    }

    #[test]
    fn status_tracks_stream() {
        let mut pump = pump(ScriptedSource::constant(Vec3::new(0.0, 1.0, 0.0), 3));
        let t0 = Instant::now();
        for i in 0..3 {
            pump.poll(t0 + Duration::from_millis(100 * i));
        }
        let status = pump.status.read().unwrap();
        assert_eq!(status.messages_sent, 3);
        assert!(status.last.is_some());
        assert!(status.energy_kwh > 0.0);
        assert_eq!(status.energy_kwh, pump.meter().charge_kwh());
    }

    #[test]
    fn energy_reset_empties_meter() {
        let mut pump = pump(ScriptedSource::constant(Vec3::new(0.0, 1.0, 0.0), 3));
        let t0 = Instant::now();
        pump.poll(t0);
        assert!(pump.meter().charge_kwh() > 0.0);

        pump.status.write().unwrap().request_energy_reset();
        assert!(pump.poll(t0 + Duration::from_millis(10)).is_none());
        assert_eq!(pump.meter().charge_kwh(), 0.0);
        {
            let status = pump.status.read().unwrap();
            assert!(!status.reset_requested);
            assert_eq!(status.energy_kwh, 0.0);
            assert_eq!(status.messages_sent, 1);
        }

        // charging resumes from empty
        pump.poll(t0 + Duration::from_millis(100));
        let charge = pump.meter().charge_kwh();
        assert!(charge > 0.0);
        assert_eq!(pump.status.read().unwrap().energy_kwh, charge);
    }
}
