// Harvested-energy estimate from the rate stream

use crate::message::BroadcastMessage;

pub const DEFAULT_CAPACITY_KWH: f64 = 0.15;
pub const DEFAULT_RATE_FLOOR: f32 = 1.0;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Integrates PTO rates (read as kW) over the nominal interval into a
/// capped battery charge.
///
/// Rates below `rate_floor` are too small to drive a generator and count as
/// zero.
#[derive(Clone, Debug, PartialEq)]
pub struct EnergyMeter {
    capacity_kwh: f64,
    rate_floor: f32,
    charge_kwh: f64,
}

impl Default for EnergyMeter {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY_KWH, DEFAULT_RATE_FLOOR)
    }
}

impl EnergyMeter {
    pub fn new(capacity_kwh: f64, rate_floor: f32) -> Self {
        Self {
            capacity_kwh,
            rate_floor,
            charge_kwh: 0.0,
        }
    }

    /// Power (kW) that counts toward charging for one message.
    pub fn harvested_power(&self, message: &BroadcastMessage) -> f64 {
        message
            .rates
            .iter()
            .filter(|&rate| rate >= self.rate_floor)
            .map(f64::from)
            .sum()
    }

    /// Add one message's contribution and return the new charge.
    pub fn record(&mut self, message: &BroadcastMessage) -> f64 {
        let energy = self.harvested_power(message) * f64::from(message.dt) / SECONDS_PER_HOUR;
        self.charge_kwh = (self.charge_kwh + energy).min(self.capacity_kwh);
        self.charge_kwh
    }

    pub fn charge_kwh(&self) -> f64 {
        self.charge_kwh
    }

    pub fn capacity_kwh(&self) -> f64 {
        self.capacity_kwh
    }

    /// Charge as a fraction of capacity in `0.0..=1.0`.
    pub fn level(&self) -> f64 {
        if self.capacity_kwh > 0.0 {
            (self.charge_kwh / self.capacity_kwh).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn reset(&mut self) {
        self.charge_kwh = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics::RateVector;

    fn message(rates: [f32; 3]) -> BroadcastMessage {
        BroadcastMessage {
            rates: RateVector(rates),
            dt: 0.1,
        }
    }

    #[test]
    fn ignores_rates_below_floor() {
        let meter = EnergyMeter::default();
        assert_eq!(meter.harvested_power(&message([0.99, 0.5, 0.0])), 0.0);
        assert_eq!(meter.harvested_power(&message([1.0, 2.0, 0.5])), 3.0);
    }

    #[test]
    fn integrates_over_nominal_interval() {
        let mut meter = EnergyMeter::new(10.0, 1.0);
        let charge = meter.record(&message([3.6, 0.0, 0.0]));
        let expected = f64::from(3.6f32) * f64::from(0.1f32) / 3600.0;
        assert!((charge - expected).abs() < 1e-12);
        assert!(meter.level() > 0.0);
    }

    #[test]
    fn charge_is_capped() {
        let mut meter = EnergyMeter::new(0.0001, 1.0);
        for _ in 0..10 {
            meter.record(&message([5.0, 5.0, 5.0]));
        }
        assert_eq!(meter.charge_kwh(), 0.0001);
        assert_eq!(meter.level(), 1.0);

        meter.reset();
        assert_eq!(meter.charge_kwh(), 0.0);
        assert_eq!(meter.level(), 0.0);
    }
}
