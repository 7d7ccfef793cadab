//! Wire message handed to subscribers.

use crate::kinematics::RateVector;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One broadcast: the rates plus the nominal scheduling interval.
///
/// Serialized as `{"rates":[r0,r1,r2],"dt":d}`. Field names and order are
/// relied on by the dashboard.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BroadcastMessage {
    pub rates: RateVector,
    /// Nominal interval in seconds, not the measured elapsed time
    pub dt: f32,
}

impl BroadcastMessage {
    pub fn new(rates: RateVector, interval: Duration) -> Self {
        Self {
            rates,
            dt: nominal_dt(interval),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }
}

/// Interval in seconds, derived from whole milliseconds.
pub fn nominal_dt(interval: Duration) -> f32 {
    interval.as_millis() as f32 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format() {
        let message = BroadcastMessage::new(
            RateVector([1.5, 0.0, 0.25]),
            Duration::from_millis(100),
        );
        insta::assert_snapshot!(message.to_json().unwrap(), @r#"{"rates":[1.5,0.0,0.25],"dt":0.1}"#);
    }

    #[test]
    fn nominal_dt_ignores_sub_millisecond_jitter() {
        assert_eq!(nominal_dt(Duration::from_millis(100)), 0.1);
        assert_eq!(nominal_dt(Duration::from_micros(100_400)), 0.1);
        assert_eq!(nominal_dt(Duration::from_millis(50)), 0.05);
    }

    #[test]
    fn parses_dashboard_payload() {
        let message = BroadcastMessage::from_json(r#"{"rates":[4.5,0,1],"dt":0.1}"#).unwrap();
        assert_eq!(message.rates, RateVector([4.5, 0.0, 1.0]));
        assert_eq!(message.dt, 0.1);
    }

    #[test]
    fn rejects_short_rate_arrays() {
        assert!(BroadcastMessage::from_json(r#"{"rates":[1.0,2.0],"dt":0.1}"#).is_err());
    }
}
