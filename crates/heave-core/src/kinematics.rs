// Angular velocity -> PTO extension rate

use crate::{
    geometry::{PTO_COUNT, RigidBodyGeometry},
    vector::Vec3,
};
use serde::{Deserialize, Serialize};

/// Default gyro deadband in rad/s.
pub const DEFAULT_DEADBAND: f32 = 0.005;

/// Non-negative extension rate per PTO, in configuration order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateVector(pub [f32; PTO_COUNT]);

impl RateVector {
    pub const ZERO: Self = Self([0.0; PTO_COUNT]);

    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.0.iter().copied()
    }
}

impl std::ops::Index<usize> for RateVector {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        &self.0[index]
    }
}

/// Maps a body-frame angular velocity onto each PTO's line of action.
///
/// Only roll and pitch contribute: the yaw component is discarded. Each
/// PTO's rate is the projection of the mount point's linear velocity
/// (`omega × r`) onto the unit direction toward its anchor. Retraction is
/// reported as zero and a projection that overflows saturates at
/// `f32::MAX`, so every rate is finite.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KinematicEngine {
    deadband: f32,
}

impl Default for KinematicEngine {
    fn default() -> Self {
        Self::new(DEFAULT_DEADBAND)
    }
}

impl KinematicEngine {
    pub fn new(deadband: f32) -> Self {
        Self { deadband }
    }

    pub fn deadband(&self) -> f32 {
        self.deadband
    }

    /// Angular velocity as the engine sees it after yaw removal and deadband.
    ///
    /// Non-finite components are zeroed first so a corrupt sample can never
    /// produce a NaN rate.
    pub fn condition(&self, omega: Vec3) -> Vec3 {
        let omega = omega.map(|c| if c.is_finite() { c } else { 0.0 });
        let omega = Vec3 { z: 0.0, ..omega };
        omega.map(|c| if c.abs() < self.deadband { 0.0 } else { c })
    }

    pub fn compute(&self, omega: Vec3, geometry: &RigidBodyGeometry) -> RateVector {
        let omega = self.condition(omega);
        let mut rates = [0.0; PTO_COUNT];
        for (rate, line) in rates.iter_mut().zip(geometry.lines()) {
            let projected = omega.cross(line.mount()).dot(line.direction());
            // also folds -0.0 and NaN into 0.0
            *rate = if projected > 0.0 {
                projected.min(f32::MAX)
            } else {
                0.0
            };
        }
        RateVector(rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        geometry::{PtoConfig, default_ptos},
        message::BroadcastMessage,
    };

    /// PTO 1 mounted at (5,0,0) pulling toward (10,0,-10).
    fn single_pto_geometry() -> RigidBodyGeometry {
        let mut ptos = default_ptos();
        ptos[0] = PtoConfig::new(
            "front",
            Vec3::new(5.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, -10.0),
        );
        RigidBodyGeometry::new(ptos).unwrap()
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-3,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn pitch_extends_front_pto() {
        let rates = KinematicEngine::default()
            .compute(Vec3::new(0.0, 1.0, 0.0), &single_pto_geometry());
        // (0,0,-5) · (0.4472, 0, -0.8944)
        assert_close(rates[0], 4.472);
        assert_eq!(rates[1], 0.0);
        assert_eq!(rates[2], 0.0);
    }

    #[test]
    fn reverse_pitch_extends_rear_ptos() {
        let rates = KinematicEngine::default()
            .compute(Vec3::new(0.0, -1.0, 0.0), &RigidBodyGeometry::default());
        assert_eq!(rates[0], 0.0);
        // 50 / sqrt(131.25)
        assert_close(rates[1], 4.364);
        assert_close(rates[2], 4.364);
    }

    #[test]
    fn roll_splits_rear_ptos() {
        let geometry = RigidBodyGeometry::default();
        let engine = KinematicEngine::default();

        let left = engine.compute(Vec3::new(1.0, 0.0, 0.0), &geometry);
        let right = engine.compute(Vec3::new(-1.0, 0.0, 0.0), &geometry);
        assert_eq!(left[0], 0.0);
        assert_eq!(right[0], 0.0);
        assert!(left[1] > 0.0 || left[2] > 0.0);
        assert_eq!(left[1], right[2]);
        assert_eq!(left[2], right[1]);
    }

    #[test]
    fn yaw_is_ignored() {
        let geometry = RigidBodyGeometry::default();
        let engine = KinematicEngine::default();
        for k in [-100.0, -1.0, 0.5, 3.0, 1e6] {
            let rates = engine.compute(Vec3::new(0.0, 0.0, k), &geometry);
            assert_eq!(rates, RateVector::ZERO);
            assert!(rates.iter().all(|r| r.is_sign_positive()));
        }
    }

    #[test]
    fn deadband_suppresses_small_rates() {
        let rates = KinematicEngine::default()
            .compute(Vec3::new(0.003, 0.003, 0.0), &RigidBodyGeometry::default());
        assert_eq!(rates, RateVector::ZERO);
    }

    #[test]
    fn deadband_is_per_component() {
        let engine = KinematicEngine::default();
        let conditioned = engine.condition(Vec3::new(0.004, -0.2, 7.0));
        assert_eq!(conditioned, Vec3::new(0.0, -0.2, 0.0));
        assert_eq!(
            engine.condition(Vec3::new(-0.005, 0.005, 0.0)),
            Vec3::new(-0.005, 0.005, 0.0)
        );
    }

    #[test]
    fn degenerate_pto_never_moves() {
        let mut ptos = default_ptos();
        ptos[0].anchor = ptos[0].r;
        let geometry = RigidBodyGeometry::new(ptos).unwrap();
        let engine = KinematicEngine::default();
        for omega in [
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, -1.0, 0.0),
            Vec3::new(2.0, 3.0, 0.0),
            Vec3::new(-7.5, 0.25, 1.0),
        ] {
            assert_eq!(engine.compute(omega, &geometry)[0], 0.0);
        }
    }

    #[test]
    fn rates_are_never_negative() {
        let geometry = RigidBodyGeometry::default();
        let engine = KinematicEngine::default();
        let steps = [-3.0, -0.5, -0.01, 0.0, 0.004, 0.01, 0.5, 3.0];
        for x in steps {
            for y in steps {
                for z in steps {
                    let rates = engine.compute(Vec3::new(x, y, z), &geometry);
                    assert!(rates.iter().all(|r| r >= 0.0), "{rates:?}");
                }
            }
        }
    }

    #[test]
    fn non_finite_components_are_zeroed() {
        let geometry = single_pto_geometry();
        let engine = KinematicEngine::default();

        let rates = engine.compute(Vec3::new(f32::NAN, 1.0, 0.0), &geometry);
        assert_close(rates[0], 4.472);
        assert!(rates.iter().all(f32::is_finite));

        let rates = engine.compute(
            Vec3::new(f32::INFINITY, f32::NEG_INFINITY, f32::NAN),
            &geometry,
        );
        assert_eq!(rates, RateVector::ZERO);
    }

    #[test]
    fn overflowing_projection_saturates() {
        let engine = KinematicEngine::default();
        let rates = engine.compute(Vec3::new(0.0, 1e38, 0.0), &RigidBodyGeometry::default());
        assert_eq!(rates, RateVector([f32::MAX, 0.0, 0.0]));

        let far = RigidBodyGeometry::new([
            PtoConfig::new("a", Vec3::new(3e38, 0.0, 0.0), Vec3::new(3e38, 0.0, -3e38)),
            PtoConfig::new("b", Vec3::new(-3e38, 0.0, 0.0), Vec3::new(-3e38, 0.0, -3e38)),
            PtoConfig::new("c", Vec3::new(0.0, 3e38, 0.0), Vec3::new(0.0, 3e38, -3e38)),
        ])
        .unwrap();
        for omega in [Vec3::new(0.0, 3.0, 0.0), Vec3::new(-3.0, -3.0, 0.0)] {
            let rates = engine.compute(omega, &far);
            assert!(rates.iter().all(|r| r.is_finite() && r >= 0.0), "{rates:?}");
        }

        // saturated rates still survive the wire
        let message = BroadcastMessage::new(rates, std::time::Duration::from_millis(100));
        let decoded = BroadcastMessage::from_json(&message.to_json().unwrap()).unwrap();
        assert_eq!(decoded.rates, rates);
    }

    #[test]
    fn compute_is_pure() {
        let geometry = RigidBodyGeometry::default();
        let engine = KinematicEngine::default();
        let omega = Vec3::new(0.37, -1.21, 0.4);
        let a = engine.compute(omega, &geometry);
        let b = engine.compute(omega, &geometry);
        for (a, b) in a.iter().zip(b.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }
}
