//! Mounting geometry for the three PTOs.

use crate::vector::{MIN_NORM, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of PTOs on the body.
pub const PTO_COUNT: usize = 3;

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("expected exactly {PTO_COUNT} PTOs, got {count}")]
    WrongCount { count: usize },
    #[error("PTO {index} has an empty name")]
    EmptyName { index: usize },
    #[error("PTO {name:?} has a non-finite {field} coordinate")]
    NonFinite { name: String, field: &'static str },
}

pub type Result<T, E = GeometryError> = std::result::Result<T, E>;

/// One actuator: where it is mounted on the body and the anchor it pulls toward.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PtoConfig {
    pub name: String,
    /// Mounting point in the body frame
    pub r: Vec3,
    /// Anchor point defining the line of action
    pub anchor: Vec3,
}

impl PtoConfig {
    pub fn new(name: impl Into<String>, r: Vec3, anchor: Vec3) -> Self {
        Self {
            name: name.into(),
            r,
            anchor,
        }
    }

    /// Unit vector from the mount toward the anchor, zero when they coincide.
    pub fn direction(&self) -> Vec3 {
        (self.anchor - self.r).normalize_or_zero()
    }

    /// Mount and anchor are too close to define a line of action.
    pub fn is_degenerate(&self) -> bool {
        (self.anchor - self.r).norm() <= MIN_NORM
    }
}

/// The geometry of the device as shipped.
pub fn default_ptos() -> [PtoConfig; PTO_COUNT] {
    [
        PtoConfig::new(
            "PTO 1",
            Vec3::new(5.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, -10.0),
        ),
        PtoConfig::new(
            "PTO 2",
            Vec3::new(-5.0, 2.5, 0.0),
            Vec3::new(-10.0, 5.0, -10.0),
        ),
        PtoConfig::new(
            "PTO 3",
            Vec3::new(-5.0, -2.5, 0.0),
            Vec3::new(-10.0, -5.0, -10.0),
        ),
    ]
}

/// A PTO with its line of action resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct ActuatorLine {
    config: PtoConfig,
    direction: Vec3,
}

impl ActuatorLine {
    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn mount(&self) -> Vec3 {
        self.config.r
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }
}

/// Immutable description of the three actuators.
#[derive(Clone, Debug, PartialEq)]
pub struct RigidBodyGeometry {
    lines: [ActuatorLine; PTO_COUNT],
}

impl RigidBodyGeometry {
    pub fn new(ptos: [PtoConfig; PTO_COUNT]) -> Result<Self> {
        for (index, pto) in ptos.iter().enumerate() {
            if pto.name.trim().is_empty() {
                return Err(GeometryError::EmptyName { index });
            }
            for (field, v) in [("r", pto.r), ("anchor", pto.anchor)] {
                if !v.is_finite() {
                    return Err(GeometryError::NonFinite {
                        name: pto.name.clone(),
                        field,
                    });
                }
            }
        }

        let lines = ptos.map(|config| ActuatorLine {
            direction: config.direction(),
            config,
        });
        Ok(Self { lines })
    }

    pub fn lines(&self) -> &[ActuatorLine; PTO_COUNT] {
        &self.lines
    }

    pub fn names(&self) -> [&str; PTO_COUNT] {
        [
            self.lines[0].name(),
            self.lines[1].name(),
            self.lines[2].name(),
        ]
    }

    /// PTOs whose rate will always be zero.
    pub fn degenerate(&self) -> impl Iterator<Item = &ActuatorLine> {
        self.lines.iter().filter(|line| line.config.is_degenerate())
    }
}

impl Default for RigidBodyGeometry {
    fn default() -> Self {
        let lines = default_ptos().map(|config| ActuatorLine {
            direction: config.direction(),
            config,
        });
        Self { lines }
    }
}

impl TryFrom<Vec<PtoConfig>> for RigidBodyGeometry {
    type Error = GeometryError;

    fn try_from(ptos: Vec<PtoConfig>) -> Result<Self> {
        let count = ptos.len();
        let ptos: [PtoConfig; PTO_COUNT] = ptos
            .try_into()
            .map_err(|_| GeometryError::WrongCount { count })?;
        Self::new(ptos)
    }
}
