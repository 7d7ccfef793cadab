//! Core telemetry logic shared across Heave components.
//!
//! Converts gyroscope angular velocity into per-PTO extension rates and
//! schedules fixed-rate broadcasts. This crate performs no I/O; samples
//! come in through [`io::SampleSource`] and payloads leave through
//! [`io::Sink`].

pub mod energy;
pub mod geometry;
pub mod io;
pub mod kinematics;
pub mod message;
pub mod scheduler;
pub mod vector;

pub use geometry::{GeometryError, PtoConfig, RigidBodyGeometry};
pub use kinematics::{KinematicEngine, RateVector};
pub use message::BroadcastMessage;
pub use scheduler::BroadcastScheduler;
pub use vector::Vec3;
