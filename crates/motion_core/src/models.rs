pub mod ballistics;
pub mod chaos;
pub mod contact;
pub mod oscillators;
pub mod orbits;
pub mod rider;

pub use ballistics::{Drag, FallingBody, Magnus, Projectile};
pub use chaos::Lorenz;
pub use contact::ContactChain;
pub use oscillators::{CoupledChain, Oscillator, Pendulum};
pub use orbits::CentralGravity;
pub use rider::PoweredRider;

use crate::error::{SimulationError, SimulationResult};

/// Standard gravity used by the coursework models, m/s².
pub const STANDARD_GRAVITY: f64 = 9.81;

pub(crate) fn require_positive(name: &str, value: f64) -> SimulationResult<f64> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(SimulationError::invalid(format!(
            "{name} must be positive and finite, got {value}."
        )))
    }
}

pub(crate) fn require_finite(name: &str, value: f64) -> SimulationResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SimulationError::invalid(format!(
            "{name} must be finite, got {value}."
        )))
    }
}
