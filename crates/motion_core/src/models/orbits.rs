use super::require_positive;
use crate::error::SimulationResult;
use crate::traits::VectorField;
use serde::{Deserialize, Serialize};

/// Planar motion around a fixed attracting mass. State `[x, y, vx, vy]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CentralGravity {
    /// Gravitational parameter `G M`.
    pub gm: f64,
}

impl CentralGravity {
    pub fn new(gm: f64) -> SimulationResult<Self> {
        Ok(Self {
            gm: require_positive("Gravitational parameter", gm)?,
        })
    }

    /// The Sun in astronomical units and years: `G M = 4π²`.
    pub fn solar() -> Self {
        Self {
            gm: 4.0 * std::f64::consts::PI * std::f64::consts::PI,
        }
    }

    pub fn radius(state: &[f64]) -> f64 {
        state[0].hypot(state[1])
    }

    /// Speed of a circular orbit at radius `r`.
    pub fn circular_speed(&self, r: f64) -> f64 {
        (self.gm / r).sqrt()
    }

    /// Energy per unit orbiting mass.
    pub fn specific_energy(&self, state: &[f64]) -> f64 {
        0.5 * (state[2] * state[2] + state[3] * state[3]) + self.potential_energy(1.0, state)
    }

    pub fn potential_energy(&self, mass: f64, state: &[f64]) -> f64 {
        -self.gm * mass / Self::radius(state)
    }

    /// z-component of angular momentum per unit mass.
    pub fn specific_angular_momentum(state: &[f64]) -> f64 {
        state[0] * state[3] - state[1] * state[2]
    }
}

impl VectorField<f64> for CentralGravity {
    fn dimension(&self) -> usize {
        4
    }

    fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
        let r = Self::radius(x);
        let k = -self.gm / (r * r * r);
        out[0] = x[2];
        out[1] = x[3];
        out[2] = k * x[0];
        out[3] = k * x[1];
    }
}

#[cfg(test)]
mod tests {
    use super::CentralGravity;
    use crate::traits::VectorField;
    use approx::assert_relative_eq;
    use std::f64::consts::TAU;

    #[test]
    fn earth_orbit_starts_circular() {
        let sun = CentralGravity::solar();
        assert_relative_eq!(sun.circular_speed(1.0), TAU, epsilon = 1e-12);
        let earth = [1.0, 0.0, 0.0, TAU];
        let rate = sun.evaluate(0.0, &earth);
        assert_relative_eq!(rate[2], -TAU * TAU, epsilon = 1e-12);
        assert_relative_eq!(sun.specific_energy(&earth), -0.5 * TAU * TAU, epsilon = 1e-12);
        assert_relative_eq!(CentralGravity::specific_angular_momentum(&earth), TAU);
        assert!(CentralGravity::new(0.0).is_err());
    }
}
