use super::{require_finite, require_positive, STANDARD_GRAVITY};
use crate::error::SimulationResult;
use crate::traits::VectorField;
use serde::{Deserialize, Serialize};

/// Cyclist pedalling at constant power against air drag `k v²`, optionally
/// up a slope of `slope` radians. State `[x, v]`.
///
/// The propulsive term `P / (m v)` is singular at rest, so no acceleration
/// is applied while `v <= 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoweredRider {
    pub power: f64,
    pub mass: f64,
    pub drag_coefficient: f64,
    #[serde(default)]
    pub slope: f64,
    #[serde(default = "default_gravity")]
    pub g: f64,
}

fn default_gravity() -> f64 {
    STANDARD_GRAVITY
}

impl PoweredRider {
    pub fn new(power: f64, mass: f64, drag_coefficient: f64) -> SimulationResult<Self> {
        Ok(Self {
            power: require_positive("Power", power)?,
            mass: require_positive("Mass", mass)?,
            drag_coefficient: require_positive("Drag coefficient", drag_coefficient)?,
            slope: 0.0,
            g: STANDARD_GRAVITY,
        })
    }

    pub fn on_slope(mut self, slope_radians: f64) -> SimulationResult<Self> {
        self.slope = require_finite("Slope", slope_radians)?;
        Ok(self)
    }

    pub fn acceleration(&self, v: f64) -> f64 {
        if v <= 0.0 {
            return 0.0;
        }
        self.power / (self.mass * v)
            - self.drag_coefficient / self.mass * v * v
            - self.g * self.slope.sin()
    }

    /// Flat-road terminal speed `(P / k)^(1/3)`.
    pub fn flat_terminal_speed(&self) -> f64 {
        (self.power / self.drag_coefficient).cbrt()
    }

    pub fn drag_power(&self, state: &[f64]) -> f64 {
        let v = state[1];
        -self.drag_coefficient * v * v * v
    }
}

impl VectorField<f64> for PoweredRider {
    fn dimension(&self) -> usize {
        2
    }

    fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
        out[0] = x[1];
        out[1] = self.acceleration(x[1]);
    }
}
