use super::require_finite;
use crate::error::SimulationResult;
use crate::traits::VectorField;
use serde::{Deserialize, Serialize};

/// Lorenz convection model. State `[x, y, z]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lorenz {
    pub sigma: f64,
    pub rho: f64,
    pub beta: f64,
}

impl Default for Lorenz {
    /// The classic chaotic parameters σ = 10, ρ = 28, β = 8/3.
    fn default() -> Self {
        Self {
            sigma: 10.0,
            rho: 28.0,
            beta: 8.0 / 3.0,
        }
    }
}

impl Lorenz {
    pub fn new(sigma: f64, rho: f64, beta: f64) -> SimulationResult<Self> {
        Ok(Self {
            sigma: require_finite("sigma", sigma)?,
            rho: require_finite("rho", rho)?,
            beta: require_finite("beta", beta)?,
        })
    }

    /// The two non-trivial fixed points `(±sqrt(β(ρ-1)), ±sqrt(β(ρ-1)), ρ-1)`,
    /// present only for `ρ > 1`.
    pub fn fixed_points(&self) -> Option<[[f64; 3]; 2]> {
        let r = self.beta * (self.rho - 1.0);
        if r <= 0.0 {
            return None;
        }
        let c = r.sqrt();
        let z = self.rho - 1.0;
        Some([[c, c, z], [-c, -c, z]])
    }
}

impl VectorField<f64> for Lorenz {
    fn dimension(&self) -> usize {
        3
    }

    fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
        out[0] = self.sigma * (x[1] - x[0]);
        out[1] = x[0] * (self.rho - x[2]) - x[1];
        out[2] = x[0] * x[1] - self.beta * x[2];
    }
}
