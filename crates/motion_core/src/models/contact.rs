//! Newton's cradle: spheres hanging from strings, touching through a stiff
//! power-law contact force.

use super::require_positive;
use crate::error::{SimulationError, SimulationResult};
use crate::traits::VectorField;
use serde::{Deserialize, Serialize};

/// `count` identical spheres of diameter `diameter`, each hung on a string of
/// length `string_length` with its rest position at `i * diameter`. Spheres
/// closer than one diameter repel with `k |x_{i+1} - x_i - d|^q`.
/// State `[x_0.., v_0..]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactChain {
    pub count: usize,
    pub diameter: f64,
    pub string_length: f64,
    pub mass: f64,
    pub g: f64,
    pub contact_stiffness: f64,
    pub contact_exponent: f64,
}

impl ContactChain {
    pub fn new(
        count: usize,
        diameter: f64,
        string_length: f64,
        mass: f64,
        g: f64,
    ) -> SimulationResult<Self> {
        if count == 0 {
            return Err(SimulationError::invalid("At least one sphere is required."));
        }
        Ok(Self {
            count,
            diameter: require_positive("Diameter", diameter)?,
            string_length: require_positive("String length", string_length)?,
            mass: require_positive("Mass", mass)?,
            g: require_positive("Gravity", g)?,
            contact_stiffness: 1e7,
            contact_exponent: 2.0,
        })
    }

    pub fn with_contact(mut self, stiffness: f64, exponent: f64) -> SimulationResult<Self> {
        self.contact_stiffness = require_positive("Contact stiffness", stiffness)?;
        self.contact_exponent = require_positive("Contact exponent", exponent)?;
        Ok(self)
    }

    pub fn rest_position(&self, i: usize) -> f64 {
        self.diameter * i as f64
    }

    /// Contact force magnitude for centre separation `gap`; zero once apart.
    pub fn contact_force(&self, gap: f64) -> f64 {
        if gap < self.diameter {
            self.contact_stiffness * (self.diameter - gap).powf(self.contact_exponent)
        } else {
            0.0
        }
    }

    /// Pendulum restoring potential plus stored contact energy.
    pub fn potential_energy(&self, state: &[f64]) -> f64 {
        let x = &state[..self.count];
        let swing: f64 = x
            .iter()
            .enumerate()
            .map(|(i, xi)| {
                let u = xi - self.rest_position(i);
                0.5 * self.mass * self.g / self.string_length * u * u
            })
            .sum();
        let q = self.contact_exponent;
        let squeeze: f64 = x
            .windows(2)
            .map(|pair| {
                let overlap = self.diameter - (pair[1] - pair[0]);
                if overlap > 0.0 {
                    self.contact_stiffness * overlap.powf(q + 1.0) / (q + 1.0)
                } else {
                    0.0
                }
            })
            .sum();
        swing + squeeze
    }
}

impl VectorField<f64> for ContactChain {
    fn dimension(&self) -> usize {
        2 * self.count
    }

    fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
        let n = self.count;
        let (pos, vel) = x.split_at(n);
        let (dpos, dvel) = out.split_at_mut(n);
        dpos.copy_from_slice(vel);
        for i in 0..n {
            dvel[i] = -self.g * (pos[i] - self.rest_position(i)) / self.string_length;
        }
        for i in 0..n.saturating_sub(1) {
            let push = self.contact_force(pos[i + 1] - pos[i]) / self.mass;
            dvel[i] -= push;
            dvel[i + 1] += push;
        }
    }
}
