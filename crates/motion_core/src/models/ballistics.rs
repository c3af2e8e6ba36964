//! Bodies moving under gravity with air resistance.

use super::{require_finite, require_positive};
use crate::error::SimulationResult;
use crate::traits::VectorField;
use serde::{Deserialize, Serialize};

/// Air resistance law, parameterized by the terminal speed it produces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "law", rename_all = "snake_case")]
pub enum Drag {
    None,
    /// `a = -(g / vT) v`
    Linear { terminal_speed: f64 },
    /// `a = -(g / vT²) |v| v`
    Quadratic { terminal_speed: f64 },
}

impl Drag {
    fn validate(self) -> SimulationResult<Self> {
        match self {
            Drag::None => {}
            Drag::Linear { terminal_speed } | Drag::Quadratic { terminal_speed } => {
                require_positive("Terminal speed", terminal_speed)?;
            }
        }
        Ok(self)
    }

    /// Drag acceleration along one axis for a body moving at `v` (speed
    /// `speed`) under gravity `g`.
    pub fn acceleration(&self, g: f64, v: f64, speed: f64) -> f64 {
        match *self {
            Drag::None => 0.0,
            Drag::Linear { terminal_speed } => -g / terminal_speed * v,
            Drag::Quadratic { terminal_speed } => {
                -g / (terminal_speed * terminal_speed) * speed * v
            }
        }
    }
}

/// Vertical fall or throw. State `[y, vy]`, `y` measured upward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallingBody {
    pub g: f64,
    pub drag: Drag,
}

impl FallingBody {
    pub fn new(g: f64, drag: Drag) -> SimulationResult<Self> {
        Ok(Self {
            g: require_positive("Gravity", g)?,
            drag: drag.validate()?,
        })
    }

    pub fn vacuum(g: f64) -> SimulationResult<Self> {
        Self::new(g, Drag::None)
    }

    pub fn drag_acceleration(&self, vy: f64) -> f64 {
        self.drag.acceleration(self.g, vy, vy.abs())
    }

    /// Power delivered by drag on a body of mass `mass`; integrate it to get
    /// the work done by air resistance.
    pub fn drag_power(&self, mass: f64, state: &[f64]) -> f64 {
        mass * self.drag_acceleration(state[1]) * state[1]
    }

    pub fn potential_energy(&self, mass: f64, state: &[f64]) -> f64 {
        mass * self.g * state[0]
    }
}

impl VectorField<f64> for FallingBody {
    fn dimension(&self) -> usize {
        2
    }

    fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
        out[0] = x[1];
        out[1] = -self.g + self.drag_acceleration(x[1]);
    }
}

/// Spin-induced lift `½ A ρ r (ω × v)` on a sphere of radius `r`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Magnus {
    pub radius: f64,
    pub air_density: f64,
    /// Angular velocity in rad/s.
    pub spin: [f64; 3],
}

impl Magnus {
    pub fn force(&self, v: [f64; 3]) -> [f64; 3] {
        let area = std::f64::consts::PI * self.radius * self.radius;
        let coeff = 0.5 * area * self.air_density * self.radius;
        let w = self.spin;
        [
            coeff * (w[1] * v[2] - w[2] * v[1]),
            coeff * (w[2] * v[0] - w[0] * v[2]),
            coeff * (w[0] * v[1] - w[1] * v[0]),
        ]
    }
}

/// Three-dimensional flight, `y` vertical. State `[x, y, z, vx, vy, vz]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub mass: f64,
    pub g: f64,
    /// Quadratic drag coefficient is `g / vT²`; `None` means no air.
    pub terminal_speed: Option<f64>,
    pub magnus: Option<Magnus>,
}

impl Projectile {
    pub fn new(mass: f64, g: f64) -> SimulationResult<Self> {
        Ok(Self {
            mass: require_positive("Mass", mass)?,
            g: require_positive("Gravity", g)?,
            terminal_speed: None,
            magnus: None,
        })
    }

    pub fn with_drag(mut self, terminal_speed: f64) -> SimulationResult<Self> {
        self.terminal_speed = Some(require_positive("Terminal speed", terminal_speed)?);
        Ok(self)
    }

    pub fn with_magnus(mut self, magnus: Magnus) -> SimulationResult<Self> {
        require_positive("Ball radius", magnus.radius)?;
        require_positive("Air density", magnus.air_density)?;
        for w in magnus.spin {
            require_finite("Spin", w)?;
        }
        self.magnus = Some(magnus);
        Ok(self)
    }

    pub fn speed(state: &[f64]) -> f64 {
        (state[3] * state[3] + state[4] * state[4] + state[5] * state[5]).sqrt()
    }

    pub fn potential_energy(&self, state: &[f64]) -> f64 {
        self.mass * self.g * state[1]
    }

    pub fn kinetic_energy(&self, state: &[f64]) -> f64 {
        let v = Self::speed(state);
        0.5 * self.mass * v * v
    }

    /// Rate at which drag removes energy (negative while moving).
    pub fn drag_power(&self, state: &[f64]) -> f64 {
        match self.terminal_speed {
            Some(vt) => {
                let v = Self::speed(state);
                -self.mass * self.g / (vt * vt) * v * v * v
            }
            None => 0.0,
        }
    }
}

impl VectorField<f64> for Projectile {
    fn dimension(&self) -> usize {
        6
    }

    fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
        let v = [x[3], x[4], x[5]];
        out[..3].copy_from_slice(&v);

        let mut acc = [0.0, -self.g, 0.0];
        if let Some(vt) = self.terminal_speed {
            let speed = Self::speed(x);
            let k = self.g / (vt * vt);
            for (a, vi) in acc.iter_mut().zip(v) {
                *a -= k * speed * vi;
            }
        }
        if let Some(magnus) = &self.magnus {
            let f = magnus.force(v);
            for (a, fi) in acc.iter_mut().zip(f) {
                *a += fi / self.mass;
            }
        }
        out[3..].copy_from_slice(&acc);
    }
}
