use super::{require_finite, require_positive};
use crate::error::{SimulationError, SimulationResult};
use crate::modes::{normal_modes, NormalModes};
use crate::traits::VectorField;
use serde::{Deserialize, Serialize};

/// One-dimensional oscillator with potential
/// `Ep(x) = ½ k x² + c x³ + q x⁴`, linear damping `-b v` and optional
/// harmonic forcing `F0 cos(ωf t)`. State `[x, v]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Oscillator {
    pub mass: f64,
    pub stiffness: f64,
    #[serde(default)]
    pub cubic: f64,
    #[serde(default)]
    pub quartic: f64,
    #[serde(default)]
    pub damping: f64,
    #[serde(default)]
    pub forcing_amplitude: f64,
    #[serde(default)]
    pub forcing_frequency: f64,
}

impl Oscillator {
    pub fn harmonic(mass: f64, stiffness: f64) -> SimulationResult<Self> {
        Ok(Self {
            mass: require_positive("Mass", mass)?,
            stiffness: require_finite("Stiffness", stiffness)?,
            cubic: 0.0,
            quartic: 0.0,
            damping: 0.0,
            forcing_amplitude: 0.0,
            forcing_frequency: 0.0,
        })
    }

    /// Pure quartic well `Ep = α x⁴`, force `-4 α x³`.
    pub fn quartic(mass: f64, alpha: f64) -> SimulationResult<Self> {
        Ok(Self {
            quartic: require_finite("Quartic coefficient", alpha)?,
            ..Self::harmonic(mass, 0.0)?
        })
    }

    /// Stiffening spring `F = -k x (1 + 2 α x²)`, i.e. `Ep = ½ k x² (1 + α x²)`.
    pub fn stiffening(mass: f64, stiffness: f64, alpha: f64) -> SimulationResult<Self> {
        let base = Self::harmonic(mass, stiffness)?;
        Ok(Self {
            quartic: 0.5 * stiffness * require_finite("Stiffening coefficient", alpha)?,
            ..base
        })
    }

    /// Adds `c x³` to the potential (asymmetric well).
    pub fn with_cubic(mut self, c: f64) -> SimulationResult<Self> {
        self.cubic = require_finite("Cubic coefficient", c)?;
        Ok(self)
    }

    pub fn with_damping(mut self, b: f64) -> SimulationResult<Self> {
        if !(b >= 0.0) || !b.is_finite() {
            return Err(SimulationError::invalid(format!(
                "Damping must be non-negative and finite, got {b}."
            )));
        }
        self.damping = b;
        Ok(self)
    }

    pub fn with_forcing(mut self, amplitude: f64, frequency: f64) -> SimulationResult<Self> {
        self.forcing_amplitude = require_finite("Forcing amplitude", amplitude)?;
        self.forcing_frequency = require_finite("Forcing frequency", frequency)?;
        Ok(self)
    }

    /// Small-amplitude angular frequency `sqrt(k/m)`.
    pub fn natural_frequency(&self) -> f64 {
        (self.stiffness / self.mass).max(0.0).sqrt()
    }

    pub fn restoring_force(&self, x: f64) -> f64 {
        -(self.stiffness * x + 3.0 * self.cubic * x * x + 4.0 * self.quartic * x * x * x)
    }

    pub fn forcing(&self, t: f64) -> f64 {
        self.forcing_amplitude * (self.forcing_frequency * t).cos()
    }

    pub fn potential_energy(&self, state: &[f64]) -> f64 {
        let x = state[0];
        0.5 * self.stiffness * x * x + self.cubic * x * x * x + self.quartic * x * x * x * x
    }

    pub fn kinetic_energy(&self, state: &[f64]) -> f64 {
        0.5 * self.mass * state[1] * state[1]
    }

    /// Power of the non-conservative forces (damping plus drive).
    pub fn external_power(&self, t: f64, state: &[f64]) -> f64 {
        (self.forcing(t) - self.damping * state[1]) * state[1]
    }
}

impl VectorField<f64> for Oscillator {
    fn dimension(&self) -> usize {
        2
    }

    fn apply(&self, t: f64, x: &[f64], out: &mut [f64]) {
        out[0] = x[1];
        out[1] = (self.restoring_force(x[0]) - self.damping * x[1] + self.forcing(t)) / self.mass;
    }
}

/// Rigid pendulum without the small-angle approximation. State `[θ, ω]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pendulum {
    pub g: f64,
    pub length: f64,
}

impl Pendulum {
    pub fn new(g: f64, length: f64) -> SimulationResult<Self> {
        Ok(Self {
            g: require_positive("Gravity", g)?,
            length: require_positive("Length", length)?,
        })
    }

    /// `2π sqrt(L/g)`.
    pub fn small_angle_period(&self) -> f64 {
        std::f64::consts::TAU * (self.length / self.g).sqrt()
    }

    pub fn potential_energy(&self, mass: f64, state: &[f64]) -> f64 {
        mass * self.g * self.length * (1.0 - state[0].cos())
    }

    pub fn kinetic_energy(&self, mass: f64, state: &[f64]) -> f64 {
        let v = self.length * state[1];
        0.5 * mass * v * v
    }
}

impl VectorField<f64> for Pendulum {
    fn dimension(&self) -> usize {
        2
    }

    fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
        out[0] = x[1];
        out[1] = -self.g / self.length * x[0].sin();
    }
}

/// Masses on a line joined by springs. Mass `i` may be tied to a fixed wall
/// by `anchors[i]`; neighbours `i` and `i + 1` are joined by `couplings[i]`.
/// State `[x_0.., v_0..]` with `x_i` the displacement from equilibrium.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoupledChain {
    masses: Vec<f64>,
    anchors: Vec<f64>,
    couplings: Vec<f64>,
}

impl CoupledChain {
    pub fn new(masses: Vec<f64>, anchors: Vec<f64>, couplings: Vec<f64>) -> SimulationResult<Self> {
        let n = masses.len();
        if n == 0 {
            return Err(SimulationError::invalid("A chain needs at least one mass."));
        }
        if anchors.len() != n || couplings.len() + 1 != n {
            return Err(SimulationError::invalid(format!(
                "{} masses need {} anchors and {} couplings, got {} and {}.",
                n,
                n,
                n - 1,
                anchors.len(),
                couplings.len()
            )));
        }
        for &m in &masses {
            require_positive("Mass", m)?;
        }
        for &k in anchors.iter().chain(&couplings) {
            if !(k >= 0.0) || !k.is_finite() {
                return Err(SimulationError::invalid(format!(
                    "Spring constants must be non-negative and finite, got {k}."
                )));
            }
        }
        Ok(Self {
            masses,
            anchors,
            couplings,
        })
    }

    /// `count` equal masses, the two outer ones tied to walls by `wall_spring`,
    /// neighbours joined by `coupling`.
    pub fn end_anchored(
        count: usize,
        mass: f64,
        wall_spring: f64,
        coupling: f64,
    ) -> SimulationResult<Self> {
        if count == 0 {
            return Err(SimulationError::invalid("A chain needs at least one mass."));
        }
        let mut anchors = vec![0.0; count];
        anchors[0] = wall_spring;
        anchors[count - 1] = wall_spring;
        Self::new(vec![mass; count], anchors, vec![coupling; count - 1])
    }

    pub fn len(&self) -> usize {
        self.masses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }

    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    /// Row-major `n × n` stiffness matrix `K` with `M ẍ = -K x`.
    pub fn stiffness_matrix(&self) -> Vec<f64> {
        let n = self.len();
        let mut k = vec![0.0; n * n];
        for i in 0..n {
            k[i * n + i] += self.anchors[i];
        }
        for (i, &c) in self.couplings.iter().enumerate() {
            k[i * n + i] += c;
            k[(i + 1) * n + i + 1] += c;
            k[i * n + i + 1] -= c;
            k[(i + 1) * n + i] -= c;
        }
        k
    }

    pub fn normal_modes(&self) -> SimulationResult<NormalModes> {
        normal_modes(&self.masses, &self.stiffness_matrix())
    }

    pub fn potential_energy(&self, state: &[f64]) -> f64 {
        let x = &state[..self.len()];
        let walls: f64 = self
            .anchors
            .iter()
            .zip(x)
            .map(|(k, xi)| 0.5 * k * xi * xi)
            .sum();
        let links: f64 = self
            .couplings
            .iter()
            .zip(x.windows(2))
            .map(|(c, pair)| {
                let stretch = pair[1] - pair[0];
                0.5 * c * stretch * stretch
            })
            .sum();
        walls + links
    }

    pub fn kinetic_energy(&self, state: &[f64]) -> f64 {
        self.masses
            .iter()
            .zip(&state[self.len()..])
            .map(|(m, v)| 0.5 * m * v * v)
            .sum()
    }
}

impl VectorField<f64> for CoupledChain {
    fn dimension(&self) -> usize {
        2 * self.len()
    }

    fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
        let n = self.len();
        let (pos, vel) = x.split_at(n);
        let (dpos, dvel) = out.split_at_mut(n);
        dpos.copy_from_slice(vel);
        for i in 0..n {
            dvel[i] = -self.anchors[i] * pos[i];
        }
        for (i, &c) in self.couplings.iter().enumerate() {
            let f = c * (pos[i + 1] - pos[i]);
            dvel[i] += f;
            dvel[i + 1] -= f;
        }
        for (a, m) in dvel.iter_mut().zip(&self.masses) {
            *a /= m;
        }
    }
}
