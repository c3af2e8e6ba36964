//! Normal modes of linear mass-spring systems.
//!
//! Solves `K u = ω² M u` for a diagonal mass matrix by symmetrizing to
//! `M^-1/2 K M^-1/2` and using a symmetric eigen-decomposition.

use crate::error::{SimulationError, SimulationResult};
use nalgebra::{DMatrix, SymmetricEigen};
use serde::Serialize;

/// Eigenvalues this far below zero (relative to the largest) are rounding noise.
const NEGATIVE_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalModes {
    /// Angular frequencies in rad/s, ascending.
    pub angular_frequencies: Vec<f64>,
    /// `shapes[i]` is the displacement pattern of mode `i`, scaled so its
    /// largest component is `+1`.
    pub shapes: Vec<Vec<f64>>,
}

impl NormalModes {
    pub fn len(&self) -> usize {
        self.angular_frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.angular_frequencies.is_empty()
    }

    /// Frequencies in Hz.
    pub fn frequencies(&self) -> Vec<f64> {
        self.angular_frequencies
            .iter()
            .map(|w| w / std::f64::consts::TAU)
            .collect()
    }

    /// Initial `[displacements.., velocities..]` state that excites only
    /// mode `mode`, with the largest displacement equal to `amplitude`.
    pub fn excitation(&self, mode: usize, amplitude: f64) -> SimulationResult<Vec<f64>> {
        let shape = self.shapes.get(mode).ok_or_else(|| {
            SimulationError::invalid(format!(
                "Mode {} out of range for {} modes.",
                mode,
                self.len()
            ))
        })?;
        let mut state: Vec<f64> = shape.iter().map(|u| amplitude * u).collect();
        state.resize(2 * shape.len(), 0.0);
        Ok(state)
    }
}

/// Normal modes for point masses `masses` coupled by the row-major stiffness
/// matrix `stiffness` (`n × n`, symmetric).
pub fn normal_modes(masses: &[f64], stiffness: &[f64]) -> SimulationResult<NormalModes> {
    let n = masses.len();
    if n == 0 {
        return Err(SimulationError::invalid("At least one mass is required."));
    }
    if stiffness.len() != n * n {
        return Err(SimulationError::invalid(format!(
            "Stiffness matrix has {} entries, expected {} for {} masses.",
            stiffness.len(),
            n * n,
            n
        )));
    }
    if let Some(bad) = masses.iter().find(|m| !(**m > 0.0) || !m.is_finite()) {
        return Err(SimulationError::invalid(format!(
            "Masses must be positive and finite, got {bad}."
        )));
    }
    if stiffness.iter().any(|k| !k.is_finite()) {
        return Err(SimulationError::invalid("Stiffness entries must be finite."));
    }

    let k = DMatrix::from_row_slice(n, n, stiffness);
    let scale = k.amax().max(f64::MIN_POSITIVE);
    for i in 0..n {
        for j in (i + 1)..n {
            if (k[(i, j)] - k[(j, i)]).abs() > 1e-12 * scale {
                return Err(SimulationError::invalid(format!(
                    "Stiffness matrix is not symmetric at ({i}, {j})."
                )));
            }
        }
    }

    let inv_sqrt: Vec<f64> = masses.iter().map(|m| 1.0 / m.sqrt()).collect();
    let reduced = DMatrix::from_fn(n, n, |i, j| inv_sqrt[i] * k[(i, j)] * inv_sqrt[j]);
    let eig = SymmetricEigen::new(reduced);

    let largest = eig.eigenvalues.amax().max(f64::MIN_POSITIVE);
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| eig.eigenvalues[a].total_cmp(&eig.eigenvalues[b]));

    let mut angular_frequencies = Vec::with_capacity(n);
    let mut shapes = Vec::with_capacity(n);
    for idx in order {
        let lambda = eig.eigenvalues[idx];
        if lambda < -NEGATIVE_TOLERANCE * largest {
            return Err(SimulationError::invalid(format!(
                "Stiffness matrix is not positive semi-definite (eigenvalue {lambda})."
            )));
        }
        angular_frequencies.push(lambda.max(0.0).sqrt());

        let column = eig.eigenvectors.column(idx);
        let mut shape: Vec<f64> = column
            .iter()
            .zip(&inv_sqrt)
            .map(|(v, s)| v * s)
            .collect();
        normalize_shape(&mut shape);
        shapes.push(shape);
    }

    Ok(NormalModes {
        angular_frequencies,
        shapes,
    })
}

// Scale to unit max magnitude with the first dominant component positive.
fn normalize_shape(shape: &mut [f64]) {
    let peak = shape.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if peak == 0.0 {
        return;
    }
    let sign = shape
        .iter()
        .find(|v| v.abs() > peak * (1.0 - 1e-9))
        .map_or(1.0, |v| v.signum());
    for v in shape.iter_mut() {
        *v *= sign / peak;
    }
}
