//! Diagnostics computed along recorded trajectories: mechanical energy,
//! momentum, work and impulse by quadrature, and the separation of two runs
//! started from nearby states.

use crate::error::{SimulationError, SimulationResult};
use crate::simulator::{Simulator, StopCondition};
use crate::trajectory::{Trajectory, TrajectoryView};
use crate::traits::VectorField;
use serde::Serialize;

/// Kinetic, potential and total mechanical energy at every sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergySeries {
    pub times: Vec<f64>,
    pub kinetic: Vec<f64>,
    pub potential: Vec<f64>,
    pub total: Vec<f64>,
}

impl EnergySeries {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Largest |E(t) - E(t0)| over the series.
    pub fn drift(&self) -> f64 {
        let Some(&first) = self.total.first() else {
            return 0.0;
        };
        self.total
            .iter()
            .map(|e| (e - first).abs())
            .fold(0.0, f64::max)
    }

    /// `drift()` relative to |E(t0)|.
    pub fn relative_drift(&self) -> f64 {
        match self.total.first() {
            Some(&first) if first != 0.0 => self.drift() / first.abs(),
            _ => self.drift(),
        }
    }

    /// Total energy at time `t`, linearly interpolated between samples.
    pub fn total_at(&self, t: f64) -> SimulationResult<f64> {
        interpolate(&self.times, &self.total, t)
    }

    /// E(t_to) - E(t_from): the work done by non-conservative forces.
    pub fn difference(&self, t_from: f64, t_to: f64) -> SimulationResult<f64> {
        Ok(self.total_at(t_to)? - self.total_at(t_from)?)
    }
}

fn interpolate(times: &[f64], values: &[f64], t: f64) -> SimulationResult<f64> {
    let (Some(&first), Some(&last)) = (times.first(), times.last()) else {
        return Err(SimulationError::insufficient("Series is empty."));
    };
    if !(t >= first && t <= last) {
        return Err(SimulationError::invalid(format!(
            "Time {t} lies outside the sampled range [{first}, {last}]."
        )));
    }
    let upper = times.partition_point(|&s| s < t);
    if times[upper] == t {
        return Ok(values[upper]);
    }
    let lower = upper - 1;
    let frac = (t - times[lower]) / (times[upper] - times[lower]);
    Ok(values[lower] + frac * (values[upper] - values[lower]))
}

/// Energy series with caller-supplied kinetic and potential energy functions.
pub fn energy_series_with<K, P>(view: &TrajectoryView<'_>, kinetic: K, potential: P) -> EnergySeries
where
    K: Fn(&[f64]) -> f64,
    P: Fn(&[f64]) -> f64,
{
    let mut series = EnergySeries {
        times: Vec::with_capacity(view.len()),
        kinetic: Vec::with_capacity(view.len()),
        potential: Vec::with_capacity(view.len()),
        total: Vec::with_capacity(view.len()),
    };
    for (t, state) in view.samples() {
        let ke = kinetic(state);
        let pe = potential(state);
        series.times.push(t);
        series.kinetic.push(ke);
        series.potential.push(pe);
        series.total.push(ke + pe);
    }
    series
}

/// Energy series for a `[positions.., velocities..]` state of equal masses:
/// kinetic energy is `½ m Σ v²` over the velocity half of the state.
pub fn energy_series<P>(
    view: &TrajectoryView<'_>,
    mass: f64,
    potential: P,
) -> SimulationResult<EnergySeries>
where
    P: Fn(&[f64]) -> f64,
{
    let half = mechanical_half(view)?;
    if !(mass > 0.0) {
        return Err(SimulationError::invalid(format!(
            "Mass must be positive, got {mass}."
        )));
    }
    Ok(energy_series_with(
        view,
        |state| 0.5 * mass * state[half..].iter().map(|v| v * v).sum::<f64>(),
        potential,
    ))
}

/// Total linear momentum `m Σ v` of equal masses at every sample.
pub fn momentum_series(view: &TrajectoryView<'_>, mass: f64) -> SimulationResult<Vec<f64>> {
    let half = mechanical_half(view)?;
    Ok(view
        .samples()
        .map(|(_, state)| mass * state[half..].iter().sum::<f64>())
        .collect())
}

fn mechanical_half(view: &TrajectoryView<'_>) -> SimulationResult<usize> {
    let dim = view.dimension();
    if dim == 0 || dim % 2 != 0 {
        return Err(SimulationError::invalid(format!(
            "Expected a [positions, velocities] state of even length, got {dim}."
        )));
    }
    Ok(dim / 2)
}

/// Trapezoidal rule over possibly uneven abscissae.
pub fn trapezoid(times: &[f64], values: &[f64]) -> SimulationResult<f64> {
    check_quadrature_input(times, values)?;
    Ok(times
        .windows(2)
        .zip(values.windows(2))
        .map(|(t, v)| 0.5 * (t[1] - t[0]) * (v[0] + v[1]))
        .sum())
}

/// Running trapezoidal integral; the first entry is 0.
pub fn cumulative_trapezoid(times: &[f64], values: &[f64]) -> SimulationResult<Vec<f64>> {
    check_quadrature_input(times, values)?;
    let mut out = Vec::with_capacity(times.len());
    let mut acc = 0.0;
    out.push(acc);
    for (t, v) in times.windows(2).zip(values.windows(2)) {
        acc += 0.5 * (t[1] - t[0]) * (v[0] + v[1]);
        out.push(acc);
    }
    Ok(out)
}

fn check_quadrature_input(times: &[f64], values: &[f64]) -> SimulationResult<()> {
    if times.len() != values.len() {
        return Err(SimulationError::invalid(format!(
            "Got {} abscissae but {} values.",
            times.len(),
            values.len()
        )));
    }
    if times.len() < 2 {
        return Err(SimulationError::insufficient(
            "Quadrature needs at least two samples.",
        ));
    }
    Ok(())
}

/// Work done by a force along the trajectory: ∫ F·v dt, with `power(t, state)`
/// returning the instantaneous F·v.
pub fn work<F>(view: &TrajectoryView<'_>, power: F) -> SimulationResult<f64>
where
    F: Fn(f64, &[f64]) -> f64,
{
    trapezoid(view.times(), &view.map(power))
}

/// Running work ∫₀ᵗ F·v dt at every sample, for comparison against an
/// energy series sample by sample.
pub fn cumulative_work<F>(view: &TrajectoryView<'_>, power: F) -> SimulationResult<Vec<f64>>
where
    F: Fn(f64, &[f64]) -> f64,
{
    cumulative_trapezoid(view.times(), &view.map(power))
}

/// Impulse of one force component: ∫ F dt.
pub fn impulse<F>(view: &TrajectoryView<'_>, force: F) -> SimulationResult<f64>
where
    F: Fn(f64, &[f64]) -> f64,
{
    trapezoid(view.times(), &view.map(force))
}

/// First sample at which two trajectories separate past a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Divergence {
    pub time: f64,
    pub separation: f64,
    pub sample: usize,
}

fn check_aligned(
    a: &TrajectoryView<'_>,
    b: &TrajectoryView<'_>,
    index: usize,
) -> SimulationResult<usize> {
    if index >= a.dimension() || index >= b.dimension() {
        return Err(SimulationError::invalid(format!(
            "Coordinate index {} out of range for dimensions {} and {}.",
            index,
            a.dimension(),
            b.dimension()
        )));
    }
    let len = a.len().min(b.len());
    if len == 0 {
        return Err(SimulationError::insufficient(
            "Both trajectories need at least one sample.",
        ));
    }
    let aligned = a.times()[..len]
        .iter()
        .zip(&b.times()[..len])
        .all(|(ta, tb)| (ta - tb).abs() <= 1e-9 * ta.abs().max(1.0));
    if !aligned {
        return Err(SimulationError::invalid(
            "Trajectories must share sample times (same t0, dt and recording stride).",
        ));
    }
    Ok(len)
}

/// |a_i - b_i| of coordinate `index`, over the common samples.
pub fn separation_series(
    a: &TrajectoryView<'_>,
    b: &TrajectoryView<'_>,
    index: usize,
) -> SimulationResult<Vec<f64>> {
    let len = check_aligned(a, b, index)?;
    Ok(a.samples()
        .zip(b.samples())
        .take(len)
        .map(|((_, sa), (_, sb))| (sa[index] - sb[index]).abs())
        .collect())
}

/// First time the two trajectories differ in coordinate `index` by more than
/// `threshold`. Fails with `NoDivergence` when that never happens.
pub fn divergence_time(
    a: &TrajectoryView<'_>,
    b: &TrajectoryView<'_>,
    index: usize,
    threshold: f64,
) -> SimulationResult<Divergence> {
    if !(threshold > 0.0) || !threshold.is_finite() {
        return Err(SimulationError::invalid(format!(
            "Divergence threshold must be positive and finite, got {threshold}."
        )));
    }
    let separations = separation_series(a, b, index)?;
    match separations.iter().position(|&d| d > threshold) {
        Some(sample) => Ok(Divergence {
            time: a.times()[sample],
            separation: separations[sample],
            sample,
        }),
        None => Err(SimulationError::NoDivergence {
            threshold,
            horizon: a.times()[separations.len() - 1],
        }),
    }
}

/// Two runs of the same field and integrator from initial states that differ
/// by `delta` in one coordinate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DivergencePair {
    pub reference: Trajectory,
    pub perturbed: Trajectory,
    pub perturbed_coordinate: usize,
    pub delta: f64,
}

impl DivergencePair {
    pub fn simulate(
        simulator: &Simulator,
        field: &impl VectorField<f64>,
        initial_state: &[f64],
        perturbed_coordinate: usize,
        delta: f64,
        steps: usize,
    ) -> SimulationResult<Self> {
        if perturbed_coordinate >= initial_state.len() {
            return Err(SimulationError::invalid(format!(
                "Perturbed coordinate {} out of range for dimension {}.",
                perturbed_coordinate,
                initial_state.len()
            )));
        }
        if delta == 0.0 || !delta.is_finite() {
            return Err(SimulationError::invalid(
                "Perturbation must be non-zero and finite.",
            ));
        }
        let stop = StopCondition::FixedSteps(steps);
        let reference = simulator.run(field, initial_state, &stop)?;
        let mut shifted = initial_state.to_vec();
        shifted[perturbed_coordinate] += delta;
        let perturbed = simulator.run(field, &shifted, &stop)?;
        Ok(Self {
            reference,
            perturbed,
            perturbed_coordinate,
            delta,
        })
    }

    pub fn separation(&self, index: usize) -> SimulationResult<Vec<f64>> {
        separation_series(&self.reference.view(), &self.perturbed.view(), index)
    }

    pub fn divergence_time(&self, index: usize, threshold: f64) -> SimulationResult<Divergence> {
        divergence_time(
            &self.reference.view(),
            &self.perturbed.view(),
            index,
            threshold,
        )
    }
}
