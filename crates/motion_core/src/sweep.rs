//! Parameter sweeps over independent simulation runs.
//!
//! Every point is a separate run owning its own trajectory, so points are
//! evaluated on the rayon thread pool with no coordination beyond collecting
//! outcomes in input order.

use crate::error::{SimulationError, SimulationResult};
use rayon::prelude::*;
use tracing::debug;

/// Outcomes of a sweep, aligned with the swept parameter values.
#[derive(Debug, Clone)]
pub struct SweepResult<P, R> {
    pub parameters: Vec<P>,
    pub outcomes: Vec<SimulationResult<R>>,
    pub num_successful: usize,
    pub num_failed: usize,
}

impl<P, R> SweepResult<P, R> {
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// `(parameter, result)` pairs for the points that succeeded.
    pub fn successful(&self) -> impl Iterator<Item = (&P, &R)> + '_ {
        self.parameters
            .iter()
            .zip(&self.outcomes)
            .filter_map(|(p, outcome)| outcome.as_ref().ok().map(|r| (p, r)))
    }

    /// All results in order, or the first failure.
    pub fn into_results(self) -> SimulationResult<Vec<R>> {
        self.outcomes.into_iter().collect()
    }
}

/// Evaluates `run` at every parameter value in parallel.
pub fn run_sweep<P, R, F>(parameters: Vec<P>, run: F) -> SweepResult<P, R>
where
    P: Sync,
    R: Send,
    F: Fn(&P) -> SimulationResult<R> + Sync,
{
    debug!(points = parameters.len(), "starting parameter sweep");

    let outcomes: Vec<SimulationResult<R>> = parameters.par_iter().map(&run).collect();

    let num_failed = outcomes.iter().filter(|o| o.is_err()).count();
    let num_successful = outcomes.len() - num_failed;
    for (index, outcome) in outcomes.iter().enumerate() {
        if let Err(err) = outcome {
            debug!(index, error = %err, "sweep point failed");
        }
    }
    debug!(num_successful, num_failed, "parameter sweep finished");

    SweepResult {
        parameters,
        outcomes,
        num_successful,
        num_failed,
    }
}

/// `count` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, count: usize) -> SimulationResult<Vec<f64>> {
    if !start.is_finite() || !end.is_finite() {
        return Err(SimulationError::invalid("Sweep bounds must be finite."));
    }
    match count {
        0 => Err(SimulationError::invalid("A sweep needs at least one point.")),
        1 => Ok(vec![start]),
        _ => {
            let step = (end - start) / (count - 1) as f64;
            Ok((0..count)
                .map(|i| {
                    if i == count - 1 {
                        end
                    } else {
                        start + step * i as f64
                    }
                })
                .collect())
        }
    }
}
