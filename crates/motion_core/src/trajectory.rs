//! Time-indexed state history produced by a simulation run.
//!
//! States are stored row-major in one flat buffer (`dimension` values per
//! sample). A `Trajectory` is frozen once the run that built it returns;
//! analysis reads it through cheap, borrowing `TrajectoryView`s.

use crate::error::{SimulationError, SimulationResult};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    dimension: usize,
    times: Vec<f64>,
    states: Vec<f64>,
}

impl Trajectory {
    /// Starts a trajectory with its initial sample.
    pub(crate) fn start(t0: f64, initial_state: &[f64], capacity: usize) -> Self {
        let dimension = initial_state.len();
        let mut times = Vec::with_capacity(capacity.max(1));
        let mut states = Vec::with_capacity(capacity.max(1) * dimension);
        times.push(t0);
        states.extend_from_slice(initial_state);
        Self {
            dimension,
            times,
            states,
        }
    }

    /// Appends a sample. Callers guarantee `t` is past the last sample time.
    pub(crate) fn push(&mut self, t: f64, state: &[f64]) {
        debug_assert_eq!(state.len(), self.dimension);
        debug_assert!(t > self.times[self.times.len() - 1]);
        self.times.push(t);
        self.states.extend_from_slice(state);
    }

    /// Builds a trajectory from externally produced samples (measured data,
    /// analytic curves). Times must be finite and strictly increasing and every
    /// state must have the same, non-zero dimension.
    pub fn from_samples(times: Vec<f64>, states: Vec<Vec<f64>>) -> SimulationResult<Self> {
        if times.is_empty() {
            return Err(SimulationError::invalid(
                "A trajectory needs at least one sample.",
            ));
        }
        if times.len() != states.len() {
            return Err(SimulationError::invalid(format!(
                "Got {} times but {} states.",
                times.len(),
                states.len()
            )));
        }
        let dimension = states[0].len();
        if dimension == 0 {
            return Err(SimulationError::invalid(
                "States must have positive dimension.",
            ));
        }
        if let Some(bad) = states.iter().position(|s| s.len() != dimension) {
            return Err(SimulationError::invalid(format!(
                "State {} has dimension {}, expected {}.",
                bad,
                states[bad].len(),
                dimension
            )));
        }
        if times.iter().any(|t| !t.is_finite()) {
            return Err(SimulationError::invalid("Sample times must be finite."));
        }
        if times.windows(2).any(|w| w[1] <= w[0]) {
            return Err(SimulationError::invalid(
                "Sample times must be strictly increasing.",
            ));
        }

        Ok(Self {
            dimension,
            times,
            states: states.into_iter().flatten().collect(),
        })
    }

    pub fn view(&self) -> TrajectoryView<'_> {
        TrajectoryView {
            dimension: self.dimension,
            times: &self.times,
            states: &self.states,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Always false: a trajectory holds at least its initial sample.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn sample(&self, index: usize) -> Option<(f64, &[f64])> {
        self.view().sample(index)
    }

    pub fn final_sample(&self) -> (f64, &[f64]) {
        let last = self.times.len() - 1;
        (
            self.times[last],
            &self.states[last * self.dimension..(last + 1) * self.dimension],
        )
    }

    pub fn column(&self, index: usize) -> SimulationResult<Vec<f64>> {
        self.view().column(index)
    }

    pub fn slice(&self, time_from: f64) -> TrajectoryView<'_> {
        self.view().slice(time_from)
    }
}

impl<'a> From<&'a Trajectory> for TrajectoryView<'a> {
    fn from(trajectory: &'a Trajectory) -> Self {
        trajectory.view()
    }
}

/// Read-only window onto a contiguous run of samples of a `Trajectory`.
#[derive(Debug, Clone, Copy)]
pub struct TrajectoryView<'a> {
    dimension: usize,
    times: &'a [f64],
    states: &'a [f64],
}

impl<'a> TrajectoryView<'a> {
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &'a [f64] {
        self.times
    }

    pub fn sample(&self, index: usize) -> Option<(f64, &'a [f64])> {
        let time = *self.times.get(index)?;
        let start = index * self.dimension;
        Some((time, &self.states[start..start + self.dimension]))
    }

    pub fn state(&self, index: usize) -> Option<&'a [f64]> {
        self.sample(index).map(|(_, state)| state)
    }

    /// Iterates `(time, state)` pairs in time order.
    pub fn samples(&self) -> impl Iterator<Item = (f64, &'a [f64])> + 'a {
        let dimension = self.dimension;
        self.times
            .iter()
            .copied()
            .zip(self.states.chunks_exact(dimension))
    }

    /// Projects coordinate `index` across all samples.
    pub fn column(&self, index: usize) -> SimulationResult<Vec<f64>> {
        if index >= self.dimension {
            return Err(SimulationError::invalid(format!(
                "Coordinate index {} out of range for dimension {}.",
                index, self.dimension
            )));
        }
        Ok(self
            .states
            .iter()
            .skip(index)
            .step_by(self.dimension)
            .copied()
            .collect())
    }

    /// Evaluates a scalar observable `(t, state) -> f64` at every sample.
    pub fn map<F>(&self, observable: F) -> Vec<f64>
    where
        F: Fn(f64, &[f64]) -> f64,
    {
        self.samples().map(|(t, s)| observable(t, s)).collect()
    }

    /// Samples with `t >= time_from`, without copying.
    pub fn slice(&self, time_from: f64) -> TrajectoryView<'a> {
        let start = self.times.partition_point(|&t| t < time_from);
        TrajectoryView {
            dimension: self.dimension,
            times: &self.times[start..],
            states: &self.states[start * self.dimension..],
        }
    }

    /// Samples with `t_from <= t <= t_to`, without copying.
    pub fn window(&self, t_from: f64, t_to: f64) -> TrajectoryView<'a> {
        let tail = self.slice(t_from);
        let end = tail.times.partition_point(|&t| t <= t_to);
        TrajectoryView {
            dimension: self.dimension,
            times: &tail.times[..end],
            states: &tail.states[..end * self.dimension],
        }
    }

    pub fn start_time(&self) -> Option<f64> {
        self.times.first().copied()
    }

    pub fn end_time(&self) -> Option<f64> {
        self.times.last().copied()
    }

    /// Copies the viewed samples into an owned trajectory.
    pub fn to_trajectory(&self) -> SimulationResult<Trajectory> {
        if self.is_empty() {
            return Err(SimulationError::insufficient(
                "Cannot build a trajectory from an empty view.",
            ));
        }
        Ok(Trajectory {
            dimension: self.dimension,
            times: self.times.to_vec(),
            states: self.states.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Trajectory;

    fn ramp() -> Trajectory {
        let times: Vec<f64> = (0..5).map(|i| i as f64 * 0.5).collect();
        let states = times.iter().map(|&t| vec![t, 10.0 * t]).collect();
        Trajectory::from_samples(times, states).expect("valid samples")
    }

    #[test]
    fn sample_and_column_follow_insertion_order() {
        let traj = ramp();
        assert_eq!(traj.len(), 5);
        assert_eq!(traj.dimension(), 2);
        assert_eq!(traj.sample(2), Some((1.0, &[1.0, 10.0][..])));
        assert_eq!(traj.sample(5), None);
        assert_eq!(traj.column(1).expect("column"), vec![0.0, 5.0, 10.0, 15.0, 20.0]);
        assert_eq!(traj.final_sample(), (2.0, &[2.0, 20.0][..]));
    }

    #[test]
    fn column_rejects_out_of_range_index() {
        let traj = ramp();
        let err = traj.column(2).expect_err("index 2 is out of range");
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn slice_drops_leading_samples_and_is_idempotent() {
        let traj = ramp();
        let once = traj.slice(0.75);
        assert_eq!(once.times(), &[1.0, 1.5, 2.0]);
        assert_eq!(once.state(0), Some(&[1.0, 10.0][..]));

        let twice = once.slice(0.75);
        assert_eq!(twice.len(), once.len());
        assert_eq!(twice.times(), once.times());
        assert_eq!(twice.column(1).expect("column"), once.column(1).expect("column"));

        assert!(traj.slice(10.0).is_empty());
        assert_eq!(traj.slice(-1.0).len(), traj.len());
    }

    #[test]
    fn slice_borrows_instead_of_copying() {
        let traj = ramp();
        let view = traj.slice(1.0);
        assert!(std::ptr::eq(view.times().as_ptr(), traj.times()[2..].as_ptr()));
    }

    #[test]
    fn window_keeps_inclusive_range() {
        let traj = ramp();
        let window = traj.view().window(0.5, 1.5);
        assert_eq!(window.times(), &[0.5, 1.0, 1.5]);
        assert_eq!(window.column(0).expect("column"), vec![0.5, 1.0, 1.5]);
    }

    #[test]
    fn from_samples_validates_input() {
        assert!(Trajectory::from_samples(vec![], vec![]).is_err());
        assert!(Trajectory::from_samples(vec![0.0, 1.0], vec![vec![1.0]]).is_err());
        assert!(Trajectory::from_samples(vec![0.0, 0.0], vec![vec![1.0], vec![2.0]]).is_err());
        assert!(Trajectory::from_samples(vec![0.0, 1.0], vec![vec![1.0], vec![2.0, 3.0]]).is_err());
        assert!(Trajectory::from_samples(vec![0.0], vec![vec![]]).is_err());
        assert!(Trajectory::from_samples(vec![f64::NAN], vec![vec![1.0]]).is_err());
    }

    #[test]
    fn map_and_to_trajectory_round_out_views() {
        let traj = ramp();
        let sums = traj.view().map(|t, s| t + s[0] + s[1]);
        assert_eq!(sums[4], 2.0 + 2.0 + 20.0);

        let tail = traj.slice(1.5).to_trajectory().expect("non-empty view");
        assert_eq!(tail.len(), 2);
        assert!(traj.slice(5.0).to_trajectory().is_err());
    }

    #[test]
    fn serializes_for_external_plotting() {
        let traj = ramp();
        let json = serde_json::to_value(&traj).expect("serialize");
        assert_eq!(json["dimension"], 2);
        assert_eq!(json["times"].as_array().map(|a| a.len()), Some(5));
    }
}
