//! Error taxonomy shared by integration, simulation, and trajectory analysis.

use thiserror::Error;

/// Errors reported by `motion_core` operations.
///
/// All variants are local, recoverable conditions: they are meant to be
/// handled by the caller that requested the simulation or analysis.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// Bad step size, dimension mismatch, unknown integrator, malformed input.
    #[error("Invalid configuration: {what}")]
    InvalidConfiguration { what: String },

    /// A predicate-driven run hit its step bound before the predicate fired.
    #[error("Step bound of {max_steps} exceeded at t = {time} before the stop condition was met")]
    ResourceExceeded { max_steps: usize, time: f64 },

    /// Not enough samples or events to compute the requested quantity.
    #[error("Insufficient data: {what}")]
    InsufficientData { what: String },

    /// Two trajectories never separated by more than the threshold.
    #[error("Trajectories stayed within {threshold} up to t = {horizon}")]
    NoDivergence { threshold: f64, horizon: f64 },

    /// A step produced NaN or infinite components.
    #[error("Non-finite state produced at step {step} (t = {time})")]
    NonFiniteState { step: usize, time: f64 },
}

impl SimulationError {
    pub(crate) fn invalid(what: impl Into<String>) -> Self {
        SimulationError::InvalidConfiguration { what: what.into() }
    }

    pub(crate) fn insufficient(what: impl Into<String>) -> Self {
        SimulationError::InsufficientData { what: what.into() }
    }
}

pub type SimulationResult<T> = Result<T, SimulationError>;
