//! Fixed-step simulation driver.
//!
//! A `Simulator` owns the integration settings (integrator, step size, start
//! time, recording stride) and turns a vector field plus an initial state into
//! a `Trajectory`. The run ends after a fixed number of steps or when a
//! caller-supplied predicate fires; predicate runs are always bounded by a
//! step limit so an integrator that never reaches the physical stop condition
//! cannot hang the caller.

use crate::error::{SimulationError, SimulationResult};
use crate::solvers::IntegratorKind;
use crate::traits::{Steppable, VectorField};
use crate::trajectory::Trajectory;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Step bound used when a predicate run does not name one.
pub const DEFAULT_MAX_STEPS: usize = 10_000_000;

fn default_max_steps() -> usize {
    DEFAULT_MAX_STEPS
}

fn default_record_every() -> usize {
    1
}

/// Serializable form of the stop condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StopRule {
    Steps {
        count: usize,
    },
    Predicate {
        #[serde(default = "default_max_steps")]
        max_steps: usize,
    },
}

/// Integration parameters as they appear in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub integrator: IntegratorKind,
    pub dt: f64,
    #[serde(default)]
    pub t0: f64,
    #[serde(default = "default_record_every")]
    pub record_every: usize,
    pub stop: StopRule,
}

impl SimulationConfig {
    pub fn new(integrator: IntegratorKind, dt: f64, stop: StopRule) -> Self {
        Self {
            integrator,
            dt,
            t0: 0.0,
            record_every: 1,
            stop,
        }
    }

    pub fn validate(&self) -> SimulationResult<()> {
        validate_timing(self.dt, self.t0)?;
        if self.record_every == 0 {
            return Err(SimulationError::invalid("record_every must be at least 1."));
        }
        if let StopRule::Predicate { max_steps: 0 } = self.stop {
            return Err(SimulationError::invalid("max_steps must be at least 1."));
        }
        Ok(())
    }

    pub fn simulator(&self) -> SimulationResult<Simulator> {
        self.validate()?;
        Ok(Simulator {
            integrator: self.integrator,
            dt: self.dt,
            t0: self.t0,
            record_every: self.record_every,
        })
    }

    /// Resolves the configured rule into a runnable stop condition. The
    /// predicate is only consulted in `predicate` mode.
    pub fn stop_condition<'a, P>(&self, predicate: P) -> StopCondition<'a>
    where
        P: Fn(&[f64], f64) -> bool + 'a,
    {
        match self.stop {
            StopRule::Steps { count } => StopCondition::FixedSteps(count),
            StopRule::Predicate { max_steps } => StopCondition::Predicate {
                until: Box::new(predicate),
                max_steps,
            },
        }
    }

    /// Runs a fixed-step configuration. Predicate configurations need a
    /// predicate; use `stop_condition` and `Simulator::run` for those.
    pub fn run_steps(
        &self,
        field: &impl VectorField<f64>,
        initial_state: &[f64],
    ) -> SimulationResult<Trajectory> {
        match self.stop {
            StopRule::Steps { count } => self
                .simulator()?
                .run(field, initial_state, &StopCondition::FixedSteps(count)),
            StopRule::Predicate { .. } => Err(SimulationError::invalid(
                "Predicate stop mode needs a predicate supplied at run time.",
            )),
        }
    }
}

/// When a run ends.
pub enum StopCondition<'a> {
    /// Exactly this many steps.
    FixedSteps(usize),
    /// Until `until(state, t)` holds after a step, failing with
    /// `ResourceExceeded` after `max_steps` steps.
    Predicate {
        until: Box<dyn Fn(&[f64], f64) -> bool + 'a>,
        max_steps: usize,
    },
}

impl<'a> StopCondition<'a> {
    pub fn steps(count: usize) -> Self {
        StopCondition::FixedSteps(count)
    }

    pub fn until<P>(predicate: P) -> Self
    where
        P: Fn(&[f64], f64) -> bool + 'a,
    {
        StopCondition::Predicate {
            until: Box::new(predicate),
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Replaces the step bound of a predicate condition; no-op for fixed steps.
    pub fn with_max_steps(self, limit: usize) -> Self {
        match self {
            StopCondition::Predicate { until, .. } => StopCondition::Predicate {
                until,
                max_steps: limit,
            },
            fixed => fixed,
        }
    }
}

impl std::fmt::Debug for StopCondition<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopCondition::FixedSteps(n) => f.debug_tuple("FixedSteps").field(n).finish(),
            StopCondition::Predicate { max_steps, .. } => f
                .debug_struct("Predicate")
                .field("max_steps", max_steps)
                .finish_non_exhaustive(),
        }
    }
}

fn validate_timing(dt: f64, t0: f64) -> SimulationResult<()> {
    if !(dt > 0.0) || !dt.is_finite() {
        return Err(SimulationError::invalid(format!(
            "Step size dt must be positive and finite, got {dt}."
        )));
    }
    if !t0.is_finite() {
        return Err(SimulationError::invalid("Start time t0 must be finite."));
    }
    // Two steps must land on distinct grid times.
    if t0 + dt <= t0 || t0 + 2.0 * dt <= t0 + dt {
        return Err(SimulationError::invalid(format!(
            "Step size {dt} is below the resolution of start time {t0}."
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Simulator {
    integrator: IntegratorKind,
    dt: f64,
    t0: f64,
    record_every: usize,
}

impl Simulator {
    pub fn new(integrator: IntegratorKind, dt: f64) -> SimulationResult<Self> {
        validate_timing(dt, 0.0)?;
        Ok(Self {
            integrator,
            dt,
            t0: 0.0,
            record_every: 1,
        })
    }

    pub fn with_start_time(mut self, t0: f64) -> SimulationResult<Self> {
        validate_timing(self.dt, t0)?;
        self.t0 = t0;
        Ok(self)
    }

    /// Stores only every `stride`-th step (the final sample is always kept).
    pub fn with_record_every(mut self, stride: usize) -> SimulationResult<Self> {
        if stride == 0 {
            return Err(SimulationError::invalid("record_every must be at least 1."));
        }
        self.record_every = stride;
        Ok(self)
    }

    pub fn integrator(&self) -> IntegratorKind {
        self.integrator
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn start_time(&self) -> f64 {
        self.t0
    }

    /// Integrates `field` from `initial_state` until `stop` says otherwise.
    ///
    /// The initial sample is always recorded. Sample `i` lies at
    /// `t0 + i * dt`: time is recomputed from the integer step count rather
    /// than accumulated, so long runs do not drift off the grid.
    pub fn run(
        &self,
        field: &impl VectorField<f64>,
        initial_state: &[f64],
        stop: &StopCondition<'_>,
    ) -> SimulationResult<Trajectory> {
        let dim = initial_state.len();
        if dim == 0 {
            return Err(SimulationError::invalid(
                "Initial state must have positive dimension.",
            ));
        }
        if field.dimension() != dim {
            return Err(SimulationError::invalid(format!(
                "Vector field dimension ({}) does not match initial state dimension ({}).",
                field.dimension(),
                dim
            )));
        }
        if initial_state.iter().any(|v| !v.is_finite()) {
            return Err(SimulationError::invalid("Initial state must be finite."));
        }
        if self.integrator == IntegratorKind::EulerCromer && dim % 2 != 0 {
            return Err(SimulationError::invalid(format!(
                "euler_cromer needs a [positions, velocities] state of even length, got {dim}."
            )));
        }
        if let StopCondition::Predicate { max_steps: 0, .. } = stop {
            return Err(SimulationError::invalid("max_steps must be at least 1."));
        }

        let capacity = match stop {
            StopCondition::FixedSteps(n) => n / self.record_every + 2,
            StopCondition::Predicate { .. } => 1024,
        };

        debug!(
            integrator = %self.integrator,
            dt = self.dt,
            t0 = self.t0,
            dimension = dim,
            stop = ?stop,
            "starting simulation run"
        );

        let mut stepper = self.integrator.build::<f64>(dim);
        let mut state = initial_state.to_vec();
        let mut t = self.t0;
        let mut trajectory = Trajectory::start(self.t0, &state, capacity);
        let mut steps = 0usize;

        loop {
            match stop {
                StopCondition::FixedSteps(n) if steps >= *n => break,
                StopCondition::Predicate { max_steps, .. } if steps >= *max_steps => {
                    warn!(
                        max_steps = *max_steps,
                        t,
                        "stop predicate never fired; aborting run"
                    );
                    return Err(SimulationError::ResourceExceeded {
                        max_steps: *max_steps,
                        time: t,
                    });
                }
                _ => {}
            }

            let t_prev = t;
            stepper.step(field, &mut t, &mut state, self.dt)?;
            steps += 1;
            t = self.t0 + steps as f64 * self.dt;
            if t <= t_prev {
                return Err(SimulationError::invalid(format!(
                    "Step size {} no longer advances time at t = {t_prev} (step {steps}).",
                    self.dt
                )));
            }

            if state.iter().any(|v| !v.is_finite()) {
                warn!(step = steps, t, "integration produced a non-finite state");
                return Err(SimulationError::NonFiniteState { step: steps, time: t });
            }

            let done = match stop {
                StopCondition::FixedSteps(n) => steps >= *n,
                StopCondition::Predicate { until, .. } => until(&state, t),
            };

            if done || steps % self.record_every == 0 {
                trajectory.push(t, &state);
            }
            if done {
                break;
            }
        }

        debug!(steps, samples = trajectory.len(), t_end = t, "simulation run finished");
        Ok(trajectory)
    }
}

#[cfg(test)]
mod tests {
    use super::{SimulationConfig, Simulator, StopCondition, StopRule, DEFAULT_MAX_STEPS};
    use crate::error::SimulationError;
    use crate::solvers::IntegratorKind;
    use crate::traits::FnField;

    fn falling() -> FnField<impl Fn(f64, &[f64], &mut [f64])> {
        FnField::new(2, |_t: f64, x: &[f64], out: &mut [f64]| {
            out[0] = x[1];
            out[1] = -9.81;
        })
    }

    fn oscillator() -> FnField<impl Fn(f64, &[f64], &mut [f64])> {
        FnField::new(2, |_t: f64, x: &[f64], out: &mut [f64]| {
            out[0] = x[1];
            out[1] = -x[0];
        })
    }

    #[test]
    fn fixed_steps_records_initial_plus_every_step() {
        let sim = Simulator::new(IntegratorKind::Rk4, 0.1).expect("valid");
        let traj = sim
            .run(&oscillator(), &[1.0, 0.0], &StopCondition::steps(10))
            .expect("run");
        assert_eq!(traj.len(), 11);
        assert_eq!(traj.sample(0), Some((0.0, &[1.0, 0.0][..])));
        // Step count is authoritative: the last time is exactly 10 * dt.
        assert_eq!(traj.final_sample().0, 10.0 * 0.1);
    }

    #[test]
    fn zero_steps_yields_only_the_initial_sample() {
        let sim = Simulator::new(IntegratorKind::Euler, 0.1).expect("valid");
        let traj = sim
            .run(&oscillator(), &[1.0, 0.0], &StopCondition::steps(0))
            .expect("run");
        assert_eq!(traj.len(), 1);
    }

    #[test]
    fn predicate_is_checked_after_each_step() {
        let sim = Simulator::new(IntegratorKind::EulerCromer, 0.01).expect("valid");
        let traj = sim
            .run(
                &falling(),
                &[1.0, 0.0],
                &StopCondition::until(|s: &[f64], _t| s[0] <= 0.0),
            )
            .expect("run");
        let (t_end, last) = traj.final_sample();
        assert!(last[0] <= 0.0);
        let (_, previous) = traj.sample(traj.len() - 2).expect("previous sample");
        assert!(previous[0] > 0.0);
        // Analytic fall time from 1 m is ~0.4515 s.
        assert!((t_end - 0.45).abs() < 0.02);
    }

    #[test]
    fn predicate_already_true_still_takes_one_step() {
        let sim = Simulator::new(IntegratorKind::Rk4, 0.1).expect("valid");
        let traj = sim
            .run(&oscillator(), &[1.0, 0.0], &StopCondition::until(|_s: &[f64], _t| true))
            .expect("run");
        assert_eq!(traj.len(), 2);
    }

    #[test]
    fn non_terminating_predicate_is_bounded() {
        let sim = Simulator::new(IntegratorKind::Rk4, 0.1).expect("valid");
        let stop = StopCondition::until(|s: &[f64], _t| s[0] > 10.0).with_max_steps(500);
        let err = sim.run(&oscillator(), &[1.0, 0.0], &stop).expect_err("never fires");
        match err {
            SimulationError::ResourceExceeded { max_steps, time } => {
                assert_eq!(max_steps, 500);
                assert!((time - 50.0).abs() < 1e-9);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn unstable_runs_report_non_finite_state() {
        let blowup = FnField::new(1, |_t: f64, x: &[f64], out: &mut [f64]| out[0] = x[0] * x[0]);
        let sim = Simulator::new(IntegratorKind::Euler, 0.5).expect("valid");
        let err = sim
            .run(&blowup, &[10.0], &StopCondition::steps(100))
            .expect_err("overflows");
        assert!(matches!(err, SimulationError::NonFiniteState { .. }));
    }

    #[test]
    fn record_every_thins_samples_but_keeps_the_last() {
        let sim = Simulator::new(IntegratorKind::Rk4, 0.1)
            .expect("valid")
            .with_record_every(4)
            .expect("valid stride");
        let traj = sim
            .run(&oscillator(), &[1.0, 0.0], &StopCondition::steps(10))
            .expect("run");
        let times: Vec<f64> = traj.times().iter().map(|t| (t * 10.0).round()).collect();
        assert_eq!(times, vec![0.0, 4.0, 8.0, 10.0]);
    }

    #[test]
    fn start_time_offsets_every_sample() {
        let sim = Simulator::new(IntegratorKind::Rk4, 0.5)
            .expect("valid")
            .with_start_time(2.0)
            .expect("valid start");
        let traj = sim
            .run(&oscillator(), &[1.0, 0.0], &StopCondition::steps(2))
            .expect("run");
        assert_eq!(traj.times(), &[2.0, 2.5, 3.0]);
    }

    #[test]
    fn invalid_setups_fail_fast() {
        assert!(Simulator::new(IntegratorKind::Rk4, 0.0).is_err());
        assert!(Simulator::new(IntegratorKind::Rk4, -0.1).is_err());
        assert!(Simulator::new(IntegratorKind::Rk4, f64::INFINITY).is_err());
        assert!(Simulator::new(IntegratorKind::Rk4, 0.1)
            .expect("valid")
            .with_record_every(0)
            .is_err());

        let sim = Simulator::new(IntegratorKind::Rk4, 0.1).expect("valid");
        let field = oscillator();
        assert!(sim.run(&field, &[], &StopCondition::steps(1)).is_err());
        assert!(sim.run(&field, &[1.0], &StopCondition::steps(1)).is_err());
        assert!(sim.run(&field, &[f64::NAN, 0.0], &StopCondition::steps(1)).is_err());

        let lorenz_like = FnField::new(3, |_t: f64, _x: &[f64], out: &mut [f64]| out.fill(0.0));
        let cromer = Simulator::new(IntegratorKind::EulerCromer, 0.1).expect("valid");
        let err = cromer
            .run(&lorenz_like, &[1.0, 1.0, 1.0], &StopCondition::steps(0))
            .expect_err("odd layout");
        assert!(err.to_string().contains("even length"));
    }

    #[test]
    fn steps_below_time_resolution_are_rejected() {
        // Half an ulp of 1.0 rounds two steps onto the same time.
        let tiny = Simulator::new(IntegratorKind::Euler, 1.5e-16).expect("fine from t0 = 0");
        assert!(tiny.with_start_time(1.0).is_err());

        // Passes the start-time check, then the grid spacing doubles at 2.0
        // and steps 2 and 3 round to the same time.
        let sim = Simulator::new(IntegratorKind::Euler, 2.3e-16)
            .expect("valid")
            .with_start_time(2.0 - f64::EPSILON)
            .expect("two distinct steps from t0");
        let err = sim
            .run(&falling(), &[1.0, 0.0], &StopCondition::steps(4))
            .expect_err("time stalls");
        assert!(matches!(err, SimulationError::InvalidConfiguration { .. }));
        assert!(err.to_string().contains("no longer advances"));
    }

    #[test]
    fn identical_runs_are_bit_identical() {
        let sim = Simulator::new(IntegratorKind::Rk4, 0.01).expect("valid");
        let a = sim
            .run(&oscillator(), &[0.3, 0.1], &StopCondition::steps(500))
            .expect("run");
        let b = sim
            .run(&oscillator(), &[0.3, 0.1], &StopCondition::steps(500))
            .expect("run");
        assert_eq!(a, b);
    }

    #[test]
    fn config_parses_from_json() {
        let config: SimulationConfig = serde_json::from_str(
            r#"{"integrator": "euler_cromer", "dt": 0.001,
                "stop": {"mode": "steps", "count": 20}}"#,
        )
        .expect("parse");
        assert_eq!(config.integrator, IntegratorKind::EulerCromer);
        assert_eq!(config.t0, 0.0);
        assert_eq!(config.record_every, 1);
        assert_eq!(config.stop, StopRule::Steps { count: 20 });

        let traj = config.run_steps(&oscillator(), &[1.0, 0.0]).expect("run");
        assert_eq!(traj.len(), 21);

        let config: SimulationConfig = serde_json::from_str(
            r#"{"integrator": "rk4", "dt": 0.01, "stop": {"mode": "predicate"}}"#,
        )
        .expect("parse");
        assert_eq!(
            config.stop,
            StopRule::Predicate {
                max_steps: DEFAULT_MAX_STEPS
            }
        );
        assert!(config.run_steps(&oscillator(), &[1.0, 0.0]).is_err());
        let stop = config.stop_condition(|s: &[f64], _t| s[0] < 0.0);
        let traj = config
            .simulator()
            .expect("valid")
            .run(&oscillator(), &[1.0, 0.0], &stop)
            .expect("run");
        // cos(t) first drops below zero just after pi/2.
        assert!((traj.final_sample().0 - std::f64::consts::FRAC_PI_2).abs() < 0.011);
    }

    #[test]
    fn config_rejects_unknown_integrator_and_bad_values() {
        let parsed: Result<SimulationConfig, _> = serde_json::from_str(
            r#"{"integrator": "leapfrog", "dt": 0.1, "stop": {"mode": "steps", "count": 1}}"#,
        );
        assert!(parsed.is_err());

        let mut config =
            SimulationConfig::new(IntegratorKind::Rk4, -1.0, StopRule::Steps { count: 1 });
        assert!(config.validate().is_err());
        config.dt = 0.1;
        config.record_every = 0;
        assert!(config.validate().is_err());
        config.record_every = 1;
        config.stop = StopRule::Predicate { max_steps: 0 };
        assert!(config.validate().is_err());
    }
}
