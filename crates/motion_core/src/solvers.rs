use crate::error::{SimulationError, SimulationResult};
use crate::traits::{Scalar, Steppable, VectorField};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Validates `dt` and the field/state dimensions before any evaluation.
fn check_step<T: Scalar>(field: &impl VectorField<T>, state: &[T], dt: T) -> SimulationResult<()> {
    if !(dt > T::zero()) || !dt.is_finite() {
        return Err(SimulationError::invalid(format!(
            "Step size dt must be positive and finite, got {:?}.",
            dt
        )));
    }
    if field.dimension() != state.len() {
        return Err(SimulationError::invalid(format!(
            "Vector field dimension ({}) does not match state dimension ({}).",
            field.dimension(),
            state.len()
        )));
    }
    Ok(())
}

fn ensure_len<T: Scalar>(buffer: &mut Vec<T>, dim: usize) {
    if buffer.len() != dim {
        buffer.resize(dim, T::zero());
    }
}

/// Forward (explicit) Euler: y_next = y + dt * f(t, y).
///
/// Position and velocity slots are advanced from the same pre-step
/// derivative, so positions move with the old velocity.
pub struct ExplicitEuler<T: Scalar> {
    deriv: Vec<T>,
}

impl<T: Scalar> ExplicitEuler<T> {
    pub fn new(dim: usize) -> Self {
        Self {
            deriv: vec![T::zero(); dim],
        }
    }
}

impl<T: Scalar> Steppable<T> for ExplicitEuler<T> {
    fn step(
        &mut self,
        field: &impl VectorField<T>,
        t: &mut T,
        state: &mut [T],
        dt: T,
    ) -> SimulationResult<()> {
        check_step(field, state, dt)?;
        ensure_len(&mut self.deriv, state.len());

        let t0 = *t;
        field.apply(t0, state, &mut self.deriv);
        for i in 0..state.len() {
            state[i] = state[i] + dt * self.deriv[i];
        }

        *t = t0 + dt;
        Ok(())
    }
}

/// Semi-implicit Euler (Euler-Cromer).
///
/// Expects the state laid out as `[positions.., velocities..]` with the
/// velocity slots' derivatives being accelerations. Velocities are updated
/// first from the acceleration at the current state; positions are then
/// advanced with the *updated* velocities.
pub struct SemiImplicitEuler<T: Scalar> {
    deriv: Vec<T>,
}

impl<T: Scalar> SemiImplicitEuler<T> {
    pub fn new(dim: usize) -> Self {
        Self {
            deriv: vec![T::zero(); dim],
        }
    }
}

impl<T: Scalar> Steppable<T> for SemiImplicitEuler<T> {
    fn step(
        &mut self,
        field: &impl VectorField<T>,
        t: &mut T,
        state: &mut [T],
        dt: T,
    ) -> SimulationResult<()> {
        check_step(field, state, dt)?;
        if state.is_empty() || state.len() % 2 != 0 {
            return Err(SimulationError::invalid(format!(
                "Semi-implicit Euler needs a [positions, velocities] state of even length, got {}.",
                state.len()
            )));
        }
        ensure_len(&mut self.deriv, state.len());

        let t0 = *t;
        let n = state.len() / 2;
        field.apply(t0, state, &mut self.deriv);

        // Velocities first...
        for i in n..state.len() {
            state[i] = state[i] + dt * self.deriv[i];
        }
        // ...then positions with the new velocities.
        for i in 0..n {
            state[i] = state[i] + dt * state[n + i];
        }

        *t = t0 + dt;
        Ok(())
    }
}

/// Classic Runge-Kutta 4th Order Solver
pub struct RK4<T: Scalar> {
    k1: Vec<T>,
    k2: Vec<T>,
    k3: Vec<T>,
    k4: Vec<T>,
    tmp: Vec<T>,
}

impl<T: Scalar> RK4<T> {
    pub fn new(dim: usize) -> Self {
        Self {
            k1: vec![T::zero(); dim],
            k2: vec![T::zero(); dim],
            k3: vec![T::zero(); dim],
            k4: vec![T::zero(); dim],
            tmp: vec![T::zero(); dim],
        }
    }
}

impl<T: Scalar> Steppable<T> for RK4<T> {
    fn step(
        &mut self,
        field: &impl VectorField<T>,
        t: &mut T,
        state: &mut [T],
        dt: T,
    ) -> SimulationResult<()> {
        check_step(field, state, dt)?;
        let dim = state.len();
        for buffer in [
            &mut self.k1,
            &mut self.k2,
            &mut self.k3,
            &mut self.k4,
            &mut self.tmp,
        ] {
            ensure_len(buffer, dim);
        }

        let two = T::one() + T::one();
        let half = T::one() / two;
        let sixth = T::one() / (two + two + two);

        let t0 = *t;

        // k1 = f(t, y)
        field.apply(t0, state, &mut self.k1);

        // k2 = f(t + dt/2, y + dt*k1/2)
        for i in 0..dim {
            self.tmp[i] = state[i] + dt * self.k1[i] * half;
        }
        field.apply(t0 + dt * half, &self.tmp, &mut self.k2);

        // k3 = f(t + dt/2, y + dt*k2/2)
        for i in 0..dim {
            self.tmp[i] = state[i] + dt * self.k2[i] * half;
        }
        field.apply(t0 + dt * half, &self.tmp, &mut self.k3);

        // k4 = f(t + dt, y + dt*k3)
        for i in 0..dim {
            self.tmp[i] = state[i] + dt * self.k3[i];
        }
        field.apply(t0 + dt, &self.tmp, &mut self.k4);

        // y_next = y + dt/6 * (k1 + 2k2 + 2k3 + k4)
        for i in 0..dim {
            state[i] = state[i]
                + dt * sixth * (self.k1[i] + two * self.k2[i] + two * self.k3[i] + self.k4[i]);
        }

        *t = t0 + dt;
        Ok(())
    }
}

/// Integrator selection as it appears in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegratorKind {
    Euler,
    EulerCromer,
    Rk4,
}

impl IntegratorKind {
    pub const ALL: [IntegratorKind; 3] = [
        IntegratorKind::Euler,
        IntegratorKind::EulerCromer,
        IntegratorKind::Rk4,
    ];

    pub fn name(self) -> &'static str {
        match self {
            IntegratorKind::Euler => "euler",
            IntegratorKind::EulerCromer => "euler_cromer",
            IntegratorKind::Rk4 => "rk4",
        }
    }

    pub fn build<T: Scalar>(self, dim: usize) -> Stepper<T> {
        match self {
            IntegratorKind::Euler => Stepper::Euler(ExplicitEuler::new(dim)),
            IntegratorKind::EulerCromer => Stepper::EulerCromer(SemiImplicitEuler::new(dim)),
            IntegratorKind::Rk4 => Stepper::Rk4(RK4::new(dim)),
        }
    }
}

impl fmt::Display for IntegratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IntegratorKind {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "euler" => Ok(IntegratorKind::Euler),
            "euler_cromer" | "euler-cromer" => Ok(IntegratorKind::EulerCromer),
            "rk4" => Ok(IntegratorKind::Rk4),
            other => Err(SimulationError::invalid(format!(
                "Unknown integrator \"{other}\" (expected euler, euler_cromer or rk4)."
            ))),
        }
    }
}

/// A concrete integrator chosen at run time.
pub enum Stepper<T: Scalar> {
    Euler(ExplicitEuler<T>),
    EulerCromer(SemiImplicitEuler<T>),
    Rk4(RK4<T>),
}

impl<T: Scalar> Stepper<T> {
    pub fn kind(&self) -> IntegratorKind {
        match self {
            Stepper::Euler(_) => IntegratorKind::Euler,
            Stepper::EulerCromer(_) => IntegratorKind::EulerCromer,
            Stepper::Rk4(_) => IntegratorKind::Rk4,
        }
    }

    /// Advances a copy of `state` by one step and returns the new state.
    pub fn advance(
        &mut self,
        field: &impl VectorField<T>,
        t: T,
        state: &[T],
        dt: T,
    ) -> SimulationResult<Vec<T>> {
        let mut next = state.to_vec();
        let mut time = t;
        self.step(field, &mut time, &mut next, dt)?;
        Ok(next)
    }
}

impl<T: Scalar> Steppable<T> for Stepper<T> {
    fn step(
        &mut self,
        field: &impl VectorField<T>,
        t: &mut T,
        state: &mut [T],
        dt: T,
    ) -> SimulationResult<()> {
        match self {
            Stepper::Euler(s) => s.step(field, t, state, dt),
            Stepper::EulerCromer(s) => s.step(field, t, state, dt),
            Stepper::Rk4(s) => s.step(field, t, state, dt),
        }
    }
}
