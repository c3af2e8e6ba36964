use crate::error::SimulationResult;
use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// Floating-point types the integrators are generic over (`f64`, `f32`).
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// A physical model expressed as a first-order vector field dx/dt = f(t, x).
///
/// Implementations must be pure functions of `(t, x)`: integrators call
/// `apply` several times per step (four times for RK4).
pub trait VectorField<T: Scalar> {
    /// Returns the dimension of the state space.
    fn dimension(&self) -> usize;

    /// Evaluates the vector field.
    /// t: current time
    /// x: current state
    /// out: buffer to write dx/dt into
    fn apply(&self, t: T, x: &[T], out: &mut [T]);

    /// Allocating convenience wrapper around `apply`.
    fn evaluate(&self, t: T, x: &[T]) -> Vec<T> {
        let mut out = vec![T::zero(); self.dimension()];
        self.apply(t, x, &mut out);
        out
    }
}

impl<T: Scalar, F: VectorField<T> + ?Sized> VectorField<T> for &F {
    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn apply(&self, t: T, x: &[T], out: &mut [T]) {
        (**self).apply(t, x, out)
    }
}

/// A trait for solvers that can step a system forward.
pub trait Steppable<T: Scalar> {
    /// Performs one step of size dt.
    /// t: current time (updated after step)
    /// state: current state (updated after step)
    /// dt: step size
    fn step(
        &mut self,
        field: &impl VectorField<T>,
        t: &mut T,
        state: &mut [T],
        dt: T,
    ) -> SimulationResult<()>;
}

/// Wraps a closure `f(t, x, out)` of known dimension as a `VectorField`.
pub struct FnField<F> {
    dimension: usize,
    f: F,
}

impl<F> FnField<F> {
    pub fn new(dimension: usize, f: F) -> Self {
        Self { dimension, f }
    }
}

impl<T, F> VectorField<T> for FnField<F>
where
    T: Scalar,
    F: Fn(T, &[T], &mut [T]),
{
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn apply(&self, t: T, x: &[T], out: &mut [T]) {
        (self.f)(t, x, out)
    }
}

#[cfg(test)]
mod tests {
    use super::{FnField, VectorField};

    #[test]
    fn fn_field_reports_dimension_and_evaluates() {
        let field = FnField::new(2, |t: f64, x: &[f64], out: &mut [f64]| {
            out[0] = x[1];
            out[1] = -x[0] + t;
        });
        assert_eq!(VectorField::<f64>::dimension(&field), 2);
        assert_eq!(field.evaluate(1.0, &[2.0, 3.0]), vec![3.0, -1.0]);
    }

    #[test]
    fn references_forward_to_the_field() {
        let field = FnField::new(1, |_t: f64, x: &[f64], out: &mut [f64]| out[0] = 2.0 * x[0]);
        let by_ref = &field;
        assert_eq!(by_ref.evaluate(0.0, &[4.0]), vec![8.0]);
    }
}
