//! The `motion_core` crate is a small fixed-step engine for the mechanics of
//! low-dimensional systems: falling bodies, oscillators, pendulums, coupled
//! springs, orbits and chaotic flows.
//!
//! Key components:
//! - **Traits**: `Scalar` (numeric type abstraction), `VectorField` (the
//!   model), `Steppable` (solvers).
//! - **Solvers**: Explicit Euler, semi-implicit Euler (Euler-Cromer) and RK4,
//!   selected by `IntegratorKind`.
//! - **Simulator**: Runs a field for a fixed step count or until a bounded
//!   stop predicate fires, producing a `Trajectory`.
//! - **Events / Analysis**: Zero crossings, interpolated extrema, period and
//!   amplitude, energy, work, divergence of nearby runs.
//! - **Spectrum / Modes**: FFT amplitude spectra and normal modes of spring
//!   chains.

pub mod analysis;
pub mod error;
pub mod events;
pub mod models;
pub mod modes;
pub mod simulator;
pub mod solvers;
pub mod spectrum;
pub mod sweep;
pub mod trajectory;
pub mod traits;
