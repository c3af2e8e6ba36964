//! Discrete amplitude spectra of uniformly sampled trajectories.
//!
//! Used on steady-state slices of forced or chaotic motion where counting
//! peaks no longer gives a meaningful period.

use crate::error::{SimulationError, SimulationResult};
use crate::trajectory::TrajectoryView;
use num_complex::Complex;
use rustfft::FftPlanner;
use serde::Serialize;

/// Relative tolerance on sample spacing before a series counts as non-uniform.
const SPACING_TOLERANCE: f64 = 1e-6;

/// One-sided amplitude spectrum: `magnitudes[k]` is the amplitude of the
/// component at `frequencies[k]` Hz.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spectrum {
    pub frequencies: Vec<f64>,
    pub magnitudes: Vec<f64>,
}

impl Spectrum {
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Bin spacing in Hz.
    pub fn resolution(&self) -> f64 {
        self.frequencies.get(1).copied().unwrap_or(0.0)
    }

    /// Strongest non-DC bin as `(frequency, magnitude)`.
    pub fn peak(&self) -> SimulationResult<(f64, f64)> {
        self.frequencies
            .iter()
            .zip(&self.magnitudes)
            .skip(1)
            .fold(None, |best: Option<(f64, f64)>, (&f, &m)| match best {
                Some((_, best_m)) if best_m >= m => best,
                _ => Some((f, m)),
            })
            .ok_or_else(|| SimulationError::insufficient("Spectrum has no non-DC bins."))
    }

    pub fn dominant_frequency(&self) -> SimulationResult<f64> {
        self.peak().map(|(f, _)| f)
    }
}

/// Spectrum of coordinate `index` over the view.
pub fn amplitude_spectrum(view: &TrajectoryView<'_>, index: usize) -> SimulationResult<Spectrum> {
    let values = view.column(index)?;
    spectrum_of(view.times(), &values)
}

/// Spectrum of a scalar observable evaluated along the view.
pub fn observable_spectrum<F>(
    view: &TrajectoryView<'_>,
    observable: F,
) -> SimulationResult<Spectrum>
where
    F: Fn(f64, &[f64]) -> f64,
{
    spectrum_of(view.times(), &view.map(observable))
}

/// Amplitude spectrum of uniformly spaced samples.
///
/// Bin `k` (for `k < N/2`) sits at `k / (N dt)` Hz with amplitude
/// `2/N |X_k|`; the DC bin uses `1/N` so it reports the mean.
pub fn spectrum_of(times: &[f64], values: &[f64]) -> SimulationResult<Spectrum> {
    if times.len() != values.len() {
        return Err(SimulationError::invalid(format!(
            "Got {} sample times but {} values.",
            times.len(),
            values.len()
        )));
    }
    let n = values.len();
    if n < 4 {
        return Err(SimulationError::insufficient(format!(
            "A spectrum needs at least 4 samples, got {n}."
        )));
    }
    let dt = uniform_spacing(times)?;

    let mut buffer: Vec<Complex<f64>> = values.iter().map(|&v| Complex::new(v, 0.0)).collect();
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buffer);

    let n_f = n as f64;
    let bins = n / 2;
    let frequencies = (0..bins).map(|k| k as f64 / (n_f * dt)).collect();
    let magnitudes = buffer[..bins]
        .iter()
        .enumerate()
        .map(|(k, x)| {
            let scale = if k == 0 { 1.0 } else { 2.0 };
            scale * x.norm() / n_f
        })
        .collect();

    Ok(Spectrum {
        frequencies,
        magnitudes,
    })
}

fn uniform_spacing(times: &[f64]) -> SimulationResult<f64> {
    let span = times[times.len() - 1] - times[0];
    let dt = span / (times.len() - 1) as f64;
    if !(dt > 0.0) || !dt.is_finite() {
        return Err(SimulationError::invalid(
            "Sample times must be finite and increasing.",
        ));
    }
    if let Some(w) = times
        .windows(2)
        .find(|w| ((w[1] - w[0]) - dt).abs() > SPACING_TOLERANCE * dt.max(1.0))
    {
        return Err(SimulationError::invalid(format!(
            "Samples are not uniformly spaced: step {} differs from mean step {}.",
            w[1] - w[0],
            dt
        )));
    }
    Ok(dt)
}
