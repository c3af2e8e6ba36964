//! Period, amplitude and spectral measurements on oscillating systems.

use approx::assert_relative_eq;
use motion_core::events::{column_extrema, oscillation, period, ExtremumKind};
use motion_core::models::{CoupledChain, Oscillator, Pendulum};
use motion_core::simulator::{Simulator, StopCondition};
use motion_core::solvers::IntegratorKind;
use motion_core::spectrum::amplitude_spectrum;
use motion_core::sweep::{linspace, run_sweep};
use motion_core::trajectory::Trajectory;
use std::f64::consts::PI;

#[test]
fn sampled_sine_peaks_are_interpolated() {
    // Coarse grid: T = 2 s sampled every 0.15 s puts peaks up to 0.075 s
    // away from the nearest sample.
    let times: Vec<f64> = (0..=133).map(|i| i as f64 * 0.15).collect();
    let states = times.iter().map(|&t| vec![(PI * t).sin()]).collect();
    let traj = Trajectory::from_samples(times, states).unwrap();
    let view = traj.view();

    let found = column_extrema(&view, 0).unwrap();
    let raw_worst = found
        .iter()
        .filter(|e| e.kind == ExtremumKind::Maximum)
        .map(|e| (view.state(e.index).unwrap()[0] - 1.0).abs())
        .fold(0.0, f64::max);
    let interpolated_worst = found
        .iter()
        .filter(|e| e.kind == ExtremumKind::Maximum)
        .map(|e| (e.value - 1.0).abs())
        .fold(0.0, f64::max);
    assert!(raw_worst > 0.01);
    assert!(interpolated_worst < 1e-3);

    let measured = oscillation(&view, 0).unwrap();
    assert_relative_eq!(measured.period, 2.0, epsilon = 1e-3);
    assert_relative_eq!(measured.amplitude, 1.0, epsilon = 1e-3);
    assert_eq!(measured.measured_on, ExtremumKind::Maximum);
}

fn harmonic_period_error(kind: IntegratorKind, dt: f64) -> f64 {
    // ω = 2, T = π.
    let osc = Oscillator::harmonic(1.0, 4.0).unwrap();
    let steps = (30.0 / dt).round() as usize;
    let traj = Simulator::new(kind, dt)
        .unwrap()
        .run(&osc, &[1.0, 0.0], &StopCondition::steps(steps))
        .unwrap();
    (period(&traj.view(), 0, ExtremumKind::Maximum).unwrap() - PI).abs()
}

#[test]
fn period_error_shrinks_quadratically_with_step() {
    let coarse = harmonic_period_error(IntegratorKind::EulerCromer, 0.1);
    let fine = harmonic_period_error(IntegratorKind::EulerCromer, 0.05);
    assert!(coarse < 1e-2);
    let ratio = coarse / fine;
    assert!((3.5..4.5).contains(&ratio), "ratio {ratio}");

    assert!(harmonic_period_error(IntegratorKind::Rk4, 0.05) < 1e-5);
}

#[test]
fn pendulum_period_grows_with_amplitude() {
    let pendulum = Pendulum::new(9.8, 1.0).unwrap();
    let sim = Simulator::new(IntegratorKind::Rk4, 1e-3).unwrap();
    // Exact periods from the complete elliptic integral.
    let expected = [(10.0, 2.010918), (45.0, 2.087320), (90.0, 2.369050)];
    let mut previous = pendulum.small_angle_period();
    for (degrees, exact) in expected {
        let start = [f64::to_radians(degrees), 0.0];
        let traj = sim.run(&pendulum, &start, &StopCondition::steps(10_000)).unwrap();
        let measured = period(&traj.view(), 0, ExtremumKind::Maximum).unwrap();
        assert!((measured - exact).abs() < 1e-5, "{degrees} deg: {measured}");
        assert!(measured > previous);
        previous = measured;
    }
}

#[test]
fn steady_state_slice_is_stable_under_reslicing() {
    let osc = Oscillator::harmonic(1.0, 1.0)
        .and_then(|o| o.with_damping(0.5))
        .and_then(|o| o.with_forcing(1.0, 2.0))
        .unwrap();
    let traj = Simulator::new(IntegratorKind::Rk4, 0.01)
        .unwrap()
        .run(&osc, &[2.0, 0.0], &StopCondition::steps(8_000))
        .unwrap();

    let once = traj.slice(50.0);
    let twice = once.slice(50.0);
    assert_eq!(once.len(), twice.len());
    assert_eq!(once.times(), twice.times());
    assert_eq!(once.column(0).unwrap(), twice.column(0).unwrap());

    // Steady state follows the drive: T = 2π/ωf, A = F0 / sqrt((k - mω²)² + (bω)²).
    let measured = oscillation(&once, 0).unwrap();
    assert_relative_eq!(measured.period, PI, epsilon = 1e-3);
    assert_relative_eq!(measured.amplitude, 1.0 / 10f64.sqrt(), max_relative = 1e-3);
}

#[test]
fn resonance_sweep_peaks_at_natural_frequency() {
    let (b, f0) = (0.1, 1.0);
    let drives = linspace(0.5, 1.5, 11).unwrap();
    let sweep = run_sweep(drives, |&wf| {
        let osc = Oscillator::harmonic(1.0, 1.0)?
            .with_damping(b)?
            .with_forcing(f0, wf)?;
        let traj = Simulator::new(IntegratorKind::Rk4, 0.01)?
            .with_record_every(5)?
            .run(&osc, &[0.0, 0.0], &StopCondition::steps(30_000))?;
        Ok(oscillation(&traj.slice(200.0), 0)?.amplitude)
    });
    assert_eq!(sweep.num_failed, 0);

    let results: Vec<(f64, f64)> = sweep.successful().map(|(w, a)| (*w, *a)).collect();
    for &(wf, amp) in &results {
        let expected = f0 / ((1.0 - wf * wf).powi(2) + (b * wf).powi(2)).sqrt();
        assert_relative_eq!(amp, expected, max_relative = 1e-2);
    }
    let (best, _) = results
        .iter()
        .copied()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .unwrap();
    assert_relative_eq!(best, 1.0, epsilon = 1e-9);
}

#[test]
fn forced_response_spectrum_peaks_at_drive_frequency() {
    let wf = 2.0 * PI * 0.5;
    let osc = Oscillator::harmonic(1.0, 1.0)
        .and_then(|o| o.with_damping(0.4))
        .and_then(|o| o.with_forcing(1.0, wf))
        .unwrap();
    let traj = Simulator::new(IntegratorKind::Rk4, 0.01)
        .unwrap()
        .run(&osc, &[1.0, 0.0], &StopCondition::steps(12_000))
        .unwrap();
    // 80 s window: 0.5 Hz lands exactly on bin 40.
    let steady = traj.view().window(39.995, 119.995);
    let spectrum = amplitude_spectrum(&steady, 0).unwrap();
    assert_relative_eq!(spectrum.dominant_frequency().unwrap(), 0.5, epsilon = 1e-9);
}

#[test]
fn three_mass_chain_normal_modes() {
    let chain = CoupledChain::end_anchored(3, 1.0, 1.0, 0.5).unwrap();
    let modes = chain.normal_modes().unwrap();
    let expected = [0.7071, 1.2247, 1.4142];
    for (w, e) in modes.angular_frequencies.iter().zip(expected) {
        assert!((w - e).abs() < 1e-4, "{w} vs {e}");
    }

    // Exciting the slowest mode alone keeps every mass at that frequency.
    let start = modes.excitation(0, 0.05).unwrap();
    let traj = Simulator::new(IntegratorKind::EulerCromer, 0.001)
        .unwrap()
        .run(&chain, &start, &StopCondition::steps(80_000))
        .unwrap();
    let view = traj.view();
    let target = 2.0 * PI / modes.angular_frequencies[0];
    for mass in 0..3 {
        let measured = period(&view, mass, ExtremumKind::Maximum).unwrap();
        assert!((measured - target).abs() < 1e-2, "mass {mass}: {measured}");
    }
    let outer = oscillation(&view, 0).unwrap().amplitude;
    let middle = oscillation(&view, 1).unwrap().amplitude;
    assert_relative_eq!(middle / outer, 2.0, max_relative = 1e-3);
}
