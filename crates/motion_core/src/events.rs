//! Event detection on recorded trajectories.
//!
//! Crossings of a scalar observable through a level are located by linear
//! interpolation inside the bracketing pair of samples. Extrema are located
//! by fitting the parabola through the sample and its two neighbours and
//! reporting its vertex, which resolves peaks far below the grid spacing.
//! Period and amplitude estimates are built on top of the extrema.

use crate::error::{SimulationError, SimulationResult};
use crate::trajectory::TrajectoryView;
use serde::{Deserialize, Serialize};

/// A located event: the interpolated time and the observable's value there.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub time: f64,
    pub value: f64,
}

/// Which sign changes count as crossings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// From below the level to on or above it.
    Rising,
    /// From above the level to on or below it.
    Falling,
    Either,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtremumKind {
    Maximum,
    Minimum,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extremum {
    pub kind: ExtremumKind,
    pub time: f64,
    pub value: f64,
    /// Index of the bracketing centre sample.
    pub index: usize,
}

impl Extremum {
    pub fn event(&self) -> Event {
        Event {
            time: self.time,
            value: self.value,
        }
    }
}

/// Period and amplitude measured from the extrema of one coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Oscillation {
    pub period: f64,
    pub amplitude: f64,
    /// Same-sign extrema the period was averaged over.
    pub extrema_used: usize,
    /// Which extrema the period was taken from.
    pub measured_on: ExtremumKind,
}

impl Oscillation {
    pub fn frequency(&self) -> f64 {
        1.0 / self.period
    }

    pub fn angular_frequency(&self) -> f64 {
        2.0 * std::f64::consts::PI / self.period
    }
}

impl Direction {
    fn accepts(self, rising: bool) -> bool {
        match self {
            Direction::Rising => rising,
            Direction::Falling => !rising,
            Direction::Either => true,
        }
    }
}

fn scan_crossings<F>(
    view: &TrajectoryView<'_>,
    observable: F,
    level: f64,
    direction: Direction,
    first_only: bool,
) -> Vec<Event>
where
    F: Fn(f64, &[f64]) -> f64,
{
    let mut events = Vec::new();
    let mut samples = view.samples();
    let Some((mut t_prev, state)) = samples.next() else {
        return events;
    };
    let mut g_prev = observable(t_prev, state) - level;
    // Side of the level the signal is on: Some(true) above, Some(false)
    // below, None while sitting on it (or right after a crossing landed
    // exactly on a sample).
    let mut side = (g_prev != 0.0).then_some(g_prev > 0.0);

    for (t, state) in samples {
        let g = observable(t, state) - level;
        let crossing = if g == 0.0 {
            // Landing on the level counts once, at the sample, in the
            // direction it arrived from.
            let arrival = side.map(|above| (t, !above));
            side = None;
            arrival
        } else {
            let above = g > 0.0;
            let crossed = match side {
                // Opposite signs, so g_prev != g.
                Some(was_above) if was_above != above => {
                    Some((t_prev + (t - t_prev) * g_prev / (g_prev - g), above))
                }
                _ => None,
            };
            side = Some(above);
            crossed
        };

        if let Some((time, rising)) = crossing {
            if direction.accepts(rising) {
                events.push(Event { time, value: level });
                if first_only {
                    break;
                }
            }
        }
        t_prev = t;
        g_prev = g;
    }
    events
}

/// Every crossing of `observable(t, state)` through `level`, in time order.
pub fn crossings<F>(
    view: &TrajectoryView<'_>,
    observable: F,
    level: f64,
    direction: Direction,
) -> Vec<Event>
where
    F: Fn(f64, &[f64]) -> f64,
{
    scan_crossings(view, observable, level, direction, false)
}

/// The earliest crossing of `observable(t, state)` through `level`.
pub fn first_crossing<F>(
    view: &TrajectoryView<'_>,
    observable: F,
    level: f64,
    direction: Direction,
) -> Option<Event>
where
    F: Fn(f64, &[f64]) -> f64,
{
    scan_crossings(view, observable, level, direction, true)
        .into_iter()
        .next()
}

/// Every crossing of coordinate `index` through `level`.
pub fn column_crossings(
    view: &TrajectoryView<'_>,
    index: usize,
    level: f64,
    direction: Direction,
) -> SimulationResult<Vec<Event>> {
    check_index(view, index)?;
    Ok(crossings(view, |_, s| s[index], level, direction))
}

/// The earliest crossing of coordinate `index` through `level`.
pub fn first_column_crossing(
    view: &TrajectoryView<'_>,
    index: usize,
    level: f64,
    direction: Direction,
) -> SimulationResult<Option<Event>> {
    check_index(view, index)?;
    Ok(first_crossing(view, |_, s| s[index], level, direction))
}

fn check_index(view: &TrajectoryView<'_>, index: usize) -> SimulationResult<()> {
    if index >= view.dimension() {
        return Err(SimulationError::invalid(format!(
            "Coordinate index {} out of range for dimension {}.",
            index,
            view.dimension()
        )));
    }
    Ok(())
}

/// Vertex of the parabola through three samples.
///
/// Falls back to the centre sample when the three points are colinear (or
/// numerically so): there is no vertex to report.
pub fn quadratic_vertex(t: [f64; 3], y: [f64; 3]) -> (f64, f64) {
    let d01 = (y[1] - y[0]) / (t[1] - t[0]);
    let d12 = (y[2] - y[1]) / (t[2] - t[1]);
    let curvature = (d12 - d01) / (t[2] - t[0]);
    if curvature == 0.0 || !curvature.is_finite() {
        return (t[1], y[1]);
    }

    // p(s) = y0 + d01 (s - t0) + curvature (s - t0)(s - t1)
    let vertex = 0.5 * (t[0] + t[1]) - d01 / (2.0 * curvature);
    if !vertex.is_finite() {
        return (t[1], y[1]);
    }
    let value = y[0] + d01 * (vertex - t[0]) + curvature * (vertex - t[0]) * (vertex - t[1]);
    (vertex, value)
}

/// Local extrema of an observable, refined by quadratic interpolation.
///
/// Sample `i` is a maximum when it is strictly greater than both neighbours
/// (strictly smaller for a minimum); flat plateaus are not reported.
pub fn extrema<F>(view: &TrajectoryView<'_>, observable: F) -> Vec<Extremum>
where
    F: Fn(f64, &[f64]) -> f64,
{
    let times = view.times();
    let values = view.map(observable);
    let mut found = Vec::new();
    if values.len() < 3 {
        return found;
    }

    for i in 1..values.len() - 1 {
        let (prev, here, next) = (values[i - 1], values[i], values[i + 1]);
        let kind = if here > prev && here > next {
            ExtremumKind::Maximum
        } else if here < prev && here < next {
            ExtremumKind::Minimum
        } else {
            continue;
        };
        let (time, value) = quadratic_vertex(
            [times[i - 1], times[i], times[i + 1]],
            [prev, here, next],
        );
        found.push(Extremum {
            kind,
            time,
            value,
            index: i,
        });
    }
    found
}

/// Local extrema of coordinate `index`.
pub fn column_extrema(
    view: &TrajectoryView<'_>,
    index: usize,
) -> SimulationResult<Vec<Extremum>> {
    check_index(view, index)?;
    Ok(extrema(view, |_, s| s[index]))
}

/// Largest interpolated maximum of an observable (e.g. projectile apex).
pub fn global_maximum<F>(view: &TrajectoryView<'_>, observable: F) -> Option<Extremum>
where
    F: Fn(f64, &[f64]) -> f64,
{
    extrema(view, observable)
        .into_iter()
        .filter(|e| e.kind == ExtremumKind::Maximum)
        .max_by(|a, b| a.value.total_cmp(&b.value))
}

/// Mean spacing between consecutive extrema of the same kind.
pub fn period_from_extrema(found: &[Extremum], kind: ExtremumKind) -> SimulationResult<f64> {
    let times: Vec<f64> = found
        .iter()
        .filter(|e| e.kind == kind)
        .map(|e| e.time)
        .collect();
    if times.len() < 2 {
        return Err(SimulationError::insufficient(format!(
            "Need at least two {:?} extrema to measure a period, found {}.",
            kind,
            times.len()
        )));
    }
    let span = times[times.len() - 1] - times[0];
    Ok(span / (times.len() - 1) as f64)
}

/// Half the peak-to-trough range of the interpolated extrema.
pub fn amplitude_from_extrema(found: &[Extremum]) -> SimulationResult<f64> {
    let peak = found
        .iter()
        .filter(|e| e.kind == ExtremumKind::Maximum)
        .map(|e| e.value)
        .max_by(f64::total_cmp);
    let trough = found
        .iter()
        .filter(|e| e.kind == ExtremumKind::Minimum)
        .map(|e| e.value)
        .min_by(f64::total_cmp);
    match (peak, trough) {
        (Some(peak), Some(trough)) => Ok(0.5 * (peak - trough)),
        _ => Err(SimulationError::insufficient(
            "Need at least one maximum and one minimum to measure an amplitude.",
        )),
    }
}

/// Period of coordinate `index` from successive extrema of one kind.
pub fn period(
    view: &TrajectoryView<'_>,
    index: usize,
    kind: ExtremumKind,
) -> SimulationResult<f64> {
    let found = column_extrema(view, index)?;
    period_from_extrema(&found, kind)
}

/// Half the peak-to-trough range of coordinate `index`.
pub fn amplitude(view: &TrajectoryView<'_>, index: usize) -> SimulationResult<f64> {
    let found = column_extrema(view, index)?;
    amplitude_from_extrema(&found)
}

/// Period and amplitude of coordinate `index`, typically on a steady-state
/// slice. The period is measured peak to peak, or trough to trough when
/// fewer than two peaks are present.
pub fn oscillation(view: &TrajectoryView<'_>, index: usize) -> SimulationResult<Oscillation> {
    let found = column_extrema(view, index)?;
    let amplitude = amplitude_from_extrema(&found)?;

    let (period, measured_on) = match period_from_extrema(&found, ExtremumKind::Maximum) {
        Ok(period) => (period, ExtremumKind::Maximum),
        Err(_) => (
            period_from_extrema(&found, ExtremumKind::Minimum)?,
            ExtremumKind::Minimum,
        ),
    };
    let extrema_used = found.iter().filter(|e| e.kind == measured_on).count();

    Ok(Oscillation {
        period,
        amplitude,
        extrema_used,
        measured_on,
    })
}
