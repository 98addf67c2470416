//! Time reversal of flow-field series for backward tracking
//!
//! A forward-only tracking model answers a backward question when it replays
//! the flow history in reverse. Reversal reorders frames, mirrors every span
//! about the series window and renumbers periods and steps. Head and flux
//! values are copied unchanged; the flux sign is never flipped.

use super::frame::{FlowFieldFrame, FlowFieldTimeSeries, TimeSpan};
use crate::error::ReversalError;
use rustc_hash::FxHashMap;
use tracing::{debug, info};

/// Produces time-reversed flow-field series
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowFieldReverser;

impl FlowFieldReverser {
    pub fn new() -> Self {
        Self
    }

    /// Reverse a validated series
    ///
    /// Frame `k` of the output is frame `n - 1 - k` of the input with its span
    /// mirrored to `[T0 + TN - end, T0 + TN - start]`, where `[T0, TN]` is the
    /// series window. A series starting at 0 therefore still starts at 0 and
    /// each span keeps its length. The mirror is taken on the integer tick
    /// grid, so reversing twice restores every boundary bit for bit. Stress
    /// periods and time steps are renumbered the same way
    /// (`first + last - index`).
    pub fn reverse(
        &self,
        series: &FlowFieldTimeSeries,
    ) -> Result<FlowFieldTimeSeries, ReversalError> {
        series.validate()?;
        let window = series.window().ok_or(ReversalError::Empty)?;
        let (t0, tn) = window.ticks();
        let pivot = t0 + tn;

        let (first_period, last_period) = series
            .frames
            .iter()
            .fold((usize::MAX, 0), |(lo, hi), f| {
                (lo.min(f.stress_period), hi.max(f.stress_period))
            });
        let mut step_range: FxHashMap<usize, (usize, usize)> = FxHashMap::default();
        for frame in &series.frames {
            let range = step_range
                .entry(frame.stress_period)
                .or_insert((usize::MAX, 0));
            range.0 = range.0.min(frame.time_step);
            range.1 = range.1.max(frame.time_step);
        }

        let frames = series
            .frames
            .iter()
            .rev()
            .map(|frame| {
                let (lo, hi) = step_range
                    .get(&frame.stress_period)
                    .copied()
                    .unwrap_or((frame.time_step, frame.time_step));
                let (start, end) = frame.span.ticks();
                FlowFieldFrame {
                    stress_period: first_period + last_period - frame.stress_period,
                    time_step: lo + hi - frame.time_step,
                    span: TimeSpan::from_ticks(pivot - end, pivot - start),
                    head: frame.head.clone(),
                    face_flux: frame.face_flux.clone(),
                }
            })
            .collect();

        let reversed = FlowFieldTimeSeries { frames };
        debug!(
            "Reversed window [{}, {}] over {} frames",
            window.start(),
            window.end(),
            reversed.len()
        );
        info!(
            "Flow field reversed: {} frames, {} time units",
            reversed.len(),
            reversed.total_duration()
        );
        Ok(reversed)
    }
}

/// Reverse a flow-field series (see [`FlowFieldReverser::reverse`])
pub fn reverse(series: &FlowFieldTimeSeries) -> Result<FlowFieldTimeSeries, ReversalError> {
    FlowFieldReverser.reverse(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::frame::{StressPeriod, TimeDiscretization};
    use rand::{Rng, SeedableRng};

    fn frame(sp: usize, ts: usize, start: f64, end: f64, value: f64) -> FlowFieldFrame {
        FlowFieldFrame {
            stress_period: sp,
            time_step: ts,
            span: TimeSpan::new(start, end),
            head: vec![value, 2.0 * value],
            face_flux: vec![vec![value, -value, 0.0]],
        }
    }

    #[test]
    fn test_reverse_orders_and_rebases() {
        let series = FlowFieldTimeSeries::new(vec![
            frame(1, 1, 0.0, 100.0, 1.0),
            frame(2, 1, 100.0, 400.0, 2.0),
            frame(2, 2, 400.0, 1000.0, 3.0),
        ])
        .unwrap();
        let reversed = reverse(&series).unwrap();

        let spans: Vec<(f64, f64)> = reversed
            .frames
            .iter()
            .map(|f| (f.span.start(), f.span.end()))
            .collect();
        assert_eq!(spans, vec![(0.0, 600.0), (600.0, 900.0), (900.0, 1000.0)]);

        let labels: Vec<(usize, usize)> = reversed
            .frames
            .iter()
            .map(|f| (f.stress_period, f.time_step))
            .collect();
        assert_eq!(labels, vec![(1, 1), (1, 2), (2, 1)]);

        // Content follows its frame, sign untouched
        assert_eq!(reversed.frames[0].head, vec![3.0, 6.0]);
        assert_eq!(reversed.frames[0].face_flux, vec![vec![3.0, -3.0, 0.0]]);
        assert!(reversed.validate().is_ok());
    }

    #[test]
    fn test_reverse_empty_fails() {
        assert!(matches!(
            reverse(&FlowFieldTimeSeries::default()),
            Err(ReversalError::Empty)
        ));
    }

    #[test]
    fn test_reverse_non_monotonic_fails() {
        let series = FlowFieldTimeSeries {
            frames: vec![frame(1, 1, 0.0, 10.0, 1.0), frame(1, 2, 5.0, 20.0, 1.0)],
        };
        assert!(matches!(
            reverse(&series),
            Err(ReversalError::NonMonotonic { frame: 1, .. })
        ));
    }

    #[test]
    fn test_single_steady_frame_is_fixed_point() {
        let series = FlowFieldTimeSeries::steady(
            &TimeDiscretization::default(),
            &[320.0, 318.5],
            &[vec![1.0, -1.0]],
        )
        .unwrap();
        assert_eq!(reverse(&series).unwrap(), series);
    }

    fn random_series(
        rng: &mut rand::rngs::StdRng,
        periods: Vec<StressPeriod>,
    ) -> FlowFieldTimeSeries {
        // Face counts vary per node (refined neighbours) but not per frame
        let faces: Vec<usize> = (0..4).map(|_| rng.random_range(4..7)).collect();
        let frames = TimeDiscretization::new(periods)
            .steps()
            .unwrap()
            .into_iter()
            .map(|step| FlowFieldFrame {
                stress_period: step.stress_period,
                time_step: step.time_step,
                span: step.span,
                head: (0..4).map(|_| rng.random_range(-10.0..10.0)).collect(),
                face_flux: faces
                    .iter()
                    .map(|&n| (0..n).map(|_| rng.random_range(-1.0..1.0)).collect())
                    .collect(),
            })
            .collect();
        FlowFieldTimeSeries::new(frames).unwrap()
    }

    #[test]
    fn test_double_reverse_is_identity() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let periods: Vec<StressPeriod> = (0..rng.random_range(1..5))
                .map(|_| {
                    let nstp = rng.random_range(1..6usize);
                    let perlen = rng.random_range(1.0..5000.0);
                    let tsmult = if rng.random_bool(0.3) {
                        1.0
                    } else {
                        rng.random_range(0.5..2.5)
                    };
                    StressPeriod::new(perlen, nstp, tsmult)
                })
                .collect();
            let series = random_series(&mut rng, periods);

            let twice = reverse(&reverse(&series).unwrap()).unwrap();
            assert_eq!(twice, series);
        }
    }

    #[test]
    fn test_geometric_steps_survive_double_reverse() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(11);
        let series = random_series(&mut rng, vec![StressPeriod::new(1000.0, 3, 1.5)]);
        assert_eq!(series.frames[0].span.end(), 210.526_316);

        let once = reverse(&series).unwrap();
        assert_eq!(once.frames[0].span.start(), 0.0);
        assert_eq!(once.frames[2].span.start(), 789.473_684);
        assert_eq!(reverse(&once).unwrap(), series);
    }

    #[test]
    fn test_decimal_boundaries_survive_double_reverse() {
        let series = FlowFieldTimeSeries::new(vec![
            frame(1, 1, 0.0, 0.1, 1.0),
            frame(1, 2, 0.1, 1000.0, 2.0),
        ])
        .unwrap();
        let once = reverse(&series).unwrap();
        assert_eq!(once.frames[0].span, TimeSpan::new(0.0, 999.9));
        assert_eq!(once.frames[1].span, TimeSpan::new(999.9, 1000.0));

        let twice = reverse(&once).unwrap();
        assert_eq!(twice.frames[0].span.end(), 0.1);
        assert_eq!(twice, series);
    }
}
