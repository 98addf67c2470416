//! Flow-field frames and time series
//!
//! A frame is one flow-solver time step: per-node head and per-node face
//! fluxes over a time span. The tracking models replay frames in order, so a
//! series must be strictly increasing in cumulative time.

use crate::error::ReversalError;
use serde::{Deserialize, Serialize};

/// Ticks per model time unit
///
/// Span boundaries sit on this integer grid so that mirroring a series about
/// its window is exact integer arithmetic.
pub const TICKS_PER_UNIT: f64 = 1.0e6;

/// Largest admissible |time|; keeps every tick count well inside f64's
/// integer range
pub const MAX_TIME: f64 = 1.0e9;

/// Half-open time interval [start, end), snapped to the tick grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawSpan", into = "RawSpan")]
pub struct TimeSpan {
    start: f64,
    end: f64,
}

#[derive(Clone, Copy, Serialize, Deserialize)]
struct RawSpan {
    start: f64,
    end: f64,
}

impl From<RawSpan> for TimeSpan {
    fn from(raw: RawSpan) -> Self {
        Self::new(raw.start, raw.end)
    }
}

impl From<TimeSpan> for RawSpan {
    fn from(span: TimeSpan) -> Self {
        Self {
            start: span.start,
            end: span.end,
        }
    }
}

fn snap(t: f64) -> f64 {
    (t * TICKS_PER_UNIT).round() / TICKS_PER_UNIT
}

impl TimeSpan {
    pub fn new(start: f64, end: f64) -> Self {
        Self {
            start: snap(start),
            end: snap(end),
        }
    }

    /// Span from tick counts
    pub fn from_ticks(start: i64, end: i64) -> Self {
        Self {
            start: start as f64 / TICKS_PER_UNIT,
            end: end as f64 / TICKS_PER_UNIT,
        }
    }

    /// (start, end) as tick counts; exact for a valid span
    pub fn ticks(&self) -> (i64, i64) {
        (
            (self.start * TICKS_PER_UNIT).round() as i64,
            (self.end * TICKS_PER_UNIT).round() as i64,
        )
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_valid(&self) -> bool {
        self.start.is_finite()
            && self.end.is_finite()
            && self.end > self.start
            && self.start.abs() <= MAX_TIME
            && self.end.abs() <= MAX_TIME
    }
}

/// One time step of flow-solver output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowFieldFrame {
    /// 1-based stress period
    pub stress_period: usize,
    /// 1-based time step within the stress period
    pub time_step: usize,
    pub span: TimeSpan,
    /// Head per node
    pub head: Vec<f64>,
    /// Volumetric flux through each face of each node
    pub face_flux: Vec<Vec<f64>>,
}

/// Ordered flow-solver output, strictly increasing in cumulative time
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FlowFieldTimeSeries {
    pub frames: Vec<FlowFieldFrame>,
}

impl FlowFieldTimeSeries {
    /// Build a series from frames, validating order and shape
    pub fn new(frames: Vec<FlowFieldFrame>) -> Result<Self, ReversalError> {
        let series = Self { frames };
        series.validate()?;
        Ok(series)
    }

    /// Replicate a steady-state field over every time step of `tdis`
    pub fn steady(
        tdis: &TimeDiscretization,
        head: &[f64],
        face_flux: &[Vec<f64>],
    ) -> Result<Self, ReversalError> {
        let frames = tdis
            .steps()?
            .into_iter()
            .map(|step| FlowFieldFrame {
                stress_period: step.stress_period,
                time_step: step.time_step,
                span: step.span,
                head: head.to_vec(),
                face_flux: face_flux.to_vec(),
            })
            .collect();
        Self::new(frames)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Series window (first start, last end)
    pub fn window(&self) -> Option<TimeSpan> {
        let first = self.frames.first()?;
        let last = self.frames.last()?;
        Some(TimeSpan::new(first.span.start(), last.span.end()))
    }

    pub fn total_duration(&self) -> f64 {
        self.window().map_or(0.0, |w| w.duration())
    }

    /// Check non-emptiness, span validity, time order and field shapes
    pub fn validate(&self) -> Result<(), ReversalError> {
        let first = self.frames.first().ok_or(ReversalError::Empty)?;
        let nodes = first.head.len();
        let faces: Vec<usize> = first.face_flux.iter().map(Vec::len).collect();

        let mut previous_end: Option<f64> = None;
        for (index, frame) in self.frames.iter().enumerate() {
            let span = frame.span;
            if !span.is_valid() {
                return Err(ReversalError::InvalidSpan {
                    frame: index,
                    start: span.start(),
                    end: span.end(),
                });
            }
            if let Some(previous_end) = previous_end {
                let tol = 1e-9 * previous_end.abs().max(1.0);
                if span.start() < previous_end - tol {
                    return Err(ReversalError::NonMonotonic {
                        frame: index,
                        start: span.start(),
                        previous_end,
                    });
                }
            }
            previous_end = Some(span.end());

            if frame.head.len() != nodes {
                return Err(ReversalError::InconsistentFrame {
                    frame: index,
                    field: "head",
                    expected: nodes,
                    found: frame.head.len(),
                });
            }
            if frame.face_flux.len() != faces.len() {
                return Err(ReversalError::InconsistentFrame {
                    frame: index,
                    field: "face-flux node",
                    expected: faces.len(),
                    found: frame.face_flux.len(),
                });
            }
            if let Some((expected, found)) = faces
                .iter()
                .zip(&frame.face_flux)
                .map(|(&expected, flux)| (expected, flux.len()))
                .find(|(expected, found)| expected != found)
            {
                return Err(ReversalError::InconsistentFrame {
                    frame: index,
                    field: "face-flux face",
                    expected,
                    found,
                });
            }
        }
        Ok(())
    }
}

/// One stress period of the time discretization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StressPeriod {
    /// Period length
    pub perlen: f64,
    /// Number of time steps
    pub nstp: usize,
    /// Step-length multiplier
    pub tsmult: f64,
}

impl StressPeriod {
    pub fn new(perlen: f64, nstp: usize, tsmult: f64) -> Self {
        Self {
            perlen,
            nstp,
            tsmult,
        }
    }

    /// Time-step lengths; each step is `tsmult` times the previous one
    pub fn step_lengths(&self) -> Vec<f64> {
        if self.nstp == 0 {
            return Vec::new();
        }
        let n = self.nstp as f64;
        let first = if (self.tsmult - 1.0).abs() < f64::EPSILON {
            self.perlen / n
        } else {
            self.perlen * (self.tsmult - 1.0) / (self.tsmult.powf(n) - 1.0)
        };
        std::iter::successors(Some(first), |dt| Some(dt * self.tsmult))
            .take(self.nstp)
            .collect()
    }
}

/// A (period, step) pair with its span
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeStep {
    pub stress_period: usize,
    pub time_step: usize,
    pub span: TimeSpan,
}

/// Flow-solver time axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeDiscretization {
    pub periods: Vec<StressPeriod>,
}

impl Default for TimeDiscretization {
    /// One 1000-day steady period with a single step
    fn default() -> Self {
        Self {
            periods: vec![StressPeriod::new(1000.0, 1, 1.0)],
        }
    }
}

impl TimeDiscretization {
    pub fn new(periods: Vec<StressPeriod>) -> Self {
        Self { periods }
    }

    pub fn total_time(&self) -> f64 {
        self.periods.iter().map(|p| p.perlen).sum()
    }

    /// Every time step in order, starting at t = 0
    pub fn steps(&self) -> Result<Vec<TimeStep>, ReversalError> {
        let mut steps = Vec::new();
        let mut t = 0.0;
        for (kper, period) in self.periods.iter().enumerate() {
            if !(period.perlen.is_finite() && period.perlen > 0.0)
                || period.nstp == 0
                || !(period.tsmult.is_finite() && period.tsmult > 0.0)
            {
                return Err(ReversalError::InvalidSpan {
                    frame: steps.len(),
                    start: t,
                    end: t + period.perlen,
                });
            }
            let period_end = t + period.perlen;
            let lengths = period.step_lengths();
            let last = lengths.len() - 1;
            for (kstp, dt) in lengths.into_iter().enumerate() {
                // Snap the final step so periods abut exactly
                let end = if kstp == last { period_end } else { t + dt };
                steps.push(TimeStep {
                    stress_period: kper + 1,
                    time_step: kstp + 1,
                    span: TimeSpan::new(t, end),
                });
                t = end;
            }
        }
        if steps.is_empty() {
            return Err(ReversalError::Empty);
        }
        Ok(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn frame(sp: usize, ts: usize, start: f64, end: f64, value: f64) -> FlowFieldFrame {
        FlowFieldFrame {
            stress_period: sp,
            time_step: ts,
            span: TimeSpan::new(start, end),
            head: vec![value, value + 1.0],
            face_flux: vec![vec![value, -value], vec![0.5 * value, 0.0]],
        }
    }

    #[test]
    fn test_step_lengths_follow_tsmult() {
        let lengths = StressPeriod::new(7.0, 3, 2.0).step_lengths();
        assert_eq!(lengths.len(), 3);
        assert_relative_eq!(lengths[0], 1.0);
        assert_relative_eq!(lengths[1], 2.0);
        assert_relative_eq!(lengths[2], 4.0);
    }

    #[test]
    fn test_tdis_steps_are_contiguous() {
        let tdis = TimeDiscretization::new(vec![
            StressPeriod::new(10.0, 2, 1.0),
            StressPeriod::new(30.0, 3, 1.5),
        ]);
        let steps = tdis.steps().unwrap();
        assert_eq!(steps.len(), 5);
        for pair in steps.windows(2) {
            assert_eq!(pair[0].span.end(), pair[1].span.start());
        }
        assert_eq!(steps[4].span.end(), 40.0);
        assert_eq!((steps[2].stress_period, steps[2].time_step), (2, 1));
    }

    #[test]
    fn test_steady_series() {
        let series = FlowFieldTimeSeries::steady(
            &TimeDiscretization::default(),
            &[1.0, 2.0],
            &[vec![0.0], vec![1.0]],
        )
        .unwrap();
        assert_eq!(series.len(), 1);
        assert_relative_eq!(series.total_duration(), 1000.0);
    }

    #[test]
    fn test_spans_snap_to_tick_grid() {
        let span = TimeSpan::new(0.1, 210.526_315_789_473_67);
        assert_eq!(span.end(), 210.526_316);
        assert_eq!(span.ticks(), (100_000, 210_526_316));
        assert_eq!(TimeSpan::from_ticks(100_000, 210_526_316), span);

        // Serialized spans keep their plain start/end layout
        let json = serde_json::to_string(&span).unwrap();
        assert_eq!(json, r#"{"start":0.1,"end":210.526316}"#);
        assert_eq!(serde_json::from_str::<TimeSpan>(&json).unwrap(), span);

        assert!(!TimeSpan::new(0.0, 2.0 * MAX_TIME).is_valid());
        assert!(!TimeSpan::new(f64::NAN, 1.0).is_valid());
    }

    #[test]
    fn test_validation_errors() {
        assert!(matches!(
            FlowFieldTimeSeries::new(vec![]),
            Err(ReversalError::Empty)
        ));
        assert!(matches!(
            FlowFieldTimeSeries::new(vec![frame(1, 1, 5.0, 5.0, 1.0)]),
            Err(ReversalError::InvalidSpan { frame: 0, .. })
        ));
        assert!(matches!(
            FlowFieldTimeSeries::new(vec![frame(1, 1, 0.0, 10.0, 1.0), frame(1, 2, 5.0, 15.0, 1.0)]),
            Err(ReversalError::NonMonotonic { frame: 1, .. })
        ));

        let mut short = frame(1, 2, 10.0, 20.0, 1.0);
        short.head.pop();
        assert!(matches!(
            FlowFieldTimeSeries::new(vec![frame(1, 1, 0.0, 10.0, 1.0), short]),
            Err(ReversalError::InconsistentFrame { field: "head", .. })
        ));

        let mut ragged = frame(1, 2, 10.0, 20.0, 1.0);
        ragged.face_flux[1].push(3.0);
        assert!(matches!(
            FlowFieldTimeSeries::new(vec![frame(1, 1, 0.0, 10.0, 1.0), ragged]),
            Err(ReversalError::InconsistentFrame {
                field: "face-flux face",
                expected: 2,
                found: 3,
                ..
            })
        ));
    }
}
