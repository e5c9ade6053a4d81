use crate::error::TuneError;
use noisy_float::types::R64;
use serde::Deserialize;

/// A speed-indexed lookup table, linearly interpolated between breakpoints.
///
/// Breakpoints are strictly ascending and every entry is finite. Lookups
/// outside the breakpoint range hold the first or last value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawSchedule")]
pub struct GainSchedule {
    breakpoints: Vec<R64>,
    values: Vec<R64>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawSchedule {
    bp: Vec<f64>,
    v: Vec<f64>,
}

impl TryFrom<RawSchedule> for GainSchedule {
    type Error = TuneError;

    fn try_from(raw: RawSchedule) -> Result<Self, Self::Error> {
        Self::new(&raw.bp, &raw.v)
    }
}

impl GainSchedule {
    pub fn new(breakpoints: &[f64], values: &[f64]) -> Result<Self, TuneError> {
        if breakpoints.is_empty() {
            return Err(TuneError::InvalidSchedule("no breakpoints".into()));
        }
        if breakpoints.len() != values.len() {
            return Err(TuneError::InvalidSchedule(format!(
                "{} breakpoints but {} values",
                breakpoints.len(),
                values.len()
            )));
        }

        let breakpoints = to_finite(breakpoints, "breakpoint")?;
        let values = to_finite(values, "value")?;

        if breakpoints.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(TuneError::InvalidSchedule(
                "breakpoints are not strictly ascending".into(),
            ));
        }

        Ok(Self {
            breakpoints,
            values,
        })
    }

    /// A schedule that yields `value` at every speed.
    pub fn constant(value: f64) -> Result<Self, TuneError> {
        Self::new(&[0.0], &[value])
    }

    /// Keeps the breakpoints and replaces the values.
    ///
    /// A single value is applied at every breakpoint.
    pub fn with_values(&self, values: &[f64]) -> Result<Self, TuneError> {
        let values: Vec<f64> = match *values {
            [single] => vec![single; self.breakpoints.len()],
            _ => values.to_vec(),
        };
        let breakpoints: Vec<f64> = self.breakpoints.iter().map(|bp| bp.raw()).collect();
        Self::new(&breakpoints, &values)
    }

    /// Returns NaN for a NaN `x`.
    pub fn interp(&self, x: f64) -> f64 {
        let Self {
            breakpoints,
            values,
        } = self;

        if x.is_nan() {
            return f64::NAN;
        }

        let last = breakpoints.len() - 1;
        if x <= breakpoints[0].raw() {
            return values[0].raw();
        }
        if x >= breakpoints[last].raw() {
            return values[last].raw();
        }

        // x lies strictly inside the table, so an upper neighbour exists.
        let upper = breakpoints.partition_point(|bp| bp.raw() <= x);
        let (x0, x1) = (breakpoints[upper - 1].raw(), breakpoints[upper].raw());
        let (y0, y1) = (values[upper - 1].raw(), values[upper].raw());
        y0 + (y1 - y0) * (x - x0) / (x1 - x0)
    }

    pub fn len(&self) -> usize {
        self.breakpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }

    pub fn breakpoints(&self) -> impl Iterator<Item = f64> + '_ {
        self.breakpoints.iter().map(|bp| bp.raw())
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().map(|v| v.raw())
    }
}

fn to_finite(raw: &[f64], what: &str) -> Result<Vec<R64>, TuneError> {
    raw.iter()
        .map(|&x| {
            R64::try_new(x)
                .ok_or_else(|| TuneError::InvalidSchedule(format!("{what} {x} is not finite")))
        })
        .collect()
}
