use crate::{
    constants::{
        CONTROL_RATE_HZ, DEFAULT_OUTPUT_LIMIT, DERIVATIVE_LOOKBACK, ERROR_HISTORY_LEN,
        INTEGRAL_UNWIND_RATE, SATURATION_ERROR_THRESHOLD,
    },
    tuning::TuningParameters,
};
use std::{collections::VecDeque, sync::Arc};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidInput {
    pub setpoint: f64,
    pub measurement: f64,
    pub deadzone: f64,
    pub check_saturation: bool,
    /// The driver is applying torque; the integral must not wind up.
    pub override_active: bool,
    pub feedforward: f64,
    pub speed: f64,
}

/// Term breakdown of the most recent update.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PidTerms {
    pub p: f64,
    pub i: f64,
    pub d: f64,
    pub f: f64,
}

/// A speed-scheduled PID engine with clamped output and saturation
/// detection.
pub trait PidEngine {
    fn from_tuning(tuning: Arc<TuningParameters>) -> Self
    where
        Self: Sized;

    /// Builds an engine for `tuning` that continues from this engine's
    /// output limits. Implementations carry over whatever controller memory
    /// they can so a retune does not step the output.
    fn retuned(&self, tuning: Arc<TuningParameters>) -> Self
    where
        Self: Sized,
    {
        let mut engine = Self::from_tuning(tuning);
        let (neg_limit, pos_limit) = self.limits();
        engine.set_limits(neg_limit, pos_limit);
        engine
    }

    fn tuning(&self) -> &Arc<TuningParameters>;

    fn set_limits(&mut self, neg_limit: f64, pos_limit: f64);

    /// Returns `(neg_limit, pos_limit)`.
    fn limits(&self) -> (f64, f64);

    fn reset(&mut self);

    /// Runs one cycle. The result always lies within [`limits`](Self::limits).
    fn update(&mut self, input: PidInput) -> f64;

    fn terms(&self) -> PidTerms;

    /// Whether the output has stayed pinned at a limit for longer than the
    /// tuning's `sat_limit`. Time only accumulates on cycles run with
    /// `check_saturation`; once it turns false the timer drains one cycle at
    /// a time, so the flag can stay set for a few cycles afterwards.
    fn saturated(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct LatPid {
    tuning: Arc<TuningParameters>,
    pos_limit: f64,
    neg_limit: f64,
    terms: PidTerms,
    sat_count: f64,
    saturated: bool,
    errors: VecDeque<f64>,
}

impl LatPid {
    pub fn new(tuning: Arc<TuningParameters>) -> Self {
        Self {
            tuning,
            pos_limit: DEFAULT_OUTPUT_LIMIT,
            neg_limit: -DEFAULT_OUTPUT_LIMIT,
            terms: PidTerms::default(),
            sat_count: 0.0,
            saturated: false,
            errors: VecDeque::with_capacity(ERROR_HISTORY_LEN + 1),
        }
    }

    pub fn sat_count(&self) -> f64 {
        self.sat_count
    }

    fn check_saturation(&mut self, control: f64, check_saturation: bool, error: f64) -> bool {
        let step = 1.0 / CONTROL_RATE_HZ;
        let outside = control < self.neg_limit || control > self.pos_limit;

        if outside && check_saturation && error.abs() > SATURATION_ERROR_THRESHOLD {
            self.sat_count += step;
        } else {
            self.sat_count -= step;
        }
        self.sat_count = self.sat_count.clamp(0.0, 1.0);

        self.sat_count > self.tuning.sat_limit
    }
}

impl PidEngine for LatPid {
    fn from_tuning(tuning: Arc<TuningParameters>) -> Self {
        Self::new(tuning)
    }

    fn retuned(&self, tuning: Arc<TuningParameters>) -> Self {
        Self {
            tuning,
            terms: PidTerms {
                i: self.terms.i,
                ..PidTerms::default()
            },
            errors: self.errors.clone(),
            ..*self
        }
    }

    fn tuning(&self) -> &Arc<TuningParameters> {
        &self.tuning
    }

    fn set_limits(&mut self, neg_limit: f64, pos_limit: f64) {
        self.neg_limit = neg_limit;
        self.pos_limit = pos_limit;
    }

    fn limits(&self) -> (f64, f64) {
        (self.neg_limit, self.pos_limit)
    }

    fn reset(&mut self) {
        self.terms = PidTerms::default();
        self.sat_count = 0.0;
        self.saturated = false;
        self.errors.clear();
    }

    fn update(&mut self, input: PidInput) -> f64 {
        let PidInput {
            setpoint,
            measurement,
            deadzone,
            check_saturation,
            override_active,
            feedforward,
            speed,
        } = input;
        let TuningParameters {
            ref kp,
            ref ki,
            ref kd,
            kf,
            ..
        } = *self.tuning;

        let error = apply_deadzone(setpoint - measurement, deadzone);
        let p = error * kp.interp(speed);
        let f = feedforward * kf;

        let d = match self.errors.len().checked_sub(DERIVATIVE_LOOKBACK) {
            Some(index) => {
                let lookback = DERIVATIVE_LOOKBACK as f64;
                (error - self.errors[index]) / lookback * kd.interp(speed)
            }
            None => 0.0,
        };

        let prev_i = self.terms.i;
        let i = if override_active {
            let unwound = prev_i - INTEGRAL_UNWIND_RATE * prev_i.signum();
            // Decay toward zero without overshooting it.
            if unwound.signum() == prev_i.signum() {
                unwound
            } else {
                0.0
            }
        } else {
            let candidate = prev_i + error * ki.interp(speed) / CONTROL_RATE_HZ;
            let control = p + f + candidate + d;

            // Integrate only when it moves the output off the limit it presses
            // or toward the sign of the error.
            let releases_upper = error >= 0.0 && (control <= self.pos_limit || candidate < 0.0);
            let releases_lower = error <= 0.0 && (control >= self.neg_limit || candidate > 0.0);
            if releases_upper || releases_lower {
                candidate
            } else {
                prev_i
            }
        };

        let control = p + f + i + d;
        self.terms = PidTerms { p, i, d, f };
        self.saturated = self.check_saturation(control, check_saturation, error);

        self.errors.push_back(error);
        while self.errors.len() > ERROR_HISTORY_LEN {
            self.errors.pop_front();
        }

        control.clamp(self.neg_limit, self.pos_limit)
    }

    fn terms(&self) -> PidTerms {
        self.terms
    }

    fn saturated(&self) -> bool {
        self.saturated
    }
}

/// Shrinks `error` toward zero by `deadzone`, zero inside the band.
pub fn apply_deadzone(error: f64, deadzone: f64) -> f64 {
    if error > deadzone {
        error - deadzone
    } else if error < -deadzone {
        error + deadzone
    } else {
        0.0
    }
}
