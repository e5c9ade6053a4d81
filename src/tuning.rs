use crate::{params::CarParams, schedule::GainSchedule};

/// One complete set of lateral gains.
///
/// Never modified after construction. A retune builds a new value and the
/// controller swaps it in whole, so a cycle never sees gains from two
/// different tunes.
#[derive(Debug, Clone, PartialEq)]
pub struct TuningParameters {
    pub kp: GainSchedule,
    pub ki: GainSchedule,
    pub kd: GainSchedule,
    pub kf: f64,
    /// Saturation timer threshold, seconds.
    pub sat_limit: f64,
    pub deadzone: f64,
}

impl TuningParameters {
    pub fn from_car_params(params: &CarParams) -> Self {
        let CarParams {
            ref lateral_tuning,
            steer_limit_timer,
            ..
        } = *params;

        Self {
            kp: lateral_tuning.kp.clone(),
            ki: lateral_tuning.ki.clone(),
            kd: lateral_tuning.kd.clone(),
            kf: lateral_tuning.kf,
            sat_limit: steer_limit_timer,
            deadzone: lateral_tuning.deadzone,
        }
    }

    pub fn with_deadzone(self, deadzone: f64) -> Self {
        Self { deadzone, ..self }
    }
}
