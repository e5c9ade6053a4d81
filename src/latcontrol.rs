use crate::{
    constants::{MIN_ACTIVE_SPEED_MS, SATURATION_CHECK_SPEED_MS},
    params::{CarParams, SteerLimits},
    pid::{LatPid, PidEngine, PidInput, PidTerms},
    retune::{RetuneOutcome, Retuner},
    tune_source::TuningSource,
    tuning::TuningParameters,
    vehicle_model::VehicleModel,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, trace};

/// Steering measurements sampled at the start of a cycle.
#[derive(Debug, Clone, Default)]
pub struct CarState {
    /// Vehicle speed, m/s.
    pub v_ego: f64,
    pub steering_angle_deg: f64,
    pub steering_rate_deg: f64,
    /// The driver is applying torque to the wheel.
    pub steering_pressed: bool,
    /// The actuator is already limiting the steering rate.
    pub steering_rate_limited: bool,
}

/// Slowly learned corrections.
#[derive(Debug, Clone, Default)]
pub struct LiveParameters {
    pub angle_offset_deg: f64,
}

/// Per-cycle diagnostic record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LateralPidState {
    pub steering_angle_deg: f64,
    pub steering_rate_deg: f64,
    pub active: bool,
    pub p: f64,
    pub i: f64,
    pub f: f64,
    pub output: f64,
    pub saturated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LatControlOutput {
    pub output_steer: f64,
    /// Desired steering angle including the learned offset, degrees.
    pub angle_steers_des: f64,
    pub pid_state: LateralPidState,
}

/// Lateral steering controller.
///
/// Turns a desired curvature into a bounded steering command once per
/// control cycle and picks up live tuning every few hundred cycles.
#[derive(Debug)]
pub struct LatControlPid<S, E = LatPid> {
    pid: E,
    retuner: Retuner<S>,
}

impl<S: TuningSource> LatControlPid<S> {
    pub fn new(params: &CarParams, source: S) -> Self {
        Self::from_retuner(params, Retuner::new(source))
    }
}

impl<S, E> LatControlPid<S, E>
where
    S: TuningSource,
    E: PidEngine,
{
    pub fn from_retuner(params: &CarParams, retuner: Retuner<S>) -> Self {
        let tuning = TuningParameters::from_car_params(params);
        let deadzone = retuner.initial_deadzone(tuning.deadzone);
        let pid = E::from_tuning(Arc::new(tuning.with_deadzone(deadzone)));
        Self { pid, retuner }
    }

    pub fn reset(&mut self) {
        self.pid.reset();
    }

    pub fn tuning(&self) -> &TuningParameters {
        self.pid.tuning()
    }

    pub fn deadzone(&self) -> f64 {
        self.pid.tuning().deadzone
    }

    pub fn engine(&self) -> &E {
        &self.pid
    }

    pub fn retuner(&self) -> &Retuner<S> {
        &self.retuner
    }

    #[allow(clippy::too_many_arguments)]
    pub fn update<P, M>(
        &mut self,
        active: bool,
        car_state: &CarState,
        car_params: &P,
        vehicle_model: &M,
        live_params: &LiveParameters,
        desired_curvature: f64,
        _desired_curvature_rate: f64,
    ) -> LatControlOutput
    where
        P: SteerLimits,
        M: VehicleModel,
    {
        self.live_tune();

        let CarState {
            v_ego,
            steering_angle_deg,
            steering_rate_deg,
            steering_pressed,
            steering_rate_limited,
        } = *car_state;

        let angle_steers_des_no_offset = vehicle_model
            .steer_from_curvature(-desired_curvature, v_ego)
            .to_degrees();
        let angle_steers_des = angle_steers_des_no_offset + live_params.angle_offset_deg;

        let mut pid_state = LateralPidState {
            steering_angle_deg,
            steering_rate_deg,
            ..LateralPidState::default()
        };

        let output_steer = if v_ego.is_nan() || v_ego < MIN_ACTIVE_SPEED_MS || !active {
            self.pid.reset();
            0.0
        } else {
            let steers_max = car_params.max_steer(v_ego);
            self.pid.set_limits(-steers_max, steers_max);

            // The offset does not contribute to the tire realigning torque,
            // which grows with lateral acceleration.
            let feedforward = angle_steers_des_no_offset * v_ego.powi(2);
            let check_saturation =
                v_ego > SATURATION_CHECK_SPEED_MS && !steering_rate_limited && !steering_pressed;
            let deadzone = self.deadzone();

            let output = self.pid.update(PidInput {
                setpoint: angle_steers_des,
                measurement: steering_angle_deg,
                deadzone,
                check_saturation,
                override_active: steering_pressed,
                feedforward,
                speed: v_ego,
            });

            let PidTerms { p, i, f, .. } = self.pid.terms();
            pid_state = LateralPidState {
                active: true,
                p,
                i,
                f,
                output,
                saturated: self.pid.saturated(),
                ..pid_state
            };
            output
        };

        trace!(
            output_steer,
            angle_steers_des,
            active = pid_state.active,
            saturated = pid_state.saturated,
            "lateral control cycle"
        );

        LatControlOutput {
            output_steer,
            angle_steers_des,
            pid_state,
        }
    }

    fn live_tune(&mut self) {
        let Self { pid, retuner } = self;

        if let RetuneOutcome::Applied(tuning) = retuner.tick(pid.tuning()) {
            info!(
                kf = tuning.kf,
                sat_limit = tuning.sat_limit,
                deadzone = tuning.deadzone,
                "applying live tune"
            );
            *pid = pid.retuned(Arc::new(tuning));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        params::tests::SAMPLE_TOML,
        tune_source::{MemoryTuneSource, DEADZONE_KEY, LIVE_TUNE_KEY},
        vehicle_model::BicycleModel,
    };

    fn setup() -> (CarParams, BicycleModel, MemoryTuneSource) {
        let params = CarParams::from_toml_str(SAMPLE_TOML, "sample").unwrap();
        let model = BicycleModel::new(&params.vehicle);
        (params, model, MemoryTuneSource::new())
    }

    fn driving(v_ego: f64) -> CarState {
        CarState {
            v_ego,
            ..CarState::default()
        }
    }

    #[test]
    fn straight_road_at_rest_gives_zero() {
        let (params, model, source) = setup();
        let mut controller = LatControlPid::new(&params, source);
        let out = controller.update(
            true,
            &driving(15.0),
            &params,
            &model,
            &LiveParameters::default(),
            0.0,
            0.0,
        );
        assert_eq!(out.output_steer, 0.0);
        assert_eq!(out.angle_steers_des, 0.0);
        assert!(out.pid_state.active);
        assert_eq!(out.pid_state.f, 0.0);
    }

    #[test]
    fn disengaged_outputs_zero_and_resets() {
        let (params, model, source) = setup();
        let mut controller = LatControlPid::new(&params, source);
        let live = LiveParameters::default();

        for _ in 0..50 {
            controller.update(true, &driving(20.0), &params, &model, &live, 0.0001, 0.0);
        }
        assert_ne!(controller.engine().terms().i, 0.0);

        let out = controller.update(false, &driving(20.0), &params, &model, &live, 0.0001, 0.0);
        assert_eq!(out.output_steer, 0.0);
        assert!(!out.pid_state.active);
        assert_eq!(out.pid_state.i, 0.0);
        assert_eq!(controller.engine().terms(), PidTerms::default());
    }

    #[test]
    fn reset_clears_engine_memory_and_keeps_limits() {
        let (params, model, source) = setup();
        let mut controller = LatControlPid::new(&params, source);
        let live = LiveParameters::default();

        for _ in 0..50 {
            controller.update(true, &driving(20.0), &params, &model, &live, 0.0001, 0.0);
        }
        assert_ne!(controller.engine().terms().i, 0.0);
        let limits = controller.engine().limits();

        controller.reset();
        assert_eq!(controller.engine().terms(), PidTerms::default());
        assert!(!controller.engine().saturated());
        assert_eq!(controller.engine().limits(), limits);
        assert_eq!(limits, (-params.max_steer(20.0), params.max_steer(20.0)));
    }

    #[test]
    fn nan_speed_outputs_zero_instead_of_panicking() {
        let (params, model, source) = setup();
        let mut controller = LatControlPid::new(&params, source);
        let out = controller.update(
            true,
            &driving(f64::NAN),
            &params,
            &model,
            &LiveParameters::default(),
            0.001,
            0.0,
        );
        assert_eq!(out.output_steer, 0.0);
        assert!(!out.pid_state.active);
    }

    #[test]
    fn offset_shifts_target_but_not_feedforward() {
        let (params, model, source) = setup();
        let mut controller = LatControlPid::new(&params, source);
        let live = LiveParameters {
            angle_offset_deg: 1.5,
        };
        let out = controller.update(true, &driving(12.0), &params, &model, &live, 0.0, 0.0);
        assert_eq!(out.angle_steers_des, 1.5);
        assert_eq!(out.pid_state.f, 0.0);
        assert!(out.pid_state.p > 0.0);
    }

    #[test]
    fn initial_deadzone_comes_from_source() {
        let (params, _, source) = setup();
        source.replace([(LIVE_TUNE_KEY, "0"), (DEADZONE_KEY, "0.25")]);
        let controller = LatControlPid::new(&params, source);
        assert_eq!(controller.deadzone(), 0.25);
    }
}
