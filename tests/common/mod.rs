#![allow(dead_code)]

use latcontrol_pid::{BicycleModel, CarParams, CarState};

pub const CAR_TOML: &str = r#"
steer_limit_timer = 0.4

[lateral_tuning]
kf = 0.00006
kp = { bp = [0.0, 30.0], v = [0.15, 0.25] }
ki = { bp = [0.0, 30.0], v = [0.02, 0.04] }
kd = { bp = [0.0], v = [0.0] }

[steer_max]
bp = [0.0, 10.0, 30.0]
v = [1.0, 0.9, 0.6]

[vehicle]
mass = 1600.0
wheelbase = 2.8
center_to_front = 1.25
tire_stiffness_front = 110000.0
tire_stiffness_rear = 125000.0
steer_ratio = 14.5
"#;

pub fn car() -> (CarParams, BicycleModel) {
    let params = CarParams::from_toml_str(CAR_TOML, "test-car").expect("test: car params");
    let model = BicycleModel::new(&params.vehicle);
    (params, model)
}

pub fn state(v_ego: f64, steering_angle_deg: f64) -> CarState {
    CarState {
        v_ego,
        steering_angle_deg,
        ..CarState::default()
    }
}
