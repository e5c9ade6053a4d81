use anyhow::Result;
use clap::Parser;
use latcontrol_pid::{
    BicycleModel, CarParams, CarState, FileTuneSource, LatControlPid, LiveParameters,
    MemoryTuneSource, TuningSource,
};
use rand::prelude::*;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_CAR: &str = r#"
steer_limit_timer = 0.8

[lateral_tuning]
kf = 0.00006
kp = { bp = [0.0, 30.0], v = [0.15, 0.25] }
ki = { bp = [0.0, 30.0], v = [0.02, 0.04] }
kd = { bp = [0.0], v = [0.0] }

[steer_max]
bp = [0.0, 30.0]
v = [1.0, 0.8]

[vehicle]
mass = 1600.0
wheelbase = 2.8
center_to_front = 1.25
tire_stiffness_front = 110000.0
tire_stiffness_rear = 125000.0
steer_ratio = 14.5
"#;

#[derive(Parser)]
struct Opts {
    /// Vehicle configuration (TOML). A built-in sedan is used when omitted.
    #[clap(long)]
    pub car: Option<PathBuf>,
    /// Live tune file (JSON). Edit it while the replay runs to retune.
    #[clap(long)]
    pub tune: Option<PathBuf>,
    #[clap(long, default_value = "3000")]
    pub cycles: usize,
    /// Print one diagnostic record every N cycles.
    #[clap(long, default_value = "100")]
    pub every: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let Opts {
        car,
        tune,
        cycles,
        every,
    } = Opts::parse();

    let params = match car {
        Some(path) => CarParams::load_from_file(&path)?,
        None => CarParams::from_toml_str(DEFAULT_CAR, "built-in")?,
    };

    match tune {
        Some(path) => replay(&params, FileTuneSource::new(path), cycles, every),
        None => replay(&params, MemoryTuneSource::new(), cycles, every),
    }
}

fn replay<S: TuningSource>(
    params: &CarParams,
    source: S,
    cycles: usize,
    every: usize,
) -> Result<()> {
    let model = BicycleModel::new(&params.vehicle);
    let mut controller = LatControlPid::new(params, source);
    let live = LiveParameters {
        angle_offset_deg: 0.3,
    };
    let mut rng = rand::thread_rng();

    // Crude steering rack: the wheel angle follows the command with lag.
    let mut steering_angle_deg = 0.0;
    let mut v_ego: f64 = 0.0;

    for cycle in 0..cycles {
        let time_secs = cycle as f64 / 100.0;
        v_ego = (v_ego + 0.05).min(25.0);
        let desired_curvature = 0.002 * (time_secs * 0.2).sin();
        let car_state = CarState {
            v_ego,
            steering_angle_deg,
            steering_rate_deg: 0.0,
            steering_pressed: rng.gen_bool(0.002),
            steering_rate_limited: false,
        };

        let out = controller.update(
            true,
            &car_state,
            params,
            &model,
            &live,
            desired_curvature,
            0.0,
        );
        steering_angle_deg += out.output_steer * 0.5 + rng.gen_range(-0.01..0.01);

        if every > 0 && cycle % every == 0 {
            println!("{}", serde_json::to_string(&out.pid_state)?);
        }
    }

    Ok(())
}
