//! Lateral PID steering control.
//!
//! [`LatControlPid`] converts a desired path curvature into a bounded
//! steering command once per control cycle. Gains come from [`CarParams`]
//! at startup and may be replaced while driving through a [`TuningSource`].

pub mod constants;
pub mod error;
pub mod latcontrol;
pub mod params;
pub mod pid;
pub mod retune;
pub mod schedule;
pub mod tune_source;
pub mod tuning;
pub mod vehicle_model;

pub use error::{ConfigError, TuneError};
pub use latcontrol::{CarState, LatControlOutput, LatControlPid, LateralPidState, LiveParameters};
pub use params::{CarParams, SteerLimits};
pub use pid::{LatPid, PidEngine};
pub use retune::{RetuneOutcome, Retuner};
pub use tune_source::{FileTuneSource, MemoryTuneSource, TuneSnapshot, TuningSource};
pub use tuning::TuningParameters;
pub use vehicle_model::{BicycleModel, VehicleModel};
