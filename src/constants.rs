/// Below this speed (m/s) the controller outputs zero and holds the PID at rest.
pub const MIN_ACTIVE_SPEED_MS: f64 = 0.3;

/// Saturation is only tracked above this speed (m/s).
pub const SATURATION_CHECK_SPEED_MS: f64 = 10.0;

/// Number of control cycles between two reads of the tuning source.
pub const RETUNE_PERIOD_CYCLES: u32 = 300;

pub const CONTROL_RATE_HZ: f64 = 100.0;

/// Per-cycle decay of the integral term while the driver overrides.
pub const INTEGRAL_UNWIND_RATE: f64 = 0.3 / CONTROL_RATE_HZ;

pub const DEFAULT_OUTPUT_LIMIT: f64 = 1.0;

/// Errors smaller than this never count toward the saturation timer.
pub const SATURATION_ERROR_THRESHOLD: f64 = 0.1;

pub const DERIVATIVE_LOOKBACK: usize = 5;
pub const ERROR_HISTORY_LEN: usize = 20;

pub const MAX_TUNE_FILE_BYTES: u64 = 64 * 1024;
