use crate::{
    constants::RETUNE_PERIOD_CYCLES,
    error::TuneError,
    schedule::GainSchedule,
    tune_source::{
        TuneSnapshot, TuningSource, DEADZONE_KEY, KD_KEY, KF_KEY, KI_KEY, KP_KEY,
        STEER_LIMIT_TIMER_KEY,
    },
    tuning::TuningParameters,
};
use tracing::{debug, warn};

#[derive(Debug)]
pub enum RetuneOutcome {
    /// The check is not due yet.
    Pending,
    /// The check ran but live tuning is switched off.
    Disabled,
    Applied(TuningParameters),
    /// The source could not be read or held bad values. The current tuning stays.
    Rejected(TuneError),
}

/// Polls a [`TuningSource`] every `period` cycles and builds replacement
/// tuning when live tuning is enabled.
#[derive(Debug)]
pub struct Retuner<S> {
    source: S,
    period: u32,
    cycles: u32,
}

impl<S: TuningSource> Retuner<S> {
    pub fn new(source: S) -> Self {
        Self::with_period(source, RETUNE_PERIOD_CYCLES)
    }

    /// A `period` of zero is treated as one.
    pub fn with_period(source: S, period: u32) -> Self {
        Self {
            source,
            period: period.max(1),
            cycles: 0,
        }
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    /// Cycles counted since the last check.
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn tick(&mut self, current: &TuningParameters) -> RetuneOutcome {
        self.cycles += 1;
        if self.cycles < self.period {
            return RetuneOutcome::Pending;
        }
        self.cycles = 0;

        let result = self
            .source
            .read()
            .and_then(|snapshot| retuned(&snapshot, current));

        match result {
            Ok(Some(tuning)) => RetuneOutcome::Applied(tuning),
            Ok(None) => {
                debug!("live tuning disabled, keeping current gains");
                RetuneOutcome::Disabled
            }
            Err(error) => {
                warn!(error = %error, "live tune rejected, keeping current gains");
                RetuneOutcome::Rejected(error)
            }
        }
    }

    /// The deadzone to start with: the source's value when it has a valid
    /// one, `fallback` otherwise. Does not require live tuning to be enabled.
    pub fn initial_deadzone(&self, fallback: f64) -> f64 {
        let result = self
            .source
            .read()
            .and_then(|snapshot| snapshot.number(DEADZONE_KEY));

        match result {
            Ok(deadzone) if deadzone >= 0.0 => deadzone,
            Ok(deadzone) => {
                warn!(deadzone, fallback, "negative deadzone in tuning source ignored");
                fallback
            }
            Err(TuneError::MissingKey(_)) => fallback,
            Err(error) => {
                warn!(error = %error, fallback, "could not read initial deadzone");
                fallback
            }
        }
    }
}

fn retuned(
    snapshot: &TuneSnapshot,
    current: &TuningParameters,
) -> Result<Option<TuningParameters>, TuneError> {
    if !snapshot.live_tune_enabled() {
        return Ok(None);
    }

    let tuning = TuningParameters {
        kp: reschedule(snapshot, KP_KEY, &current.kp)?,
        ki: reschedule(snapshot, KI_KEY, &current.ki)?,
        kd: reschedule(snapshot, KD_KEY, &current.kd)?,
        kf: non_negative(snapshot, KF_KEY)?,
        sat_limit: non_negative(snapshot, STEER_LIMIT_TIMER_KEY)?,
        deadzone: non_negative(snapshot, DEADZONE_KEY)?,
    };
    Ok(Some(tuning))
}

fn reschedule(
    snapshot: &TuneSnapshot,
    key: &str,
    current: &GainSchedule,
) -> Result<GainSchedule, TuneError> {
    let values = snapshot.numbers(key)?;
    if values.len() != 1 && values.len() != current.len() {
        return Err(TuneError::LengthMismatch {
            key: key.to_string(),
            expected: current.len(),
            found: values.len(),
        });
    }
    current.with_values(&values)
}

fn non_negative(snapshot: &TuneSnapshot, key: &str) -> Result<f64, TuneError> {
    let value = snapshot.number(key)?;
    if value < 0.0 {
        return Err(TuneError::InvalidNumber {
            key: key.to_string(),
            value: value.to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tune_source::{MemoryTuneSource, LIVE_TUNE_KEY};

    fn current() -> TuningParameters {
        TuningParameters {
            kp: GainSchedule::new(&[0.0, 20.0], &[0.1, 0.2]).unwrap(),
            ki: GainSchedule::new(&[0.0, 20.0], &[0.01, 0.02]).unwrap(),
            kd: GainSchedule::constant(0.0).unwrap(),
            kf: 0.00005,
            sat_limit: 0.8,
            deadzone: 0.0,
        }
    }

    fn live_source() -> MemoryTuneSource {
        let source = MemoryTuneSource::new();
        source.replace([
            (LIVE_TUNE_KEY, "1"),
            (KP_KEY, "0.3"),
            (KI_KEY, "0.03,0.04"),
            (KD_KEY, "0.1"),
            (KF_KEY, "0.00007"),
            (STEER_LIMIT_TIMER_KEY, "1.2"),
            (DEADZONE_KEY, "0.5"),
        ]);
        source
    }

    #[test]
    fn checks_only_when_due() {
        let mut retuner = Retuner::with_period(live_source(), 3);
        let tuning = current();
        assert!(matches!(retuner.tick(&tuning), RetuneOutcome::Pending));
        assert!(matches!(retuner.tick(&tuning), RetuneOutcome::Pending));
        assert_eq!(retuner.cycles(), 2);
        assert!(matches!(retuner.tick(&tuning), RetuneOutcome::Applied(_)));
        assert_eq!(retuner.cycles(), 0);
    }

    #[test]
    fn applied_tuning_keeps_breakpoints() {
        let mut retuner = Retuner::with_period(live_source(), 1);
        let RetuneOutcome::Applied(tuning) = retuner.tick(&current()) else {
            panic!("expected applied tuning");
        };
        assert_eq!(tuning.kp.breakpoints().collect::<Vec<_>>(), vec![0.0, 20.0]);
        assert_eq!(tuning.kp.values().collect::<Vec<_>>(), vec![0.3, 0.3]);
        assert_eq!(tuning.ki.values().collect::<Vec<_>>(), vec![0.03, 0.04]);
        assert_eq!(tuning.kd.interp(5.0), 0.1);
        assert_eq!(tuning.kf, 0.00007);
        assert_eq!(tuning.sat_limit, 1.2);
        assert_eq!(tuning.deadzone, 0.5);
    }

    #[test]
    fn disabled_flag_is_a_no_op() {
        let source = live_source();
        source.set(LIVE_TUNE_KEY, "0");
        let mut retuner = Retuner::with_period(source, 1);
        assert!(matches!(retuner.tick(&current()), RetuneOutcome::Disabled));
    }

    #[test]
    fn bad_values_are_rejected() {
        let source = live_source();
        let mut retuner = Retuner::with_period(source.clone(), 1);

        source.set(KF_KEY, "abc");
        assert!(matches!(
            retuner.tick(&current()),
            RetuneOutcome::Rejected(TuneError::InvalidNumber { .. })
        ));

        source.set(KF_KEY, "0.1");
        source.set(KI_KEY, "0.1,0.2,0.3");
        assert!(matches!(
            retuner.tick(&current()),
            RetuneOutcome::Rejected(TuneError::LengthMismatch { expected: 2, found: 3, .. })
        ));

        source.set(KI_KEY, "0.1");
        source.remove(DEADZONE_KEY);
        assert!(matches!(
            retuner.tick(&current()),
            RetuneOutcome::Rejected(TuneError::MissingKey(_))
        ));

        source.set(DEADZONE_KEY, "-1");
        assert!(matches!(
            retuner.tick(&current()),
            RetuneOutcome::Rejected(TuneError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn counter_resets_after_a_rejected_check() {
        let source = live_source();
        source.set(KP_KEY, "");
        let mut retuner = Retuner::with_period(source, 2);
        retuner.tick(&current());
        assert!(matches!(retuner.tick(&current()), RetuneOutcome::Rejected(_)));
        assert_eq!(retuner.cycles(), 0);
        assert!(matches!(retuner.tick(&current()), RetuneOutcome::Pending));
    }

    #[test]
    fn initial_deadzone_falls_back() {
        let source = live_source();
        source.set(LIVE_TUNE_KEY, "0");
        let retuner = Retuner::new(source.clone());
        assert_eq!(retuner.initial_deadzone(0.1), 0.5);

        source.set(DEADZONE_KEY, "wide");
        assert_eq!(retuner.initial_deadzone(0.1), 0.1);

        source.remove(DEADZONE_KEY);
        assert_eq!(retuner.initial_deadzone(0.1), 0.1);
    }

    #[test]
    fn zero_period_checks_every_cycle() {
        let mut retuner = Retuner::with_period(live_source(), 0);
        assert_eq!(retuner.period(), 1);
        assert!(matches!(retuner.tick(&current()), RetuneOutcome::Applied(_)));
    }
}
