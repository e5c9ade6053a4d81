//! Live tuning sources.
//!
//! A [`TuningSource`] hands out [`TuneSnapshot`]s: flat key/value maps that
//! an operator may rewrite at any time from outside the control process.
//! Each `read` is one consistent snapshot, and no source ever blocks the
//! caller waiting for a writer.

use crate::{constants::MAX_TUNE_FILE_BYTES, error::TuneError};
use serde_json::Value;
use std::{
    collections::HashMap,
    fs::File,
    io::Read,
    path::{Path, PathBuf},
    sync::{Arc, RwLock, TryLockError},
};

pub const LIVE_TUNE_KEY: &str = "tuneGernby";
pub const KP_KEY: &str = "Kp";
pub const KI_KEY: &str = "Ki";
pub const KD_KEY: &str = "Kd";
pub const KF_KEY: &str = "Kf";
pub const STEER_LIMIT_TIMER_KEY: &str = "steerLimitTimer";
pub const DEADZONE_KEY: &str = "deadzone";

pub trait TuningSource {
    fn read(&self) -> Result<TuneSnapshot, TuneError>;
}

impl<S: TuningSource + ?Sized> TuningSource for Box<S> {
    fn read(&self) -> Result<TuneSnapshot, TuneError> {
        (**self).read()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TuneSnapshot {
    entries: HashMap<String, String>,
}

impl TuneSnapshot {
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn live_tune_enabled(&self) -> bool {
        self.get(LIVE_TUNE_KEY).map(str::trim) == Some("1")
    }

    pub fn number(&self, key: &str) -> Result<f64, TuneError> {
        let raw = self
            .get(key)
            .ok_or_else(|| TuneError::MissingKey(key.to_string()))?;
        parse_number(key, raw)
    }

    /// Reads a comma separated list of numbers. A plain number is a list of one.
    pub fn numbers(&self, key: &str) -> Result<Vec<f64>, TuneError> {
        let raw = self
            .get(key)
            .ok_or_else(|| TuneError::MissingKey(key.to_string()))?;
        raw.split(',').map(|item| parse_number(key, item)).collect()
    }
}

impl<K, V> FromIterator<(K, V)> for TuneSnapshot
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

fn parse_number(key: &str, raw: &str) -> Result<f64, TuneError> {
    let invalid = || TuneError::InvalidNumber {
        key: key.to_string(),
        value: raw.to_string(),
    };
    let value: f64 = raw.trim().parse().map_err(|_| invalid())?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(invalid())
    }
}

/// Tuning stored as a flat JSON object on disk.
///
/// Values may be JSON strings, numbers or booleans. The file is read in one
/// bounded pass on every call.
#[derive(Debug, Clone)]
pub struct FileTuneSource {
    path: PathBuf,
}

impl FileTuneSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> TuneError {
        TuneError::Io {
            file: self.path.display().to_string(),
            source,
        }
    }
}

impl TuningSource for FileTuneSource {
    fn read(&self) -> Result<TuneSnapshot, TuneError> {
        let file = File::open(&self.path).map_err(|e| self.io_error(e))?;

        // Read one byte past the limit so a file that grew after open is
        // still caught.
        let mut content = Vec::new();
        file.take(MAX_TUNE_FILE_BYTES + 1)
            .read_to_end(&mut content)
            .map_err(|e| self.io_error(e))?;
        let size = content.len() as u64;
        if size > MAX_TUNE_FILE_BYTES {
            return Err(TuneError::TooLarge {
                file: self.path.display().to_string(),
                size,
                limit: MAX_TUNE_FILE_BYTES,
            });
        }

        let object: HashMap<String, Value> =
            serde_json::from_slice(&content).map_err(|e| TuneError::Parse {
                file: self.path.display().to_string(),
                source: e,
            })?;

        let entries = object
            .into_iter()
            .filter_map(|(key, value)| {
                let value = match value {
                    Value::String(text) => text,
                    Value::Number(number) => number.to_string(),
                    Value::Bool(flag) => flag.to_string(),
                    _ => return None,
                };
                Some((key, value))
            })
            .collect();

        Ok(TuneSnapshot::new(entries))
    }
}

/// An in-process tuning store shared between the controller and an operator.
///
/// Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryTuneSource {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryTuneSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.with_entries(|entries| {
            entries.insert(key.into(), value.into());
        });
    }

    pub fn remove(&self, key: &str) {
        self.with_entries(|entries| {
            entries.remove(key);
        });
    }

    /// Replaces every entry in one step.
    pub fn replace<K, V>(&self, entries: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        let fresh: HashMap<String, String> = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self.with_entries(|entries| *entries = fresh);
    }

    fn with_entries(&self, edit: impl FnOnce(&mut HashMap<String, String>)) {
        let mut guard = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        edit(&mut guard);
    }
}

impl TuningSource for MemoryTuneSource {
    fn read(&self) -> Result<TuneSnapshot, TuneError> {
        let guard = match self.entries.try_read() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(TuneError::Busy),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };
        Ok(TuneSnapshot::new(guard.clone()))
    }
}
