//! Spread parameters.
//!
//! A [`ParameterSet`] is read once at the start of every step, so an operator may change it
//! between any two days. [`SharedParameters`] is the handle used to do that while an automatic
//! run is in progress.
//!
//! Parameters are usually loaded from a JSON file:
//!
//! ```json
//! {
//!     "r0": 2.5,
//!     "r0_delta": 1.0,
//!     "infectious_period": 5,
//!     "immunity_duration": 30,
//!     "quarantine_delay": 2,
//!     "death_probability": 0.01
//! }
//! ```
//!
//! Missing fields fall back to the defaults; `null` for `immunity_duration` means immunity is
//! lifelong and `null` for `quarantine_delay` disables quarantine.
use std::fmt::{self, Display};
use std::fs;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::error::ContagionError;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ParameterSet {
    /// Mean number of contacts an infectious vertex attempts per day.
    pub r0: f64,
    /// Half-width of the uniform range the daily contact count is drawn from.
    pub r0_delta: f64,
    /// Days after infection before a vertex stops being infectious.
    pub infectious_period: u32,
    /// Days an immune vertex stays immune. `None` means forever.
    pub immunity_duration: Option<u32>,
    /// Days after infection before quarantine begins. `None` disables quarantine.
    pub quarantine_delay: Option<u32>,
    /// Chance that a reached susceptible vertex dies instead of becoming infected.
    pub death_probability: f64,
}

impl Default for ParameterSet {
    fn default() -> Self {
        ParameterSet {
            r0: 3.0,
            r0_delta: 3.0,
            infectious_period: 3,
            immunity_duration: None,
            quarantine_delay: None,
            death_probability: 0.0,
        }
    }
}

impl ParameterSet {
    /// Parses parameters from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns `ContagionError::JsonError` if the string is not a valid parameter object, or
    /// `ContagionError::InvalidParameter` if a value fails [`ParameterSet::validate`].
    pub fn from_json_str(json: &str) -> Result<Self, ContagionError> {
        let parameters: ParameterSet = serde_json::from_str(json)?;
        parameters.validate()?;
        Ok(parameters)
    }

    /// Loads parameters from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not hold valid parameters.
    pub fn from_json_file(path: &Path) -> Result<Self, ContagionError> {
        trace!("loading parameters from {}", path.display());
        let json = fs::read_to_string(path)?;
        let parameters = ParameterSet::from_json_str(&json)?;
        debug!("loaded parameters {parameters}");
        Ok(parameters)
    }

    /// Sets `r0` and derives `r0_delta` as half of it, rounded down, the way the interactive
    /// slider does.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn with_r0(mut self, r0: f64) -> Self {
        self.r0 = r0;
        self.r0_delta = f64::from(r0.max(0.0).round() as u32 / 2);
        self
    }

    #[must_use]
    pub fn quarantine_enabled(&self) -> bool {
        self.quarantine_delay.is_some()
    }

    /// The `[low, high]` range the daily contact count is drawn from. The low end is clamped
    /// at zero.
    #[must_use]
    pub fn contact_range(&self) -> (f64, f64) {
        ((self.r0 - self.r0_delta).max(0.0), self.r0 + self.r0_delta)
    }

    /// Checks for values that cannot be clamped into something meaningful. `r0_delta` larger
    /// than `r0` is accepted.
    ///
    /// # Errors
    ///
    /// Returns `ContagionError::InvalidParameter` naming the offending field.
    pub fn validate(&self) -> Result<(), ContagionError> {
        if !(self.r0.is_finite() && self.r0 >= 0.0) {
            return Err(ContagionError::InvalidParameter(format!(
                "r0 must be a non-negative number, got {}",
                self.r0
            )));
        }
        if !(self.r0_delta.is_finite() && self.r0_delta >= 0.0) {
            return Err(ContagionError::InvalidParameter(format!(
                "r0_delta must be a non-negative number, got {}",
                self.r0_delta
            )));
        }
        if !(0.0..=1.0).contains(&self.death_probability) {
            return Err(ContagionError::InvalidParameter(format!(
                "death_probability must be between 0 and 1, got {}",
                self.death_probability
            )));
        }
        Ok(())
    }

    /// Sets a single parameter from its textual name and value. Names use dashes or
    /// underscores (`r0-delta`, `r0_delta`). The optional durations accept `off` or `none`.
    ///
    /// # Errors
    ///
    /// Returns `ContagionError::InvalidParameter` for an unknown name, an unparsable value,
    /// or a value that fails validation. The set is unchanged on error.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), ContagionError> {
        let mut updated = self.clone();
        match name.replace('-', "_").as_str() {
            "r0" => updated = updated.with_r0(parse_number(name, value)?),
            "r0_delta" => updated.r0_delta = parse_number(name, value)?,
            "infectious_period" => updated.infectious_period = parse_days(name, value)?,
            "immunity_duration" => updated.immunity_duration = parse_optional_days(name, value)?,
            "quarantine_delay" => updated.quarantine_delay = parse_optional_days(name, value)?,
            "death_probability" => updated.death_probability = parse_number(name, value)?,
            _ => {
                return Err(ContagionError::InvalidParameter(format!(
                    "unknown parameter `{name}`"
                )))
            }
        }
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

fn parse_number(name: &str, value: &str) -> Result<f64, ContagionError> {
    value
        .parse()
        .map_err(|_| ContagionError::InvalidParameter(format!("{name}: `{value}` is not a number")))
}

fn parse_days(name: &str, value: &str) -> Result<u32, ContagionError> {
    value.parse().map_err(|_| {
        ContagionError::InvalidParameter(format!("{name}: `{value}` is not a number of days"))
    })
}

fn parse_optional_days(name: &str, value: &str) -> Result<Option<u32>, ContagionError> {
    match value {
        "off" | "none" | "null" => Ok(None),
        _ => parse_days(name, value).map(Some),
    }
}

fn fmt_days(days: Option<u32>) -> String {
    days.map_or_else(|| "off".to_string(), |days| days.to_string())
}

impl Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "r0={} r0-delta={} infectious-period={} immunity-duration={} quarantine-delay={} \
             death-probability={}",
            self.r0,
            self.r0_delta,
            self.infectious_period,
            fmt_days(self.immunity_duration),
            fmt_days(self.quarantine_delay),
            self.death_probability
        )
    }
}

/// A parameter set shared between the loop that runs steps and whoever tunes it.
///
/// Steps take a [`SharedParameters::snapshot`] exactly once at their start, so a change made
/// mid-step applies from the next day on.
#[derive(Clone, Debug, Default)]
pub struct SharedParameters {
    inner: Arc<RwLock<ParameterSet>>,
}

impl SharedParameters {
    #[must_use]
    pub fn new(parameters: ParameterSet) -> Self {
        SharedParameters {
            inner: Arc::new(RwLock::new(parameters)),
        }
    }

    /// Returns a copy of the current values.
    #[must_use]
    pub fn snapshot(&self) -> ParameterSet {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces all values at once.
    pub fn replace(&self, parameters: ParameterSet) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = parameters;
    }

    /// Applies `f` to the current values in place.
    pub fn update<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut ParameterSet) -> T,
    {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

impl From<ParameterSet> for SharedParameters {
    fn from(parameters: ParameterSet) -> Self {
        SharedParameters::new(parameters)
    }
}
