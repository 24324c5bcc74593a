//! Time-based forgetting.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use kenning_core::{KenningError, KnowledgeConfig, OblivionPolicy};

pub(crate) const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Decays knowledge as time passes.
///
/// Implementations must return `knowledge` unchanged for zero elapsed days,
/// never increase it as `elapsed_days` grows, and stay within `[0, 1]`.
pub trait OblivionFunction: fmt::Debug + Send + Sync {
    /// Knowledge left of `knowledge` after `elapsed_days`.
    fn decay(&self, knowledge: f64, elapsed_days: f64) -> f64;
}

/// Days between `from` and `to` with millisecond precision; negative when
/// `to` is earlier.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use kenning_knowledge::oblivion::elapsed_days;
///
/// let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let to = Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap();
/// assert_eq!(elapsed_days(from, to), 1.5);
/// ```
pub fn elapsed_days(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    to.signed_duration_since(from).num_milliseconds() as f64 / MILLIS_PER_DAY
}

/// Build the oblivion function selected by `config`.
///
/// # Errors
///
/// Returns [`KenningError::Config`] if the half-life is not positive.
pub fn oblivion_for(config: &KnowledgeConfig) -> Result<Arc<dyn OblivionFunction>, KenningError> {
    Ok(match config.oblivion {
        OblivionPolicy::Exponential => Arc::new(ExponentialOblivion::new(config.half_life_days)?),
        OblivionPolicy::Never => Arc::new(NeverForget),
    })
}

/// Halves knowledge every `half_life_days`.
///
/// # Examples
///
/// ```
/// use kenning_knowledge::{ExponentialOblivion, OblivionFunction};
///
/// let oblivion = ExponentialOblivion::default();
/// assert_eq!(oblivion.half_life_days(), 500.0);
/// assert_eq!(oblivion.decay(0.8, 0.0), 0.8);
/// assert!((oblivion.decay(0.8, 500.0) - 0.4).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialOblivion {
    half_life_days: f64,
}

impl ExponentialOblivion {
    /// Reference half-life.
    pub const DEFAULT_HALF_LIFE_DAYS: f64 = 500.0;

    /// Create an exponential decay with the given half-life.
    ///
    /// # Errors
    ///
    /// Returns [`KenningError::Config`] if `half_life_days` is not a
    /// positive finite number.
    pub fn new(half_life_days: f64) -> Result<Self, KenningError> {
        if !half_life_days.is_finite() || half_life_days <= 0.0 {
            return Err(KenningError::Config(format!(
                "half-life must be a positive number of days, got {half_life_days}"
            )));
        }
        Ok(Self { half_life_days })
    }

    /// The configured half-life.
    pub fn half_life_days(&self) -> f64 {
        self.half_life_days
    }
}

impl Default for ExponentialOblivion {
    fn default() -> Self {
        Self {
            half_life_days: Self::DEFAULT_HALF_LIFE_DAYS,
        }
    }
}

impl OblivionFunction for ExponentialOblivion {
    fn decay(&self, knowledge: f64, elapsed_days: f64) -> f64 {
        knowledge * 0.5_f64.powf(elapsed_days.max(0.0) / self.half_life_days)
    }
}

/// Keeps knowledge forever.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NeverForget;

impl OblivionFunction for NeverForget {
    fn decay(&self, knowledge: f64, _elapsed_days: f64) -> f64 {
        knowledge
    }
}
