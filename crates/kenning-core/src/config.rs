use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::KenningError;

/// Top-level configuration loaded from `.kenning.toml`.
///
/// Supports layered resolution: CLI flags > local config > defaults.
///
/// # Examples
///
/// ```
/// use kenning_core::KenningConfig;
///
/// let config = KenningConfig::default();
/// assert_eq!(config.knowledge.half_life_days, 500.0);
/// assert_eq!(config.output.top, 5);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KenningConfig {
    /// Knowledge model tuning.
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    /// History mining settings.
    #[serde(default)]
    pub history: HistoryConfig,
    /// Presentation settings.
    #[serde(default)]
    pub output: OutputConfig,
}

impl KenningConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`KenningError::Io`] if the file cannot be read,
    /// [`KenningError::Toml`] if the content is not valid TOML, or
    /// [`KenningError::Config`] if a value is out of range.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use kenning_core::KenningConfig;
    /// use std::path::Path;
    ///
    /// let config = KenningConfig::from_file(Path::new(".kenning.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, KenningError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`KenningError::Toml`] if parsing fails, or
    /// [`KenningError::Config`] if a value is out of range.
    ///
    /// # Examples
    ///
    /// ```
    /// use kenning_core::{KenningConfig, OblivionPolicy};
    ///
    /// let toml = r#"
    /// [knowledge]
    /// oblivion = "never"
    /// half_life_days = 90
    /// "#;
    /// let config = KenningConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.knowledge.oblivion, OblivionPolicy::Never);
    /// assert_eq!(config.knowledge.half_life_days, 90.0);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, KenningError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every tunable is within its meaningful range.
    ///
    /// # Errors
    ///
    /// Returns [`KenningError::Config`] naming the first offending key.
    pub fn validate(&self) -> Result<(), KenningError> {
        let k = &self.knowledge;
        if !k.half_life_days.is_finite() || k.half_life_days <= 0.0 {
            return Err(KenningError::Config(format!(
                "knowledge.half_life_days must be a positive number, got {}",
                k.half_life_days
            )));
        }
        if !k.spread_coefficient.is_finite() || k.spread_coefficient < 0.0 {
            return Err(KenningError::Config(format!(
                "knowledge.spread_coefficient must be zero or positive, got {}",
                k.spread_coefficient
            )));
        }
        if !(0.0..=1.0).contains(&k.foreign_writing_knowledge) {
            return Err(KenningError::Config(format!(
                "knowledge.foreign_writing_knowledge must lie in [0, 1], got {}",
                k.foreign_writing_knowledge
            )));
        }
        Ok(())
    }
}

/// How knowledge fades over time.
///
/// # Examples
///
/// ```
/// use kenning_core::OblivionPolicy;
///
/// assert_eq!(OblivionPolicy::default(), OblivionPolicy::Exponential);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OblivionPolicy {
    /// Halve knowledge every `half_life_days`.
    #[default]
    Exponential,
    /// Never forget anything.
    Never,
}

/// How the information content of a line is measured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightPolicy {
    /// Count words, splitting identifiers at camelCase and class boundaries.
    #[default]
    Words,
    /// Count non-blank characters.
    Length,
}

/// Knowledge model configuration.
///
/// # Examples
///
/// ```
/// use kenning_core::KnowledgeConfig;
///
/// let config = KnowledgeConfig::default();
/// assert_eq!(config.spread_coefficient, 6.0);
/// assert_eq!(config.foreign_writing_knowledge, 0.0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Forgetting policy (default: exponential).
    #[serde(default)]
    pub oblivion: OblivionPolicy,
    /// Half-life of knowledge in days for the exponential policy (default: 500).
    #[serde(default = "default_half_life_days")]
    pub half_life_days: f64,
    /// Line weight heuristic (default: words).
    #[serde(default)]
    pub weight: WeightPolicy,
    /// Multiplier sizing how far reading knowledge spreads around an edit (default: 6).
    #[serde(default = "default_spread_coefficient")]
    pub spread_coefficient: f64,
    /// Writing credit for lines inserted by another developer (default: 0).
    #[serde(default)]
    pub foreign_writing_knowledge: f64,
}

fn default_half_life_days() -> f64 {
    500.0
}

fn default_spread_coefficient() -> f64 {
    6.0
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            oblivion: OblivionPolicy::default(),
            half_life_days: default_half_life_days(),
            weight: WeightPolicy::default(),
            spread_coefficient: default_spread_coefficient(),
            foreign_writing_knowledge: 0.0,
        }
    }
}

/// History mining configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Branch to walk (default: HEAD).
    pub branch: Option<String>,
    /// Keep only the newest N revisions; 0 keeps all (default: 0).
    #[serde(default)]
    pub max_revisions: usize,
}

/// Presentation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Number of developers to show (default: 5).
    #[serde(default = "default_top")]
    pub top: usize,
}

fn default_top() -> usize {
    5
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { top: default_top() }
    }
}
