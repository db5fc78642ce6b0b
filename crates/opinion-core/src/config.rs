//! Configuration System
//!
//! Distribution parameters for trait sampling plus run settings, loaded from
//! `opinion.toml` so they can be tuned without recompiling.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

use crate::runner::{ConversationOrder, FailurePolicy, MemoryScope};
use crate::state::TransitionPolicy;

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "opinion.toml";

/// Allowed gap between the religion probabilities' sum and 1.0
const SUM_TOLERANCE: f64 = 1e-6;

/// Probability of one religion category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReligionShare {
    pub name: String,
    pub probability: f64,
}

impl ReligionShare {
    pub fn new(name: impl Into<String>, probability: f64) -> Self {
        Self {
            name: name.into(),
            probability,
        }
    }
}

/// Normal-distribution parameters for anger
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AngerConfig {
    pub mean: f64,
    pub std_dev: f64,
    /// Higher values concentrate samples around `mean`
    pub peak_factor: f64,
}

impl Default for AngerConfig {
    fn default() -> Self {
        Self {
            mean: 0.5,
            std_dev: 0.2,
            peak_factor: 2.0,
        }
    }
}

/// Power-law parameters for persuasiveness and income
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LongTailConfig {
    /// Shape: lower means a longer tail
    pub alpha: f64,
    /// Divides the raw power-law output into the unit range
    pub scale: f64,
}

impl Default for LongTailConfig {
    fn default() -> Self {
        Self {
            alpha: 1.5,
            scale: 10.0,
        }
    }
}

/// Threshold parameters for gullibility
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GullibilityConfig {
    /// Fraction of the population drawn from the high band
    pub high_threshold: f64,
    /// Lower bound of the high band `[high_min, 1]`
    pub high_min: f64,
    /// Upper bound of the low band `[0, low_max]`
    pub low_max: f64,
}

impl Default for GullibilityConfig {
    fn default() -> Self {
        Self {
            high_threshold: 0.8,
            high_min: 0.6,
            low_max: 0.6,
        }
    }
}

/// Parameters for every trait distribution.
///
/// Setters accept any value: out-of-range numbers and religion shares that
/// do not sum to 1 are kept as given. [`DistributionConfig::warnings`]
/// reports them; the sampler clamps its output either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    /// Sampled in list order
    pub religion: Vec<ReligionShare>,
    pub anger: AngerConfig,
    pub persuasiveness: LongTailConfig,
    pub income: LongTailConfig,
    pub gullibility: GullibilityConfig,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            religion: vec![
                ReligionShare::new("hindu", 0.8),
                ReligionShare::new("muslim", 0.1),
                ReligionShare::new("christian", 0.04),
                ReligionShare::new("sikh", 0.02),
                ReligionShare::new("jain", 0.01),
                ReligionShare::new("buddhist", 0.01),
                ReligionShare::new("zoroastrian", 0.01),
                ReligionShare::new("atheist", 0.005),
                ReligionShare::new("other", 0.005),
            ],
            anger: AngerConfig::default(),
            persuasiveness: LongTailConfig::default(),
            income: LongTailConfig::default(),
            gullibility: GullibilityConfig::default(),
        }
    }
}

/// A single scalar in a [`DistributionConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigParam {
    /// Probability of the named religion
    Religion(String),
    AngerMean,
    AngerStdDev,
    AngerPeakFactor,
    PersuasivenessAlpha,
    PersuasivenessScale,
    IncomeAlpha,
    IncomeScale,
    GullibilityHighThreshold,
    GullibilityHighMin,
    GullibilityLowMax,
}

impl ConfigParam {
    /// Resolves a `group`/`field` pair such as `("anger", "std_dev")`.
    ///
    /// Any non-blank field name is a valid religion.
    pub fn parse(group: &str, field: &str) -> Result<Self, ConfigError> {
        let group = group.trim().to_lowercase();
        let field = field.trim().to_lowercase().replace('-', "_");

        let unknown_field = || ConfigError::UnknownField {
            group: group.clone(),
            field: field.clone(),
        };

        match group.as_str() {
            "religion" if field.is_empty() => Err(unknown_field()),
            "religion" => Ok(ConfigParam::Religion(field.clone())),
            "anger" => match field.as_str() {
                "mean" => Ok(ConfigParam::AngerMean),
                "std_dev" | "stddev" => Ok(ConfigParam::AngerStdDev),
                "peak_factor" | "peakfactor" => Ok(ConfigParam::AngerPeakFactor),
                _ => Err(unknown_field()),
            },
            "persuasiveness" => match field.as_str() {
                "alpha" => Ok(ConfigParam::PersuasivenessAlpha),
                "scale" => Ok(ConfigParam::PersuasivenessScale),
                _ => Err(unknown_field()),
            },
            "income" => match field.as_str() {
                "alpha" => Ok(ConfigParam::IncomeAlpha),
                "scale" => Ok(ConfigParam::IncomeScale),
                _ => Err(unknown_field()),
            },
            "gullibility" => match field.as_str() {
                "high_threshold" | "highthreshold" => Ok(ConfigParam::GullibilityHighThreshold),
                "high_min" | "highmin" => Ok(ConfigParam::GullibilityHighMin),
                "low_max" | "lowmax" => Ok(ConfigParam::GullibilityLowMax),
                _ => Err(unknown_field()),
            },
            _ => Err(ConfigError::UnknownGroup(group.clone())),
        }
    }
}

impl fmt::Display for ConfigParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigParam::Religion(name) => write!(f, "religion.{}", name),
            ConfigParam::AngerMean => write!(f, "anger.mean"),
            ConfigParam::AngerStdDev => write!(f, "anger.std_dev"),
            ConfigParam::AngerPeakFactor => write!(f, "anger.peak_factor"),
            ConfigParam::PersuasivenessAlpha => write!(f, "persuasiveness.alpha"),
            ConfigParam::PersuasivenessScale => write!(f, "persuasiveness.scale"),
            ConfigParam::IncomeAlpha => write!(f, "income.alpha"),
            ConfigParam::IncomeScale => write!(f, "income.scale"),
            ConfigParam::GullibilityHighThreshold => write!(f, "gullibility.high_threshold"),
            ConfigParam::GullibilityHighMin => write!(f, "gullibility.high_min"),
            ConfigParam::GullibilityLowMax => write!(f, "gullibility.low_max"),
        }
    }
}

/// Parameter values that are accepted but will skew or flatten samples.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigWarning {
    /// Religion probabilities do not sum to 1; leftover mass falls to "Other"
    ReligionSumMismatch { sum: f64 },
    /// A parameter whose value makes its distribution degenerate
    DegenerateParameter { param: ConfigParam, value: f64 },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::ReligionSumMismatch { sum } => {
                write!(f, "religion probabilities sum to {:.4}, not 1", sum)
            }
            ConfigWarning::DegenerateParameter { param, value } => {
                write!(f, "{} = {} produces a degenerate distribution", param, value)
            }
        }
    }
}

impl DistributionConfig {
    /// Replaces one scalar. No validation is performed.
    ///
    /// Setting an unknown religion appends it to the end of the list.
    pub fn update(&mut self, param: &ConfigParam, value: f64) {
        match param {
            ConfigParam::Religion(name) => {
                match self
                    .religion
                    .iter_mut()
                    .find(|share| share.name.eq_ignore_ascii_case(name))
                {
                    Some(share) => share.probability = value,
                    None => self.religion.push(ReligionShare::new(name.clone(), value)),
                }
            }
            ConfigParam::AngerMean => self.anger.mean = value,
            ConfigParam::AngerStdDev => self.anger.std_dev = value,
            ConfigParam::AngerPeakFactor => self.anger.peak_factor = value,
            ConfigParam::PersuasivenessAlpha => self.persuasiveness.alpha = value,
            ConfigParam::PersuasivenessScale => self.persuasiveness.scale = value,
            ConfigParam::IncomeAlpha => self.income.alpha = value,
            ConfigParam::IncomeScale => self.income.scale = value,
            ConfigParam::GullibilityHighThreshold => self.gullibility.high_threshold = value,
            ConfigParam::GullibilityHighMin => self.gullibility.high_min = value,
            ConfigParam::GullibilityLowMax => self.gullibility.low_max = value,
        }
    }

    /// String form of [`update`](Self::update); errors only on unknown names.
    pub fn update_named(&mut self, group: &str, field: &str, value: f64) -> Result<(), ConfigError> {
        let param = ConfigParam::parse(group, field)?;
        self.update(&param, value);
        Ok(())
    }

    /// Applies an override written as `group.field=value`.
    pub fn apply_override(&mut self, spec: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidOverride(spec.to_string());

        let (path, value) = spec.split_once('=').ok_or_else(invalid)?;
        let (group, field) = path.split_once('.').ok_or_else(invalid)?;
        let value: f64 = value.trim().parse().map_err(|_| invalid())?;

        self.update_named(group, field, value)
    }

    /// Reads one scalar. Returns `None` for a religion that is not configured.
    pub fn get(&self, param: &ConfigParam) -> Option<f64> {
        match param {
            ConfigParam::Religion(name) => self
                .religion
                .iter()
                .find(|share| share.name.eq_ignore_ascii_case(name))
                .map(|share| share.probability),
            ConfigParam::AngerMean => Some(self.anger.mean),
            ConfigParam::AngerStdDev => Some(self.anger.std_dev),
            ConfigParam::AngerPeakFactor => Some(self.anger.peak_factor),
            ConfigParam::PersuasivenessAlpha => Some(self.persuasiveness.alpha),
            ConfigParam::PersuasivenessScale => Some(self.persuasiveness.scale),
            ConfigParam::IncomeAlpha => Some(self.income.alpha),
            ConfigParam::IncomeScale => Some(self.income.scale),
            ConfigParam::GullibilityHighThreshold => Some(self.gullibility.high_threshold),
            ConfigParam::GullibilityHighMin => Some(self.gullibility.high_min),
            ConfigParam::GullibilityLowMax => Some(self.gullibility.low_max),
        }
    }

    /// Restores the built-in snapshot.
    pub fn reset_to_defaults(&mut self) {
        *self = Self::default();
    }

    /// Sum of all religion probabilities.
    pub fn religion_sum(&self) -> f64 {
        self.religion.iter().map(|share| share.probability).sum()
    }

    /// Lists accepted-but-suspect values. An empty list means a clean config.
    pub fn warnings(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        let sum = self.religion_sum();
        if (sum - 1.0).abs() > SUM_TOLERANCE {
            warnings.push(ConfigWarning::ReligionSumMismatch { sum });
        }

        let must_be_positive = [
            (ConfigParam::AngerPeakFactor, self.anger.peak_factor),
            (ConfigParam::PersuasivenessAlpha, self.persuasiveness.alpha),
            (ConfigParam::PersuasivenessScale, self.persuasiveness.scale),
            (ConfigParam::IncomeAlpha, self.income.alpha),
            (ConfigParam::IncomeScale, self.income.scale),
        ];
        for (param, value) in must_be_positive {
            if value.is_nan() || value <= 0.0 {
                warnings.push(ConfigWarning::DegenerateParameter { param, value });
            }
        }

        warnings
    }

    /// Logs every warning at `warn` level and returns how many there were.
    pub fn log_warnings(&self) -> usize {
        let warnings = self.warnings();
        for warning in &warnings {
            warn!("Distribution config: {}", warning);
        }
        warnings.len()
    }
}

/// Everything `opinion.toml` can set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub distribution: DistributionConfig,
    #[serde(default)]
    pub service: ServiceConfig,
}

/// Run parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub agent_count: usize,
    pub seed: u64,
    /// Smallest population worth simulating
    pub min_agents: usize,
    pub failure_policy: FailurePolicy,
    pub conversation_order: ConversationOrder,
    pub memory_scope: MemoryScope,
    pub transition_policy: TransitionPolicy,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            agent_count: 10,
            seed: 42,
            min_agents: 4,
            failure_policy: FailurePolicy::default(),
            conversation_order: ConversationOrder::default(),
            memory_scope: MemoryScope::default(),
            transition_policy: TransitionPolicy::default(),
        }
    }
}

/// Generation service endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of the generation service; the offline generator is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 30,
        }
    }
}

impl SimConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        content.parse()
    }

    /// Reads `opinion.toml` from the working directory, falling back to defaults
    pub fn load_or_default() -> Self {
        if !Path::new(DEFAULT_CONFIG_PATH).exists() {
            return Self::default();
        }
        Self::load(DEFAULT_CONFIG_PATH).unwrap_or_else(|e| {
            warn!("Could not load {}: {}. Using defaults.", DEFAULT_CONFIG_PATH, e);
            Self::default()
        })
    }

    /// Serializes the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl FromStr for SimConfig {
    type Err = ConfigError;

    /// Parses configuration from a TOML string.
    fn from_str(content: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(content)?)
    }
}

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("unknown parameter group: '{0}'")]
    UnknownGroup(String),

    #[error("unknown field '{field}' in parameter group '{group}'")]
    UnknownField { group: String, field: String },

    #[error("invalid override '{0}', expected group.field=value")]
    InvalidOverride(String),
}
