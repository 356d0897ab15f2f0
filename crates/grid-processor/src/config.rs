//! Configuration for the field processing stages.
//!
//! One [`ProcessingConfig`] is built at startup and passed by reference into
//! every stage; no stage reads constants from globals.

use serde::{Deserialize, Serialize};

/// Seconds in one day.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Configuration for all processing stages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Diffusivity estimator constants.
    pub diffusivity: DiffusivityConfig,
    /// Regridder behaviour.
    pub regrid: RegridConfig,
    /// Precision codec behaviour.
    pub precision: PrecisionConfig,
}

/// Physical constants of the diffusivity estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffusivityConfig {
    /// Empirical scale constant `C`.
    pub c: f64,
    /// Anomaly EKE scaling factor `ALPHA`.
    pub alpha: f64,
    /// Lagrangian decorrelation timescale `T_L` in days.
    pub lagrangian_timescale_days: f64,
    /// Physical ceiling `K_MAX` (m²/s).
    pub k_max: f64,
    /// Data-dependent secondary ceiling.
    pub adaptive_cap: AdaptiveCapConfig,
}

impl Default for DiffusivityConfig {
    fn default() -> Self {
        Self {
            c: 0.1,
            alpha: 0.1,
            lagrangian_timescale_days: 7.0,
            k_max: 3000.0,
            adaptive_cap: AdaptiveCapConfig::default(),
        }
    }
}

impl DiffusivityConfig {
    /// `T_L` in seconds.
    pub fn lagrangian_timescale_secs(&self) -> f64 {
        self.lagrangian_timescale_days * SECONDS_PER_DAY
    }
}

/// Thresholds of the adaptive percentile cap.
///
/// Empirical heuristic: when the field's maximum exceeds
/// `trigger_ratio * k_max` and the `percentile` of the positive cells is
/// below `ceiling_ratio * k_max`, everything is capped at that percentile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveCapConfig {
    pub enabled: bool,
    pub trigger_ratio: f64,
    pub ceiling_ratio: f64,
    pub percentile: f64,
}

impl Default for AdaptiveCapConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trigger_ratio: 0.8,
            ceiling_ratio: 0.5,
            percentile: 99.0,
        }
    }
}

/// Regridder configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegridConfig {
    /// Value for target points outside the source domain.
    pub fill_value: f32,
}

impl Default for RegridConfig {
    fn default() -> Self {
        Self { fill_value: 0.0 }
    }
}

/// Precision codec configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrecisionConfig {
    /// Max absolute round-trip error (physical units) above which a unit is flagged.
    pub warning_threshold: f32,
}

impl Default for PrecisionConfig {
    fn default() -> Self {
        Self {
            warning_threshold: 2.0,
        }
    }
}

impl ProcessingConfig {
    /// Load configuration from environment variables on top of the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override fields from environment variables where they parse.
    pub fn apply_env(&mut self) {
        if let Some(val) = env_f64("EKE_C") {
            self.diffusivity.c = val;
        }

        if let Some(val) = env_f64("EKE_ALPHA") {
            self.diffusivity.alpha = val;
        }

        if let Some(val) = env_f64("EKE_T_L_DAYS") {
            self.diffusivity.lagrangian_timescale_days = val;
        }

        if let Some(val) = env_f64("EKE_K_MAX") {
            self.diffusivity.k_max = val;
        }

        if let Ok(val) = std::env::var("EKE_ADAPTIVE_CAP") {
            self.diffusivity.adaptive_cap.enabled = val.to_lowercase() == "true" || val == "1";
        }

        if let Some(val) = env_f64("REGRID_FILL_VALUE") {
            self.regrid.fill_value = val as f32;
        }

        if let Some(val) = env_f64("PRECISION_WARN_THRESHOLD") {
            self.precision.warning_threshold = val as f32;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        let d = &self.diffusivity;

        for (name, value) in [
            ("c", d.c),
            ("alpha", d.alpha),
            ("lagrangian_timescale_days", d.lagrangian_timescale_days),
            ("k_max", d.k_max),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(format!("diffusivity.{name} must be > 0, got {value}"));
            }
        }

        let cap = &d.adaptive_cap;
        if !(0.0..=1.0).contains(&cap.trigger_ratio) || !(0.0..=1.0).contains(&cap.ceiling_ratio) {
            return Err("adaptive_cap ratios must be within 0-1".to_string());
        }

        if !(cap.percentile > 0.0 && cap.percentile <= 100.0) {
            return Err(format!(
                "adaptive_cap.percentile must be in (0, 100], got {}",
                cap.percentile
            ));
        }

        if self.regrid.fill_value.is_nan() {
            return Err("regrid.fill_value must not be NaN".to_string());
        }

        if !(self.precision.warning_threshold >= 0.0) {
            return Err("precision.warning_threshold must be >= 0".to_string());
        }

        Ok(())
    }
}

fn env_f64(name: &str) -> Option<f64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
