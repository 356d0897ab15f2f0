//! Preparer configuration.
//!
//! One YAML document drives both pipelines:
//!
//! ```yaml
//! processing:
//!   diffusivity: { c: 0.1, alpha: 0.1, lagrangian_timescale_days: 7, k_max: 3000 }
//!   regrid: { fill_value: 0.0 }
//!   precision: { warning_threshold: 2.0 }
//! eke:
//!   input_dir: ${DATA_ROOT}/cmems_eke
//!   output_dir: ${DATA_ROOT}/eke_bin
//!   grid: { kind: from_file, path: "${DATA_ROOT}/currents_3d_bin/currents_2011_03_01.bin" }
//! currents:
//!   input_dir: ${DATA_ROOT}/hycom_3d
//!   output_dir: ${DATA_ROOT}/currents_3d_bin
//!   depth_levels: [0, 50, 100, 200, 500, 1000]
//!   base_date: 2011-03-01
//! ```
//!
//! `${VAR}` and `${VAR:-default}` are expanded from the environment before
//! parsing. Every field has a default.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use container::GridSource;
use grid_processor::ProcessingConfig;
use serde::{Deserialize, Serialize};

use crate::error::{IngestionError, Result};

/// Default requested depth levels (m).
pub const DEFAULT_DEPTH_LEVELS: [f64; 6] = [0.0, 50.0, 100.0, 200.0, 500.0, 1000.0];

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreparerConfig {
    pub processing: ProcessingConfig,
    pub eke: EkeConfig,
    pub currents: CurrentsConfig,
}

/// EKE diffusivity pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EkeConfig {
    /// Directory of CMEMS `*.nc` files.
    pub input_dir: PathBuf,
    /// Receives `eke_coords.bin` and `eke_metadata.json`.
    pub output_dir: PathBuf,
    /// Subdirectory of `output_dir` for the daily files.
    pub daily_subdir: String,
    /// Target grid.
    pub grid: GridSource,
}

impl Default for EkeConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data/cmems_eke"),
            output_dir: PathBuf::from("data/eke_bin"),
            daily_subdir: "daily".to_string(),
            grid: GridSource::default(),
        }
    }
}

impl EkeConfig {
    pub fn daily_dir(&self) -> PathBuf {
        self.output_dir.join(&self.daily_subdir)
    }
}

/// 3D currents pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrentsConfig {
    /// Directory of `YYYYMMDD/` subdirectories holding per-depth files.
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Requested depths in output order (m).
    pub depth_levels: Vec<f64>,
    /// Day offsets in the manifest count from this date.
    pub base_date: NaiveDate,
    /// Optional grid to regrid every layer onto; the native grid is kept otherwise.
    pub target_grid: Option<GridSource>,
}

impl Default for CurrentsConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data/hycom_3d"),
            output_dir: PathBuf::from("data/currents_3d_bin"),
            depth_levels: DEFAULT_DEPTH_LEVELS.to_vec(),
            base_date: NaiveDate::from_ymd_opt(2011, 3, 1).unwrap_or_default(),
            target_grid: None,
        }
    }
}

impl PreparerConfig {
    /// Load and validate a YAML file, expanding environment variables.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            IngestionError::InvalidConfig(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate YAML text, expanding environment variables.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content)?;
        let mut config: PreparerConfig = serde_yaml::from_str(&expanded)
            .map_err(|e| IngestionError::InvalidConfig(format!("Invalid YAML: {e}")))?;
        config.processing.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Self {
        Self {
            processing: ProcessingConfig::from_env(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.processing
            .validate()
            .map_err(IngestionError::InvalidConfig)?;

        if self.eke.daily_subdir.is_empty() {
            return Err(IngestionError::InvalidConfig(
                "eke.daily_subdir cannot be empty".to_string(),
            ));
        }

        if let GridSource::Synthetic { resolution, .. } = self.eke.grid {
            if !(resolution > 0.0) {
                return Err(IngestionError::InvalidConfig(format!(
                    "eke.grid.resolution must be > 0, got {resolution}"
                )));
            }
        }

        let levels = &self.currents.depth_levels;
        if levels.is_empty() {
            return Err(IngestionError::InvalidConfig(
                "currents.depth_levels cannot be empty".to_string(),
            ));
        }
        if levels.iter().any(|d| !d.is_finite() || *d < 0.0) {
            return Err(IngestionError::InvalidConfig(format!(
                "currents.depth_levels must be finite and >= 0: {levels:?}"
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand `${VAR}` and `${VAR:-default}` in `content`.
pub fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut var_expr = String::new();
            let mut brace_count = 1;

            while brace_count > 0 {
                match chars.next() {
                    Some('{') => {
                        brace_count += 1;
                        var_expr.push('{');
                    }
                    Some('}') => {
                        brace_count -= 1;
                        if brace_count > 0 {
                            var_expr.push('}');
                        }
                    }
                    Some(c) => var_expr.push(c),
                    None => {
                        return Err(IngestionError::InvalidConfig(format!(
                            "Unclosed variable substitution: ${{{var_expr}"
                        )))
                    }
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).map_err(|_| {
            IngestionError::InvalidConfig(format!("Environment variable {expr} not set"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use field_common::BoundingBox;

    #[test]
    fn test_defaults_are_valid() {
        let config = PreparerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.currents.depth_levels, DEFAULT_DEPTH_LEVELS.to_vec());
        assert_eq!(
            config.currents.base_date,
            NaiveDate::from_ymd_opt(2011, 3, 1).unwrap()
        );
        assert_eq!(config.eke.daily_dir(), PathBuf::from("data/eke_bin/daily"));
    }

    #[test]
    fn test_partial_yaml() {
        let config = PreparerConfig::from_yaml(
            r#"
processing:
  diffusivity:
    alpha: 0.15
eke:
  output_dir: /tmp/eke
  grid:
    kind: synthetic
    bounds: { min_lon: 140, min_lat: 30, max_lon: 150, max_lat: 40 }
    resolution: 0.25
currents:
  depth_levels: [0, 100]
"#,
        )
        .unwrap();

        assert_eq!(config.processing.diffusivity.alpha, 0.15);
        assert_eq!(config.processing.diffusivity.k_max, 3000.0);
        assert_eq!(config.eke.output_dir, PathBuf::from("/tmp/eke"));
        assert_eq!(
            config.eke.grid,
            GridSource::Synthetic {
                bounds: BoundingBox::new(140.0, 30.0, 150.0, 40.0),
                resolution: 0.25
            }
        );
        assert_eq!(config.currents.depth_levels, vec![0.0, 100.0]);
    }

    #[test]
    fn test_env_expansion() {
        std::env::set_var("PREPARER_TEST_ROOT", "/data/ocean");
        let expanded =
            expand_env_vars("a: ${PREPARER_TEST_ROOT}/eke\nb: ${PREPARER_TEST_UNSET:-fallback}")
                .unwrap();
        assert_eq!(expanded, "a: /data/ocean/eke\nb: fallback");

        assert!(expand_env_vars("a: ${PREPARER_TEST_UNSET_2}").is_err());
        assert!(expand_env_vars("a: ${UNCLOSED").is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(PreparerConfig::from_yaml("currents:\n  depth_levels: []\n").is_err());
        assert!(PreparerConfig::from_yaml("currents:\n  depth_levels: [-5]\n").is_err());
        assert!(PreparerConfig::from_yaml("processing:\n  diffusivity:\n    k_max: 0\n").is_err());
        assert!(PreparerConfig::from_yaml("eke: [not, a, map]\n").is_err());
    }
}
