//! Eddy diffusivity from geostrophic velocity anomalies.
//!
//! ```text
//! eke     = 0.5 * (u² + v²)
//! eke_eff = eke * ALPHA
//! K       = C * eke_eff * T_L
//! K       = min(K, K_MAX)
//! K       = min(K, p99(K > 0))   when max(K) > 0.8 K_MAX and p99 < 0.5 K_MAX
//! K[NaN]  = 0
//! ```
//!
//! The second ceiling keeps a handful of coastal/edge cells from dominating
//! the dynamic range. Its thresholds come from [`AdaptiveCapConfig`].

use field_common::{FieldStats, ScalarField, VectorField};
use tracing::debug;

use crate::config::{AdaptiveCapConfig, DiffusivityConfig};
use crate::error::Result;

/// Which ceiling ended up limiting the field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CapApplied {
    /// No cell exceeded `K_MAX`.
    None,
    /// Some cells were clipped to `K_MAX`.
    Physical,
    /// All cells were clipped to a percentile of the positive values.
    Adaptive { ceiling: f64 },
}

/// Diffusivity field plus the diagnostics gathered while computing it.
#[derive(Debug, Clone)]
pub struct DiffusivityEstimate {
    /// K in m²/s, `NaN`-free.
    pub field: ScalarField,
    /// Statistics of the raw anomaly EKE (m²/s²).
    pub eke_stats: FieldStats,
    /// Statistics of the non-zero K values.
    pub k_stats: FieldStats,
    /// Fraction of cells with K == 0.
    pub zero_fraction: f64,
    /// Ceiling that was applied.
    pub cap: CapApplied,
}

impl DiffusivityEstimate {
    /// Highest ceiling any value of the field may reach.
    pub fn effective_ceiling(&self, config: &DiffusivityConfig) -> f64 {
        match self.cap {
            CapApplied::Adaptive { ceiling } => ceiling,
            _ => config.k_max,
        }
    }
}

/// Estimate diffusivity from an anomaly vector field.
pub fn estimate_diffusivity(
    anomaly: &VectorField,
    config: &DiffusivityConfig,
) -> Result<DiffusivityEstimate> {
    estimate_from_components(anomaly.u(), anomaly.v(), config)
}

/// Estimate diffusivity from separate U and V components.
///
/// Fails with a shape error if the components disagree.
pub fn estimate_from_components(
    u: &ScalarField,
    v: &ScalarField,
    config: &DiffusivityConfig,
) -> Result<DiffusivityEstimate> {
    v.ensure_shape(u.shape())?;

    let t_l = config.lagrangian_timescale_secs();
    let eke: Vec<f32> = u
        .data()
        .iter()
        .zip(v.data())
        .map(|(&u, &v)| 0.5 * (u as f64 * u as f64 + v as f64 * v as f64) as f32)
        .collect();
    let eke_stats = FieldStats::from_values(&eke);

    let mut k: Vec<f64> = eke
        .iter()
        .map(|&e| config.c * (e as f64 * config.alpha) * t_l)
        .collect();

    let mut cap = CapApplied::None;
    let k_max = config.k_max;
    for value in k.iter_mut() {
        // NaN compares false and stays NaN until the final fill.
        if *value > k_max {
            *value = k_max;
            cap = CapApplied::Physical;
        }
    }

    if let Some(ceiling) = adaptive_ceiling(&k, k_max, &config.adaptive_cap) {
        debug!(ceiling, "Extreme cells detected, capping at percentile");
        for value in k.iter_mut() {
            if *value > ceiling {
                *value = ceiling;
            }
        }
        cap = CapApplied::Adaptive { ceiling };
    }

    let data: Vec<f32> = k
        .into_iter()
        .map(|v| if v.is_nan() { 0.0 } else { v as f32 })
        .collect();

    let zeros = data.iter().filter(|&&v| v == 0.0).count();
    let nonzero: Vec<f32> = data.iter().copied().filter(|&v| v != 0.0).collect();
    let k_stats = FieldStats::from_values(&nonzero);
    let zero_fraction = if data.is_empty() {
        0.0
    } else {
        zeros as f64 / data.len() as f64
    };

    debug!(
        eke_min = eke_stats.min,
        eke_mean = eke_stats.mean,
        eke_max = eke_stats.max,
        k_mean = k_stats.mean,
        k_max = k_stats.max,
        zero_pct = zero_fraction * 100.0,
        "Diffusivity computed"
    );

    let shape = u.shape();
    let field = ScalarField::new(data, shape.n_lat, shape.n_lon)?;

    Ok(DiffusivityEstimate {
        field,
        eke_stats,
        k_stats,
        zero_fraction,
        cap,
    })
}

/// Secondary ceiling, if the field calls for one.
///
/// Triggered when the `NaN`-ignoring maximum exceeds `trigger_ratio * k_max`;
/// the ceiling is the configured percentile of the strictly positive cells,
/// used only if it is below `ceiling_ratio * k_max`.
fn adaptive_ceiling(k: &[f64], k_max: f64, config: &AdaptiveCapConfig) -> Option<f64> {
    if !config.enabled {
        return None;
    }

    let max = k
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(f64::NEG_INFINITY, f64::max);
    if !(max > k_max * config.trigger_ratio) {
        return None;
    }

    let mut positive: Vec<f64> = k.iter().copied().filter(|&v| v > 0.0).collect();
    let pct = percentile(&mut positive, config.percentile).unwrap_or(k_max);

    (pct < k_max * config.ceiling_ratio).then_some(pct)
}

/// Percentile with linear interpolation between closest ranks.
///
/// `values` is sorted in place. Returns `None` for an empty slice.
pub fn percentile(values: &mut [f64], pct: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));

    let rank = (pct / 100.0).clamp(0.0, 1.0) * (values.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;

    Some(values[lo] + (values[hi] - values[lo]) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use field_common::GridShape;

    fn uniform(shape: GridShape, u: f32, v: f32) -> VectorField {
        VectorField::new(ScalarField::filled(shape, u), ScalarField::filled(shape, v)).unwrap()
    }

    /// Build an anomaly field from per-cell u values (v = 0).
    fn from_u(values: Vec<f32>) -> VectorField {
        let n = values.len();
        VectorField::new(
            ScalarField::new(values, 1, n).unwrap(),
            ScalarField::filled(GridShape::new(1, n), 0.0),
        )
        .unwrap()
    }

    #[test]
    fn test_uniform_anomaly_gives_constant_diffusivity() {
        let config = DiffusivityConfig::default();
        let estimate = estimate_diffusivity(&uniform(GridShape::new(4, 5), 0.1, 0.0), &config).unwrap();

        for &k in estimate.field.data() {
            assert!((k - 30.24).abs() < 1e-3, "got {k}");
        }
        assert_eq!(estimate.cap, CapApplied::None);
        assert_eq!(estimate.zero_fraction, 0.0);
    }

    #[test]
    fn test_physical_cap() {
        let config = DiffusivityConfig::default();
        let estimate = estimate_diffusivity(&uniform(GridShape::new(3, 3), 10.0, 0.0), &config).unwrap();

        assert!(estimate.field.data().iter().all(|&k| k == 3000.0));
        // All cells sit at the ceiling, so the percentile test cannot fire.
        assert_eq!(estimate.cap, CapApplied::Physical);
    }

    #[test]
    fn test_adaptive_cap_suppresses_sparse_extremes() {
        let mut values = vec![0.1f32; 995];
        values.extend(std::iter::repeat(10.0).take(5));
        let config = DiffusivityConfig::default();

        let estimate = estimate_diffusivity(&from_u(values), &config).unwrap();

        match estimate.cap {
            CapApplied::Adaptive { ceiling } => assert!((ceiling - 30.24).abs() < 1e-3),
            other => panic!("expected adaptive cap, got {other:?}"),
        }
        assert!(estimate.field.data().iter().all(|&k| (k - 30.24).abs() < 1e-3));
    }

    #[test]
    fn test_adaptive_percentile_ignores_zero_cells() {
        // 900 zeros would drag an unfiltered p99 down to 30.24.
        let mut values = vec![0.0f32; 900];
        values.extend(std::iter::repeat(0.1).take(95));
        values.extend(std::iter::repeat(10.0).take(5));
        let config = DiffusivityConfig::default();

        let estimate = estimate_diffusivity(&from_u(values), &config).unwrap();

        assert_eq!(estimate.cap, CapApplied::Physical);
        assert_eq!(estimate.field.stats().max, 3000.0);
        assert!((estimate.zero_fraction - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_adaptive_cap_can_be_disabled() {
        let mut values = vec![0.1f32; 995];
        values.extend(std::iter::repeat(10.0).take(5));
        let mut config = DiffusivityConfig::default();
        config.adaptive_cap.enabled = false;

        let estimate = estimate_diffusivity(&from_u(values), &config).unwrap();
        assert_eq!(estimate.cap, CapApplied::Physical);
        assert_eq!(estimate.field.stats().max, 3000.0);
    }

    #[test]
    fn test_nan_becomes_zero() {
        let estimate = estimate_diffusivity(
            &from_u(vec![0.1, f32::NAN, 0.1]),
            &DiffusivityConfig::default(),
        )
        .unwrap();

        assert_eq!(estimate.field.get(0, 1), Some(0.0));
        assert!((estimate.field.get(0, 0).unwrap() - 30.24).abs() < 1e-3);
    }

    #[test]
    fn test_all_nan_input_degenerates_to_zero() {
        let shape = GridShape::new(2, 2);
        let estimate =
            estimate_diffusivity(&VectorField::missing(shape), &DiffusivityConfig::default()).unwrap();

        assert!(estimate.field.data().iter().all(|&k| k == 0.0));
        assert_eq!(estimate.cap, CapApplied::None);
        assert_eq!(estimate.zero_fraction, 1.0);
    }

    #[test]
    fn test_component_shape_mismatch() {
        let u = ScalarField::filled(GridShape::new(2, 2), 0.1);
        let v = ScalarField::filled(GridShape::new(2, 3), 0.1);
        let err = estimate_from_components(&u, &v, &DiffusivityConfig::default()).unwrap_err();
        assert!(err.is_shape_error());
    }

    #[test]
    fn test_percentile_linear_interpolation() {
        assert_eq!(percentile(&mut [4.0, 1.0, 3.0, 2.0], 50.0), Some(2.5));

        let mut values: Vec<f64> = (1..=100).map(|v| v as f64).collect();
        let p99 = percentile(&mut values, 99.0).unwrap();
        assert!((p99 - 99.01).abs() < 1e-9);

        assert_eq!(percentile(&mut [], 99.0), None);
        assert_eq!(percentile(&mut [7.0], 99.0), Some(7.0));
    }
}
