//! Integration tests chaining the processing stages on synthetic data.

use field_common::{BoundingBox, Grid, GridShape, ScalarField, VectorField};
use grid_processor::{
    estimate_diffusivity, quantize, regrid, LayerCatalog, LayerSource, ProcessingConfig,
    RegridConfig, StackAssembler,
};
use test_utils::{
    assert_all_nan, assert_approx_eq, bbox, eddy_anomaly, index_field, linear_field, physics,
    regular_grid, uniform_anomaly, with_nan_cells, DEPTH_LEVELS,
};

fn bounds(b: (f64, f64, f64, f64)) -> BoundingBox {
    BoundingBox::new(b.0, b.1, b.2, b.3)
}

// =============================================================================
// Regridding
// =============================================================================

#[test]
fn test_linear_field_is_reproduced_on_finer_target() {
    let source = regular_grid(bounds(bbox::SMALL_SOURCE), 11, 11);
    let target = regular_grid(bounds(bbox::SMALL_SOURCE), 41, 37);
    let field = linear_field(&source, 2.0, -3.0, 10.0);

    let out = regrid(&field, &source, &target, &RegridConfig::default()).unwrap();
    let expected = linear_field(&target, 2.0, -3.0, 10.0);

    for (got, want) in out.data().iter().zip(expected.data()) {
        assert_approx_eq!(*got, *want, 1e-3);
    }
}

#[test]
fn test_eastward_extension_is_filled() {
    let source = regular_grid(bounds(bbox::SMALL_SOURCE), 11, 11);
    let target = regular_grid(bounds(bbox::SMALL_SOURCE_EAST_5), 11, 16);
    let field = index_field(source.shape()).map(|v| v + 1.0);

    let out = regrid(&field, &source, &target, &RegridConfig::default()).unwrap();

    for row in 0..11 {
        for col in 0..16 {
            let value = out.get(row, col).unwrap();
            if col > 10 {
                assert_eq!(value, 0.0, "col {col} should be fill");
            } else {
                assert_eq!(value, field.get(row, col).unwrap());
            }
        }
    }
}

#[test]
fn test_custom_fill_value() {
    let source = regular_grid(bounds(bbox::SMALL_SOURCE), 11, 11);
    let target = regular_grid(bounds(bbox::SMALL_SOURCE_EAST_5), 11, 16);
    let field = ScalarField::filled(source.shape(), 1.0);

    let out = regrid(&field, &source, &target, &RegridConfig { fill_value: -1.0 }).unwrap();
    assert_eq!(out.get(5, 15), Some(-1.0));
}

// =============================================================================
// Diffusivity
// =============================================================================

#[test]
fn test_diffusivity_bounded_by_cap() {
    let config = ProcessingConfig::default();
    for peak in [0.05, 0.5, 2.0, 8.0] {
        let estimate = estimate_diffusivity(&eddy_anomaly(GridShape::new(40, 60), peak), &config.diffusivity)
            .unwrap();
        let ceiling = estimate.effective_ceiling(&config.diffusivity) as f32;
        for &k in estimate.field.data() {
            assert!(k >= 0.0, "negative K {k}");
            assert!(k <= ceiling, "K {k} above ceiling {ceiling}");
        }
    }
}

#[test]
fn test_pipeline_error_within_reported_bound() {
    let config = ProcessingConfig::default();
    let source = regular_grid(bounds(bbox::SMALL_SOURCE), 21, 21);
    let target = regular_grid(bounds(bbox::SMALL_SOURCE_EAST_5), 31, 46);

    let estimate =
        estimate_diffusivity(&eddy_anomaly(source.shape(), 1.0), &config.diffusivity).unwrap();
    let on_target = regrid(&estimate.field, &source, &target, &config.regrid).unwrap();
    let encoded = quantize(&on_target);
    let decoded = encoded.dequantize();

    let bound = encoded.max_abs_error();
    assert!(bound < config.precision.warning_threshold);
    for (a, b) in on_target.data().iter().zip(decoded.data()) {
        assert!((a - b).abs() <= bound);
    }
}

#[test]
fn test_uniform_anomaly_through_pipeline() {
    let config = ProcessingConfig::default();
    let grid = regular_grid(bounds(bbox::SMALL_SOURCE), 6, 6);
    let estimate =
        estimate_diffusivity(&uniform_anomaly(grid.shape(), 0.1, 0.0), &config.diffusivity).unwrap();
    let decoded = quantize(&estimate.field).dequantize();
    let expected = physics::C * (physics::ALPHA * 0.5 * 0.1 * 0.1) * physics::T_L_SECONDS;
    for &k in decoded.data() {
        assert_approx_eq!(k, expected, 0.01);
    }
}

#[test]
fn test_land_cells_carry_zero_diffusivity_onto_target() {
    let config = ProcessingConfig::default();
    let source = regular_grid(bounds(bbox::SMALL_SOURCE), 11, 11);
    let anomaly = uniform_anomaly(source.shape(), 0.1, 0.0);
    // Row 5, col 5 sits on the source node at (145, 35).
    let u = with_nan_cells(anomaly.u(), &[5 * 11 + 5]);
    let anomaly = VectorField::new(u, anomaly.v().clone()).unwrap();

    let estimate = estimate_diffusivity(&anomaly, &config.diffusivity).unwrap();
    let on_target = regrid(&estimate.field, &source, &source, &config.regrid).unwrap();

    assert_eq!(on_target.get(5, 5), Some(0.0));
    assert_approx_eq!(on_target.get(0, 0).unwrap(), 30.24, 1e-3);
    assert_eq!(on_target.nan_count(), 0);
}

// =============================================================================
// Depth stacks
// =============================================================================

struct VelocityFile {
    grid: Grid,
    speed: Option<f32>,
}

impl LayerSource for VelocityFile {
    type Layer = VectorField;
    type Error = String;

    fn read_layer(&self) -> Result<(VectorField, Grid), String> {
        let speed = self.speed.ok_or_else(|| "unreadable".to_string())?;
        Ok((uniform_anomaly(self.grid.shape(), speed, -speed), self.grid.clone()))
    }
}

#[test]
fn test_three_depth_stack_with_missing_middle() {
    let grid = regular_grid(bounds(bbox::SMALL_SOURCE), 5, 7);
    let catalog: LayerCatalog<VelocityFile> = [
        (0.0, VelocityFile { grid: grid.clone(), speed: Some(0.3) }),
        (100.0, VelocityFile { grid: grid.clone(), speed: Some(0.1) }),
    ]
    .into_iter()
    .collect();

    let stack = StackAssembler::new(vec![0.0, 50.0, 100.0])
        .assemble(&catalog)
        .unwrap();

    assert_eq!(stack.levels(), &[0.0, 50.0, 100.0]);
    assert_eq!(stack.layer(0).unwrap().u().get(2, 3), Some(0.3));
    assert_all_nan!(stack.layer(1).unwrap().u().data());
    assert_all_nan!(stack.layer(1).unwrap().v().data());
    assert_eq!(stack.layer(2).unwrap().v().get(2, 3), Some(-0.1));
    assert_eq!(stack.grid(), &grid);
}

#[test]
fn test_stack_regridded_to_target_domain() {
    let source = regular_grid(bounds(bbox::SMALL_SOURCE), 11, 11);
    let target = regular_grid(bounds(bbox::SMALL_SOURCE_EAST_5), 11, 16);
    let catalog: LayerCatalog<VelocityFile> = DEPTH_LEVELS
        .iter()
        .step_by(2)
        .map(|&d| (d, VelocityFile { grid: source.clone(), speed: Some(0.2) }))
        .collect();

    let stack = StackAssembler::new(DEPTH_LEVELS.to_vec())
        .regrid_onto(target.clone(), RegridConfig::default())
        .assemble(&catalog)
        .unwrap();

    assert_eq!(stack.len(), DEPTH_LEVELS.len());
    assert_eq!(stack.filled().len(), DEPTH_LEVELS.len() / 2);
    assert_eq!(stack.shape(), target.shape());
    assert_eq!(stack.layer(0).unwrap().u().get(0, 15), Some(0.0));
    assert_eq!(stack.layer(2).unwrap().u().get(0, 0), Some(0.2));
    assert_all_nan!(stack.layer(1).unwrap().u().data());
}
