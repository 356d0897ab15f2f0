//! EKE diffusivity pipeline.
//!
//! For every day of every anomaly input:
//!
//! ```text
//! (ugosa, vgosa) ──► diffusivity ──► regrid onto target ──► f16 ──► eke_YYYYMMDD.bin
//! ```
//!
//! The target grid is loaded once and written as `eke_coords.bin`. Days
//! whose container already exists are not recomputed; their manifest entry
//! is rebuilt from the existing file's header.

use std::path::Path;

use chrono::NaiveDate;
use container::{
    daily_file_name, load_grid, read_coordinates, read_daily_header, read_file, ContainerWriter,
    Header, WriteOutcome, COORDINATES_FILE_NAME,
};
use field_common::{compact_date, Grid};
use grid_processor::{estimate_diffusivity, quantize, regrid_with_coverage};
use tracing::{debug, info, warn};

use crate::config::PreparerConfig;
use crate::discovery::find_anomaly_files;
use crate::error::{IngestionError, Result};
use crate::manifest::{write_manifest, EkeManifest, EkeRecord, EKE_MANIFEST_FILE_NAME};
use crate::report::{BatchReport, RunSummary};
use crate::source::{AnomalyOpener, AnomalySource};

/// Runs the EKE pipeline over one input directory.
pub struct EkePipeline<'a, O> {
    config: &'a PreparerConfig,
    opener: O,
}

impl<'a, O: AnomalyOpener> EkePipeline<'a, O> {
    pub fn new(config: &'a PreparerConfig, opener: O) -> Self {
        Self { config, opener }
    }

    /// Process every input file.
    ///
    /// Fails only for run-level problems (no inputs, unloadable grid,
    /// unwritable output); per-file and per-day failures land in the report.
    pub fn run(&self) -> Result<RunSummary> {
        let eke = &self.config.eke;

        let inputs = find_anomaly_files(&eke.input_dir)?;
        if inputs.is_empty() {
            return Err(IngestionError::NoInput(format!(
                "no .nc files in {}",
                eke.input_dir.display()
            )));
        }
        info!(files = inputs.len(), input = %eke.input_dir.display(), "Starting EKE pipeline");

        let grid = load_grid(&eke.grid)?;

        let root = ContainerWriter::new(&eke.output_dir);
        root.ensure_dir()?;
        let coords = root.write_coordinates(&grid)?;
        if coords.is_skipped() {
            check_existing_coordinates(coords.path(), &grid)?;
        }

        let daily = ContainerWriter::new(eke.daily_dir());
        daily.ensure_dir()?;

        let mut report = BatchReport::default();
        let mut manifest = EkeManifest::new();

        for path in &inputs {
            let label = file_label(path);
            let source = match self.opener.open(path) {
                Ok(source) => source,
                Err(e) => {
                    report.record_failure(label, e);
                    continue;
                }
            };
            info!(file = %label, days = source.dates().len(), "Processing anomaly file");

            for (index, &date) in source.dates().iter().enumerate() {
                match self.process_day(&source, index, date, &grid, &daily, &mut report) {
                    Ok(record) => manifest.push(record),
                    Err(e) => report.record_failure(compact_date(date), e),
                }
            }
        }

        report.log_summary("eke");

        if manifest.is_empty() {
            warn!("No days produced, manifest not written");
            return Ok(RunSummary {
                report,
                manifest: None,
            });
        }

        let metadata = manifest.build(
            grid.shape(),
            coords.bytes(),
            &self.config.processing.diffusivity,
        );
        let manifest_path = eke.output_dir.join(EKE_MANIFEST_FILE_NAME);
        write_manifest(&manifest_path, &metadata)?;

        Ok(RunSummary {
            report,
            manifest: Some(manifest_path),
        })
    }

    fn process_day(
        &self,
        source: &O::Source,
        index: usize,
        date: NaiveDate,
        grid: &Grid,
        daily: &ContainerWriter,
        report: &mut BatchReport,
    ) -> Result<EkeRecord> {
        let name = daily_file_name(date);
        if daily.exists(&name) {
            let threshold = self.config.processing.precision.warning_threshold;
            let record = existing_record(&daily.dir().join(&name), date, threshold)?;
            debug!(date = %date, "Daily container exists, skipping");
            report.record_skipped();
            return Ok(record);
        }

        let processing = &self.config.processing;
        let day = source.read_day(index)?;
        let estimate = estimate_diffusivity(&day.velocity, &processing.diffusivity)?;
        let on_target =
            regrid_with_coverage(&estimate.field, source.grid(), grid, &processing.regrid)?;
        let encoded = quantize(on_target.field());
        let precision_flagged = encoded.check(&processing.precision);
        if precision_flagged {
            report.precision_flagged += 1;
        }

        let outcome = daily.write_daily(date, &encoded)?;
        let skipped = outcome.is_skipped();
        match &outcome {
            WriteOutcome::Written { bytes, .. } => report.record_written(*bytes),
            WriteOutcome::Skipped { .. } => report.record_skipped(),
        }

        debug!(
            date = %date,
            k_mean = estimate.k_stats.mean,
            zero_pct = estimate.zero_fraction * 100.0,
            out_of_domain = on_target.out_of_domain(),
            max_error = encoded.max_abs_error(),
            "Day processed"
        );

        Ok(EkeRecord {
            date,
            file: name,
            size: outcome.bytes(),
            max_error: encoded.max_abs_error() as f64,
            mean_error: Some(encoded.mean_abs_error() as f64),
            precision_flagged,
            skipped,
        })
    }
}

/// Manifest entry for a daily container written by an earlier run.
///
/// The flag is judged on the header's truncated error.
fn existing_record(path: &Path, date: NaiveDate, threshold: f32) -> Result<EkeRecord> {
    let bytes = read_file(path)?;
    let max_error = match read_daily_header(&bytes)? {
        Header::Daily {
            scaled_max_error, ..
        } => scaled_max_error as f64 / 1000.0,
        other => {
            return Err(container::ContainerError::malformed(format!(
                "{} holds a {other} header, expected a daily field",
                path.display()
            ))
            .into())
        }
    };

    Ok(EkeRecord {
        date,
        file: daily_file_name(date),
        size: bytes.len() as u64,
        max_error,
        mean_error: None,
        precision_flagged: max_error > threshold as f64,
        skipped: true,
    })
}

/// Daily files from earlier runs index an existing coordinates file; it
/// must describe the grid this run targets.
fn check_existing_coordinates(path: &Path, grid: &Grid) -> Result<()> {
    let existing = read_coordinates(&read_file(path)?)?;
    if existing.shape() != grid.shape() {
        return Err(IngestionError::InvalidConfig(format!(
            "existing {COORDINATES_FILE_NAME} has shape {}, target grid is {}",
            existing.shape(),
            grid.shape()
        )));
    }
    Ok(())
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use std::path::PathBuf;

    use container::{read_daily_field, GridSource};
    use field_common::{BoundingBox, VectorField};
    use netcdf_parser::AnomalyDay;
    use test_utils::generators::{regular_grid, uniform_anomaly};
    use test_utils::paths::{list_file_names, temp_test_dir};

    /// Anomaly inputs keyed by file name; every day is uniform.
    struct MemoryOpener {
        files: HashMap<String, Vec<(NaiveDate, f32)>>,
        grid: Grid,
    }

    struct MemorySource {
        grid: Grid,
        dates: Vec<NaiveDate>,
        speeds: Vec<f32>,
    }

    impl AnomalySource for MemorySource {
        fn grid(&self) -> &Grid {
            &self.grid
        }

        fn dates(&self) -> &[NaiveDate] {
            &self.dates
        }

        fn read_day(&self, index: usize) -> Result<AnomalyDay> {
            let velocity: VectorField = uniform_anomaly(self.grid.shape(), self.speeds[index], 0.0);
            Ok(AnomalyDay {
                date: self.dates[index],
                velocity,
            })
        }
    }

    impl AnomalyOpener for MemoryOpener {
        type Source = MemorySource;

        fn open(&self, path: &Path) -> Result<MemorySource> {
            let days = self.files.get(&file_label(path)).ok_or_else(|| {
                IngestionError::NetcdfParse(netcdf_parser::NetCdfError::invalid("unreadable"))
            })?;
            Ok(MemorySource {
                grid: self.grid.clone(),
                dates: days.iter().map(|d| d.0).collect(),
                speeds: days.iter().map(|d| d.1).collect(),
            })
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup(input: &Path, output: &Path, names: &[&str]) -> PreparerConfig {
        fs::create_dir_all(input).unwrap();
        for name in names {
            fs::write(input.join(name), b"").unwrap();
        }
        let mut config = PreparerConfig::default();
        config.eke.input_dir = input.to_path_buf();
        config.eke.output_dir = output.to_path_buf();
        config.eke.grid = GridSource::Synthetic {
            bounds: BoundingBox::new(141.0, 36.0, 143.0, 38.0),
            resolution: 0.5,
        };
        config
    }

    fn source_grid() -> Grid {
        regular_grid(BoundingBox::new(140.0, 35.0, 145.0, 40.0), 11, 11)
    }

    #[test]
    fn test_run_writes_coords_daily_files_and_manifest() {
        let dir = temp_test_dir();
        let output = dir.path().join("out");
        let config = setup(&dir.path().join("in"), &output, &["b.nc", "a.nc"]);
        let opener = MemoryOpener {
            files: HashMap::from([
                ("a.nc".to_string(), vec![(date(2011, 3, 2), 0.1)]),
                ("b.nc".to_string(), vec![(date(2011, 3, 1), 0.1)]),
            ]),
            grid: source_grid(),
        };

        let summary = EkePipeline::new(&config, opener).run().unwrap();

        assert_eq!(summary.report.written, 2);
        assert!(summary.report.is_clean());
        assert_eq!(
            list_file_names(&output),
            vec!["eke_coords.bin", "eke_metadata.json"]
        );
        assert_eq!(
            list_file_names(&config.eke.daily_dir()),
            vec!["eke_20110301.bin", "eke_20110302.bin"]
        );

        let bytes = read_file(config.eke.daily_dir().join("eke_20110301.bin")).unwrap();
        let daily = read_daily_field(&bytes, field_common::GridShape::new(5, 5)).unwrap();
        for &k in daily.field.data() {
            assert!((k - 30.24).abs() <= daily.max_error() as f32 + 1e-3, "got {k}");
        }

        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(summary.manifest.unwrap()).unwrap()).unwrap();
        assert_eq!(manifest["dates"], serde_json::json!(["20110301", "20110302"]));
        assert_eq!(manifest["grid"]["n_lat"], 5);
    }

    #[test]
    fn test_rerun_skips_existing_days() {
        let dir = temp_test_dir();
        let config = setup(&dir.path().join("in"), &dir.path().join("out"), &["a.nc"]);
        let days = vec![(date(2013, 2, 27), 0.1), (date(2013, 2, 28), 0.2)];
        let opener = || MemoryOpener {
            files: HashMap::from([("a.nc".to_string(), days.clone())]),
            grid: source_grid(),
        };

        EkePipeline::new(&config, opener()).run().unwrap();
        let path = config.eke.daily_dir().join("eke_20130228.bin");
        let before = fs::read(&path).unwrap();

        let summary = EkePipeline::new(&config, opener()).run().unwrap();
        assert_eq!(summary.report.written, 0);
        assert_eq!(summary.report.skipped, 2);
        assert_eq!(fs::read(&path).unwrap(), before);

        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(summary.manifest.unwrap()).unwrap()).unwrap();
        assert_eq!(manifest["total_days"], 2);
        assert_eq!(manifest["files"][1]["skipped"], true);
        assert!(manifest["files"][1]["mean_error"].is_null());
    }

    #[test]
    fn test_precision_flag_lands_on_the_day_record() {
        let dir = temp_test_dir();
        let mut config = setup(&dir.path().join("in"), &dir.path().join("out"), &["a.nc"]);
        // 30.24 m²/s sits between f16 steps of 1/64; a calm day encodes exactly.
        config.processing.precision.warning_threshold = 0.001;
        let days = vec![(date(2013, 2, 27), 0.1), (date(2013, 2, 28), 0.0)];
        let opener = || MemoryOpener {
            files: HashMap::from([("a.nc".to_string(), days.clone())]),
            grid: source_grid(),
        };

        let summary = EkePipeline::new(&config, opener()).run().unwrap();
        assert_eq!(summary.report.precision_flagged, 1);
        assert_eq!(summary.report.written, 2);

        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(summary.manifest.unwrap()).unwrap()).unwrap();
        assert_eq!(manifest["files"][0]["precision_flagged"], true);
        assert!(manifest["files"][1].get("precision_flagged").is_none());

        // The flag survives a rerun that only reads headers back.
        let rerun = EkePipeline::new(&config, opener()).run().unwrap();
        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(rerun.manifest.unwrap()).unwrap()).unwrap();
        assert_eq!(manifest["files"][0]["precision_flagged"], true);
        assert!(manifest["files"][1].get("precision_flagged").is_none());
    }

    #[test]
    fn test_colliding_daily_length_is_skipped_on_rerun() {
        // 100x161 cells make a daily file exactly as long as 2013x2 coordinates.
        let dir = temp_test_dir();
        let mut config = setup(&dir.path().join("in"), &dir.path().join("out"), &["a.nc"]);
        config.eke.grid = GridSource::Synthetic {
            bounds: BoundingBox::new(140.0, 35.0, 144.0, 37.475),
            resolution: 0.025,
        };
        let opener = || MemoryOpener {
            files: HashMap::from([("a.nc".to_string(), vec![(date(2013, 2, 28), 0.1)])]),
            grid: source_grid(),
        };

        EkePipeline::new(&config, opener()).run().unwrap();
        let summary = EkePipeline::new(&config, opener()).run().unwrap();

        assert!(summary.report.is_clean());
        assert_eq!(summary.report.skipped, 1);
    }

    #[test]
    fn test_unreadable_file_is_isolated() {
        let dir = temp_test_dir();
        let config = setup(&dir.path().join("in"), &dir.path().join("out"), &["a.nc", "bad.nc"]);
        let opener = MemoryOpener {
            files: HashMap::from([("a.nc".to_string(), vec![(date(2011, 3, 1), 0.1)])]),
            grid: source_grid(),
        };

        let summary = EkePipeline::new(&config, opener).run().unwrap();
        assert_eq!(summary.report.written, 1);
        assert_eq!(summary.report.failures.len(), 1);
        assert_eq!(summary.report.failures[0].unit, "bad.nc");
    }

    #[test]
    fn test_empty_input_is_fatal() {
        let dir = temp_test_dir();
        let config = setup(&dir.path().join("in"), &dir.path().join("out"), &[]);
        let opener = MemoryOpener {
            files: HashMap::new(),
            grid: source_grid(),
        };

        let err = EkePipeline::new(&config, opener).run().unwrap_err();
        assert!(err.is_fatal());
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_missing_grid_file_is_fatal() {
        let dir = temp_test_dir();
        let mut config = setup(&dir.path().join("in"), &dir.path().join("out"), &["a.nc"]);
        config.eke.grid = GridSource::from_file(PathBuf::from("/nonexistent/grid.bin"));
        let opener = MemoryOpener {
            files: HashMap::new(),
            grid: source_grid(),
        };

        let err = EkePipeline::new(&config, opener).run().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_existing_coordinates_for_other_grid_rejected() {
        let dir = temp_test_dir();
        let output = dir.path().join("out");
        let config = setup(&dir.path().join("in"), &output, &["a.nc"]);
        fs::create_dir_all(&output).unwrap();
        let other = regular_grid(BoundingBox::new(0.0, 0.0, 1.0, 1.0), 2, 2);
        ContainerWriter::new(&output).write_coordinates(&other).unwrap();
        let opener = MemoryOpener {
            files: HashMap::new(),
            grid: source_grid(),
        };

        let err = EkePipeline::new(&config, opener).run().unwrap_err();
        assert!(matches!(err, IngestionError::InvalidConfig(_)));
    }
}
