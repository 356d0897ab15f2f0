//! 3D currents pipeline.
//!
//! One output per `YYYYMMDD/` input directory:
//!
//! ```text
//! hycom_*_depth{D}m.nc ──► depth stack (requested levels, NaN-filled gaps)
//!                     ──► optional regrid ──► currents_YYYY_MM_DD.bin
//! ```
//!
//! Dates whose container exists are skipped before any input is read and
//! stay in the manifest.

use container::{currents_file_name, load_grid, read_file, read_grid, ContainerWriter, WriteOutcome};
use field_common::{compact_date, BoundingBox};
use grid_processor::{LayerCatalog, StackAssembler};
use tracing::{debug, info, warn};

use crate::config::PreparerConfig;
use crate::discovery::{find_daily_directories, find_depth_files, DailyDirectory};
use crate::error::{IngestionError, Result};
use crate::manifest::{
    write_manifest, CurrentsManifest, CurrentsRecord, CURRENTS_MANIFEST_FILE_NAME,
};
use crate::report::{BatchReport, RunSummary};
use crate::source::{DepthHandle, DepthReader};

/// Runs the currents pipeline over one input directory.
pub struct CurrentsPipeline<'a, R> {
    config: &'a PreparerConfig,
    reader: R,
}

impl<'a, R: DepthReader> CurrentsPipeline<'a, R> {
    pub fn new(config: &'a PreparerConfig, reader: R) -> Self {
        Self { config, reader }
    }

    /// Process every date directory.
    pub fn run(&self) -> Result<RunSummary> {
        let currents = &self.config.currents;

        let dirs = find_daily_directories(&currents.input_dir)?;
        let (Some(first), Some(last)) = (dirs.first(), dirs.last()) else {
            return Err(IngestionError::NoInput(format!(
                "no YYYYMMDD directories in {}",
                currents.input_dir.display()
            )));
        };
        info!(
            days = dirs.len(),
            from = %first.date,
            to = %last.date,
            depths = ?currents.depth_levels,
            "Starting currents pipeline"
        );

        let mut assembler = StackAssembler::new(currents.depth_levels.clone());
        if let Some(source) = &currents.target_grid {
            let target = load_grid(source)?;
            assembler = assembler.regrid_onto(target, self.config.processing.regrid.clone());
        }

        let writer = ContainerWriter::new(&currents.output_dir);
        writer.ensure_dir()?;

        let mut report = BatchReport::default();
        let mut manifest = CurrentsManifest::new();

        for dir in &dirs {
            match self.process_day(dir, &assembler, &writer, &mut report) {
                Ok(record) => manifest.push(record),
                Err(e) => report.record_failure(compact_date(dir.date), e),
            }
        }

        report.log_summary("currents");

        if manifest.is_empty() {
            warn!("No days produced, manifest not written");
            return Ok(RunSummary {
                report,
                manifest: None,
            });
        }

        let bbox = match manifest.first_bbox() {
            Some(bbox) => bbox,
            None => self.bbox_from_existing(&writer, &manifest)?,
        };
        let metadata = manifest.build(currents.base_date, assembler.levels(), bbox);
        let manifest_path = currents.output_dir.join(CURRENTS_MANIFEST_FILE_NAME);
        write_manifest(&manifest_path, &metadata)?;

        Ok(RunSummary {
            report,
            manifest: Some(manifest_path),
        })
    }

    fn process_day(
        &self,
        dir: &DailyDirectory,
        assembler: &StackAssembler,
        writer: &ContainerWriter,
        report: &mut BatchReport,
    ) -> Result<CurrentsRecord> {
        let name = currents_file_name(dir.date);
        if writer.exists(&name) {
            debug!(date = %dir.date, "Currents container exists, skipping");
            report.record_skipped();
            return Ok(CurrentsRecord {
                date: dir.date,
                file: name,
                skipped: true,
                bbox: None,
                filled_depths: Vec::new(),
            });
        }

        let files = find_depth_files(&dir.path)?;
        if files.is_empty() {
            return Err(IngestionError::NoInput(format!(
                "no depth files in {}",
                dir.path.display()
            )));
        }

        let catalog: LayerCatalog<_> = files
            .iter()
            .map(|f| (f.depth, DepthHandle::new(&self.reader, &f.path, f.depth)))
            .collect();
        let stack = assembler.assemble(&catalog)?;

        let filled_depths: Vec<f64> = stack.filled().iter().map(|f| f.depth).collect();
        let bbox = stack.grid().bbox();

        let outcome = writer.write_currents(dir.date, &stack)?;
        match &outcome {
            WriteOutcome::Written { bytes, .. } => report.record_written(*bytes),
            WriteOutcome::Skipped { .. } => report.record_skipped(),
        }

        info!(
            date = %dir.date,
            shape = %stack.shape(),
            depths = stack.len(),
            filled = filled_depths.len(),
            "Day processed"
        );

        Ok(CurrentsRecord {
            date: dir.date,
            file: name,
            skipped: outcome.is_skipped(),
            bbox: Some(bbox),
            filled_depths,
        })
    }

    /// Every recorded day already existed: take the extent from the earliest file.
    fn bbox_from_existing(
        &self,
        writer: &ContainerWriter,
        manifest: &CurrentsManifest,
    ) -> Result<BoundingBox> {
        let file = manifest
            .first_file()
            .ok_or_else(|| IngestionError::NoInput("no recorded days".to_string()))?;
        let grid = read_grid(&read_file(writer.dir().join(file))?)?;
        Ok(grid.bbox())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::fs;
    use std::path::Path;

    use chrono::NaiveDate;
    use container::{read_currents, GridSource};
    use field_common::{Grid, ScalarField, VectorField};
    use netcdf_parser::DepthLayer;
    use test_utils::generators::regular_grid;
    use test_utils::paths::temp_test_dir;

    /// Every file holds `u = depth`, `v = -depth` on one grid; paths
    /// containing `failing` cannot be read.
    struct MemoryReader {
        grid: Grid,
        reads: Cell<usize>,
        failing: Option<&'static str>,
    }

    impl MemoryReader {
        fn new() -> Self {
            Self {
                grid: regular_grid(BoundingBox::new(140.0, 30.0, 142.0, 32.0), 3, 3),
                reads: Cell::new(0),
                failing: None,
            }
        }

        fn failing(pattern: &'static str) -> Self {
            Self {
                failing: Some(pattern),
                ..Self::new()
            }
        }
    }

    impl DepthReader for MemoryReader {
        fn read_depth(&self, path: &Path, depth: f64) -> Result<DepthLayer> {
            self.reads.set(self.reads.get() + 1);
            if self
                .failing
                .is_some_and(|pattern| path.to_string_lossy().contains(pattern))
            {
                return Err(IngestionError::NetcdfParse(
                    netcdf_parser::NetCdfError::invalid("corrupt file"),
                ));
            }
            let shape = self.grid.shape();
            let velocity = VectorField::new(
                ScalarField::filled(shape, depth as f32),
                ScalarField::filled(shape, -(depth as f32)),
            )?;
            Ok(DepthLayer {
                depth,
                velocity,
                grid: self.grid.clone(),
            })
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn config(root: &Path, levels: &[f64]) -> PreparerConfig {
        let mut config = PreparerConfig::default();
        config.currents.input_dir = root.join("in");
        config.currents.output_dir = root.join("out");
        config.currents.depth_levels = levels.to_vec();
        config
    }

    fn add_day(root: &Path, day: &str, files: &[&str]) {
        let dir = root.join("in").join(day);
        fs::create_dir_all(&dir).unwrap();
        for file in files {
            fs::write(dir.join(file), b"").unwrap();
        }
    }

    #[test]
    fn test_missing_middle_depth_filled() {
        let dir = temp_test_dir();
        let config = config(dir.path(), &[0.0, 50.0, 100.0]);
        add_day(
            dir.path(),
            "20110301",
            &["hycom_20110301_depth0m.nc", "hycom_20110301_depth100m.nc"],
        );

        let summary = CurrentsPipeline::new(&config, MemoryReader::new()).run().unwrap();
        assert_eq!(summary.report.written, 1);

        let bytes = read_file(config.currents.output_dir.join("currents_2011_03_01.bin")).unwrap();
        let container = read_currents(&bytes).unwrap();
        assert_eq!(container.n_depth(), 3);
        assert!(container.u[0].data().iter().all(|&v| v == 0.0));
        assert!(container.u[1].is_all_missing());
        assert!(container.v[2].data().iter().all(|&v| v == -100.0));

        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(summary.manifest.unwrap()).unwrap()).unwrap();
        assert_eq!(manifest["depths"], serde_json::json!([0.0, 50.0, 100.0]));
        assert_eq!(manifest["days"][0]["day_offset"], 0);
        assert_eq!(manifest["days"][0]["filled_depths"], serde_json::json!([50.0]));
        assert_eq!(manifest["bounding_box"]["east"], 142.0);
    }

    #[test]
    fn test_first_depth_unreadable_fails_only_that_day() {
        let dir = temp_test_dir();
        let config = config(dir.path(), &[0.0, 50.0]);
        add_day(
            dir.path(),
            "20110301",
            &["hycom_20110301_depth0m.nc", "hycom_20110301_depth50m.nc"],
        );
        add_day(dir.path(), "20110302", &["hycom_20110302_depth0m.nc"]);

        let reader = MemoryReader::failing("hycom_20110301_depth0m");
        let summary = CurrentsPipeline::new(&config, reader).run().unwrap();
        assert_eq!(summary.report.written, 1);
        assert_eq!(summary.report.failures.len(), 1);
        assert_eq!(summary.report.failures[0].unit, "20110301");

        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(summary.manifest.unwrap()).unwrap()).unwrap();
        assert_eq!(manifest["days"].as_array().unwrap().len(), 1);
        assert_eq!(manifest["days"][0]["date_str"], "2011-03-02");
        assert_eq!(manifest["days"][0]["day_offset"], 1);
    }

    #[test]
    fn test_rerun_skips_without_reading_inputs() {
        let dir = temp_test_dir();
        let config = config(dir.path(), &[0.0]);
        add_day(dir.path(), "20130228", &["hycom_20130228_depth0m.nc"]);

        CurrentsPipeline::new(&config, MemoryReader::new()).run().unwrap();
        let path = config.currents.output_dir.join("currents_2013_02_28.bin");
        let before = fs::read(&path).unwrap();

        let reader = MemoryReader::new();
        let pipeline = CurrentsPipeline::new(&config, reader);
        let summary = pipeline.run().unwrap();
        assert_eq!(pipeline.reader.reads.get(), 0);
        assert_eq!(summary.report.skipped, 1);
        assert_eq!(fs::read(&path).unwrap(), before);

        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(summary.manifest.unwrap()).unwrap()).unwrap();
        assert_eq!(manifest["days"][0]["file"], "currents_2013_02_28.bin");
        assert_eq!(manifest["days"][0]["day_offset"], 730);
        assert_eq!(manifest["bounding_box"]["south"], 30.0);
    }

    #[test]
    fn test_regrid_onto_target() {
        let dir = temp_test_dir();
        let mut config = config(dir.path(), &[0.0, 50.0]);
        config.currents.target_grid = Some(GridSource::Synthetic {
            bounds: BoundingBox::new(140.0, 30.0, 143.0, 32.0),
            resolution: 0.5,
        });
        add_day(
            dir.path(),
            "20110301",
            &["hycom_20110301_depth0m.nc", "hycom_20110301_depth50m.nc"],
        );

        CurrentsPipeline::new(&config, MemoryReader::new()).run().unwrap();

        let bytes = read_file(config.currents.output_dir.join("currents_2011_03_01.bin")).unwrap();
        let container = read_currents(&bytes).unwrap();
        assert_eq!(container.grid.shape(), field_common::GridShape::new(5, 7));
        // Lon 142.5 and 143 lie east of the source and take the fill value.
        assert_eq!(container.u[1].get(2, 6), Some(0.0));
        assert_eq!(container.u[1].get(2, 2), Some(50.0));
    }

    #[test]
    fn test_no_date_directories_is_fatal() {
        let dir = temp_test_dir();
        let config = config(dir.path(), &[0.0]);
        fs::create_dir_all(&config.currents.input_dir).unwrap();

        let err = CurrentsPipeline::new(&config, MemoryReader::new()).run().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_empty_date_directory_is_a_unit_failure() {
        let dir = temp_test_dir();
        let config = config(dir.path(), &[0.0]);
        add_day(dir.path(), "20110301", &[]);

        let summary = CurrentsPipeline::new(&config, MemoryReader::new()).run().unwrap();
        assert_eq!(summary.report.failures.len(), 1);
        assert!(summary.manifest.is_none());
    }
}
