//! JSON manifests describing a run's outputs.
//!
//! Records are pushed in processing order and sorted by date (first record
//! per date wins) when the manifest is built, so the file never depends on
//! the order inputs were listed in.

use std::io::Write;
use std::path::Path;

use chrono::{Datelike, NaiveDate, Utc};
use field_common::{compact_date, day_offset, BoundingBox, GridShape};
use grid_processor::DiffusivityConfig;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::info;

use crate::error::Result;

pub const EKE_MANIFEST_FILE_NAME: &str = "eke_metadata.json";
pub const CURRENTS_MANIFEST_FILE_NAME: &str = "currents_3d_metadata.json";

const MB: f64 = 1024.0 * 1024.0;

// ============================================================================
// EKE
// ============================================================================

/// One daily diffusivity container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EkeRecord {
    #[serde(with = "compact")]
    pub date: NaiveDate,
    pub file: String,
    pub size: u64,
    pub max_error: f64,
    /// Unknown for containers that already existed.
    pub mean_error: Option<f64>,
    /// Half-precision error above the warning threshold.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub precision_flagged: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EkeMetadata {
    pub description: String,
    pub physics: Physics,
    pub grid: GridInfo,
    pub binary_format: BinaryFormat,
    pub time_period: String,
    pub dates: Vec<String>,
    pub files: Vec<EkeRecord>,
    pub total_days: usize,
    pub storage_summary: StorageSummary,
    pub processing_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Physics {
    pub formula: String,
    pub constants: PhysicsConstants,
    pub units: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct PhysicsConstants {
    pub c: f64,
    pub alpha: f64,
    #[serde(rename = "T_L_days")]
    pub t_l_days: f64,
    #[serde(rename = "T_L_seconds")]
    pub t_l_seconds: f64,
    pub k_max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridInfo {
    pub n_lat: usize,
    pub n_lon: usize,
    pub total_cells: usize,
    pub coordinates_file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryFormat {
    pub version: i32,
    pub coordinates_header: String,
    pub daily_header: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSummary {
    pub coordinates_size_mb: f64,
    pub total_daily_size_mb: f64,
    pub average_daily_size_mb: f64,
    pub estimated_total_gb: f64,
    pub days_processed: usize,
}

/// Accumulates [`EkeRecord`]s over a run.
#[derive(Debug, Clone, Default)]
pub struct EkeManifest {
    records: Vec<EkeRecord>,
}

impl EkeManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: EkeRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Build the manifest document.
    pub fn build(
        self,
        shape: GridShape,
        coordinates_bytes: u64,
        physics: &DiffusivityConfig,
    ) -> EkeMetadata {
        let files = sorted_by_date(self.records, |r| r.date);
        let dates: Vec<String> = files.iter().map(|r| compact_date(r.date)).collect();
        let time_period = match (files.first(), files.last()) {
            (Some(first), Some(last)) => format!("{} to {}", first.date, last.date),
            _ => String::new(),
        };

        let daily_bytes: u64 = files.iter().map(|r| r.size).sum();
        let days = files.len();

        EkeMetadata {
            description: "Daily eddy diffusivity on the target grid".to_string(),
            physics: Physics {
                formula: "K = C * (ALPHA * EKE) * T_L where EKE = 0.5*(ugosa² + vgosa²)"
                    .to_string(),
                constants: PhysicsConstants {
                    c: physics.c,
                    alpha: physics.alpha,
                    t_l_days: physics.lagrangian_timescale_days,
                    t_l_seconds: physics.lagrangian_timescale_secs(),
                    k_max: physics.k_max,
                },
                units: "m²/s".to_string(),
            },
            grid: GridInfo {
                n_lat: shape.n_lat,
                n_lon: shape.n_lon,
                total_cells: shape.len(),
                coordinates_file: container::COORDINATES_FILE_NAME.to_string(),
            },
            binary_format: BinaryFormat {
                version: container::format::VERSION_6,
                coordinates_header: "3 integers: version, n_lat, n_lon".to_string(),
                daily_header: "5 integers: version, year, month, day, max_error×1000"
                    .to_string(),
                data: "float16 K values only".to_string(),
            },
            time_period,
            dates,
            total_days: days,
            storage_summary: StorageSummary {
                coordinates_size_mb: coordinates_bytes as f64 / MB,
                total_daily_size_mb: daily_bytes as f64 / MB,
                average_daily_size_mb: if days > 0 {
                    daily_bytes as f64 / days as f64 / MB
                } else {
                    0.0
                },
                estimated_total_gb: (coordinates_bytes + daily_bytes) as f64 / (MB * 1024.0),
                days_processed: days,
            },
            files,
            processing_date: Utc::now().to_rfc3339(),
        }
    }
}

// ============================================================================
// Currents
// ============================================================================

/// One 3D currents container.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentsRecord {
    pub date: NaiveDate,
    pub file: String,
    pub skipped: bool,
    /// Extent of the stack's grid; not known for containers that already existed.
    pub bbox: Option<BoundingBox>,
    /// Requested depths that were filled with NaN.
    pub filled_depths: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentsMetadata {
    pub description: String,
    pub binary_version: i32,
    pub base_date: String,
    pub depths: Vec<f64>,
    pub target_depths: Vec<f64>,
    pub depth_count: usize,
    pub bounding_box: CompassBox,
    pub days: Vec<CurrentsDay>,
}

/// Bounding box in the simulator's north/south/east/west form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompassBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl From<BoundingBox> for CompassBox {
    fn from(bbox: BoundingBox) -> Self {
        Self {
            north: bbox.max_lat,
            south: bbox.min_lat,
            east: bbox.max_lon,
            west: bbox.min_lon,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentsDay {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub date_str: String,
    pub day_offset: i64,
    pub file: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filled_depths: Vec<f64>,
}

/// Accumulates [`CurrentsRecord`]s over a run.
#[derive(Debug, Clone, Default)]
pub struct CurrentsManifest {
    records: Vec<CurrentsRecord>,
}

impl CurrentsManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: CurrentsRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Bounding box of the earliest record that carries one.
    pub fn first_bbox(&self) -> Option<BoundingBox> {
        self.records
            .iter()
            .filter(|r| r.bbox.is_some())
            .min_by_key(|r| r.date)
            .and_then(|r| r.bbox)
    }

    /// File of the earliest record.
    pub fn first_file(&self) -> Option<&str> {
        self.records
            .iter()
            .min_by_key(|r| r.date)
            .map(|r| r.file.as_str())
    }

    /// Build the manifest document.
    pub fn build(self, base_date: NaiveDate, levels: &[f64], bbox: BoundingBox) -> CurrentsMetadata {
        let days = sorted_by_date(self.records, |r| r.date)
            .into_iter()
            .map(|r| CurrentsDay {
                year: r.date.year(),
                month: r.date.month(),
                day: r.date.day(),
                date_str: r.date.to_string(),
                day_offset: day_offset(r.date, base_date),
                file: r.file,
                filled_depths: r.filled_depths,
            })
            .collect();

        CurrentsMetadata {
            description: "3D currents at multiple depths".to_string(),
            binary_version: container::format::VERSION_4,
            base_date: format!("{base_date}T00:00:00"),
            depths: levels.to_vec(),
            target_depths: levels.to_vec(),
            depth_count: levels.len(),
            bounding_box: bbox.into(),
            days,
        }
    }
}

// ============================================================================
// Persistence
// ============================================================================

/// Write `value` as pretty JSON to `path`, replacing any previous manifest.
///
/// The document is written to a temp file beside `path` and renamed over it,
/// so readers see either the old or the new manifest.
pub fn write_manifest<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, value)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    info!(path = %path.display(), "Wrote manifest");
    Ok(())
}

fn sorted_by_date<R>(mut records: Vec<R>, date: impl Fn(&R) -> NaiveDate) -> Vec<R> {
    records.sort_by_key(|r| date(r));
    records.dedup_by_key(|r| date(r));
    records
}

mod compact {
    use chrono::NaiveDate;
    use field_common::{compact_date, parse_compact_date};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&compact_date(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let s = String::deserialize(d)?;
        parse_compact_date(&s)
            .ok_or_else(|| de::Error::custom(format!("expected YYYYMMDD, got {s:?}")))
    }
}
