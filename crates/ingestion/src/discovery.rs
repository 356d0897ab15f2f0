//! Input discovery by naming convention.
//!
//! - Anomaly inputs: every `*.nc` file directly under the input directory.
//! - Depth inputs: `YYYYMMDD/` subdirectories, each holding
//!   `hycom_YYYYMMDD_depth{D}m.nc` files (`D` may carry a fraction).
//!
//! Results are sorted so that processing order never depends on the
//! order the filesystem lists entries in.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use field_common::parse_compact_date;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{IngestionError, Result};

/// One `YYYYMMDD/` input directory.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyDirectory {
    pub date: NaiveDate,
    pub path: PathBuf,
}

/// One per-depth input file.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthFile {
    pub depth: f64,
    pub path: PathBuf,
}

/// Date directories directly under `root`, oldest first.
///
/// Eight-digit names that are not real dates are logged and skipped.
pub fn find_daily_directories(root: &Path) -> Result<Vec<DailyDirectory>> {
    let mut dirs = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
        let entry = entry.map_err(walk_error)?;
        if !entry.file_type().is_dir() {
            continue;
        }

        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if name.len() != 8 || !name.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }

        match parse_compact_date(name) {
            Some(date) => dirs.push(DailyDirectory {
                date,
                path: entry.into_path(),
            }),
            None => warn!(name, "Skipping invalid date directory"),
        }
    }

    dirs.sort_by_key(|d| d.date);
    debug!(root = %root.display(), count = dirs.len(), "Found date directories");
    Ok(dirs)
}

/// Per-depth files inside one date directory, shallowest first.
pub fn find_depth_files(dir: &Path) -> Result<Vec<DepthFile>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(walk_error)?;
        if !entry.file_type().is_file() {
            continue;
        }

        if let Some(depth) = entry.file_name().to_str().and_then(parse_depth_file_name) {
            files.push(DepthFile {
                depth,
                path: entry.into_path(),
            });
        }
    }

    files.sort_by(|a, b| a.depth.total_cmp(&b.depth));
    Ok(files)
}

/// Depth in metres from `hycom_YYYYMMDD_depth{D}m.nc`.
pub fn parse_depth_file_name(name: &str) -> Option<f64> {
    let rest = name.strip_prefix("hycom_")?;
    let date = rest.get(..8)?;
    let rest = rest.get(8..)?;
    if !date.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let depth = rest.strip_prefix("_depth")?.strip_suffix("m.nc")?;
    let (whole, frac) = match depth.split_once('.') {
        Some((whole, frac)) => (whole, Some(frac)),
        None => (depth, None),
    };
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(whole) || frac.is_some_and(|f| !digits(f)) {
        return None;
    }

    depth.parse().ok()
}

/// `*.nc` files directly under `dir`, sorted by name.
pub fn find_anomaly_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(walk_error)?;
        let is_nc = entry.path().extension().is_some_and(|ext| ext == "nc");
        if entry.file_type().is_file() && is_nc {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

fn walk_error(e: walkdir::Error) -> IngestionError {
    match e.into_io_error() {
        Some(io) => IngestionError::FileRead(io),
        None => IngestionError::NoInput("directory loop while scanning input".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use test_utils::paths::{list_file_names, temp_test_dir};

    #[test]
    fn test_parse_depth_file_name() {
        assert_eq!(parse_depth_file_name("hycom_20110301_depth0m.nc"), Some(0.0));
        assert_eq!(parse_depth_file_name("hycom_20110301_depth1000m.nc"), Some(1000.0));
        assert_eq!(parse_depth_file_name("hycom_20110301_depth2.5m.nc"), Some(2.5));

        assert_eq!(parse_depth_file_name("hycom_20110301_depthm.nc"), None);
        assert_eq!(parse_depth_file_name("hycom_20110301_depth-5m.nc"), None);
        assert_eq!(parse_depth_file_name("hycom_2011031_depth0m.nc"), None);
        assert_eq!(parse_depth_file_name("hycom_20110301_depth0m.nc4"), None);
        assert_eq!(parse_depth_file_name("hycom_20110301_depth1.m.nc"), None);
    }

    #[test]
    fn test_find_daily_directories_sorted_and_filtered() {
        let dir = temp_test_dir();
        for name in ["20110302", "20110301", "20111301", "notes", "2011030"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("20110303"), b"file, not dir").unwrap();

        let found = find_daily_directories(dir.path()).unwrap();
        let dates: Vec<_> = found.iter().map(|d| d.date.to_string()).collect();
        assert_eq!(dates, vec!["2011-03-01", "2011-03-02"]);
        assert_eq!(found[0].path, dir.path().join("20110301"));
    }

    #[test]
    fn test_find_depth_files() {
        let dir = temp_test_dir();
        for name in [
            "hycom_20110301_depth100m.nc",
            "hycom_20110301_depth0m.nc",
            "hycom_20110301_depth50m.nc",
            "readme.txt",
        ] {
            fs::write(dir.path().join(name), b"").unwrap();
        }

        let found = find_depth_files(dir.path()).unwrap();
        let depths: Vec<_> = found.iter().map(|f| f.depth).collect();
        assert_eq!(depths, vec![0.0, 50.0, 100.0]);
        assert_eq!(list_file_names(dir.path()).len(), 4);
    }

    #[test]
    fn test_find_anomaly_files() {
        let dir = temp_test_dir();
        for name in ["b.nc", "a.nc", "c.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("sub.nc")).unwrap();

        let found = find_anomaly_files(dir.path()).unwrap();
        assert_eq!(found, vec![dir.path().join("a.nc"), dir.path().join("b.nc")]);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = temp_test_dir();
        assert!(find_anomaly_files(&dir.path().join("absent")).is_err());
    }
}
