//! Where the target grid comes from.

use std::path::{Path, PathBuf};

use field_common::{BoundingBox, FieldError, FieldResult, Grid};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::reader::{read_file, read_grid};

/// Default synthetic domain: lon 120-185, lat 15-65.
pub const DEFAULT_BOUNDS: BoundingBox = BoundingBox {
    min_lon: 120.0,
    min_lat: 15.0,
    max_lon: 185.0,
    max_lat: 65.0,
};

/// Default synthetic resolution in degrees.
pub const DEFAULT_RESOLUTION: f64 = 0.04;

/// Target grid selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GridSource {
    /// The grid block of a coordinates or currents container.
    FromFile { path: PathBuf },
    /// A regular lattice.
    Synthetic { bounds: BoundingBox, resolution: f64 },
}

impl Default for GridSource {
    fn default() -> Self {
        GridSource::Synthetic {
            bounds: DEFAULT_BOUNDS,
            resolution: DEFAULT_RESOLUTION,
        }
    }
}

impl GridSource {
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        GridSource::FromFile { path: path.into() }
    }
}

/// Produce the grid described by `source`.
///
/// Never returns a partially populated grid; any read or decode problem is
/// a `GridLoad` error.
pub fn load_grid(source: &GridSource) -> FieldResult<Grid> {
    match source {
        GridSource::FromFile { path } => load_from_file(path),
        GridSource::Synthetic { bounds, resolution } => {
            let grid = Grid::fallback(*bounds, *resolution)?;
            info!(bounds = %bounds, resolution, shape = %grid.shape(), "Using synthetic grid");
            Ok(grid)
        }
    }
}

fn load_from_file(path: &Path) -> FieldResult<Grid> {
    let bytes = read_file(path)
        .map_err(|e| FieldError::grid_load(format!("{}: {e}", path.display())))?;
    let grid =
        read_grid(&bytes).map_err(|e| FieldError::grid_load(format!("{}: {e}", path.display())))?;
    info!(path = %path.display(), shape = %grid.shape(), "Loaded grid");
    Ok(grid)
}
