//! Atomic, idempotent container writes.
//!
//! Bytes go to a temporary file in the destination directory which is then
//! renamed onto the target without clobbering. A target that already exists
//! is left alone and reported as [`WriteOutcome::Skipped`].

use std::io::Write;
use std::path::{Path, PathBuf};

use bytes::{BufMut, Bytes, BytesMut};
use chrono::NaiveDate;
use field_common::{Grid, VectorField};
use grid_processor::{DepthStack, QuantizedField};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{ContainerError, Result};
use crate::format::{
    currents_file_name, daily_file_name, to_sentinel, Header, COORDINATES_FILE_NAME,
};

/// Result of a write request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// A new file was created.
    Written { path: PathBuf, bytes: u64 },
    /// The target already existed and was not touched.
    Skipped { path: PathBuf, bytes: u64 },
}

impl WriteOutcome {
    pub fn path(&self) -> &Path {
        match self {
            WriteOutcome::Written { path, .. } | WriteOutcome::Skipped { path, .. } => path,
        }
    }

    /// Size of the file on disk.
    pub fn bytes(&self) -> u64 {
        match self {
            WriteOutcome::Written { bytes, .. } | WriteOutcome::Skipped { bytes, .. } => *bytes,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, WriteOutcome::Skipped { .. })
    }
}

/// Encode the coordinates container for `grid`.
pub fn encode_coordinates(grid: &Grid) -> Result<Bytes> {
    let header = Header::Coordinates {
        n_lat: grid.n_lat(),
        n_lon: grid.n_lon(),
    };
    let mut buf = BytesMut::with_capacity(header.byte_len() + 8 * grid.len());
    header.encode(&mut buf)?;
    put_f32s(&mut buf, grid.longitude());
    put_f32s(&mut buf, grid.latitude());
    Ok(buf.freeze())
}

/// Encode a daily f16 field container.
pub fn encode_daily(date: NaiveDate, field: &QuantizedField) -> Result<Bytes> {
    let header = Header::Daily {
        date,
        scaled_max_error: field.scaled_max_error(),
    };
    let mut buf = BytesMut::with_capacity(header.byte_len() + 2 * field.values().len());
    header.encode(&mut buf)?;
    for value in field.values() {
        buf.put_u16_le(value.to_bits());
    }
    Ok(buf.freeze())
}

/// Encode a 3D currents container from a velocity depth stack.
pub fn encode_currents(date: NaiveDate, stack: &DepthStack<VectorField>) -> Result<Bytes> {
    let grid = stack.grid();
    let header = Header::Currents {
        n_lat: grid.n_lat(),
        n_lon: grid.n_lon(),
        n_depth: stack.len(),
        date,
    };

    let cells = grid.len();
    let mut buf = BytesMut::with_capacity(header.byte_len() + 4 * cells * (2 + 2 * stack.len()));
    header.encode(&mut buf)?;
    put_f32s(&mut buf, grid.longitude());
    put_f32s(&mut buf, grid.latitude());

    for layer in stack.layers() {
        layer.u().ensure_shape(grid.shape())?;
        put_sentinel_f32s(&mut buf, layer.u().data());
    }
    for layer in stack.layers() {
        layer.v().ensure_shape(grid.shape())?;
        put_sentinel_f32s(&mut buf, layer.v().data());
    }
    Ok(buf.freeze())
}

fn put_f32s(buf: &mut BytesMut, values: &[f32]) {
    for &v in values {
        buf.put_f32_le(v);
    }
}

fn put_sentinel_f32s(buf: &mut BytesMut, values: &[f32]) {
    for &v in values {
        buf.put_f32_le(to_sentinel(v));
    }
}

/// Writes containers into one output directory.
#[derive(Debug, Clone)]
pub struct ContainerWriter {
    dir: PathBuf,
}

impl ContainerWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the output directory if needed.
    pub fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// Write `eke_coords.bin`.
    pub fn write_coordinates(&self, grid: &Grid) -> Result<WriteOutcome> {
        self.write_with(COORDINATES_FILE_NAME, || encode_coordinates(grid))
    }

    /// Write `eke_YYYYMMDD.bin`.
    pub fn write_daily(&self, date: NaiveDate, field: &QuantizedField) -> Result<WriteOutcome> {
        self.write_with(&daily_file_name(date), || encode_daily(date, field))
    }

    /// Write `currents_YYYY_MM_DD.bin`.
    pub fn write_currents(
        &self,
        date: NaiveDate,
        stack: &DepthStack<VectorField>,
    ) -> Result<WriteOutcome> {
        self.write_with(&currents_file_name(date), || encode_currents(date, stack))
    }

    /// Write raw bytes under `name`.
    pub fn write_bytes(&self, name: &str, bytes: &[u8]) -> Result<WriteOutcome> {
        self.write_with(name, || Ok(Bytes::copy_from_slice(bytes)))
    }

    /// Whether `name` already exists in the output directory.
    pub fn exists(&self, name: &str) -> bool {
        self.dir.join(name).exists()
    }

    fn write_with(&self, name: &str, encode: impl FnOnce() -> Result<Bytes>) -> Result<WriteOutcome> {
        let path = self.dir.join(name);

        if let Ok(meta) = std::fs::metadata(&path) {
            debug!(path = %path.display(), "Container exists, skipping");
            return Ok(WriteOutcome::Skipped {
                path,
                bytes: meta.len(),
            });
        }

        let bytes = encode()?;
        write_atomic(&self.dir, &path, &bytes)
    }
}

/// Write `bytes` to `path` via a temp file in `dir` and a no-clobber rename.
pub fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> Result<WriteOutcome> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;

    match tmp.persist_noclobber(path) {
        Ok(_) => {
            info!(path = %path.display(), bytes = bytes.len(), "Wrote container");
            Ok(WriteOutcome::Written {
                path: path.to_path_buf(),
                bytes: bytes.len() as u64,
            })
        }
        // Lost a race with another writer; the temp file is dropped.
        Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
            let bytes = std::fs::metadata(path)?.len();
            Ok(WriteOutcome::Skipped {
                path: path.to_path_buf(),
                bytes,
            })
        }
        Err(e) => Err(ContainerError::Io(e.error)),
    }
}
