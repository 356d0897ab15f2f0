//! Container decoding.

use std::path::Path;

use bytes::{Buf, Bytes};
use chrono::NaiveDate;
use field_common::{Grid, GridShape, ScalarField};
use half::f16;

use crate::error::{ContainerError, Result};
use crate::format::{
    date_from_ints, from_sentinel, Header, COORDINATES_HEADER_INTS, CURRENTS_HEADER_INTS,
    DAILY_HEADER_INTS, VERSION_4, VERSION_6,
};

/// Read a whole container file into memory.
pub fn read_file(path: impl AsRef<Path>) -> Result<Bytes> {
    Ok(Bytes::from(std::fs::read(path)?))
}

/// Decode the header, choosing the layout from the version integer.
///
/// Version 6 has two layouts. The daily layout is chosen when ints 1-3 form
/// a valid calendar date and the body is a whole number of f16 cells;
/// otherwise the coordinates layout when the byte length is exactly
/// `12 + 8 * n_lat * n_lon`. In a coordinates file int 3 holds the bits of
/// the first longitude, which only reads as a day of month for denormals.
pub fn read_header(bytes: &[u8]) -> Result<Header> {
    ContainerError::check_len(4, bytes.len())?;
    let ints = leading_ints(bytes);

    match ints[0] {
        VERSION_6 => {
            if let Some(header) = daily_header(&ints, bytes.len()) {
                return Ok(header);
            }
            if let Some(header) = coordinates_header(&ints, bytes.len()) {
                return Ok(header);
            }
            ContainerError::check_len(DAILY_HEADER_INTS * 4, bytes.len())?;
            Err(ContainerError::malformed(format!(
                "{} bytes match neither version 6 layout",
                bytes.len()
            )))
        }
        VERSION_4 => {
            ContainerError::check_len(CURRENTS_HEADER_INTS * 4, bytes.len())?;
            let n_lat = positive(ints[1], "n_lat")?;
            let n_lon = positive(ints[2], "n_lon")?;
            let n_depth = positive(ints[3], "n_depth")?;
            let date = date_from_ints(ints[4], ints[5], ints[6]).ok_or_else(|| {
                ContainerError::malformed(format!(
                    "invalid date {}-{}-{}",
                    ints[4], ints[5], ints[6]
                ))
            })?;
            Ok(Header::Currents {
                n_lat,
                n_lon,
                n_depth,
                date,
            })
        }
        other => Err(ContainerError::UnsupportedVersion(other)),
    }
}

/// Up to seven leading i32 values; missing ones are 0.
fn leading_ints(bytes: &[u8]) -> [i32; CURRENTS_HEADER_INTS] {
    let mut ints = [0i32; CURRENTS_HEADER_INTS];
    let mut buf = bytes;
    for slot in ints.iter_mut() {
        if buf.remaining() < 4 {
            break;
        }
        *slot = buf.get_i32_le();
    }
    ints
}

fn daily_header(ints: &[i32], len: usize) -> Option<Header> {
    let body = len.checked_sub(DAILY_HEADER_INTS * 4)?;
    let date = date_from_ints(ints[1], ints[2], ints[3])?;
    (body % 2 == 0).then_some(Header::Daily {
        date,
        scaled_max_error: ints[4],
    })
}

fn coordinates_header(ints: &[i32], len: usize) -> Option<Header> {
    let n_lat = usize::try_from(ints[1]).ok().filter(|&n| n > 0)?;
    let n_lon = usize::try_from(ints[2]).ok().filter(|&n| n > 0)?;
    let expected = n_lat
        .checked_mul(n_lon)?
        .checked_mul(8)?
        .checked_add(COORDINATES_HEADER_INTS * 4)?;
    (expected == len).then_some(Header::Coordinates { n_lat, n_lon })
}

fn positive(value: i32, name: &str) -> Result<usize> {
    usize::try_from(value)
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| ContainerError::malformed(format!("{name} must be positive, got {value}")))
}

/// Decode a coordinates container into a grid.
pub fn read_coordinates(bytes: &[u8]) -> Result<Grid> {
    match read_header(bytes)? {
        Header::Coordinates { n_lat, n_lon } => {
            let mut body = &bytes[COORDINATES_HEADER_INTS * 4..];
            let (longitude, latitude) = read_coordinate_blocks(&mut body, n_lat * n_lon)?;
            Ok(Grid::new(longitude, latitude, n_lat, n_lon)?)
        }
        other => Err(ContainerError::malformed(format!(
            "expected a coordinates container, found {other}"
        ))),
    }
}

fn read_coordinate_blocks(body: &mut &[u8], cells: usize) -> Result<(Vec<f32>, Vec<f32>)> {
    let expected = cells
        .checked_mul(8)
        .ok_or_else(|| ContainerError::malformed("grid dimensions overflow"))?;
    ContainerError::check_len(expected, body.remaining())?;
    let longitude = (0..cells).map(|_| body.get_f32_le()).collect();
    let latitude = (0..cells).map(|_| body.get_f32_le()).collect();
    Ok((longitude, latitude))
}

/// A decoded daily field.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyField {
    pub date: NaiveDate,
    /// `trunc(max_err * 1000)` as stored.
    pub scaled_max_error: i32,
    pub field: ScalarField,
}

impl DailyField {
    /// Max round-trip error in physical units.
    pub fn max_error(&self) -> f64 {
        self.scaled_max_error as f64 / 1000.0
    }
}

/// Decode the 5-integer header of a daily field container.
///
/// Unlike [`read_header`] this never considers the coordinates layout, so
/// callers that know they hold a daily file are immune to length collisions.
pub fn read_daily_header(bytes: &[u8]) -> Result<Header> {
    ContainerError::check_len(DAILY_HEADER_INTS * 4, bytes.len())?;
    let ints = leading_ints(bytes);
    if ints[0] != VERSION_6 {
        return Err(ContainerError::UnsupportedVersion(ints[0]));
    }
    daily_header(&ints, bytes.len()).ok_or_else(|| {
        ContainerError::malformed(format!(
            "invalid daily header {}-{}-{} over {} bytes",
            ints[1],
            ints[2],
            ints[3],
            bytes.len()
        ))
    })
}

/// Decode a daily field container. The shape comes from the coordinates container.
pub fn read_daily_field(bytes: &[u8], shape: GridShape) -> Result<DailyField> {
    let header = read_daily_header(bytes)?;
    let Header::Daily {
        date,
        scaled_max_error,
    } = header
    else {
        return Err(ContainerError::malformed(format!(
            "expected a daily field container, found {header}"
        )));
    };

    let mut body = &bytes[header.byte_len()..];
    let expected = 2 * shape.len();
    ContainerError::check_len(expected, body.remaining())?;
    if body.remaining() != expected {
        return Err(ContainerError::malformed(format!(
            "daily body has {} bytes, a {shape} grid needs {expected}",
            body.remaining()
        )));
    }

    let data = (0..shape.len())
        .map(|_| f16::from_bits(body.get_u16_le()).to_f32())
        .collect();

    Ok(DailyField {
        date,
        scaled_max_error,
        field: ScalarField::new(data, shape.n_lat, shape.n_lon)?,
    })
}

/// A decoded 3D currents container.
#[derive(Debug, Clone)]
pub struct CurrentsContainer {
    pub date: NaiveDate,
    pub grid: Grid,
    /// U per depth, in stored order.
    pub u: Vec<ScalarField>,
    /// V per depth, in stored order.
    pub v: Vec<ScalarField>,
}

impl CurrentsContainer {
    pub fn n_depth(&self) -> usize {
        self.u.len()
    }
}

/// Decode a currents container. Sentinel values come back as `NaN`.
pub fn read_currents(bytes: &[u8]) -> Result<CurrentsContainer> {
    let header = read_header(bytes)?;
    let Header::Currents {
        n_lat,
        n_lon,
        n_depth,
        date,
    } = header
    else {
        return Err(ContainerError::malformed(format!(
            "expected a currents container, found {header}"
        )));
    };

    let cells = n_lat * n_lon;
    let mut body = &bytes[header.byte_len()..];
    let expected = cells
        .checked_mul(4 * (2 + 2 * n_depth))
        .ok_or_else(|| ContainerError::malformed("currents dimensions overflow"))?;
    ContainerError::check_len(expected, body.remaining())?;

    let (longitude, latitude) = read_coordinate_blocks(&mut body, cells)?;
    let grid = Grid::new(longitude, latitude, n_lat, n_lon)?;

    let u = read_layers(&mut body, n_depth, grid.shape())?;
    let v = read_layers(&mut body, n_depth, grid.shape())?;

    Ok(CurrentsContainer { date, grid, u, v })
}

fn read_layers(body: &mut &[u8], n_depth: usize, shape: GridShape) -> Result<Vec<ScalarField>> {
    (0..n_depth)
        .map(|_| {
            let data = (0..shape.len())
                .map(|_| from_sentinel(body.get_f32_le()))
                .collect();
            Ok(ScalarField::new(data, shape.n_lat, shape.n_lon)?)
        })
        .collect()
}

/// Decode only the grid block of a coordinates or currents container.
pub fn read_grid(bytes: &[u8]) -> Result<Grid> {
    match read_header(bytes)? {
        Header::Coordinates { .. } => read_coordinates(bytes),
        header @ Header::Currents { n_lat, n_lon, .. } => {
            let mut body = &bytes[header.byte_len()..];
            let (longitude, latitude) = read_coordinate_blocks(&mut body, n_lat * n_lon)?;
            Ok(Grid::new(longitude, latitude, n_lat, n_lon)?)
        }
        header => Err(ContainerError::malformed(format!(
            "{header} has no grid block"
        ))),
    }
}
